//! Namefix: re-encode names stored in a binary save image.
//!
//! Names are decoded with the code table the image was written with,
//! re-encoded with a revised table and emitted as a CMF cheat patch that
//! rewrites them in place.
//!
//! The crate provides:
//! - The name codec: code tables, decoder and encoder (`codec`)
//! - Patch records and CMF documents (`patch`)
//! - Slot layouts describing where names live (`layout`)
//! - Slot orchestration and file-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use namefix::codec::{CodeTable, Ignore, decode_name, encode_name};
//! use namefix::patch::name_records;
//!
//! let old = CodeTable::parse("41=A\n0201=B\n", &mut Ignore);
//! let new = CodeTable::parse("61=A\n62=B\n", &mut Ignore).reverse(&mut Ignore);
//!
//! let image = [0x41, 0x02, 0x01, 0x00];
//! let name = decode_name(&image[..], 0, &old, &mut Ignore);
//! assert_eq!(name.text, "AB");
//!
//! let converted = encode_name(&name, &new, &mut Ignore);
//! let (records, _) = name_records(&converted.codes, 0);
//! for record in &records {
//!     println!("{record}");
//! }
//! ```

pub mod codec;
pub mod io;
pub mod layout;
pub mod patch;

#[cfg(feature = "cli")]
pub mod cli;
