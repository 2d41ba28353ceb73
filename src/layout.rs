// Where names live in an image.
//
// The default layout is the Tactics Ogre PSP (ULJM-05753) memory dump: one
// legion name, one hero name and 50 roster entries, each entry starting with
// a presence byte followed by the unit's name.  Other layouts load from JSON:
//
//     { "legion": 2968764, "hero": null,
//       "members": { "base": 2968828, "stride": 1164, "count": 50, "presence_byte": true } }
//
// Fields left out keep their default value.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::patch::{MAX_OFFSET, NAME_CODE_LIMIT};

pub const DEFAULT_LEGION_OFFSET: u64 = 0x2D4CBC;
pub const DEFAULT_HERO_OFFSET: u64 = 0x2D4CD5;
pub const DEFAULT_MEMBER_BASE: u64 = 0x2D4CFC;
pub const DEFAULT_MEMBER_STRIDE: u64 = 0x48C;
pub const DEFAULT_MEMBER_COUNT: usize = 50;

/// Upper bound on roster entries a layout may describe.
pub const MAX_MEMBER_COUNT: usize = 4096;

/// Bytes past a slot's first name byte that a name patch can write: two
/// bytes per code plus the terminator.
pub const NAME_WRITE_SPAN: u64 = 2 * NAME_CODE_LIMIT as u64;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{slot} at {offset:#X} can write beyond the addressable range 0xFFFFFFF")]
    OffsetTooLarge { slot: SlotKind, offset: u64 },
    #[error("{slot} offset overflows")]
    OffsetOverflow { slot: SlotKind },
    #[error("member stride {stride:#X} is shorter than one name entry")]
    StrideTooSmall { stride: u64 },
    #[error("{count} members exceed the limit of 4096")]
    TooManyMembers { count: usize },
}

/// Roster entries laid out at a fixed stride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberLayout {
    pub base: u64,
    pub stride: u64,
    pub count: usize,
    /// Each entry starts with a byte that is 1 when the slot is in use; the
    /// name follows it.
    pub presence_byte: bool,
}

impl Default for MemberLayout {
    fn default() -> Self {
        Self {
            base: DEFAULT_MEMBER_BASE,
            stride: DEFAULT_MEMBER_STRIDE,
            count: DEFAULT_MEMBER_COUNT,
            presence_byte: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotLayout {
    pub legion: Option<u64>,
    pub hero: Option<u64>,
    pub members: MemberLayout,
}

impl Default for SlotLayout {
    fn default() -> Self {
        Self {
            legion: Some(DEFAULT_LEGION_OFFSET),
            hero: Some(DEFAULT_HERO_OFFSET),
            members: MemberLayout::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Legion,
    Hero,
    Member(usize),
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legion => f.write_str("legion"),
            Self::Hero => f.write_str("hero"),
            Self::Member(i) => write!(f, "member[{i}]"),
        }
    }
}

/// One name location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub kind: SlotKind,
    /// First byte of the encoded name.
    pub name_offset: u64,
    /// Byte that is 1 when the slot is in use, if the slot has one.
    pub presence_offset: Option<u64>,
}

impl SlotLayout {
    pub fn from_json(text: &str) -> Result<Self, LayoutError> {
        let layout: Self = serde_json::from_str(text)?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Every slot in write order: legion, hero, then members.
    pub fn slots(&self) -> Result<Vec<Slot>, LayoutError> {
        self.validate()?;

        let mut slots = Vec::with_capacity(self.members.count + 2);
        if let Some(offset) = self.legion {
            slots.push(Slot {
                kind: SlotKind::Legion,
                name_offset: offset,
                presence_offset: None,
            });
        }
        if let Some(offset) = self.hero {
            slots.push(Slot {
                kind: SlotKind::Hero,
                name_offset: offset,
                presence_offset: None,
            });
        }
        for i in 0..self.members.count {
            slots.push(self.member(i)?);
        }
        Ok(slots)
    }

    fn member(&self, i: usize) -> Result<Slot, LayoutError> {
        let m = &self.members;
        let kind = SlotKind::Member(i);
        let entry = m
            .stride
            .checked_mul(i as u64)
            .and_then(|step| m.base.checked_add(step))
            .ok_or(LayoutError::OffsetOverflow { slot: kind })?;
        let (name_offset, presence_offset) = if m.presence_byte {
            let name = entry
                .checked_add(1)
                .ok_or(LayoutError::OffsetOverflow { slot: kind })?;
            (name, Some(entry))
        } else {
            (entry, None)
        };
        Ok(Slot {
            kind,
            name_offset,
            presence_offset,
        })
    }

    /// Reject layouts whose writes could not be expressed or would overlap.
    ///
    /// Every byte a name patch can touch must stay addressable.  Member
    /// offsets grow with the index, so only the last member is computed.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let m = &self.members;
        if m.count > MAX_MEMBER_COUNT {
            return Err(LayoutError::TooManyMembers { count: m.count });
        }
        if m.count > 1 && m.stride < u64::from(m.presence_byte) + 1 {
            return Err(LayoutError::StrideTooSmall { stride: m.stride });
        }

        let fixed = [
            self.legion.map(|o| (SlotKind::Legion, o)),
            self.hero.map(|o| (SlotKind::Hero, o)),
        ];
        for (slot, offset) in fixed.into_iter().flatten() {
            check_span(slot, offset)?;
        }
        if let Some(last) = m.count.checked_sub(1) {
            let slot = self.member(last)?;
            check_span(slot.kind, slot.name_offset)?;
        }
        Ok(())
    }
}

fn check_span(slot: SlotKind, offset: u64) -> Result<(), LayoutError> {
    match offset.checked_add(NAME_WRITE_SPAN) {
        Some(end) if end <= MAX_OFFSET => Ok(()),
        Some(_) => Err(LayoutError::OffsetTooLarge { slot, offset }),
        None => Err(LayoutError::OffsetOverflow { slot }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{CmfDocument, CmfHeader, name_records};

    #[test]
    fn default_layout_matches_known_offsets() {
        let slots = SlotLayout::default().slots().unwrap();
        assert_eq!(slots.len(), 52);
        assert_eq!(slots[0].kind, SlotKind::Legion);
        assert_eq!(slots[0].name_offset, 0x2D4CBC);
        assert_eq!(slots[1].name_offset, 0x2D4CD5);
        assert_eq!(slots[2].presence_offset, Some(0x2D4CFC));
        assert_eq!(slots[2].name_offset, 0x2D4CFD);
        assert_eq!(slots[3].name_offset, 0x2D4CFC + 0x48C + 1);
        assert_eq!(slots[51].kind, SlotKind::Member(49));
        assert!(SlotLayout::default().validate().is_ok());
    }

    #[test]
    fn json_fields_default() {
        let layout = SlotLayout::from_json(r#"{ "hero": null, "members": { "count": 2 } }"#)
            .unwrap();
        assert_eq!(layout.legion, Some(DEFAULT_LEGION_OFFSET));
        assert_eq!(layout.hero, None);
        assert_eq!(layout.members.count, 2);
        assert_eq!(layout.members.stride, DEFAULT_MEMBER_STRIDE);
        assert_eq!(layout.slots().unwrap().len(), 3);
    }

    #[test]
    fn members_without_presence_byte() {
        let layout = SlotLayout {
            legion: None,
            hero: None,
            members: MemberLayout {
                base: 0x100,
                stride: 0x10,
                count: 2,
                presence_byte: false,
            },
        };
        let slots = layout.slots().unwrap();
        assert_eq!(slots[1].name_offset, 0x110);
        assert_eq!(slots[1].presence_offset, None);
    }

    #[test]
    fn json_roundtrip() {
        let layout = SlotLayout::default();
        assert_eq!(SlotLayout::from_json(&layout.to_json()).unwrap(), layout);
    }

    #[test]
    fn rejects_bad_layouts() {
        assert!(matches!(
            SlotLayout::from_json(r#"{ "legion": 536870912 }"#),
            Err(LayoutError::OffsetTooLarge {
                slot: SlotKind::Legion,
                ..
            })
        ));
        assert!(matches!(
            SlotLayout::from_json(r#"{ "members": { "stride": 0 } }"#),
            Err(LayoutError::StrideTooSmall { stride: 0 })
        ));
        assert!(matches!(
            SlotLayout::from_json("{ not json"),
            Err(LayoutError::Json(_))
        ));
    }

    #[test]
    fn name_writes_must_stay_addressable() {
        let limit = MAX_OFFSET - NAME_WRITE_SPAN;
        let at_limit = SlotLayout {
            legion: Some(limit),
            hero: None,
            members: MemberLayout {
                count: 0,
                ..Default::default()
            },
        };
        assert!(at_limit.validate().is_ok());

        // The widest name written at the limit still reads back as 8-bit writes.
        let mut doc = CmfDocument::new(CmfHeader::default());
        let (records, _) = name_records(&[0x0201; NAME_CODE_LIMIT], limit);
        assert_eq!(records.last().map(|r| r.offset), Some(MAX_OFFSET));
        doc.section("Fix Name").push_group(records);
        assert!(CmfDocument::parse(&doc.to_string()).is_ok());

        let past = SlotLayout {
            legion: Some(limit + 1),
            ..at_limit.clone()
        };
        assert!(matches!(
            past.validate(),
            Err(LayoutError::OffsetTooLarge {
                slot: SlotKind::Legion,
                ..
            })
        ));
        assert!(matches!(
            SlotLayout::from_json(r#"{ "legion": 268435455, "members": { "count": 0 } }"#),
            Err(LayoutError::OffsetTooLarge { .. })
        ));
    }

    #[test]
    fn last_member_bounds_the_roster() {
        let json = r#"{ "legion": null, "hero": 0,
            "members": { "base": 0, "stride": 16, "count": 2, "presence_byte": false } }"#;
        assert!(SlotLayout::from_json(json).is_ok());

        let base = MAX_OFFSET - NAME_WRITE_SPAN - 16;
        let layout = SlotLayout {
            legion: None,
            hero: None,
            members: MemberLayout {
                base,
                stride: 16,
                count: 2,
                presence_byte: true,
            },
        };
        assert!(matches!(
            layout.validate(),
            Err(LayoutError::OffsetTooLarge {
                slot: SlotKind::Member(1),
                ..
            })
        ));
    }

    #[test]
    fn overflowing_stride_is_an_error() {
        let json = r#"{ "members": { "stride": 18446744073709551615, "count": 3 } }"#;
        assert!(matches!(
            SlotLayout::from_json(json),
            Err(LayoutError::OffsetOverflow {
                slot: SlotKind::Member(2)
            })
        ));

        let layout = SlotLayout {
            legion: None,
            hero: None,
            members: MemberLayout {
                base: u64::MAX,
                stride: 1,
                count: 1,
                presence_byte: true,
            },
        };
        assert!(matches!(
            layout.slots(),
            Err(LayoutError::OffsetOverflow { .. })
        ));
    }

    #[test]
    fn huge_member_count_is_rejected() {
        assert!(matches!(
            SlotLayout::from_json(r#"{ "members": { "count": 100000000 } }"#),
            Err(LayoutError::TooManyMembers { count: 100000000 })
        ));
    }

    #[test]
    fn slot_names() {
        assert_eq!(SlotKind::Member(3).to_string(), "member[3]");
        assert_eq!(SlotKind::Hero.to_string(), "hero");
    }
}
