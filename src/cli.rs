// Command-line front end for namefix.
//
// Every option has a long form; defaults reproduce the file names the
// tool has always used (`dump.mem`, `TO2_encode.txt`, ...), so running
// `namefix convert` in a prepared directory needs no arguments.

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::codec::{DecodeOutcome, LogSink};
use crate::io::{self, ConvertOptions, DEFAULT_SECTION_LABEL, NamefixError};
use crate::layout::SlotLayout;
use crate::patch::CmfHeader;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const DEFAULT_IMAGE: &str = "dump.mem";
const DEFAULT_TABLE: &str = "TO2_encode.txt";
const DEFAULT_NEW_TABLE: &str = "TO2_encode_new.txt";
const DEFAULT_OUTPUT: &str = "ULJM-05753_NameFix.CMF";
const DEFAULT_COMPARE_LIST: &str = "TO2_SplitCompare.txt";
const DEFAULT_PATCH_ID: &str = "ULJM-05753";
const DEFAULT_DESCRIPTION: &str = "Tactics Ogre PSP Chinese NameFix";

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Re-encode save-image names with a revised code table as a CMF patch.
#[derive(Parser, Debug)]
#[command(
    name = "namefix",
    version,
    about = "Save-image name re-encoder",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (only errors are logged).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use twice for per-slot debug output).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output results as JSON.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Decode names with one table, re-encode with another, write a CMF patch.
    Convert(ConvertArgs),
    /// Print the names found in an image.
    Names(NamesArgs),
    /// Write CMF batches that place every code of a table into roster slots.
    Probe(ProbeArgs),
    /// Apply a CMF patch to a copy of an image.
    Apply(ApplyArgs),
    /// Print the effective slot layout and defaults.
    Config(LayoutArgs),
}

#[derive(Args, Debug)]
struct LayoutArgs {
    /// Slot layout JSON (default: built-in ULJM-05753 layout).
    #[arg(long, value_hint = ValueHint::FilePath)]
    layout: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct HeaderArgs {
    /// Patch-set id written in the `_S` line.
    #[arg(long = "patch-id", default_value = DEFAULT_PATCH_ID)]
    patch_id: String,

    /// Description written in the `_G` line.
    #[arg(long, default_value = DEFAULT_DESCRIPTION)]
    description: String,

    /// Section label written in the `_C0` line.
    #[arg(long, default_value = DEFAULT_SECTION_LABEL)]
    section: String,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Memory/save image to read names from.
    #[arg(long, value_hint = ValueHint::FilePath, default_value = DEFAULT_IMAGE)]
    image: PathBuf,

    /// Code table the image was written with.
    #[arg(long, value_hint = ValueHint::FilePath, default_value = DEFAULT_TABLE)]
    table: PathBuf,

    /// Revised code table to encode names with.
    #[arg(long = "new-table", value_hint = ValueHint::FilePath, default_value = DEFAULT_NEW_TABLE)]
    new_table: PathBuf,

    /// CMF patch to write.
    #[arg(long, short = 'o', value_hint = ValueHint::FilePath, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    #[command(flatten)]
    layout: LayoutArgs,

    #[command(flatten)]
    header: HeaderArgs,
}

#[derive(Args, Debug)]
struct NamesArgs {
    #[arg(long, value_hint = ValueHint::FilePath, default_value = DEFAULT_IMAGE)]
    image: PathBuf,

    #[arg(long, value_hint = ValueHint::FilePath, default_value = DEFAULT_TABLE)]
    table: PathBuf,

    /// Only list slots whose presence byte is set (slots without one are always listed).
    #[arg(long = "present-only")]
    present_only: bool,

    #[command(flatten)]
    layout: LayoutArgs,
}

#[derive(Args, Debug)]
struct ProbeArgs {
    #[arg(long, value_hint = ValueHint::FilePath, default_value = DEFAULT_IMAGE)]
    image: PathBuf,

    /// Table whose codes are probed.
    #[arg(long, value_hint = ValueHint::FilePath, default_value = DEFAULT_NEW_TABLE)]
    table: PathBuf,

    /// Directory for the batch CMF files and the compare list.
    #[arg(long = "out-dir", value_hint = ValueHint::DirPath, default_value = ".")]
    out_dir: PathBuf,

    /// File name of the code/glyph compare list.
    #[arg(long = "compare-list", default_value = DEFAULT_COMPARE_LIST)]
    compare_list: String,

    #[command(flatten)]
    layout: LayoutArgs,

    #[command(flatten)]
    header: HeaderArgs,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    #[arg(long, value_hint = ValueHint::FilePath, default_value = DEFAULT_IMAGE)]
    image: PathBuf,

    /// CMF patch to apply.
    #[arg(long, value_hint = ValueHint::FilePath, default_value = DEFAULT_OUTPUT)]
    patch: PathBuf,

    /// Patched image to write.
    #[arg(long, short = 'o', value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("namefix".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = log_filter(&cli);
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn log_filter(cli: &Cli) -> &'static str {
    match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    }
}

fn resolve_layout(args: &LayoutArgs) -> Result<SlotLayout, NamefixError> {
    match &args.layout {
        Some(path) => io::load_layout(path),
        None => Ok(SlotLayout::default()),
    }
}

fn build_options(layout: &LayoutArgs, header: &HeaderArgs) -> Result<ConvertOptions, NamefixError> {
    Ok(ConvertOptions {
        layout: resolve_layout(layout)?,
        header: CmfHeader {
            id: header.patch_id.clone(),
            description: header.description.clone(),
        },
        section_label: header.section.clone(),
    })
}

fn refuse_overwrite(path: &Path, force: bool) -> bool {
    if path.exists() && !force {
        eprintln!(
            "namefix: output file exists, use -f to overwrite: {}",
            path.display()
        );
        return true;
    }
    false
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("namefix: json error: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_convert(cli: &Cli, args: &ConvertArgs) -> i32 {
    let opts = match build_options(&args.layout, &args.header) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("namefix: {e}");
            return 1;
        }
    };
    if refuse_overwrite(&args.output, cli.force) {
        return 1;
    }

    let (conversion, stats) =
        match io::convert_file(&args.image, &args.table, &args.new_table, &args.output, &opts) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("namefix: convert: {e}");
                return 1;
            }
        };

    if cli.json_output {
        let names: Vec<_> = conversion
            .names
            .iter()
            .filter(|n| n.written)
            .map(|n| {
                serde_json::json!({
                    "slot": n.slot.kind.to_string(),
                    "offset": n.slot.name_offset,
                    "original": n.original.text,
                    "converted": n.converted.text,
                    "codes": n.converted.codes,
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "command": "convert",
            "image_size": stats.image_size,
            "slots": stats.slots,
            "written": stats.written,
            "records": stats.records,
            "warnings": stats.warnings,
            "errors": stats.errors,
            "names": names,
        }));
    } else if !cli.quiet {
        eprintln!(
            "namefix: {} of {} names written to {} ({} records, {} warnings, {} errors)",
            stats.written,
            stats.slots,
            args.output.display(),
            stats.records,
            stats.warnings,
            stats.errors
        );
    }

    0
}

fn cmd_names(cli: &Cli, args: &NamesArgs) -> i32 {
    let layout = match resolve_layout(&args.layout) {
        Ok(layout) => layout,
        Err(e) => {
            eprintln!("namefix: {e}");
            return 1;
        }
    };
    let mut sink = LogSink::default();
    let table = match io::load_table(&args.table, &mut sink) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("namefix: table: {}: {e}", args.table.display());
            return 1;
        }
    };
    let image = match std::fs::read(&args.image) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("namefix: image: {}: {e}", args.image.display());
            return 1;
        }
    };

    let names: Vec<_> = match io::read_names(&image, &layout, &table, &mut sink) {
        Ok(names) => names
            .into_iter()
            .filter(|n| !args.present_only || n.present != Some(false))
            .collect(),
        Err(e) => {
            eprintln!("namefix: {e}");
            return 1;
        }
    };

    if cli.json_output {
        let rows: Vec<_> = names
            .iter()
            .map(|n| {
                serde_json::json!({
                    "slot": n.slot.kind.to_string(),
                    "offset": n.slot.name_offset,
                    "present": n.present,
                    "text": n.name.text,
                    "codes": n.name.codes,
                    "complete": n.outcome != DecodeOutcome::Error,
                })
            })
            .collect();
        print_json(&serde_json::Value::Array(rows));
    } else {
        for n in &names {
            let flag = match n.outcome {
                DecodeOutcome::Error => " !",
                _ => "",
            };
            println!(
                "{:<12} 0x{:07X}  {}  [{}]{flag}",
                n.slot.kind.to_string(),
                n.slot.name_offset,
                n.name.text,
                n.name.codes_hex()
            );
        }
    }
    0
}

fn cmd_probe(cli: &Cli, args: &ProbeArgs) -> i32 {
    let opts = match build_options(&args.layout, &args.header) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("namefix: {e}");
            return 1;
        }
    };
    match io::probe_file(
        &args.image,
        &args.table,
        &args.out_dir,
        &args.compare_list,
        &opts,
        cli.force,
    ) {
        Ok(batches) => {
            if cli.json_output {
                let files: Vec<_> = batches.iter().map(|b| b.file_name.clone()).collect();
                print_json(&serde_json::json!({
                    "command": "probe",
                    "batches": batches.len(),
                    "codes": batches.last().map_or(0, |b| b.end),
                    "files": files,
                }));
            } else if !cli.quiet {
                eprintln!(
                    "namefix: {} probe batches written to {}",
                    batches.len(),
                    args.out_dir.display()
                );
            }
            0
        }
        Err(e) => {
            eprintln!("namefix: probe: {e}");
            1
        }
    }
}

fn cmd_apply(cli: &Cli, args: &ApplyArgs) -> i32 {
    if refuse_overwrite(&args.output, cli.force) {
        return 1;
    }
    match io::apply_file(&args.image, &args.patch, &args.output) {
        Ok(written) => {
            if !cli.quiet {
                eprintln!(
                    "namefix: {written} bytes patched into {}",
                    args.output.display()
                );
            }
            0
        }
        Err(e) => {
            eprintln!("namefix: apply: {e}");
            1
        }
    }
}

fn cmd_config(args: &LayoutArgs) -> i32 {
    let layout = match resolve_layout(args) {
        Ok(layout) => layout,
        Err(e) => {
            eprintln!("namefix: {e}");
            return 1;
        }
    };
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("namefix version {version}");
    eprintln!("IMAGE={DEFAULT_IMAGE}");
    eprintln!("TABLE={DEFAULT_TABLE}");
    eprintln!("NEW_TABLE={DEFAULT_NEW_TABLE}");
    eprintln!("OUTPUT={DEFAULT_OUTPUT}");
    eprintln!("NAME_CODE_LIMIT={}", crate::patch::NAME_CODE_LIMIT);
    eprintln!("MAX_NAME_BYTES={}", crate::codec::MAX_NAME_BYTES);
    println!("{}", layout.to_json());
    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&cli)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match &cli.command {
        Cmd::Convert(args) => cmd_convert(&cli, args),
        Cmd::Names(args) => cmd_names(&cli, args),
        Cmd::Probe(args) => cmd_probe(&cli, args),
        Cmd::Apply(args) => cmd_apply(&cli, args),
        Cmd::Config(args) => cmd_config(args),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let argv: Vec<String> = std::iter::once("namefix".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        Cli::try_parse_from(argv).expect("cli parse failed")
    }

    #[test]
    fn convert_defaults_match_historical_names() {
        let cli = parse(&["convert"]);
        let Cmd::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.image, PathBuf::from("dump.mem"));
        assert_eq!(args.table, PathBuf::from("TO2_encode.txt"));
        assert_eq!(args.new_table, PathBuf::from("TO2_encode_new.txt"));
        assert_eq!(args.output, PathBuf::from("ULJM-05753_NameFix.CMF"));
        assert_eq!(args.header.patch_id, "ULJM-05753");
        assert_eq!(args.header.section, "Fix Name");
        assert!(args.layout.layout.is_none());
    }

    #[test]
    fn convert_overrides() {
        let cli = parse(&[
            "--force",
            "convert",
            "--image",
            "save.bin",
            "--new-table",
            "new.txt",
            "-o",
            "out.cmf",
            "--patch-id",
            "NPJH-00001",
            "--layout",
            "layout.json",
        ]);
        assert!(cli.force);
        let Cmd::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.image, PathBuf::from("save.bin"));
        assert_eq!(args.new_table, PathBuf::from("new.txt"));
        assert_eq!(args.output, PathBuf::from("out.cmf"));
        assert_eq!(args.header.patch_id, "NPJH-00001");
        assert_eq!(args.layout.layout, Some(PathBuf::from("layout.json")));
    }

    #[test]
    fn verbosity_maps_to_log_filter() {
        assert_eq!(log_filter(&parse(&["config"])), "warn");
        assert_eq!(log_filter(&parse(&["-v", "config"])), "info");
        assert_eq!(log_filter(&parse(&["-vvv", "config"])), "debug");
        assert_eq!(log_filter(&parse(&["--quiet", "config"])), "error");
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let argv = ["namefix", "-q", "-v", "config"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn apply_requires_output() {
        assert!(Cli::try_parse_from(["namefix", "apply"]).is_err());
        let cli = parse(&["apply", "--patch", "p.cmf", "-o", "patched.mem"]);
        let Cmd::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.image, PathBuf::from("dump.mem"));
        assert_eq!(args.patch, PathBuf::from("p.cmf"));
    }

    #[test]
    fn probe_defaults() {
        let cli = parse(&["probe"]);
        let Cmd::Probe(args) = cli.command else {
            panic!("expected probe");
        };
        assert_eq!(args.table, PathBuf::from("TO2_encode_new.txt"));
        assert_eq!(args.compare_list, "TO2_SplitCompare.txt");
        assert_eq!(args.out_dir, PathBuf::from("."));
    }

    #[test]
    fn build_options_without_layout_uses_default() {
        let cli = parse(&["convert", "--description", "Test", "--section", "Names"]);
        let Cmd::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        let opts = build_options(&args.layout, &args.header).unwrap();
        assert_eq!(opts.layout, SlotLayout::default());
        assert_eq!(opts.header.description, "Test");
        assert_eq!(opts.section_label, "Names");
    }
}
