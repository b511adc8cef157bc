use anyhow::{Context, Result};
use buildinfo_core::{Binary, BinaryFormat, SectionDescriptor};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Extract build metadata from ELF and Mach-O binaries
#[derive(Parser)]
#[command(
    name = "extract-buildinfo",
    about = "Extract build metadata from a binary compiled with buildinfo support",
    version,
    author
)]
struct Cli {
    /// Path to binary file
    #[arg(required = true)]
    path: std::path::PathBuf,

    /// Defaults to `extract` with the format's buildinfo section
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write the raw contents of a section to stdout
    Extract {
        /// Section to read (`.buildinfo` for ELF, `__buildinfo` for Mach-O
        /// when omitted); Mach-O names may be qualified as `SEGMENT,section`
        #[arg(short, long)]
        section: Option<String>,
    },
    /// List all sections
    Sections {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show the detected container format
    Format,
}

#[derive(Serialize, Tabled)]
struct SectionRow {
    #[tabled(rename = "Section")]
    name: String,
    #[tabled(rename = "Offset")]
    #[serde(rename = "offset")]
    file_offset: String,
    #[tabled(rename = "Size")]
    size: u64,
}

impl From<SectionDescriptor> for SectionRow {
    fn from(s: SectionDescriptor) -> Self {
        Self {
            name: s.name,
            file_offset: format!("{:#x}", s.file_offset),
            size: s.size,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let status = execute(
        std::env::args_os(),
        &mut std::io::stdout().lock(),
        &mut std::io::stderr().lock(),
    );
    ExitCode::from(status)
}

/// Parses `args` and runs the command, writing results to `out` and at most
/// one diagnostic line to `err`. Returns the process exit status.
fn execute<I, T>(args: I, out: &mut impl Write, err: &mut impl Write) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    // Usage errors share the exit status of every other failure.
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(usage) => {
            let status = usage_exit_status(&usage);
            let sink: &mut dyn Write = if usage.use_stderr() { err } else { out };
            let _ = write!(sink, "{}", usage.render());
            return status;
        }
    };

    match run(cli, out) {
        Ok(()) => 0,
        Err(e) => {
            let _ = writeln!(err, "{}: {e:#}", "error".red().bold());
            1
        }
    }
}

/// `--help` and `--version` succeed; everything else clap rejects is a failure.
fn usage_exit_status(err: &clap::Error) -> u8 {
    if err.use_stderr() { 1 } else { 0 }
}

fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let mut bin = Binary::open(&cli.path)?;
    log::debug!("{} is {}", bin.path().display(), bin.format());

    match cli.command.unwrap_or(Command::Extract { section: None }) {
        Command::Extract { section } => {
            let payload = bin
                .extract(section.as_deref())
                .with_context(|| format!("failed to extract from {}", cli.path.display()))?;
            out.write_all(&payload)?;
        }

        Command::Sections { json } => {
            let rows: Vec<SectionRow> = bin
                .sections()
                .with_context(|| format!("failed to list sections of {}", cli.path.display()))?
                .into_iter()
                .map(SectionRow::from)
                .collect();

            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?;
            } else if rows.is_empty() {
                writeln!(out, "No sections found (possibly stripped binary).")?;
            } else {
                let mut table = Table::new(rows);
                table.with(Style::sharp());
                writeln!(out, "{table}")?;
            }
        }

        Command::Format => {
            if bin.format() == BinaryFormat::Unknown {
                anyhow::bail!("{}: unknown or unsupported binary format", cli.path.display());
            }
            writeln!(out, "{}", bin.format())?;
        }
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildinfo_core::fixtures::{ElfBuilder, MachOBuilder};
    use clap::CommandFactory;
    use tempfile::NamedTempFile;

    fn write_temp(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    /// Runs the CLI in-process and returns (status, stdout, stderr).
    fn invoke(args: &[&str]) -> (u8, Vec<u8>, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let argv = std::iter::once("extract-buildinfo").chain(args.iter().copied());
        let status = execute(argv, &mut out, &mut err);
        (status, out, String::from_utf8(err).unwrap())
    }

    /// Asserts `stderr` is exactly one `error:` diagnostic and returns its message.
    fn single_error_line(stderr: &str) -> &str {
        assert_eq!(stderr.matches('\n').count(), 1, "{stderr:?}");
        let line = stderr.trim_end();
        let (prefix, message) = line.split_once(": ").unwrap();
        assert!(prefix.contains("error"), "{line:?}");
        message
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_path_means_extract_default_section() {
        let cli = Cli::try_parse_from(["extract-buildinfo", "a.out"]).unwrap();
        assert_eq!(cli.path, std::path::PathBuf::from("a.out"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn explicit_section_is_parsed() {
        let cli =
            Cli::try_parse_from(["extract-buildinfo", "a.out", "extract", "-s", "__DATA,__buildinfo"])
                .unwrap();
        match cli.command {
            Some(Command::Extract { section }) => {
                assert_eq!(section.as_deref(), Some("__DATA,__buildinfo"))
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn missing_path_is_a_usage_error() {
        let err = Cli::try_parse_from(["extract-buildinfo"]).err().unwrap();
        assert!(err.use_stderr());
    }

    #[test]
    fn rows_render_offsets_in_hex() {
        let row = SectionRow::from(SectionDescriptor {
            name: ".buildinfo".into(),
            file_offset: 0x40,
            size: 15,
        });
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": ".buildinfo", "offset": "0x40", "size": 15})
        );
    }

    #[test]
    fn bare_path_writes_the_default_section_verbatim() {
        let payload = b"{\"ver\":\"1.2.3\"}\n\0\xff";
        let tmp = write_temp(&ElfBuilder::new().section(".buildinfo", payload).build());
        let (status, out, err) = invoke(&[tmp.path().to_str().unwrap()]);
        assert_eq!(status, 0);
        assert_eq!(out, payload);
        assert!(err.is_empty());
    }

    #[test]
    fn extract_accepts_a_qualified_macho_section() {
        let tmp = write_temp(
            &MachOBuilder::new()
                .segment("__TEXT", &[("__buildinfo", b"text")])
                .segment("__DATA", &[("__buildinfo", b"data")])
                .build(),
        );
        let path = tmp.path().to_str().unwrap();
        let (status, out, _) = invoke(&[path, "extract", "-s", "__DATA,__buildinfo"]);
        assert_eq!(status, 0);
        assert_eq!(out, b"data");
    }

    #[test]
    fn format_names_each_container() {
        let cases = [
            (ElfBuilder::new().build(), "ELF64"),
            (MachOBuilder::new().build(), "Mach-O 64 (little-endian)"),
            (
                MachOBuilder::new().big_endian().build(),
                "Mach-O 64 (big-endian)",
            ),
        ];
        for (bytes, expected) in cases {
            let tmp = write_temp(&bytes);
            let (status, out, err) = invoke(&[tmp.path().to_str().unwrap(), "format"]);
            assert_eq!(status, 0, "{err}");
            assert_eq!(String::from_utf8(out).unwrap(), format!("{expected}\n"));
        }
    }

    #[test]
    fn unknown_format_fails_with_one_diagnostic() {
        let tmp = write_temp(b"#!/bin/sh\necho hi\n");
        let path = tmp.path().to_str().unwrap();
        for args in [vec![path, "format"], vec![path]] {
            let (status, out, err) = invoke(&args);
            assert_eq!(status, 1);
            assert!(out.is_empty());
            single_error_line(&err);
        }
    }

    #[test]
    fn missing_section_fails_with_one_diagnostic() {
        let tmp = write_temp(&ElfBuilder::new().section(".text", &[0xc3]).build());
        let (status, out, err) = invoke(&[tmp.path().to_str().unwrap()]);
        assert_eq!(status, 1);
        assert!(out.is_empty());
        assert!(single_error_line(&err).ends_with("no .buildinfo section found in binary"));
    }

    #[test]
    fn open_failure_reports_its_cause_once() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let (status, out, err) = invoke(&[missing.to_str().unwrap()]);
        assert_eq!(status, 1);
        assert!(out.is_empty());
        let message = single_error_line(&err);
        assert!(
            message.starts_with(&format!("failed to open {}: ", missing.display())),
            "{message}"
        );
        assert_eq!(message.matches("(os error").count(), 1, "{message}");
    }

    #[test]
    fn usage_errors_exit_one_and_help_exits_zero() {
        let (status, out, err) = invoke(&[]);
        assert_eq!(status, 1);
        assert!(out.is_empty());
        assert!(!err.is_empty());

        let (status, _, _) = invoke(&["a.out", "bogus"]);
        assert_eq!(status, 1);

        for flag in ["--help", "--version"] {
            let (status, out, err) = invoke(&[flag]);
            assert_eq!(status, 0, "{flag}");
            assert!(!out.is_empty(), "{flag}");
            assert!(err.is_empty(), "{flag}");
        }
    }

    #[test]
    fn sections_json_lists_every_section() {
        let tmp = write_temp(&ElfBuilder::new().section(".buildinfo", b"{}").build());
        let (status, out, _) = invoke(&[tmp.path().to_str().unwrap(), "sections", "--json"]);
        assert_eq!(status, 0);
        let rows: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let names: Vec<_> = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["", ".buildinfo", ".shstrtab"]);
    }
}
