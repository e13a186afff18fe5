//! setupfs CLI - exercises the setupfs primitives against a live file system

mod logging;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use setupfs::{FileApi, FsError, MAX_PATH, MappedFile, PathBuffer};
use tracing::debug;

#[derive(Parser)]
#[command(name = "setupfs")]
#[command(about = "Setup file system primitives - join, probe, parse and map NT paths")]
#[command(version)]
struct Args {
    /// Directory every name is resolved against (an NT name such as
    /// \??\C:\ReactOS on Windows, a host path elsewhere)
    #[arg(long, global = true)]
    root: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Join path components with single separators
    Join {
        base: String,
        suffixes: Vec<String>,

        /// Buffer capacity in UTF-16 code units, terminator included
        #[arg(long, default_value_t = MAX_PATH)]
        capacity: usize,
    },

    /// Check whether a directory (or with --file, a file) exists
    Exists {
        path: String,

        /// Directory holding the file (with --file)
        #[arg(long)]
        dir: Option<String>,

        /// Probe for a non-directory file instead of a directory
        #[arg(long)]
        file: bool,
    },

    /// Decode a \Device\HarddiskN\PartitionM path
    Parse { device_path: String },

    /// Map a file read-only and report what was mapped
    Map {
        file: String,

        /// Directory holding the file
        #[arg(long)]
        dir: Option<String>,

        /// Query the file size before mapping
        #[arg(long)]
        size: bool,

        /// Hex dump the first N bytes of the view
        #[arg(long, value_name = "N")]
        dump: Option<usize>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::set_up_logging(args.verbose);

    let success = match args.command {
        Command::Join {
            base,
            suffixes,
            capacity,
        } => join_command(&base, &suffixes, capacity),
        Command::Parse { device_path } => parse_command(&device_path),
        command => match setupfs::native() {
            Ok(api) => run_with_api(&api, args.root.as_deref(), command),
            Err(e) => {
                eprintln!("{} {}", "[ERROR]".red(), e);
                false
            }
        },
    };

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Run the commands that need file system access
fn run_with_api<A: FileApi>(api: &A, root: Option<&str>, command: Command) -> bool {
    let root = match root.map(|name| open_root(api, name)).transpose() {
        Ok(root) => root,
        Err(e) => {
            eprintln!("{} Cannot use root directory: {}", "[ERROR]".red(), e);
            return false;
        }
    };

    match command {
        Command::Exists { path, dir, file } => {
            exists_command(api, root.as_ref(), &path, dir.as_deref(), file)
        }
        Command::Map {
            file,
            dir,
            size,
            dump,
        } => map_command(api, root.as_ref(), &file, dir.as_deref(), size, dump),
        Command::Join { .. } | Command::Parse { .. } => true,
    }
}

fn open_root<A: FileApi>(api: &A, name: &str) -> Result<A::Root, FsError> {
    let buffer = PathBuffer::with_content(MAX_PATH, name)?;
    let root = api
        .open_root_directory(None, &buffer)
        .map_err(|source| FsError::NotFound {
            path: name.to_string(),
            source,
        })?;
    debug!("Opened root directory '{}'", name);
    Ok(root)
}

fn join_command(base: &str, suffixes: &[String], capacity: usize) -> bool {
    let mut buffer = match PathBuffer::with_content(capacity, base) {
        Ok(buffer) => buffer,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red(), e);
            return false;
        }
    };

    for suffix in suffixes {
        if let Err(e) = buffer.join(Some(suffix)) {
            eprintln!("{} {}", "[ERROR]".red(), e);
            eprintln!("{} Truncated: {}", "[WARN]".yellow(), buffer);
            return false;
        }
    }

    println!("{}", buffer);
    true
}

fn exists_command<A: FileApi>(
    api: &A,
    root: Option<&A::Root>,
    path: &str,
    dir: Option<&str>,
    file: bool,
) -> bool {
    let (kind, result) = if file {
        ("File", setupfs::probe_file(api, root, dir, path))
    } else {
        ("Directory", setupfs::probe_directory(api, root, path))
    };

    match result {
        Ok(()) => {
            println!("{} {} exists", "[OK]".green(), kind);
            true
        }
        Err(e) => {
            println!("{} {}", "[WARN]".yellow(), e);
            false
        }
    }
}

fn parse_command(device_path: &str) -> bool {
    match setupfs::parse_device_path(device_path) {
        Ok(locator) => {
            println!("{:<12} {}", "Disk:", locator.disk_number());
            match locator.partition() {
                Some(partition) => println!("{:<12} {}", "Partition:", partition),
                None => println!("{:<12} {}", "Partition:", "0 (whole disk)"),
            }
            println!("{:<12} {}", "Remainder:", locator.remainder());
            println!("{:<12} {}", "Canonical:", locator);
            true
        }
        Err(FsError::NotMatched { .. }) => {
            eprintln!("{} not a hard disk device path", "[ERROR]".red());
            false
        }
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red(), e);
            false
        }
    }
}

fn map_command<A: FileApi>(
    api: &A,
    root: Option<&A::Root>,
    file: &str,
    dir: Option<&str>,
    want_size: bool,
    dump: Option<usize>,
) -> bool {
    let mapped = match MappedFile::open(api, root, dir, file, want_size) {
        Ok(mapped) => mapped,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red(), e);
            return false;
        }
    };

    println!(
        "{} Mapped '{}': {} bytes at {:p}",
        "[INFO]".blue(),
        mapped.path(),
        mapped.view_len(),
        mapped.base_address()
    );

    if let Some(size) = mapped.size() {
        println!("{} File size: {}", "[INFO]".blue(), size);
        if let Err(e) = mapped.size_u32() {
            println!("{} {}", "[WARN]".yellow(), e);
        }
    }

    if let Some(count) = dump {
        let bytes = mapped.as_bytes();
        for line in hex_dump(&bytes[..count.min(bytes.len())]) {
            println!("{}", line);
        }
    }

    if mapped.close() {
        println!("{} Released", "[OK]".green());
        true
    } else {
        eprintln!("{} Some resources could not be released", "[ERROR]".red());
        false
    }
}

/// Format bytes as offset, hex and ASCII columns, 16 per line
fn hex_dump(bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!("{:08x}  {:<47}  {}", i * 16, hex.join(" "), ascii)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use setupfs::StdFileApi;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("inf")).unwrap();
        fs::write(temp.path().join("inf").join("hivecls.inf"), "[Version]\r\n").unwrap();
        temp
    }

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["setupfs", "map", "txtsetup.sif", "--root", "C:", "-vv"])
            .unwrap();
        assert_eq!(args.root.as_deref(), Some("C:"));
        assert_eq!(args.verbose, 2);
        assert!(matches!(args.command, Command::Map { size: false, dump: None, .. }));
    }

    #[test]
    fn test_join_command() {
        assert!(join_command("\\SystemRoot", &["system32".into(), "\\config".into()], MAX_PATH));
        assert!(!join_command("\\SystemRoot", &["system32".into()], 8));
    }

    #[test]
    fn test_parse_command() {
        assert!(parse_command("\\Device\\Harddisk0\\Partition1\\ReactOS"));
        assert!(!parse_command("\\Device\\CdRom0"));
    }

    #[test]
    fn test_exists_command() {
        let temp = setup();
        let api = StdFileApi::new();
        let root = temp.path().to_path_buf();

        assert!(exists_command(&api, Some(&root), "\\inf", None, false));
        assert!(exists_command(&api, Some(&root), "hivecls.inf", Some("\\inf"), true));
        assert!(!exists_command(&api, Some(&root), "hivecls.inf", Some("\\inf"), false));
        assert!(!exists_command(&api, Some(&root), "\\inf", None, true));
    }

    #[test]
    fn test_map_command() {
        let temp = setup();
        let api = StdFileApi::new();
        let root = temp.path().to_path_buf();

        assert!(map_command(&api, Some(&root), "hivecls.inf", Some("inf"), true, Some(64)));
        assert!(!map_command(&api, Some(&root), "hivesft.inf", Some("inf"), true, None));
    }

    #[test]
    fn test_open_root() {
        let temp = setup();
        let api = StdFileApi::new();
        let root = temp.path().to_string_lossy().into_owned();

        let opened = open_root(&api, &root).unwrap();
        assert!(opened.is_dir());
        assert!(open_root(&api, &format!("{}\\missing", root)).is_err());
    }

    #[test]
    fn test_hex_dump() {
        let lines = hex_dump(b"[Version]\r\nSignature=\"$Windows NT$\"");
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("00000000  5b 56 65 72"));
        assert!(lines[0].ends_with("[Version]..Signa"));
        assert!(lines[2].starts_with("00000020  54 24 22"));
        assert!(hex_dump(&[]).is_empty());
    }
}
