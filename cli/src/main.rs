use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use superfloppy_core::{FileSpec, ImageOptions, ImageRequest, Manifest, SizePolicy};
use superfloppy_filesystems::{build_image, BuiltImage, PlacedEntry};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_OUTPUT: &str = "boot.img";
const IWAD_NAME: &str = "DOOM1.WAD";

#[derive(Parser, Debug)]
#[command(name = "mkfat16")]
#[command(about = "Build a FAT16 superfloppy disk image", long_about = None)]
struct Cli {
    /// Output image path [default: boot.img]
    out: Option<PathBuf>,
    /// Optional DOOM IWAD, stored in the root as DOOM1.WAD
    wad: Option<PathBuf>,
    /// Host file to add to the root directory (repeatable)
    #[arg(long = "add", value_name = "FILE")]
    add: Vec<PathBuf>,
    /// One group per --add-dir: the directory name followed by its files.
    /// Filled from `ADD_DIR_ID` occurrences, see [`Cli::try_from_args`].
    #[arg(skip)]
    add_dir: Vec<Vec<String>>,
    /// Image size in MiB (0 = auto-size based on payload)
    #[arg(long, default_value_t = 0)]
    size_mb: u32,
    /// Volume label (up to 11 characters)
    #[arg(long)]
    label: Option<String>,
    /// Volume serial number, decimal or 0x-prefixed hex
    #[arg(long, value_parser = parse_serial)]
    serial: Option<u32>,
    /// JSON manifest listing files, directories and image options
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,
    /// Log each file and directory as it is added
    #[arg(short, long)]
    verbose: bool,
}

const ADD_DIR_ID: &str = "add_dir";

fn add_dir_arg() -> Arg {
    Arg::new(ADD_DIR_ID)
        .long("add-dir")
        .num_args(1..)
        .value_names(["DIRNAME", "FILE"])
        .action(ArgAction::Append)
        .help("Create a subdirectory and add files to it: --add-dir bin file1 file2 ...")
}

impl Cli {
    /// Parse `args`, keeping each --add-dir occurrence as its own group.
    fn try_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().arg(add_dir_arg()).try_get_matches_from(args)?;
        let mut cli = Self::from_arg_matches(&matches)?;
        cli.add_dir = add_dir_groups(&matches);
        Ok(cli)
    }

    fn from_command_line() -> Self {
        Self::try_from_args(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }
}

fn add_dir_groups(matches: &ArgMatches) -> Vec<Vec<String>> {
    matches
        .get_occurrences::<String>(ADD_DIR_ID)
        .map(|groups| groups.map(|group| group.cloned().collect()).collect())
        .unwrap_or_default()
}

fn parse_serial(text: &str) -> Result<u32, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid serial '{}': {}", text, e))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_host_file(path: &Path) -> Result<FileSpec> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    Ok(FileSpec::new(name, data))
}

/// Expand glob patterns in `patterns`, each pattern's matches sorted.
/// A pattern with no matches, or one that is not a valid pattern, is kept as a literal path.
fn expand_paths(patterns: &[String]) -> Vec<PathBuf> {
    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..glob::MatchOptions::new()
    };
    let mut result = Vec::new();
    for pattern in patterns {
        let mut matches: Vec<PathBuf> = match glob::glob_with(pattern, options) {
            Ok(paths) => paths
                .filter_map(|entry| match entry {
                    Ok(path) => Some(path),
                    Err(e) => {
                        warn!("Skipping unreadable match for {}: {}", pattern, e);
                        None
                    }
                })
                .collect(),
            Err(e) => {
                debug!("Using {} literally: {}", pattern, e);
                Vec::new()
            }
        };
        if matches.is_empty() {
            result.push(PathBuf::from(pattern));
        } else {
            matches.sort();
            result.extend(matches);
        }
    }
    result
}

/// Read every regular file in `paths`, skipping anything else.
fn read_directory_members(dir_name: &str, paths: &[PathBuf]) -> Result<Vec<FileSpec>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_file() {
            warn!("Skipping {} for /{}/: not a regular file", path.display(), dir_name);
            continue;
        }
        files.push(read_host_file(path)?);
    }
    Ok(files)
}

/// Everything the build needs, gathered from the manifest and the command line.
struct Plan {
    output: PathBuf,
    request: ImageRequest,
    options: ImageOptions,
}

fn collect_plan(cli: &Cli) -> Result<Plan> {
    let manifest = match &cli.manifest {
        Some(path) => Manifest::load(path).with_context(|| format!("Failed to load manifest {}", path.display()))?,
        None => Manifest::default(),
    };

    let mut request = ImageRequest::new();
    for path in &manifest.files {
        request.add_root_file(read_host_file(path)?);
    }
    if let Some(wad) = &cli.wad {
        let data = std::fs::read(wad).with_context(|| format!("Failed to read IWAD {}", wad.display()))?;
        request.add_root_file(FileSpec::new(IWAD_NAME, data));
    }
    for path in &cli.add {
        request.add_root_file(read_host_file(path)?);
    }

    for dir in &manifest.directories {
        let files = read_directory_members(&dir.name, &dir.files)?;
        request.add_directory_files(&dir.name, files);
    }
    for group in &cli.add_dir {
        let Some((dir_name, members)) = group.split_first() else {
            continue;
        };
        if dir_name.is_empty() {
            bail!("--add-dir needs a directory name");
        }
        let paths = expand_paths(members);
        let files = read_directory_members(dir_name, &paths)?;
        request.add_directory_files(dir_name, files);
    }

    let mut options = manifest.options;
    if cli.size_mb > 0 {
        options.size = SizePolicy::Megabytes(cli.size_mb);
    }
    if let Some(label) = &cli.label {
        options.volume.volume_label = Some(label.clone());
    }
    if let Some(serial) = cli.serial {
        options.volume.volume_serial = serial;
    }

    let output = cli
        .out
        .clone()
        .or(manifest.output)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    Ok(Plan { output, request, options })
}

/// Write the image next to its destination, then move it into place,
/// so a failed write never leaves a partial image behind.
fn write_image(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(bytes).context("Failed to write image")?;
    tmp.as_file().sync_all().context("Failed to flush image")?;
    tmp.persist(path)
        .with_context(|| format!("Failed to move image into place at {}", path.display()))?;
    Ok(())
}

fn files_in<'a>(
    built: &'a BuiltImage,
    directory: Option<&'a str>,
) -> impl Iterator<Item = &'a PlacedEntry> {
    built
        .entries
        .iter()
        .filter(move |e| !e.is_directory && e.directory.as_deref() == directory)
}

fn format_summary(output: &Path, built: &BuiltImage) -> String {
    let size = built.size_bytes();
    let mut out = String::new();
    out.push_str(&format!(
        "Wrote {} ({} bytes, {} MiB)\n",
        output.display(),
        size,
        size / (1024 * 1024)
    ));
    out.push_str("Root files:\n");
    for file in files_in(built, None) {
        out.push_str(&format!("  {} ({} bytes)\n", file.name, file.size));
    }
    for dir in built.entries.iter().filter(|e| e.is_directory) {
        out.push_str(&format!("Directory /{}/:\n", dir.name));
        let mut count = 0;
        for file in files_in(built, Some(dir.name.as_str())) {
            out.push_str(&format!("  {} ({} bytes)\n", file.name, file.size));
            count += 1;
        }
        out.push_str(&format!("  ({} files)\n", count));
    }
    out
}

fn run(cli: Cli) -> Result<()> {
    let plan = collect_plan(&cli)?;
    info!(
        "Building image with {} root files and {} directories ({} payload bytes)",
        plan.request.root_files.len(),
        plan.request.directories.len(),
        plan.request.payload_bytes()
    );

    let built = build_image(&plan.request, &plan.options).context("Failed to build FAT16 image")?;
    for entry in &built.entries {
        debug!(
            "{} at cluster {} ({} clusters)",
            entry.path(),
            entry.first_cluster,
            entry.clusters
        );
    }
    info!("Built {} sectors of {} bytes", built.total_sectors(), built.layout.bytes_per_sector);
    write_image(&plan.output, &built.bytes)?;

    print!("{}", format_summary(&plan.output, &built));
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::from_command_line();
    init_logging(cli.verbose);
    run(cli)
}

#[cfg(test)]
mod tests {
    use super::*;
    use superfloppy_core::DirectorySpec;

    fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn parses_original_style_arguments() {
        let cli = Cli::try_from_args([
            "mkfat16", "disk.img", "doom1.wad", "--add", "a.txt", "--add", "b.txt", "--add-dir", "bin", "x", "y",
            "--add-dir", "etc", "--size-mb", "20",
        ])
        .unwrap();
        assert_eq!(cli.out, Some(PathBuf::from("disk.img")));
        assert_eq!(cli.wad, Some(PathBuf::from("doom1.wad")));
        assert_eq!(cli.add, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
        assert_eq!(cli.add_dir, vec![vec!["bin", "x", "y"], vec!["etc"]]);
        assert_eq!(cli.size_mb, 20);
    }

    #[test]
    fn defaults_to_auto_size() {
        let cli = Cli::try_from_args(["mkfat16"]).unwrap();
        assert_eq!(cli.out, None);
        assert_eq!(cli.size_mb, 0);
        assert!(cli.add_dir.is_empty());
    }

    #[test]
    fn serial_accepts_hex_and_decimal() {
        assert_eq!(parse_serial("0x12345678").unwrap(), 0x1234_5678);
        assert_eq!(parse_serial("42").unwrap(), 42);
        assert!(parse_serial("0xZZ").is_err());
    }

    #[test]
    fn plan_merges_repeated_directories_and_skips_non_files() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_file(tmp.path(), "a.txt", b"aaa");
        let ls = write_file(tmp.path(), "ls", b"ELF");
        let cat = write_file(tmp.path(), "cat", b"ELF2");
        let wad = write_file(tmp.path(), "freedoom.wad", b"IWAD");
        let sub = tmp.path().join("subdir");
        std::fs::create_dir(&sub).unwrap();

        let args: Vec<String> = vec![
            "mkfat16".into(),
            "out.img".into(),
            wad.display().to_string(),
            "--add".into(),
            a.display().to_string(),
            "--add-dir".into(),
            "bin".into(),
            ls.display().to_string(),
            sub.display().to_string(),
            "--add-dir".into(),
            "bin".into(),
            cat.display().to_string(),
            "--label".into(),
            "test disk".into(),
        ];
        let cli = Cli::try_from_args(args).unwrap();
        let plan = collect_plan(&cli).unwrap();

        let root: Vec<&str> = plan.request.root_files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(root, vec!["DOOM1.WAD", "a.txt"]);
        assert_eq!(plan.request.directories.len(), 1);
        let bin: Vec<&str> = plan.request.directories[0].files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(bin, vec!["ls", "cat"]);
        assert_eq!(plan.options.volume.volume_label.as_deref(), Some("test disk"));
        assert_eq!(plan.options.size, SizePolicy::Auto);
        assert_eq!(plan.output, PathBuf::from("out.img"));
    }

    #[test]
    fn missing_root_file_is_an_error() {
        let cli = Cli::try_from_args(["mkfat16", "--add", "/definitely/not/here.bin"]).unwrap();
        let err = collect_plan(&cli).err().unwrap();
        assert!(format!("{:#}", err).contains("not/here.bin"));
    }

    #[test]
    fn manifest_entries_come_before_flags() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "first.txt", b"1");
        let second = write_file(tmp.path(), "second.txt", b"2");
        let manifest = write_file(
            tmp.path(),
            "disk.json",
            br#"{"output": "m.img", "files": ["first.txt"], "options": {"size": {"megabytes": 24}}}"#,
        );

        let args = vec![
            "mkfat16".to_string(),
            "--manifest".to_string(),
            manifest.display().to_string(),
            "--add".to_string(),
            second.display().to_string(),
        ];
        let plan = collect_plan(&Cli::try_from_args(args).unwrap()).unwrap();
        let root: Vec<&str> = plan.request.root_files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(root, vec!["first.txt", "second.txt"]);
        assert_eq!(plan.options.size, SizePolicy::Megabytes(24));
        assert_eq!(plan.output, tmp.path().join("m.img"));
    }

    #[test]
    fn writes_image_and_summary() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("boot.img");
        let request = ImageRequest {
            root_files: vec![FileSpec::new("TEST.TXT", b"hello\n".to_vec())],
            directories: vec![DirectorySpec::with_files("bin", vec![FileSpec::new("a", vec![0u8; 10])])],
        };
        let built = build_image(&request, &ImageOptions::default()).unwrap();
        write_image(&out, &built.bytes).unwrap();

        let written = std::fs::read(&out).unwrap();
        assert_eq!(written.len(), 16 * 1024 * 1024);
        assert_eq!(&written[510..512], &[0x55, 0xAA]);

        let summary = format_summary(&out, &built);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], format!("Wrote {} (16777216 bytes, 16 MiB)", out.display()));
        assert_eq!(lines[1..], ["Root files:", "  TEST.TXT (6 bytes)", "Directory /bin/:", "  a (10 bytes)", "  (1 files)"]);
    }

    #[test]
    fn patterns_expand_sorted_with_literal_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let b = write_file(tmp.path(), "b.elf", b"B");
        let a = write_file(tmp.path(), "a.elf", b"A");
        write_file(tmp.path(), ".hidden.elf", b"H");
        let notes = write_file(tmp.path(), "notes.txt", b"N");

        let patterns = vec![
            format!("{}/*.elf", tmp.path().display()),
            "no/such/dir/*.bin".to_string(),
            notes.display().to_string(),
        ];
        assert_eq!(
            expand_paths(&patterns),
            vec![a, b, PathBuf::from("no/such/dir/*.bin"), notes]
        );
    }

    #[test]
    fn quoted_patterns_in_add_dir_are_expanded() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "sh.elf", b"SH");
        write_file(tmp.path(), "init.elf", b"INIT");
        write_file(tmp.path(), "README", b"docs");

        let args = vec![
            "mkfat16".to_string(),
            "--add-dir".to_string(),
            "bin".to_string(),
            format!("{}/*.elf", tmp.path().display()),
            format!("{}/missing-*.elf", tmp.path().display()),
        ];
        let plan = collect_plan(&Cli::try_from_args(args).unwrap()).unwrap();
        assert_eq!(plan.request.directories.len(), 1);
        let bin: Vec<&str> = plan.request.directories[0].files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(bin, vec!["init.elf", "sh.elf"]);
    }

    #[test]
    fn failed_build_leaves_no_output() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("boot.img");
        let big = write_file(tmp.path(), "big.bin", &vec![0u8; 17 * 1024 * 1024]);
        let args = vec![
            "mkfat16".to_string(),
            out.display().to_string(),
            "--add".to_string(),
            big.display().to_string(),
            "--size-mb".to_string(),
            "16".to_string(),
        ];
        let err = run(Cli::try_from_args(args).unwrap()).unwrap_err();
        assert!(format!("{:#}", err).contains("Capacity exceeded"));
        assert!(!out.exists());
    }
}
