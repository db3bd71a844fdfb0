//! CLI execution and command dispatch.
//!
//! Keeps `main` minimal: one entry point that validates the invocation,
//! runs discovery, and hands the results through the pipeline. All errors
//! propagate to the top level; nothing is retried, and no output file is
//! opened before scanning and graph construction have succeeded.

use crate::builder::{self, BuildRequest, SOURCE_DIR, Shortcut};
use crate::cli::{Cli, Commands, GenerateArgs};
use crate::platform::Platform;
use crate::toolchain::{self, LocateOptions, ToolchainInfo};
use crate::{fetch, makefile, ninja, settings, sources};
use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Default output name for the Ninja flavour.
pub const DEFAULT_NINJA_FILE: &str = "build.ninja";
/// Default local template for the Makefile flavour.
pub const DEFAULT_BASE_FILE: &str = "Makefile";

/// Execute the parsed [`Cli`] command.
///
/// # Errors
///
/// Returns an error for any failure; the caller renders it as a single
/// `ERROR: <message>` line with a non-zero exit code.
pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Generate(args) => generate(args),
    }
}

/// Output flavour selected by the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavour {
    Ninja,
    Makefile,
}

/// Validated invocation facts, resolved once before any work happens.
#[derive(Debug)]
struct Preflight {
    flavour: Flavour,
    root: Utf8PathBuf,
    shortcuts: Vec<Shortcut>,
}

/// The single explicit capability check run at the start of `generate`.
///
/// Conflicting options and an unusable environment are rejected here, so
/// the pipeline proper never has hidden work or late configuration errors.
fn preflight(args: &GenerateArgs) -> Result<Preflight> {
    if args.drive.is_some() && args.download {
        bail!("--drive and --download are mutually exclusive");
    }
    let flavour = if args.base.is_some() || args.drive.is_some() || args.download {
        Flavour::Makefile
    } else {
        Flavour::Ninja
    };
    if flavour == Flavour::Makefile {
        if args.include.is_some() {
            bail!("-i/--include only applies to the ninja format");
        }
        if !args.tools.is_empty() {
            bail!("-t/--tool only applies to the ninja format");
        }
    }

    let shortcuts = args
        .tools
        .iter()
        .map(|spec| parse_shortcut(spec))
        .collect::<Result<Vec<_>>>()?;

    let root = expand_tilde(&args.directory)?;
    if !root.exists() {
        bail!(
            "'{root}' not found; check the path (Windows drives may need a \
             POSIX-style spelling such as /cygdrive/c or /mnt/c)"
        );
    }
    Ok(Preflight {
        flavour,
        root,
        shortcuts,
    })
}

fn parse_shortcut(spec: &str) -> Result<Shortcut> {
    let Some((name, command)) = spec.split_once('=') else {
        bail!("--tool expects NAME=COMMAND, got '{spec}'");
    };
    if name.is_empty() || command.trim().is_empty() {
        bail!("--tool expects a non-empty NAME and COMMAND, got '{spec}'");
    }
    Ok(Shortcut {
        name: name.to_owned(),
        command: command.to_owned(),
    })
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(path: &Utf8Path) -> Result<Utf8PathBuf> {
    let text = path.as_str();
    let Some(rest) = text.strip_prefix('~') else {
        return Ok(path.to_owned());
    };
    if !rest.is_empty() && !rest.starts_with('/') && !rest.starts_with('\\') {
        // `~user` expansion is not supported; treat it as a literal path.
        return Ok(path.to_owned());
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("cannot expand '~': no home directory in the environment"))?;
    let trimmed = rest.trim_start_matches(['/', '\\']);
    if trimmed.is_empty() {
        Ok(Utf8PathBuf::from(home))
    } else {
        Ok(Utf8PathBuf::from(format!("{home}/{trimmed}")))
    }
}

fn generate(args: &GenerateArgs) -> Result<()> {
    let checked = preflight(args)?;
    let platform = Platform::host();

    info!(root = %checked.root, "searching for cross compiler");
    let compiler = toolchain::locate(&checked.root, &LocateOptions::default())?;
    let toolchain = ToolchainInfo::from_compiler(&compiler, args.name.as_deref())?;
    info!(name = %toolchain.name, compiler = %compiler, "detected toolchain");

    match checked.flavour {
        Flavour::Ninja => generate_ninja(args, &checked, &platform, &toolchain),
        Flavour::Makefile => generate_makefile(args, &platform, &toolchain),
    }
}

fn generate_ninja(
    args: &GenerateArgs,
    checked: &Preflight,
    platform: &Platform,
    toolchain: &ToolchainInfo,
) -> Result<()> {
    // The source list is captured completely before the output is opened.
    let source_list = sources::scan(Utf8Path::new(SOURCE_DIR))
        .with_context(|| format!("scanning '{SOURCE_DIR}' for sources"))?;
    debug!(count = source_list.len(), "sources captured");

    let out_file = args
        .output
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_NINJA_FILE));
    let generator = generator_path();
    let request = BuildRequest {
        toolchain,
        platform,
        sources: &source_list,
        root_dir: &checked.root,
        out_file: &out_file,
        generator: &generator,
        include: args.include.as_deref(),
        shortcuts: &checked.shortcuts,
    };
    let graph = builder::assemble(&request)?;
    let text = ninja::emit(&graph)?;
    write_atomic(&out_file, &text)?;
    info!(path = %out_file, "wrote build description");
    Ok(())
}

fn generate_makefile(
    args: &GenerateArgs,
    platform: &Platform,
    toolchain: &ToolchainInfo,
) -> Result<()> {
    let variables = settings::derive(toolchain, platform);
    let block = makefile::render_settings(&variables, &toolchain.name);
    let out_file = args
        .output
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from(format!("{}.mk", toolchain.name)));

    let text = if let Some(base) = &args.drive {
        makefile::render_driver(&block, base)
    } else {
        let template_text = if args.download {
            fetch::fetch_text(makefile::TEMPLATE_URL)?
        } else {
            let base = args
                .base
                .clone()
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_BASE_FILE));
            std::fs::read_to_string(&base)
                .with_context(|| format!("reading template '{base}'"))?
        };
        makefile::Template::parse(&template_text).render(&block)?
    };
    write_atomic(&out_file, &text)?;
    info!(path = %out_file, "wrote build description");
    Ok(())
}

/// Path the regeneration node uses to re-invoke this binary.
fn generator_path() -> Utf8PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("fwgen"))
}

/// Write the fully assembled content in one operation.
///
/// The content goes to a temporary file in the destination directory and
/// is renamed into place, so a process kill mid-write cannot leave a
/// truncated build description behind.
fn write_atomic(path: &Utf8Path, content: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in '{dir}'"))?;
    temp.write_all(content.as_bytes())
        .with_context(|| format!("writing '{path}'"))?;
    temp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("replacing '{path}'"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn generate_args(directory: &str) -> GenerateArgs {
        GenerateArgs {
            directory: directory.into(),
            output: None,
            include: None,
            base: None,
            drive: None,
            download: false,
            name: None,
            tools: Vec::new(),
        }
    }

    #[rstest]
    fn drive_and_download_conflict() {
        let mut args = generate_args("/tmp");
        args.drive = Some("Makefile".into());
        args.download = true;
        let err = preflight(&args).expect_err("conflicting options");
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[rstest]
    fn include_is_rejected_in_makefile_flavour() {
        let mut args = generate_args("/tmp");
        args.base = Some("Makefile".into());
        args.include = Some("extra.ninja".into());
        let err = preflight(&args).expect_err("include is ninja-only");
        assert!(err.to_string().contains("only applies to the ninja format"));
    }

    #[rstest]
    fn missing_root_is_rejected() {
        let args = generate_args("/no/such/dir/anywhere");
        let err = preflight(&args).expect_err("root must exist");
        assert!(err.to_string().contains("not found"));
    }

    #[rstest]
    #[case::no_equals("term")]
    #[case::empty_name("=piterm")]
    #[case::empty_command("term=")]
    fn malformed_shortcut_specs_are_rejected(#[case] spec: &str) {
        assert!(parse_shortcut(spec).is_err());
    }

    #[rstest]
    fn shortcut_spec_splits_on_first_equals() {
        let shortcut = parse_shortcut("term=piterm --baud=115200").expect("valid spec");
        assert_eq!(shortcut.name, "term");
        assert_eq!(shortcut.command, "piterm --baud=115200");
    }

    #[rstest]
    fn tilde_expands_to_home() {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"));
        if let Ok(home) = home {
            let expanded = expand_tilde(Utf8Path::new("~/toolchains")).expect("expansion");
            assert_eq!(expanded.as_str(), format!("{home}/toolchains"));
            let bare = expand_tilde(Utf8Path::new("~")).expect("expansion");
            assert_eq!(bare.as_str(), home);
        }
    }

    #[rstest]
    fn non_tilde_paths_pass_through() {
        let path = expand_tilde(Utf8Path::new("/opt/gcc")).expect("no expansion needed");
        assert_eq!(path, Utf8PathBuf::from("/opt/gcc"));
        let user = expand_tilde(Utf8Path::new("~other/gcc")).expect("literal ~user");
        assert_eq!(user, Utf8PathBuf::from("~other/gcc"));
    }
}
