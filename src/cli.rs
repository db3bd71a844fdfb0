//! Command line interface definition using clap.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Generate build descriptions for an unpacked ARM cross toolchain.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available top-level commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search for a cross compiler and write a build description.
    Generate(GenerateArgs),
}

/// Arguments accepted by the `generate` command.
///
/// The default output format is a Ninja build file. Supplying any of
/// `--base`, `--drive`, or `--download` switches to the flat Makefile
/// flavour, which emits a settings block instead of a dependency graph.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Directory to search for the compiler (a leading `~` expands to home).
    #[arg(value_name = "DIR")]
    pub directory: Utf8PathBuf,

    /// Name of the generated file (default: `build.ninja`, or `<name>.mk`
    /// for the Makefile flavour).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<Utf8PathBuf>,

    /// Splice FILE after all generated declarations so that its
    /// redefinitions win (Ninja flavour only).
    #[arg(short, long, value_name = "FILE")]
    pub include: Option<Utf8PathBuf>,

    /// Render the full Makefile from the template at FILE (default: `Makefile`).
    #[arg(long, value_name = "FILE")]
    pub base: Option<Utf8PathBuf>,

    /// Write a settings-only driver file that includes FILE instead of
    /// rendering a full Makefile.
    #[arg(long, value_name = "FILE")]
    pub drive: Option<Utf8PathBuf>,

    /// Download the Makefile template instead of reading it locally.
    #[arg(long)]
    pub download: bool,

    /// Override the toolchain display name derived from its install directory.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Add a shortcut target wrapping COMMAND in a small invocable stub
    /// (repeatable; Ninja flavour only).
    #[arg(short = 't', long = "tool", value_name = "NAME=COMMAND")]
    pub tools: Vec<String>,
}
