//! Cross-compiler discovery.
//!
//! This module walks a directory subtree looking for an executable whose
//! filename matches the `arm-*-gcc*` naming convention and derives the
//! facts about the toolchain install that every later stage depends on.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Filenames must start with this to be considered a compiler candidate.
const COMPILER_NAME_PREFIX: &str = "arm-";
/// The remainder of a candidate filename must contain this token.
const COMPILER_NAME_TOKEN: &str = "-gcc";
/// Target-triple suffix token used to split the binary-name prefix.
const TRIPLE_TOKEN: &str = "eabi";
/// Hard-float triples append this directly to the triple token.
const HARD_FLOAT_SUFFIX: &str = "hf";

/// Errors raised while locating a toolchain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocateError {
    /// No filename under the search root matched the compiler pattern.
    #[error("no 'arm-*-gcc*' compiler found under '{root}'")]
    NotFound {
        /// The subtree that was searched.
        root: Utf8PathBuf,
    },

    /// A candidate matched the pattern but its name carries no triple token.
    #[error("compiler name '{name}' does not contain the '{TRIPLE_TOKEN}' triple token")]
    UnrecognisedName {
        /// Filename of the rejected candidate.
        name: String,
    },

    /// The matched file has no enclosing `bin` directory and install root.
    #[error("compiler path '{path}' has no enclosing bin directory")]
    NoRoot {
        /// Path of the rejected candidate.
        path: Utf8PathBuf,
    },
}

/// Ordering policy applied while walking the search subtree.
///
/// Directory enumeration order is platform-dependent. When several
/// candidates exist the first one seen wins, so the order is observable;
/// [`TraversalOrder::Lexicographic`] makes it deterministic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraversalOrder {
    /// Whatever order the filesystem enumerates entries in.
    #[default]
    Filesystem,
    /// Entries sorted by file name at every level.
    Lexicographic,
}

/// Knobs for the discovery traversal.
#[derive(Debug, Clone)]
pub struct LocateOptions {
    /// Ordering policy for directory enumeration.
    pub order: TraversalOrder,
    /// Hard bound on traversal depth.
    pub max_depth: usize,
    /// Follow symlinks while walking. Loops are detected and skipped.
    pub follow_links: bool,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            order: TraversalOrder::Filesystem,
            max_depth: 128,
            follow_links: true,
        }
    }
}

/// Facts derived from the located compiler, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainInfo {
    /// Top-level install directory (the parent of `bin`).
    pub root: Utf8PathBuf,
    /// Directory holding the toolchain executables.
    pub bin_dir: Utf8PathBuf,
    /// Binary-name prefix through the last triple token, e.g. `arm-none-eabi`.
    pub prefix: String,
    /// Whether the executables carry a `.exe`-style suffix.
    pub has_exe_suffix: bool,
    /// Display name, the last segment of the install root unless overridden.
    pub name: String,
}

/// Check a filename against the compiler naming pattern.
///
/// The pattern means "starts with `arm-`, ends with something containing
/// `gcc`". It is an exact filename test, never a substring-of-path test.
#[must_use]
pub fn is_compiler_name(name: &str) -> bool {
    name.strip_prefix(COMPILER_NAME_PREFIX)
        .is_some_and(|rest| rest.contains(COMPILER_NAME_TOKEN))
}

/// Walk the subtree under `root` and return the first matching compiler.
///
/// Unreadable entries and symlink loops are skipped rather than aborting
/// the search. When multiple candidates share a directory the first one in
/// enumeration order wins; see [`TraversalOrder`]. The walk is preorder, so
/// a candidate inside an earlier-enumerated subdirectory wins over one
/// sitting beside that subdirectory.
///
/// # Errors
///
/// Returns [`LocateError::NotFound`] when no filename under `root` matches.
pub fn locate(root: &Utf8Path, options: &LocateOptions) -> Result<Utf8PathBuf, LocateError> {
    let mut walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .max_depth(options.max_depth);
    if options.order == TraversalOrder::Lexicographic {
        walker = walker.sort_by_file_name();
    }
    for walk_entry in walker {
        let entry = match walk_entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(%err, "skipping unreadable entry during compiler search");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if is_compiler_name(name) {
            if let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) {
                tracing::debug!(compiler = %path, "compiler candidate matched");
                return Ok(path);
            }
        }
    }
    Err(LocateError::NotFound {
        root: root.to_owned(),
    })
}

impl ToolchainInfo {
    /// Derive toolchain facts from the path of a matched compiler.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::NoRoot`] when the path lacks an enclosing
    /// `bin` directory, and [`LocateError::UnrecognisedName`] when the
    /// filename carries no `eabi` triple token to split the prefix on.
    pub fn from_compiler(
        compiler: &Utf8Path,
        name_override: Option<&str>,
    ) -> Result<Self, LocateError> {
        let no_root = || LocateError::NoRoot {
            path: compiler.to_owned(),
        };
        let file = compiler.file_name().ok_or_else(no_root)?;
        let bin_dir = compiler.parent().ok_or_else(no_root)?;
        let root = bin_dir
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .ok_or_else(no_root)?;

        let token_at = file.rfind(TRIPLE_TOKEN).ok_or_else(|| {
            LocateError::UnrecognisedName {
                name: file.to_owned(),
            }
        })?;
        let mut prefix_end = token_at + TRIPLE_TOKEN.len();
        // `arm-linux-gnueabihf-gcc` style names keep the hard-float marker,
        // otherwise the derived tool paths point at nonexistent binaries.
        if file[prefix_end..].starts_with(HARD_FLOAT_SUFFIX) {
            prefix_end += HARD_FLOAT_SUFFIX.len();
        }
        let prefix = file[..prefix_end].to_owned();

        let name = name_override.map_or_else(
            || root.file_name().unwrap_or("toolchain").to_owned(),
            str::to_owned,
        );
        Ok(Self {
            root: root.to_owned(),
            bin_dir: bin_dir.to_owned(),
            prefix,
            has_exe_suffix: file.contains(".exe"),
            name,
        })
    }
}
