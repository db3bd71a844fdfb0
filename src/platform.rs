//! Host platform capability detection.

use camino::Utf8PathBuf;

/// Mount point whose presence signals a POSIX compatibility layer on an
/// otherwise Windows-style filesystem.
pub const DEFAULT_COMPAT_PROBE: &str = "/cygdrive";

/// Capability view of the host platform.
///
/// The compatibility probe is plain configuration rather than a hard-wired
/// path so that tests (and unusual installs) can point it elsewhere.
#[derive(Debug, Clone)]
pub struct Platform {
    windows: bool,
    compat_probe: Utf8PathBuf,
}

impl Platform {
    /// Capabilities of the machine fwgen is running on.
    #[must_use]
    pub fn host() -> Self {
        Self::new(cfg!(windows), DEFAULT_COMPAT_PROBE)
    }

    /// Build a platform description with an explicit probe location.
    #[must_use]
    pub fn new(windows: bool, compat_probe: impl Into<Utf8PathBuf>) -> Self {
        Self {
            windows,
            compat_probe: compat_probe.into(),
        }
    }

    /// Whether a POSIX emulation mount point is present.
    #[must_use]
    pub fn has_compat_layer(&self) -> bool {
        self.compat_probe.exists()
    }

    /// Whether generated commands may assume a POSIX-like shell.
    #[must_use]
    pub fn is_posix_shell(&self) -> bool {
        !self.windows || self.has_compat_layer()
    }
}
