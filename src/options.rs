use crate::{Result, util};

use std::path::PathBuf;

/// First line of every file this crate writes. Files without it are treated as foreign.
pub const MANAGED_MARKER: &str = "# Managed by Ansible";

/// Extension of jail files (without the leading dot).
pub const FILE_EXTENSION: &str = "conf";

/// Directory holding fail2ban jail drop-ins on most distributions.
pub const DEFAULT_JAIL_DIRECTORY: &str = "/etc/fail2ban/jail.d";

/// Default for `enabled` when the caller does not set it.
pub const DEFAULT_ENABLED: bool = true;

/// Default for `present` when the caller does not set it.
pub const DEFAULT_PRESENT: bool = true;

/// Default for `force` when the caller does not set it.
pub const DEFAULT_FORCE: bool = false;

/// Configuration options shared by the ownership checker, the codec and the reconciler.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct JailOptions {
    /// Directory used when the caller does not supply one.
    ///
    /// Default: `/etc/fail2ban/jail.d`.
    pub jail_directory: PathBuf,

    /// Ownership marker line written as the first line of every managed file.
    pub managed_marker: String,

    /// File extension (without the leading dot).
    pub file_extension: String,
}

impl Default for JailOptions {
    fn default() -> Self {
        Self {
            jail_directory: PathBuf::from(DEFAULT_JAIL_DIRECTORY),
            managed_marker: MANAGED_MARKER.to_string(),
            file_extension: FILE_EXTENSION.to_string(),
        }
    }
}

impl JailOptions {
    /// Check that the marker is a single comment line without trailing whitespace and that the
    /// extension is a plain suffix.
    ///
    /// Any other marker could not be read back: it would either never match the ownership
    /// check or break parsing of the file it heads.
    pub fn validate(&self) -> Result<()> {
        util::validate_marker(&self.managed_marker)?;
        util::validate_file_extension(&self.file_extension)
    }

    /// Default options with a different jail directory.
    pub fn with_jail_directory(jail_directory: impl Into<PathBuf>) -> Self {
        Self {
            jail_directory: jail_directory.into(),
            ..Self::default()
        }
    }
}
