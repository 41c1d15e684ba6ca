use crate::{Error, Result};

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Decides whether a jail file was produced by this crate by looking at its first line.
#[derive(Clone, Debug)]
pub struct OwnershipChecker {
    marker: String,
}

impl OwnershipChecker {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Whether the first line of `path`, minus trailing whitespace, equals the marker.
    ///
    /// Returns `Error::NotFound` if `path` does not exist; callers check existence first.
    pub fn is_owned(&self, path: &Path) -> Result<bool> {
        let file =
            fs::File::open(path).map_err(|e| Error::from_read_io("open jail file", path, e))?;
        let mut first = Vec::new();
        BufReader::new(file)
            .read_until(b'\n', &mut first)
            .map_err(|e| Error::from_io("read jail file", path, e))?;

        let end = first
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(0, |i| i + 1);
        let owned = &first[..end] == self.marker.as_bytes();

        #[cfg(feature = "tracing")]
        tracing::debug!(path = %path.display(), owned, "ownership check");

        Ok(owned)
    }
}
