use crate::options::JailOptions;
use crate::ownership::OwnershipChecker;
use crate::types::jail::{JailSettings, StoredConfiguration};
use crate::{Error, Result, util};

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Reads and writes single-section jail files prefixed by the managed marker.
#[derive(Clone, Debug)]
pub struct JailCodec {
    checker: OwnershipChecker,
    file_extension: String,
}

impl Default for JailCodec {
    fn default() -> Self {
        Self::from_options(&JailOptions::default())
    }
}

impl JailCodec {
    /// Build a codec from validated options (see [`JailOptions::validate`]).
    pub fn new(opts: &JailOptions) -> Result<Self> {
        opts.validate()?;
        Ok(Self::from_options(opts))
    }

    fn from_options(opts: &JailOptions) -> Self {
        Self {
            checker: OwnershipChecker::new(opts.managed_marker.clone()),
            file_extension: opts.file_extension.clone(),
        }
    }

    /// `<directory>/<name>.<extension>`. No I/O.
    pub fn path_for(&self, name: &str, directory: &Path) -> PathBuf {
        directory.join(format!("{name}.{}", self.file_extension))
    }

    /// Render the file contents: marker line, section header, then settings in canonical order.
    pub fn render(&self, name: &str, settings: &JailSettings) -> Result<String> {
        util::validate_jail_name(name, &self.file_extension)?;

        let mut out = String::new();
        out.push_str(self.checker.marker());
        out.push('\n');
        out.push('[');
        out.push_str(name);
        out.push_str("]\n");

        for (key, value) in settings.iter() {
            util::validate_setting_value(key.as_str(), value)?;
            out.push_str(key.as_str());
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }

        Ok(out)
    }

    /// Parse the text of a jail file into its single section.
    pub fn parse(&self, text: &str) -> Result<StoredConfiguration> {
        let mut sections: Vec<StoredConfiguration> = Vec::new();
        // Key of the last entry and the indentation of its line.
        let mut last_key: Option<(String, usize)> = None;

        for (idx, raw) in text.lines().enumerate() {
            let lineno = idx + 1;
            let line = raw.trim();

            if line.is_empty() {
                last_key = None;
                continue;
            }
            if line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            let indent = raw.len() - raw.trim_start().len();
            if let Some((key, key_indent)) = &last_key
                && indent > *key_indent
                && let Some(section) = sections.last_mut()
                && let Some(value) = section.settings.get_mut(key)
            {
                value.push('\n');
                value.push_str(line);
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let Some(header) = rest.strip_suffix(']') else {
                    return Err(Error::parse_error(
                        format!("line {lineno}: unterminated section header"),
                        raw,
                    ));
                };
                if header.is_empty() {
                    return Err(Error::parse_error(
                        format!("line {lineno}: empty section header"),
                        raw,
                    ));
                }
                if header == "DEFAULT" {
                    return Err(Error::parse_error(
                        format!("line {lineno}: DEFAULT section is not supported"),
                        raw,
                    ));
                }
                if sections.iter().any(|s| s.section_name == header) {
                    return Err(Error::parse_error(
                        format!("line {lineno}: duplicate section {header}"),
                        raw,
                    ));
                }
                sections.push(StoredConfiguration::new(header, BTreeMap::new()));
                last_key = None;
                continue;
            }

            let Some(section) = sections.last_mut() else {
                return Err(Error::parse_error(
                    format!("line {lineno}: entry outside of any section"),
                    raw,
                ));
            };
            let Some(split) = line.find(['=', ':']) else {
                return Err(Error::parse_error(
                    format!("line {lineno}: expected key=value"),
                    raw,
                ));
            };
            let key = line[..split].trim().to_lowercase();
            let value = line[split + 1..].trim();
            if key.is_empty() {
                return Err(Error::parse_error(
                    format!("line {lineno}: empty key"),
                    raw,
                ));
            }
            if section.settings.contains_key(&key) {
                return Err(Error::parse_error(
                    format!("line {lineno}: duplicate key {key}"),
                    raw,
                ));
            }
            section.settings.insert(key.clone(), value.to_string());
            last_key = Some((key, indent));
        }

        if sections.len() > 1 {
            let names = sections
                .iter()
                .map(|s| s.section_name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::parse_error(
                "cannot parse config with multiple sections",
                names,
            ));
        }
        sections.pop().ok_or_else(|| {
            Error::parse_error("config file does not contain any sections", text)
        })
    }

    /// Read the jail file at `path`. Ownership is not checked here.
    pub fn read(&self, path: &Path) -> Result<StoredConfiguration> {
        let bytes = fs::read(path).map_err(|e| Error::from_read_io("read jail file", path, e))?;
        let text = String::from_utf8(bytes).map_err(|e| {
            Error::parse_error(
                format!("{} is not valid UTF-8", path.to_string_lossy()),
                String::from_utf8_lossy(e.as_bytes()),
            )
        })?;

        #[cfg(feature = "tracing")]
        tracing::debug!(path = %path.display(), bytes = text.len(), "read jail file");

        self.parse(&text)
    }

    /// Replace the whole file at `path` with `settings` under section `name`.
    ///
    /// The parent directory must exist. The written file is re-checked for the marker; a file
    /// that fails the check is reported as `Error::Integrity`.
    pub fn write(&self, name: &str, settings: &JailSettings, path: &Path) -> Result<()> {
        let contents = self.render(name, settings)?;

        atomic_write(path, contents.as_bytes())
            .map_err(|e| Error::from_io("write jail file", path, e))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(path = %path.display(), name = %name, keys = settings.len(), "wrote jail file");

        if !self.checker.is_owned(path)? {
            #[cfg(feature = "tracing")]
            tracing::error!(path = %path.display(), "written jail file lacks the managed marker");
            return Err(Error::Integrity {
                path: path.to_string_lossy().into_owned(),
            });
        }
        Ok(())
    }

    /// Delete the file at `path`. Returns whether a file was removed.
    pub fn remove(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(path = %path.display(), "removed jail file");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::from_io("remove jail file", path, e)),
        }
    }
}

fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;

    let tmp_path = loop {
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let candidate = dir.join(format!(
            ".{}.tmp-{}-{}",
            path.file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("jail.conf"),
            std::process::id(),
            n
        ));
        if !candidate.exists() {
            break candidate;
        }
    };

    let result = write_and_rename(path, &tmp_path, contents);
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result?;
    fsync_dir(dir)
}

fn write_and_rename(path: &Path, tmp_path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(tmp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;

    match fs::metadata(path) {
        Ok(meta) => fs::set_permissions(tmp_path, meta.permissions())?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    fs::rename(tmp_path, path)
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) -> io::Result<()> {
    let f = fs::File::open(dir)?;
    f.sync_all()
}

#[cfg(not(unix))]
fn fsync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
