use crate::{Error, Result, util};

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A setting key recognized in a jail section.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum SettingKey {
    Enabled,
    Port,
    Filter,
    LogPath,
    MaxRetry,
    FindTime,
    BanTime,
    Action,
}

/// How a caller-supplied parameter becomes the string stored in the file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Normalization {
    /// `true`/`false` literals.
    Boolean,
    /// Decimal integer string.
    Integer,
    /// Opaque string, stored as given.
    Passthrough,
}

impl SettingKey {
    /// All recognized keys, in the order they are written to disk.
    pub const ALL: [SettingKey; 8] = [
        SettingKey::Enabled,
        SettingKey::Port,
        SettingKey::Filter,
        SettingKey::LogPath,
        SettingKey::MaxRetry,
        SettingKey::FindTime,
        SettingKey::BanTime,
        SettingKey::Action,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Enabled => "enabled",
            SettingKey::Port => "port",
            SettingKey::Filter => "filter",
            SettingKey::LogPath => "logpath",
            SettingKey::MaxRetry => "maxretry",
            SettingKey::FindTime => "findtime",
            SettingKey::BanTime => "bantime",
            SettingKey::Action => "action",
        }
    }

    pub fn normalization(&self) -> Normalization {
        match self {
            SettingKey::Enabled => Normalization::Boolean,
            SettingKey::MaxRetry => Normalization::Integer,
            _ => Normalization::Passthrough,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SettingKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::invalid_input(format!("unrecognized setting key: {s}")))
    }
}

pub(crate) fn bool_literal(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn is_integer_literal(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Settings of a single jail, keyed by recognized setting keys.
///
/// `enabled` is always present. Unset keys are absent from the map; they are never stored as
/// empty strings.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct JailSettings {
    values: BTreeMap<String, String>,
}

impl Default for JailSettings {
    fn default() -> Self {
        Self::new(crate::options::DEFAULT_ENABLED)
    }
}

impl JailSettings {
    pub fn new(enabled: bool) -> Self {
        let mut values = BTreeMap::new();
        values.insert(
            SettingKey::Enabled.as_str().to_string(),
            bool_literal(enabled).to_string(),
        );
        Self { values }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.values.insert(
            SettingKey::Enabled.as_str().to_string(),
            bool_literal(enabled).to_string(),
        );
    }

    /// Set `key` to an already-normalized string value.
    pub fn set(&mut self, key: SettingKey, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        util::validate_setting_value(key.as_str(), &value)?;
        match key.normalization() {
            Normalization::Boolean if value != "true" && value != "false" => {
                return Err(Error::invalid_input(format!(
                    "{key} must be \"true\" or \"false\", got {value:?}"
                )));
            }
            Normalization::Integer if !is_integer_literal(&value) => {
                return Err(Error::invalid_input(format!(
                    "{key} must be an integer, got {value:?}"
                )));
            }
            _ => {}
        }
        self.values.insert(key.as_str().to_string(), value);
        Ok(())
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: SettingKey, value: impl Into<String>) -> Result<Self> {
        self.set(key, value)?;
        Ok(self)
    }

    /// Remove `key`. `enabled` cannot be removed.
    pub fn unset(&mut self, key: SettingKey) -> Result<Option<String>> {
        if key == SettingKey::Enabled {
            return Err(Error::invalid_input("enabled cannot be unset"));
        }
        Ok(self.values.remove(key.as_str()))
    }

    pub fn get(&self, key: SettingKey) -> Option<&str> {
        self.values.get(key.as_str()).map(String::as_str)
    }

    pub fn enabled(&self) -> bool {
        self.get(SettingKey::Enabled) == Some("true")
    }

    /// Set entries in on-disk order.
    pub fn iter(&self) -> impl Iterator<Item = (SettingKey, &str)> {
        SettingKey::ALL
            .into_iter()
            .filter_map(|k| self.get(k).map(|v| (k, v)))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Plain string view, directly comparable with what the codec reads back.
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

/// Desired state of one jail file, built by the caller once per invocation.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct DesiredState {
    /// Jail name; used as the section header and to derive the file name.
    pub name: String,
    /// Whether the jail file should exist.
    pub present: bool,
    /// Settings written when `present` is set.
    pub settings: JailSettings,
    /// Act on files without the managed marker, and overwrite unreadable files.
    pub force: bool,
    /// Directory holding the jail file.
    pub directory: PathBuf,
}

impl DesiredState {
    /// A present, non-forced jail with the given settings.
    pub fn new(
        name: impl Into<String>,
        directory: impl Into<PathBuf>,
        settings: JailSettings,
    ) -> Self {
        Self {
            name: name.into(),
            present: crate::options::DEFAULT_PRESENT,
            settings,
            force: crate::options::DEFAULT_FORCE,
            directory: directory.into(),
        }
    }

    /// A jail that should not exist.
    pub fn absent(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            present: false,
            ..Self::new(name, directory, JailSettings::default())
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub(crate) fn validate(&self, file_extension: &str) -> Result<()> {
        util::validate_jail_name(&self.name, file_extension)?;
        for (key, value) in self.settings.iter() {
            util::validate_setting_value(key.as_str(), value)?;
        }
        Ok(())
    }
}

/// A jail section as read back from disk. Values are stored literally, without type coercion.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct StoredConfiguration {
    /// Header of the only section in the file.
    pub section_name: String,
    /// Key/value pairs of that section (keys lower-cased).
    pub settings: BTreeMap<String, String>,
}

impl StoredConfiguration {
    pub fn new(section_name: impl Into<String>, settings: BTreeMap<String, String>) -> Self {
        Self {
            section_name: section_name.into(),
            settings,
        }
    }

    /// Exact structural equality with the desired name and settings.
    pub fn matches(&self, name: &str, settings: &JailSettings) -> bool {
        self.section_name == name && &self.settings == settings.as_map()
    }
}
