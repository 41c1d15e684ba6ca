use crate::options::{DEFAULT_ENABLED, DEFAULT_FORCE, DEFAULT_PRESENT, JailOptions};
use crate::types::jail::{DesiredState, JailSettings, Normalization, SettingKey, bool_literal};
use crate::{Error, Result};

use std::path::PathBuf;

/// Caller-facing jail parameters, before normalization.
///
/// Missing optional settings are omitted from the jail file; they are never written as empty
/// strings or as a `None` literal.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[non_exhaustive]
pub struct JailParams {
    pub name: String,
    pub enabled: bool,
    pub port: Option<String>,
    pub filter: Option<String>,
    pub logpath: Option<String>,
    pub maxretry: Option<i64>,
    pub findtime: Option<String>,
    pub bantime: Option<String>,
    pub action: Option<String>,
    pub present: bool,
    /// Defaults to [`JailOptions::jail_directory`].
    pub jail_directory: Option<PathBuf>,
    pub force: bool,
}

impl Default for JailParams {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: DEFAULT_ENABLED,
            port: None,
            filter: None,
            logpath: None,
            maxretry: None,
            findtime: None,
            bantime: None,
            action: None,
            present: DEFAULT_PRESENT,
            jail_directory: None,
            force: DEFAULT_FORCE,
        }
    }
}

/// A parameter value before it is turned into its stored string form.
enum Raw<'a> {
    Bool(bool),
    Int(Option<i64>),
    Str(Option<&'a str>),
}

impl JailParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse module-style JSON arguments (feature=`json`).
    #[cfg(feature = "json")]
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input)
            .map_err(|e| Error::invalid_input(format!("invalid jail parameters: {e}")))
    }

    fn raw(&self, key: SettingKey) -> Raw<'_> {
        match key {
            SettingKey::Enabled => Raw::Bool(self.enabled),
            SettingKey::MaxRetry => Raw::Int(self.maxretry),
            SettingKey::Port => Raw::Str(self.port.as_deref()),
            SettingKey::Filter => Raw::Str(self.filter.as_deref()),
            SettingKey::LogPath => Raw::Str(self.logpath.as_deref()),
            SettingKey::FindTime => Raw::Str(self.findtime.as_deref()),
            SettingKey::BanTime => Raw::Str(self.bantime.as_deref()),
            SettingKey::Action => Raw::Str(self.action.as_deref()),
        }
    }

    /// Normalize into a [`DesiredState`], applying each key's normalization rule.
    pub fn into_desired_state(self, opts: &JailOptions) -> Result<DesiredState> {
        let mut settings = JailSettings::new(self.enabled);
        for key in SettingKey::ALL {
            let value = match (key.normalization(), self.raw(key)) {
                (Normalization::Boolean, Raw::Bool(b)) => Some(bool_literal(b).to_string()),
                (Normalization::Integer, Raw::Int(n)) => n.map(|n| n.to_string()),
                (Normalization::Passthrough, Raw::Str(s)) => s.map(str::to_string),
                _ => {
                    return Err(Error::invalid_input(format!(
                        "no normalization for setting {key}"
                    )));
                }
            };
            if let Some(value) = value {
                settings.set(key, value)?;
            }
        }

        let directory = self
            .jail_directory
            .unwrap_or_else(|| opts.jail_directory.clone());

        let mut desired = DesiredState::new(self.name, directory, settings);
        desired.present = self.present;
        desired.force = self.force;
        desired.validate(&opts.file_extension)?;
        Ok(desired)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn defaults_match_module_defaults() {
        let desired = JailParams::new("sshd")
            .into_desired_state(&JailOptions::default())
            .expect("ok");
        assert!(desired.present);
        assert!(!desired.force);
        assert_eq!(desired.directory, PathBuf::from("/etc/fail2ban/jail.d"));
        assert_eq!(desired.settings.len(), 1);
        assert_eq!(desired.settings.get(SettingKey::Enabled), Some("true"));
    }

    #[test]
    fn values_are_normalized_per_key() {
        let mut params = JailParams::new("sshd");
        params.enabled = false;
        params.maxretry = Some(5);
        params.port = Some("ssh".to_string());
        params.jail_directory = Some(PathBuf::from("/tmp/jails"));

        let desired = params
            .into_desired_state(&JailOptions::default())
            .expect("ok");
        assert_eq!(desired.directory, PathBuf::from("/tmp/jails"));
        assert_eq!(desired.settings.get(SettingKey::Enabled), Some("false"));
        assert_eq!(desired.settings.get(SettingKey::MaxRetry), Some("5"));
        assert_eq!(desired.settings.get(SettingKey::Port), Some("ssh"));
        assert_eq!(desired.settings.get(SettingKey::Filter), None);
    }

    #[test]
    fn negative_maxretry_is_kept_as_integer_string() {
        let mut params = JailParams::new("sshd");
        params.maxretry = Some(-1);
        let desired = params
            .into_desired_state(&JailOptions::default())
            .expect("ok");
        assert_eq!(desired.settings.get(SettingKey::MaxRetry), Some("-1"));
    }

    #[test]
    fn absent_maxretry_is_omitted_not_stringified() {
        let desired = JailParams::new("sshd")
            .into_desired_state(&JailOptions::default())
            .expect("ok");
        assert!(!desired.settings.as_map().contains_key("maxretry"));
        assert!(desired.settings.as_map().values().all(|v| v != "None"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut params = JailParams::new("sshd");
        params.logpath = Some("/var/log/auth.log\nbantime=0".to_string());
        let err = params
            .into_desired_state(&JailOptions::default())
            .expect_err("must fail");
        let Error::InvalidInput { .. } = err else {
            panic!("unexpected error: {err:?}");
        };

        let err = JailParams::new("")
            .into_desired_state(&JailOptions::default())
            .expect_err("must fail");
        let Error::InvalidInput { .. } = err else {
            panic!("unexpected error: {err:?}");
        };
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_arguments_fill_in_defaults() {
        let params = JailParams::from_json(r#"{"name":"sshd","maxretry":3,"present":false}"#)
            .expect("parse ok");
        assert_eq!(params.name, "sshd");
        assert_eq!(params.maxretry, Some(3));
        assert!(params.enabled);
        assert!(!params.present);
        assert!(!params.force);

        assert!(JailParams::from_json(r#"{"name":"sshd","ignoreip":"x"}"#).is_err());

        let params =
            JailParams::from_json(r#"{"name":"sshd","maxretry":-2}"#).expect("parse ok");
        assert_eq!(params.maxretry, Some(-2));
    }
}
