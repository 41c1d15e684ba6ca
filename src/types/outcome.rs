use crate::types::jail::StoredConfiguration;

use std::collections::BTreeMap;
use std::path::PathBuf;

/// The minimal filesystem action a reconciliation decided on.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[non_exhaustive]
pub enum Action {
    #[default]
    None,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::None => "none",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// Why a reconciliation refused to act.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum FailureKind {
    /// The file exists without the managed marker and `force` was not set.
    UnmanagedFile,
    /// The file is managed but could not be parsed, and `force` was not set.
    Unreadable,
}

/// Result of a single reconciliation.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct ReconcileOutcome {
    pub succeeded: bool,
    /// Whether a write or delete happened (or would happen, in dry-run).
    pub changed: bool,
    pub action: Action,
    /// Content that an update replaced (or would replace).
    pub previous: Option<StoredConfiguration>,
    /// Explanation, set only on failure.
    pub message: Option<String>,
    pub failure: Option<FailureKind>,
    /// Jail file the reconciliation targeted.
    pub path: PathBuf,
    /// Desired settings, echoed back for reporting.
    pub configuration: BTreeMap<String, String>,
}

impl ReconcileOutcome {
    pub(crate) fn done(
        path: PathBuf,
        configuration: BTreeMap<String, String>,
        action: Action,
        previous: Option<StoredConfiguration>,
    ) -> Self {
        Self {
            succeeded: true,
            changed: action != Action::None,
            action,
            previous,
            message: None,
            failure: None,
            path,
            configuration,
        }
    }

    pub(crate) fn refused(
        path: PathBuf,
        configuration: BTreeMap<String, String>,
        failure: FailureKind,
        message: String,
    ) -> Self {
        Self {
            succeeded: false,
            changed: false,
            action: Action::None,
            previous: None,
            message: Some(message),
            failure: Some(failure),
            path,
            configuration,
        }
    }

    /// Render the module-style JSON report (`changed`, `msg`, `previous_configuration`,
    /// `configuration`).
    #[cfg(feature = "json")]
    pub fn to_json(&self) -> crate::Result<String> {
        #[derive(serde::Serialize)]
        struct Report<'a> {
            changed: bool,
            failed: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            msg: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            previous_configuration: Option<&'a BTreeMap<String, String>>,
            configuration: &'a BTreeMap<String, String>,
            path: String,
        }

        // An update over an unreadable file replaced nothing that could be read.
        let unread = BTreeMap::new();
        let previous_configuration = match (&self.previous, self.action) {
            (Some(previous), _) => Some(&previous.settings),
            (None, Action::Update) => Some(&unread),
            (None, _) => None,
        };

        let report = Report {
            changed: self.changed,
            failed: !self.succeeded,
            msg: self.message.as_deref(),
            previous_configuration,
            configuration: &self.configuration,
            path: self.path.to_string_lossy().into_owned(),
        };
        serde_json::to_string(&report).map_err(|e| crate::Error::IoError {
            context: format!("serialize report: {e}"),
        })
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn report(outcome: &ReconcileOutcome) -> serde_json::Value {
        serde_json::from_str(&outcome.to_json().expect("json")).expect("valid json")
    }

    #[test]
    fn forced_update_over_unreadable_file_reports_empty_previous() {
        let mut configuration = BTreeMap::new();
        configuration.insert("enabled".to_string(), "true".to_string());
        let outcome = ReconcileOutcome::done(
            PathBuf::from("/tmp/sshd.conf"),
            configuration,
            Action::Update,
            None,
        );
        let report = report(&outcome);
        assert_eq!(report["previous_configuration"], serde_json::json!({}));
        assert_eq!(report["changed"], true);
    }

    #[test]
    fn create_and_refusal_omit_previous() {
        let created = ReconcileOutcome::done(
            PathBuf::from("/tmp/sshd.conf"),
            BTreeMap::new(),
            Action::Create,
            None,
        );
        assert!(report(&created).get("previous_configuration").is_none());

        let refused = ReconcileOutcome::refused(
            PathBuf::from("/tmp/sshd.conf"),
            BTreeMap::new(),
            FailureKind::UnmanagedFile,
            "not managed".to_string(),
        );
        let report = report(&refused);
        assert!(report.get("previous_configuration").is_none());
        assert_eq!(report["failed"], true);
        assert_eq!(report["msg"], "not managed");
    }
}
