//! jailconf reconciles a single fail2ban jail file (`<jail.d>/<name>.conf`) against a desired
//! state: create it when missing, rewrite it when it differs, delete it when the jail should be
//! absent, and refuse to touch any file it did not write itself.
//!
//! Ownership is tracked with a marker line: every file this crate writes starts with
//! `# Managed by Ansible`. A file without that exact first line is foreign and is only modified
//! when `force` is set.
//!
//! ## Quick start
//! ```no_run
//! use jailconf::{JailParams, Reconciler};
//!
//! fn ensure_sshd() -> Result<(), jailconf::Error> {
//!     let mut params = JailParams::new("sshd");
//!     params.port = Some("ssh".to_string());
//!     params.maxretry = Some(3);
//!
//!     let outcome = Reconciler::default().apply(params, false)?;
//!     println!("changed={} action={:?}", outcome.changed, outcome.action);
//!     Ok(())
//! }
//! ```
//!
//! ## File format
//! ```text
//! # Managed by Ansible
//! [sshd]
//! enabled=true
//! port=ssh
//! maxretry=3
//! ```
//! Keys are written in a fixed order (`enabled`, `port`, `filter`, `logpath`, `maxretry`,
//! `findtime`, `bantime`, `action`); unset keys are omitted. Comparison with the file on disk
//! is by exact string equality and ignores key order.
//!
//! ## Failures
//! - Unmanaged or unreadable files produce a `ReconcileOutcome` with `succeeded == false`.
//! - I/O failures are returned as `Err(Error::IoError | Error::PermissionDenied)`.
//! - `Error::Integrity` means a freshly written file does not start with the marker.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::dbg_macro)]

mod codec;
mod error;
mod options;
mod ownership;
mod params;
mod reconcile;
mod types;
mod util;

pub use crate::codec::JailCodec;
pub use crate::error::{Error, Result};
pub use crate::options::{
    DEFAULT_ENABLED, DEFAULT_FORCE, DEFAULT_JAIL_DIRECTORY, DEFAULT_PRESENT, FILE_EXTENSION,
    JailOptions, MANAGED_MARKER,
};
pub use crate::ownership::OwnershipChecker;
pub use crate::params::JailParams;
pub use crate::reconcile::Reconciler;
pub use crate::types::jail::{
    DesiredState, JailSettings, Normalization, SettingKey, StoredConfiguration,
};
pub use crate::types::outcome::{Action, FailureKind, ReconcileOutcome};
