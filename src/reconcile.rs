use crate::codec::JailCodec;
use crate::options::JailOptions;
use crate::ownership::OwnershipChecker;
use crate::params::JailParams;
use crate::types::jail::DesiredState;
use crate::types::outcome::{Action, FailureKind, ReconcileOutcome};
use crate::{Error, Result};

/// Converges a jail file on disk towards a [`DesiredState`].
///
/// Each call is a single shot: check ownership, read, compare, then create, update, delete or
/// leave the file alone. Nothing is retried.
#[derive(Clone, Debug)]
pub struct Reconciler {
    opts: JailOptions,
    ownership: OwnershipChecker,
    codec: JailCodec,
}

impl Default for Reconciler {
    fn default() -> Self {
        let opts = JailOptions::default();
        Self {
            ownership: OwnershipChecker::new(opts.managed_marker.clone()),
            codec: JailCodec::default(),
            opts,
        }
    }
}

impl Reconciler {
    /// Build a reconciler; fails with `Error::InvalidInput` when the options are unusable.
    pub fn new(opts: JailOptions) -> Result<Self> {
        let codec = JailCodec::new(&opts)?;
        Ok(Self {
            ownership: OwnershipChecker::new(opts.managed_marker.clone()),
            codec,
            opts,
        })
    }

    pub fn options(&self) -> &JailOptions {
        &self.opts
    }

    pub fn codec(&self) -> &JailCodec {
        &self.codec
    }

    /// Bind caller parameters and reconcile them.
    pub fn apply(&self, params: JailParams, dry_run: bool) -> Result<ReconcileOutcome> {
        let desired = params.into_desired_state(&self.opts)?;
        self.reconcile(&desired, dry_run)
    }

    /// Reconcile the file for `desired`, without touching the filesystem when `dry_run` is set.
    ///
    /// An unmanaged file (without `force`) and an unreadable managed file (without `force`) are
    /// reported as a failed outcome. I/O failures and integrity defects are returned as `Err`.
    pub fn reconcile(&self, desired: &DesiredState, dry_run: bool) -> Result<ReconcileOutcome> {
        desired.validate(&self.opts.file_extension)?;

        let path = self.codec.path_for(&desired.name, &desired.directory);
        let configuration = desired.settings.as_map().clone();
        let exists = path
            .try_exists()
            .map_err(|e| Error::from_io("stat jail file", &path, e))?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            name = %desired.name,
            path = %path.display(),
            present = desired.present,
            force = desired.force,
            dry_run,
            exists,
            "reconcile jail"
        );

        let owned = if exists {
            self.ownership.is_owned(&path)?
        } else {
            true
        };

        if !owned {
            if !desired.force {
                let message = Error::UnmanagedFile {
                    path: path.to_string_lossy().into_owned(),
                }
                .to_string();

                #[cfg(feature = "tracing")]
                tracing::warn!(path = %path.display(), "refusing to touch unmanaged jail file");

                return Ok(ReconcileOutcome::refused(
                    path,
                    configuration,
                    FailureKind::UnmanagedFile,
                    message,
                ));
            }

            #[cfg(feature = "tracing")]
            tracing::warn!(path = %path.display(), "taking over unmanaged jail file (force)");
        }

        if !desired.present {
            if exists && !dry_run {
                self.codec.remove(&path)?;
            }
            let action = if exists { Action::Delete } else { Action::None };
            return Ok(self.finish(ReconcileOutcome::done(path, configuration, action, None)));
        }

        if !exists {
            if !dry_run {
                self.codec.write(&desired.name, &desired.settings, &path)?;
            }
            return Ok(self.finish(ReconcileOutcome::done(
                path,
                configuration,
                Action::Create,
                None,
            )));
        }

        let current = match self.codec.read(&path) {
            Ok(current) => Some(current),
            Err(Error::ParseError { context, .. }) => {
                if !desired.force {
                    let message = format!(
                        "cannot read configuration file (set `force` to overwrite without reading): {}: {context}",
                        path.to_string_lossy()
                    );

                    #[cfg(feature = "tracing")]
                    tracing::warn!(path = %path.display(), %context, "unreadable jail file");

                    return Ok(ReconcileOutcome::refused(
                        path,
                        configuration,
                        FailureKind::Unreadable,
                        message,
                    ));
                }

                #[cfg(feature = "tracing")]
                tracing::warn!(path = %path.display(), %context, "overwriting unreadable jail file (force)");

                None
            }
            Err(e) => return Err(e),
        };

        if owned
            && let Some(current) = &current
            && current.matches(&desired.name, &desired.settings)
        {
            return Ok(self.finish(ReconcileOutcome::done(
                path,
                configuration,
                Action::None,
                None,
            )));
        }

        if !dry_run {
            self.codec.write(&desired.name, &desired.settings, &path)?;
        }
        Ok(self.finish(ReconcileOutcome::done(
            path,
            configuration,
            Action::Update,
            current,
        )))
    }

    fn finish(&self, outcome: ReconcileOutcome) -> ReconcileOutcome {
        #[cfg(feature = "tracing")]
        tracing::info!(
            path = %outcome.path.display(),
            action = outcome.action.as_str(),
            changed = outcome.changed,
            "reconcile jail done"
        );
        outcome
    }
}
