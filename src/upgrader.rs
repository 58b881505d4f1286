use anyhow::Result;
use log::{debug, error, info, warn};

use crate::{
    error::UpgradeError, migrator::Migrator, outcome::Resolution, persistor::Persistor,
    version::Version,
};

/// Walks a stored version forward to the newest version the migrator knows.
///
/// Only one run may write to a given store at a time. For a
/// [`FilePersistor`](crate::persistor::FilePersistor) that means the whole
/// store file, not just the slot. Nothing here locks it; that is up to the
/// caller.
pub struct Upgrader<M: Migrator, P: Persistor> {
    pub migrator: M,
    pub persistor: P,
}

impl<M: Migrator, P: Persistor> Upgrader<M, P> {
    pub fn new(migrator: M, persistor: P) -> Self {
        Self {
            migrator,
            persistor,
        }
    }

    pub fn current(&self) -> Result<Version> {
        self.persistor.current()
    }

    pub fn is_up_to_date(&self) -> Result<bool> {
        Ok(!self.migrator.exists(self.current()?.successor()))
    }

    /// Versions a run would go through from the stored version, assuming no
    /// action jumps ahead.
    pub fn pending(&self) -> Result<Vec<Version>> {
        let mut pending = Vec::new();
        let mut current = self.current()?;
        loop {
            let next = current.successor();
            if next == current || !self.migrator.exists(next) {
                break;
            }
            pending.push(next);
            current = next;
        }
        Ok(pending)
    }

    /// Runs every outstanding migration in order.
    ///
    /// Each version is committed as soon as its action returns without a
    /// fatal error. On success the final committed version is returned.
    pub fn run(&self) -> Result<Version, UpgradeError<M::Error>> {
        let mut current = self
            .persistor
            .current()
            .map_err(|reason| UpgradeError::Load { reason })?;
        let start = current;
        let mut accumulated = Vec::new();

        loop {
            let pending = current.successor();
            if pending == current || !self.migrator.exists(pending) {
                break;
            }

            debug!(version = pending.get(); "Running migration step");
            let Resolution {
                fatal,
                non_fatal,
                redirect,
            } = self.migrator.migrate(pending).resolve();

            if !non_fatal.is_empty() {
                warn!(
                    version = pending.get(), count = non_fatal.len();
                    "Migration step reported non-fatal errors"
                );
            }
            accumulated.extend(non_fatal);

            if !fatal.is_empty() {
                error!(
                    version = pending.get(), count = fatal.len();
                    "Migration step failed, upgrade canceled"
                );
                return Err(UpgradeError::Canceled {
                    at_version: pending,
                    fatal_errors: fatal,
                    non_fatal_errors: accumulated,
                });
            }

            let reached = match redirect {
                Some(target) if target < pending => {
                    error!(
                        version = pending.get(), target = target.get();
                        "Migration step requested a backward jump"
                    );
                    return Err(UpgradeError::InvalidJump {
                        at_version: pending,
                        target,
                        non_fatal_errors: accumulated,
                    });
                }
                Some(target) => {
                    if target != pending {
                        info!(version = pending.get(), target = target.get(); "Jumping ahead");
                    }
                    target
                }
                None => pending,
            };

            if let Err(reason) = self.persistor.save(reached) {
                error!(
                    version = pending.get(), target = reached.get();
                    "Cannot commit version, upgrade canceled"
                );
                return Err(UpgradeError::Commit {
                    at_version: pending,
                    version: reached,
                    reason,
                    non_fatal_errors: accumulated,
                });
            }
            info!(version = reached.get(); "Committed version");
            current = reached;
        }

        if accumulated.is_empty() {
            if current != start {
                info!(from = start.get(), to = current.get(); "Upgrade completed");
            }
            Ok(current)
        } else {
            warn!(
                to = current.get(), errors = accumulated.len();
                "Upgrade completed with non-fatal errors"
            );
            Err(UpgradeError::CompletedWithErrors {
                errors: accumulated,
            })
        }
    }
}
