//! Choosing the working directory of a work.
//!
//! Resolution order for one identity:
//!
//! 1. a folder with the canonical name anywhere under the download root is
//!    reused as is;
//! 2. otherwise a legacy-named folder of the same work is looked up. If it
//!    is already complete it is migrated to the canonical name and the work
//!    needs no download; if it is unfinished, downloading continues inside
//!    it and migration waits for [`WorkDirResolver::finalize`];
//! 3. otherwise a fresh canonical folder under the target parent is used.
//!
//! A failed migration never aborts the run: the work continues in a fresh
//! canonical folder.

use super::completion::Completion;
use super::index::FolderIndex;
use super::migrate::{migrate_dir, MigrationOutcome};
use crate::config::CrawlConfig;
use crate::error::Result;
use crate::events::{CrawlEvent, DynEventSink};
use crate::identity::WorkIdentity;
use std::path::{Path, PathBuf};

/// How the working directory was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedState {
    /// Canonical folder found.
    CanonicalExists,
    /// Unfinished legacy folder reused; migrate after downloading.
    LegacyInProgress,
    /// Finished legacy folder migrated (or would be, in a dry run).
    LegacyDone,
    /// Nothing found; a fresh canonical folder.
    NoMatch,
    /// A finished legacy folder could not be migrated; a fresh canonical folder.
    MigrationFallback,
}

/// The working directory picked for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir {
    pub path: PathBuf,
    pub state: ResolvedState,
}

impl WorkDir {
    /// Whether resolution alone settled the item.
    pub fn skip_download(&self) -> bool {
        self.state == ResolvedState::LegacyDone
    }
}

/// Resolves and finalizes work directories for one run.
pub struct WorkDirResolver {
    index: FolderIndex,
    target_parent: PathBuf,
    dry_run: bool,
    events: DynEventSink,
}

impl WorkDirResolver {
    /// Index `download_root` and place new folders under `target_parent`.
    pub fn new(
        download_root: &Path,
        target_parent: impl Into<PathBuf>,
        dry_run: bool,
        events: DynEventSink,
    ) -> Self {
        Self {
            index: FolderIndex::scan(download_root),
            target_parent: target_parent.into(),
            dry_run,
            events,
        }
    }

    pub fn from_config(config: &CrawlConfig, events: DynEventSink) -> Self {
        Self::new(
            config.download_root(),
            config.base_download_dir(),
            config.dry_run(),
            events,
        )
    }

    /// Pick the working directory for `identity`.
    pub fn resolve(&mut self, identity: &WorkIdentity) -> WorkDir {
        if let Some(path) = self.index.find_canonical(identity) {
            self.events
                .emit(&CrawlEvent::CanonicalReused { path: path.clone() });
            return WorkDir {
                path,
                state: ResolvedState::CanonicalExists,
            };
        }

        if let Some(legacy) = self.index.find_legacy(identity) {
            let completion = Completion::measure(&legacy);
            if !completion.is_complete(identity.total) {
                self.events.emit(&CrawlEvent::LegacyReused {
                    path: legacy.clone(),
                    finished: completion.count(),
                    expected: identity.total,
                });
                return WorkDir {
                    path: legacy,
                    state: ResolvedState::LegacyInProgress,
                };
            }

            return match self.migrate(identity, &legacy) {
                Ok(outcome) => WorkDir {
                    path: outcome.into_path(),
                    state: ResolvedState::LegacyDone,
                },
                Err(_) => WorkDir {
                    path: self.fresh_dir(identity),
                    state: ResolvedState::MigrationFallback,
                },
            };
        }

        WorkDir {
            path: self.fresh_dir(identity),
            state: ResolvedState::NoMatch,
        }
    }

    /// Migrate `dir` once it is complete and still carries a legacy name.
    ///
    /// Returns the directory the work now lives in. In a dry run, or when
    /// migration fails, that is `dir` itself.
    pub fn finalize(&mut self, identity: &WorkIdentity, dir: &Path) -> PathBuf {
        let is_legacy = dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| identity.is_legacy_form(n))
            .unwrap_or(false);
        if !is_legacy || !Completion::measure(dir).is_complete(identity.total) {
            return dir.to_path_buf();
        }

        match self.migrate(identity, dir) {
            Ok(MigrationOutcome::DryRun(_)) | Err(_) => dir.to_path_buf(),
            Ok(outcome) => outcome.into_path(),
        }
    }

    /// Move a legacy folder to its canonical name and keep the index current.
    fn migrate(&mut self, identity: &WorkIdentity, legacy: &Path) -> Result<MigrationOutcome> {
        let name = identity.folder_name();
        let result = migrate_dir(
            legacy,
            &self.target_parent,
            &name,
            &identity.content_hash,
            self.dry_run,
        );

        match &result {
            Ok(outcome) => {
                match outcome {
                    MigrationOutcome::Moved(to) => {
                        self.index.forget(legacy);
                        self.index.record(to);
                    }
                    MigrationOutcome::AlreadyExists(to) => self.index.record(to),
                    MigrationOutcome::DryRun(_) => {}
                }
                self.events.emit(&CrawlEvent::LegacyMigrated {
                    from: legacy.to_path_buf(),
                    to: outcome.path().to_path_buf(),
                    dry_run: matches!(outcome, MigrationOutcome::DryRun(_)),
                });
            }
            Err(e) => self.events.emit(&CrawlEvent::MigrationFailed {
                from: legacy.to_path_buf(),
                to: self.target_parent.join(&name),
                error: e.to_string(),
            }),
        }
        result
    }

    fn fresh_dir(&mut self, identity: &WorkIdentity) -> PathBuf {
        let path = self.target_parent.join(identity.folder_name());
        self.index.record(&path);
        self.events
            .emit(&CrawlEvent::DirectoryCreated { path: path.clone() });
        path
    }
}
