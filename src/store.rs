//! Persistent, versioned storage of [`WorkspaceDocument`] as JSON.
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::model::{WorkspaceDefinition, WorkspaceDocument, WorkspaceId};

const FILE_NAME: &str = "workspaces.json";
const LOCK_SUFFIX: &str = ".lck";

/// A single JSON document of workspace definitions under a per-user config
/// directory, guarded against concurrent writers by a sibling lock file.
///
/// Every mutation goes through [`Self::with_document`], which owns the full
/// read-lock-modify-write-unlock cycle; callers never see the lock file
/// directly.
pub struct DefinitionStore {
    path: PathBuf,
    legacy_path: Option<PathBuf>,
    config: EngineConfig,
}

impl DefinitionStore {
    /// Open the store at the platform's per-user config directory, resolved
    /// via `xdg`. The directory is created if absent.
    pub fn open() -> Result<Self> {
        let dirs = xdg::BaseDirectories::with_prefix("workspace-engine")
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        let path = dirs
            .place_config_file(FILE_NAME)
            .map_err(Error::Io)?;
        Ok(Self {
            path,
            legacy_path: None,
            config: EngineConfig::default(),
        })
    }

    /// Open a store rooted at an explicit path, bypassing `xdg` resolution.
    /// Used by tests and by callers embedding this crate in a context that
    /// manages its own config layout.
    pub fn open_at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            legacy_path: None,
            config: EngineConfig::default(),
        }
    }

    /// Override the retry/backoff tunables used by the durability protocol.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register the legacy provider-config path consulted by
    /// [`Self::migrate_legacy_if_present`].
    pub fn with_legacy_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.legacy_path = Some(path.into());
        self
    }

    fn lock_path(&self) -> PathBuf {
        let mut p = self.path.clone().into_os_string();
        p.push(LOCK_SUFFIX);
        PathBuf::from(p)
    }

    fn read_document(&self) -> WorkspaceDocument {
        match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(error = %e, "unreadable workspace document, treating as empty");
                WorkspaceDocument::default()
            }),
            Err(_) => WorkspaceDocument::default(),
        }
    }

    /// Every persisted workspace, most recently saved first.
    pub fn load_all(&self) -> Result<Vec<WorkspaceDefinition>> {
        Ok(self.read_document().workspaces)
    }

    /// A single workspace by id.
    pub fn load_by_id(&self, id: WorkspaceId) -> Result<Option<WorkspaceDefinition>> {
        Ok(self
            .read_document()
            .workspaces
            .into_iter()
            .find(|w| w.id == id))
    }

    /// Insert or replace `workspace`, removing any prior entry sharing its
    /// id or name (case-insensitive), then inserting it at position 0.
    pub fn save_workspace(&self, workspace: WorkspaceDefinition) -> Result<()> {
        self.with_document(|doc| {
            doc.workspaces.retain(|w| {
                w.id != workspace.id && !w.name.eq_ignore_ascii_case(&workspace.name)
            });
            doc.workspaces.insert(0, workspace.clone());
        })
    }

    /// Remove the workspace with `id`, if present.
    pub fn delete_workspace(&self, id: WorkspaceId) -> Result<()> {
        self.with_document(|doc| {
            doc.workspaces.retain(|w| w.id != id);
        })
    }

    /// Replace the entire document.
    pub fn save_all(&self, workspaces: Vec<WorkspaceDefinition>) -> Result<()> {
        self.with_document(|doc| {
            doc.workspaces = workspaces.clone();
        })
    }

    /// Update only `last_launched_time` for the workspace with `id`, if it
    /// still exists.
    pub fn update_last_launched_time(&self, id: WorkspaceId, unix_seconds: i64) -> Result<()> {
        self.with_document(|doc| {
            if let Some(w) = doc.workspaces.iter_mut().find(|w| w.id == id) {
                w.last_launched_time = unix_seconds;
            }
        })
    }

    /// If the primary document is absent and a legacy provider-config path
    /// was registered via [`Self::with_legacy_path`], copy its embedded
    /// workspace list into the primary document and clear the legacy field.
    ///
    /// A standalone, idempotent operation: nothing in [`Self::load_all`] or
    /// any other read path triggers this implicitly. Callers that want the
    /// transition behavior invoke it once before their first read.
    pub fn migrate_legacy_if_present(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        let Some(legacy_path) = &self.legacy_path else {
            return Ok(false);
        };
        let Ok(contents) = fs::read_to_string(legacy_path) else {
            return Ok(false);
        };

        #[derive(serde::Deserialize, serde::Serialize)]
        struct LegacyPayload {
            #[serde(default)]
            data: LegacyData,
        }
        #[derive(Default, serde::Deserialize, serde::Serialize)]
        struct LegacyData {
            #[serde(default)]
            workspaces: Vec<WorkspaceDefinition>,
        }

        let mut legacy: LegacyPayload = match serde_json::from_str(&contents) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "legacy provider-config unreadable, skipping migration");
                return Ok(false);
            }
        };
        if legacy.data.workspaces.is_empty() {
            return Ok(false);
        }

        let migrated = std::mem::take(&mut legacy.data.workspaces);
        debug!(count = migrated.len(), "migrating legacy workspace definitions");
        self.save_all(migrated)?;

        if let Ok(cleared) = serde_json::to_string_pretty(&legacy) {
            let _ = fs::write(legacy_path, cleared);
        }

        Ok(true)
    }

    /// Run `mutate` against the current document and persist the result
    /// under the durability protocol: lock, read-modify-write, atomic-replace,
    /// unlock, retried up to `config.store_write_retry_attempts` times.
    ///
    /// The lock is held across the read and the write, so the version
    /// number this process last observed can never go stale out from under
    /// it the way it would in a load-then-later-save API; the retry loop
    /// here exists for transient IO failures (temp-file create, rename),
    /// not for reconciling a concurrent writer, which the lock already
    /// excludes.
    fn with_document(&self, mutate: impl Fn(&mut WorkspaceDocument)) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(Error::Io)?;
        }

        let mut last_err = None;
        for attempt in 0..self.config.store_write_retry_attempts {
            let _lock = LockGuard::acquire(&self.lock_path(), &self.config)?;

            let mut doc = self.read_document();
            mutate(&mut doc);

            match self.atomic_write(&doc) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, error = %e, "definition store write attempt failed");
                    last_err = Some(e);
                }
            }

            std::thread::sleep(self.config.store_write_retry_backoff);
        }

        Err(last_err.unwrap_or(Error::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "definition store write exhausted retries",
        ))))
    }

    fn atomic_write(&self, doc: &WorkspaceDocument) -> Result<()> {
        let serialized = serde_json::to_string_pretty(doc)?;
        let tmp_path = self.path.with_extension(format!("{}.tmp", Uuid::new_v4()));

        {
            let mut tmp = File::create(&tmp_path).map_err(Error::Io)?;
            tmp.write_all(serialized.as_bytes()).map_err(Error::Io)?;
            tmp.sync_all().map_err(Error::Io)?;
        }

        let result = fs::rename(&tmp_path, &self.path).map_err(Error::Io);
        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }
}

/// Holds the inter-process write lock for the duration of one document
/// mutation; always removes the lock file on drop, including on panic
/// unwind through `with_document`.
struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    fn acquire(path: &Path, config: &EngineConfig) -> Result<Self> {
        for _ in 0..config.store_lock_retry_attempts {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(_) => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                    })
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    std::thread::sleep(config.store_lock_retry_interval);
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::WouldBlock,
            "timed out acquiring workspace store lock",
        )))
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
