//! The bidirectional, mutex-guarded binding between application definitions
//! and the live window handles they've claimed.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::host::DesktopHost;
use crate::model::{ApplicationId, WindowHandle, WorkspaceId};

#[derive(Default)]
struct Bindings {
    app_to_handle: HashMap<ApplicationId, WindowHandle>,
    handle_to_apps: HashMap<WindowHandle, HashSet<ApplicationId>>,
    app_to_workspace: HashMap<ApplicationId, WorkspaceId>,
}

impl Bindings {
    fn remove_app(&mut self, app: ApplicationId) {
        if let Some(handle) = self.app_to_handle.remove(&app) {
            if let Some(apps) = self.handle_to_apps.get_mut(&handle) {
                apps.remove(&app);
                if apps.is_empty() {
                    self.handle_to_apps.remove(&handle);
                }
            }
        }
        self.app_to_workspace.remove(&app);
    }

    fn remove_handle(&mut self, handle: WindowHandle) {
        if let Some(apps) = self.handle_to_apps.remove(&handle) {
            for app in apps {
                if self.app_to_handle.get(&app) == Some(&handle) {
                    self.app_to_handle.remove(&app);
                }
                self.app_to_workspace.remove(&app);
            }
        }
    }
}

/// Exclusively binds each application definition to at most one live window
/// handle, scoped by the workspace that owns it.
///
/// Every operation is a short, non-reentrant critical section under a
/// single mutex, mirroring the grounding window manager's approach to its
/// own client map: correctness comes from never holding the lock across a
/// host call, not from fine-grained locking.
pub struct ManagedWindowRegistry {
    host: Arc<dyn DesktopHost>,
    bindings: Mutex<Bindings>,
}

impl ManagedWindowRegistry {
    /// Build an empty registry backed by `host` for liveness checks.
    pub fn new(host: Arc<dyn DesktopHost>) -> Self {
        Self {
            host,
            bindings: Mutex::new(Bindings::default()),
        }
    }

    /// Exclusively claim `handle` for `app`. Succeeds if `handle` is
    /// unbound or already bound to `app`; fails if another app holds it.
    /// On success, any prior binding of `app` to a different handle is
    /// removed first.
    pub fn try_bind(&self, workspace: WorkspaceId, app: ApplicationId, handle: WindowHandle) -> bool {
        let mut bindings = self.bindings.lock().unwrap();

        if let Some(holders) = bindings.handle_to_apps.get(&handle) {
            if !holders.is_empty() && !holders.contains(&app) {
                debug!(?handle, ?app, "try_bind rejected: handle already claimed");
                return false;
            }
        }

        if let Some(prev) = bindings.app_to_handle.get(&app).copied() {
            if prev != handle {
                bindings.remove_app(app);
            }
        }

        bindings.app_to_handle.insert(app, handle);
        bindings.handle_to_apps.entry(handle).or_default().insert(app);
        bindings.app_to_workspace.insert(app, workspace);
        true
    }

    /// Record that `app` may share `handle` with other apps. Never fails;
    /// used only by the snapshotter, where one live window can legitimately
    /// correspond to more than one captured application definition (e.g.
    /// multiple UWP-hosted windows sharing a frame host).
    pub fn bind_shared(&self, workspace: WorkspaceId, app: ApplicationId, handle: WindowHandle) {
        let mut bindings = self.bindings.lock().unwrap();
        bindings.app_to_handle.insert(app, handle);
        bindings.handle_to_apps.entry(handle).or_default().insert(app);
        bindings.app_to_workspace.insert(app, workspace);
    }

    /// The live handle bound to `app`, if any. Self-heals (removes the
    /// binding and returns `None`) when the registry's bookkeeping is
    /// inconsistent or the host reports the handle no longer exists.
    pub fn bound_window(&self, app: ApplicationId) -> Option<WindowHandle> {
        let mut bindings = self.bindings.lock().unwrap();
        let handle = *bindings.app_to_handle.get(&app)?;

        let consistent = bindings
            .handle_to_apps
            .get(&handle)
            .map(|apps| apps.contains(&app))
            .unwrap_or(false);

        if !consistent || !self.host.is_window(handle) {
            warn!(?app, ?handle, "self-healing inconsistent or dead binding");
            bindings.remove_app(app);
            return None;
        }

        Some(handle)
    }

    /// One of the apps bound to `handle`, if any (exclusive-mode callers
    /// only ever see zero or one).
    pub fn bound_app(&self, handle: WindowHandle) -> Option<ApplicationId> {
        self.bound_apps(handle).into_iter().next()
    }

    /// Every app currently bound to `handle`.
    pub fn bound_apps(&self, handle: WindowHandle) -> Vec<ApplicationId> {
        self.bindings
            .lock()
            .unwrap()
            .handle_to_apps
            .get(&handle)
            .map(|apps| apps.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every live handle bound to any app of `workspace`.
    pub fn workspace_windows(&self, workspace: WorkspaceId) -> HashSet<WindowHandle> {
        let bindings = self.bindings.lock().unwrap();
        bindings
            .app_to_workspace
            .iter()
            .filter(|(_, ws)| **ws == workspace)
            .filter_map(|(app, _)| bindings.app_to_handle.get(app).copied())
            .filter(|handle| self.host.is_window(*handle))
            .collect()
    }

    /// Every live handle bound to any app in any workspace.
    pub fn all_bound_windows(&self) -> HashSet<WindowHandle> {
        let bindings = self.bindings.lock().unwrap();
        bindings
            .handle_to_apps
            .keys()
            .copied()
            .filter(|handle| self.host.is_window(*handle))
            .collect()
    }

    /// Remove any binding for `app`.
    pub fn unbind_app(&self, app: ApplicationId) {
        self.bindings.lock().unwrap().remove_app(app);
    }

    /// Remove every binding for `handle`. Called from the window index's
    /// `destroyed` event so bindings never outlive their window.
    pub fn unbind_window(&self, handle: WindowHandle) {
        self.bindings.lock().unwrap().remove_handle(handle);
    }

    /// Remove every binding belonging to `workspace`.
    pub fn clear_workspace(&self, workspace: WorkspaceId) {
        let mut bindings = self.bindings.lock().unwrap();
        let apps: Vec<ApplicationId> = bindings
            .app_to_workspace
            .iter()
            .filter(|(_, ws)| **ws == workspace)
            .map(|(app, _)| *app)
            .collect();
        for app in apps {
            bindings.remove_app(app);
        }
    }

    /// Remove every binding in the registry.
    pub fn clear(&self) {
        let mut bindings = self.bindings.lock().unwrap();
        *bindings = Bindings::default();
    }
}
