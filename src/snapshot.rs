//! Captures the set of currently visible, user-owned windows into a
//! persisted [`WorkspaceDefinition`], binding each capture back to its
//! source window in the [`ManagedWindowRegistry`].
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::display_index::DisplayIndex;
use crate::error::Result;
use crate::host::DesktopHost;
use crate::model::{ApplicationDefinition, ApplicationId, WindowInfo, WorkspaceDefinition, WorkspaceId};
use crate::registry::ManagedWindowRegistry;
use crate::window_index::WindowIndex;

/// Window classes that identify shell chrome rather than a user application;
/// never captured regardless of visibility.
const EXCLUDED_CLASSES: &[&str] = &[
    "Shell_TrayWnd",
    "NotifyIconOverflowWindow",
    "WorkerW",
    "Windows.UI.Core.CoreWindow",
    "SearchHost",
];

const EXCLUDED_TITLE: &str = "Program Manager";

/// Captures a named workspace from the live desktop.
pub struct Snapshotter {
    host: Arc<dyn DesktopHost>,
    window_index: Arc<WindowIndex>,
    display_index: Arc<DisplayIndex>,
    registry: Arc<ManagedWindowRegistry>,
}

impl Snapshotter {
    /// Build a snapshotter over the given live indexes and registry.
    pub fn new(
        host: Arc<dyn DesktopHost>,
        window_index: Arc<WindowIndex>,
        display_index: Arc<DisplayIndex>,
        registry: Arc<ManagedWindowRegistry>,
    ) -> Self {
        Self {
            host,
            window_index,
            display_index,
            registry,
        }
    }

    /// Capture the current desktop into a [`WorkspaceDefinition`] named
    /// `name`. Returns `Ok(None)` if zero windows passed the per-window
    /// filter — no workspace is persisted in that case; the caller decides
    /// whether and how to save a non-`None` result.
    pub fn capture(&self, name: &str) -> Result<Option<WorkspaceDefinition>> {
        let windows = self.window_index.snapshot();
        let monitors = self.display_index.monitors();

        let eligible: Vec<&WindowInfo> = windows
            .iter()
            .filter(|w| self.is_capturable(w, &windows))
            .collect();
        if eligible.is_empty() {
            debug!(name, "snapshot captured zero eligible windows");
            return Ok(None);
        }

        let workspace_id = WorkspaceId::new();
        let mut applications = Vec::with_capacity(eligible.len());
        for window in &eligible {
            let app = self.synthesize(window, &windows);
            applications.push((window.handle, app));
        }

        let creation_time = unix_now();
        let definition = WorkspaceDefinition {
            id: workspace_id,
            name: name.to_string(),
            creation_time,
            last_launched_time: 0,
            is_shortcut_needed: false,
            move_existing_windows: true,
            applications: applications.iter().map(|(_, app)| app.clone()).collect(),
            monitors,
        };

        for (handle, app) in &applications {
            self.registry.bind_shared(workspace_id, app.id, *handle);
        }

        info!(name, count = applications.len(), "captured workspace snapshot");
        Ok(Some(definition))
    }

    fn is_capturable(&self, window: &WindowInfo, all_windows: &[WindowInfo]) -> bool {
        window.is_visible
            && window.process_id != std::process::id()
            && !window.bounds.is_empty()
            && !window.title.is_empty()
            && !EXCLUDED_CLASSES.iter().any(|c| c.eq_ignore_ascii_case(&window.class_name))
            && window.title != EXCLUDED_TITLE
            && !self.host.has_tool_window_style(window.handle)
            && !self.resolve_process_path(window, all_windows).is_empty()
    }

    /// Resolve the effective process path for `window`, following the UWP
    /// application-frame-host alias: if the window is hosted by that binary,
    /// look for a sibling window in `all_windows` with the identical title
    /// and a different process id, and use its path instead.
    fn resolve_process_path(&self, window: &WindowInfo, all_windows: &[WindowInfo]) -> String {
        if crate::matcher::is_application_frame_host(&window.process_path) {
            if let Some(sibling) = all_windows.iter().find(|other| {
                other.process_id != window.process_id
                    && other.title == window.title
                    && !other.process_path.is_empty()
            }) {
                return sibling.process_path.clone();
            }
        }
        window.process_path.clone()
    }

    fn synthesize(&self, window: &WindowInfo, all_windows: &[WindowInfo]) -> ApplicationDefinition {
        let placement = self.host.get_placement(window.handle);
        let (position, minimized, maximized) = match placement {
            Some(p) => (p.normal_rect, p.is_minimized, p.is_maximized),
            None => (window.bounds, false, false),
        };

        let monitor_ordinal = self
            .display_index
            .resolve_monitor(position)
            .map(|m| m.ordinal)
            .unwrap_or(0);

        ApplicationDefinition {
            id: ApplicationId::new(),
            name: if window.process_name.is_empty() {
                window.process_file_name.clone()
            } else {
                window.process_name.clone()
            },
            title: window.title.clone(),
            path: self.resolve_process_path(window, all_windows),
            package_full_name: window.package_full_name.clone(),
            app_user_model_id: window.app_user_model_id.clone(),
            pwa_app_id: String::new(),
            command_line_arguments: String::new(),
            working_directory: String::new(),
            is_elevated: false,
            can_launch_elevated: false,
            minimized,
            maximized,
            monitor_ordinal,
            position,
            version: String::new(),
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::host::mock::{MockDesktopHost, WindowTemplate};

    fn setup() -> (Arc<MockDesktopHost>, Arc<ManagedWindowRegistry>, Snapshotter) {
        let host = Arc::new(MockDesktopHost::new());
        let window_index = WindowIndex::new(host.clone());
        let display_index = DisplayIndex::new(host.clone());
        let registry = Arc::new(ManagedWindowRegistry::new(host.clone()));
        let snap = Snapshotter::new(host.clone(), window_index, display_index, registry.clone());
        (host, registry, snap)
    }

    #[test]
    fn capture_returns_none_when_nothing_is_eligible() {
        let (_host, _registry, snap) = setup();
        assert!(snap.capture("Empty").unwrap().is_none());
    }

    #[test]
    fn capture_skips_empty_titles_and_shell_classes() {
        let (host, _registry, snap) = setup();
        host.spawn_window(WindowTemplate {
            process_path: "C:\\Windows\\explorer.exe".into(),
            class_name: "Shell_TrayWnd".into(),
            title: "".into(),
            bounds: Rect::new(0, 0, 100, 30),
            visible: true,
            ..Default::default()
        });
        host.spawn_window(WindowTemplate {
            process_path: "C:\\bin\\ed.exe".into(),
            title: "Program Manager".into(),
            bounds: Rect::new(0, 0, 100, 30),
            visible: true,
            ..Default::default()
        });
        assert!(snap.capture("Desktop").unwrap().is_none());
    }

    #[test]
    fn capture_produces_one_application_per_eligible_window_and_binds_it() {
        let (host, registry, snap) = setup();
        let handle = host.spawn_window(WindowTemplate {
            process_path: "C:\\bin\\ed.exe".into(),
            title: "Editor".into(),
            bounds: Rect::new(10, 10, 800, 600),
            visible: true,
            ..Default::default()
        });

        let workspace = snap.capture("Writing").unwrap().unwrap();
        assert_eq!(workspace.applications.len(), 1);
        let app = &workspace.applications[0];
        assert_eq!(app.title, "Editor");
        assert_eq!(app.path, "C:\\bin\\ed.exe");
        assert_eq!(app.position, Rect::new(10, 10, 800, 600));

        assert_eq!(registry.bound_window(app.id), Some(handle));
    }

    #[test]
    fn capture_resolves_uwp_host_process_path_via_title_match() {
        let (host, _registry, snap) = setup();
        host.spawn_window(WindowTemplate {
            process_path: "C:\\Windows\\System32\\ApplicationFrameHost.exe".into(),
            title: "Mail".into(),
            bounds: Rect::new(0, 0, 640, 480),
            visible: true,
            ..Default::default()
        });
        host.spawn_window(WindowTemplate {
            process_path: "C:\\Program Files\\WindowsApps\\Mail\\mail.exe".into(),
            title: "Mail".into(),
            bounds: Rect::default(),
            visible: false,
            ..Default::default()
        });

        let workspace = snap.capture("Mail Only").unwrap().unwrap();
        assert_eq!(workspace.applications.len(), 1);
        assert_eq!(
            workspace.applications[0].path,
            "C:\\Program Files\\WindowsApps\\Mail\\mail.exe"
        );
    }
}
