//! The three-phase orchestrator: assign existing windows, launch whatever's
//! missing, resize-and-reconcile, then minimize whatever doesn't belong.
mod bucket_index;
mod placement;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::display_index::DisplayIndex;
use crate::error::{Error, Result};
use crate::geometry::rescale;
use crate::host::{DesktopHost, ShowState, StartProcessRequest};
use crate::matcher::{self, score, MatchScore};
use crate::model::{ApplicationDefinition, Tristate, WindowHandle, WorkspaceDefinition, WorkspaceId};
use crate::registry::ManagedWindowRegistry;
use crate::store::DefinitionStore;
use crate::window_index::WindowIndex;

use bucket_index::WindowSnapshotIndex;
use placement::{arrange_loop, post_settle_loop, set_placement, TargetPlacement, TargetShowState};

#[derive(Debug, Clone)]
struct BoundApp {
    app: ApplicationDefinition,
    handle: WindowHandle,
    launched_new: bool,
}

/// Orchestrates `launch_workspace`: assign, launch, resize-and-reconcile,
/// minimize-extraneous, then update the definition's last-launched time.
pub struct Launcher {
    host: Arc<dyn DesktopHost>,
    window_index: Arc<WindowIndex>,
    display_index: Arc<DisplayIndex>,
    registry: Arc<ManagedWindowRegistry>,
    store: Arc<DefinitionStore>,
    config: EngineConfig,
}

impl Launcher {
    /// Build a launcher over the given live indexes, registry and store.
    pub fn new(
        host: Arc<dyn DesktopHost>,
        window_index: Arc<WindowIndex>,
        display_index: Arc<DisplayIndex>,
        registry: Arc<ManagedWindowRegistry>,
        store: Arc<DefinitionStore>,
    ) -> Self {
        Self {
            host,
            window_index,
            display_index,
            registry,
            store,
            config: EngineConfig::default(),
        }
    }

    /// Override the timeout/retry/poll tunables used by every phase.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the workspace named by `id` and bring the desktop into its
    /// described state. Returns `true` iff at least one application ended
    /// up bound to a window, regardless of whether every app succeeded.
    pub fn launch_workspace(&self, id: WorkspaceId, cancel: &CancelToken) -> Result<bool> {
        cancel.check()?;
        let mut workspace = self.store.load_by_id(id)?.ok_or(Error::NotFound(id))?;
        if workspace.applications.is_empty() {
            return Ok(false);
        }
        for app in workspace.applications.iter_mut() {
            if app.id.is_nil() {
                app.id = crate::model::ApplicationId::new();
            }
        }

        let mut bound: Vec<BoundApp> = Vec::new();

        if workspace.move_existing_windows {
            bound.extend(self.phase1_pass1(&workspace, cancel)?);
        }

        let bound_ids: HashSet<_> = bound.iter().map(|b| b.app.id).collect();
        let unbound: Vec<&ApplicationDefinition> = workspace
            .applications
            .iter()
            .filter(|a| !bound_ids.contains(&a.id))
            .collect();

        bound.extend(self.phase1_pass2(&workspace, unbound, cancel)?);

        self.phase2(&workspace, &bound, cancel)?;

        if workspace.move_existing_windows {
            self.phase3(&workspace, &bound, cancel)?;
        }

        self.store.update_last_launched_time(id, unix_now())?;

        Ok(!bound.is_empty())
    }

    fn phase1_pass1(&self, workspace: &WorkspaceDefinition, cancel: &CancelToken) -> Result<Vec<BoundApp>> {
        cancel.check()?;
        let index = WindowSnapshotIndex::build(self.window_index.snapshot());
        let results: Mutex<Vec<BoundApp>> = Mutex::new(Vec::new());

        std::thread::scope(|scope| {
            for app in &workspace.applications {
                scope.spawn(|| {
                    if cancel.is_cancelled() {
                        return;
                    }
                    if let Some(handle) = self.assign_existing(workspace.id, app, &index) {
                        results.lock().unwrap().push(BoundApp {
                            app: app.clone(),
                            handle,
                            launched_new: false,
                        });
                    }
                });
            }
        });

        Ok(results.into_inner().unwrap())
    }

    fn assign_existing(
        &self,
        workspace_id: WorkspaceId,
        app: &ApplicationDefinition,
        index: &WindowSnapshotIndex,
    ) -> Option<WindowHandle> {
        if let Some(handle) = self.registry.bound_window(app.id) {
            if let Some(info) = self.window_index.get(handle) {
                if score(&info, app).is_match()
                    && self.host.is_on_current_virtual_desktop(handle).unwrap_or_yes()
                    && self.registry.try_bind(workspace_id, app.id, handle)
                {
                    return Some(handle);
                }
            }
        }

        let target_minimized = app.minimized;
        let mut candidates: Vec<(WindowHandle, MatchScore, i64, i64)> = Vec::new();

        for handle in index.candidates_for(app) {
            let Some(info) = index.info(handle) else {
                continue;
            };
            if self.host.is_cloaked(handle) == Tristate::Yes && !target_minimized {
                continue;
            }
            if self.host.is_on_current_virtual_desktop(handle) == Tristate::No {
                continue;
            }
            if let Some(owner) = self.registry.bound_app(handle) {
                if owner != app.id {
                    continue;
                }
            }
            let match_score = score(info, app);
            if !match_score.is_match() {
                continue;
            }
            candidates.push((handle, match_score, placement_distance(app, info), info.bounds.area()));
        }

        candidates.sort_by(|a, b| {
            b.1.score
                .cmp(&a.1.score)
                .then(a.2.cmp(&b.2))
                .then(b.3.cmp(&a.3))
                .then(b.0 .0.cmp(&a.0 .0))
        });

        if let Some((_, first_score, first_distance, _)) = candidates.first().copied() {
            if first_score.is_title_only() {
                let tied = candidates
                    .iter()
                    .filter(|c| c.1.score == first_score.score && c.2 == first_distance)
                    .count();
                if tied > 1 {
                    warn!(app = %app.name, "ambiguous title-only match in assign-existing, skipping");
                    return None;
                }
            }
        }

        candidates
            .into_iter()
            .find(|(handle, ..)| self.registry.try_bind(workspace_id, app.id, *handle))
            .map(|(handle, ..)| handle)
    }

    fn phase1_pass2(
        &self,
        workspace: &WorkspaceDefinition,
        unbound: Vec<&ApplicationDefinition>,
        cancel: &CancelToken,
    ) -> Result<Vec<BoundApp>> {
        let mut bound = Vec::new();

        for app in unbound {
            cancel.check()?;

            if matcher::is_application_frame_host(&app.path) {
                warn!(app = %app.name, "refusing to launch the application-frame-host binary directly");
                continue;
            }

            if let Some(handle) = self.find_late_arrival(app) {
                if self.registry.try_bind(workspace.id, app.id, handle) {
                    bound.push(BoundApp {
                        app: app.clone(),
                        handle,
                        launched_new: false,
                    });
                }
                continue;
            }

            let known_handles: Vec<WindowHandle> =
                self.window_index.snapshot().iter().map(|w| w.handle).collect();

            let pid = match self.activate_app(app) {
                Ok(pid) => pid,
                Err(e) => {
                    warn!(app = %app.name, error = %e, "activation failed");
                    continue;
                }
            };
            cancel.check()?;

            let expected_pid = if pid == 0 { None } else { Some(pid) };
            let new_windows = self.window_index.wait_for_windows(
                |_| true,
                &known_handles,
                expected_pid,
                self.config.window_wait_timeout,
                self.config.window_wait_poll_interval,
            );
            if new_windows.is_empty() {
                warn!(app = %app.name, "no window appeared after activation");
                continue;
            }

            let candidate_handles: Vec<WindowHandle> = new_windows.iter().map(|w| w.handle).collect();
            match self.select_settle_candidate(app, &candidate_handles, cancel)? {
                Some(handle) => {
                    if self.registry.try_bind(workspace.id, app.id, handle) {
                        bound.push(BoundApp {
                            app: app.clone(),
                            handle,
                            launched_new: true,
                        });
                    } else {
                        warn!(app = %app.name, "lost binding race for freshly launched window");
                    }
                }
                None => warn!(app = %app.name, "freshly launched window never settled into a match"),
            }
        }

        Ok(bound)
    }

    fn find_late_arrival(&self, app: &ApplicationDefinition) -> Option<WindowHandle> {
        self.window_index
            .find(None, |w| {
                self.host.is_on_current_virtual_desktop(w.handle).unwrap_or_yes()
                    && score(w, app).is_match()
                    && self.registry.bound_app(w.handle).is_none()
            })
            .into_iter()
            .next()
            .map(|w| w.handle)
    }

    fn activate_app(&self, app: &ApplicationDefinition) -> Result<u32> {
        if !app.path.is_empty() && !app.command_line_arguments.is_empty() {
            return self.start_via_path(app);
        }
        if !app.app_user_model_id.is_empty() {
            return self.host.activate_by_aumid(&app.app_user_model_id, &app.command_line_arguments);
        }
        if !app.package_full_name.is_empty() {
            self.host.launch_package(&app.package_full_name)?;
            return Ok(0);
        }
        if !app.path.is_empty() {
            return self.start_via_path(app);
        }
        Err(Error::Activation(app.name.clone(), "no activation signal present".into()))
    }

    fn start_via_path(&self, app: &ApplicationDefinition) -> Result<u32> {
        let shell_execute = app.path.starts_with("shell:") || !std::path::Path::new(&app.path).is_file();
        self.host.start_process(StartProcessRequest {
            path: &app.path,
            args: &app.command_line_arguments,
            shell_execute,
            runas: app.is_elevated && app.can_launch_elevated,
            working_directory: &app.working_directory,
        })
    }

    fn select_settle_candidate(
        &self,
        app: &ApplicationDefinition,
        candidates: &[WindowHandle],
        cancel: &CancelToken,
    ) -> Result<Option<WindowHandle>> {
        let deadline = Instant::now() + self.config.settle_timeout;
        let mut best: Option<(WindowHandle, MatchScore, i64)> = None;

        loop {
            cancel.check()?;
            for &handle in candidates {
                let Some(info) = self.window_index.get(handle) else {
                    continue;
                };
                if self.host.has_tool_window_style(handle) {
                    continue;
                }
                if self.host.is_cloaked(handle) == Tristate::Yes {
                    continue;
                }
                if self.host.is_on_current_virtual_desktop(handle) == Tristate::No {
                    continue;
                }
                let candidate_score = score(&info, app);
                if !candidate_score.is_match() {
                    continue;
                }
                let area = info.bounds.area();
                let better = best
                    .as_ref()
                    .map(|(_, bs, ba)| (candidate_score.score, area) > (bs.score, *ba))
                    .unwrap_or(true);
                if better {
                    best = Some((handle, candidate_score, area));
                }
            }
            if Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(
                self.config
                    .settle_poll_interval
                    .min(deadline.saturating_duration_since(Instant::now())),
            );
        }

        Ok(best.map(|(handle, ..)| handle))
    }

    fn phase2(&self, workspace: &WorkspaceDefinition, bound: &[BoundApp], cancel: &CancelToken) -> Result<()> {
        cancel.check()?;
        std::thread::scope(|scope| {
            for b in bound {
                scope.spawn(|| {
                    if cancel.is_cancelled() {
                        return;
                    }
                    self.place_one(workspace, b, cancel);
                });
            }
        });
        Ok(())
    }

    fn place_one(&self, workspace: &WorkspaceDefinition, bound: &BoundApp, cancel: &CancelToken) {
        let target_rect = self.resolve_target_rect(workspace, &bound.app);
        let show_state = if bound.app.minimized {
            TargetShowState::Minimized
        } else if bound.app.maximized {
            TargetShowState::Maximized
        } else {
            TargetShowState::Normal
        };
        let pid = self.window_index.get(bound.handle).map(|w| w.process_id).unwrap_or(0);

        let target = TargetPlacement {
            handle: bound.handle,
            rect: target_rect,
            show_state,
            wait_for_input_idle: bound.launched_new,
            pid,
        };

        if let Err(e) = set_placement(self.host.as_ref(), &self.config, cancel, target) {
            warn!(app = %bound.app.name, error = %e, "set_placement failed");
            return;
        }

        let run_arrange = (bound.launched_new && !target_rect.is_empty())
            || (!bound.launched_new && show_state != TargetShowState::Normal);
        if run_arrange {
            let _ = arrange_loop(self.host.as_ref(), &self.config, cancel, target);
        }
        if bound.launched_new && !target_rect.is_empty() {
            let _ = post_settle_loop(self.host.as_ref(), &self.config, cancel, target);
        }

        if show_state == TargetShowState::Minimized {
            self.minimize_siblings(bound.handle, pid);
        }
    }

    fn resolve_target_rect(&self, workspace: &WorkspaceDefinition, app: &ApplicationDefinition) -> crate::geometry::Rect {
        if app.position.is_empty() {
            return app.position;
        }
        let Some(src_monitor) = workspace
            .monitors
            .iter()
            .find(|m| m.ordinal == app.monitor_ordinal)
            .cloned()
        else {
            return app.position;
        };

        let current = self.display_index.monitors();
        let dst_monitor = current
            .iter()
            .find(|m| !m.id.is_empty() && m.id == src_monitor.id)
            .or_else(|| {
                current
                    .iter()
                    .find(|m| !src_monitor.instance_id.is_empty() && m.instance_id == src_monitor.instance_id)
            })
            .or_else(|| current.iter().find(|m| m.ordinal == src_monitor.ordinal))
            .or_else(|| current.first());

        match dst_monitor {
            Some(dst) if dst.dpi_aware_rect != src_monitor.dpi_aware_rect => {
                rescale(app.position, src_monitor.dpi_aware_rect, dst.dpi_aware_rect)
            }
            _ => app.position,
        }
    }

    fn minimize_siblings(&self, handle: WindowHandle, pid: u32) {
        if pid == 0 {
            return;
        }
        let siblings = self.window_index.find(Some(pid), |w| w.handle != handle && w.is_visible);
        for sibling in siblings {
            if self.host.is_cloaked(sibling.handle) == Tristate::Yes {
                continue;
            }
            if self.host.is_on_current_virtual_desktop(sibling.handle) == Tristate::No {
                continue;
            }
            if !self.host.can_minimize(sibling.handle) {
                continue;
            }
            self.host.show(sibling.handle, ShowState::Minimized);
        }
    }

    fn phase3(&self, workspace: &WorkspaceDefinition, bound: &[BoundApp], cancel: &CancelToken) -> Result<()> {
        cancel.check()?;
        let _ = workspace;
        let workspace_handles: HashSet<WindowHandle> = bound.iter().map(|b| b.handle).collect();
        let workspace_pids: HashSet<u32> = bound
            .iter()
            .filter_map(|b| self.window_index.get(b.handle).map(|w| w.process_id))
            .collect();
        let current_pid = std::process::id();

        for window in self.window_index.snapshot() {
            cancel.check()?;
            if workspace_handles.contains(&window.handle) {
                continue;
            }
            if workspace_pids.contains(&window.process_id) {
                continue;
            }
            if window.process_id == current_pid {
                continue;
            }
            if self.host.is_cloaked(window.handle) == Tristate::Yes {
                continue;
            }
            if self.host.is_on_current_virtual_desktop(window.handle) != Tristate::Yes {
                continue;
            }
            if !self.host.can_minimize(window.handle) {
                continue;
            }
            self.host.show(window.handle, ShowState::Minimized);
        }

        Ok(())
    }
}

fn placement_distance(app: &ApplicationDefinition, info: &crate::model::WindowInfo) -> i64 {
    if app.position.is_empty() || info.bounds.is_empty() {
        if info.monitor_ordinal == app.monitor_ordinal {
            0
        } else {
            i64::MAX
        }
    } else {
        app.position.center_distance_sq(&info.bounds)
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
    use crate::model::{test_support::sample_application, MonitorInfo};
    use std::time::Duration;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            window_wait_timeout: Duration::from_millis(80),
            window_wait_poll_interval: Duration::from_millis(5),
            settle_timeout: Duration::from_millis(40),
            settle_poll_interval: Duration::from_millis(5),
            visibility_timeout: Duration::from_millis(40),
            visibility_poll_interval: Duration::from_millis(5),
            placement_verify_attempts: 5,
            placement_verify_interval: Duration::from_millis(2),
            arrange_loop_timeout: Duration::from_millis(40),
            arrange_loop_interval: Duration::from_millis(2),
            post_settle_loop_timeout: Duration::from_millis(20),
            post_settle_loop_interval: Duration::from_millis(2),
            ..EngineConfig::default()
        }
    }

    fn harness() -> (
        Arc<MockDesktopHost>,
        Arc<WindowIndex>,
        Arc<DisplayIndex>,
        Arc<ManagedWindowRegistry>,
        Arc<DefinitionStore>,
        Launcher,
        tempfile::TempDir,
    ) {
        let host = Arc::new(MockDesktopHost::new());
        let window_index = WindowIndex::new(host.clone());
        let display_index = DisplayIndex::new(host.clone());
        let registry = Arc::new(ManagedWindowRegistry::new(host.clone()));
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DefinitionStore::open_at(dir.path().join("workspaces.json")));
        let launcher = Launcher::new(
            host.clone(),
            window_index.clone(),
            display_index.clone(),
            registry.clone(),
            store.clone(),
        )
        .with_config(fast_config());
        (host, window_index, display_index, registry, store, launcher, dir)
    }

    fn monitor(id: &str, ordinal: i32, rect: Rect) -> MonitorInfo {
        MonitorInfo {
            id: id.into(),
            instance_id: String::new(),
            ordinal,
            dpi: 96,
            dpi_aware_rect: rect,
            dpi_unaware_rect: rect,
        }
    }

    #[test]
    fn launch_reuses_an_already_matching_window_without_launching_a_process() {
        let (host, _wi, _di, registry, store, launcher, _dir) = harness();
        host.set_monitors(vec![monitor("M1", 0, Rect::new(0, 0, 1920, 1080))]);

        let handle = host.spawn_window(WindowTemplate {
            process_path: "C:\\bin\\ed.exe".into(),
            title: "Editor".into(),
            bounds: Rect::new(10, 10, 800, 600),
            visible: true,
            ..Default::default()
        });

        let mut app = sample_application("ed");
        app.path = "C:\\bin\\ed.exe".into();
        app.position = Rect::new(10, 10, 800, 600);
        app.monitor_ordinal = 0;

        let workspace = WorkspaceDefinition {
            id: WorkspaceId::new(),
            name: "Test".into(),
            creation_time: 0,
            last_launched_time: 0,
            is_shortcut_needed: false,
            move_existing_windows: true,
            applications: vec![app],
            monitors: vec![monitor("M1", 0, Rect::new(0, 0, 1920, 1080))],
        };
        store.save_workspace(workspace.clone()).unwrap();

        let cancel = CancelToken::new();
        let ok = launcher.launch_workspace(workspace.id, &cancel).unwrap();
        assert!(ok);
        assert_eq!(host.process_count(), 0);
        assert!(!registry.workspace_windows(workspace.id).is_empty());
        assert!(registry.workspace_windows(workspace.id).contains(&handle));
    }

    #[test]
    fn launch_starts_the_process_when_no_window_exists_yet() {
        let (host, _wi, _di, registry, store, launcher, _dir) = harness();
        host.set_monitors(vec![monitor("M1", 0, Rect::new(0, 0, 1920, 1080))]);
        host.register_launch_template(
            "C:\\bin\\ed.exe",
            WindowTemplate {
                process_path: "C:\\bin\\ed.exe".into(),
                title: "Editor".into(),
                bounds: Rect::new(0, 0, 400, 300),
                visible: true,
                ..Default::default()
            },
        );

        let mut app = sample_application("ed");
        app.path = "C:\\bin\\ed.exe".into();
        app.position = Rect::new(50, 50, 400, 300);
        app.monitor_ordinal = 0;

        let workspace = WorkspaceDefinition {
            id: WorkspaceId::new(),
            name: "Test".into(),
            creation_time: 0,
            last_launched_time: 0,
            is_shortcut_needed: false,
            move_existing_windows: true,
            applications: vec![app],
            monitors: vec![monitor("M1", 0, Rect::new(0, 0, 1920, 1080))],
        };
        store.save_workspace(workspace.clone()).unwrap();

        let cancel = CancelToken::new();
        let ok = launcher.launch_workspace(workspace.id, &cancel).unwrap();
        assert!(ok);
        assert_eq!(host.process_count(), 1);
        assert_eq!(registry.workspace_windows(workspace.id).len(), 1);

        let loaded = store.load_by_id(workspace.id).unwrap().unwrap();
        assert!(loaded.last_launched_time > 0);
    }

    #[test]
    fn launch_rescales_position_across_a_different_monitor_layout() {
        let (host, _wi, di, registry, store, launcher, _dir) = harness();
        let handle = host.spawn_window(WindowTemplate {
            process_path: "C:\\bin\\ed.exe".into(),
            title: "Editor".into(),
            bounds: Rect::new(0, 0, 960, 540),
            visible: true,
            ..Default::default()
        });
        host.set_monitors(vec![monitor("NEW", 0, Rect::new(0, 0, 1920, 1080))]);
        di.refresh();

        let mut app = sample_application("ed");
        app.path = "C:\\bin\\ed.exe".into();
        app.position = Rect::new(0, 0, 1920, 1080);
        app.monitor_ordinal = 0;

        let workspace = WorkspaceDefinition {
            id: WorkspaceId::new(),
            name: "Test".into(),
            creation_time: 0,
            last_launched_time: 0,
            is_shortcut_needed: false,
            move_existing_windows: true,
            applications: vec![app],
            monitors: vec![monitor("OLD", 0, Rect::new(0, 0, 3840, 2160))],
        };
        store.save_workspace(workspace.clone()).unwrap();

        let cancel = CancelToken::new();
        launcher.launch_workspace(workspace.id, &cancel).unwrap();

        let placement = host.get_placement(handle).unwrap();
        assert!(crate::geometry::within_tolerance(
            &placement.normal_rect,
            &Rect::new(0, 0, 960, 540),
            8
        ));
        let _ = registry;
    }

    #[test]
    fn launch_minimizes_extraneous_windows_when_move_existing_windows() {
        let (host, _wi, _di, _registry, store, launcher, _dir) = harness();
        host.set_monitors(vec![monitor("M1", 0, Rect::new(0, 0, 1920, 1080))]);

        let kept = host.spawn_window(WindowTemplate {
            process_path: "C:\\bin\\ed.exe".into(),
            title: "Editor".into(),
            bounds: Rect::new(0, 0, 400, 300),
            visible: true,
            ..Default::default()
        });

        // Spawned via the process machinery (not `spawn_window` directly) so
        // it carries a process id distinct from `kept`'s, matching a real
        // unrelated background process rather than colliding on pid 0.
        host.register_launch_template(
            "C:\\bin\\other.exe",
            WindowTemplate {
                process_path: "C:\\bin\\other.exe".into(),
                title: "Other".into(),
                bounds: Rect::new(500, 500, 200, 200),
                visible: true,
                ..Default::default()
            },
        );
        let before: HashSet<WindowHandle> = host.enumerate_top_level_windows().into_iter().collect();
        host.start_process(StartProcessRequest {
            path: "C:\\bin\\other.exe",
            args: "",
            shell_execute: false,
            runas: false,
            working_directory: "",
        })
        .unwrap();
        let extraneous = host
            .enumerate_top_level_windows()
            .into_iter()
            .find(|h| !before.contains(h))
            .unwrap();

        let mut app = sample_application("ed");
        app.path = "C:\\bin\\ed.exe".into();
        app.position = Rect::new(0, 0, 400, 300);
        app.monitor_ordinal = 0;

        let workspace = WorkspaceDefinition {
            id: WorkspaceId::new(),
            name: "Test".into(),
            creation_time: 0,
            last_launched_time: 0,
            is_shortcut_needed: false,
            move_existing_windows: true,
            applications: vec![app],
            monitors: vec![monitor("M1", 0, Rect::new(0, 0, 1920, 1080))],
        };
        store.save_workspace(workspace.clone()).unwrap();

        let cancel = CancelToken::new();
        launcher.launch_workspace(workspace.id, &cancel).unwrap();

        assert!(!host.get_placement(kept).unwrap().is_minimized);
        assert!(host.get_placement(extraneous).unwrap().is_minimized);
    }

    #[test]
    fn launch_with_move_existing_windows_false_does_not_minimize_anything() {
        let (host, _wi, _di, _registry, store, launcher, _dir) = harness();
        host.set_monitors(vec![monitor("M1", 0, Rect::new(0, 0, 1920, 1080))]);

        let other = host.spawn_window(WindowTemplate {
            process_path: "C:\\bin\\other.exe".into(),
            title: "Other".into(),
            bounds: Rect::new(500, 500, 200, 200),
            visible: true,
            ..Default::default()
        });

        let workspace = WorkspaceDefinition {
            id: WorkspaceId::new(),
            name: "Test".into(),
            creation_time: 0,
            last_launched_time: 0,
            is_shortcut_needed: false,
            move_existing_windows: false,
            applications: vec![],
            monitors: vec![monitor("M1", 0, Rect::new(0, 0, 1920, 1080))],
        };
        store.save_workspace(workspace.clone()).unwrap();

        let cancel = CancelToken::new();
        let ok = launcher.launch_workspace(workspace.id, &cancel).unwrap();
        assert!(!ok);
        assert!(!host.get_placement(other).unwrap().is_minimized);
        assert_eq!(host.process_count(), 0);
    }

    #[test]
    fn launch_cancels_promptly_when_token_already_fired() {
        let (_host, _wi, _di, _registry, store, launcher, _dir) = harness();
        let workspace = WorkspaceDefinition {
            id: WorkspaceId::new(),
            name: "Test".into(),
            creation_time: 0,
            last_launched_time: 0,
            is_shortcut_needed: false,
            move_existing_windows: true,
            applications: vec![],
            monitors: vec![],
        };
        store.save_workspace(workspace.clone()).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let result = launcher.launch_workspace(workspace.id, &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
