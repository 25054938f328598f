//! End-to-end snapshot/launch scenarios driven entirely through
//! [`MockDesktopHost`], with no real OS involved.
use std::sync::Arc;

use std::time::Duration;

use workspace_engine::cancel::CancelToken;
use workspace_engine::config::EngineConfig;
use workspace_engine::display_index::DisplayIndex;
use workspace_engine::geometry::Rect;
use workspace_engine::host::mock::{MockDesktopHost, WindowTemplate};
use workspace_engine::host::DesktopHost;
use workspace_engine::launcher::Launcher;
use workspace_engine::model::{
    ApplicationDefinition, ApplicationId, MonitorInfo, WorkspaceDefinition, WorkspaceId,
};
use workspace_engine::registry::ManagedWindowRegistry;
use workspace_engine::store::DefinitionStore;
use workspace_engine::window_index::WindowIndex;

fn fast_config() -> EngineConfig {
    EngineConfig {
        window_wait_timeout: Duration::from_millis(300),
        window_wait_poll_interval: Duration::from_millis(5),
        settle_timeout: Duration::from_millis(40),
        settle_poll_interval: Duration::from_millis(5),
        visibility_timeout: Duration::from_millis(50),
        visibility_poll_interval: Duration::from_millis(5),
        placement_verify_attempts: 2,
        placement_verify_interval: Duration::from_millis(5),
        arrange_loop_timeout: Duration::from_millis(50),
        arrange_loop_interval: Duration::from_millis(5),
        post_settle_loop_timeout: Duration::from_millis(20),
        post_settle_loop_interval: Duration::from_millis(5),
        ..EngineConfig::default()
    }
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

fn app(name: &str) -> ApplicationDefinition {
    ApplicationDefinition {
        id: ApplicationId::new(),
        name: name.into(),
        title: String::new(),
        path: String::new(),
        package_full_name: String::new(),
        app_user_model_id: String::new(),
        pwa_app_id: String::new(),
        command_line_arguments: String::new(),
        working_directory: String::new(),
        is_elevated: false,
        can_launch_elevated: false,
        minimized: false,
        maximized: false,
        monitor_ordinal: 0,
        position: Rect::default(),
        version: String::new(),
    }
}

struct Harness {
    host: Arc<MockDesktopHost>,
    display_index: Arc<DisplayIndex>,
    store: DefinitionStore,
    store_path: std::path::PathBuf,
    launcher: Launcher,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let host = Arc::new(MockDesktopHost::new());
    let window_index = WindowIndex::new(host.clone());
    let display_index = DisplayIndex::new(host.clone());
    let registry = Arc::new(ManagedWindowRegistry::new(host.clone()));
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("workspaces.json");
    let store = DefinitionStore::open_at(store_path.clone());
    let launcher = Launcher::new(
        host.clone() as Arc<dyn workspace_engine::host::DesktopHost>,
        window_index,
        display_index.clone(),
        registry,
        Arc::new(DefinitionStore::open_at(store_path.clone())),
    )
    .with_config(fast_config());
    Harness {
        host,
        display_index,
        store,
        store_path,
        launcher,
        _dir: dir,
    }
}

#[test]
fn empty_desktop_single_app_launches_exactly_one_process_at_target_bounds() {
    let h = harness();
    h.host
        .set_monitors(vec![monitor("A", 0, Rect::new(0, 0, 1920, 1080))]);
    h.display_index.refresh();
    h.host
        .register_launch_template("C:\\bin\\ed.exe", WindowTemplate {
            process_path: "C:\\bin\\ed.exe".into(),
            title: "Editor".into(),
            bounds: Rect::new(0, 0, 800, 600),
            visible: true,
            ..Default::default()
        });

    let mut a = app("ed");
    a.path = "C:\\bin\\ed.exe".into();
    a.position = Rect::new(0, 0, 800, 600);
    a.monitor_ordinal = 0;

    let workspace = WorkspaceDefinition {
        id: WorkspaceId::new(),
        name: "Writing".into(),
        creation_time: 0,
        last_launched_time: 0,
        is_shortcut_needed: false,
        move_existing_windows: true,
        applications: vec![a],
        monitors: vec![monitor("A", 0, Rect::new(0, 0, 1920, 1080))],
    };
    h.store.save_workspace(workspace.clone()).unwrap();

    let cancel = CancelToken::new();
    let ok = h.launcher.launch_workspace(workspace.id, &cancel).unwrap();
    assert!(ok);

    assert_eq!(h.host.process_count(), 1);
    let handle = h.host.enumerate_top_level_windows()[0];
    let placement = h.host.get_placement(handle).unwrap();
    assert!(workspace_engine::geometry::within_tolerance(
        &placement.normal_rect,
        &Rect::new(0, 0, 800, 600),
        8
    ));

    let reloaded = h.store.load_by_id(workspace.id).unwrap().unwrap();
    assert!(reloaded.last_launched_time > 0);
}

#[test]
fn reuses_an_already_running_instance_instead_of_launching_again() {
    let h = harness();
    h.host
        .set_monitors(vec![monitor("A", 0, Rect::new(0, 0, 1920, 1080))]);
    h.display_index.refresh();

    let handle = h.host.spawn_window(WindowTemplate {
        process_path: "C:\\bin\\ed.exe".into(),
        title: "Editor".into(),
        bounds: Rect::new(100, 100, 400, 400),
        visible: true,
        ..Default::default()
    });

    let mut a = app("ed");
    a.path = "C:\\bin\\ed.exe".into();
    a.position = Rect::new(0, 0, 800, 600);

    let workspace = WorkspaceDefinition {
        id: WorkspaceId::new(),
        name: "Writing".into(),
        creation_time: 0,
        last_launched_time: 0,
        is_shortcut_needed: false,
        move_existing_windows: true,
        applications: vec![a],
        monitors: vec![monitor("A", 0, Rect::new(0, 0, 1920, 1080))],
    };
    h.store.save_workspace(workspace.clone()).unwrap();

    let cancel = CancelToken::new();
    h.launcher.launch_workspace(workspace.id, &cancel).unwrap();

    assert_eq!(h.host.process_count(), 0);
    let placement = h.host.get_placement(handle).unwrap();
    assert!(workspace_engine::geometry::within_tolerance(
        &placement.normal_rect,
        &Rect::new(0, 0, 800, 600),
        8
    ));
}

#[test]
fn rescales_across_a_monitor_layout_change() {
    let h = harness();
    h.host
        .set_monitors(vec![monitor("B", 0, Rect::new(0, 0, 1920, 1080))]);
    h.display_index.refresh();

    let mut a = app("ed");
    a.path = "C:\\bin\\ed.exe".into();
    a.position = Rect::new(0, 0, 1920, 1080);
    a.monitor_ordinal = 0;

    h.host
        .register_launch_template("C:\\bin\\ed.exe", WindowTemplate {
            process_path: "C:\\bin\\ed.exe".into(),
            title: "Editor".into(),
            bounds: Rect::new(0, 0, 1920, 1080),
            visible: true,
            ..Default::default()
        });

    let workspace = WorkspaceDefinition {
        id: WorkspaceId::new(),
        name: "Writing".into(),
        creation_time: 0,
        last_launched_time: 0,
        is_shortcut_needed: false,
        move_existing_windows: true,
        applications: vec![a],
        // Captured on a monitor "A" at 3840x2160 that no longer exists.
        monitors: vec![monitor("A", 0, Rect::new(0, 0, 3840, 2160))],
    };
    h.store.save_workspace(workspace.clone()).unwrap();

    let cancel = CancelToken::new();
    h.launcher.launch_workspace(workspace.id, &cancel).unwrap();

    let handle = h.host.enumerate_top_level_windows()[0];
    let placement = h.host.get_placement(handle).unwrap();
    assert!(workspace_engine::geometry::within_tolerance(
        &placement.normal_rect,
        &Rect::new(0, 0, 960, 540),
        8
    ));
}

#[test]
fn empty_applications_list_fails_and_persists_nothing_new() {
    let h = harness();
    let workspace = WorkspaceDefinition {
        id: WorkspaceId::new(),
        name: "Empty".into(),
        creation_time: 0,
        last_launched_time: 0,
        is_shortcut_needed: false,
        move_existing_windows: true,
        applications: vec![],
        monitors: vec![],
    };
    h.store.save_workspace(workspace.clone()).unwrap();
    let before = std::fs::read_to_string(&h.store_path).unwrap();

    let cancel = CancelToken::new();
    let ok = h.launcher.launch_workspace(workspace.id, &cancel).unwrap();
    assert!(!ok);
    assert_eq!(h.host.process_count(), 0);

    let after = std::fs::read_to_string(&h.store_path).unwrap();
    assert_eq!(before, after, "empty-applications launch must not rewrite the document");
    let reloaded = h.store.load_by_id(workspace.id).unwrap().unwrap();
    assert_eq!(reloaded.last_launched_time, 0);
}
