//! An in-memory [`DesktopHost`] used by this crate's own tests and made
//! available to downstream integration tests.
//!
//! Modeled on the "mock trait forwards to the real trait" pattern the
//! grounding window-manager library uses for its own X connection: state
//! lives behind a single mutex, every [`DesktopHost`] method is a thin,
//! deterministic read or write against it, and process activation is
//! simulated by immediately materializing the window a real launch would
//! eventually produce.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use crate::geometry::Rect;
use crate::model::{MonitorInfo, Tristate, WindowHandle, WindowInfo};

use super::{DesktopHost, EventSink, HostEvent, Placement, ShowState, StartProcessRequest};

#[derive(Debug, Clone)]
struct MockWindow {
    info: WindowInfo,
    placement: Placement,
    cloaked: Tristate,
    on_current_desktop: Tristate,
    tool_window: bool,
    can_minimize: bool,
}

/// A window to pre-register, or to materialize when a matching process is
/// launched.
#[derive(Debug, Clone, Default)]
pub struct WindowTemplate {
    /// Owning process path; also used to key launch-time materialization.
    pub process_path: String,
    /// Shell app-user-model-id the window should carry, if any.
    pub app_user_model_id: String,
    /// Packaged-app full name, if any.
    pub package_full_name: String,
    /// Window title.
    pub title: String,
    /// Window class name.
    pub class_name: String,
    /// Initial bounds.
    pub bounds: Rect,
    /// Whether the window should start visible.
    pub visible: bool,
}

struct MockState {
    monitors: Vec<MonitorInfo>,
    windows: HashMap<WindowHandle, MockWindow>,
    /// Launch keys (path or aumid or package full name) to the window that
    /// should appear once that key is activated.
    launch_templates: HashMap<String, WindowTemplate>,
    /// pid -> process path, for processes started via `start_process`.
    processes: HashMap<u32, String>,
    activation_log: Vec<String>,
}

/// A deterministic, fully in-process [`DesktopHost`] double.
pub struct MockDesktopHost {
    state: Mutex<MockState>,
    subscribers: RwLock<Vec<EventSink>>,
    next_handle: AtomicU64,
    next_pid: AtomicU32,
}

impl Default for MockDesktopHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDesktopHost {
    /// An empty desktop: no monitors, no windows.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                monitors: Vec::new(),
                windows: HashMap::new(),
                launch_templates: HashMap::new(),
                processes: HashMap::new(),
                activation_log: Vec::new(),
            }),
            subscribers: RwLock::new(Vec::new()),
            next_handle: AtomicU64::new(1),
            next_pid: AtomicU32::new(1000),
        }
    }

    /// Replace the monitor layout.
    pub fn set_monitors(&self, monitors: Vec<MonitorInfo>) {
        let mut state = self.state.lock().unwrap();
        state.monitors = monitors;
    }

    /// Create a live window from a [`WindowTemplate`] and fire `Created`.
    /// Returns the handle assigned to it.
    pub fn spawn_window(&self, template: WindowTemplate) -> WindowHandle {
        let handle = WindowHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        let info = WindowInfo {
            handle,
            process_id: 0,
            process_path: template.process_path.clone(),
            process_file_name: basename(&template.process_path),
            process_name: stem_without_exe(&template.process_path),
            package_full_name: template.package_full_name.clone(),
            app_user_model_id: template.app_user_model_id.clone(),
            title: template.title.clone(),
            class_name: template.class_name.clone(),
            bounds: template.bounds,
            is_visible: template.visible,
            monitor_id: String::new(),
            monitor_ordinal: 0,
        };
        let window = MockWindow {
            placement: Placement {
                normal_rect: template.bounds,
                is_minimized: false,
                is_maximized: false,
            },
            info,
            cloaked: Tristate::No,
            on_current_desktop: Tristate::Yes,
            tool_window: false,
            can_minimize: true,
        };
        self.state.lock().unwrap().windows.insert(handle, window);
        self.fire(HostEvent::Created(handle));
        handle
    }

    /// Register a window that should be materialized the moment `key`
    /// (a path, AUMID or package full name) is activated.
    pub fn register_launch_template(&self, key: impl Into<String>, template: WindowTemplate) {
        self.state
            .lock()
            .unwrap()
            .launch_templates
            .insert(key.into(), template);
    }

    /// Simulate the owning process of `handle` exiting.
    pub fn destroy_window(&self, handle: WindowHandle) {
        self.state.lock().unwrap().windows.remove(&handle);
        self.fire(HostEvent::Destroyed(handle));
    }

    /// Move `handle` out from under the engine's feet, as if a user dragged
    /// it, and fire `LocationChanged`.
    pub fn relocate_window(&self, handle: WindowHandle, bounds: Rect) {
        let mut state = self.state.lock().unwrap();
        if let Some(w) = state.windows.get_mut(&handle) {
            w.info.bounds = bounds;
            w.placement.normal_rect = bounds;
        }
        drop(state);
        self.fire(HostEvent::LocationChanged(handle));
    }

    /// Mark `handle` cloaked or not.
    pub fn set_cloaked(&self, handle: WindowHandle, cloaked: Tristate) {
        if let Some(w) = self.state.lock().unwrap().windows.get_mut(&handle) {
            w.cloaked = cloaked;
        }
    }

    /// Mark whether `handle` is on the currently active virtual desktop.
    pub fn set_on_current_virtual_desktop(&self, handle: WindowHandle, value: Tristate) {
        if let Some(w) = self.state.lock().unwrap().windows.get_mut(&handle) {
            w.on_current_desktop = value;
        }
    }

    /// Number of processes started via [`DesktopHost::start_process`] or
    /// activation calls so far.
    pub fn process_count(&self) -> usize {
        self.state.lock().unwrap().processes.len()
    }

    /// The ordered log of activation attempts (`"aumid:x"`, `"package:x"`,
    /// `"path:x"`), for assertions about which fallback fired.
    pub fn activation_log(&self) -> Vec<String> {
        self.state.lock().unwrap().activation_log.clone()
    }

    fn fire(&self, event: HostEvent) {
        let subs = self.subscribers.read().unwrap();
        for sink in subs.iter() {
            // A panicking sink must not prevent other subscribers (or the
            // caller) from observing the rest of the event stream.
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink(event.clone())));
        }
    }

    fn materialize_launch(&self, key: &str, pid: u32) {
        let template = {
            let state = self.state.lock().unwrap();
            state.launch_templates.get(key).cloned()
        };
        if let Some(mut template) = template {
            if !template.visible {
                template.visible = true;
            }
            let handle = self.spawn_window(template);
            if let Some(w) = self.state.lock().unwrap().windows.get_mut(&handle) {
                w.info.process_id = pid;
            }
        }
    }

    fn record_process(&self, path: &str) -> u32 {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .unwrap()
            .processes
            .insert(pid, path.to_string());
        pid
    }
}

fn basename(path: &str) -> String {
    path.rsplit(['\\', '/']).next().unwrap_or(path).to_string()
}

fn stem_without_exe(path: &str) -> String {
    let base = basename(path);
    base.strip_suffix(".exe")
        .or_else(|| base.strip_suffix(".EXE"))
        .unwrap_or(&base)
        .to_string()
}

impl DesktopHost for MockDesktopHost {
    fn enumerate_monitors(&self) -> Vec<MonitorInfo> {
        self.state.lock().unwrap().monitors.clone()
    }

    fn enumerate_top_level_windows(&self) -> Vec<WindowHandle> {
        self.state.lock().unwrap().windows.keys().copied().collect()
    }

    fn query_window(&self, handle: WindowHandle) -> Option<WindowInfo> {
        self.state
            .lock()
            .unwrap()
            .windows
            .get(&handle)
            .map(|w| w.info.clone())
    }

    fn subscribe(&self, sink: EventSink) {
        self.subscribers.write().unwrap().push(sink);
    }

    fn is_window(&self, handle: WindowHandle) -> bool {
        self.state.lock().unwrap().windows.contains_key(&handle)
    }

    fn is_cloaked(&self, handle: WindowHandle) -> Tristate {
        self.state
            .lock()
            .unwrap()
            .windows
            .get(&handle)
            .map(|w| w.cloaked)
            .unwrap_or(Tristate::Unknown)
    }

    fn is_on_current_virtual_desktop(&self, handle: WindowHandle) -> Tristate {
        self.state
            .lock()
            .unwrap()
            .windows
            .get(&handle)
            .map(|w| w.on_current_desktop)
            .unwrap_or(Tristate::Unknown)
    }

    fn has_tool_window_style(&self, handle: WindowHandle) -> bool {
        self.state
            .lock()
            .unwrap()
            .windows
            .get(&handle)
            .map(|w| w.tool_window)
            .unwrap_or(false)
    }

    fn can_minimize(&self, handle: WindowHandle) -> bool {
        self.state
            .lock()
            .unwrap()
            .windows
            .get(&handle)
            .map(|w| w.can_minimize)
            .unwrap_or(false)
    }

    fn get_placement(&self, handle: WindowHandle) -> Option<Placement> {
        self.state
            .lock()
            .unwrap()
            .windows
            .get(&handle)
            .map(|w| w.placement)
    }

    fn set_position(&self, handle: WindowHandle, rect: Rect) -> bool {
        let mut state = self.state.lock().unwrap();
        if let Some(w) = state.windows.get_mut(&handle) {
            w.placement.normal_rect = rect;
            w.placement.is_minimized = false;
            w.placement.is_maximized = false;
            w.info.bounds = rect;
            true
        } else {
            false
        }
    }

    fn show(&self, handle: WindowHandle, state: ShowState) -> bool {
        let mut guard = self.state.lock().unwrap();
        if let Some(w) = guard.windows.get_mut(&handle) {
            match state {
                ShowState::Normal => {
                    w.placement.is_minimized = false;
                    w.placement.is_maximized = false;
                }
                ShowState::Minimized => w.placement.is_minimized = true,
                ShowState::Maximized => {
                    w.placement.is_maximized = true;
                    w.placement.is_minimized = false;
                }
            }
            w.info.is_visible = true;
            true
        } else {
            false
        }
    }

    fn wait_for_input_idle(&self, _pid: u32, _timeout: Duration) -> bool {
        true
    }

    fn activate_by_aumid(&self, aumid: &str, _args: &str) -> crate::Result<u32> {
        let pid = self.record_process(aumid);
        self.state
            .lock()
            .unwrap()
            .activation_log
            .push(format!("aumid:{aumid}"));
        self.materialize_launch(aumid, pid);
        Ok(pid)
    }

    fn launch_package(&self, full_name: &str) -> crate::Result<()> {
        let pid = self.record_process(full_name);
        self.state
            .lock()
            .unwrap()
            .activation_log
            .push(format!("package:{full_name}"));
        self.materialize_launch(full_name, pid);
        Ok(())
    }

    fn start_process(&self, request: StartProcessRequest<'_>) -> crate::Result<u32> {
        let pid = self.record_process(request.path);
        self.state
            .lock()
            .unwrap()
            .activation_log
            .push(format!("path:{}", request.path));
        self.materialize_launch(request.path, pid);
        Ok(pid)
    }
}
