//! The abstract capability this crate requires from the underlying OS.
//!
//! Nothing in this module talks to a real window manager: [`DesktopHost`] is
//! the seam between the engine and whatever platform glue a consumer wires
//! up (Win32, a Wayland compositor, X11, …). The engine only ever sees this
//! trait; see [`mock`] for the in-memory double used by this crate's own
//! tests and by downstream integration tests.
pub mod mock;

use std::time::Duration;

use crate::geometry::Rect;
use crate::model::{MonitorInfo, Tristate, WindowHandle, WindowInfo};

/// The on-screen show-state a window should be put into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowState {
    /// A regular, restored window.
    Normal,
    /// Minimized to the taskbar/dock.
    Minimized,
    /// Maximized to fill its monitor's work area.
    Maximized,
}

/// The `(normal_rect, is_minimized, is_maximized)` tuple returned by the
/// platform's window-placement query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// The window's restored (non-minimized, non-maximized) bounds.
    pub normal_rect: Rect,
    /// Whether the window is currently minimized.
    pub is_minimized: bool,
    /// Whether the window is currently maximized.
    pub is_maximized: bool,
}

/// A lifecycle or attribute-change notification for a single window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A new top-level window appeared, or an existing hidden one reappeared.
    Created(WindowHandle),
    /// A window's title changed.
    NameChanged(WindowHandle),
    /// A window's bounds or visibility changed without a full repaint.
    LocationChanged(WindowHandle),
    /// A window became visible again after being hidden.
    Shown(WindowHandle),
    /// A window was hidden but may still exist (e.g. minimized to tray).
    Hidden(WindowHandle),
    /// A window gained the foreground.
    ForegroundChanged(WindowHandle),
    /// A window was permanently destroyed.
    Destroyed(WindowHandle),
}

impl HostEvent {
    /// The handle this event concerns, for every variant.
    pub fn handle(&self) -> WindowHandle {
        match self {
            HostEvent::Created(h)
            | HostEvent::NameChanged(h)
            | HostEvent::LocationChanged(h)
            | HostEvent::Shown(h)
            | HostEvent::Hidden(h)
            | HostEvent::ForegroundChanged(h)
            | HostEvent::Destroyed(h) => *h,
        }
    }
}

/// A subscription callback invoked once per [`HostEvent`].
///
/// Implementations that panic inside this callback must not be allowed to
/// take down the event-dispatch thread; callers of `subscribe` are expected
/// to catch and swallow such failures (see [`crate::window_index::WindowIndex`]).
pub type EventSink = Box<dyn Fn(HostEvent) + Send + Sync>;

/// The capability surface the engine needs from the platform it runs on.
///
/// An implementation must be `Send + Sync`: the engine issues calls from its
/// own worker threads as well as from the caller's thread.
pub trait DesktopHost: Send + Sync {
    /// Enumerate the currently attached monitors, with DPI and both
    /// DPI-aware and DPI-unaware rects. Must never fail outright; on partial
    /// enumeration failure, return what could be determined (or an empty
    /// vec — callers treat that as "no monitors known yet").
    fn enumerate_monitors(&self) -> Vec<MonitorInfo>;

    /// Enumerate every currently live top-level window handle.
    fn enumerate_top_level_windows(&self) -> Vec<WindowHandle>;

    /// Query the current attributes of `handle`, or `None` if it no longer
    /// exists.
    fn query_window(&self, handle: WindowHandle) -> Option<WindowInfo>;

    /// Register a sink to be invoked for every lifecycle event the host
    /// observes. May be called more than once; every sink receives every
    /// event.
    fn subscribe(&self, sink: EventSink);

    /// Whether `handle` still refers to a live top-level window.
    fn is_window(&self, handle: WindowHandle) -> bool;

    /// Whether `handle` is logically present but not rendered (suspended
    /// UWP host, off-screen virtual desktop, …).
    fn is_cloaked(&self, handle: WindowHandle) -> Tristate;

    /// Whether `handle` is on the virtual desktop the user is currently
    /// looking at.
    fn is_on_current_virtual_desktop(&self, handle: WindowHandle) -> Tristate;

    /// Whether `handle` carries the platform's "tool window" style bit
    /// (palettes, floating toolbars — excluded from snapshot/launch).
    fn has_tool_window_style(&self, handle: WindowHandle) -> bool;

    /// Whether `handle` supports being minimized via its title bar box.
    fn can_minimize(&self, handle: WindowHandle) -> bool;

    /// Query the window's current placement.
    fn get_placement(&self, handle: WindowHandle) -> Option<Placement>;

    /// Move/resize `handle` to `rect` without activating it or changing its
    /// z-order. Returns `false` on failure (e.g. UIPI-elevated peer); the
    /// launcher treats this as best-effort and continues.
    fn set_position(&self, handle: WindowHandle, rect: Rect) -> bool;

    /// Apply a show-state transition to `handle`.
    fn show(&self, handle: WindowHandle, state: ShowState) -> bool;

    /// Block up to `timeout` for the process owning `pid` to report
    /// input-idle. Returns `false` on timeout; never an error.
    fn wait_for_input_idle(&self, pid: u32, timeout: Duration) -> bool;

    /// Activate a packaged application by its app-user-model-id.
    fn activate_by_aumid(&self, aumid: &str, args: &str) -> crate::Result<u32>;

    /// Find-then-launch a packaged application by its full package name.
    fn launch_package(&self, full_name: &str) -> crate::Result<()>;

    /// Start an unpackaged process.
    fn start_process(&self, request: StartProcessRequest<'_>) -> crate::Result<u32>;
}

/// Parameters for [`DesktopHost::start_process`].
#[derive(Debug, Clone, Copy)]
pub struct StartProcessRequest<'a> {
    /// Path to the executable, or a `shell:`-prefixed shell item.
    pub path: &'a str,
    /// Extra command-line arguments.
    pub args: &'a str,
    /// Force shell-execute even for a regular file path.
    pub shell_execute: bool,
    /// Request elevation via the `runas` verb.
    pub runas: bool,
    /// Working directory for the new process.
    pub working_directory: &'a str,
}
