//! A polled, change-coalesced cache of the current monitor layout.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use crate::config::EngineConfig;
use crate::geometry::Rect;
use crate::host::DesktopHost;
use crate::model::MonitorInfo;

type Subscriber = Box<dyn Fn(&[MonitorInfo]) + Send + Sync>;

/// Caches [`MonitorInfo`] from a [`DesktopHost`], refreshing on a fixed
/// cadence and only publishing a change when the layout actually differs.
pub struct DisplayIndex {
    host: Arc<dyn DesktopHost>,
    monitors: RwLock<Vec<MonitorInfo>>,
    subscribers: Mutex<Vec<Subscriber>>,
    refreshing: AtomicBool,
    config: EngineConfig,
}

impl DisplayIndex {
    /// Build an index with an initial refresh already applied.
    pub fn new(host: Arc<dyn DesktopHost>) -> Arc<Self> {
        Self::with_config(host, EngineConfig::default())
    }

    /// Build an index using non-default tunables (tests shrinking the poll
    /// interval, typically).
    pub fn with_config(host: Arc<dyn DesktopHost>, config: EngineConfig) -> Arc<Self> {
        let index = Arc::new(Self {
            host,
            monitors: RwLock::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            refreshing: AtomicBool::new(false),
            config,
        });
        index.refresh();
        index
    }

    /// Register a subscriber invoked with the new layout whenever it
    /// changes.
    pub fn subscribe(&self, sink: Subscriber) {
        self.subscribers.lock().unwrap().push(sink);
    }

    /// The most recently observed monitor layout.
    pub fn monitors(&self) -> Vec<MonitorInfo> {
        self.monitors.read().unwrap().clone()
    }

    /// Poll the host once. A concurrent call while a refresh is already in
    /// flight is a no-op, matching the single-entry-flag guard in the spec.
    pub fn refresh(&self) {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let fresh = self.host.enumerate_monitors();
        let changed = {
            let current = self.monitors.read().unwrap();
            !layouts_equal(&current, &fresh)
        };
        if changed {
            *self.monitors.write().unwrap() = fresh.clone();
            debug!(count = fresh.len(), "monitor layout changed");
            let subs = self.subscribers.lock().unwrap();
            for sub in subs.iter() {
                sub(&fresh);
            }
        }

        self.refreshing.store(false, Ordering::SeqCst);
    }

    /// Spawn a detached thread that calls [`Self::refresh`] on
    /// [`Self::POLL_INTERVAL`] until the returned guard is dropped.
    pub fn spawn_poll_thread(self: &Arc<Self>) -> PollGuard {
        let index = self.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();
        let interval = self.config.monitor_poll_interval;
        let handle = std::thread::spawn(move || {
            while !stop_clone.load(Ordering::SeqCst) {
                std::thread::sleep(interval);
                if stop_clone.load(Ordering::SeqCst) {
                    break;
                }
                index.refresh();
            }
        });
        PollGuard {
            stop,
            handle: Some(handle),
        }
    }

    /// Return the monitor whose rect contains `rect`'s center, falling back
    /// to whichever monitor has the largest intersection area, or `None` if
    /// there are no monitors at all.
    pub fn resolve_monitor(&self, rect: Rect) -> Option<MonitorInfo> {
        let monitors = self.monitors.read().unwrap();
        if monitors.is_empty() {
            return None;
        }

        let (cx, cy) = rect.center();
        if let Some(m) = monitors
            .iter()
            .find(|m| m.dpi_aware_rect.contains_point(cx, cy))
        {
            return Some(m.clone());
        }

        monitors
            .iter()
            .max_by_key(|m| m.dpi_aware_rect.intersection_area(&rect))
            .cloned()
    }
}

/// Stops the background poll thread when dropped.
pub struct PollGuard {
    stop: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn layouts_equal(a: &[MonitorInfo], b: &[MonitorInfo]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b.iter()).all(|(x, y)| {
            x.id == y.id && x.dpi == y.dpi && x.dpi_aware_rect == y.dpi_aware_rect
        })
}
