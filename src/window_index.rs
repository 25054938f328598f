//! A live, thread-safe cache of top-level windows kept in sync with the
//! [`DesktopHost`] event stream.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::host::{DesktopHost, HostEvent};
use crate::model::{WindowHandle, WindowInfo};

/// What changed about the window index as a result of processing one
/// [`HostEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEvent {
    /// `handle` is new to the index (first sighting, or reappearance after
    /// being hidden).
    Created(WindowHandle),
    /// `handle` was already known and one or more attributes changed.
    Updated(WindowHandle),
    /// `handle` was permanently removed.
    Destroyed(WindowHandle),
}

type Subscriber = Box<dyn Fn(IndexEvent) + Send + Sync>;

/// Live map of `handle -> WindowInfo`, rebuilt entry-by-entry from host
/// lifecycle events.
///
/// Hiding a window removes it from enumeration results but *not* from the
/// index's bookkeeping in the sense that it can reappear: only a `destroy`
/// event drops the entry outright, matching the spec's "hide does not
/// because a hidden window may reappear" rule. In this implementation a
/// hidden window is simply marked `is_visible = false` and remains queryable
/// until it is destroyed or shown again.
pub struct WindowIndex {
    host: Arc<dyn DesktopHost>,
    windows: RwLock<HashMap<WindowHandle, WindowInfo>>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl WindowIndex {
    /// Build an index over `host`, performing an initial full enumeration
    /// and subscribing to further lifecycle events.
    pub fn new(host: Arc<dyn DesktopHost>) -> Arc<Self> {
        let index = Arc::new(Self {
            host: host.clone(),
            windows: RwLock::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
        });

        for handle in host.enumerate_top_level_windows() {
            if let Some(info) = host.query_window(handle) {
                index.windows.write().unwrap().insert(handle, info);
            }
        }

        let weak = Arc::downgrade(&index);
        host.subscribe(Box::new(move |event| {
            if let Some(index) = weak.upgrade() {
                index.handle_host_event(event);
            }
        }));

        index
    }

    /// Register a subscriber for index-level change notifications.
    pub fn subscribe(&self, sink: Subscriber) {
        self.subscribers.lock().unwrap().push(sink);
    }

    /// A point-in-time snapshot of every known window, in arbitrary order.
    pub fn snapshot(&self) -> Vec<WindowInfo> {
        self.windows.read().unwrap().values().cloned().collect()
    }

    /// Look up a single window by handle.
    pub fn get(&self, handle: WindowHandle) -> Option<WindowInfo> {
        self.windows.read().unwrap().get(&handle).cloned()
    }

    /// Windows matching `predicate`, optionally restricted to a single
    /// owning process.
    pub fn find(
        &self,
        expected_process_id: Option<u32>,
        predicate: impl Fn(&WindowInfo) -> bool,
    ) -> Vec<WindowInfo> {
        self.windows
            .read()
            .unwrap()
            .values()
            .filter(|w| expected_process_id.map_or(true, |pid| w.process_id == pid))
            .filter(|w| predicate(w))
            .cloned()
            .collect()
    }

    /// Poll `find` at `poll_interval` until a window matching `predicate`
    /// and not already in `known_handles` appears, or `timeout` elapses.
    /// Returns an empty vec on timeout.
    pub fn wait_for_windows(
        &self,
        predicate: impl Fn(&WindowInfo) -> bool,
        known_handles: &[WindowHandle],
        expected_process_id: Option<u32>,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Vec<WindowInfo> {
        let deadline = Instant::now() + timeout;
        loop {
            let matches: Vec<WindowInfo> = self
                .find(expected_process_id, &predicate)
                .into_iter()
                .filter(|w| !known_handles.contains(&w.handle))
                .collect();
            if !matches.is_empty() {
                return matches;
            }
            if Instant::now() >= deadline {
                return Vec::new();
            }
            std::thread::sleep(poll_interval.min(deadline.saturating_duration_since(Instant::now())));
        }
    }

    fn handle_host_event(&self, event: HostEvent) {
        let handle = event.handle();
        match event {
            HostEvent::Destroyed(_) => {
                let existed = self.windows.write().unwrap().remove(&handle).is_some();
                if existed {
                    self.publish(IndexEvent::Destroyed(handle));
                }
            }
            HostEvent::Hidden(_) => {
                if let Some(w) = self.windows.write().unwrap().get_mut(&handle) {
                    w.is_visible = false;
                }
                // No publish: a hidden window may reappear and is not yet gone.
            }
            HostEvent::Created(_)
            | HostEvent::Shown(_)
            | HostEvent::NameChanged(_)
            | HostEvent::ForegroundChanged(_) => {
                self.requery_and_publish(handle);
            }
            HostEvent::LocationChanged(_) => {
                self.apply_location_change(handle);
            }
        }
    }

    fn requery_and_publish(&self, handle: WindowHandle) {
        let Some(info) = self.host.query_window(handle) else {
            trace!(?handle, "requery found no window, dropping");
            self.windows.write().unwrap().remove(&handle);
            return;
        };
        let is_new = {
            let mut windows = self.windows.write().unwrap();
            let is_new = !windows.contains_key(&handle);
            windows.insert(handle, info);
            is_new
        };
        self.publish(if is_new {
            IndexEvent::Created(handle)
        } else {
            IndexEvent::Updated(handle)
        });
    }

    fn apply_location_change(&self, handle: WindowHandle) {
        let Some(info) = self.host.query_window(handle) else {
            return;
        };
        let mut windows = self.windows.write().unwrap();
        if let Some(existing) = windows.get_mut(&handle) {
            existing.bounds = info.bounds;
            existing.is_visible = info.is_visible;
            existing.monitor_id = info.monitor_id;
            existing.monitor_ordinal = info.monitor_ordinal;
            drop(windows);
            self.publish(IndexEvent::Updated(handle));
        }
    }

    fn publish(&self, event: IndexEvent) {
        let subs = self.subscribers.lock().unwrap();
        for sub in subs.iter() {
            if let Err(_panic) =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sub(event.clone())))
            {
                warn!("window index subscriber panicked; swallowing to keep the stream alive");
            }
        }
    }
}
