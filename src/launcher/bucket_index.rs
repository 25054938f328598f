//! Buckets a [`WindowIndex`](crate::window_index::WindowIndex) snapshot by
//! every signal [`crate::matcher::score`] can match on, so Phase 1 Pass 1
//! can gather a small candidate set per app instead of rescanning every
//! window on the desktop.
use std::collections::HashMap;

use crate::matcher::KNOWN_BROWSERS;
use crate::model::{ApplicationDefinition, WindowHandle, WindowInfo};

fn package_family(full_name: &str) -> Option<String> {
    let parts: Vec<&str> = full_name.split('_').collect();
    if parts.len() < 2 {
        return None;
    }
    Some(format!("{}_{}", parts[0], parts[parts.len() - 1]))
}

fn strip_exe(name: &str) -> String {
    name.strip_suffix(".exe")
        .or_else(|| name.strip_suffix(".EXE"))
        .unwrap_or(name)
        .to_ascii_lowercase()
}

/// A read-only index over one [`WindowIndex`](crate::window_index::WindowIndex)
/// snapshot, bucketed so a caller can fetch the small set of windows that
/// *could* match an [`ApplicationDefinition`] without a full linear scan.
pub struct WindowSnapshotIndex {
    by_aumid: HashMap<String, Vec<WindowHandle>>,
    by_package_full_name: HashMap<String, Vec<WindowHandle>>,
    by_package_family: HashMap<String, Vec<WindowHandle>>,
    by_process_path: HashMap<String, Vec<WindowHandle>>,
    by_process_file_name: HashMap<String, Vec<WindowHandle>>,
    by_process_name: HashMap<String, Vec<WindowHandle>>,
    by_title: HashMap<String, Vec<WindowHandle>>,
    browser_windows: Vec<WindowHandle>,
    windows: HashMap<WindowHandle, WindowInfo>,
}

impl WindowSnapshotIndex {
    /// Build buckets over `snapshot`.
    pub fn build(snapshot: Vec<WindowInfo>) -> Self {
        let mut index = Self {
            by_aumid: HashMap::new(),
            by_package_full_name: HashMap::new(),
            by_package_family: HashMap::new(),
            by_process_path: HashMap::new(),
            by_process_file_name: HashMap::new(),
            by_process_name: HashMap::new(),
            by_title: HashMap::new(),
            browser_windows: Vec::new(),
            windows: HashMap::new(),
        };

        for window in snapshot {
            let handle = window.handle;

            if !window.app_user_model_id.is_empty() {
                index
                    .by_aumid
                    .entry(window.app_user_model_id.to_ascii_lowercase())
                    .or_default()
                    .push(handle);
            }
            if !window.package_full_name.is_empty() {
                index
                    .by_package_full_name
                    .entry(window.package_full_name.to_ascii_lowercase())
                    .or_default()
                    .push(handle);
                if let Some(family) = package_family(&window.package_full_name) {
                    index
                        .by_package_family
                        .entry(family.to_ascii_lowercase())
                        .or_default()
                        .push(handle);
                }
            }
            if !window.process_path.is_empty() {
                index
                    .by_process_path
                    .entry(window.process_path.to_ascii_lowercase())
                    .or_default()
                    .push(handle);
            }
            if !window.process_file_name.is_empty() {
                index
                    .by_process_file_name
                    .entry(window.process_file_name.to_ascii_lowercase())
                    .or_default()
                    .push(handle);
                if KNOWN_BROWSERS
                    .iter()
                    .any(|b| b.eq_ignore_ascii_case(&window.process_file_name))
                {
                    index.browser_windows.push(handle);
                }
            }
            if !window.process_name.is_empty() {
                index
                    .by_process_name
                    .entry(strip_exe(&window.process_name))
                    .or_default()
                    .push(handle);
            }
            if !window.title.is_empty() {
                index
                    .by_title
                    .entry(window.title.to_ascii_lowercase())
                    .or_default()
                    .push(handle);
            }

            index.windows.insert(handle, window);
        }

        index
    }

    /// Look up a window's attributes by handle.
    pub fn info(&self, handle: WindowHandle) -> Option<&WindowInfo> {
        self.windows.get(&handle)
    }

    /// The union of every bucket reachable from `app`'s own signals, or the
    /// full snapshot if none of its signals hit a bucket.
    pub fn candidates_for(&self, app: &ApplicationDefinition) -> Vec<WindowHandle> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut push_all = |handles: &[WindowHandle], seen: &mut std::collections::HashSet<WindowHandle>, out: &mut Vec<WindowHandle>| {
            for h in handles {
                if seen.insert(*h) {
                    out.push(*h);
                }
            }
        };

        if !app.app_user_model_id.is_empty() {
            if let Some(hs) = self.by_aumid.get(&app.app_user_model_id.to_ascii_lowercase()) {
                push_all(hs, &mut seen, &mut out);
            }
        }
        if !app.package_full_name.is_empty() {
            if let Some(hs) = self
                .by_package_full_name
                .get(&app.package_full_name.to_ascii_lowercase())
            {
                push_all(hs, &mut seen, &mut out);
            }
            if let Some(family) = package_family(&app.package_full_name) {
                if let Some(hs) = self.by_package_family.get(&family.to_ascii_lowercase()) {
                    push_all(hs, &mut seen, &mut out);
                }
            }
        }
        if !app.path.is_empty() {
            if let Some(hs) = self.by_process_path.get(&app.path.to_ascii_lowercase()) {
                push_all(hs, &mut seen, &mut out);
            }
        }
        if !app.name.is_empty() {
            if let Some(hs) = self.by_process_file_name.get(&app.name.to_ascii_lowercase()) {
                push_all(hs, &mut seen, &mut out);
            }
            if let Some(hs) = self.by_process_name.get(&strip_exe(&app.name)) {
                push_all(hs, &mut seen, &mut out);
            }
        }
        if !app.title.is_empty() {
            if let Some(hs) = self.by_title.get(&app.title.to_ascii_lowercase()) {
                push_all(hs, &mut seen, &mut out);
            }
        }
        if !app.pwa_app_id.is_empty() {
            push_all(&self.browser_windows.clone(), &mut seen, &mut out);
        }

        if out.is_empty() {
            return self.windows.keys().copied().collect();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::model::test_support::sample_application;

    fn window(process_path: &str, title: &str) -> WindowInfo {
        WindowInfo {
            handle: WindowHandle(1),
            process_id: 1,
            process_path: process_path.into(),
            process_file_name: process_path.rsplit('\\').next().unwrap_or(process_path).into(),
            process_name: String::new(),
            package_full_name: String::new(),
            app_user_model_id: String::new(),
            title: title.into(),
            class_name: String::new(),
            bounds: Rect::new(0, 0, 100, 100),
            is_visible: true,
            monitor_id: String::new(),
            monitor_ordinal: 0,
        }
    }

    #[test]
    fn candidates_for_falls_back_to_full_snapshot_when_nothing_buckets() {
        let index = WindowSnapshotIndex::build(vec![window("C:\\bin\\ed.exe", "Editor")]);
        let mut app = sample_application("Nothing");
        app.path = "C:\\other\\thing.exe".into();
        app.title = "Unrelated".into();
        assert_eq!(index.candidates_for(&app).len(), 1);
    }

    #[test]
    fn candidates_for_matches_on_process_path_bucket() {
        let mut w1 = window("C:\\bin\\ed.exe", "Editor");
        w1.handle = WindowHandle(1);
        let mut w2 = window("C:\\bin\\other.exe", "Other");
        w2.handle = WindowHandle(2);
        let index = WindowSnapshotIndex::build(vec![w1, w2]);

        let mut app = sample_application("ed");
        app.path = "C:\\bin\\ed.exe".into();
        let candidates = index.candidates_for(&app);
        assert_eq!(candidates, vec![WindowHandle(1)]);
    }

    #[test]
    fn package_family_ignores_version_and_architecture_segments() {
        let family = package_family("Contoso.App_1.0.0.0_x64__8wekyb3d8bbwe").unwrap();
        assert_eq!(family, "Contoso.App_8wekyb3d8bbwe");
    }
}
