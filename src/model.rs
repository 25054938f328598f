//! The persisted and in-memory data model: monitors, windows, application
//! definitions and the workspaces that group them.
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Rect;

/// An opaque top-level window handle.
///
/// Never dereferenced by this crate; only compared and passed back to the
/// [`DesktopHost`](crate::host::DesktopHost) that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

macro_rules! uuid_id {
    ($name:ident) => {
        /// A stable identifier, unique within its containing collection.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// The nil UUID, used as a sentinel for "not yet assigned".
            pub fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// Whether this id is the nil sentinel.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(WorkspaceId);
uuid_id!(ApplicationId);

/// `ApplicationDefinition.position` is persisted with `X`/`Y` keys while
/// every other rect in the document (the monitor rects) uses `left`/`top`;
/// this module bridges the mismatch without forking [`Rect`] itself.
#[cfg(feature = "serde")]
mod position_rect {
    use super::Rect;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct PositionJson {
        #[serde(rename = "X")]
        x: i32,
        #[serde(rename = "Y")]
        y: i32,
        width: i32,
        height: i32,
    }

    pub fn serialize<S: Serializer>(rect: &Rect, serializer: S) -> Result<S::Ok, S::Error> {
        PositionJson {
            x: rect.left,
            y: rect.top,
            width: rect.width,
            height: rect.height,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Rect, D::Error> {
        let json = PositionJson::deserialize(deserializer)?;
        Ok(Rect::new(json.x, json.y, json.width, json.height))
    }
}

/// A tristate answer for queries the host can't always resolve with
/// certainty (e.g. virtual-desktop membership on older shells).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tristate {
    /// The host is certain the answer is yes.
    Yes,
    /// The host is certain the answer is no.
    No,
    /// The host could not determine an answer.
    Unknown,
}

impl Tristate {
    /// Treat `Unknown` as `No` — used where failing to detect a condition
    /// should not itself block progress.
    pub fn unwrap_or_no(self) -> bool {
        matches!(self, Tristate::Yes)
    }

    /// Treat `Unknown` as `Yes` — used where absence of evidence should not
    /// be read as evidence of absence (e.g. don't minimize a window just
    /// because virtual-desktop membership couldn't be determined).
    pub fn unwrap_or_yes(self) -> bool {
        !matches!(self, Tristate::No)
    }
}

/// A physical monitor as observed at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MonitorInfo {
    /// Stable identifier for this physical monitor across refreshes.
    pub id: String,
    /// A more specific instance identifier (e.g. EDID-derived), when known.
    #[cfg_attr(feature = "serde", serde(rename = "instanceId", default))]
    pub instance_id: String,
    /// Zero-based enumeration order at capture time.
    #[cfg_attr(feature = "serde", serde(rename = "number"))]
    pub ordinal: i32,
    /// Dots per inch; always greater than zero.
    pub dpi: u32,
    /// Virtual-screen rect accounting for this monitor's DPI scaling.
    #[cfg_attr(feature = "serde", serde(rename = "dpiAwareRect"))]
    pub dpi_aware_rect: Rect,
    /// Virtual-screen rect ignoring DPI scaling (96 DPI reference frame).
    #[cfg_attr(feature = "serde", serde(rename = "dpiUnawareRect"))]
    pub dpi_unaware_rect: Rect,
}

impl MonitorInfo {
    /// A monitor used when enumeration fails entirely: 96 DPI, empty rects.
    pub fn default_for_enumeration_failure(ordinal: i32) -> Self {
        Self {
            id: String::new(),
            instance_id: String::new(),
            ordinal,
            dpi: 96,
            dpi_aware_rect: Rect::default(),
            dpi_unaware_rect: Rect::default(),
        }
    }
}

/// An immutable snapshot of a top-level window's attributes at one moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    /// The window handle this snapshot describes.
    pub handle: WindowHandle,
    /// Owning process id.
    pub process_id: u32,
    /// Fully expanded path to the owning process's executable.
    pub process_path: String,
    /// Basename of `process_path`.
    pub process_file_name: String,
    /// Process name with any `.exe` suffix stripped.
    pub process_name: String,
    /// Packaged-app full name, empty for unpackaged applications.
    pub package_full_name: String,
    /// Shell application-user-model-id, empty when not activatable by id.
    pub app_user_model_id: String,
    /// Window title at capture time.
    pub title: String,
    /// Window class name.
    pub class_name: String,
    /// Current on-screen bounds.
    pub bounds: Rect,
    /// Whether the window is currently showing (not hidden/destroyed).
    pub is_visible: bool,
    /// Id of the monitor the window currently resolves to.
    pub monitor_id: String,
    /// Ordinal of the monitor the window currently resolves to.
    pub monitor_ordinal: i32,
}

/// A declarative description of one application within a workspace.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ApplicationDefinition {
    /// Stable id, unique within the containing [`WorkspaceDefinition`].
    pub id: ApplicationId,
    /// Human-readable application name.
    #[cfg_attr(feature = "serde", serde(rename = "application"))]
    pub name: String,
    /// Captured window title, used as a last-resort matching signal.
    pub title: String,
    /// Fully expanded path to the application's executable.
    #[cfg_attr(feature = "serde", serde(rename = "application-path"))]
    pub path: String,
    /// Packaged-app full name.
    #[cfg_attr(feature = "serde", serde(rename = "package-full-name"))]
    pub package_full_name: String,
    /// Shell application-user-model-id.
    #[cfg_attr(feature = "serde", serde(rename = "app-user-model-id"))]
    pub app_user_model_id: String,
    /// Progressive-web-app identity, used to match browser-hosted PWAs.
    #[cfg_attr(feature = "serde", serde(rename = "pwa-app-id", default))]
    pub pwa_app_id: String,
    /// Extra command-line arguments passed when launching via path.
    #[cfg_attr(feature = "serde", serde(rename = "command-line-arguments", default))]
    pub command_line_arguments: String,
    /// Working directory used when launching via path.
    #[cfg_attr(feature = "serde", serde(rename = "working-directory", default))]
    pub working_directory: String,
    /// Whether the captured process was running elevated.
    #[cfg_attr(feature = "serde", serde(rename = "is-elevated", default))]
    pub is_elevated: bool,
    /// Whether this application may be relaunched elevated.
    #[cfg_attr(feature = "serde", serde(rename = "can-launch-elevated", default))]
    pub can_launch_elevated: bool,
    /// Target show-state: minimized.
    #[cfg_attr(feature = "serde", serde(default))]
    pub minimized: bool,
    /// Target show-state: maximized.
    #[cfg_attr(feature = "serde", serde(default))]
    pub maximized: bool,
    /// Ordinal of the monitor this application was captured on.
    #[cfg_attr(feature = "serde", serde(rename = "monitor"))]
    pub monitor_ordinal: i32,
    /// Target position in the captured monitor's coordinate space.
    #[cfg_attr(feature = "serde", serde(with = "position_rect"))]
    pub position: Rect,
    /// Free-form version string recorded at capture time.
    #[cfg_attr(feature = "serde", serde(default))]
    pub version: String,
}

impl ApplicationDefinition {
    /// Whether this definition's show-state invariant holds.
    pub fn has_valid_show_state(&self) -> bool {
        !(self.minimized && self.maximized)
    }
}

/// A named, ordered collection of application definitions plus the monitor
/// layout that was active when they were captured.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorkspaceDefinition {
    /// Stable id, unique within the containing [`WorkspaceDocument`].
    pub id: WorkspaceId,
    /// Display name, unique case-insensitively within the document.
    pub name: String,
    /// Unix-seconds timestamp of when this workspace was first captured.
    #[cfg_attr(feature = "serde", serde(rename = "creationTime"))]
    pub creation_time: i64,
    /// Unix-seconds timestamp of the most recent successful launch.
    #[cfg_attr(feature = "serde", serde(rename = "lastLaunchedTime", default))]
    pub last_launched_time: i64,
    /// Whether the UI layer should offer to create a desktop shortcut.
    #[cfg_attr(feature = "serde", serde(rename = "isShortcutNeeded", default))]
    pub is_shortcut_needed: bool,
    /// Whether launching this workspace may reuse/move windows that already
    /// exist, and minimize everything not part of the workspace.
    #[cfg_attr(feature = "serde", serde(rename = "moveExistingWindows", default))]
    pub move_existing_windows: bool,
    /// The applications that make up this workspace, in capture order.
    pub applications: Vec<ApplicationDefinition>,
    /// The monitor layout observed at capture time.
    pub monitors: Vec<MonitorInfo>,
}

impl WorkspaceDefinition {
    /// Whether `name` matches this workspace's name, ignoring case.
    pub fn name_eq_ignore_case(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// The full persisted document: every known workspace, most recently saved
/// first.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorkspaceDocument {
    /// All known workspace definitions, most-recently-saved first.
    pub workspaces: Vec<WorkspaceDefinition>,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_definition_rejects_minimized_and_maximized() {
        let mut app = sample_app();
        app.minimized = true;
        app.maximized = true;
        assert!(!app.has_valid_show_state());
    }

    #[test]
    fn workspace_name_matching_is_case_insensitive() {
        let mut ws = sample_workspace();
        ws.name = "Writing".into();
        assert!(ws.name_eq_ignore_case("writing"));
        assert!(ws.name_eq_ignore_case("WRITING"));
        assert!(!ws.name_eq_ignore_case("coding"));
    }

    fn sample_app() -> ApplicationDefinition {
        ApplicationDefinition {
            id: ApplicationId::new(),
            name: "Editor".into(),
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

    pub(crate) fn sample_workspace() -> WorkspaceDefinition {
        WorkspaceDefinition {
            id: WorkspaceId::new(),
            name: "Test".into(),
            creation_time: 0,
            last_launched_time: 0,
            is_shortcut_needed: false,
            move_existing_windows: true,
            applications: vec![sample_app()],
            monitors: vec![],
        }
    }
}
