//! A pure, dependency-free scoring function for (window, application)
//! pairs. Kept free of placement/area tiebreaking on purpose: the launcher
//! composes [`score`] with its own ranking concerns rather than baking them
//! in here, so this module stays trivially unit-testable.
use crate::model::{ApplicationDefinition, WindowInfo};

/// The windows process that hosts certain packaged apps; its own identity
/// does not describe the logical application running inside it, so title
/// matching is used as a fallback whenever this binary owns the window.
pub const APPLICATION_FRAME_HOST: &str = "ApplicationFrameHost.exe";

/// Process file names treated as "a browser" for PWA alias matching.
pub const KNOWN_BROWSERS: &[&str] = &[
    "chrome.exe",
    "msedge.exe",
    "firefox.exe",
    "brave.exe",
    "opera.exe",
];

/// The signal tier a non-zero match was won on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    /// `app_user_model_id` equality, including the PWA substring alias.
    AppUserModelId = 100,
    /// Fully expanded process path equality.
    ProcessPath = 90,
    /// Process file name (basename) equality.
    ProcessFileName = 70,
    /// Process name equality after stripping `.exe`.
    ProcessName = 55,
    /// Title equality — ambiguous, since titles are not unique.
    TitleOnly = 30,
}

impl MatchTier {
    fn score(self) -> i32 {
        self as i32
    }
}

/// The result of scoring a (window, application) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchScore {
    /// The numeric score; `<= 0` means "not a match".
    pub score: i32,
    /// The tier that produced `score`, if any signal matched.
    pub tier: Option<MatchTier>,
}

impl MatchScore {
    const NONE: MatchScore = MatchScore {
        score: 0,
        tier: None,
    };

    /// Whether this represents a real match (`score > 0`).
    pub fn is_match(&self) -> bool {
        self.score > 0
    }

    /// Whether this match is title-only, and therefore ambiguous unless the
    /// caller can disambiguate some other way.
    pub fn is_title_only(&self) -> bool {
        self.tier == Some(MatchTier::TitleOnly)
    }
}

fn eq_ignore_case_nonempty(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && a.eq_ignore_ascii_case(b)
}

fn strip_exe(name: &str) -> &str {
    name.strip_suffix(".exe")
        .or_else(|| name.strip_suffix(".EXE"))
        .unwrap_or(name)
}

/// Whether `path` names the OS application-frame-host binary.
pub fn is_application_frame_host(path: &str) -> bool {
    path.rsplit(['\\', '/'])
        .next()
        .map(|basename| basename.eq_ignore_ascii_case(APPLICATION_FRAME_HOST))
        .unwrap_or(false)
}

fn is_known_browser(process_file_name: &str) -> bool {
    KNOWN_BROWSERS
        .iter()
        .any(|b| process_file_name.eq_ignore_ascii_case(b))
}

/// Score how well `window` matches `app`, per the fixed, ordered signal
/// table: the first tier (highest score) that matches wins; lower tiers
/// never raise a higher tier's score, they only matter when nothing
/// stronger matched.
///
/// Deterministic and pure: the result depends only on the fields of
/// `window` and `app`.
pub fn score(window: &WindowInfo, app: &ApplicationDefinition) -> MatchScore {
    if eq_ignore_case_nonempty(&window.app_user_model_id, &app.app_user_model_id) {
        return MatchScore {
            score: MatchTier::AppUserModelId.score(),
            tier: Some(MatchTier::AppUserModelId),
        };
    }

    // PWA alias: a known browser's window is eligible when its AUMID
    // *contains* the app's pwa_app_id, not just equals it.
    if !app.pwa_app_id.is_empty()
        && !window.app_user_model_id.is_empty()
        && is_known_browser(&window.process_file_name)
        && window
            .app_user_model_id
            .to_ascii_lowercase()
            .contains(&app.pwa_app_id.to_ascii_lowercase())
    {
        return MatchScore {
            score: MatchTier::AppUserModelId.score(),
            tier: Some(MatchTier::AppUserModelId),
        };
    }

    if eq_ignore_case_nonempty(&window.process_path, &app.path) {
        return MatchScore {
            score: MatchTier::ProcessPath.score(),
            tier: Some(MatchTier::ProcessPath),
        };
    }

    if eq_ignore_case_nonempty(&window.process_file_name, &app.name) {
        return MatchScore {
            score: MatchTier::ProcessFileName.score(),
            tier: Some(MatchTier::ProcessFileName),
        };
    }

    if eq_ignore_case_nonempty(
        strip_exe(&window.process_name),
        strip_exe(&app.name),
    ) {
        return MatchScore {
            score: MatchTier::ProcessName.score(),
            tier: Some(MatchTier::ProcessName),
        };
    }

    // Title fallback. This is also what resolves the UWP host-process alias:
    // when the application frame host owns the window, none of the stronger
    // signals above can match its real identity, so a window whose title
    // equals the app's captured title wins here instead.
    if eq_ignore_case_nonempty(&window.title, &app.title) {
        return MatchScore {
            score: MatchTier::TitleOnly.score(),
            tier: Some(MatchTier::TitleOnly),
        };
    }

    MatchScore::NONE
}
