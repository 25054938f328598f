//! The set-placement primitive and the convergence loops built on top of it.
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::geometry::{within_tolerance, Rect};
use crate::host::{DesktopHost, ShowState};
use crate::model::{Tristate, WindowHandle};

/// The show-state a target placement demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetShowState {
    /// Restore to `rect` if not already there.
    Normal,
    /// Minimize regardless of `rect`.
    Minimized,
    /// Maximize regardless of `rect`.
    Maximized,
}

/// A fully resolved placement to converge `handle` toward.
#[derive(Debug, Clone, Copy)]
pub struct TargetPlacement {
    /// The handle being placed.
    pub handle: WindowHandle,
    /// Target restored-window bounds, already DPI-rescaled to the
    /// destination monitor.
    pub rect: Rect,
    /// Target show-state.
    pub show_state: TargetShowState,
    /// Whether to wait for input-idle before placing (set for newly
    /// launched processes, not for windows that already existed).
    pub wait_for_input_idle: bool,
    /// The pid to wait on when `wait_for_input_idle` is set.
    pub pid: u32,
}

/// Move/resize/show `target.handle` toward `target`, per the primitive's
/// five-step protocol. Best-effort: failures to reposition an
/// elevated/UIPI-protected peer are swallowed rather than propagated, since
/// the caller treats partial placement as still a successful bind.
pub fn set_placement(
    host: &dyn DesktopHost,
    config: &EngineConfig,
    cancel: &CancelToken,
    target: TargetPlacement,
) -> Result<()> {
    if target.wait_for_input_idle {
        host.wait_for_input_idle(target.pid, config.input_idle_timeout);
    }
    cancel.check()?;

    ensure_visible(host, config, cancel, target.handle)?;

    if !target.rect.is_empty() {
        host.set_position(target.handle, target.rect);
    }

    match target.show_state {
        TargetShowState::Minimized => {
            host.show(target.handle, ShowState::Minimized);
        }
        TargetShowState::Maximized => {
            host.show(target.handle, ShowState::Maximized);
        }
        TargetShowState::Normal => {
            if let Some(placement) = host.get_placement(target.handle) {
                if placement.is_minimized || placement.is_maximized {
                    host.show(target.handle, ShowState::Normal);
                }
            }
        }
    }

    if target.show_state == TargetShowState::Normal && !target.rect.is_empty() {
        verify_with_retry(host, config, cancel, target.handle, target.rect)?;
    }

    Ok(())
}

fn ensure_visible(
    host: &dyn DesktopHost,
    config: &EngineConfig,
    cancel: &CancelToken,
    handle: WindowHandle,
) -> Result<()> {
    host.show(handle, ShowState::Normal);
    let deadline = Instant::now() + config.visibility_timeout;
    loop {
        cancel.check()?;
        if host
            .get_placement(handle)
            .map(|_| true)
            .unwrap_or(false)
            && host.is_window(handle)
        {
            // `is_window` plus a successful placement query is the closest
            // this trait gets to an explicit visibility predicate; a window
            // that vanished entirely will fail both.
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Ok(());
        }
        std::thread::sleep(config.visibility_poll_interval.min(deadline.saturating_duration_since(Instant::now())));
    }
}

fn verify_with_retry(
    host: &dyn DesktopHost,
    config: &EngineConfig,
    cancel: &CancelToken,
    handle: WindowHandle,
    target: Rect,
) -> Result<()> {
    for attempt in 0..config.placement_verify_attempts {
        cancel.check()?;
        let Some(placement) = host.get_placement(handle) else {
            return Ok(());
        };
        if within_tolerance(&placement.normal_rect, &target, config.placement_tolerance_px) {
            return Ok(());
        }
        trace!(?handle, attempt, "placement not yet converged, re-issuing");
        host.set_position(handle, target);
        std::thread::sleep(config.placement_verify_interval);
    }
    warn!(?handle, "placement verify-with-retry exhausted attempts");
    Ok(())
}

/// Up to `config.arrange_loop_timeout`, requires two consecutive
/// "expected placement" observations before returning; re-issues
/// [`set_placement`] between observations. Run after launching a brand new
/// window and after binding an existing one that needs a show-state change.
pub fn arrange_loop(
    host: &dyn DesktopHost,
    config: &EngineConfig,
    cancel: &CancelToken,
    target: TargetPlacement,
) -> Result<()> {
    let deadline = Instant::now() + config.arrange_loop_timeout;
    let mut consecutive_matches = 0;

    while Instant::now() < deadline {
        cancel.check()?;
        if placement_matches(host, target) {
            consecutive_matches += 1;
            if consecutive_matches >= 2 {
                return Ok(());
            }
        } else {
            consecutive_matches = 0;
            let _ = set_placement(
                host,
                config,
                cancel,
                TargetPlacement {
                    wait_for_input_idle: false,
                    ..target
                },
            );
        }
        std::thread::sleep(config.arrange_loop_interval.min(deadline.saturating_duration_since(Instant::now())));
    }

    debug!(?target.handle, "arrange loop timed out without converging");
    Ok(())
}

/// Up to `config.post_settle_loop_timeout`, reasserts placement if the
/// window drifted; exits immediately if the window left the current virtual
/// desktop or became cloaked.
pub fn post_settle_loop(
    host: &dyn DesktopHost,
    config: &EngineConfig,
    cancel: &CancelToken,
    target: TargetPlacement,
) -> Result<()> {
    let deadline = Instant::now() + config.post_settle_loop_timeout;

    while Instant::now() < deadline {
        cancel.check()?;
        if host.is_cloaked(target.handle) == Tristate::Yes
            || host.is_on_current_virtual_desktop(target.handle) == Tristate::No
        {
            return Ok(());
        }
        if !placement_matches(host, target) {
            let _ = set_placement(
                host,
                config,
                cancel,
                TargetPlacement {
                    wait_for_input_idle: false,
                    ..target
                },
            );
        }
        std::thread::sleep(config.post_settle_loop_interval.min(deadline.saturating_duration_since(Instant::now())));
    }
    Ok(())
}

fn placement_matches(host: &dyn DesktopHost, target: TargetPlacement) -> bool {
    let Some(placement) = host.get_placement(target.handle) else {
        return false;
    };
    match target.show_state {
        TargetShowState::Minimized => placement.is_minimized,
        TargetShowState::Maximized => placement.is_maximized,
        TargetShowState::Normal => {
            !placement.is_minimized
                && !placement.is_maximized
                && (target.rect.is_empty() || within_tolerance(&placement.normal_rect, &target.rect, 8))
        }
    }
}
