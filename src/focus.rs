//! Focus & activation policy (C7): focus-prevention levels, timestamp
//! comparisons, `moveInputFocusTo`, and `activate()`.
//!
//! Grounded on §4.7 directly (the teacher's tiling-WM focus model has no
//! timestamp-based prevention heuristic); the X-time wrap-aware comparison
//! follows the teacher's `bindings` module convention of treating server
//! time as an opaque, wrapping counter rather than a real clock.
use crate::display::FocusPreventionLevel;
use crate::window::Window;
use crate::Xid;

/// Compare two X server timestamps the wrap-aware way ICCCM requires:
/// timestamps are a 32 bit counter that wraps, so "is `a` before `b`" is
/// decided by which is reachable from the other within half the counter's
/// range, not by plain numeric comparison.
pub fn time_is_before(a: u32, b: u32) -> bool {
    // a < b in wrap-aware terms iff (b - a) as i32 is positive and < 2^31.
    (b.wrapping_sub(a) as i32) > 0
}

/// §4.7 `getUsageTimestamp(w)`: first-available of the window's own
/// user-time, its startup timestamp, or its transient parent's user-time.
pub fn usage_timestamp(
    user_time: Option<u32>,
    startup_time: Option<u32>,
    transient_parent_user_time: Option<u32>,
) -> Option<u32> {
    user_time.or(startup_time).or(transient_parent_user_time)
}

/// Why a focus request was denied, for diagnostics/tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDenyReason {
    ExplicitOptOut,
    VeryHighLevel,
    WrongViewport,
    StaleTimestamp,
}

/// §4.7 `isWindowFocusAllowed(w, t)`.
pub fn is_window_focus_allowed(
    level: FocusPreventionLevel,
    timestamp: Option<u32>,
    usage_timestamp: Option<u32>,
    matches_allow_expression: bool,
    on_current_viewport: bool,
    active_timestamp: Option<u32>,
) -> Result<(), FocusDenyReason> {
    if level == FocusPreventionLevel::None {
        return Ok(());
    }

    let t = timestamp.or(usage_timestamp);

    if let Some(0) = t {
        return Err(FocusDenyReason::ExplicitOptOut);
    }

    if matches_allow_expression {
        return Ok(());
    }

    if level == FocusPreventionLevel::VeryHigh {
        return Err(FocusDenyReason::VeryHighLevel);
    }

    if !on_current_viewport {
        return Err(FocusDenyReason::WrongViewport);
    }

    let Some(t) = t else {
        return if level == FocusPreventionLevel::High || level == FocusPreventionLevel::VeryHigh {
            Err(FocusDenyReason::StaleTimestamp)
        } else {
            Ok(())
        };
    };

    match active_timestamp {
        Some(active_t) if time_is_before(active_t, t) => Ok(()),
        Some(_) => Err(FocusDenyReason::StaleTimestamp),
        None => Ok(()),
    }
}

/// §4.7 `allowWindowFocus(noFocusMask, t)`: type-based and protocol-based
/// vetoes layered on top of [is_window_focus_allowed]. Returns whether
/// focus should proceed; if denied, the caller should add
/// `DemandsAttention` per the spec text.
pub fn allow_window_focus(w: &Window) -> bool {
    use crate::window::WindowType::*;
    if matches!(w.derived_type, Desktop | Dock | Splash) {
        return false;
    }
    if !w.input_hint && !w.protocols.contains(crate::window::Protocols::TAKE_FOCUS) {
        return false;
    }
    true
}

/// One step of `moveInputFocusTo(w)`'s modal-transient resolution (§4.7
/// step 1): given `w` and a lookup from window to its modal transient (if
/// any is currently reachable), walk to the deepest one.
pub fn resolve_modal_target(w: Xid, modal_transient_of: impl Fn(Xid) -> Option<Xid>) -> Xid {
    let mut current = w;
    // Bounded by a generous depth to guard against a cyclic transient graph
    // a misbehaving client could otherwise construct.
    for _ in 0..64 {
        match modal_transient_of(current) {
            Some(next) if next != current => current = next,
            _ => break,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_wraps_correctly_near_u32_boundary() {
        assert!(time_is_before(u32::MAX - 1, 1));
        assert!(!time_is_before(1, u32::MAX - 1));
    }

    #[test]
    fn level_none_always_allows() {
        assert_eq!(
            is_window_focus_allowed(FocusPreventionLevel::None, None, None, false, false, None),
            Ok(())
        );
    }

    #[test]
    fn explicit_zero_timestamp_denies() {
        let result = is_window_focus_allowed(
            FocusPreventionLevel::Low,
            Some(0),
            None,
            false,
            true,
            None,
        );
        assert_eq!(result, Err(FocusDenyReason::ExplicitOptOut));
    }

    #[test]
    fn veryhigh_denies_unless_allow_expression_matches() {
        let denied = is_window_focus_allowed(
            FocusPreventionLevel::VeryHigh,
            Some(5),
            None,
            false,
            true,
            Some(1),
        );
        assert_eq!(denied, Err(FocusDenyReason::VeryHighLevel));

        let allowed = is_window_focus_allowed(
            FocusPreventionLevel::VeryHigh,
            Some(5),
            None,
            true,
            true,
            Some(1),
        );
        assert_eq!(allowed, Ok(()));
    }

    #[test]
    fn high_level_denies_missing_timestamp() {
        let result = is_window_focus_allowed(
            FocusPreventionLevel::High,
            None,
            None,
            false,
            true,
            Some(10),
        );
        assert_eq!(result, Err(FocusDenyReason::StaleTimestamp));
    }

    #[test]
    fn low_level_allows_missing_timestamp() {
        let result = is_window_focus_allowed(
            FocusPreventionLevel::Low,
            None,
            None,
            false,
            true,
            Some(10),
        );
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn timestamp_after_active_allows() {
        let result = is_window_focus_allowed(
            FocusPreventionLevel::Low,
            Some(20),
            None,
            false,
            true,
            Some(10),
        );
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn modal_resolution_walks_to_deepest_transient() {
        use std::collections::HashMap;
        let modal_map: HashMap<Xid, Xid> = HashMap::from([(Xid(1), Xid(2)), (Xid(2), Xid(3))]);
        let resolved = resolve_modal_target(Xid(1), |id| modal_map.get(&id).copied());
        assert_eq!(resolved, Xid(3));
    }
}
