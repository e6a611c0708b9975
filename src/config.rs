//! User facing configuration (part of C10): the policy knobs the CLI
//! surface of §6 exposes, collected into one builder-style struct the way
//! the teacher's [`core::config::Config`] collects workspace/layout/border
//! settings.
use crate::display::FocusPreventionLevel;
use std::time::Duration;

/// `--texture-filter fast|good`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Fast,
    Good,
}

impl std::str::FromStr for TextureFilter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(TextureFilter::Fast),
            "good" => Ok(TextureFilter::Good),
            _ => Err(()),
        }
    }
}

/// The session-manager identity a client may reattach to, set either via
/// `--sm-client-id` or disabled entirely via `--sm-disable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionManagement {
    Enabled { client_id: Option<String> },
    Disabled,
}

impl Default for SessionManagement {
    fn default() -> Self {
        SessionManagement::Enabled { client_id: None }
    }
}

/// Everything the CLI surface of §6 can configure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `--replace`: take over from a running window manager rather than
    /// failing when a prior `WM_Sn` owner is found.
    pub replace: bool,
    /// `--indirect-rendering`: force the painter (external, §6) to use
    /// indirect GLX rather than direct rendering.
    pub indirect_rendering: bool,
    /// `--strict-binding`: grabs fail loudly on a conflicting binding
    /// instead of silently skipping it.
    pub strict_binding: bool,
    /// `--no-cow`: do not use a compositing overlay window; redirect
    /// straight to the root.
    pub no_cow: bool,
    /// `--no-detection`: skip runtime GL capability detection and assume
    /// the most conservative feature set.
    pub no_detection: bool,
    /// `--use-desktop-hints`: honour `_NET_DESKTOP_LAYOUT`/pager hints
    /// over the core's own viewport arrangement.
    pub use_desktop_hints: bool,
    /// `--only-current-screen`: restrict management to the screen the
    /// process was started on.
    pub only_current_screen: bool,
    /// `--refresh-rate N`: the display's refresh rate in Hz, used to seed
    /// [crate::mainloop::MainLoop]'s optimal redraw interval.
    pub refresh_rate: u32,
    /// `--texture-filter fast|good`.
    pub texture_filter: TextureFilter,
    /// `--sm-client-id ID` / `--sm-disable`.
    pub session: SessionManagement,
    /// How often the ping-liveness sweep (§4.6, P7) runs.
    pub ping_delay: Duration,
    /// The policy level [crate::focus::is_window_focus_allowed] enforces.
    pub focus_prevention: FocusPreventionLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            replace: false,
            indirect_rendering: false,
            strict_binding: false,
            no_cow: false,
            no_detection: false,
            use_desktop_hints: false,
            only_current_screen: false,
            refresh_rate: 60,
            texture_filter: TextureFilter::Fast,
            session: SessionManagement::default(),
            ping_delay: Duration::from_secs(5),
            focus_prevention: FocusPreventionLevel::Low,
        }
    }
}

impl Config {
    /// The optimal per-frame redraw interval implied by `refresh_rate`,
    /// fed to [crate::mainloop::MainLoop::new].
    pub fn redraw_optimal(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_rate.max(1) as f64)
    }

    pub fn replace(&mut self, val: bool) -> &mut Self {
        self.replace = val;
        self
    }

    pub fn refresh_rate(&mut self, val: u32) -> &mut Self {
        self.refresh_rate = val;
        self
    }

    pub fn texture_filter(&mut self, val: TextureFilter) -> &mut Self {
        self.texture_filter = val;
        self
    }

    pub fn ping_delay(&mut self, val: Duration) -> &mut Self {
        self.ping_delay = val;
        self
    }

    pub fn focus_prevention(&mut self, val: FocusPreventionLevel) -> &mut Self {
        self.focus_prevention = val;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redraw_optimal_matches_refresh_rate() {
        let mut cfg = Config::default();
        cfg.refresh_rate(50);
        assert_eq!(cfg.redraw_optimal(), Duration::from_millis(20));
    }

    #[test]
    fn zero_refresh_rate_does_not_panic() {
        let mut cfg = Config::default();
        cfg.refresh_rate(0);
        assert_eq!(cfg.redraw_optimal(), Duration::from_secs(1));
    }
}
