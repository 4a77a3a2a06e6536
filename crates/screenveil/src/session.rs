//! In-memory session state.
//!
//! [`SessionState`] is owned by the blur service's event loop and passed
//! into its handler explicitly; nothing in the crate reaches for it as a
//! global. It is reset whenever the service restarts and is never
//! persisted (acceptable loss: the next interaction rebuilds it).

/// Process-wide blur/session flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    /// Whether a screen share is currently active.
    pub is_screen_sharing: bool,
    /// Whether blurring is currently applied.
    pub blur_enabled: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            is_screen_sharing: false,
            blur_enabled: true,
        }
    }
}

impl SessionState {
    /// Fresh state for a newly started service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a screen share.
    ///
    /// With `auto_enable` set, blurring turns on for the duration of the
    /// share. Returns `true` if `blur_enabled` changed.
    pub fn share_started(&mut self, auto_enable: bool) -> bool {
        self.is_screen_sharing = true;
        if auto_enable && !self.blur_enabled {
            self.blur_enabled = true;
            return true;
        }
        false
    }

    /// Record the end of a screen share.
    ///
    /// With `auto_enable` set, blurring turns back off when the share
    /// ends. Returns `true` if `blur_enabled` changed.
    pub fn share_stopped(&mut self, auto_enable: bool) -> bool {
        self.is_screen_sharing = false;
        if auto_enable && self.blur_enabled {
            self.blur_enabled = false;
            return true;
        }
        false
    }

    /// Flip `blur_enabled`. Always a change; returns the new value.
    pub fn toggle_blur(&mut self) -> bool {
        self.blur_enabled = !self.blur_enabled;
        self.blur_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = SessionState::new();
        assert!(!state.is_screen_sharing);
        assert!(state.blur_enabled);
    }

    #[test]
    fn test_share_started_sets_flag() {
        let mut state = SessionState::new();
        state.share_started(false);
        assert!(state.is_screen_sharing);
    }

    #[test]
    fn test_share_started_auto_enables_blur() {
        let mut state = SessionState {
            is_screen_sharing: false,
            blur_enabled: false,
        };

        let changed = state.share_started(true);

        assert!(changed);
        assert!(state.blur_enabled);
    }

    #[test]
    fn test_share_started_no_change_when_already_blurred() {
        let mut state = SessionState::new();
        assert!(!state.share_started(true));
        assert!(state.blur_enabled);
    }

    #[test]
    fn test_share_stopped_auto_disables_blur() {
        let mut state = SessionState::new();
        state.share_started(true);

        let changed = state.share_stopped(true);

        assert!(changed);
        assert!(!state.is_screen_sharing);
        assert!(!state.blur_enabled);
    }

    #[test]
    fn test_share_stopped_without_auto_keeps_blur() {
        let mut state = SessionState::new();
        state.share_started(false);

        assert!(!state.share_stopped(false));
        assert!(state.blur_enabled);
    }

    #[test]
    fn test_toggle_blur_flips() {
        let mut state = SessionState::new();
        assert!(!state.toggle_blur());
        assert!(!state.blur_enabled);
        assert!(state.toggle_blur());
        assert!(state.blur_enabled);
    }
}
