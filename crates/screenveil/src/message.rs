//! Cross-context message schema.
//!
//! Messages are JSON objects tagged by an `action` field, with an optional
//! `source`, matching the `{action: string, source?: string}` contract the
//! page, popup, and detector contexts exchange with the blur service.
//! Detector events are one-way; state queries and toggles are
//! request/response and answer with a [`StateSnapshot`].

use serde::{Deserialize, Serialize};

use crate::detect::ShareSource;
use crate::session::SessionState;

/// An inbound message to the blur service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// A screen share started (fire-and-forget detector event).
    ScreenShareStarted {
        /// Platform the share originates from, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<ShareSource>,
    },
    /// The screen share stopped (fire-and-forget detector event).
    ScreenShareStopped,
    /// Ask for the current session state.
    GetState,
    /// Flip the blur state.
    ToggleBlur,
}

impl Request {
    /// The wire value of this request's `action` field.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::ScreenShareStarted { .. } => "screenShareStarted",
            Self::ScreenShareStopped => "screenShareStopped",
            Self::GetState => "getState",
            Self::ToggleBlur => "toggleBlur",
        }
    }

    /// Whether this request is a one-way detector event.
    #[must_use]
    pub fn is_event(&self) -> bool {
        matches!(
            self,
            Self::ScreenShareStarted { .. } | Self::ScreenShareStopped
        )
    }
}

/// A command broadcast from the service to attached pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageCommand {
    /// Apply blurring to the page.
    EnableBlur,
    /// Remove blurring and restore original text.
    DisableBlur,
}

/// A point-in-time copy of the service's session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Whether a screen share is currently active.
    pub is_screen_sharing: bool,
    /// Whether blurring is currently applied.
    pub blur_enabled: bool,
}

impl From<SessionState> for StateSnapshot {
    fn from(state: SessionState) -> Self {
        Self {
            is_screen_sharing: state.is_screen_sharing,
            blur_enabled: state.blur_enabled,
        }
    }
}
