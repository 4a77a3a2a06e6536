//! `screenveil` - Sensitive-data detection and visual redaction
//!
//! This library classifies substrings of page text as sensitive (emails,
//! card numbers, API keys, revenue figures), blurs the matching spans of a
//! page's text nodes, re-scans what changes, and coordinates blur state
//! across contexts through a background service.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod logging;
pub mod message;
pub mod page;
pub mod redact;
pub mod scan;
pub mod service;
pub mod session;
pub mod settings;
pub mod storage;
pub mod watch;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use message::{PageCommand, Request, StateSnapshot};
pub use page::Page;
pub use redact::Redactor;
pub use scan::{MatchSpan, Matcher, PatternKind};
pub use service::{BlurService, ServiceHandle};
pub use session::SessionState;
pub use settings::Settings;
pub use storage::Store;
pub use watch::PageWatcher;
