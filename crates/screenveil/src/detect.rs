//! Screen-share and sensitive-page detection.
//!
//! Detection is split into a pure URL classifier (which meeting platform or
//! sensitive SaaS page a URL belongs to) and the [`ShareDetector`] seam
//! through which platform probes feed share start/stop events into the blur
//! service. [`ChannelDetector`] is the in-process implementation used by the
//! serving loop and tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Meeting platform a screen share originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShareSource {
    /// Google Meet (`meet.google.com`).
    GoogleMeet,
    /// Zoom (`zoom.us`).
    Zoom,
}

impl std::fmt::Display for ShareSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GoogleMeet => write!(f, "google-meet"),
            Self::Zoom => write!(f, "zoom"),
        }
    }
}

impl std::str::FromStr for ShareSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "google-meet" => Ok(Self::GoogleMeet),
            "zoom" => Ok(Self::Zoom),
            other => Err(Error::internal(format!("unknown share source: {other}"))),
        }
    }
}

/// Sensitive SaaS page where blurring applies regardless of sharing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensitiveSite {
    /// Gmail (`mail.google.com`).
    Gmail,
    /// Stripe dashboard (`dashboard.stripe.com`).
    Stripe,
    /// Salesforce (`*.salesforce.com`, `*.lightning.force.com`).
    Salesforce,
}

impl std::fmt::Display for SensitiveSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gmail => write!(f, "gmail"),
            Self::Stripe => write!(f, "stripe"),
            Self::Salesforce => write!(f, "salesforce"),
        }
    }
}

/// Classification of a page URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageClass {
    /// A meeting page where screen sharing can start.
    Meeting(ShareSource),
    /// A sensitive SaaS page.
    Sensitive(SensitiveSite),
}

/// Extract the lowercased host of a URL, without scheme, port, or path.
fn host_of(url: &str) -> Option<String> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(rest)
        .split('@')
        .next_back()
        .unwrap_or(rest);
    let host = host.split(':').next().unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Classify a page URL as a meeting or sensitive SaaS page.
///
/// Returns `None` for everything else.
#[must_use]
pub fn classify_url(url: &str) -> Option<PageClass> {
    let host = host_of(url)?;
    if host_matches(&host, "meet.google.com") {
        return Some(PageClass::Meeting(ShareSource::GoogleMeet));
    }
    if host_matches(&host, "zoom.us") {
        return Some(PageClass::Meeting(ShareSource::Zoom));
    }
    if host_matches(&host, "mail.google.com") {
        return Some(PageClass::Sensitive(SensitiveSite::Gmail));
    }
    if host_matches(&host, "dashboard.stripe.com") {
        return Some(PageClass::Sensitive(SensitiveSite::Stripe));
    }
    if host_matches(&host, "salesforce.com") || host_matches(&host, "lightning.force.com") {
        return Some(PageClass::Sensitive(SensitiveSite::Salesforce));
    }
    None
}

/// A share start/stop event emitted by a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareEvent {
    /// A screen share started.
    Started {
        /// Platform the share originates from, if known.
        source: Option<ShareSource>,
    },
    /// The screen share stopped.
    Stopped,
}

/// A source of share events.
///
/// Implementors watch some platform surface (a display-capture hook, a
/// meeting page probe) and send events through the channel passed to
/// [`ShareDetector::start`]. Events are fire-and-forget: detectors never
/// wait for acknowledgment.
#[async_trait::async_trait]
pub trait ShareDetector: Send + Sync {
    /// The name of this detector (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Check if the detector is currently running.
    fn is_running(&self) -> bool;

    /// Start the detector, forwarding events into `tx`.
    ///
    /// # Errors
    ///
    /// Returns an error if the detector is already running or fails to
    /// start.
    async fn start(&mut self, tx: mpsc::Sender<ShareEvent>) -> Result<()>;

    /// Signal the detector to stop.
    fn stop(&self);
}

/// An in-process detector fed through a channel.
///
/// [`ChannelDetector::new`] returns the detector and a sender; whatever
/// owns the sender (a test, an embedding host) injects events and the
/// detector forwards them downstream once started.
#[derive(Debug)]
pub struct ChannelDetector {
    events: Option<mpsc::Receiver<ShareEvent>>,
    running: Arc<AtomicBool>,
    stop_signal: Arc<Notify>,
}

impl ChannelDetector {
    /// Channel capacity for injected events.
    const CAPACITY: usize = 64;

    /// Create a detector plus the sender used to inject events into it.
    #[must_use]
    pub fn new() -> (Self, mpsc::Sender<ShareEvent>) {
        let (tx, rx) = mpsc::channel(Self::CAPACITY);
        (
            Self {
                events: Some(rx),
                running: Arc::new(AtomicBool::new(false)),
                stop_signal: Arc::new(Notify::new()),
            },
            tx,
        )
    }
}

#[async_trait::async_trait]
impl ShareDetector for ChannelDetector {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn start(&mut self, tx: mpsc::Sender<ShareEvent>) -> Result<()> {
        let Some(mut events) = self.events.take() else {
            return Err(Error::detector_start("channel", "already running"));
        };

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let stop_signal = Arc::clone(&self.stop_signal);

        tokio::spawn(async move {
            info!("Channel detector started");
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Some(event) => {
                            debug!(?event, "Forwarding share event");
                            if tx.send(event).await.is_err() {
                                // Receiver gone; nothing left to notify
                                break;
                            }
                        }
                        None => break,
                    },
                    () = stop_signal.notified() => break,
                }
            }
            running.store(false, Ordering::SeqCst);
            info!("Channel detector stopped");
        });

        Ok(())
    }

    fn stop(&self) {
        self.stop_signal.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_source_display() {
        assert_eq!(ShareSource::GoogleMeet.to_string(), "google-meet");
        assert_eq!(ShareSource::Zoom.to_string(), "zoom");
    }

    #[test]
    fn test_share_source_serde() {
        assert_eq!(
            serde_json::to_string(&ShareSource::GoogleMeet).unwrap(),
            "\"google-meet\""
        );
        let source: ShareSource = serde_json::from_str("\"zoom\"").unwrap();
        assert_eq!(source, ShareSource::Zoom);
    }

    #[test]
    fn test_share_source_from_str() {
        assert_eq!(
            "google-meet".parse::<ShareSource>().unwrap(),
            ShareSource::GoogleMeet
        );
        assert!("teams".parse::<ShareSource>().is_err());
    }

    #[test]
    fn test_classify_meeting_urls() {
        assert_eq!(
            classify_url("https://meet.google.com/abc-defg-hij"),
            Some(PageClass::Meeting(ShareSource::GoogleMeet))
        );
        assert_eq!(
            classify_url("https://zoom.us/j/1234567890"),
            Some(PageClass::Meeting(ShareSource::Zoom))
        );
        assert_eq!(
            classify_url("https://us02web.zoom.us/j/987"),
            Some(PageClass::Meeting(ShareSource::Zoom))
        );
    }

    #[test]
    fn test_classify_sensitive_urls() {
        assert_eq!(
            classify_url("https://mail.google.com/mail/u/0/#inbox"),
            Some(PageClass::Sensitive(SensitiveSite::Gmail))
        );
        assert_eq!(
            classify_url("https://dashboard.stripe.com/payments"),
            Some(PageClass::Sensitive(SensitiveSite::Stripe))
        );
        assert_eq!(
            classify_url("https://acme.lightning.force.com/lightning/page/home"),
            Some(PageClass::Sensitive(SensitiveSite::Salesforce))
        );
        assert_eq!(
            classify_url("https://login.salesforce.com/"),
            Some(PageClass::Sensitive(SensitiveSite::Salesforce))
        );
    }

    #[test]
    fn test_classify_other_urls() {
        assert_eq!(classify_url("https://example.com"), None);
        assert_eq!(classify_url("https://docs.google.com/document/d/x"), None);
        // Lookalike domains don't match on suffix alone
        assert_eq!(classify_url("https://notzoom.us.example.com"), None);
        assert_eq!(classify_url(""), None);
    }

    #[test]
    fn test_host_of_strips_scheme_port_and_path() {
        assert_eq!(host_of("https://Zoom.us:443/j/1"), Some("zoom.us".into()));
        assert_eq!(host_of("meet.google.com/abc"), Some("meet.google.com".into()));
        assert_eq!(
            host_of("https://user@mail.google.com/x"),
            Some("mail.google.com".into())
        );
        assert_eq!(host_of("https://"), None);
    }

    #[tokio::test]
    async fn test_channel_detector_forwards_events() {
        let (mut detector, inject) = ChannelDetector::new();
        let (tx, mut rx) = mpsc::channel(8);

        detector.start(tx).await.unwrap();
        assert!(detector.is_running());

        inject
            .send(ShareEvent::Started {
                source: Some(ShareSource::GoogleMeet),
            })
            .await
            .unwrap();
        inject.send(ShareEvent::Stopped).await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(ShareEvent::Started {
                source: Some(ShareSource::GoogleMeet),
            })
        );
        assert_eq!(rx.recv().await, Some(ShareEvent::Stopped));
    }

    #[tokio::test]
    async fn test_channel_detector_start_twice_fails() {
        let (mut detector, _inject) = ChannelDetector::new();
        let (tx, _rx) = mpsc::channel(8);
        detector.start(tx.clone()).await.unwrap();

        let err = detector.start(tx).await.unwrap_err();
        assert!(err.to_string().contains("already running"));
    }

    #[tokio::test]
    async fn test_channel_detector_stop() {
        let (mut detector, inject) = ChannelDetector::new();
        let (tx, mut rx) = mpsc::channel(8);
        detector.start(tx).await.unwrap();

        detector.stop();
        // Give the forwarding task a chance to observe the signal
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!detector.is_running());

        // Events injected after stop are not forwarded
        let _ = inject.send(ShareEvent::Stopped).await;
        assert!(rx.try_recv().is_err());
    }
}
