//! The blur service.
//!
//! A long-lived task owning the in-memory [`SessionState`]. All contexts
//! talk to it through a [`ServiceHandle`]: detector events are
//! fire-and-forget, state queries and toggles are request/response with an
//! explicit timeout. The state lives inside the service's event loop and is
//! handed to the message handler, never referenced as a global.
//!
//! On every blur transition the service broadcasts an
//! enable/disable command to attached pages, updates the badge through the
//! [`Indicator`], and emits a notification. Pages whose channel has closed
//! (tab torn down) are pruned silently on the next broadcast.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::detect::ShareEvent;
use crate::error::{Error, Result};
use crate::message::{PageCommand, Request, StateSnapshot};
use crate::session::SessionState;
use crate::settings::Settings;
use crate::storage::Store;

/// Badge text while blurring is active.
pub const BADGE_ON: &str = "ON";

/// Badge text while blurring is inactive.
pub const BADGE_OFF: &str = "";

/// Badge background color.
pub const BADGE_COLOR: &str = "#10b981";

/// Title used for blur notifications.
pub const NOTIFICATION_TITLE: &str = "Blur Protection";

/// Capacity of the service's inbound message channel.
const CHANNEL_CAPACITY: usize = 64;

/// Badge and notification output.
///
/// Decouples the service from whatever surface shows status. The
/// production implementation logs; tests record.
pub trait Indicator: Send + Sync + std::fmt::Debug {
    /// Set the badge text.
    fn set_badge(&self, text: &str);

    /// Set the badge background color.
    fn set_badge_color(&self, color: &str);

    /// Emit a notification.
    fn notify(&self, id: &str, title: &str, message: &str);
}

/// An [`Indicator`] that writes to the log.
#[derive(Debug, Default)]
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn set_badge(&self, text: &str) {
        info!(badge = %text, "Badge updated");
    }

    fn set_badge_color(&self, color: &str) {
        debug!(color = %color, "Badge color updated");
    }

    fn notify(&self, id: &str, title: &str, message: &str) {
        info!(id = %id, title = %title, message = %message, "Notification");
    }
}

/// Internal message envelope.
#[derive(Debug)]
enum Envelope {
    /// A request expecting a state snapshot in reply.
    Request {
        request: Request,
        reply: oneshot::Sender<StateSnapshot>,
    },
    /// A fire-and-forget event.
    Event(Request),
    /// A page context attaching for blur commands.
    AttachPage {
        reply: oneshot::Sender<mpsc::UnboundedReceiver<PageCommand>>,
    },
}

/// The background service owning session state.
#[derive(Debug)]
pub struct BlurService {
    state: SessionState,
    settings: Settings,
    store: Option<Store>,
    indicator: Arc<dyn Indicator>,
    pages: Vec<mpsc::UnboundedSender<PageCommand>>,
    open_session: Option<i64>,
    rx: mpsc::Receiver<Envelope>,
}

impl BlurService {
    /// Spawn the service task.
    ///
    /// Returns the handle contexts use to reach it, and the join handle of
    /// the service task (which completes once every handle is dropped).
    #[must_use]
    pub fn spawn(
        settings: Settings,
        store: Option<Store>,
        indicator: Arc<dyn Indicator>,
        request_timeout: Duration,
    ) -> (ServiceHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut service = Self {
            state: SessionState::new(),
            settings,
            store,
            indicator,
            pages: Vec::new(),
            open_session: None,
            rx,
        };
        let join = tokio::spawn(async move {
            service.run().await;
        });
        (
            ServiceHandle {
                tx,
                timeout: request_timeout,
            },
            join,
        )
    }

    async fn run(&mut self) {
        info!("Blur service started");
        while let Some(envelope) = self.rx.recv().await {
            match envelope {
                Envelope::Request { request, reply } => {
                    let snapshot = self.handle(request);
                    // The requester may have timed out and gone away
                    let _ = reply.send(snapshot);
                }
                Envelope::Event(request) => {
                    self.handle(request);
                }
                Envelope::AttachPage { reply } => {
                    let (tx, page_rx) = mpsc::unbounded_channel();
                    // New pages immediately learn the current blur state
                    let command = if self.state.blur_enabled {
                        PageCommand::EnableBlur
                    } else {
                        PageCommand::DisableBlur
                    };
                    let _ = tx.send(command);
                    self.pages.push(tx);
                    let _ = reply.send(page_rx);
                }
            }
        }
        info!("Blur service stopped");
    }

    /// Apply a request to the session state. Returns the resulting
    /// snapshot, taken after the mutation so responses are never stale.
    fn handle(&mut self, request: Request) -> StateSnapshot {
        debug!(action = request.action(), "Handling message");

        let auto_enable = self.settings.enabled && self.settings.auto_enable;
        let blur_changed = match request {
            Request::ScreenShareStarted { source } => {
                let changed = self.state.share_started(auto_enable);
                self.record_share_started(source);
                changed
            }
            Request::ScreenShareStopped => {
                let changed = self.state.share_stopped(auto_enable);
                self.record_share_stopped();
                changed
            }
            Request::ToggleBlur => {
                self.state.toggle_blur();
                true
            }
            Request::GetState => false,
        };

        if blur_changed {
            self.apply_blur_state();
        }

        StateSnapshot::from(self.state)
    }

    /// Broadcast the new blur state and update badge/notification.
    fn apply_blur_state(&mut self) {
        if self.state.blur_enabled {
            self.broadcast(PageCommand::EnableBlur);
            self.indicator.set_badge(BADGE_ON);
            self.indicator.set_badge_color(BADGE_COLOR);
            self.indicator
                .notify("blur-enabled", NOTIFICATION_TITLE, "Protection enabled");
        } else {
            self.broadcast(PageCommand::DisableBlur);
            self.indicator.set_badge(BADGE_OFF);
            self.indicator
                .notify("blur-disabled", NOTIFICATION_TITLE, "Protection disabled");
        }
    }

    fn broadcast(&mut self, command: PageCommand) {
        let before = self.pages.len();
        self.pages.retain(|page| page.send(command).is_ok());
        let pruned = before - self.pages.len();
        if pruned > 0 {
            debug!(pruned, "Pruned closed page channels");
        }
        debug!(action = ?command, pages = self.pages.len(), "Broadcast to pages");
    }

    fn record_share_started(&mut self, source: Option<crate::detect::ShareSource>) {
        if let Some(store) = &self.store {
            match store.record_share_started(source, Utc::now()) {
                Ok(id) => self.open_session = Some(id),
                Err(e) => warn!(error = %e, "Failed to record share session"),
            }
        }
    }

    fn record_share_stopped(&mut self) {
        if let (Some(store), Some(id)) = (&self.store, self.open_session.take()) {
            if let Err(e) = store.record_share_stopped(id, Utc::now()) {
                warn!(error = %e, "Failed to close share session");
            }
        }
    }
}

/// Cloneable handle to the blur service.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Envelope>,
    timeout: Duration,
}

impl ServiceHandle {
    /// Send a request and wait for the state snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceUnavailable`] if the service is gone, or
    /// [`Error::RequestTimeout`] if no reply arrives in time.
    pub async fn request(&self, request: Request) -> Result<StateSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope::Request {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| Error::ServiceUnavailable)?;

        match tokio::time::timeout(self.timeout, reply_rx).await {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(_)) => Err(Error::ServiceUnavailable),
            Err(_) => Err(Error::timeout(request.action())),
        }
    }

    /// Send a fire-and-forget event.
    ///
    /// An unreachable service is logged and swallowed; events are
    /// idempotent level-sets, so there is nothing to retry.
    pub async fn notify(&self, request: Request) {
        if self.tx.send(Envelope::Event(request)).await.is_err() {
            debug!(action = request.action(), "Dropped event: service unavailable");
        }
    }

    /// Ask for the current session state.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ServiceHandle::request`].
    pub async fn get_state(&self) -> Result<StateSnapshot> {
        self.request(Request::GetState).await
    }

    /// Flip the blur state and return the resulting snapshot.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ServiceHandle::request`].
    pub async fn toggle_blur(&self) -> Result<StateSnapshot> {
        self.request(Request::ToggleBlur).await
    }

    /// Attach a page context; returns the channel blur commands arrive on.
    ///
    /// The current blur state is delivered as the first command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceUnavailable`] if the service is gone.
    pub async fn attach_page(&self) -> Result<mpsc::UnboundedReceiver<PageCommand>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope::AttachPage { reply: reply_tx })
            .await
            .map_err(|_| Error::ServiceUnavailable)?;
        reply_rx.await.map_err(|_| Error::ServiceUnavailable)
    }

    /// Forward detector events into the service until the stream ends.
    pub fn forward_events(&self, mut events: mpsc::Receiver<ShareEvent>) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let request = match event {
                    ShareEvent::Started { source } => Request::ScreenShareStarted { source },
                    ShareEvent::Stopped => Request::ScreenShareStopped,
                };
                handle.notify(request).await;
            }
        })
    }
}
