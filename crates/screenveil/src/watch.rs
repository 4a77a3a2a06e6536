//! Mutation watching.
//!
//! One [`PageWatcher`] per page. Each [`PageWatcher::process`] call drains
//! the page's queued mutation records and re-redacts only the affected
//! subtrees (added nodes for child-list changes, the target for character
//! data and attribute changes) rather than the whole document, so the cost
//! of a batch is bounded by what actually changed.
//!
//! Mutation bursts coalesce naturally: a batch is drained and handled in
//! one pass, and the serving loop runs `process` on a configurable debounce
//! tick rather than per mutation.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::message::PageCommand;
use crate::page::{MutationKind, NodeId, Page};
use crate::redact::Redactor;

/// Id of the in-page protection indicator element.
pub const INDICATOR_ID: &str = "blur-indicator";

/// Text shown by the indicator.
pub const INDICATOR_TEXT: &str = "Blur Protection Active";

/// Inline style of the indicator element.
pub const INDICATOR_STYLE: &str = "position: fixed; top: 10px; right: 10px; \
    background: #10b981; color: white; padding: 8px 16px; \
    border-radius: 4px; z-index: 999999";

/// Counters describing what a watcher has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatcherStats {
    /// Number of processed mutation batches.
    pub batches: u64,
    /// Total mutation records drained.
    pub records_seen: u64,
    /// Subtree re-scans performed.
    pub rescans: u64,
    /// Wrappers created across all batches.
    pub wrappers_created: u64,
}

/// Watches a page's mutations and keeps its redactions current.
#[derive(Debug)]
pub struct PageWatcher {
    redactor: Redactor,
    enabled: bool,
    show_indicator: bool,
    stats: WatcherStats,
}

impl PageWatcher {
    /// Create a watcher around the given redactor, with blurring enabled
    /// and no in-page indicator.
    #[must_use]
    pub fn new(redactor: Redactor) -> Self {
        Self {
            redactor,
            enabled: true,
            show_indicator: false,
            stats: WatcherStats::default(),
        }
    }

    /// Enable or disable the in-page protection indicator.
    #[must_use]
    pub fn with_indicator(mut self, show: bool) -> Self {
        self.show_indicator = show;
        self
    }

    /// Whether blurring is currently applied by this watcher.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Counters for status output and tests.
    #[must_use]
    pub fn stats(&self) -> WatcherStats {
        self.stats
    }

    /// Redact the whole page once (initial pass after attach or enable).
    pub fn full_scan(&mut self, page: &mut Page) -> usize {
        let root = page.root();
        let wrapped = self.redactor.redact_subtree(page, root);
        self.stats.rescans += 1;
        self.stats.wrappers_created += wrapped as u64;
        wrapped
    }

    /// Enable blurring, re-scan the whole page, and show the indicator.
    pub fn enable(&mut self, page: &mut Page) -> usize {
        self.enabled = true;
        if self.show_indicator {
            ensure_indicator(page);
        }
        self.full_scan(page)
    }

    /// Disable blurring and remove every wrapper, restoring original text.
    pub fn disable(&mut self, page: &mut Page) -> usize {
        self.enabled = false;
        remove_indicator(page);
        let root = page.root();
        let removed = self.redactor.unwrap_all(page, root);
        // Drop the records produced by unwrapping; nothing to redact while
        // disabled
        page.take_records();
        removed
    }

    /// Drain queued mutation records and re-redact the affected subtrees.
    ///
    /// Returns the number of wrappers created by this batch. While
    /// disabled, records are still drained (the queue must not grow
    /// unbounded) but nothing is redacted.
    pub fn process(&mut self, page: &mut Page) -> usize {
        let records = page.take_records();
        if records.is_empty() {
            return 0;
        }

        self.stats.batches += 1;
        self.stats.records_seen += records.len() as u64;

        if !self.enabled {
            trace!(records = records.len(), "Blur disabled; dropping batch");
            return 0;
        }

        // Collect affected nodes: added children for child-list changes,
        // the target itself otherwise. Dead targets are skipped silently.
        let mut targets: BTreeSet<NodeId> = BTreeSet::new();
        for record in &records {
            match &record.kind {
                MutationKind::ChildList { added, .. } => {
                    targets.extend(added.iter().filter(|&&n| page.is_alive(n)));
                }
                MutationKind::CharacterData | MutationKind::Attributes { .. } => {
                    if page.is_alive(record.target) {
                        targets.insert(record.target);
                    }
                }
            }
        }

        let mut wrapped = 0;
        for target in targets {
            if !page.is_alive(target) {
                continue;
            }
            wrapped += self.redactor.redact_subtree(page, target);
            self.stats.rescans += 1;
        }
        self.stats.wrappers_created += wrapped as u64;

        // Redaction splices emit their own records; drop them so the next
        // batch only carries external changes
        page.take_records();

        if wrapped > 0 {
            debug!(
                records = records.len(),
                wrapped, "Processed mutation batch"
            );
        }
        wrapped
    }
}

/// Drive a watcher from a blur command channel.
///
/// Mutation batches are processed on a `debounce` tick rather than per
/// mutation, so a storming page costs at most one bounded re-scan pass per
/// tick. The embedding holds the page behind the lock and mutates it
/// freely between ticks. Returns the watcher (with its stats) once the
/// command channel closes.
pub async fn run_watcher(
    mut watcher: PageWatcher,
    page: Arc<Mutex<Page>>,
    mut commands: mpsc::UnboundedReceiver<PageCommand>,
    debounce: Duration,
) -> PageWatcher {
    let mut tick = tokio::time::interval(debounce.max(Duration::from_millis(1)));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(PageCommand::EnableBlur) => {
                    let mut page = lock_page(&page);
                    watcher.enable(&mut page);
                }
                Some(PageCommand::DisableBlur) => {
                    let mut page = lock_page(&page);
                    watcher.disable(&mut page);
                }
                None => break,
            },
            _ = tick.tick() => {
                let mut page = lock_page(&page);
                watcher.process(&mut page);
            }
        }
    }
    watcher
}

fn lock_page(page: &Arc<Mutex<Page>>) -> std::sync::MutexGuard<'_, Page> {
    page.lock().unwrap_or_else(|poisoned| {
        warn!("Page lock poisoned; continuing with inner value");
        poisoned.into_inner()
    })
}

/// Find the indicator element, if present.
#[must_use]
pub fn find_indicator(page: &Page) -> Option<NodeId> {
    let mut stack = vec![page.root()];
    while let Some(current) = stack.pop() {
        if page.attribute(current, "id") == Some(INDICATOR_ID) {
            return Some(current);
        }
        stack.extend(page.children(current).iter().rev().copied());
    }
    None
}

/// Insert the protection indicator unless one already exists.
fn ensure_indicator(page: &mut Page) -> NodeId {
    if let Some(existing) = find_indicator(page) {
        return existing;
    }
    let indicator = page.create_element("div");
    page.set_attribute(indicator, "id", INDICATOR_ID);
    page.set_attribute(indicator, "style", INDICATOR_STYLE);
    let text = page.create_text(INDICATOR_TEXT);
    page.append_child(indicator, text);
    let root = page.root();
    page.append_child(root, indicator);
    indicator
}

/// Remove the protection indicator if present.
fn remove_indicator(page: &mut Page) {
    if let Some(indicator) = find_indicator(page) {
        page.remove_node(indicator);
    }
}
