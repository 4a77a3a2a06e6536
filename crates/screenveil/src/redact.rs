//! Visual redaction of sensitive spans.
//!
//! The [`Redactor`] walks text nodes, runs the span matcher over their
//! content, and replaces each matched span with a wrapper element carrying
//! the blur style and the original text as its only child. Removing the
//! wrappers restores the original text byte-for-byte.
//!
//! Redaction is idempotent: text nodes already inside a wrapper are never
//! wrapped again, and unchanged text nodes are skipped via a BLAKE3
//! fingerprint of their content recorded at scan time. A `Redactor` tracks
//! fingerprints per node id, so use one instance per [`Page`].

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::page::{NodeId, Page};
use crate::scan::Matcher;

/// Tag used for redaction wrapper elements.
pub const WRAPPER_TAG: &str = "span";

/// Class marking an element as a redaction wrapper.
pub const WRAPPER_CLASS: &str = "blur-sensitive";

/// Attribute carrying the classification of the wrapped span.
pub const KIND_ATTRIBUTE: &str = "data-veil";

/// Default blur intensity in pixels.
pub const DEFAULT_BLUR_INTENSITY: u32 = 10;

/// The inline style applied to wrappers for the given intensity.
#[must_use]
pub fn blur_style(intensity: u32) -> String {
    format!("filter: blur({intensity}px)")
}

/// Wraps sensitive spans of a page's text nodes in blur wrappers.
#[derive(Debug)]
pub struct Redactor {
    matcher: Matcher,
    blur_intensity: u32,
    /// BLAKE3 fingerprints of already-scanned text node content.
    fingerprints: HashMap<NodeId, String>,
}

impl Redactor {
    /// Create a redactor with all built-in patterns and the default
    /// intensity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_matcher(Matcher::new(), DEFAULT_BLUR_INTENSITY)
    }

    /// Create a redactor from a configured matcher and blur intensity.
    #[must_use]
    pub fn with_matcher(matcher: Matcher, blur_intensity: u32) -> Self {
        Self {
            matcher,
            blur_intensity,
            fingerprints: HashMap::new(),
        }
    }

    /// The blur intensity wrappers are created with.
    #[must_use]
    pub fn blur_intensity(&self) -> u32 {
        self.blur_intensity
    }

    /// Whether `id` is a wrapper element or sits inside one.
    #[must_use]
    pub fn is_wrapped(page: &Page, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if page
                .attribute(c, "class")
                .is_some_and(|class| class.split_whitespace().any(|cls| cls == WRAPPER_CLASS))
            {
                return true;
            }
            current = page.parent(c);
        }
        false
    }

    /// Redact every sensitive span in the text nodes under `root`.
    ///
    /// Returns the number of wrappers created. Re-running over already
    /// redacted content is a no-op; a missing `root` is a silent no-op.
    pub fn redact_subtree(&mut self, page: &mut Page, root: NodeId) -> usize {
        if !page.is_alive(root) {
            return 0;
        }

        let mut wrapped = 0;
        for node in page.descendant_text_nodes(root) {
            wrapped += self.redact_text_node(page, node);
        }
        wrapped
    }

    /// Redact a single text node. Returns the number of wrappers created.
    fn redact_text_node(&mut self, page: &mut Page, node: NodeId) -> usize {
        let Some(content) = page.text(node).map(str::to_string) else {
            return 0;
        };
        if Self::is_wrapped(page, node) {
            trace!(?node, "Skipping text inside existing wrapper");
            return 0;
        }

        let fp = fingerprint(&content);
        if self.fingerprints.get(&node) == Some(&fp) {
            return 0;
        }

        let spans = self.matcher.find_spans(&content);
        if spans.is_empty() {
            self.fingerprints.insert(node, fp);
            return 0;
        }

        // Split the node into plain text fragments and wrapper elements,
        // preserving the original bytes across the pieces.
        let style = blur_style(self.blur_intensity);
        let mut replacements: Vec<NodeId> = Vec::new();
        let mut cursor = 0;
        for span in &spans {
            if span.start > cursor {
                let fragment = page.create_text(&content[cursor..span.start]);
                self.fingerprints
                    .insert(fragment, fingerprint(&content[cursor..span.start]));
                replacements.push(fragment);
            }

            let wrapper = page.create_element(WRAPPER_TAG);
            page.set_attribute(wrapper, "class", WRAPPER_CLASS);
            page.set_attribute(wrapper, "style", style.clone());
            page.set_attribute(wrapper, KIND_ATTRIBUTE, span.kind.as_str());
            let inner = page.create_text(span.matched(&content));
            page.append_child(wrapper, inner);
            replacements.push(wrapper);

            cursor = span.end;
        }
        if cursor < content.len() {
            let fragment = page.create_text(&content[cursor..]);
            self.fingerprints
                .insert(fragment, fingerprint(&content[cursor..]));
            replacements.push(fragment);
        }

        if !page.replace_with(node, &replacements) {
            // Node vanished between scan and splice
            return 0;
        }
        self.fingerprints.remove(&node);

        debug!(?node, spans = spans.len(), "Redacted text node");
        spans.len()
    }

    /// Remove every wrapper under `root`, restoring the original text.
    ///
    /// Adjacent text fragments left behind by wrapping are merged back
    /// together, so the restored content is byte-identical to the
    /// pre-redaction text. Returns the number of wrappers removed.
    pub fn unwrap_all(&mut self, page: &mut Page, root: NodeId) -> usize {
        if !page.is_alive(root) {
            return 0;
        }

        let wrappers = collect_wrappers(page, root);
        let mut removed = 0;
        for wrapper in wrappers {
            if !page.is_alive(wrapper) {
                continue;
            }
            let original = page.text_content(wrapper);
            let restored = page.create_text(original);
            if page.replace_with(wrapper, &[restored]) {
                removed += 1;
            }
        }

        if removed > 0 {
            page.normalize(root);
        }
        // Content layout changed wholesale; drop stale fingerprints so the
        // restored nodes get scanned fresh next time.
        self.fingerprints.clear();

        debug!(removed, "Unwrapped redactions");
        removed
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}

fn fingerprint(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Collect wrapper elements under `root` in document order.
fn collect_wrappers(page: &Page, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(current) = stack.pop() {
        if page
            .attribute(current, "class")
            .is_some_and(|class| class.split_whitespace().any(|cls| cls == WRAPPER_CLASS))
        {
            out.push(current);
            // Wrappers never nest; no need to descend further
            continue;
        }
        let children = page.children(current);
        stack.extend(children.iter().rev().copied());
    }
    out
}
