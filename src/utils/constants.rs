//! Shared configuration constants for pagesnap
//!
//! This module contains default values and marker conventions used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Chrome user agent string sent with every resource fetch
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
/// Next update: 2025-04-29 (quarterly schedule)
///
/// Chrome releases new stable versions ~every 4 weeks.
/// Update quarterly to stay within reasonable version window.
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Class prefix of inline scripts injected by the host page's own runtime.
///
/// Scripts carrying this prefix hold the dynamic-regeneration logic that
/// lazily swaps placeholder images for resolved URLs. The collector reads
/// their text; the assembler neutralizes them so they cannot revert the
/// already-inlined snapshot back to placeholders.
pub const INJECTED_SCRIPT_CLASS_PREFIX: &str = "injected-";

/// Name of the generation-key → URL object literal assigned inside
/// injected scripts. The collector matches a single bounded assignment of
/// this identifier and parses the right-hand side as JSON.
pub const PLACEHOLDER_MAP_IDENT: &str = "IMG_GEN_REPLACE_MAP";

/// Attribute set on rewritten images so lazy-load scripts skip them.
pub const RESOLVED_MARKER_ATTR: &str = "data-downloaded";

/// Attribute set on neutralized injected scripts.
pub const DISABLED_MARKER_ATTR: &str = "data-disabled-by-pagesnap";

/// Lazy-load attributes stripped from rewritten images. Any of these left
/// in place can cause the page's own scripts to reprocess the element.
pub const LAZY_LOAD_ATTRS: [&str; 3] = ["go-data-src", "data-src", "data-lazy-src"];

/// Tag name of the on-page progress panel pagesnap injects while working.
/// The assembler removes it from the snapshot clone.
pub const PROGRESS_PANEL_TAG: &str = "pagesnap-progress";

/// Interval between publish status polls
pub const PUBLISH_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3);

/// Maximum number of publish status polls (40 × 3s = 120s ceiling)
pub const PUBLISH_MAX_POLLS: u32 = 40;

/// Default per-request timeout for resource fetches
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Settle delay after navigation before the page is scanned.
///
/// The original capture flow waits a short fixed period for freshly
/// injected page scripts to finish their first pass; this is a
/// cross-process readiness workaround, not part of the core algorithm.
pub const PAGE_SETTLE_DELAY_MS: u64 = 100;
