//! Shared utilities for pagesnap

pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{filename_from_title, is_ephemeral_url, is_inline_url, resolve_url};
