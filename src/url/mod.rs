//! URL handling module for Site-Sentinel
//!
//! This module provides URL normalization, origin derivation and the
//! same-origin test used to keep the crawl inside the seed's site.

mod normalize;
mod origin;

// Re-export main functions
pub use normalize::normalize_url;
pub use origin::{is_same_origin, origin_of};
