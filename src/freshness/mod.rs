//! Freshness detection: blake3 content hashes and the image-stage cache.

mod cache;
mod hash;

pub use cache::{ImageCache, STATE_DIR};
pub use hash::ContentHash;
