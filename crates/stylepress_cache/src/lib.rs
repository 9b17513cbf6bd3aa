//! # stylepress_cache
//!
//! Content-addressed cache for compiled stylesheets.
//!
//! This crate lets the transform pipeline skip the compile and prefix stages
//! for sources it has already processed.
//!
//! ## Cache Strategy
//!
//! 1. **Content-addressed keys**: an entry is keyed by the logical path *and*
//!    the content hash, so an edited file never hits a stale entry
//! 2. **Successes only**: failed transforms are never stored
//! 3. **Bounded**: once the capacity is reached the oldest entry is evicted
//!
//! The cache lives in memory for as long as its owner keeps it. It is shared
//! between concurrent pipeline runs behind an `Arc`.

mod entry;
mod manager;

pub use entry::{CacheKey, CachedArtifact};
pub use manager::{DEFAULT_CAPACITY, TransformCache};
