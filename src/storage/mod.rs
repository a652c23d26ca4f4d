pub mod cache;

pub use cache::{CacheEntry, FingerprintCache};
