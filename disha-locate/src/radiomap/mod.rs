//! Radio map construction and the canonical on-disk formats.
//!
//! Two artifacts are produced from a folder tree of survey logs:
//!
//! - **full radio map**: every reading, one row per sample index per
//!   location, padded with the NaN placeholder up to the location's
//!   largest per-MAC sample count;
//! - **mean radio map**: one averaged fingerprint row per location.
//!
//! Both share the header `# X, Y, <mac1>, <mac2>, ...` (or
//! `# Latitude, Longitude, ...` for outdoor surveys). The header's MAC
//! order is canonical: every value column in the file is positionally
//! aligned to it.

mod builder;
mod mean;

pub use builder::{rss_bounds, RadioMapBuilder, RawRadioMap};
pub use mean::MeanRadioMap;
