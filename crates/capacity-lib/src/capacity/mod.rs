//! Capacity checks and node recommendations
//!
//! This module answers whether a new server of a given size can be placed
//! at a location or on a specific node, and ranks candidate nodes.

mod check;
mod recommender;

pub use check::{CapacityChecker, CheckOptions, DEFAULT_MAX_RECOMMENDATIONS};
pub use recommender::{fit_score, load_score, rank_score, recommend, TARGET_HEADROOM_PERCENT};
