//! Best-estimate selection.
//!
//! Horizontal accuracy is the primary trust signal. Among equally accurate
//! estimates the most recent one wins, since older samples are more exposed
//! to scene drift.

use crate::algorithms::estimate_store::GeoSceneEstimate;
use std::cmp::Ordering;

/// Ordering that puts the most trustworthy estimate first
pub fn compare_estimates(a: &GeoSceneEstimate, b: &GeoSceneEstimate) -> Ordering {
    a.location
        .horizontal_accuracy
        .total_cmp(&b.location.horizontal_accuracy)
        .then_with(|| b.location.timestamp_ms.cmp(&a.location.timestamp_ms))
}

/// Most trustworthy estimate, recomputed from scratch on every call
pub fn select_best(estimates: &[GeoSceneEstimate]) -> Option<&GeoSceneEstimate> {
    estimates.iter().min_by(|a, b| compare_estimates(a, b))
}
