//! # Watering status from sensor watermarks.
//!
//! Young trees are monitored by soil-tension watermarks at 30, 60 and 90 cm.
//! A tree in its n-th standing year (the planting year is year 1) is judged on
//! the n shallowest depths; each depth is rated against thresholds for that
//! year and the worst rating wins.
//!
//! | Standing year | Depths     | Good (≤ cb) | Moderate (≤ cb) |
//! |---------------|------------|-------------|-----------------|
//! | 1             | 30         | 25          | 33              |
//! | 2             | 30, 60     | 62          | 81              |
//! | 3             | 30, 60, 90 | 80          | 100             |
//!
//! Older trees, future planting years and readings lacking a required depth
//! yield `Unknown`.

use super::entities::{Tree, WateringStatus, Watermark};

const DEPTHS: [i32; 3] = [30, 60, 90];

/// `(good_max, moderate_max)` centibar per standing year.
const THRESHOLDS: [(i32, i32); 3] = [(25, 33), (62, 81), (80, 100)];

/// Computes a tree's status from one reading.
pub fn calculate_watering_status(
    planting_year: i32,
    current_year: i32,
    watermarks: &[Watermark],
) -> WateringStatus {
    let standing_year = current_year - planting_year + 1;
    let Ok(idx) = usize::try_from(standing_year - 1) else {
        return WateringStatus::Unknown;
    };
    let Some(&(good_max, moderate_max)) = THRESHOLDS.get(idx) else {
        return WateringStatus::Unknown;
    };

    let mut worst = WateringStatus::Good;
    for depth in &DEPTHS[..=idx] {
        let Some(mark) = watermarks.iter().find(|w| w.depth == *depth) else {
            return WateringStatus::Unknown;
        };
        let rated = if mark.centibar <= good_max {
            WateringStatus::Good
        } else if mark.centibar <= moderate_max {
            WateringStatus::Moderate
        } else {
            WateringStatus::Bad
        };
        if rated.severity() > worst.severity() {
            worst = rated;
        }
    }
    worst
}

/// Aggregates tree statuses into a cluster status.
///
/// The most severe known status wins; `Unknown` if no tree status is known.
pub fn aggregate_cluster_status<'a>(trees: impl IntoIterator<Item = &'a Tree>) -> WateringStatus {
    trees
        .into_iter()
        .map(|t| t.watering_status)
        .max_by_key(|s| s.severity())
        .unwrap_or(WateringStatus::Unknown)
}
