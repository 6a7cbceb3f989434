//! Distance-based LOD selection over an ordered table of visibility thresholds.

use serde::{Deserialize, Serialize};

/// One entry of the LOD table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetailLevel {
    /// Mesh level of detail used at this tier (0 = full resolution).
    pub lod: u32,
    /// Farthest viewer distance (to the chunk's nearest edge) at which this
    /// tier is still used.
    pub visible_distance_threshold: f32,
}

impl DetailLevel {
    pub fn new(lod: u32, visible_distance_threshold: f32) -> Self {
        Self {
            lod,
            visible_distance_threshold,
        }
    }

    pub fn sqr_visible_distance_threshold(&self) -> f32 {
        self.visible_distance_threshold * self.visible_distance_threshold
    }
}

/// Errors produced when validating a LOD table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LodError {
    #[error("LOD table must contain at least one detail level")]
    Empty,

    #[error("detail level {index} has non-positive threshold {threshold}")]
    NonPositiveThreshold { index: usize, threshold: f32 },

    #[error("thresholds must be strictly increasing: level {index} ({threshold}) <= previous ({previous})")]
    NotIncreasing {
        index: usize,
        threshold: f32,
        previous: f32,
    },
}

/// Validated, ordered sequence of detail levels.
///
/// Finer tiers come first. The last tier's threshold is the maximum view
/// distance: chunks farther than that are hidden.
#[derive(Clone, Debug, PartialEq)]
pub struct LodTable {
    levels: Vec<DetailLevel>,
}

impl LodTable {
    /// Builds a table, rejecting empty tables and thresholds that are not
    /// positive and strictly increasing (NaN fails both checks).
    pub fn new(levels: Vec<DetailLevel>) -> Result<Self, LodError> {
        if levels.is_empty() {
            return Err(LodError::Empty);
        }
        for (index, level) in levels.iter().enumerate() {
            let threshold = level.visible_distance_threshold;
            if !(threshold > 0.0) {
                return Err(LodError::NonPositiveThreshold { index, threshold });
            }
            if index > 0 {
                let previous = levels[index - 1].visible_distance_threshold;
                if !(threshold > previous) {
                    return Err(LodError::NotIncreasing {
                        index,
                        threshold,
                        previous,
                    });
                }
            }
        }
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[DetailLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false; an empty table cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DetailLevel> {
        self.levels.get(index)
    }

    /// Threshold of the coarsest tier.
    pub fn max_view_distance(&self) -> f32 {
        self.levels[self.levels.len() - 1].visible_distance_threshold
    }

    /// Whether a chunk at `distance` should be shown at all.
    pub fn is_visible(&self, distance: f32) -> bool {
        distance <= self.max_view_distance()
    }

    /// Table index of the tier to use at `distance`.
    ///
    /// Walks the tiers finest-first and moves to the next one while the
    /// distance strictly exceeds the current threshold. A distance equal to a
    /// threshold stays on the finer tier. The coarsest tier is never compared,
    /// so distances past the view range clamp to it.
    pub fn select_index(&self, distance: f32) -> usize {
        let mut index = 0;
        for (i, level) in self.levels[..self.levels.len() - 1].iter().enumerate() {
            if distance > level.visible_distance_threshold {
                index = i + 1;
            } else {
                break;
            }
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(thresholds: &[f32]) -> LodTable {
        LodTable::new(
            thresholds
                .iter()
                .enumerate()
                .map(|(i, &t)| DetailLevel::new(i as u32, t))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_distance_returns_finest() {
        let t = table(&[100.0, 300.0, 600.0]);
        assert_eq!(t.select_index(0.0), 0);
    }

    #[test]
    fn test_scan_selects_expected_tiers() {
        let t = table(&[100.0, 300.0, 600.0]);
        assert_eq!(t.select_index(50.0), 0);
        assert_eq!(t.select_index(150.0), 1);
        assert_eq!(t.select_index(450.0), 2);
        assert!(t.is_visible(450.0));
        assert!(!t.is_visible(650.0));
    }

    #[test]
    fn test_threshold_boundary_keeps_finer_tier() {
        let t = table(&[100.0, 300.0, 600.0]);
        assert_eq!(t.select_index(100.0), 0);
        assert_eq!(t.select_index(100.001), 1);
        assert_eq!(t.select_index(300.0), 1);
        assert!(t.is_visible(600.0));
    }

    #[test]
    fn test_past_view_distance_clamps_to_coarsest() {
        let t = table(&[100.0, 300.0, 600.0]);
        assert_eq!(t.select_index(10_000.0), 2);
        assert_eq!(t.select_index(f32::MAX), 2);
    }

    #[test]
    fn test_monotonically_non_decreasing_with_distance() {
        let t = table(&[50.0, 120.0, 300.0, 800.0]);
        let mut prev = 0;
        for step in 0..2000 {
            let d = step as f32 * 0.5;
            let idx = t.select_index(d);
            assert!(idx >= prev, "index decreased at d={d}: {idx} < {prev}");
            prev = idx;
        }
        assert_eq!(prev, 3);
    }

    #[test]
    fn test_single_level_table() {
        let t = table(&[400.0]);
        assert_eq!(t.select_index(0.0), 0);
        assert_eq!(t.select_index(1000.0), 0);
        assert_eq!(t.max_view_distance(), 400.0);
    }

    #[test]
    fn test_empty_table_rejected() {
        assert_eq!(LodTable::new(Vec::new()), Err(LodError::Empty));
    }

    #[test]
    fn test_non_increasing_thresholds_rejected() {
        let err = LodTable::new(vec![
            DetailLevel::new(0, 100.0),
            DetailLevel::new(1, 100.0),
        ])
        .unwrap_err();
        assert!(matches!(err, LodError::NotIncreasing { index: 1, .. }));
        assert!(err.to_string().contains("strictly increasing"));
    }

    #[test]
    fn test_non_positive_and_nan_thresholds_rejected() {
        assert!(matches!(
            LodTable::new(vec![DetailLevel::new(0, 0.0)]),
            Err(LodError::NonPositiveThreshold { index: 0, .. })
        ));
        assert!(matches!(
            LodTable::new(vec![DetailLevel::new(0, 10.0), DetailLevel::new(1, f32::NAN)]),
            Err(LodError::NonPositiveThreshold { index: 1, .. })
        ));
    }

    #[test]
    fn test_sqr_threshold() {
        let t = LodTable::new(vec![DetailLevel::new(0, 5.0), DetailLevel::new(4, 20.0)]).unwrap();
        assert_eq!(t.levels()[0].sqr_visible_distance_threshold(), 25.0);
        assert_eq!(t.levels()[1].sqr_visible_distance_threshold(), 400.0);
        assert_eq!(t.len(), 2);
    }
}
