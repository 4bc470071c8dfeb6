use serde::Serialize;

/// Inclusive `[min, max]` window a reading must fall into to be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Empirical sanity windows per physical quantity.
///
/// None of these thresholds are documented anywhere; they are what real hardware
/// produces, and may need tuning per platform (see `Config::from_env`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlausibilityLimits {
    /// Integer millivolt rails (AOD region).
    pub voltage_mv: Range,
    pub power_w: Range,
    pub current_a: Range,
    pub temperature_c: Range,
    pub core_clock_ghz: Range,
}

pub const DEFAULT_VOLTAGE_MV: Range = Range::new(500.0, 3000.0);
pub const DEFAULT_POWER_W: Range = Range::new(0.5, 400.0);
pub const DEFAULT_CURRENT_A: Range = Range::new(0.5, 200.0);
pub const DEFAULT_TEMPERATURE_C: Range = Range::new(1.0, 150.0);
pub const DEFAULT_CORE_CLOCK_GHZ: Range = Range::new(0.5, 6.5);

impl Default for PlausibilityLimits {
    fn default() -> Self {
        Self {
            voltage_mv: DEFAULT_VOLTAGE_MV,
            power_w: DEFAULT_POWER_W,
            current_a: DEFAULT_CURRENT_A,
            temperature_c: DEFAULT_TEMPERATURE_C,
            core_clock_ghz: DEFAULT_CORE_CLOCK_GHZ,
        }
    }
}

/// Returns the first candidate value inside `range`, in caller priority order.
///
/// Priority is positional: a later candidate is never preferred over an earlier one
/// that qualifies, whatever their magnitudes.
pub fn first_plausible<I>(candidates: I, range: Range) -> Option<f32>
where
    I: IntoIterator<Item = (usize, f32)>,
{
    candidates
        .into_iter()
        .map(|(_, v)| v)
        .find(|&v| range.contains(v))
}

/// Bounds-checked table access; anything outside the table reads as 0.0.
#[must_use]
pub fn safe_get(table: &[f32], index: usize) -> f32 {
    table.get(index).copied().unwrap_or(0.0)
}

/// [`first_plausible`] over a list of table indices.
#[must_use]
pub fn first_plausible_at(table: &[f32], indices: &[usize], range: Range) -> Option<f32> {
    first_plausible(indices.iter().map(|&i| (i, safe_get(table, i))), range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_candidates_are_absent() {
        assert_eq!(first_plausible(Vec::new(), DEFAULT_POWER_W), None);
    }

    #[test]
    fn all_out_of_range_is_absent() {
        let c = vec![(0, 0.1), (1, 1500.0), (2, f32::NAN)];
        assert_eq!(first_plausible(c, DEFAULT_POWER_W), None);
    }

    #[test]
    fn priority_order_wins_over_magnitude() {
        let c = vec![(0, 5.0), (1, 1500.0)];
        assert_eq!(first_plausible(c, DEFAULT_POWER_W), Some(5.0));

        let c = vec![(7, 1500.0), (3, 300.0), (1, 5.0)];
        assert_eq!(first_plausible(c, DEFAULT_POWER_W), Some(300.0));
    }

    #[test]
    fn range_edges_are_inclusive() {
        assert!(DEFAULT_TEMPERATURE_C.contains(1.0));
        assert!(DEFAULT_TEMPERATURE_C.contains(150.0));
        assert!(!DEFAULT_TEMPERATURE_C.contains(150.1));
    }

    #[test]
    fn indexed_lookup_skips_missing_slots() {
        let table = [0.0, 42.0, 7.0];
        assert_eq!(
            first_plausible_at(&table, &[99, 0, 2, 1], DEFAULT_POWER_W),
            Some(7.0)
        );
        assert_eq!(safe_get(&table, 3), 0.0);
    }
}
