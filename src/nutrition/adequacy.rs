//! Nutrient adequacy classification
//!
//! Threshold bands for percentage-of-daily-allowance values and the
//! top-N summary shown on the dashboard.

use serde::Serialize;

use crate::models::NutrientReportEntry;

// ============================================================================
// Thresholds and Colors
// ============================================================================

/// Below this coverage a nutrient is deficient
pub const DEFICIENT_BELOW: f64 = 90.0;
/// Above this coverage a nutrient is in excess
pub const EXCESS_ABOVE: f64 = 110.0;
/// Full daily allowance, drawn as the chart reference line
pub const REFERENCE_LINE: f64 = 100.0;
/// Number of metrics on the dashboard summary card
pub const DASHBOARD_TOP_N: usize = 4;

const COLOR_DEFICIENT: &str = "#ef4444"; // Red
const COLOR_EXCESS: &str = "#3b82f6"; // Blue
const COLOR_ADEQUATE: &str = "#10b981"; // Green

// ============================================================================
// Classification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdequacyStatus {
    Deficient,
    Adequate,
    Excess,
}

impl AdequacyStatus {
    /// Classify a percentage; 90 and 110 are both adequate
    pub fn classify(percentage: f64) -> Self {
        if percentage < DEFICIENT_BELOW {
            AdequacyStatus::Deficient
        } else if percentage > EXCESS_ABOVE {
            AdequacyStatus::Excess
        } else {
            AdequacyStatus::Adequate
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            AdequacyStatus::Deficient => COLOR_DEFICIENT,
            AdequacyStatus::Adequate => COLOR_ADEQUATE,
            AdequacyStatus::Excess => COLOR_EXCESS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdequacyStatus::Deficient => "deficient",
            AdequacyStatus::Adequate => "adequate",
            AdequacyStatus::Excess => "excess",
        }
    }
}

// ============================================================================
// Derivations
// ============================================================================

/// The `n` entries with the highest percentage, descending.
///
/// Ties keep backend order. NaN sorts last.
pub fn top_nutrients(entries: &[NutrientReportEntry], n: usize) -> Vec<NutrientReportEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| {
        b.percentage
            .partial_cmp(&a.percentage)
            .unwrap_or_else(|| a.percentage.is_nan().cmp(&b.percentage.is_nan()))
    });
    sorted.truncate(n);
    sorted
}

/// "vitamin_b12" -> "Vitamin B12"
pub fn display_name(nutrient_name: &str) -> String {
    nutrient_name
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whole-number percentage for display
pub fn rounded_percentage(percentage: f64) -> i64 {
    percentage.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(values: &[f64]) -> Vec<NutrientReportEntry> {
        values
            .iter()
            .enumerate()
            .map(|(i, p)| NutrientReportEntry {
                nutrient_name: format!("nutrient_{}", i),
                percentage: *p,
            })
            .collect()
    }

    #[test]
    fn test_top_four_excludes_lowest() {
        let top = top_nutrients(&entries(&[40.0, 150.0, 95.0, 10.0, 60.0]), 4);
        let values: Vec<f64> = top.iter().map(|e| e.percentage).collect();
        assert_eq!(values, vec![150.0, 95.0, 60.0, 40.0]);
    }

    #[test]
    fn test_top_n_fewer_entries_than_n() {
        let top = top_nutrients(&entries(&[12.0, 80.0]), 4);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].percentage, 80.0);
        assert!(top_nutrients(&[], 4).is_empty());
    }

    #[test]
    fn test_top_n_ties_keep_order() {
        let top = top_nutrients(&entries(&[50.0, 50.0, 70.0]), 3);
        assert_eq!(top[1].nutrient_name, "nutrient_0");
        assert_eq!(top[2].nutrient_name, "nutrient_1");
    }

    #[test]
    fn test_nan_sorts_last() {
        let top = top_nutrients(&entries(&[f64::NAN, 20.0, 30.0]), 3);
        assert_eq!(top[0].percentage, 30.0);
        assert!(top[2].percentage.is_nan());
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(AdequacyStatus::classify(89.9), AdequacyStatus::Deficient);
        assert_eq!(AdequacyStatus::classify(90.0), AdequacyStatus::Adequate);
        assert_eq!(AdequacyStatus::classify(110.0), AdequacyStatus::Adequate);
        assert_eq!(AdequacyStatus::classify(110.1), AdequacyStatus::Excess);
        assert_eq!(AdequacyStatus::classify(0.0), AdequacyStatus::Deficient);
    }

    #[test]
    fn test_colors() {
        assert_eq!(AdequacyStatus::Deficient.color(), "#ef4444");
        assert_eq!(AdequacyStatus::Adequate.color(), "#10b981");
        assert_eq!(AdequacyStatus::Excess.color(), "#3b82f6");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("vitamin_b12"), "Vitamin B12");
        assert_eq!(display_name("iron"), "Iron");
        assert_eq!(display_name("thiamin_b1"), "Thiamin B1");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn test_rounded_percentage() {
        assert_eq!(rounded_percentage(42.5), 43);
        assert_eq!(rounded_percentage(99.4), 99);
    }
}
