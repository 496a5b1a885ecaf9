/// Core data types for the air zone classification service.
///
/// This module defines the shared domain model imported by all other modules:
/// metric identifiers, achievement/management categories, level definitions,
/// the raw station and zone records, and the error types. It contains no
/// classification logic and no I/O.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// The two regulatory averaging periods tracked independently throughout
/// the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    OneHour,
    Annual,
}

impl MetricKind {
    /// Canonical processing order.
    pub const ALL: [MetricKind; 2] = [MetricKind::OneHour, MetricKind::Annual];

    /// Identifier suffix following the pollutant prefix, e.g. `no2_3yr`.
    ///
    /// The 1-hour metric is a three-year average of annual 98th percentiles,
    /// hence `3yr`; the annual metric is a single-year mean.
    pub fn suffix(self) -> &'static str {
        match self {
            MetricKind::OneHour => "3yr",
            MetricKind::Annual => "1yr",
        }
    }

    /// Full internal identifier for a pollutant, e.g. `no2_1yr` for "NO2".
    pub fn id(self, pollutant: &str) -> String {
        format!("{}{}", pollutant_prefix(pollutant), self.suffix())
    }

    /// Parses an internal identifier (`no2_3yr`) back into a metric.
    ///
    /// The prefix match is case-insensitive; returns `None` for identifiers
    /// of another pollutant or an unknown suffix.
    pub fn from_id(id: &str, pollutant: &str) -> Option<MetricKind> {
        let prefix = pollutant_prefix(pollutant);
        let lowered = id.trim().to_lowercase();
        let suffix = lowered.strip_prefix(&prefix)?;
        MetricKind::ALL.into_iter().find(|m| m.suffix() == suffix)
    }

    /// Human-readable metric name used in legends and popups.
    pub fn display_name(self, pollutant: &str) -> String {
        match self {
            MetricKind::OneHour => format!("1-Hour {} Metric", pollutant),
            MetricKind::Annual => format!("Annual {} Metric", pollutant),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::OneHour => write!(f, "1-hour"),
            MetricKind::Annual => write!(f, "annual"),
        }
    }
}

/// Internal identifier prefix for a pollutant: "NO2" → "no2_".
pub fn pollutant_prefix(pollutant: &str) -> String {
    format!("{}_", pollutant.trim().to_lowercase())
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Whether a zone's ambient metric meets the standard.
///
/// Variant order is the canonical legend order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AchievementCategory {
    #[serde(rename = "Not Achieved")]
    NotAchieved,
    #[serde(rename = "Achieved")]
    Achieved,
    #[serde(rename = "Insufficient Data")]
    InsufficientData,
}

impl AchievementCategory {
    pub const ALL: [AchievementCategory; 3] = [
        AchievementCategory::NotAchieved,
        AchievementCategory::Achieved,
        AchievementCategory::InsufficientData,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AchievementCategory::NotAchieved => "Not Achieved",
            AchievementCategory::Achieved => "Achieved",
            AchievementCategory::InsufficientData => "Insufficient Data",
        }
    }

    /// Position in the fixed legend order.
    pub fn rank(self) -> u8 {
        match self {
            AchievementCategory::NotAchieved => 0,
            AchievementCategory::Achieved => 1,
            AchievementCategory::InsufficientData => 2,
        }
    }

    /// Case-insensitive match against the category name.
    pub fn parse(text: &str) -> Option<AchievementCategory> {
        let text = text.trim();
        AchievementCategory::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(text))
    }
}

impl fmt::Display for AchievementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Action-oriented management levels, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ManagementCategory {
    #[serde(rename = "Actions for Keeping Clean Areas Clean", alias = "keeping_clean")]
    KeepingCleanAreasClean,
    #[serde(
        rename = "Actions for Preventing Air Quality Deterioration",
        alias = "preventing_deterioration"
    )]
    PreventingDeterioration,
    #[serde(
        rename = "Actions for Preventing CAAQS Exceedance",
        alias = "preventing_exceedance"
    )]
    PreventingExceedance,
    #[serde(rename = "Actions for Achieving Air Zone CAAQS", alias = "achieving")]
    AchievingStandard,
}

impl ManagementCategory {
    pub const ALL: [ManagementCategory; 4] = [
        ManagementCategory::KeepingCleanAreasClean,
        ManagementCategory::PreventingDeterioration,
        ManagementCategory::PreventingExceedance,
        ManagementCategory::AchievingStandard,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ManagementCategory::KeepingCleanAreasClean => "Actions for Keeping Clean Areas Clean",
            ManagementCategory::PreventingDeterioration => {
                "Actions for Preventing Air Quality Deterioration"
            }
            ManagementCategory::PreventingExceedance => "Actions for Preventing CAAQS Exceedance",
            ManagementCategory::AchievingStandard => "Actions for Achieving Air Zone CAAQS",
        }
    }

    /// 0 = least severe, 3 = most severe.
    pub fn severity(self) -> u8 {
        match self {
            ManagementCategory::KeepingCleanAreasClean => 0,
            ManagementCategory::PreventingDeterioration => 1,
            ManagementCategory::PreventingExceedance => 2,
            ManagementCategory::AchievingStandard => 3,
        }
    }
}

impl fmt::Display for ManagementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which of the two level tables a definition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelKind {
    Achievement,
    Management,
}

/// A category tagged with its level kind, used as the label lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum LevelCategory {
    Achievement(AchievementCategory),
    Management(ManagementCategory),
}

impl LevelCategory {
    pub fn kind(self) -> LevelKind {
        match self {
            LevelCategory::Achievement(_) => LevelKind::Achievement,
            LevelCategory::Management(_) => LevelKind::Management,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LevelCategory::Achievement(c) => c.name(),
            LevelCategory::Management(c) => c.name(),
        }
    }
}

impl fmt::Display for LevelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Level definitions
// ---------------------------------------------------------------------------

/// One row of the level definition table.
///
/// `cut_low`/`cut_high` describe the numeric band `[cut_low, cut_high)`;
/// a missing bound is unbounded on that side. `band_label` is the band text
/// supplied by the scoring library (e.g. `"up to 60ppb"`), if any.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelDefinition {
    pub metric: MetricKind,
    pub category: LevelCategory,
    pub cut_low: Option<f64>,
    pub cut_high: Option<f64>,
    pub band_label: Option<String>,
    pub unit: String,
}

impl LevelDefinition {
    pub fn has_band(&self) -> bool {
        self.cut_low.is_some() || self.cut_high.is_some()
    }

    /// Half-open membership test: low bound inclusive, high bound exclusive.
    pub fn contains(&self, value: f64) -> bool {
        let above_low = self.cut_low.is_none_or(|low| value >= low);
        let below_high = self.cut_high.is_none_or(|high| value < high);
        above_low && below_high
    }
}

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// WGS84 point location of a monitoring station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    pub lon: f64,
    pub lat: f64,
}

/// One (station, metric) record as read from the station input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub zone_id: String,
    pub metric: MetricKind,
    /// `None` when the station has insufficient data for this metric.
    pub metric_value: Option<f64>,
    pub location: Option<PointGeometry>,
}

/// One (zone, metric) record as read from the zone input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub metric: MetricKind,
    /// Category text from the scoring output; `None` when left unset.
    pub ambient_category: Option<String>,
    pub representative_station_id: Option<String>,
    pub years_of_data: Option<u32>,
    /// Polygon rings as `[lon, lat]` pairs, carried through untouched.
    pub boundary: Vec<Vec<[f64; 2]>>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal classification failures. None of these are retried; the run stops
/// at the first one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifyError {
    /// A metric has no achievement or management definitions, or the table
    /// is otherwise unusable.
    #[error("configuration error for {metric} metric: {reason}")]
    ConfigurationError { metric: MetricKind, reason: String },
    /// A classified category has no corresponding label entry.
    #[error("no label mapping for category '{category}' of the {metric} metric")]
    MissingLabelMapping { metric: MetricKind, category: String },
    /// A metric value falls outside every management band.
    #[error("value {value} of the {metric} metric falls outside every management band")]
    OutOfRangeValue { metric: MetricKind, value: f64 },
    /// A zone display label is missing from the metric's palette.
    #[error("display label '{label}' of the {metric} metric is not in the palette")]
    UnmappedPaletteValue { metric: MetricKind, label: String },
}

/// Failures reading configuration, level tables or input records.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown metric identifier '{id}' (expected {pollutant} metrics)")]
    UnknownMetric { id: String, pollutant: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_ids_round_trip_through_prefix() {
        for metric in MetricKind::ALL {
            let id = metric.id("NO2");
            assert!(id.starts_with("no2_"), "id '{}' should carry the no2_ prefix", id);
            assert_eq!(MetricKind::from_id(&id, "NO2"), Some(metric));
        }
    }

    #[test]
    fn test_metric_from_id_rejects_other_pollutants() {
        assert_eq!(MetricKind::from_id("pm25_1yr", "NO2"), None);
        assert_eq!(MetricKind::from_id("no2_5yr", "NO2"), None);
        assert_eq!(MetricKind::from_id("NO2_1YR", "NO2"), Some(MetricKind::Annual));
    }

    #[test]
    fn test_display_names_mention_pollutant() {
        assert_eq!(MetricKind::OneHour.display_name("NO2"), "1-Hour NO2 Metric");
        assert_eq!(MetricKind::Annual.display_name("NO2"), "Annual NO2 Metric");
    }

    #[test]
    fn test_achievement_parse_is_case_insensitive() {
        assert_eq!(
            AchievementCategory::parse(" not achieved "),
            Some(AchievementCategory::NotAchieved)
        );
        assert_eq!(
            AchievementCategory::parse("Insufficient Data"),
            Some(AchievementCategory::InsufficientData)
        );
        assert_eq!(AchievementCategory::parse("Exceeded"), None);
    }

    #[test]
    fn test_management_severity_matches_variant_order() {
        let mut sorted = ManagementCategory::ALL;
        sorted.sort();
        assert_eq!(sorted, ManagementCategory::ALL);
        for (i, category) in ManagementCategory::ALL.iter().enumerate() {
            assert_eq!(category.severity() as usize, i);
        }
    }

    #[test]
    fn test_band_contains_is_half_open() {
        let band = LevelDefinition {
            metric: MetricKind::Annual,
            category: LevelCategory::Management(ManagementCategory::PreventingDeterioration),
            cut_low: Some(2.0),
            cut_high: Some(7.0),
            band_label: None,
            unit: "ppb".to_string(),
        };
        assert!(band.contains(2.0), "low bound is inclusive");
        assert!(band.contains(6.99));
        assert!(!band.contains(7.0), "high bound is exclusive");
        assert!(!band.contains(1.99));
    }

    #[test]
    fn test_unbounded_band_contains_everything_above_low() {
        let band = LevelDefinition {
            metric: MetricKind::OneHour,
            category: LevelCategory::Management(ManagementCategory::AchievingStandard),
            cut_low: Some(60.0),
            cut_high: None,
            band_label: None,
            unit: "ppb".to_string(),
        };
        assert!(band.contains(60.0));
        assert!(band.contains(1.0e6));
        assert!(!band.contains(59.9));
    }
}
