/// Level definition table for the achievement/management classification.
///
/// Holds, per metric, the ordered achievement levels and management levels
/// with their numeric bands and unit metadata. The built-in table encodes
/// the 2020 NO2 standard; alternative tables can be loaded from TOML in the
/// same shape the scoring library exports them.
///
/// This is the single source of truth for band cut points. Every other
/// module reads bands from here rather than hardcoding thresholds.

use crate::model::{
    AchievementCategory, LevelCategory, LevelDefinition, LevelKind, LoadError,
    ManagementCategory, MetricKind,
};
use serde::Deserialize;
use std::path::Path;

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Immutable reference data loaded once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelDefinitionTable {
    /// Pollutant display code, e.g. "NO2". Its lowercase form plus `_` is
    /// the internal metric id prefix.
    pub pollutant: String,
    pub definitions: Vec<LevelDefinition>,
}

impl LevelDefinitionTable {
    /// Definitions for one metric and level kind, in table order.
    pub fn definitions_for(
        &self,
        metric: MetricKind,
        kind: LevelKind,
    ) -> impl Iterator<Item = &LevelDefinition> {
        self.definitions
            .iter()
            .filter(move |d| d.metric == metric && d.category.kind() == kind)
    }

    pub fn management_bands(&self, metric: MetricKind) -> Vec<&LevelDefinition> {
        self.definitions_for(metric, LevelKind::Management).collect()
    }
}

/// Built-in NO2 table: 1-hour standard 60 ppb, annual standard 17 ppb.
pub fn caaqs_no2() -> LevelDefinitionTable {
    use AchievementCategory::{Achieved, NotAchieved};
    use ManagementCategory::*;

    let achievement = |metric, category, low, high| LevelDefinition {
        metric,
        category: LevelCategory::Achievement(category),
        cut_low: low,
        cut_high: high,
        band_label: None,
        unit: "ppb".to_string(),
    };
    let management = |metric, category, low: f64, high: Option<f64>| LevelDefinition {
        metric,
        category: LevelCategory::Management(category),
        cut_low: Some(low),
        cut_high: high,
        band_label: None,
        unit: "ppb".to_string(),
    };

    let one_hour = MetricKind::OneHour;
    let annual = MetricKind::Annual;

    LevelDefinitionTable {
        pollutant: "NO2".to_string(),
        definitions: vec![
            achievement(one_hour, Achieved, None, Some(60.0)),
            achievement(one_hour, NotAchieved, Some(60.0), None),
            achievement(annual, Achieved, None, Some(17.0)),
            achievement(annual, NotAchieved, Some(17.0), None),
            management(one_hour, KeepingCleanAreasClean, 0.0, Some(20.0)),
            management(one_hour, PreventingDeterioration, 20.0, Some(31.0)),
            management(one_hour, PreventingExceedance, 31.0, Some(60.0)),
            management(one_hour, AchievingStandard, 60.0, None),
            management(annual, KeepingCleanAreasClean, 0.0, Some(2.0)),
            management(annual, PreventingDeterioration, 2.0, Some(7.0)),
            management(annual, PreventingExceedance, 7.0, Some(17.0)),
            management(annual, AchievingStandard, 17.0, None),
        ],
    }
}

// ---------------------------------------------------------------------------
// TOML loading
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LevelFile {
    pollutant: String,
    #[serde(default)]
    achievement: Vec<AchievementRow>,
    #[serde(default)]
    management: Vec<ManagementRow>,
}

#[derive(Debug, Deserialize)]
struct AchievementRow {
    metric: MetricKind,
    category: AchievementCategory,
    lower: Option<f64>,
    upper: Option<f64>,
    label: Option<String>,
    unit: String,
}

#[derive(Debug, Deserialize)]
struct ManagementRow {
    metric: MetricKind,
    category: ManagementCategory,
    lower: Option<f64>,
    upper: Option<f64>,
    label: Option<String>,
    unit: String,
}

/// Parses a level table from TOML text.
///
/// Table order is preserved. Missing tables are accepted here; an empty
/// table for a metric is rejected later by the label resolver.
pub fn parse_levels(text: &str, path: &Path) -> Result<LevelDefinitionTable, LoadError> {
    let file: LevelFile = toml::from_str(text).map_err(|source| LoadError::Toml {
        path: path.to_path_buf(),
        source,
    })?;

    let achievement = file.achievement.into_iter().map(|row| LevelDefinition {
        metric: row.metric,
        category: LevelCategory::Achievement(row.category),
        cut_low: row.lower,
        cut_high: row.upper,
        band_label: row.label,
        unit: row.unit,
    });
    let management = file.management.into_iter().map(|row| LevelDefinition {
        metric: row.metric,
        category: LevelCategory::Management(row.category),
        cut_low: row.lower,
        cut_high: row.upper,
        band_label: row.label,
        unit: row.unit,
    });

    Ok(LevelDefinitionTable {
        pollutant: file.pollutant,
        definitions: achievement.chain(management).collect(),
    })
}

/// Loads a level table from a TOML file.
pub fn load_levels(path: impl AsRef<Path>) -> Result<LevelDefinitionTable, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_levels(&text, path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
