//! Label resolution: per-metric achievement and management label tables.
//!
//! Colors and icons are keyed by category enum, never by label text. The
//! resulting `LabelTables` is built once per run and shared read-only by the
//! station classifier, the zone aggregator and the layer assembler.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::levels::LevelDefinitionTable;
use crate::model::{
    AchievementCategory, ClassifyError, LevelCategory, LevelDefinition, LevelKind,
    ManagementCategory, MetricKind,
};

// ---------------------------------------------------------------------------
// Fixed color and icon assignments
// ---------------------------------------------------------------------------

pub const ACHIEVED_COLOR: &str = "#72a4cd";
pub const NOT_ACHIEVED_COLOR: &str = "#cd7277";
pub const INSUFFICIENT_DATA_COLOR: &str = "#dbdbdb";

/// Greyscale ramp, least to most severe.
pub const MANAGEMENT_RAMP: [&str; 4] = ["#f0f0f0", "#bdbdbd", "#737373", "#252525"];

/// Station marker icons, assigned round-robin in category order.
pub const MANAGEMENT_ICONS: [&str; 4] = [
    "icons/station-level-1.svg",
    "icons/station-level-2.svg",
    "icons/station-level-3.svg",
    "icons/station-level-4.svg",
];

pub fn achievement_color(category: AchievementCategory) -> &'static str {
    match category {
        AchievementCategory::Achieved => ACHIEVED_COLOR,
        AchievementCategory::NotAchieved => NOT_ACHIEVED_COLOR,
        AchievementCategory::InsufficientData => INSUFFICIENT_DATA_COLOR,
    }
}

pub fn management_color(category: ManagementCategory) -> &'static str {
    MANAGEMENT_RAMP[category.severity() as usize % MANAGEMENT_RAMP.len()]
}

// ---------------------------------------------------------------------------
// Label entries
// ---------------------------------------------------------------------------

/// A resolved label: everything the map needs to draw one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelEntry {
    pub metric: MetricKind,
    pub metric_display_name: String,
    pub category: LevelCategory,
    /// Total order within (metric, kind).
    pub order_rank: u8,
    pub color: &'static str,
    pub icon: Option<&'static str>,
    pub display_label: String,
    pub unit: String,
}

/// Both ordered label sequences for one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricLabels {
    pub metric: MetricKind,
    /// Not Achieved, Achieved, Insufficient Data.
    pub achievement: Vec<LabelEntry>,
    /// Least to most severe.
    pub management: Vec<LabelEntry>,
}

/// Keyed lookup from (metric, category) to label entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTables {
    pollutant: String,
    metrics: BTreeMap<MetricKind, MetricLabels>,
    index: HashMap<(MetricKind, LevelCategory), LabelEntry>,
}

impl LabelTables {
    /// Resolves label tables for every metric.
    ///
    /// Fails with `ConfigurationError` when a metric has no achievement or
    /// no management definitions, or defines the same category twice.
    pub fn resolve(table: &LevelDefinitionTable) -> Result<LabelTables, ClassifyError> {
        let mut metrics = BTreeMap::new();
        let mut index = HashMap::new();

        for metric in MetricKind::ALL {
            let labels = MetricLabels {
                metric,
                achievement: resolve_achievement(table, metric)?,
                management: resolve_management(table, metric)?,
            };
            for entry in labels.achievement.iter().chain(&labels.management) {
                index.insert((metric, entry.category), entry.clone());
            }
            debug!(
                %metric,
                achievement = labels.achievement.len(),
                management = labels.management.len(),
                "resolved label tables"
            );
            metrics.insert(metric, labels);
        }

        Ok(LabelTables {
            pollutant: table.pollutant.clone(),
            metrics,
            index,
        })
    }

    pub fn pollutant(&self) -> &str {
        &self.pollutant
    }

    /// Both sequences for a metric. Every metric is present after `resolve`.
    pub fn metric(&self, metric: MetricKind) -> Option<&MetricLabels> {
        self.metrics.get(&metric)
    }

    pub fn lookup(
        &self,
        metric: MetricKind,
        category: LevelCategory,
    ) -> Result<&LabelEntry, ClassifyError> {
        self.index
            .get(&(metric, category))
            .ok_or_else(|| ClassifyError::MissingLabelMapping {
                metric,
                category: category.name().to_string(),
            })
    }

    pub fn achievement(
        &self,
        metric: MetricKind,
        category: AchievementCategory,
    ) -> Result<&LabelEntry, ClassifyError> {
        self.lookup(metric, LevelCategory::Achievement(category))
    }

    pub fn management(
        &self,
        metric: MetricKind,
        category: ManagementCategory,
    ) -> Result<&LabelEntry, ClassifyError> {
        self.lookup(metric, LevelCategory::Management(category))
    }
}

fn resolve_achievement(
    table: &LevelDefinitionTable,
    metric: MetricKind,
) -> Result<Vec<LabelEntry>, ClassifyError> {
    // The table's own Insufficient Data row, if any, is replaced by the
    // synthetic entry below.
    let definitions: Vec<&LevelDefinition> = table
        .definitions_for(metric, LevelKind::Achievement)
        .filter(|d| d.category != LevelCategory::Achievement(AchievementCategory::InsufficientData))
        .collect();
    if definitions.is_empty() {
        return Err(ClassifyError::ConfigurationError {
            metric,
            reason: "no achievement levels defined".to_string(),
        });
    }
    check_unique(metric, &definitions)?;

    let metric_display_name = metric.display_name(&table.pollutant);
    let unit = definitions[0].unit.clone();

    let mut entries: Vec<LabelEntry> = definitions
        .iter()
        .filter_map(|d| match d.category {
            LevelCategory::Achievement(category) => Some(LabelEntry {
                metric,
                metric_display_name: metric_display_name.clone(),
                category: d.category,
                order_rank: category.rank(),
                color: achievement_color(category),
                icon: None,
                display_label: achievement_label(category, band_text(d).as_deref()),
                unit: d.unit.clone(),
            }),
            LevelCategory::Management(_) => None,
        })
        .collect();

    let insufficient = AchievementCategory::InsufficientData;
    entries.push(LabelEntry {
        metric,
        metric_display_name,
        category: LevelCategory::Achievement(insufficient),
        order_rank: insufficient.rank(),
        color: achievement_color(insufficient),
        icon: None,
        display_label: achievement_label(insufficient, None),
        unit,
    });
    entries.sort_by_key(|e| e.order_rank);
    Ok(entries)
}

fn resolve_management(
    table: &LevelDefinitionTable,
    metric: MetricKind,
) -> Result<Vec<LabelEntry>, ClassifyError> {
    let definitions = table.management_bands(metric);
    if definitions.is_empty() {
        return Err(ClassifyError::ConfigurationError {
            metric,
            reason: "no management levels defined".to_string(),
        });
    }
    check_unique(metric, &definitions)?;

    let metric_display_name = metric.display_name(&table.pollutant);
    let mut entries: Vec<LabelEntry> = definitions
        .iter()
        .filter_map(|d| match d.category {
            LevelCategory::Management(category) => Some(LabelEntry {
                metric,
                metric_display_name: metric_display_name.clone(),
                category: d.category,
                order_rank: category.severity(),
                color: management_color(category),
                icon: None,
                display_label: management_label(category, band_text(d).as_deref(), &d.unit),
                unit: d.unit.clone(),
            }),
            LevelCategory::Achievement(_) => None,
        })
        .collect();
    entries.sort_by_key(|e| e.order_rank);

    for (position, entry) in entries.iter_mut().enumerate() {
        entry.icon = Some(MANAGEMENT_ICONS[position % MANAGEMENT_ICONS.len()]);
    }
    Ok(entries)
}

fn check_unique(metric: MetricKind, definitions: &[&LevelDefinition]) -> Result<(), ClassifyError> {
    let mut seen = Vec::with_capacity(definitions.len());
    for definition in definitions {
        if seen.contains(&definition.category) {
            return Err(ClassifyError::ConfigurationError {
                metric,
                reason: format!("category '{}' defined more than once", definition.category),
            });
        }
        seen.push(definition.category);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Label formatting
// ---------------------------------------------------------------------------

/// Band text for a definition: the supplied label, or one derived from the
/// cut points. `None` when the definition has no band.
pub fn band_text(definition: &LevelDefinition) -> Option<String> {
    if let Some(label) = &definition.band_label {
        return Some(label.clone());
    }
    let unit = &definition.unit;
    match (definition.cut_low, definition.cut_high) {
        (None, Some(high)) => Some(format!("up to {}{}", high, unit)),
        (Some(low), None) => Some(format!("over {}{}", low, unit)),
        (Some(low), Some(high)) => Some(format!("{}{} - {}{}", low, unit, high, unit)),
        (None, None) => None,
    }
}

/// Inserts a space between a numeric run and a unit marker that directly
/// follows it: `60µg/m³` → `60 µg/m³`.
pub fn space_units(text: &str) -> String {
    let mut spaced = String::with_capacity(text.len() + 4);
    let mut after_digit = false;
    for c in text.chars() {
        if after_digit && (c.is_alphabetic() || c == '%') {
            spaced.push(' ');
        }
        spaced.push(c);
        after_digit = c.is_ascii_digit();
    }
    spaced
}

/// `Achieved (up to 60 µg/m³)`, or the bare category name without a band.
pub fn achievement_label(category: AchievementCategory, band: Option<&str>) -> String {
    match band {
        Some(band) => format!("{} ({})", category.name(), space_units(band)),
        None => category.name().to_string(),
    }
}

/// `<category> (<band> <unit>)` with the unit printed once: every unit
/// occurrence inside the band text is stripped before it is appended.
pub fn management_label(category: ManagementCategory, band: Option<&str>, unit: &str) -> String {
    let Some(band) = band else {
        return category.name().to_string();
    };
    let stripped = if unit.is_empty() {
        band.to_string()
    } else {
        band.replace(unit, "")
    };
    let stripped = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let annotated = if unit.is_empty() {
        stripped
    } else {
        format!("{} {}", stripped, unit)
    };
    format!("{} ({})", category.name(), space_units(&annotated))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::caaqs_no2;

    fn microgram_table() -> LevelDefinitionTable {
        let mut table = caaqs_no2();
        table.definitions.retain(|d| d.metric != MetricKind::Annual);
        table.definitions.extend([
            LevelDefinition {
                metric: MetricKind::Annual,
                category: LevelCategory::Achievement(AchievementCategory::Achieved),
                cut_low: None,
                cut_high: Some(60.0),
                band_label: Some("up to 60µg/m³".to_string()),
                unit: "µg/m³".to_string(),
            },
            LevelDefinition {
                metric: MetricKind::Annual,
                category: LevelCategory::Achievement(AchievementCategory::NotAchieved),
                cut_low: Some(60.0),
                cut_high: None,
                band_label: Some("over 60µg/m³".to_string()),
                unit: "µg/m³".to_string(),
            },
        ]);
        for (category, low, high) in [
            (ManagementCategory::KeepingCleanAreasClean, 0.0, 20.0),
            (ManagementCategory::PreventingDeterioration, 20.0, 40.0),
            (ManagementCategory::PreventingExceedance, 40.0, 60.0),
            (ManagementCategory::AchievingStandard, 60.0, 200.0),
        ] {
            table.definitions.push(LevelDefinition {
                metric: MetricKind::Annual,
                category: LevelCategory::Management(category),
                cut_low: Some(low),
                cut_high: Some(high),
                band_label: Some(format!("{}µg/m³ - {}µg/m³", low, high)),
                unit: "µg/m³".to_string(),
            });
        }
        table
    }

    #[test]
    fn test_achievement_sequence_has_fixed_order_and_unique_colors() {
        let labels = LabelTables::resolve(&caaqs_no2()).expect("built-in table resolves");
        for metric in MetricKind::ALL {
            let achievement = &labels.metric(metric).expect("metric present").achievement;
            let categories: Vec<_> = achievement.iter().map(|e| e.category).collect();
            assert_eq!(
                categories,
                vec![
                    LevelCategory::Achievement(AchievementCategory::NotAchieved),
                    LevelCategory::Achievement(AchievementCategory::Achieved),
                    LevelCategory::Achievement(AchievementCategory::InsufficientData),
                ]
            );
            let colors: std::collections::HashSet<_> = achievement.iter().map(|e| e.color).collect();
            assert_eq!(colors.len(), 3, "achievement colors must be unique");
        }
    }

    #[test]
    fn test_management_sequence_has_unique_colors_and_icons() {
        let labels = LabelTables::resolve(&caaqs_no2()).expect("built-in table resolves");
        for metric in MetricKind::ALL {
            let management = &labels.metric(metric).expect("metric present").management;
            assert_eq!(management.len(), 4);

            let ranks: Vec<_> = management.iter().map(|e| e.order_rank).collect();
            assert_eq!(ranks, vec![0, 1, 2, 3], "least severe first");

            let colors: std::collections::HashSet<_> = management.iter().map(|e| e.color).collect();
            let icons: std::collections::HashSet<_> = management.iter().map(|e| e.icon).collect();
            assert_eq!(colors.len(), 4, "management colors must be unique");
            assert_eq!(icons.len(), 4, "management icons must be unique");
            assert!(management.iter().all(|e| e.icon.is_some()));
        }
    }

    #[test]
    fn test_insufficient_data_entry_has_no_band_and_inherits_unit() {
        let labels = LabelTables::resolve(&microgram_table()).expect("table resolves");
        let entry = labels
            .achievement(MetricKind::Annual, AchievementCategory::InsufficientData)
            .expect("synthetic entry present");
        assert_eq!(entry.display_label, "Insufficient Data");
        assert_eq!(entry.color, INSUFFICIENT_DATA_COLOR);
        assert_eq!(entry.unit, "µg/m³");
    }

    #[test]
    fn test_achieved_label_scenario() {
        let labels = LabelTables::resolve(&microgram_table()).expect("table resolves");
        let entry = labels
            .achievement(MetricKind::Annual, AchievementCategory::Achieved)
            .expect("Achieved entry present");
        assert_eq!(entry.color, "#72a4cd");
        assert_eq!(entry.display_label, "Achieved (up to 60 µg/m³)");
    }

    #[test]
    fn test_management_label_prints_unit_once() {
        let labels = LabelTables::resolve(&microgram_table()).expect("table resolves");
        let entry = labels
            .management(MetricKind::Annual, ManagementCategory::PreventingExceedance)
            .expect("entry present");
        assert_eq!(
            entry.display_label,
            "Actions for Preventing CAAQS Exceedance (40 - 60 µg/m³)"
        );
    }

    #[test]
    fn test_builtin_labels_are_derived_from_cut_points() {
        let labels = LabelTables::resolve(&caaqs_no2()).expect("built-in table resolves");
        let achieved = labels
            .achievement(MetricKind::OneHour, AchievementCategory::Achieved)
            .expect("entry present");
        assert_eq!(achieved.display_label, "Achieved (up to 60 ppb)");

        let worst = labels
            .management(MetricKind::Annual, ManagementCategory::AchievingStandard)
            .expect("entry present");
        assert_eq!(
            worst.display_label,
            "Actions for Achieving Air Zone CAAQS (over 17 ppb)"
        );
        assert_eq!(worst.metric_display_name, "Annual NO2 Metric");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let table = caaqs_no2();
        let first = LabelTables::resolve(&table).expect("resolves");
        let second = LabelTables::resolve(&table).expect("resolves");
        for metric in MetricKind::ALL {
            assert_eq!(first.metric(metric), second.metric(metric));
        }
    }

    #[test]
    fn test_missing_management_levels_is_configuration_error() {
        let mut table = caaqs_no2();
        table
            .definitions
            .retain(|d| !(d.metric == MetricKind::OneHour && d.category.kind() == LevelKind::Management));
        let result = LabelTables::resolve(&table);
        assert_eq!(
            result,
            Err(ClassifyError::ConfigurationError {
                metric: MetricKind::OneHour,
                reason: "no management levels defined".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_achievement_levels_is_configuration_error() {
        let mut table = caaqs_no2();
        table
            .definitions
            .retain(|d| !(d.metric == MetricKind::Annual && d.category.kind() == LevelKind::Achievement));
        assert!(matches!(
            LabelTables::resolve(&table),
            Err(ClassifyError::ConfigurationError { metric: MetricKind::Annual, .. })
        ));
    }

    #[test]
    fn test_duplicate_category_is_configuration_error() {
        let mut table = caaqs_no2();
        let duplicate = table.definitions[0].clone();
        table.definitions.push(duplicate);
        assert!(matches!(
            LabelTables::resolve(&table),
            Err(ClassifyError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_space_units_only_splits_digit_unit_boundaries() {
        assert_eq!(space_units("60µg/m³"), "60 µg/m³");
        assert_eq!(space_units("2.5ppb"), "2.5 ppb");
        assert_eq!(space_units("60 ppb"), "60 ppb");
        assert_eq!(space_units("NO2 levels"), "NO2 levels");
        assert_eq!(space_units("over 17ppb"), "over 17 ppb");
    }
}
