//! Zone aggregation: ambient achievement category, station counts, tooltip
//! and popup for each (zone, metric) record.

use serde::Serialize;
use tracing::{info, warn};

use crate::classify::labels::{LabelEntry, LabelTables};
use crate::classify::stations::StationCounts;
use crate::model::{AchievementCategory, ClassifyError, Zone};

/// A zone with its resolved achievement label and display text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedZone {
    pub zone: Zone,
    pub ambient_category: AchievementCategory,
    pub station_count: usize,
    pub label: LabelEntry,
    pub tooltip: String,
    /// Absent for Insufficient Data zones.
    pub popup: Option<String>,
}

/// Joins ambient categories and station counts onto zones.
///
/// An unset or blank ambient category becomes Insufficient Data. Text that
/// names no achievement category is a `MissingLabelMapping`.
pub fn aggregate_zones(
    zones: &[Zone],
    counts: &StationCounts,
    labels: &LabelTables,
) -> Result<Vec<ClassifiedZone>, ClassifyError> {
    let mut aggregated = Vec::with_capacity(zones.len());
    let mut filled = 0;

    for zone in zones {
        let ambient_category = match zone.ambient_category.as_deref().map(str::trim) {
            None | Some("") => {
                filled += 1;
                AchievementCategory::InsufficientData
            }
            Some(text) => AchievementCategory::parse(text).ok_or_else(|| {
                ClassifyError::MissingLabelMapping {
                    metric: zone.metric,
                    category: text.to_string(),
                }
            })?,
        };

        let label = labels.achievement(zone.metric, ambient_category)?.clone();
        let station_count = counts.get(&zone.id, zone.metric);
        let tooltip = format!("{}<br>{}", zone.name, station_count_phrase(station_count));
        let popup = match ambient_category {
            AchievementCategory::InsufficientData => None,
            _ => Some(zone_popup(zone, &label)),
        };

        aggregated.push(ClassifiedZone {
            zone: zone.clone(),
            ambient_category,
            station_count,
            label,
            tooltip,
            popup,
        });
    }

    if filled > 0 {
        warn!(filled, "zones without an ambient category set to Insufficient Data");
    }
    info!(zones = aggregated.len(), "aggregated zone achievement levels");
    Ok(aggregated)
}

/// "1 Monitoring Station"; every other count, including zero, is plural.
pub fn station_count_phrase(count: usize) -> String {
    if count == 1 {
        "1 Monitoring Station".to_string()
    } else {
        format!("{} Monitoring Stations", count)
    }
}

fn zone_popup(zone: &Zone, label: &LabelEntry) -> String {
    let mut popup = format!(
        "<b>{} Air Zone</b><br>{}: {}",
        zone.name, label.metric_display_name, label.display_label
    );
    if let Some(station) = &zone.representative_station_id {
        popup.push_str(&format!("<br>Representative station: {}", station));
    }
    if let Some(years) = zone.years_of_data {
        popup.push_str(&format!("<br>Years of data: {}", years));
    }
    popup
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
