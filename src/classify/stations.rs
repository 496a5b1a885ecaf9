//! Station classification against management bands.
//!
//! Stations without a metric value are dropped before anything is counted,
//! so zone station counts only ever include stations that were classified.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::classify::labels::{LabelEntry, LabelTables};
use crate::levels::LevelDefinitionTable;
use crate::model::{
    ClassifyError, LevelCategory, ManagementCategory, MetricKind, Station, Zone,
};

/// A station with its management level, label and popup content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedStation {
    pub station: Station,
    pub value: f64,
    pub management_category: ManagementCategory,
    pub label: LabelEntry,
    /// `<station name>_<metric suffix>`, unique per (station, metric).
    pub station_key: String,
    pub zone_name: String,
    pub popup: String,
}

/// Qualifying station counts per metric, keyed by zone id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationCounts {
    counts: HashMap<MetricKind, HashMap<String, usize>>,
}

impl StationCounts {
    /// Counts stations that carry a metric value.
    pub fn from_stations(stations: &[Station]) -> StationCounts {
        let mut counts: HashMap<MetricKind, HashMap<String, usize>> = HashMap::new();
        for station in stations.iter().filter(|s| s.metric_value.is_some()) {
            *counts
                .entry(station.metric)
                .or_default()
                .entry(station.zone_id.clone())
                .or_insert(0) += 1;
        }
        StationCounts { counts }
    }

    /// Zero when no qualifying station exists.
    pub fn get(&self, zone_id: &str, metric: MetricKind) -> usize {
        self.counts
            .get(&metric)
            .and_then(|zones| zones.get(zone_id))
            .copied()
            .unwrap_or(0)
    }
}

/// Output of `classify_stations`.
#[derive(Debug, Clone, PartialEq)]
pub struct StationClassification {
    pub stations: Vec<ClassifiedStation>,
    pub counts: StationCounts,
    /// Stations dropped for lack of a metric value.
    pub dropped: usize,
}

/// Classifies every station that has a metric value.
///
/// `zones` is used only to look up display names by zone id.
pub fn classify_stations(
    stations: &[Station],
    zones: &[Zone],
    table: &LevelDefinitionTable,
    labels: &LabelTables,
) -> Result<StationClassification, ClassifyError> {
    let zone_names: HashMap<&str, &str> = zones
        .iter()
        .map(|z| (z.id.as_str(), z.name.as_str()))
        .collect();

    let counts = StationCounts::from_stations(stations);
    let mut classified = Vec::with_capacity(stations.len());
    let mut dropped = 0;

    for station in stations {
        let Some(value) = station.metric_value else {
            debug!(
                station = %station.id,
                metric = %station.metric,
                "dropping station with insufficient data"
            );
            dropped += 1;
            continue;
        };

        let category = management_category(table, station.metric, value)?;
        let label = labels.management(station.metric, category)?.clone();
        let zone_name = zone_names
            .get(station.zone_id.as_str())
            .map(|name| name.to_string())
            .unwrap_or_else(|| station.zone_id.clone());
        let popup = station_popup(&station.name, &zone_name, value, &label);

        classified.push(ClassifiedStation {
            station_key: station_key(&station.name, station.metric),
            station: station.clone(),
            value,
            management_category: category,
            label,
            zone_name,
            popup,
        });
    }

    info!(
        classified = classified.len(),
        dropped, "classified stations against management bands"
    );
    Ok(StationClassification {
        stations: classified,
        counts,
        dropped,
    })
}

/// Locates the management band containing `value`.
///
/// Bands are `[low, high)`. The band with the highest finite upper bound is
/// also closed at that bound so the top of a bounded table is reachable.
pub fn management_category(
    table: &LevelDefinitionTable,
    metric: MetricKind,
    value: f64,
) -> Result<ManagementCategory, ClassifyError> {
    if value.is_nan() {
        return Err(ClassifyError::OutOfRangeValue { metric, value });
    }

    let bands = table.management_bands(metric);
    let top = bands
        .iter()
        .filter_map(|d| d.cut_high)
        .fold(None, |max: Option<f64>, high| Some(max.map_or(high, |m| m.max(high))));

    let band = bands
        .iter()
        .find(|d| d.contains(value))
        .or_else(|| {
            top.filter(|&high| high == value)
                .and_then(|high| bands.iter().find(|d| d.cut_high == Some(high)))
        });

    match band.map(|d| d.category) {
        Some(LevelCategory::Management(category)) => Ok(category),
        _ => Err(ClassifyError::OutOfRangeValue { metric, value }),
    }
}

/// Station name plus metric suffix, e.g. `Victoria Topaz_1yr`.
pub fn station_key(name: &str, metric: MetricKind) -> String {
    format!("{}_{}", name, metric.suffix())
}

fn station_popup(station: &str, zone: &str, value: f64, label: &LabelEntry) -> String {
    format!(
        "<b>{}</b><br>{} Air Zone<br>{}: {} {}<br>{}",
        station, zone, label.metric_display_name, value, label.unit, label.display_label
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
