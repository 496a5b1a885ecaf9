//! Map-layer assembly: palettes, legends and marker sets per metric.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::classify::labels::{LabelEntry, LabelTables};
use crate::classify::stations::ClassifiedStation;
use crate::classify::zones::ClassifiedZone;
use crate::model::{ClassifyError, LevelCategory, ManagementCategory, MetricKind};

/// One legend row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub color: &'static str,
    pub label: String,
}

impl From<&LabelEntry> for LegendEntry {
    fn from(entry: &LabelEntry) -> Self {
        LegendEntry {
            color: entry.color,
            label: entry.display_label.clone(),
        }
    }
}

/// Everything the renderer needs to draw one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayer {
    pub metric: MetricKind,
    pub metric_display_name: String,
    /// Zone fill color keyed by display label.
    pub palette: BTreeMap<String, &'static str>,
    /// Not Achieved, Achieved, Insufficient Data.
    pub zone_legend: Vec<LegendEntry>,
    /// Most severe first.
    pub station_legend: Vec<LegendEntry>,
    /// Icons for the management categories present among this metric's stations.
    pub marker_set: BTreeMap<ManagementCategory, &'static str>,
    pub stations: Vec<ClassifiedStation>,
    pub zones: Vec<ClassifiedZone>,
}

impl MapLayer {
    /// Palette color for a zone display label.
    pub fn fill_color(&self, display_label: &str) -> Result<&'static str, ClassifyError> {
        self.palette
            .get(display_label)
            .copied()
            .ok_or_else(|| ClassifyError::UnmappedPaletteValue {
                metric: self.metric,
                label: display_label.to_string(),
            })
    }
}

/// Builds one layer per metric, in `MetricKind::ALL` order.
pub fn assemble_layers(
    stations: &[ClassifiedStation],
    zones: &[ClassifiedZone],
    labels: &LabelTables,
) -> Result<Vec<MapLayer>, ClassifyError> {
    MetricKind::ALL
        .into_iter()
        .map(|metric| assemble_layer(metric, stations, zones, labels))
        .collect()
}

fn assemble_layer(
    metric: MetricKind,
    stations: &[ClassifiedStation],
    zones: &[ClassifiedZone],
    labels: &LabelTables,
) -> Result<MapLayer, ClassifyError> {
    let metric_labels = labels
        .metric(metric)
        .ok_or_else(|| ClassifyError::ConfigurationError {
            metric,
            reason: "label tables were not resolved for this metric".to_string(),
        })?;

    let palette: BTreeMap<String, &'static str> = metric_labels
        .achievement
        .iter()
        .map(|e| (e.display_label.clone(), e.color))
        .collect();

    let zone_legend = metric_labels.achievement.iter().map(LegendEntry::from).collect();
    let station_legend = metric_labels
        .management
        .iter()
        .rev()
        .map(LegendEntry::from)
        .collect();

    let layer_zones: Vec<ClassifiedZone> = zones
        .iter()
        .filter(|z| z.zone.metric == metric)
        .cloned()
        .collect();
    let layer_stations: Vec<ClassifiedStation> = stations
        .iter()
        .filter(|s| s.station.metric == metric)
        .cloned()
        .collect();

    let mut marker_set = BTreeMap::new();
    for station in &layer_stations {
        if let (LevelCategory::Management(category), Some(icon)) =
            (station.label.category, station.label.icon)
        {
            marker_set.insert(category, icon);
        }
    }

    let layer = MapLayer {
        metric,
        metric_display_name: metric.display_name(labels.pollutant()),
        palette,
        zone_legend,
        station_legend,
        marker_set,
        stations: layer_stations,
        zones: layer_zones,
    };

    for zone in &layer.zones {
        layer.fill_color(&zone.label.display_label)?;
    }

    debug!(
        %metric,
        stations = layer.stations.len(),
        zones = layer.zones.len(),
        markers = layer.marker_set.len(),
        "assembled map layer"
    );
    Ok(layer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
