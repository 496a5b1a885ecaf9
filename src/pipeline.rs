//! End-to-end classification run.
//!
//! Level table → label tables → {stations, zones} → map layers. Each stage
//! takes the previous stage's output by reference and returns a new value;
//! the first error aborts the run.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::classify::labels::LabelTables;
use crate::classify::stations::classify_stations;
use crate::classify::zones::aggregate_zones;
use crate::config::ServiceConfig;
use crate::ingest::records::{load_stations, load_zones};
use crate::layers::{MapLayer, assemble_layers};
use crate::levels::{LevelDefinitionTable, caaqs_no2, load_levels};
use crate::logging::log_classification_summary;
use crate::model::{AchievementCategory, ClassifyError, LoadError, MetricKind, Station, Zone};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error("failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize report: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Per-metric counts reported alongside the layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric: MetricKind,
    pub stations_total: usize,
    pub stations_classified: usize,
    pub stations_dropped: usize,
    pub zones_by_category: BTreeMap<AchievementCategory, usize>,
}

/// Serialized hand-off to the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct MapReport {
    pub generated_at: DateTime<Utc>,
    pub pollutant: String,
    pub summary: Vec<MetricSummary>,
    pub layers: Vec<MapLayer>,
}

/// Layers and per-metric counts from one classification run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub layers: Vec<MapLayer>,
    pub summary: Vec<MetricSummary>,
}

/// Runs every stage and returns one layer per metric with its summary.
pub fn run(
    table: &LevelDefinitionTable,
    stations: &[Station],
    zones: &[Zone],
) -> Result<RunOutput, ClassifyError> {
    let labels = LabelTables::resolve(table)?;
    let classified = classify_stations(stations, zones, table, &labels)?;
    let aggregated = aggregate_zones(zones, &classified.counts, &labels)?;
    let layers = assemble_layers(&classified.stations, &aggregated, &labels)?;

    let summary = summarize(&layers, stations);
    for metric in &summary {
        log_classification_summary(
            metric.metric,
            metric.stations_total,
            metric.stations_classified,
            metric.stations_dropped,
        );
    }
    Ok(RunOutput { layers, summary })
}

/// Counts per metric. `stations` is the raw input, nulls included.
pub fn summarize(layers: &[MapLayer], stations: &[Station]) -> Vec<MetricSummary> {
    layers
        .iter()
        .map(|layer| {
            let stations_total = stations.iter().filter(|s| s.metric == layer.metric).count();
            let stations_classified = layer.stations.len();
            let mut zones_by_category = BTreeMap::new();
            for zone in &layer.zones {
                *zones_by_category.entry(zone.ambient_category).or_insert(0) += 1;
            }
            MetricSummary {
                metric: layer.metric,
                stations_total,
                stations_classified,
                stations_dropped: stations_total - stations_classified,
                zones_by_category,
            }
        })
        .collect()
}

/// Loads the configured inputs and runs the pipeline.
pub fn run_from_config(config: &ServiceConfig) -> Result<MapReport, PipelineError> {
    let table = match &config.levels_file {
        Some(path) => load_levels(path)?,
        None => caaqs_no2(),
    };
    let stations = load_stations(&config.stations_file, &table.pollutant)?;
    let zones = load_zones(&config.zones_file, &table.pollutant)?;
    info!(
        stations = stations.len(),
        zones = zones.len(),
        pollutant = %table.pollutant,
        "loaded inputs"
    );

    let RunOutput { layers, summary } = run(&table, &stations, &zones)?;
    Ok(MapReport {
        generated_at: Utc::now(),
        pollutant: table.pollutant.clone(),
        summary,
        layers,
    })
}

/// Writes the report as pretty JSON to `output`, or stdout when `None`.
pub fn write_report(report: &MapReport, output: Option<&Path>) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(report).map_err(PipelineError::Serialize)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).map_err(|source| PipelineError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            info!(path = %path.display(), "wrote map report");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json).map_err(|source| PipelineError::Write {
                path: PathBuf::from("<stdout>"),
                source,
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, metric: MetricKind, value: Option<f64>) -> Station {
        Station {
            id: id.to_string(),
            name: id.to_string(),
            zone_id: "ne".to_string(),
            metric,
            metric_value: value,
            location: None,
        }
    }

    #[test]
    fn test_summary_counts_dropped_stations() {
        let stations = vec![
            station("a", MetricKind::Annual, Some(1.0)),
            station("b", MetricKind::Annual, None),
            station("c", MetricKind::OneHour, Some(25.0)),
        ];
        let output = run(&caaqs_no2(), &stations, &[]).expect("pipeline runs");
        assert_eq!(output.summary, summarize(&output.layers, &stations));
        let summary = output.summary;

        assert_eq!(summary[0].metric, MetricKind::OneHour);
        assert_eq!(summary[0].stations_dropped, 0);
        assert_eq!(summary[1].stations_total, 2);
        assert_eq!(summary[1].stations_classified, 1);
        assert_eq!(summary[1].stations_dropped, 1);
    }

    #[test]
    fn test_run_propagates_configuration_error() {
        let mut table = caaqs_no2();
        table.definitions.clear();
        let result = run(&table, &[], &[]);
        assert!(matches!(result, Err(ClassifyError::ConfigurationError { .. })));
    }

    #[test]
    fn test_write_report_to_file() {
        let RunOutput { layers, summary } = run(&caaqs_no2(), &[], &[]).expect("pipeline runs");
        let report = MapReport {
            generated_at: Utc::now(),
            pollutant: "NO2".to_string(),
            summary,
            layers,
        };
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("layers.json");
        write_report(&report, Some(&path)).expect("report written");

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("readable"))
                .expect("valid JSON");
        assert_eq!(written["pollutant"], "NO2");
        assert_eq!(written["layers"].as_array().map(Vec::len), Some(2));
        assert_eq!(written["layers"][0]["metric"], "one_hour");
    }
}
