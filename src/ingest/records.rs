/// Flat-file station and zone records.
///
/// Reads the JSON arrays written by the upstream scoring step: one station
/// record per (station, metric) pair and one zone record per (zone, metric)
/// pair. Metric identifiers are matched against the pollutant of the level
/// table in use (e.g. `no2_3yr`, `no2_1yr` for NO2).

use serde::Deserialize;
use std::path::Path;

use crate::model::{LoadError, MetricKind, PointGeometry, Station, Zone};

// ============================================================================
// Raw record structures
// ============================================================================

/// Station record as written by the scoring step.
#[derive(Debug, Deserialize)]
pub struct StationRecord {
    pub station_id: String,
    pub station_name: String,
    #[serde(alias = "airzone")]
    pub zone_id: String,
    pub metric: String,
    pub metric_value: Option<f64>,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
}

/// Zone record as written by the scoring step.
#[derive(Debug, Deserialize)]
pub struct ZoneRecord {
    pub zone_id: String,
    pub zone_name: String,
    pub metric: String,
    #[serde(rename = "caaqs_ambient")]
    pub ambient_category: Option<String>,
    #[serde(rename = "rep_stn_id")]
    pub representative_station_id: Option<String>,
    #[serde(rename = "n_years")]
    pub years_of_data: Option<u32>,
    #[serde(default)]
    pub geometry: Vec<Vec<[f64; 2]>>,
}

// ============================================================================
// Parsing
// ============================================================================

fn parse_metric(id: &str, pollutant: &str) -> Result<MetricKind, LoadError> {
    MetricKind::from_id(id, pollutant).ok_or_else(|| LoadError::UnknownMetric {
        id: id.to_string(),
        pollutant: pollutant.to_string(),
    })
}

/// Parses a JSON array of station records.
pub fn parse_stations(json: &str, pollutant: &str) -> Result<Vec<Station>, LoadError> {
    let records: Vec<StationRecord> = serde_json::from_str(json)?;
    records
        .into_iter()
        .map(|r| -> Result<Station, LoadError> {
            let location = match (r.lon, r.lat) {
                (Some(lon), Some(lat)) => Some(PointGeometry { lon, lat }),
                _ => None,
            };
            Ok(Station {
                metric: parse_metric(&r.metric, pollutant)?,
                id: r.station_id,
                name: r.station_name,
                zone_id: r.zone_id,
                metric_value: r.metric_value,
                location,
            })
        })
        .collect()
}

/// Parses a JSON array of zone records.
pub fn parse_zones(json: &str, pollutant: &str) -> Result<Vec<Zone>, LoadError> {
    let records: Vec<ZoneRecord> = serde_json::from_str(json)?;
    records
        .into_iter()
        .map(|r| -> Result<Zone, LoadError> {
            Ok(Zone {
                metric: parse_metric(&r.metric, pollutant)?,
                id: r.zone_id,
                name: r.zone_name,
                ambient_category: r.ambient_category,
                representative_station_id: r.representative_station_id,
                years_of_data: r.years_of_data,
                boundary: r.geometry,
            })
        })
        .collect()
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_stations(path: impl AsRef<Path>, pollutant: &str) -> Result<Vec<Station>, LoadError> {
    parse_stations(&read(path.as_ref())?, pollutant)
}

pub fn load_zones(path: impl AsRef<Path>, pollutant: &str) -> Result<Vec<Zone>, LoadError> {
    parse_zones(&read(path.as_ref())?, pollutant)
}

// ============================================================================
// Tests
// ============================================================================
