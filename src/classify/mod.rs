/// Classification and labeling stages.
///
/// Submodules:
/// - `labels`  : resolves ordered label tables from the level definitions.
/// - `stations`: cuts station values into management bands.
/// - `zones`   : joins ambient categories and station counts onto zones.

pub mod labels;
pub mod stations;
pub mod zones;
