/// Input loading for the classification pipeline.
///
/// Submodules:
/// - `records`: station and zone JSON records from the scoring step.

pub mod records;
