use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use super::summary::{deserialize_ordered_counts, serialize_ordered_counts, TypeCount};
use super::DatasetId;

/// Headline record for one retained upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Dataset identifier; the only key used for selection
    pub id: DatasetId,

    /// Name of the uploaded CSV
    pub filename: String,

    /// When the dataset was uploaded
    pub upload_timestamp: DateTime<Utc>,

    pub total_count: u64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,

    #[serde(
        default,
        serialize_with = "serialize_ordered_counts",
        deserialize_with = "deserialize_ordered_counts"
    )]
    pub type_distribution: Vec<TypeCount>,
}

impl HistoryEntry {
    /// Upload time rendered in the viewer's local timezone
    pub fn uploaded_at_local(&self) -> String {
        self.upload_timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    pub fn has_finite_measurements(&self) -> bool {
        self.avg_flowrate.is_finite()
            && self.avg_pressure.is_finite()
            && self.avg_temperature.is_finite()
    }
}
