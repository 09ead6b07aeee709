use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Number of records of one equipment type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCount {
    pub label: String,
    pub count: u64,
}

/// Aggregate statistics for one dataset
///
/// Treated as an atomic snapshot: the workspace replaces it wholesale and
/// never patches individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub total_count: u64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,

    /// Type label to count, in the order the server sent them
    #[serde(
        serialize_with = "serialize_ordered_counts",
        deserialize_with = "deserialize_ordered_counts"
    )]
    pub type_distribution: Vec<TypeCount>,
}

impl SummaryStatistics {
    /// Summary of an empty workspace (what the backend returns with no uploads)
    pub fn empty() -> Self {
        Self {
            total_count: 0,
            avg_flowrate: 0.0,
            avg_pressure: 0.0,
            avg_temperature: 0.0,
            type_distribution: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// Check the invariants the backend promises for this payload
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("avg_flowrate", self.avg_flowrate),
            ("avg_pressure", self.avg_pressure),
            ("avg_temperature", self.avg_temperature),
        ] {
            if !value.is_finite() {
                return Err(format!("{name} is not a finite number"));
            }
        }

        let mut seen = HashSet::new();
        for entry in &self.type_distribution {
            if !seen.insert(entry.label.as_str()) {
                return Err(format!("duplicate type label '{}'", entry.label));
            }
        }

        let distributed: u64 = self.type_distribution.iter().map(|t| t.count).sum();
        if distributed != self.total_count {
            return Err(format!(
                "type distribution sums to {} but total_count is {}",
                distributed, self.total_count
            ));
        }

        Ok(())
    }
}

pub(crate) fn serialize_ordered_counts<S>(counts: &[TypeCount], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(counts.len()))?;
    for entry in counts {
        map.serialize_entry(&entry.label, &entry.count)?;
    }
    map.end()
}

/// Deserialize a JSON object into a vector, keeping key order
pub(crate) fn deserialize_ordered_counts<'de, D>(deserializer: D) -> Result<Vec<TypeCount>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedCounts;

    impl<'de> Visitor<'de> for OrderedCounts {
        type Value = Vec<TypeCount>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of equipment type to count")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut counts = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((label, count)) = access.next_entry::<String, u64>()? {
                counts.push(TypeCount { label, count });
            }
            Ok(counts)
        }
    }

    deserializer.deserialize_map(OrderedCounts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_keeps_server_order() {
        let json = r#"{
            "total_count": 6,
            "avg_flowrate": 120.0,
            "avg_pressure": 6.1,
            "avg_temperature": 98.4,
            "type_distribution": {"Valve": 1, "Pump": 3, "Compressor": 2}
        }"#;

        let summary: SummaryStatistics = serde_json::from_str(json).unwrap();
        let labels: Vec<&str> =
            summary.type_distribution.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["Valve", "Pump", "Compressor"]);
        assert!(summary.validate().is_ok());
    }

    #[test]
    fn test_empty_summary_is_valid() {
        let json = r#"{
            "total_count": 0,
            "avg_flowrate": 0.0,
            "avg_pressure": 0.0,
            "avg_temperature": 0.0,
            "type_distribution": {}
        }"#;
        let summary: SummaryStatistics = serde_json::from_str(json).unwrap();
        assert_eq!(summary, SummaryStatistics::empty());
        assert!(summary.validate().is_ok());
        assert!(summary.is_empty());
    }

    #[test]
    fn test_validate_rejects_mismatched_distribution() {
        let mut summary = SummaryStatistics::empty();
        summary.total_count = 3;
        summary.type_distribution = vec![TypeCount { label: "Pump".into(), count: 2 }];
        assert!(summary.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_labels() {
        let mut summary = SummaryStatistics::empty();
        summary.total_count = 2;
        summary.type_distribution = vec![
            TypeCount { label: "Pump".into(), count: 1 },
            TypeCount { label: "Pump".into(), count: 1 },
        ];
        assert!(summary.validate().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn test_serialize_as_object() {
        let mut summary = SummaryStatistics::empty();
        summary.total_count = 1;
        summary.type_distribution = vec![TypeCount { label: "Reactor".into(), count: 1 }];
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["type_distribution"]["Reactor"], 1);
    }
}
