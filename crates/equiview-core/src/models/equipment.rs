use serde::{Deserialize, Serialize};

/// One row of an uploaded equipment CSV, as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    /// Identifier, unique within a dataset
    pub id: u64,

    /// Equipment name (e.g. "Pump-1")
    #[serde(rename = "equipment_name")]
    pub name: String,

    /// Equipment type (Reactor, Pump, Heat Exchanger, ...)
    #[serde(rename = "type")]
    pub kind: String,

    /// Flow rate in L/min
    pub flowrate: f64,

    /// Pressure in bar
    pub pressure: f64,

    /// Temperature in °C
    pub temperature: f64,
}

impl EquipmentRecord {
    /// Check that all measurements are finite numbers
    pub fn has_finite_measurements(&self) -> bool {
        self.flowrate.is_finite() && self.pressure.is_finite() && self.temperature.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_row() {
        let json = r#"{
            "id": 7,
            "equipment_name": "Pump-1",
            "type": "Pump",
            "flowrate": 120.5,
            "pressure": 5.2,
            "temperature": 110.0
        }"#;

        let record: EquipmentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.name, "Pump-1");
        assert_eq!(record.kind, "Pump");
        assert!(record.has_finite_measurements());
    }

    #[test]
    fn test_missing_measurement_rejected() {
        let json = r#"{"id": 1, "equipment_name": "Valve-2", "type": "Valve", "flowrate": 60.0}"#;
        assert!(serde_json::from_str::<EquipmentRecord>(json).is_err());
    }
}
