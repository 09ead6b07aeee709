//! Read-only cache of retained uploads

use crate::models::{DatasetId, HistoryEntry};
use crate::projection::Parameter;

/// Retention the backend enforces; shown to the user, never applied here
pub const RETAINED_UPLOADS: usize = 5;

/// Retained uploads, newest first, exactly as the server sent them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryRegistry {
    entries: Vec<HistoryEntry>,
}

impl HistoryRegistry {
    pub fn new(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, id: &DatasetId) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn contains(&self, id: &DatasetId) -> bool {
        self.find(id).is_some()
    }

    /// Most recent upload
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    /// Rows ready for display, with the active one marked
    pub fn rows(&self, active: Option<&DatasetId>) -> Vec<HistoryRow<'_>> {
        self.entries
            .iter()
            .map(|entry| HistoryRow {
                entry,
                selected: active == Some(&entry.id),
            })
            .collect()
    }

    pub fn empty_text() -> &'static str {
        "No upload history available."
    }

    pub fn retention_note() -> String {
        format!(
            "Note: Only the last {} uploads are retained. Click on any row to load that dataset.",
            RETAINED_UPLOADS
        )
    }
}

/// One rendered history row
#[derive(Debug, Clone, Copy)]
pub struct HistoryRow<'a> {
    pub entry: &'a HistoryEntry,
    pub selected: bool,
}

impl HistoryRow<'_> {
    pub fn filename_text(&self) -> String {
        if self.selected {
            format!("{} (Current)", self.entry.filename)
        } else {
            self.entry.filename.clone()
        }
    }

    pub fn mean_text(&self, parameter: Parameter) -> String {
        let value = match parameter {
            Parameter::Flowrate => self.entry.avg_flowrate,
            Parameter::Pressure => self.entry.avg_pressure,
            Parameter::Temperature => self.entry.avg_temperature,
        };
        format!("{:.2}{}", value, parameter.unit_suffix())
    }
}
