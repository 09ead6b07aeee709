//! Equipment store and its sortable table projection

use std::cmp::Ordering;
use std::sync::Arc;

use crate::models::EquipmentRecord;

/// Ordered equipment rows for the active dataset
///
/// Rows are shared immutably and replaced wholesale when the active dataset
/// changes; sorting never touches this order.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentStore {
    records: Arc<[EquipmentRecord]>,
}

impl EquipmentStore {
    pub fn new(records: Vec<EquipmentRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }

    /// Rows in server-delivered order
    pub fn records(&self) -> &[EquipmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for EquipmentStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Column a table can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Kind,
    Flowrate,
    Pressure,
    Temperature,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Name,
        SortKey::Kind,
        SortKey::Flowrate,
        SortKey::Pressure,
        SortKey::Temperature,
    ];

    /// Column header text
    pub fn title(&self) -> &'static str {
        match self {
            SortKey::Name => "Equipment Name",
            SortKey::Kind => "Type",
            SortKey::Flowrate => "Flowrate (L/min)",
            SortKey::Pressure => "Pressure (bar)",
            SortKey::Temperature => "Temperature (°C)",
        }
    }

    /// Natural ordering of two records by this column
    ///
    /// Text columns compare lexically, measurements by `f64::total_cmp`.
    pub fn compare(&self, a: &EquipmentRecord, b: &EquipmentRecord) -> Ordering {
        match self {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Kind => a.kind.cmp(&b.kind),
            SortKey::Flowrate => a.flowrate.total_cmp(&b.flowrate),
            SortKey::Pressure => a.pressure.total_cmp(&b.pressure),
            SortKey::Temperature => a.temperature.total_cmp(&b.temperature),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Marker shown next to a column header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortIndicator {
    Unsorted,
    Ascending,
    Descending,
}

impl SortIndicator {
    pub fn symbol(&self) -> &'static str {
        match self {
            SortIndicator::Unsorted => "↕",
            SortIndicator::Ascending => "↑",
            SortIndicator::Descending => "↓",
        }
    }
}

/// Local sort state of the equipment table
///
/// Starts unsorted, which shows rows in server order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EquipmentTable {
    sort: Option<(SortKey, SortDirection)>,
}

impl EquipmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(&self) -> Option<(SortKey, SortDirection)> {
        self.sort
    }

    /// Flip direction on the active column, or sort a new column ascending
    pub fn toggle_sort(&mut self, key: SortKey) {
        self.sort = match self.sort {
            Some((active, direction)) if active == key => Some((key, direction.flipped())),
            _ => Some((key, SortDirection::Ascending)),
        };
    }

    /// Return to server-delivered order
    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    pub fn indicator(&self, key: SortKey) -> SortIndicator {
        match self.sort {
            Some((active, SortDirection::Ascending)) if active == key => SortIndicator::Ascending,
            Some((active, SortDirection::Descending)) if active == key => {
                SortIndicator::Descending
            }
            _ => SortIndicator::Unsorted,
        }
    }

    /// Derived view of the rows in the current sort order
    pub fn rows<'a>(&self, store: &'a EquipmentStore) -> Vec<&'a EquipmentRecord> {
        let mut rows: Vec<&EquipmentRecord> = store.records().iter().collect();
        if let Some((key, direction)) = self.sort {
            rows.sort_unstable_by(|a, b| match direction {
                SortDirection::Ascending => key.compare(a, b),
                SortDirection::Descending => key.compare(b, a),
            });
        }
        rows
    }

    pub fn heading(store: &EquipmentStore) -> String {
        format!("Equipment List ({} items)", store.len())
    }
}
