pub mod dataset;
pub mod equipment;
pub mod history;
pub mod session;
pub mod summary;

pub use dataset::DatasetId;
pub use equipment::EquipmentRecord;
pub use history::HistoryEntry;
pub use session::{Credentials, LoginResponse, Session, UploadReceipt};
pub use summary::{SummaryStatistics, TypeCount};
