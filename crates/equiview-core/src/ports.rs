//! Port trait definitions
//!
//! These traits define the interfaces that adapters must implement.

pub mod backend;
pub mod host;

pub use backend::Backend;
pub use host::{Navigator, ReportSink, Route, SavedReport, TokenStore};
