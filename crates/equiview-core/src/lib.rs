//! Equiview Core - Domain models, workspace state machine, and port definitions
//!
//! This crate contains the client-side controller for the equipment dataset
//! workspace: which dataset is active, the derived table and chart views, the
//! CSV upload lifecycle, and the traits that transport adapters implement.

pub mod auth;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod notice;
pub mod ports;
pub mod projection;
pub mod session;
pub mod table;
pub mod upload;
pub mod workspace;

pub use auth::Authenticator;
pub use error::{ErrorKind, Result, WorkspaceError};
pub use session::SessionContext;
pub use upload::UploadOrchestrator;
pub use workspace::{LoadOutcome, WorkspaceCoordinator, WorkspaceState};
