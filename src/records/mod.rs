//! Student record service: validation, the two-phase image write, and store orchestration.

mod service;
pub mod types;

pub use service::{StudentApi, StudentService};
pub use types::StudentError;
