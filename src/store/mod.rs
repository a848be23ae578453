//! Document store integration for student records.

pub mod couchdb;
pub mod memory;
pub mod types;

pub use couchdb::CouchDbStore;
pub use memory::MemoryStore;
pub use types::{StoreError, StudentStore, generate_student_id, parse_student_id};
