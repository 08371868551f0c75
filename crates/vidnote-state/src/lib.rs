//! Durable processing state: the job store contract, an in-memory reference
//! implementation, and the client-facing status facade.

pub mod error;
pub mod memory;
pub mod status;
pub mod store;

pub use error::{StateError, StateResult};
pub use memory::MemoryJobStore;
pub use status::{StatusBucket, StatusFacade, StatusReport};
pub use store::JobStore;
