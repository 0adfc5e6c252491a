pub mod error;
pub mod repository;
pub mod store;

pub use error::{RepositoryError, StoreError};
pub use repository::{ContextSealer, PersistOutcome, ResultRepository};
pub use store::RecordStore;
