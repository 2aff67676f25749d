pub mod attempts;
pub mod database;
pub mod entity;
pub mod error;
pub mod leads;

pub use attempts::AttemptStore;
pub use error::StoreError;
pub use leads::LeadStore;
