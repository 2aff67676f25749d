pub mod attributes;
pub mod backoff;
pub mod lead_status;
pub mod process_job;

pub use lead_status::{LeadStatus, TransitionError};
pub use process_job::{PROCESS_LEAD, ProcessLeadJob};
