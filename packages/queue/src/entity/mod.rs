pub mod background_job;
