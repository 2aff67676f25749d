pub mod client;
pub mod config;
pub mod error;
pub mod processor;
pub mod services;

pub use client::{CustomerClient, Delivery, DeliveryError};
pub use config::WorkerAppConfig;
pub use error::{ProcessorError, Result};
pub use processor::Processor;
