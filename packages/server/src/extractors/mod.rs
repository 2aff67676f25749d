pub mod correlation;
pub mod secret;
