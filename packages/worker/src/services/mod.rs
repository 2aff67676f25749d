pub mod mapping;
pub mod normalization;
pub mod validation;

pub use mapping::{Mapper, Mapping, MappingError};
pub use normalization::Normalizer;
pub use validation::{Rejection, Validator};
