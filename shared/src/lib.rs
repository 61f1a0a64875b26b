pub mod error;
pub mod models;
pub mod validation;
#[cfg(feature = "backend")]
mod rocket_impl;

pub use error::{Error, ErrorCode};
pub use models::*;
pub use validation::*;
