mod error;

pub mod payload;
pub mod qdrant;

pub use error::{Error, Result};
