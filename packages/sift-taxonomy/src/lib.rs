pub mod csv;
pub mod document;

mod error;

pub use error::{Error, Result};
