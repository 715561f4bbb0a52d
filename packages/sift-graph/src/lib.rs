pub mod breaker;
pub mod guard;
pub mod queries;
pub mod store;

mod error;

pub use error::{Error, Result};
