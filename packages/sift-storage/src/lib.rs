pub mod cache;
pub mod candidates;
pub mod db;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod proposals;
pub mod schema;
pub mod shadow;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
