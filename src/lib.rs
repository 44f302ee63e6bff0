pub mod config;
pub mod error;
pub mod search;

pub use error::{Result, SearchError};
