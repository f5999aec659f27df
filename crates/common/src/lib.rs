//! Common utilities and types shared across satprep crates.

pub mod credentials;
pub mod date;
pub mod error;

pub use credentials::Credentials;
pub use date::FreezeDate;
pub use error::{Error, Result};
