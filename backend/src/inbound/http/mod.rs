//! HTTP inbound adapter exposing the trust engine as REST endpoints.

pub mod community;
pub mod contributors;
pub mod error;
pub mod follow_ups;
pub mod health;
pub mod session;
pub mod state;
pub mod suggestions;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;
