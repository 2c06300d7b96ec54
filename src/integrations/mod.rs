//! External service integrations.

pub mod rest_client {
    pub use crate::rest_client::*;
}
