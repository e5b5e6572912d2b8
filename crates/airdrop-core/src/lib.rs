pub mod error;
pub mod store;
#[cfg(test)]
pub(crate) mod test_util;
pub mod tokens;

pub use error::StoreError;
pub use tokens::{TokenRecord, TokenService, DEFAULT_MAX_ACCOUNTS};
