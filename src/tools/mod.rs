//! Small helpers for API clients built on this crate.

pub mod error;
pub mod url;

pub use error::{decode_with_common_error, decode_with_error, ApiResult, CommonError};
pub use url::add_params_to_url;
