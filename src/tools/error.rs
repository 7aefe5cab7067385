use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::error::Result;

/// Error envelope shared by API responses: a non-zero `errcode` marks a
/// failed call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Error)]
#[error("{api_name} Error, errcode={errcode}, errmsg={errmsg}")]
pub struct CommonError {
    #[serde(skip)]
    pub api_name: String,
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

impl CommonError {
    pub fn new(api_name: impl Into<String>, errcode: i64, errmsg: impl Into<String>) -> Self {
        Self {
            api_name: api_name.into(),
            errcode,
            errmsg: errmsg.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errcode == 0
    }
}

/// Implemented by response types that embed a [`CommonError`], usually
/// through `#[serde(flatten)]`.
pub trait ApiResult {
    fn common_error(&self) -> &CommonError;
}

impl ApiResult for CommonError {
    fn common_error(&self) -> &CommonError {
        self
    }
}

/// Decode a response that carries nothing but the error envelope.
pub fn decode_with_common_error(response: &[u8], api_name: &str) -> Result<()> {
    decode_with_error::<CommonError>(response, api_name).map(|_| ())
}

/// Decode `response` into `T`, failing with the embedded [`CommonError`]
/// when its `errcode` is non-zero.
pub fn decode_with_error<T>(response: &[u8], api_name: &str) -> Result<T>
where
    T: DeserializeOwned + ApiResult,
{
    let decoded: T = serde_json::from_slice(response)?;
    let common = decoded.common_error();
    if !common.is_ok() {
        return Err(CommonError::new(api_name, common.errcode, common.errmsg.as_str()).into());
    }
    Ok(decoded)
}
