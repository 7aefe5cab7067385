use reqwest::Url;

use crate::error::{Result, SdkError};

/// Append `params` to the query of `base_url`, percent-encoding as needed.
/// Existing query pairs are kept.
pub fn add_params_to_url<I, K, V>(base_url: &str, params: I) -> Result<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut url = Url::parse(base_url)
        .map_err(|e| SdkError::InvalidRequest(format!("url '{}': {}", base_url, e)))?;

    let mut params = params.into_iter().peekable();
    if params.peek().is_some() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url.into())
}
