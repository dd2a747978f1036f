//! Remote media download

use std::collections::BTreeMap;

use reqwest::StatusCode;
use tracing::debug;

use crate::application::ports::NativeError;

/// Download a remote source into memory, sending `headers` with the request.
pub async fn fetch_remote(
    client: &reqwest::Client,
    url: &str,
    headers: &BTreeMap<String, String>,
) -> Result<Vec<u8>, NativeError> {
    let mut request = client.get(url);
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request
        .send()
        .await
        .map_err(|e| NativeError::Unavailable(format!("Cannot reach {}: {}", url, e)))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(NativeError::PermissionDenied(format!(
            "Access to {} denied: HTTP {}",
            url, status
        )));
    }
    if !status.is_success() {
        return Err(NativeError::Unavailable(format!(
            "Cannot open {}: HTTP {}",
            url, status
        )));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| NativeError::Unavailable(format!("Download of {} failed: {}", url, e)))?;
    debug!(url, bytes = body.len(), "Fetched remote media");
    Ok(body.to_vec())
}
