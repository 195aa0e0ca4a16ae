//! Mapping of HTTP failures onto `ServiceError`.

use edutest_core::ServiceError;

/// Retry hint used when a 429 carries no usable `retry-after` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Classify a transport-level failure.
pub(crate) fn transport_error(err: reqwest::Error, timeout_secs: u64) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Timeout(timeout_secs)
    } else {
        ServiceError::Network(err.to_string())
    }
}

/// Pass a successful response through, or turn an error status into a
/// `ServiceError` carrying the response body.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }

    if status == 429 {
        let retry_after_ms = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
            * 1000;
        return Err(ServiceError::RateLimited { retry_after_ms });
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        401 | 403 => ServiceError::AuthenticationFailed(body),
        404 => ServiceError::ModelNotFound(body),
        _ => ServiceError::Api {
            status,
            message: body,
        },
    })
}

/// Parse a JSON response body.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ServiceError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ServiceError::MalformedResponse(format!("failed to parse response: {e}")))
}
