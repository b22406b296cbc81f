//! Media frame validation and data-URI normalization.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::RelayError;

const DATA_URI_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Validates a device media payload and returns it as a data URI.
///
/// A bare base64 payload is wrapped as `data:<mime>;base64,<payload>`. A
/// payload that is already a data URI must declare `;base64` and is relayed
/// unchanged once its body decodes.
///
/// # Errors
///
/// Returns [`RelayError::InvalidFrame`] if the payload is empty, is a data
/// URI that is not base64 encoded, or is not valid base64.
pub fn normalize_frame(raw: &str, mime_type: &str) -> Result<String, RelayError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RelayError::InvalidFrame("empty frame".to_string()));
    }

    if let Some(rest) = raw.strip_prefix(DATA_URI_SCHEME) {
        let Some((header, body)) = rest.split_once(',') else {
            return Err(RelayError::InvalidFrame(
                "data URI has no payload separator".to_string(),
            ));
        };
        if !header.ends_with(BASE64_MARKER) {
            return Err(RelayError::InvalidFrame(
                "data URI is not base64 encoded".to_string(),
            ));
        }
        validate_base64(body)?;
        return Ok(raw.to_string());
    }

    validate_base64(raw)?;
    Ok(format!("{DATA_URI_SCHEME}{mime_type}{BASE64_MARKER},{raw}"))
}

fn validate_base64(body: &str) -> Result<(), RelayError> {
    if body.is_empty() {
        return Err(RelayError::InvalidFrame("empty frame".to_string()));
    }
    STANDARD
        .decode(body)
        .map(|_| ())
        .map_err(|e| RelayError::InvalidFrame(e.to_string()))
}
