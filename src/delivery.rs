//! Delivery: upload the encoded image, then optionally forward the server's
//! response to a second endpoint.
//!
//! Two mutually exclusive upload shapes, selected solely by whether the
//! request names a multipart field:
//! - multipart form data carrying the decoded image bytes as
//!   `screenshot.<ext>` under the given field name
//! - a JSON body `{ "data": <data URI>, "id": <correlation> }`
//!
//! Fire-and-forget throughout: no retries, no request timeout.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::json;

use crate::error::{Error, Result};
use crate::ScreenshotRequest;

/// Decode a `data:<mime>;base64,<payload>` URI back into its MIME type and
/// raw bytes.
pub fn data_uri_to_bytes(uri: &str) -> Result<(String, Vec<u8>)> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| Error::Other(format!("not a data URI: {:.32}", uri)))?;

    let mime = header
        .strip_prefix("data:")
        .and_then(|rest| rest.strip_suffix(";base64"))
        .ok_or_else(|| Error::Other(format!("malformed data URI header: {:.64}", header)))?;

    let bytes = BASE64
        .decode(payload)
        .map_err(|e| Error::Other(format!("data URI payload: {}", e)))?;

    Ok((mime.to_string(), bytes))
}

/// Run the full delivery chain for one request.
///
/// POSTs the image to `targetURL`, reads the response body as text, and, when
/// `resultURL` is set, POSTs `{ "data": <text>, "id": <correlation> }` there.
pub async fn deliver(client: &Client, request: &ScreenshotRequest, data_uri: &str) -> Result<()> {
    let primary = if !request.target_field.is_empty() {
        let (mime, bytes) = data_uri_to_bytes(data_uri)?;
        let part = Part::bytes(bytes)
            .file_name(format!("screenshot.{}", request.encoding.extension()))
            .mime_str(&mime)
            .map_err(|e| Error::UploadFailure(format!("multipart part: {}", e)))?;
        let form = Form::new().part(request.target_field.clone(), part);
        client.post(&request.target_url).multipart(form)
    } else {
        client.post(&request.target_url).json(&json!({
            "data": data_uri,
            "id": request.correlation,
        }))
    };

    let response = primary
        .send()
        .await
        .map_err(|e| Error::UploadFailure(e.to_string()))?;

    let text = response
        .text()
        .await
        .map_err(|e| Error::UploadFailure(format!("reading response body: {}", e)))?;

    if !request.result_url.is_empty() {
        client
            .post(&request.result_url)
            .json(&json!({
                "data": text,
                "id": request.correlation,
            }))
            .send()
            .await
            .map_err(|e| Error::ResultNotificationFailure(e.to_string()))?;
    }

    Ok(())
}
