//! Gradio Space Connection
//!
//! One connection per operation: `open` fetches `/config`, then the file is
//! uploaded and the endpoint is invoked through Gradio's `/call` REST API.
//!
//! ```text
//! GET  {base}/config                          -> api_prefix
//! POST {base}{prefix}/upload                  -> ["/tmp/gradio/.../image.png"]
//! POST {base}{prefix}/call/{endpoint}         -> { "event_id": "..." }
//! GET  {base}{prefix}/call/{endpoint}/{id}    -> event: complete / data: [...]
//! ```

use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{InferenceError, InferenceResult};
use super::types::{ApiInfo, ImageUpload};

// Request/Response types

#[derive(Debug, Deserialize)]
struct RemoteConfig {
    #[serde(default)]
    api_prefix: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Serialize)]
struct CallRequest {
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct CallResponse {
    event_id: String,
}

/// Gradio's file reference for an uploaded input
#[derive(Debug, Serialize)]
struct FileData<'a> {
    path: String,
    orig_name: &'a str,
    mime_type: &'a str,
    size: usize,
    meta: FileMeta,
}

#[derive(Debug, Serialize)]
struct FileMeta {
    #[serde(rename = "_type")]
    kind: &'static str,
}

/// Established session with the remote Space
pub struct Connection<'a> {
    http: &'a reqwest::Client,
    base_url: &'a str,
    api_prefix: String,
}

impl<'a> Connection<'a> {
    /// Connect by fetching the Space's config
    pub async fn open(http: &'a reqwest::Client, base_url: &'a str) -> InferenceResult<Connection<'a>> {
        let base_url = base_url.trim_end_matches('/');
        let url = format!("{}/config", base_url);

        tracing::debug!("Connecting to Gradio Space: {}", base_url);

        let response = http
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(base_url, e))?;

        let response = check_status(base_url, response).await?;
        let config: RemoteConfig = read_json(base_url, response).await?;

        let api_prefix = config
            .api_prefix
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();

        tracing::debug!(
            "Connected to {} (gradio {}, api prefix '{}')",
            base_url,
            config.version.as_deref().unwrap_or("unknown"),
            api_prefix
        );

        Ok(Self { http, base_url, api_prefix })
    }

    pub fn base_url(&self) -> &str {
        self.base_url
    }

    fn api_url(&self, route: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, route)
    }

    /// Upload the image and run `endpoint` with it as the sole input
    pub async fn predict_image(&self, endpoint: &str, image: &ImageUpload) -> InferenceResult<Value> {
        let path = self.upload(image).await?;

        let file = FileData {
            path,
            orig_name: image.file_name(),
            mime_type: image.content_type(),
            size: image.len(),
            meta: FileMeta { kind: "gradio.FileData" },
        };
        let input = serde_json::to_value(&file)
            .map_err(|e| InferenceError::InvalidImage(e.to_string()))?;

        self.predict(endpoint, vec![input]).await
    }

    /// Invoke a named endpoint and wait for its outputs
    pub async fn predict(&self, endpoint: &str, data: Vec<Value>) -> InferenceResult<Value> {
        let name = endpoint.trim_start_matches('/');
        let url = self.api_url(&format!("/call/{}", name));

        tracing::debug!("Calling {} endpoint...", endpoint);

        let response = self
            .http
            .post(&url)
            .json(&CallRequest { data })
            .send()
            .await
            .map_err(|e| transport_error(self.base_url, e))?;

        let response = check_status(self.base_url, response).await?;
        let call: CallResponse = read_json(self.base_url, response).await?;

        let response = self
            .http
            .get(format!("{}/{}", url, call.event_id))
            .send()
            .await
            .map_err(|e| transport_error(self.base_url, e))?;

        let response = check_status(self.base_url, response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(self.base_url, e))?;

        parse_event_stream(&body)
    }

    /// Fetch the endpoint catalogue
    pub async fn view_api(&self) -> InferenceResult<ApiInfo> {
        let response = self
            .http
            .get(self.api_url("/info"))
            .send()
            .await
            .map_err(|e| transport_error(self.base_url, e))?;

        let response = check_status(self.base_url, response).await?;
        read_json(self.base_url, response).await.map(ApiInfo)
    }

    async fn upload(&self, image: &ImageUpload) -> InferenceResult<String> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name().to_string())
            .mime_str(image.content_type())
            .map_err(|e| InferenceError::InvalidImage(e.to_string()))?;

        tracing::debug!(
            "Uploading {} ({} bytes, {})",
            image.file_name(),
            image.len(),
            image.content_type()
        );

        let response = self
            .http
            .post(self.api_url("/upload"))
            .multipart(Form::new().part("files", part))
            .send()
            .await
            .map_err(|e| transport_error(self.base_url, e))?;

        let response = check_status(self.base_url, response).await?;
        let paths: Vec<String> = read_json(self.base_url, response).await?;

        paths
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::MalformedResponse("upload returned no file path".to_string()))
    }
}

fn transport_error(base_url: &str, err: reqwest::Error) -> InferenceError {
    tracing::error!("Request to {} failed: {}", base_url, err);
    InferenceError::ConnectionFailure {
        base_url: base_url.to_string(),
        reason: err.to_string(),
    }
}

async fn check_status(base_url: &str, response: Response) -> InferenceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_FOUND => {
            tracing::error!("{} rejected {} with {}", base_url, response.url().path(), status);
            Err(InferenceError::ServiceMisconfigured {
                base_url: base_url.to_string(),
                status: status.as_u16(),
            })
        }
        _ => {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Inference service error ({}): {}", status, error_text);
            Err(InferenceError::RemoteFailure(format!("{} returned {}: {}", base_url, status, error_text)))
        }
    }
}

async fn read_json<T: DeserializeOwned>(base_url: &str, response: Response) -> InferenceResult<T> {
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(base_url, e))?;

    serde_json::from_str(&body).map_err(|e| InferenceError::MalformedResponse(e.to_string()))
}

/// Extract the outputs from a `/call` event stream
pub fn parse_event_stream(body: &str) -> InferenceResult<Value> {
    let mut event: Option<&str> = None;

    for line in body.lines() {
        if line.is_empty() {
            event = None;
        } else if let Some(name) = line.strip_prefix("event:") {
            event = Some(name.trim());
        } else if let Some(data) = line.strip_prefix("data:") {
            match event {
                Some("complete") => {
                    return serde_json::from_str(data.trim())
                        .map_err(|e| InferenceError::MalformedResponse(e.to_string()));
                }
                Some("error") => return Err(InferenceError::RemoteFailure(error_message(data.trim()))),
                // heartbeat / generating
                _ => {}
            }
        }
    }

    Err(InferenceError::MalformedResponse(
        "event stream ended without a complete event".to_string(),
    ))
}

fn error_message(data: &str) -> String {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::String(message)) => message,
        Ok(Value::Null) => "the remote application raised an error".to_string(),
        Ok(other) => other.to_string(),
        Err(_) if data.is_empty() => "the remote application raised an error".to_string(),
        Err(_) => data.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_complete_event() {
        let body = "event: heartbeat\ndata: null\n\nevent: complete\ndata: [{\"Parabasal\": 0.9}]\n\n";
        assert_eq!(parse_event_stream(body).unwrap(), json!([{ "Parabasal": 0.9 }]));
    }

    #[test]
    fn test_error_event() {
        let err = parse_event_stream("event: error\ndata: \"CUDA out of memory\"\n\n").unwrap_err();
        assert!(matches!(err, InferenceError::RemoteFailure(ref m) if m == "CUDA out of memory"));

        let err = parse_event_stream("event: error\ndata: null\n\n").unwrap_err();
        assert!(matches!(err, InferenceError::RemoteFailure(ref m) if m.contains("raised an error")));
    }

    #[test]
    fn test_data_without_event_is_ignored() {
        let err = parse_event_stream("data: [1, 2]\n\n").unwrap_err();
        assert!(matches!(err, InferenceError::MalformedResponse(_)));
    }

    #[test]
    fn test_truncated_stream() {
        let err = parse_event_stream("event: generating\ndata: []\n\n").unwrap_err();
        assert!(matches!(err, InferenceError::MalformedResponse(_)));
    }

    #[test]
    fn test_file_data_shape() {
        let file = FileData {
            path: "/tmp/gradio/x/image.png".to_string(),
            orig_name: "image.png",
            mime_type: "image/png",
            size: 3,
            meta: FileMeta { kind: "gradio.FileData" },
        };
        let value = serde_json::to_value(&file).unwrap();
        assert_eq!(value["meta"]["_type"], "gradio.FileData");
        assert_eq!(value["path"], "/tmp/gradio/x/image.png");
    }
}
