//! REST API client for the slit-mask store.
//!
//! Wraps mask lookup, catalog list retrieval, object edits, mask
//! generation and finalization, and machine-code retrieval using
//! [`reqwest`]. Every request carries the caller's `user-id` header.
//! No request timeout is set.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use slitmask_core::diff::Patch;
use slitmask_core::error::CoreError;
use slitmask_core::mask::MaskDocument;
use slitmask_core::payload::GenerationRequest;

use crate::artifact::{filename_from_content_disposition, is_json, pointer_from_json, Artifact};
use crate::messages::{InstrumentConfig, MaskLookup, MaskSummary, ObjectListEntry};

/// Header identifying the acting user on every request.
pub const USER_ID_HEADER: &str = "user-id";

/// Message text of an HTML exception page.
const EXCEPTION_VALUE_PATTERN: &str = r#"(?i)<pre class="exception_value">([^<]+)"#;

static EXCEPTION_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EXCEPTION_VALUE_PATTERN).expect("valid regex"));

/// HTTP client for one store endpoint, acting as one user.
#[derive(Debug, Clone)]
pub struct MaskApi {
    client: reqwest::Client,
    api_url: String,
    user_id: String,
}

/// Errors from the store REST layer.
#[derive(Debug, thiserror::Error)]
pub enum MaskApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store returned a non-2xx status code.
    #[error("Store API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The store reported failure with a human-readable message.
    #[error("{0}")]
    Message(String),

    /// A JSON artifact response named no file to download.
    #[error("Response succeeded but no file path was returned")]
    MissingArtifactPath,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The response body did not have the expected shape.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl MaskApiError {
    /// HTTP status for [`ApiError`](Self::ApiError), `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl MaskApi {
    /// Create a client for the store at `api_url` (e.g.
    /// `http://host:8000/api`) acting as `user_id`.
    pub fn new(api_url: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, user_id)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        api_url: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            user_id: user_id.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Fetch a mask with its slit features and object lists.
    ///
    /// Sends `GET /masks/{mask}/?project_name=…`. A 404 means the mask
    /// has not been generated yet and yields [`MaskLookup::NotFound`].
    pub async fn fetch_mask(
        &self,
        mask_name: &str,
        project_name: &str,
    ) -> Result<MaskLookup, MaskApiError> {
        let response = self
            .client
            .get(self.named_url("masks", mask_name)?)
            .header(USER_ID_HEADER, &self.user_id)
            .query(&[("project_name", project_name)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(mask = %mask_name, "Mask not found on store");
            return Ok(MaskLookup::NotFound);
        }

        let mut doc: MaskDocument = Self::parse_response(response).await?;
        doc.flatten_aux();
        Ok(MaskLookup::Found(Box::new(doc)))
    }

    /// Fetch a named catalog list.
    ///
    /// Sends `GET /objects/viewlist/?list_name=…`. The store answers with
    /// a one-element array; a bare object is accepted too.
    pub async fn fetch_object_list(
        &self,
        list_name: &str,
    ) -> Result<ObjectListEntry, MaskApiError> {
        let response = self
            .client
            .get(self.url("/objects/viewlist/"))
            .header(USER_ID_HEADER, &self.user_id)
            .query(&[("list_name", list_name)])
            .send()
            .await?;

        let payload: serde_json::Value = Self::parse_response(response).await?;
        let entry = match payload {
            serde_json::Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            other => other,
        };
        if !entry.get("objects").is_some_and(serde_json::Value::is_array) {
            return Err(CoreError::Validation(format!(
                "no objects array in list '{list_name}'"
            ))
            .into());
        }

        let mut entry: ObjectListEntry = serde_json::from_value(entry)
            .map_err(|e| CoreError::Validation(format!("malformed object list: {e}")))?;
        for record in &mut entry.objects {
            record.flatten_aux();
        }
        Ok(entry)
    }

    /// Names of every mask in a project.
    ///
    /// Sends `GET /masks/get_project_masks?project_name=…`.
    pub async fn list_project_masks(
        &self,
        project_name: &str,
    ) -> Result<Vec<String>, MaskApiError> {
        let response = self
            .client
            .get(self.url("/masks/get_project_masks"))
            .header(USER_ID_HEADER, &self.user_id)
            .query(&[("project_name", project_name)])
            .send()
            .await?;

        let masks: Vec<MaskSummary> = Self::parse_response(response).await?;
        Ok(masks.into_iter().map(|m| m.name).collect())
    }

    /// Fetch the filter and disperser choices of an instrument.
    ///
    /// Sends `GET /instruments/{name}/`.
    pub async fn fetch_instrument_config(
        &self,
        instrument: &str,
    ) -> Result<InstrumentConfig, MaskApiError> {
        let response = self
            .client
            .get(self.named_url("instruments", instrument)?)
            .header(USER_ID_HEADER, &self.user_id)
            .send()
            .await?;

        let raw: serde_json::Value = Self::parse_response(response).await?;
        Ok(InstrumentConfig::from_json(&raw))
    }

    /// Apply one object update.
    ///
    /// Sends `PATCH /objects/edit/` with the flat patch body.
    pub async fn patch_object(&self, patch: &Patch) -> Result<(), MaskApiError> {
        let response = self
            .client
            .patch(self.url("/objects/edit/"))
            .header(USER_ID_HEADER, &self.user_id)
            .json(patch)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Generate a mask and download the produced mask file.
    ///
    /// Sends `POST /masks/generate/`. The response is either the file or a
    /// JSON pointer to it.
    pub async fn generate_mask(
        &self,
        request: &GenerationRequest,
    ) -> Result<Artifact, MaskApiError> {
        let response = self
            .client
            .post(self.url("/masks/generate/"))
            .header(USER_ID_HEADER, &self.user_id)
            .json(request)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let default_name = request.artifact_name();
        self.resolve_artifact(response, default_name).await
    }

    /// Mark a mask as finalized.
    ///
    /// Sends `POST /masks/complete/`. Failures are reported with the
    /// store's own message when one can be extracted.
    pub async fn complete_mask(
        &self,
        project_name: &str,
        mask_name: &str,
    ) -> Result<(), MaskApiError> {
        let body = serde_json::json!({
            "project_name": project_name,
            "mask_name": mask_name,
        });

        let response = self
            .client
            .post(self.url("/masks/complete/"))
            .header(USER_ID_HEADER, &self.user_id)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let content_type = header_str(&response, CONTENT_TYPE.as_str());
        let text = response.text().await.unwrap_or_default();
        Err(MaskApiError::Message(failure_message(
            status.as_u16(),
            content_type.as_deref(),
            &text,
        )))
    }

    /// Derive machine code for a mask and download it.
    ///
    /// Sends `POST /machine/generate/` (multipart form), then
    /// `GET /machine/get-machine-code/`. The file name comes from the
    /// second response's `Content-Disposition`, even when that response is
    /// a pointer.
    pub async fn generate_machine_code(
        &self,
        project_name: &str,
        mask_name: &str,
    ) -> Result<Artifact, MaskApiError> {
        let form = reqwest::multipart::Form::new()
            .text("project_name", project_name.to_string())
            .text("mask_name", mask_name.to_string());

        let response = self
            .client
            .post(self.url("/machine/generate/"))
            .header(USER_ID_HEADER, &self.user_id)
            .multipart(form)
            .send()
            .await?;
        Self::check_status(response).await?;

        let response = self
            .client
            .get(self.url("/machine/get-machine-code/"))
            .header(USER_ID_HEADER, &self.user_id)
            .query(&[("project_name", project_name), ("mask_name", mask_name)])
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;

        let stem = if mask_name.is_empty() {
            "mask"
        } else {
            mask_name
        };
        let default_name = format!("{stem}_machine_code.txt");
        let header_name = header_str(&response, CONTENT_DISPOSITION.as_str())
            .and_then(|cd| filename_from_content_disposition(&cd));

        let mut artifact = self.resolve_artifact(response, default_name.clone()).await?;
        artifact.filename = header_name.unwrap_or(default_name);
        Ok(artifact)
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// `{api_url}/{collection}/{name}/` with `name` percent-encoded as a
    /// single path segment.
    fn named_url(&self, collection: &str, name: &str) -> Result<reqwest::Url, MaskApiError> {
        let mut url = reqwest::Url::parse(&self.api_url)
            .map_err(|e| MaskApiError::InvalidUrl(format!("{}: {e}", self.api_url)))?;
        url.path_segments_mut()
            .map_err(|()| MaskApiError::InvalidUrl(self.api_url.clone()))?
            .pop_if_empty()
            .push(collection)
            .push(name)
            .push("");
        Ok(url)
    }

    /// Turn a successful response into an artifact, following a JSON
    /// pointer with a second request if needed.
    async fn resolve_artifact(
        &self,
        response: reqwest::Response,
        default_name: String,
    ) -> Result<Artifact, MaskApiError> {
        let content_type = header_str(&response, CONTENT_TYPE.as_str());
        if !is_json(content_type.as_deref()) {
            return Self::read_artifact(response, default_name).await;
        }

        let pointer_doc: serde_json::Value = response.json().await?;
        let pointer =
            pointer_from_json(&pointer_doc).ok_or(MaskApiError::MissingArtifactPath)?;
        let file_url = self.resolve_pointer(pointer)?;
        tracing::debug!(url = %file_url, "Following artifact pointer");

        let response = self
            .client
            .get(file_url)
            .header(USER_ID_HEADER, &self.user_id)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        Self::read_artifact(response, default_name).await
    }

    /// Absolute URL of a pointer; relative pointers resolve against the
    /// API base URL.
    fn resolve_pointer(&self, pointer: &str) -> Result<reqwest::Url, MaskApiError> {
        let base = reqwest::Url::parse(&format!("{}/", self.api_url))
            .map_err(|e| MaskApiError::InvalidUrl(format!("{}: {e}", self.api_url)))?;
        base.join(pointer)
            .map_err(|e| MaskApiError::InvalidUrl(format!("{pointer}: {e}")))
    }

    async fn read_artifact(
        response: reqwest::Response,
        default_name: String,
    ) -> Result<Artifact, MaskApiError> {
        let content_type = header_str(&response, CONTENT_TYPE.as_str());
        let filename = header_str(&response, CONTENT_DISPOSITION.as_str())
            .and_then(|cd| filename_from_content_disposition(&cd))
            .unwrap_or(default_name);
        let bytes = response.bytes().await?.to_vec();
        Ok(Artifact {
            filename,
            content_type,
            bytes,
        })
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`MaskApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, MaskApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(MaskApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, MaskApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), MaskApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

fn header_str(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Best human-readable message from a failed store response: the JSON
/// `detail` or `error` field, the text of an HTML exception page, or a
/// generic status line.
pub fn failure_message(status: u16, content_type: Option<&str>, body: &str) -> String {
    let fallback = format!("Mask completion failed: {status}");
    if is_json(content_type) {
        let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
            return fallback;
        };
        return ["detail", "error"]
            .iter()
            .find_map(|key| match json.get(key) {
                Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(serde_json::Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            })
            .unwrap_or(fallback);
    }
    EXCEPTION_VALUE_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or(fallback)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
