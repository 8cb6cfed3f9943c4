//! HTTP client for a hosted document store's REST surface.
//!
//! `GET {base}/collections/{name}/records` returns the whole collection;
//! `?updated_since=<RFC 3339>` asks for the delta. The body is either a JSON
//! array of records or `{"records": [...]}`.

use reqwest::StatusCode;
use serde::Deserialize;

use super::{RemoteError, RemoteSource, UpdatedSince};
use crate::models::{CollectionName, Record};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// Error codes the store uses when it cannot evaluate a filter
const UNSUPPORTED_FILTER_CODES: [&str; 2] = ["unsupported_filter", "missing_index"];

#[derive(Clone)]
pub struct HttpRemote {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemote {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemote")
            .field("base_url", &self.base_url)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| RemoteError::Transport(error.to_string()))?;
        Ok(Self {
            base_url,
            auth_token: None,
            client,
        })
    }

    /// Send `Authorization: Bearer <token>` with every query
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = normalize_text_option(Some(token.into()));
        self
    }

    fn records_url(&self, collection: &CollectionName, filter: Option<UpdatedSince>) -> String {
        let mut url = format!(
            "{}/collections/{}/records",
            self.base_url,
            urlencoding::encode(collection.as_str())
        );
        if let Some(UpdatedSince(since)) = filter {
            url.push_str("?updated_since=");
            url.push_str(&urlencoding::encode(&since.to_rfc3339()));
        }
        url
    }
}

impl RemoteSource for HttpRemote {
    async fn query(
        &self,
        collection: &CollectionName,
        filter: Option<UpdatedSince>,
    ) -> Result<Vec<Record>, RemoteError> {
        let mut request = self
            .client
            .get(self.records_url(collection, filter))
            .header("Accept", "application/json");
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|error| RemoteError::Transport(error.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| RemoteError::Transport(error.to_string()))?;

        if !status.is_success() {
            return Err(classify_error(status, &body, filter.is_some()));
        }

        parse_records(&body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordsResponse {
    Bare(Vec<Record>),
    Wrapped { records: Vec<Record> },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

fn parse_records(body: &str) -> Result<Vec<Record>, RemoteError> {
    match serde_json::from_str::<RecordsResponse>(body) {
        Ok(RecordsResponse::Bare(records) | RecordsResponse::Wrapped { records }) => Ok(records),
        Err(error) => Err(RemoteError::Transport(format!(
            "invalid records payload: {error}"
        ))),
    }
}

/// Map a non-success response onto the error taxonomy.
///
/// Only filtered queries can be "unsupported": 501, or 400/422 carrying one
/// of [`UNSUPPORTED_FILTER_CODES`]. Everything else is a transport failure.
fn classify_error(status: StatusCode, body: &str, filtered: bool) -> RemoteError {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|payload| payload.message.clone().or_else(|| payload.error.clone()))
        .map_or_else(|| compact_text(body), |message| compact_text(&message));
    let detail = if message.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{message} ({})", status.as_u16())
    };

    if !filtered {
        return RemoteError::Transport(detail);
    }

    let has_unsupported_code = parsed
        .and_then(|payload| payload.code.or(payload.error))
        .is_some_and(|code| UNSUPPORTED_FILTER_CODES.contains(&code.trim()));

    let unsupported = status == StatusCode::NOT_IMPLEMENTED
        || (matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
        ) && has_unsupported_code);

    if unsupported {
        RemoteError::QueryUnsupported(detail)
    } else {
        RemoteError::Transport(detail)
    }
}

fn normalize_base_url(raw: String) -> Result<String, RemoteError> {
    let base_url = normalize_text_option(Some(raw)).ok_or_else(|| {
        RemoteError::Transport("remote base URL must not be empty".to_string())
    })?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::Transport(
            "remote base URL must include http:// or https://".to_string(),
        ))
    }
}
