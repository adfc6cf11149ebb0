use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client, StatusCode,
};
use serde_json::Value;
use shared::{
    error::{ApiError, ErrorDocument},
    protocol::{WriteDocument, JSON_API_MEDIA_TYPE},
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::{normalize_base_url, ClientSettings},
    error::{ClientError, ClientResult},
};

const OKAPI_TENANT: &str = "x-okapi-tenant";
const OKAPI_TOKEN: &str = "x-okapi-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// The REST boundary the client talks through.
///
/// `path` is relative to the backend root and may carry a query string.
/// Success yields the decoded body (`Value::Null` when empty); a non-2xx
/// status yields [`ClientError::Request`] with the response's error list.
#[async_trait]
pub trait ResourceTransport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&WriteDocument>,
    ) -> ClientResult<Value>;
}

pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(settings: &ClientSettings) -> ClientResult<Self> {
        let base_url = normalize_base_url(&settings.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_API_MEDIA_TYPE));
        if let Some(tenant) = &settings.okapi_tenant {
            headers.insert(HeaderName::from_static(OKAPI_TENANT), header_value(tenant)?);
        }
        if let Some(token) = &settings.okapi_token {
            headers.insert(HeaderName::from_static(OKAPI_TOKEN), header_value(token)?);
        }

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| ClientError::Transport(err.to_string()))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn header_value(raw: &str) -> ClientResult<HeaderValue> {
    HeaderValue::from_str(raw)
        .map_err(|_| ClientError::Transport(format!("invalid header value: {raw:?}")))
}

#[async_trait]
impl ResourceTransport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&WriteDocument>,
    ) -> ClientResult<Value> {
        let url = self.base_url.join(path)?;
        debug!(method = ?method, %url, "sending request");

        let mut request = self.http.request(method.as_reqwest(), url.clone());
        if let Some(body) = body {
            let bytes =
                serde_json::to_vec(body).map_err(|err| ClientError::Decode(err.to_string()))?;
            request = request
                .header(CONTENT_TYPE, JSON_API_MEDIA_TYPE)
                .body(bytes);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;

        if !status.is_success() {
            let errors = parse_errors(status, &bytes);
            warn!(
                method = ?method,
                %url,
                status = status.as_u16(),
                errors = errors.len(),
                "request rejected"
            );
            return Err(ClientError::Request {
                status: status.as_u16(),
                errors,
            });
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode(err.to_string()))
    }
}

/// Errors from a failure body; a body without any yields one error naming the status.
pub(crate) fn parse_errors(status: StatusCode, body: &[u8]) -> Vec<ApiError> {
    match serde_json::from_slice::<ErrorDocument>(body) {
        Ok(doc) if !doc.errors.is_empty() => doc.errors,
        _ => vec![ApiError::new(status.to_string())],
    }
}
