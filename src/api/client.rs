//! HTTP client for board service requests.
//!
//! This module wraps the transport: it attaches the session's bearer token,
//! sends the request, and turns the response envelope into either the payload
//! or a [`ClassifiedFailure`]. Raw transport errors never escape it.

use super::failure::{ClassifiedFailure, GENERIC_MESSAGE};
use crate::session::SessionStore;
use log::*;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Uniform wrapper every service response uses.
///
#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Method, body and extra headers of one request.
///
#[derive(Clone, Debug)]
pub struct Intent {
    pub method: Method,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl Intent {
    pub fn new(method: Method) -> Self {
        Intent {
            method,
            params: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_owned(), value.to_string()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }
}

/// Makes requests to the board service and conforms the response data to the
/// requested type.
///
pub struct Client {
    pub(crate) base_url: String,
    http_client: reqwest::Client,
    session: SessionStore,
}

impl Client {
    /// Returns a new instance for the given base URL, reading the bearer token
    /// from the session on every request.
    ///
    pub fn new(base_url: &str, session: SessionStore) -> Self {
        Client {
            base_url: base_url.trim_end_matches('/').to_owned(),
            http_client: reqwest::Client::new(),
            session,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// GET with a cache-busting `_t` parameter appended.
    ///
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ClassifiedFailure> {
        let mut intent = Intent::new(Method::GET);
        for (key, value) in params {
            intent = intent.param(key, value);
        }
        let intent = intent.param("_t", chrono::Utc::now().timestamp_millis());
        self.request(path, intent).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ClassifiedFailure> {
        self.request(path, with_body(Intent::new(Method::POST), body)).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ClassifiedFailure> {
        self.request(path, with_body(Intent::new(Method::PUT), body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClassifiedFailure> {
        self.request(path, Intent::new(Method::DELETE)).await
    }

    /// Perform the request and return the envelope's `data` as `T`.
    ///
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        intent: Intent,
    ) -> Result<T, ClassifiedFailure> {
        let data = self.call(path, intent).await?;
        serde_json::from_value(data).map_err(|e| {
            warn!("Unexpected payload shape for {}: {}", path, e);
            ClassifiedFailure::unknown(format!("Unexpected response payload: {}", e))
        })
    }

    /// Make request and return the raw `data` of a successful envelope.
    ///
    async fn call(&self, path: &str, intent: Intent) -> Result<Value, ClassifiedFailure> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", intent.method, path);

        let mut request = self
            .http_client
            .request(intent.method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = self.session.token() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        for (name, value) in intent.headers.iter() {
            request = request.header(name.as_str(), value.as_str());
        }
        if !intent.params.is_empty() {
            request = request.query(&intent.params);
        }
        if let Some(body) = intent.body.as_ref() {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request {} {} failed: {}", intent.method, path, e);
                return Err(ClassifiedFailure::network());
            }
        };
        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read response body for {}: {}", path, e);
                return Err(ClassifiedFailure::network());
            }
        };

        let envelope = match serde_json::from_slice::<Envelope>(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    "Response for {} (status {}) is not an envelope: {}",
                    path, status, e
                );
                // An error status without a readable body still carries its
                // classification (e.g. a bare 401 from the security filter).
                return Err(if status.is_client_error() || status.is_server_error() {
                    ClassifiedFailure::from_status(status.as_u16(), GENERIC_MESSAGE)
                } else {
                    ClassifiedFailure::network()
                });
            }
        };

        if envelope.success {
            return Ok(envelope.data.unwrap_or(Value::Null));
        }

        let (message, code, details) = match envelope.error {
            Some(error) => (error.message, error.code, error.details),
            None => (None, None, None),
        };
        let message = message
            .or(envelope.message)
            .unwrap_or_else(|| GENERIC_MESSAGE.to_owned());
        warn!(
            "Request {} {} rejected with status {}: {}",
            intent.method, path, status, message
        );
        Err(ClassifiedFailure::from_status(status.as_u16(), message)
            .with_code(code)
            .with_details(details))
    }
}

fn with_body(intent: Intent, body: Option<Value>) -> Intent {
    match body {
        Some(body) => intent.body(body),
        None => intent,
    }
}
