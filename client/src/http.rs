use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::QueryFilter;
use std::path::PathBuf;

use crate::config::ClientConfig;
use crate::session::{Session, SessionError};

const GENERIC_ERROR: &str = "Request failed";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Unauthorized { message: String, data: Value },
    #[error("{message} (HTTP {status})")]
    Http {
        status: u16,
        message: String,
        data: Value,
    },
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// HTTP status behind the error, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) | ApiError::Session(_) | ApiError::Io { .. } => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Body the server sent along with a failure status.
    pub fn data(&self) -> Option<&Value> {
        match self {
            ApiError::Unauthorized { data, .. } | ApiError::Http { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// A response body parsed according to its declared content type.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    fn field(&self, key: &str) -> Option<&str> {
        match self {
            ResponseBody::Json(value) => value.get(key).and_then(Value::as_str),
            ResponseBody::Text(_) => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
        }
    }

    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let value = match self {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) if text.trim().is_empty() => Value::Null,
            ResponseBody::Text(text) => Value::String(text),
        };
        Ok(serde_json::from_value(value)?)
    }
}

/// Renders a filter as `?k=v&...`, or an empty string when nothing is set.
pub fn query_string<F: QueryFilter + ?Sized>(filter: &F) -> String {
    let pairs = filter.query_pairs();
    if pairs.is_empty() {
        return String::new();
    }

    url::form_urlencoded::Serializer::new(String::from("?"))
        .extend_pairs(pairs.iter().map(|(key, value)| (*key, value.as_str())))
        .finish()
}

/// Authenticated JSON transport shared by every resource client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
    session: Session,
}

impl HttpClient {
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self, ApiError> {
        let inner = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner,
            base_url: config.api_base_url.as_str().trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::GET, path)).await?.decode()
    }

    pub async fn get_filtered<T, F>(&self, path: &str, filter: &F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: QueryFilter + ?Sized,
    {
        let path = format!("{}{}", path, query_string(filter));
        self.get(&path).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::POST, path).json(body))
            .await?
            .decode()
    }

    /// POST without a request body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::POST, path)).await?.decode()
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::PUT, path).json(body))
            .await?
            .decode()
    }

    /// DELETE, returning whatever the server sent back.
    pub async fn delete(&self, path: &str) -> Result<ResponseBody, ApiError> {
        self.send(self.request(Method::DELETE, path)).await
    }

    pub async fn upload<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T, ApiError> {
        self.send(self.request(Method::POST, path).multipart(form))
            .await?
            .decode()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        log::debug!("{} {}", method, url);

        let builder = self.inner.request(method, url);
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<ResponseBody, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));

        let bytes = response.bytes().await?;
        let parsed = parse_body(&bytes, is_json);

        if status.is_success() {
            return Ok(parsed?);
        }

        // Error bodies are best effort; a page that is not valid JSON is kept as text.
        let body = parsed
            .unwrap_or_else(|_| ResponseBody::Text(String::from_utf8_lossy(&bytes).into_owned()));

        // 401 invalidates the session before anything else sees the error.
        if status == StatusCode::UNAUTHORIZED {
            let reason = body.field("error").unwrap_or("Session expired").to_string();
            let message = body.field("error").unwrap_or("Unauthorized").to_string();
            self.session.invalidate(reason);
            return Err(ApiError::Unauthorized {
                message,
                data: body.into_value(),
            });
        }

        let message = body
            .field("message")
            .or_else(|| body.field("error"))
            .unwrap_or(GENERIC_ERROR)
            .to_string();
        log::debug!("Request failed with {}: {}", status, message);
        Err(ApiError::Http {
            status: status.as_u16(),
            message,
            data: body.into_value(),
        })
    }
}

fn parse_body(bytes: &[u8], is_json: bool) -> Result<ResponseBody, serde_json::Error> {
    if !is_json {
        return Ok(ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned()));
    }
    if bytes.is_empty() {
        return Ok(ResponseBody::Json(Value::Null));
    }
    serde_json::from_slice(bytes).map(ResponseBody::Json)
}
