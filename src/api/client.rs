//! Purpose: Provide the blocking HTTP client for named-query endpoints.
//! Exports: `Client`.
//! Role: Thin transport wrapper; encoding and binding do the real work.
//! Invariants: Request bodies come from `QueryInput::encode` and are valid JSON.
//! Invariants: Success is an HTTP status in [200, 300); anything else is an error.
//! Invariants: One blocking round trip per query; no state survives the call.
#![allow(clippy::result_large_err)]

use super::QueryResponse;
use crate::core::encode::QueryInput;
use crate::core::error::{Error, ErrorKind};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

type ApiResult<T> = Result<T, Error>;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a server hosting named queries under a common base URL.
///
/// Cloning is cheap and clones share one connection agent; concurrent use
/// is safe because every query owns its input, response, and destinations.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: Url,
    agent: ureq::Agent,
}

impl Client {
    /// Build a client from a base URL such as `http://localhost:6969` or
    /// `https://db.example.com/helix`. The path is kept and queries append
    /// under it; query strings and fragments are dropped. Requests use a
    /// 10 second timeout unless [`with_timeout`](Self::with_timeout) overrides it.
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent = build_agent(DEFAULT_TIMEOUT);
        Ok(Self {
            inner: Arc::new(ClientInner { base_url, agent }),
        })
    }

    /// Replace the request timeout, rebuilding the underlying agent.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let agent = build_agent(timeout);
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.agent = agent;
        } else {
            self.inner = Arc::new(ClientInner {
                base_url: self.inner.base_url.clone(),
                agent,
            });
        }
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Run one named query: encode `input`, POST it to `<base>/<endpoint>`,
    /// and classify the outcome. The returned [`QueryResponse`] holds the
    /// raw body; binding it is a separate step so one response can be read
    /// several ways.
    pub fn query(&self, endpoint: &str, input: QueryInput) -> ApiResult<QueryResponse> {
        if endpoint.is_empty() {
            return Err(
                Error::new(ErrorKind::Config).with_message("endpoint name must not be empty")
            );
        }
        let body = input.encode().map_err(|err| err.with_endpoint(endpoint))?;
        let url = build_url(&self.inner.base_url, endpoint)?;

        tracing::debug!(endpoint, bytes = body.len(), "sending query");
        let response = self
            .inner
            .agent
            .post(url.as_str())
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
            .send_bytes(&body);

        match response {
            Ok(resp) => read_response(endpoint, resp),
            Err(ureq::Error::Status(code, resp)) => Err(status_error(endpoint, code, resp)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Transport)
                .with_message("request failed")
                .with_endpoint(endpoint)
                .with_source(err)),
        }
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Config)
            .with_message("invalid base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(
            Error::new(ErrorKind::Config).with_message("base url must use http or https scheme")
        );
    }
    // Endpoint names append under the base path, so it must end in a slash.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn build_url(base_url: &Url, endpoint: &str) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| Error::new(ErrorKind::Config).with_message("base url cannot be a base"))?;
        path.pop_if_empty();
        path.push(endpoint);
    }
    Ok(url)
}

// A 3xx the agent hands back as Ok still falls outside the success range.
fn read_response(endpoint: &str, response: ureq::Response) -> ApiResult<QueryResponse> {
    let status = response.status();
    if !(200..300).contains(&status) {
        return Err(status_error(endpoint, status, response));
    }
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|err| {
            Error::new(ErrorKind::Transport)
                .with_message("failed to read response body")
                .with_endpoint(endpoint)
                .with_source(err)
        })?;
    tracing::debug!(endpoint, status, bytes = bytes.len(), "query response received");
    Ok(QueryResponse::from_bytes(endpoint, bytes))
}

fn status_error(endpoint: &str, status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    Error::new(ErrorKind::Status)
        .with_message(format!("HTTP error {status}: {body}"))
        .with_endpoint(endpoint)
        .with_status(status)
}
