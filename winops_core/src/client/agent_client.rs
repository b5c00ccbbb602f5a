use std::error::Error as StdError;

use log::{debug, error};
use reqwest::{Method, Url};
use serde_json::{json, Value};

use super::envelope::Envelope;

/// Header carrying the shared secret on every request.
pub const API_KEY_HEADER: &str = "X-API-Key";
/// Port the agent listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 8000;

/// HTTP client bound to one agent.
///
/// Every call answers with an [`Envelope`]. Transport failures and non-2xx
/// statuses are folded into `success: false` envelopes, so nothing here ever
/// returns an error to the caller.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    base_url: Result<Url, String>,
    secret: String,
}

impl AgentClient {
    pub fn new(host: &str, port: u16, secret: impl Into<String>) -> Self {
        // bare IPv6 literals need brackets inside a URL authority
        let authority = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };
        let base_url = Url::parse(&format!("http://{authority}/"))
            .map_err(|e| format!("Invalid agent address '{authority}': {e}"));
        Self {
            http: reqwest::Client::new(),
            base_url,
            secret: secret.into(),
        }
    }

    /// `http://host:port/`, or the reason the address could not be parsed.
    pub fn base_url(&self) -> Result<&Url, &str> {
        self.base_url.as_ref().map_err(String::as_str)
    }

    fn url_for(&self, segments: &[&str]) -> Result<Url, String> {
        let mut url = self.base_url.clone()?;
        url.path_segments_mut()
            .map_err(|_| "Agent address cannot carry a path".to_string())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issue one request against the agent.
    ///
    /// `segments` are the path components (percent-encoded here, so names
    /// containing `/` or spaces are safe); an empty slice targets `/`.
    pub async fn request(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
        query: &[(&str, String)],
    ) -> Envelope {
        let url = match self.url_for(segments) {
            Ok(url) => url,
            Err(e) => return Envelope::failure(e),
        };
        debug!("{} {}", method, url);

        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .header(API_KEY_HEADER, self.secret.as_str());
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let cause = describe(&e);
                error!("{} {} failed: {}", method, url, cause);
                return Envelope::failure(cause);
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                let cause = describe(&e);
                error!("Reading response of {} {} failed: {}", method, url, cause);
                return Envelope::failure(cause);
            }
        };

        if !status.is_success() {
            // the agent answers errors with an envelope too; prefer its message
            let message = serde_json::from_str::<Envelope>(&text)
                .ok()
                .map(|env| env.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("HTTP {status}"));
            error!("{} {} returned {}: {}", method, url, status, message);
            return Envelope::failure(message);
        }

        match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("Malformed response from {}: {}", url, e);
                Envelope::failure(format!("Malformed response from agent: {e}"))
            }
        }
    }

    /// Call `GET /`; true when the agent answered with a successful envelope.
    pub async fn test_connection(&self) -> bool {
        self.request(Method::GET, &[], None, &[]).await.success
    }

    pub async fn get_system_info(&self) -> Envelope {
        self.request(Method::GET, &["system"], None, &[]).await
    }

    pub async fn get_services(&self) -> Envelope {
        self.request(Method::GET, &["services"], None, &[]).await
    }

    pub async fn get_service(&self, name: &str) -> Envelope {
        self.request(Method::GET, &["services", name], None, &[])
            .await
    }

    /// `action` is sent verbatim; the agent validates it.
    pub async fn service_action(&self, name: &str, action: &str) -> Envelope {
        self.request(
            Method::POST,
            &["services", name, "action"],
            Some(json!({ "action": action })),
            &[],
        )
        .await
    }

    pub async fn get_processes(&self) -> Envelope {
        self.request(Method::GET, &["processes"], None, &[]).await
    }

    pub async fn get_process(&self, pid: u32) -> Envelope {
        let pid = pid.to_string();
        self.request(Method::GET, &["processes", &pid], None, &[])
            .await
    }

    pub async fn terminate_process(&self, pid: u32) -> Envelope {
        let pid = pid.to_string();
        self.request(Method::DELETE, &["processes", &pid], None, &[])
            .await
    }

    pub async fn get_environment_variables(&self) -> Envelope {
        self.request(Method::GET, &["environment"], None, &[]).await
    }

    pub async fn set_environment_variable(
        &self,
        name: &str,
        value: &str,
        is_system: bool,
    ) -> Envelope {
        self.request(
            Method::POST,
            &["environment"],
            Some(json!({ "name": name, "value": value, "is_system": is_system })),
            &[],
        )
        .await
    }

    pub async fn delete_environment_variable(&self, name: &str, is_system: bool) -> Envelope {
        self.request(
            Method::DELETE,
            &["environment", name],
            None,
            &[("is_system", is_system.to_string())],
        )
        .await
    }
}

/// Flatten an error and its sources into one line; reqwest keeps the useful
/// part ("connection refused", "dns error") in the source chain.
fn describe(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
