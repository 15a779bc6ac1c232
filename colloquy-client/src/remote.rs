use async_trait::async_trait;
use http::Method;

use crate::{api::Error, Response, Transport};

pub const DEFAULT_HOST: &str = "http://localhost:8000/api";

const SESSION_COOKIE: &str = "sessionid";
const CSRF_COOKIE: &str = "csrftoken";
const CSRF_HEADER: &str = "X-CSRFToken";

/// Where the backend lives and which session to present to it
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ClientConfig {
    /// Base url, including the api prefix
    pub host: String,
    pub session_id: Option<String>,
    pub csrf_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> ClientConfig {
        ClientConfig::new(String::from(DEFAULT_HOST))
    }
}

impl ClientConfig {
    pub fn new(host: String) -> ClientConfig {
        ClientConfig {
            host,
            session_id: None,
            csrf_token: None,
        }
    }

    pub fn with_session(mut self, session_id: String, csrf_token: String) -> ClientConfig {
        self.session_id = Some(session_id);
        self.csrf_token = Some(csrf_token);
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.host.trim_end_matches('/'), path)
    }

    /// Value of the `Cookie` header, if there is anything to send
    pub fn cookie_header(&self) -> Option<String> {
        let cookies = [
            (SESSION_COOKIE, &self.session_id),
            (CSRF_COOKIE, &self.csrf_token),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| format!("{name}={v}")))
        .collect::<Vec<_>>();
        (!cookies.is_empty()).then(|| cookies.join("; "))
    }

    /// Headers to attach to a request made with `method`
    pub fn headers_for(&self, method: &Method) -> Vec<(&'static str, String)> {
        let mut res = Vec::new();
        if let Some(cookie) = self.cookie_header() {
            res.push(("Cookie", cookie));
        }
        if *method != Method::GET && *method != Method::HEAD {
            if let Some(token) = &self.csrf_token {
                res.push((CSRF_HEADER, token.clone()));
            }
        }
        res
    }
}

/// Transport talking to the real backend over HTTP, authenticated by session cookie
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> HttpTransport {
        HttpTransport {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait(?Send)]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, Error> {
        let mut req = self
            .client
            .request(method.clone(), self.config.url(path));
        for (name, value) in self.config.headers_for(&method) {
            req = req.header(name, value);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.map_err(|e| {
            tracing::error!(%method, path, ?e, "failed to reach server");
            Error::Network(e.to_string())
        })?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| {
            tracing::error!(%method, path, ?e, "failed to read response body");
            Error::Network(e.to_string())
        })?;
        Ok(Response {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_joined_once() {
        let c = ClientConfig::new(String::from("http://example.org/api/"));
        assert_eq!(c.url("/comments/3/"), "http://example.org/api/comments/3/");
        assert_eq!(
            ClientConfig::default().url("/notes/1/comments/"),
            "http://localhost:8000/api/notes/1/comments/"
        );
    }

    #[test]
    fn anonymous_sends_no_cookie() {
        let c = ClientConfig::default();
        assert_eq!(c.cookie_header(), None);
        assert!(c.headers_for(&Method::POST).is_empty());
    }

    #[test]
    fn csrf_only_on_unsafe_methods() {
        let c = ClientConfig::default().with_session(String::from("s3ss"), String::from("t0k"));
        assert_eq!(
            c.headers_for(&Method::GET),
            vec![("Cookie", String::from("sessionid=s3ss; csrftoken=t0k"))]
        );
        assert_eq!(
            c.headers_for(&Method::DELETE),
            vec![
                ("Cookie", String::from("sessionid=s3ss; csrftoken=t0k")),
                ("X-CSRFToken", String::from("t0k")),
            ]
        );
    }
}
