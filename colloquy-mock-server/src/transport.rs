use async_trait::async_trait;
use axum::{body::Body, Router};
use colloquy_client::{api::Error, ClientConfig, Response, Transport};
use http::Method;
use tower::ServiceExt;

/// Transport that hands requests straight to an in-process router, without any socket
pub struct RouterTransport {
    app: Router,
    config: ClientConfig,
}

impl RouterTransport {
    /// `config.host` should be the api prefix, eg. `/api`
    pub fn new(app: Router, config: ClientConfig) -> RouterTransport {
        RouterTransport { app, config }
    }
}

#[async_trait(?Send)]
impl Transport for RouterTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, Error> {
        let mut req = http::Request::builder()
            .method(method.clone())
            .uri(self.config.url(path));
        for (name, value) in self.config.headers_for(&method) {
            req = req.header(name, value);
        }
        let body = match body {
            None => Body::empty(),
            Some(body) => {
                req = req.header(http::header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&body).map_err(|e| {
                    Error::Unknown(format!("failed to serialize request body: {e}"))
                })?)
            }
        };
        let req = req
            .body(body)
            .map_err(|e| Error::Network(format!("failed to build request: {e}")))?;
        let resp = self
            .app
            .clone()
            .oneshot(req)
            .await
            .unwrap_or_else(|e| match e {});
        let status = resp.status();
        let body = hyper::body::to_bytes(resp.into_body())
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Response {
            status,
            body: body.to_vec(),
        })
    }
}
