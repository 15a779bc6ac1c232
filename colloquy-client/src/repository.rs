use async_trait::async_trait;
use http::{Method, StatusCode};

use crate::{
    api::{self, Comment, CommentId, Error, NewComment, NoteId},
    Thread,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Raw request/response access to the backend
///
/// `path` is relative to the API root, eg. `/comments/3/`. Implementations only return an
/// error when no response at all could be obtained, which should be `Error::Network`.
#[async_trait(?Send)]
pub trait Transport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, Error>;
}

/// Client for the comment endpoints of the backend
///
/// There is no caching: every call is a fresh round trip. Content is validated locally
/// before anything is sent.
pub struct CommentRepository<T> {
    transport: T,
}

impl<T: Transport> CommentRepository<T> {
    pub fn new(transport: T) -> CommentRepository<T> {
        CommentRepository { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn fetch_thread(&self, note: NoteId) -> Result<Thread, Error> {
        let comments: Vec<Comment> = self
            .call(Method::GET, &format!("/notes/{note}/comments/"), None)
            .await?;
        Ok(Thread::try_from(comments)?)
    }

    pub async fn fetch_replies(&self, comment: CommentId) -> Result<Vec<Comment>, Error> {
        self.call(Method::GET, &format!("/comments/{comment}/replies/"), None)
            .await
    }

    pub async fn create_top_level(&self, note: NoteId, content: &str) -> Result<Comment, Error> {
        let body = content_body(content)?;
        self.call(Method::POST, &format!("/notes/{note}/comments/"), Some(body))
            .await
    }

    pub async fn create_reply(&self, parent: CommentId, content: &str) -> Result<Comment, Error> {
        let body = content_body(content)?;
        self.call(
            Method::POST,
            &format!("/comments/{parent}/replies/"),
            Some(body),
        )
        .await
    }

    pub async fn update_content(&self, comment: CommentId, content: &str) -> Result<Comment, Error> {
        let body = content_body(content)?;
        self.call(Method::PUT, &format!("/comments/{comment}/"), Some(body))
            .await
    }

    /// Deleting an already-deleted comment fails with `NotFound`
    pub async fn delete(&self, comment: CommentId) -> Result<(), Error> {
        self.send(Method::DELETE, &format!("/comments/{comment}/"), None)
            .await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, Error> {
        tracing::trace!(%method, path, "sending request");
        let resp = self.transport.request(method.clone(), path, body).await?;
        if resp.status.is_success() {
            tracing::debug!(%method, path, status = %resp.status, "request succeeded");
            Ok(resp)
        } else {
            let err = Error::from_response(resp.status, &resp.body);
            tracing::warn!(%method, path, status = %resp.status, %err, "request failed");
            Err(err)
        }
    }

    async fn call<R>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<R, Error>
    where
        R: for<'de> serde::Deserialize<'de>,
    {
        let resp = self.send(method, path, body).await?;
        decode(&resp.body).map_err(|e| {
            tracing::error!(path, ?e, "failed to parse data from server");
            Error::Unknown(format!("failed to parse response to {path}: {e}"))
        })
    }
}

/// Threads nest without bound, so the recursion limit is lifted and the stack grown on demand
fn decode<R>(body: &[u8]) -> Result<R, serde_json::Error>
where
    R: for<'de> serde::Deserialize<'de>,
{
    let mut de = serde_json::Deserializer::from_slice(body);
    de.disable_recursion_limit();
    let res = R::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(res)
}

fn content_body(content: &str) -> Result<serde_json::Value, Error> {
    api::validate_content(content)?;
    serde_json::to_value(NewComment {
        content: String::from(content),
    })
    .map_err(|e| Error::Unknown(format!("failed to serialize comment: {e}")))
}
