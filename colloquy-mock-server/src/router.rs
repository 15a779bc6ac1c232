use std::{collections::HashMap, sync::Arc};

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, Path, State},
    http::{request, StatusCode},
    routing::{get, put},
    Json, Router,
};
use colloquy_client::api::{Comment, CommentId, Error as ApiError, NewComment, NoteId};
use parking_lot::Mutex;
use tower_http::trace::TraceLayer;

use crate::MockServer;

pub type SharedServer = Arc<Mutex<MockServer>>;

/// Serves `server` under the `/api` prefix, with the same routes as the real backend
pub fn app(server: SharedServer) -> Router {
    let api = Router::new()
        .route(
            "/notes/:note/comments/",
            get(fetch_thread).post(create_comment),
        )
        .route("/comments/:id/", put(update_comment).delete(delete_comment))
        .route("/comments/:id/replies/", get(fetch_replies).post(reply));
    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

#[derive(Debug)]
pub struct Error(ApiError);

impl From<ApiError> for Error {
    fn from(e: ApiError) -> Error {
        Error(e)
    }
}

impl From<JsonRejection> for Error {
    fn from(e: JsonRejection) -> Error {
        Error(ApiError::Validation(e.body_text()))
    }
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let err = self.0;
        tracing::info!("returning error to client: {err}");
        (
            err.status_code(),
            [(http::header::CONTENT_TYPE, "application/json")],
            err.contents(),
        )
            .into_response()
    }
}

/// Session id of the caller, taken from the `sessionid` cookie
///
/// Requests with unsafe methods must also repeat the `csrftoken` cookie in the
/// `X-CSRFToken` header.
pub struct Session(pub String);

fn cookies(req: &request::Parts) -> HashMap<&str, &str> {
    req.headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|c| c.trim().split_once('='))
        .collect()
}

#[async_trait]
impl<S: Sync> FromRequestParts<S> for Session {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, _state: &S) -> Result<Session, Error> {
        let cookies = cookies(req);
        let session = cookies
            .get("sessionid")
            .filter(|s| !s.is_empty())
            .ok_or(ApiError::Unauthenticated)?;
        if !req.method.is_safe() {
            let header = req
                .headers
                .get("X-CSRFToken")
                .and_then(|h| h.to_str().ok());
            match (header, cookies.get("csrftoken")) {
                (Some(header), Some(cookie)) if !header.is_empty() && header == *cookie => (),
                _ => {
                    tracing::info!(method = %req.method, uri = %req.uri, "csrf check failed");
                    return Err(Error(ApiError::Forbidden));
                }
            }
        }
        Ok(Session(session.to_string()))
    }
}

async fn fetch_thread(
    Session(session): Session,
    State(server): State<SharedServer>,
    Path(note): Path<i64>,
) -> Result<Json<Vec<Comment>>, Error> {
    Ok(Json(server.lock().fetch_thread(&session, NoteId(note))?))
}

async fn fetch_replies(
    Session(session): Session,
    State(server): State<SharedServer>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Comment>>, Error> {
    Ok(Json(server.lock().fetch_replies(&session, CommentId(id))?))
}

async fn create_comment(
    Session(session): Session,
    State(server): State<SharedServer>,
    Path(note): Path<i64>,
    data: Result<Json<NewComment>, JsonRejection>,
) -> Result<(StatusCode, Json<Comment>), Error> {
    let Json(data) = data?;
    let c = server
        .lock()
        .create_comment(&session, NoteId(note), data)?;
    Ok((StatusCode::CREATED, Json(c)))
}

async fn reply(
    Session(session): Session,
    State(server): State<SharedServer>,
    Path(parent): Path<i64>,
    data: Result<Json<NewComment>, JsonRejection>,
) -> Result<(StatusCode, Json<Comment>), Error> {
    let Json(data) = data?;
    let c = server.lock().reply(&session, CommentId(parent), data)?;
    Ok((StatusCode::CREATED, Json(c)))
}

async fn update_comment(
    Session(session): Session,
    State(server): State<SharedServer>,
    Path(id): Path<i64>,
    data: Result<Json<NewComment>, JsonRejection>,
) -> Result<Json<Comment>, Error> {
    let Json(data) = data?;
    Ok(Json(
        server.lock().update_comment(&session, CommentId(id), data)?,
    ))
}

async fn delete_comment(
    Session(session): Session,
    State(server): State<SharedServer>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Error> {
    server.lock().delete_comment(&session, CommentId(id))?;
    Ok(StatusCode::NO_CONTENT)
}
