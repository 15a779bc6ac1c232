use std::{cell::RefCell, collections::VecDeque};

use async_trait::async_trait;
use chrono::TimeZone;
use futures::channel::oneshot;
use http::{Method, StatusCode};

use crate::{
    api::{Actor, Comment, CommentId, Error, Role, Time, User, UserId},
    Response, Thread, Transport,
};

pub fn date() -> Time {
    chrono::Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

pub fn actor(id: i64, role: Role) -> Actor {
    Actor {
        id: UserId(id),
        username: format!("user{id}"),
        role,
    }
}

pub fn comment_by(id: i64, author: Option<i64>, content: &str) -> Comment {
    let author = author.map(|a| User {
        id: UserId(a),
        username: format!("user{a}"),
        profile: None,
    });
    Comment::new(CommentId(id), author, String::from(content), date())
}

pub fn comment(id: i64, content: &str) -> Comment {
    comment_by(id, Some(1), content)
}

pub fn thread_of(comments: Vec<Comment>) -> Thread {
    Thread::try_from(comments).unwrap()
}

/// Builds a thread with one comment per byte of `shape`: a byte divisible by 4 (or the first
/// one) starts a new top-level comment, any other byte picks a parent among the comments
/// already present. Ids go from 1 to `shape.len()`.
pub fn thread_from_shape(shape: &[u8]) -> Thread {
    let mut t = Thread::new();
    let mut ids = Vec::new();
    for (i, s) in shape.iter().enumerate() {
        let id = CommentId(i as i64 + 1);
        let c = comment(id.0, &format!("comment {}", id.0));
        if ids.is_empty() || s % 4 == 0 {
            t.push_top_level(c).unwrap();
        } else {
            let parent = ids[*s as usize % ids.len()];
            t.insert_reply(parent, c).unwrap();
        }
        ids.push(id);
    }
    t
}

type Recorded = (Method, String, Option<serde_json::Value>);

/// Transport answering with canned responses, in order
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<Response, Error>>>,
    requests: RefCell<Vec<Recorded>>,
    gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl ScriptedTransport {
    pub fn new() -> ScriptedTransport {
        ScriptedTransport::default()
    }

    pub fn reply(&self, status: StatusCode, body: Vec<u8>) {
        self.responses
            .borrow_mut()
            .push_back(Ok(Response { status, body }));
    }

    pub fn reply_json<T: serde::Serialize>(&self, status: StatusCode, body: &T) {
        self.reply(status, serde_json::to_vec(body).unwrap());
    }

    pub fn fail(&self, err: Error) {
        self.responses.borrow_mut().push_back(Err(err));
    }

    /// Holds the next request in flight until the returned sender fires
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        *self.gate.borrow_mut() = Some(receiver);
        sender
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Transport for ScriptedTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, Error> {
        self.requests
            .borrow_mut()
            .push((method, String::from(path), body));
        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            gate.await.expect("gate sender dropped");
        }
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted response left for {path}"))
    }
}
