use std::fmt;

use crate::{Time, User, UserId};

/// Display name used when the author's account no longer exists
pub const DELETED_AUTHOR: &str = "[Compte supprimé]";

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub i64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub content: String,

    /// None if the author's account was deleted
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub author_username: Option<String>,

    #[serde(default)]
    pub parent_comment: Option<CommentId>,

    /// Set once any edit succeeded, never cleared afterwards
    #[serde(default)]
    pub is_edited: bool,

    pub created_at: Time,
    pub updated_at: Time,

    /// Replies, in creation order
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn new(id: CommentId, author: Option<User>, content: String, date: Time) -> Comment {
        Comment {
            id,
            content,
            author_username: author.as_ref().map(|a| a.username.clone()),
            author,
            parent_comment: None,
            is_edited: false,
            created_at: date,
            updated_at: date,
            replies: Vec::new(),
        }
    }

    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .map(|a| &a.username as &str)
            .or(self.author_username.as_deref())
            .unwrap_or(DELETED_AUTHOR)
    }

    pub fn author_id(&self) -> Option<UserId> {
        self.author.as_ref().map(|a| a.id)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    #[serde(default)]
    pub content: String,
}
