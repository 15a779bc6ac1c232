use chrono::Utc;

mod auth;
pub use auth::{Actor, Role};

mod comment;
pub use comment::{Comment, CommentId, NewComment, DELETED_AUTHOR};

mod error;
pub use error::Error;

mod note;
pub use note::NoteId;

mod user;
pub use user::{Profile, User, UserId};

pub type Time = chrono::DateTime<Utc>;

/// Checks that `content` is acceptable as a comment body, returning the trimmed version
///
/// This runs client-side before anything is sent, and server-side again before storing.
pub fn validate_content(content: &str) -> Result<&str, Error> {
    if content.contains('\0') {
        return Err(Error::Validation(String::from(
            "comment content must not contain null bytes",
        )));
    }
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::empty_content());
    }
    Ok(trimmed)
}
