use crate::api::{Actor, Comment};

/// Whether `actor` should be offered the edit and delete actions on `comment`
///
/// This only drives what the UI shows: the backend has the final word and may still
/// answer with `Forbidden`.
pub fn can_modify(actor: Option<&Actor>, comment: &Comment) -> bool {
    match actor {
        None => false,
        Some(actor) => actor.role.is_admin() || comment.author_id() == Some(actor.id),
    }
}
