use std::collections::HashMap;

use crate::{
    api::{Actor, Comment, CommentId, Time},
    can_modify, Mutation, Thread,
};

/// Transient interaction state of one comment
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommentUi {
    pub reply_form_visible: bool,
    pub reply_buffer: String,
    pub edit_mode: bool,
    pub edit_buffer: String,
}

/// Interaction state of every comment of a thread, plus the note-level comment form
///
/// Each comment's state is independent: acting on one never changes a sibling or an
/// ancestor. Submitting always clears the submitted form, whatever happens to the request
/// afterwards.
#[derive(Clone, Debug, Default)]
pub struct ThreadController {
    compose_buffer: String,
    comments: HashMap<CommentId, CommentUi>,
}

impl ThreadController {
    pub fn new() -> ThreadController {
        ThreadController::default()
    }

    pub fn state(&self, id: CommentId) -> Option<&CommentUi> {
        self.comments.get(&id)
    }

    pub fn compose_buffer(&self) -> &str {
        &self.compose_buffer
    }

    pub fn set_compose_buffer(&mut self, text: String) {
        self.compose_buffer = text;
    }

    pub fn submit_top_level(&mut self) -> Option<Mutation> {
        if is_blank(&self.compose_buffer) {
            return None;
        }
        Some(Mutation::CreateTopLevel {
            content: std::mem::take(&mut self.compose_buffer),
        })
    }

    /// Shows or hides the reply form; hiding it drops whatever was typed
    pub fn toggle_reply_form(&mut self, id: CommentId) {
        let ui = self.comments.entry(id).or_default();
        ui.reply_form_visible = !ui.reply_form_visible;
        if !ui.reply_form_visible {
            ui.reply_buffer.clear();
        }
    }

    pub fn set_reply_buffer(&mut self, id: CommentId, text: String) {
        self.comments.entry(id).or_default().reply_buffer = text;
    }

    /// Returns the mutation to submit, or None if the reply form is blank
    pub fn submit_reply(&mut self, id: CommentId) -> Option<Mutation> {
        let ui = self.comments.get_mut(&id)?;
        if !ui.reply_form_visible || is_blank(&ui.reply_buffer) {
            return None;
        }
        let content = std::mem::take(&mut ui.reply_buffer);
        ui.reply_form_visible = false;
        Some(Mutation::Reply {
            parent: id,
            content,
        })
    }

    pub fn enter_edit(&mut self, comment: &Comment) {
        let ui = self.comments.entry(comment.id).or_default();
        ui.edit_mode = true;
        ui.edit_buffer = comment.content.clone();
    }

    pub fn set_edit_buffer(&mut self, id: CommentId, text: String) {
        if let Some(ui) = self.comments.get_mut(&id).filter(|ui| ui.edit_mode) {
            ui.edit_buffer = text;
        }
    }

    pub fn cancel_edit(&mut self, id: CommentId) {
        if let Some(ui) = self.comments.get_mut(&id) {
            ui.edit_mode = false;
            ui.edit_buffer.clear();
        }
    }

    /// Returns the mutation to submit, or None if not editing or the buffer is blank
    pub fn submit_edit(&mut self, id: CommentId) -> Option<Mutation> {
        let ui = self.comments.get_mut(&id)?;
        if !ui.edit_mode || is_blank(&ui.edit_buffer) {
            return None;
        }
        let content = std::mem::take(&mut ui.edit_buffer);
        ui.edit_mode = false;
        Some(Mutation::Edit {
            comment: id,
            content,
        })
    }

    /// Forgets the state of comments that are no longer part of `thread`
    pub fn retain(&mut self, thread: &Thread) {
        self.comments.retain(|id, _| thread.contains(*id));
    }

    /// Drops everything, eg. when the viewed note changes
    pub fn reset(&mut self) {
        self.compose_buffer.clear();
        self.comments.clear();
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Which actions to offer on a comment
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Affordances {
    pub reply: bool,
    pub edit: bool,
    pub delete: bool,

    /// False while a request is in flight for the thread
    pub enabled: bool,
}

pub fn affordances(actor: Option<&Actor>, comment: &Comment, busy: bool) -> Affordances {
    let modify = can_modify(actor, comment);
    Affordances {
        reply: actor.is_some(),
        edit: modify,
        delete: modify,
        enabled: !busy,
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenderedComment<'a> {
    pub id: CommentId,
    pub depth: usize,
    pub author: &'a str,
    pub created_at: Time,
    pub content: &'a str,
    pub edited: bool,
    pub affordances: Affordances,

    /// Edit buffer, when in edit mode
    pub editing: Option<&'a str>,

    /// Reply buffer, when the reply form is shown
    pub reply_form: Option<&'a str>,
}

impl RenderedComment<'_> {
    pub fn can_submit_edit(&self) -> bool {
        self.affordances.enabled && self.editing.map_or(false, |b| !is_blank(b))
    }

    pub fn can_submit_reply(&self) -> bool {
        self.affordances.enabled && self.reply_form.map_or(false, |b| !is_blank(b))
    }
}

/// Flattens the thread into rows, each reply right after its parent
pub fn render<'a>(
    thread: &'a Thread,
    actor: Option<&Actor>,
    ui: &'a ThreadController,
    busy: bool,
) -> Vec<RenderedComment<'a>> {
    let mut res = Vec::with_capacity(thread.len());
    for c in thread.comments() {
        render_node(c, 0, actor, ui, busy, &mut res);
    }
    res
}

fn render_node<'a>(
    node: &'a Comment,
    depth: usize,
    actor: Option<&Actor>,
    ui: &'a ThreadController,
    busy: bool,
    out: &mut Vec<RenderedComment<'a>>,
) {
    let state = ui.state(node.id);
    out.push(RenderedComment {
        id: node.id,
        depth,
        author: node.author_name(),
        created_at: node.created_at,
        content: &node.content,
        edited: node.is_edited,
        affordances: affordances(actor, node, busy),
        editing: state
            .filter(|s| s.edit_mode)
            .map(|s| &s.edit_buffer as &str),
        reply_form: state
            .filter(|s| s.reply_form_visible)
            .map(|s| &s.reply_buffer as &str),
    });
    for reply in &node.replies {
        render_node(reply, depth + 1, actor, ui, busy, out);
    }
}

/// Plain-text rendering of rows, replies indented under their parent
pub fn render_text(rows: &[RenderedComment<'_>]) -> String {
    let mut res = String::new();
    for r in rows {
        let indent = "    ".repeat(r.depth);
        res.push_str(&format!(
            "{indent}#{} {} - {}",
            r.id,
            r.author,
            r.created_at.format("%Y-%m-%d %H:%M")
        ));
        if r.edited {
            res.push_str(" (edited)");
        }
        let actions = [
            (r.affordances.reply, "reply"),
            (r.affordances.edit, "edit"),
            (r.affordances.delete, "delete"),
        ]
        .into_iter()
        .filter_map(|(offered, name)| offered.then_some(name))
        .collect::<Vec<_>>();
        if !actions.is_empty() {
            res.push_str(&format!(" [{}]", actions.join(", ")));
        }
        res.push('\n');
        let body = r.editing.unwrap_or(r.content);
        for line in body.lines() {
            res.push_str(&format!("{indent}  {line}\n"));
        }
        if let Some(reply) = r.reply_form {
            res.push_str(&format!("{indent}  > {reply}\n"));
        }
    }
    res
}
