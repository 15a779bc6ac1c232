mod auth;
pub use auth::can_modify;

mod remote;
pub use remote::{ClientConfig, HttpTransport};

mod repository;
pub use repository::{CommentRepository, Response, Transport};

mod sync;
pub use sync::{
    perform, Completion, Mutation, Settled, SharedSync, Strategy, SyncError, SyncState,
    ThreadSync, Ticket,
};

mod thread;
pub use thread::{Thread, TreeError, Walk};

mod view;
pub use view::{
    affordances, render, render_text, Affordances, CommentUi, RenderedComment, ThreadController,
};

pub mod api {
    pub use colloquy_api::*;
}

#[cfg(test)]
mod test_util;
