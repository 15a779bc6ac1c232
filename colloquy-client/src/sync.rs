use std::{cell::RefCell, rc::Rc};

use crate::{
    api::{self, Comment, CommentId, Error, NoteId},
    CommentRepository, Thread, Transport,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Mutation {
    Reload,
    CreateTopLevel { content: String },
    Reply { parent: CommentId, content: String },
    Edit { comment: CommentId, content: String },
    Delete { comment: CommentId },
}

impl Mutation {
    pub fn default_strategy(&self) -> Strategy {
        match self {
            Mutation::Reply { .. } => Strategy::PatchThenReload,
            _ => Strategy::FullReload,
        }
    }

    fn validate(&self) -> Result<(), Error> {
        match self {
            Mutation::CreateTopLevel { content }
            | Mutation::Reply { content, .. }
            | Mutation::Edit { content, .. } => api::validate_content(content).map(|_| ()),
            Mutation::Reload | Mutation::Delete { .. } => Ok(()),
        }
    }
}

/// How the local thread is brought back in line with the backend after a mutation
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strategy {
    /// Discard the local thread and fetch it again
    FullReload,

    /// Apply the backend's answer directly to the local thread
    LocalPatch,

    /// Apply the backend's answer locally, then reload once it is applied
    PatchThenReload,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SyncState {
    #[default]
    Idle,
    Loading,
    Ready,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error("no note is currently being viewed")]
    NoNote,

    #[error("a request is already in flight for note {0}")]
    Busy(NoteId),

    #[error(transparent)]
    Api(#[from] Error),
}

/// Permission to run one request against the backend
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ticket {
    note: NoteId,
    generation: u64,
    mutation: Mutation,
    strategy: Strategy,
}

impl Ticket {
    pub fn note(&self) -> NoteId {
        self.note
    }

    pub fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Outcome {
    Fetched(Thread),
    Created(Comment),
    Replied { parent: CommentId, reply: Comment },
    Edited(Comment),
    Deleted(CommentId),
}

/// Result of running a `Ticket`, to be handed back to `ThreadSync::complete`
#[derive(Clone, Debug)]
pub struct Completion {
    ticket: Ticket,
    result: Result<Outcome, Error>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Settled {
    /// The thread now reflects the request
    Applied,

    /// The request was superseded by a note change, its result was dropped
    Stale,

    /// The request failed and the previous thread was kept
    Failed(Error),
}

/// Owner of the thread of the currently viewed note
///
/// At most one request may be in flight at a time: `begin` refuses to hand out a new
/// ticket while `Loading`. Viewing another note is always allowed, and makes the answers to
/// requests issued for the previous one stale.
#[derive(Debug, Default)]
pub struct ThreadSync {
    note: Option<NoteId>,
    state: SyncState,
    thread: Thread,
    generation: u64,
    notification: Option<String>,
}

impl ThreadSync {
    pub fn new() -> ThreadSync {
        ThreadSync::default()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == SyncState::Loading
    }

    pub fn note(&self) -> Option<NoteId> {
        self.note
    }

    /// Last known-good thread
    pub fn thread(&self) -> &Thread {
        &self.thread
    }

    pub fn notification(&self) -> Option<&str> {
        self.notification.as_deref()
    }

    pub fn take_notification(&mut self) -> Option<String> {
        self.notification.take()
    }

    pub fn view_note(&mut self, note: NoteId) -> Ticket {
        tracing::debug!(%note, previous = ?self.note, "switching viewed note");
        self.note = Some(note);
        self.thread = Thread::new();
        self.notification = None;
        self.generation += 1;
        self.state = SyncState::Loading;
        Ticket {
            note,
            generation: self.generation,
            mutation: Mutation::Reload,
            strategy: Strategy::FullReload,
        }
    }

    pub fn leave_note(&mut self) {
        tracing::debug!(previous = ?self.note, "leaving note");
        self.note = None;
        self.thread = Thread::new();
        self.notification = None;
        self.generation += 1;
        self.state = SyncState::Idle;
    }

    pub fn reload(&mut self) -> Result<Ticket, SyncError> {
        self.begin(Mutation::Reload)
    }

    pub fn begin(&mut self, mutation: Mutation) -> Result<Ticket, SyncError> {
        let strategy = mutation.default_strategy();
        self.begin_with(mutation, strategy)
    }

    /// Hands out a ticket for `mutation`, or records why it was refused in the notification
    pub fn begin_with(
        &mut self,
        mutation: Mutation,
        strategy: Strategy,
    ) -> Result<Ticket, SyncError> {
        self.try_begin(mutation, strategy).map_err(|err| {
            self.notification = Some(err.to_string());
            err
        })
    }

    fn try_begin(&mut self, mutation: Mutation, strategy: Strategy) -> Result<Ticket, SyncError> {
        let note = self.note.ok_or(SyncError::NoNote)?;
        if self.state == SyncState::Loading {
            tracing::debug!(%note, ?mutation, "rejecting request, another one is in flight");
            return Err(SyncError::Busy(note));
        }
        mutation.validate()?;
        let strategy = match mutation {
            Mutation::Reload => Strategy::FullReload,
            _ => strategy,
        };
        self.generation += 1;
        self.state = SyncState::Loading;
        tracing::debug!(%note, ?mutation, ?strategy, "starting request");
        Ok(Ticket {
            note,
            generation: self.generation,
            mutation,
            strategy,
        })
    }

    pub fn complete(&mut self, completion: Completion) -> Settled {
        let Completion { ticket, result } = completion;
        if self.note != Some(ticket.note) || self.generation != ticket.generation {
            tracing::debug!(note = %ticket.note, mutation = ?ticket.mutation, "dropping stale response");
            return Settled::Stale;
        }
        self.state = SyncState::Ready;
        match result.and_then(|outcome| self.patched(outcome)) {
            Ok(thread) => {
                tracing::debug!(note = %ticket.note, comments = thread.len(), "thread updated");
                self.thread = thread;
                Settled::Applied
            }
            Err(err) => {
                tracing::warn!(note = %ticket.note, mutation = ?ticket.mutation, %err, "request failed, keeping previous thread");
                self.notification = Some(err.to_string());
                Settled::Failed(err)
            }
        }
    }

    /// Reload to issue after `settled`, for patches that must be followed by one
    pub fn follow_up(&mut self, strategy: Strategy, settled: &Settled) -> Option<Ticket> {
        match (strategy, settled) {
            (Strategy::PatchThenReload, Settled::Applied) => self.reload().ok(),
            _ => None,
        }
    }

    fn patched(&self, outcome: Outcome) -> Result<Thread, Error> {
        let mut thread = self.thread.clone();
        match outcome {
            Outcome::Fetched(fetched) => thread = fetched,
            Outcome::Created(c) => thread.push_top_level(c)?,
            Outcome::Replied { parent, reply } => thread.insert_reply(parent, reply)?,
            Outcome::Edited(c) => thread.replace_content(c.id, c.content)?,
            Outcome::Deleted(id) => {
                thread.remove_subtree(id)?;
            }
        }
        Ok(thread)
    }
}

/// Runs the network side of `ticket`, without touching any synchronizer state
pub async fn perform<T: Transport>(repo: &CommentRepository<T>, ticket: Ticket) -> Completion {
    let result = execute(repo, &ticket).await;
    Completion { ticket, result }
}

async fn execute<T: Transport>(
    repo: &CommentRepository<T>,
    ticket: &Ticket,
) -> Result<Outcome, Error> {
    let note = ticket.note;
    let outcome = match &ticket.mutation {
        Mutation::Reload => None,
        Mutation::CreateTopLevel { content } => {
            Some(Outcome::Created(repo.create_top_level(note, content).await?))
        }
        Mutation::Reply { parent, content } => Some(Outcome::Replied {
            parent: *parent,
            reply: repo.create_reply(*parent, content).await?,
        }),
        Mutation::Edit { comment, content } => {
            Some(Outcome::Edited(repo.update_content(*comment, content).await?))
        }
        Mutation::Delete { comment } => {
            repo.delete(*comment).await?;
            Some(Outcome::Deleted(*comment))
        }
    };
    match (ticket.strategy, outcome) {
        (Strategy::LocalPatch | Strategy::PatchThenReload, Some(outcome)) => Ok(outcome),
        _ => Ok(Outcome::Fetched(repo.fetch_thread(note).await?)),
    }
}

/// Handle on a `ThreadSync` for a single-threaded event loop
///
/// Each operation borrows the synchronizer only to begin and to complete, never across the
/// network round trip, so overlapping operations observe `Busy` instead of interleaving.
#[derive(Clone, Debug, Default)]
pub struct SharedSync(Rc<RefCell<ThreadSync>>);

impl SharedSync {
    pub fn new() -> SharedSync {
        SharedSync::default()
    }

    pub fn state(&self) -> SyncState {
        self.0.borrow().state()
    }

    pub fn is_busy(&self) -> bool {
        self.0.borrow().is_busy()
    }

    pub fn note(&self) -> Option<NoteId> {
        self.0.borrow().note()
    }

    /// Render-ready copy of the current thread
    pub fn snapshot(&self) -> Thread {
        self.0.borrow().thread().clone()
    }

    pub fn take_notification(&self) -> Option<String> {
        self.0.borrow_mut().take_notification()
    }

    pub fn leave_note(&self) {
        self.0.borrow_mut().leave_note()
    }

    pub async fn view_note<T: Transport>(
        &self,
        repo: &CommentRepository<T>,
        note: NoteId,
    ) -> Settled {
        let ticket = self.0.borrow_mut().view_note(note);
        self.finish(repo, ticket).await
    }

    pub async fn reload<T: Transport>(
        &self,
        repo: &CommentRepository<T>,
    ) -> Result<Settled, SyncError> {
        self.submit(repo, Mutation::Reload).await
    }

    pub async fn submit<T: Transport>(
        &self,
        repo: &CommentRepository<T>,
        mutation: Mutation,
    ) -> Result<Settled, SyncError> {
        let strategy = mutation.default_strategy();
        self.submit_with(repo, mutation, strategy).await
    }

    pub async fn submit_with<T: Transport>(
        &self,
        repo: &CommentRepository<T>,
        mutation: Mutation,
        strategy: Strategy,
    ) -> Result<Settled, SyncError> {
        let ticket = self.0.borrow_mut().begin_with(mutation, strategy)?;
        Ok(self.finish(repo, ticket).await)
    }

    async fn finish<T: Transport>(&self, repo: &CommentRepository<T>, ticket: Ticket) -> Settled {
        let strategy = ticket.strategy();
        let completion = perform(repo, ticket).await;
        let settled = self.0.borrow_mut().complete(completion);
        let follow_up = self.0.borrow_mut().follow_up(strategy, &settled);
        match follow_up {
            Some(reload) => {
                let completion = perform(repo, reload).await;
                self.0.borrow_mut().complete(completion)
            }
            None => settled,
        }
    }
}
