use std::collections::{BTreeMap, BTreeSet};

use colloquy_client::{
    api::{self, Comment, CommentId, Error, NewComment, NoteId, Profile, Role, User, UserId},
    ClientConfig,
};
use rand::{distributions::Alphanumeric, Rng};

mod router;
pub use router::{app, SharedServer};

mod transport;
pub use transport::RouterTransport;

const TOKEN_LEN: usize = 32;

/// What a client needs to present to be recognized as a given user
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credentials {
    pub session_id: String,
    pub csrf_token: String,
}

impl Credentials {
    fn generate() -> Credentials {
        Credentials {
            session_id: random_token(),
            csrf_token: random_token(),
        }
    }

    pub fn client_config(&self, host: String) -> ClientConfig {
        ClientConfig::new(host).with_session(self.session_id.clone(), self.csrf_token.clone())
    }
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug)]
struct DbUser {
    name: String,
    role: Role,
    session_id: String,
}

#[derive(Debug)]
struct DbComment {
    note: NoteId,
    author: Option<UserId>,
    parent: Option<CommentId>,
    content: String,
    is_edited: bool,
    created_at: api::Time,
    updated_at: api::Time,
}

/// In-memory backend with the permission and cascade rules of the real one
///
/// Comment ids are allocated in increasing order, so iterating `comments` yields creation
/// order.
#[derive(Debug, Default)]
pub struct MockServer {
    users: BTreeMap<UserId, DbUser>,
    notes: BTreeSet<NoteId>,
    comments: BTreeMap<CommentId, DbComment>,
    next_id: i64,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer::default()
    }

    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn admin_create_user(
        &mut self,
        name: String,
        role: Role,
    ) -> Result<(UserId, Credentials), Error> {
        if self.users.values().any(|u| u.name == name) {
            return Err(Error::Validation(format!("username {name:?} is already used")));
        }
        let id = UserId(self.alloc_id());
        let creds = Credentials::generate();
        tracing::debug!(%id, name, %role, "creating user");
        self.users.insert(
            id,
            DbUser {
                name,
                role,
                session_id: creds.session_id.clone(),
            },
        );
        Ok((id, creds))
    }

    /// Removes the user; their comments stay, without an author
    pub fn admin_delete_user(&mut self, id: UserId) -> Result<(), Error> {
        self.users.remove(&id).ok_or(Error::NotFound)?;
        for c in self.comments.values_mut().filter(|c| c.author == Some(id)) {
            c.author = None;
        }
        Ok(())
    }

    pub fn admin_create_note(&mut self) -> NoteId {
        let id = NoteId(self.alloc_id());
        self.notes.insert(id);
        id
    }

    /// Returns the number of comments currently stored, at every depth
    pub fn test_num_comments(&self) -> usize {
        self.comments.len()
    }

    fn resolve(&self, session: &str) -> Result<(UserId, &DbUser), Error> {
        self.users
            .iter()
            .find(|(_, u)| u.session_id == session)
            .map(|(id, u)| (*id, u))
            .ok_or(Error::Unauthenticated)
    }

    fn existing(&self, id: CommentId) -> Result<&DbComment, Error> {
        self.comments.get(&id).ok_or(Error::NotFound)
    }

    fn children(&self, parent: CommentId) -> impl '_ + Iterator<Item = CommentId> {
        self.comments
            .iter()
            .filter(move |(_, c)| c.parent == Some(parent))
            .map(|(id, _)| *id)
    }

    fn render(&self, id: CommentId, c: &DbComment) -> Comment {
        let author = c.author.and_then(|a| {
            self.users.get(&a).map(|u| User {
                id: a,
                username: u.name.clone(),
                profile: Some(Profile { role: u.role }),
            })
        });
        Comment {
            id,
            content: c.content.clone(),
            author_username: author.as_ref().map(|a| a.username.clone()),
            author,
            parent_comment: c.parent,
            is_edited: c.is_edited,
            created_at: c.created_at,
            updated_at: c.updated_at,
            replies: self
                .children(id)
                .filter_map(|r| self.comments.get(&r).map(|c| self.render(r, c)))
                .collect(),
        }
    }

    pub fn fetch_thread(&self, session: &str, note: NoteId) -> Result<Vec<Comment>, Error> {
        self.resolve(session)?;
        if !self.notes.contains(&note) {
            return Err(Error::NotFound);
        }
        Ok(self
            .comments
            .iter()
            .filter(|(_, c)| c.note == note && c.parent.is_none())
            .map(|(id, c)| self.render(*id, c))
            .collect())
    }

    pub fn fetch_replies(&self, session: &str, comment: CommentId) -> Result<Vec<Comment>, Error> {
        self.resolve(session)?;
        self.existing(comment)?;
        Ok(self
            .children(comment)
            .filter_map(|r| self.comments.get(&r).map(|c| self.render(r, c)))
            .collect())
    }

    fn insert(
        &mut self,
        author: UserId,
        note: NoteId,
        parent: Option<CommentId>,
        data: &NewComment,
    ) -> Result<Comment, Error> {
        let content = api::validate_content(&data.content)?.to_string();
        let id = CommentId(self.alloc_id());
        let now = chrono::Utc::now();
        tracing::debug!(%id, %note, ?parent, %author, "creating comment");
        let c = DbComment {
            note,
            author: Some(author),
            parent,
            content,
            is_edited: false,
            created_at: now,
            updated_at: now,
        };
        let res = self.render(id, &c);
        self.comments.insert(id, c);
        Ok(res)
    }

    pub fn create_comment(
        &mut self,
        session: &str,
        note: NoteId,
        data: NewComment,
    ) -> Result<Comment, Error> {
        let (user, _) = self.resolve(session)?;
        if !self.notes.contains(&note) {
            return Err(Error::NotFound);
        }
        self.insert(user, note, None, &data)
    }

    /// The reply is attached to the parent's note
    pub fn reply(
        &mut self,
        session: &str,
        parent: CommentId,
        data: NewComment,
    ) -> Result<Comment, Error> {
        let (user, _) = self.resolve(session)?;
        let note = self.existing(parent)?.note;
        self.insert(user, note, Some(parent), &data)
    }

    pub fn update_comment(
        &mut self,
        session: &str,
        id: CommentId,
        data: NewComment,
    ) -> Result<Comment, Error> {
        let (user, u) = self.resolve(session)?;
        let role = u.role;
        let c = self.existing(id)?;
        if c.author != Some(user) && !role.can_edit_others() {
            return Err(Error::Forbidden);
        }
        let content = api::validate_content(&data.content)?.to_string();
        let c = self.comments.get_mut(&id).ok_or(Error::NotFound)?;
        c.content = content;
        c.is_edited = true;
        c.updated_at = chrono::Utc::now();
        let c = self.existing(id)?;
        Ok(self.render(id, c))
    }

    /// Removes the comment along with all its replies, recursively
    pub fn delete_comment(&mut self, session: &str, id: CommentId) -> Result<(), Error> {
        let (user, u) = self.resolve(session)?;
        let role = u.role;
        if self.existing(id)?.author != Some(user) && !role.is_admin() {
            return Err(Error::Forbidden);
        }
        let mut to_remove = vec![id];
        while let Some(id) = to_remove.pop() {
            to_remove.extend(self.children(id));
            self.comments.remove(&id);
        }
        Ok(())
    }
}
