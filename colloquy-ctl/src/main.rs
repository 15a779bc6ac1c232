use anyhow::Context;
use colloquy_client::{
    api::{Actor, CommentId, NoteId, Role, UserId},
    render, render_text, ClientConfig, CommentRepository, HttpTransport, Mutation, Settled,
    SharedSync, Thread, ThreadController,
};

#[derive(structopt::StructOpt)]
struct Opt {
    /// Base url of the api
    #[structopt(short, long, env = "COLLOQUY_HOST", default_value = "http://localhost:8000/api")]
    host: String,

    /// Value of the `sessionid` cookie
    #[structopt(long, env = "COLLOQUY_SESSION", hide_env_values = true)]
    session: Option<String>,

    /// Value of the `csrftoken` cookie
    #[structopt(long, env = "COLLOQUY_CSRF", hide_env_values = true)]
    csrf: Option<String>,

    /// Id of the logged-in user, used to decide which actions to offer
    #[structopt(long, env = "COLLOQUY_ACTOR_ID")]
    actor_id: Option<i64>,

    #[structopt(long, env = "COLLOQUY_ACTOR_NAME", default_value = "")]
    actor_name: String,

    #[structopt(long, env = "COLLOQUY_ACTOR_ROLE", default_value = "junior")]
    actor_role: Role,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Display the comment thread of a note
    Show { note: i64 },

    /// Post a new top-level comment on a note
    Comment { note: i64, content: String },

    /// Reply to a comment
    Reply {
        note: i64,
        parent: i64,
        content: String,
    },

    /// Replace the content of a comment
    Edit { note: i64, id: i64, content: String },

    /// Delete a comment and all its replies
    Delete { note: i64, id: i64 },

    /// List the direct replies to a comment
    Replies { comment: i64 },
}

impl Opt {
    fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.host.clone());
        config.session_id = self.session.clone();
        config.csrf_token = self.csrf.clone();
        config
    }

    fn actor(&self) -> Option<Actor> {
        self.actor_id.map(|id| Actor {
            id: UserId(id),
            username: self.actor_name.clone(),
            role: self.actor_role,
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let repo = CommentRepository::new(HttpTransport::new(opt.config()));
    let actor = opt.actor();

    let (note, mutation) = match opt.cmd {
        Command::Replies { comment } => {
            let replies = repo
                .fetch_replies(CommentId(comment))
                .await
                .with_context(|| format!("fetching replies to comment {comment}"))?;
            let thread = Thread::try_from(replies).context("building thread of replies")?;
            let ui = ThreadController::new();
            print!("{}", render_text(&render(&thread, actor.as_ref(), &ui, false)));
            return Ok(());
        }
        Command::Show { note } => (note, None),
        Command::Comment { note, content } => (note, Some(Mutation::CreateTopLevel { content })),
        Command::Reply {
            note,
            parent,
            content,
        } => (
            note,
            Some(Mutation::Reply {
                parent: CommentId(parent),
                content,
            }),
        ),
        Command::Edit { note, id, content } => (
            note,
            Some(Mutation::Edit {
                comment: CommentId(id),
                content,
            }),
        ),
        Command::Delete { note, id } => (
            note,
            Some(Mutation::Delete {
                comment: CommentId(id),
            }),
        ),
    };

    let sync = SharedSync::new();
    if let Settled::Failed(err) = sync.view_note(&repo, NoteId(note)).await {
        return Err(err).with_context(|| format!("loading thread of note {note}"));
    }
    if let Some(mutation) = mutation {
        tracing::debug!(?mutation, "submitting");
        match sync.submit(&repo, mutation).await? {
            Settled::Failed(err) => return Err(err).context("submitting change"),
            Settled::Applied | Settled::Stale => (),
        }
    }

    let thread = sync.snapshot();
    if thread.is_empty() {
        println!("No comments on note {note} yet.");
    } else {
        let ui = ThreadController::new();
        print!("{}", render_text(&render(&thread, actor.as_ref(), &ui, false)));
    }
    Ok(())
}
