use anyhow::Context;
use colloquy_client::{
    api::{CommentId, NoteId},
    ClientConfig, CommentRepository, HttpTransport,
};
use rand::{seq::SliceRandom, Rng};

const NUM_ROOTS_PER_NOTE: usize = 5;
const NUM_REPLIES_PER_NOTE: usize = 20;

const COMMENT_MIN_WORDS: usize = 5;
const COMMENT_MAX_WORDS: usize = 40;

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, env = "COLLOQUY_HOST", default_value = "http://localhost:8000/api")]
    host: String,

    /// Sessions to post as, as `sessionid:csrftoken`, picked at random for each comment
    #[structopt(short, long, required = true)]
    session: Vec<String>,

    /// Notes to populate
    #[structopt(required = true)]
    notes: Vec<i64>,
}

fn gen_comment_text() -> String {
    let words = rand::thread_rng().gen_range(COMMENT_MIN_WORDS..=COMMENT_MAX_WORDS);
    lipsum::lipsum_words(words)
}

fn repository(arg: &str, host: &str) -> anyhow::Result<CommentRepository<HttpTransport>> {
    let (session, csrf) = arg
        .split_once(':')
        .with_context(|| format!("session {arg:?} is not of the form sessionid:csrftoken"))?;
    let config = ClientConfig::new(host.to_string())
        .with_session(session.to_string(), csrf.to_string());
    Ok(CommentRepository::new(HttpTransport::new(config)))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let repos = opt
        .session
        .iter()
        .map(|s| repository(s, &opt.host))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let pick = || repos.choose(&mut rand::thread_rng()).context("no session given");

    for note in opt.notes.iter().copied().map(NoteId) {
        // every comment of the note, so that replies can land at any depth
        let mut ids: Vec<CommentId> = Vec::new();
        for _ in 0..NUM_ROOTS_PER_NOTE {
            let c = pick()?
                .create_top_level(note, &gen_comment_text())
                .await
                .with_context(|| format!("creating comment on note {note}"))?;
            ids.push(c.id);
        }
        for _ in 0..NUM_REPLIES_PER_NOTE {
            let parent = *ids
                .choose(&mut rand::thread_rng())
                .context("no comment to reply to")?;
            let c = pick()?
                .create_reply(parent, &gen_comment_text())
                .await
                .with_context(|| format!("replying to comment {parent}"))?;
            ids.push(c.id);
        }
        println!("note {note}: created {} comments", ids.len());
    }

    Ok(())
}
