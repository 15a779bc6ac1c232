use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use colloquy_client::api::Role;
use colloquy_mock_server::{app, MockServer};
use parking_lot::Mutex;

#[derive(structopt::StructOpt)]
struct Opt {
    /// Address to listen on
    #[structopt(short, long, default_value = "127.0.0.1:8000")]
    listen: SocketAddr,

    /// Number of notes to create at startup
    #[structopt(long, default_value = "1")]
    notes: usize,

    /// Users to create at startup, as `name:role`
    #[structopt(long, default_value = "admin:admin")]
    user: Vec<String>,
}

fn parse_user(arg: &str) -> anyhow::Result<(String, Role)> {
    let (name, role) = arg
        .split_once(':')
        .with_context(|| format!("user {arg:?} is not of the form name:role"))?;
    let role = role
        .parse::<Role>()
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("parsing role of user {name:?}"))?;
    Ok((name.to_string(), role))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let mut server = MockServer::new();
    for arg in &opt.user {
        let (name, role) = parse_user(arg)?;
        let (id, creds) = server
            .admin_create_user(name.clone(), role)
            .with_context(|| format!("creating user {name:?}"))?;
        println!(
            "user {id} {name} ({role}): COLLOQUY_SESSION={} COLLOQUY_CSRF={}",
            creds.session_id, creds.csrf_token
        );
    }
    for _ in 0..opt.notes {
        println!("note {}", server.admin_create_note());
    }

    let app = app(Arc::new(Mutex::new(server)));
    tracing::info!("listening on {}", opt.listen);
    axum::Server::bind(&opt.listen)
        .serve(app.into_make_service())
        .await
        .context("serving axum webserver")
}
