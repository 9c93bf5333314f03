// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `folio` subcommands. Each one opens the persisted session, performs one
//! action and prints the result as JSON on stdout.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::context::SessionContext;
use crate::http::envelope::Envelope;
use crate::storage::FileStorage;

#[derive(Debug, Clone, clap::Subcommand)]
pub enum Command {
    /// Sign in and persist the session.
    Login {
        username: String,
        #[arg(long, env = "FOLIO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in.
    Register {
        username: String,
        email: String,
        #[arg(long, env = "FOLIO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and clear the local session.
    Logout,
    /// Show the signed-in user, revalidated against the backend.
    Whoami,
    /// Exchange the refresh token for a new access token.
    Refresh,
    /// Show the local session without contacting the backend.
    Status,
    /// Authenticated `GET` of an API path.
    Get {
        path: String,
        /// Print the response as returned instead of unwrapping the envelope.
        #[arg(long)]
        raw: bool,
    },
}

pub async fn run(config: &ClientConfig, command: Command) -> anyhow::Result<()> {
    let storage = Arc::new(FileStorage::open(config.session_file()));
    tracing::debug!(path = %storage.path().display(), "opened session storage");

    let ctx = SessionContext::create(config, storage)?;
    let result = dispatch(&ctx, command).await;
    ctx.dispose().await;
    result
}

async fn dispatch(ctx: &SessionContext, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { username, password } => {
            let user = ctx.controller.login(&username, &password).await?;
            print_json(&user)
        }
        Command::Register { username, email, password } => {
            let user = ctx.controller.register(&username, &email, &password).await?;
            print_json(&user)
        }
        Command::Logout => {
            ctx.controller.logout().await;
            print_json(&ctx.controller.view())
        }
        Command::Whoami => {
            let view = ctx.controller.initialize().await;
            if !view.is_authenticated() {
                anyhow::bail!("not signed in");
            }
            print_json(&view)
        }
        Command::Refresh => {
            ctx.controller.refresh().await?;
            print_json(&ctx.store.status())
        }
        Command::Status => print_json(&ctx.store.status()),
        Command::Get { path, raw } => {
            if raw {
                let body: Value = ctx.http.get(&path).await?;
                print_json(&body)
            } else {
                let envelope: Envelope<Value> = ctx.http.get(&path).await?;
                print_json(&envelope.into_result()?)
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
