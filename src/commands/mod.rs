//! CLI command implementations; each returns Markdown for stdout

pub mod article;
pub mod comment;
pub mod format;
pub mod profile;
pub mod session;

use crate::app::Conduit;
use crate::cli::Commands;
use crate::error::AppError;
use std::io::{self, BufRead, IsTerminal};

/// Run one command against a connected client
pub async fn execute(conduit: &Conduit, command: Commands) -> Result<String, AppError> {
    conduit.navigator().visit(command.route());

    match command {
        Commands::Login(args) => session::execute_login(conduit, args).await,
        Commands::Register(args) => session::execute_register(conduit, args).await,
        Commands::Logout => session::execute_logout(conduit),
        Commands::Whoami => session::execute_whoami(conduit).await,
        Commands::Refresh => session::execute_refresh(conduit).await,
        Commands::Settings(args) => session::execute_settings(conduit, args).await,
        Commands::Articles(args) => article::execute_articles(conduit, args).await,
        Commands::Article(args) => article::execute_article(conduit, args).await,
        Commands::Publish(args) => article::execute_publish(conduit, args).await,
        Commands::Edit(args) => article::execute_edit(conduit, args).await,
        Commands::Delete(args) => article::execute_delete(conduit, args).await,
        Commands::Favorite(args) => article::execute_favorite(conduit, args).await,
        Commands::Unfavorite(args) => article::execute_unfavorite(conduit, args).await,
        Commands::Tags => article::execute_tags(conduit).await,
        Commands::Comments(args) => comment::execute_comments(conduit, args).await,
        Commands::Comment(args) => comment::execute_comment(conduit, args).await,
        Commands::Uncomment(args) => comment::execute_uncomment(conduit, args).await,
        Commands::Profile(args) => profile::execute_profile(conduit, args).await,
        Commands::Follow(args) => profile::execute_follow(conduit, args).await,
        Commands::Unfollow(args) => profile::execute_unfollow(conduit, args).await,
    }
}

/// Ask for a password without echoing it. Piped stdin is read as one line
/// so scripts can still supply the password.
pub(crate) fn prompt_secret(prompt: &str) -> Result<String, AppError> {
    if !io::stdin().is_terminal() {
        return read_secret(io::stdin().lock());
    }
    let value = rpassword::prompt_password(prompt)
        .map_err(|e| AppError::InvalidInput(format!("Failed to read password: {}", e)))?;
    require_secret(value)
}

fn read_secret(mut reader: impl BufRead) -> Result<String, AppError> {
    let mut input = String::new();
    reader.read_line(&mut input)?;
    require_secret(input.trim_end_matches(['\r', '\n']).to_string())
}

fn require_secret(value: String) -> Result<String, AppError> {
    if value.is_empty() {
        return Err(AppError::InvalidInput("password is required".to_string()));
    }
    Ok(value)
}
