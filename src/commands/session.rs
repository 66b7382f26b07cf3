//! Account and session commands

use crate::api::schemas::UpdateUser;
use crate::app::Conduit;
use crate::cli::{LoginArgs, RegisterArgs, SettingsArgs};
use crate::commands::format::{format_session, format_user};
use crate::commands::prompt_secret;
use crate::error::AppError;
use crate::permission::{ensure, Action, Context};
use tracing::info;

pub async fn execute_login(conduit: &Conduit, args: LoginArgs) -> Result<String, AppError> {
    let password = match args.password {
        Some(password) => password,
        None => prompt_secret("Password: ")?,
    };
    let user = conduit.api().login(&args.email, &password).await?;
    info!("Logged in as {}", user.username);
    Ok(format!("Logged in as **@{}**\n", user.username))
}

pub async fn execute_register(conduit: &Conduit, args: RegisterArgs) -> Result<String, AppError> {
    let password = match args.password {
        Some(password) => password,
        None => prompt_secret("Password: ")?,
    };
    let user = conduit
        .api()
        .register(&args.username, &args.email, &password)
        .await?;
    Ok(format!("Welcome, **@{}**! You are now logged in.\n", user.username))
}

pub fn execute_logout(conduit: &Conduit) -> Result<String, AppError> {
    let was_logged_in = conduit.session().is_some();
    conduit.logout()?;
    Ok(if was_logged_in {
        "Logged out.\n".to_string()
    } else {
        "Not logged in.\n".to_string()
    })
}

pub async fn execute_whoami(conduit: &Conduit) -> Result<String, AppError> {
    if conduit.session().is_none() {
        return Ok("Not logged in.\n".to_string());
    }
    let user = conduit.api().current_user().await?;
    let mut out = format_user(&user);
    // The request may have refreshed the token
    if let Some(session) = conduit.session() {
        out.push('\n');
        out.push_str(&format_session(&session));
    }
    Ok(out)
}

pub async fn execute_refresh(conduit: &Conduit) -> Result<String, AppError> {
    conduit.tokens().refresh().await?;
    Ok(match conduit.session() {
        Some(session) => format!("Access token refreshed.\n\n{}", format_session(&session)),
        None => "Access token refreshed (no stored session to update).\n".to_string(),
    })
}

pub async fn execute_settings(conduit: &Conduit, args: SettingsArgs) -> Result<String, AppError> {
    let session = conduit.session();
    let owner = session.as_ref().map(|s| s.username.clone()).unwrap_or_default();
    ensure(session.as_ref(), Action::UpdateProfile, Some(&Context::Profile { owner: &owner }))?;

    let update = UpdateUser {
        username: args.username,
        email: args.email,
        password: args.password,
        bio: args.bio,
        image: args.image,
    };
    let user = conduit.api().update_user(update).await?;
    Ok(format!("Settings updated.\n\n{}", format_user(&user)))
}
