//! Profile commands

use crate::app::Conduit;
use crate::cli::UserArgs;
use crate::commands::format::format_profile;
use crate::error::AppError;
use crate::permission::{ensure, Action};

pub async fn execute_profile(conduit: &Conduit, args: UserArgs) -> Result<String, AppError> {
    let profile = conduit.api().profile(&args.username).await?;
    Ok(format_profile(&profile))
}

pub async fn execute_follow(conduit: &Conduit, args: UserArgs) -> Result<String, AppError> {
    ensure(conduit.session().as_ref(), Action::FollowProfile, None)?;
    let profile = conduit.api().follow(&args.username).await?;
    Ok(format!("Following **@{}**.\n", profile.username))
}

pub async fn execute_unfollow(conduit: &Conduit, args: UserArgs) -> Result<String, AppError> {
    ensure(conduit.session().as_ref(), Action::UnfollowProfile, None)?;
    let profile = conduit.api().unfollow(&args.username).await?;
    Ok(format!("No longer following **@{}**.\n", profile.username))
}
