//! Comment commands

use crate::app::Conduit;
use crate::cli::{CommentArgs, SlugArgs, UncommentArgs};
use crate::commands::format::{format_comment, format_comments};
use crate::error::AppError;
use crate::permission::{ensure, Action, Context};

pub async fn execute_comments(conduit: &Conduit, args: SlugArgs) -> Result<String, AppError> {
    ensure(conduit.session().as_ref(), Action::ReadComment, None)?;
    let comments = conduit.api().comments(&args.slug).await?;
    Ok(format_comments(&comments))
}

pub async fn execute_comment(conduit: &Conduit, args: CommentArgs) -> Result<String, AppError> {
    ensure(conduit.session().as_ref(), Action::CreateComment, None)?;
    let comment = conduit.api().create_comment(&args.slug, &args.body).await?;
    Ok(format!("Comment posted.\n\n{}", format_comment(&comment)))
}

pub async fn execute_uncomment(conduit: &Conduit, args: UncommentArgs) -> Result<String, AppError> {
    let session = conduit.session();
    ensure(session.as_ref(), Action::ReadComment, None)?;

    let comments = conduit.api().comments(&args.slug).await?;
    let comment = comments
        .iter()
        .find(|comment| comment.id == args.id)
        .ok_or_else(|| AppError::NotFound(format!("comment {} on {}", args.id, args.slug)))?;
    let context = Context::Comment { author: &comment.author.username };
    ensure(session.as_ref(), Action::DeleteComment, Some(&context))?;

    conduit.api().delete_comment(&args.slug, &args.id).await?;
    Ok(format!("Deleted comment `{}`.\n", args.id))
}
