//! Article commands

use crate::api::schemas::{FilterQuery, NewArticle, UpdateArticle};
use crate::app::Conduit;
use crate::cli::{ArticlesArgs, EditArgs, PublishArgs, SlugArgs};
use crate::commands::format::{format_article, format_articles};
use crate::error::AppError;
use crate::permission::{ensure, Action, Context};
use tracing::debug;

pub async fn execute_articles(conduit: &Conduit, args: ArticlesArgs) -> Result<String, AppError> {
    let page = if args.feed {
        if conduit.session().is_none() {
            return Err(AppError::PermissionDenied("log in to see your feed".to_string()));
        }
        conduit.api().feed(args.limit, args.offset).await?
    } else {
        let filter = FilterQuery {
            limit: args.limit,
            offset: args.offset,
            tag: args.tag,
            author: args.author,
            favorited: args.favorited,
        };
        debug!(?filter, "Listing articles");
        conduit.api().articles(&filter).await?
    };
    Ok(format_articles(&page, args.offset))
}

pub async fn execute_article(conduit: &Conduit, args: SlugArgs) -> Result<String, AppError> {
    let article = conduit.api().article(&args.slug).await?;
    Ok(format_article(&article))
}

pub async fn execute_publish(conduit: &Conduit, args: PublishArgs) -> Result<String, AppError> {
    ensure(conduit.session().as_ref(), Action::CreateArticle, None)?;

    let article = conduit
        .api()
        .create_article(NewArticle {
            title: args.title,
            description: args.description,
            body: args.body,
            tag_list: args.tags,
        })
        .await?;
    conduit.navigator().visit(crate::routes::article(&article.slug));
    Ok(format!("Published.\n\n{}", format_article(&article)))
}

pub async fn execute_edit(conduit: &Conduit, args: EditArgs) -> Result<String, AppError> {
    let update = UpdateArticle {
        title: args.title,
        description: args.description,
        body: args.body,
        tag_list: args.tags,
    };
    if update.is_empty() {
        return Err(AppError::InvalidInput("nothing to change; pass --title, --description, --body or --tag".to_string()));
    }

    let current = conduit.api().article(&args.slug).await?;
    let context = Context::Article { author: &current.author.username };
    ensure(conduit.session().as_ref(), Action::UpdateArticle, Some(&context))?;

    let article = conduit.api().update_article(&args.slug, update).await?;
    Ok(format!("Updated.\n\n{}", format_article(&article)))
}

pub async fn execute_delete(conduit: &Conduit, args: SlugArgs) -> Result<String, AppError> {
    let current = conduit.api().article(&args.slug).await?;
    let context = Context::Article { author: &current.author.username };
    ensure(conduit.session().as_ref(), Action::DeleteArticle, Some(&context))?;

    conduit.api().delete_article(&args.slug).await?;
    Ok(format!("Deleted `{}`.\n", args.slug))
}

pub async fn execute_favorite(conduit: &Conduit, args: SlugArgs) -> Result<String, AppError> {
    ensure(conduit.session().as_ref(), Action::LikeArticle, None)?;
    let article = conduit.api().favorite(&args.slug).await?;
    Ok(format!("Favorited `{}` (♥ {}).\n", article.slug, article.favorites_count))
}

pub async fn execute_unfavorite(conduit: &Conduit, args: SlugArgs) -> Result<String, AppError> {
    ensure(conduit.session().as_ref(), Action::DislikeArticle, None)?;
    let article = conduit.api().unfavorite(&args.slug).await?;
    Ok(format!("Removed `{}` from favorites (♥ {}).\n", article.slug, article.favorites_count))
}

pub async fn execute_tags(conduit: &Conduit) -> Result<String, AppError> {
    let tags = conduit.api().tags().await?;
    Ok(crate::commands::format::format_tag_list(&tags))
}
