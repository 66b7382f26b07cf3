//! Markdown rendering of API results
//!
//! - User-written text is blockquoted (`> `)
//! - Timestamps are ISO 8601 without fractional seconds
//! - Stats are only shown when non-zero

use crate::api::schemas::{Article, ArticlesDto, Comment, Profile, User};
use crate::session::Session;
use chrono::{DateTime, Utc};

pub fn blockquote_content(text: &str) -> String {
    if text.is_empty() {
        return "> ".to_string();
    }

    text.lines()
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn format_tags(tags: &[String]) -> String {
    tags.iter().map(|tag| format!("`#{}`", tag)).collect::<Vec<_>>().join(" ")
}

pub fn format_user(user: &User) -> String {
    let mut out = format!("# @{}\n\n**Email:** {}\n", user.username, user.email);
    if !user.bio.is_empty() {
        out.push('\n');
        out.push_str(&blockquote_content(&user.bio));
        out.push('\n');
    }
    if !user.image.is_empty() {
        out.push_str(&format!("\n![avatar]({})\n", user.image));
    }
    out
}

pub fn format_session(session: &Session) -> String {
    let mut out = format!("Logged in as **@{}** ({})\n", session.username, session.email);
    match session.token_expires_at() {
        Some(expires_at) if session.is_expired() => {
            out.push_str(&format!(
                "\nAccess token expired at {}; it is refreshed on the next request.\n",
                format_timestamp(&expires_at)
            ));
        }
        Some(expires_at) => {
            out.push_str(&format!("\nAccess token valid until {}\n", format_timestamp(&expires_at)));
        }
        None => {}
    }
    out
}

pub fn format_profile(profile: &Profile) -> String {
    let mut out = format!("# @{}\n", profile.username);
    if profile.following {
        out.push_str("\n*Following*\n");
    }
    if !profile.bio.is_empty() {
        out.push('\n');
        out.push_str(&blockquote_content(&profile.bio));
        out.push('\n');
    }
    if !profile.image.is_empty() {
        out.push_str(&format!("\n![avatar]({})\n", profile.image));
    }
    out
}

fn format_article_meta(article: &Article) -> String {
    let mut meta = format!(
        "by @{} · {}",
        article.author.username,
        format_timestamp(&article.created_at)
    );
    if article.favorites_count > 0 {
        meta.push_str(&format!(" · ♥ {}", article.favorites_count));
    }
    if article.favorited {
        meta.push_str(" · *favorited*");
    }
    meta
}

pub fn format_article(article: &Article) -> String {
    let mut out = format!(
        "# {}\n\n{}\n\n`{}`\n\n{}\n",
        article.title,
        format_article_meta(article),
        article.slug,
        blockquote_content(&article.description)
    );
    if !article.tags.is_empty() {
        out.push_str(&format!("\n{}\n", format_tags(&article.tags)));
    }
    out.push_str(&format!("\n---\n\n{}\n", article.body.trim_end()));
    if article.updated_at != article.created_at {
        out.push_str(&format!("\n*Updated {}*\n", format_timestamp(&article.updated_at)));
    }
    out
}

pub fn format_articles(page: &ArticlesDto, offset: u32) -> String {
    if page.articles.is_empty() {
        return "No articles are here... yet.\n".to_string();
    }

    let shown_to = offset as u64 + page.articles.len() as u64;
    let mut out = format!(
        "# Articles {}-{} of {}\n",
        offset as u64 + 1,
        shown_to,
        page.articles_count
    );
    for article in &page.articles {
        out.push_str(&format!(
            "\n## {}\n\n`{}` {}\n\n{}\n",
            article.title,
            article.slug,
            format_article_meta(article),
            blockquote_content(&article.description)
        ));
        if !article.tags.is_empty() {
            out.push_str(&format!("\n{}\n", format_tags(&article.tags)));
        }
    }
    out
}

pub fn format_comment(comment: &Comment) -> String {
    format!(
        "**@{}** · {} · id `{}`\n\n{}\n",
        comment.author.username,
        format_timestamp(&comment.created_at),
        comment.id,
        blockquote_content(&comment.body)
    )
}

pub fn format_comments(comments: &[Comment]) -> String {
    if comments.is_empty() {
        return "No comments yet.\n".to_string();
    }
    comments
        .iter()
        .map(format_comment)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_tag_list(tags: &[String]) -> String {
    if tags.is_empty() {
        return "No tags are here... yet.\n".to_string();
    }
    format!("# Popular tags\n\n{}\n", format_tags(tags))
}
