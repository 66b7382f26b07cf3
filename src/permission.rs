//! What the current session may do
//!
//! Permissions are fixed tables per role. The role depends on whether a
//! session exists and whether it owns the resource being acted on.

use crate::error::AppError;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Guest,
    User,
    Author,
    Commenter,
    Owner,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArticlePermissions {
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
    pub like: bool,
    pub dislike: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfilePermissions {
    pub follow: bool,
    pub unfollow: bool,
    pub update: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommentPermissions {
    pub create: bool,
    pub read: bool,
    pub delete: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionGroup {
    pub article: ArticlePermissions,
    pub profile: ProfilePermissions,
    pub comment: CommentPermissions,
}

const GUEST: PermissionGroup = PermissionGroup {
    article: ArticlePermissions {
        create: false,
        read: true,
        update: false,
        delete: false,
        like: false,
        dislike: false,
    },
    profile: ProfilePermissions {
        follow: false,
        unfollow: false,
        update: false,
    },
    comment: CommentPermissions {
        create: false,
        read: false,
        delete: false,
    },
};

const USER: PermissionGroup = PermissionGroup {
    article: ArticlePermissions {
        create: true,
        like: true,
        dislike: true,
        ..GUEST.article
    },
    profile: ProfilePermissions {
        follow: true,
        unfollow: true,
        ..GUEST.profile
    },
    comment: CommentPermissions {
        create: true,
        read: true,
        ..GUEST.comment
    },
};

const AUTHOR: PermissionGroup = PermissionGroup {
    article: ArticlePermissions {
        update: true,
        delete: true,
        ..USER.article
    },
    ..USER
};

const COMMENTER: PermissionGroup = PermissionGroup {
    comment: CommentPermissions {
        delete: true,
        ..USER.comment
    },
    ..USER
};

const OWNER: PermissionGroup = PermissionGroup {
    profile: ProfilePermissions {
        update: true,
        ..USER.profile
    },
    ..USER
};

impl Role {
    pub fn permissions(self) -> PermissionGroup {
        match self {
            Role::Guest => GUEST,
            Role::User => USER,
            Role::Author => AUTHOR,
            Role::Commenter => COMMENTER,
            Role::Owner => OWNER,
        }
    }
}

/// The resource an action targets, identified by who owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context<'a> {
    Article { author: &'a str },
    Comment { author: &'a str },
    Profile { owner: &'a str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateArticle,
    ReadArticle,
    UpdateArticle,
    DeleteArticle,
    LikeArticle,
    DislikeArticle,
    FollowProfile,
    UnfollowProfile,
    UpdateProfile,
    CreateComment,
    ReadComment,
    DeleteComment,
}

impl Action {
    fn allowed_by(self, group: &PermissionGroup) -> bool {
        match self {
            Action::CreateArticle => group.article.create,
            Action::ReadArticle => group.article.read,
            Action::UpdateArticle => group.article.update,
            Action::DeleteArticle => group.article.delete,
            Action::LikeArticle => group.article.like,
            Action::DislikeArticle => group.article.dislike,
            Action::FollowProfile => group.profile.follow,
            Action::UnfollowProfile => group.profile.unfollow,
            Action::UpdateProfile => group.profile.update,
            Action::CreateComment => group.comment.create,
            Action::ReadComment => group.comment.read,
            Action::DeleteComment => group.comment.delete,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Action::CreateArticle => "create articles",
            Action::ReadArticle => "read articles",
            Action::UpdateArticle => "edit this article",
            Action::DeleteArticle => "delete this article",
            Action::LikeArticle => "favorite articles",
            Action::DislikeArticle => "unfavorite articles",
            Action::FollowProfile => "follow profiles",
            Action::UnfollowProfile => "unfollow profiles",
            Action::UpdateProfile => "update this profile",
            Action::CreateComment => "post comments",
            Action::ReadComment => "read comments",
            Action::DeleteComment => "delete this comment",
        }
    }
}

pub fn role_for(session: Option<&Session>, context: Option<&Context<'_>>) -> Role {
    let Some(session) = session else {
        return Role::Guest;
    };
    let Some(context) = context else {
        return Role::User;
    };

    match context {
        Context::Article { author } if *author == session.username => Role::Author,
        Context::Comment { author } if *author == session.username => Role::Commenter,
        Context::Profile { owner } if *owner == session.username => Role::Owner,
        _ => Role::User,
    }
}

pub fn can_perform(session: Option<&Session>, action: Action, context: Option<&Context<'_>>) -> bool {
    action.allowed_by(&role_for(session, context).permissions())
}

/// Like [`can_perform`], failing with `PermissionDenied`
pub fn ensure(session: Option<&Session>, action: Action, context: Option<&Context<'_>>) -> Result<(), AppError> {
    if can_perform(session, action, context) {
        return Ok(());
    }
    let hint = if session.is_none() { " (log in first)" } else { "" };
    Err(AppError::PermissionDenied(format!(
        "you are not allowed to {}{}",
        action.describe(),
        hint
    )))
}
