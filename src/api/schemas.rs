//! Request and response bodies of the Conduit API
//!
//! Nullable fields are collapsed to their empty value on the way in, so the
//! rest of the crate never deals with `Option<String>` for a bio.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    pub token: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bio: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDto {
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginUser {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginUserDto {
    pub user: LoginUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterUserDto {
    pub user: RegisterUser,
}

/// Partial user update; unset fields are left untouched by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.bio.is_none()
            && self.image.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateUserDto {
    pub user: UpdateUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedToken {
    pub token: String,
}

/// Body of `POST /users/refresh`
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponseDto {
    pub user: RefreshedToken,
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bio: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
    /// Absent on embedded article authors
    #[serde(default)]
    pub following: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDto {
    pub profile: Profile,
}

// ---------------------------------------------------------------------------
// Articles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub favorited: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub favorites_count: u64,
    #[serde(default, alias = "tagList", deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    pub author: Profile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArticleDto {
    pub article: Article,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesDto {
    pub articles: Vec<Article>,
    #[serde(default)]
    pub articles_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub title: String,
    pub description: String,
    pub body: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateArticleDto {
    pub article: NewArticle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_list: Option<Vec<String>>,
}

impl UpdateArticle {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.body.is_none() && self.tag_list.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateArticleDto {
    pub article: UpdateArticle,
}

/// Article list filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterQuery {
    pub limit: u32,
    pub offset: u32,
    pub tag: Option<String>,
    pub author: Option<String>,
    pub favorited: Option<String>,
}

impl Default for FilterQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            tag: None,
            author: None,
            favorited: None,
        }
    }
}

impl FilterQuery {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![
            ("limit".to_string(), self.limit.to_string()),
            ("offset".to_string(), self.offset.to_string()),
        ];
        let optional = [("tag", &self.tag), ("author", &self.author), ("favorited", &self.favorited)];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                query.push((key.to_string(), value.to_string()));
            }
        }
        query
    }
}

// ---------------------------------------------------------------------------
// Comments and tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub author: Profile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentDto {
    pub comment: Comment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentsDto {
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCommentDto {
    pub comment: NewComment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagsDto {
    pub tags: Vec<String>,
}
