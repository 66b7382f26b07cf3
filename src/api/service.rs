//! Typed calls against the Conduit REST API

use crate::api::client::{ApiClient, RequestConfig};
use crate::api::endpoints;
use crate::api::schemas::{
    Article, ArticleDto, ArticlesDto, Comment, CommentDto, CommentsDto, CreateArticleDto,
    CreateCommentDto, FilterQuery, LoginUser, LoginUserDto, NewArticle, NewComment, Profile,
    ProfileDto, RefreshResponseDto, RegisterUser, RegisterUserDto, TagsDto, UpdateArticle,
    UpdateArticleDto, UpdateUser, UpdateUserDto, User, UserDto,
};
use crate::error::{require_non_empty, AppError};
use crate::session::{Session, SessionRepository};
use std::sync::Arc;
use tracing::info;

const MIN_PASSWORD_LEN: usize = 8;

/// Conduit API bound to an authenticated and an anonymous client
pub struct ConduitApi {
    private: ApiClient,
    public: ApiClient,
    sessions: Arc<dyn SessionRepository>,
}

impl ConduitApi {
    pub fn new(private: ApiClient, public: ApiClient, sessions: Arc<dyn SessionRepository>) -> Self {
        Self {
            private,
            public,
            sessions,
        }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionRepository> {
        &self.sessions
    }

    // -- Users --------------------------------------------------------------

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User, AppError> {
        require_non_empty("username", username)?;
        require_non_empty("email", email)?;
        require_non_empty("password", password)?;

        let body = RegisterUserDto {
            user: RegisterUser {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            },
        };
        let dto: UserDto = self
            .private
            .request(RequestConfig::post(endpoints::REGISTER).json(&body)?)
            .await?;
        self.start_session(dto.user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidInput(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let body = LoginUserDto {
            user: LoginUser {
                email: email.to_string(),
                password: password.to_string(),
            },
        };
        let dto: UserDto = self
            .private
            .request(RequestConfig::post(endpoints::LOGIN).json(&body)?)
            .await?;
        self.start_session(dto.user)
    }

    pub async fn current_user(&self) -> Result<User, AppError> {
        let dto: UserDto = self.private.request(RequestConfig::get(endpoints::CURRENT_USER)).await?;
        Ok(dto.user)
    }

    pub async fn update_user(&self, update: UpdateUser) -> Result<User, AppError> {
        if update.is_empty() {
            return Err(AppError::InvalidInput("at least one field must be provided".to_string()));
        }
        if let Some(email) = &update.email {
            validate_email(email)?;
        }

        let body = UpdateUserDto { user: update };
        let dto: UserDto = self
            .private
            .request(RequestConfig::put(endpoints::CURRENT_USER).json(&body)?)
            .await?;
        self.start_session(dto.user)
    }

    /// Exchange the refresh cookie for a new access token
    pub async fn refresh_access_token(&self) -> Result<String, AppError> {
        let dto: RefreshResponseDto = self.private.request(RequestConfig::post(endpoints::REFRESH)).await?;
        Ok(dto.user.token)
    }

    fn start_session(&self, user: User) -> Result<User, AppError> {
        info!(username = %user.username, "Session started");
        self.sessions.set(Session::from(user.clone()))?;
        Ok(user)
    }

    // -- Profiles -----------------------------------------------------------

    pub async fn profile(&self, username: &str) -> Result<Profile, AppError> {
        require_non_empty("username", username)?;
        let dto: ProfileDto = self.private.request(RequestConfig::get(endpoints::profile(username))).await?;
        Ok(dto.profile)
    }

    pub async fn follow(&self, username: &str) -> Result<Profile, AppError> {
        require_non_empty("username", username)?;
        let dto: ProfileDto = self.private.request(RequestConfig::post(endpoints::follow(username))).await?;
        Ok(dto.profile)
    }

    pub async fn unfollow(&self, username: &str) -> Result<Profile, AppError> {
        require_non_empty("username", username)?;
        let dto: ProfileDto = self
            .private
            .request(RequestConfig::delete(endpoints::follow(username)))
            .await?;
        Ok(dto.profile)
    }

    // -- Articles -----------------------------------------------------------

    pub async fn articles(&self, filter: &FilterQuery) -> Result<ArticlesDto, AppError> {
        self.private
            .request(RequestConfig::get(endpoints::ARTICLES).query_pairs(filter.to_query()))
            .await
    }

    pub async fn feed(&self, limit: u32, offset: u32) -> Result<ArticlesDto, AppError> {
        let query = vec![
            ("limit".to_string(), limit.to_string()),
            ("offset".to_string(), offset.to_string()),
        ];
        self.private
            .request(RequestConfig::get(endpoints::FEED).query_pairs(query))
            .await
    }

    pub async fn article(&self, slug: &str) -> Result<Article, AppError> {
        require_non_empty("slug", slug)?;
        let dto: ArticleDto = self.private.request(RequestConfig::get(endpoints::article(slug))).await?;
        Ok(dto.article)
    }

    pub async fn create_article(&self, article: NewArticle) -> Result<Article, AppError> {
        require_non_empty("title", &article.title)?;
        require_non_empty("description", &article.description)?;
        require_non_empty("body", &article.body)?;

        let body = CreateArticleDto { article };
        let dto: ArticleDto = self
            .private
            .request(RequestConfig::post(endpoints::ARTICLES).json(&body)?)
            .await?;
        Ok(dto.article)
    }

    pub async fn update_article(&self, slug: &str, update: UpdateArticle) -> Result<Article, AppError> {
        require_non_empty("slug", slug)?;
        if update.is_empty() {
            return Err(AppError::InvalidInput("at least one field must be provided".to_string()));
        }
        for (field, value) in [
            ("title", &update.title),
            ("description", &update.description),
            ("body", &update.body),
        ] {
            if let Some(value) = value {
                require_non_empty(field, value)?;
            }
        }

        let body = UpdateArticleDto { article: update };
        let dto: ArticleDto = self
            .private
            .request(RequestConfig::put(endpoints::article(slug)).json(&body)?)
            .await?;
        Ok(dto.article)
    }

    pub async fn delete_article(&self, slug: &str) -> Result<(), AppError> {
        require_non_empty("slug", slug)?;
        self.private
            .request_empty(RequestConfig::delete(endpoints::article(slug)))
            .await
    }

    pub async fn favorite(&self, slug: &str) -> Result<Article, AppError> {
        require_non_empty("slug", slug)?;
        let dto: ArticleDto = self.private.request(RequestConfig::post(endpoints::favorite(slug))).await?;
        Ok(dto.article)
    }

    pub async fn unfavorite(&self, slug: &str) -> Result<Article, AppError> {
        require_non_empty("slug", slug)?;
        let dto: ArticleDto = self
            .private
            .request(RequestConfig::delete(endpoints::favorite(slug)))
            .await?;
        Ok(dto.article)
    }

    // -- Comments -----------------------------------------------------------

    pub async fn comments(&self, slug: &str) -> Result<Vec<Comment>, AppError> {
        require_non_empty("slug", slug)?;
        let dto: CommentsDto = self.private.request(RequestConfig::get(endpoints::comments(slug))).await?;
        Ok(dto.comments)
    }

    pub async fn create_comment(&self, slug: &str, body: &str) -> Result<Comment, AppError> {
        require_non_empty("slug", slug)?;
        require_non_empty("body", body)?;

        let payload = CreateCommentDto {
            comment: NewComment { body: body.to_string() },
        };
        let dto: CommentDto = self
            .private
            .request(RequestConfig::post(endpoints::comments(slug)).json(&payload)?)
            .await?;
        Ok(dto.comment)
    }

    pub async fn delete_comment(&self, slug: &str, id: &str) -> Result<(), AppError> {
        require_non_empty("slug", slug)?;
        require_non_empty("id", id)?;
        self.private
            .request_empty(RequestConfig::delete(endpoints::comment(slug, id)))
            .await
    }

    // -- Tags ---------------------------------------------------------------

    pub async fn tags(&self) -> Result<Vec<String>, AppError> {
        let dto: TagsDto = self.public.request(RequestConfig::get(endpoints::TAGS)).await?;
        Ok(dto.tags)
    }
}

fn validate_email(email: &str) -> Result<(), AppError> {
    require_non_empty("email", email)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::InvalidInput(format!("'{}' is not a valid email address", email))),
    }
}
