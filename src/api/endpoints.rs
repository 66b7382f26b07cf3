//! REST paths of the Conduit backend, relative to the API base URL

pub const LOGIN: &str = "/users/login";
pub const REGISTER: &str = "/users";
pub const REFRESH: &str = "/users/refresh";
pub const CURRENT_USER: &str = "/user";
pub const ARTICLES: &str = "/articles";
pub const FEED: &str = "/articles/feed";
pub const TAGS: &str = "/tags";

/// Paths whose 401 means the submitted credentials were wrong
const CREDENTIAL_EXCHANGES: &[&str] = &["users/login", "users/register", "users"];
const REFRESH_PATH: &str = "users/refresh";

pub fn profile(username: &str) -> String {
    format!("/profiles/{}", urlencoding::encode(username))
}

pub fn follow(username: &str) -> String {
    format!("{}/follow", profile(username))
}

pub fn article(slug: &str) -> String {
    format!("{}/{}", ARTICLES, urlencoding::encode(slug))
}

pub fn favorite(slug: &str) -> String {
    format!("{}/favorite", article(slug))
}

pub fn comments(slug: &str) -> String {
    format!("{}/comments", article(slug))
}

pub fn comment(slug: &str, id: &str) -> String {
    format!("{}/{}", comments(slug), urlencoding::encode(id))
}

/// Path without query string or surrounding slashes
pub fn normalize(path: &str) -> &str {
    let without_query = path.split(['?', '#']).next().unwrap_or_default();
    without_query.trim_matches('/')
}

pub fn is_credential_exchange(path: &str) -> bool {
    CREDENTIAL_EXCHANGES.contains(&normalize(path))
}

pub fn is_refresh(path: &str) -> bool {
    normalize(path) == REFRESH_PATH
}
