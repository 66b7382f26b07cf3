//! Application locations, used as navigation targets and return paths

pub const ROOT: &str = "/";
pub const HOME: &str = "/";
pub const LOGIN: &str = "/login/";
pub const REGISTER: &str = "/register/";
pub const SETTINGS: &str = "/settings/";
pub const EDITOR: &str = "/editor/";

pub fn article(slug: &str) -> String {
    format!("/article/{}", slug)
}

pub fn profile(username: &str) -> String {
    format!("/profile/{}", username)
}

pub fn profile_favorites(username: &str) -> String {
    format!("/profile/{}/favorites/", username)
}

pub fn editor(slug: &str) -> String {
    format!("/editor/{}", slug)
}

/// Login location that returns to `current` afterwards
pub fn login_with_redirect(current: &str) -> String {
    format!("{}?redirect={}", LOGIN, urlencoding::encode(current))
}

/// The `redirect` parameter of a login location, decoded
pub fn redirect_target(location: &str) -> Option<String> {
    let (_, query) = location.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "redirect")
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
}
