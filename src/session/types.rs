//! The authenticated identity

use crate::api::schemas::User;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated user together with the current access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub image: String,
    /// Current access token
    pub token: String,
}

impl Session {
    /// Same identity, new access token
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            token: token.to_string(),
            ..self.clone()
        }
    }

    /// Expiry read from the token's `exp` claim.
    ///
    /// The signature is not verified; this is for display and scheduling only.
    pub fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        let payload = self.token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        let exp = claims.get("exp")?.as_i64()?;
        DateTime::from_timestamp(exp, 0)
    }

    /// True when the token's expiry is known and already passed
    pub fn is_expired(&self) -> bool {
        self.token_expires_at()
            .map(|expires_at| expires_at <= Utc::now())
            .unwrap_or(false)
    }
}

impl From<User> for Session {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            bio: user.bio,
            image: user.image,
            token: user.token,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_session(token: &str) -> Session {
    Session {
        username: "jake".to_string(),
        email: "jake@jake.jake".to_string(),
        bio: "I work at statefarm".to_string(),
        image: String::new(),
        token: token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"jake","exp":{}}}"#, exp));
        format!("{}.{}.signature", header, claims)
    }

    #[test]
    fn test_with_token_keeps_identity() {
        let session = test_session("old");
        let refreshed = session.with_token("new");
        assert_eq!(refreshed.token, "new");
        assert_eq!(refreshed.username, session.username);
        assert_eq!(refreshed.email, session.email);
        assert_eq!(refreshed.bio, session.bio);
    }

    #[test]
    fn test_token_expiry_from_claims() {
        let exp = Utc::now().timestamp() + 3600;
        let session = test_session(&jwt_with_exp(exp));
        let expires_at = session.token_expires_at().expect("exp claim");
        assert_eq!(expires_at.timestamp(), exp);
        assert!(!session.is_expired());
    }

    #[test]
    fn test_expired_token() {
        let exp = (Utc::now() - Duration::hours(1)).timestamp();
        let session = test_session(&jwt_with_exp(exp));
        assert!(session.is_expired());
    }

    #[test]
    fn test_opaque_token_has_no_expiry() {
        let session = test_session("not-a-jwt");
        assert_eq!(session.token_expires_at(), None);
        assert!(!session.is_expired());
    }

    #[test]
    fn test_session_serialization() {
        let session = test_session("token");
        let json = serde_json::to_string(&session).unwrap();
        let deserialized: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(session, deserialized);
    }
}
