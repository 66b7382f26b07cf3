pub mod error;
pub mod interceptor;
pub mod navigator;
pub mod refresh;
pub mod token_manager;


pub use error::{parse_auth_error, should_logout, AuthError, AuthErrorCode, TokenType};
pub use interceptor::{AuthRequestInterceptor, AuthResponseInterceptor};
pub use navigator::{CliNavigator, Navigator};
pub use refresh::{HttpTokenRefresher, RefreshError, RefreshResponse, RefreshTokenFn};
pub use token_manager::{LogoutHandler, TokenManager, SESSION_EXPIRED_MESSAGE};
