//! Credential domain: scopes, token sets, PKCE state, and the token manager.

pub mod manager;
pub mod pkce;
pub mod scope;
pub mod token;

pub use manager::{RefreshFuture, TokenManager, TokenRefresher};
pub use pkce::{AuthorizationAttempt, PkceCodeChallengeMethod};
pub use scope::{ScopeSet, ScopeValidationError};
pub use token::{DEFAULT_SKEW_BUFFER, TokenSecret, TokenSet, TokenSetBuilder, TokenSetBuilderError};
