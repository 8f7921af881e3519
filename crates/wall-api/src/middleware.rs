use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use wall_db::models::UserRow;

use crate::error::ApiError;
use crate::{AppState, blocking};

/// Authorization scheme keyword, as in `Authorization: Token <key>`.
pub const TOKEN_KEYWORD: &str = "Token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<UserRow> for AuthUser {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
        }
    }
}

/// Who is making the request. Inserted into request extensions for every route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User(AuthUser),
    Anonymous,
}

impl Identity {
    pub fn require_user(self) -> Result<AuthUser, ApiError> {
        match self {
            Self::User(user) => Ok(user),
            Self::Anonymous => Err(ApiError::NotAuthenticated),
        }
    }
}

/// Extracts the key from a `Token <key>` header value. The keyword is
/// matched case-insensitively; anything but exactly two parts is rejected.
pub fn token_from_header(value: &str) -> Option<&str> {
    let mut parts = value.split_whitespace();
    let keyword = parts.next()?;
    let key = parts.next()?;
    if parts.next().is_some() || !keyword.eq_ignore_ascii_case(TOKEN_KEYWORD) {
        return None;
    }
    Some(key)
}

/// Resolve the request's token to an [`Identity`]. A missing or unknown
/// token yields `Anonymous`; whether that is acceptable is up to the handler.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(token_from_header)
        .map(str::to_owned);

    let identity = match key {
        Some(key) => {
            let db = state.clone();
            match blocking(move || Ok(db.db.get_user_by_token(&key)?)).await? {
                Some(user) => Identity::User(user.into()),
                None => {
                    debug!("Unknown token presented, treating request as anonymous");
                    Identity::Anonymous
                }
            }
        }
        None => Identity::Anonymous,
    };

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_header() {
        assert_eq!(token_from_header("Token abc123"), Some("abc123"));
        assert_eq!(token_from_header("token abc123"), Some("abc123"));
        assert_eq!(token_from_header("Token  abc123 "), Some("abc123"));
    }

    #[test]
    fn rejects_other_shapes() {
        assert_eq!(token_from_header("Bearer abc123"), None);
        assert_eq!(token_from_header("Token"), None);
        assert_eq!(token_from_header("Token a b"), None);
        assert_eq!(token_from_header(""), None);
    }

    #[test]
    fn anonymous_cannot_act_as_user() {
        assert!(matches!(
            Identity::Anonymous.require_user(),
            Err(ApiError::NotAuthenticated)
        ));
    }
}
