use std::sync::LazyLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;

use wall_db::unique_violation;
use wall_types::api::{
    DetailResponse, LoginRequest, RegisterRequest, TokenResponse, UserDetailsResponse,
};

use crate::error::{ApiError, FieldErrors, NON_FIELD_ERRORS};
use crate::middleware::Identity;
use crate::notifier::notify_created;
use crate::{AppState, blocking, validation};

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const EMAIL_TAKEN: &str = "A user is already registered with this e-mail address.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";
pub const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let mut errors = FieldErrors::new();

    let username = validation::username(req.username.as_deref())
        .map_err(|msg| errors.add("username", msg))
        .ok();
    let email = validation::email(req.email.as_deref())
        .map_err(|msg| errors.add("email", msg))
        .ok();
    let password1 = validation::required_secret(req.password1.as_deref())
        .map_err(|msg| errors.add("password1", msg))
        .ok();
    let password2 = validation::required_secret(req.password2.as_deref())
        .map_err(|msg| errors.add("password2", msg))
        .ok();

    // Check if username or email is taken
    let db = state.clone();
    let (u, e) = (username.clone(), email.clone());
    let (username_taken, email_taken) = blocking(move || {
        let username_taken = match &u {
            Some(u) => db.db.get_user_by_username(u)?.is_some(),
            None => false,
        };
        let email_taken = match &e {
            Some(e) => db.db.get_user_by_email(e)?.is_some(),
            None => false,
        };
        Ok((username_taken, email_taken))
    })
    .await?;
    if username_taken {
        errors.add("username", USERNAME_TAKEN);
    }
    if email_taken {
        errors.add("email", EMAIL_TAKEN);
    }

    if let Some(p1) = &password1 {
        for problem in validation::password_strength(p1, username.as_deref(), email.as_deref()) {
            errors.add("password1", problem);
        }
    }
    if let (Some(p1), Some(p2)) = (&password1, &password2) {
        if p1 != p2 {
            errors.add(NON_FIELD_ERRORS, PASSWORD_MISMATCH);
        }
    }

    errors.into_result()?;
    let (Some(username), Some(email), Some(password)) = (username, email, password1) else {
        return Err(ApiError::Internal(anyhow::anyhow!(
            "registration passed validation with missing fields"
        )));
    };

    let password_hash = hash_password(&password)?;
    let key = generate_token_key();

    let db = state.clone();
    let token = key.clone();
    let user = blocking(move || {
        db.db
            .create_user_with_token(&username, &email, &password_hash, &token, Utc::now())
            .map_err(create_error)
    })
    .await?;

    info!(user_id = user.id, username = %user.username, "User registered");
    notify_created(state.notifier.as_ref(), &state.from_email, &user);

    Ok((StatusCode::CREATED, Json(TokenResponse { key })))
}

/// Maps a failed account insert. A UNIQUE failure means a concurrent
/// registration won the race after the pre-check passed.
fn create_error(err: anyhow::Error) -> ApiError {
    let taken = match unique_violation(&err) {
        Some("users.username") => Some(("username", USERNAME_TAKEN)),
        Some("users.email") => Some(("email", EMAIL_TAKEN)),
        _ => None,
    };
    match taken {
        Some((field, message)) => ApiError::field(field, message),
        None => ApiError::Internal(err),
    }
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;

    let password = validation::required_secret(req.password.as_deref())
        .map_err(|msg| ApiError::field("password", msg))?;

    let username = req.username.filter(|u| !u.trim().is_empty());
    let email = req.email.filter(|e| !e.trim().is_empty());
    if username.is_none() && email.is_none() {
        return Err(ApiError::field(
            NON_FIELD_ERRORS,
            "Must include \"username\" and \"password\".",
        ));
    }

    let db = state.clone();
    let user = blocking(move || match (username, email) {
        (Some(username), _) => Ok(db.db.get_user_by_username(username.trim())?),
        (None, Some(email)) => Ok(db.db.get_user_by_email(email.trim())?),
        (None, None) => Ok(None),
    })
    .await?;

    let Some(user) = user else {
        // Same Argon2 cost as a wrong password, so response time does not
        // reveal which accounts exist
        verify_against_dummy(&password);
        return Err(ApiError::field(NON_FIELD_ERRORS, BAD_CREDENTIALS));
    };

    if !verify_password(&password, &user.password)? {
        return Err(ApiError::field(NON_FIELD_ERRORS, BAD_CREDENTIALS));
    }

    let db = state.clone();
    let user_id = user.id;
    let key = blocking(move || Ok(db.db.get_or_create_token(user_id, &generate_token_key(), Utc::now())?))
        .await?;

    info!(user_id, "User logged in");
    Ok(Json(TokenResponse { key }))
}

/// Deletes the caller's token. Anonymous callers get the same answer.
pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    if let Identity::User(user) = identity {
        let db = state.clone();
        let user_id = user.id;
        if blocking(move || Ok(db.db.delete_token(user_id)?)).await? {
            info!(user_id, "User logged out");
        }
    }

    Ok(Json(DetailResponse {
        detail: "Successfully logged out.".to_string(),
    }))
}

pub async fn current_user(
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let user = identity.require_user()?;
    Ok(Json(UserDetailsResponse {
        pk: user.id,
        username: user.username,
        email: user.email,
    }))
}

/// Argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on a wrong password; `Err` only if the stored hash is unreadable.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, ApiError> {
    let parsed_hash =
        PasswordHash::new(stored).map_err(|e| anyhow::anyhow!("corrupt password hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash checked when no account matches the login. Computed once.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("wall-no-such-account").ok());

/// Computes the dummy hash up front so the first failed login is not slower.
pub(crate) fn prepare_dummy_hash() {
    LazyLock::force(&DUMMY_HASH);
}

fn verify_against_dummy(password: &str) -> bool {
    match DUMMY_HASH.as_deref() {
        Some(hash) => verify_password(password, hash).unwrap_or(false),
        None => false,
    }
}

/// 160 random bits as 40 lowercase hex characters.
pub fn generate_token_key() -> String {
    hex::encode(rand::random::<[u8; 20]>())
}
