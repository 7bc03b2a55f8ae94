//! Cookie-backed sessions and the request extractors built on them.
//!
//! Every request passes through [`session_middleware`], which resolves the
//! `sid` cookie against the sessions table (minting a fresh anonymous session
//! when the cookie is absent or stale) and stashes a [`SessionContext`] in the
//! request extensions. Handlers that need an authenticated caller use the
//! [`CurrentUser`] / [`AdminUser`] extractors.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entities::{session, user, Session, User};
use crate::errors::ServiceError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "sid";

/// Identity resolved by the session middleware, available to every handler.
#[derive(Debug, Clone, Copy)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub user_id: Option<Uuid>,
}

/// Hashes a password with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ServiceError::InternalError(format!("Password hashing failed: {}", e)))
}

/// Verifies a password against a stored Argon2 hash. A malformed stored hash
/// is an internal error, not a failed login.
pub fn verify_password(hash: &str, password: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ServiceError::InternalError(format!("Stored password hash invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn cookie_value(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

async fn load_session<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<Option<session::Model>, ServiceError> {
    let found = Session::find_by_id(id).one(db).await?;
    Ok(found.filter(|s| s.expires_at > Utc::now()))
}

/// Creates a fresh anonymous session.
pub async fn mint_session<C: ConnectionTrait>(
    db: &C,
    ttl_days: i64,
) -> Result<session::Model, ServiceError> {
    let now = Utc::now();
    let model = session::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(None),
        created_at: Set(now),
        expires_at: Set(now + Duration::days(ttl_days)),
    };
    Ok(model.insert(db).await?)
}

/// Replaces a session on login: the old session row is deleted and a new one
/// is bound to the user, so a pre-login cookie can never carry the
/// authenticated identity.
pub async fn rotate_session<C: ConnectionTrait>(
    db: &C,
    old_session_id: Uuid,
    user_id: Uuid,
    ttl_days: i64,
) -> Result<session::Model, ServiceError> {
    Session::delete_by_id(old_session_id).exec(db).await?;
    let now = Utc::now();
    let model = session::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(Some(user_id)),
        created_at: Set(now),
        expires_at: Set(now + Duration::days(ttl_days)),
    };
    Ok(model.insert(db).await?)
}

/// Detaches the user from the session on logout, leaving an anonymous
/// session behind so the cart survives.
pub async fn detach_user<C: ConnectionTrait>(
    db: &C,
    session_id: Uuid,
) -> Result<(), ServiceError> {
    if let Some(found) = Session::find_by_id(session_id).one(db).await? {
        let mut active: session::ActiveModel = found.into();
        active.user_id = Set(None);
        active.update(db).await?;
    }
    Ok(())
}

/// Resolves or mints the request session and exposes it as a
/// [`SessionContext`] extension. Sets the `sid` cookie on the response when a
/// new session was minted.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let ttl_days = state.config.session_ttl_days;

    let existing = match cookie_value(req.headers(), SESSION_COOKIE)
        .and_then(|v| Uuid::parse_str(&v).ok())
    {
        Some(id) => load_session(&*state.db, id).await.ok().flatten(),
        None => None,
    };

    let (ctx, minted) = match existing {
        Some(found) => (
            SessionContext {
                session_id: found.id,
                user_id: found.user_id,
            },
            false,
        ),
        None => match mint_session(&*state.db, ttl_days).await {
            Ok(fresh) => (
                SessionContext {
                    session_id: fresh.id,
                    user_id: None,
                },
                true,
            ),
            Err(e) => {
                tracing::error!("Failed to mint session: {}", e);
                return e.into_response();
            }
        },
    };

    req.extensions_mut().insert(ctx);
    let mut response = next.run(req).await;

    // A handler that rotated the session (login/register) has already set its
    // own cookie; appending the minted one would point the client at a
    // session row the rotation just deleted.
    if minted && !has_session_cookie(response.headers()) {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            ctx.session_id,
            ttl_days * 24 * 60 * 60
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

fn has_session_cookie(headers: &axum::http::HeaderMap) -> bool {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|raw| {
            raw.trim_start()
                .strip_prefix(SESSION_COOKIE)
                .is_some_and(|rest| rest.starts_with('='))
        })
}

/// Appends a `sid` cookie for an explicitly rotated session (login/register).
pub fn set_session_cookie(response: &mut Response, session_id: Uuid, ttl_days: i64) {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        session_id,
        ttl_days * 24 * 60 * 60
    );
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(SET_COOKIE, value);
    }
}

/// The session identity of the request. Always present once the session
/// middleware has run.
#[axum::async_trait]
impl FromRequestParts<AppState> for SessionContext {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .copied()
            .ok_or_else(|| {
                ServiceError::InternalError("Session middleware not installed".to_string())
            })
    }
}

/// The authenticated user behind the request, or 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = SessionContext::from_request_parts(parts, state).await?;
        let user_id = ctx
            .user_id
            .ok_or_else(|| ServiceError::Unauthorized("Login required".to_string()))?;
        let found = User::find_by_id(user_id)
            .one(&*state.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Login required".to_string()))?;
        Ok(CurrentUser(found))
    }
}

/// An authenticated user with the admin role, or 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub user::Model);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(found) = CurrentUser::from_request_parts(parts, state).await?;
        if found.role != user::UserRole::Admin {
            return Err(ServiceError::Forbidden(
                "Administrator access required".to_string(),
            ));
        }
        Ok(AdminUser(found))
    }
}

/// Deletes expired session rows. Called opportunistically; correctness does
/// not depend on it because lookups filter on `expires_at`.
pub async fn purge_expired_sessions<C: ConnectionTrait>(db: &C) -> Result<u64, ServiceError> {
    let res = Session::delete_many()
        .filter(session::Column::ExpiresAt.lt(Utc::now()))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password(&hash, "correct horse battery").unwrap());
        assert!(!verify_password(&hash, "wrong password").unwrap());
    }

    #[test]
    fn malformed_stored_hash_is_internal_error() {
        let err = verify_password("not-a-phc-string", "anything").unwrap_err();
        assert!(matches!(err, ServiceError::InternalError(_)));
    }

    #[test]
    fn cookie_value_parses_multi_cookie_header() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; sid=0f0e0d0c-0b0a-0908-0706-050403020100; lang=en"),
        );
        assert_eq!(
            cookie_value(&headers, "sid").as_deref(),
            Some("0f0e0d0c-0b0a-0908-0706-050403020100")
        );
        assert_eq!(cookie_value(&headers, "missing"), None);
    }
}
