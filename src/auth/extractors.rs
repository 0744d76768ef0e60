use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::jwt::{JwtKeys, SESSION_COOKIE};
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo_types::User;

/// Pull the session token from the cookie, or from a Bearer header for
/// non-browser clients.
fn session_token(parts: &Parts) -> Option<String> {
    if let Some(cookies) = parts
        .headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
    {
        for pair in cookies.split(';') {
            if let Some(value) = pair
                .trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
            {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Validates the session token and yields the caller's user ID.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(parts)
            .ok_or_else(|| ApiError::Auth("Please login to access this resource".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|_| {
            warn!("invalid or expired session token");
            ApiError::Auth("Invalid or expired session token".into())
        })?;

        Ok(AuthUser(claims.sub))
    }
}

/// Admin-tier guard: authenticates the caller, loads their record, and
/// rejects with 403 unless the role is `admin`.
pub struct RequireAdmin(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;

        let user = User::find_by_id(&state.db, user_id)
            .await?
            .ok_or_else(|| ApiError::Auth("User no longer exists".into()))?;

        if !user.is_admin() {
            warn!(user_id = %user.id, role = %user.role, "admin route denied");
            return Err(ApiError::Forbidden(format!(
                "Role {} is not allowed to access this resource",
                user.role
            )));
        }

        Ok(RequireAdmin(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(name: header::HeaderName, value: &str) -> Parts {
        let (parts, ()) = Request::builder()
            .header(name, value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn reads_token_from_the_session_cookie() {
        let parts = parts_with(header::COOKIE, "theme=dark; token=abc.def.ghi; lang=en");
        assert_eq!(session_token(&parts).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn ignores_an_empty_cookie_value() {
        let parts = parts_with(header::COOKIE, "token=");
        assert_eq!(session_token(&parts), None);
    }

    #[test]
    fn falls_back_to_the_bearer_header() {
        let parts = parts_with(header::AUTHORIZATION, "Bearer abc.def.ghi");
        assert_eq!(session_token(&parts).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn rejects_other_auth_schemes() {
        let parts = parts_with(header::AUTHORIZATION, "Basic dXNlcjpwdw==");
        assert_eq!(session_token(&parts), None);
    }

    #[test]
    fn no_headers_means_no_token() {
        let (parts, ()) = Request::builder().body(()).unwrap().into_parts();
        assert_eq!(session_token(&parts), None);
    }
}
