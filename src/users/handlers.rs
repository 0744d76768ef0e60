use axum::{
    extract::{FromRef, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::auth::extractors::{AuthUser, RequireAdmin};
use crate::auth::jwt::{self, JwtKeys};
use crate::auth::password::{self, ResetToken};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

use super::dto::{
    ForgotPasswordRequest, LoginRequest, MessageBody, PublicUser, RegisterRequest,
    ResetPasswordRequest, SessionBody, UpdatePasswordRequest, UpdateProfileRequest,
    UpdateRoleRequest, UserBody, UsersListBody,
};
use super::repo_types::{Avatar, User};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset/:token", put(reset_password))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/update", put(update_profile))
        .route("/password/update", put(update_password))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/users", get(list_users)).route(
        "/admin/users/:id",
        get(get_user).put(update_user_role).delete(delete_user),
    )
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Presence check for fields the client must always send.
fn required(value: Option<String>, message: &str) -> ApiResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::Validation(message.to_string())),
    }
}

fn reset_url(origin: &str, cleartext: &str) -> String {
    format!(
        "{}/api/v1/password/reset/{}",
        origin.trim_end_matches('/'),
        cleartext
    )
}

/// Build a success response carrying a fresh session credential, both in the
/// body and as the HTTP-only cookie. Used by every operation that changes
/// password-relevant state, so a stale token never outlives the change.
fn session_response(
    state: &AppState,
    user: &User,
    message: &str,
    status: StatusCode,
) -> ApiResult<Response> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(user.id)?;
    let cookie = jwt::session_cookie(&token, state.config.cookie_ttl());

    let body = Json(SessionBody {
        success: true,
        message: message.to_string(),
        user: PublicUser::from(user),
        token,
    });

    let mut res = (status, body).into_response();
    res.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))?,
    );
    Ok(res)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<Response> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Please enter name".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "register with invalid email");
        return Err(ApiError::Validation("Please enter a valid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password should have at least 8 characters".into(),
        ));
    }

    let hash = password::hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        payload.name.trim(),
        &payload.email,
        &hash,
        &Avatar::default(),
    )
    .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    session_response(&state, &user, "registered", StatusCode::CREATED)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Response> {
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let provided = payload.password.as_deref().filter(|v| !v.is_empty());
    let (Some(email), Some(provided)) = (email, provided) else {
        return Err(ApiError::Validation("Please enter email and password".into()));
    };
    let email = email.to_lowercase();

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| {
            warn!(email = %email, "login with unknown email");
            ApiError::Auth("Invalid email or password".into())
        })?;

    if !password::verify_password(provided, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::Auth("Invalid email or password".into()));
    }

    info!(user_id = %user.id, "user logged in");
    session_response(&state, &user, "logged in", StatusCode::OK)
}

/// Invalidate the session at the transport boundary by expiring the cookie.
pub async fn logout() -> Response {
    let body = Json(MessageBody {
        success: true,
        message: "Logged out successfully".into(),
    });
    let mut res = (StatusCode::OK, body).into_response();
    res.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_static(jwt::EXPIRED_SESSION_COOKIE),
    );
    res
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageBody>> {
    let email = payload.email.trim().to_lowercase();
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if user.pending_reset().is_some() {
        debug!(user_id = %user.id, "replacing an existing pending reset");
    }

    let reset = ResetToken::generate(state.config.reset_token_ttl());
    User::store_reset_token(&state.db, user.id, &reset.hash, reset.expires_at).await?;

    let url = reset_url(&state.config.public_origin, &reset.cleartext);
    let message = format!(
        "Your password reset token is:\n\n{url}\n\nIf you have not requested this email then please ignore it."
    );

    match state
        .mailer
        .send(&user.email, "Storefront Password Reset", &message)
        .await
    {
        Ok(()) => {
            info!(user_id = %user.id, "password reset email sent");
            Ok(Json(MessageBody {
                success: true,
                message: format!("Email sent to {} successfully", user.email),
            }))
        }
        Err(err) => {
            // roll the pending reset back before surfacing the failure
            warn!(user_id = %user.id, error = %err, "password reset email failed");
            User::clear_reset_token(&state.db, user.id).await?;
            Err(ApiError::Dependency(err.to_string()))
        }
    }
}

#[instrument(skip(state, payload, token))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Response> {
    let token_hash = password::hash_reset_token(&token);
    let user = User::find_by_reset_token(&state.db, &token_hash, OffsetDateTime::now_utc())
        .await?
        .ok_or_else(|| {
            ApiError::Validation("Reset password token is invalid or has been expired".into())
        })?;

    if payload.password != payload.confirm_password {
        return Err(ApiError::Validation("Password does not match".into()));
    }

    let hash = password::hash_password(&payload.password)?;
    User::complete_password_reset(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password reset completed");
    session_response(&state, &user, "Password reset done", StatusCode::OK)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<UserBody>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(UserBody {
        success: true,
        message: "User details found".into(),
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> ApiResult<Response> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !password::verify_password(&payload.old_password, &user.password_hash)? {
        return Err(ApiError::Validation("Old password is incorrect".into()));
    }
    if payload.new_password != payload.confirm_password {
        return Err(ApiError::Validation("Password does not match".into()));
    }

    let hash = password::hash_password(&payload.new_password)?;
    User::set_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password changed");
    session_response(&state, &user, "Password changed", StatusCode::OK)
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserBody>> {
    let name = required(payload.name, "Please enter name")?;
    let email = required(payload.email, "Please enter email")?.to_lowercase();

    let user = User::update_profile(&state.db, user_id, &name, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(UserBody {
        success: true,
        message: "User details updated successfully".into(),
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    _: RequireAdmin,
) -> ApiResult<Json<UsersListBody>> {
    let users = User::list(&state.db).await?;
    let users_count = User::count(&state.db).await?;

    Ok(Json(UsersListBody {
        success: true,
        users: users.iter().map(PublicUser::from).collect(),
        users_count,
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    _: RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserBody>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found with id {id}")))?;

    Ok(Json(UserBody {
        success: true,
        message: "User details found".into(),
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload, admin))]
pub async fn update_user_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<UserBody>> {
    let name = required(payload.name, "Please enter name")?;
    let email = required(payload.email, "Please enter email")?.to_lowercase();
    let role = payload
        .role
        .ok_or_else(|| ApiError::Validation("Please enter role".into()))?;

    let user = User::update_role(&state.db, id, &name, &email, role)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User with id {id} not found")))?;

    info!(admin_id = %admin.id, user_id = %user.id, role = %user.role, "user role updated");
    Ok(Json(UserBody {
        success: true,
        message: "User role updated successfully".into(),
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageBody>> {
    let deleted = User::delete(&state.db, id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("User with id {id} not found")));
    }

    info!(admin_id = %admin.id, user_id = %id, "user deleted");
    Ok(Json(MessageBody {
        success: true,
        message: "User deleted successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_missing_and_blank_values() {
        assert!(required(None, "Please enter name").is_err());
        assert!(required(Some("".into()), "Please enter name").is_err());
        assert!(required(Some("   ".into()), "Please enter name").is_err());
        assert_eq!(required(Some(" Bob ".into()), "x").unwrap(), "Bob");

        let err = required(None, "Please enter role").unwrap_err();
        assert_eq!(err.to_string(), "Please enter role");
    }

    #[test]
    fn email_validation_accepts_plausible_addresses() {
        assert!(is_valid_email("alice@x.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@x.com"));
    }

    #[test]
    fn reset_url_embeds_the_cleartext_token() {
        let url = reset_url("https://shop.example.com", "abc123");
        assert_eq!(url, "https://shop.example.com/api/v1/password/reset/abc123");

        // trailing slash on the origin does not double up
        let url = reset_url("https://shop.example.com/", "abc123");
        assert_eq!(url, "https://shop.example.com/api/v1/password/reset/abc123");
    }
}
