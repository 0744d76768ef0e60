use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{Avatar, Role, User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login. Fields stay optional so missing values answer
/// with 400 instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Public part of the user returned to the client. No password, no reset
/// fields, by construction.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Avatar,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar(),
            role: user.role,
        }
    }
}

/// Response issued together with a fresh session credential.
#[derive(Debug, Serialize)]
pub struct SessionBody {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UserBody {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct UsersListBody {
    pub success: bool,
    pub users: Vec<PublicUser>,
    #[serde(rename = "usersCount")]
    pub users_count: i64,
}
