//! Request/Response DTOs

use axum::extract::FromRequest;
use serde::{Deserialize, Serialize};
use users_core::UserUpdate;
use users_db::User;

use crate::error::ApiError;

/// JSON body extractor whose rejections use the API error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `{"user": {...}}` wrapper used by every request and response body
#[derive(Debug, Serialize, Deserialize)]
pub struct UserEnvelope<T> {
    pub user: T,
}

// ==================== Requests ====================

/// Registration request; missing fields are reported by validation
#[derive(Debug, Deserialize)]
pub struct RegisterUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginUser {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Sparse update request
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

impl From<UpdateUser> for UserUpdate {
    fn from(u: UpdateUser) -> Self {
        UserUpdate {
            username: u.username,
            email: u.email,
            password: u.password,
            bio: u.bio,
            image: u.image,
        }
    }
}

// ==================== Responses ====================

/// Authenticated user with a fresh token
#[derive(Debug, Serialize, Deserialize)]
pub struct UserBody {
    pub email: String,
    pub token: String,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    /// Token lifetime in seconds
    pub expires_in: u64,
}

impl UserBody {
    pub fn new(user: User, token: String, expires_in: u64) -> Self {
        Self {
            email: user.email,
            token,
            username: user.username,
            bio: user.bio,
            image: user.image,
            expires_in,
        }
    }
}

/// Public profile (no token)
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileBody {
    pub email: String,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

impl From<User> for ProfileBody {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            username: user.username,
            bio: user.bio,
            image: user.image,
        }
    }
}
