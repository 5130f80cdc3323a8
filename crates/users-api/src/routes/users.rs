//! User routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, info};
use users_auth::AuthError;
use users_core::ErrorKind;
use users_db::User;

use crate::error::ApiError;
use crate::state::AppState;

use super::auth::RequireAuth;
use super::types::{
    ApiJson, LoginUser, ProfileBody, RegisterUser, UpdateUser, UserBody, UserEnvelope,
};

type UserResponse = Json<UserEnvelope<UserBody>>;

/// Build the response body for `user` with a freshly issued token
fn with_token(state: &AppState, user: User) -> Result<UserResponse, ApiError> {
    let token = state.tokens.issue(&user.username)?;
    let expires_in = state.tokens.ttl().as_secs();
    Ok(Json(UserEnvelope {
        user: UserBody::new(user, token, expires_in),
    }))
}

/// POST /users
async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UserEnvelope<RegisterUser>>,
) -> Result<(StatusCode, UserResponse), ApiError> {
    let RegisterUser {
        username,
        email,
        password,
    } = request.user;

    debug!("Registering user {} ({})", username, email);
    let user = state.directory.register(&username, &email, &password).await?;

    Ok((StatusCode::CREATED, with_token(&state, user)?))
}

/// POST /users/login
async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UserEnvelope<LoginUser>>,
) -> Result<UserResponse, ApiError> {
    let LoginUser { email, password } = request.user;

    if !state.directory.authenticate(&email, &password).await? {
        return Err(AuthError::InvalidCredentials.into());
    }

    // The account can vanish between the credential check and the lookup
    let user = state
        .directory
        .get_by_email(&email)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => ApiError::from(AuthError::InvalidCredentials),
            _ => ApiError::from(e),
        })?;
    info!("User {} logged in successfully", user.username);

    with_token(&state, user)
}

/// GET /user
async fn current_user(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
) -> Result<UserResponse, ApiError> {
    let user = state.directory.get_by_username(&auth.username).await?;
    with_token(&state, user)
}

/// PUT /user
async fn update_user(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    ApiJson(request): ApiJson<UserEnvelope<UpdateUser>>,
) -> Result<UserResponse, ApiError> {
    let user = state
        .directory
        .update_by_username(&auth.username, request.user.into())
        .await?;

    // A rename changes the subject of subsequent tokens
    with_token(&state, user)
}

/// GET /profiles/{username}
async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserEnvelope<ProfileBody>>, ApiError> {
    let user = state.directory.get_by_username(&username).await?;
    Ok(Json(UserEnvelope { user: user.into() }))
}

/// Create user routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/login", post(login))
        .route("/user", get(current_user).put(update_user))
        .route("/profiles/{username}", get(get_profile))
}
