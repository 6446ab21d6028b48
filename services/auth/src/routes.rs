//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AuthError, AuthResult},
    jwt::TokenType,
    middleware::{AuthUser, auth_middleware},
    models::{Identity, NewUser, User, UserStatus},
    validation::{validate_email, validate_password, validate_phone},
};

/// Response carrying a freshly issued token pair
#[derive(Serialize)]
pub struct TokenResponse {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Request for user registration
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

/// Request for email/password login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request for phone login (issues an OTP)
#[derive(Deserialize)]
pub struct PhoneLoginRequest {
    pub phone: String,
}

/// Request for phone registration
#[derive(Deserialize)]
pub struct PhoneRegisterRequest {
    pub phone: String,
    pub name: String,
}

/// Request for OTP verification
#[derive(Deserialize)]
pub struct VerifyPhoneRequest {
    pub user_id: Uuid,
    pub otp: String,
}

/// Request for token refresh
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Response for token refresh
#[derive(Serialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/login/phone", post(login_phone))
        .route("/auth/register/phone", post(register_phone))
        .route("/auth/verify-phone", post(verify_phone))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Register with exactly one of email (plus password) or phone
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AuthResult<impl IntoResponse> {
    if payload.name.trim().is_empty() {
        return Err(AuthError::Validation("Name is required".to_string()));
    }

    let identity =
        Identity::resolve(payload.email, payload.phone).map_err(AuthError::Validation)?;

    let (password, status) = match &identity {
        Identity::Email(email) => {
            validate_email(email).map_err(AuthError::Validation)?;
            let password = payload
                .password
                .ok_or_else(|| AuthError::Validation("Password is required".to_string()))?;
            validate_password(&password).map_err(AuthError::Validation)?;

            if find_by_identity(&state, &identity).await?.is_some() {
                return Err(AuthError::Validation("Email already registered".to_string()));
            }
            (Some(password), UserStatus::Active)
        }
        Identity::Phone(phone) => {
            validate_phone(phone).map_err(AuthError::Validation)?;
            if find_by_identity(&state, &identity).await?.is_some() {
                return Err(AuthError::Validation(
                    "Phone number already registered".to_string(),
                ));
            }
            // Phone accounts stay pending until the OTP is confirmed
            (None, UserStatus::Pending)
        }
    };

    let user = state
        .user_repository
        .create(&NewUser {
            name: payload.name,
            identity: identity.clone(),
            password,
            status,
        })
        .await
        .map_err(|e| {
            error!("Failed to create user: {}", e);
            AuthError::Internal
        })?;

    if let Identity::Phone(phone) = &identity {
        issue_and_send_otp(&state, &user, phone).await?;
    }

    info!("User registered: {}", user.id);
    let response = issue_tokens(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Email/password login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AuthResult<impl IntoResponse> {
    info!("Login attempt for {}", payload.email);

    let user = state
        .user_repository
        .find_by_email(&payload.email)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::Internal
        })?
        .ok_or(AuthError::InvalidCredentials)?;

    let valid = state
        .user_repository
        .verify_password(&user, &payload.password)
        .map_err(|e| {
            error!("Failed to verify password: {}", e);
            AuthError::Internal
        })?;

    if !valid {
        return Err(AuthError::InvalidCredentials);
    }

    let response = issue_tokens(&state, &user).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Phone login: find-or-create the account, then send an OTP
pub async fn login_phone(
    State(state): State<AppState>,
    Json(payload): Json<PhoneLoginRequest>,
) -> AuthResult<impl IntoResponse> {
    validate_phone(&payload.phone).map_err(AuthError::Validation)?;

    let user = match state
        .user_repository
        .find_by_phone(&payload.phone)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::Internal
        })? {
        Some(user) => user,
        None => state
            .user_repository
            .create(&NewUser {
                name: format!("User_{}", payload.phone),
                identity: Identity::Phone(payload.phone.clone()),
                password: None,
                status: UserStatus::Pending,
            })
            .await
            .map_err(|e| {
                error!("Failed to create user: {}", e);
                AuthError::Internal
            })?,
    };

    issue_and_send_otp(&state, &user, &payload.phone).await?;

    let response = issue_tokens(&state, &user).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Phone registration: fails if the phone is already taken
pub async fn register_phone(
    State(state): State<AppState>,
    Json(payload): Json<PhoneRegisterRequest>,
) -> AuthResult<impl IntoResponse> {
    validate_phone(&payload.phone).map_err(AuthError::Validation)?;
    if payload.name.trim().is_empty() {
        return Err(AuthError::Validation("Name is required".to_string()));
    }

    let existing = state
        .user_repository
        .find_by_phone(&payload.phone)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::Internal
        })?;

    if existing.is_some() {
        return Err(AuthError::Validation(
            "Phone number already registered".to_string(),
        ));
    }

    let user = state
        .user_repository
        .create(&NewUser {
            name: payload.name,
            identity: Identity::Phone(payload.phone.clone()),
            password: None,
            status: UserStatus::Pending,
        })
        .await
        .map_err(|e| {
            error!("Failed to create user: {}", e);
            AuthError::Internal
        })?;

    issue_and_send_otp(&state, &user, &payload.phone).await?;

    let response = issue_tokens(&state, &user).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Verify the OTP; expired codes fail distinctly from wrong ones
pub async fn verify_phone(
    State(state): State<AppState>,
    Json(payload): Json<VerifyPhoneRequest>,
) -> AuthResult<impl IntoResponse> {
    let otp = state
        .otp_repository
        .find_pending(payload.user_id, &payload.otp)
        .await
        .map_err(|e| {
            error!("Failed to look up OTP: {}", e);
            AuthError::Internal
        })?
        .ok_or_else(|| AuthError::Validation("Invalid OTP".to_string()))?;

    if otp.is_expired(chrono::Utc::now()) {
        return Err(AuthError::Expired);
    }

    state.otp_repository.confirm(otp.id).await.map_err(|e| {
        error!("Failed to confirm OTP: {}", e);
        AuthError::Internal
    })?;

    state
        .user_repository
        .activate(payload.user_id)
        .await
        .map_err(|e| {
            error!("Failed to activate user: {}", e);
            AuthError::Internal
        })?;

    let user = state
        .user_repository
        .find_by_id(payload.user_id)
        .await
        .map_err(|e| {
            error!("Failed to load user: {}", e);
            AuthError::Internal
        })?
        .ok_or_else(|| AuthError::Validation("Invalid OTP".to_string()))?;

    info!("Phone verified for user {}", user.id);
    let response = issue_tokens(&state, &user).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Refresh token endpoint
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AuthResult<impl IntoResponse> {
    let claims = state
        .jwt_service
        .validate_token(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthenticated)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AuthError::Unauthenticated);
    }

    let is_blacklisted = state
        .jwt_service
        .is_token_blacklisted(&state.redis_pool, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to check if token is blacklisted: {}", e);
            AuthError::Internal
        })?;

    if is_blacklisted {
        return Err(AuthError::Unauthenticated);
    }

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to load user: {}", e);
            AuthError::Internal
        })?
        .ok_or(AuthError::Unauthenticated)?;

    let access_token = state.jwt_service.generate_access_token(&user).map_err(|e| {
        error!("Failed to generate access token: {}", e);
        AuthError::Internal
    })?;

    let new_refresh_token = state
        .jwt_service
        .rotate_refresh_token(&state.redis_pool, &user, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to rotate refresh token: {}", e);
            AuthError::Internal
        })?;

    store_session(&state, user.id, &new_refresh_token).await?;

    let response = RefreshTokenResponse {
        access_token,
        refresh_token: new_refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Logout endpoint: blacklists the refresh token and drops the session
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AuthResult<impl IntoResponse> {
    let claims = state
        .jwt_service
        .validate_token(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthenticated)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AuthError::Unauthenticated);
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| {
            error!("Failed to get current time: {}", e);
            AuthError::Internal
        })?
        .as_secs();

    let expiry = claims.exp.saturating_sub(now);
    state
        .jwt_service
        .blacklist_token(&state.redis_pool, &payload.refresh_token, expiry)
        .await
        .map_err(|e| {
            error!("Failed to blacklist token: {}", e);
            AuthError::Internal
        })?;

    let session_key = format!("session:{}", claims.sub);
    state.redis_pool.delete(&session_key).await.map_err(|e| {
        error!("Failed to remove session from Redis: {}", e);
        AuthError::Internal
    })?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"message": "Logged out successfully"})),
    ))
}

/// Current user's profile
pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AuthResult<Json<User>> {
    let user = state
        .user_repository
        .find_by_id(auth_user.id)
        .await
        .map_err(|e| {
            error!("Failed to load user: {}", e);
            AuthError::Internal
        })?
        .ok_or(AuthError::Unauthenticated)?;

    Ok(Json(user))
}

async fn find_by_identity(state: &AppState, identity: &Identity) -> AuthResult<Option<User>> {
    let found = match identity {
        Identity::Email(email) => state.user_repository.find_by_email(email).await,
        Identity::Phone(phone) => state.user_repository.find_by_phone(phone).await,
    };
    found.map_err(|e| {
        error!("Failed to look up user: {}", e);
        AuthError::Internal
    })
}

/// Rate-limit, persist and deliver a fresh OTP for the user's phone
async fn issue_and_send_otp(state: &AppState, user: &User, phone: &str) -> AuthResult<()> {
    let allowed = state.rate_limiter.is_allowed(phone).await.map_err(|e| {
        error!("Rate limiter failure: {}", e);
        AuthError::Internal
    })?;

    if !allowed {
        return Err(AuthError::RateLimited);
    }

    let otp = state.otp_repository.issue(user.id).await.map_err(|e| {
        error!("Failed to issue OTP: {}", e);
        AuthError::Internal
    })?;

    state
        .sms
        .send_otp(phone, &otp.code)
        .await
        .map_err(|e| AuthError::Sms(e.to_string()))?;

    Ok(())
}

/// Issue a token pair and record the session in Redis
async fn issue_tokens(state: &AppState, user: &User) -> AuthResult<TokenResponse> {
    let access_token = state.jwt_service.generate_access_token(user).map_err(|e| {
        error!("Failed to generate access token: {}", e);
        AuthError::Internal
    })?;

    let refresh_token = state.jwt_service.generate_refresh_token(user).map_err(|e| {
        error!("Failed to generate refresh token: {}", e);
        AuthError::Internal
    })?;

    store_session(state, user.id, &refresh_token).await?;

    Ok(TokenResponse {
        user_id: user.id,
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    })
}

async fn store_session(state: &AppState, user_id: Uuid, refresh_token: &str) -> AuthResult<()> {
    let session_key = format!("session:{}", user_id);
    state
        .redis_pool
        .set(
            &session_key,
            refresh_token,
            Some(state.jwt_service.refresh_token_expiry()),
        )
        .await
        .map_err(|e| {
            error!("Failed to store session in Redis: {}", e);
            AuthError::Internal
        })?;
    Ok(())
}
