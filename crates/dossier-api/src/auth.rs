use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use dossier_db::NewUser;
use dossier_types::Role;
use dossier_types::UserProfile;
use dossier_types::api::{
    AuthResponse, Claims, EmailRequest, LoginRequest, MessageResponse, ProfileResponse,
    RegisterRequest, ResetPasswordRequest, TokenQuery, TokenRequest, UpdateProfileRequest,
};

use crate::error::{AppError, AppResult};
use crate::extract::{ValidJson, ValidQuery};
use crate::mailer::{password_reset_email, verification_email};
use crate::middleware::AuthUser;
use crate::state::{AppState, with_db};

const VERIFICATION_TTL_HOURS: i64 = 24;
const RESET_TTL_HOURS: i64 = 1;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const RESET_SENT: &str =
    "If an account with that email exists, a password reset link has been sent.";

pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let role = req.role.unwrap_or(Role::Buyer);
    if role == Role::Admin {
        return Err(AppError::validation("Invalid role"));
    }

    let email = normalize_email(&req.email);
    let password_hash = hash_password(&req.password)?;
    let token = new_secret_token();
    let digest = token_digest(&token);
    let expires = Utc::now() + Duration::hours(VERIFICATION_TTL_HOURS);

    let row = with_db(&state, move |db| {
        db.create_user(&NewUser {
            id: Uuid::new_v4(),
            email: &email,
            password_hash: &password_hash,
            first_name: req.first_name.trim(),
            last_name: req.last_name.trim(),
            company: req.company.as_deref().map(str::trim).filter(|c| !c.is_empty()),
            role,
            is_email_verified: false,
            verification_token: Some((&digest, expires)),
        })
    })
    .await?;
    let user = row.to_profile()?;

    info!(user_id = %user.id, role = %user.role, "User registered");
    send_verification(&state, &user, &token);

    let token = create_token(&state.config.jwt_secret, state.config.token_ttl_days, &user)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully. Please check your email to verify your account."
                .into(),
            token,
            user,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = normalize_email(&req.email);
    let row = with_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.into()))?;

    if !verify_password(&req.password, &row.password) {
        return Err(AppError::Authentication(INVALID_CREDENTIALS.into()));
    }
    if !row.is_active {
        return Err(AppError::Authentication("Account is deactivated".into()));
    }
    if !row.is_email_verified {
        return Err(AppError::Authentication(
            "Please verify your email before logging in".into(),
        ));
    }

    let mut user = row.to_profile()?;
    let now = Utc::now();
    let user_id = user.id;
    with_db(&state, move |db| db.record_login(user_id, now)).await?;
    user.last_login = Some(now);

    info!(user_id = %user.id, "User logged in");
    let token = create_token(&state.config.jwt_secret, state.config.token_ttl_days, &user)?;

    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        token,
        user,
    }))
}

/// POST /api/auth/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<TokenRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let user = consume_verification_token(&state, &req.token)
        .await?
        .ok_or_else(|| AppError::validation("Invalid or expired verification token"))?;

    Ok(Json(ProfileResponse {
        message: Some("Email verified successfully".into()),
        user,
    }))
}

/// GET /api/auth/verify-email?token=... is the link sent by email; it always
/// ends in a redirect to the frontend.
pub async fn verify_email_link(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<TokenQuery>,
) -> Redirect {
    let frontend = &state.config.frontend_url;
    let verified = match query.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => match consume_verification_token(&state, token).await {
            Ok(user) => user.is_some(),
            Err(e) => {
                warn!(error = %e, "Email verification link failed");
                false
            }
        },
        None => false,
    };

    if verified {
        Redirect::to(&format!("{frontend}/verify-email?verified=true"))
    } else {
        Redirect::to(&format!("{frontend}/verify-email?error=verification_failed"))
    }
}

pub async fn resend_verification(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<EmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = normalize_email(&req.email);
    let row = with_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if row.is_email_verified {
        return Err(AppError::validation("Email is already verified"));
    }

    let user = row.to_profile()?;
    let token = new_secret_token();
    let digest = token_digest(&token);
    let expires = Utc::now() + Duration::hours(VERIFICATION_TTL_HOURS);
    let user_id = user.id;
    with_db(&state, move |db| db.set_verification_token(user_id, &digest, expires)).await?;

    send_verification(&state, &user, &token);

    Ok(Json(MessageResponse {
        message: "Verification email sent".into(),
    }))
}

/// Always answers with the same message so the endpoint cannot be used to
/// probe which emails are registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<EmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = normalize_email(&req.email);
    let row = with_db(&state, move |db| db.get_user_by_email(&email)).await?;

    if let Some(row) = row {
        let user = row.to_profile()?;
        let token = new_secret_token();
        let digest = token_digest(&token);
        let expires = Utc::now() + Duration::hours(RESET_TTL_HOURS);
        let user_id = user.id;
        with_db(&state, move |db| db.set_reset_token(user_id, &digest, expires)).await?;

        let link = format!("{}/reset-password?token={}", state.config.frontend_url, token);
        if let Err(e) = state
            .mailer
            .send(password_reset_email(&user.email, &user.first_name, &link))
        {
            warn!(user_id = %user.id, error = %e, "Failed to send password reset email");
        }
    }

    Ok(Json(MessageResponse {
        message: RESET_SENT.into(),
    }))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let password_hash = hash_password(&req.new_password)?;
    let digest = token_digest(&req.token);
    let now = Utc::now();

    let changed = with_db(&state, move |db| db.reset_password(&digest, &password_hash, now)).await?;
    if !changed {
        return Err(AppError::validation("Invalid or expired reset token"));
    }

    Ok(Json(MessageResponse {
        message: "Password reset successfully".into(),
    }))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<ProfileResponse>> {
    let row = with_db(&state, move |db| db.get_user_by_id(auth.id))
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(ProfileResponse {
        message: None,
        user: row.to_profile()?,
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let row = with_db(&state, move |db| {
        let Some(current) = db.get_user_by_id(auth.id)? else {
            return Ok(None);
        };
        let first_name = req.first_name.as_deref().map(str::trim).unwrap_or(&current.first_name);
        let last_name = req.last_name.as_deref().map(str::trim).unwrap_or(&current.last_name);
        let company = match req.company.as_deref() {
            Some(company) => Some(company.trim()).filter(|c| !c.is_empty()),
            None => current.company.as_deref(),
        };
        db.update_profile(auth.id, first_name, last_name, company)
    })
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(ProfileResponse {
        message: Some("Profile updated successfully".into()),
        user: row.to_profile()?,
    }))
}

// -- Helpers --

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn create_token(secret: &str, ttl_days: i64, user: &UserProfile) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        is_email_verified: user.is_email_verified,
        exp: (Utc::now() + Duration::days(ttl_days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 32 random bytes, hex encoded. Only the digest is stored.
fn new_secret_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

async fn consume_verification_token(
    state: &AppState,
    token: &str,
) -> AppResult<Option<UserProfile>> {
    let digest = token_digest(token);
    let now = Utc::now();
    let row = with_db(state, move |db| db.verify_email(&digest, now)).await?;
    match row {
        Some(row) => {
            let user = row.to_profile()?;
            info!(user_id = %user.id, "Email verified");
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

/// Mail failures are logged and never fail the calling request.
fn send_verification(state: &AppState, user: &UserProfile, token: &str) {
    let link = format!("{}/api/auth/verify-email?token={}", state.config.public_url, token);
    if let Err(e) = state
        .mailer
        .send(verification_email(&user.email, &user.first_name, &link))
    {
        warn!(user_id = %user.id, error = %e, "Failed to send verification email");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("anything", "not-a-hash"));
    }

    #[test]
    fn token_carries_identity_claims() {
        let user = UserProfile {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            company: None,
            role: Role::Seller,
            is_email_verified: true,
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
        };
        let token = create_token("secret", 7, &user).unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Seller);
        assert!(claims.is_email_verified);
        assert!(decode_token("other-secret", &token).is_err());
    }

    #[test]
    fn secret_tokens_are_random_hex() {
        let a = new_secret_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, new_secret_token());
        assert_eq!(token_digest(&a).len(), 64);
    }
}
