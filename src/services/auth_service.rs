use crate::{
    config::Settings,
    database::MongoDB,
    models::{AdminUserView, User, UserInfo, UserProfile, UserRole},
    services::{email_service::EmailService, user_service},
    utils::error::{AppError, AppResult},
};
use actix_web::web;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const VERIFICATION_CODE_LENGTH: usize = 6;
pub const VERIFICATION_CODE_TTL_HOURS: i64 = 24;
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // email
    pub iat: usize,
    pub exp: usize,
}

// Request/Response structures
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub google_id: Option<String>,
    pub picture: Option<String>,
    #[serde(default)]
    pub is_google_auth: bool,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// The account email
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_info: UserInfo,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        MessageResponse {
            message: message.into(),
            email: None,
            redirect_to: None,
        }
    }

    fn redirect(mut self, to: impl Into<String>) -> Self {
        self.redirect_to = Some(to.into());
        self
    }

    fn already_verified() -> Self {
        MessageResponse::new("Email already verified").redirect("/login?verified=true")
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DevCodeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn verify_email_path(email: &str) -> String {
    format!("/verify-email?email={}", urlencoding::encode(email))
}

// ==================== TOKENS ====================

pub fn generate_token(email: &str, settings: &Settings) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: email.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::minutes(settings.token_ttl_minutes)).timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(settings.secret_key.as_bytes()),
    )
    .map_err(AppError::from)
}

/// Checks signature and expiry. Any failure is the same 401 to the caller.
pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            log::debug!("Token rejected: {}", e);
            AppError::credentials()
        })
}

// ==================== PASSWORDS & CODES ====================

/// bcrypt off the request thread.
pub async fn hash_password(password: String) -> AppResult<String> {
    web::block(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

pub async fn verify_password(password: String, hashed: String) -> AppResult<bool> {
    web::block(move || verify(password, &hashed))
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?
        .map_err(AppError::from)
}

pub fn generate_verification_code() -> String {
    let mut rng = rand::rng();
    (0..VERIFICATION_CODE_LENGTH)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Replaces any pending code with a fresh one and returns it.
pub fn issue_verification_code(user: &mut User, now: DateTime<Utc>) -> String {
    let code = generate_verification_code();
    user.verification_code = Some(code.clone());
    user.verification_code_expires = Some(now + Duration::hours(VERIFICATION_CODE_TTL_HOURS));
    code
}

pub fn check_verification_code(user: &User, code: &str, now: DateTime<Utc>) -> AppResult<()> {
    let stored = user.verification_code.as_deref().ok_or_else(|| {
        AppError::BadRequest("No verification code found. Please request a new one.".to_string())
    })?;

    if let Some(expires) = user.verification_code_expires {
        if now > expires {
            return Err(AppError::BadRequest(
                "Verification code has expired. Please request a new one.".to_string(),
            ));
        }
    }

    if code.trim() != stored {
        return Err(AppError::BadRequest("Invalid verification code".to_string()));
    }
    Ok(())
}

pub fn check_reset_token(user: &User, token: &str, now: DateTime<Utc>) -> AppResult<()> {
    let invalid = || AppError::BadRequest("Invalid or expired reset token".to_string());

    let stored = user.reset_token.as_deref().ok_or_else(invalid)?;
    let expires = user.reset_token_expires.ok_or_else(invalid)?;

    if now > expires || token != stored {
        return Err(invalid());
    }
    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Builds an unsaved account from a registration payload.
async fn new_account(request: &RegisterRequest, role: UserRole) -> AppResult<User> {
    let email = request.email.trim().to_string();
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if request.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    let password = match request.password.as_deref() {
        Some(pwd) if !pwd.is_empty() => Some(hash_password(pwd.to_string()).await?),
        _ if request.is_google_auth => None,
        _ => {
            return Err(AppError::BadRequest(
                "Password is required for email registration".to_string(),
            ))
        }
    };

    Ok(User {
        name: request.name.trim().to_string(),
        email,
        password,
        google_id: request.google_id.clone(),
        picture: request.picture.clone(),
        is_google_auth: request.is_google_auth,
        role,
        created_at: Some(Utc::now()),
        ..Default::default()
    })
}

/// Mail delivery never fails the request that triggered it.
pub fn notify(sent: AppResult<bool>, to: &str) {
    match sent {
        Ok(true) => {}
        Ok(false) => log::warn!("⚠️  Email to {} was not delivered", to),
        Err(e) => log::error!("❌ Could not prepare email to {}: {}", to, e),
    }
}

// ==================== ACCOUNT FLOWS ====================

pub async fn register(
    db: &MongoDB,
    mailer: &EmailService,
    request: &RegisterRequest,
) -> AppResult<MessageResponse> {
    // Public sign-ups are always plain users, whatever the payload claims.
    let mut user = new_account(request, UserRole::User).await?;

    if user_service::email_exists(db, &user.email).await? {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    let code = issue_verification_code(&mut user, Utc::now());
    user_service::insert_user(db, &user).await?;

    notify(mailer.send_verification_email(&user.email, &code).await, &user.email);

    log::info!("✅ User registered: {} (google: {})", user.email, user.is_google_auth);

    Ok(MessageResponse {
        message: "User registered successfully. Please check your email for verification code."
            .to_string(),
        email: Some(user.email.clone()),
        redirect_to: Some(verify_email_path(&user.email)),
    })
}

fn bad_credentials() -> AppError {
    AppError::Unauthorized("Incorrect email or password".to_string())
}

/// Account checks that run before the password is looked at, in order:
/// unknown email, Google-only account, unverified email.
pub fn login_gate(user: Option<User>) -> AppResult<User> {
    let user = user.ok_or_else(bad_credentials)?;

    if user.is_google_only() {
        return Err(AppError::Unauthorized(
            "This account uses Google Sign-In. Please login with Google.".to_string(),
        ));
    }

    if !user.email_verified {
        return Err(AppError::EmailNotVerified { email: user.email });
    }

    Ok(user)
}

pub async fn check_password(user: &User, password: &str) -> AppResult<()> {
    let stored = user.password.clone().ok_or_else(bad_credentials)?;
    if !verify_password(password.to_string(), stored).await? {
        return Err(bad_credentials());
    }
    Ok(())
}

pub async fn login(db: &MongoDB, settings: &Settings, request: &LoginRequest) -> AppResult<TokenResponse> {
    let found = user_service::find_user(db, request.username.trim()).await?;
    let mut user = login_gate(found)?;
    check_password(&user, &request.password).await?;

    user.last_login = Some(Utc::now());
    user_service::save_user(db, &user).await?;

    Ok(TokenResponse {
        access_token: generate_token(&user.email, settings)?,
        token_type: "bearer".to_string(),
        user_info: user.info(),
    })
}

/// The account behind a validated token; a deleted account is a 401.
pub async fn current_user(db: &MongoDB, claims: &Claims) -> AppResult<User> {
    user_service::find_user(db, &claims.sub)
        .await?
        .ok_or_else(AppError::credentials)
}

pub async fn require_admin(db: &MongoDB, claims: &Claims) -> AppResult<User> {
    let user = current_user(db, claims).await?;
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized. Admin privileges required.".to_string(),
        ));
    }
    Ok(user)
}

pub async fn get_profile(db: &MongoDB, claims: &Claims) -> AppResult<UserProfile> {
    user_service::find_user(db, &claims.sub)
        .await?
        .map(|user| user.profile())
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn verify_code(db: &MongoDB, request: &VerifyCodeRequest) -> AppResult<MessageResponse> {
    let mut user = user_service::find_user(db, request.email.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.email_verified {
        return Ok(MessageResponse::already_verified());
    }

    check_verification_code(&user, &request.code, Utc::now())?;

    user.email_verified = true;
    user.verification_code = None;
    user.verification_code_expires = None;
    user_service::save_user(db, &user).await?;

    Ok(MessageResponse::new("Email verified successfully").redirect("/login?verified=true"))
}

pub async fn resend_code(
    db: &MongoDB,
    mailer: &EmailService,
    request: &EmailRequest,
) -> AppResult<MessageResponse> {
    let mut user = user_service::find_user(db, request.email.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.email_verified {
        return Ok(MessageResponse::already_verified());
    }

    let code = issue_verification_code(&mut user, Utc::now());
    user_service::save_user(db, &user).await?;

    notify(mailer.send_verification_email(&user.email, &code).await, &user.email);

    Ok(MessageResponse::new("Verification code resent. Please check your email."))
}

pub async fn forgot_password(
    db: &MongoDB,
    settings: &Settings,
    mailer: &EmailService,
    request: &EmailRequest,
) -> AppResult<MessageResponse> {
    let generic = MessageResponse::new(
        "If an account with that email exists, a password reset link has been sent.",
    );

    let Some(mut user) = user_service::find_user(db, request.email.trim()).await? else {
        log::info!("🔑 Password reset requested for unknown email: {}", request.email);
        return Ok(generic);
    };

    if user.is_google_only() {
        log::info!("🔑 Password reset skipped for Google-only account: {}", user.email);
        return Ok(generic);
    }

    let token = uuid::Uuid::new_v4().simple().to_string();
    user.reset_token = Some(token.clone());
    user.reset_token_expires = Some(Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS));
    user_service::save_user(db, &user).await?;

    let link = format!(
        "{}/reset-password?token={}&email={}",
        settings.frontend_url,
        token,
        urlencoding::encode(&user.email)
    );
    notify(mailer.send_password_reset_email(&user.email, &link).await, &user.email);

    Ok(generic)
}

pub async fn reset_password(db: &MongoDB, request: &ResetPasswordRequest) -> AppResult<MessageResponse> {
    if request.new_password.is_empty() {
        return Err(AppError::BadRequest("New password is required".to_string()));
    }

    let mut user = user_service::find_user(db, request.email.trim())
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".to_string()))?;

    check_reset_token(&user, &request.token, Utc::now())?;

    user.password = Some(hash_password(request.new_password.clone()).await?);
    user.reset_token = None;
    user.reset_token_expires = None;
    user_service::save_user(db, &user).await?;

    Ok(MessageResponse::new("Password has been reset. You can now log in.").redirect("/login"))
}

// ==================== ADMIN ====================

pub async fn admin_register(db: &MongoDB, request: &RegisterRequest) -> AppResult<MessageResponse> {
    let mut user = new_account(request, UserRole::Admin).await?;
    user.email_verified = true;

    user_service::insert_user(db, &user).await?;

    Ok(MessageResponse::new(format!(
        "Admin user {} registered successfully",
        user.email
    )))
}

pub async fn list_users(db: &MongoDB) -> AppResult<Vec<AdminUserView>> {
    Ok(user_service::list_users(db)
        .await?
        .into_iter()
        .map(AdminUserView::from)
        .collect())
}

/// Development helper: reveal a pending code without reading email.
pub async fn dev_verification_code(
    db: &MongoDB,
    settings: &Settings,
    request: &EmailRequest,
) -> AppResult<DevCodeResponse> {
    if !settings.dev_mode {
        return Err(AppError::Forbidden(
            "This endpoint is only available in development mode".to_string(),
        ));
    }

    let user = user_service::find_user(db, request.email.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.email_verified {
        return Ok(DevCodeResponse {
            verification_code: None,
            message: Some("Email already verified".to_string()),
        });
    }

    let code = user.verification_code.ok_or_else(|| {
        AppError::BadRequest("No verification code found. Please request a new one.".to_string())
    })?;

    Ok(DevCodeResponse {
        verification_code: Some(code),
        message: None,
    })
}
