use crate::{
    config::Settings,
    database::MongoDB,
    models::UserProfile,
    services::{
        auth_service::{
            self, Claims, DevCodeResponse, EmailRequest, LoginRequest, MessageResponse,
            RegisterRequest, ResetPasswordRequest, TokenResponse, VerifyCodeRequest,
        },
        EmailService,
    },
};
use actix_web::{web, HttpResponse, ResponseError};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created, verification code sent", body = MessageResponse),
        (status = 400, description = "Invalid payload or email already registered")
    )
)]
pub async fn register(
    db: web::Data<MongoDB>,
    mailer: web::Data<EmailService>,
    request: web::Json<RegisterRequest>,
) -> HttpResponse {
    log::info!("📝 POST /auth/register - email: {}", request.email);

    match auth_service::register(&db, &mailer, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Email not verified; see the X-Redirect header")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    settings: web::Data<Settings>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.username);

    match auth_service::login(&db, &settings, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", request.username);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.username, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User no longer exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn profile(db: web::Data<MongoDB>, claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("👤 GET /auth/profile - {}", claims.sub);

    match auth_service::get_profile(&db, &claims).await {
        Ok(profile) => HttpResponse::Ok().json(profile),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-code",
    tag = "Auth",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Email verified (or already verified)", body = MessageResponse),
        (status = 400, description = "Missing, expired or wrong code"),
        (status = 404, description = "Unknown email")
    )
)]
pub async fn verify_code(
    db: web::Data<MongoDB>,
    request: web::Json<VerifyCodeRequest>,
) -> HttpResponse {
    log::info!("✉️  POST /auth/verify-code - email: {}", request.email);

    match auth_service::verify_code(&db, &request).await {
        Ok(response) => {
            log::info!("✅ Email verified: {}", request.email);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Verification failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/resend-code",
    tag = "Auth",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "New code sent", body = MessageResponse),
        (status = 404, description = "Unknown email")
    )
)]
pub async fn resend_code(
    db: web::Data<MongoDB>,
    mailer: web::Data<EmailService>,
    request: web::Json<EmailRequest>,
) -> HttpResponse {
    log::info!("🔁 POST /auth/resend-code - email: {}", request.email);

    match auth_service::resend_code(&db, &mailer, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Always answered the same way", body = MessageResponse)
    )
)]
pub async fn forgot_password(
    db: web::Data<MongoDB>,
    settings: web::Data<Settings>,
    mailer: web::Data<EmailService>,
    request: web::Json<EmailRequest>,
) -> HttpResponse {
    log::info!("🔑 POST /auth/forgot-password");

    match auth_service::forgot_password(&db, &settings, &mailer, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid or expired reset token")
    )
)]
pub async fn reset_password(
    db: web::Data<MongoDB>,
    request: web::Json<ResetPasswordRequest>,
) -> HttpResponse {
    log::info!("🔑 POST /auth/reset-password - email: {}", request.email);

    match auth_service::reset_password(&db, &request).await {
        Ok(response) => {
            log::info!("✅ Password reset: {}", request.email);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Password reset failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/dev/get-verification-code",
    tag = "Auth",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Pending code", body = DevCodeResponse),
        (status = 403, description = "Not running in development mode")
    )
)]
pub async fn dev_verification_code(
    db: web::Data<MongoDB>,
    settings: web::Data<Settings>,
    request: web::Json<EmailRequest>,
) -> HttpResponse {
    log::info!("🛠️  POST /auth/dev/get-verification-code - email: {}", request.email);

    match auth_service::dev_verification_code(&db, &settings, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}
