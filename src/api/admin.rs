use crate::{
    database::MongoDB,
    models::AdminUserView,
    services::{
        auth_service::{self, Claims, MessageResponse, RegisterRequest},
        email_service::SmtpReport,
        EmailService,
    },
};
use actix_web::{web, HttpResponse, ResponseError};

#[utoipa::path(
    post,
    path = "/api/auth/admin/register",
    tag = "Admin",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Admin created", body = MessageResponse),
        (status = 400, description = "Invalid payload or email already registered"),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer_auth" = []))
)]
pub async fn register_admin(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<RegisterRequest>,
) -> HttpResponse {
    log::info!("🛡️  POST /auth/admin/register - by {} for {}", claims.sub, request.email);

    if let Err(e) = auth_service::require_admin(&db, &claims).await {
        return e.error_response();
    }

    match auth_service::admin_register(&db, &request).await {
        Ok(response) => {
            log::info!("✅ Admin registered: {}", request.email);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Admin registration failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/admin/users",
    tag = "Admin",
    responses(
        (status = 200, description = "All accounts without secrets", body = [AdminUserView]),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(db: web::Data<MongoDB>, claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("🛡️  GET /auth/admin/users - by {}", claims.sub);

    if let Err(e) = auth_service::require_admin(&db, &claims).await {
        return e.error_response();
    }

    match auth_service::list_users(&db).await {
        Ok(users) => {
            log::info!("✅ Listed {} users", users.len());
            HttpResponse::Ok().json(users)
        }
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/admin/test-email",
    tag = "Admin",
    responses(
        (status = 200, description = "SMTP connectivity report", body = SmtpReport),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer_auth" = []))
)]
pub async fn test_email(
    db: web::Data<MongoDB>,
    mailer: web::Data<EmailService>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    log::info!("🛡️  GET /auth/admin/test-email - by {}", claims.sub);

    if let Err(e) = auth_service::require_admin(&db, &claims).await {
        return e.error_response();
    }

    let report = mailer.test_configuration().await;
    log::info!("📧 SMTP check: {:?}", report.status);
    HttpResponse::Ok().json(report)
}
