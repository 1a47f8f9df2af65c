use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CarCare Pro API",
        version = "1.0.0",
        description = "Backend for CarCare Pro.\n\n**Authentication:** maintenance, profile and admin endpoints require a JWT Bearer token obtained from `/api/auth/login` or Google Sign-In.\n\n**Features:**\n- Email/password accounts with email verification\n- Google Sign-In\n- Vehicle maintenance tracking\n- Car-care assistant (Gemini)\n- Tire condition estimate"
    ),
    paths(
        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::profile,
        crate::api::auth::verify_code,
        crate::api::auth::resend_code,
        crate::api::auth::forgot_password,
        crate::api::auth::reset_password,
        crate::api::auth::dev_verification_code,
        crate::api::google::google_login,
        crate::api::google::google_callback,

        // Admin
        crate::api::admin::register_admin,
        crate::api::admin::list_users,
        crate::api::admin::test_email,

        // Maintenance
        crate::api::maintenance::get_status,
        crate::api::maintenance::add_record,
        crate::api::maintenance::update_status,
        crate::api::maintenance::delete_record,

        // Assistant & tire
        crate::api::chat::chat,
        crate::api::tire::analyze,

        // System
        crate::api::index::index,
        crate::api::health::health_check,
    ),
    components(
        schemas(
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::VerifyCodeRequest,
            crate::services::auth_service::EmailRequest,
            crate::services::auth_service::ResetPasswordRequest,
            crate::services::auth_service::TokenResponse,
            crate::services::auth_service::MessageResponse,
            crate::services::auth_service::DevCodeResponse,
            crate::services::email_service::SmtpReport,
            crate::services::email_service::SmtpStatus,
            crate::services::email_service::SmtpErrorType,
            crate::models::UserRole,
            crate::models::UserInfo,
            crate::models::UserProfile,
            crate::models::AdminUserView,
            crate::models::MaintenanceStatus,
            crate::models::MaintenanceRecord,
            crate::models::MaintenanceUpdate,
            crate::models::MaintenanceStatusPatch,
            crate::models::TirePressure,
            crate::models::Alert,
            crate::models::AlertKind,
            crate::models::ChatRequest,
            crate::models::ChatResponse,
            crate::models::TireAnalysis,
            crate::api::tire::TireUpload,
            crate::api::health::HealthResponse,
            crate::api::health::ServiceStates,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login, email verification, password reset and Google Sign-In."),
        (name = "Admin", description = "Administrator-only account management."),
        (name = "Maintenance", description = "Per-user vehicle status and service history."),
        (name = "Assistant", description = "Car-care chat assistant backed by Gemini."),
        (name = "Tire", description = "Tire condition estimate from a photo."),
        (name = "System", description = "API index and health check."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from /api/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route_group() {
        let json = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = json["paths"].as_object().unwrap();

        for path in [
            "/api/auth/login",
            "/api/auth/google/callback",
            "/api/auth/admin/users",
            "/api/maintenance/record/{index}",
            "/api/gemini/chat",
            "/api/tire/analyze",
            "/api/health",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
        assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
    }
}
