use crate::{
    config::Settings,
    database::MongoDB,
    services::{google_service, EmailService},
};
use actix_web::{http::header, web, HttpResponse, ResponseError};
use serde::Deserialize;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Set by Google when the user cancels the consent screen
    #[serde(default)]
    pub error: Option<String>,
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

#[utoipa::path(
    get,
    path = "/api/auth/google/login",
    tag = "Auth",
    responses(
        (status = 302, description = "Redirect to the Google consent screen"),
        (status = 503, description = "Google Sign-In is not configured")
    )
)]
pub async fn google_login(settings: web::Data<Settings>) -> HttpResponse {
    log::info!("🔐 GET /auth/google/login");

    match google_service::authorization_url(&settings) {
        Ok(url) => redirect(&url),
        Err(e) => {
            log::error!("❌ Google login unavailable: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/google/callback",
    tag = "Auth",
    params(CallbackQuery),
    responses(
        (status = 302, description = "Redirect to the frontend with a token, to email verification, or to the login page with an error")
    )
)]
pub async fn google_callback(
    db: web::Data<MongoDB>,
    settings: web::Data<Settings>,
    mailer: web::Data<EmailService>,
    query: web::Query<CallbackQuery>,
) -> HttpResponse {
    log::info!("🔐 GET /auth/google/callback");

    if let Some(error) = query.error.as_deref() {
        log::warn!("⚠️  Google sign-in cancelled: {}", error);
        return redirect(&google_service::error_redirect(&settings, error));
    }

    let code = query.code.as_deref().unwrap_or_default();
    let state = query.state.as_deref().unwrap_or_default();

    match google_service::handle_callback(&db, &settings, &mailer, code, state).await {
        Ok(outcome) => {
            log::info!("✅ Google sign-in finished: {}", outcome_label(&outcome));
            redirect(&outcome.redirect_url(&settings))
        }
        Err(e) => {
            log::warn!("❌ Google sign-in failed: {}", e);
            redirect(&google_service::error_redirect(
                &settings,
                &format!("Authentication failed: {}", e),
            ))
        }
    }
}

fn outcome_label(outcome: &google_service::SignIn) -> &'static str {
    match outcome {
        google_service::SignIn::NeedsVerification { .. } => "verification pending",
        google_service::SignIn::Complete { .. } => "signed in",
    }
}
