use crate::{
    config::Settings,
    database::MongoDB,
    services::ChatProvider,
    utils::error::{AppError, AppResult},
};
use actix_web::{http::StatusCode, web, HttpResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ServiceStates {
    pub api: String,
    pub database: String,
    pub gemini_api: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// healthy, degraded or development
    pub status: String,
    /// Unix time in seconds
    pub timestamp: f64,
    pub mode: String,
    pub services: ServiceStates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_models: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthResponse {
    fn new(settings: &Settings) -> Self {
        HealthResponse {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
            mode: settings.mode().to_string(),
            services: ServiceStates {
                api: "up".to_string(),
                database: "unknown".to_string(),
                gemini_api: "unknown".to_string(),
            },
            gemini_models: None,
            gemini_api_error: None,
            error: None,
            message: None,
        }
    }

    fn is_development(&self) -> bool {
        self.mode == "development"
    }

    /// Returns the status to answer with right away, if the check cannot go on.
    fn record_database(&mut self, ping: Result<(), String>) -> Option<StatusCode> {
        match ping {
            Ok(()) => {
                self.services.database = "up".to_string();
                None
            }
            Err(error) => {
                self.services.database = "down".to_string();
                if self.is_development() {
                    self.status = "development".to_string();
                    self.message = Some(format!("Database error in development mode: {}", error));
                    self.error = Some(error);
                    None
                } else {
                    self.status = "degraded".to_string();
                    self.error = Some(error);
                    Some(StatusCode::SERVICE_UNAVAILABLE)
                }
            }
        }
    }

    /// Assistant problems are reported but never fail the check.
    fn record_gemini(&mut self, models: AppResult<Vec<String>>) {
        match models {
            Ok(models) if !models.is_empty() => {
                self.services.gemini_api = "up".to_string();
                self.gemini_models = Some(models);
            }
            Ok(_) => {
                self.services.gemini_api = "degraded".to_string();
                self.gemini_api_error = Some("No Gemini models found".to_string());
            }
            Err(e) => {
                self.services.gemini_api = "down".to_string();
                self.gemini_api_error = Some(match e {
                    AppError::Unavailable(_) => "API key not configured".to_string(),
                    other => other.to_string(),
                });

                if self.is_development() && self.services.database == "up" {
                    self.status = "development".to_string();
                    if self.message.is_none() {
                        self.message = Some("Gemini API issues in development mode".to_string());
                    }
                }
            }
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "System",
    responses(
        (status = 200, description = "Service is up (possibly in development mode)", body = HealthResponse),
        (status = 503, description = "Database unreachable in production", body = HealthResponse)
    )
)]
pub async fn health_check(
    db: web::Data<MongoDB>,
    settings: web::Data<Settings>,
    provider: web::Data<dyn ChatProvider>,
) -> HttpResponse {
    let mut report = HealthResponse::new(&settings);

    if let Some(status) = report.record_database(db.ping().await.map_err(|e| e.to_string())) {
        log::warn!("⚠️  Health check degraded: {:?}", report.error);
        return HttpResponse::build(status).json(report);
    }

    report.record_gemini(provider.list_models().await);

    HttpResponse::Ok().json(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(dev_mode: bool) -> HealthResponse {
        let mut settings = Settings::for_tests();
        settings.dev_mode = dev_mode;
        HealthResponse::new(&settings)
    }

    #[test]
    fn all_up_is_healthy() {
        let mut r = report(false);
        assert!(r.record_database(Ok(())).is_none());
        r.record_gemini(Ok(vec!["models/gemini-1.5-pro".into()]));

        assert_eq!(r.status, "healthy");
        assert_eq!(r.services.database, "up");
        assert_eq!(r.services.gemini_api, "up");
        assert_eq!(r.gemini_models.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn database_down_in_production_is_503() {
        let mut r = report(false);
        let status = r.record_database(Err("server selection timeout".into()));

        assert_eq!(status, Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(r.status, "degraded");
        assert_eq!(r.error.as_deref(), Some("server selection timeout"));
    }

    #[test]
    fn database_down_in_development_still_answers() {
        let mut r = report(true);
        assert!(r.record_database(Err("connection refused".into())).is_none());
        assert_eq!(r.status, "development");
        assert!(r.message.as_deref().unwrap().contains("connection refused"));
    }

    #[test]
    fn gemini_problems_never_fail_production() {
        let mut r = report(false);
        r.record_database(Ok(()));
        r.record_gemini(Err(AppError::Unavailable("Gemini API key not configured".into())));

        assert_eq!(r.status, "healthy");
        assert_eq!(r.services.gemini_api, "down");
        assert_eq!(r.gemini_api_error.as_deref(), Some("API key not configured"));
    }

    #[test]
    fn gemini_problems_are_flagged_in_development() {
        let mut r = report(true);
        r.record_database(Ok(()));
        r.record_gemini(Err(AppError::Internal("Failed to get response: boom".into())));

        assert_eq!(r.status, "development");
        assert_eq!(r.message.as_deref(), Some("Gemini API issues in development mode"));
    }

    struct NoModels;

    #[async_trait::async_trait]
    impl ChatProvider for NoModels {
        async fn chat(&self, _message: &str) -> AppResult<String> {
            Err(AppError::Unavailable("Gemini API key not configured".into()))
        }

        async fn list_models(&self) -> AppResult<Vec<String>> {
            Err(AppError::Unavailable("Gemini API key not configured".into()))
        }
    }

    async fn check_without_database(dev_mode: bool) -> (StatusCode, serde_json::Value) {
        use actix_web::{test, App};

        let mut settings = Settings::for_tests();
        settings.dev_mode = dev_mode;
        let db = MongoDB::new("mongodb://127.0.0.1:1/CAR_TEST", None).await.unwrap();
        let provider: web::Data<dyn ChatProvider> =
            web::Data::from(std::sync::Arc::new(NoModels) as std::sync::Arc<dyn ChatProvider>);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(settings))
                .app_data(provider)
                .route("/api/health", web::get().to(health_check)),
        )
        .await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
        let status = resp.status();
        (status, test::read_body_json(resp).await)
    }

    #[actix_web::test]
    async fn unreachable_database_is_503_in_production() {
        let (status, body) = check_without_database(false).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["services"]["database"], "down");
        assert_eq!(body["services"]["gemini_api"], "unknown");
    }

    #[actix_web::test]
    async fn unreachable_database_still_answers_in_development() {
        let (status, body) = check_without_database(true).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "development");
        assert_eq!(body["services"]["database"], "down");
        assert_eq!(body["gemini_api_error"], "API key not configured");
    }

    #[test]
    fn empty_model_list_is_degraded() {
        let mut r = report(false);
        r.record_database(Ok(()));
        r.record_gemini(Ok(vec![]));
        assert_eq!(r.services.gemini_api, "degraded");

        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("gemini_models").is_none());
        assert_eq!(json["gemini_api_error"], "No Gemini models found");
    }
}
