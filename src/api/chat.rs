use crate::{
    models::{ChatRequest, ChatResponse},
    services::ChatProvider,
    utils::error::AppError,
};
use actix_web::{web, HttpResponse, ResponseError};

#[utoipa::path(
    post,
    path = "/api/gemini/chat",
    tag = "Assistant",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant answer", body = ChatResponse),
        (status = 400, description = "Empty message"),
        (status = 429, description = "Upstream rate limit"),
        (status = 503, description = "Assistant unavailable")
    )
)]
pub async fn chat(
    provider: web::Data<dyn ChatProvider>,
    request: web::Json<ChatRequest>,
) -> HttpResponse {
    let message = request.message.as_str();
    if message.trim().is_empty() {
        return AppError::BadRequest("Message cannot be empty".to_string()).error_response();
    }

    let preview: String = message.trim().chars().take(50).collect();
    log::info!("🤖 POST /gemini/chat - \"{}\"", preview);

    match provider.chat(message).await {
        Ok(response) => {
            log::info!("✅ Assistant answered ({} chars)", response.len());
            HttpResponse::Ok().json(ChatResponse { response })
        }
        Err(e) => {
            log::error!("❌ Assistant failed: {}", e);
            e.error_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::AppResult;
    use actix_web::{http::StatusCode, test, App};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl ChatProvider for Echo {
        async fn chat(&self, message: &str) -> AppResult<String> {
            Ok(format!("echo: {}", message))
        }

        async fn list_models(&self) -> AppResult<Vec<String>> {
            Ok(vec!["models/echo".to_string()])
        }
    }

    struct Throttled;

    #[async_trait]
    impl ChatProvider for Throttled {
        async fn chat(&self, _message: &str) -> AppResult<String> {
            Err(AppError::RateLimited("Rate limit exceeded. Please try again later.".into()))
        }

        async fn list_models(&self) -> AppResult<Vec<String>> {
            Ok(vec![])
        }
    }

    fn provider(p: Arc<dyn ChatProvider>) -> web::Data<dyn ChatProvider> {
        web::Data::from(p)
    }

    #[actix_web::test]
    async fn message_is_forwarded_as_sent() {
        let app = test::init_service(
            App::new()
                .app_data(provider(Arc::new(Echo)))
                .route("/chat", web::post().to(chat)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(serde_json::json!({ "message": "  oil?  " }))
            .to_request();
        let body: ChatResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.response, "echo:   oil?  ");
    }

    #[actix_web::test]
    async fn blank_message_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(provider(Arc::new(Echo)))
                .route("/chat", web::post().to(chat)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(serde_json::json!({ "message": "   " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Message cannot be empty");
    }

    #[actix_web::test]
    async fn provider_errors_keep_their_status() {
        let app = test::init_service(
            App::new()
                .app_data(provider(Arc::new(Throttled)))
                .route("/chat", web::post().to(chat)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(serde_json::json!({ "message": "hello" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
