use crate::{
    models::TireAnalysis,
    services::tire_service,
    utils::error::{AppError, AppResult},
};
use actix_multipart::Multipart;
use actix_web::{HttpResponse, ResponseError};
use futures::stream::TryStreamExt;

const IMAGE_FIELD: &str = "file";

/// Multipart form accepted by `/api/tire/analyze`.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct TireUpload {
    /// Tire photo, up to 10 MiB
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

fn upload_error(e: actix_multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart upload: {}", e))
}

/// Bytes of the `file` part; other parts are skipped.
async fn read_image(mut form: Multipart, limit: usize) -> AppResult<Vec<u8>> {
    let mut image = Vec::new();

    while let Some(mut field) = form.try_next().await.map_err(upload_error)? {
        let is_image = field.name() == Some(IMAGE_FIELD);

        while let Some(chunk) = field.try_next().await.map_err(upload_error)? {
            if !is_image {
                continue;
            }
            if image.len() + chunk.len() > limit {
                return Err(AppError::PayloadTooLarge(format!(
                    "Image exceeds the {} MiB limit",
                    limit / (1024 * 1024)
                )));
            }
            image.extend_from_slice(&chunk);
        }
    }

    if image.is_empty() {
        return Err(AppError::BadRequest("No image provided".to_string()));
    }
    Ok(image)
}

#[utoipa::path(
    post,
    path = "/api/tire/analyze",
    tag = "Tire",
    request_body(content = TireUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Condition estimate", body = TireAnalysis),
        (status = 400, description = "Missing image or malformed form"),
        (status = 413, description = "Image too large")
    )
)]
pub async fn analyze(form: Multipart) -> HttpResponse {
    log::info!("🛞 POST /tire/analyze");

    let image = match read_image(form, tire_service::MAX_IMAGE_BYTES).await {
        Ok(image) => image,
        Err(e) => {
            log::warn!("⚠️  Tire upload rejected: {}", e);
            return e.error_response();
        }
    };

    let analysis = tire_service::analyze(&image);
    log::info!("✅ Tire condition: {:.2}", analysis.condition);
    HttpResponse::Ok().json(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web, App};

    const BOUNDARY: &str = "tireboundary";

    fn form_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, bytes) in parts {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"tire.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
                    BOUNDARY, name
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload(parts: &[(&str, &[u8])]) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/analyze")
            .insert_header((
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(form_body(parts))
    }

    macro_rules! tire_app {
        () => {
            test::init_service(App::new().route("/analyze", web::post().to(analyze))).await
        };
    }

    #[actix_web::test]
    async fn analyzes_a_multipart_photo() {
        let app = tire_app!();
        let jpeg: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

        let req = upload(&[("file", jpeg)]).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let condition = body["condition"].as_f64().unwrap();
        assert!((0.3..1.0).contains(&condition));
        assert!(body["treadDepth"].as_str().unwrap().ends_with("mm"));
        assert_eq!(body["recommendations"].as_array().unwrap().len(), 3);
    }

    #[actix_web::test]
    async fn other_fields_are_ignored() {
        let app = tire_app!();
        let req = upload(&[("note", &b"front left"[..]), ("file", &[0xFF, 0xD8][..])]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn missing_file_field_is_rejected() {
        let app = tire_app!();
        let resp = test::call_service(&app, upload(&[("photo", &[0xFFu8, 0xD8][..])]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No image provided");
    }

    #[actix_web::test]
    async fn empty_file_is_rejected() {
        let app = tire_app!();
        let resp = test::call_service(&app, upload(&[("file", &b""[..])]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn json_body_is_rejected() {
        let app = tire_app!();
        let req = test::TestRequest::post()
            .uri("/analyze")
            .set_json(serde_json::json!({ "image": "..." }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn oversized_file_is_refused() {
        let app = test::init_service(App::new().route(
            "/analyze",
            web::post().to(|form: Multipart| async move {
                match read_image(form, 4).await {
                    Ok(image) => HttpResponse::Ok().body(image),
                    Err(e) => e.error_response(),
                }
            }),
        ))
        .await;

        let resp = test::call_service(&app, upload(&[("file", &b"12345"[..])]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
