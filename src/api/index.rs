use actix_web::HttpResponse;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct EndpointGroup {
    pub url: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ApiIndex {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: BTreeMap<&'static str, EndpointGroup>,
    pub documentation: BTreeMap<&'static str, &'static str>,
}

fn api_index() -> ApiIndex {
    let groups = [
        ("health", "/api/health", "Health check endpoint"),
        ("auth", "/api/auth", "Authentication endpoints"),
        ("gemini", "/api/gemini", "Gemini AI chat endpoints"),
        ("tire", "/api/tire", "Tire analysis endpoints"),
        ("maintenance", "/api/maintenance", "Maintenance tracking endpoints"),
    ];

    ApiIndex {
        name: "CarCare Pro API",
        version: env!("CARGO_PKG_VERSION"),
        description: "API for CarCare Pro application",
        endpoints: groups
            .into_iter()
            .map(|(name, url, description)| (name, EndpointGroup { url, description }))
            .collect(),
        documentation: BTreeMap::from([
            ("swagger", "/api/docs/"),
            ("openapi", "/api/openapi.json"),
        ]),
    }
}

#[utoipa::path(
    get,
    path = "/api",
    tag = "System",
    responses((status = 200, description = "Endpoint groups and documentation links"))
)]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(api_index())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    #[actix_web::test]
    async fn lists_every_group() {
        let app = test::init_service(App::new().route("/api", web::get().to(index))).await;
        let body: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api").to_request()).await;

        assert_eq!(body["name"], "CarCare Pro API");
        for group in ["health", "auth", "gemini", "tire", "maintenance"] {
            assert!(body["endpoints"][group]["url"].as_str().unwrap().starts_with("/api/"));
        }
        assert_eq!(body["documentation"]["openapi"], "/api/openapi.json");
    }
}
