use crate::{
    database::MongoDB,
    models::{MaintenanceRecord, MaintenanceStatus, MaintenanceStatusPatch, MaintenanceUpdate},
    services::{
        auth_service::{self, Claims},
        maintenance_service,
    },
};
use actix_web::{web, HttpResponse, ResponseError};

#[utoipa::path(
    get,
    path = "/api/maintenance/status",
    tag = "Maintenance",
    responses(
        (status = 200, description = "Vehicle status; seeded with demo data on first access", body = MaintenanceStatus),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_status(db: web::Data<MongoDB>, claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("🚗 GET /maintenance/status - {}", claims.sub);

    let user = match auth_service::current_user(&db, &claims).await {
        Ok(user) => user,
        Err(e) => return e.error_response(),
    };

    match maintenance_service::get_status(&db, &user.email).await {
        Ok(status) => HttpResponse::Ok().json(status),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/maintenance/record",
    tag = "Maintenance",
    request_body = MaintenanceUpdate,
    responses(
        (status = 200, description = "Record added to the top of the history"),
        (status = 400, description = "Missing service or negative mileage")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_record(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<MaintenanceUpdate>,
) -> HttpResponse {
    log::info!("🔧 POST /maintenance/record - {} ({})", claims.sub, request.service);

    let user = match auth_service::current_user(&db, &claims).await {
        Ok(user) => user,
        Err(e) => return e.error_response(),
    };

    match maintenance_service::add_record(&db, &user.email, &request).await {
        Ok(record) => {
            log::info!("✅ Maintenance record added for {}", user.email);
            HttpResponse::Ok().json(serde_json::json!({
                "message": "Maintenance record added successfully",
                "record": record
            }))
        }
        Err(e) => {
            log::warn!("❌ Failed to add maintenance record for {}: {}", user.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/maintenance/update",
    tag = "Maintenance",
    request_body = MaintenanceStatusPatch,
    responses(
        (status = 200, description = "Status updated"),
        (status = 400, description = "Empty or out-of-range update"),
        (status = 404, description = "No maintenance data yet")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_status(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    patch: web::Json<MaintenanceStatusPatch>,
) -> HttpResponse {
    log::info!("🔧 PUT /maintenance/update - {}", claims.sub);

    let user = match auth_service::current_user(&db, &claims).await {
        Ok(user) => user,
        Err(e) => return e.error_response(),
    };

    match maintenance_service::update_status(&db, &user.email, &patch).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Maintenance status updated successfully"
        })),
        Err(e) => {
            log::warn!("❌ Failed to update maintenance status for {}: {}", user.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/maintenance/record/{index}",
    tag = "Maintenance",
    params(("index" = usize, Path, description = "Position in the history, 0 = newest")),
    responses(
        (status = 200, description = "Record removed", body = MaintenanceRecord),
        (status = 404, description = "No such record")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_record(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<usize>,
) -> HttpResponse {
    let index = path.into_inner();
    log::info!("🗑️  DELETE /maintenance/record/{} - {}", index, claims.sub);

    let user = match auth_service::current_user(&db, &claims).await {
        Ok(user) => user,
        Err(e) => return e.error_response(),
    };

    match maintenance_service::delete_record(&db, &user.email, index).await {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => e.error_response(),
    }
}
