use crate::database::{is_duplicate_key, MongoDB, MAINTENANCE};
use crate::models::{
    MaintenanceDocument, MaintenanceRecord, MaintenanceStatus, MaintenanceStatusPatch,
    MaintenanceUpdate,
};
use crate::utils::error::{AppError, AppResult};
use mongodb::bson::{doc, to_bson, to_document};

fn maintenance(db: &MongoDB) -> mongodb::Collection<MaintenanceDocument> {
    db.collection::<MaintenanceDocument>(MAINTENANCE)
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

async fn find_status(db: &MongoDB, email: &str) -> AppResult<Option<MaintenanceStatus>> {
    Ok(maintenance(db)
        .find_one(doc! { "email": email })
        .await?
        .map(|document| document.status))
}

/// Status for `email`, seeding the demo dashboard on first access.
pub async fn get_status(db: &MongoDB, email: &str) -> AppResult<MaintenanceStatus> {
    if let Some(existing) = find_status(db, email).await? {
        return Ok(existing);
    }

    let seeded = MaintenanceDocument {
        email: email.to_string(),
        status: MaintenanceStatus::demo(),
    };
    match maintenance(db).insert_one(&seeded).await {
        Ok(_) => log::info!("🚗 Seeded demo maintenance data for {}", email),
        // A concurrent first request won the insert; serve what it stored.
        Err(e) if is_duplicate_key(&e) => {
            return find_status(db, email).await?.ok_or_else(|| {
                AppError::Internal("Maintenance data vanished after insert".to_string())
            });
        }
        Err(e) => return Err(e.into()),
    }

    Ok(seeded.status)
}

pub fn validate_update(update: &MaintenanceUpdate) -> AppResult<()> {
    if update.service.trim().is_empty() {
        return Err(AppError::BadRequest("Service is required".to_string()));
    }
    if update.mileage < 0 {
        return Err(AppError::BadRequest("Mileage cannot be negative".to_string()));
    }
    Ok(())
}

/// Prepends `record` to the history; false when the user has no document yet.
async fn push_record(db: &MongoDB, email: &str, record: &MaintenanceRecord) -> AppResult<bool> {
    let result = maintenance(db)
        .update_one(
            doc! { "email": email },
            doc! {
                "$push": {
                    "maintenanceHistory": {
                        "$each": [{
                            "service": &record.service,
                            "date": &record.date,
                            "mileage": record.mileage,
                        }],
                        "$position": 0,
                    }
                },
                "$set": { "currentMileage": record.mileage },
            },
        )
        .await?;

    Ok(result.matched_count > 0)
}

/// Prepends a service entry dated today and moves the odometer.
pub async fn add_record(
    db: &MongoDB,
    email: &str,
    update: &MaintenanceUpdate,
) -> AppResult<MaintenanceRecord> {
    validate_update(update)?;

    let record = MaintenanceRecord {
        service: update.service.trim().to_string(),
        date: today(),
        mileage: update.mileage,
    };

    if !push_record(db, email, &record).await? {
        let fresh = MaintenanceDocument {
            email: email.to_string(),
            status: MaintenanceStatus::fresh(record.clone()),
        };
        match maintenance(db).insert_one(&fresh).await {
            Ok(_) => log::info!("🚗 Created maintenance data for {} from first record", email),
            Err(e) if is_duplicate_key(&e) => {
                push_record(db, email, &record).await?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(notes) = update.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        log::debug!("📝 Notes for {} ({}): {}", email, record.service, notes);
    }

    Ok(record)
}

pub fn validate_patch(patch: &MaintenanceStatusPatch) -> AppResult<()> {
    let percent = |name: &str, value: Option<i64>| match value {
        Some(v) if !(0..=100).contains(&v) => Err(AppError::BadRequest(format!(
            "{} must be between 0 and 100",
            name
        ))),
        _ => Ok(()),
    };
    percent("oilLife", patch.oil_life)?;
    percent("batteryHealth", patch.battery_health)?;

    if patch.current_mileage.is_some_and(|m| m < 0) {
        return Err(AppError::BadRequest("currentMileage cannot be negative".to_string()));
    }
    Ok(())
}

pub async fn update_status(
    db: &MongoDB,
    email: &str,
    patch: &MaintenanceStatusPatch,
) -> AppResult<()> {
    validate_patch(patch)?;

    let fields = to_document(patch)
        .map_err(|e| AppError::Internal(format!("Failed to encode update: {}", e)))?;
    if fields.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    let result = maintenance(db)
        .update_one(doc! { "email": email }, doc! { "$set": fields })
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound(
            "No maintenance data found to update".to_string(),
        ));
    }
    Ok(())
}

/// Index 0 is the newest entry.
pub fn remove_history_entry(
    status: &mut MaintenanceStatus,
    index: usize,
) -> Option<MaintenanceRecord> {
    if index < status.maintenance_history.len() {
        Some(status.maintenance_history.remove(index))
    } else {
        None
    }
}

pub async fn delete_record(db: &MongoDB, email: &str, index: usize) -> AppResult<MaintenanceRecord> {
    let mut document = maintenance(db)
        .find_one(doc! { "email": email })
        .await?
        .ok_or_else(|| AppError::NotFound("No maintenance data found".to_string()))?;

    let removed = remove_history_entry(&mut document.status, index).ok_or_else(|| {
        AppError::NotFound(format!("No maintenance record at index {}", index))
    })?;

    let history = to_bson(&document.status.maintenance_history)
        .map_err(|e| AppError::Internal(format!("Failed to encode history: {}", e)))?;

    maintenance(db)
        .update_one(
            doc! { "email": email },
            doc! { "$set": { "maintenanceHistory": history } },
        )
        .await?;

    Ok(removed)
}
