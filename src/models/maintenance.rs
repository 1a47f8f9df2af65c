use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TirePressure {
    pub front_left: i64,
    pub front_right: i64,
    pub rear_left: i64,
    pub rear_right: i64,
}

impl TirePressure {
    pub fn uniform(psi: i64) -> Self {
        TirePressure {
            front_left: psi,
            front_right: psi,
            rear_left: psi,
            rear_right: psi,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Warning,
    Info,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    fn new(kind: AlertKind, message: &str) -> Self {
        Alert {
            kind,
            message: message.to_string(),
        }
    }
}

/// One entry of the service history. `date` is `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MaintenanceRecord {
    pub service: String,
    pub date: String,
    pub mileage: i64,
}

/// Vehicle status as returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceStatus {
    pub oil_life: i64,
    pub battery_health: i64,
    pub current_mileage: i64,
    pub miles_until_service: i64,
    pub engine_temperature: String,
    pub temperature_status: String,
    pub tire_pressure: TirePressure,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    /// Newest first.
    #[serde(default)]
    pub maintenance_history: Vec<MaintenanceRecord>,
}

impl MaintenanceStatus {
    /// Shown the first time a user opens the dashboard.
    pub fn demo() -> Self {
        MaintenanceStatus {
            oil_life: 72,
            battery_health: 95,
            current_mileage: 45230,
            miles_until_service: 2000,
            engine_temperature: "Normal".to_string(),
            temperature_status: "Operating within normal range".to_string(),
            tire_pressure: TirePressure {
                front_left: 32,
                front_right: 32,
                rear_left: 30,
                rear_right: 31,
            },
            alerts: vec![
                Alert::new(AlertKind::Warning, "Tire rotation recommended"),
                Alert::new(AlertKind::Info, "Oil change due in 2000 miles"),
            ],
            maintenance_history: vec![
                MaintenanceRecord {
                    service: "Oil Change".to_string(),
                    date: "2024-03-15".to_string(),
                    mileage: 43000,
                },
                MaintenanceRecord {
                    service: "Brake Inspection".to_string(),
                    date: "2024-02-28".to_string(),
                    mileage: 42500,
                },
                MaintenanceRecord {
                    service: "Tire Rotation".to_string(),
                    date: "2024-02-01".to_string(),
                    mileage: 41800,
                },
            ],
        }
    }

    /// Created when the first recorded service arrives before any status exists.
    pub fn fresh(first_record: MaintenanceRecord) -> Self {
        MaintenanceStatus {
            oil_life: 100,
            battery_health: 100,
            current_mileage: first_record.mileage,
            miles_until_service: 5000,
            engine_temperature: "Normal".to_string(),
            temperature_status: "Operating within normal range".to_string(),
            tire_pressure: TirePressure::uniform(32),
            alerts: vec![],
            maintenance_history: vec![first_record],
        }
    }
}

/// Document stored in the `MAINTENANCE` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceDocument {
    pub email: String,
    #[serde(flatten)]
    pub status: MaintenanceStatus,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct MaintenanceUpdate {
    pub service: String,
    pub mileage: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update of the gauges. Owner and history are not reachable from here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceStatusPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oil_life: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_health: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_mileage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miles_until_service: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_temperature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tire_pressure: Option<TirePressure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<Alert>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_camel_case_on_the_wire() {
        let json = serde_json::to_value(MaintenanceStatus::demo()).unwrap();
        assert_eq!(json["oilLife"], 72);
        assert_eq!(json["tirePressure"]["rearLeft"], 30);
        assert_eq!(json["alerts"][0]["type"], "warning");
        assert_eq!(json["maintenanceHistory"][2]["service"], "Tire Rotation");
        assert!(json.get("email").is_none());
    }

    #[test]
    fn fresh_status_starts_from_the_record() {
        let record = MaintenanceRecord {
            service: "Oil Change".into(),
            date: "2025-01-10".into(),
            mileage: 51000,
        };
        let status = MaintenanceStatus::fresh(record.clone());
        assert_eq!(status.current_mileage, 51000);
        assert_eq!(status.tire_pressure, TirePressure::uniform(32));
        assert!(status.alerts.is_empty());
        assert_eq!(status.maintenance_history, vec![record]);
    }

    #[test]
    fn patch_ignores_owner_and_history() {
        let patch: MaintenanceStatusPatch = serde_json::from_value(serde_json::json!({
            "oilLife": 40,
            "email": "attacker@example.com",
            "maintenanceHistory": []
        }))
        .unwrap();
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "oilLife": 40 }));
    }

    #[test]
    fn document_flattens_status_next_to_owner() {
        let doc = MaintenanceDocument {
            email: "jane@example.com".into(),
            status: MaintenanceStatus::demo(),
        };
        let bson = mongodb::bson::to_document(&doc).unwrap();
        assert_eq!(bson.get_str("email").unwrap(), "jane@example.com");
        assert_eq!(bson.get_i64("currentMileage").unwrap(), 45230);
    }
}
