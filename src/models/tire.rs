use serde::{Deserialize, Serialize};

/// Result of a (simulated) tire inspection.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TireAnalysis {
    /// Score in `[0, 1)`, higher is better
    pub condition: f64,
    pub tread_depth: String,
    pub wear_pattern: String,
    pub estimated_life: String,
    pub recommendations: Vec<String>,
}
