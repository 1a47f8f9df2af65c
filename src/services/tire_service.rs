//! Tire inspection. There is no vision model behind this yet: the condition
//! score is drawn at random and everything else is derived from it.

use crate::models::TireAnalysis;
use rand::Rng;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const MIN_SCORE: f64 = 0.3;
const MAX_SCORE: f64 = 1.0;

pub fn analyze_with_score(score: f64) -> TireAnalysis {
    let recommendations: [&str; 3] = if score > 0.8 {
        [
            "Tire is in excellent condition",
            "Continue regular maintenance",
            "Check pressure monthly",
        ]
    } else if score > 0.6 {
        [
            "Consider rotation in next 5,000 km",
            "Monitor tread wear patterns",
            "Check alignment in next service",
        ]
    } else {
        [
            "Schedule tire replacement soon",
            "Reduce speed in wet conditions",
            "Check for uneven wear patterns",
        ]
    };

    TireAnalysis {
        condition: score,
        tread_depth: format!("{:.1}mm", score * 10.0),
        wear_pattern: if score > 0.7 { "Even wear" } else { "Uneven wear" }.to_string(),
        estimated_life: format!("{} km", (score * 20000.0) as i64),
        recommendations: recommendations.iter().map(|r| r.to_string()).collect(),
    }
}

fn draw_score() -> f64 {
    rand::rng().random_range(MIN_SCORE..MAX_SCORE)
}

/// The image is accepted but not inspected.
pub fn analyze(image: &[u8]) -> TireAnalysis {
    log::debug!("🛞 Analyzing tire image ({} bytes)", image.len());
    analyze_with_score(draw_score())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excellent_tier() {
        let analysis = analyze_with_score(0.9);
        assert_eq!(analysis.tread_depth, "9.0mm");
        assert_eq!(analysis.wear_pattern, "Even wear");
        assert_eq!(analysis.estimated_life, "18000 km");
        assert_eq!(analysis.recommendations[0], "Tire is in excellent condition");
    }

    #[test]
    fn monitor_tier_has_uneven_wear_below_point_seven() {
        let analysis = analyze_with_score(0.65);
        assert_eq!(analysis.wear_pattern, "Uneven wear");
        assert_eq!(analysis.recommendations[1], "Monitor tread wear patterns");
    }

    #[test]
    fn tier_boundaries_are_exclusive() {
        assert_eq!(
            analyze_with_score(0.8).recommendations[0],
            "Consider rotation in next 5,000 km"
        );
        assert_eq!(
            analyze_with_score(0.6).recommendations[0],
            "Schedule tire replacement soon"
        );
        assert_eq!(analyze_with_score(0.7).wear_pattern, "Uneven wear");
    }

    #[test]
    fn estimated_life_truncates() {
        assert_eq!(analyze_with_score(0.33333).estimated_life, "6666 km");
    }

    #[test]
    fn random_scores_stay_in_range() {
        for _ in 0..200 {
            let analysis = analyze(b"\x89PNG");
            assert!(analysis.condition >= MIN_SCORE && analysis.condition < MAX_SCORE);
            assert_eq!(analysis.recommendations.len(), 3);
        }
    }
}
