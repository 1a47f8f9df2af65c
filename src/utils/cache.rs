// Single-use OAuth `state` values, kept in memory between the redirect to
// Google and the callback.
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

const STATE_TTL: Duration = Duration::from_secs(600);

lazy_static::lazy_static! {
    static ref OAUTH_STATES: RwLock<HashMap<String, Instant>> = RwLock::new(HashMap::new());
}

/// Registers a fresh state value and returns it.
pub fn issue_oauth_state() -> String {
    let state = uuid::Uuid::new_v4().to_string();
    if let Ok(mut states) = OAUTH_STATES.write() {
        states.retain(|_, issued| issued.elapsed() < STATE_TTL);
        states.insert(state.clone(), Instant::now());
    }
    state
}

/// Removes `state` from the store; true only if it was issued here and is still fresh.
pub fn consume_oauth_state(state: &str) -> bool {
    let Ok(mut states) = OAUTH_STATES.write() else {
        return false;
    };
    match states.remove(state) {
        Some(issued) => issued.elapsed() < STATE_TTL,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_is_single_use() {
        let state = issue_oauth_state();
        assert!(consume_oauth_state(&state));
        assert!(!consume_oauth_state(&state));
    }

    #[test]
    fn unknown_state_is_rejected() {
        assert!(!consume_oauth_state("forged-state"));
    }

    #[test]
    fn expired_state_is_rejected() {
        let Some(issued) = Instant::now().checked_sub(STATE_TTL + Duration::from_secs(1)) else {
            return; // monotonic clock younger than the TTL
        };
        let state = "stale-state".to_string();
        OAUTH_STATES.write().unwrap().insert(state.clone(), issued);
        assert!(!consume_oauth_state(&state));
    }
}
