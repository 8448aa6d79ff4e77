//! Platform layer
//!
//! [`Bridge`] is a JSON facade over the session for hosts that own the
//! entitlement store themselves (the browser page talks to the cloud store;
//! the core never does). On wasm it is exported to JavaScript as `WebGame`.

#[cfg(target_arch = "wasm32")]
mod web;
#[cfg(target_arch = "wasm32")]
pub use web::WebGame;

use crate::persistence::Entitlements;
use crate::sim::{BlockId, Completion, PointerSample, Session};
use crate::tuning::Tuning;

/// String-in, string-out session driver
pub struct Bridge {
    session: Session,
}

impl Bridge {
    /// `tuning_json` may be partial; missing fields use defaults
    pub fn new(tuning_json: Option<&str>, seed: u64) -> Result<Self, serde_json::Error> {
        let tuning = match tuning_json {
            Some(json) => Tuning::from_json(json)?,
            None => Tuning::default(),
        };
        Ok(Self {
            session: Session::new(tuning, seed),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, at_ms: u64) {
        self.session.start_interaction(PointerSample::new(x, y, at_ms));
    }

    pub fn pointer_up(&mut self, x: f32, y: f32, at_ms: u64, block: u64) {
        self.session
            .end_interaction(PointerSample::new(x, y, at_ms), BlockId(block));
    }

    pub fn tick(&mut self) {
        self.session.tick();
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    pub fn replay_tutorial(&mut self) {
        self.session.replay_tutorial();
    }

    /// Pending store requests as a JSON array
    pub fn take_requests(&mut self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.session.take_requests())
    }

    /// Presentation cues as a JSON array
    pub fn take_events(&mut self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.session.take_events())
    }

    pub fn snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.session.snapshot())
    }

    /// Feed back one store reply
    pub fn complete(&mut self, json: &str) -> Result<(), serde_json::Error> {
        let completion: Completion = serde_json::from_str(json)?;
        self.session.complete(completion);
        Ok(())
    }

    /// Entitlements pushed by the host's store subscription
    pub fn push_entitlements(&mut self, json: &str) -> Result<(), serde_json::Error> {
        let entitlements: Entitlements = serde_json::from_str(json)?;
        self.session.apply_entitlements(entitlements);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::GamePhase;
    use serde_json::Value;

    #[test]
    fn test_partial_tuning_json() {
        let bridge = Bridge::new(Some(r#"{ "round_timer_ms": 4000 }"#), 1).unwrap();
        assert_eq!(bridge.session().tuning().round_timer_ms, 4_000);
        assert_eq!(bridge.session().tuning().freeze_ms, 1_000);
        assert!(Bridge::new(Some("not json"), 1).is_err());
    }

    #[test]
    fn test_refresh_round_trip_through_json() {
        let mut bridge = Bridge::new(None, 3).unwrap();
        let requests: Value = serde_json::from_str(&bridge.take_requests().unwrap()).unwrap();
        assert_eq!(requests[0]["type"], "FetchEntitlements");
        let ticket = requests[0]["ticket"].clone();

        let reply = serde_json::json!({
            "type": "Entitlements",
            "ticket": ticket,
            "entitlements": { "extra_lives": 2, "double_score_active": true, "coins": 9 }
        });
        bridge.complete(&reply.to_string()).unwrap();
        assert_eq!(bridge.session().state().extra_lives, 2);
        assert!(bridge.session().state().double_score_active);

        bridge
            .push_entitlements(r#"{ "extra_lives": 0, "double_score_active": true, "coins": 9 }"#)
            .unwrap();
        assert_eq!(bridge.session().state().extra_lives, 0);
        assert!(bridge.complete(r#"{ "type": "Nope" }"#).is_err());
    }

    #[test]
    fn test_tutorial_tap_through_pointer_calls() {
        let mut bridge = Bridge::new(None, 5).unwrap();
        let snapshot: Value = serde_json::from_str(&bridge.snapshot().unwrap()).unwrap();
        assert_eq!(snapshot["phase"], "Tutorial");
        let id = snapshot["blocks"][0]["id"].as_u64().unwrap();

        bridge.pointer_down(50.0, 50.0, 1_000);
        bridge.pointer_up(52.0, 51.0, 1_060, id);
        assert_eq!(bridge.session().state().phase(), GamePhase::Transitioning);
        let events = bridge.take_events().unwrap();
        assert!(events.contains("TutorialAdvanced"));
    }
}
