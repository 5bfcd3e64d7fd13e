use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::reference::City;
use crate::scope::{Rejection, ScopeGate, Topic};

/// One user turn, as validated by the scope gate. Never changes afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Query {
    pub id: Uuid,
    pub raw_text: String,
    /// Whitespace-collapsed, punctuation-squeezed form that validation ran on.
    pub text: String,
    pub city: City,
    pub is_valid: bool,
    pub topic: Option<Topic>,
    pub rejection: Option<Rejection>,
    pub asked_at: DateTime<Utc>,
}

impl Query {
    pub fn validate(gate: &ScopeGate, raw: &str, city: City, asked_at: DateTime<Utc>) -> Self {
        let decision = gate.classify(raw);
        Self {
            id: Uuid::new_v4(),
            raw_text: raw.to_string(),
            text: gate.preprocess(raw),
            city,
            is_valid: decision.is_valid,
            topic: decision.topic,
            rejection: decision.rejection,
            asked_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_query_keeps_raw_and_preprocessed_text() {
        let q = Query::validate(&ScopeGate::new(), "  best   biryani??? ", City::Dindigul, Utc::now());
        assert!(q.is_valid);
        assert_eq!(q.raw_text, "  best   biryani??? ");
        assert_eq!(q.text, "best biryani?");
        assert_eq!(q.topic, Some(Topic::Food));
        assert_eq!(q.rejection, None);
    }

    #[test]
    fn test_rejected_query_serializes_label() {
        let q = Query::validate(&ScopeGate::new(), "", City::Madurai, Utc::now());
        assert!(!q.is_valid);
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["rejection"], "empty");
        assert_eq!(json["city"], "madurai");
    }
}
