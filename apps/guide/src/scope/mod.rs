pub mod gate;

pub use gate::{Rejection, ScopeDecision, ScopeGate, Topic, MAX_QUERY_CHARS};
