// Post-generation checks: the grounding guard and refusal normalization.

pub mod guard;
pub mod refusal;

pub use guard::{GroundingGuard, GuardDetails, GuardRejection, GuardVerdict};
pub use refusal::{
    ensure_canonical, is_refusal_signal, refusal_signal, statistics, CanonicalRefusal,
    RefusalReason, RefusalStatistics,
};
