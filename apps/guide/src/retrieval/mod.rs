// Passage retrieval: chunking, time-of-day context and ranking.

pub mod chunker;
pub mod ranker;
pub mod time_context;

pub use ranker::{rank, retrieval_stats, RetrievalStats, DEFAULT_TOP_K};
#[cfg(test)]
pub use time_context::FixedClock;
pub use time_context::{Clock, SystemClock, TimeContext, TimePeriod};
