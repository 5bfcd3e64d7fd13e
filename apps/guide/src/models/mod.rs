pub mod answer;
pub mod query;

pub use answer::{Answer, AnswerSource};
pub use query::Query;
