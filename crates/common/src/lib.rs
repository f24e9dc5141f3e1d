pub mod bands;
pub mod batch;
pub mod citations;
pub mod configuration;
pub mod conversation;
pub mod errors;
pub mod history;
pub mod similarity;
pub mod stats;
pub mod tokens;

pub use batch::{score_pairs, score_pairs_json, TextPair};
pub use errors::StatsError;
pub use similarity::similarity;
pub use stats::{aggregate, AggregateStats, InteractionRecord};
pub use tokens::estimate_tokens_approx;
