//! freightgrid-matching — pairs open jobs with providers.
//!
//! Scores every (job, provider) combination on six weighted factors,
//! drops pairs under the minimum score, then walks the survivors from
//! best to worst and accepts a pair only when neither side is taken yet.
//! This is a greedy approximation of maximum-weight bipartite matching,
//! kept because its cost is one sort per cycle.
//!
//! # Components
//!
//! - **`scorer`** — per-pair factor scores and ranking
//! - **`matcher`** — greedy exclusive assignment and acceptance probability
//! - **`backhaul`** — return opportunities starting at a matched job's delivery city
//! - **`unit`** — the scheduling unit that commits pairs into the cycle state

pub mod backhaul;
pub mod matcher;
pub mod scorer;
pub mod unit;

pub use backhaul::find_return_opportunity;
pub use matcher::{MatchingEngine, acceptance_probability};
pub use scorer::{ClassHierarchy, PairScore, ScoringContext, rank_pairs, score_pair};
pub use unit::{MATCHING_UNIT_NAME, MATCHING_UNIT_PRIORITY, MatchingUnit};
