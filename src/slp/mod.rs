// This module is the superword-level parallelism pass itself. The predicates
// (instruction dominance, isomorphism, address adjacency, the eligibility filter) decide
// which scalar pairs may share a vector instruction; the chain collector grows a seed
// pair of adjacent memory accesses into every structurally parallel operand pair feeding
// it; the ordered pair list keeps the result in dominance order; the synthesizer rewrites
// a chain into 2-lane vector code; and the driver ties these together per block and
// accumulates the run statistics.

//! 2-lane SLP vectorization.

pub mod adjacency;
pub mod collector;
pub mod dominance;
pub mod driver;
pub mod eligibility;
pub mod isomorphism;
pub mod pair_list;
pub mod stats;
pub mod synthesizer;

pub use adjacency::{adjacent_loads, adjacent_stores};
pub use collector::ChainCollector;
pub use dominance::Dominance;
pub use driver::SlpPass;
pub use eligibility::should_vectorize;
pub use isomorphism::isomorphic;
pub use pair_list::{InstPair, OrderedPairList};
pub use stats::{SeedKind, Statistics};
pub use synthesizer::{VectorSynthesizer, Vectorized};
