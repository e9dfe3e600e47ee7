// This module gathers the infrastructure the vectorizer is built on but which is not
// specific to SLP itself: the error types shared by the parser, the synthesizer and the
// command line driver, the block-level dominance analysis (reverse post-order plus
// iterative immediate dominators) behind the DominanceOracle trait, and the pass
// configuration. Everything here works on the superword IR through plain indices, so the
// analyses stay valid while the pass inserts and erases instructions.

//! Core infrastructure shared by the pass and its drivers.

pub mod analyzer;
pub mod config;
pub mod error;

pub use analyzer::{DominanceOracle, DominatorTree};
pub use config::{CodegenMode, PassConfig, SUPPORTED_WIDTH};
pub use error::{IrError, IrResult, PassError, PassResult, SynthesisError, SynthesisResult};
