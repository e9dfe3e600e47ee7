//! Superword - 2-lane SLP vectorization over a small SSA IR.
//!
//! The crate reads an LLVM flavoured textual IR, finds chains of structurally
//! identical scalar instructions fed by adjacent memory accesses, and merges
//! each chain into 2-lane vector instructions.
//!
//! # Primary Usage
//!
//! ```
//! use superword::ir::Module;
//! use superword::{PassConfig, SlpPass};
//!
//! let text = "define void @f(i32* %p) {\nentry:\n  ret void\n}\n";
//! let mut module = Module::parse(text)?;
//! let pass = SlpPass::new(PassConfig::default())?;
//! let stats = pass.run_on_module(&mut module)?;
//! print!("{}", stats);
//! # Ok::<(), superword::PassError>(())
//! ```
//!
//! # Architecture
//!
//! - [`ir`] - IR data model, parser, printer and the FileCheck harness
//! - [`core`] - Shared infrastructure (errors, dominator tree, configuration)
//! - [`slp`] - The vectorization pass

pub mod core;
pub mod ir;
pub mod slp;

pub use core::{
    CodegenMode, DominanceOracle, DominatorTree, IrError, IrResult, PassConfig, PassError,
    PassResult, SynthesisError, SynthesisResult,
};
pub use slp::{SlpPass, Statistics};
