// This module drives the vectorizer over a module. Functions are visited in declaration
// order (declarations and functions outside the configured filter are skipped), blocks
// in layout order. Each function gets one dominator tree, computed before any mutation;
// the pass never changes the CFG so the tree stays valid for the whole function. Each
// block works from a snapshot of its instruction order taken into the per-block bump
// arena, walked from the last instruction to the first. A store that no earlier chain
// claimed searches backward for the nearest adjacent, isomorphic and unclaimed store and
// seeds the chain collector with it; a load searches forward in the same way. Every
// chain is merged into the block's master list (which is what "claimed" means for later
// seeds), counted in the statistics, and handed to the synthesizer in Full mode. A
// chain the synthesizer refuses is logged and counted, and its scalars stay in place.
// The arena is reset once the block is done, dropping every pair list at once.

//! Module, function and block driver of the SLP pass.

use bumpalo::Bump;
use log::{debug, info, warn};

use super::adjacency::{adjacent_loads, adjacent_stores};
use super::collector::ChainCollector;
use super::dominance::Dominance;
use super::isomorphism::isomorphic;
use super::pair_list::OrderedPairList;
use super::stats::{SeedKind, Statistics};
use super::synthesizer::VectorSynthesizer;
use crate::core::analyzer::DominatorTree;
use crate::core::config::{CodegenMode, PassConfig};
use crate::core::error::{PassError, PassResult};
use crate::ir::{BlockId, Function, InstId, Module};

/// The 2-lane superword vectorization pass.
#[derive(Debug, Clone)]
pub struct SlpPass {
    config: PassConfig,
}

impl SlpPass {
    /// Create a pass, rejecting configurations it cannot honour.
    pub fn new(config: PassConfig) -> PassResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PassConfig {
        &self.config
    }

    /// Run over every selected function definition of `module`.
    ///
    /// Fails before touching the module if the function filter names a
    /// function the module does not have.
    pub fn run_on_module(&self, module: &mut Module) -> PassResult<Statistics> {
        if let Some(names) = &self.config.functions {
            if let Some(missing) = names.iter().find(|name| module.function(name).is_none()) {
                return Err(PassError::FunctionNotFound { name: missing.clone() });
            }
        }

        let mut bump = Bump::new();
        let mut stats = Statistics::new();
        for func in module.functions.iter_mut() {
            if func.declaration || !self.config.selects(&func.name) {
                continue;
            }
            self.run_on_function(func, &mut bump, &mut stats);
        }

        info!(
            "slp: {} chains ({} store, {} load), {} vectorized, {} aborted, {} instructions emitted",
            stats.total_chains(),
            stats.store_chains,
            stats.load_chains,
            stats.vectorized_chains,
            stats.aborted_chains,
            stats.emitted_instructions
        );
        Ok(stats)
    }

    /// Run over every block of one function. `bump` is reset after each block.
    pub fn run_on_function(&self, func: &mut Function, bump: &mut Bump, stats: &mut Statistics) {
        debug!("slp: function @{}", func.name);
        let tree = DominatorTree::compute(func);
        let dom = Dominance::new(&tree);

        let blocks: Vec<BlockId> = func.blocks().collect();
        for block in blocks {
            self.run_on_block(func, block, &dom, bump, stats);
            bump.reset();
        }
    }

    /// Seed, collect and synthesize every chain of one block.
    pub fn run_on_block(
        &self,
        func: &mut Function,
        block: BlockId,
        dom: &Dominance<'_>,
        bump: &Bump,
        stats: &mut Statistics,
    ) {
        let snapshot: &[InstId] = bump.alloc_slice_copy(func.block_insts(block));
        let mut master = OrderedPairList::new_in(bump);

        for &inst in snapshot.iter().rev() {
            if !func.is_live(inst) || !master.not_vector(inst) {
                continue;
            }
            let seed = match func.inst(inst) {
                data if data.is_store() => SeedKind::Store,
                data if data.is_load() => SeedKind::Load,
                _ => continue,
            };

            let mut chain = OrderedPairList::new_in(bump);
            for claimed in master.visited() {
                chain.reserve(claimed);
            }
            self.grow_chain(func, *dom, &master, &mut chain, inst, seed);

            master.merge(func, dom, &chain);
            stats.record_chain(chain.len(), seed);
            if chain.is_empty() {
                continue;
            }
            debug!(
                "slp: {:?} chain of {} pairs seeded at {}",
                seed,
                chain.len(),
                func.display_inst(inst)
            );

            if self.config.mode == CodegenMode::Full {
                self.synthesize_chain(func, *dom, &chain, stats);
            }
        }
    }

    /// Pair `seed` with the nearest matching access and collect from there.
    ///
    /// Stores look backward and loads forward. The search stops at the first
    /// candidate that yields a chain.
    fn grow_chain(
        &self,
        func: &Function,
        dom: Dominance<'_>,
        master: &OrderedPairList<'_>,
        chain: &mut OrderedPairList<'_>,
        seed: InstId,
        kind: SeedKind,
    ) {
        let collector = ChainCollector::new(func, dom);
        let step = |id: InstId| match kind {
            SeedKind::Store => func.prev_inst(id),
            SeedKind::Load => func.next_inst(id),
        };

        let mut cursor = step(seed);
        while let Some(candidate) = cursor {
            let data = func.inst(candidate);
            let matches = match kind {
                SeedKind::Store => data.is_store() && adjacent_stores(func, seed, candidate),
                SeedKind::Load => data.is_load() && adjacent_loads(func, seed, candidate),
            };
            if matches
                && isomorphic(func, seed.into(), candidate.into())
                && master.not_vector(candidate)
            {
                collector.collect(chain, seed, candidate);
                if !chain.is_empty() {
                    break;
                }
            }
            cursor = step(candidate);
        }
    }

    fn synthesize_chain(
        &self,
        func: &mut Function,
        dom: Dominance<'_>,
        chain: &OrderedPairList<'_>,
        stats: &mut Statistics,
    ) {
        let synthesizer = VectorSynthesizer::new(self.config.width, dom);
        match synthesizer.vectorize(func, chain) {
            Ok(result) => {
                info!(
                    "slp: vectorized {} pairs in @{} ({} instructions emitted)",
                    result.vectors.len(),
                    func.name,
                    result.emitted
                );
                stats.vectorized_chains += 1;
                stats.emitted_instructions += result.emitted as u64;
            }
            Err(err) => {
                warn!("slp: chain left scalar in @{}: {}", func.name, err);
                stats.aborted_chains += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Opcode;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    const SUM: &str = r#"
define void @sum([4 x i32]* %A, [4 x i32]* %B, [4 x i32]* %C) {
entry:
  %pa0 = getelementptr [4 x i32]* %A, i64 0, i64 0
  %pa1 = getelementptr [4 x i32]* %A, i64 0, i64 1
  %pb0 = getelementptr [4 x i32]* %B, i64 0, i64 0
  %pb1 = getelementptr [4 x i32]* %B, i64 0, i64 1
  %pc0 = getelementptr [4 x i32]* %C, i64 0, i64 0
  %pc1 = getelementptr [4 x i32]* %C, i64 0, i64 1
  %a0 = load i32, i32* %pa0
  %a1 = load i32, i32* %pa1
  %b0 = load i32, i32* %pb0
  %b1 = load i32, i32* %pb1
  %s0 = add i32 %a0, %b0
  %s1 = add i32 %a1, %b1
  store i32 %s0, i32* %pc0
  store i32 %s1, i32* %pc1
  ret void
}

declare void @ext(i32)
"#;

    fn count(func: &Function, opcode: Opcode) -> usize {
        func.live_insts().filter(|&id| func.inst(id).opcode == opcode).count()
    }

    #[test]
    fn test_rejects_unsupported_width() {
        let err = SlpPass::new(PassConfig::default().with_width(8)).unwrap_err();
        assert!(matches!(err, PassError::UnsupportedWidth { width: 8 }));
    }

    #[test]
    fn test_full_run_vectorizes_sum() {
        init();
        let mut module = Module::parse(SUM).unwrap();
        let pass = SlpPass::new(PassConfig::default()).unwrap();
        let stats = pass.run_on_module(&mut module).unwrap();

        assert_eq!(stats.store_chains, 1);
        assert_eq!(stats.load_chains, 0);
        assert_eq!(stats.size_4, 1);
        assert_eq!(stats.vectorized_chains, 1);
        assert_eq!(stats.aborted_chains, 0);

        let func = module.function("sum").unwrap();
        assert_eq!(count(func, Opcode::Store), 1);
        assert_eq!(count(func, Opcode::Load), 2);
        assert_eq!(count(func, Opcode::Add), 1);
        assert_eq!(count(func, Opcode::ExtractElement), 0);
        Module::parse(&module.to_string()).unwrap();
    }

    #[test]
    fn test_analyze_only_leaves_ir() {
        init();
        let mut module = Module::parse(SUM).unwrap();
        let before = module.to_string();
        let config = PassConfig::default().with_mode(CodegenMode::AnalyzeOnly);
        let stats = SlpPass::new(config).unwrap().run_on_module(&mut module).unwrap();

        assert_eq!(stats.size_4, 1);
        assert_eq!(stats.vectorized_chains, 0);
        assert_eq!(module.to_string(), before);
    }

    #[test]
    fn test_function_filter() {
        init();
        let mut module = Module::parse(SUM).unwrap();
        let config = PassConfig::default().with_functions(["other"]);
        let err = SlpPass::new(config).unwrap().run_on_module(&mut module).unwrap_err();
        assert!(matches!(err, PassError::FunctionNotFound { ref name } if name == "other"));

        let config = PassConfig::default().with_functions(["ext"]);
        let stats = SlpPass::new(config).unwrap().run_on_module(&mut module).unwrap();
        assert_eq!(stats.total_chains(), 0);
    }

    #[test]
    fn test_loads_seed_forward() {
        init();
        let mut module = Module::parse(
            r#"
define i32 @dot([2 x i32]* %A) {
entry:
  %p0 = getelementptr [2 x i32]* %A, i64 0, i64 0
  %p1 = getelementptr [2 x i32]* %A, i64 0, i64 1
  %x0 = load i32, i32* %p0
  %x1 = load i32, i32* %p1
  %r = add i32 %x0, %x1
  ret i32 %r
}
"#,
        )
        .unwrap();
        let pass = SlpPass::new(PassConfig::default()).unwrap();
        let stats = pass.run_on_module(&mut module).unwrap();

        assert_eq!(stats.load_chains, 1);
        assert_eq!(stats.size_1, 1);
        assert_eq!(stats.vectorized_chains, 1);

        let func = module.function("dot").unwrap();
        assert_eq!(count(func, Opcode::Load), 1);
        assert_eq!(count(func, Opcode::ExtractElement), 2);
        Module::parse(&module.to_string()).unwrap();
    }
}
