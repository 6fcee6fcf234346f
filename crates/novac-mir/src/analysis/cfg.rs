//! Control-flow graph, dominance, and reachability for HIR functions.
//!
//! Dominators use the standard iterative data-flow fixed point:
//! `dom(entry) = {entry}`, `dom(b) = {b} ∪ ⋂ dom(preds(b))`, iterated until
//! stable. Quadratic in the worst case, which is fine at the block counts a
//! single function produces.

use std::collections::VecDeque;

use novac_hir::{BlockId, HirFunction};
use novac_util::{FxHashMap, FxHashSet};

pub struct ControlFlowGraph {
    pub predecessors: FxHashMap<BlockId, Vec<BlockId>>,
    pub successors: FxHashMap<BlockId, Vec<BlockId>>,
    /// Full dominator sets per block.
    pub dominators: FxHashMap<BlockId, FxHashSet<BlockId>>,
    /// Forward reachability: `reachable[b]` is every block reachable from
    /// `b`, including itself.
    reachable: FxHashMap<BlockId, FxHashSet<BlockId>>,
}

impl ControlFlowGraph {
    pub fn new(func: &HirFunction) -> Self {
        let mut predecessors: FxHashMap<BlockId, Vec<BlockId>> = FxHashMap::default();
        let mut successors: FxHashMap<BlockId, Vec<BlockId>> = FxHashMap::default();

        for block in func.blocks.indices() {
            predecessors.entry(block).or_default();
            successors.entry(block).or_default();
        }
        for block in func.blocks.indices() {
            for succ in func.successors(block) {
                successors.get_mut(&block).unwrap().push(succ);
                predecessors.get_mut(&succ).unwrap().push(block);
            }
        }

        let mut cfg = Self {
            predecessors,
            successors,
            dominators: FxHashMap::default(),
            reachable: FxHashMap::default(),
        };
        cfg.compute_dominators(func);
        cfg.compute_reachability(func);
        cfg
    }

    fn compute_dominators(&mut self, func: &HirFunction) {
        let blocks: Vec<BlockId> = func.blocks.indices().collect();
        if blocks.is_empty() {
            return;
        }
        let entry = func.entry();

        // Initialize: entry dominates itself; every other block starts with
        // the full set.
        let all: FxHashSet<BlockId> = blocks.iter().copied().collect();
        let mut doms: FxHashMap<BlockId, FxHashSet<BlockId>> = FxHashMap::default();
        for &block in &blocks {
            if block == entry {
                let mut set = FxHashSet::default();
                set.insert(entry);
                doms.insert(block, set);
            } else {
                doms.insert(block, all.clone());
            }
        }

        // Iterate to the fixed point.
        let mut changed = true;
        while changed {
            changed = false;
            for &block in &blocks {
                if block == entry {
                    continue;
                }
                let preds = &self.predecessors[&block];
                let mut new_dom: Option<FxHashSet<BlockId>> = None;
                for pred in preds {
                    let pred_dom = &doms[pred];
                    new_dom = Some(match new_dom {
                        None => pred_dom.clone(),
                        Some(acc) => acc.intersection(pred_dom).copied().collect(),
                    });
                }
                let mut new_dom = new_dom.unwrap_or_default();
                new_dom.insert(block);

                if new_dom != doms[&block] {
                    doms.insert(block, new_dom);
                    changed = true;
                }
            }
        }

        self.dominators = doms;
    }

    fn compute_reachability(&mut self, func: &HirFunction) {
        for start in func.blocks.indices() {
            let mut visited = FxHashSet::default();
            let mut queue = VecDeque::new();
            visited.insert(start);
            queue.push_back(start);
            while let Some(block) = queue.pop_front() {
                for &succ in &self.successors[&block] {
                    if visited.insert(succ) {
                        queue.push_back(succ);
                    }
                }
            }
            self.reachable.insert(start, visited);
        }
    }

    /// `a` dominates `b` (reflexive).
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        self.dominators
            .get(&b)
            .map(|doms| doms.contains(&a))
            .unwrap_or(false)
    }

    /// `to` is reachable from `from` (reflexive).
    pub fn reaches(&self, from: BlockId, to: BlockId) -> bool {
        self.reachable
            .get(&from)
            .map(|set| set.contains(&to))
            .unwrap_or(false)
    }

    pub fn preds(&self, block: BlockId) -> &[BlockId] {
        self.predecessors
            .get(&block)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn succs(&self, block: BlockId) -> &[BlockId] {
        self.successors
            .get(&block)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}
