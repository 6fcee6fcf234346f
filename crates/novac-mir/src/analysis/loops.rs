//! Loop and switch context analysis.
//!
//! Loop headers are identified structurally on the HIR graph: a block with a
//! conditional terminator is a header iff one successor can reach it again
//! (a back edge exists) and some predecessor's only successor is the header
//! (the back-branching block). The update block of a for-style loop is the
//! unique such predecessor that the header dominates, is reachable from the
//! body, and carries the `for.update` label; its presence decides whether
//! `continue` targets the update block or the header.
//!
//! Switches share the context structure with `is_switch` set and no
//! continue target. They are recognized from the `switch.end` block-label
//! convention.
//!
//! Membership uses one dominance rule for both kinds: a block belongs to a
//! context when the context's region entry dominates it and its exit does
//! not. The region entry is the header for while/for loops, the body block
//! for do-while loops (whose header does not dominate the body), and the
//! comparison-chain entry for switches. This also covers blocks that end in
//! `break`/`continue` pseudo-instructions, which have no outgoing edges yet.

use novac_hir::{BlockId, HirFunction, Opcode};
use novac_util::{FxHashMap, Symbol};

use super::cfg::ControlFlowGraph;

pub type ContextId = usize;

/// A loop or switch context used to resolve `break`/`continue` targets.
#[derive(Clone, Debug)]
pub struct LoopContext {
    pub header: BlockId,
    /// Loop body successor (for switches, the first case body).
    pub body: BlockId,
    pub exit: BlockId,
    /// The block dominating the whole region; membership tests against it.
    pub region: BlockId,
    /// For-style loops have an update block; while-style loops do not.
    pub update: Option<BlockId>,
    pub break_target: BlockId,
    /// Meaningless for switches.
    pub continue_target: BlockId,
    pub label: Option<Symbol>,
    pub is_switch: bool,
    pub parent: Option<ContextId>,
}

pub struct LoopAnalysis {
    pub contexts: Vec<LoopContext>,
    /// Innermost enclosing context per block.
    pub block_to_context: FxHashMap<BlockId, ContextId>,
    /// `#label` suffixes on loop headers.
    pub label_to_context: FxHashMap<Symbol, ContextId>,
}

impl LoopAnalysis {
    pub fn context_of(&self, block: BlockId) -> Option<&LoopContext> {
        self.block_to_context
            .get(&block)
            .map(|&id| &self.contexts[id])
    }

    /// Innermost non-switch context enclosing `block` (for `continue`).
    pub fn loop_context_of(&self, block: BlockId) -> Option<&LoopContext> {
        let mut ctx = self.context_of(block)?;
        while ctx.is_switch {
            ctx = &self.contexts[ctx.parent?];
        }
        Some(ctx)
    }

    pub fn labeled(&self, label: Symbol) -> Option<&LoopContext> {
        self.label_to_context
            .get(&label)
            .map(|&id| &self.contexts[id])
    }
}

pub fn analyze(func: &HirFunction, cfg: &ControlFlowGraph) -> LoopAnalysis {
    let mut contexts: Vec<LoopContext> = Vec::new();

    // -----------------------------------------------------------------
    // Loop identification
    // -----------------------------------------------------------------
    let mut headers: Vec<BlockId> = Vec::new();
    for block in func.blocks.indices() {
        let is_cond = func
            .terminator_of(block)
            .map(|t| t.opcode == Opcode::CondBr)
            .unwrap_or(false);
        if !is_cond {
            continue;
        }
        let has_back_edge = cfg.succs(block).iter().any(|&s| cfg.reaches(s, block));
        if !has_back_edge {
            continue;
        }
        // The back-branching discriminator: some predecessor whose single
        // successor is this block. This separates loop headers from plain
        // `if` conditionals sitting inside loops.
        let has_back_brancher = cfg.preds(block).iter().any(|&p| cfg.succs(p) == [block]);
        if has_back_brancher {
            headers.push(block);
        }
    }

    // Nesting order: sort by how many other headers dominate each header,
    // ascending, so outermost loops come first and inner assignments win.
    let dominator_counts: Vec<usize> = headers
        .iter()
        .map(|&h| {
            headers
                .iter()
                .filter(|&&other| other != h && cfg.dominates(other, h))
                .count()
        })
        .collect();
    let mut header_order: Vec<usize> = (0..headers.len()).collect();
    header_order.sort_by_key(|&i| dominator_counts[i]);
    headers = header_order.into_iter().map(|i| headers[i]).collect();

    for &header in &headers {
        let succs = cfg.succs(header);
        let body = match succs.iter().find(|&&s| cfg.reaches(s, header)) {
            Some(&body) => body,
            None => continue,
        };
        let exit = succs
            .iter()
            .copied()
            .find(|&s| s != body)
            .unwrap_or(header);

        // The update block: unique predecessor whose only successor is the
        // header, dominated by the header, reachable from the body, and
        // labeled as a for-loop update. The label check is the tie-breaker
        // that keeps a while-loop's back-branching tail from being taken
        // for an update block.
        let update = cfg.preds(header).iter().copied().find(|&p| {
            cfg.succs(p) == [header]
                && cfg.dominates(header, p)
                && cfg.reaches(body, p)
                && func.blocks[p].label.as_str().contains("for.update")
        });

        // While/for headers dominate their bodies; a do-while condition
        // does not, so its region entry is the body block.
        let region = if cfg.dominates(header, body) {
            header
        } else {
            body
        };

        let label = parse_label(func.blocks[header].label);

        contexts.push(LoopContext {
            header,
            body,
            exit,
            region,
            update,
            break_target: exit,
            continue_target: update.unwrap_or(header),
            label,
            is_switch: false,
            parent: None,
        });
    }

    // -----------------------------------------------------------------
    // Switch contexts
    // -----------------------------------------------------------------
    // A switch is recognized by its `switch.end` block. Its case bodies are
    // the case-labeled blocks created just before the end block; the
    // comparison chain entry is a predecessor of the first case body with a
    // non-case label.
    let mut switch_ends: Vec<BlockId> = func
        .blocks
        .iter_enumerated()
        .filter(|(_, b)| b.label.as_str().contains("switch.end"))
        .map(|(id, _)| id)
        .collect();
    switch_ends.sort();

    for (pos, &end) in switch_ends.iter().enumerate() {
        let lower_bound = if pos > 0 {
            switch_ends[pos - 1]
        } else {
            BlockId(0)
        };
        let first_body = func
            .blocks
            .iter_enumerated()
            .find(|(id, b)| *id > lower_bound && *id < end && is_case_label(b.label.as_str()))
            .map(|(id, _)| id);
        let Some(first_body) = first_body else { continue };

        let chain_entry = cfg
            .preds(first_body)
            .iter()
            .copied()
            .find(|&p| !is_case_label(func.blocks[p].label.as_str()));
        let Some(chain_entry) = chain_entry else { continue };

        contexts.push(LoopContext {
            header: chain_entry,
            body: first_body,
            exit: end,
            region: chain_entry,
            update: None,
            break_target: end,
            continue_target: end,
            label: None,
            is_switch: true,
            parent: None,
        });
    }

    // -----------------------------------------------------------------
    // Block-to-context table: innermost enclosing context per block,
    // decided by containment depth so inner assignments overwrite outer.
    // -----------------------------------------------------------------
    let contains = |ctx: &LoopContext, block: BlockId| -> bool {
        if ctx.is_switch && block == ctx.header {
            return false; // the chain entry sits before the switch
        }
        block != ctx.exit
            && cfg.dominates(ctx.region, block)
            && !cfg.dominates(ctx.exit, block)
    };

    // Containment depth of each context: how many other contexts contain
    // its anchor (the region entry for loops, the first case body for
    // switches, whose chain entry lies outside its own region).
    let anchors: Vec<BlockId> = contexts
        .iter()
        .map(|ctx| if ctx.is_switch { ctx.body } else { ctx.region })
        .collect();
    let depth: Vec<usize> = anchors
        .iter()
        .enumerate()
        .map(|(i, &anchor)| {
            contexts
                .iter()
                .enumerate()
                .filter(|(j, other)| *j != i && contains(other, anchor))
                .count()
        })
        .collect();

    // Parent links: the deepest other context containing this one's anchor.
    let parents: Vec<Option<ContextId>> = anchors
        .iter()
        .enumerate()
        .map(|(i, &anchor)| {
            contexts
                .iter()
                .enumerate()
                .filter(|(j, other)| *j != i && contains(other, anchor))
                .max_by_key(|(j, _)| depth[*j])
                .map(|(j, _)| j)
        })
        .collect();
    for (ctx, parent) in contexts.iter_mut().zip(parents) {
        ctx.parent = parent;
    }

    let mut block_to_context = FxHashMap::default();
    for block in func.blocks.indices() {
        let innermost = contexts
            .iter()
            .enumerate()
            .filter(|(_, ctx)| contains(ctx, block))
            .max_by_key(|(i, _)| depth[*i])
            .map(|(i, _)| i);
        if let Some(id) = innermost {
            block_to_context.insert(block, id);
        }
    }

    let mut label_to_context = FxHashMap::default();
    for (i, ctx) in contexts.iter().enumerate() {
        if let Some(label) = ctx.label {
            label_to_context.insert(label, i);
        }
    }

    LoopAnalysis {
        contexts,
        block_to_context,
        label_to_context,
    }
}

fn is_case_label(label: &str) -> bool {
    label.contains("switch.case") || label.contains("switch.default") || label.contains("case.")
}

/// Extract the `#label` suffix of a header block name, if any.
fn parse_label(label: Symbol) -> Option<Symbol> {
    let text = label.as_str();
    text.find('#').map(|pos| Symbol::intern(&text[pos + 1..]))
}
