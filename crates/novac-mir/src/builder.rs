//! MIR function builder.

use novac_util::{FxHashSet, Symbol};

use crate::mir::{
    BasicBlock, BlockId, LocalDecl, MirFunction, MirType, Place, PlaceKind, Rvalue, Statement,
    Terminator,
};

/// Builds one [`MirFunction`]. Creates `_0` and the argument places up
/// front; blocks start with an `Unreachable` placeholder terminator until
/// one is installed.
pub struct MirBuilder {
    pub func: MirFunction,
    current: BlockId,
    /// Blocks whose terminator has been explicitly installed.
    terminated: FxHashSet<BlockId>,
}

impl MirBuilder {
    pub fn new(name: Symbol, return_ty: MirType, arg_types: &[(Symbol, MirType)]) -> Self {
        let mut local_decls = Vec::with_capacity(1 + arg_types.len());
        local_decls.push(LocalDecl {
            place: Place {
                kind: PlaceKind::Return,
                index: 0,
                ty: return_ty,
            },
            mutable: true,
            name: None,
        });
        for (i, (name, ty)) in arg_types.iter().enumerate() {
            local_decls.push(LocalDecl {
                place: Place {
                    kind: PlaceKind::Argument,
                    index: (i + 1) as u32,
                    ty: *ty,
                },
                mutable: false,
                name: Some(*name),
            });
        }

        let func = MirFunction {
            name,
            return_ty,
            arg_count: arg_types.len(),
            local_decls,
            blocks: Default::default(),
        };

        Self {
            func,
            current: BlockId(0),
            terminated: FxHashSet::default(),
        }
    }

    pub fn new_block(&mut self) -> BlockId {
        self.func.blocks.push(BasicBlock {
            statements: Vec::new(),
            terminator: Terminator::Unreachable,
        })
    }

    pub fn set_current_block(&mut self, block: BlockId) {
        self.current = block;
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    /// Whether the current block already received an explicit terminator.
    /// Statements appended after that point are dead and dropped.
    pub fn is_terminated(&self) -> bool {
        self.terminated.contains(&self.current)
    }

    /// Allocate a new place with the next `_N` index.
    pub fn new_place(
        &mut self,
        kind: PlaceKind,
        ty: MirType,
        mutable: bool,
        name: Option<Symbol>,
    ) -> Place {
        let place = Place {
            kind,
            index: self.func.local_decls.len() as u32,
            ty,
        };
        self.func.local_decls.push(LocalDecl {
            place,
            mutable,
            name,
        });
        place
    }

    /// A local backing a source variable.
    pub fn new_local(&mut self, ty: MirType, name: Symbol) -> Place {
        self.new_place(PlaceKind::Local, ty, true, Some(name))
    }

    /// A compiler temporary.
    pub fn new_temp(&mut self, ty: MirType) -> Place {
        self.new_place(PlaceKind::Temp, ty, false, None)
    }

    pub fn push_statement(&mut self, stmt: Statement) {
        if self.is_terminated() {
            return; // dead code after break/continue rewrites
        }
        self.func.blocks[self.current].statements.push(stmt);
    }

    pub fn assign(&mut self, place: Place, rvalue: Rvalue) {
        self.push_statement(Statement::Assign(place, rvalue));
    }

    pub fn storage_live(&mut self, place: Place) {
        self.push_statement(Statement::StorageLive(place));
    }

    pub fn storage_dead(&mut self, place: Place) {
        self.push_statement(Statement::StorageDead(place));
    }

    /// Install the current block's terminator. The first installation wins;
    /// later attempts on the same block are dropped as dead control flow.
    pub fn set_terminator(&mut self, terminator: Terminator) {
        if self.terminated.insert(self.current) {
            self.func.blocks[self.current].terminator = terminator;
        }
    }

    pub fn build(self) -> MirFunction {
        self.func
    }
}
