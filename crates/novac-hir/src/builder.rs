//! HIR builder.
//!
//! Wraps a function under construction with an insertion point and uniquely
//! suffixed block labels. CFG edges are not stored; they derive from
//! terminator targets on demand (see `HirFunction::successors`).

use novac_util::Symbol;

use crate::hir::{
    BlockId, ConstKind, HirBlock, HirConst, HirFunction, HirInst, HirType, HirValue, Opcode,
    ValueId,
};

pub struct HirBuilder<'f> {
    pub func: &'f mut HirFunction,
    current: BlockId,
    next_value: u32,
    next_block: u32,
}

impl<'f> HirBuilder<'f> {
    /// Wrap a function. Creates the `entry` block if none exists and points
    /// the insertion cursor at the last block.
    pub fn new(func: &'f mut HirFunction) -> Self {
        if func.blocks.is_empty() {
            func.blocks.push(HirBlock {
                label: Symbol::intern("entry"),
                insts: Vec::new(),
                has_break_or_continue: false,
            });
        }
        let current = BlockId((func.blocks.len() - 1) as u32);
        let next_block = func.blocks.len() as u32;
        let next_value = func.values.len() as u32;
        Self {
            func,
            current,
            next_value,
            next_block,
        }
    }

    // -----------------------------------------------------------------------
    // Blocks
    // -----------------------------------------------------------------------

    /// Create a block labeled `base.N` where N keeps labels unique within
    /// the function. The structural base name (`if.then`, `for.update`,
    /// `switch.end`, ...) is significant to MIR loop/switch recognition.
    pub fn create_block(&mut self, base: &str) -> BlockId {
        self.create_block_labeled(base, None)
    }

    /// Like [`HirBuilder::create_block`], with a `#label` suffix appended
    /// for labeled statements (`for.cond.3#outer`).
    pub fn create_block_labeled(&mut self, base: &str, label: Option<Symbol>) -> BlockId {
        let n = self.next_block;
        self.next_block += 1;
        let text = match label {
            Some(l) => format!("{}.{}#{}", base, n, l),
            None => format!("{}.{}", base, n),
        };
        self.func.blocks.push(HirBlock {
            label: Symbol::intern(&text),
            insts: Vec::new(),
            has_break_or_continue: false,
        })
    }

    pub fn set_insert_point(&mut self, block: BlockId) {
        self.current = block;
    }

    pub fn insert_block(&self) -> BlockId {
        self.current
    }

    /// True if appending a fall-through branch here is allowed: the block is
    /// empty or its last instruction neither terminates nor is a
    /// break/continue pseudo-instruction.
    pub fn falls_through(&self) -> bool {
        match self.func.blocks[self.current].insts.last() {
            None => true,
            Some(&last) => match self.func.inst(last) {
                Some(inst) => !inst.opcode.ends_arm(),
                None => true,
            },
        }
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    fn fresh_name(&mut self, hint: &str) -> Symbol {
        let n = self.next_value;
        self.next_value += 1;
        if hint.is_empty() {
            Symbol::intern(&format!("t{}", n))
        } else {
            Symbol::intern(&format!("{}.{}", hint, n))
        }
    }

    fn emit(
        &mut self,
        opcode: Opcode,
        ty: HirType,
        operands: Vec<ValueId>,
        targets: Vec<BlockId>,
        label: Option<Symbol>,
        hint: &str,
    ) -> ValueId {
        let name = self.fresh_name(hint);
        let inst = HirInst {
            opcode,
            ty,
            operands,
            targets,
            label,
            block: self.current,
            name,
        };
        let id = self.func.values.push(HirValue::Inst(inst));
        self.func.blocks[self.current].insts.push(id);
        id
    }

    // Constants ------------------------------------------------------------

    pub fn const_int(&mut self, value: i64) -> ValueId {
        self.func.values.push(HirValue::Constant(HirConst {
            ty: HirType::I64,
            kind: ConstKind::Int(value),
        }))
    }

    pub fn const_float(&mut self, value: f64) -> ValueId {
        self.func.values.push(HirValue::Constant(HirConst {
            ty: HirType::F64,
            kind: ConstKind::Float(value),
        }))
    }

    pub fn const_bool(&mut self, value: bool) -> ValueId {
        self.func.values.push(HirValue::Constant(HirConst {
            ty: HirType::Bool,
            kind: ConstKind::Bool(value),
        }))
    }

    pub fn const_str(&mut self, value: Symbol) -> ValueId {
        self.func.values.push(HirValue::Constant(HirConst {
            ty: HirType::String,
            kind: ConstKind::Str(value),
        }))
    }

    pub fn const_null(&mut self, ty: HirType) -> ValueId {
        self.func.values.push(HirValue::Constant(HirConst {
            ty,
            kind: ConstKind::Null,
        }))
    }

    pub fn const_undefined(&mut self) -> ValueId {
        self.func.values.push(HirValue::Constant(HirConst {
            ty: HirType::Unknown,
            kind: ConstKind::Undefined,
        }))
    }

    // Arithmetic and comparison --------------------------------------------

    /// Arithmetic/bitwise binary op; the result type follows the left
    /// operand.
    pub fn create_binary(&mut self, opcode: Opcode, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.func.value(lhs).ty().clone();
        self.emit(opcode, ty, vec![lhs, rhs], Vec::new(), None, "")
    }

    /// Comparison; the result type is Bool.
    pub fn create_cmp(&mut self, opcode: Opcode, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.emit(opcode, HirType::Bool, vec![lhs, rhs], Vec::new(), None, "")
    }

    pub fn create_neg(&mut self, operand: ValueId) -> ValueId {
        let ty = self.func.value(operand).ty().clone();
        self.emit(Opcode::Neg, ty, vec![operand], Vec::new(), None, "")
    }

    pub fn create_not(&mut self, operand: ValueId) -> ValueId {
        let ty = self.func.value(operand).ty().clone();
        self.emit(Opcode::Not, ty, vec![operand], Vec::new(), None, "")
    }

    // Memory ---------------------------------------------------------------

    pub fn create_alloca(&mut self, pointee: HirType, name: &str) -> ValueId {
        self.emit(
            Opcode::Alloca,
            HirType::Pointer(Box::new(pointee)),
            Vec::new(),
            Vec::new(),
            None,
            name,
        )
    }

    /// Alloca with an exact (non-uniquified) name. Used for the entry
    /// allocas of captured variables, which MIR's Copy-In pass locates by
    /// name.
    pub fn create_alloca_exact(&mut self, pointee: HirType, name: Symbol) -> ValueId {
        let inst = HirInst {
            opcode: Opcode::Alloca,
            ty: HirType::Pointer(Box::new(pointee)),
            operands: Vec::new(),
            targets: Vec::new(),
            label: None,
            block: self.current,
            name,
        };
        let id = self.func.values.push(HirValue::Inst(inst));
        self.func.blocks[self.current].insts.push(id);
        id
    }

    pub fn create_load(&mut self, ptr: ValueId) -> ValueId {
        let ty = self
            .func
            .value(ptr)
            .ty()
            .pointee()
            .cloned()
            .unwrap_or(HirType::Any);
        self.emit(Opcode::Load, ty, vec![ptr], Vec::new(), None, "")
    }

    pub fn create_store(&mut self, value: ValueId, ptr: ValueId) -> ValueId {
        self.emit(
            Opcode::Store,
            HirType::Void,
            vec![value, ptr],
            Vec::new(),
            None,
            "",
        )
    }

    pub fn create_get_field(&mut self, base: ValueId, index: i64) -> ValueId {
        let index = self.const_int(index);
        self.emit(
            Opcode::GetField,
            HirType::Any,
            vec![base, index],
            Vec::new(),
            None,
            "",
        )
    }

    pub fn create_set_field(&mut self, base: ValueId, index: i64, value: ValueId) -> ValueId {
        let index = self.const_int(index);
        self.emit(
            Opcode::SetField,
            HirType::Void,
            vec![base, index, value],
            Vec::new(),
            None,
            "",
        )
    }

    pub fn create_get_element(&mut self, base: ValueId, index: ValueId) -> ValueId {
        self.emit(
            Opcode::GetElement,
            HirType::Any,
            vec![base, index],
            Vec::new(),
            None,
            "",
        )
    }

    pub fn create_set_element(&mut self, base: ValueId, index: ValueId, value: ValueId) -> ValueId {
        self.emit(
            Opcode::SetElement,
            HirType::Void,
            vec![base, index, value],
            Vec::new(),
            None,
            "",
        )
    }

    // Control flow ---------------------------------------------------------

    pub fn create_br(&mut self, dest: BlockId) -> ValueId {
        self.emit(Opcode::Br, HirType::Void, Vec::new(), vec![dest], None, "")
    }

    pub fn create_cond_br(
        &mut self,
        cond: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    ) -> ValueId {
        self.emit(
            Opcode::CondBr,
            HirType::Void,
            vec![cond],
            vec![then_block, else_block],
            None,
            "",
        )
    }

    pub fn create_return(&mut self, value: Option<ValueId>) -> ValueId {
        let operands = value.into_iter().collect();
        self.emit(
            Opcode::Return,
            HirType::Void,
            operands,
            Vec::new(),
            None,
            "",
        )
    }

    pub fn create_unreachable(&mut self) -> ValueId {
        self.emit(
            Opcode::Unreachable,
            HirType::Void,
            Vec::new(),
            Vec::new(),
            None,
            "",
        )
    }

    /// `break [label]` pseudo-instruction; the target is resolved by MIR
    /// generation. Marks the block for the lowering heuristics.
    pub fn create_break(&mut self, label: Option<Symbol>) -> ValueId {
        let id = self.emit(Opcode::Break, HirType::Void, Vec::new(), Vec::new(), label, "");
        self.func.blocks[self.current].has_break_or_continue = true;
        id
    }

    /// `continue [label]` pseudo-instruction; see [`HirBuilder::create_break`].
    pub fn create_continue(&mut self, label: Option<Symbol>) -> ValueId {
        let id = self.emit(
            Opcode::Continue,
            HirType::Void,
            Vec::new(),
            Vec::new(),
            label,
            "",
        );
        self.func.blocks[self.current].has_break_or_continue = true;
        id
    }

    // Calls, casts, aggregates ---------------------------------------------

    /// Direct call: the callee is a string constant naming the function (or
    /// a runtime intrinsic).
    pub fn create_call(&mut self, callee: Symbol, args: &[ValueId], ret: HirType) -> ValueId {
        let callee = self.const_str(callee);
        let mut operands = vec![callee];
        operands.extend_from_slice(args);
        self.emit(Opcode::Call, ret, operands, Vec::new(), None, "call")
    }

    /// Indirect call through a value (a closure reference).
    pub fn create_call_value(
        &mut self,
        callee: ValueId,
        args: &[ValueId],
        ret: HirType,
    ) -> ValueId {
        let mut operands = vec![callee];
        operands.extend_from_slice(args);
        self.emit(Opcode::Call, ret, operands, Vec::new(), None, "call")
    }

    pub fn create_cast(&mut self, value: ValueId, dest: HirType) -> ValueId {
        self.emit(Opcode::Cast, dest, vec![value], Vec::new(), None, "cast")
    }

    /// Aggregate construction; the result type's shape (Array vs Struct)
    /// drives MIR's aggregate kind.
    pub fn create_aggregate(&mut self, ty: HirType, elements: Vec<ValueId>) -> ValueId {
        self.emit(Opcode::Aggregate, ty, elements, Vec::new(), None, "agg")
    }
}
