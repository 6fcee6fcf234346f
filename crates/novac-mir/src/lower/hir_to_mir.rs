//! Per-function HIR translation.
//!
//! One MIR block is pre-created per HIR block; walking a HIR block's
//! instructions appends statements to the corresponding MIR block, except
//! that every call ends the current block with a `Call` terminator and
//! continues in a fresh continuation block. `Break`/`Continue`
//! pseudo-instructions are rewritten to `Goto`s using the loop analysis.
//!
//! Closure materialization happens in three places: Copy-In locals at the
//! entry of any function whose last parameter is `__env`, Copy-Out
//! `SetField`s before every return of such a function, and environment
//! allocation at the return site of an outer function recorded in
//! `closure_returned_by`. Call sites whose destination is known to hold a
//! closure substitute the inner function's name and prepend the environment
//! pointer.

use novac_hir::{
    BlockId as HirBlockId, ConstKind, HirConst, HirFunction, HirInst, HirModule, HirType, HirValue,
    Opcode, ValueId,
};
use novac_util::{Diagnostic, FxHashMap, Handler, SourceLocation, Symbol};

use crate::analysis::{cfg::ControlFlowGraph, loops, LoopAnalysis};
use crate::builder::MirBuilder;
use crate::mir::{
    AggregateKind, BinOp, BlockId, CastKind, Constant, ConstValue, MirModule, MirType, Operand,
    Place, Rvalue, Terminator, UnOp,
};

/// Generate MIR from a HIR module. Returns the module and lowering
/// diagnostics.
pub fn generate_mir(hir_module: &HirModule, module_name: &str) -> (MirModule, Vec<Diagnostic>) {
    let handler = Handler::new();
    let mut module = MirModule {
        name: Symbol::intern(module_name),
        ..Default::default()
    };

    for st in hir_module.structs.values() {
        let fields: Vec<MirType> = st.fields.iter().map(|(_, ty)| translate_type(ty)).collect();
        module.structs.insert(st.name, fields);
    }

    for func in &hir_module.functions {
        let lowering = FunctionLowering::new(hir_module, func, &handler);
        module.functions.push(lowering.lower());
    }

    (module, handler.take())
}

/// Translate a HIR type kind to MIR. `Any` maps to I64: callback boundaries
/// pass untyped i64. Aggregate shapes become opaque kind markers.
pub fn translate_type(ty: &HirType) -> MirType {
    match ty {
        HirType::Void | HirType::Never => MirType::Void,
        HirType::I8 => MirType::I8,
        HirType::I16 => MirType::I16,
        HirType::I32 => MirType::I32,
        HirType::I64 => MirType::I64,
        HirType::ISize => MirType::ISize,
        HirType::U8 => MirType::U8,
        HirType::U16 => MirType::U16,
        HirType::U32 => MirType::U32,
        HirType::U64 => MirType::U64,
        HirType::USize => MirType::USize,
        HirType::F32 => MirType::F32,
        HirType::F64 => MirType::F64,
        HirType::Bool => MirType::I1,
        HirType::String => MirType::Pointer,
        HirType::Any | HirType::Unknown => MirType::I64,
        HirType::Pointer(_) => MirType::Pointer,
        HirType::Array(_) => MirType::Array,
        HirType::Struct(_) => MirType::Struct,
        HirType::Function { .. } => MirType::Function,
    }
}

fn translate_const(c: &HirConst) -> Constant {
    match &c.kind {
        ConstKind::Int(v) => Constant {
            value: ConstValue::Int(*v),
            ty: MirType::I64,
        },
        ConstKind::Float(v) => Constant {
            value: ConstValue::Float(*v),
            ty: MirType::F64,
        },
        ConstKind::Bool(v) => Constant {
            value: ConstValue::Bool(*v),
            ty: MirType::I1,
        },
        ConstKind::Str(s) => Constant {
            value: ConstValue::Str(*s),
            ty: MirType::Pointer,
        },
        ConstKind::Null => Constant {
            value: ConstValue::Null,
            ty: MirType::I64,
        },
        ConstKind::Undefined => Constant {
            value: ConstValue::Undefined,
            ty: MirType::I64,
        },
    }
}

struct FunctionLowering<'m> {
    hir_module: &'m HirModule,
    hir: &'m HirFunction,
    handler: &'m Handler,
    builder: MirBuilder,
    loops: LoopAnalysis,
    value_map: FxHashMap<ValueId, Place>,
    block_map: FxHashMap<HirBlockId, BlockId>,
    /// Place index → (inner closure name, environment place). Seeded at
    /// call sites of closure-returning functions and propagated through
    /// plain copies.
    closure_place_map: FxHashMap<u32, (Symbol, Place)>,
    /// The `__env` argument place, when this function is a closure.
    env_arg: Option<Place>,
    /// Copy-In locals in environment field order.
    copy_in_locals: Vec<Place>,
}

impl<'m> FunctionLowering<'m> {
    fn new(hir_module: &'m HirModule, hir: &'m HirFunction, handler: &'m Handler) -> Self {
        let args: Vec<(Symbol, MirType)> = hir
            .params
            .iter()
            .map(|&p| match hir.value(p) {
                HirValue::Param { name, ty, .. } => (*name, translate_type(ty)),
                _ => (Symbol::intern("arg"), MirType::I64),
            })
            .collect();

        let builder = MirBuilder::new(hir.name, translate_type(&hir.return_ty), &args);
        // Dominance and loop analysis run on the HIR graph before any
        // break/continue resolution.
        let cfg = ControlFlowGraph::new(hir);
        let loops = loops::analyze(hir, &cfg);

        Self {
            hir_module,
            hir,
            handler,
            builder,
            loops,
            value_map: FxHashMap::default(),
            block_map: FxHashMap::default(),
            closure_place_map: FxHashMap::default(),
            env_arg: None,
            copy_in_locals: Vec::new(),
        }
    }

    fn warn(&self, message: impl Into<String>) {
        self.handler.warning(message, SourceLocation::dummy());
    }

    fn lower(mut self) -> crate::mir::MirFunction {
        // Argument places.
        for (i, &param) in self.hir.params.iter().enumerate() {
            let place = self.builder.func.arg_place(i);
            self.value_map.insert(param, place);
        }

        // One MIR block per HIR block, entry first.
        for hir_block in self.hir.blocks.indices() {
            let mir_block = self.builder.new_block();
            self.block_map.insert(hir_block, mir_block);
        }

        self.builder
            .set_current_block(self.block_map[&self.hir.entry()]);
        self.emit_copy_in();

        let block_ids: Vec<HirBlockId> = self.hir.blocks.indices().collect();
        for hir_block in block_ids {
            self.builder.set_current_block(self.block_map[&hir_block]);
            let insts = self.hir.blocks[hir_block].insts.clone();
            for inst_id in insts {
                if self.builder.is_terminated() {
                    break; // dead code after a rewritten break/continue
                }
                self.translate_inst(inst_id);
            }
        }

        self.builder.build()
    }

    /// Copy-In: for each captured variable, a local receives the matching
    /// environment field at function entry and all body references are
    /// remapped to it, enabling local mutation.
    fn emit_copy_in(&mut self) {
        let Some(env_param) = self.hir.env_param() else {
            return;
        };
        let env_place = self.value_map[&env_param];
        self.env_arg = Some(env_place);

        let Some(captured) = self.hir_module.closure_captured_vars.get(&self.hir.name) else {
            self.warn(format!(
                "function '{}' takes __env but has no captured-variable record",
                self.hir.name
            ));
            return;
        };

        let entry = self.hir.entry();
        for (i, &var) in captured.iter().enumerate() {
            // The entry alloca named exactly after the captured variable.
            let alloca = self.hir.blocks[entry].insts.iter().copied().find(|&id| {
                self.hir
                    .inst(id)
                    .map(|inst| inst.opcode == Opcode::Alloca && inst.name == var)
                    .unwrap_or(false)
            });
            let Some(alloca) = alloca else {
                self.warn(format!(
                    "captured variable '{}' has no entry alloca in '{}'",
                    var, self.hir.name
                ));
                continue;
            };

            let local = self.builder.new_local(MirType::I64, var);
            self.builder.storage_live(local);
            self.builder.assign(
                local,
                Rvalue::GetElement {
                    array: Operand::Copy(env_place),
                    index: Operand::const_int(i as i64),
                    is_field: true,
                },
            );
            self.value_map.insert(alloca, local);
            self.copy_in_locals.push(local);
        }
    }

    /// Copy-Out: write the possibly-mutated locals back into the
    /// environment before a return.
    fn emit_copy_out(&mut self) {
        let Some(env_place) = self.env_arg else { return };
        let locals = self.copy_in_locals.clone();
        for (i, local) in locals.into_iter().enumerate() {
            self.emit_set_field(
                Operand::Copy(env_place),
                i as i64,
                Operand::Copy(local),
            );
        }
    }

    /// A `SetField` is encoded as a 3-element aggregate assigned to a
    /// scratch temporary; the code generator performs the store.
    fn emit_set_field(&mut self, base: Operand, index: i64, value: Operand) {
        let scratch = self.builder.new_temp(MirType::I64);
        self.builder.assign(
            scratch,
            Rvalue::Aggregate(
                AggregateKind::SetField,
                vec![base, Operand::const_int(index), value],
            ),
        );
    }

    fn operand_of(&mut self, value: ValueId) -> Operand {
        match self.hir.value(value) {
            HirValue::Constant(c) => Operand::Constant(translate_const(c)),
            _ => match self.value_map.get(&value) {
                Some(place) => Operand::Copy(*place),
                None => {
                    self.warn("operand has no translated place; defaulting to 0");
                    Operand::const_int(0)
                }
            },
        }
    }

    /// New temp for a HIR instruction's result: StorageLive plus the
    /// value-map entry.
    fn place_for(&mut self, value: ValueId, ty: MirType) -> Place {
        let place = self.builder.new_temp(ty);
        self.builder.storage_live(place);
        self.value_map.insert(value, place);
        place
    }

    /// Propagate closure identity through a plain copy.
    fn propagate_closure(&mut self, src: &Operand, dst: Place) {
        if let Some(src_place) = src.place() {
            if let Some((inner, _)) = self.closure_place_map.get(&src_place.index).copied() {
                self.closure_place_map.insert(dst.index, (inner, dst));
            }
        }
    }

    fn translate_inst(&mut self, inst_id: ValueId) {
        let Some(inst) = self.hir.inst(inst_id) else {
            return;
        };
        let inst = inst.clone();

        use Opcode::*;
        match inst.opcode {
            Add | Sub | Mul | Div | Rem | And | Or | Xor | Shl | Shr | UShr => {
                let op = binop_for(inst.opcode);
                let lhs = self.operand_of(inst.operands[0]);
                let rhs = self.operand_of(inst.operands[1]);
                let dest = self.place_for(inst_id, translate_type(&inst.ty));
                self.builder.assign(dest, Rvalue::BinaryOp(op, lhs, rhs));
            }
            Eq | Ne | Lt | Le | Gt | Ge => {
                let op = binop_for(inst.opcode);
                let lhs = self.operand_of(inst.operands[0]);
                let rhs = self.operand_of(inst.operands[1]);
                let dest = self.place_for(inst_id, MirType::I1);
                self.builder.assign(dest, Rvalue::BinaryOp(op, lhs, rhs));
            }
            Neg => {
                let operand = self.operand_of(inst.operands[0]);
                let dest = self.place_for(inst_id, translate_type(&inst.ty));
                self.builder.assign(dest, Rvalue::UnaryOp(UnOp::Neg, operand));
            }
            Not => {
                let operand = self.operand_of(inst.operands[0]);
                let dest = self.place_for(inst_id, translate_type(&inst.ty));
                self.builder.assign(dest, Rvalue::UnaryOp(UnOp::Not, operand));
            }
            Alloca => {
                // Copy-In may have mapped this alloca already.
                if self.value_map.contains_key(&inst_id) {
                    return;
                }
                let pointee = inst.ty.pointee().cloned().unwrap_or(HirType::Any);
                let local = self.builder.new_local(translate_type(&pointee), inst.name);
                self.builder.storage_live(local);
                self.value_map.insert(inst_id, local);
            }
            Load => {
                let src = self.operand_of(inst.operands[0]);
                let dest = self.place_for(inst_id, translate_type(&inst.ty));
                self.builder.assign(dest, Rvalue::Use(src.clone()));
                self.propagate_closure(&src, dest);
            }
            Store => {
                let value_id = inst.operands[0];
                let ptr_id = inst.operands[1];

                // Store through a GetField result becomes a SetField; this
                // is the general mechanism for writing into struct fields.
                let hir = self.hir;
                if let Some(ptr_inst) = hir.inst(ptr_id) {
                    if ptr_inst.opcode == Opcode::GetField {
                        let base = self.operand_of(ptr_inst.operands[0]);
                        let index = self.operand_of(ptr_inst.operands[1]);
                        let value = self.operand_of(value_id);
                        let scratch = self.builder.new_temp(MirType::I64);
                        self.builder.assign(
                            scratch,
                            Rvalue::Aggregate(AggregateKind::SetField, vec![base, index, value]),
                        );
                        return;
                    }
                }

                let value = self.operand_of(value_id);
                match self.value_map.get(&ptr_id).copied() {
                    Some(dest) => {
                        self.builder.assign(dest, Rvalue::Use(value.clone()));
                        self.propagate_closure(&value, dest);
                    }
                    None => self.warn("store destination has no place"),
                }
            }
            GetField => {
                let base = self.operand_of(inst.operands[0]);
                let index = self.operand_of(inst.operands[1]);
                let dest = self.place_for(inst_id, translate_type(&inst.ty));
                self.builder.assign(
                    dest,
                    Rvalue::GetElement {
                        array: base,
                        index,
                        is_field: true,
                    },
                );
            }
            GetElement => {
                let base = self.operand_of(inst.operands[0]);
                let index = self.operand_of(inst.operands[1]);
                let dest = self.place_for(inst_id, translate_type(&inst.ty));
                self.builder.assign(
                    dest,
                    Rvalue::GetElement {
                        array: base,
                        index,
                        is_field: false,
                    },
                );
            }
            SetField | SetElement => {
                let base = self.operand_of(inst.operands[0]);
                let index = self.operand_of(inst.operands[1]);
                let value = self.operand_of(inst.operands[2]);
                let scratch = self.builder.new_temp(MirType::I64);
                self.builder.assign(
                    scratch,
                    Rvalue::Aggregate(AggregateKind::SetField, vec![base, index, value]),
                );
            }
            Cast => {
                let operand = self.operand_of(inst.operands[0]);
                let src_ty = translate_type(self.hir.value(inst.operands[0]).ty());
                let dest_ty = translate_type(&inst.ty);
                let kind = match (src_ty.is_float(), dest_ty.is_float()) {
                    (false, false) => CastKind::IntToInt,
                    (false, true) => CastKind::IntToFloat,
                    (true, false) => CastKind::FloatToInt,
                    (true, true) => CastKind::FloatToFloat,
                };
                let dest = self.place_for(inst_id, dest_ty);
                self.builder
                    .assign(dest, Rvalue::Cast(kind, operand, dest_ty));
            }
            Aggregate => {
                let kind = match &inst.ty {
                    HirType::Array(_) => AggregateKind::Array,
                    HirType::Struct(_) => AggregateKind::Struct,
                    _ => AggregateKind::Tuple,
                };
                let elements: Vec<Operand> = inst
                    .operands
                    .iter()
                    .map(|&op| self.operand_of(op))
                    .collect();
                let dest = self.place_for(inst_id, translate_type(&inst.ty));
                self.builder.assign(dest, Rvalue::Aggregate(kind, elements));
            }
            Call => self.translate_call(inst_id, &inst),
            Br => {
                let target = self.block_map[&inst.targets[0]];
                self.builder.set_terminator(Terminator::Goto { target });
            }
            CondBr => {
                // A two-way switch on the boolean: 1 -> then, otherwise else.
                let discr = self.operand_of(inst.operands[0]);
                let then_block = self.block_map[&inst.targets[0]];
                let else_block = self.block_map[&inst.targets[1]];
                self.builder.set_terminator(Terminator::SwitchInt {
                    discr,
                    targets: vec![(1, then_block)],
                    otherwise: else_block,
                });
            }
            Switch => {
                self.warn("HIR Switch instruction reached MIR lowering unexpectedly");
                self.builder.set_terminator(Terminator::Unreachable);
            }
            Return => self.translate_return(&inst),
            Unreachable => {
                self.builder.set_terminator(Terminator::Unreachable);
            }
            Break | Continue => self.translate_break_continue(&inst),
            Phi => {
                self.warn("Phi is reserved and lowers to a no-op");
                self.builder.push_statement(crate::mir::Statement::Nop);
            }
        }
    }

    fn translate_call(&mut self, inst_id: ValueId, inst: &HirInst) {
        let callee = inst.operands[0];
        let mut args: Vec<Operand> = inst.operands[1..]
            .iter()
            .map(|&op| self.operand_of(op))
            .collect();

        let func = match self.hir.value(callee).as_str_const() {
            Some(name) => Operand::const_str(name),
            None => {
                // Indirect call through a place; substitute the inner
                // function and prepend the environment when the place is a
                // recorded closure.
                let op = self.operand_of(callee);
                match op.place().and_then(|p| {
                    self.closure_place_map.get(&p.index).copied()
                }) {
                    Some((inner, env)) => {
                        args.insert(0, Operand::Copy(env));
                        Operand::const_str(inner)
                    }
                    None => {
                        self.warn("indirect call target is not a known closure");
                        op
                    }
                }
            }
        };

        let dest = self.place_for(inst_id, translate_type(&inst.ty));
        let target = self.builder.new_block();
        self.builder.set_terminator(Terminator::Call {
            func: func.clone(),
            args,
            destination: dest,
            target,
            unwind: None,
        });
        self.builder.set_current_block(target);

        // Calling a closure-returning outer function makes the destination
        // a closure value: the returned pointer is the environment.
        if let Operand::Constant(Constant {
            value: ConstValue::Str(name),
            ..
        }) = func
        {
            if let Some(&inner) = self.hir_module.closure_returned_by.get(&name) {
                self.closure_place_map.insert(dest.index, (inner, dest));
            }
        }
    }

    fn translate_return(&mut self, inst: &HirInst) {
        self.emit_copy_out();

        if let Some(&value) = inst.operands.first() {
            // Returning a string constant that names a closure of this
            // function substitutes environment allocation for the string.
            if let Some(name) = self.hir.value(value).as_str_const() {
                if self.hir_module.closure_returned_by.get(&self.hir.name) == Some(&name) {
                    self.emit_env_allocation(name);
                    self.builder.set_terminator(Terminator::Return);
                    return;
                }
            }
            let operand = self.operand_of(value);
            let ret = self.builder.func.return_place();
            self.builder.assign(ret, Rvalue::Use(operand));
        }
        self.builder.set_terminator(Terminator::Return);
    }

    /// Allocate and populate the environment struct for a returned closure,
    /// then return the environment pointer through `_0`.
    fn emit_env_allocation(&mut self, inner: Symbol) {
        let field_count = self
            .hir_module
            .closure_environments
            .get(&inner)
            .map(|env| env.fields.len())
            .unwrap_or(0);

        let env = self.builder.new_local(MirType::Pointer, Symbol::intern("env"));
        self.builder.storage_live(env);

        // Zero-initialize field by field, then populate from the outer
        // function's bindings of the captured names.
        let zeros: Vec<Operand> = (0..field_count).map(|_| Operand::const_int(0)).collect();
        self.builder
            .assign(env, Rvalue::Aggregate(AggregateKind::Struct, zeros));

        if let Some(values) = self.hir_module.closure_captured_values.get(&inner).cloned() {
            for (i, value_id) in values.into_iter().enumerate() {
                let src = self.operand_of(value_id);
                self.emit_set_field(Operand::Copy(env), i as i64, src);
            }
        }

        let ret = self.builder.func.return_place();
        self.builder.assign(ret, Rvalue::Use(Operand::Copy(env)));
    }

    /// Resolve a `break`/`continue` pseudo-instruction to a direct `Goto`.
    fn translate_break_continue(&mut self, inst: &HirInst) {
        let is_break = inst.opcode == Opcode::Break;
        let block = inst.block;

        // Extract the target before touching the builder; contexts borrow
        // the analysis tables.
        let target = match inst.label {
            Some(label) => self.loops.labeled(label),
            None if is_break => self.loops.context_of(block),
            None => self.loops.loop_context_of(block),
        }
        .map(|ctx| {
            if is_break {
                ctx.break_target
            } else {
                ctx.continue_target
            }
        });

        match target {
            Some(target) => {
                let target = self.block_map[&target];
                self.builder.set_terminator(Terminator::Goto { target });
            }
            None => {
                self.warn(match inst.label {
                    Some(label) => format!("unresolved labeled break/continue '{}'", label),
                    None => "break/continue outside a loop or switch".to_string(),
                });
                self.builder.set_terminator(Terminator::Unreachable);
            }
        }
    }
}

fn binop_for(opcode: Opcode) -> BinOp {
    match opcode {
        Opcode::Add => BinOp::Add,
        Opcode::Sub => BinOp::Sub,
        Opcode::Mul => BinOp::Mul,
        Opcode::Div => BinOp::Div,
        Opcode::Rem => BinOp::Rem,
        Opcode::And => BinOp::BitAnd,
        Opcode::Or => BinOp::BitOr,
        Opcode::Xor => BinOp::BitXor,
        Opcode::Shl => BinOp::Shl,
        Opcode::Shr => BinOp::Shr,
        Opcode::UShr => BinOp::UShr,
        Opcode::Eq => BinOp::Eq,
        Opcode::Ne => BinOp::Ne,
        Opcode::Lt => BinOp::Lt,
        Opcode::Le => BinOp::Le,
        Opcode::Gt => BinOp::Gt,
        Opcode::Ge => BinOp::Ge,
        other => unreachable!("not a binary opcode: {:?}", other),
    }
}
