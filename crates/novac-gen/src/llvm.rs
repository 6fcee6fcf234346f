//! LLVM IR code generator over MIR.

use std::path::Path;
use std::sync::Once;

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::passes::PassBuilderOptions;
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine,
};
use inkwell::types::{BasicTypeEnum, StructType};
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, FunctionValue, IntValue, PointerValue};
use inkwell::{AddressSpace, FloatPredicate, IntPredicate, OptimizationLevel};

use novac_mir::{
    AggregateKind, BinOp, BlockId, CastKind, Constant, ConstValue, MirFunction, MirModule, MirType,
    Operand, Place, Rvalue, Statement, Terminator, UnOp,
};
use novac_util::FxHashMap;

use crate::error::{CodeGenError, Result};
use crate::types::TypeMapper;

/// Process-global LLVM target initialization. Idempotent across all
/// code generator instances.
fn ensure_targets_initialized() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        Target::initialize_all(&InitializationConfig::default());
    });
}

/// The LLVM backend. One instance per module; the caller owns the
/// [`Context`] and keeps it alive for the generator's lifetime.
pub struct LlvmCodeGen<'ctx> {
    context: &'ctx Context,
    module: Module<'ctx>,
    builder: Builder<'ctx>,
    type_mapper: TypeMapper<'ctx>,

    // Per-function state, reset in `generate_function`.
    /// SSA values for temporaries, arguments, and `_0`.
    place_values: FxHashMap<u32, BasicValueEnum<'ctx>>,
    /// Stack slots for mutable locals (places that came from HIR allocas).
    place_ptrs: FxHashMap<u32, PointerValue<'ctx>>,
    /// Known struct layouts per place, recorded at aggregate construction.
    struct_types: FxHashMap<u32, StructType<'ctx>>,
    block_map: FxHashMap<BlockId, BasicBlock<'ctx>>,
}

impl<'ctx> LlvmCodeGen<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        ensure_targets_initialized();
        let module = context.create_module(module_name);
        let builder = context.create_builder();
        Self {
            context,
            module,
            builder,
            type_mapper: TypeMapper::new(context),
            place_values: FxHashMap::default(),
            place_ptrs: FxHashMap::default(),
            struct_types: FxHashMap::default(),
            block_map: FxHashMap::default(),
        }
    }

    pub fn module(&self) -> &Module<'ctx> {
        &self.module
    }

    /// Generate LLVM IR for the whole MIR module, then run the verifier.
    /// Verifier failure is fatal and the output must be discarded.
    pub fn generate(&mut self, mir: &MirModule) -> Result<()> {
        for func in &mir.functions {
            self.declare_function(func);
        }
        for func in &mir.functions {
            self.generate_function(func)?;
        }
        self.module
            .verify()
            .map_err(|e| CodeGenError::VerifierFailed(e.to_string()))
    }

    /// All signatures are uniform at the untyped boundary: `i64` parameters
    /// and an `i64` return, with `void` placeholders widened.
    fn declare_function(&mut self, func: &MirFunction) -> FunctionValue<'ctx> {
        if let Some(existing) = self.module.get_function(func.name.as_str()) {
            return existing;
        }
        let i64t = self.context.i64_type();
        let params: Vec<_> = (0..func.arg_count).map(|_| i64t.into()).collect();
        let fn_type = i64t.fn_type(&params, false);
        self.module
            .add_function(func.name.as_str(), fn_type, None)
    }

    fn generate_function(&mut self, func: &MirFunction) -> Result<()> {
        let function = self
            .module
            .get_function(func.name.as_str())
            .ok_or_else(|| CodeGenError::FunctionNotFound(func.name.to_string()))?;

        self.place_values.clear();
        self.place_ptrs.clear();
        self.struct_types.clear();
        self.block_map.clear();

        // One LLVM block per MIR block; entry is the first.
        for block_id in func.blocks.indices() {
            let bb = self
                .context
                .append_basic_block(function, &format!("bb{}", block_id.0));
            self.block_map.insert(block_id, bb);
        }

        // Bind arguments by position.
        for i in 0..func.arg_count {
            let place = func.arg_place(i);
            let value = function
                .get_nth_param(i as u32)
                .ok_or_else(|| CodeGenError::LlvmOperationFailed("missing parameter".into()))?;
            self.place_values.insert(place.index, value);
        }

        // Prologue: stack slots for mutable locals. `_0` stays SSA-tracked.
        let entry = self.block_map[&func.entry()];
        self.builder.position_at_end(entry);
        for decl in func.local_decls.iter().skip(1 + func.arg_count) {
            if decl.mutable {
                let ty = self.type_mapper.map(decl.place.ty);
                let name = decl
                    .name
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| format!("_{}", decl.place.index));
                let slot = self
                    .builder
                    .build_alloca(ty, &name)
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
                self.place_ptrs.insert(decl.place.index, slot);
            }
        }

        for (block_id, block) in func.blocks.iter_enumerated() {
            self.builder.position_at_end(self.block_map[&block_id]);
            for stmt in &block.statements {
                self.generate_statement(stmt)?;
            }
            self.generate_terminator(&block.terminator)?;
        }

        Ok(())
    }

    // =======================================================================
    // Statements
    // =======================================================================

    fn generate_statement(&mut self, stmt: &Statement) -> Result<()> {
        match stmt {
            Statement::Assign(place, rvalue) => {
                let value = self.generate_rvalue(*place, rvalue)?;
                self.write_place(*place, value)
            }
            // Lifetime markers only.
            Statement::StorageLive(_) | Statement::StorageDead(_) | Statement::Nop => Ok(()),
        }
    }

    fn write_place(&mut self, place: Place, value: BasicValueEnum<'ctx>) -> Result<()> {
        if let Some(&slot) = self.place_ptrs.get(&place.index) {
            let ty = self.type_mapper.map(place.ty);
            let coerced = self.coerce(value, ty)?;
            self.builder
                .build_store(slot, coerced)
                .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
        } else {
            self.place_values.insert(place.index, value);
        }
        Ok(())
    }

    fn read_place(&mut self, place: Place) -> Result<BasicValueEnum<'ctx>> {
        if let Some(&slot) = self.place_ptrs.get(&place.index) {
            return self
                .builder
                .build_load(slot, "load")
                .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()));
        }
        if let Some(&value) = self.place_values.get(&place.index) {
            return Ok(value);
        }
        // Typed zero fallback for never-written places.
        Ok(self.zero_of(self.type_mapper.map(place.ty)))
    }

    fn operand_value(&mut self, operand: &Operand) -> Result<BasicValueEnum<'ctx>> {
        match operand {
            Operand::Copy(place) | Operand::Move(place) => self.read_place(*place),
            Operand::Constant(constant) => self.constant_value(constant),
        }
    }

    fn constant_value(&mut self, constant: &Constant) -> Result<BasicValueEnum<'ctx>> {
        Ok(match &constant.value {
            ConstValue::Int(v) => self.context.i64_type().const_int(*v as u64, true).into(),
            ConstValue::Float(v) => self.context.f64_type().const_float(*v).into(),
            ConstValue::Bool(v) => self.context.bool_type().const_int(*v as u64, false).into(),
            ConstValue::Str(s) => {
                let global = self
                    .builder
                    .build_global_string_ptr(s.as_str(), "str")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
                global.as_pointer_value().into()
            }
            ConstValue::Null | ConstValue::Undefined => {
                self.context.i64_type().const_zero().into()
            }
        })
    }

    // =======================================================================
    // Rvalues
    // =======================================================================

    fn generate_rvalue(&mut self, dest: Place, rvalue: &Rvalue) -> Result<BasicValueEnum<'ctx>> {
        match rvalue {
            Rvalue::Use(operand) => {
                let value = self.operand_value(operand)?;
                // Copies carry struct-layout knowledge with them.
                if let Some(src) = operand.place() {
                    if let Some(&st) = self.struct_types.get(&src.index) {
                        self.struct_types.insert(dest.index, st);
                    }
                }
                Ok(value)
            }
            Rvalue::BinaryOp(op, lhs, rhs) | Rvalue::CheckedBinaryOp(op, lhs, rhs) => {
                let lhs = self.operand_value(lhs)?;
                let rhs = self.operand_value(rhs)?;
                self.generate_binary_op(*op, lhs, rhs)
            }
            Rvalue::UnaryOp(op, operand) => {
                let value = self.operand_value(operand)?;
                self.generate_unary_op(*op, value)
            }
            Rvalue::Cast(kind, operand, ty) => {
                let value = self.operand_value(operand)?;
                self.generate_cast(*kind, value, *ty)
            }
            Rvalue::Aggregate(kind, elements) => self.generate_aggregate(dest, *kind, elements),
            Rvalue::GetElement {
                array,
                index,
                is_field,
            } => self.generate_get_element(array, index, *is_field),
            Rvalue::Ref(place) | Rvalue::AddressOf(place) => {
                if let Some(&slot) = self.place_ptrs.get(&place.index) {
                    Ok(slot.into())
                } else {
                    // Promote the SSA value to a one-off stack slot.
                    let value = self.read_place(*place)?;
                    let slot = self
                        .builder
                        .build_alloca(value.get_type(), "ref")
                        .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
                    self.builder
                        .build_store(slot, value)
                        .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
                    Ok(slot.into())
                }
            }
            Rvalue::Len(place) => {
                let array = self.read_place(*place)?;
                let callee = self.runtime_function("nova_value_array_length", 1);
                let arg = self.to_int(array)?;
                self.build_call(callee, &[arg.into()], "len")
            }
            Rvalue::Discriminant(_) => {
                // Reserved for enum lowering.
                Ok(self.context.i64_type().const_zero().into())
            }
        }
    }

    /// Integer operations use the signed forms; a float on either side
    /// promotes the operation to floating point.
    fn generate_binary_op(
        &mut self,
        op: BinOp,
        lhs: BasicValueEnum<'ctx>,
        rhs: BasicValueEnum<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        let err = |e: inkwell::builder::BuilderError| CodeGenError::LlvmOperationFailed(e.to_string());

        if lhs.is_float_value() || rhs.is_float_value() {
            let l = self.to_float(lhs)?;
            let r = self.to_float(rhs)?;
            let value: BasicValueEnum = match op {
                BinOp::Add => self.builder.build_float_add(l, r, "fadd").map_err(err)?.into(),
                BinOp::Sub => self.builder.build_float_sub(l, r, "fsub").map_err(err)?.into(),
                BinOp::Mul => self.builder.build_float_mul(l, r, "fmul").map_err(err)?.into(),
                BinOp::Div => self.builder.build_float_div(l, r, "fdiv").map_err(err)?.into(),
                BinOp::Rem => self.builder.build_float_rem(l, r, "frem").map_err(err)?.into(),
                BinOp::Eq => self
                    .builder
                    .build_float_compare(FloatPredicate::OEQ, l, r, "fcmp")
                    .map_err(err)?
                    .into(),
                BinOp::Ne => self
                    .builder
                    .build_float_compare(FloatPredicate::ONE, l, r, "fcmp")
                    .map_err(err)?
                    .into(),
                BinOp::Lt => self
                    .builder
                    .build_float_compare(FloatPredicate::OLT, l, r, "fcmp")
                    .map_err(err)?
                    .into(),
                BinOp::Le => self
                    .builder
                    .build_float_compare(FloatPredicate::OLE, l, r, "fcmp")
                    .map_err(err)?
                    .into(),
                BinOp::Gt => self
                    .builder
                    .build_float_compare(FloatPredicate::OGT, l, r, "fcmp")
                    .map_err(err)?
                    .into(),
                BinOp::Ge => self
                    .builder
                    .build_float_compare(FloatPredicate::OGE, l, r, "fcmp")
                    .map_err(err)?
                    .into(),
                // Bitwise forms fall back to the integer path.
                _ => {
                    let l = self.to_int(lhs)?;
                    let r = self.to_int(rhs)?;
                    return self.integer_binary_op(op, l, r);
                }
            };
            return Ok(value);
        }

        let l = self.to_int(lhs)?;
        let r = self.to_int(rhs)?;
        self.integer_binary_op(op, l, r)
    }

    fn integer_binary_op(
        &mut self,
        op: BinOp,
        l: IntValue<'ctx>,
        r: IntValue<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        let err = |e: inkwell::builder::BuilderError| CodeGenError::LlvmOperationFailed(e.to_string());
        let b = &self.builder;
        let value: BasicValueEnum = match op {
            BinOp::Add => b.build_int_add(l, r, "add").map_err(err)?.into(),
            BinOp::Sub => b.build_int_sub(l, r, "sub").map_err(err)?.into(),
            BinOp::Mul => b.build_int_mul(l, r, "mul").map_err(err)?.into(),
            BinOp::Div => b.build_int_signed_div(l, r, "sdiv").map_err(err)?.into(),
            BinOp::Rem => b.build_int_signed_rem(l, r, "srem").map_err(err)?.into(),
            BinOp::BitAnd => b.build_and(l, r, "and").map_err(err)?.into(),
            BinOp::BitOr => b.build_or(l, r, "or").map_err(err)?.into(),
            BinOp::BitXor => b.build_xor(l, r, "xor").map_err(err)?.into(),
            BinOp::Shl => b.build_left_shift(l, r, "shl").map_err(err)?.into(),
            BinOp::Shr => b.build_right_shift(l, r, true, "ashr").map_err(err)?.into(),
            BinOp::UShr => b.build_right_shift(l, r, false, "lshr").map_err(err)?.into(),
            BinOp::Eq => b
                .build_int_compare(IntPredicate::EQ, l, r, "cmp")
                .map_err(err)?
                .into(),
            BinOp::Ne => b
                .build_int_compare(IntPredicate::NE, l, r, "cmp")
                .map_err(err)?
                .into(),
            BinOp::Lt => b
                .build_int_compare(IntPredicate::SLT, l, r, "cmp")
                .map_err(err)?
                .into(),
            BinOp::Le => b
                .build_int_compare(IntPredicate::SLE, l, r, "cmp")
                .map_err(err)?
                .into(),
            BinOp::Gt => b
                .build_int_compare(IntPredicate::SGT, l, r, "cmp")
                .map_err(err)?
                .into(),
            BinOp::Ge => b
                .build_int_compare(IntPredicate::SGE, l, r, "cmp")
                .map_err(err)?
                .into(),
        };
        Ok(value)
    }

    fn generate_unary_op(
        &mut self,
        op: UnOp,
        value: BasicValueEnum<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        let err = |e: inkwell::builder::BuilderError| CodeGenError::LlvmOperationFailed(e.to_string());
        match op {
            UnOp::Neg => {
                if value.is_float_value() {
                    Ok(self
                        .builder
                        .build_float_neg(value.into_float_value(), "fneg")
                        .map_err(err)?
                        .into())
                } else {
                    let v = self.to_int(value)?;
                    Ok(self.builder.build_int_neg(v, "neg").map_err(err)?.into())
                }
            }
            UnOp::Not => {
                let v = self.to_int(value)?;
                Ok(self.builder.build_not(v, "not").map_err(err)?.into())
            }
        }
    }

    fn generate_cast(
        &mut self,
        kind: CastKind,
        value: BasicValueEnum<'ctx>,
        target: MirType,
    ) -> Result<BasicValueEnum<'ctx>> {
        let err = |e: inkwell::builder::BuilderError| CodeGenError::LlvmOperationFailed(e.to_string());
        let target_ty = self.type_mapper.map(target);
        match kind {
            CastKind::IntToInt | CastKind::Bitcast => self.coerce(value, target_ty),
            CastKind::IntToFloat => {
                let v = self.to_int(value)?;
                Ok(self
                    .builder
                    .build_signed_int_to_float(v, target_ty.into_float_type(), "sitofp")
                    .map_err(err)?
                    .into())
            }
            CastKind::FloatToInt => {
                let v = self.to_float(value)?;
                Ok(self
                    .builder
                    .build_float_to_signed_int(v, target_ty.into_int_type(), "fptosi")
                    .map_err(err)?
                    .into())
            }
            CastKind::FloatToFloat => {
                let v = self.to_float(value)?;
                self.coerce(v.into(), target_ty)
            }
        }
    }

    // =======================================================================
    // Aggregates
    // =======================================================================

    fn generate_aggregate(
        &mut self,
        dest: Place,
        kind: AggregateKind,
        elements: &[Operand],
    ) -> Result<BasicValueEnum<'ctx>> {
        let err = |e: inkwell::builder::BuilderError| CodeGenError::LlvmOperationFailed(e.to_string());
        match kind {
            AggregateKind::Array => {
                // Allocate through the runtime, then store each element at
                // its slot.
                let i64t = self.context.i64_type();
                let create = self.runtime_function("nova_create_value_array", 1);
                let len = i64t.const_int(elements.len() as u64, false);
                let array = self.build_call(create, &[len.into()], "array")?;
                let array_ptr = self.to_ptr(array)?;
                for (i, element) in elements.iter().enumerate() {
                    let value = self.operand_value(element)?;
                    let value = self.to_int(value)?;
                    let index = i64t.const_int(i as u64, false);
                    let slot = unsafe {
                        self.builder
                            .build_in_bounds_gep(i64t, array_ptr, &[index], "elem")
                            .map_err(err)?
                    };
                    self.builder.build_store(slot, value).map_err(err)?;
                }
                Ok(array_ptr.into())
            }
            AggregateKind::Struct | AggregateKind::Tuple => {
                // Struct type inferred from element count and types at
                // lowering time; fields are uniform i64 slots.
                let i64t = self.context.i64_type();
                let field_types: Vec<BasicTypeEnum> =
                    elements.iter().map(|_| i64t.into()).collect();
                let struct_ty = self.context.struct_type(&field_types, false);
                let slot = self.builder.build_alloca(struct_ty, "agg").map_err(err)?;
                for (i, element) in elements.iter().enumerate() {
                    let value = self.operand_value(element)?;
                    let value = self.to_int(value)?;
                    let field = self
                        .builder
                        .build_struct_gep(struct_ty, slot, i as u32, "field")
                        .map_err(err)?;
                    self.builder.build_store(field, value).map_err(err)?;
                }
                self.struct_types.insert(dest.index, struct_ty);
                Ok(slot.into())
            }
            AggregateKind::SetField => {
                // [base, field index, value]: getelementptr + store.
                let base = self.operand_value(&elements[0])?;
                let base_ptr = self.to_ptr(base)?;
                let index = self.operand_value(&elements[1])?;
                let index = self.to_int(index)?;
                let value = self.operand_value(&elements[2])?;
                let value = self.to_int(value)?;

                let known_struct = elements[0]
                    .place()
                    .and_then(|p| self.struct_types.get(&p.index).copied());
                let slot = match (known_struct, index.is_const()) {
                    (Some(struct_ty), true) => {
                        let i = index.get_zero_extended_constant().unwrap_or(0) as u32;
                        self.builder
                            .build_struct_gep(struct_ty, base_ptr, i, "field")
                            .map_err(err)?
                    }
                    _ => unsafe {
                        self.builder
                            .build_in_bounds_gep(self.context.i64_type(), base_ptr, &[index], "field")
                            .map_err(err)?
                    },
                };
                self.builder.build_store(slot, value).map_err(err)?;
                Ok(value.into())
            }
        }
    }

    /// `GetElement` reads: struct-shaped gep when the base layout is known
    /// and the index constant, otherwise a uniform i64-slot gep.
    fn generate_get_element(
        &mut self,
        array: &Operand,
        index: &Operand,
        is_field: bool,
    ) -> Result<BasicValueEnum<'ctx>> {
        let err = |e: inkwell::builder::BuilderError| CodeGenError::LlvmOperationFailed(e.to_string());
        let i64t = self.context.i64_type();
        let base = self.operand_value(array)?;
        let base_ptr = self.to_ptr(base)?;
        let index_value = self.operand_value(index)?;
        let index_value = self.to_int(index_value)?;

        let known_struct = array
            .place()
            .and_then(|p| self.struct_types.get(&p.index).copied());

        let slot = match (is_field, known_struct, index_value.is_const()) {
            (true, Some(struct_ty), true) => {
                let i = index_value.get_zero_extended_constant().unwrap_or(0) as u32;
                self.builder
                    .build_struct_gep(struct_ty, base_ptr, i, "field")
                    .map_err(err)?
            }
            _ => unsafe {
                self.builder
                    .build_in_bounds_gep(i64t, base_ptr, &[index_value], "elem")
                    .map_err(err)?
            },
        };
        self.builder
            .build_load(i64t, slot, "load")
            .map_err(err)
    }

    // =======================================================================
    // Terminators
    // =======================================================================

    fn generate_terminator(&mut self, terminator: &Terminator) -> Result<()> {
        let err = |e: inkwell::builder::BuilderError| CodeGenError::LlvmOperationFailed(e.to_string());
        match terminator {
            Terminator::Return => {
                // Widened i64 return: the last value stored to _0, or a
                // typed zero fallback.
                let value = match self.place_values.get(&0).copied() {
                    Some(v) => self.to_int(v)?,
                    None => self.context.i64_type().const_zero(),
                };
                self.builder.build_return(Some(&value)).map_err(err)?;
                Ok(())
            }
            Terminator::Goto { target } => {
                let bb = self.llvm_block(*target)?;
                self.builder.build_unconditional_branch(bb).map_err(err)?;
                Ok(())
            }
            Terminator::SwitchInt {
                discr,
                targets,
                otherwise,
            } => {
                let discr_value = self.operand_value(discr)?;
                let discr_value = self.to_int(discr_value)?;
                let width = discr_value.get_type();
                let cases: Vec<(IntValue, BasicBlock)> = targets
                    .iter()
                    .map(|(v, b)| Ok((width.const_int(*v as u64, true), self.llvm_block(*b)?)))
                    .collect::<Result<_>>()?;
                let else_bb = self.llvm_block(*otherwise)?;
                self.builder
                    .build_switch(discr_value, else_bb, &cases)
                    .map_err(err)?;
                Ok(())
            }
            Terminator::Call {
                func: callee,
                args,
                destination,
                target,
                ..
            } => {
                self.generate_call(callee, args, *destination)?;
                let bb = self.llvm_block(*target)?;
                self.builder.build_unconditional_branch(bb).map_err(err)?;
                Ok(())
            }
            Terminator::Assert { target, .. } | Terminator::Drop { target, .. } => {
                let bb = self.llvm_block(*target)?;
                self.builder.build_unconditional_branch(bb).map_err(err)?;
                Ok(())
            }
            Terminator::Unreachable => {
                self.builder.build_unreachable().map_err(err)?;
                Ok(())
            }
        }
    }

    /// Calls resolve by name: the func operand is a string constant naming
    /// a module function or runtime intrinsic. An unresolvable target
    /// degrades to a zero result so downstream code still lowers.
    fn generate_call(&mut self, callee: &Operand, args: &[Operand], destination: Place) -> Result<()> {
        let name = match callee {
            Operand::Constant(Constant {
                value: ConstValue::Str(s),
                ..
            }) => Some(*s),
            _ => None,
        };

        let Some(name) = name else {
            let zero: BasicValueEnum = self.context.i64_type().const_zero().into();
            return self.write_place(destination, zero);
        };

        let function = match self.module.get_function(name.as_str()) {
            Some(f) => f,
            None => self.runtime_function(name.as_str(), args.len()),
        };

        // Coerce each argument to its declared parameter type; varargs
        // tails pass through as-is.
        let param_types = function.get_type().get_param_types();
        let mut call_args: Vec<BasicMetadataValueEnum> = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let value = self.operand_value(arg)?;
            let value = match param_types.get(i) {
                Some(param_ty) => self.coerce(value, (*param_ty).try_into().map_err(|_| {
                    CodeGenError::TypeMappingError("non-basic parameter type".into())
                })?)?,
                None => value, // varargs
            };
            call_args.push(value.into());
        }

        let result = self.build_call(function, &call_args, "call")?;
        self.write_place(destination, result)
    }

    fn build_call(
        &mut self,
        function: FunctionValue<'ctx>,
        args: &[BasicMetadataValueEnum<'ctx>],
        name: &str,
    ) -> Result<BasicValueEnum<'ctx>> {
        let site = self
            .builder
            .build_call(function, args, name)
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
        Ok(site
            .try_as_basic_value()
            .basic()
            .unwrap_or_else(|| self.context.i64_type().const_zero().into()))
    }

    /// Declare a runtime function on first reference. `printf` is the
    /// varargs special case; `nova_create_value_array` returns a pointer;
    /// everything else is uniform `i64(i64, ...)` at the untyped boundary.
    fn runtime_function(&mut self, name: &str, argc: usize) -> FunctionValue<'ctx> {
        if let Some(f) = self.module.get_function(name) {
            return f;
        }
        let i64t = self.context.i64_type();
        let ptr = self.context.ptr_type(AddressSpace::default());
        let fn_type = match name {
            "printf" => self.context.i32_type().fn_type(&[ptr.into()], true),
            "nova_create_value_array" => ptr.fn_type(&[i64t.into()], false),
            _ => {
                let params: Vec<_> = (0..argc).map(|_| i64t.into()).collect();
                i64t.fn_type(&params, false)
            }
        };
        self.module
            .add_function(name, fn_type, Some(Linkage::External))
    }

    fn llvm_block(&self, block: BlockId) -> Result<BasicBlock<'ctx>> {
        self.block_map
            .get(&block)
            .copied()
            .ok_or(CodeGenError::BlockNotFound(block.0))
    }

    // =======================================================================
    // Coercions
    // =======================================================================

    fn to_int(&mut self, value: BasicValueEnum<'ctx>) -> Result<IntValue<'ctx>> {
        let err = |e: inkwell::builder::BuilderError| CodeGenError::LlvmOperationFailed(e.to_string());
        let i64t = self.context.i64_type();
        match value {
            BasicValueEnum::IntValue(v) => Ok(v),
            BasicValueEnum::PointerValue(v) => self
                .builder
                .build_ptr_to_int(v, i64t, "ptoi")
                .map_err(err),
            BasicValueEnum::FloatValue(v) => Ok(self
                .builder
                .build_bit_cast(v, i64t, "bits")
                .map_err(err)?
                .into_int_value()),
            other => Err(CodeGenError::TypeMappingError(format!(
                "cannot coerce {:?} to integer",
                other.get_type()
            ))),
        }
    }

    fn to_ptr(&mut self, value: BasicValueEnum<'ctx>) -> Result<PointerValue<'ctx>> {
        let err = |e: inkwell::builder::BuilderError| CodeGenError::LlvmOperationFailed(e.to_string());
        let ptr = self.context.ptr_type(AddressSpace::default());
        match value {
            BasicValueEnum::PointerValue(v) => Ok(v),
            BasicValueEnum::IntValue(v) => self
                .builder
                .build_int_to_ptr(v, ptr, "itop")
                .map_err(err),
            other => Err(CodeGenError::TypeMappingError(format!(
                "cannot coerce {:?} to pointer",
                other.get_type()
            ))),
        }
    }

    fn to_float(&mut self, value: BasicValueEnum<'ctx>) -> Result<inkwell::values::FloatValue<'ctx>> {
        let err = |e: inkwell::builder::BuilderError| CodeGenError::LlvmOperationFailed(e.to_string());
        match value {
            BasicValueEnum::FloatValue(v) => Ok(v),
            BasicValueEnum::IntValue(v) => self
                .builder
                .build_signed_int_to_float(v, self.context.f64_type(), "sitofp")
                .map_err(err),
            other => Err(CodeGenError::TypeMappingError(format!(
                "cannot coerce {:?} to float",
                other.get_type()
            ))),
        }
    }

    fn coerce(
        &mut self,
        value: BasicValueEnum<'ctx>,
        target: BasicTypeEnum<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        let err = |e: inkwell::builder::BuilderError| CodeGenError::LlvmOperationFailed(e.to_string());
        if value.get_type() == target {
            return Ok(value);
        }
        match target {
            BasicTypeEnum::IntType(int_ty) => {
                let v = self.to_int(value)?;
                if v.get_type() == int_ty {
                    Ok(v.into())
                } else if v.get_type().get_bit_width() < int_ty.get_bit_width() {
                    Ok(self
                        .builder
                        .build_int_z_extend(v, int_ty, "zext")
                        .map_err(err)?
                        .into())
                } else {
                    Ok(self
                        .builder
                        .build_int_truncate(v, int_ty, "trunc")
                        .map_err(err)?
                        .into())
                }
            }
            BasicTypeEnum::PointerType(_) => Ok(self.to_ptr(value)?.into()),
            BasicTypeEnum::FloatType(_) => Ok(self.to_float(value)?.into()),
            other => Err(CodeGenError::TypeMappingError(format!(
                "unsupported coercion target {:?}",
                other
            ))),
        }
    }

    fn zero_of(&self, ty: BasicTypeEnum<'ctx>) -> BasicValueEnum<'ctx> {
        match ty {
            BasicTypeEnum::IntType(t) => t.const_zero().into(),
            BasicTypeEnum::FloatType(t) => t.const_zero().into(),
            BasicTypeEnum::PointerType(t) => t.const_null().into(),
            _ => self.context.i64_type().const_zero().into(),
        }
    }

    // =======================================================================
    // Output paths
    // =======================================================================

    /// The textual IR of the generated module.
    pub fn print_ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    pub fn emit_llvm_ir(&self, path: &Path) -> Result<()> {
        self.module
            .print_to_file(path)
            .map_err(|e| CodeGenError::EmitFailed(e.to_string()))
    }

    pub fn emit_bitcode(&self, path: &Path) -> Result<()> {
        if self.module.write_bitcode_to_path(path) {
            Ok(())
        } else {
            Err(CodeGenError::EmitFailed(format!(
                "could not write bitcode to {}",
                path.display()
            )))
        }
    }

    fn target_machine(&self, opt_level: OptimizationLevel) -> Result<TargetMachine> {
        ensure_targets_initialized();
        let triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&triple)
            .map_err(|e| CodeGenError::TargetInitFailed(e.to_string()))?;
        target
            .create_target_machine(
                &triple,
                "generic",
                "",
                opt_level,
                RelocMode::Default,
                CodeModel::Default,
            )
            .ok_or_else(|| {
                CodeGenError::TargetInitFailed(format!("no target machine for {}", triple))
            })
    }

    pub fn emit_object(&self, path: &Path) -> Result<()> {
        let machine = self.target_machine(OptimizationLevel::Default)?;
        machine
            .write_to_file(&self.module, FileType::Object, path)
            .map_err(|e| CodeGenError::EmitFailed(e.to_string()))
    }

    pub fn emit_assembly(&self, path: &Path) -> Result<()> {
        let machine = self.target_machine(OptimizationLevel::Default)?;
        machine
            .write_to_file(&self.module, FileType::Assembly, path)
            .map_err(|e| CodeGenError::EmitFailed(e.to_string()))
    }

    /// Object file plus a system `cc` link.
    pub fn emit_executable(&self, path: &Path) -> Result<()> {
        let object_path = path.with_extension("o");
        self.emit_object(&object_path)?;
        let status = std::process::Command::new("cc")
            .arg(&object_path)
            .arg("-o")
            .arg(path)
            .status()
            .map_err(|e| CodeGenError::EmitFailed(format!("linker launch failed: {}", e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(CodeGenError::EmitFailed(format!(
                "linker exited with {}",
                status
            )))
        }
    }

    /// Run the new-pass-manager default pipeline at the given level (0-3).
    pub fn run_optimization_passes(&self, opt_level: u32) -> Result<()> {
        let machine = self.target_machine(OptimizationLevel::Default)?;
        let pipeline = format!("default<O{}>", opt_level.min(3));
        self.module
            .run_passes(&pipeline, &machine, PassBuilderOptions::create())
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))
    }

    /// JIT-execute `main` and return its exit value.
    pub fn execute_main(&self) -> Result<i32> {
        let engine = self
            .module
            .create_jit_execution_engine(OptimizationLevel::None)
            .map_err(|e| CodeGenError::JitFailed(e.to_string()))?;
        unsafe {
            let main = engine
                .get_function::<unsafe extern "C" fn() -> i64>("main")
                .map_err(|e| CodeGenError::JitFailed(e.to_string()))?;
            Ok(main.call() as i32)
        }
    }
}
