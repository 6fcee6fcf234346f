//! Type mapping from MIR to LLVM IR types.

use inkwell::context::Context;
use inkwell::types::{BasicMetadataTypeEnum, BasicTypeEnum};
use inkwell::AddressSpace;

use novac_mir::MirType;
use novac_util::FxHashMap;

/// Maps MIR type kinds to LLVM types, caching per kind.
///
/// Signedness lives in the operations, so signed and unsigned kinds share
/// integer types. Aggregate markers (`Array`, `Struct`, `Function`) and
/// `Pointer` lower to the opaque `ptr`; concrete struct layouts are
/// recovered at aggregate construction sites.
pub struct TypeMapper<'ctx> {
    context: &'ctx Context,
    cache: FxHashMap<MirType, BasicTypeEnum<'ctx>>,
}

impl<'ctx> TypeMapper<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        Self {
            context,
            cache: FxHashMap::default(),
        }
    }

    /// Map a MIR type to an LLVM basic type. `Void` is widened to `i64`;
    /// MIR may carry void placeholders for untyped slots.
    pub fn map(&mut self, ty: MirType) -> BasicTypeEnum<'ctx> {
        if let Some(&cached) = self.cache.get(&ty) {
            return cached;
        }
        let mapped: BasicTypeEnum<'ctx> = match ty {
            MirType::Void => self.context.i64_type().into(),
            MirType::I1 => self.context.bool_type().into(),
            MirType::I8 | MirType::U8 => self.context.i8_type().into(),
            MirType::I16 | MirType::U16 => self.context.i16_type().into(),
            MirType::I32 | MirType::U32 => self.context.i32_type().into(),
            MirType::I64 | MirType::U64 | MirType::ISize | MirType::USize => {
                self.context.i64_type().into()
            }
            MirType::F32 => self.context.f32_type().into(),
            MirType::F64 => self.context.f64_type().into(),
            MirType::Pointer | MirType::Array | MirType::Struct | MirType::Function => self
                .context
                .i8_type()
                .ptr_type(AddressSpace::default())
                .into(),
        };
        self.cache.insert(ty, mapped);
        mapped
    }

    /// The metadata form used when building function signatures.
    pub fn map_param(&mut self, ty: MirType) -> BasicMetadataTypeEnum<'ctx> {
        self.map(ty).into()
    }
}
