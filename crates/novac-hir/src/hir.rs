//! HIR data model.

use std::fmt;

use indexmap::IndexMap;
use novac_util::{define_idx, IndexVec, Symbol};

define_idx!(BlockId);
define_idx!(ValueId);

/// HIR types. `Any` is the untyped-JavaScript catch-all; it lowers to I64 at
/// the MIR boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum HirType {
    Void,
    Never,
    I8,
    I16,
    I32,
    I64,
    ISize,
    U8,
    U16,
    U32,
    U64,
    USize,
    F32,
    F64,
    Bool,
    String,
    Any,
    Unknown,
    Pointer(Box<HirType>),
    Array(Box<HirType>),
    Struct(Symbol),
    Function {
        params: Vec<HirType>,
        ret: Box<HirType>,
    },
}

impl HirType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            HirType::I8
                | HirType::I16
                | HirType::I32
                | HirType::I64
                | HirType::ISize
                | HirType::U8
                | HirType::U16
                | HirType::U32
                | HirType::U64
                | HirType::USize
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, HirType::F32 | HirType::F64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, HirType::Pointer(_))
    }

    /// The pointee of a pointer type.
    pub fn pointee(&self) -> Option<&HirType> {
        match self {
            HirType::Pointer(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for HirType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HirType::Void => write!(f, "void"),
            HirType::Never => write!(f, "never"),
            HirType::I8 => write!(f, "i8"),
            HirType::I16 => write!(f, "i16"),
            HirType::I32 => write!(f, "i32"),
            HirType::I64 => write!(f, "i64"),
            HirType::ISize => write!(f, "isize"),
            HirType::U8 => write!(f, "u8"),
            HirType::U16 => write!(f, "u16"),
            HirType::U32 => write!(f, "u32"),
            HirType::U64 => write!(f, "u64"),
            HirType::USize => write!(f, "usize"),
            HirType::F32 => write!(f, "f32"),
            HirType::F64 => write!(f, "f64"),
            HirType::Bool => write!(f, "bool"),
            HirType::String => write!(f, "string"),
            HirType::Any => write!(f, "any"),
            HirType::Unknown => write!(f, "unknown"),
            HirType::Pointer(inner) => write!(f, "*{}", inner),
            HirType::Array(inner) => write!(f, "[{}]", inner),
            HirType::Struct(name) => write!(f, "struct {}", name),
            HirType::Function { params, ret } => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
        }
    }
}

/// Instruction opcodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
    // Bitwise
    And,
    Or,
    Xor,
    Not,
    Shl,
    Shr,
    UShr,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Memory
    Alloca,
    Load,
    Store,
    GetField,
    SetField,
    GetElement,
    SetElement,
    // Control
    Br,
    CondBr,
    Switch,
    Return,
    Unreachable,
    Break,
    Continue,
    // Other
    Call,
    Cast,
    Aggregate,
    Phi,
}

impl Opcode {
    /// A block is terminated iff its last instruction is one of these.
    /// `Break`/`Continue` are pseudo-instructions, not terminators; they end
    /// an arm for fall-through purposes but are rewritten by MIR lowering.
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Opcode::Br | Opcode::CondBr | Opcode::Switch | Opcode::Return | Opcode::Unreachable
        )
    }

    /// True if lowering must not append a fall-through branch after this.
    pub fn ends_arm(self) -> bool {
        self.is_terminator() || matches!(self, Opcode::Break | Opcode::Continue)
    }
}

/// Constant payloads.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstKind {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(Symbol),
    Null,
    Undefined,
}

#[derive(Clone, Debug)]
pub struct HirConst {
    pub ty: HirType,
    pub kind: ConstKind,
}

/// An instruction: opcode, result type, ordered operands, and the block it
/// lives in. Branch targets are held separately from value operands so CFG
/// edges can be computed from terminators on demand.
#[derive(Clone, Debug)]
pub struct HirInst {
    pub opcode: Opcode,
    pub ty: HirType,
    pub operands: Vec<ValueId>,
    pub targets: Vec<BlockId>,
    /// Label on `Break`/`Continue` pseudo-instructions.
    pub label: Option<Symbol>,
    pub block: BlockId,
    pub name: Symbol,
}

/// Anything producing (or naming) a value.
#[derive(Clone, Debug)]
pub enum HirValue {
    Constant(HirConst),
    Param {
        index: u32,
        name: Symbol,
        ty: HirType,
    },
    Inst(HirInst),
}

impl HirValue {
    pub fn ty(&self) -> &HirType {
        match self {
            HirValue::Constant(c) => &c.ty,
            HirValue::Param { ty, .. } => ty,
            HirValue::Inst(inst) => &inst.ty,
        }
    }

    pub fn as_inst(&self) -> Option<&HirInst> {
        match self {
            HirValue::Inst(inst) => Some(inst),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<&HirConst> {
        match self {
            HirValue::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// The string payload of a `Str` constant, if that is what this is.
    pub fn as_str_const(&self) -> Option<Symbol> {
        match self {
            HirValue::Constant(HirConst {
                kind: ConstKind::Str(s),
                ..
            }) => Some(*s),
            _ => None,
        }
    }
}

/// A basic block: label, instruction list, and the break/continue marker
/// consulted by lowering heuristics.
#[derive(Clone, Debug)]
pub struct HirBlock {
    pub label: Symbol,
    pub insts: Vec<ValueId>,
    pub has_break_or_continue: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Linkage {
    Public,
    Internal,
}

/// A function: parameters, blocks (entry is the first), and the per-function
/// value arena.
#[derive(Clone, Debug)]
pub struct HirFunction {
    pub name: Symbol,
    pub params: Vec<ValueId>,
    pub return_ty: HirType,
    pub blocks: IndexVec<BlockId, HirBlock>,
    pub values: IndexVec<ValueId, HirValue>,
    pub linkage: Linkage,
    pub is_async: bool,
    pub is_generator: bool,
    pub attributes: Vec<Symbol>,
}

impl HirFunction {
    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn value(&self, id: ValueId) -> &HirValue {
        &self.values[id]
    }

    pub fn inst(&self, id: ValueId) -> Option<&HirInst> {
        self.values[id].as_inst()
    }

    /// The terminator of a block, if the block is terminated.
    pub fn terminator_of(&self, block: BlockId) -> Option<&HirInst> {
        let last = *self.blocks[block].insts.last()?;
        let inst = self.inst(last)?;
        if inst.opcode.is_terminator() {
            Some(inst)
        } else {
            None
        }
    }

    pub fn is_terminated(&self, block: BlockId) -> bool {
        self.terminator_of(block).is_some()
    }

    /// Successor edges, computed from the terminator.
    pub fn successors(&self, block: BlockId) -> Vec<BlockId> {
        self.terminator_of(block)
            .map(|t| t.targets.clone())
            .unwrap_or_default()
    }

    /// Predecessor lists for every block, computed from terminators.
    pub fn predecessors(&self) -> IndexVec<BlockId, Vec<BlockId>> {
        let mut preds: IndexVec<BlockId, Vec<BlockId>> =
            self.blocks.indices().map(|_| Vec::new()).collect();
        for block in self.blocks.indices() {
            for succ in self.successors(block) {
                preds[succ].push(block);
            }
        }
        preds
    }

    /// The last parameter, when it is the closure environment pointer.
    pub fn env_param(&self) -> Option<ValueId> {
        let &last = self.params.last()?;
        match &self.values[last] {
            HirValue::Param { name, .. } if name.as_str() == "__env" => Some(last),
            _ => None,
        }
    }
}

/// A named struct type: field names and types in fixed order.
#[derive(Clone, Debug)]
pub struct HirStruct {
    pub name: Symbol,
    pub fields: Vec<(Symbol, HirType)>,
}

/// A module: functions in declaration order, struct types, and the closure
/// side-tables keyed by function name.
#[derive(Debug, Default)]
pub struct HirModule {
    pub name: Symbol,
    pub functions: Vec<HirFunction>,
    pub structs: IndexMap<Symbol, HirStruct>,
    /// Inner function name → its environment struct.
    pub closure_environments: IndexMap<Symbol, HirStruct>,
    /// Inner function name → captured variable names, in environment order.
    pub closure_captured_vars: IndexMap<Symbol, Vec<Symbol>>,
    /// Inner function name → HIR values the captured names refer to in the
    /// defining (outer) function's arena, parallel to `closure_captured_vars`.
    pub closure_captured_values: IndexMap<Symbol, Vec<ValueId>>,
    /// Outer function name → name of the inner closure it returns.
    pub closure_returned_by: IndexMap<Symbol, Symbol>,
}

impl HirModule {
    pub fn new(name: Symbol) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn function(&self, name: Symbol) -> Option<&HirFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}

// ---------------------------------------------------------------------------
// Printer
// ---------------------------------------------------------------------------

impl fmt::Display for HirModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; HIR module {}", self.name)?;
        for st in self.structs.values() {
            write!(f, "struct {} {{ ", st.name)?;
            for (i, (name, ty)) in st.fields.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", name, ty)?;
            }
            writeln!(f, " }}")?;
        }
        for func in &self.functions {
            write!(f, "{}", func)?;
        }
        Ok(())
    }
}

impl fmt::Display for HirFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}(", self.name)?;
        for (i, &param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if let HirValue::Param { name, ty, .. } = self.value(param) {
                write!(f, "{}: {}", name, ty)?;
            }
        }
        writeln!(f, ") -> {} {{", self.return_ty)?;
        for (id, block) in self.blocks.iter_enumerated() {
            writeln!(f, "{}:  ; bb{}", block.label, id.0)?;
            for &inst_id in &block.insts {
                if let Some(inst) = self.inst(inst_id) {
                    write!(f, "    ")?;
                    if inst.ty != HirType::Void {
                        write!(f, "%{} = ", inst.name)?;
                    }
                    write!(f, "{:?}", inst.opcode)?;
                    for &op in &inst.operands {
                        write!(f, " {}", self.render_operand(op))?;
                    }
                    for &target in &inst.targets {
                        write!(f, " -> {}", self.blocks[target].label)?;
                    }
                    if let Some(label) = inst.label {
                        write!(f, " #{}", label)?;
                    }
                    writeln!(f)?;
                }
            }
        }
        writeln!(f, "}}")
    }
}

impl HirFunction {
    fn render_operand(&self, id: ValueId) -> String {
        match self.value(id) {
            HirValue::Constant(c) => match &c.kind {
                ConstKind::Int(v) => format!("{}", v),
                ConstKind::Float(v) => format!("{}", v),
                ConstKind::Bool(v) => format!("{}", v),
                ConstKind::Str(s) => format!("{:?}", s.as_str()),
                ConstKind::Null => "null".to_string(),
                ConstKind::Undefined => "undefined".to_string(),
            },
            HirValue::Param { name, .. } => format!("%{}", name),
            HirValue::Inst(inst) => format!("%{}", inst.name),
        }
    }
}
