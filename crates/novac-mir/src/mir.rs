//! MIR data model.

use std::fmt;

use indexmap::IndexMap;
use novac_util::{define_idx, IndexVec, Symbol};

define_idx!(BlockId);

/// MIR type kinds. Aggregate shapes (`Array`, `Struct`, `Function`) are
/// opaque markers; layout is recovered at code generation time from the
/// aggregate construction sites and the module's struct table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MirType {
    Void,
    I1,
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
    Pointer,
    Array,
    Struct,
    Function,
}

impl MirType {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            MirType::I1
                | MirType::I8
                | MirType::I16
                | MirType::I32
                | MirType::I64
                | MirType::ISize
                | MirType::U8
                | MirType::U16
                | MirType::U32
                | MirType::U64
                | MirType::USize
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, MirType::F32 | MirType::F64)
    }
}

/// The storage class of a place, fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaceKind {
    Local,
    Static,
    Temp,
    Return,
    Argument,
}

/// A named storage location. `index` is the function-wide `_N` number:
/// the return place is always `_0`, arguments follow, then locals and
/// temporaries in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Place {
    pub kind: PlaceKind,
    pub index: u32,
    pub ty: MirType,
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_{}", self.index)
    }
}

/// Constant payloads.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(Symbol),
    Null,
    Undefined,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Constant {
    pub value: ConstValue,
    pub ty: MirType,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Copy(Place),
    Move(Place),
    Constant(Constant),
}

impl Operand {
    pub fn const_int(value: i64) -> Operand {
        Operand::Constant(Constant {
            value: ConstValue::Int(value),
            ty: MirType::I64,
        })
    }

    pub fn const_str(value: Symbol) -> Operand {
        Operand::Constant(Constant {
            value: ConstValue::Str(value),
            ty: MirType::Pointer,
        })
    }

    pub fn place(&self) -> Option<Place> {
        match self {
            Operand::Copy(p) | Operand::Move(p) => Some(*p),
            Operand::Constant(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastKind {
    IntToInt,
    IntToFloat,
    FloatToInt,
    FloatToFloat,
    Bitcast,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateKind {
    Array,
    Tuple,
    Struct,
    /// Field store encoded as a 3-element aggregate:
    /// `[base, field index, value]`.
    SetField,
}

/// A computation producing a value, assigned into a place.
#[derive(Clone, Debug, PartialEq)]
pub enum Rvalue {
    Use(Operand),
    BinaryOp(BinOp, Operand, Operand),
    CheckedBinaryOp(BinOp, Operand, Operand),
    UnaryOp(UnOp, Operand),
    Cast(CastKind, Operand, MirType),
    Aggregate(AggregateKind, Vec<Operand>),
    GetElement {
        array: Operand,
        index: Operand,
        is_field: bool,
    },
    Ref(Place),
    AddressOf(Place),
    Len(Place),
    /// Reserved for enum lowering.
    Discriminant(Place),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Assign(Place, Rvalue),
    StorageLive(Place),
    StorageDead(Place),
    Nop,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Terminator {
    Return,
    Goto {
        target: BlockId,
    },
    SwitchInt {
        discr: Operand,
        targets: Vec<(i64, BlockId)>,
        otherwise: BlockId,
    },
    Call {
        func: Operand,
        args: Vec<Operand>,
        destination: Place,
        target: BlockId,
        unwind: Option<BlockId>,
    },
    Assert {
        cond: Operand,
        target: BlockId,
    },
    Drop {
        place: Place,
        target: BlockId,
    },
    Unreachable,
}

impl Terminator {
    /// Successor blocks, derived from the terminator.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Goto { target } => vec![*target],
            Terminator::SwitchInt {
                targets, otherwise, ..
            } => {
                let mut result: Vec<BlockId> = targets.iter().map(|(_, b)| *b).collect();
                result.push(*otherwise);
                result
            }
            Terminator::Call { target, unwind, .. } => {
                let mut result = vec![*target];
                if let Some(unwind) = unwind {
                    result.push(*unwind);
                }
                result
            }
            Terminator::Assert { target, .. } | Terminator::Drop { target, .. } => vec![*target],
            Terminator::Return | Terminator::Unreachable => Vec::new(),
        }
    }
}

/// A basic block: statements plus exactly one terminator. Freshly created
/// blocks carry `Unreachable` until the builder installs the real one.
#[derive(Clone, Debug, PartialEq)]
pub struct BasicBlock {
    pub statements: Vec<Statement>,
    pub terminator: Terminator,
}

/// Declaration info for one place.
#[derive(Clone, Debug)]
pub struct LocalDecl {
    pub place: Place,
    pub mutable: bool,
    /// Debug name, when the place came from a source variable.
    pub name: Option<Symbol>,
}

#[derive(Clone, Debug)]
pub struct MirFunction {
    pub name: Symbol,
    pub return_ty: MirType,
    pub arg_count: usize,
    /// `_0`, the arguments, then locals/temps, in index order.
    pub local_decls: Vec<LocalDecl>,
    pub blocks: IndexVec<BlockId, BasicBlock>,
}

impl MirFunction {
    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn return_place(&self) -> Place {
        self.local_decls[0].place
    }

    pub fn arg_place(&self, i: usize) -> Place {
        self.local_decls[1 + i].place
    }

    pub fn successors(&self, block: BlockId) -> Vec<BlockId> {
        self.blocks[block].terminator.successors()
    }
}

/// A module: functions in declaration order plus struct layouts carried
/// over from HIR for the code generator.
#[derive(Debug, Default)]
pub struct MirModule {
    pub name: Symbol,
    pub functions: Vec<MirFunction>,
    pub structs: IndexMap<Symbol, Vec<MirType>>,
}

impl MirModule {
    pub fn function(&self, name: Symbol) -> Option<&MirFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}

// ---------------------------------------------------------------------------
// Printer
// ---------------------------------------------------------------------------

impl fmt::Display for MirModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; MIR module {}", self.name)?;
        for func in &self.functions {
            write!(f, "{}", func)?;
        }
        Ok(())
    }
}

impl fmt::Display for MirFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}(", self.name)?;
        for i in 0..self.arg_count {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "_{}: {:?}", i + 1, self.arg_place(i).ty)?;
        }
        writeln!(f, ") -> {:?} {{", self.return_ty)?;
        for decl in self.local_decls.iter().skip(1 + self.arg_count) {
            write!(f, "    let ")?;
            if decl.mutable {
                write!(f, "mut ")?;
            }
            write!(f, "{}: {:?}", decl.place, decl.place.ty)?;
            if let Some(name) = decl.name {
                write!(f, "; // {}", name)?;
            }
            writeln!(f)?;
        }
        for (id, block) in self.blocks.iter_enumerated() {
            writeln!(f, "    bb{}: {{", id.0)?;
            for stmt in &block.statements {
                writeln!(f, "        {}", render_statement(stmt))?;
            }
            writeln!(f, "        {}", render_terminator(&block.terminator))?;
            writeln!(f, "    }}")?;
        }
        writeln!(f, "}}")
    }
}

fn render_operand(op: &Operand) -> String {
    match op {
        Operand::Copy(p) => format!("copy {}", p),
        Operand::Move(p) => format!("move {}", p),
        Operand::Constant(c) => match &c.value {
            ConstValue::Int(v) => format!("const {}", v),
            ConstValue::Float(v) => format!("const {}", v),
            ConstValue::Bool(v) => format!("const {}", v),
            ConstValue::Str(s) => format!("const {:?}", s.as_str()),
            ConstValue::Null => "const null".to_string(),
            ConstValue::Undefined => "const undefined".to_string(),
        },
    }
}

fn render_rvalue(rvalue: &Rvalue) -> String {
    match rvalue {
        Rvalue::Use(op) => render_operand(op),
        Rvalue::BinaryOp(op, lhs, rhs) => {
            format!("{:?}({}, {})", op, render_operand(lhs), render_operand(rhs))
        }
        Rvalue::CheckedBinaryOp(op, lhs, rhs) => format!(
            "Checked{:?}({}, {})",
            op,
            render_operand(lhs),
            render_operand(rhs)
        ),
        Rvalue::UnaryOp(op, operand) => format!("{:?}({})", op, render_operand(operand)),
        Rvalue::Cast(kind, operand, ty) => {
            format!("{} as {:?} ({:?})", render_operand(operand), ty, kind)
        }
        Rvalue::Aggregate(kind, elements) => {
            let rendered: Vec<String> = elements.iter().map(render_operand).collect();
            format!("{:?}[{}]", kind, rendered.join(", "))
        }
        Rvalue::GetElement {
            array,
            index,
            is_field,
        } => format!(
            "{}[{}]{}",
            render_operand(array),
            render_operand(index),
            if *is_field { " (field)" } else { "" }
        ),
        Rvalue::Ref(place) => format!("&{}", place),
        Rvalue::AddressOf(place) => format!("&raw {}", place),
        Rvalue::Len(place) => format!("len({})", place),
        Rvalue::Discriminant(place) => format!("discriminant({})", place),
    }
}

fn render_statement(stmt: &Statement) -> String {
    match stmt {
        Statement::Assign(place, rvalue) => format!("{} = {};", place, render_rvalue(rvalue)),
        Statement::StorageLive(place) => format!("StorageLive({});", place),
        Statement::StorageDead(place) => format!("StorageDead({});", place),
        Statement::Nop => "nop;".to_string(),
    }
}

fn render_terminator(term: &Terminator) -> String {
    match term {
        Terminator::Return => "return;".to_string(),
        Terminator::Goto { target } => format!("goto -> bb{};", target.0),
        Terminator::SwitchInt {
            discr,
            targets,
            otherwise,
        } => {
            let arms: Vec<String> = targets
                .iter()
                .map(|(v, b)| format!("{} -> bb{}", v, b.0))
                .collect();
            format!(
                "switchInt({}) [{}, otherwise -> bb{}];",
                render_operand(discr),
                arms.join(", "),
                otherwise.0
            )
        }
        Terminator::Call {
            func,
            args,
            destination,
            target,
            ..
        } => {
            let rendered: Vec<String> = args.iter().map(render_operand).collect();
            format!(
                "{} = call {}({}) -> bb{};",
                destination,
                render_operand(func),
                rendered.join(", "),
                target.0
            )
        }
        Terminator::Assert { cond, target } => {
            format!("assert({}) -> bb{};", render_operand(cond), target.0)
        }
        Terminator::Drop { place, target } => format!("drop({}) -> bb{};", place, target.0),
        Terminator::Unreachable => "unreachable;".to_string(),
    }
}
