//! Arena-based abstract syntax tree.
//!
//! Nodes live in per-program arenas and reference each other through typed
//! ids (`ExprId`, `StmtId`, `PatId`, `TypeId`). Parents hold ids, never
//! owned children, so there is no ownership ambiguity and structural
//! comparison in tests is cheap. The node inventory covers the full
//! statement/expression/declaration surface of the source grammar, including
//! JSX and the TypeScript declaration forms that are parsed and discarded.

use novac_util::{define_idx, IndexVec, SourceLocation, Symbol};

define_idx!(ExprId);
define_idx!(StmtId);
define_idx!(PatId);
define_idx!(TypeId);

/// The node arenas for one parsed program.
#[derive(Debug, Default)]
pub struct Ast {
    pub exprs: IndexVec<ExprId, Expr>,
    pub stmts: IndexVec<StmtId, Stmt>,
    pub pats: IndexVec<PatId, Pattern>,
    pub types: IndexVec<TypeId, TypeAnn>,
}

impl Ast {
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }

    pub fn pat(&self, id: PatId) -> &Pattern {
        &self.pats[id]
    }

    pub fn ty(&self, id: TypeId) -> &TypeAnn {
        &self.types[id]
    }
}

/// A parsed program: the arenas plus the top-level statement list.
#[derive(Debug, Default)]
pub struct Program {
    pub ast: Ast,
    pub body: Vec<StmtId>,
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Binary operators, including the comparison and logical forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,
    Nullish,
    In,
    Instanceof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
    Await,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

/// Assignment operators. `Assign` is plain `=`; the rest are the compound
/// forms that read-modify-write their target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,
    Nullish,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum Expr {
    Number(f64),
    /// Cooked string value (escapes processed).
    String(Symbol),
    /// Raw `/pattern/flags` text.
    Regex(Symbol),
    Bool(bool),
    Null,
    Undefined,
    Ident(Symbol),
    This,
    Super,

    /// Quasi strings alternate with interpolated expressions:
    /// `quasis.len() == exprs.len() + 1`.
    Template {
        quasis: Vec<Symbol>,
        exprs: Vec<ExprId>,
    },
    TaggedTemplate {
        tag: ExprId,
        quasi: ExprId,
    },

    /// Holes (`[a, , b]`) are `None`.
    Array(Vec<Option<ExprId>>),
    Object(Vec<ObjectProp>),

    Function(Function),
    Arrow {
        params: Vec<Param>,
        body: ArrowBody,
        is_async: bool,
    },
    Class(Box<ClassDef>),

    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        operand: ExprId,
    },
    Binary {
        op: BinOp,
        left: ExprId,
        right: ExprId,
    },
    Assignment {
        op: AssignOp,
        target: ExprId,
        value: ExprId,
    },
    Conditional {
        test: ExprId,
        consequent: ExprId,
        alternate: ExprId,
    },
    Call {
        callee: ExprId,
        args: Vec<ExprId>,
        optional: bool,
    },
    New {
        callee: ExprId,
        args: Vec<ExprId>,
    },
    /// `object.property` or `object?.property`.
    Member {
        object: ExprId,
        property: Symbol,
        optional: bool,
    },
    /// `object[index]` or `object?.[index]`.
    Index {
        object: ExprId,
        index: ExprId,
        optional: bool,
    },
    Sequence(Vec<ExprId>),
    Spread(ExprId),
    Paren(ExprId),

    /// `expr as T` (the annotation is parse-and-discard past HIR).
    As {
        expr: ExprId,
        ty: TypeId,
    },
    Satisfies {
        expr: ExprId,
        ty: TypeId,
    },
    /// `expr!`
    NonNull(ExprId),

    Yield {
        argument: Option<ExprId>,
        delegate: bool,
    },
    /// `new.target` / `import.meta`.
    MetaProperty {
        object: Symbol,
        property: Symbol,
    },
    /// `import(specifier)`.
    ImportCall(ExprId),

    JsxElement(JsxElement),
    JsxFragment(Vec<JsxChild>),

    /// Placeholder produced by error recovery.
    Invalid,
}

#[derive(Debug)]
pub enum ObjectProp {
    KeyValue { key: PropKey, value: ExprId },
    Shorthand(Symbol),
    Method { key: PropKey, func: Function },
    Spread(ExprId),
}

#[derive(Debug)]
pub enum PropKey {
    Ident(Symbol),
    String(Symbol),
    Number(f64),
    Computed(ExprId),
}

#[derive(Debug)]
pub enum ArrowBody {
    Expr(ExprId),
    Block(Vec<StmtId>),
}

/// A function declaration or expression body.
#[derive(Debug)]
pub struct Function {
    pub name: Option<Symbol>,
    pub params: Vec<Param>,
    pub return_ty: Option<TypeId>,
    pub body: Vec<StmtId>,
    pub is_async: bool,
    pub is_generator: bool,
    pub location: SourceLocation,
}

#[derive(Debug)]
pub struct Param {
    pub pattern: PatId,
    pub ty: Option<TypeId>,
    pub default: Option<ExprId>,
    pub rest: bool,
}

// ---------------------------------------------------------------------------
// JSX
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct JsxElement {
    pub name: Symbol,
    pub attrs: Vec<JsxAttr>,
    pub children: Vec<JsxChild>,
    pub self_closing: bool,
}

#[derive(Debug)]
pub enum JsxAttr {
    Named {
        name: Symbol,
        value: Option<JsxAttrValue>,
    },
    Spread(ExprId),
}

#[derive(Debug)]
pub enum JsxAttrValue {
    String(Symbol),
    Expr(ExprId),
}

#[derive(Debug)]
pub enum JsxChild {
    /// Raw source text, whitespace preserved verbatim.
    Text(Symbol),
    /// `{expr}` container.
    Expr(ExprId),
    /// Nested element or fragment (an `Expr::JsxElement`/`JsxFragment` id).
    Element(ExprId),
}

// ---------------------------------------------------------------------------
// Statements and declarations
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
    /// `using` declarations parse like `const`.
    Using,
}

#[derive(Debug)]
pub struct Declarator {
    pub pattern: PatId,
    pub ty: Option<TypeId>,
    pub init: Option<ExprId>,
}

#[derive(Debug)]
pub struct SwitchCase {
    /// `None` for the `default` case.
    pub test: Option<ExprId>,
    pub body: Vec<StmtId>,
}

#[derive(Debug)]
pub struct CatchClause {
    pub param: Option<PatId>,
    pub body: StmtId,
}

#[derive(Debug)]
pub enum Stmt {
    Expr(ExprId),
    VarDecl {
        kind: VarKind,
        declarators: Vec<Declarator>,
    },
    Block(Vec<StmtId>),
    If {
        test: ExprId,
        consequent: StmtId,
        alternate: Option<StmtId>,
    },
    While {
        test: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        test: ExprId,
    },
    For {
        init: Option<StmtId>,
        test: Option<ExprId>,
        update: Option<ExprId>,
        body: StmtId,
    },
    ForIn {
        decl_kind: Option<VarKind>,
        pattern: PatId,
        object: ExprId,
        body: StmtId,
    },
    ForOf {
        decl_kind: Option<VarKind>,
        pattern: PatId,
        iterable: ExprId,
        body: StmtId,
    },
    Switch {
        discriminant: ExprId,
        cases: Vec<SwitchCase>,
    },
    Try {
        block: StmtId,
        handler: Option<CatchClause>,
        finalizer: Option<StmtId>,
    },
    Throw(ExprId),
    Return(Option<ExprId>),
    Break(Option<Symbol>),
    Continue(Option<Symbol>),
    Labeled {
        label: Symbol,
        body: StmtId,
    },
    Debugger,
    With {
        object: ExprId,
        body: StmtId,
    },
    Empty,

    FunctionDecl(Function),
    ClassDecl(Box<ClassDef>),
    /// Interfaces carry type information only; the body is discarded.
    InterfaceDecl {
        name: Symbol,
    },
    TypeAliasDecl {
        name: Symbol,
        ty: TypeId,
    },
    EnumDecl {
        name: Symbol,
        is_const: bool,
        members: Vec<EnumMember>,
    },
    ImportDecl {
        specifiers: Vec<ImportSpecifier>,
        source: Symbol,
    },
    ExportDecl(ExportKind),

    /// Placeholder produced by error recovery.
    Invalid,
}

#[derive(Debug)]
pub struct EnumMember {
    pub name: Symbol,
    pub init: Option<ExprId>,
}

#[derive(Debug)]
pub enum ImportSpecifier {
    /// `import name from "..."`.
    Default(Symbol),
    /// `import * as ns from "..."`.
    Namespace(Symbol),
    /// `import { imported as local } from "..."`.
    Named { imported: Symbol, local: Symbol },
}

#[derive(Debug)]
pub enum ExportKind {
    /// `export <declaration>`.
    Decl(StmtId),
    /// `export default <expression>`.
    Default(ExprId),
    /// `export { a, b as c } [from "..."]`.
    Named {
        specifiers: Vec<(Symbol, Symbol)>,
        source: Option<Symbol>,
    },
    /// `export * [as ns] from "..."`.
    All {
        source: Symbol,
        alias: Option<Symbol>,
    },
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accessibility {
    Public,
    Private,
    Protected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberKind {
    Constructor,
    Method,
    Getter,
    Setter,
    Field,
}

#[derive(Debug)]
pub struct ClassDef {
    pub name: Option<Symbol>,
    pub superclass: Option<ExprId>,
    pub implements: Vec<Symbol>,
    pub is_abstract: bool,
    pub decorators: Vec<ExprId>,
    pub members: Vec<ClassMember>,
}

#[derive(Debug)]
pub struct ClassMember {
    pub kind: MemberKind,
    pub key: PropKey,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_readonly: bool,
    pub is_override: bool,
    /// `#name` private members.
    pub is_private_name: bool,
    pub accessibility: Option<Accessibility>,
    pub decorators: Vec<ExprId>,
    /// Present for constructors, methods, and accessors.
    pub func: Option<Function>,
    /// Present for fields with initializers.
    pub value: Option<ExprId>,
    pub ty: Option<TypeId>,
}

// ---------------------------------------------------------------------------
// Patterns and type annotations
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum Pattern {
    Ident(Symbol),
    Object {
        props: Vec<ObjectPatternProp>,
        rest: Option<PatId>,
    },
    Array {
        /// Holes are `None`.
        elements: Vec<Option<PatId>>,
        rest: Option<PatId>,
    },
    /// Pattern with a default value.
    Assign {
        pattern: PatId,
        default: ExprId,
    },
    Invalid,
}

#[derive(Debug)]
pub struct ObjectPatternProp {
    pub key: Symbol,
    /// `None` means shorthand (`{ a }` binds `a`).
    pub value: Option<PatId>,
    pub default: Option<ExprId>,
}

/// The collapsed type-annotation kinds.
///
/// The compiler is not a type checker: unions, intersections, generics,
/// tuples, literal types, and every other composite form are parsed
/// defensively and recorded as `Any`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeAnn {
    Void,
    Any,
    Unknown,
    Never,
    Number,
    String,
    Boolean,
    Null,
    Undefined,
    Object,
}
