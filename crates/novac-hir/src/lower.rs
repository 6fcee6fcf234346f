//! AST to HIR lowering.
//!
//! Every AST visit from the classical visitor design becomes an exhaustive
//! match here. Unsupported nodes lower to opaque null constants or no-ops
//! with a diagnostic, so the pipeline stays total on partial input.
//!
//! Top-level statements are wrapped into a synthetic `main` function;
//! function declarations anywhere become module functions. Inner functions
//! are queued and lowered after their enclosing function so closure capture
//! analysis can read the enclosing symbol table.

use std::collections::VecDeque;

use novac_par::ast::{
    ArrowBody, AssignOp, BinOp, Expr, ExprId, Function, MemberKind, ObjectProp, Pattern, Program,
    PropKey, Stmt, StmtId, UnaryOp, UpdateOp,
};
use novac_par::ast::PatId;
use novac_util::{Diagnostic, FxHashMap, FxHashSet, Handler, SourceLocation, Symbol};

use crate::builder::HirBuilder;
use crate::hir::{
    HirFunction, HirModule, HirStruct, HirType, HirValue, Linkage, Opcode, ValueId,
};

/// Generate HIR from a parsed program. Returns the module and the lowering
/// diagnostics (warnings for unsupported constructs, unresolved names).
pub fn generate_hir(program: &Program, module_name: &str) -> (HirModule, Vec<Diagnostic>) {
    let mut generator = HirGenerator {
        program,
        module: HirModule::new(Symbol::intern(module_name)),
        handler: Handler::new(),
        pending: VecDeque::new(),
        known_functions: FxHashSet::default(),
        class_fields: FxHashMap::default(),
        next_anon: 0,
    };
    generator.run();
    let diagnostics = generator.handler.take();
    (generator.module, diagnostics)
}

enum PendingBody {
    Stmts(Vec<StmtId>),
    Expr(ExprId),
}

struct PendingFunction {
    name: Symbol,
    params: Vec<Symbol>,
    body: PendingBody,
    is_async: bool,
    is_generator: bool,
    /// Captured variable names; non-empty marks this as a closure with an
    /// appended `__env` parameter.
    captured: Vec<Symbol>,
    /// Set for class methods: the class whose fields `this.x` resolves in.
    this_class: Option<Symbol>,
    /// The synthetic `main`: its locals are globals, so inner functions do
    /// not capture them.
    is_top_level: bool,
}

struct HirGenerator<'p> {
    program: &'p Program,
    module: HirModule,
    handler: Handler,
    pending: VecDeque<PendingFunction>,
    known_functions: FxHashSet<Symbol>,
    class_fields: FxHashMap<Symbol, Vec<Symbol>>,
    next_anon: u32,
}

impl<'p> HirGenerator<'p> {
    fn run(&mut self) {
        self.collect_function_names();

        self.pending.push_back(PendingFunction {
            name: Symbol::intern("main"),
            params: Vec::new(),
            body: PendingBody::Stmts(self.program.body.clone()),
            is_async: false,
            is_generator: false,
            captured: Vec::new(),
            this_class: None,
            is_top_level: true,
        });

        while let Some(pending) = self.pending.pop_front() {
            self.lower_function(pending);
        }
    }

    /// Hoisting pre-pass: every function declaration name in the program is
    /// callable by name regardless of statement order.
    fn collect_function_names(&mut self) {
        for stmt in self.program.ast.stmts.iter() {
            if let Stmt::FunctionDecl(func) = stmt {
                if let Some(name) = func.name {
                    self.known_functions.insert(name);
                }
            }
        }
    }

    fn anon_name(&mut self, base: &str) -> Symbol {
        let n = self.next_anon;
        self.next_anon += 1;
        Symbol::intern(&format!("{}.{}", base, n))
    }

    fn warn(&self, message: impl Into<String>) {
        self.handler.warning(message, SourceLocation::dummy());
    }

    fn lower_function(&mut self, pending: PendingFunction) {
        let mut func = HirFunction {
            name: pending.name,
            params: Vec::new(),
            return_ty: HirType::Any,
            blocks: Default::default(),
            values: Default::default(),
            linkage: Linkage::Public,
            is_async: pending.is_async,
            is_generator: pending.is_generator,
            attributes: Vec::new(),
        };

        let mut index = 0u32;
        for &name in &pending.params {
            let id = func.values.push(HirValue::Param {
                index,
                name,
                ty: HirType::Any,
            });
            func.params.push(id);
            index += 1;
        }
        if !pending.captured.is_empty() {
            let env_struct = Symbol::intern(&format!("{}_env", pending.name));
            let id = func.values.push(HirValue::Param {
                index,
                name: Symbol::intern("__env"),
                ty: HirType::Pointer(Box::new(HirType::Struct(env_struct))),
            });
            func.params.push(id);
        }

        {
            let builder = HirBuilder::new(&mut func);
            let mut cx = Cx {
                gen: self,
                builder,
                scopes: vec![FxHashMap::default()],
                current_fn: pending.name,
                current_class: pending.this_class,
                inner_closures: FxHashSet::default(),
                pending_label: None,
                is_top_level: pending.is_top_level,
            };

            for (i, &name) in pending.params.iter().enumerate() {
                let id = cx.builder.func.params[i];
                cx.bind(name, id);
            }

            // Closure entry: one alloca per captured variable, named exactly
            // after it. MIR's Copy-In pass locates these by name and remaps
            // them to environment loads.
            let captured = pending.captured.clone();
            for var in captured {
                let alloca = cx.builder.create_alloca_exact(HirType::I64, var);
                cx.bind(var, alloca);
            }

            match &pending.body {
                PendingBody::Stmts(stmts) => {
                    for &stmt in stmts {
                        cx.lower_stmt(stmt);
                    }
                }
                PendingBody::Expr(expr) => {
                    let value = cx.lower_expr(*expr);
                    cx.maybe_record_returned_closure(value);
                    cx.builder.create_return(Some(value));
                }
            }
        }

        self.finalize(&mut func);
        self.module.functions.push(func);
    }

    /// Well-formedness pass: any block whose last instruction neither
    /// terminates nor is a break/continue receives a synthetic return-zero.
    /// This covers function ends and `if.end` blocks orphaned by arms that
    /// all return.
    fn finalize(&mut self, func: &mut HirFunction) {
        let mut open = Vec::new();
        for (id, block) in func.blocks.iter_enumerated() {
            let needs = match block.insts.last() {
                None => true,
                Some(&last) => match func.inst(last) {
                    Some(inst) => !inst.opcode.ends_arm(),
                    None => true,
                },
            };
            if needs {
                open.push(id);
            }
        }
        if open.is_empty() {
            return;
        }
        let mut builder = HirBuilder::new(func);
        for block in open {
            builder.set_insert_point(block);
            let zero = builder.const_int(0);
            builder.create_return(Some(zero));
        }
    }
}

/// Per-function lowering context: the builder over the function under
/// construction plus the scope stack.
struct Cx<'a, 'p, 'f> {
    gen: &'a mut HirGenerator<'p>,
    builder: HirBuilder<'f>,
    scopes: Vec<FxHashMap<Symbol, ValueId>>,
    current_fn: Symbol,
    current_class: Option<Symbol>,
    /// Inner closures declared while lowering this function; used by the
    /// Return special case.
    inner_closures: FxHashSet<Symbol>,
    /// Label from an enclosing labeled statement, consumed by the next
    /// loop header.
    pending_label: Option<Symbol>,
    is_top_level: bool,
}

impl<'a, 'p, 'f> Cx<'a, 'p, 'f> {
    fn ast(&self) -> &'p novac_par::Ast {
        &self.gen.program.ast
    }

    fn bind(&mut self, name: Symbol, value: ValueId) {
        self.scopes.last_mut().unwrap().insert(name, value);
    }

    fn lookup(&self, name: Symbol) -> Option<ValueId> {
        for scope in self.scopes.iter().rev() {
            if let Some(&value) = scope.get(&name) {
                return Some(value);
            }
        }
        None
    }

    fn take_label(&mut self) -> Option<Symbol> {
        self.pending_label.take()
    }

    // =======================================================================
    // Statements
    // =======================================================================

    fn lower_stmt(&mut self, id: StmtId) {
        match self.ast().stmt(id) {
            Stmt::Expr(expr) => {
                self.lower_expr(*expr);
            }
            Stmt::VarDecl { declarators, .. } => {
                for decl in declarators {
                    self.lower_declarator(decl.pattern, decl.init);
                }
            }
            Stmt::Block(stmts) => {
                self.scopes.push(FxHashMap::default());
                for &stmt in stmts {
                    self.lower_stmt(stmt);
                }
                self.scopes.pop();
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => self.lower_if(*test, *consequent, *alternate),
            Stmt::While { test, body } => self.lower_while(*test, *body),
            Stmt::DoWhile { body, test } => self.lower_do_while(*body, *test),
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.lower_for(*init, *test, *update, *body),
            Stmt::ForOf {
                pattern,
                iterable,
                body,
                ..
            } => self.lower_for_of(*pattern, *iterable, *body),
            Stmt::ForIn { object, .. } => {
                self.gen.warn("for-in statement is not supported; skipped");
                self.lower_expr(*object);
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => self.lower_switch(*discriminant, cases),
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                if handler.is_some() {
                    self.gen
                        .warn("catch clause is not supported; exceptions do not unwind");
                }
                self.lower_stmt(*block);
                if let Some(finalizer) = finalizer {
                    self.lower_stmt(*finalizer);
                }
            }
            Stmt::Throw(argument) => {
                self.lower_expr(*argument);
                self.gen.warn("throw lowers to a no-op");
            }
            Stmt::Return(argument) => self.lower_return(*argument),
            Stmt::Break(label) => {
                self.builder.create_break(*label);
            }
            Stmt::Continue(label) => {
                self.builder.create_continue(*label);
            }
            Stmt::Labeled { label, body } => {
                let body = *body;
                if matches!(
                    self.ast().stmt(body),
                    Stmt::While { .. } | Stmt::DoWhile { .. } | Stmt::For { .. } | Stmt::ForOf { .. }
                ) {
                    self.pending_label = Some(*label);
                } else {
                    self.gen.warn("label on a non-loop statement is ignored");
                }
                self.lower_stmt(body);
            }
            Stmt::FunctionDecl(func) => {
                self.declare_function(func);
            }
            Stmt::ClassDecl(def) => self.lower_class(def),
            Stmt::InterfaceDecl { .. } | Stmt::TypeAliasDecl { .. } => {
                // Type information only.
            }
            Stmt::EnumDecl { name, .. } => {
                self.gen
                    .warn(format!("enum '{}' lowered as type information only", name));
            }
            Stmt::ImportDecl { .. } => {
                // Module wiring happens in the driver; nothing to lower.
            }
            Stmt::ExportDecl(kind) => match kind {
                novac_par::ast::ExportKind::Decl(inner) => self.lower_stmt(*inner),
                novac_par::ast::ExportKind::Default(expr) => {
                    self.lower_expr(*expr);
                }
                _ => {}
            },
            Stmt::Debugger | Stmt::Empty => {}
            Stmt::With { body, .. } => {
                self.gen.warn("with statement is not supported; scope object ignored");
                self.lower_stmt(*body);
            }
            Stmt::Invalid => {}
        }
    }

    fn lower_declarator(&mut self, pattern: PatId, init: Option<ExprId>) {
        match self.ast().pat(pattern) {
            Pattern::Ident(name) => {
                let name = *name;
                let alloca = self.builder.create_alloca(HirType::I64, name.as_str());
                self.bind(name, alloca);
                if let Some(init) = init {
                    let value = self.lower_expr(init);
                    self.builder.create_store(value, alloca);
                }
            }
            Pattern::Array { elements, rest } => {
                let elements = elements.clone();
                let rest = *rest;
                let source = match init {
                    Some(init) => self.lower_expr(init),
                    None => self.builder.const_undefined(),
                };
                for (i, element) in elements.iter().enumerate() {
                    if let Some(element) = element {
                        let index = self.builder.const_int(i as i64);
                        let value = self.builder.create_get_element(source, index);
                        self.bind_simple_pattern(*element, value);
                    }
                }
                if rest.is_some() {
                    self.gen.warn("rest element in array destructuring is not supported");
                }
            }
            Pattern::Object { props, rest } => {
                let keys: Vec<(Symbol, Option<PatId>)> =
                    props.iter().map(|p| (p.key, p.value)).collect();
                let has_rest = rest.is_some();
                let source = match init {
                    Some(init) => self.lower_expr(init),
                    None => self.builder.const_undefined(),
                };
                for (i, (key, value_pat)) in keys.iter().enumerate() {
                    let value = self.builder.create_get_field(source, i as i64);
                    match value_pat {
                        Some(pat) => self.bind_simple_pattern(*pat, value),
                        None => {
                            let alloca = self.builder.create_alloca(HirType::I64, key.as_str());
                            self.bind(*key, alloca);
                            self.builder.create_store(value, alloca);
                        }
                    }
                }
                if has_rest {
                    self.gen.warn("rest element in object destructuring is not supported");
                }
            }
            Pattern::Assign { pattern, .. } => {
                self.gen.warn("default value in destructuring is ignored");
                self.lower_declarator(*pattern, init);
            }
            Pattern::Invalid => {}
        }
    }

    /// Bind a leaf pattern to a freshly stored value.
    fn bind_simple_pattern(&mut self, pattern: PatId, value: ValueId) {
        match self.ast().pat(pattern) {
            Pattern::Ident(name) => {
                let name = *name;
                let alloca = self.builder.create_alloca(HirType::I64, name.as_str());
                self.bind(name, alloca);
                self.builder.create_store(value, alloca);
            }
            _ => {
                self.gen.warn("nested destructuring pattern is not supported");
            }
        }
    }

    fn lower_if(&mut self, test: ExprId, consequent: StmtId, alternate: Option<StmtId>) {
        let cond = self.lower_expr(test);

        let then_block = self.builder.create_block("if.then");
        let else_block = alternate.map(|_| self.builder.create_block("if.else"));
        let end_block = self.builder.create_block("if.end");

        match else_block {
            Some(else_block) => self.builder.create_cond_br(cond, then_block, else_block),
            None => self.builder.create_cond_br(cond, then_block, end_block),
        };

        self.builder.set_insert_point(then_block);
        self.lower_stmt(consequent);
        // Fall-through policy: branch to the end block only if the arm did
        // not already end in Return/Break/Continue.
        if self.builder.falls_through() {
            self.builder.create_br(end_block);
        }

        if let (Some(else_block), Some(alternate)) = (else_block, alternate) {
            self.builder.set_insert_point(else_block);
            self.lower_stmt(alternate);
            if self.builder.falls_through() {
                self.builder.create_br(end_block);
            }
        }

        self.builder.set_insert_point(end_block);
    }

    fn lower_while(&mut self, test: ExprId, body: StmtId) {
        let label = self.take_label();
        let cond_block = self.builder.create_block_labeled("while.cond", label);
        let body_block = self.builder.create_block("while.body");
        let end_block = self.builder.create_block("while.end");

        self.builder.create_br(cond_block);

        self.builder.set_insert_point(cond_block);
        let cond = self.lower_expr(test);
        self.builder.create_cond_br(cond, body_block, end_block);

        self.builder.set_insert_point(body_block);
        self.lower_stmt(body);
        if self.builder.falls_through() {
            self.builder.create_br(cond_block);
        }

        self.builder.set_insert_point(end_block);
    }

    fn lower_do_while(&mut self, body: StmtId, test: ExprId) {
        let label = self.take_label();
        let body_block = self.builder.create_block("do-while.body");
        // The condition is the loop header; labels live on header names.
        let cond_block = self.builder.create_block_labeled("do-while.cond", label);
        let end_block = self.builder.create_block("do-while.end");

        self.builder.create_br(body_block);

        self.builder.set_insert_point(body_block);
        self.lower_stmt(body);
        if self.builder.falls_through() {
            self.builder.create_br(cond_block);
        }

        self.builder.set_insert_point(cond_block);
        let cond = self.lower_expr(test);
        self.builder.create_cond_br(cond, body_block, end_block);

        self.builder.set_insert_point(end_block);
    }

    fn lower_for(
        &mut self,
        init: Option<StmtId>,
        test: Option<ExprId>,
        update: Option<ExprId>,
        body: StmtId,
    ) {
        let label = self.take_label();
        self.scopes.push(FxHashMap::default());

        let init_block = self.builder.create_block("for.init");
        let cond_block = self.builder.create_block_labeled("for.cond", label);
        let body_block = self.builder.create_block("for.body");
        let update_block = self.builder.create_block("for.update");
        let end_block = self.builder.create_block("for.end");

        self.builder.create_br(init_block);

        self.builder.set_insert_point(init_block);
        if let Some(init) = init {
            self.lower_stmt(init);
        }
        self.builder.create_br(cond_block);

        self.builder.set_insert_point(cond_block);
        match test {
            Some(test) => {
                let cond = self.lower_expr(test);
                self.builder.create_cond_br(cond, body_block, end_block);
            }
            None => {
                self.builder.create_br(body_block);
            }
        }

        self.builder.set_insert_point(body_block);
        self.lower_stmt(body);
        if self.builder.falls_through() {
            self.builder.create_br(update_block);
        }

        self.builder.set_insert_point(update_block);
        if let Some(update) = update {
            self.lower_expr(update);
        }
        self.builder.create_br(cond_block);

        self.builder.set_insert_point(end_block);
        self.scopes.pop();
    }

    /// `for (x of arr)` lowers to an index loop over the runtime array:
    /// the same block skeleton as a C-style for, so loop analysis and
    /// break/continue resolution treat it identically.
    fn lower_for_of(&mut self, pattern: PatId, iterable: ExprId, body: StmtId) {
        let label = self.take_label();
        self.scopes.push(FxHashMap::default());

        let array = self.lower_expr(iterable);
        let index_ptr = self.builder.create_alloca(HirType::I64, "for.of.idx");
        let zero = self.builder.const_int(0);
        self.builder.create_store(zero, index_ptr);

        let element_name = match self.ast().pat(pattern) {
            Pattern::Ident(name) => *name,
            _ => {
                self.gen
                    .warn("destructuring in for-of is not supported; element is unnamed");
                Symbol::intern("for.of.elem")
            }
        };
        let element_ptr = self
            .builder
            .create_alloca(HirType::I64, element_name.as_str());
        self.bind(element_name, element_ptr);

        let cond_block = self.builder.create_block_labeled("for.cond", label);
        let body_block = self.builder.create_block("for.body");
        let update_block = self.builder.create_block("for.update");
        let end_block = self.builder.create_block("for.end");

        self.builder.create_br(cond_block);

        self.builder.set_insert_point(cond_block);
        let index = self.builder.create_load(index_ptr);
        let length = self.builder.create_call(
            Symbol::intern("nova_value_array_length"),
            &[array],
            HirType::I64,
        );
        let cond = self.builder.create_cmp(Opcode::Lt, index, length);
        self.builder.create_cond_br(cond, body_block, end_block);

        self.builder.set_insert_point(body_block);
        let index = self.builder.create_load(index_ptr);
        let element = self.builder.create_get_element(array, index);
        self.builder.create_store(element, element_ptr);
        self.lower_stmt(body);
        if self.builder.falls_through() {
            self.builder.create_br(update_block);
        }

        self.builder.set_insert_point(update_block);
        let index = self.builder.create_load(index_ptr);
        let one = self.builder.const_int(1);
        let next = self.builder.create_binary(Opcode::Add, index, one);
        self.builder.create_store(next, index_ptr);
        self.builder.create_br(cond_block);

        self.builder.set_insert_point(end_block);
        self.scopes.pop();
    }

    /// Switch lowers to a comparison chain. Case bodies are named
    /// `switch.case_N` / `switch.default` and the exit `switch.end`; MIR
    /// switch-context recognition keys on these labels. Bodies fall through
    /// to the next body unless they break.
    fn lower_switch(&mut self, discriminant: ExprId, cases: &[novac_par::ast::SwitchCase]) {
        let discr = self.lower_expr(discriminant);
        self.scopes.push(FxHashMap::default());

        let mut body_blocks = Vec::with_capacity(cases.len());
        let mut default_index = None;
        for (i, case) in cases.iter().enumerate() {
            let block = if case.test.is_none() {
                default_index = Some(i);
                self.builder.create_block("switch.default")
            } else {
                self.builder.create_block(&format!("switch.case_{}", i))
            };
            body_blocks.push(block);
        }
        let end_block = self.builder.create_block("switch.end");

        // Comparison chain over the non-default cases, in source order.
        let tests: Vec<(usize, ExprId)> = cases
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.test.map(|t| (i, t)))
            .collect();
        let fallback = default_index.map(|i| body_blocks[i]).unwrap_or(end_block);

        for (chain_pos, (case_index, test)) in tests.iter().enumerate() {
            let case_value = self.lower_expr(*test);
            let cmp = self.builder.create_cmp(Opcode::Eq, discr, case_value);
            let next = if chain_pos + 1 < tests.len() {
                self.builder.create_block("case.else")
            } else {
                fallback
            };
            self.builder
                .create_cond_br(cmp, body_blocks[*case_index], next);
            if chain_pos + 1 < tests.len() {
                self.builder.set_insert_point(next);
            }
        }
        if tests.is_empty() {
            self.builder.create_br(fallback);
        }

        // Case bodies, with JS fall-through into the next body.
        for (i, case) in cases.iter().enumerate() {
            self.builder.set_insert_point(body_blocks[i]);
            for &stmt in &case.body {
                self.lower_stmt(stmt);
            }
            if self.builder.falls_through() {
                let next = body_blocks.get(i + 1).copied().unwrap_or(end_block);
                self.builder.create_br(next);
            }
        }

        self.builder.set_insert_point(end_block);
        self.scopes.pop();
    }

    fn lower_return(&mut self, argument: Option<ExprId>) {
        match argument {
            None => {
                self.builder.create_return(None);
            }
            Some(argument) => {
                let value = self.lower_expr(argument);
                self.maybe_record_returned_closure(value);
                self.builder.create_return(Some(value));
            }
        }
    }

    /// The closure-return special case: returning a value that is a string
    /// constant naming an inner closure records `closure_returned_by` so MIR
    /// generation substitutes environment allocation for the string return.
    fn maybe_record_returned_closure(&mut self, value: ValueId) {
        if let Some(name) = self.builder.func.value(value).as_str_const() {
            if self.inner_closures.contains(&name)
                && self.gen.module.closure_environments.contains_key(&name)
            {
                self.gen
                    .module
                    .closure_returned_by
                    .insert(self.current_fn, name);
            }
        }
    }

    // =======================================================================
    // Inner functions and closures
    // =======================================================================

    /// Register a function declaration encountered while lowering. Returns
    /// the (possibly synthesized) function name. The function itself is
    /// queued and lowered after the current one.
    fn declare_function(&mut self, func: &Function) -> Symbol {
        let name = func
            .name
            .unwrap_or_else(|| self.gen.anon_name("lambda"));
        let params = self.flatten_params(&func.params);
        self.declare_inner(
            name,
            params,
            PendingBody::Stmts(func.body.clone()),
            func.is_async,
            func.is_generator,
            None,
        );
        name
    }

    fn flatten_params(&mut self, params: &[novac_par::ast::Param]) -> Vec<Symbol> {
        let mut names = Vec::with_capacity(params.len());
        for (i, param) in params.iter().enumerate() {
            if param.default.is_some() {
                self.gen.warn("parameter default values are ignored");
            }
            match self.ast().pat(param.pattern) {
                Pattern::Ident(name) => names.push(*name),
                _ => {
                    self.gen
                        .warn("destructuring parameters are not supported");
                    names.push(Symbol::intern(&format!("param{}", i)));
                }
            }
        }
        names
    }

    /// Closure analysis and queueing shared by function declarations,
    /// function expressions, and arrows.
    fn declare_inner(
        &mut self,
        name: Symbol,
        params: Vec<Symbol>,
        body: PendingBody,
        is_async: bool,
        is_generator: bool,
        this_class: Option<Symbol>,
    ) {
        let free = match &body {
            PendingBody::Stmts(stmts) => free_variables(self.gen.program, &params, stmts, None),
            PendingBody::Expr(expr) => free_variables(self.gen.program, &params, &[], Some(*expr)),
        };

        // A free variable is captured when it is bound in the enclosing
        // function's scope chain. The synthetic top level does not produce
        // captures; its locals act as globals.
        let captured: Vec<Symbol> = if self.is_top_level {
            Vec::new()
        } else {
            free.into_iter()
                .filter(|&n| self.lookup(n).is_some())
                .collect()
        };

        if !captured.is_empty() {
            let env_name = Symbol::intern(&format!("{}_env", name));
            // Fields are typed from the declaring alloca's pointee, which is
            // I64 throughout.
            let fields: Vec<(Symbol, HirType)> =
                captured.iter().map(|&v| (v, HirType::I64)).collect();
            let env = HirStruct {
                name: env_name,
                fields,
            };
            self.gen.module.structs.insert(env_name, env.clone());
            self.gen.module.closure_environments.insert(name, env);
            let values: Vec<ValueId> = captured
                .iter()
                .map(|&v| self.lookup(v).expect("captured variable must be in scope"))
                .collect();
            self.gen
                .module
                .closure_captured_vars
                .insert(name, captured.clone());
            self.gen
                .module
                .closure_captured_values
                .insert(name, values);
            self.inner_closures.insert(name);
        }

        self.gen.known_functions.insert(name);
        self.gen.pending.push_back(PendingFunction {
            name,
            params,
            body,
            is_async,
            is_generator,
            captured,
            this_class,
            is_top_level: false,
        });
    }

    fn lower_class(&mut self, def: &novac_par::ast::ClassDef) {
        let class_name = def.name.unwrap_or_else(|| self.gen.anon_name("class"));

        let mut fields = Vec::new();
        for member in &def.members {
            if member.kind == MemberKind::Field {
                if let PropKey::Ident(name) = member.key {
                    fields.push((name, HirType::I64));
                }
            }
        }
        let field_names: Vec<Symbol> = fields.iter().map(|(n, _)| *n).collect();
        self.gen.class_fields.insert(class_name, field_names);
        self.gen.module.structs.insert(
            class_name,
            HirStruct {
                name: class_name,
                fields,
            },
        );

        // Methods lower as free functions named Class_method with an
        // explicit `this` first parameter.
        for member in &def.members {
            let Some(func) = &member.func else { continue };
            let method_name = match member.key {
                PropKey::Ident(name) => name,
                _ => {
                    self.gen.warn("computed class member names are not supported");
                    continue;
                }
            };
            let qualified = Symbol::intern(&format!("{}_{}", class_name, method_name));
            let mut params = vec![Symbol::intern("this")];
            params.extend(self.flatten_params(&func.params));
            self.declare_inner(
                qualified,
                params,
                PendingBody::Stmts(func.body.clone()),
                func.is_async,
                func.is_generator,
                Some(class_name),
            );
        }
    }

    // =======================================================================
    // Expressions
    // =======================================================================

    /// Lower an expression; the returned value is the expression's result.
    fn lower_expr(&mut self, id: ExprId) -> ValueId {
        match self.ast().expr(id) {
            Expr::Number(value) => {
                let value = *value;
                // Integral literals become integer constants, others floats.
                if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                    self.builder.const_int(value as i64)
                } else {
                    self.builder.const_float(value)
                }
            }
            Expr::String(value) => self.builder.const_str(*value),
            Expr::Bool(value) => self.builder.const_bool(*value),
            Expr::Null => self.builder.const_null(HirType::Any),
            Expr::Undefined => self.builder.const_undefined(),
            Expr::Ident(name) => self.lower_ident(*name),
            Expr::This => match self.lookup(Symbol::intern("this")) {
                Some(value) => value,
                None => {
                    self.gen.warn("'this' outside a method lowers to null");
                    self.builder.const_null(HirType::Any)
                }
            },
            Expr::Template { quasis, exprs } => self.lower_template(quasis.clone(), exprs.clone()),
            Expr::Binary { op, left, right } => self.lower_binary(*op, *left, *right),
            Expr::Unary { op, operand } => self.lower_unary(*op, *operand),
            Expr::Update {
                op,
                prefix,
                operand,
            } => self.lower_update(*op, *prefix, *operand),
            Expr::Assignment { op, target, value } => self.lower_assignment(*op, *target, *value),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => self.lower_conditional(*test, *consequent, *alternate),
            Expr::Call { callee, args, .. } => self.lower_call(*callee, args.clone()),
            Expr::Member {
                object, property, ..
            } => self.lower_member_read(*object, *property),
            Expr::Index { object, index, .. } => {
                let object = self.lower_expr(*object);
                let index = self.lower_expr(*index);
                self.builder.create_get_element(object, index)
            }
            Expr::Array(elements) => {
                let elements = elements.clone();
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        Some(e) => values.push(self.lower_expr(e)),
                        None => values.push(self.builder.const_undefined()),
                    }
                }
                self.builder
                    .create_aggregate(HirType::Array(Box::new(HirType::Any)), values)
            }
            Expr::Object(props) => self.lower_object_literal(props),
            Expr::Function(func) => {
                let name = func
                    .name
                    .unwrap_or_else(|| self.gen.anon_name("lambda"));
                let params = self.flatten_params(&func.params);
                self.declare_inner(
                    name,
                    params,
                    PendingBody::Stmts(func.body.clone()),
                    func.is_async,
                    func.is_generator,
                    None,
                );
                self.builder.const_str(name)
            }
            Expr::Arrow {
                params,
                body,
                is_async,
            } => {
                let name = self.gen.anon_name("arrow");
                let is_async = *is_async;
                let flat = self.flatten_params(params);
                let pending_body = match body {
                    ArrowBody::Block(stmts) => PendingBody::Stmts(stmts.clone()),
                    ArrowBody::Expr(expr) => PendingBody::Expr(*expr),
                };
                self.declare_inner(name, flat, pending_body, is_async, false, None);
                self.builder.const_str(name)
            }
            Expr::Sequence(exprs) => {
                let exprs = exprs.clone();
                let mut last = self.builder.const_undefined();
                for expr in exprs {
                    last = self.lower_expr(expr);
                }
                last
            }
            Expr::Paren(inner) => self.lower_expr(*inner),
            Expr::As { expr, .. } | Expr::Satisfies { expr, .. } | Expr::NonNull(expr) => {
                self.lower_expr(*expr)
            }
            Expr::Yield { argument, .. } => match argument {
                Some(argument) => self.lower_expr(*argument),
                None => self.builder.const_undefined(),
            },
            Expr::Class(def) => {
                self.lower_class(def);
                let name = def.name.unwrap_or_else(|| Symbol::intern("class"));
                self.builder.const_str(name)
            }
            Expr::TaggedTemplate { quasi, .. } => {
                self.gen.warn("tagged templates lower as plain templates");
                self.lower_expr(*quasi)
            }
            // Unsupported expressions lower to opaque null constants so the
            // pipeline stays total.
            Expr::JsxElement(_) | Expr::JsxFragment(_) => {
                self.gen.warn("JSX lowers to an opaque null constant");
                self.builder.const_null(HirType::Any)
            }
            Expr::Regex(_) => {
                self.gen.warn("regex literals lower to an opaque null constant");
                self.builder.const_null(HirType::Any)
            }
            Expr::New { callee, args } => {
                let args = args.clone();
                for arg in &args {
                    self.lower_expr(*arg);
                }
                let _ = callee;
                self.gen.warn("new expressions lower to an opaque null constant");
                self.builder.const_null(HirType::Any)
            }
            Expr::Super => {
                self.gen.warn("'super' lowers to an opaque null constant");
                self.builder.const_null(HirType::Any)
            }
            Expr::Spread(inner) => {
                self.gen.warn("spread outside a literal is not supported");
                self.lower_expr(*inner)
            }
            Expr::MetaProperty { .. } | Expr::ImportCall(_) => {
                self.gen.warn("meta/import expressions lower to null");
                self.builder.const_null(HirType::Any)
            }
            Expr::Invalid => self.builder.const_null(HirType::Any),
        }
    }

    fn lower_ident(&mut self, name: Symbol) -> ValueId {
        if let Some(value) = self.lookup(name) {
            // Alloca-backed locals load their current value; parameters are
            // used directly.
            if self.builder.func.value(value).ty().is_pointer() {
                return self.builder.create_load(value);
            }
            return value;
        }
        if self.gen.known_functions.contains(&name) {
            return self.builder.const_str(name);
        }
        self.gen
            .warn(format!("unresolved identifier '{}'", name));
        self.builder.const_null(HirType::Any)
    }

    fn lower_template(&mut self, quasis: Vec<Symbol>, exprs: Vec<ExprId>) -> ValueId {
        if exprs.is_empty() {
            let text = quasis.first().copied().unwrap_or_else(|| Symbol::intern(""));
            return self.builder.const_str(text);
        }
        let concat = Symbol::intern("nova_string_concat");
        let mut acc = self.builder.const_str(quasis[0]);
        for (i, expr) in exprs.iter().enumerate() {
            let value = self.lower_expr(*expr);
            acc = self
                .builder
                .create_call(concat, &[acc, value], HirType::String);
            let quasi = quasis[i + 1];
            if !quasi.as_str().is_empty() {
                let text = self.builder.const_str(quasi);
                acc = self
                    .builder
                    .create_call(concat, &[acc, text], HirType::String);
            }
        }
        acc
    }

    fn lower_binary(&mut self, op: BinOp, left: ExprId, right: ExprId) -> ValueId {
        let lhs = self.lower_expr(left);
        let rhs = self.lower_expr(right);
        let opcode = match op {
            BinOp::Add => Opcode::Add,
            BinOp::Sub => Opcode::Sub,
            BinOp::Mul => Opcode::Mul,
            BinOp::Div => Opcode::Div,
            BinOp::Rem => Opcode::Rem,
            BinOp::Shl => Opcode::Shl,
            BinOp::Shr => Opcode::Shr,
            BinOp::UShr => Opcode::UShr,
            BinOp::BitAnd => Opcode::And,
            BinOp::BitOr => Opcode::Or,
            BinOp::BitXor => Opcode::Xor,
            // Logical operators lower to their bitwise counterparts on the
            // already-evaluated operands; no short-circuit blocks.
            BinOp::LogicalAnd => Opcode::And,
            BinOp::LogicalOr | BinOp::Nullish => Opcode::Or,
            BinOp::Eq | BinOp::StrictEq => {
                return self.builder.create_cmp(Opcode::Eq, lhs, rhs)
            }
            BinOp::Ne | BinOp::StrictNe => {
                return self.builder.create_cmp(Opcode::Ne, lhs, rhs)
            }
            BinOp::Lt => return self.builder.create_cmp(Opcode::Lt, lhs, rhs),
            BinOp::Le => return self.builder.create_cmp(Opcode::Le, lhs, rhs),
            BinOp::Gt => return self.builder.create_cmp(Opcode::Gt, lhs, rhs),
            BinOp::Ge => return self.builder.create_cmp(Opcode::Ge, lhs, rhs),
            BinOp::Exp => {
                return self.builder.create_call(
                    Symbol::intern("nova_math_pow"),
                    &[lhs, rhs],
                    HirType::F64,
                )
            }
            BinOp::In | BinOp::Instanceof => {
                self.gen
                    .warn("'in'/'instanceof' lower to an opaque null constant");
                return self.builder.const_null(HirType::Any);
            }
        };
        self.builder.create_binary(opcode, lhs, rhs)
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: ExprId) -> ValueId {
        match op {
            UnaryOp::Minus => {
                let value = self.lower_expr(operand);
                self.builder.create_neg(value)
            }
            UnaryOp::Plus => self.lower_expr(operand),
            UnaryOp::Not => {
                let value = self.lower_expr(operand);
                let false_const = self.builder.const_bool(false);
                self.builder.create_cmp(Opcode::Eq, value, false_const)
            }
            UnaryOp::BitNot => {
                let value = self.lower_expr(operand);
                self.builder.create_not(value)
            }
            UnaryOp::Typeof => self.lower_typeof(operand),
            UnaryOp::Void => {
                self.lower_expr(operand);
                self.builder.const_undefined()
            }
            UnaryOp::Delete => {
                self.gen.warn("'delete' lowers to a constant true");
                self.lower_expr(operand);
                self.builder.const_bool(true)
            }
            UnaryOp::Await => self.lower_expr(operand),
        }
    }

    /// `typeof x` for an undeclared `x` yields "undefined" without a
    /// diagnostic (JavaScript semantics). Resolved operands map to a static
    /// type name.
    fn lower_typeof(&mut self, operand: ExprId) -> ValueId {
        if let Expr::Ident(name) = self.ast().expr(operand) {
            let name = *name;
            if self.lookup(name).is_none() && !self.gen.known_functions.contains(&name) {
                return self.builder.const_str(Symbol::intern("undefined"));
            }
        }
        let value = self.lower_expr(operand);
        let text = match self.builder.func.value(value).ty() {
            HirType::Bool => "boolean",
            HirType::String => "string",
            t if t.is_numeric() => "number",
            HirType::Function { .. } => "function",
            HirType::Unknown => "undefined",
            _ => "object",
        };
        self.builder.const_str(Symbol::intern(text))
    }

    fn lower_update(&mut self, op: UpdateOp, prefix: bool, operand: ExprId) -> ValueId {
        let Expr::Ident(name) = self.ast().expr(operand) else {
            self.gen
                .warn("update target must be a simple identifier");
            return self.lower_expr(operand);
        };
        let name = *name;
        let Some(ptr) = self.lookup(name).filter(|&v| {
            self.builder.func.value(v).ty().is_pointer()
        }) else {
            self.gen
                .warn(format!("unresolved update target '{}'", name));
            return self.builder.const_null(HirType::Any);
        };

        let old = self.builder.create_load(ptr);
        let one = self.builder.const_int(1);
        let new = match op {
            UpdateOp::Increment => self.builder.create_binary(Opcode::Add, old, one),
            UpdateOp::Decrement => self.builder.create_binary(Opcode::Sub, old, one),
        };
        self.builder.create_store(new, ptr);
        if prefix {
            new
        } else {
            old
        }
    }

    fn lower_assignment(&mut self, op: AssignOp, target: ExprId, value: ExprId) -> ValueId {
        match self.ast().expr(target) {
            Expr::Ident(name) => {
                let name = *name;
                let Some(ptr) = self.lookup(name).filter(|&v| {
                    self.builder.func.value(v).ty().is_pointer()
                }) else {
                    self.gen
                        .warn(format!("assignment to unresolved identifier '{}'", name));
                    return self.lower_expr(value);
                };
                let rhs = self.lower_expr(value);
                let stored = match compound_opcode(op) {
                    None => rhs,
                    Some(opcode) => {
                        let old = self.builder.create_load(ptr);
                        self.builder.create_binary(opcode, old, rhs)
                    }
                };
                self.builder.create_store(stored, ptr);
                stored
            }
            Expr::Member {
                object, property, ..
            } => {
                let object = *object;
                let property = *property;
                let rhs = self.lower_expr(value);
                if op != AssignOp::Assign {
                    self.gen
                        .warn("compound assignment to a member is lowered as plain store");
                }
                self.lower_member_write(object, property, rhs);
                rhs
            }
            Expr::Index { object, index, .. } => {
                let object = *object;
                let index = *index;
                let base = self.lower_expr(object);
                let idx = self.lower_expr(index);
                let rhs = self.lower_expr(value);
                self.builder.create_set_element(base, idx, rhs);
                rhs
            }
            _ => {
                self.gen.warn("unsupported assignment target");
                self.lower_expr(value)
            }
        }
    }

    fn lower_conditional(&mut self, test: ExprId, consequent: ExprId, alternate: ExprId) -> ValueId {
        let result_ptr = self.builder.create_alloca(HirType::I64, "ternary");
        let cond = self.lower_expr(test);

        let then_block = self.builder.create_block("if.then");
        let else_block = self.builder.create_block("if.else");
        let end_block = self.builder.create_block("if.end");

        self.builder.create_cond_br(cond, then_block, else_block);

        self.builder.set_insert_point(then_block);
        let then_value = self.lower_expr(consequent);
        self.builder.create_store(then_value, result_ptr);
        self.builder.create_br(end_block);

        self.builder.set_insert_point(else_block);
        let else_value = self.lower_expr(alternate);
        self.builder.create_store(else_value, result_ptr);
        self.builder.create_br(end_block);

        self.builder.set_insert_point(end_block);
        self.builder.create_load(result_ptr)
    }

    fn lower_object_literal(&mut self, props: &[ObjectProp]) -> ValueId {
        let struct_name = self.gen.anon_name("obj");
        let mut fields = Vec::new();
        let mut values = Vec::new();

        // Collect (key, value expression) pairs first, then lower.
        let mut pairs: Vec<(Symbol, Option<ExprId>)> = Vec::new();
        for prop in props {
            match prop {
                ObjectProp::KeyValue { key, value } => match key {
                    PropKey::Ident(name) | PropKey::String(name) => {
                        pairs.push((*name, Some(*value)))
                    }
                    _ => self.gen.warn("computed object keys are not supported"),
                },
                ObjectProp::Shorthand(name) => pairs.push((*name, None)),
                ObjectProp::Method { .. } => {
                    self.gen.warn("object literal methods are not supported")
                }
                ObjectProp::Spread(_) => {
                    self.gen.warn("object spread is not supported")
                }
            }
        }

        for (name, value) in pairs {
            fields.push((name, HirType::I64));
            let v = match value {
                Some(expr) => self.lower_expr(expr),
                None => self.lower_ident(name),
            };
            values.push(v);
        }

        self.gen.module.structs.insert(
            struct_name,
            HirStruct {
                name: struct_name,
                fields,
            },
        );
        self.builder
            .create_aggregate(HirType::Struct(struct_name), values)
    }

    fn lower_call(&mut self, callee: ExprId, args: Vec<ExprId>) -> ValueId {
        match self.ast().expr(callee) {
            Expr::Ident(name) => {
                let name = *name;
                // A local variable holding a closure reference shadows a
                // function of the same name.
                if let Some(var) = self.lookup(name) {
                    let loaded = if self.builder.func.value(var).ty().is_pointer() {
                        self.builder.create_load(var)
                    } else {
                        var
                    };
                    let arg_values = self.lower_args(&args);
                    return self
                        .builder
                        .create_call_value(loaded, &arg_values, HirType::Any);
                }
                if self.gen.known_functions.contains(&name) {
                    let arg_values = self.lower_args(&args);
                    return self.builder.create_call(name, &arg_values, HirType::Any);
                }
                self.gen
                    .warn(format!("call to unresolved function '{}'", name));
                let arg_values = self.lower_args(&args);
                return self.builder.create_call(name, &arg_values, HirType::Any);
            }
            Expr::Member {
                object, property, ..
            } => {
                let object = *object;
                let property = *property;
                return self.lower_method_call(object, property, &args);
            }
            Expr::Paren(inner) => return self.lower_call(*inner, args),
            _ => {}
        }
        let callee_value = self.lower_expr(callee);
        let arg_values = self.lower_args(&args);
        self.builder
            .create_call_value(callee_value, &arg_values, HirType::Any)
    }

    fn lower_args(&mut self, args: &[ExprId]) -> Vec<ValueId> {
        args.iter().map(|&a| self.lower_expr(a)).collect()
    }

    /// Method calls map onto the runtime surface: `Object.keys(o)` becomes
    /// `nova_object_keys`, `Array.of(..)` becomes `nova_array_of`, instance
    /// calls like `arr.push(x)` become `nova_value_array_push(arr, x)`, and
    /// `console.log` prints through `printf`.
    fn lower_method_call(&mut self, object: ExprId, property: Symbol, args: &[ExprId]) -> ValueId {
        if let Expr::Ident(base) = self.ast().expr(object) {
            let base = *base;
            if self.lookup(base).is_none() {
                let target = match base.as_str() {
                    "Object" => Some(format!("nova_object_{}", property)),
                    "Array" => Some(format!("nova_array_{}", property)),
                    "Math" => Some(format!("nova_math_{}", property)),
                    "console" => Some("printf".to_string()),
                    _ => None,
                };
                if let Some(target) = target {
                    let arg_values = self.lower_args(args);
                    return self.builder.create_call(
                        Symbol::intern(&target),
                        &arg_values,
                        HirType::Any,
                    );
                }
            }
        }

        // Method on `this` inside a class body resolves to Class_method.
        if matches!(self.ast().expr(object), Expr::This) {
            if let Some(class) = self.current_class {
                let qualified = Symbol::intern(&format!("{}_{}", class, property));
                if self.gen.known_functions.contains(&qualified) {
                    let this_value = self.lower_expr(object);
                    let mut arg_values = vec![this_value];
                    arg_values.extend(self.lower_args(args));
                    return self
                        .builder
                        .create_call(qualified, &arg_values, HirType::Any);
                }
            }
        }

        // Instance method: the receiver is prepended as the first argument.
        let receiver = self.lower_expr(object);
        let mut arg_values = vec![receiver];
        arg_values.extend(self.lower_args(args));
        let name = Symbol::intern(&format!("nova_value_array_{}", property));
        self.builder.create_call(name, &arg_values, HirType::Any)
    }

    fn lower_member_read(&mut self, object: ExprId, property: Symbol) -> ValueId {
        if property.as_str() == "length" {
            let receiver = self.lower_expr(object);
            return self.builder.create_call(
                Symbol::intern("nova_value_array_length"),
                &[receiver],
                HirType::I64,
            );
        }

        let base = self.lower_expr(object);
        if let Some(index) = self.field_index_of(base, property) {
            return self.builder.create_get_field(base, index);
        }
        self.gen.warn(format!(
            "member '{}' cannot be resolved to a field; reading field 0",
            property
        ));
        self.builder.create_get_field(base, 0)
    }

    fn lower_member_write(&mut self, object: ExprId, property: Symbol, value: ValueId) {
        let base = self.lower_expr(object);
        match self.field_index_of(base, property) {
            Some(index) => {
                self.builder.create_set_field(base, index, value);
            }
            None => {
                self.gen.warn(format!(
                    "member '{}' cannot be resolved to a field; store dropped",
                    property
                ));
            }
        }
    }

    /// Resolve a field name to its index through the value's struct type.
    fn field_index_of(&self, base: ValueId, property: Symbol) -> Option<i64> {
        let struct_name = match self.builder.func.value(base).ty() {
            HirType::Struct(name) => *name,
            HirType::Pointer(inner) => match inner.as_ref() {
                HirType::Struct(name) => *name,
                _ => return None,
            },
            _ => return None,
        };
        let st = self.gen.module.structs.get(&struct_name)?;
        st.fields
            .iter()
            .position(|(n, _)| *n == property)
            .map(|i| i as i64)
    }
}

fn compound_opcode(op: AssignOp) -> Option<Opcode> {
    match op {
        AssignOp::Assign => None,
        AssignOp::Add => Some(Opcode::Add),
        AssignOp::Sub => Some(Opcode::Sub),
        AssignOp::Mul => Some(Opcode::Mul),
        AssignOp::Div => Some(Opcode::Div),
        AssignOp::Rem => Some(Opcode::Rem),
        AssignOp::Shl => Some(Opcode::Shl),
        AssignOp::Shr => Some(Opcode::Shr),
        AssignOp::UShr => Some(Opcode::UShr),
        AssignOp::BitAnd | AssignOp::LogicalAnd => Some(Opcode::And),
        AssignOp::BitOr | AssignOp::LogicalOr | AssignOp::Nullish => Some(Opcode::Or),
        AssignOp::BitXor => Some(Opcode::Xor),
        AssignOp::Exp => Some(Opcode::Mul), // approximated
    }
}

// ===========================================================================
// Free-variable analysis
// ===========================================================================

/// Collect the free variables of a function body: identifiers used but not
/// bound by the function's own parameters or declarations (including inside
/// nested functions). Order is first use, deduplicated.
fn free_variables(
    program: &Program,
    params: &[Symbol],
    stmts: &[StmtId],
    expr: Option<ExprId>,
) -> Vec<Symbol> {
    let mut walker = FreeVarWalker {
        program,
        bound: params.iter().copied().collect(),
        used: Vec::new(),
    };
    walker.bound.insert(Symbol::intern("this"));
    // Bindings first so that later uses anywhere in the body see them.
    for &stmt in stmts {
        walker.collect_bindings(stmt);
    }
    for &stmt in stmts {
        walker.walk_stmt(stmt);
    }
    if let Some(expr) = expr {
        walker.walk_expr(expr);
    }

    let mut seen = FxHashSet::default();
    walker
        .used
        .into_iter()
        .filter(|&name| !walker.bound.contains(&name) && seen.insert(name))
        .collect()
}

struct FreeVarWalker<'p> {
    program: &'p Program,
    bound: FxHashSet<Symbol>,
    used: Vec<Symbol>,
}

impl<'p> FreeVarWalker<'p> {
    fn ast(&self) -> &'p novac_par::Ast {
        &self.program.ast
    }

    fn bind_pattern(&mut self, pat: PatId) {
        match self.ast().pat(pat) {
            Pattern::Ident(name) => {
                self.bound.insert(*name);
            }
            Pattern::Object { props, rest } => {
                for prop in props {
                    match prop.value {
                        Some(inner) => self.bind_pattern(inner),
                        None => {
                            self.bound.insert(prop.key);
                        }
                    }
                }
                if let Some(rest) = rest {
                    self.bind_pattern(*rest);
                }
            }
            Pattern::Array { elements, rest } => {
                for element in elements.iter().flatten() {
                    self.bind_pattern(*element);
                }
                if let Some(rest) = rest {
                    self.bind_pattern(*rest);
                }
            }
            Pattern::Assign { pattern, .. } => self.bind_pattern(*pattern),
            Pattern::Invalid => {}
        }
    }

    /// Hoist-style binding collection over a statement subtree.
    fn collect_bindings(&mut self, id: StmtId) {
        match self.ast().stmt(id) {
            Stmt::VarDecl { declarators, .. } => {
                for decl in declarators {
                    self.bind_pattern(decl.pattern);
                }
            }
            Stmt::FunctionDecl(func) => {
                if let Some(name) = func.name {
                    self.bound.insert(name);
                }
            }
            Stmt::ClassDecl(def) => {
                if let Some(name) = def.name {
                    self.bound.insert(name);
                }
            }
            Stmt::Block(stmts) => {
                for &stmt in stmts {
                    self.collect_bindings(stmt);
                }
            }
            Stmt::If {
                consequent,
                alternate,
                ..
            } => {
                self.collect_bindings(*consequent);
                if let Some(alternate) = alternate {
                    self.collect_bindings(*alternate);
                }
            }
            Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::Labeled { body, .. } => {
                self.collect_bindings(*body)
            }
            Stmt::For { init, body, .. } => {
                if let Some(init) = init {
                    self.collect_bindings(*init);
                }
                self.collect_bindings(*body);
            }
            Stmt::ForIn { pattern, body, .. } | Stmt::ForOf { pattern, body, .. } => {
                self.bind_pattern(*pattern);
                self.collect_bindings(*body);
            }
            Stmt::Switch { cases, .. } => {
                for case in cases {
                    for &stmt in &case.body {
                        self.collect_bindings(stmt);
                    }
                }
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                self.collect_bindings(*block);
                if let Some(handler) = handler {
                    if let Some(param) = handler.param {
                        self.bind_pattern(param);
                    }
                    self.collect_bindings(handler.body);
                }
                if let Some(finalizer) = finalizer {
                    self.collect_bindings(*finalizer);
                }
            }
            _ => {}
        }
    }

    fn walk_stmt(&mut self, id: StmtId) {
        match self.ast().stmt(id) {
            Stmt::Expr(expr) | Stmt::Throw(expr) => self.walk_expr(*expr),
            Stmt::VarDecl { declarators, .. } => {
                for decl in declarators {
                    if let Some(init) = decl.init {
                        self.walk_expr(init);
                    }
                }
            }
            Stmt::Block(stmts) => {
                for &stmt in stmts {
                    self.walk_stmt(stmt);
                }
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.walk_expr(*test);
                self.walk_stmt(*consequent);
                if let Some(alternate) = alternate {
                    self.walk_stmt(*alternate);
                }
            }
            Stmt::While { test, body } | Stmt::DoWhile { body, test } => {
                self.walk_expr(*test);
                self.walk_stmt(*body);
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.walk_stmt(*init);
                }
                if let Some(test) = test {
                    self.walk_expr(*test);
                }
                if let Some(update) = update {
                    self.walk_expr(*update);
                }
                self.walk_stmt(*body);
            }
            Stmt::ForIn { object, body, .. } => {
                self.walk_expr(*object);
                self.walk_stmt(*body);
            }
            Stmt::ForOf { iterable, body, .. } => {
                self.walk_expr(*iterable);
                self.walk_stmt(*body);
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                self.walk_expr(*discriminant);
                for case in cases {
                    if let Some(test) = case.test {
                        self.walk_expr(test);
                    }
                    for &stmt in &case.body {
                        self.walk_stmt(stmt);
                    }
                }
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                self.walk_stmt(*block);
                if let Some(handler) = handler {
                    self.walk_stmt(handler.body);
                }
                if let Some(finalizer) = finalizer {
                    self.walk_stmt(*finalizer);
                }
            }
            Stmt::Return(Some(expr)) => self.walk_expr(*expr),
            Stmt::Labeled { body, .. } | Stmt::With { body, .. } => self.walk_stmt(*body),
            Stmt::FunctionDecl(func) => {
                // Nested function: its params bind inside it, its free
                // names count as uses here (transitive capture).
                for param in &func.params {
                    self.bind_pattern(param.pattern);
                }
                for &stmt in &func.body {
                    self.collect_bindings(stmt);
                }
                for &stmt in &func.body {
                    self.walk_stmt(stmt);
                }
            }
            Stmt::ClassDecl(def) => {
                for member in &def.members {
                    if let Some(value) = member.value {
                        self.walk_expr(value);
                    }
                    if let Some(func) = &member.func {
                        for &stmt in &func.body {
                            self.collect_bindings(stmt);
                        }
                        for &stmt in &func.body {
                            self.walk_stmt(stmt);
                        }
                    }
                }
            }
            Stmt::ExportDecl(novac_par::ast::ExportKind::Decl(inner)) => self.walk_stmt(*inner),
            Stmt::ExportDecl(novac_par::ast::ExportKind::Default(expr)) => self.walk_expr(*expr),
            _ => {}
        }
    }

    fn walk_expr(&mut self, id: ExprId) {
        match self.ast().expr(id) {
            Expr::Ident(name) => self.used.push(*name),
            Expr::Template { exprs, .. } => {
                for &expr in exprs {
                    self.walk_expr(expr);
                }
            }
            Expr::TaggedTemplate { tag, quasi } => {
                self.walk_expr(*tag);
                self.walk_expr(*quasi);
            }
            Expr::Array(elements) => {
                for element in elements.iter().flatten() {
                    self.walk_expr(*element);
                }
            }
            Expr::Object(props) => {
                for prop in props {
                    match prop {
                        ObjectProp::KeyValue { value, .. } => self.walk_expr(*value),
                        ObjectProp::Shorthand(name) => self.used.push(*name),
                        ObjectProp::Spread(expr) => self.walk_expr(*expr),
                        ObjectProp::Method { .. } => {}
                    }
                }
            }
            Expr::Function(func) => {
                for param in &func.params {
                    self.bind_pattern(param.pattern);
                }
                for &stmt in &func.body {
                    self.collect_bindings(stmt);
                }
                for &stmt in &func.body {
                    self.walk_stmt(stmt);
                }
            }
            Expr::Arrow { params, body, .. } => {
                for param in params {
                    self.bind_pattern(param.pattern);
                }
                match body {
                    ArrowBody::Expr(expr) => self.walk_expr(*expr),
                    ArrowBody::Block(stmts) => {
                        for &stmt in stmts {
                            self.collect_bindings(stmt);
                        }
                        for &stmt in stmts {
                            self.walk_stmt(stmt);
                        }
                    }
                }
            }
            Expr::Unary { operand, .. } => self.walk_expr(*operand),
            Expr::Update { operand, .. } => self.walk_expr(*operand),
            Expr::Binary { left, right, .. } => {
                self.walk_expr(*left);
                self.walk_expr(*right);
            }
            Expr::Assignment { target, value, .. } => {
                self.walk_expr(*target);
                self.walk_expr(*value);
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.walk_expr(*test);
                self.walk_expr(*consequent);
                self.walk_expr(*alternate);
            }
            Expr::Call { callee, args, .. } | Expr::New { callee, args } => {
                self.walk_expr(*callee);
                for &arg in args {
                    self.walk_expr(arg);
                }
            }
            Expr::Member { object, .. } => self.walk_expr(*object),
            Expr::Index { object, index, .. } => {
                self.walk_expr(*object);
                self.walk_expr(*index);
            }
            Expr::Sequence(exprs) => {
                for &expr in exprs {
                    self.walk_expr(expr);
                }
            }
            Expr::Spread(inner)
            | Expr::Paren(inner)
            | Expr::NonNull(inner)
            | Expr::ImportCall(inner) => self.walk_expr(*inner),
            Expr::As { expr, .. } | Expr::Satisfies { expr, .. } => self.walk_expr(*expr),
            Expr::Yield { argument, .. } => {
                if let Some(argument) = argument {
                    self.walk_expr(*argument);
                }
            }
            _ => {}
        }
    }
}
