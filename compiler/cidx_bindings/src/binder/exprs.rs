//! Pass 2: function bodies, statements and expressions.
//!
//! Expressions are typed only as far as overload resolution and member
//! access need: an expression whose type cannot be determined yields `None`
//! and matches any parameter.

use cidx_diagnostic::ErrorCode;
use cidx_ir::ast::{
    BaseType, BinaryOp, BuiltinType, CvQualifiers, DeclId, DeclKind, ExprId, ExprKind,
    FunctionBody, Initializer, MemberInit, NameId, StmtId, StmtKind, UnaryOp, VariableDecl,
};
use cidx_ir::stack::ensure_sufficient_stack;

use super::lookup::Lookup;
use super::typing::deduce_call;
use super::{Binder, Deferred, Want};
use crate::binding::{BindingId, BindingKind};
use crate::output::Resolution;
use crate::overload::{self, Argument, Candidate, Selection};
use crate::scope::{ScopeId, ScopeKind};
use crate::types::{ArgMap, TemplateArgument, Type};

/// Type and value category of an expression.
#[derive(Clone, Debug)]
pub(super) struct Value {
    pub(super) ty: Type<BindingId>,
    pub(super) lvalue: bool,
}

impl Value {
    fn rvalue(ty: Type<BindingId>) -> Self {
        Value { ty, lvalue: false }
    }

    fn lvalue(ty: Type<BindingId>) -> Self {
        Value { ty, lvalue: true }
    }

    fn dependent() -> Self {
        Value::rvalue(Type::Dependent)
    }

    fn builtin(&self) -> Option<BuiltinType> {
        match self.ty.non_reference().unqualified() {
            Type::Builtin(b) => Some(*b),
            _ => None,
        }
    }
}

fn is_dependent(values: &[Option<Value>]) -> bool {
    values.iter().flatten().any(|v| v.ty.is_dependent())
}

fn arguments(values: &[Option<Value>]) -> Vec<Argument> {
    values
        .iter()
        .map(|v| match v {
            Some(v) => Argument::new(v.ty.clone(), v.lvalue),
            None => Argument::unknown(),
        })
        .collect()
}

fn promote(b: BuiltinType) -> BuiltinType {
    if b.is_integral() && b.integer_rank() < BuiltinType::Int.integer_rank() {
        BuiltinType::Int
    } else {
        b
    }
}

fn is_unsigned(b: BuiltinType) -> bool {
    matches!(
        b,
        BuiltinType::UnsignedChar
            | BuiltinType::UnsignedShort
            | BuiltinType::UnsignedInt
            | BuiltinType::UnsignedLong
            | BuiltinType::UnsignedLongLong
    )
}

/// Common type of the operands of an arithmetic operator.
fn usual_arithmetic(l: BuiltinType, r: BuiltinType) -> BuiltinType {
    for floating in [BuiltinType::LongDouble, BuiltinType::Double, BuiltinType::Float] {
        if l == floating || r == floating {
            return floating;
        }
    }
    let (l, r) = (promote(l), promote(r));
    match l.integer_rank().cmp(&r.integer_rank()) {
        std::cmp::Ordering::Greater => l,
        std::cmp::Ordering::Less => r,
        std::cmp::Ordering::Equal if is_unsigned(r) => r,
        std::cmp::Ordering::Equal => l,
    }
}

fn int_literal_type(text: &str) -> BuiltinType {
    let suffix: String = text
        .chars()
        .rev()
        .take_while(|c| matches!(c, 'u' | 'U' | 'l' | 'L' | 'z' | 'Z'))
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let unsigned = suffix.contains('u');
    match (suffix.matches('l').count(), unsigned) {
        (0, false) => BuiltinType::Int,
        (0, true) => BuiltinType::UnsignedInt,
        (1, false) => BuiltinType::Long,
        (1, true) => BuiltinType::UnsignedLong,
        (_, false) => BuiltinType::LongLong,
        (_, true) => BuiltinType::UnsignedLongLong,
    }
}

fn float_literal_type(text: &str) -> BuiltinType {
    match text.chars().last() {
        Some('f' | 'F') if !text.starts_with("0x") => BuiltinType::Float,
        Some('l' | 'L') => BuiltinType::LongDouble,
        _ => BuiltinType::Double,
    }
}

fn char_type(text: &str) -> BuiltinType {
    if text.starts_with('L') {
        BuiltinType::WChar
    } else {
        BuiltinType::Char
    }
}

impl Binder<'_> {
    /// Run every queued job; jobs queued while running (members of local
    /// classes) run too.
    pub(crate) fn bind_deferred(&mut self) {
        let mut next = 0;
        while let Some(&job) = self.deferred.get(next) {
            next += 1;
            match job {
                Deferred::Function { function, decl, scope } => self.bind_function_body(function, decl, scope),
                Deferred::Initializer { variable, decl, scope } => {
                    if let DeclKind::Variable(v) = &self.decl(decl).kind {
                        if let Some(init) = &v.init {
                            self.in_scope(scope, |this| this.bind_initializer(variable, v.name, init));
                        }
                    }
                }
            }
        }
    }

    fn bind_function_body(&mut self, function: BindingId, decl: DeclId, scope: ScopeId) {
        let DeclKind::Function(f) = &self.decl(decl).kind else {
            return;
        };
        let saved_function = self.function.replace(function);
        let saved_access = self.access.take();
        self.in_scope(scope, |this| {
            for param in &f.params {
                if let Some(default) = param.default {
                    this.bind_expr(default);
                }
            }
            for init in &f.inits {
                this.bind_member_init(init);
            }
            if let FunctionBody::Parsed(body) = f.body {
                this.bind_stmt(body);
            }
        });
        self.function = saved_function;
        self.access = saved_access;
    }

    /// `Base(args)` or `member(args)` in a constructor.
    fn bind_member_init(&mut self, init: &MemberInit) {
        let values: Vec<Option<Value>> = init.args.iter().map(|&a| self.bind_expr(a)).collect();
        let Some(binding) = self.resolve_single(init.name, self.scope, Want::Any) else {
            return;
        };
        let b = self.bindings.get(binding);
        let ty = if b.kind.is_type() {
            let args = self
                .name_node(init.name)
                .last
                .template_args
                .as_ref()
                .map(|args| self.template_arguments(args));
            self.type_for_binding(binding, args, init.name)
        } else {
            match &b.ty {
                Some(ty) => ty.clone(),
                None => return,
            }
        };
        self.select_constructor(&ty, &values, init.name);
    }

    /// Resolve the constructor an initializer calls.
    pub(super) fn bind_initializer(&mut self, variable: BindingId, name: NameId, init: &Initializer) {
        match init {
            Initializer::Assign(e) => {
                self.bind_expr(*e);
            }
            Initializer::Construct(args) | Initializer::Braced(args) => {
                let values: Vec<Option<Value>> = args.iter().map(|&a| self.bind_expr(a)).collect();
                if let Some(ty) = self.bindings.get(variable).ty.clone() {
                    self.select_constructor(&ty, &values, name);
                }
            }
        }
    }

    /// A local `T x;` calls the default constructor.
    pub(super) fn default_construct(&mut self, variable: BindingId, name: NameId) {
        if let Some(ty) = self.bindings.get(variable).ty.clone() {
            if !ty.is_reference() && !ty.is_pointer() {
                self.select_constructor(&ty, &[], name);
            }
        }
    }

    /// Record an implicit reference from `name` to the constructor of `ty`
    /// that `args` select.
    fn select_constructor(&mut self, ty: &Type<BindingId>, args: &[Option<Value>], name: NameId) {
        if ty.is_reference() || ty.is_dependent() || is_dependent(args) {
            return;
        }
        let Some((class, map)) = self.class_of(ty) else {
            return;
        };
        let constructors: Vec<BindingId> = self
            .bindings
            .get(class)
            .members
            .iter()
            .copied()
            .filter(|&m| self.bindings.get(m).kind == BindingKind::Constructor)
            .collect();
        if constructors.is_empty() {
            return;
        }
        let candidates = self.candidates(&constructors, args, None, &map);
        match overload::select(&self.bindings, &candidates, &arguments(args)) {
            Selection::Best(ctor) => self.implicitly_referenced(ctor, name),
            Selection::Ambiguous(ids) => {
                let class_name = self.text(self.bindings.get(class).name);
                self.problem(
                    ErrorCode::S3002,
                    name,
                    format!("call to constructor of `{class_name}` is ambiguous"),
                    &format!("{} candidates match equally well", ids.len()),
                );
            }
            // Implicit copy and move constructors are not modeled.
            Selection::NoViable => {}
        }
    }

    // Statements

    fn in_block<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let block = self.scopes.push(ScopeKind::Block, self.scope, None);
        self.in_scope(block, f)
    }

    pub(super) fn bind_stmt(&mut self, s: StmtId) {
        ensure_sufficient_stack(|| self.bind_stmt_inner(s));
    }

    fn bind_stmt_inner(&mut self, s: StmtId) {
        match &self.stmt(s).kind {
            StmtKind::Compound(stmts) => self.in_block(|this| {
                for &stmt in stmts {
                    this.bind_stmt(stmt);
                }
            }),
            StmtKind::Decl(decls) => {
                for &decl in decls {
                    self.declare(decl, None);
                }
            }
            StmtKind::Expr(e) | StmtKind::Return(Some(e)) => {
                self.bind_expr(*e);
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.in_block(|this| {
                this.bind_expr(*cond);
                this.bind_stmt(*then_branch);
                if let Some(else_branch) = else_branch {
                    this.bind_stmt(*else_branch);
                }
            }),
            StmtKind::While { cond, body } | StmtKind::Switch { cond, body } => self.in_block(|this| {
                this.bind_expr(*cond);
                this.bind_stmt(*body);
            }),
            StmtKind::DoWhile { body, cond } => {
                self.bind_stmt(*body);
                self.bind_expr(*cond);
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => self.in_block(|this| {
                match (init, cond, step) {
                    (Some(init), None, None) if this.bind_range_variable(*init) => {}
                    _ => {
                        if let Some(init) = init {
                            this.bind_stmt(*init);
                        }
                        if let Some(cond) = cond {
                            this.bind_expr(*cond);
                        }
                        if let Some(step) = step {
                            this.bind_expr(*step);
                        }
                    }
                }
                this.bind_stmt(*body);
            }),
            StmtKind::Case { value, body } => {
                if let Some(value) = value {
                    self.bind_expr(*value);
                }
                self.bind_stmt(*body);
            }
            StmtKind::Label { body, .. } => self.bind_stmt(*body),
            StmtKind::Try { body, handlers } => {
                self.bind_stmt(*body);
                for handler in handlers {
                    self.in_block(|this| {
                        if let Some(param) = handler.param {
                            this.declare(param, None);
                        }
                        this.bind_stmt(handler.body);
                    });
                }
            }
            StmtKind::Return(None)
            | StmtKind::Goto(_)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Empty
            | StmtKind::Problem(_) => {}
        }
    }

    /// `for (auto& x : range)`: the loop variable's `auto` is the range's
    /// element type. Returns false when `init` is not a single variable
    /// initialized by `=`.
    fn bind_range_variable(&mut self, init: StmtId) -> bool {
        let StmtKind::Decl(decls) = &self.stmt(init).kind else {
            return false;
        };
        let [decl] = decls.as_slice() else {
            return false;
        };
        let DeclKind::Variable(v) = &self.decl(*decl).kind else {
            return false;
        };
        let Some(Initializer::Assign(range)) = v.init else {
            return false;
        };
        self.declare_loop_variable(v, range);
        true
    }

    fn declare_loop_variable(&mut self, v: &VariableDecl, range: ExprId) {
        let range = self.bind_expr(range);
        let deduced = range.map(|r| match r.ty.non_reference().unqualified() {
            Type::Array(element, _) => (**element).clone(),
            // Element type of a container needs `begin()`.
            Type::Named(_) | Type::Instance { .. } => Type::Unknown,
            // `for (auto i = 0; ; )`
            other => other.clone(),
        });
        let ty = self.type_of_spec_with(&v.ty, deduced);
        let scope = self.decl_scope();
        let name = self.name_node(v.name).last.ident;
        let binding = self.new_binding(BindingKind::Variable, name, scope, true);
        let b = self.bindings.get_mut(binding);
        b.ty = Some(ty);
        b.specifiers = v.specifiers;
        self.declared(binding, v.name, true);
    }

    // Expressions

    pub(super) fn bind_expr(&mut self, e: ExprId) -> Option<Value> {
        ensure_sufficient_stack(|| self.bind_expr_inner(e))
    }

    fn bind_expr_inner(&mut self, e: ExprId) -> Option<Value> {
        match &self.expr(e).kind {
            ExprKind::IntLit(text) => Some(Value::rvalue(Type::Builtin(int_literal_type(self.text(*text))))),
            ExprKind::FloatLit(text) => Some(Value::rvalue(Type::Builtin(float_literal_type(self.text(*text))))),
            ExprKind::CharLit(text) => Some(Value::rvalue(Type::Builtin(char_type(self.text(*text))))),
            ExprKind::StringLit(text) => {
                let element = Type::qualified(CvQualifiers::CONST, Type::Builtin(char_type(self.text(*text))));
                Some(Value::lvalue(Type::Array(Box::new(element), None)))
            }
            ExprKind::Bool(_) => Some(Value::rvalue(Type::Builtin(BuiltinType::Bool))),
            ExprKind::Nullptr => Some(Value::rvalue(Type::Builtin(BuiltinType::NullPtr))),
            ExprKind::This => self.this_type().map(Value::rvalue),
            ExprKind::Name(id) => self.bind_name(*id),
            ExprKind::Unary { op, operand } => self.bind_unary(*op, *operand),
            ExprKind::Binary { op, lhs, rhs } => self.bind_binary(*op, *lhs, *rhs),
            ExprKind::Assign { lhs, rhs, .. } => {
                let target = self.bind_expr(*lhs);
                self.bind_expr(*rhs);
                target.map(|v| Value::lvalue(v.ty))
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.bind_expr(*cond);
                let then_value = self.bind_expr(*then_expr);
                let else_value = self.bind_expr(*else_expr);
                then_value.or(else_value)
            }
            ExprKind::Cast { ty, operand } => {
                self.bind_expr(*operand);
                let ty = self.type_of_spec(ty);
                let lvalue = matches!(ty, Type::LValueRef(_));
                Some(Value { ty, lvalue })
            }
            ExprKind::Construct { ty, args } => {
                let values: Vec<Option<Value>> = args.iter().map(|&a| self.bind_expr(a)).collect();
                let ty = self.type_of_spec(ty);
                if let Some(name) = ty_name(&self.expr(e).kind) {
                    self.select_constructor(&ty, &values, name);
                }
                Some(Value::rvalue(ty))
            }
            ExprKind::SizeofType(ty) => {
                self.type_of_spec(ty);
                Some(Value::rvalue(Type::Builtin(BuiltinType::UnsignedLong)))
            }
            ExprKind::SizeofExpr(operand) => {
                self.bind_expr(*operand);
                Some(Value::rvalue(Type::Builtin(BuiltinType::UnsignedLong)))
            }
            ExprKind::Call { callee, args } => self.bind_call(*callee, args),
            ExprKind::Member { object, member, arrow } => self.bind_member(*object, *member, *arrow, None),
            ExprKind::Index { base, index } => {
                let base = self.bind_expr(*base);
                self.bind_expr(*index);
                let base = base?;
                if base.ty.is_dependent() {
                    return Some(Value::dependent());
                }
                base.ty.pointee().map(|t| Value::lvalue(t.clone()))
            }
            ExprKind::New { ty, args } => {
                let values: Vec<Option<Value>> = args.iter().map(|&a| self.bind_expr(a)).collect();
                let ty = self.type_of_spec(ty);
                if let Some(name) = ty_name(&self.expr(e).kind) {
                    self.select_constructor(&ty, &values, name);
                }
                Some(Value::rvalue(ty.pointer_to()))
            }
            ExprKind::Delete { operand, .. } => {
                self.bind_expr(*operand);
                Some(Value::rvalue(Type::Builtin(BuiltinType::Void)))
            }
            ExprKind::Throw(operand) => {
                if let Some(operand) = operand {
                    self.bind_expr(*operand);
                }
                Some(Value::rvalue(Type::Builtin(BuiltinType::Void)))
            }
            ExprKind::InitList(items) => {
                for &item in items {
                    self.bind_expr(item);
                }
                None
            }
            ExprKind::Problem(_) => None,
        }
    }

    /// Type of `this` in the function being bound.
    fn this_type(&self) -> Option<Type<BindingId>> {
        let function = self.bindings.get(self.function?);
        let class = function.owner.filter(|&o| self.bindings.get(o).kind.is_class())?;
        let cv = match &function.ty {
            Some(Type::Function(sig)) => sig.cv,
            _ => CvQualifiers::NONE,
        };
        Some(Type::qualified(cv, Type::Named(class)).pointer_to())
    }

    fn value_of(&self, binding: BindingId) -> Option<Value> {
        let b = self.bindings.get(binding);
        let ty = b.ty.clone()?;
        match b.kind {
            BindingKind::Variable | BindingKind::Field => Some(Value::lvalue(ty.non_reference().clone())),
            kind if kind.is_function() => Some(Value::lvalue(ty)),
            BindingKind::Enumerator | BindingKind::TemplateParameter => Some(Value::rvalue(ty)),
            _ => None,
        }
    }

    fn bind_name(&mut self, id: NameId) -> Option<Value> {
        let scope = self.scope;
        let lookup = self.lookup_name(id, scope, Want::Any);
        let dependent = matches!(lookup, Lookup::Dependent);
        match self.settle(id, scope, lookup) {
            Some(binding) => self.value_of(binding),
            None if dependent => Some(Value::dependent()),
            None => None,
        }
    }

    fn bind_unary(&mut self, op: UnaryOp, operand: ExprId) -> Option<Value> {
        let value = self.bind_expr(operand)?;
        if value.ty.is_dependent() {
            return Some(Value::dependent());
        }
        match op {
            UnaryOp::Deref => value.ty.pointee().map(|t| Value::lvalue(t.clone())),
            UnaryOp::AddrOf => Some(Value::rvalue(value.ty.non_reference().clone().pointer_to())),
            UnaryOp::Not => Some(Value::rvalue(Type::Builtin(BuiltinType::Bool))),
            UnaryOp::Plus | UnaryOp::Neg | UnaryOp::BitNot => {
                Some(Value::rvalue(Type::Builtin(promote(value.builtin()?))))
            }
            UnaryOp::PreInc | UnaryOp::PreDec => Some(value),
            UnaryOp::PostInc | UnaryOp::PostDec => Some(Value::rvalue(value.ty)),
        }
    }

    fn bind_binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> Option<Value> {
        let l = self.bind_expr(lhs);
        let r = self.bind_expr(rhs);
        if op.is_boolean() {
            return Some(Value::rvalue(Type::Builtin(BuiltinType::Bool)));
        }
        if op == BinaryOp::Comma {
            return r;
        }
        let (l, r) = (l?, r?);
        if l.ty.is_dependent() || r.ty.is_dependent() {
            return Some(Value::dependent());
        }
        let l_ty = l.ty.non_reference().unqualified();
        let r_ty = r.ty.non_reference().unqualified();
        match (l_ty, r_ty) {
            (Type::Pointer(_) | Type::Array(..), Type::Pointer(_) | Type::Array(..)) if op == BinaryOp::Sub => {
                Some(Value::rvalue(Type::Builtin(BuiltinType::Long)))
            }
            (Type::Pointer(p) | Type::Array(p, _), Type::Builtin(_)) => Some(Value::rvalue((**p).clone().pointer_to())),
            (Type::Builtin(_), Type::Pointer(p) | Type::Array(p, _)) if op == BinaryOp::Add => {
                Some(Value::rvalue((**p).clone().pointer_to()))
            }
            (Type::Builtin(a), Type::Builtin(b)) => {
                let ty = if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
                    promote(*a)
                } else {
                    usual_arithmetic(*a, *b)
                };
                Some(Value::rvalue(Type::Builtin(ty)))
            }
            _ => None,
        }
    }

    // Calls

    fn bind_call(&mut self, callee: ExprId, args: &[ExprId]) -> Option<Value> {
        let values: Vec<Option<Value>> = args.iter().map(|&a| self.bind_expr(a)).collect();
        match &self.expr(callee).kind {
            ExprKind::Name(id) => self.call_named(*id, &values),
            ExprKind::Member { object, member, arrow } => self.bind_member(*object, *member, *arrow, Some(&values)),
            _ => {
                let function = self.bind_expr(callee)?;
                call_result(&function.ty)
            }
        }
    }

    fn call_named(&mut self, id: NameId, args: &[Option<Value>]) -> Option<Value> {
        let scope = self.scope;
        let found = match self.lookup_name(id, scope, Want::Any) {
            Lookup::Found(found) => found,
            // Unqualified calls with dependent arguments are looked up at
            // instantiation.
            Lookup::Missing if is_dependent(args) => {
                self.mark_dependent(id);
                return Some(Value::dependent());
            }
            Lookup::Dependent => {
                self.mark_dependent(id);
                return Some(Value::dependent());
            }
            other => {
                self.settle(id, scope, other);
                return None;
            }
        };
        let first = self.bindings.get(found[0]);
        if first.kind.is_type() {
            // `T(args)`: a functional cast or temporary.
            let binding = self.settle(id, scope, Lookup::Found(found))?;
            let template_args = self
                .name_node(id)
                .last
                .template_args
                .as_ref()
                .map(|a| self.template_arguments(a));
            let ty = self.type_for_binding(binding, template_args, id);
            self.select_constructor(&ty, args, id);
            return Some(Value::rvalue(ty));
        }
        if !found.iter().all(|&b| self.bindings.get(b).kind.is_function()) {
            // A function pointer or callable object.
            let binding = self.settle(id, scope, Lookup::Found(found))?;
            return self.value_of(binding).and_then(|v| call_result(&v.ty));
        }
        let explicit = self
            .name_node(id)
            .last
            .template_args
            .as_ref()
            .map(|a| self.template_arguments(a));
        self.resolve_overload(id, &found, args, explicit.as_deref(), &ArgMap::new())
    }

    /// Candidates for a call; function templates are deduced from the
    /// arguments and dropped when deduction fails. `context` maps the
    /// parameters of the class template the functions are members of.
    fn candidates(
        &self,
        functions: &[BindingId],
        args: &[Option<Value>],
        explicit: Option<&[TemplateArgument<BindingId>]>,
        context: &ArgMap<BindingId>,
    ) -> Vec<Candidate> {
        let arg_types: Vec<Option<Type<BindingId>>> =
            args.iter().map(|a| a.as_ref().map(|v| v.ty.clone())).collect();
        functions
            .iter()
            .filter_map(|&function| {
                let b = self.bindings.get(function);
                let Some(Type::Function(sig)) = &b.ty else {
                    return None;
                };
                let required = sig.params.len().saturating_sub(usize::from(b.defaults));
                let params: Vec<Type<BindingId>> = sig.params.iter().map(|p| p.substitute(context)).collect();
                if b.kind != BindingKind::FunctionTemplate {
                    return Some(Candidate {
                        binding: function,
                        params,
                        required,
                        variadic: sig.variadic,
                        from_template: false,
                    });
                }
                let mut map = explicit
                    .map(|args| ArgMap::from_pairs(&b.template_params, args.to_vec()))
                    .unwrap_or_default();
                if !deduce_call(&params, &arg_types, &b.template_params, &mut map) {
                    return None;
                }
                Some(Candidate {
                    binding: function,
                    params: params.iter().map(|p| p.substitute(&map)).collect(),
                    required,
                    variadic: sig.variadic,
                    from_template: true,
                })
            })
            .collect()
    }

    /// Pick one of `functions` for a call through `id`.
    fn resolve_overload(
        &mut self,
        id: NameId,
        functions: &[BindingId],
        args: &[Option<Value>],
        explicit: Option<&[TemplateArgument<BindingId>]>,
        context: &ArgMap<BindingId>,
    ) -> Option<Value> {
        if is_dependent(args) {
            self.mark_dependent(id);
            return Some(Value::dependent());
        }
        let candidates = self.candidates(functions, args, explicit, context);
        match overload::select(&self.bindings, &candidates, &arguments(args)) {
            Selection::Best(function) => {
                self.referenced(function, id);
                let arg_types: Vec<Option<Type<BindingId>>> =
                    args.iter().map(|a| a.as_ref().map(|v| v.ty.clone())).collect();
                self.result_of(function, &arg_types, explicit, context)
            }
            Selection::Ambiguous(ids) => {
                let spelled = self.spelled(id);
                self.problem(
                    ErrorCode::S3002,
                    id,
                    format!("call to `{spelled}` is ambiguous"),
                    &format!("{} candidates match equally well", ids.len()),
                );
                self.set_resolution(id, Resolution::Ambiguous(ids));
                None
            }
            // A lone function is referenced even when argument types are only
            // approximated.
            Selection::NoViable if functions.len() == 1 => {
                self.referenced(functions[0], id);
                None
            }
            Selection::NoViable => {
                let spelled = self.spelled(id);
                self.problem(
                    ErrorCode::S3003,
                    id,
                    format!("no matching function for call to `{spelled}`"),
                    &format!("none of {} candidates is viable", functions.len()),
                );
                self.set_resolution(id, Resolution::Unresolved);
                None
            }
        }
    }

    /// Return value of calling `function`, with template parameters bound.
    fn result_of(
        &self,
        function: BindingId,
        arg_types: &[Option<Type<BindingId>>],
        explicit: Option<&[TemplateArgument<BindingId>]>,
        context: &ArgMap<BindingId>,
    ) -> Option<Value> {
        let b = self.bindings.get(function);
        let Some(Type::Function(sig)) = &b.ty else {
            return None;
        };
        let mut ret = sig.ret.substitute(context);
        if b.kind == BindingKind::FunctionTemplate {
            let params: Vec<Type<BindingId>> = sig.params.iter().map(|p| p.substitute(context)).collect();
            let mut map = explicit
                .map(|args| ArgMap::from_pairs(&b.template_params, args.to_vec()))
                .unwrap_or_default();
            deduce_call(&params, arg_types, &b.template_params, &mut map);
            ret = ret.substitute(&map);
        }
        let lvalue = matches!(ret, Type::LValueRef(_));
        Some(Value {
            ty: ret.non_reference().clone(),
            lvalue,
        })
    }

    // Members

    /// Class an object of type `ty` is, and the template arguments its
    /// members' types are seen through.
    fn class_of(&self, ty: &Type<BindingId>) -> Option<(BindingId, ArgMap<BindingId>)> {
        match ty.non_reference().unqualified() {
            Type::Named(class) if self.bindings.get(*class).kind.is_class() => Some((*class, ArgMap::new())),
            Type::Instance { template, args } => {
                if let Some(found) = self.matching_specialization(*template, args) {
                    return Some(found);
                }
                let params = &self.bindings.get(*template).template_params;
                Some((*template, ArgMap::from_pairs(params, args.clone())))
            }
            _ => None,
        }
    }

    /// `object.member` or `object->member`; `call` holds the arguments when
    /// the member is called.
    fn bind_member(
        &mut self,
        object: ExprId,
        member: NameId,
        arrow: bool,
        call: Option<&[Option<Value>]>,
    ) -> Option<Value> {
        let object = self.bind_expr(object)?;
        let object_ty = if arrow {
            if object.ty.is_dependent() {
                Type::Dependent
            } else {
                object.ty.pointee()?.clone()
            }
        } else {
            object.ty.non_reference().clone()
        };
        if object_ty.is_dependent() {
            self.mark_dependent(member);
            return Some(Value::dependent());
        }
        let (class, map) = self.class_of(&object_ty)?;
        let class_scope = self.bindings.get(class).scope?;
        let node = self.name_node(member);
        let lookup = if node.is_qualified() {
            self.lookup_name(member, self.scope, Want::Any)
        } else {
            let found = self.lookup_in(class_scope, self.segment_name(&node.last), Want::Any);
            if found.is_empty() {
                Lookup::Missing
            } else {
                Lookup::Found(found)
            }
        };
        let found = match lookup {
            Lookup::Found(found) => found,
            Lookup::Missing => {
                let spelled = self.spelled(member);
                let class_name = self.text(self.bindings.get(class).name);
                self.problem(
                    ErrorCode::S3001,
                    member,
                    format!("no member named `{spelled}` in `{class_name}`"),
                    "not a member",
                );
                return None;
            }
            other => {
                self.settle(member, self.scope, other);
                return None;
            }
        };
        let functions = found.iter().all(|&b| self.bindings.get(b).kind.is_function());
        if let (Some(args), true) = (call, functions) {
            let explicit = node
                .last
                .template_args
                .as_ref()
                .map(|a| self.template_arguments(a));
            return self.resolve_overload(member, &found, args, explicit.as_deref(), &map);
        }
        let binding = self.settle(member, self.scope, Lookup::Found(found))?;
        let value = self.value_of(binding)?;
        let value = Value {
            ty: value.ty.substitute(&map),
            lvalue: value.lvalue,
        };
        match call {
            Some(_) => call_result(&value.ty),
            None => Some(value),
        }
    }
}

/// Name of the class a `T(args)` or `new T(args)` expression constructs.
fn ty_name(kind: &ExprKind) -> Option<NameId> {
    let ty = match kind {
        ExprKind::Construct { ty, .. } | ExprKind::New { ty, .. } => ty,
        _ => return None,
    };
    match ty.base {
        BaseType::Named(name) if ty.ops.is_empty() => Some(name),
        _ => None,
    }
}

/// Result of calling something of type `ty`.
fn call_result(ty: &Type<BindingId>) -> Option<Value> {
    let function = match ty.non_reference().unqualified() {
        Type::Pointer(inner) => inner.unqualified(),
        other => other,
    };
    match function {
        Type::Function(sig) => {
            let lvalue = matches!(*sig.ret, Type::LValueRef(_));
            Some(Value {
                ty: sig.ret.non_reference().clone(),
                lvalue,
            })
        }
        Type::Dependent | Type::TemplateParam(_) => Some(Value::dependent()),
        _ => None,
    }
}
