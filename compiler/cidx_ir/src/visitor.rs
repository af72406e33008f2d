//! Pre/post-order traversal of the AST.
//!
//! `visit_*` is called before a node's children and decides whether to
//! descend; `leave_*` is called after them. A pruned node still gets its
//! `leave_*` call. Names are leaves and only get `visit_name`.

use crate::ast::{
    BaseType, DeclId, DeclKind, ExprId, ExprKind, FunctionBody, Initializer, NameId, StmtId,
    StmtKind, TemplateArg, TemplateParamKind, TranslationUnit, TypeOp, TypeSpec,
};
use crate::ast::{AstArena, Decl, Expr, NameNode, Stmt};
use crate::stack::ensure_sufficient_stack;

/// Whether a traversal continues into a node's children.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VisitAction {
    Descend,
    Prune,
}

pub trait AstVisitor {
    fn visit_decl(&mut self, _id: DeclId, _decl: &Decl) -> VisitAction {
        VisitAction::Descend
    }

    fn leave_decl(&mut self, _id: DeclId, _decl: &Decl) {}

    fn visit_stmt(&mut self, _id: StmtId, _stmt: &Stmt) -> VisitAction {
        VisitAction::Descend
    }

    fn leave_stmt(&mut self, _id: StmtId, _stmt: &Stmt) {}

    fn visit_expr(&mut self, _id: ExprId, _expr: &Expr) -> VisitAction {
        VisitAction::Descend
    }

    fn leave_expr(&mut self, _id: ExprId, _expr: &Expr) {}

    fn visit_name(&mut self, _id: NameId, _name: &NameNode) {}
}

pub fn walk_translation_unit<V: AstVisitor + ?Sized>(tu: &TranslationUnit, visitor: &mut V) {
    for &decl in &tu.decls {
        walk_decl(&tu.arena, decl, visitor);
    }
}

pub fn walk_decl<V: AstVisitor + ?Sized>(arena: &AstArena, id: DeclId, visitor: &mut V) {
    let decl = arena.decl(id);
    if visitor.visit_decl(id, decl) == VisitAction::Descend {
        ensure_sufficient_stack(|| walk_decl_children(arena, decl, visitor));
    }
    visitor.leave_decl(id, decl);
}

fn walk_decl_children<V: AstVisitor + ?Sized>(arena: &AstArena, decl: &Decl, visitor: &mut V) {
    match &decl.kind {
        DeclKind::Namespace(ns) => {
            if let Some(name) = ns.name {
                walk_name(arena, name, visitor);
            }
            for &d in &ns.body {
                walk_decl(arena, d, visitor);
            }
        }
        DeclKind::LinkageSpec { body, .. } => {
            for &d in body {
                walk_decl(arena, d, visitor);
            }
        }
        DeclKind::UsingDirective(name) | DeclKind::UsingDeclaration(name) => {
            walk_name(arena, *name, visitor);
        }
        DeclKind::Alias { name, ty } | DeclKind::Typedef { name, ty } => {
            walk_name(arena, *name, visitor);
            walk_type(arena, ty, visitor);
        }
        DeclKind::Class(class) => {
            if let Some(name) = class.name {
                walk_name(arena, name, visitor);
            }
            for base in &class.bases {
                walk_name(arena, base.name, visitor);
            }
            for &m in &class.members {
                walk_decl(arena, m, visitor);
            }
        }
        DeclKind::Enum(en) => {
            if let Some(name) = en.name {
                walk_name(arena, name, visitor);
            }
            if let Some(ty) = &en.underlying {
                walk_type(arena, ty, visitor);
            }
            for e in &en.enumerators {
                walk_name(arena, e.name, visitor);
                if let Some(v) = e.value {
                    walk_expr(arena, v, visitor);
                }
            }
        }
        DeclKind::Function(func) => {
            if let Some(ret) = &func.ret {
                walk_type(arena, ret, visitor);
            }
            walk_name(arena, func.name, visitor);
            for p in &func.params {
                walk_type(arena, &p.ty, visitor);
                if let Some(name) = p.name {
                    walk_name(arena, name, visitor);
                }
                if let Some(d) = p.default {
                    walk_expr(arena, d, visitor);
                }
            }
            for init in &func.inits {
                walk_name(arena, init.name, visitor);
                for &a in &init.args {
                    walk_expr(arena, a, visitor);
                }
            }
            if let FunctionBody::Parsed(body) = func.body {
                walk_stmt(arena, body, visitor);
            }
        }
        DeclKind::Variable(var) => {
            walk_type(arena, &var.ty, visitor);
            walk_name(arena, var.name, visitor);
            if let Some(bits) = var.bits {
                walk_expr(arena, bits, visitor);
            }
            match &var.init {
                Some(Initializer::Assign(e)) => walk_expr(arena, *e, visitor),
                Some(Initializer::Construct(args) | Initializer::Braced(args)) => {
                    for &a in args {
                        walk_expr(arena, a, visitor);
                    }
                }
                None => {}
            }
        }
        DeclKind::Template(tmpl) => {
            for p in &tmpl.params {
                if let Some(name) = p.name {
                    walk_name(arena, name, visitor);
                }
                match &p.kind {
                    TemplateParamKind::Type { default } => {
                        if let Some(ty) = default {
                            walk_type(arena, ty, visitor);
                        }
                    }
                    TemplateParamKind::NonType { ty, default } => {
                        walk_type(arena, ty, visitor);
                        if let Some(d) = default {
                            walk_expr(arena, *d, visitor);
                        }
                    }
                }
            }
            walk_decl(arena, tmpl.decl, visitor);
        }
        DeclKind::ExplicitInstantiation(inner) => walk_decl(arena, *inner, visitor),
        DeclKind::Access(_) | DeclKind::Empty | DeclKind::Problem(_) => {}
    }
}

pub fn walk_stmt<V: AstVisitor + ?Sized>(arena: &AstArena, id: StmtId, visitor: &mut V) {
    let stmt = arena.stmt(id);
    if visitor.visit_stmt(id, stmt) == VisitAction::Descend {
        ensure_sufficient_stack(|| walk_stmt_children(arena, stmt, visitor));
    }
    visitor.leave_stmt(id, stmt);
}

fn walk_stmt_children<V: AstVisitor + ?Sized>(arena: &AstArena, stmt: &Stmt, visitor: &mut V) {
    match &stmt.kind {
        StmtKind::Compound(stmts) => {
            for &s in stmts {
                walk_stmt(arena, s, visitor);
            }
        }
        StmtKind::Decl(decls) => {
            for &d in decls {
                walk_decl(arena, d, visitor);
            }
        }
        StmtKind::Expr(e) | StmtKind::Return(Some(e)) => walk_expr(arena, *e, visitor),
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            walk_expr(arena, *cond, visitor);
            walk_stmt(arena, *then_branch, visitor);
            if let Some(e) = else_branch {
                walk_stmt(arena, *e, visitor);
            }
        }
        StmtKind::While { cond, body } => {
            walk_expr(arena, *cond, visitor);
            walk_stmt(arena, *body, visitor);
        }
        StmtKind::DoWhile { body, cond } => {
            walk_stmt(arena, *body, visitor);
            walk_expr(arena, *cond, visitor);
        }
        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            if let Some(i) = init {
                walk_stmt(arena, *i, visitor);
            }
            if let Some(c) = cond {
                walk_expr(arena, *c, visitor);
            }
            if let Some(s) = step {
                walk_expr(arena, *s, visitor);
            }
            walk_stmt(arena, *body, visitor);
        }
        StmtKind::Switch { cond, body } => {
            walk_expr(arena, *cond, visitor);
            walk_stmt(arena, *body, visitor);
        }
        StmtKind::Case { value, body } => {
            if let Some(v) = value {
                walk_expr(arena, *v, visitor);
            }
            walk_stmt(arena, *body, visitor);
        }
        StmtKind::Label { body, .. } => walk_stmt(arena, *body, visitor),
        StmtKind::Try { body, handlers } => {
            walk_stmt(arena, *body, visitor);
            for handler in handlers {
                if let Some(param) = handler.param {
                    walk_decl(arena, param, visitor);
                }
                walk_stmt(arena, handler.body, visitor);
            }
        }
        StmtKind::Goto(_)
        | StmtKind::Return(None)
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Empty
        | StmtKind::Problem(_) => {}
    }
}

pub fn walk_expr<V: AstVisitor + ?Sized>(arena: &AstArena, id: ExprId, visitor: &mut V) {
    let expr = arena.expr(id);
    if visitor.visit_expr(id, expr) == VisitAction::Descend {
        ensure_sufficient_stack(|| walk_expr_children(arena, expr, visitor));
    }
    visitor.leave_expr(id, expr);
}

fn walk_expr_children<V: AstVisitor + ?Sized>(arena: &AstArena, expr: &Expr, visitor: &mut V) {
    match &expr.kind {
        ExprKind::Name(name) => walk_name(arena, *name, visitor),
        ExprKind::Unary { operand, .. }
        | ExprKind::SizeofExpr(operand)
        | ExprKind::Throw(Some(operand))
        | ExprKind::Delete { operand, .. } => walk_expr(arena, *operand, visitor),
        ExprKind::Binary { lhs, rhs, .. } | ExprKind::Assign { lhs, rhs, .. } => {
            walk_expr(arena, *lhs, visitor);
            walk_expr(arena, *rhs, visitor);
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            walk_expr(arena, *cond, visitor);
            walk_expr(arena, *then_expr, visitor);
            walk_expr(arena, *else_expr, visitor);
        }
        ExprKind::Cast { ty, operand } => {
            walk_type(arena, ty, visitor);
            walk_expr(arena, *operand, visitor);
        }
        ExprKind::Construct { ty, args } | ExprKind::New { ty, args } => {
            walk_type(arena, ty, visitor);
            for &a in args {
                walk_expr(arena, a, visitor);
            }
        }
        ExprKind::SizeofType(ty) => walk_type(arena, ty, visitor),
        ExprKind::Call { callee, args } => {
            walk_expr(arena, *callee, visitor);
            for &a in args {
                walk_expr(arena, a, visitor);
            }
        }
        ExprKind::Member { object, member, .. } => {
            walk_expr(arena, *object, visitor);
            walk_name(arena, *member, visitor);
        }
        ExprKind::Index { base, index } => {
            walk_expr(arena, *base, visitor);
            walk_expr(arena, *index, visitor);
        }
        ExprKind::InitList(items) => {
            for &i in items {
                walk_expr(arena, i, visitor);
            }
        }
        ExprKind::IntLit(_)
        | ExprKind::FloatLit(_)
        | ExprKind::CharLit(_)
        | ExprKind::StringLit(_)
        | ExprKind::Bool(_)
        | ExprKind::Nullptr
        | ExprKind::This
        | ExprKind::Throw(None)
        | ExprKind::Problem(_) => {}
    }
}

/// Visit a name, then any expressions and names in its template arguments.
pub fn walk_name<V: AstVisitor + ?Sized>(arena: &AstArena, id: NameId, visitor: &mut V) {
    let name = arena.name(id);
    visitor.visit_name(id, name);
    for seg in name.segments() {
        for arg in seg.template_args.iter().flatten() {
            match arg {
                TemplateArg::Type(ty) => walk_type(arena, ty, visitor),
                TemplateArg::Expr(e) => walk_expr(arena, *e, visitor),
            }
        }
    }
}

pub fn walk_type<V: AstVisitor + ?Sized>(arena: &AstArena, ty: &TypeSpec, visitor: &mut V) {
    match ty.base {
        BaseType::Named(name) => walk_name(arena, name, visitor),
        BaseType::Inline(decl) => walk_decl(arena, decl, visitor),
        BaseType::Builtin(_) | BaseType::Auto | BaseType::Error => {}
    }
    for op in &ty.ops {
        if let TypeOp::Array(Some(size)) = op {
            walk_expr(arena, *size, visitor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ClassDecl, ClassKey, Decl, NameNode, NamespaceDecl};
    use crate::{FileId, Name, Span};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        prune_classes: bool,
    }

    impl AstVisitor for Recorder {
        fn visit_decl(&mut self, id: DeclId, decl: &Decl) -> VisitAction {
            self.events.push(format!("visit {}", id.raw()));
            if self.prune_classes && matches!(decl.kind, DeclKind::Class(_)) {
                VisitAction::Prune
            } else {
                VisitAction::Descend
            }
        }

        fn leave_decl(&mut self, id: DeclId, _decl: &Decl) {
            self.events.push(format!("leave {}", id.raw()));
        }

        fn visit_name(&mut self, id: NameId, _name: &NameNode) {
            self.events.push(format!("name {}", id.raw()));
        }
    }

    fn tree() -> TranslationUnit {
        let mut tu = TranslationUnit::default();
        let arena = &mut tu.arena;
        let field = arena.alloc_decl(Decl {
            kind: DeclKind::Empty,
            span: Span::DUMMY,
            file: FileId::MAIN,
        });
        let class_name = arena.alloc_name(NameNode::simple(Name::EMPTY, Span::DUMMY, FileId::MAIN));
        let class = arena.alloc_decl(Decl {
            kind: DeclKind::Class(ClassDecl {
                key: ClassKey::Struct,
                name: Some(class_name),
                bases: Vec::new(),
                members: vec![field],
                is_definition: true,
            }),
            span: Span::DUMMY,
            file: FileId::MAIN,
        });
        let ns = arena.alloc_decl(Decl {
            kind: DeclKind::Namespace(NamespaceDecl {
                name: None,
                is_inline: false,
                body: vec![class],
            }),
            span: Span::DUMMY,
            file: FileId::MAIN,
        });
        tu.decls.push(ns);
        tu
    }

    #[test]
    fn visits_pre_and_post_order() {
        let tu = tree();
        let mut rec = Recorder::default();
        walk_translation_unit(&tu, &mut rec);
        assert_eq!(
            rec.events,
            vec!["visit 2", "visit 1", "name 0", "visit 0", "leave 0", "leave 1", "leave 2"]
        );
    }

    #[test]
    fn prune_skips_children_but_still_leaves() {
        let tu = tree();
        let mut rec = Recorder {
            prune_classes: true,
            ..Recorder::default()
        };
        walk_translation_unit(&tu, &mut rec);
        assert_eq!(rec.events, vec!["visit 2", "visit 1", "leave 1", "leave 2"]);
    }
}
