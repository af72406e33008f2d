//! Arena-allocated C/C++ syntax tree.
//!
//! Nodes are stored flat in an [`AstArena`] and refer to each other through
//! typed indices. Speculative parsing takes an [`ArenaMark`] and truncates back
//! to it, so only the winning interpretation stays allocated.

mod ids;
mod nodes;
mod types;

pub use ids::{DeclId, ExprId, NameId, ProblemId, StmtId};
pub use nodes::{
    BaseSpec, BinaryOp, ClassDecl, Decl, DeclKind, DeclSpecifiers, EnumDecl, Enumerator, Expr,
    ExprKind, FunctionBody, FunctionDecl, Handler, Initializer, MemberInit, NameNode, NameSegment,
    NamespaceDecl, Param, SegmentKind, Stmt, StmtKind, TemplateArg, TemplateDecl, TemplateParam,
    TemplateParamKind, UnaryOp, VariableDecl,
};
pub use types::{Access, BaseType, BuiltinType, ClassKey, CvQualifiers, TypeOp, TypeSpec};

use crate::Name;

/// Storage for every node of one translation unit.
#[derive(Clone, Debug, Default)]
pub struct AstArena {
    decls: Vec<Decl>,
    stmts: Vec<Stmt>,
    exprs: Vec<Expr>,
    names: Vec<NameNode>,
}

/// Arena lengths at a point in time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ArenaMark {
    decls: usize,
    stmts: usize,
    exprs: usize,
    names: usize,
}

fn next_id(len: usize) -> u32 {
    // Arenas beyond u32::MAX nodes cannot be produced from a u32-offset source.
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_decl(&mut self, decl: Decl) -> DeclId {
        let id = DeclId::new(next_id(self.decls.len()));
        self.decls.push(decl);
        id
    }

    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId::new(next_id(self.stmts.len()));
        self.stmts.push(stmt);
        id
    }

    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::new(next_id(self.exprs.len()));
        self.exprs.push(expr);
        id
    }

    pub fn alloc_name(&mut self, name: NameNode) -> NameId {
        let id = NameId::new(next_id(self.names.len()));
        self.names.push(name);
        id
    }

    #[inline]
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn name(&self, id: NameId) -> &NameNode {
        &self.names[id.index()]
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    /// Iterate every name node with its id.
    pub fn names(&self) -> impl Iterator<Item = (NameId, &NameNode)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (NameId::new(next_id(i)), n))
    }

    pub fn mark(&self) -> ArenaMark {
        ArenaMark {
            decls: self.decls.len(),
            stmts: self.stmts.len(),
            exprs: self.exprs.len(),
            names: self.names.len(),
        }
    }

    /// Drop every node allocated after `mark`.
    pub fn truncate(&mut self, mark: ArenaMark) {
        self.decls.truncate(mark.decls);
        self.stmts.truncate(mark.stmts);
        self.exprs.truncate(mark.exprs);
        self.names.truncate(mark.names);
    }
}

/// Syntactic context of a code-completion request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionContext {
    /// Plain identifier prefix.
    Unqualified,
    /// `a::b::pre`; holds the qualifier segments.
    Qualified { global: bool, qualifier: Vec<Name> },
    /// `obj.pre` or `obj->pre`; `object` is set when the object is a plain
    /// identifier.
    MemberAccess { object: Option<Name>, arrow: bool },
}

/// What the user is completing at the caret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionNode {
    /// Identifier text before the caret; empty when the caret follows
    /// whitespace or punctuation.
    pub prefix: String,
    pub offset: u32,
    pub context: CompletionContext,
}

/// Parsed translation unit.
#[derive(Clone, Debug, Default)]
pub struct TranslationUnit {
    pub arena: AstArena,
    /// Top-level declarations in source order.
    pub decls: Vec<DeclId>,
    /// Set by completion-mode parses that reached the caret.
    pub completion: Option<CompletionNode>,
}
