//! Pass 1: declarations.

use cidx_diagnostic::ErrorCode;
use cidx_ir::ast::{
    BaseSpec, BaseType, BuiltinType, ClassDecl, ClassKey, DeclId, DeclKind, DeclSpecifiers,
    EnumDecl, FunctionBody, FunctionDecl, Initializer, NameId, NameSegment, NamespaceDecl, SegmentKind,
    TemplateDecl, TemplateParamKind, TypeSpec, VariableDecl,
};
use cidx_ir::{Dialect, Name};

use super::lookup::{Lookup, ScopeOf};
use super::typing::deduce;
use super::{Binder, Deferred, TemplateHeader, Want};
use crate::binding::{BindingId, BindingKind, Specialization};
use crate::scope::{ScopeId, ScopeKind};
use crate::types::{ArgMap, Base, FunctionType, TemplateArgument, Type};

/// Kinds of entity that may share a name in one scope.
#[derive(Copy, Clone, Eq, PartialEq)]
enum Family {
    Namespace,
    Tag,
    Type,
    Function,
    Object,
}

fn family(kind: BindingKind) -> Family {
    match kind {
        BindingKind::Namespace => Family::Namespace,
        BindingKind::Class
        | BindingKind::ClassTemplate
        | BindingKind::ClassSpecialization
        | BindingKind::Enumeration => Family::Tag,
        BindingKind::Typedef | BindingKind::TemplateParameter => Family::Type,
        BindingKind::Function
        | BindingKind::FunctionTemplate
        | BindingKind::FunctionSpecialization
        | BindingKind::Method
        | BindingKind::Constructor => Family::Function,
        BindingKind::Field | BindingKind::Variable | BindingKind::Enumerator => Family::Object,
    }
}

/// Whether a `new` binding cannot share its name with `existing` in one
/// scope. Tags coexist with functions, objects and typedefs; overloads
/// coexist with each other.
fn conflicts(new: BindingKind, existing: BindingKind) -> bool {
    match (family(new), family(existing)) {
        (Family::Tag, Family::Tag) => new != existing,
        (Family::Tag, Family::Namespace) | (Family::Namespace, Family::Tag) => true,
        (Family::Tag, _) | (_, Family::Tag) | (Family::Function, Family::Function) => false,
        (a, b) => a != b || new != existing,
    }
}

/// Parameter type as it appears in the function's type.
fn adjust_param(ty: Type<BindingId>) -> Type<BindingId> {
    match ty.unqualified() {
        Type::Array(inner, _) => (**inner).clone().pointer_to(),
        Type::Function(_) => ty.unqualified().clone().pointer_to(),
        other => other.clone(),
    }
}

fn trailing_defaults(f: &FunctionDecl) -> u16 {
    let count = f
        .params
        .iter()
        .rev()
        .take_while(|p| p.default.is_some())
        .count();
    u16::try_from(count).unwrap_or(u16::MAX)
}

impl Binder<'_> {
    pub(crate) fn declare_all(&mut self, decls: &[DeclId]) {
        for &decl in decls {
            self.declare(decl, None);
        }
    }

    pub(super) fn declare(&mut self, id: DeclId, header: Option<&TemplateHeader>) {
        match &self.decl(id).kind {
            DeclKind::Namespace(ns) => self.declare_namespace(ns),
            DeclKind::LinkageSpec { language, body } => {
                let linkage = if self.text(*language) == "C" {
                    Dialect::C
                } else {
                    self.dialect
                };
                let saved = std::mem::replace(&mut self.linkage, linkage);
                for &decl in body {
                    self.declare(decl, None);
                }
                self.linkage = saved;
            }
            DeclKind::UsingDirective(name) => self.using_directive(*name),
            DeclKind::UsingDeclaration(name) => self.using_declaration(*name),
            DeclKind::Alias { name, ty } => self.declare_alias(*name, ty, header),
            DeclKind::Typedef { name, ty } => {
                let ty = self.type_of_spec(ty);
                self.declare_type_name(*name, ty, header);
            }
            DeclKind::Class(class) => {
                if !self.decl_bindings.contains_key(&id) {
                    self.declare_class(id, class, header, false);
                }
            }
            DeclKind::Enum(e) => {
                if !self.decl_bindings.contains_key(&id) {
                    self.declare_enum(id, e);
                }
            }
            DeclKind::Function(f) => self.declare_function(id, f, header),
            DeclKind::Variable(v) => self.declare_variable(id, v, header),
            DeclKind::Template(t) => self.declare_template(t),
            DeclKind::ExplicitInstantiation(inner) => self.explicit_instantiation(*inner),
            DeclKind::Access(access) => self.access = Some(*access),
            DeclKind::Empty | DeclKind::Problem(_) => {}
        }
    }

    // Scopes of declarations

    /// Scope a declaration of `name` belongs to: the scope its qualifier
    /// names, or the current declaration scope.
    fn declaration_target(&mut self, name: NameId) -> Option<ScopeId> {
        if !self.name_node(name).is_qualified() {
            return Some(self.decl_scope());
        }
        let scope = self.scope;
        match self.resolve_qualifier(name, scope) {
            ScopeOf::Scope(target) => Some(target),
            ScopeOf::Dependent => {
                self.mark_dependent(name);
                None
            }
            ScopeOf::None => None,
        }
    }

    fn same_signature(&self, a: &Type<BindingId>, b: &Type<BindingId>) -> bool {
        match (a, b) {
            (Type::Function(f), Type::Function(g)) => {
                f.variadic == g.variadic
                    && f.cv == g.cv
                    && f.params.len() == g.params.len()
                    && f.params
                        .iter()
                        .zip(&g.params)
                        .all(|(x, y)| self.types_equivalent(x, y))
            }
            _ => true,
        }
    }

    /// The binding an earlier declaration of the same entity created, or a
    /// new one. A qualified declaration must match an earlier one.
    fn find_or_create(
        &mut self,
        name_id: NameId,
        target: ScopeId,
        kind: BindingKind,
        signature: Option<&Type<BindingId>>,
    ) -> Option<BindingId> {
        let node = self.name_node(name_id);
        let name = self.segment_name(&node.last);
        let existing = self.scopes.local(target, name).to_vec();
        let overloads = kind.is_function() && self.dialect.is_cpp();
        let same = existing.iter().copied().find(|&b| {
            let other = self.bindings.get(b);
            other.kind == kind
                && (!overloads
                    || match (signature, &other.ty) {
                        (Some(new), Some(old)) => self.same_signature(new, old),
                        _ => true,
                    })
        });
        if same.is_some() {
            return same;
        }
        if node.is_qualified() {
            let mut candidates = existing
                .iter()
                .copied()
                .filter(|&b| family(self.bindings.get(b).kind) == family(kind));
            if let (Some(only), None) = (candidates.next(), candidates.next()) {
                return Some(only);
            }
            let spelled = self.spelled(name_id);
            self.problem(
                ErrorCode::S3001,
                name_id,
                format!("no declaration matches `{spelled}`"),
                "out-of-line declaration does not match",
            );
            return None;
        }
        let clash = existing
            .iter()
            .copied()
            .find(|&b| conflicts(kind, self.bindings.get(b).kind));
        if let Some(clash) = clash {
            let previous = self.bindings.get(clash).kind;
            let spelled = self.spelled(name_id);
            self.problem(
                ErrorCode::S3006,
                name_id,
                format!("`{spelled}` redeclared as a different kind of symbol"),
                &format!("previously declared as a {previous}"),
            );
        }
        Some(self.new_binding(kind, name, target, clash.is_none()))
    }

    /// The header of `template<class T> void A<T>::f()` belongs to `A`, not
    /// to `f`.
    fn own_header<'h>(&self, name: NameId, header: Option<&'h TemplateHeader>) -> Option<&'h TemplateHeader> {
        let node = self.name_node(name);
        header.filter(|_| !node.qualifier.iter().any(NameSegment::is_template_id))
    }

    fn adopt_header(&mut self, binding: BindingId, header: Option<&TemplateHeader>, is_definition: bool) {
        let Some(header) = header.filter(|h| !h.is_explicit()) else {
            return;
        };
        for &param in &header.params {
            self.adopt(param, binding);
        }
        let b = self.bindings.get_mut(binding);
        if b.template_params.is_empty() || is_definition {
            b.template_params.clone_from(&header.params);
        }
    }

    // Namespaces and using

    fn declare_namespace(&mut self, ns: &NamespaceDecl) {
        let parent = self.decl_scope();
        let binding = match ns.name {
            Some(name_id) => {
                let Some(binding) = self.find_or_create(name_id, parent, BindingKind::Namespace, None) else {
                    return;
                };
                self.declared(binding, name_id, true);
                binding
            }
            None => {
                // Every anonymous namespace of one scope is the same namespace.
                let existing = self.scopes.using(parent).iter().find_map(|&s| {
                    let owner = self.scopes.get(s).owner?;
                    let b = self.bindings.get(owner);
                    (b.kind == BindingKind::Namespace && b.name == Name::EMPTY).then_some(owner)
                });
                existing.unwrap_or_else(|| self.new_binding(BindingKind::Namespace, Name::EMPTY, parent, false))
            }
        };
        let scope = match self.bindings.get(binding).scope {
            Some(scope) => scope,
            None => {
                let scope = self.scopes.push(ScopeKind::Namespace, parent, Some(binding));
                self.bindings.get_mut(binding).scope = Some(scope);
                scope
            }
        };
        self.bindings.get_mut(binding).is_defined = true;
        if ns.is_inline || ns.name.is_none() {
            self.scopes.add_using(parent, scope);
        }
        let saved = self.access.take();
        self.in_scope(scope, |this| {
            for &decl in &ns.body {
                this.declare(decl, None);
            }
        });
        self.access = saved;
    }

    /// Scope a namespace name or namespace alias stands for.
    fn namespace_scope(&self, binding: BindingId) -> Option<ScopeId> {
        let b = self.bindings.get(binding);
        match b.kind {
            BindingKind::Namespace => b.scope,
            _ => b
                .ty
                .as_ref()
                .and_then(Type::class_ref)
                .and_then(|ns| self.bindings.get(ns).scope),
        }
    }

    fn using_directive(&mut self, name: NameId) {
        let scope = self.scope;
        let Some(ns) = self.resolve_single(name, scope, Want::Namespace) else {
            return;
        };
        if let Some(nominated) = self.namespace_scope(ns) {
            let target = self.decl_scope();
            if self.scopes.kind(target).takes_directives() {
                self.scopes.add_using(target, nominated);
            }
        }
    }

    /// `using ns::x;` makes every `x` found visible in the current scope.
    fn using_declaration(&mut self, name_id: NameId) {
        let scope = self.scope;
        let lookup = self.lookup_name(name_id, scope, Want::Any);
        let Lookup::Found(found) = lookup else {
            self.settle(name_id, scope, lookup);
            return;
        };
        let name = self.segment_name(&self.name_node(name_id).last);
        let target = self.decl_scope();
        for &binding in &found {
            self.scopes.add(target, name, binding);
            self.referenced(binding, name_id);
        }
    }

    // Type names

    fn declare_alias(&mut self, name: NameId, spec: &TypeSpec, header: Option<&TemplateHeader>) {
        // `namespace A = B;` is stored as an alias naming `B`.
        let namespace_shaped = spec.cv.is_empty() && spec.ops.is_empty();
        let ty = match &spec.base {
            BaseType::Named(target) if namespace_shaped => {
                let scope = self.scope;
                let lookup = self.lookup_name(*target, scope, Want::Scope);
                let dependent = matches!(lookup, Lookup::Dependent);
                match self.settle(*target, scope, lookup) {
                    Some(b) if self.bindings.get(b).kind == BindingKind::Namespace => Type::Named(b),
                    Some(b) => {
                        let args = self
                            .name_node(*target)
                            .last
                            .template_args
                            .as_ref()
                            .map(|args| self.template_arguments(args));
                        self.type_for_binding(b, args, *target)
                    }
                    None if dependent => Type::Dependent,
                    None => Type::Unknown,
                }
            }
            _ => self.type_of_spec(spec),
        };
        self.declare_type_name(name, ty, header);
    }

    fn declare_type_name(&mut self, name: NameId, ty: Type<BindingId>, header: Option<&TemplateHeader>) {
        let Some(target) = self.declaration_target(name) else {
            return;
        };
        let Some(binding) = self.find_or_create(name, target, BindingKind::Typedef, None) else {
            return;
        };
        self.bindings.get_mut(binding).ty = Some(ty);
        self.adopt_header(binding, header, true);
        self.declared(binding, name, true);
    }

    // Classes

    /// Declare a class. `elaborated` is set for `struct X` used as a type
    /// without a body, which names an existing class when there is one.
    pub(super) fn declare_class(
        &mut self,
        id: DeclId,
        class: &ClassDecl,
        header: Option<&TemplateHeader>,
        elaborated: bool,
    ) {
        let Some(name_id) = class.name else {
            let scope = self.decl_scope();
            let binding = self.new_binding(BindingKind::Class, Name::EMPTY, scope, false);
            self.bindings.get_mut(binding).class_key = Some(class.key);
            self.decl_bindings.insert(id, binding);
            self.define_class(binding, class, self.scope);
            if class.key == ClassKey::Union {
                self.inject_anonymous_members(binding, scope);
            }
            return;
        };
        let node = self.name_node(name_id);
        if elaborated {
            self.elaborated_class(id, class, name_id);
            return;
        }
        if node.last.is_template_id() {
            self.declare_class_specialization(id, class, name_id, header);
            return;
        }
        let Some(target) = self.declaration_target(name_id) else {
            return;
        };
        let header = self.own_header(name_id, header);
        let kind = if header.is_some_and(|h| !h.is_explicit()) {
            BindingKind::ClassTemplate
        } else {
            BindingKind::Class
        };
        let Some(binding) = self.find_or_create(name_id, target, kind, None) else {
            return;
        };
        self.bindings.get_mut(binding).class_key = Some(class.key);
        self.adopt_header(binding, header, class.is_definition);
        self.decl_bindings.insert(id, binding);
        self.declared(binding, name_id, class.is_definition);
        if class.is_definition {
            let parent = if node.is_qualified() { target } else { self.scope };
            self.define_class(binding, class, parent);
        }
    }

    /// `struct X* p;` refers to a visible `X`, or declares `X` in the
    /// nearest enclosing namespace or block.
    fn elaborated_class(&mut self, id: DeclId, class: &ClassDecl, name_id: NameId) {
        let node = self.name_node(name_id);
        if node.is_qualified() || node.last.is_template_id() {
            let ty = self.named_type(name_id);
            if let Some(binding) = ty.class_ref() {
                self.decl_bindings.insert(id, binding);
            }
            return;
        }
        let found = self
            .lookup_unqualified(self.scope, node.last.ident, Want::Type)
            .into_iter()
            .find(|&b| self.bindings.get(b).kind.is_class());
        if let Some(binding) = found {
            self.referenced(binding, name_id);
            self.decl_bindings.insert(id, binding);
            return;
        }
        let target = self.scopes.enclosing_namespace_or_block(self.scope);
        let binding = self.new_binding(BindingKind::Class, node.last.ident, target, true);
        self.bindings.get_mut(binding).class_key = Some(class.key);
        self.decl_bindings.insert(id, binding);
        self.declared(binding, name_id, false);
    }

    /// `template<> class X<int>` and `template<class T> class X<T*>`.
    fn declare_class_specialization(
        &mut self,
        id: DeclId,
        class: &ClassDecl,
        name_id: NameId,
        header: Option<&TemplateHeader>,
    ) {
        let Some(target) = self.declaration_target(name_id) else {
            return;
        };
        let node = self.name_node(name_id);
        let found = if node.is_qualified() {
            self.lookup_in(target, node.last.ident, Want::Type)
        } else {
            self.lookup_unqualified(self.scope, node.last.ident, Want::Type)
        };
        let Some(template) = found
            .into_iter()
            .find(|&b| self.bindings.get(b).kind == BindingKind::ClassTemplate)
        else {
            let spelled = self.spelled(name_id);
            self.problem(
                ErrorCode::S3001,
                name_id,
                format!("`{spelled}` does not specialize a class template"),
                "no class template with this name",
            );
            return;
        };
        let args = node
            .last
            .template_args
            .as_deref()
            .map(|args| self.template_arguments(args))
            .unwrap_or_default();
        let map = ArgMap::from_pairs(&self.bindings.get(template).template_params, args);
        let partial = header.is_some_and(|h| !h.is_explicit());
        let existing = self
            .bindings
            .get(template)
            .specializations
            .iter()
            .copied()
            .find(|&s| {
                let spec = self.bindings.get(s);
                spec.is_templated() == partial
                    && spec
                        .specialization
                        .as_ref()
                        .is_some_and(|sp| self.args_equivalent(&sp.args, &map))
            });
        let binding = existing.unwrap_or_else(|| {
            let name = self.bindings.get(template).name;
            let binding = self.new_binding(BindingKind::ClassSpecialization, name, target, false);
            self.bindings.get_mut(binding).specialization = Some(Specialization {
                generic: template,
                args: map,
            });
            self.bindings.get_mut(template).specializations.push(binding);
            binding
        });
        self.bindings.get_mut(binding).class_key = Some(class.key);
        self.adopt_header(binding, header, class.is_definition);
        self.decl_bindings.insert(id, binding);
        self.declared(binding, name_id, class.is_definition);
        if class.is_definition {
            let parent = if node.is_qualified() { target } else { self.scope };
            self.define_class(binding, class, parent);
        }
    }

    fn args_equivalent(&self, a: &ArgMap<BindingId>, b: &ArgMap<BindingId>) -> bool {
        a.len() == b.len()
            && a.args().zip(b.args()).all(|(x, y)| match (x, y) {
                (TemplateArgument::Type(x), TemplateArgument::Type(y)) => self.types_equivalent(x, y),
                _ => x == y,
            })
    }

    /// Open the class scope under `parent`, resolve bases and declare
    /// members.
    fn define_class(&mut self, binding: BindingId, class: &ClassDecl, parent: ScopeId) {
        let bases = class
            .bases
            .iter()
            .filter_map(|base| self.base(base, class.key))
            .collect();
        let scope = self.scopes.push(ScopeKind::Class, parent, Some(binding));
        {
            let b = self.bindings.get_mut(binding);
            b.scope = Some(scope);
            b.bases = bases;
        }
        let saved = self.access.replace(class.key.default_access());
        self.in_scope(scope, |this| {
            for &member in &class.members {
                this.declare(member, None);
            }
        });
        self.access = saved;
    }

    fn base(&mut self, base: &BaseSpec, key: ClassKey) -> Option<Base<BindingId>> {
        let ty = self.named_type(base.name);
        let access = base.access.unwrap_or(key.default_access());
        let is_class = ty
            .class_ref()
            .is_some_and(|c| self.bindings.get(c).kind.is_class());
        if is_class || ty.is_dependent() {
            return Some(Base {
                ty,
                access,
                is_virtual: base.is_virtual,
            });
        }
        // Names that did not resolve were reported by the lookup.
        if self.resolutions.get(base.name.index()).and_then(|r| r.binding()).is_some() {
            let spelled = self.spelled(base.name);
            self.problem(
                ErrorCode::S3004,
                base.name,
                format!("base `{spelled}` is not a class"),
                "expected a class name",
            );
        }
        None
    }

    /// Members of an anonymous union are members of the enclosing scope.
    fn inject_anonymous_members(&mut self, union: BindingId, scope: ScopeId) {
        let fields: Vec<(Name, BindingId)> = self
            .bindings
            .get(union)
            .members
            .iter()
            .map(|&m| (self.bindings.get(m).name, m))
            .filter(|&(name, m)| name != Name::EMPTY && self.bindings.get(m).kind == BindingKind::Field)
            .collect();
        for (name, field) in fields {
            self.scopes.add(scope, name, field);
        }
    }

    // Enumerations

    pub(super) fn declare_enum(&mut self, id: DeclId, e: &EnumDecl) {
        let (binding, visible_in) = match e.name {
            Some(name_id) => {
                let Some(target) = self.declaration_target(name_id) else {
                    return;
                };
                let Some(binding) = self.find_or_create(name_id, target, BindingKind::Enumeration, None) else {
                    return;
                };
                self.declared(binding, name_id, e.is_definition);
                (binding, target)
            }
            None => {
                let scope = self.decl_scope();
                let binding = self.new_binding(BindingKind::Enumeration, Name::EMPTY, scope, false);
                (binding, scope)
            }
        };
        self.decl_bindings.insert(id, binding);
        let underlying = e
            .underlying
            .as_ref()
            .map_or(Type::Builtin(BuiltinType::Int), |spec| self.type_of_spec(spec));
        {
            let b = self.bindings.get_mut(binding);
            b.scoped = e.scoped;
            b.ty = Some(underlying);
        }
        if !e.is_definition {
            return;
        }
        let scope = self.scopes.push(ScopeKind::Enumeration, self.scope, Some(binding));
        self.bindings.get_mut(binding).scope = Some(scope);
        let mut next = Some(0i64);
        for enumerator in &e.enumerators {
            let value = match enumerator.value {
                Some(expr) => self.in_scope(scope, |this| {
                    this.bind_expr(expr);
                    this.const_value(expr)
                }),
                None => next,
            };
            let name = self.name_node(enumerator.name).last.ident;
            let constant = self.new_binding(BindingKind::Enumerator, name, scope, true);
            if !e.scoped {
                self.scopes.add(visible_in, name, constant);
            }
            {
                let b = self.bindings.get_mut(constant);
                b.ty = Some(Type::Named(binding));
                b.value = value;
            }
            self.declared(constant, enumerator.name, true);
            next = value.and_then(|v| v.checked_add(1));
        }
    }

    // Functions

    fn declare_function(&mut self, id: DeclId, f: &FunctionDecl, header: Option<&TemplateHeader>) {
        let node = self.name_node(f.name);
        let friend = f.specifiers.contains(DeclSpecifiers::FRIEND);
        let target = if friend && !node.is_qualified() {
            self.scopes.enclosing_namespace(self.scope)
        } else {
            match self.declaration_target(f.name) {
                Some(target) => target,
                None => return,
            }
        };
        let sig_scope = if node.is_qualified() { target } else { self.scope };
        let ty = self.in_scope(sig_scope, |this| this.function_type(f));
        let header = self.own_header(f.name, header);

        let class = (self.scopes.kind(target) == ScopeKind::Class)
            .then(|| self.scopes.get(target).owner)
            .flatten();
        let is_constructor = f.ret.is_none()
            && node.last.kind == SegmentKind::Identifier
            && class.is_some_and(|c| self.bindings.get(c).name == node.last.ident);
        let specialization = node.last.is_template_id() || header.is_some_and(TemplateHeader::is_explicit);
        if specialization {
            self.declare_function_specialization(id, f, header, target, ty);
            return;
        }
        let kind = if header.is_some() {
            BindingKind::FunctionTemplate
        } else if is_constructor {
            BindingKind::Constructor
        } else if class.is_some() {
            BindingKind::Method
        } else {
            BindingKind::Function
        };
        let Some(binding) = self.find_or_create(f.name, target, kind, Some(&ty)) else {
            return;
        };
        self.record_function(binding, f, ty);
        self.adopt_header(binding, header, f.body.is_definition());
        self.declared(binding, f.name, f.body.is_definition());
        let parent = if node.is_qualified() { target } else { self.scope };
        self.open_function(id, binding, f, parent);
    }

    fn function_type(&mut self, f: &FunctionDecl) -> Type<BindingId> {
        let ret = f
            .ret
            .as_ref()
            .map_or(Type::Builtin(BuiltinType::Void), |spec| self.type_of_spec(spec));
        let params = f
            .params
            .iter()
            .map(|p| adjust_param(self.type_of_spec(&p.ty)))
            .collect();
        Type::Function(FunctionType {
            ret: Box::new(ret),
            params,
            variadic: f.variadic,
            cv: f.cv,
        })
    }

    /// Merge what this declaration says about the function into its binding.
    /// The definition's signature wins.
    fn record_function(&mut self, binding: BindingId, f: &FunctionDecl, ty: Type<BindingId>) {
        let b = self.bindings.get_mut(binding);
        if f.body.is_definition() || b.ty.is_none() {
            b.ty = Some(ty);
        }
        b.specifiers |= f.specifiers.difference(DeclSpecifiers::FRIEND);
        b.defaults = b.defaults.max(trailing_defaults(f));
    }

    /// Parameter scope of a definition or of a declaration with default
    /// arguments; its body, defaults and member initializers wait for pass 2.
    fn open_function(&mut self, id: DeclId, binding: BindingId, f: &FunctionDecl, parent: ScopeId) {
        let has_defaults = f.params.iter().any(|p| p.default.is_some());
        if !f.body.is_definition() && !has_defaults {
            return;
        }
        let scope = self.scopes.push(ScopeKind::Function, parent, Some(binding));
        if f.body.is_definition() {
            self.bindings.get_mut(binding).scope = Some(scope);
            let params = match &self.bindings.get(binding).ty {
                Some(Type::Function(sig)) => sig.params.clone(),
                _ => Vec::new(),
            };
            for (param, ty) in f.params.iter().zip(params) {
                let Some(name_id) = param.name else { continue };
                let name = self.name_node(name_id).last.ident;
                let variable = self.new_binding(BindingKind::Variable, name, scope, true);
                self.bindings.get_mut(variable).ty = Some(ty);
                self.declared(variable, name_id, true);
            }
        }
        if matches!(f.body, FunctionBody::Parsed(_)) || has_defaults || !f.inits.is_empty() {
            self.deferred.push(Deferred::Function {
                function: binding,
                decl: id,
                scope,
            });
        }
    }

    /// `template<> void f<int>(int)` or `template<> void f(int)`: find the
    /// template by its explicit arguments or by deduction from the
    /// signature.
    fn declare_function_specialization(
        &mut self,
        id: DeclId,
        f: &FunctionDecl,
        header: Option<&TemplateHeader>,
        target: ScopeId,
        ty: Type<BindingId>,
    ) {
        let node = self.name_node(f.name);
        let ident = self.segment_name(&node.last);
        let found = if node.is_qualified() {
            self.lookup_in(target, ident, Want::Any)
        } else {
            self.lookup_unqualified(self.scope, ident, Want::Any)
        };
        let explicit = node
            .last
            .template_args
            .as_deref()
            .map(|args| self.template_arguments(args));
        let Type::Function(sig) = &ty else { return };
        let matched = found
            .iter()
            .copied()
            .filter(|&b| self.bindings.get(b).kind == BindingKind::FunctionTemplate)
            .find_map(|template| {
                let t = self.bindings.get(template);
                let Some(Type::Function(generic)) = &t.ty else {
                    return None;
                };
                let mut map = explicit
                    .as_ref()
                    .map(|args| ArgMap::from_pairs(&t.template_params, args.clone()))
                    .unwrap_or_default();
                let deduced = generic.params.len() == sig.params.len()
                    && generic
                        .params
                        .iter()
                        .zip(&sig.params)
                        .all(|(p, a)| deduce(p, a, &mut map));
                let complete = t.template_params.iter().all(|&p| map.get(p).is_some());
                (deduced && complete).then(|| (template, in_param_order(&t.template_params, &map)))
            });
        let Some((template, map)) = matched else {
            let spelled = self.spelled(f.name);
            self.problem(
                ErrorCode::S3001,
                f.name,
                format!("`{spelled}` does not specialize a function template"),
                "no matching function template",
            );
            return;
        };
        let existing = self
            .bindings
            .get(template)
            .specializations
            .iter()
            .copied()
            .find(|&s| {
                self.bindings
                    .get(s)
                    .specialization
                    .as_ref()
                    .is_some_and(|sp| sp.args == map)
            });
        let binding = existing.unwrap_or_else(|| {
            let binding = self.new_binding(BindingKind::FunctionSpecialization, ident, target, false);
            self.bindings.get_mut(binding).specialization = Some(Specialization {
                generic: template,
                args: map,
            });
            self.bindings.get_mut(template).specializations.push(binding);
            binding
        });
        self.record_function(binding, f, ty);
        self.adopt_header(binding, header, f.body.is_definition());
        self.declared(binding, f.name, f.body.is_definition());
        let parent = if node.is_qualified() { target } else { self.scope };
        self.open_function(id, binding, f, parent);
    }

    // Variables

    fn declare_variable(&mut self, id: DeclId, v: &VariableDecl, header: Option<&TemplateHeader>) {
        let Some(target) = self.declaration_target(v.name) else {
            return;
        };
        let header = self.own_header(v.name, header);
        let in_class = self.scopes.kind(target) == ScopeKind::Class;
        let kind = if in_class {
            BindingKind::Field
        } else {
            BindingKind::Variable
        };
        let qualified = self.name_node(v.name).is_qualified();
        let init_scope = if qualified { target } else { self.scope };
        let is_auto = matches!(v.ty.base, BaseType::Auto);
        let deduced = match &v.init {
            Some(Initializer::Assign(e)) if is_auto => self.in_scope(init_scope, |this| this.bind_expr(*e)),
            _ => None,
        };
        let ty = self.type_of_spec_with(&v.ty, deduced.map(|value| value.ty));
        let Some(binding) = self.find_or_create(v.name, target, kind, None) else {
            return;
        };
        let is_definition = !(v.specifiers.contains(DeclSpecifiers::EXTERN) && v.init.is_none())
            && !(in_class && v.specifiers.contains(DeclSpecifiers::STATIC));
        {
            let b = self.bindings.get_mut(binding);
            if is_definition || b.ty.is_none() {
                b.ty = Some(ty);
            }
            b.specifiers |= v.specifiers;
        }
        self.adopt_header(binding, header, is_definition);
        self.declared(binding, v.name, is_definition);
        if let Some(bits) = v.bits {
            self.bind_expr(bits);
        }
        match &v.init {
            Some(Initializer::Assign(_)) if is_auto => {}
            Some(_) if in_class => self.deferred.push(Deferred::Initializer {
                variable: binding,
                decl: id,
                scope: self.scope,
            }),
            Some(init) => self.in_scope(init_scope, |this| this.bind_initializer(binding, v.name, init)),
            None if is_definition && kind == BindingKind::Variable && self.function.is_some() => {
                self.default_construct(binding, v.name);
            }
            None => {}
        }
    }

    // Templates

    fn declare_template(&mut self, t: &TemplateDecl) {
        let scope = self.scopes.push(ScopeKind::TemplateParams, self.scope, None);
        self.in_scope(scope, |this| {
            let mut params = Vec::with_capacity(t.params.len());
            for (position, param) in t.params.iter().enumerate() {
                let name = param.name.map_or(Name::EMPTY, |n| this.name_node(n).last.ident);
                let binding = this.new_binding(BindingKind::TemplateParameter, name, scope, true);
                this.bindings.get_mut(binding).position = u16::try_from(position).unwrap_or(u16::MAX);
                match &param.kind {
                    TemplateParamKind::Type { default } => {
                        if let Some(default) = default {
                            this.type_of_spec(default);
                        }
                    }
                    TemplateParamKind::NonType { ty, default } => {
                        let ty = this.type_of_spec(ty);
                        this.bindings.get_mut(binding).ty = Some(ty);
                        if let Some(default) = default {
                            this.bind_expr(*default);
                        }
                    }
                }
                if let Some(name_id) = param.name {
                    this.declared(binding, name_id, true);
                }
                params.push(binding);
            }
            this.declare(t.decl, Some(&TemplateHeader { params }));
        });
    }

    /// `template class X<int>;` references the template it instantiates.
    fn explicit_instantiation(&mut self, inner: DeclId) {
        match &self.decl(inner).kind {
            DeclKind::Class(class) => {
                if let Some(name) = class.name {
                    self.named_type(name);
                }
            }
            DeclKind::Function(f) => {
                let scope = self.scope;
                match self.lookup_name(f.name, scope, Want::Any) {
                    Lookup::Found(found) => {
                        let template = found
                            .iter()
                            .copied()
                            .find(|&b| self.bindings.get(b).kind == BindingKind::FunctionTemplate);
                        if let Some(template) = template {
                            self.referenced(template, f.name);
                        }
                    }
                    other => {
                        self.settle(f.name, scope, other);
                    }
                }
            }
            _ => {}
        }
    }
}

/// `map` rebuilt in the order of `params`, so equal bindings compare equal.
fn in_param_order(params: &[BindingId], map: &ArgMap<BindingId>) -> ArgMap<BindingId> {
    let args = params
        .iter()
        .map(|&p| map.get(p).cloned().unwrap_or(TemplateArgument::Unknown))
        .collect();
    ArgMap::from_pairs(params, args)
}
