//! Namespaces, classes, functions, templates and `using`.

use cidx_ir::ast::{
    Access, BaseType, BuiltinType, ClassKey, DeclKind, DeclSpecifiers, FunctionBody, Initializer,
    TemplateParamKind, TypeOp,
};
use pretty_assertions::assert_eq;

use super::{parse_clean, parse_mode};
use crate::ParseMode;

#[test]
fn namespace_with_variable() {
    let p = parse_clean("namespace a { int x = 1; }");
    let DeclKind::Namespace(ns) = p.top(0) else {
        panic!("expected namespace");
    };
    assert_eq!(p.name(ns.name.unwrap()), "a");
    assert!(!ns.is_inline);
    assert_eq!(ns.body.len(), 1);
    let DeclKind::Variable(var) = &p.decl(ns.body[0]).kind else {
        panic!("expected variable");
    };
    assert_eq!(p.name(var.name), "x");
    assert_eq!(var.ty.base, BaseType::Builtin(BuiltinType::Int));
    assert!(matches!(var.init, Some(Initializer::Assign(_))));
}

#[test]
fn nested_namespace_definition() {
    let p = parse_clean("namespace a::b { void f(); }");
    let DeclKind::Namespace(outer) = p.top(0) else {
        panic!("expected namespace");
    };
    assert_eq!(p.name(outer.name.unwrap()), "a");
    let DeclKind::Namespace(inner) = &p.decl(outer.body[0]).kind else {
        panic!("expected nested namespace");
    };
    assert_eq!(p.name(inner.name.unwrap()), "b");
    assert_eq!(inner.body.len(), 1);
}

#[test]
fn anonymous_and_inline_namespaces() {
    let p = parse_clean("namespace { int hidden; } inline namespace v1 { int x; }");
    let DeclKind::Namespace(anon) = p.top(0) else {
        panic!("expected namespace");
    };
    assert!(anon.name.is_none());
    let DeclKind::Namespace(v1) = p.top(1) else {
        panic!("expected namespace");
    };
    assert!(v1.is_inline);
}

#[test]
fn namespace_alias() {
    let p = parse_clean("namespace fs = std::filesystem;");
    let DeclKind::Alias { name, ty } = p.top(0) else {
        panic!("expected alias");
    };
    assert_eq!(p.name(*name), "fs");
    let BaseType::Named(target) = ty.base else {
        panic!("alias target should be a name");
    };
    assert_eq!(p.name(target), "std::filesystem");
}

#[test]
fn function_definition_and_declaration() {
    let p = parse_clean("int add(int a, int b) { return a + b; }\nvoid log(const char* fmt, ...);");
    let add = p.function(0);
    assert_eq!(p.name(add.name), "add");
    assert_eq!(add.params.len(), 2);
    assert_eq!(p.name(add.params[1].name.unwrap()), "b");
    assert!(matches!(add.body, FunctionBody::Parsed(_)));
    assert_eq!(add.ret.as_ref().unwrap().base, BaseType::Builtin(BuiltinType::Int));

    let log = p.function(1);
    assert!(log.variadic);
    assert_eq!(log.body, FunctionBody::None);
    let fmt = &log.params[0].ty;
    assert!(fmt.cv.is_const);
    assert_eq!(fmt.base, BaseType::Builtin(BuiltinType::Char));
    assert!(matches!(fmt.ops.as_slice(), [TypeOp::Pointer(_)]));
}

#[test]
fn void_parameter_list_is_empty() {
    let p = parse_clean("int main(void);");
    assert!(p.function(0).params.is_empty());
}

#[test]
fn class_with_members() {
    let p = parse_clean(
        "class C : public B, virtual private D {\n\
         public:\n\
           C();\n\
           ~C();\n\
           int get() const;\n\
           static int count;\n\
         };",
    );
    let DeclKind::Class(class) = p.top(0) else {
        panic!("expected class");
    };
    assert_eq!(class.key, ClassKey::Class);
    assert!(class.is_definition);
    assert_eq!(p.name(class.name.unwrap()), "C");
    assert_eq!(class.bases.len(), 2);
    assert_eq!(class.bases[0].access, Some(Access::Public));
    assert!(class.bases[1].is_virtual);
    assert_eq!(p.name(class.bases[1].name), "D");

    let kinds: Vec<_> = class.members.iter().map(|&m| &p.decl(m).kind).collect();
    assert!(matches!(kinds[0], DeclKind::Access(Access::Public)));
    let DeclKind::Function(ctor) = kinds[1] else {
        panic!("expected constructor");
    };
    assert!(ctor.ret.is_none());
    assert_eq!(p.name(ctor.name), "C");
    let DeclKind::Function(dtor) = kinds[2] else {
        panic!("expected destructor");
    };
    assert_eq!(p.name(dtor.name), "~C");
    let DeclKind::Function(get) = kinds[3] else {
        panic!("expected member function");
    };
    assert!(get.cv.is_const);
    let DeclKind::Variable(count) = kinds[4] else {
        panic!("expected static member");
    };
    assert!(count.specifiers.contains(DeclSpecifiers::STATIC));
}

#[test]
fn out_of_line_members() {
    let p = parse_clean("int C::get() const { return v; }\nC::C() : v(0), B{1} {}\nC::~C() {}");
    assert_eq!(p.name(p.function(0).name), "C::get");
    let ctor = p.function(1);
    assert!(ctor.ret.is_none());
    assert_eq!(ctor.inits.len(), 2);
    assert_eq!(p.name(ctor.inits[0].name), "v");
    assert_eq!(p.name(p.function(2).name), "C::~C");
}

#[test]
fn special_member_bodies() {
    let p = parse_clean(
        "struct N {\n\
           N(const N&) = delete;\n\
           N() = default;\n\
           virtual void run() = 0;\n\
           operator bool() const;\n\
           bool operator==(const N& other) const;\n\
         };",
    );
    let DeclKind::Class(class) = p.top(0) else {
        panic!("expected struct");
    };
    assert_eq!(class.key, ClassKey::Struct);
    let bodies: Vec<_> = class
        .members
        .iter()
        .map(|&m| match &p.decl(m).kind {
            DeclKind::Function(f) => f.body,
            other => panic!("expected function, found {other:?}"),
        })
        .collect();
    assert_eq!(
        &bodies[..3],
        &[FunctionBody::Deleted, FunctionBody::Defaulted, FunctionBody::Pure]
    );
    let DeclKind::Function(conversion) = &p.decl(class.members[3]).kind else {
        unreachable!();
    };
    assert!(conversion.ret.is_none());
    assert!(p.name(conversion.name).contains("bool"));
    let DeclKind::Function(eq) = &p.decl(class.members[4]).kind else {
        unreachable!();
    };
    assert_eq!(p.name(eq.name), "operator==");
}

#[test]
fn bit_fields() {
    let p = parse_clean("struct Flags { unsigned a : 1; unsigned : 2; unsigned b : 3; };");
    let DeclKind::Class(class) = p.top(0) else {
        panic!("expected struct");
    };
    assert_eq!(class.members.len(), 3);
    let DeclKind::Variable(a) = &p.decl(class.members[0]).kind else {
        panic!("expected field");
    };
    assert!(a.bits.is_some());
    assert_eq!(a.ty.base, BaseType::Builtin(BuiltinType::UnsignedInt));
    assert!(matches!(p.decl(class.members[1]).kind, DeclKind::Empty));
}

#[test]
fn scoped_enum() {
    let p = parse_clean("enum class Color : unsigned char { Red, Green = 2, };");
    let DeclKind::Enum(e) = p.top(0) else {
        panic!("expected enum");
    };
    assert!(e.scoped);
    assert!(e.is_definition);
    assert_eq!(
        e.underlying.as_ref().unwrap().base,
        BaseType::Builtin(BuiltinType::UnsignedChar)
    );
    assert_eq!(e.enumerators.len(), 2);
    assert_eq!(p.name(e.enumerators[1].name), "Green");
    assert!(e.enumerators[1].value.is_some());
}

#[test]
fn typedefs() {
    let p = parse_clean("typedef unsigned long size_type;\ntypedef struct node { int v; } node_t, *node_ptr;");
    let DeclKind::Typedef { name, ty } = p.top(0) else {
        panic!("expected typedef");
    };
    assert_eq!(p.name(*name), "size_type");
    assert_eq!(ty.base, BaseType::Builtin(BuiltinType::UnsignedLong));

    // The struct is emitted once, ahead of both typedefs.
    assert!(matches!(p.top(1), DeclKind::Class(_)));
    let DeclKind::Typedef { ty, .. } = p.top(2) else {
        panic!("expected typedef");
    };
    assert!(matches!(ty.base, BaseType::Inline(tag) if tag == p.decls()[1]));
    let DeclKind::Typedef { name, ty } = p.top(3) else {
        panic!("expected typedef");
    };
    assert_eq!(p.name(*name), "node_ptr");
    assert_eq!(ty.ops.len(), 1);
}

#[test]
fn inline_tag_with_variables() {
    let p = parse_clean("struct P { int x; } p, *q;\nstruct Q *r;\nstruct R;");
    assert_eq!(p.decls().len(), 5);
    let tag = p.decls()[0];
    let DeclKind::Variable(pv) = p.top(1) else {
        panic!("expected variable");
    };
    assert_eq!(pv.ty.base, BaseType::Inline(tag));
    let DeclKind::Variable(qv) = p.top(2) else {
        panic!("expected variable");
    };
    assert!(matches!(qv.ty.ops.as_slice(), [TypeOp::Pointer(_)]));

    // Elaborated type: no sibling, the variable refers to a non-definition.
    let DeclKind::Variable(rv) = p.top(3) else {
        panic!("expected variable");
    };
    let BaseType::Inline(q) = rv.ty.base else {
        panic!("expected inline tag");
    };
    assert!(matches!(&p.decl(q).kind, DeclKind::Class(c) if !c.is_definition));

    let DeclKind::Class(forward) = p.top(4) else {
        panic!("expected forward declaration");
    };
    assert!(!forward.is_definition);
}

#[test]
fn function_pointer_variable() {
    let p = parse_clean("int (*handler)(int, char**);");
    let DeclKind::Variable(var) = p.top(0) else {
        panic!("expected variable");
    };
    assert_eq!(p.name(var.name), "handler");
    assert!(matches!(var.ty.ops.as_slice(), [TypeOp::Pointer(_)]));
}

#[test]
fn arrays_and_references() {
    let p = parse_clean("int grid[3][4];\nint& ref = grid[0][0];\nint&& tmp = 1;");
    let DeclKind::Variable(grid) = p.top(0) else {
        panic!("expected variable");
    };
    assert!(matches!(
        grid.ty.ops.as_slice(),
        [TypeOp::Array(Some(_)), TypeOp::Array(Some(_))]
    ));
    let DeclKind::Variable(r) = p.top(1) else {
        panic!("expected variable");
    };
    assert_eq!(r.ty.ops, vec![TypeOp::LValueRef]);
    let DeclKind::Variable(t) = p.top(2) else {
        panic!("expected variable");
    };
    assert_eq!(t.ty.ops, vec![TypeOp::RValueRef]);
}

#[test]
fn class_template() {
    let p = parse_clean("template <typename T, int N = 4, template <class> class C> class Box { T value; };");
    let DeclKind::Template(template) = p.top(0) else {
        panic!("expected template");
    };
    assert_eq!(template.params.len(), 3);
    assert_eq!(p.name(template.params[0].name.unwrap()), "T");
    assert!(matches!(template.params[0].kind, TemplateParamKind::Type { default: None }));
    assert!(matches!(
        template.params[1].kind,
        TemplateParamKind::NonType { default: Some(_), .. }
    ));
    assert!(matches!(template.params[2].kind, TemplateParamKind::Type { .. }));
    assert!(!template.is_explicit_specialization());
    assert!(matches!(p.decl(template.decl).kind, DeclKind::Class(_)));
}

#[test]
fn function_template_with_nested_template_ids() {
    let p = parse_clean("template <class T> vector<vector<T>> wrap(const T& value);");
    let DeclKind::Template(template) = p.top(0) else {
        panic!("expected template");
    };
    let DeclKind::Function(f) = &p.decl(template.decl).kind else {
        panic!("expected function");
    };
    let BaseType::Named(ret) = f.ret.as_ref().unwrap().base else {
        panic!("expected named return type");
    };
    let node = p.result.unit.arena.name(ret);
    assert!(node.last.is_template_id());
}

#[test]
fn explicit_specialization_and_instantiation() {
    let p = parse_clean("template <> class Box<int> { int value; };\ntemplate class Box<long>;");
    let DeclKind::Template(spec) = p.top(0) else {
        panic!("expected template");
    };
    assert!(spec.is_explicit_specialization());
    let DeclKind::Class(class) = &p.decl(spec.decl).kind else {
        panic!("expected class");
    };
    let name = p.result.unit.arena.name(class.name.unwrap());
    assert!(name.last.is_template_id());

    let DeclKind::ExplicitInstantiation(inner) = p.top(1) else {
        panic!("expected explicit instantiation");
    };
    assert!(matches!(&p.decl(*inner).kind, DeclKind::Class(c) if !c.is_definition));
}

#[test]
fn using_forms() {
    let p = parse_clean("using namespace std;\nusing Int = int;\nusing std::vector;");
    let DeclKind::UsingDirective(ns) = p.top(0) else {
        panic!("expected using directive");
    };
    assert_eq!(p.name(*ns), "std");
    let DeclKind::Alias { name, ty } = p.top(1) else {
        panic!("expected alias");
    };
    assert_eq!(p.name(*name), "Int");
    assert_eq!(ty.base, BaseType::Builtin(BuiltinType::Int));
    let DeclKind::UsingDeclaration(used) = p.top(2) else {
        panic!("expected using declaration");
    };
    assert_eq!(p.name(*used), "std::vector");
}

#[test]
fn extern_c_block() {
    let p = parse_clean("extern \"C\" { int puts(const char* s); }\nextern \"C\" int abs(int);");
    let DeclKind::LinkageSpec { language, body } = p.top(0) else {
        panic!("expected linkage specification");
    };
    assert_eq!(p.interner.lookup(*language), "C");
    let DeclKind::Function(puts) = &p.decl(body[0]).kind else {
        panic!("expected function");
    };
    assert!(puts.specifiers.contains(DeclSpecifiers::EXTERN_C));
    assert!(matches!(p.top(1), DeclKind::LinkageSpec { .. }));
}

#[test]
fn friend_class_is_empty() {
    let p = parse_clean("class A { friend class B; friend void swap(A&, A&); };");
    let DeclKind::Class(class) = p.top(0) else {
        panic!("expected class");
    };
    assert!(matches!(p.decl(class.members[0]).kind, DeclKind::Empty));
    let DeclKind::Function(swap) = &p.decl(class.members[1]).kind else {
        panic!("expected friend function");
    };
    assert!(swap.specifiers.contains(DeclSpecifiers::FRIEND));
}

#[test]
fn specifiers_by_identifier_text() {
    let p = parse_clean("constexpr int k = 3;\nstatic inline int f() noexcept { return k; }\nauto g() -> int;");
    let DeclKind::Variable(k) = p.top(0) else {
        panic!("expected variable");
    };
    assert!(k.specifiers.contains(DeclSpecifiers::CONSTEXPR));
    let f = p.function(1);
    assert!(f.specifiers.contains(DeclSpecifiers::STATIC | DeclSpecifiers::INLINE));
    let g = p.function(2);
    assert_eq!(g.ret.as_ref().unwrap().base, BaseType::Builtin(BuiltinType::Int));
}

#[test]
fn attributes_are_skipped() {
    let p = parse_clean("[[nodiscard]] int f();\n__attribute__((unused)) static int x;\nstruct alignas(8) S {};");
    assert_eq!(p.decls().len(), 3);
}

#[test]
fn structural_mode_skips_bodies() {
    let p = parse_mode("int f() { this is not C++ at all; }\nint g();", ParseMode::Structural);
    assert!(p.result.problems.is_empty());
    assert!(matches!(p.function(0).body, FunctionBody::Skipped(_)));
    assert_eq!(p.name(p.function(1).name), "g");
}
