use pretty_assertions::assert_eq;

use cidx_ir::ast::BuiltinType;

use super::{bind_clean, bind_text};
use crate::{BindingKind, TemplateArgument, Type};

#[test]
fn class_template_members_see_their_arguments() {
    let b = bind_clean(
        "template<class T> struct Box { T value; };
         Box<double> b;
         double get() { return b.value; }",
    );
    let class = b.get("Box");
    assert_eq!(b.kind("Box"), BindingKind::ClassTemplate);
    assert_eq!(b.unit.binding(class).template_params.len(), 1);
    assert_eq!(b.refs(b.get("Box::value")), 1);
    let Some(Type::Instance { template, args }) = &b.unit.binding(b.get("b")).ty else {
        panic!("expected an instance type");
    };
    assert_eq!(*template, class);
    assert_eq!(args, &vec![TemplateArgument::Type(Type::Builtin(BuiltinType::Double))]);
}

#[test]
fn explicit_specialization_is_chosen_by_arguments() {
    let b = bind_clean(
        "template<class T> struct Box { T value; };
         template<> struct Box<int> { int special; };
         Box<int> a;
         int get() { return a.special; }",
    );
    let template = b.get("Box");
    let specs = &b.unit.binding(template).specializations;
    assert_eq!(specs.len(), 1);
    let spec = specs[0];
    assert_eq!(b.unit.binding(spec).kind, BindingKind::ClassSpecialization);
    assert_eq!(b.unit.binding(b.get("a")).ty, Some(Type::Named(spec)));
    assert_eq!(b.refs(b.member(spec, "special")), 1);
    // `Box` in `Box<int> a` names the specialization.
    assert_eq!(b.refs(spec), 1);
}

#[test]
fn partial_specialization_matches_by_pattern() {
    let b = bind_clean(
        "template<class T> struct Traits { static const int plain = 0; };
         template<class T> struct Traits<T*> { static const int pointer = 1; };
         int k = Traits<char*>::pointer;",
    );
    let template = b.get("Traits");
    let partial = b.unit.binding(template).specializations[0];
    assert!(b.unit.binding(partial).is_templated());
    assert_eq!(b.refs(b.member(partial, "pointer")), 1);
}

#[test]
fn function_templates_are_deduced_from_arguments() {
    let b = bind_clean(
        "template<class T> T max_of(T a, T b) { return a > b ? a : b; }
         struct Pair { int first; };
         template<class T> T& pick(T& x) { return x; }
         int use() {
             int i = max_of(1, 2);
             double d = max_of(1.0, 2.0);
             Pair p;
             return i + pick(p).first;
         }",
    );
    assert_eq!(b.refs(b.get("max_of")), 2);
    assert_eq!(b.kind("max_of"), BindingKind::FunctionTemplate);
    // The deduced return type carries the member access.
    assert_eq!(b.refs(b.get("Pair::first")), 1);
}

#[test]
fn dependent_names_wait_for_instantiation() {
    let b = bind_text(
        "template<class T> void call(T t) {
             t.method();
             process(t);
         }
         template<class T> struct Holder : T {
             void run() { helper(); }
         };",
    );
    assert!(b.unit.problems.is_empty(), "{:?}", b.unit.problems);
}

#[test]
fn function_template_specializations() {
    let b = bind_clean(
        "template<class T> void show(T value);
         template<> void show<int>(int value);
         template<> void show(double value);
         template<> void show<int>(int value) {}",
    );
    let template = b.get("show");
    let specs = &b.unit.binding(template).specializations;
    assert_eq!(specs.len(), 2);
    for &spec in specs {
        assert_eq!(b.unit.binding(spec).kind, BindingKind::FunctionSpecialization);
    }
    let int_spec = specs[0];
    assert!(b.unit.binding(int_spec).is_defined);
    assert_eq!(b.unit.declarations_of(int_spec).count(), 2);
}

#[test]
fn template_parameters_have_positions() {
    let b = bind_clean("template<class K, int N> struct Table { K keys[N]; };");
    let params = b.unit.binding(b.get("Table")).template_params.clone();
    let positions: Vec<u16> = params.iter().map(|&p| b.unit.binding(p).position).collect();
    assert_eq!(positions, vec![0, 1]);
    assert_eq!(b.unit.binding(params[1]).ty, Some(Type::Builtin(BuiltinType::Int)));
    for param in params {
        assert_eq!(b.unit.binding(param).owner, Some(b.get("Table")));
    }
}

#[test]
fn alias_templates_substitute_their_arguments() {
    let b = bind_clean(
        "template<class T> using Ptr = T*;
         Ptr<int> p;",
    );
    let int_ptr = Type::Builtin(BuiltinType::Int).pointer_to();
    assert_eq!(b.unit.binding(b.get("p")).ty, Some(int_ptr));
}
