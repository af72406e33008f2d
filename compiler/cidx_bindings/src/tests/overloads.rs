use pretty_assertions::assert_eq;

use cidx_ir::ast::BuiltinType;

use super::{bind_clean, bind_text};
use crate::{Resolution, Type};

fn builtin(b: BuiltinType) -> Type<crate::BindingId> {
    Type::Builtin(b)
}

#[test]
fn exact_match_beats_promotion_and_conversion() {
    let b = bind_clean(
        "void f(int);
         void f(double);
         void g() { f(1); f(2.0); f('c'); f(1.0f); }",
    );
    let int = b.overload("f", builtin(BuiltinType::Int));
    let double = b.overload("f", builtin(BuiltinType::Double));
    // 'c' promotes to int, 1.0f promotes to double.
    assert_eq!(b.refs(int), 2);
    assert_eq!(b.refs(double), 2);
}

#[test]
fn equally_good_conversions_are_ambiguous() {
    let b = bind_text(
        "void h(long);
         void h(short);
         void k() { h(1); }",
    );
    assert_eq!(b.codes(), vec!["S3002"]);
    for overload in b.all("h") {
        assert_eq!(b.refs(overload), 0);
    }
    let ambiguous = (0..b.unit.resolutions.len())
        .filter(|&i| matches!(b.unit.resolutions[i], Resolution::Ambiguous(_)))
        .count();
    assert_eq!(ambiguous, 1);
}

#[test]
fn no_viable_overload_is_reported() {
    let b = bind_text(
        "struct A {};
         void p(int);
         void p(double);
         void q() { A a; p(a); }",
    );
    assert_eq!(b.codes(), vec!["S3003"]);
}

#[test]
fn a_lone_function_is_referenced_even_when_arguments_do_not_fit() {
    let b = bind_clean(
        "struct A {};
         void only(int);
         void q() { A a; only(a); }",
    );
    assert_eq!(b.refs(b.get("only")), 1);
}

#[test]
fn derived_to_base_and_const_references() {
    let b = bind_clean(
        "struct Base {};
         struct Derived : Base {};
         void take(const Base&);
         void take(int);
         void run() { Derived d; take(d); take(3); }",
    );
    let all = b.all("take");
    assert_eq!(all.len(), 2);
    for overload in all {
        assert_eq!(b.refs(overload), 1);
    }
}

#[test]
fn non_template_wins_a_tie_with_a_template() {
    let b = bind_clean(
        "template<class T> void log(T value);
         void log(int value);
         void run() { log(1); log(2.5); }",
    );
    let plain = b.overload("log", builtin(BuiltinType::Int));
    let template = b
        .all("log")
        .into_iter()
        .find(|&o| o != plain)
        .unwrap();
    assert_eq!(b.refs(plain), 1);
    assert_eq!(b.refs(template), 1);
}

#[test]
fn default_arguments_make_parameters_optional() {
    let b = bind_clean(
        "void draw(int x, int y = 0);
         void draw(const char* label);
         void run() { draw(1); draw(\"hi\"); }",
    );
    assert_eq!(b.refs(b.overload("draw", builtin(BuiltinType::Int))), 1);
    assert_eq!(b.unit.binding(b.overload("draw", builtin(BuiltinType::Int))).defaults, 1);
    let label = b
        .all("draw")
        .into_iter()
        .find(|&o| b.unit.binding(o).defaults == 0)
        .unwrap();
    assert_eq!(b.refs(label), 1);
}

#[test]
fn constructors_are_recorded_as_implicit_references() {
    let b = bind_clean(
        "struct Point {
             Point();
             Point(int x, int y);
         };
         void make() {
             Point a;
             Point b(1, 2);
             Point* c = new Point(3, 4);
         }",
    );
    let default = b.with_arity("Point::Point", 0);
    let pair = b.with_arity("Point::Point", 2);
    assert_eq!(b.implicit_refs(default), 1);
    assert_eq!(b.implicit_refs(pair), 2);
    assert_eq!(b.refs(pair), 0);
}

#[test]
fn member_calls_resolve_in_the_object_class() {
    let b = bind_clean(
        "struct Stream {
             void write(int v);
             void write(const char* s);
         };
         void emit(Stream& out) { out.write(4); out.write(\"x\"); }",
    );
    for overload in b.all("Stream::write") {
        assert_eq!(b.refs(overload), 1);
    }
}

#[test]
fn return_types_flow_into_member_access() {
    let b = bind_clean(
        "struct Engine { int power; };
         struct Car { Engine& engine(); };
         int check(Car* car) { return car->engine().power; }",
    );
    assert_eq!(b.refs(b.get("Engine::power")), 1);
    assert_eq!(b.refs(b.get("Car::engine")), 1);
}

#[test]
fn converting_constructors_allow_user_conversions() {
    let b = bind_clean(
        "struct Name { Name(const char* s); };
         void greet(Name n);
         void run() { greet(\"world\"); }",
    );
    assert_eq!(b.refs(b.get("greet")), 1);
}
