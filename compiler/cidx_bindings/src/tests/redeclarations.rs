use pretty_assertions::assert_eq;

use cidx_ir::Dialect;

use super::{bind_c, bind_clean, bind_text};
use crate::BindingKind;

#[test]
fn declaration_and_definition_share_a_binding() {
    let b = bind_clean(
        "int area(int w, int h);
         int area(int w, int h) { return w * h; }",
    );
    let area = b.get("area");
    assert!(b.unit.binding(area).is_defined);
    let definitions: Vec<bool> = b.unit.declarations_of(area).map(|d| d.is_definition).collect();
    assert_eq!(definitions, vec![false, true]);
}

#[test]
fn out_of_line_members_join_their_class() {
    let b = bind_clean(
        "namespace geo {
             struct Shape {
                 double size() const;
                 double scale;
             };
         }
         double geo::Shape::size() const { return scale * 2; }",
    );
    let size = b.get("geo::Shape::size");
    assert_eq!(b.unit.binding(size).kind, BindingKind::Method);
    assert!(b.unit.binding(size).is_defined);
    assert_eq!(b.unit.binding(size).owner, Some(b.get("geo::Shape")));
    assert_eq!(b.refs(b.get("geo::Shape::scale")), 1);
    // The qualifier names the namespace and the class.
    assert_eq!(b.refs(b.get("geo")), 1);
    assert_eq!(b.refs(b.get("geo::Shape")), 1);
}

#[test]
fn a_name_cannot_change_kind() {
    let b = bind_text(
        "int value;
         void value();",
    );
    assert_eq!(b.codes(), vec!["S3006"]);
    assert_eq!(b.all("value").len(), 1);
    assert_eq!(b.kind("value"), BindingKind::Variable);
}

#[test]
fn qualified_declaration_needs_an_earlier_one() {
    let b = bind_text(
        "namespace n {}
         void n::missing() {}",
    );
    assert_eq!(b.codes(), vec!["S3001"]);
    assert!(b.all("n::missing").is_empty());
}

#[test]
fn namespaces_reopen() {
    let b = bind_clean(
        "namespace io { int a; }
         namespace io { int b; }",
    );
    assert_eq!(b.all("io").len(), 1);
    let io = b.get("io");
    assert_eq!(b.unit.binding(b.get("io::a")).owner, Some(io));
    assert_eq!(b.unit.binding(b.get("io::b")).owner, Some(io));
    assert_eq!(b.unit.declarations_of(io).count(), 2);
}

#[test]
fn c_redeclarations_merge_by_name() {
    let b = bind_c(
        "int twice(int x);
         int twice(int x) { return x * 2; }
         int use(void) { return twice(4); }",
    );
    assert!(b.unit.problems.is_empty(), "{:?}", b.unit.problems);
    let twice = b.get("twice");
    assert_eq!(b.refs(twice), 1);
    assert_eq!(b.unit.binding(twice).linkage, Dialect::C);
}

#[test]
fn extern_c_gives_functions_c_linkage() {
    let b = bind_clean(
        "extern \"C\" {
             int c_api(int);
             struct Opaque;
         }
         int cpp_api(int);",
    );
    assert_eq!(b.unit.binding(b.get("c_api")).linkage, Dialect::C);
    assert_eq!(b.unit.binding(b.get("Opaque")).linkage, Dialect::Cpp);
    assert_eq!(b.unit.binding(b.get("cpp_api")).linkage, Dialect::Cpp);
}

#[test]
fn forward_declared_classes_are_completed() {
    let b = bind_clean(
        "struct Later;
         Later* first;
         struct Later { int x; };",
    );
    let later = b.get("Later");
    assert!(b.unit.binding(later).is_defined);
    assert_eq!(b.unit.declarations_of(later).count(), 2);
    assert_eq!(b.refs(later), 1);
}

#[test]
fn typedef_of_a_tag_is_one_entity() {
    let b = bind_clean(
        "typedef struct Node { int id; } Node;
         Node* head;
         int f() { return head->id; }",
    );
    assert_eq!(b.all("Node").len(), 2);
    let id = b.named("id");
    assert_eq!(id.len(), 1);
    assert_eq!(b.refs(id[0]), 1);
}

#[test]
fn overloads_with_different_signatures_stay_separate() {
    let b = bind_clean(
        "void put(int);
         void put(char);
         void put(int) {}",
    );
    assert_eq!(b.all("put").len(), 2);
    let defined = b
        .all("put")
        .into_iter()
        .filter(|&p| b.unit.binding(p).is_defined)
        .count();
    assert_eq!(defined, 1);
}
