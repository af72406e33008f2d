use pretty_assertions::assert_eq;

use cidx_ir::Dialect;

use super::{bind_unit, store};
use crate::Pdom;

const UTIL: (&str, &str) = ("/src/util.h", "int helper();\nstruct Shared { int n; };\n");

fn two_units() -> Pdom {
    let pdom = Pdom::in_memory();
    let a = bind_unit(
        "/src/a.cpp",
        "#include \"util.h\"\nint only_in_a() { return helper(); }",
        &[UTIL],
    );
    let b = bind_unit(
        "/src/b.cpp",
        "#include \"util.h\"\nint only_in_b(Shared s) { return s.n + helper(); }",
        &[UTIL],
    );
    store(&pdom, &a);
    store(&pdom, &b);
    pdom
}

#[test]
fn removing_a_file_deletes_what_only_it_named() {
    let pdom = two_units();
    let deleted = pdom.remove_file("/src/a.cpp").unwrap();
    assert_eq!(deleted, Some(1));

    let db = pdom.read();
    assert!(db.find_bindings(Dialect::Cpp, "only_in_a", false).unwrap().is_empty());
    assert!(db.file("/src/a.cpp").unwrap().is_none());
    assert!(db.names_in_file("/src/a.cpp").unwrap().is_empty());

    // Still declared in the header and referenced from b.cpp.
    let helper = &db.find_bindings(Dialect::Cpp, "helper", false).unwrap()[0];
    let files: Vec<_> = db
        .names_of(helper.record)
        .unwrap()
        .into_iter()
        .map(|n| n.file)
        .collect();
    assert_eq!(files, ["/src/b.cpp", "/src/util.h"]);
    assert_eq!(db.find_bindings(Dialect::Cpp, "only_in_b", false).unwrap().len(), 1);
}

#[test]
fn removing_an_unknown_file_is_a_no_op() {
    let pdom = two_units();
    let dump = pdom.dump().unwrap();
    assert_eq!(pdom.remove_file("/src/missing.cpp").unwrap(), None);
    assert_eq!(pdom.dump().unwrap(), dump);
}

#[test]
fn no_name_survives_its_file() {
    let pdom = two_units();
    pdom.remove_file("/src/b.cpp").unwrap();
    pdom.remove_file("/src/util.h").unwrap();
    let db = pdom.read();
    for name in ["Shared", "n", "only_in_b"] {
        assert!(
            db.find_bindings(Dialect::Cpp, name, false).unwrap().is_empty(),
            "{name} outlived its files"
        );
    }
    // a.cpp still references `helper`, which keeps it alive.
    let helper = &db.find_bindings(Dialect::Cpp, "helper", false).unwrap()[0];
    assert!(db.declarations(helper.record).unwrap().is_empty());
    assert_eq!(db.references(helper.record).unwrap().len(), 1);
    let remaining: Vec<_> = db.files().unwrap().into_iter().map(|f| f.path).collect();
    assert_eq!(remaining, ["/src/a.cpp"]);
    for binding in db.find_bindings(Dialect::Cpp, "", true).unwrap() {
        for name in db.names_of(binding.record).unwrap() {
            assert_eq!(name.file, "/src/a.cpp");
        }
    }
}

#[test]
fn implicit_specializations_go_with_their_template() {
    let pdom = Pdom::in_memory();
    let unit = bind_unit(
        "/src/boxes.cpp",
        "template<class T> struct Box { T value; };
         Box<long> a;
         Box<short> b;",
        &[],
    );
    store(&pdom, &unit);
    assert!(pdom.record_count().unwrap() > 0);
    let deleted = pdom.remove_file("/src/boxes.cpp").unwrap().unwrap();
    // Box, T, value, a, b and two implicit specializations.
    assert_eq!(deleted, 7);
    assert_eq!(pdom.dump().unwrap(), "");
    assert!(pdom.files().unwrap().is_empty());
}

#[test]
fn re_storing_a_file_drops_bindings_it_no_longer_declares() {
    let pdom = Pdom::in_memory();
    store(&pdom, &bind_unit("/src/x.cpp", "int old_name(); int kept();", &[]));
    let summary = store(&pdom, &bind_unit("/src/x.cpp", "int kept();", &[]));
    assert_eq!(summary.bindings_deleted, 1);
    assert!(pdom.find_bindings(Dialect::Cpp, "old_name", false).unwrap().is_empty());
    assert_eq!(pdom.find_bindings(Dialect::Cpp, "kept", false).unwrap().len(), 1);
}
