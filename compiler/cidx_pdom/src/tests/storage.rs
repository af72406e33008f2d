use pretty_assertions::assert_eq;

use cidx_bindings::BindingKind;
use cidx_ir::{CancellationToken, Dialect};

use super::{bind_text, bind_unit, index_text, store};
use crate::{Pdom, PdomError, TuState, WriteError, VERSION};

#[test]
fn stores_namespaces_classes_and_members() {
    let pdom = index_text(
        "namespace geo {
             struct Point { int x; int y; };
             int area(Point p);
         }",
    );
    let db = pdom.read();
    let point = db.find_qualified(Dialect::Cpp, "geo::Point").unwrap();
    assert_eq!(point.len(), 1);
    assert_eq!(point[0].kind, BindingKind::Class);
    assert!(point[0].is_defined);
    let fields: Vec<_> = db
        .children(point[0].record)
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(fields, ["x", "y"]);
    assert_eq!(db.qualified_name(point[0].record).unwrap(), "geo::Point");

    let area = db.find_qualified(Dialect::Cpp, "geo::area").unwrap();
    assert_eq!(area.len(), 1);
    assert!(!area[0].is_defined);
    assert_eq!(db.declarations(area[0].record).unwrap().len(), 1);
    assert!(db.definitions(area[0].record).unwrap().is_empty());
}

#[test]
fn prefix_lookup_skips_anonymous_bindings() {
    let pdom = index_text(
        "int counter_a;
         int counter_b;
         int other;
         enum { Anon };",
    );
    let found: Vec<_> = pdom
        .find_bindings(Dialect::Cpp, "counter", true)
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(found, ["counter_a", "counter_b"]);
    let all = pdom.find_bindings(Dialect::Cpp, "", true).unwrap();
    assert!(all.iter().all(|b| !b.name.is_empty()));
}

#[test]
fn references_are_stored_with_their_sites() {
    let text = "int helper();
                int caller() { return helper() + helper(); }";
    let pdom = index_text(text);
    let db = pdom.read();
    let helper = &db.find_bindings(Dialect::Cpp, "helper", false).unwrap()[0];
    let refs = db.references(helper.record).unwrap();
    assert_eq!(refs.len(), 2);
    let second = text.rfind("helper").unwrap();
    assert_eq!(refs[1].offset as usize, second);
    assert_eq!(refs[1].length, 6);
    assert_eq!(refs[1].file, "/src/main.cpp");
}

#[test]
fn c_declarations_use_c_linkage() {
    let pdom = Pdom::in_memory();
    store(&pdom, &bind_unit("/src/lib.c", "int plain(void) { return 0; }", &[]));
    store(&pdom, &bind_text("extern \"C\" int c_api(int);\nint cpp_only(int);"));
    let names = |linkage| -> Vec<String> {
        pdom.find_bindings(linkage, "", true)
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect()
    };
    assert_eq!(names(Dialect::C), ["plain", "c_api"]);
    assert_eq!(names(Dialect::Cpp), ["cpp_only"]);
}

#[test]
fn storing_a_unit_twice_changes_nothing() {
    let unit = bind_text(
        "namespace n { template<class T> struct Box { T value; }; }
         n::Box<int> b;
         int f(int x) { return x + b.value; }",
    );
    let pdom = Pdom::in_memory();
    let first = store(&pdom, &unit);
    assert!(first.bindings_created > 0);
    let count = pdom.record_count().unwrap();
    let dump = pdom.dump().unwrap();

    let second = store(&pdom, &unit);
    assert_eq!(second.bindings_created, 0);
    assert_eq!(second.bindings_deleted, 0);
    assert_eq!(second.names_written, first.names_written);
    assert_eq!(pdom.record_count().unwrap(), count);
    assert_eq!(pdom.dump().unwrap(), dump);
}

#[test]
fn unchanged_headers_are_written_once() {
    let headers = [("/src/util.h", "int helper();\n")];
    let pdom = Pdom::in_memory();
    let a = bind_unit("/src/a.cpp", "#include \"util.h\"\nint a() { return helper(); }", &headers);
    let b = bind_unit("/src/b.cpp", "#include \"util.h\"\nint b() { return helper(); }", &headers);
    assert_eq!(store(&pdom, &a).files_skipped, 0);
    let summary = store(&pdom, &b);
    assert_eq!(summary.files_skipped, 1);
    assert_eq!(summary.files_written, 1);

    let db = pdom.read();
    let helper = &db.find_bindings(Dialect::Cpp, "helper", false).unwrap()[0];
    assert_eq!(db.declarations(helper.record).unwrap().len(), 1);
    let files: Vec<_> = db
        .references(helper.record)
        .unwrap()
        .into_iter()
        .map(|n| n.file)
        .collect();
    assert_eq!(files, ["/src/a.cpp", "/src/b.cpp"]);
    let info = db.file("/src/util.h").unwrap().unwrap();
    assert_eq!(info.state, TuState::Indexed);
}

#[test]
fn flushed_index_reopens_with_the_same_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("index.pdom");
    let pdom = Pdom::open(&path).unwrap();
    store(
        &pdom,
        &bind_text("struct S { int m; }; S make(); enum Color { Red = 2, Green };"),
    );
    pdom.flush().unwrap();
    let dump = pdom.dump().unwrap();
    assert!(dump.contains("enumerator Green [defined] = 3"), "{dump}");

    let reopened = Pdom::open(&path).unwrap();
    assert_eq!(reopened.dump().unwrap(), dump);
    assert_eq!(reopened.record_count().unwrap(), pdom.record_count().unwrap());
    assert_eq!(reopened.files().unwrap(), pdom.files().unwrap());
}

#[test]
fn a_different_format_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.pdom");
    let pdom = Pdom::open(&path).unwrap();
    store(&pdom, &bind_text("int x;"));
    pdom.flush().unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[8..12].copy_from_slice(&(VERSION + 1).to_le_bytes());
    std::fs::write(&path, &bytes).unwrap();
    match Pdom::open(&path) {
        Err(PdomError::VersionMismatch { found, expected }) => {
            assert_eq!(found, VERSION + 1);
            assert_eq!(expected, VERSION);
        }
        other => panic!("expected a version mismatch, got {other:?}"),
    }

    std::fs::write(&path, &bytes[..40]).unwrap();
    assert!(matches!(Pdom::open(&path), Err(PdomError::Corrupt(_))));
}

#[test]
fn a_canceled_write_leaves_the_index_untouched() {
    let pdom = index_text("int kept;");
    let before = pdom.read().as_bytes().to_vec();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let unit = bind_unit("/src/other.cpp", "int dropped; int kept;", &[]);
    let result = pdom.write_unit(&unit.contribution(), &cancel);
    assert!(matches!(result, Err(WriteError::Canceled)));
    assert_eq!(pdom.read().as_bytes(), &before[..]);
    assert!(!pdom.read().in_transaction());
    assert!(pdom.find_bindings(Dialect::Cpp, "dropped", false).unwrap().is_empty());
}
