//! End-to-end indexing of files on disk.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use cidx_bindings::BindingKind;
use cidx_index::{IndexError, Indexer, IndexerConfig, Role};
use cidx_parse::ParseMode;

const GEO_H: &str = "namespace geo {
struct Point { int x; int y; };
int area(Point p);
}
";

const A_CPP: &str = "#include \"geo.h\"
int area_a(geo::Point p) { return geo::area(p); }
";

const B_CPP: &str = "#include \"geo.h\"
int geo::area(geo::Point p) { return p.x * p.y; }
";

struct Project {
    dir: TempDir,
}

impl Project {
    fn new(files: &[(&str, &str)]) -> Project {
        let dir = tempfile::tempdir().unwrap();
        for (name, text) in files {
            std::fs::write(dir.path().join(name), text).unwrap();
        }
        Project { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn file(&self, name: &str) -> String {
        self.path(name).display().to_string()
    }

    fn config(&self, parallel: bool) -> IndexerConfig {
        IndexerConfig {
            db_path: self.path("index.pdom"),
            mode: ParseMode::Complete,
            parallel,
            jobs: Some(2),
            ..IndexerConfig::default()
        }
    }

    fn open(&self) -> Indexer {
        Indexer::open(self.config(true)).unwrap()
    }

    fn index(&self, names: &[&str]) -> Indexer {
        let indexer = self.open();
        let paths: Vec<_> = names.iter().map(|n| self.path(n)).collect();
        let summary = indexer.index(&paths).unwrap();
        assert!(summary.unreadable.is_empty());
        assert_eq!(summary.problem_count(), 0, "unexpected problems");
        indexer
    }
}

fn geo_project() -> Project {
    Project::new(&[("geo.h", GEO_H), ("a.cpp", A_CPP), ("b.cpp", B_CPP)])
}

#[test]
fn declarations_definitions_and_references_across_units() {
    let project = geo_project();
    let indexer = project.index(&["a.cpp", "b.cpp"]);

    let point = indexer.find("geo::Point").unwrap();
    assert_eq!(point.len(), 1);
    assert_eq!(point[0].kind, BindingKind::Class);
    let locations = indexer.locations(&point[0]).unwrap();
    let definition = locations
        .iter()
        .find(|l| l.role == Role::Definition)
        .unwrap();
    assert_eq!(definition.file, project.file("geo.h"));
    assert_eq!((definition.line, definition.column), (2, 8));

    let area = indexer.find("geo::area").unwrap();
    assert_eq!(area.len(), 1);
    assert!(area[0].is_defined);
    assert_eq!(area[0].ty.as_deref(), Some("int(geo::Point)"));
    let roles: Vec<_> = indexer
        .locations(&area[0])
        .unwrap()
        .into_iter()
        .map(|l| (l.file, l.role))
        .collect();
    assert_eq!(
        roles,
        [
            (project.file("a.cpp"), Role::Reference),
            (project.file("b.cpp"), Role::Definition),
            (project.file("geo.h"), Role::Declaration),
        ]
    );
}

#[test]
fn plain_and_prefix_patterns() {
    let project = geo_project();
    let indexer = project.index(&["a.cpp", "b.cpp"]);
    let names = |pattern: &str| -> Vec<String> {
        let mut names: Vec<_> = indexer
            .find(pattern)
            .unwrap()
            .into_iter()
            .map(|s| s.qualified_name)
            .collect();
        names.sort();
        names
    };
    assert_eq!(names("Point"), ["geo::Point"]);
    assert_eq!(names("geo::ar*"), ["geo::area"]);
    assert_eq!(names("area*"), ["area_a", "geo::area"]);
    assert!(names("::Point").is_empty());
}

#[test]
fn the_index_survives_reopening() {
    let project = geo_project();
    let dump = {
        let indexer = project.index(&["a.cpp", "b.cpp"]);
        indexer.pdom().dump().unwrap()
    };
    assert!(project.path("index.pdom").exists());
    let reopened = project.open();
    assert_eq!(reopened.pdom().dump().unwrap(), dump);
    assert_eq!(reopened.find("geo::Point").unwrap().len(), 1);
}

#[test]
fn indexing_again_is_stable() {
    let project = geo_project();
    let indexer = Indexer::open(project.config(false)).unwrap();
    let paths = [project.path("a.cpp"), project.path("b.cpp")];
    indexer.index(&paths).unwrap();
    let dump = indexer.pdom().dump().unwrap();
    let count = indexer.pdom().record_count().unwrap();

    let again = indexer.index(&paths).unwrap();
    let totals = again.totals();
    assert_eq!(totals.bindings_created, 0);
    assert_eq!(totals.bindings_deleted, 0);
    assert_eq!(indexer.pdom().dump().unwrap(), dump);
    assert_eq!(indexer.pdom().record_count().unwrap(), count);
}

#[test]
fn removing_a_unit_keeps_shared_symbols() {
    let project = geo_project();
    let indexer = project.index(&["a.cpp", "b.cpp"]);
    let removed = indexer.remove(&project.path("a.cpp")).unwrap();
    assert_eq!(removed, Some(1));
    assert!(indexer.find("area_a").unwrap().is_empty());
    let area = &indexer.find("geo::area").unwrap()[0];
    assert!(indexer
        .locations(area)
        .unwrap()
        .iter()
        .all(|l| l.file != project.file("a.cpp")));
    assert_eq!(indexer.remove(&project.path("a.cpp")).unwrap(), None);

    let reopened = project.open();
    assert!(reopened.find("area_a").unwrap().is_empty());
}

#[test]
fn unreadable_inputs_are_skipped() {
    let project = geo_project();
    let indexer = project.open();
    let summary = indexer
        .index(&[project.path("missing.cpp"), project.path("a.cpp")])
        .unwrap();
    assert_eq!(summary.unreadable, [project.path("missing.cpp")]);
    assert_eq!(summary.units.len(), 1);
    assert_eq!(indexer.find("area_a").unwrap().len(), 1);
}

#[test]
fn canceled_runs_store_nothing() {
    let project = geo_project();
    let indexer = project.open();
    indexer.cancel_token().cancel();
    let result = indexer.index(&[project.path("a.cpp"), project.path("b.cpp")]);
    assert!(matches!(result, Err(IndexError::Canceled)));
    assert!(indexer.pdom().files().unwrap().is_empty());
    assert!(!project.path("index.pdom").exists());
}

#[test]
fn problems_are_reported_per_unit() {
    let project = Project::new(&[("bad.cpp", "int ok;\nint broken = ;\n")]);
    let indexer = project.open();
    let summary = indexer.index(&[project.path("bad.cpp")]).unwrap();
    assert_eq!(summary.units.len(), 1);
    assert!(!summary.units[0].problems.is_empty());
    // Declarations around the error are still indexed.
    assert_eq!(indexer.find("ok").unwrap().len(), 1);
}

#[test]
fn template_members_through_a_specialization() {
    let project = Project::new(&[(
        "box.cpp",
        "struct Base {};
         template<class T> struct Box : Base { T value; T* next; };
         Box<double> b;
         double get() { return b.value; }",
    )]);
    let indexer = project.index(&["box.cpp"]);
    let template = indexer
        .find("Box")
        .unwrap()
        .into_iter()
        .find(|s| s.kind == BindingKind::ClassTemplate)
        .unwrap();
    let specs = indexer.specializations(&template).unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].qualified_name, "Box<double>");

    let members: Vec<_> = indexer
        .members(&specs[0])
        .unwrap()
        .into_iter()
        .map(|m| (m.name, m.ty))
        .collect();
    assert_eq!(
        members,
        [
            ("value".to_owned(), Some("double".to_owned())),
            ("next".to_owned(), Some("double*".to_owned())),
        ]
    );
    let bases: Vec<_> = indexer
        .bases(&specs[0])
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(bases, ["Base"]);

    let b = &indexer.find("b").unwrap()[0];
    assert_eq!(b.ty.as_deref(), Some("Box<double>"));
}
