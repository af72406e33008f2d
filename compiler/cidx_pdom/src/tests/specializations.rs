use pretty_assertions::assert_eq;

use cidx_bindings::{ArgMap, BindingKind, TemplateArgument, Type};
use cidx_ir::ast::BuiltinType;
use cidx_ir::Dialect;

use super::index_text;
use crate::{Database, RecordNo, ResolutionBatch, StoredBinding};

fn template(db: &Database, name: &str) -> StoredBinding {
    db.find_bindings(Dialect::Cpp, name, false)
        .unwrap()
        .into_iter()
        .find(|b| b.kind.is_template())
        .unwrap_or_else(|| panic!("no template {name}"))
}

fn builtin(ty: BuiltinType) -> TemplateArgument<RecordNo> {
    TemplateArgument::Type(Type::Builtin(ty))
}

#[test]
fn used_instances_become_implicit_specializations() {
    let pdom = index_text(
        "template<class T> struct Box { T value; };
         Box<double> a;
         Box<double> b;
         Box<char> c;",
    );
    let db = pdom.read();
    let boxed = template(&db, "Box");
    let specs = db.specializations(boxed.record).unwrap();
    assert_eq!(specs.len(), 2);
    assert!(specs.iter().all(|s| s.implicit && s.kind == BindingKind::ClassSpecialization));
    assert!(specs.iter().all(|s| s.generic == Some(boxed.record)));
    // Only the template is reachable by name.
    assert_eq!(db.find_bindings(Dialect::Cpp, "Box", false).unwrap().len(), 1);
}

#[test]
fn implicit_members_are_seen_through_the_arguments() {
    let pdom = index_text(
        "template<class T> struct Box { T value; T* next; };
         Box<double> a;",
    );
    let db = pdom.read();
    let boxed = template(&db, "Box");
    let spec = db.specializations(boxed.record).unwrap()[0].record;
    let view = db.class_view(spec).unwrap();
    assert!(view.is_implicit_specialization());

    let mut batch = ResolutionBatch::new();
    let members = view.members(&mut batch).unwrap();
    let types: Vec<_> = members
        .iter()
        .map(|m| (m.binding.name.as_str(), m.ty.clone()))
        .collect();
    let double = Type::Builtin(BuiltinType::Double);
    assert_eq!(
        types,
        [
            ("value", Some(double.clone())),
            ("next", Some(Type::Pointer(Box::new(double)))),
        ]
    );
    assert!(members.iter().all(|m| m.specialization == Some(spec)));
    // The member itself is the template's.
    assert_eq!(members[0].binding.parent, Some(boxed.record));
    assert_eq!(batch.len(), 2);
    assert_eq!(batch.hits(), 0);

    let again = view.find("value", false, &mut batch).unwrap();
    assert_eq!(again.len(), 1);
    assert_eq!(again[0], members[0]);
    assert_eq!(batch.hits(), 1);
}

#[test]
fn explicit_specializations_keep_their_own_members() {
    let pdom = index_text(
        "template<class T> struct Box { T value; };
         template<> struct Box<int> { int special; };
         Box<int> a;",
    );
    let db = pdom.read();
    let boxed = template(&db, "Box");
    let params = db.template_params(boxed.record).unwrap();
    let args = ArgMap::from_pairs(&params, vec![builtin(BuiltinType::Int)]);
    let spec = db.specialization_of(boxed.record, &args).unwrap().unwrap();
    let stored = db.binding(spec).unwrap();
    assert!(!stored.implicit);
    assert!(stored.is_defined);

    let view = db.class_view(spec).unwrap();
    assert!(!view.is_implicit_specialization());
    let names: Vec<_> = view
        .members(&mut ResolutionBatch::new())
        .unwrap()
        .into_iter()
        .map(|m| m.binding.name)
        .collect();
    assert_eq!(names, ["special"]);
    // `Box<int> a` names the explicit specialization; no implicit one is made.
    assert!(db.specializations(boxed.record).unwrap().iter().all(|s| !s.implicit));
}

#[test]
fn specializing_on_demand_is_idempotent() {
    let pdom = index_text("template<class T> struct Pair { T first; T second; };");
    let generic = template(&pdom.read(), "Pair").record;
    let params = pdom.read().template_params(generic).unwrap();
    let args = ArgMap::from_pairs(&params, vec![builtin(BuiltinType::Long)]);

    let spec = pdom.specialize(generic, &args).unwrap();
    let count = pdom.record_count().unwrap();
    assert_eq!(pdom.specialize(generic, &args).unwrap(), spec);
    assert_eq!(pdom.record_count().unwrap(), count);
    assert_eq!(pdom.read().specialization_of(generic, &args).unwrap(), Some(spec));

    let plain = pdom
        .find_bindings(Dialect::Cpp, "first", false)
        .unwrap()
        .remove(0);
    assert!(pdom.specialize(plain.record, &ArgMap::new()).is_err());
}

#[test]
fn bases_are_substituted_and_resolved() {
    let pdom = index_text(
        "struct Root {};
         template<class T> struct Holder { T held; };
         template<class T> struct Derived : public Root, private Holder<T> {};
         Holder<int> h;
         Derived<int> d;",
    );
    let db = pdom.read();
    let root = db.find_bindings(Dialect::Cpp, "Root", false).unwrap()[0].record;
    let holder = template(&db, "Holder");
    let derived = template(&db, "Derived");
    let spec = db.specializations(derived.record).unwrap()[0].record;

    let bases = db.class_view(spec).unwrap().bases().unwrap();
    assert_eq!(bases.len(), 2);
    assert_eq!(bases[0].class, root);
    let holder_int = db.specializations(holder.record).unwrap()[0].record;
    assert_eq!(bases[1].class, holder_int);
    assert_eq!(
        bases[1].ty,
        Type::Instance {
            template: holder.record,
            args: vec![builtin(BuiltinType::Int)],
        }
    );
}

#[test]
fn function_templates_record_their_parameters() {
    let pdom = index_text(
        "template<class T, class U> T scale(T value, U by) { return value * by; }
         double twice = scale(1.5, 2);",
    );
    let db = pdom.read();
    let scale = template(&db, "scale");
    assert_eq!(scale.kind, BindingKind::FunctionTemplate);
    let params: Vec<_> = scale
        .template_params
        .iter()
        .map(|&p| db.binding(p).unwrap())
        .map(|p| (p.name, p.position))
        .collect();
    assert_eq!(params, [("T".to_owned(), 0), ("U".to_owned(), 1)]);
    assert!(!db.references(scale.record).unwrap().is_empty());
    // Parameters are not stored, only the template's own parameters.
    assert!(db.find_bindings(Dialect::Cpp, "value", false).unwrap().is_empty());
}

#[test]
fn implicit_specializations_pair_arguments_with_parameters() {
    // The template's parameters are written after the variable that uses it.
    let pdom = index_text("template<class T> struct C { T m; }; C<int> c;");
    let db = pdom.read();
    let generic = template(&db, "C");
    let specs = db.specializations(generic.record).unwrap();
    assert_eq!(specs.len(), 1);
    let args = specs[0].args.clone().unwrap();
    assert_eq!(
        args,
        ArgMap::from_pairs(&generic.template_params, vec![builtin(BuiltinType::Int)])
    );

    let members = db
        .class_view(specs[0].record)
        .unwrap()
        .members(&mut ResolutionBatch::new())
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].ty, Some(Type::Builtin(BuiltinType::Int)));
}

#[test]
fn base_instances_are_specialized_with_their_class() {
    let pdom = index_text(
        "template<class T> struct Holder { T held; };
         template<class T> struct Derived : public Holder<T> {};
         Derived<int> d;",
    );
    let db = pdom.read();
    let holder = template(&db, "Holder");
    let derived = template(&db, "Derived");
    let spec = db.specializations(derived.record).unwrap()[0].record;

    let holder_specs = db.specializations(holder.record).unwrap();
    assert_eq!(holder_specs.len(), 1);
    assert!(holder_specs[0].implicit);

    let bases = db.class_view(spec).unwrap().bases().unwrap();
    assert_eq!(bases.len(), 1);
    assert_eq!(bases[0].class, holder_specs[0].record);

    let held = db
        .class_view(bases[0].class)
        .unwrap()
        .find("held", false, &mut ResolutionBatch::new())
        .unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].ty, Some(Type::Builtin(BuiltinType::Int)));
}

#[test]
fn dependent_bases_of_a_template_name_the_base_template() {
    let pdom = index_text(
        "template<class T> struct Base { T item; };
         template<class T> struct C : Base<T> {};",
    );
    let db = pdom.read();
    let base = template(&db, "Base");
    let generic = template(&db, "C");
    let bases = db.class_view(generic.record).unwrap().bases().unwrap();
    assert_eq!(bases.len(), 1);
    assert_eq!(bases[0].class, base.record);
    assert!(bases[0].ty.is_dependent());
}
