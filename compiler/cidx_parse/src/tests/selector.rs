//! Node selection by offset.

use cidx_ir::CancellationToken;
use pretty_assertions::assert_eq;

use super::{parse_clean, VecSource};
use crate::{parse, NodeSelector, ParseMode};

fn offset(text: &str, needle: &str) -> u32 {
    u32::try_from(text.find(needle).unwrap()).unwrap()
}

#[test]
fn names_enclosed_by_range() {
    let text = "int value = other + 1;";
    let p = parse_clean(text);
    let selector = NodeSelector::new(&p.result.unit);
    let names: Vec<_> = selector
        .names_in_range(0, u32::try_from(text.len()).unwrap())
        .into_iter()
        .map(|id| p.name(id))
        .collect();
    assert_eq!(names, vec!["value", "other"]);
}

#[test]
fn range_inside_a_name_selects_it() {
    let text = "int value = other + 1;";
    let p = parse_clean(text);
    let selector = NodeSelector::new(&p.result.unit);
    let start = offset(text, "other") + 1;
    let names = selector.names_in_range(start, 2);
    assert_eq!(names.len(), 1);
    assert_eq!(p.name(names[0]), "other");
}

#[test]
fn qualified_name_is_selected_whole() {
    let text = "a::b::c x;";
    let p = parse_clean(text);
    let selector = NodeSelector::new(&p.result.unit);
    let names = selector.names_in_range(offset(text, "b"), 1);
    assert_eq!(names.len(), 1);
    assert_eq!(p.name(names[0]), "a::b::c");
}

#[test]
fn name_at_offset() {
    let text = "int value = other + 1;";
    let p = parse_clean(text);
    let selector = NodeSelector::new(&p.result.unit);
    assert_eq!(p.name(selector.name_at(offset(text, "value") + 2).unwrap()), "value");
    assert!(selector.name_at(offset(text, "=")).is_none());
}

#[test]
fn macro_expansions_in_range() {
    let text = "#define TWICE(x) ((x) * 2)\nint v = TWICE(3);\nint w = 4;";
    let mut source = VecSource::new(text);
    let interner = crate::TokenSource::interner(&source);
    let result = parse(&mut source, ParseMode::Complete, &CancellationToken::new()).unwrap();
    let selector = NodeSelector::new(&result.unit);
    let map = source.location_map();

    let start = offset(text, "TWICE(3)");
    let found = selector.macro_expansions_in_range(map, start, 8);
    assert_eq!(found.len(), 1);
    assert_eq!(interner.lookup(found[0].macro_name), "TWICE");
    assert_eq!(found[0].invocation.start, start);

    let none = selector.macro_expansions_in_range(map, offset(text, "int w"), 5);
    assert!(none.is_empty());
}
