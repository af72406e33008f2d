#![allow(clippy::unwrap_used, clippy::expect_used)]

use cidx_ir::ast::{BuiltinType, CvQualifiers};
use pretty_assertions::assert_eq;

use super::*;

/// Classes 1 (base) and 2 (derived from 1); class 3 converts from `int`;
/// 4 is an unscoped enum.
struct Hierarchy;

impl ConversionContext for Hierarchy {
    fn is_base_of(&self, base: BindingId, derived: BindingId) -> bool {
        base == derived || (base.raw() == 1 && derived.raw() == 2)
    }

    fn converting_constructors(&self, class: BindingId) -> Vec<Type<BindingId>> {
        if class.raw() == 3 {
            vec![builtin(BuiltinType::Int)]
        } else {
            Vec::new()
        }
    }

    fn is_unscoped_enum(&self, binding: BindingId) -> bool {
        binding.raw() == 4
    }
}

fn builtin(ty: BuiltinType) -> Type<BindingId> {
    Type::Builtin(ty)
}

fn class(raw: u32) -> Type<BindingId> {
    Type::Named(BindingId::new(raw))
}

fn value(ty: Type<BindingId>) -> Argument {
    Argument::new(ty, false)
}

fn lvalue(ty: Type<BindingId>) -> Argument {
    Argument::new(ty, true)
}

fn candidate(id: u32, params: Vec<Type<BindingId>>) -> Candidate {
    Candidate {
        binding: BindingId::new(id),
        required: params.len(),
        params,
        variadic: false,
        from_template: false,
    }
}

fn rank_of(arg: &Argument, param: &Type<BindingId>) -> Option<ConversionRank> {
    rank(&Hierarchy, arg, param)
}

#[test]
fn ranks_arithmetic_conversions() {
    let int = builtin(BuiltinType::Int);
    assert_eq!(rank_of(&value(int.clone()), &int), Some(ConversionRank::Exact));
    assert_eq!(
        rank_of(&value(builtin(BuiltinType::Char)), &int),
        Some(ConversionRank::Promotion)
    );
    assert_eq!(
        rank_of(&value(builtin(BuiltinType::Float)), &builtin(BuiltinType::Double)),
        Some(ConversionRank::Promotion)
    );
    assert_eq!(
        rank_of(&value(int.clone()), &builtin(BuiltinType::Double)),
        Some(ConversionRank::Standard)
    );
    assert_eq!(
        rank_of(&value(builtin(BuiltinType::Long)), &int),
        Some(ConversionRank::Standard)
    );
    assert_eq!(rank_of(&value(class(1)), &int), None);
}

#[test]
fn enums_promote_to_int() {
    assert_eq!(
        rank_of(&value(class(4)), &builtin(BuiltinType::Int)),
        Some(ConversionRank::Promotion)
    );
    assert_eq!(
        rank_of(&value(class(4)), &builtin(BuiltinType::Long)),
        Some(ConversionRank::Standard)
    );
}

#[test]
fn pointer_conversions() {
    let char_ptr = builtin(BuiltinType::Char).pointer_to();
    let const_char_ptr = Type::qualified(CvQualifiers::CONST, builtin(BuiltinType::Char)).pointer_to();
    assert_eq!(
        rank_of(&value(char_ptr.clone()), &const_char_ptr),
        Some(ConversionRank::Qualification)
    );
    assert_eq!(rank_of(&value(const_char_ptr), &char_ptr), None);
    assert_eq!(
        rank_of(&value(class(2).pointer_to()), &class(1).pointer_to()),
        Some(ConversionRank::Standard)
    );
    assert_eq!(rank_of(&value(class(1).pointer_to()), &class(2).pointer_to()), None);
    assert_eq!(
        rank_of(&value(char_ptr.clone()), &builtin(BuiltinType::Void).pointer_to()),
        Some(ConversionRank::Standard)
    );
    assert_eq!(
        rank_of(&value(builtin(BuiltinType::NullPtr)), &char_ptr),
        Some(ConversionRank::Standard)
    );
    let boolean = builtin(BuiltinType::Bool);
    assert_eq!(
        rank_of(&value(builtin(BuiltinType::NullPtr)), &boolean),
        Some(ConversionRank::Standard)
    );
    assert_eq!(rank_of(&value(char_ptr.clone()), &boolean), Some(ConversionRank::Standard));
    // Arrays decay to pointers without a conversion.
    let array = Type::Array(Box::new(builtin(BuiltinType::Char)), Some(4));
    assert_eq!(rank_of(&lvalue(array), &char_ptr), Some(ConversionRank::Exact));
}

#[test]
fn reference_binding() {
    let int = builtin(BuiltinType::Int);
    let int_ref = int.clone().lvalue_ref_to();
    let const_int_ref = Type::qualified(CvQualifiers::CONST, int.clone()).lvalue_ref_to();
    assert_eq!(rank_of(&lvalue(int.clone()), &int_ref), Some(ConversionRank::Exact));
    // A temporary does not bind to a non-const lvalue reference.
    assert_eq!(rank_of(&value(int.clone()), &int_ref), None);
    assert_eq!(
        rank_of(&lvalue(int.clone()), &const_int_ref),
        Some(ConversionRank::Qualification)
    );
    assert_eq!(
        rank_of(&value(builtin(BuiltinType::Short)), &const_int_ref),
        Some(ConversionRank::Promotion)
    );
    assert_eq!(rank_of(&value(int.clone()), &int.clone().rvalue_ref_to()), Some(ConversionRank::Exact));
    assert_eq!(rank_of(&lvalue(int.clone()), &int.rvalue_ref_to()), None);
    assert_eq!(
        rank_of(&lvalue(class(2)), &class(1).lvalue_ref_to()),
        Some(ConversionRank::Standard)
    );
}

#[test]
fn user_defined_through_constructor() {
    assert_eq!(
        rank_of(&value(builtin(BuiltinType::Short)), &class(3)),
        Some(ConversionRank::UserDefined)
    );
    assert_eq!(rank_of(&value(builtin(BuiltinType::Short)), &class(1)), None);
}

#[test]
fn exact_beats_promotion() {
    let candidates = [
        candidate(10, vec![builtin(BuiltinType::Int)]),
        candidate(11, vec![builtin(BuiltinType::Char)]),
    ];
    let selection = select(&Hierarchy, &candidates, &[value(builtin(BuiltinType::Char))]);
    assert_eq!(selection, Selection::Best(BindingId::new(11)));
}

#[test]
fn promotion_beats_standard() {
    let candidates = [
        candidate(10, vec![builtin(BuiltinType::Double)]),
        candidate(11, vec![builtin(BuiltinType::Int)]),
    ];
    let selection = select(&Hierarchy, &candidates, &[value(builtin(BuiltinType::Short))]);
    assert_eq!(selection, Selection::Best(BindingId::new(11)));
}

#[test]
fn standard_beats_user_defined() {
    let candidates = [
        candidate(10, vec![class(3)]),
        candidate(11, vec![builtin(BuiltinType::Double)]),
    ];
    let selection = select(&Hierarchy, &candidates, &[value(builtin(BuiltinType::Int))]);
    assert_eq!(selection, Selection::Best(BindingId::new(11)));
}

#[test]
fn crossed_preferences_are_ambiguous() {
    let int = builtin(BuiltinType::Int);
    let double = builtin(BuiltinType::Double);
    let candidates = [
        candidate(10, vec![int.clone(), double.clone()]),
        candidate(11, vec![double.clone(), int.clone()]),
    ];
    let selection = select(&Hierarchy, &candidates, &[value(int.clone()), value(int)]);
    assert_eq!(
        selection,
        Selection::Ambiguous(vec![BindingId::new(10), BindingId::new(11)])
    );
}

#[test]
fn equal_conversions_are_ambiguous() {
    let candidates = [
        candidate(10, vec![builtin(BuiltinType::Long)]),
        candidate(11, vec![builtin(BuiltinType::Short)]),
    ];
    let selection = select(&Hierarchy, &candidates, &[value(builtin(BuiltinType::Int))]);
    assert!(matches!(selection, Selection::Ambiguous(ids) if ids.len() == 2));
}

#[test]
fn arity_and_defaults() {
    let int = builtin(BuiltinType::Int);
    let mut with_default = candidate(10, vec![int.clone(), int.clone()]);
    with_default.required = 1;
    let unary = candidate(11, vec![int.clone(), int.clone(), int.clone()]);
    let selection = select(&Hierarchy, &[with_default, unary], &[value(int)]);
    assert_eq!(selection, Selection::Best(BindingId::new(10)));
    let selection = select(&Hierarchy, &[candidate(12, Vec::new())], &[value(class(1))]);
    assert_eq!(selection, Selection::NoViable);
}

#[test]
fn ellipsis_is_worst() {
    let int = builtin(BuiltinType::Int);
    let mut printf_like = candidate(10, Vec::new());
    printf_like.variadic = true;
    let exact = candidate(11, vec![int.clone()]);
    let selection = select(&Hierarchy, &[printf_like, exact], &[value(int)]);
    assert_eq!(selection, Selection::Best(BindingId::new(11)));
}

#[test]
fn non_template_wins_ties() {
    let int = builtin(BuiltinType::Int);
    let mut generic = candidate(10, vec![int.clone()]);
    generic.from_template = true;
    let plain = candidate(11, vec![int.clone()]);
    let selection = select(&Hierarchy, &[generic, plain], &[value(int)]);
    assert_eq!(selection, Selection::Best(BindingId::new(11)));
}

#[test]
fn unknown_arguments_match_anything() {
    let candidates = [candidate(10, vec![class(1)])];
    let selection = select(&Hierarchy, &candidates, &[Argument::unknown()]);
    assert_eq!(selection, Selection::Best(BindingId::new(10)));
}
