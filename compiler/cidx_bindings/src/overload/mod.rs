//! Overload resolution.
//!
//! Each argument's implicit conversion to its parameter is ranked; a viable
//! candidate is best when it is at least as good as every other viable
//! candidate for every argument and strictly better for at least one. When
//! no single candidate is best the call is ambiguous and nothing is picked.

use std::cmp::Ordering;

use cidx_ir::ast::{BuiltinType, DeclSpecifiers};

use crate::binding::{BindingArena, BindingId, BindingKind};
use crate::types::Type;

/// Conversion ranks, best first.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ConversionRank {
    /// Identity, or an lvalue transformation (array or function decay).
    Exact,
    /// Adding `const`/`volatile` below a pointer or reference.
    Qualification,
    /// Integral promotion to `int`, `float` to `double`.
    Promotion,
    /// Other arithmetic, pointer and derived-to-base conversions.
    Standard,
    /// Through a converting constructor.
    UserDefined,
    /// Matched a `...` parameter.
    Ellipsis,
}

/// Facts about classes that conversions depend on.
pub trait ConversionContext {
    /// True when `base` is `derived` or one of its bases.
    fn is_base_of(&self, base: BindingId, derived: BindingId) -> bool;

    /// Parameter types of the non-explicit constructors of `class` callable
    /// with one argument.
    fn converting_constructors(&self, class: BindingId) -> Vec<Type<BindingId>>;

    /// True for an unscoped enumeration.
    fn is_unscoped_enum(&self, binding: BindingId) -> bool;
}

impl ConversionContext for BindingArena {
    fn is_base_of(&self, base: BindingId, derived: BindingId) -> bool {
        BindingArena::is_base_of(self, base, derived)
    }

    fn converting_constructors(&self, class: BindingId) -> Vec<Type<BindingId>> {
        self.get(class)
            .members
            .iter()
            .map(|&m| self.get(m))
            .filter(|m| m.kind == BindingKind::Constructor && !m.specifiers.contains(DeclSpecifiers::EXPLICIT))
            .filter_map(|m| match &m.ty {
                Some(Type::Function(sig)) if !sig.params.is_empty() && sig.params.len().saturating_sub(usize::from(m.defaults)) <= 1 => {
                    sig.params.first().cloned()
                }
                _ => None,
            })
            .collect()
    }

    fn is_unscoped_enum(&self, binding: BindingId) -> bool {
        let b = self.get(binding);
        b.kind == BindingKind::Enumeration && !b.scoped
    }
}

/// A call argument.
#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    /// `None` when the argument's type could not be determined; it then
    /// matches any parameter exactly.
    pub ty: Option<Type<BindingId>>,
    pub lvalue: bool,
}

impl Argument {
    pub fn new(ty: Type<BindingId>, lvalue: bool) -> Self {
        Argument { ty: Some(ty), lvalue }
    }

    pub fn unknown() -> Self {
        Argument { ty: None, lvalue: false }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub binding: BindingId,
    pub params: Vec<Type<BindingId>>,
    /// Parameters without default arguments.
    pub required: usize,
    pub variadic: bool,
    /// Template candidates lose ties against non-templates.
    pub from_template: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Best(BindingId),
    /// Viable candidates none of which beats all the others.
    Ambiguous(Vec<BindingId>),
    NoViable,
}

/// Rank converting `arg` to a parameter of type `param`; `None` when no
/// implicit conversion exists.
pub fn rank(ctx: &dyn ConversionContext, arg: &Argument, param: &Type<BindingId>) -> Option<ConversionRank> {
    rank_inner(ctx, arg, param, true)
}

fn rank_inner(
    ctx: &dyn ConversionContext,
    arg: &Argument,
    param: &Type<BindingId>,
    allow_user: bool,
) -> Option<ConversionRank> {
    let Some(arg_ty) = &arg.ty else {
        return Some(ConversionRank::Exact);
    };
    if param.is_dependent() || matches!(param, Type::Unknown) || arg_ty.is_dependent() {
        return Some(ConversionRank::Exact);
    }
    let arg_ty = arg_ty.non_reference();
    match param {
        Type::LValueRef(target) | Type::RValueRef(target) => {
            let is_lvalue_ref = matches!(param, Type::LValueRef(_));
            let (target_cv, target_bare) = target.split_cv();
            let (arg_cv, arg_bare) = arg_ty.split_cv();
            if arg_bare == target_bare {
                if is_lvalue_ref && !arg.lvalue && !target_cv.is_const {
                    return None;
                }
                if !is_lvalue_ref && arg.lvalue {
                    return None;
                }
                if !target_cv.covers(arg_cv) {
                    return None;
                }
                return Some(if target_cv == arg_cv {
                    ConversionRank::Exact
                } else {
                    ConversionRank::Qualification
                });
            }
            if let (Type::Named(derived), Type::Named(base)) = (arg_bare, target_bare) {
                if ctx.is_base_of(*base, *derived) && target_cv.covers(arg_cv) {
                    return (arg.lvalue || target_cv.is_const || !is_lvalue_ref)
                        .then_some(ConversionRank::Standard);
                }
            }
            // Only const lvalue and rvalue references bind to temporaries.
            if is_lvalue_ref && !target_cv.is_const {
                return None;
            }
            let temporary = Argument {
                ty: Some(arg_ty.clone()),
                lvalue: false,
            };
            rank_value(ctx, &temporary, target_bare, allow_user)
        }
        _ => rank_value(ctx, arg, param.unqualified(), allow_user),
    }
}

fn decay(ty: &Type<BindingId>) -> Type<BindingId> {
    match ty {
        Type::Array(inner, _) => Type::Pointer(inner.clone()),
        Type::Function(_) => Type::Pointer(Box::new(ty.clone())),
        other => other.clone(),
    }
}

fn rank_value(
    ctx: &dyn ConversionContext,
    arg: &Argument,
    to: &Type<BindingId>,
    allow_user: bool,
) -> Option<ConversionRank> {
    let Some(from) = &arg.ty else {
        return Some(ConversionRank::Exact);
    };
    let from = decay(from.non_reference().unqualified());
    if &from == to {
        return Some(ConversionRank::Exact);
    }
    match (&from, to) {
        (
            Type::Builtin(BuiltinType::NullPtr),
            Type::Pointer(_) | Type::Builtin(BuiltinType::Bool),
        ) => Some(ConversionRank::Standard),
        (Type::Builtin(f), Type::Builtin(t)) => arithmetic(*f, *t),
        (Type::Named(e), Type::Builtin(t)) if ctx.is_unscoped_enum(*e) && t.is_integral() => {
            Some(if *t == BuiltinType::Int {
                ConversionRank::Promotion
            } else {
                ConversionRank::Standard
            })
        }
        (Type::Pointer(f), Type::Pointer(t)) => pointer(ctx, f, t),
        (Type::Pointer(_), Type::Builtin(BuiltinType::Bool)) => Some(ConversionRank::Standard),
        (Type::Named(derived), Type::Named(base)) if ctx.is_base_of(*base, *derived) => {
            Some(ConversionRank::Standard)
        }
        (_, Type::Named(class)) if allow_user => {
            let arg = Argument {
                ty: Some(from.clone()),
                lvalue: arg.lvalue,
            };
            ctx.converting_constructors(*class)
                .iter()
                .filter_map(|p| rank_inner(ctx, &arg, p, false))
                .any(|r| r <= ConversionRank::Standard)
                .then_some(ConversionRank::UserDefined)
        }
        _ => None,
    }
}

fn arithmetic(from: BuiltinType, to: BuiltinType) -> Option<ConversionRank> {
    if !from.is_arithmetic() || !to.is_arithmetic() {
        return None;
    }
    let promotes_to_int = from.is_integral() && from.integer_rank() < BuiltinType::Int.integer_rank();
    if (promotes_to_int && to == BuiltinType::Int)
        || (from == BuiltinType::Float && to == BuiltinType::Double)
    {
        return Some(ConversionRank::Promotion);
    }
    Some(ConversionRank::Standard)
}

fn pointer(ctx: &dyn ConversionContext, from: &Type<BindingId>, to: &Type<BindingId>) -> Option<ConversionRank> {
    let (from_cv, from_bare) = from.split_cv();
    let (to_cv, to_bare) = to.split_cv();
    if !to_cv.covers(from_cv) {
        return None;
    }
    if from_bare == to_bare {
        return Some(ConversionRank::Qualification);
    }
    match (from_bare, to_bare) {
        (_, Type::Builtin(BuiltinType::Void)) if !matches!(from_bare, Type::Function(_)) => {
            Some(ConversionRank::Standard)
        }
        (Type::Named(derived), Type::Named(base)) if ctx.is_base_of(*base, *derived) => {
            Some(ConversionRank::Standard)
        }
        _ => None,
    }
}

struct Viable<'c> {
    candidate: &'c Candidate,
    ranks: Vec<ConversionRank>,
}

fn ranks_for(ctx: &dyn ConversionContext, candidate: &Candidate, args: &[Argument]) -> Option<Vec<ConversionRank>> {
    if args.len() < candidate.required || (args.len() > candidate.params.len() && !candidate.variadic) {
        return None;
    }
    args.iter()
        .enumerate()
        .map(|(i, arg)| match candidate.params.get(i) {
            Some(param) => rank(ctx, arg, param),
            None => Some(ConversionRank::Ellipsis),
        })
        .collect()
}

/// `Greater` when `a` is the better candidate.
fn compare(a: &Viable<'_>, b: &Viable<'_>) -> Ordering {
    let mut a_better = false;
    let mut b_better = false;
    for (ra, rb) in a.ranks.iter().zip(&b.ranks) {
        match ra.cmp(rb) {
            Ordering::Less => a_better = true,
            Ordering::Greater => b_better = true,
            Ordering::Equal => {}
        }
    }
    match (a_better, b_better) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => match (a.candidate.from_template, b.candidate.from_template) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            _ => Ordering::Equal,
        },
        (true, true) => Ordering::Equal,
    }
}

/// Pick the best viable candidate for `args`.
pub fn select(ctx: &dyn ConversionContext, candidates: &[Candidate], args: &[Argument]) -> Selection {
    let viable: Vec<Viable<'_>> = candidates
        .iter()
        .filter_map(|candidate| {
            ranks_for(ctx, candidate, args).map(|ranks| Viable { candidate, ranks })
        })
        .collect();
    match viable.as_slice() {
        [] => return Selection::NoViable,
        [only] => return Selection::Best(only.candidate.binding),
        _ => {}
    }
    let best: Vec<&Viable<'_>> = viable
        .iter()
        .filter(|v| {
            viable
                .iter()
                .filter(|o| !std::ptr::eq(*v, *o))
                .all(|o| compare(v, o) == Ordering::Greater)
        })
        .collect();
    if let [winner] = best.as_slice() {
        return Selection::Best(winner.candidate.binding);
    }
    // Report the candidates nothing beats.
    let undominated = viable
        .iter()
        .filter(|v| !viable.iter().any(|o| compare(o, v) == Ordering::Greater))
        .map(|v| v.candidate.binding)
        .collect();
    Selection::Ambiguous(undominated)
}

#[cfg(test)]
mod tests;
