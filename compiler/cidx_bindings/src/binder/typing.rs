//! Semantic types from written type specifiers, template arguments and
//! constant expressions.

use cidx_ir::ast::{
    BaseType, BinaryOp, CvQualifiers, DeclId, DeclKind, ExprId, ExprKind, NameId, TemplateArg,
    TypeOp, TypeSpec, UnaryOp,
};

use super::lookup::Lookup;
use super::{Binder, Want};
use crate::binding::{BindingId, BindingKind};
use crate::output::Resolution;
use crate::types::{ArgMap, TemplateArgument, Type};

impl Binder<'_> {
    /// Type written by `spec` in the current scope.
    pub(super) fn type_of_spec(&mut self, spec: &TypeSpec) -> Type<BindingId> {
        self.type_of_spec_with(spec, None)
    }

    /// Like [`Binder::type_of_spec`], with `auto` standing for `deduced`.
    pub(super) fn type_of_spec_with(
        &mut self,
        spec: &TypeSpec,
        deduced: Option<Type<BindingId>>,
    ) -> Type<BindingId> {
        let base = match &spec.base {
            BaseType::Builtin(b) => Type::Builtin(*b),
            BaseType::Named(name) => self.named_type(*name),
            BaseType::Inline(decl) => self.inline_type(*decl),
            // `auto` drops references and top-level qualifiers; `auto&` keeps them.
            BaseType::Auto => deduced.map_or(Type::Unknown, |ty| {
                let ty = ty.non_reference();
                if spec.ops.is_empty() {
                    ty.unqualified().clone()
                } else {
                    ty.clone()
                }
            }),
            BaseType::Error => Type::Unknown,
        };
        let mut ty = Type::qualified(spec.cv, base);
        for op in &spec.ops {
            ty = match op {
                TypeOp::Pointer(cv) => Type::qualified(*cv, ty.pointer_to()),
                TypeOp::LValueRef => ty.lvalue_ref_to(),
                TypeOp::RValueRef => ty.rvalue_ref_to(),
                TypeOp::Array(size) => {
                    let len = size.and_then(|e| {
                        self.bind_expr(e);
                        self.const_value(e).and_then(|v| u64::try_from(v).ok())
                    });
                    Type::Array(Box::new(ty), len)
                }
            };
        }
        ty
    }

    /// Type named by `id`; records the reference.
    pub(super) fn named_type(&mut self, id: NameId) -> Type<BindingId> {
        let scope = self.scope;
        let node = self.name_node(id);
        let lookup = match self.lookup_name(id, scope, Want::Type) {
            // `sizeof(x)` reads `x` as a type name.
            Lookup::Missing if !node.is_qualified() => {
                let ident = self.segment_name(&node.last);
                let found = self.lookup_unqualified(scope, ident, Want::Any);
                if found.is_empty() {
                    Lookup::Missing
                } else {
                    Lookup::Found(found)
                }
            }
            other => other,
        };
        let dependent = matches!(lookup, Lookup::Dependent);
        let Some(binding) = self.settle(id, scope, lookup) else {
            return if dependent { Type::Dependent } else { Type::Unknown };
        };
        let args = node
            .last
            .template_args
            .as_ref()
            .map(|args| self.template_arguments(args));
        self.type_for_binding(binding, args, id)
    }

    /// Type of a use of `binding`, with the template arguments written on it.
    /// A class template with arguments that match an explicit specialization
    /// names that specialization, and `id` is re-pointed to it.
    pub(super) fn type_for_binding(
        &mut self,
        binding: BindingId,
        args: Option<Vec<TemplateArgument<BindingId>>>,
        id: NameId,
    ) -> Type<BindingId> {
        let b = self.bindings.get(binding);
        match b.kind {
            BindingKind::Class | BindingKind::ClassSpecialization | BindingKind::Enumeration => {
                Type::Named(binding)
            }
            BindingKind::ClassTemplate => {
                let Some(args) = args else {
                    // The injected class name inside the template.
                    return Type::Named(binding);
                };
                if let Some((spec, map)) = self.matching_specialization(binding, &args) {
                    if map.is_empty() {
                        self.repoint(id, spec);
                        return Type::Named(spec);
                    }
                }
                Type::Instance {
                    template: binding,
                    args,
                }
            }
            BindingKind::Typedef => {
                let ty = b.ty.clone().unwrap_or(Type::Unknown);
                match args {
                    // Alias template
                    Some(args) if b.is_templated() => ty.substitute(&ArgMap::from_pairs(&b.template_params, args)),
                    _ => ty,
                }
            }
            BindingKind::TemplateParameter => Type::TemplateParam(binding),
            _ => b.ty.clone().unwrap_or(Type::Unknown),
        }
    }

    /// Move the reference just recorded for `id` to `binding`.
    fn repoint(&mut self, id: NameId, binding: BindingId) {
        if let Some(reference) = self.references.iter_mut().rev().find(|r| r.name == id) {
            reference.binding = binding;
        }
        self.set_resolution(id, Resolution::Binding(binding));
    }

    /// Class or enum declared inside a type specifier.
    fn inline_type(&mut self, decl: DeclId) -> Type<BindingId> {
        if let Some(&binding) = self.decl_bindings.get(&decl) {
            return Type::Named(binding);
        }
        match &self.decl(decl).kind {
            DeclKind::Class(class) => {
                self.declare_class(decl, class, None, !class.is_definition);
            }
            DeclKind::Enum(e) => self.declare_enum(decl, e),
            _ => {}
        }
        self.decl_bindings
            .get(&decl)
            .map_or(Type::Unknown, |&binding| Type::Named(binding))
    }

    /// Arguments of a template-id in the current scope.
    pub(super) fn template_arguments(&mut self, args: &[TemplateArg]) -> Vec<TemplateArgument<BindingId>> {
        args.iter().map(|arg| self.template_argument(arg)).collect()
    }

    fn template_argument(&mut self, arg: &TemplateArg) -> TemplateArgument<BindingId> {
        let e = match arg {
            TemplateArg::Type(spec) => return TemplateArgument::Type(self.type_of_spec(spec)),
            TemplateArg::Expr(e) => *e,
        };
        // A lone name may be a type the parser could not tell apart.
        if let ExprKind::Name(id) = self.expr(e).kind {
            let scope = self.scope;
            let lookup = self.lookup_name(id, scope, Want::Any);
            let dependent = matches!(lookup, Lookup::Dependent);
            let Some(binding) = self.settle(id, scope, lookup) else {
                return if dependent {
                    TemplateArgument::Type(Type::Dependent)
                } else {
                    TemplateArgument::Unknown
                };
            };
            let b = self.bindings.get(binding);
            return match b.kind {
                BindingKind::TemplateParameter => TemplateArgument::Type(Type::TemplateParam(binding)),
                BindingKind::Enumerator => b.value.map_or(TemplateArgument::Unknown, TemplateArgument::Value),
                kind if kind.is_type() => {
                    let args = self
                        .name_node(id)
                        .last
                        .template_args
                        .as_ref()
                        .map(|args| self.template_arguments(args));
                    TemplateArgument::Type(self.type_for_binding(binding, args, id))
                }
                _ => TemplateArgument::Unknown,
            };
        }
        self.bind_expr(e);
        self.const_value(e)
            .map_or(TemplateArgument::Unknown, TemplateArgument::Value)
    }

    /// Value of an integral constant expression, when it has one.
    pub(super) fn const_value(&self, e: ExprId) -> Option<i64> {
        match &self.expr(e).kind {
            ExprKind::IntLit(text) => parse_int(self.text(*text)),
            ExprKind::CharLit(text) => parse_char(self.text(*text)),
            ExprKind::Bool(b) => Some(i64::from(*b)),
            ExprKind::Name(id) => {
                let binding = self.resolutions.get(id.index())?.binding()?;
                let b = self.bindings.get(binding);
                (b.kind == BindingKind::Enumerator).then_some(b.value).flatten()
            }
            ExprKind::Unary { op, operand } => {
                let v = self.const_value(*operand)?;
                match op {
                    UnaryOp::Plus => Some(v),
                    UnaryOp::Neg => v.checked_neg(),
                    UnaryOp::Not => Some(i64::from(v == 0)),
                    UnaryOp::BitNot => Some(!v),
                    _ => None,
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.const_value(*lhs)?;
                let r = self.const_value(*rhs)?;
                binary(*op, l, r)
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.const_value(*cond)? != 0 {
                    self.const_value(*then_expr)
                } else {
                    self.const_value(*else_expr)
                }
            }
            ExprKind::Cast { operand, .. } => self.const_value(*operand),
            _ => None,
        }
    }

    /// Structural equality where template parameters compare by position, so
    /// `template<class T> void f(T)` redeclares `template<class U> void f(U)`.
    pub(super) fn types_equivalent(&self, a: &Type<BindingId>, b: &Type<BindingId>) -> bool {
        match (a, b) {
            (Type::TemplateParam(x), Type::TemplateParam(y)) => {
                self.bindings.get(*x).position == self.bindings.get(*y).position
            }
            (Type::Pointer(x), Type::Pointer(y))
            | (Type::LValueRef(x), Type::LValueRef(y))
            | (Type::RValueRef(x), Type::RValueRef(y)) => self.types_equivalent(x, y),
            (Type::Qualified(cx, x), Type::Qualified(cy, y)) => cx == cy && self.types_equivalent(x, y),
            (Type::Array(x, nx), Type::Array(y, ny)) => nx == ny && self.types_equivalent(x, y),
            (Type::Function(f), Type::Function(g)) => {
                f.variadic == g.variadic
                    && f.cv == g.cv
                    && f.params.len() == g.params.len()
                    && self.types_equivalent(&f.ret, &g.ret)
                    && f.params.iter().zip(&g.params).all(|(x, y)| self.types_equivalent(x, y))
            }
            (
                Type::Instance {
                    template: tx,
                    args: ax,
                },
                Type::Instance {
                    template: ty,
                    args: ay,
                },
            ) => {
                tx == ty
                    && ax.len() == ay.len()
                    && ax.iter().zip(ay).all(|(x, y)| match (x, y) {
                        (TemplateArgument::Type(x), TemplateArgument::Type(y)) => self.types_equivalent(x, y),
                        _ => x == y,
                    })
            }
            _ => a == b,
        }
    }
}

/// Bind the template parameters in `pattern` so that it equals `actual`.
pub(super) fn deduce(pattern: &Type<BindingId>, actual: &Type<BindingId>, map: &mut ArgMap<BindingId>) -> bool {
    match pattern {
        Type::TemplateParam(p) => bind_param(*p, TemplateArgument::Type(actual.clone()), map),
        Type::Qualified(pcv, inner) => {
            let (acv, rest) = actual.split_cv();
            if !acv.covers(*pcv) {
                return false;
            }
            deduce(inner, &Type::qualified(cv_minus(acv, *pcv), rest.clone()), map)
        }
        Type::Pointer(p) => match actual {
            Type::Pointer(a) => deduce(p, a, map),
            _ => false,
        },
        Type::LValueRef(p) => match actual {
            Type::LValueRef(a) => deduce(p, a, map),
            _ => false,
        },
        Type::RValueRef(p) => match actual {
            Type::RValueRef(a) => deduce(p, a, map),
            _ => false,
        },
        Type::Array(p, n) => match actual {
            Type::Array(a, m) => (n.is_none() || n == m) && deduce(p, a, map),
            _ => false,
        },
        Type::Function(f) => match actual {
            Type::Function(g) => {
                f.params.len() == g.params.len()
                    && f.variadic == g.variadic
                    && deduce(&f.ret, &g.ret, map)
                    && f.params.iter().zip(&g.params).all(|(p, a)| deduce(p, a, map))
            }
            _ => false,
        },
        Type::Instance { template, args } => match actual {
            Type::Instance {
                template: actual_template,
                args: actual_args,
            } => {
                template == actual_template
                    && args.len() == actual_args.len()
                    && args.iter().zip(actual_args).all(|(p, a)| deduce_arg(p, a, map))
            }
            _ => false,
        },
        Type::Builtin(_) | Type::Named(_) | Type::Dependent | Type::Unknown => pattern == actual,
    }
}

/// [`deduce`] for one template argument.
pub(super) fn deduce_arg(
    pattern: &TemplateArgument<BindingId>,
    actual: &TemplateArgument<BindingId>,
    map: &mut ArgMap<BindingId>,
) -> bool {
    match (pattern, actual) {
        (TemplateArgument::Type(Type::TemplateParam(p)), _) => bind_param(*p, actual.clone(), map),
        (TemplateArgument::Type(p), TemplateArgument::Type(a)) => deduce(p, a, map),
        (TemplateArgument::Value(x), TemplateArgument::Value(y)) => x == y,
        _ => false,
    }
}

fn bind_param(param: BindingId, arg: TemplateArgument<BindingId>, map: &mut ArgMap<BindingId>) -> bool {
    match map.get(param) {
        Some(existing) => *existing == arg,
        None => {
            map.insert(param, arg);
            true
        }
    }
}

/// Deduce a function template's parameters from call argument types.
/// A by-value parameter ignores the argument's qualifiers and decays
/// arrays; a reference parameter takes the qualifiers it does not spell.
pub(super) fn deduce_call(
    params: &[Type<BindingId>],
    args: &[Option<Type<BindingId>>],
    template_params: &[BindingId],
    map: &mut ArgMap<BindingId>,
) -> bool {
    for (param, arg) in params.iter().zip(args) {
        let Some(arg) = arg else { continue };
        let (pattern_cv, pattern) = param.non_reference().split_cv();
        let (arg_cv, actual) = arg.non_reference().split_cv();
        let actual = if param.is_reference() {
            Type::qualified(cv_minus(arg_cv, pattern_cv), actual.clone())
        } else {
            match actual {
                Type::Array(inner, _) => (**inner).clone().pointer_to(),
                other => other.clone(),
            }
        };
        if !deduce(pattern, &actual, map) {
            return false;
        }
    }
    template_params.iter().all(|&p| map.get(p).is_some())
}

fn cv_minus(cv: CvQualifiers, removed: CvQualifiers) -> CvQualifiers {
    CvQualifiers {
        is_const: cv.is_const && !removed.is_const,
        is_volatile: cv.is_volatile && !removed.is_volatile,
    }
}

fn binary(op: BinaryOp, l: i64, r: i64) -> Option<i64> {
    let bool_val = |b: bool| Some(i64::from(b));
    match op {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Sub => l.checked_sub(r),
        BinaryOp::Mul => l.checked_mul(r),
        BinaryOp::Div => l.checked_div(r),
        BinaryOp::Rem => l.checked_rem(r),
        BinaryOp::Shl => u32::try_from(r).ok().and_then(|r| l.checked_shl(r)),
        BinaryOp::Shr => u32::try_from(r).ok().and_then(|r| l.checked_shr(r)),
        BinaryOp::BitAnd => Some(l & r),
        BinaryOp::BitOr => Some(l | r),
        BinaryOp::BitXor => Some(l ^ r),
        BinaryOp::Lt => bool_val(l < r),
        BinaryOp::Gt => bool_val(l > r),
        BinaryOp::Le => bool_val(l <= r),
        BinaryOp::Ge => bool_val(l >= r),
        BinaryOp::Eq => bool_val(l == r),
        BinaryOp::Ne => bool_val(l != r),
        BinaryOp::And => bool_val(l != 0 && r != 0),
        BinaryOp::Or => bool_val(l != 0 || r != 0),
        BinaryOp::Comma => Some(r),
    }
}

/// `42`, `0x2A`, `052`, `0b101010`, `1'000'000ull`.
pub(super) fn parse_int(text: &str) -> Option<i64> {
    let digits: String = text
        .trim_end_matches(['u', 'U', 'l', 'L', 'z', 'Z'])
        .chars()
        .filter(|&c| c != '\'')
        .collect();
    let (radix, body) = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (16, hex)
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        (2, bin)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits.as_str())
    };
    u64::from_str_radix(body, radix)
        .ok()
        .map(|v| i64::from_ne_bytes(v.to_ne_bytes()))
}

/// `'a'`, `'\n'`, `L'x'`, `'\x41'`, `'\101'`.
fn parse_char(text: &str) -> Option<i64> {
    let start = text.find('\'')?;
    let inner = text[start + 1..].strip_suffix('\'')?;
    let mut chars = inner.chars();
    let first = chars.next()?;
    if first != '\\' {
        return Some(i64::from(u32::from(first)));
    }
    let escape = chars.next()?;
    let rest: String = chars.collect();
    let value = match escape {
        'n' => 10,
        't' => 9,
        'r' => 13,
        '0'..='7' => {
            let octal = format!("{escape}{rest}");
            return i64::from_str_radix(&octal, 8).ok();
        }
        'x' => return i64::from_str_radix(&rest, 16).ok(),
        'a' => 7,
        'b' => 8,
        'f' => 12,
        'v' => 11,
        other => u32::from(other),
    };
    Some(i64::from(value))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use cidx_ir::ast::BuiltinType;

    #[test]
    fn integer_literals() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x2A"), Some(42));
        assert_eq!(parse_int("052"), Some(42));
        assert_eq!(parse_int("0b101010"), Some(42));
        assert_eq!(parse_int("1'000ull"), Some(1000));
        assert_eq!(parse_int("0"), Some(0));
        assert_eq!(parse_int("09"), None);
    }

    #[test]
    fn character_literals() {
        assert_eq!(parse_char("'a'"), Some(97));
        assert_eq!(parse_char("'\\n'"), Some(10));
        assert_eq!(parse_char("L'A'"), Some(65));
        assert_eq!(parse_char("'\\x41'"), Some(65));
        assert_eq!(parse_char("'\\0'"), Some(0));
    }

    #[test]
    fn deduction_through_pointers_and_qualifiers() {
        let t = BindingId::new(9);
        let int = Type::Builtin(BuiltinType::Int);
        // const T* against const int*
        let pattern = Type::qualified(CvQualifiers::CONST, Type::TemplateParam(t)).pointer_to();
        let actual = Type::qualified(CvQualifiers::CONST, int.clone()).pointer_to();
        let mut map = ArgMap::new();
        assert!(deduce(&pattern, &actual, &mut map));
        assert_eq!(map.get(t), Some(&TemplateArgument::Type(int.clone())));
        // T* cannot match int
        let mut map = ArgMap::new();
        assert!(!deduce(&Type::TemplateParam(t).pointer_to(), &int, &mut map));
    }

    #[test]
    fn deduction_requires_consistent_bindings() {
        let t = BindingId::new(9);
        let int = Type::Builtin(BuiltinType::Int);
        let long = Type::Builtin(BuiltinType::Long);
        let pair = |a: Type<BindingId>, b: Type<BindingId>| Type::Instance {
            template: BindingId::new(1),
            args: vec![TemplateArgument::Type(a), TemplateArgument::Type(b)],
        };
        let pattern = pair(Type::TemplateParam(t), Type::TemplateParam(t));
        assert!(deduce(&pattern, &pair(int.clone(), int.clone()), &mut ArgMap::new()));
        assert!(!deduce(&pattern, &pair(int, long), &mut ArgMap::new()));
    }

    #[test]
    fn constant_arithmetic_is_checked() {
        assert_eq!(binary(BinaryOp::Shl, 1, 4), Some(16));
        assert_eq!(binary(BinaryOp::Div, 1, 0), None);
        assert_eq!(binary(BinaryOp::Add, i64::MAX, 1), None);
        assert_eq!(binary(BinaryOp::Lt, 1, 2), Some(1));
    }
}
