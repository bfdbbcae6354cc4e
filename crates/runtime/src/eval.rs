//! Expression Evaluator (C3): reduces a compiler-crate `Expr` tree to a `Value` against a
//! variable lookup. Operator semantics follow §4.3; precedence is already baked into the tree
//! shape by the compiler's parser, so this module only needs to apply each node's operator.

use crate::error::FatalKind;
use twx_compiler::{BinOp, Expr};
use twx_core::Value;

/// Anything that can resolve a fully-formed variable reference to a `Value`. The VM implements
/// this by combining the user store, system constants, and structured-accessor resolution; kept
/// as a trait here so the evaluator stays decoupled from how a name is actually looked up.
pub trait VarLookup {
    fn lookup(&mut self, expr: &twx_compiler::VarRef) -> Result<Value, FatalKind>;
}

pub fn eval<L: VarLookup>(expr: &Expr, lookup: &mut L) -> Result<Value, FatalKind> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Var(v) => lookup.lookup(v),
        Expr::Neg(inner) => Ok(Value::Number(-eval(inner, lookup)?.as_number())),
        Expr::Binary(op, lhs, rhs) => {
            let l = eval(lhs, lookup)?;
            let r = eval(rhs, lookup)?;
            apply(*op, &l, &r)
        }
    }
}

fn apply(op: BinOp, l: &Value, r: &Value) -> Result<Value, FatalKind> {
    match op {
        BinOp::Mul => Ok(Value::Number(l.as_number() * r.as_number())),
        BinOp::Div => {
            let divisor = r.as_number();
            if divisor == 0.0 {
                return Err(FatalKind::DivideByZero);
            }
            Ok(Value::Number(l.as_number() / divisor))
        }
        BinOp::Add => Ok(Value::Number(l.as_number() + r.as_number())),
        BinOp::Sub => Ok(Value::Number(l.as_number() - r.as_number())),
        BinOp::Concat => Ok(Value::Str(format!("{}{}", l.to_display_string(), r.to_display_string()))),
        BinOp::Eq => Ok(Value::bool(compare(l, r) == std::cmp::Ordering::Equal)),
        BinOp::Ne => Ok(Value::bool(compare(l, r) != std::cmp::Ordering::Equal)),
        BinOp::Lt => Ok(Value::bool(compare(l, r) == std::cmp::Ordering::Less)),
        BinOp::Gt => Ok(Value::bool(compare(l, r) == std::cmp::Ordering::Greater)),
        BinOp::Le => Ok(Value::bool(compare(l, r) != std::cmp::Ordering::Greater)),
        BinOp::Ge => Ok(Value::bool(compare(l, r) != std::cmp::Ordering::Less)),
        BinOp::And => Ok(Value::bool(l.truthy() && r.truthy())),
        BinOp::Or => Ok(Value::bool(l.truthy() || r.truthy())),
        BinOp::Xor => Ok(Value::bool(l.truthy() != r.truthy())),
    }
}

/// Compare two values: numeric if either side looks numeric, else lexicographic string
/// comparison (§4.3's "=, <>, <, >, <=, >= numeric if either side is numeric, else string").
/// Shared with the Comparison command family (§4.4), which applies the same rule to
/// `isEqual`/`isGreater`/etc.
pub(crate) fn compare(l: &Value, r: &Value) -> std::cmp::Ordering {
    if l.looks_numeric() || r.looks_numeric() {
        l.as_number().partial_cmp(&r.as_number()).unwrap_or(std::cmp::Ordering::Equal)
    } else {
        l.to_display_string().cmp(&r.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twx_compiler::VarRef;

    struct NullLookup;
    impl VarLookup for NullLookup {
        fn lookup(&mut self, _v: &VarRef) -> Result<Value, FatalKind> {
            Ok(Value::empty())
        }
    }

    #[test]
    fn arithmetic_precedence_is_already_baked_into_the_tree() {
        // (2 + 3) * 4 would be Binary(Mul, Binary(Add, 2,3), 4)
        let expr = Expr::Binary(
            BinOp::Mul,
            Box::new(Expr::Binary(BinOp::Add, Box::new(Expr::Number(2.0)), Box::new(Expr::Number(3.0)))),
            Box::new(Expr::Number(4.0)),
        );
        assert_eq!(eval(&expr, &mut NullLookup).unwrap(), Value::Number(20.0));
    }

    #[test]
    fn division_by_zero_is_fatal() {
        let expr = Expr::Binary(BinOp::Div, Box::new(Expr::Number(1.0)), Box::new(Expr::Number(0.0)));
        assert_eq!(eval(&expr, &mut NullLookup).unwrap_err(), FatalKind::DivideByZero);
    }

    #[test]
    fn mixed_type_comparison_coerces_numerically_when_either_side_looks_numeric() {
        let expr = Expr::Binary(BinOp::Eq, Box::new(Expr::Str("42".into())), Box::new(Expr::Number(42.0)));
        assert_eq!(eval(&expr, &mut NullLookup).unwrap(), Value::bool(true));
    }

    #[test]
    fn concat_stringifies_both_sides() {
        let expr = Expr::Binary(BinOp::Concat, Box::new(Expr::Str("n=".into())), Box::new(Expr::Number(5.0)));
        assert_eq!(eval(&expr, &mut NullLookup).unwrap(), Value::Str("n=5".into()));
    }
}
