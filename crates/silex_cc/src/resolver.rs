//! Constant-expression evaluation interface.
//!
//! The parser needs integers out of expressions in exactly three places:
//! array sizes, enum variant values and bit-field widths. The full
//! expression resolver lives outside this crate; the parser talks to it
//! through [`EvalToInt`] only. [`ConstResolver`] is the in-tree folder
//! covering literal arithmetic, which is what those three positions need
//! in practice.

use crate::ast::expr::{BinaryKind, Expr, Literal, UnaryKind};

pub trait EvalToInt {
    /// Folds `expr` to an integer, or `None` when it is not a constant
    /// integer expression.
    fn eval_to_int(&mut self, expr: &Expr) -> Option<i64>;
}

/// Literal/unary/binary constant folder.
#[derive(Debug, Default)]
pub struct ConstResolver;

impl ConstResolver {
    pub fn new() -> Self {
        ConstResolver
    }

    fn fold(&mut self, expr: &Expr) -> Option<i64> {
        match expr {
            Expr::Literal(Literal::SignedInt(v)) => Some(*v),
            Expr::Literal(Literal::UnsignedInt(v)) => i64::try_from(*v).ok(),
            Expr::Literal(Literal::Bool(b)) => Some(*b as i64),
            Expr::Literal(Literal::Char(c)) => Some(*c as i64),
            Expr::Grouping(inner) => self.fold(inner),
            Expr::Cast { expr, .. } => self.fold(expr),
            Expr::Unary { kind, expr } => {
                let v = self.fold(expr)?;
                match kind {
                    UnaryKind::Negative => v.checked_neg(),
                    UnaryKind::Positive => Some(v),
                    UnaryKind::BitNot => Some(!v),
                    UnaryKind::Not => Some((v == 0) as i64),
                    _ => None,
                }
            }
            Expr::Binary { kind, left, right } => {
                let l = self.fold(left)?;
                let r = self.fold(right)?;
                match kind {
                    BinaryKind::Add => l.checked_add(r),
                    BinaryKind::Sub => l.checked_sub(r),
                    BinaryKind::Mul => l.checked_mul(r),
                    BinaryKind::Div => (r != 0).then(|| l / r),
                    BinaryKind::Mod => (r != 0).then(|| l % r),
                    BinaryKind::BitAnd => Some(l & r),
                    BinaryKind::BitOr => Some(l | r),
                    BinaryKind::BitXor => Some(l ^ r),
                    BinaryKind::Shl => u32::try_from(r).ok().and_then(|r| l.checked_shl(r)),
                    BinaryKind::Shr => u32::try_from(r).ok().and_then(|r| l.checked_shr(r)),
                    BinaryKind::And => Some((l != 0 && r != 0) as i64),
                    BinaryKind::Or => Some((l != 0 || r != 0) as i64),
                    BinaryKind::Eq => Some((l == r) as i64),
                    BinaryKind::NotEq => Some((l != r) as i64),
                    BinaryKind::Lt => Some((l < r) as i64),
                    BinaryKind::LtEq => Some((l <= r) as i64),
                    BinaryKind::Gt => Some((l > r) as i64),
                    BinaryKind::GtEq => Some((l >= r) as i64),
                    _ => None,
                }
            }
            Expr::Ternary { cond, if_, else_ } => {
                if self.fold(cond)? != 0 {
                    self.fold(if_)
                } else {
                    self.fold(else_)
                }
            }
            _ => None,
        }
    }
}

impl EvalToInt for ConstResolver {
    fn eval_to_int(&mut self, expr: &Expr) -> Option<i64> {
        self.fold(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Expr {
        Expr::Literal(Literal::SignedInt(v))
    }

    #[test]
    fn folds_arithmetic() {
        let mut r = ConstResolver::new();
        let expr = Expr::Binary {
            kind: BinaryKind::Add,
            left: Box::new(int(2)),
            right: Box::new(Expr::Binary {
                kind: BinaryKind::Mul,
                left: Box::new(int(3)),
                right: Box::new(int(4)),
            }),
        };
        assert_eq!(r.eval_to_int(&expr), Some(14));
    }

    #[test]
    fn division_by_zero_is_not_constant() {
        let mut r = ConstResolver::new();
        let expr = Expr::Binary {
            kind: BinaryKind::Div,
            left: Box::new(int(1)),
            right: Box::new(int(0)),
        };
        assert_eq!(r.eval_to_int(&expr), None);
    }

    #[test]
    fn identifiers_are_not_constant() {
        let mut r = ConstResolver::new();
        let expr = Expr::Identifier {
            name: silex_base::Symbol(1),
            generic_params: None,
        };
        assert_eq!(r.eval_to_int(&expr), None);
    }

    #[test]
    fn ternary_picks_a_branch() {
        let mut r = ConstResolver::new();
        let expr = Expr::Ternary {
            cond: Box::new(int(0)),
            if_: Box::new(int(1)),
            else_: Box::new(int(2)),
        };
        assert_eq!(r.eval_to_int(&expr), Some(2));
    }
}
