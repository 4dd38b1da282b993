// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::diagnostics::{Anchor, UnsupportedFeature, ViolationKind};
use crate::error::Result;
use crate::program::{BinaryOp, Node, Rational};

use super::Marker;

/// Scaling factor between the operands and the result of a fixed-point
/// multiplication or division. `None` for a degenerate zero small.
pub(crate) fn scaling_factor(
    op: BinaryOp,
    left: &Rational,
    right: &Rational,
    result: &Rational,
) -> Option<Rational> {
    match op {
        BinaryOp::Multiply => &(left * right) / result,
        BinaryOp::Divide => left / &(right * result),
        _ => None,
    }
}

impl<'a> Marker<'a> {
    /// Multiplying or dividing two fixed-point values is only supported when
    /// the scaling factor is an integer or the reciprocal of an integer.
    /// Integer results count as a small of 1.
    pub(crate) fn check_fixed_point_operation(
        &self,
        expr: &Node,
        op: BinaryOp,
        left: &Node,
        right: &Node,
    ) -> Result<()> {
        let (Some(left_ty), Some(right_ty), Some(result_ty)) = (&left.ty, &right.ty, &expr.ty)
        else {
            return Ok(());
        };
        let (Some(left_small), Some(right_small)) =
            (self.fixed_small(left_ty)?, self.fixed_small(right_ty)?)
        else {
            return Ok(());
        };

        let at = Anchor::node(expr);
        if self.is_floating_type(result_ty)? {
            self.unsupported(at, UnsupportedFeature::FixedPointFloatResult);
            return Ok(());
        }
        let one = Rational::integer(1);
        let result_small = self.fixed_small(result_ty)?.unwrap_or(&one);

        let compatible = scaling_factor(op, left_small, right_small, result_small)
            .is_some_and(|factor| factor.is_integer_or_reciprocal());
        if !compatible {
            self.violation(at, ViolationKind::FixedPointScaling);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(text: &str) -> Rational {
        Rational::parse(text).unwrap()
    }

    #[test]
    fn multiplication_factors() {
        // 1/8 * 1/8 into 1/64: factor 1.
        let factor = scaling_factor(BinaryOp::Multiply, &r("1/8"), &r("1/8"), &r("1/64")).unwrap();
        assert!(factor.is_integer());
        // 1/8 * 1/8 into 3/64: factor 1/3.
        let factor = scaling_factor(BinaryOp::Multiply, &r("1/8"), &r("1/8"), &r("3/64")).unwrap();
        assert!(factor.is_reciprocal_of_integer());
        // 1/10 * 1/10 into 1/8: factor 2/25.
        let factor = scaling_factor(BinaryOp::Multiply, &r("1/10"), &r("1/10"), &r("1/8")).unwrap();
        assert!(!factor.is_integer_or_reciprocal());
    }

    #[test]
    fn division_factors() {
        // (1/8) / (1/4 * 1/2): factor 1.
        let factor = scaling_factor(BinaryOp::Divide, &r("1/8"), &r("1/4"), &r("1/2")).unwrap();
        assert!(factor.is_integer());
        // (1/3) / (1/2 * 1): factor 2/3.
        let factor = scaling_factor(BinaryOp::Divide, &r("1/3"), &r("1/2"), &r("1")).unwrap();
        assert!(!factor.is_integer_or_reciprocal());
    }
}
