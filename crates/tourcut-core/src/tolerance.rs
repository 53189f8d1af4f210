// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Floating-point tolerances for reading LP solutions.
//!
//! Edge lengths are integral, so LP values are compared against small
//! absolute tolerances. The helpers are generic over `num_traits::Float` so
//! that both `f32` scratch buffers and `f64` LP vectors can use them.

use num_traits::Float;

/// Values with magnitude below this are treated as zero.
pub const EPS_ZERO: f64 = 1e-9;

/// LP values within this distance of an integer count as integral.
pub const EPS_INTEGRAL: f64 = 1e-6;

/// A cut must be violated by more than this to be reported.
pub const EPS_CUT: f64 = 1e-3;

/// Gap below which an LP bound prunes a node against an integral tour length.
///
/// Tour lengths are integers, so a bound above `ub - 0.9` cannot lead to a
/// strictly shorter tour.
pub const PRUNE_GAP: f64 = 0.9;

#[inline]
pub fn is_zero<F: Float>(value: F, eps: F) -> bool {
    value.abs() <= eps
}

#[inline]
pub fn is_one<F: Float>(value: F, eps: F) -> bool {
    (value - F::one()).abs() <= eps
}

/// Returns `true` if `value` is within `eps` of an integer.
#[inline]
pub fn is_integral<F: Float>(value: F, eps: F) -> bool {
    (value - value.round()).abs() <= eps
}

/// Returns `true` if `value` lies strictly between `eps` and `1 - eps`.
#[inline]
pub fn is_fractional<F: Float>(value: F, eps: F) -> bool {
    value > eps && value < F::one() - eps
}

/// Distance of `value` from the nearest of `0` and `1`, the usual measure
/// of how fractional an edge variable is.
#[inline]
pub fn fractionality<F: Float>(value: F) -> F {
    value.min(F::one() - value).max(F::zero())
}

/// Smallest integer strictly above `bound - eps`, i.e. the bound an
/// integral objective must reach.
#[inline]
pub fn integral_bound<F: Float>(bound: F, eps: F) -> F {
    (bound - eps).ceil()
}
