use std::f64::NEG_INFINITY;

/// Returns the index of the largest element in xs.
///
/// If there are multiple largest elements, returns the index of the first.
#[inline]
pub fn argmax<T: PartialOrd>(xs: &[T]) -> usize {
    assert!(!xs.is_empty(), "Empty container");

    xs.iter()
        .enumerate()
        .skip(1)
        .fold((0, &xs[0]), |(max_ix, max_val), (ix, x)| {
            if x > max_val {
                (ix, x)
            } else {
                (max_ix, max_val)
            }
        })
        .0
}

/// Numerically stable `log(sum(exp(xs))`
///
/// Returns `-inf` if every entry is `-inf`.
#[inline]
pub fn logsumexp(xs: &[f64]) -> f64 {
    assert!(!xs.is_empty(), "Empty container");

    if xs.len() == 1 {
        return xs[0];
    }

    let maxval = xs[argmax(xs)];
    if maxval == NEG_INFINITY {
        NEG_INFINITY
    } else {
        xs.iter()
            .fold(0.0_f64, |acc, x| acc + (x - maxval).exp())
            .ln()
            + maxval
    }
}
