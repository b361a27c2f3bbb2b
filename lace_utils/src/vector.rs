//! Dense, packed vectors of per-group parameters.
//!
//! Rows are kept contiguous: removing a row moves the last row into the hole,
//! so callers that keep parallel collections must apply the same swap.

/// A vector that grows by appending and shrinks by swap-removal
pub trait Packed<T> {
    /// Append a value to the end
    fn packed_add(&mut self, value: T);

    /// Remove the value at `ix`, moving the last value into its place.
    ///
    /// Indices below `ix` are unchanged; the value previously at
    /// `len - 1` is now at `ix`.
    fn packed_remove(&mut self, ix: usize);
}

impl<T> Packed<T> for Vec<T> {
    #[inline]
    fn packed_add(&mut self, value: T) {
        self.push(value);
    }

    #[inline]
    fn packed_remove(&mut self, ix: usize) {
        assert!(
            ix < self.len(),
            "packed_remove index {} out of bounds for length {}",
            ix,
            self.len()
        );
        self.swap_remove(ix);
    }
}

/// Replace every entry of `xs` with its natural log
#[inline]
pub fn vector_log(xs: &mut [f64]) {
    xs.iter_mut().for_each(|x| *x = x.ln());
}

/// `io[i] += add[i] - sub[i]` for every `i`
#[inline]
pub fn vector_add_subtract(io: &mut [f64], add: &[f64], sub: &[f64]) {
    assert_eq!(io.len(), add.len());
    assert_eq!(io.len(), sub.len());
    io.iter_mut()
        .zip(add.iter().zip(sub.iter()))
        .for_each(|(x, (a, s))| *x += a - s);
}

/// Sum of the entries in `xs`
#[inline]
pub fn vector_sum(xs: &[f64]) -> f64 {
    xs.iter().sum()
}
