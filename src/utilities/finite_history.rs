use std::collections::VecDeque;

/// Track a finite number of the most recently seen items in a stream.
pub struct FiniteHistory<T> {
    // The number of items.
    size: usize,
    // The items.
    data: VecDeque<T>,
}

impl<T> FiniteHistory<T> {
    /// Create a new `FiniteHistory` that can hold `size` items.
    pub fn new(size: usize) -> Self {
        let mut data = VecDeque::new();
        data.reserve_exact(size);
        FiniteHistory { size, data }
    }
    /// Add an `item`, removing another if necessary.
    pub fn add(&mut self, item: T) {
        if self.data.len() == self.size {
            self.data.pop_front();
        }
        self.data.push_back(item);
    }
}

impl<T> FiniteHistory<T>
where
    for<'a> &'a T: Into<f64>,
{
    /// Compute the mean value over the recorded items.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            0.0
        } else {
            self.data.iter().map(|x| x.into()).sum::<f64>() / (self.data.len() as f64)
        }
    }
}

/// A wrapper for `bool` that can be converted to `f64`.
pub struct FHBool(pub bool);

impl<'a> From<&'a FHBool> for f64 {
    fn from(b: &FHBool) -> Self {
        if b.0 {
            1.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_over_a_partial_window() {
        let mut history = FiniteHistory::new(4);
        history.add(FHBool(true));
        history.add(FHBool(false));
        assert!((history.mean() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn old_items_fall_out_of_the_window() {
        let mut history = FiniteHistory::new(2);
        history.add(FHBool(false));
        history.add(FHBool(true));
        history.add(FHBool(true));
        assert!((history.mean() - 1.0).abs() < 1e-12);
    }
}
