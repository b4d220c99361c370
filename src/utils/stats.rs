//! Running statistics
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Online mean, variance, and range of a stream of values.
///
/// The mean and variance use Welford's algorithm.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineStats<T> {
    count: u64,
    mean: T,
    squared_residual_sum: T,
    min: T,
    max: T,
}

impl<T: Float> Default for OnlineStats<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> OnlineStats<T> {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: T::zero(),
            squared_residual_sum: T::zero(),
            min: T::infinity(),
            max: T::neg_infinity(),
        }
    }

    /// Number of accumulated values.
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Mean of the accumulated values. `None` if empty.
    pub fn mean(&self) -> Option<T> {
        if self.count == 0 {
            None
        } else {
            Some(self.mean)
        }
    }

    /// Population variance of the accumulated values. `None` if empty.
    pub fn variance(&self) -> Option<T> {
        if self.count == 0 {
            None
        } else {
            T::from(self.count).map(|n| self.squared_residual_sum / n)
        }
    }

    /// Population standard deviation. `None` if empty.
    pub fn stddev(&self) -> Option<T> {
        self.variance().map(Float::sqrt)
    }

    pub fn min(&self) -> Option<T> {
        if self.count == 0 {
            None
        } else {
            Some(self.min)
        }
    }

    pub fn max(&self) -> Option<T> {
        if self.count == 0 {
            None
        } else {
            Some(self.max)
        }
    }

    /// Add a value.
    pub fn push(&mut self, value: T) {
        self.count += 1;
        let n = T::from(self.count).unwrap_or_else(T::infinity);
        let residual_pre = value - self.mean;
        self.mean = self.mean + residual_pre / n;
        let residual_post = value - self.mean;
        self.squared_residual_sum = self.squared_residual_sum + residual_pre * residual_post;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

impl<T: Float> Extend<T> for OnlineStats<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value)
        }
    }
}

impl<T: Float> FromIterator<T> for OnlineStats<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut stats = Self::new();
        stats.extend(iter);
        stats
    }
}
