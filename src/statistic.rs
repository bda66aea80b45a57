//! Online travel time statistics.

/// The (mean, population variance, count) triple exchanged between workers.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Moments {
    pub mean: f64,
    pub variance: f64,
    pub count: u64,
}

/// A running (count, mean, variance) accumulator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Statistic {
    count: u64,
    mean: f64,
    /// Sum of squared deviations from the mean.
    m2: f64,
}

/// The final, reportable form of a [Statistic].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Summary {
    /// No samples were recorded.
    Empty,
    /// At least one sample was recorded.
    Samples { mean: f64, std_dev: f64, count: u64 },
}

impl Statistic {
    /// Creates an empty statistic.
    pub fn new() -> Self {
        Default::default()
    }

    /// Rebuilds a statistic from a triple.
    pub fn from_moments(moments: Moments) -> Self {
        Self {
            count: moments.count,
            mean: if moments.count > 0 { moments.mean } else { 0.0 },
            m2: moments.variance.max(0.0) * moments.count as f64,
        }
    }

    /// Adds a sample.
    pub fn add_value(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// The number of samples.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The sample mean, or `None` if no samples were recorded.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// The population variance, or `None` if no samples were recorded.
    pub fn variance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.m2 / self.count as f64)
    }

    /// Exports the triple sent during the global reduction.
    /// An empty statistic exports zero mean and variance.
    pub fn moments(&self) -> Moments {
        Moments {
            mean: self.mean().unwrap_or(0.0),
            variance: self.variance().unwrap_or(0.0),
            count: self.count,
        }
    }

    /// Folds another statistic into this one by combining first and second moments.
    pub fn merge(&mut self, other: &Statistic) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }

        let a = self.moments();
        let b = other.moments();
        let total = (a.count + b.count) as f64;
        let (na, nb) = (a.count as f64, b.count as f64);

        let sum = a.mean * na + b.mean * nb;
        let sq = (a.variance * na + a.mean * a.mean * na) + (b.variance * nb + b.mean * b.mean * nb);
        let mean = sum / total;
        let variance = f64::max(sq / total - mean * mean, 0.0);

        self.count = a.count + b.count;
        self.mean = mean;
        self.m2 = variance * total;
    }

    /// Summarises the statistic for reporting.
    pub fn summary(&self) -> Summary {
        match (self.mean(), self.variance()) {
            (Some(mean), Some(variance)) => Summary::Samples {
                mean,
                std_dev: variance.max(0.0).sqrt(),
                count: self.count,
            },
            _ => Summary::Empty,
        }
    }
}

impl FromIterator<f64> for Statistic {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stat = Statistic::new();
        for value in iter {
            stat.add_value(value);
        }
        stat
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use proptest::prelude::*;

    const SAMPLES: [f64; 10] = [12.0, 15.0, 11.0, 30.0, 22.0, 18.0, 19.0, 25.0, 14.0, 16.0];

    fn pooled() -> (f64, f64) {
        let n = SAMPLES.len() as f64;
        let mean = SAMPLES.iter().sum::<f64>() / n;
        let var = SAMPLES.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        (mean, var)
    }

    #[test]
    fn online_matches_direct() {
        let stat: Statistic = SAMPLES.iter().copied().collect();
        let (mean, var) = pooled();
        assert_eq!(stat.count(), 10);
        assert_approx_eq!(stat.mean().unwrap(), mean);
        assert_approx_eq!(stat.variance().unwrap(), var);
    }

    #[test]
    fn merge_matches_pooling() {
        let (mean, var) = pooled();
        for split in 0..=SAMPLES.len() {
            let mut a: Statistic = SAMPLES[..split].iter().copied().collect();
            let b: Statistic = SAMPLES[split..].iter().copied().collect();
            a.merge(&b);
            assert_eq!(a.count(), 10);
            assert_approx_eq!(a.mean().unwrap(), mean);
            assert_approx_eq!(a.variance().unwrap(), var);
        }
    }

    #[test]
    fn merge_is_order_independent() {
        let parts: Vec<Statistic> = SAMPLES
            .chunks(3)
            .map(|c| c.iter().copied().collect())
            .collect();

        let mut forward = Statistic::new();
        for part in &parts {
            forward.merge(part);
        }
        let mut backward = Statistic::new();
        for part in parts.iter().rev() {
            backward.merge(part);
        }
        // (p0 + p1) + (p2 + p3) against p0 + (p1 + (p2 + p3))
        let mut left = parts[0];
        left.merge(&parts[1]);
        let mut right = parts[2];
        right.merge(&parts[3]);
        left.merge(&right);

        for stat in [backward, left] {
            assert_eq!(stat.count(), forward.count());
            assert_approx_eq!(stat.mean().unwrap(), forward.mean().unwrap());
            assert_approx_eq!(stat.variance().unwrap(), forward.variance().unwrap());
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6 * (1.0 + b.abs())
    }

    proptest! {
        #[test]
        fn merge_matches_pooling_for_any_split(
            values in prop::collection::vec(0u32..2000, 1..200),
            first in 0usize..200,
            second in 0usize..200,
        ) {
            let values: Vec<f64> = values.into_iter().map(f64::from).collect();
            let mut cuts = [first % (values.len() + 1), second % (values.len() + 1)];
            cuts.sort_unstable();
            let [a, b, c]: [Statistic; 3] = [
                values[..cuts[0]].iter().copied().collect(),
                values[cuts[0]..cuts[1]].iter().copied().collect(),
                values[cuts[1]..].iter().copied().collect(),
            ];
            let pooled: Statistic = values.iter().copied().collect();

            // (a + b) + c
            let mut left = a;
            left.merge(&b);
            left.merge(&c);
            // c + (b + a)
            let mut inner = b;
            inner.merge(&a);
            let mut right = c;
            right.merge(&inner);

            for stat in [left, right] {
                prop_assert_eq!(stat.count(), pooled.count());
                prop_assert!(close(stat.mean().unwrap(), pooled.mean().unwrap()));
                prop_assert!(close(stat.variance().unwrap(), pooled.variance().unwrap()));
            }
        }
    }

    #[test]
    fn averaging_variances_would_be_wrong() {
        let a: Statistic = [1.0, 1.0].into_iter().collect();
        let b: Statistic = [9.0, 9.0].into_iter().collect();
        let mut merged = a;
        merged.merge(&b);
        // Both halves have zero variance, the pooled samples do not.
        assert_approx_eq!(merged.variance().unwrap(), 16.0);
    }

    #[test]
    fn moments_rebuild_the_statistic() {
        let stat: Statistic = SAMPLES.iter().copied().collect();
        let rebuilt = Statistic::from_moments(stat.moments());
        assert_eq!(rebuilt.count(), stat.count());
        assert_approx_eq!(rebuilt.mean().unwrap(), stat.mean().unwrap());
        assert_approx_eq!(rebuilt.variance().unwrap(), stat.variance().unwrap());
    }

    #[test]
    fn empty_statistic_is_flagged() {
        let mut stat = Statistic::new();
        stat.merge(&Statistic::new());
        assert_eq!(stat.summary(), Summary::Empty);
        assert_eq!(stat.mean(), None);
        assert_eq!(stat.moments().mean, 0.0);
    }

    #[test]
    fn merging_into_empty_copies() {
        let mut stat = Statistic::new();
        let other: Statistic = [4.0].into_iter().collect();
        stat.merge(&other);
        assert_eq!(
            stat.summary(),
            Summary::Samples {
                mean: 4.0,
                std_dev: 0.0,
                count: 1
            }
        );
    }
}
