//! Policies deciding when vehicles enter the road.

use rand::distributions::{Bernoulli, Distribution};
use rand::rngs::StdRng;
use std::collections::BTreeSet;

/// Decides whether a vehicle should enter a lane at the start of the road.
///
/// Consulted once per lane per tick by the leftmost segment; a vehicle only
/// enters if the first cell of the lane is also free.
pub trait SpawnPolicy: Send {
    fn should_spawn(&mut self, tick: u64, lane: usize, rng: &mut StdRng) -> bool;
}

/// Spawns with a fixed probability in every lane on every tick.
#[derive(Clone, Copy, Debug)]
pub struct BernoulliSpawn {
    distr: Bernoulli,
}

impl BernoulliSpawn {
    /// Creates the policy. The probability must be in `[0, 1]`.
    pub fn new(prob: f64) -> Option<Self> {
        Bernoulli::new(prob).ok().map(|distr| Self { distr })
    }
}

impl SpawnPolicy for BernoulliSpawn {
    fn should_spawn(&mut self, _tick: u64, _lane: usize, rng: &mut StdRng) -> bool {
        self.distr.sample(rng)
    }
}

/// Spawns on an explicit list of `(tick, lane)` pairs.
#[derive(Clone, Debug, Default)]
pub struct ScheduledSpawn {
    schedule: BTreeSet<(u64, usize)>,
}

impl ScheduledSpawn {
    /// Creates the policy from a list of `(tick, lane)` pairs.
    pub fn new(schedule: impl IntoIterator<Item = (u64, usize)>) -> Self {
        Self {
            schedule: schedule.into_iter().collect(),
        }
    }

    /// Spawns in `lane` every `interval` ticks, starting at tick zero, before `until`.
    pub fn every(interval: u64, lane: usize, until: u64) -> Self {
        let interval = interval.max(1);
        Self::new((0..until).step_by(interval as usize).map(|tick| (tick, lane)))
    }
}

impl SpawnPolicy for ScheduledSpawn {
    fn should_spawn(&mut self, tick: u64, lane: usize, _rng: &mut StdRng) -> bool {
        self.schedule.contains(&(tick, lane))
    }
}

/// Never spawns.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSpawn;

impl SpawnPolicy for NoSpawn {
    fn should_spawn(&mut self, _tick: u64, _lane: usize, _rng: &mut StdRng) -> bool {
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn schedule_is_exact() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut policy = ScheduledSpawn::new([(0, 0), (3, 1)]);
        assert!(policy.should_spawn(0, 0, &mut rng));
        assert!(!policy.should_spawn(0, 1, &mut rng));
        assert!(policy.should_spawn(3, 1, &mut rng));
    }

    #[test]
    fn every_spaces_out_spawns() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut policy = ScheduledSpawn::every(10, 0, 35);
        let ticks: Vec<_> = (0..40).filter(|&t| policy.should_spawn(t, 0, &mut rng)).collect();
        assert_eq!(ticks, vec![0, 10, 20, 30]);
    }

    #[test]
    fn bernoulli_extremes() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut always = BernoulliSpawn::new(1.0).unwrap();
        let mut never = BernoulliSpawn::new(0.0).unwrap();
        assert!((0..100).all(|t| always.should_spawn(t, 0, &mut rng)));
        assert!((0..100).all(|t| !never.should_spawn(t, 0, &mut rng)));
        assert!(BernoulliSpawn::new(2.0).is_none());
    }
}
