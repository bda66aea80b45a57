use crate::statistic::Summary;
use std::fmt;
use std::time::Duration;

/// The end-of-run report printed by the leftmost worker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunReport {
    /// Wall-clock time spent simulating.
    pub elapsed: Duration,
    /// The number of ticks simulated.
    pub ticks: u64,
    /// The combined travel time statistics of every worker.
    pub travel_time: Summary,
}

impl RunReport {
    /// Average wall-clock seconds per tick.
    pub fn secs_per_tick(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.elapsed.as_secs_f64() / self.ticks as f64
        }
    }

    /// Ticks simulated per wall-clock second.
    pub fn ticks_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.ticks as f64 / secs
        } else {
            f64::INFINITY
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Simulation Performance ---")?;
        writeln!(f, "total computation time: {:.6} [s]", self.elapsed.as_secs_f64())?;
        writeln!(f, "average time per iteration: {:.9} [s]", self.secs_per_tick())?;
        writeln!(f, "average iterating frequency: {:.1} [iter/s]", self.ticks_per_sec())?;
        writeln!(f, "--- Combined Statistics Across All Processes ---")?;
        match self.travel_time {
            Summary::Samples {
                mean,
                std_dev,
                count,
            } => write!(f, "time on road: avg={}, std={}, N={}", mean, std_dev, count),
            Summary::Empty => write!(f, "time on road: no vehicles finished after warm-up, N=0"),
        }
    }
}
