use crate::comm::Communicator;
use crate::config::Inputs;
use crate::error::{SimResult, TopologyError};
use crate::exchange::BoundaryExchange;
use crate::reduction::{barrier, reduce_statistic};
use crate::report::RunReport;
use crate::segment::Segment;
use crate::spawn::SpawnPolicy;
use crate::statistic::Statistic;
use crate::topology::{SegmentBounds, SegmentRole, Topology};
use crate::transfer::TransferRecord;
use crate::vehicle::Rules;
use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

/// Mixes the worker rank into the configured seed so workers draw independent streams.
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Creates the random number generator of a worker.
pub fn worker_rng(seed: Option<u64>, rank: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ (rank as u64 + 1).wrapping_mul(SEED_MIX)),
        None => StdRng::from_entropy(),
    }
}

/// What one worker hands back at the end of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorkerOutcome {
    /// The worker's rank.
    pub rank: usize,
    /// The vehicles still on the segment after the final batch was received.
    pub resident: usize,
    /// The vehicles this worker spawned.
    pub spawned: u64,
    /// The vehicles that left the road on this worker, sampled or not.
    pub retired: u64,
    /// The travel time statistic gathered by this worker alone.
    pub local: Statistic,
    /// The combined report, present on rank 0 only.
    pub report: Option<RunReport>,
}

/// The simulation state of one worker, which owns one segment of the road.
pub struct Simulation<C> {
    /// The simulation inputs.
    inputs: Inputs,
    /// The part of the road this worker owns.
    bounds: SegmentBounds,
    /// The road cells and resident vehicles.
    segment: Segment,
    /// The link to the neighbouring workers.
    exchange: BoundaryExchange<C>,
    /// Decides when vehicles enter the road. Only the leftmost segment has one.
    spawner: Option<Box<dyn SpawnPolicy>>,
    rng: StdRng,
    /// Travel times of vehicles that left the road here.
    travel_time: Statistic,
    /// The number of completed ticks.
    tick: u64,
    spawned: u64,
    retired: u64,
}

impl<C: Communicator> Simulation<C> {
    /// Creates the simulation for worker `comm.rank()`.
    ///
    /// The spawn policy is dropped unless this worker owns the start of the road.
    pub fn new(
        inputs: &Inputs,
        topology: &Topology,
        comm: C,
        spawner: Option<Box<dyn SpawnPolicy>>,
    ) -> SimResult<Self> {
        if comm.size() != topology.size() {
            return Err(TopologyError::WorldMismatch {
                workers: comm.size(),
                segments: topology.size(),
            }
            .into());
        }
        let rank = comm.rank();
        let role = topology.role(rank);
        let bounds = topology.bounds(rank);
        Ok(Self {
            inputs: inputs.clone(),
            bounds,
            segment: Segment::new(inputs.lanes, bounds.length, Rules::from(inputs)),
            exchange: BoundaryExchange::new(comm, role),
            spawner: spawner.filter(|_| role.spawns()),
            rng: worker_rng(inputs.seed, rank),
            travel_time: Statistic::new(),
            tick: 0,
            spawned: 0,
            retired: 0,
        })
    }

    /// The rank of this worker.
    pub fn rank(&self) -> usize {
        self.exchange.comm().rank()
    }

    /// The role of this worker's segment.
    pub fn role(&self) -> SegmentRole {
        self.exchange.role()
    }

    /// The number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The road cells and resident vehicles.
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// Mutable access to the segment, for placing vehicles before a run.
    pub fn segment_mut(&mut self) -> &mut Segment {
        &mut self.segment
    }

    /// The travel time statistic gathered so far by this worker.
    pub fn statistic(&self) -> &Statistic {
        &self.travel_time
    }

    /// Runs one tick: receive, step, send or retire, then spawn.
    pub fn step(&mut self) -> SimResult<()> {
        let arrived = self.exchange.receive_into(&mut self.segment)?;

        let exits: Vec<TransferRecord> = self
            .segment
            .step(&mut self.rng)
            .into_iter()
            .map(|(_, record)| record)
            .collect();
        let leaving = exits.len();
        if let Some(finished) = self.exchange.send(exits)? {
            self.retire(&finished);
        }

        if let Some(policy) = self.spawner.as_deref_mut() {
            let spawned = self.segment.attempt_spawn(self.tick, policy, &mut self.rng);
            self.spawned += spawned as u64;
        }

        self.tick += 1;
        trace!(
            "worker {} tick {}: {} in, {} out, {} resident",
            self.rank(),
            self.tick,
            arrived,
            leaving,
            self.segment.num_vehicles()
        );
        Ok(())
    }

    /// Records vehicles that left the end of the road during the current tick.
    fn retire(&mut self, finished: &[TransferRecord]) {
        let finished_at = self.tick + 1;
        for record in finished {
            self.retired += 1;
            if finished_at > self.inputs.warmup_time {
                self.travel_time.add_value(record.travel_time());
            }
        }
    }

    /// Runs every tick, then combines the statistics of every worker.
    ///
    /// Every worker leaves the tick loop with no batch in flight, so the
    /// barrier can follow directly.
    pub fn run(mut self) -> SimResult<WorkerOutcome> {
        let start = Instant::now();
        info!(
            "worker {} ({:?}) owns cells {}..{}",
            self.rank(),
            self.role(),
            self.bounds.start,
            self.bounds.end()
        );

        while self.tick < self.inputs.max_time {
            self.step()?;
        }

        debug!("worker {} completed {} ticks", self.rank(), self.tick);
        let comm = self.exchange.comm();
        barrier(comm)?;
        let total = reduce_statistic(comm, &self.travel_time)?;
        let report = total.map(|total| RunReport {
            elapsed: start.elapsed(),
            ticks: self.tick,
            travel_time: total.summary(),
        });

        let outcome = WorkerOutcome {
            rank: self.rank(),
            resident: self.segment.num_vehicles(),
            spawned: self.spawned,
            retired: self.retired,
            local: self.travel_time,
            report,
        };
        info!(
            "worker {} finished: {} resident, {} spawned, {} retired",
            outcome.rank, outcome.resident, outcome.spawned, outcome.retired
        );
        Ok(outcome)
    }
}
