//! Starts one worker thread per segment and collects their outcomes.

use crate::comm::{channel_world, SoloEndpoint};
use crate::config::Inputs;
use crate::error::{CommError, SimError, SimResult};
use crate::simulation::{Simulation, WorkerOutcome};
use crate::spawn::SpawnPolicy;
use crate::topology::Topology;
use itertools::Itertools;
use log::{error, info};
use std::thread;

/// Runs the simulation distributed across `workers` segments.
///
/// Returns the outcome of every worker in rank order; rank 0's outcome
/// carries the combined report. Fails before any worker starts if the
/// worker count or the inputs are invalid.
pub fn launch(
    inputs: &Inputs,
    workers: usize,
    spawner: Box<dyn SpawnPolicy>,
) -> SimResult<Vec<WorkerOutcome>> {
    inputs.validate()?;
    let topology = Topology::new(inputs.length, workers, inputs.max_speed)?;
    info!(
        "splitting {} cells across {} workers: {}",
        inputs.length,
        workers,
        topology.iter().map(|seg| seg.length).join("/")
    );

    let mut spawner = Some(spawner);
    let sims = channel_world(workers)
        .into_iter()
        .map(|comm| Simulation::new(inputs, &topology, comm, spawner.take()))
        .collect::<SimResult<Vec<_>>>()?;

    let mut handles = Vec::with_capacity(workers);
    let mut start_error = None;
    for (rank, sim) in sims.into_iter().enumerate() {
        let handle = thread::Builder::new()
            .name(format!("segment-{}", rank))
            .spawn(move || sim.run());
        match handle {
            Ok(handle) => handles.push(handle),
            Err(source) => {
                // Dropping the remaining workers disconnects the running ones
                start_error = Some(SimError::Thread { rank, source });
                break;
            }
        }
    }

    let results = handles
        .into_iter()
        .enumerate()
        .map(|(rank, handle)| {
            handle
                .join()
                .unwrap_or(Err(SimError::WorkerPanicked(rank)))
        })
        .collect::<Vec<_>>();
    if let Some(err) = start_error {
        return Err(err);
    }

    let mut outcomes = Vec::with_capacity(workers);
    let mut errors = vec![];
    for result in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => errors.push(err),
        }
    }
    match root_cause(errors) {
        Some(err) => {
            error!("simulation aborted: {}", err);
            Err(err)
        }
        None => Ok(outcomes),
    }
}

/// Picks the error that brought the run down, rather than a peer's reaction to it.
fn root_cause(errors: Vec<SimError>) -> Option<SimError> {
    let is_reaction = |err: &SimError| matches!(err, SimError::Comm(CommError::Disconnected { .. }));
    let mut errors = errors.into_iter();
    let first = errors.next()?;
    if !is_reaction(&first) {
        return Some(first);
    }
    Some(errors.find(|err| !is_reaction(err)).unwrap_or(first))
}

/// Runs the whole road as a single segment on the calling thread.
///
/// Used as a baseline to compare distributed runs against.
pub fn run_reference(inputs: &Inputs, spawner: Box<dyn SpawnPolicy>) -> SimResult<WorkerOutcome> {
    inputs.validate()?;
    let topology = Topology::solo(inputs.length);
    Simulation::new(inputs, &topology, SoloEndpoint, Some(spawner))?.run()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::TopologyError;
    use crate::spawn::NoSpawn;

    #[test]
    fn one_worker_fails_before_starting() {
        let inputs = Inputs::default();
        let result = launch(&inputs, 1, Box::new(NoSpawn));
        assert!(matches!(
            result,
            Err(SimError::Topology(TopologyError::TooFewWorkers(1)))
        ));
    }

    #[test]
    fn disconnects_are_not_the_root_cause() {
        let errors = vec![
            SimError::Comm(CommError::Disconnected { peer: 1 }),
            SimError::UnknownLane(7),
            SimError::Comm(CommError::Disconnected { peer: 0 }),
        ];
        assert!(matches!(root_cause(errors), Some(SimError::UnknownLane(7))));
        assert!(root_cause(vec![]).is_none());
    }
}
