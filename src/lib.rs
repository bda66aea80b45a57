pub use comm::{channel_world, ChannelEndpoint, Communicator, SoloEndpoint};
pub use config::Inputs;
pub use error::{CommError, ConfigError, SimError, SimResult, TopologyError, WireError};
pub use exchange::BoundaryExchange;
pub use launch::{launch, run_reference};
pub use report::RunReport;
pub use segment::Segment;
pub use simulation::{Simulation, WorkerOutcome};
pub use slotmap::{Key, KeyData};
pub use spawn::{BernoulliSpawn, NoSpawn, ScheduledSpawn, SpawnPolicy};
pub use statistic::{Moments, Statistic, Summary};
pub use topology::{partition, SegmentBounds, SegmentRole, Topology};
pub use transfer::TransferRecord;
pub use vehicle::{Rules, Vehicle};
use slotmap::{new_key_type, SlotMap};

pub mod comm;
mod config;
mod error;
mod exchange;
mod launch;
pub mod reduction;
mod report;
pub mod road;
mod segment;
mod simulation;
mod spawn;
mod statistic;
mod topology;
pub mod transfer;
mod vehicle;

new_key_type! {
    /// The slot of a [Vehicle] in a segment's vehicle arena.
    pub struct VehicleKey;
}

/// Globally unique ID of a [Vehicle], minted by the leftmost segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VehicleId(pub u32);

type VehicleSet = SlotMap<VehicleKey, Vehicle>;
