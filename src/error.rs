use std::path::PathBuf;
use thiserror::Error;

/// An error encountered while loading or validating the simulation inputs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// An error in the shape of the worker chain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("it takes at least 2 workers to run the simulation, got {0}")]
    TooFewWorkers(usize),

    #[error("road of length {length} cannot be split across {workers} workers")]
    RoadTooShort { length: usize, workers: usize },

    #[error("{workers} workers cannot run {segments} segments")]
    WorldMismatch { workers: usize, segments: usize },

    #[error("segment {rank} has {length} cells, fewer than max_speed ({max_speed})")]
    SegmentTooShort {
        rank: usize,
        length: usize,
        max_speed: usize,
    },
}

/// A failure of the message channel between two workers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommError {
    #[error("worker {peer} disconnected")]
    Disconnected { peer: usize },

    #[error("no such worker {0}")]
    InvalidPeer(usize),

    #[error("malformed message from worker {peer}")]
    Malformed {
        peer: usize,
        #[source]
        source: WireError,
    },
}

/// A message that does not match the boundary wire format.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("negative record count {0}")]
    NegativeCount(i32),

    #[error("field `{field}` value {value} does not fit the wire format")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("unexpected control token {0:#04x}")]
    BadToken(u8),
}

/// Any failure that aborts a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Comm(#[from] CommError),

    #[error("cannot encode outgoing transfer")]
    Encode(#[from] WireError),

    #[error("transfer for unknown lane {0}")]
    UnknownLane(i32),

    #[error("lane {lane} has no free cell to receive vehicle {id}")]
    LaneSaturated { lane: usize, id: u32 },

    #[error("failed to start worker {rank}")]
    Thread {
        rank: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("worker {0} panicked")]
    WorkerPanicked(usize),
}

pub type SimResult<T> = Result<T, SimError>;
