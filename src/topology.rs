//! Domain decomposition of the road into a linear chain of segments.

use crate::error::TopologyError;

/// The smallest number of workers the simulation runs with.
pub const MIN_WORKERS: usize = 2;

/// The position of a segment in the worker chain, which determines its neighbours.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentRole {
    /// The leftmost segment of a chain; vehicles spawn here.
    Head { right: usize },
    /// A segment with neighbours on both sides.
    Interior { left: usize, right: usize },
    /// The rightmost segment of a chain; vehicles retire here.
    Tail { left: usize },
    /// A segment covering the whole road on its own.
    Solo,
}

impl SegmentRole {
    /// Determines the role of worker `rank` in a chain of `size` workers.
    pub fn new(rank: usize, size: usize) -> Self {
        let last = size.saturating_sub(1);
        match rank {
            _ if size <= 1 => Self::Solo,
            0 => Self::Head { right: 1 },
            r if r == last => Self::Tail { left: r - 1 },
            r => Self::Interior {
                left: r - 1,
                right: r + 1,
            },
        }
    }

    /// The rank of the left neighbour, if there is one.
    pub fn left(&self) -> Option<usize> {
        match *self {
            Self::Interior { left, .. } | Self::Tail { left } => Some(left),
            Self::Head { .. } | Self::Solo => None,
        }
    }

    /// The rank of the right neighbour, if there is one.
    pub fn right(&self) -> Option<usize> {
        match *self {
            Self::Head { right } | Self::Interior { right, .. } => Some(right),
            Self::Tail { .. } | Self::Solo => None,
        }
    }

    /// Whether vehicles enter the road on this segment.
    pub fn spawns(&self) -> bool {
        self.left().is_none()
    }
}

/// The sub-range of the road owned by one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentBounds {
    /// The global cell index of the first cell in the segment.
    pub start: usize,
    /// The number of cells in the segment.
    pub length: usize,
}

impl SegmentBounds {
    /// The global cell index one past the end of the segment.
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// Splits a road as evenly as possible, giving the remainder to the lowest ranks.
pub fn partition(length: usize, workers: usize) -> Result<Vec<SegmentBounds>, TopologyError> {
    if workers < MIN_WORKERS {
        return Err(TopologyError::TooFewWorkers(workers));
    }
    if length < workers {
        return Err(TopologyError::RoadTooShort { length, workers });
    }
    let base = length / workers;
    let remainder = length % workers;
    let bounds = (0..workers)
        .map(|rank| SegmentBounds {
            start: rank * base + usize::min(rank, remainder),
            length: base + usize::from(rank < remainder),
        })
        .collect();
    Ok(bounds)
}

/// The chain of segments a run is distributed across.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topology {
    segments: Vec<SegmentBounds>,
}

impl Topology {
    /// Partitions the road, checking that every segment can hold a full move.
    pub fn new(length: usize, workers: usize, max_speed: usize) -> Result<Self, TopologyError> {
        let segments = partition(length, workers)?;
        if let Some((rank, seg)) = segments
            .iter()
            .enumerate()
            .find(|(_, seg)| seg.length < max_speed)
        {
            return Err(TopologyError::SegmentTooShort {
                rank,
                length: seg.length,
                max_speed,
            });
        }
        Ok(Self { segments })
    }

    /// A single segment covering the whole road, used for reference runs.
    pub fn solo(length: usize) -> Self {
        Self {
            segments: vec![SegmentBounds { start: 0, length }],
        }
    }

    /// The number of workers.
    pub fn size(&self) -> usize {
        self.segments.len()
    }

    /// The bounds of worker `rank`'s segment.
    pub fn bounds(&self, rank: usize) -> SegmentBounds {
        self.segments[rank]
    }

    /// The role of worker `rank`.
    pub fn role(&self, rank: usize) -> SegmentRole {
        SegmentRole::new(rank, self.size())
    }

    /// Iterates over the segments in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &SegmentBounds> {
        self.segments.iter()
    }
}
