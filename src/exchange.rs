//! The boundary exchange protocol.
//!
//! Every tick runs as a strict left-to-right pipeline. A segment with a left
//! neighbour first receives that neighbour's batch for the tick, then steps,
//! then sends its own batch to the right neighbour. A batch is always sent,
//! even when empty, since the right neighbour blocks until it arrives.

use crate::comm::Communicator;
use crate::error::{CommError, SimResult};
use crate::segment::Segment;
use crate::topology::SegmentRole;
use crate::transfer::{decode_count, decode_records, encode_count, encode_records, TransferRecord};
use log::trace;

/// Moves vehicles between a segment and its neighbours through a [Communicator].
pub struct BoundaryExchange<C> {
    comm: C,
    role: SegmentRole,
}

impl<C: Communicator> BoundaryExchange<C> {
    /// Creates the exchange for worker `comm.rank()`.
    pub fn new(comm: C, role: SegmentRole) -> Self {
        Self { comm, role }
    }

    /// The underlying communicator.
    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// The role of this segment.
    pub fn role(&self) -> SegmentRole {
        self.role
    }

    /// Blocks until the left neighbour's batch for this tick arrives.
    /// Segments without a left neighbour receive nothing.
    pub fn receive(&self) -> Result<Vec<TransferRecord>, CommError> {
        let Some(left) = self.role.left() else {
            return Ok(vec![]);
        };
        let malformed = |source| CommError::Malformed { peer: left, source };
        let count = decode_count(&self.comm.recv(left)?).map_err(malformed)?;
        let records = decode_records(&self.comm.recv(left)?, count).map_err(malformed)?;
        trace!("worker {} received {} vehicles", self.comm.rank(), records.len());
        Ok(records)
    }

    /// Receives the left neighbour's batch and adds its vehicles to the segment.
    /// Returns the number of vehicles that arrived.
    pub fn receive_into(&self, segment: &mut Segment) -> SimResult<usize> {
        let records = self.receive()?;
        for record in &records {
            segment.materialize(record)?;
        }
        Ok(records.len())
    }

    /// Sends a batch to the right neighbour.
    ///
    /// Returns the records back if there is no right neighbour, in which case
    /// the vehicles have left the road and must be retired by the caller.
    pub fn send(&self, records: Vec<TransferRecord>) -> SimResult<Option<Vec<TransferRecord>>> {
        let Some(right) = self.role.right() else {
            return Ok(Some(records));
        };
        let count = encode_count(records.len())?;
        let batch = encode_records(&records)?;
        self.comm.send(right, count)?;
        self.comm.send(right, batch)?;
        trace!("worker {} sent {} vehicles", self.comm.rank(), records.len());
        Ok(None)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comm::channel_world;
    use crate::vehicle::Rules;
    use crate::VehicleId;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::thread;

    const RULES: Rules = Rules {
        max_speed: 3,
        prob_slow_down: 0.0,
        prob_change: 0.0,
    };

    #[test]
    fn crossing_vehicle_lands_in_right_segment() {
        let mut world = channel_world(2).into_iter();
        let left = BoundaryExchange::new(world.next().unwrap(), SegmentRole::new(0, 2));
        let right = BoundaryExchange::new(world.next().unwrap(), SegmentRole::new(1, 2));

        let sender = thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(0);
            let mut seg = Segment::new(1, 5, RULES);
            seg.add_vehicle(VehicleId(3), 0, 4, 3).unwrap();
            let exits: Vec<_> = seg.step(&mut rng).into_iter().map(|(_, r)| r).collect();
            assert_eq!(exits.len(), 1);
            assert_eq!(left.send(exits).unwrap(), None);
            seg.num_vehicles()
        });

        let mut seg = Segment::new(1, 5, RULES);
        assert_eq!(right.receive_into(&mut seg).unwrap(), 1);
        assert_eq!(sender.join().unwrap(), 0);

        let veh = seg.find_vehicle(VehicleId(3)).unwrap();
        // 4 + 3 = 7 on the left segment, minus its 5 cells
        assert_eq!(veh.position(), 2);
        assert_eq!(veh.speed(), 3);
        assert_eq!(veh.time_on_road(), 1);
    }

    #[test]
    fn empty_batches_keep_the_pipeline_moving() {
        let mut world = channel_world(2).into_iter();
        let left = BoundaryExchange::new(world.next().unwrap(), SegmentRole::new(0, 2));
        let right = BoundaryExchange::new(world.next().unwrap(), SegmentRole::new(1, 2));

        let sender = thread::spawn(move || {
            for _ in 0..100 {
                left.send(vec![]).unwrap();
            }
        });
        for _ in 0..100 {
            assert!(right.receive().unwrap().is_empty());
        }
        sender.join().unwrap();
    }

    #[test]
    fn tail_retires_instead_of_sending() {
        let mut world = channel_world(2);
        let tail = BoundaryExchange::new(world.pop().unwrap(), SegmentRole::new(1, 2));
        let record = TransferRecord {
            lane: 0,
            id: VehicleId(1),
            position: 0,
            speed: 1,
            time_on_road: 4,
        };
        assert_eq!(tail.send(vec![record]).unwrap(), Some(vec![record]));
    }

    #[test]
    fn head_receives_nothing() {
        let world = channel_world(2);
        let head = BoundaryExchange::new(&world[0], SegmentRole::new(0, 2));
        assert!(head.receive().unwrap().is_empty());
    }

    #[test]
    fn malformed_count_is_fatal() {
        let mut world = channel_world(2).into_iter();
        let raw = world.next().unwrap();
        let right = BoundaryExchange::new(world.next().unwrap(), SegmentRole::new(1, 2));
        let sender = thread::spawn(move || raw.send(1, vec![1, 2]).unwrap());
        assert!(matches!(
            right.receive(),
            Err(CommError::Malformed { peer: 0, .. })
        ));
        sender.join().unwrap();
    }
}
