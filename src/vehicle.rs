use crate::config::Inputs;
use crate::road::Road;
use crate::transfer::TransferRecord;
use crate::{VehicleId, VehicleKey};
use arrayvec::ArrayVec;
use rand::Rng;

/// The parameters of the cellular automaton rules, shared by every vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rules {
    /// The maximum speed in cells per tick. Also the look-ahead distance.
    pub max_speed: usize,
    /// Probability of randomly slowing down.
    pub prob_slow_down: f64,
    /// Probability of taking an available lane change.
    pub prob_change: f64,
}

impl From<&Inputs> for Rules {
    fn from(inputs: &Inputs) -> Self {
        Self {
            max_speed: inputs.max_speed,
            prob_slow_down: inputs.prob_slow_down,
            prob_change: inputs.prob_change,
        }
    }
}

/// The gaps seen by a vehicle in one of the lanes beside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SideGap {
    lane: usize,
    forward: usize,
    backward: usize,
    free: bool,
}

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's slot in the local vehicle arena.
    key: VehicleKey,
    /// The globally unique vehicle ID.
    id: VehicleId,
    /// The lane number.
    lane: usize,
    /// The local cell index.
    position: usize,
    /// The position before the most recent move.
    prev_position: usize,
    /// The position after the most recent move, which may be past the segment.
    new_position: usize,
    /// The speed in cells per tick.
    speed: usize,
    /// The number of ticks spent on the road.
    time_on_road: u32,
    /// The free cells ahead in the current lane.
    gap_forward: usize,
    /// The gaps in the adjacent lanes.
    side_gaps: ArrayVec<SideGap, 2>,
    rules: Rules,
}

impl Vehicle {
    /// Creates a new vehicle. It must be added to a lane separately.
    pub(crate) fn new(
        key: VehicleKey,
        id: VehicleId,
        lane: usize,
        position: usize,
        speed: usize,
        rules: Rules,
    ) -> Self {
        Self {
            key,
            id,
            lane,
            position,
            prev_position: position,
            new_position: position,
            speed: usize::min(speed, rules.max_speed),
            time_on_road: 0,
            gap_forward: 0,
            side_gaps: ArrayVec::new(),
            rules,
        }
    }

    /// Reconstructs a vehicle that crossed into this segment.
    pub(crate) fn from_record(
        key: VehicleKey,
        record: &TransferRecord,
        position: usize,
        rules: Rules,
    ) -> Self {
        let mut vehicle = Self::new(key, record.id, record.lane, position, record.speed, rules);
        vehicle.time_on_road = record.time_on_road;
        vehicle
    }

    /// The vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The vehicle's slot in the local arena.
    pub fn key(&self) -> VehicleKey {
        self.key
    }

    /// The lane number the vehicle is in.
    pub fn lane(&self) -> usize {
        self.lane
    }

    /// The local cell index.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The position before the most recent move.
    pub fn prev_position(&self) -> usize {
        self.prev_position
    }

    /// The position after the most recent move.
    pub fn new_position(&self) -> usize {
        self.new_position
    }

    /// The speed in cells per tick.
    pub fn speed(&self) -> usize {
        self.speed
    }

    /// The number of ticks the vehicle has spent on the road.
    pub fn time_on_road(&self) -> u32 {
        self.time_on_road
    }

    /// The most recently computed forward gap.
    pub fn gap_forward(&self) -> usize {
        self.gap_forward
    }

    /// Recomputes the gaps around the vehicle.
    pub fn update_gaps(&mut self, road: &Road) {
        let look = self.rules.max_speed;
        self.gap_forward = road
            .lane(self.lane)
            .map(|lane| lane.gap_forward(self.position, look))
            .unwrap_or(0);
        self.side_gaps = road
            .adjacent_lanes(self.lane)
            .map(|lane| SideGap {
                lane: lane.number(),
                forward: lane.gap_forward(self.position, look),
                backward: lane.gap_backward(self.position, look),
                free: lane.is_free(self.position),
            })
            .collect();
    }

    /// Moves to an adjacent lane if the vehicle is blocked, another lane is better
    /// and it is safe to do so. Returns `true` if the vehicle changed lane.
    pub fn perform_lane_switch<R: Rng + ?Sized>(&mut self, road: &mut Road, rng: &mut R) -> bool {
        let wanted = usize::min(self.speed + 1, self.rules.max_speed);
        if self.gap_forward >= wanted {
            return false;
        }

        let target = self
            .side_gaps
            .iter()
            .filter(|side| side.free)
            .filter(|side| side.forward > self.gap_forward)
            .filter(|side| side.backward >= self.rules.max_speed)
            .fold(None::<SideGap>, |best, side| match best {
                Some(best) if best.forward >= side.forward => Some(best),
                _ => Some(*side),
            });

        let Some(target) = target else {
            return false;
        };
        if !rng.gen_bool(self.rules.prob_change) {
            return false;
        }

        if let Some(lane) = road.lane_mut(self.lane) {
            lane.remove_vehicle(self.position);
        }
        let moved = road
            .lane_mut(target.lane)
            .map(|lane| lane.insert_vehicle(self.position, self.key))
            .unwrap_or(false);
        debug_assert!(moved, "lane change into an occupied cell");
        self.lane = target.lane;
        true
    }

    /// Applies the longitudinal rules and moves the vehicle.
    ///
    /// Returns the time on road if the vehicle moved past the end of the segment,
    /// in which case it has already been removed from its lane.
    pub fn perform_lane_move<R: Rng + ?Sized>(&mut self, road: &mut Road, rng: &mut R) -> Option<u32> {
        // Accelerate, brake for the vehicle ahead, then randomly dawdle
        self.speed = usize::min(self.speed + 1, self.rules.max_speed);
        self.speed = usize::min(self.speed, self.gap_forward);
        if self.speed > 0 && rng.gen_bool(self.rules.prob_slow_down) {
            self.speed -= 1;
        }

        self.prev_position = self.position;
        self.new_position = self.position + self.speed;
        self.time_on_road += 1;

        let lane = road.lane_mut(self.lane)?;
        if self.new_position == self.position {
            return None;
        }
        lane.remove_vehicle(self.position);
        if self.new_position >= lane.length() {
            return Some(self.time_on_road);
        }
        let moved = lane.insert_vehicle(self.new_position, self.key);
        debug_assert!(moved, "vehicle moved into an occupied cell");
        self.position = self.new_position;
        None
    }
}
