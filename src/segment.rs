use crate::error::{SimError, SimResult};
use crate::road::Road;
use crate::spawn::SpawnPolicy;
use crate::transfer::TransferRecord;
use crate::vehicle::{Rules, Vehicle};
use crate::{VehicleId, VehicleKey, VehicleSet};
use log::{trace, warn};
use rand::rngs::StdRng;
use smallvec::SmallVec;

/// The vehicles that left a segment during one tick.
pub type Exits = SmallVec<[(VehicleKey, TransferRecord); 8]>;

/// The road cells and resident vehicles owned by one worker.
pub struct Segment {
    /// The lane cells, including the look-ahead buffer.
    road: Road,
    /// The resident vehicles.
    vehicles: VehicleSet,
    /// The CA rule parameters.
    rules: Rules,
    /// The next vehicle ID to mint, if this segment spawns vehicles.
    next_id: u32,
}

impl Segment {
    /// Creates an empty segment of `length` cells per lane.
    pub fn new(lanes: usize, length: usize, rules: Rules) -> Self {
        Self {
            road: Road::new(lanes, length, rules.max_speed),
            vehicles: VehicleSet::with_key(),
            rules,
            next_id: 0,
        }
    }

    /// The number of cells per lane owned by the segment.
    pub fn length(&self) -> usize {
        self.road.length()
    }

    /// The lane cells.
    pub fn road(&self) -> &Road {
        &self.road
    }

    /// The number of resident vehicles.
    pub fn num_vehicles(&self) -> usize {
        self.vehicles.len()
    }

    /// Iterates over the resident vehicles.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Gets a resident vehicle by its global ID.
    pub fn find_vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.values().find(|veh| veh.id() == id)
    }

    /// Places a new vehicle in a free cell, returning its key.
    pub fn add_vehicle(
        &mut self,
        id: VehicleId,
        lane: usize,
        position: usize,
        speed: usize,
    ) -> Option<VehicleKey> {
        let rules = self.rules;
        let free = self.road.lane(lane)?.is_free(position) && position < self.length();
        if !free {
            return None;
        }
        let key = self
            .vehicles
            .insert_with_key(|key| Vehicle::new(key, id, lane, position, speed, rules));
        self.road.lane_mut(lane)?.insert_vehicle(position, key);
        Some(key)
    }

    /// Reconstructs a vehicle that crossed in from the left neighbour.
    ///
    /// If its cell is taken it is placed in the nearest free cell instead,
    /// so an arriving vehicle is never dropped.
    pub fn materialize(&mut self, record: &TransferRecord) -> SimResult<VehicleKey> {
        let lane = self
            .road
            .lane(record.lane)
            .ok_or(SimError::UnknownLane(record.lane as i32))?;
        let position = lane
            .nearest_free(record.position)
            .ok_or(SimError::LaneSaturated {
                lane: record.lane,
                id: record.id.0,
            })?;
        if position != record.position {
            warn!(
                "vehicle {} displaced from cell {} to {} on arrival",
                record.id.0, record.position, position
            );
        }

        let rules = self.rules;
        let key = self
            .vehicles
            .insert_with_key(|key| Vehicle::from_record(key, record, position, rules));
        if let Some(lane) = self.road.lane_mut(record.lane) {
            lane.insert_vehicle(position, key);
        }
        Ok(key)
    }

    /// Gives every free first cell a chance to receive a new vehicle.
    /// Returns the number of vehicles spawned.
    pub fn attempt_spawn(
        &mut self,
        tick: u64,
        policy: &mut dyn SpawnPolicy,
        rng: &mut StdRng,
    ) -> usize {
        let mut spawned = 0;
        for lane in 0..self.road.num_lanes() {
            if !policy.should_spawn(tick, lane, rng) {
                continue;
            }
            let id = VehicleId(self.next_id);
            if self.add_vehicle(id, lane, 0, self.rules.max_speed).is_some() {
                trace!("spawned vehicle {} in lane {}", id.0, lane);
                self.next_id += 1;
                spawned += 1;
            }
        }
        spawned
    }

    /// Advances every resident vehicle by one tick.
    ///
    /// Vehicles that move past the end of the segment are removed and returned
    /// as records in the right neighbour's coordinates.
    pub fn step(&mut self, rng: &mut StdRng) -> Exits {
        let keys: SmallVec<[VehicleKey; 64]> = self.vehicles.keys().collect();

        // Lane changes see the gaps left by every earlier lane change
        for &key in &keys {
            let vehicle = &mut self.vehicles[key];
            vehicle.update_gaps(&self.road);
            vehicle.perform_lane_switch(&mut self.road, rng);
            vehicle.update_gaps(&self.road);
        }

        // Markers from the previous tick have now been seen by the gap update
        self.road.clear_boundaries();

        let length = self.length();
        let mut exits = Exits::new();
        for &key in &keys {
            let vehicle = &mut self.vehicles[key];
            let Some(time_on_road) = vehicle.perform_lane_move(&mut self.road, rng) else {
                continue;
            };
            let new_pos = vehicle.new_position();
            if let Some(lane) = self.road.lane_mut(vehicle.lane()) {
                lane.mark_boundary(new_pos);
            }
            let record = TransferRecord {
                lane: vehicle.lane(),
                id: vehicle.id(),
                position: new_pos - length,
                speed: vehicle.speed(),
                time_on_road,
            };
            self.vehicles.remove(key);
            exits.push((key, record));
        }
        exits
    }
}
