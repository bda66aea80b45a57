use crate::VehicleKey;

/// The contents of a single cell of a lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    /// The cell is free.
    Empty,
    /// The cell is occupied by a resident vehicle.
    Vehicle(VehicleKey),
    /// A vehicle that has just crossed into the neighbouring segment.
    /// Only found in the look-ahead buffer.
    Boundary,
}

/// A single lane of the local road segment.
///
/// Cells `0..length` belong to the segment. They are followed by a look-ahead
/// buffer of `max_speed` cells which stands in for the start of the next segment.
#[derive(Clone, Debug)]
pub struct Lane {
    /// The lane number.
    number: usize,
    /// The number of cells owned by the segment.
    length: usize,
    /// The owned cells followed by the look-ahead buffer.
    cells: Vec<Cell>,
}

impl Lane {
    /// Creates an empty lane.
    pub fn new(number: usize, length: usize, buffer: usize) -> Self {
        Self {
            number,
            length,
            cells: vec![Cell::Empty; length + buffer],
        }
    }

    /// The lane number.
    pub fn number(&self) -> usize {
        self.number
    }

    /// The number of cells owned by the segment.
    pub fn length(&self) -> usize {
        self.length
    }

    /// One past the last cell of the look-ahead buffer.
    pub fn buffer_end(&self) -> usize {
        self.cells.len()
    }

    /// Gets the contents of a cell. Cells past the buffer are always empty.
    pub fn cell(&self, pos: usize) -> Cell {
        self.cells.get(pos).copied().unwrap_or(Cell::Empty)
    }

    /// Whether a cell is free.
    pub fn is_free(&self, pos: usize) -> bool {
        self.cell(pos) == Cell::Empty
    }

    /// Places a vehicle in an owned cell. Returns `false` if the cell is not free.
    pub(crate) fn insert_vehicle(&mut self, pos: usize, key: VehicleKey) -> bool {
        if pos >= self.length || !self.is_free(pos) {
            return false;
        }
        self.cells[pos] = Cell::Vehicle(key);
        true
    }

    /// Removes the vehicle in the given cell, if there is one.
    pub(crate) fn remove_vehicle(&mut self, pos: usize) -> Option<VehicleKey> {
        match self.cells.get(pos).copied() {
            Some(Cell::Vehicle(key)) => {
                self.cells[pos] = Cell::Empty;
                Some(key)
            }
            _ => None,
        }
    }

    /// Marks a look-ahead buffer cell as holding a vehicle owned by the next segment.
    pub(crate) fn mark_boundary(&mut self, pos: usize) {
        if (self.length..self.buffer_end()).contains(&pos) {
            self.cells[pos] = Cell::Boundary;
        }
    }

    /// Clears every boundary marker.
    pub(crate) fn clear_boundary(&mut self) {
        for cell in &mut self.cells[self.length..] {
            *cell = Cell::Empty;
        }
    }

    /// Counts the free cells directly ahead of `pos`, up to `look`.
    pub fn gap_forward(&self, pos: usize, look: usize) -> usize {
        (1..=look)
            .take_while(|d| self.is_free(pos + d))
            .count()
    }

    /// Counts the free cells directly behind `pos`, up to `look`.
    /// Cells before the start of the segment count as free.
    pub fn gap_backward(&self, pos: usize, look: usize) -> usize {
        (1..=look)
            .take_while(|&d| d > pos || self.is_free(pos - d))
            .count()
    }

    /// Finds the free owned cell nearest to `pos`, preferring cells behind it.
    pub fn nearest_free(&self, pos: usize) -> Option<usize> {
        let pos = usize::min(pos, self.length.checked_sub(1)?);
        (0..=pos)
            .rev()
            .chain(pos + 1..self.length)
            .find(|&p| self.is_free(p))
    }

    /// Iterates over the resident vehicles, back to front.
    pub fn vehicles(&self) -> impl Iterator<Item = (usize, VehicleKey)> + '_ {
        self.cells[..self.length]
            .iter()
            .enumerate()
            .filter_map(|(pos, cell)| match cell {
                Cell::Vehicle(key) => Some((pos, *key)),
                _ => None,
            })
    }
}

/// The cells of every lane in a worker's segment of the road.
#[derive(Clone, Debug)]
pub struct Road {
    lanes: Vec<Lane>,
}

impl Road {
    /// Creates an empty segment with `lanes` lanes of `length` cells,
    /// each followed by a look-ahead buffer of `max_speed` cells.
    pub fn new(lanes: usize, length: usize, max_speed: usize) -> Self {
        Self {
            lanes: (0..lanes)
                .map(|number| Lane::new(number, length, max_speed))
                .collect(),
        }
    }

    /// The number of lanes.
    pub fn num_lanes(&self) -> usize {
        self.lanes.len()
    }

    /// The number of cells owned by the segment, per lane.
    pub fn length(&self) -> usize {
        self.lanes.first().map(Lane::length).unwrap_or(0)
    }

    /// Looks up a lane by its number.
    pub fn lane(&self, number: usize) -> Option<&Lane> {
        self.lanes.iter().find(|lane| lane.number() == number)
    }

    /// Looks up a lane mutably by its number.
    pub(crate) fn lane_mut(&mut self, number: usize) -> Option<&mut Lane> {
        self.lanes.iter_mut().find(|lane| lane.number() == number)
    }

    /// The lanes directly beside the given lane.
    pub fn adjacent_lanes(&self, number: usize) -> impl Iterator<Item = &Lane> {
        let left = number.checked_sub(1).and_then(|n| self.lane(n));
        let right = self.lane(number + 1);
        left.into_iter().chain(right)
    }

    /// Iterates over the lanes.
    pub fn lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.iter()
    }

    /// Removes the boundary markers from every lane.
    pub(crate) fn clear_boundaries(&mut self) {
        for lane in &mut self.lanes {
            lane.clear_boundary();
        }
    }
}
