//! The boundary wire format.
//!
//! A boundary batch is two messages: the record count as a little-endian `i32`,
//! then `count` fixed-size records of five little-endian `i32` fields
//! `{lane, id, position, speed, time_on_road}`. The statistics reduction sends
//! a single message of three little-endian `f64`s `{mean, variance, count}`.

use crate::error::WireError;
use crate::statistic::Moments;
use crate::VehicleId;

/// The size of one encoded [TransferRecord] in bytes.
pub const RECORD_SIZE: usize = 5 * 4;

/// The size of an encoded record count in bytes.
pub const COUNT_SIZE: usize = 4;

/// The size of an encoded [Moments] triple in bytes.
pub const MOMENTS_SIZE: usize = 3 * 8;

/// A snapshot of a vehicle crossing a segment boundary.
///
/// The `position` is in the receiving segment's local coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferRecord {
    pub lane: usize,
    pub id: VehicleId,
    pub position: usize,
    pub speed: usize,
    pub time_on_road: u32,
}

fn to_wire(field: &'static str, value: i64) -> Result<i32, WireError> {
    i32::try_from(value).map_err(|_| WireError::OutOfRange { field, value })
}

fn from_wire(field: &'static str, value: i32) -> Result<usize, WireError> {
    usize::try_from(value).map_err(|_| WireError::OutOfRange {
        field,
        value: value as i64,
    })
}

fn check_len(bytes: &[u8], expected: usize) -> Result<(), WireError> {
    if bytes.len() == expected {
        Ok(())
    } else {
        Err(WireError::Length {
            expected,
            actual: bytes.len(),
        })
    }
}

impl TransferRecord {
    /// The travel time sampled when the vehicle leaves the road.
    pub fn travel_time(&self) -> f64 {
        self.time_on_road as f64
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        let fields = [
            to_wire("lane", self.lane as i64)?,
            to_wire("id", self.id.0 as i64)?,
            to_wire("position", self.position as i64)?,
            to_wire("speed", self.speed as i64)?,
            to_wire("time_on_road", self.time_on_road as i64)?,
        ];
        for field in fields {
            out.extend_from_slice(&field.to_le_bytes());
        }
        Ok(())
    }

    fn read(chunk: &[u8]) -> Result<Self, WireError> {
        check_len(chunk, RECORD_SIZE)?;
        let mut fields = chunk
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]));
        let mut next = || fields.next().unwrap_or_default();
        let [lane, id, position, speed, time_on_road] = [next(), next(), next(), next(), next()];
        let id = u32::try_from(id).map_err(|_| WireError::OutOfRange {
            field: "id",
            value: id as i64,
        })?;
        Ok(Self {
            lane: from_wire("lane", lane)?,
            id: VehicleId(id),
            position: from_wire("position", position)?,
            speed: from_wire("speed", speed)?,
            time_on_road: from_wire("time_on_road", time_on_road)? as u32,
        })
    }
}

/// Encodes the count message that precedes a batch.
pub fn encode_count(count: usize) -> Result<Vec<u8>, WireError> {
    Ok(to_wire("count", count as i64)?.to_le_bytes().to_vec())
}

/// Decodes a count message.
pub fn decode_count(bytes: &[u8]) -> Result<usize, WireError> {
    check_len(bytes, COUNT_SIZE)?;
    let count = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    usize::try_from(count).map_err(|_| WireError::NegativeCount(count))
}

/// Encodes a batch of records into a single message.
pub fn encode_records(records: &[TransferRecord]) -> Result<Vec<u8>, WireError> {
    let mut out = Vec::with_capacity(records.len() * RECORD_SIZE);
    for record in records {
        record.write(&mut out)?;
    }
    Ok(out)
}

/// Decodes a batch message that must hold exactly `count` records.
pub fn decode_records(bytes: &[u8], count: usize) -> Result<Vec<TransferRecord>, WireError> {
    check_len(bytes, count * RECORD_SIZE)?;
    bytes.chunks_exact(RECORD_SIZE).map(TransferRecord::read).collect()
}

/// Encodes a statistics triple.
pub fn encode_moments(moments: &Moments) -> Vec<u8> {
    [moments.mean, moments.variance, moments.count as f64]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

/// Decodes a statistics triple.
pub fn decode_moments(bytes: &[u8]) -> Result<Moments, WireError> {
    check_len(bytes, MOMENTS_SIZE)?;
    let mut values = bytes.chunks_exact(8).map(|b| {
        let mut buf = [0; 8];
        buf.copy_from_slice(b);
        f64::from_le_bytes(buf)
    });
    let mut next = || values.next().unwrap_or_default();
    let [mean, variance, count] = [next(), next(), next()];
    if !(count >= 0.0 && count.fract() == 0.0) {
        return Err(WireError::OutOfRange {
            field: "count",
            value: count as i64,
        });
    }
    Ok(Moments {
        mean,
        variance,
        count: count as u64,
    })
}
