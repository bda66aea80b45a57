//! End-of-run synchronisation and statistics reduction.

use crate::comm::Communicator;
use crate::error::{CommError, WireError};
use crate::statistic::Statistic;
use crate::transfer::{decode_moments, encode_moments};

/// The single-byte message used by [barrier].
const BARRIER_TOKEN: u8 = 0xBA;

fn expect_token(message: &[u8], peer: usize) -> Result<(), CommError> {
    match message {
        [BARRIER_TOKEN] => Ok(()),
        [other] => Err(CommError::Malformed {
            peer,
            source: WireError::BadToken(*other),
        }),
        _ => Err(CommError::Malformed {
            peer,
            source: WireError::Length {
                expected: 1,
                actual: message.len(),
            },
        }),
    }
}

/// Blocks until every worker has reached the barrier.
///
/// Every other worker reports to rank 0, which releases them all once the
/// last one arrives.
pub fn barrier<C: Communicator>(comm: &C) -> Result<(), CommError> {
    if comm.rank() == 0 {
        for source in 1..comm.size() {
            expect_token(&comm.recv(source)?, source)?;
        }
        for dest in 1..comm.size() {
            comm.send(dest, vec![BARRIER_TOKEN])?;
        }
    } else {
        comm.send(0, vec![BARRIER_TOKEN])?;
        expect_token(&comm.recv(0)?, 0)?;
    }
    Ok(())
}

/// Merges every worker's statistic on rank 0.
///
/// Every other worker sends its triple once and gets `None` back; rank 0
/// returns the merged statistic of the whole run.
pub fn reduce_statistic<C: Communicator>(
    comm: &C,
    local: &Statistic,
) -> Result<Option<Statistic>, CommError> {
    if comm.rank() != 0 {
        comm.send(0, encode_moments(&local.moments()))?;
        return Ok(None);
    }

    let mut total = *local;
    for source in 1..comm.size() {
        let moments = decode_moments(&comm.recv(source)?)
            .map_err(|source_err| CommError::Malformed {
                peer: source,
                source: source_err,
            })?;
        total.merge(&Statistic::from_moments(moments));
    }
    Ok(Some(total))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comm::{channel_world, SoloEndpoint};
    use assert_approx_eq::assert_approx_eq;
    use std::thread;

    #[test]
    fn reduction_matches_pooled_samples() {
        let samples: Vec<Vec<f64>> = vec![
            vec![10.0, 12.0, 14.0],
            vec![],
            vec![30.0],
            vec![20.0, 21.0, 22.0, 23.0],
        ];
        let pooled: Statistic = samples.iter().flatten().copied().collect();

        let handles: Vec<_> = channel_world(samples.len())
            .into_iter()
            .zip(samples)
            .map(|(comm, values)| {
                thread::spawn(move || {
                    let local: Statistic = values.into_iter().collect();
                    barrier(&comm).unwrap();
                    reduce_statistic(&comm, &local).unwrap()
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(results[1..].iter().all(Option::is_none));
        let total = results[0].unwrap();
        assert_eq!(total.count(), pooled.count());
        assert_approx_eq!(total.mean().unwrap(), pooled.mean().unwrap());
        assert_approx_eq!(total.variance().unwrap(), pooled.variance().unwrap());
    }

    #[test]
    fn solo_reduction_is_local() {
        let local: Statistic = [3.0, 5.0].into_iter().collect();
        barrier(&SoloEndpoint).unwrap();
        let total = reduce_statistic(&SoloEndpoint, &local).unwrap().unwrap();
        assert_eq!(total, local);
    }

    #[test]
    fn wrong_token_is_rejected() {
        assert!(expect_token(&[BARRIER_TOKEN], 1).is_ok());
        assert_eq!(
            expect_token(&[0], 1),
            Err(CommError::Malformed {
                peer: 1,
                source: WireError::BadToken(0)
            })
        );
        assert!(expect_token(&[], 1).is_err());
    }
}
