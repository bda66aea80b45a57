//! Blocking point-to-point messaging between workers.
//!
//! Workers never share state. Everything that crosses between them is an
//! opaque byte message sent through a [Communicator]; the byte layout is
//! defined in [crate::transfer].

use crate::error::CommError;
use crossbeam_channel::{bounded, Receiver, Sender};

/// A worker's endpoint into the set of cooperating workers.
pub trait Communicator {
    /// The rank of this worker.
    fn rank(&self) -> usize;

    /// The number of workers.
    fn size(&self) -> usize;

    /// Sends a message to `dest`, blocking until it is accepted.
    fn send(&self, dest: usize, message: Vec<u8>) -> Result<(), CommError>;

    /// Receives the next message from `source`, blocking until one arrives.
    fn recv(&self, source: usize) -> Result<Vec<u8>, CommError>;
}

impl<C: Communicator + ?Sized> Communicator for &C {
    fn rank(&self) -> usize {
        (**self).rank()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn send(&self, dest: usize, message: Vec<u8>) -> Result<(), CommError> {
        (**self).send(dest, message)
    }

    fn recv(&self, source: usize) -> Result<Vec<u8>, CommError> {
        (**self).recv(source)
    }
}

/// An endpoint of an in-memory world of workers, backed by one channel per
/// ordered pair of workers.
pub struct ChannelEndpoint {
    rank: usize,
    senders: Vec<Option<Sender<Vec<u8>>>>,
    receivers: Vec<Option<Receiver<Vec<u8>>>>,
}

/// Creates the endpoints of a world of `size` workers, indexed by rank.
///
/// Channels are rendezvous channels, so a send completes only once the
/// matching receive has started.
pub fn channel_world(size: usize) -> Vec<ChannelEndpoint> {
    let mut endpoints: Vec<_> = (0..size)
        .map(|rank| ChannelEndpoint {
            rank,
            senders: (0..size).map(|_| None).collect(),
            receivers: (0..size).map(|_| None).collect(),
        })
        .collect();

    for src in 0..size {
        for dst in 0..size {
            if src == dst {
                continue;
            }
            let (tx, rx) = bounded(0);
            endpoints[src].senders[dst] = Some(tx);
            endpoints[dst].receivers[src] = Some(rx);
        }
    }
    endpoints
}

impl Communicator for ChannelEndpoint {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.senders.len()
    }

    fn send(&self, dest: usize, message: Vec<u8>) -> Result<(), CommError> {
        let tx = self
            .senders
            .get(dest)
            .and_then(Option::as_ref)
            .ok_or(CommError::InvalidPeer(dest))?;
        tx.send(message)
            .map_err(|_| CommError::Disconnected { peer: dest })
    }

    fn recv(&self, source: usize) -> Result<Vec<u8>, CommError> {
        let rx = self
            .receivers
            .get(source)
            .and_then(Option::as_ref)
            .ok_or(CommError::InvalidPeer(source))?;
        rx.recv()
            .map_err(|_| CommError::Disconnected { peer: source })
    }
}

/// The endpoint of a world with a single worker, which has no peers.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoloEndpoint;

impl Communicator for SoloEndpoint {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send(&self, dest: usize, _message: Vec<u8>) -> Result<(), CommError> {
        Err(CommError::InvalidPeer(dest))
    }

    fn recv(&self, source: usize) -> Result<Vec<u8>, CommError> {
        Err(CommError::InvalidPeer(source))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn messages_arrive_in_order() {
        let mut world = channel_world(2).into_iter();
        let (a, b) = (world.next().unwrap(), world.next().unwrap());
        let handle = std::thread::spawn(move || {
            a.send(1, vec![1]).unwrap();
            a.send(1, vec![2, 2]).unwrap();
        });
        assert_eq!(b.recv(0).unwrap(), vec![1]);
        assert_eq!(b.recv(0).unwrap(), vec![2, 2]);
        handle.join().unwrap();
    }

    #[test]
    fn self_send_is_invalid() {
        let world = channel_world(2);
        assert_eq!(world[0].send(0, vec![]), Err(CommError::InvalidPeer(0)));
        assert_eq!(world[0].recv(5), Err(CommError::InvalidPeer(5)));
    }

    #[test]
    fn dropped_peer_disconnects() {
        let mut world = channel_world(2);
        let b = world.pop().unwrap();
        drop(world);
        assert_eq!(b.recv(0), Err(CommError::Disconnected { peer: 0 }));
        assert_eq!(b.send(0, vec![]), Err(CommError::Disconnected { peer: 0 }));
    }

    #[test]
    fn send_waits_for_receiver() {
        let mut world = channel_world(3).into_iter();
        let receiver = world.next().unwrap();
        let sender = world.nth(1).unwrap();
        assert_eq!(sender.size(), 3);

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let handle = std::thread::spawn(move || {
            sender.send(0, vec![7]).unwrap();
            done_tx.send(()).unwrap();
        });
        let pending = Duration::from_millis(100);
        assert!(done_rx.recv_timeout(pending).is_err());

        assert_eq!(receiver.recv(2).unwrap(), vec![7]);
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        handle.join().unwrap();
    }
}
