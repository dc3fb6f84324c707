use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use crate::{error::DistError, partition::COORDINATOR};

/// Tag carried by band messages during the gather.
pub const BAND_TAG: u32 = 42;

/// A message exchanged between two ranks.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Identifies the kind of message.
    pub tag: u32,
    /// The raw bytes of the message.
    pub payload: Vec<u8>,
}

/// Blocking point-to-point messaging between the ranks of a process set.
///
/// Both `send` and `recv` block: `send` returns once the receiver has taken the
/// message and `recv` waits for the message of one specific rank.
pub trait Communicator: Send {
    /// The rank of this endpoint.
    fn rank(&self) -> usize;

    /// The number of ranks in the process set.
    fn size(&self) -> usize;

    /// Send `payload` to `dest`, blocking until it has been received.
    fn send(&self, dest: usize, tag: u32, payload: Vec<u8>) -> Result<(), DistError>;

    /// Receive the next message from `source`.
    ///
    /// With `timeout` set to `None` the call blocks until the message arrives.
    fn recv(
        &self,
        source: usize,
        tag: u32,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, DistError>;

    /// Drop every link held by this endpoint.
    ///
    /// Peers blocked on this endpoint wake up with [`DistError::WorkerLost`].
    /// The endpoint cannot be used afterwards.
    fn disconnect(&mut self);
}

/// In-process communicator linking every worker to the coordinator.
///
/// Each link is a rendezvous channel: a sender stays blocked until the
/// coordinator receives, which matches a synchronous send.
pub struct LocalCommunicator {
    rank: usize,
    size: usize,
    to_coordinator: Option<SyncSender<Message>>,
    from_workers: Vec<Option<Receiver<Message>>>,
}

impl std::fmt::Debug for LocalCommunicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCommunicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl LocalCommunicator {
    /// Create the endpoints of a process set with `size` ranks, in rank order.
    pub fn create(size: usize) -> Result<Vec<LocalCommunicator>, DistError> {
        if size == 0 {
            return Err(DistError::NoWorkers);
        }

        let mut from_workers = Vec::with_capacity(size);
        let mut workers = Vec::with_capacity(size - 1);
        from_workers.push(None);

        for rank in 1..size {
            let (tx, rx) = mpsc::sync_channel(0);
            from_workers.push(Some(rx));
            workers.push(LocalCommunicator {
                rank,
                size,
                to_coordinator: Some(tx),
                from_workers: Vec::new(),
            });
        }

        let coordinator = LocalCommunicator {
            rank: COORDINATOR,
            size,
            to_coordinator: None,
            from_workers,
        };

        Ok(std::iter::once(coordinator).chain(workers).collect())
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, dest: usize, tag: u32, payload: Vec<u8>) -> Result<(), DistError> {
        let route = DistError::NoRoute {
            from: self.rank,
            to: dest,
        };
        if dest != COORDINATOR {
            return Err(route);
        }
        let tx = self.to_coordinator.as_ref().ok_or(route)?;

        tx.send(Message { tag, payload })
            .map_err(|_| DistError::WorkerLost(dest))
    }

    fn recv(
        &self,
        source: usize,
        tag: u32,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, DistError> {
        let rx = self
            .from_workers
            .get(source)
            .and_then(Option::as_ref)
            .ok_or(DistError::NoRoute {
                from: source,
                to: self.rank,
            })?;

        let message = match timeout {
            None => rx.recv().map_err(|_| DistError::WorkerLost(source))?,
            Some(timeout) => rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => DistError::GatherTimeout { rank: source },
                RecvTimeoutError::Disconnected => DistError::WorkerLost(source),
            })?,
        };

        if message.tag != tag {
            return Err(DistError::UnexpectedTag {
                expected: tag,
                got: message.tag,
            });
        }
        Ok(message.payload)
    }

    fn disconnect(&mut self) {
        self.to_coordinator = None;
        self.from_workers.iter_mut().for_each(|rx| *rx = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ranks() -> Result<(), DistError> {
        let comms = LocalCommunicator::create(3)?;
        assert_eq!(
            comms.iter().map(|c| c.rank()).collect::<Vec<_>>(),
            [0, 1, 2]
        );
        assert!(comms.iter().all(|c| c.size() == 3));

        assert!(matches!(
            LocalCommunicator::create(0),
            Err(DistError::NoWorkers)
        ));
        Ok(())
    }

    #[test]
    fn test_send_recv() -> Result<(), DistError> {
        let mut comms = LocalCommunicator::create(2)?;
        let worker = comms.pop().ok_or(DistError::NoWorkers)?;
        let coordinator = comms.pop().ok_or(DistError::NoWorkers)?;

        let handle = std::thread::spawn(move || worker.send(0, BAND_TAG, vec![1, 2, 3]));
        let payload = coordinator.recv(1, BAND_TAG, None)?;
        assert_eq!(payload, vec![1, 2, 3]);
        handle.join().map_err(|_| DistError::WorkerPanicked(1))??;
        Ok(())
    }

    #[test]
    fn test_no_route() -> Result<(), DistError> {
        let comms = LocalCommunicator::create(3)?;
        assert_eq!(
            comms[1].send(2, BAND_TAG, vec![]),
            Err(DistError::NoRoute { from: 1, to: 2 })
        );
        assert_eq!(
            comms[1].recv(0, BAND_TAG, None),
            Err(DistError::NoRoute { from: 0, to: 1 })
        );
        assert_eq!(
            comms[0].recv(0, BAND_TAG, None),
            Err(DistError::NoRoute { from: 0, to: 0 })
        );
        Ok(())
    }

    #[test]
    fn test_unexpected_tag() -> Result<(), DistError> {
        let mut comms = LocalCommunicator::create(2)?;
        let worker = comms.pop().ok_or(DistError::NoWorkers)?;
        let coordinator = comms.pop().ok_or(DistError::NoWorkers)?;

        let handle = std::thread::spawn(move || worker.send(0, 7, vec![]));
        assert_eq!(
            coordinator.recv(1, BAND_TAG, None),
            Err(DistError::UnexpectedTag {
                expected: BAND_TAG,
                got: 7
            })
        );
        handle.join().map_err(|_| DistError::WorkerPanicked(1))??;
        Ok(())
    }

    #[test]
    fn test_recv_timeout() -> Result<(), DistError> {
        let comms = LocalCommunicator::create(2)?;
        assert_eq!(
            comms[0].recv(1, BAND_TAG, Some(Duration::from_millis(10))),
            Err(DistError::GatherTimeout { rank: 1 })
        );
        Ok(())
    }

    #[test]
    fn test_disconnect_wakes_peer() -> Result<(), DistError> {
        let mut comms = LocalCommunicator::create(2)?;
        let mut worker = comms.pop().ok_or(DistError::NoWorkers)?;
        let mut coordinator = comms.pop().ok_or(DistError::NoWorkers)?;

        worker.disconnect();
        assert_eq!(
            coordinator.recv(1, BAND_TAG, None),
            Err(DistError::WorkerLost(1))
        );

        coordinator.disconnect();
        assert_eq!(
            coordinator.recv(1, BAND_TAG, None),
            Err(DistError::NoRoute { from: 1, to: 0 })
        );
        Ok(())
    }

    #[test]
    fn test_send_to_lost_coordinator() -> Result<(), DistError> {
        let mut comms = LocalCommunicator::create(2)?;
        let worker = comms.pop().ok_or(DistError::NoWorkers)?;
        drop(comms);
        assert_eq!(
            worker.send(0, BAND_TAG, vec![1]),
            Err(DistError::WorkerLost(0))
        );
        Ok(())
    }
}
