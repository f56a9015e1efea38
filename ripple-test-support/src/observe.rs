//! Handlers that ship what they see out of the processor thread.

use crossbeam_channel::{ unbounded, Receiver, Sender };
use ripple::{ EventHandler, WorkHandler };

use crate::stress::Jitter;

/// One delivery as seen by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub consumer: usize,
    pub sequence: i64,
    pub value: i64,
    pub end_of_batch: bool,
    /// Size of the batch this event arrived in, as announced at batch start
    pub batch_size: i64,
}

pub fn observation_channel() -> (Sender<Observation>, Receiver<Observation>) {
    unbounded()
}

/// Forwards every event it handles, as a batch handler or as a pool member.
///
/// Work handlers do not see sequences, so the pool variant reports the event
/// value as the sequence; producers in the tests publish `value == sequence`.
pub struct ObservingHandler {
    consumer: usize,
    tx: Sender<Observation>,
    jitter: Option<Jitter>,
    batch_size: i64,
}

impl ObservingHandler {
    pub fn new(consumer: usize, tx: Sender<Observation>) -> Self {
        Self { consumer, tx, jitter: None, batch_size: 1 }
    }

    /// Spin a random amount before each event, so pool members drift apart
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = Some(jitter);
        self
    }

    fn observe(&mut self, sequence: i64, value: i64, end_of_batch: bool) -> anyhow::Result<()> {
        if let Some(jitter) = &mut self.jitter {
            jitter.pause();
        }
        self.tx.send(Observation {
            consumer: self.consumer,
            sequence,
            value,
            end_of_batch,
            batch_size: self.batch_size,
        })?;
        Ok(())
    }
}

impl EventHandler<i64> for ObservingHandler {
    fn on_event(&mut self, event: &i64, sequence: i64, end_of_batch: bool) -> anyhow::Result<()> {
        self.observe(sequence, *event, end_of_batch)
    }

    fn on_batch_start(&mut self, batch_size: i64) {
        self.batch_size = batch_size;
    }
}

impl WorkHandler<i64> for ObservingHandler {
    fn on_event(&mut self, event: &i64) -> anyhow::Result<()> {
        self.observe(*event, *event, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwards_observations() {
        let (tx, rx) = observation_channel();
        let mut handler = ObservingHandler::new(3, tx);
        handler.on_batch_start(2);
        EventHandler::on_event(&mut handler, &7, 7, true).unwrap();
        WorkHandler::on_event(&mut handler, &8).unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first, Observation {
            consumer: 3,
            sequence: 7,
            value: 7,
            end_of_batch: true,
            batch_size: 2,
        });
        assert_eq!(rx.try_recv().unwrap().sequence, 8);
    }

    #[test]
    fn test_closed_channel_is_a_fault() {
        let (tx, rx) = observation_channel();
        drop(rx);
        let mut handler = ObservingHandler::new(0, tx);
        assert!(EventHandler::on_event(&mut handler, &1, 1, false).is_err());
    }
}
