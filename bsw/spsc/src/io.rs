//! Endpoint traits
//!
//! Code that only moves elements along should not care about the capacity
//! or the tracking mode of the queue behind it. [`Reader`] and [`Writer`]
//! erase both and are object safe.

use crate::queue::{Receiver, Sender};

/// Consuming side of a queue
pub trait Reader<T> {
    fn empty(&self) -> bool;

    /// Oldest element; panics on an empty queue
    fn peek(&self) -> &T;

    /// Release the oldest element; panics on an empty queue
    fn advance(&mut self);

    fn size(&self) -> usize;

    /// Let `consumer` look at the oldest element, then release it
    fn read_with<R, F>(&mut self, consumer: F) -> R
    where
        F: FnOnce(&T) -> R,
        Self: Sized,
    {
        let result = consumer(self.peek());
        self.advance();
        result
    }
}

/// Producing side of a queue
pub trait Writer<T> {
    fn full(&self) -> bool;

    fn size(&self) -> usize;

    /// Append `value`, handing it back if the queue is full
    fn try_write(&mut self, value: T) -> Result<(), T>;

    /// Append `value`; panics on a full queue
    fn write(&mut self, value: T) {
        if self.try_write(value).is_err() {
            panic!("write to a full SPSC queue");
        }
    }
}

impl<T, const N: usize, const TRACK_CONSUMED: bool> Reader<T> for Receiver<'_, T, N, TRACK_CONSUMED> {
    fn empty(&self) -> bool {
        Receiver::empty(self)
    }

    fn peek(&self) -> &T {
        Receiver::peek(self)
    }

    fn advance(&mut self) {
        Receiver::advance(self)
    }

    fn size(&self) -> usize {
        Receiver::size(self)
    }
}

impl<T, const N: usize, const TRACK_CONSUMED: bool> Writer<T> for Sender<'_, T, N, TRACK_CONSUMED> {
    fn full(&self) -> bool {
        Sender::full(self)
    }

    fn size(&self) -> usize {
        Sender::size(self)
    }

    fn try_write(&mut self, value: T) -> Result<(), T> {
        Sender::try_write(self, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Queue;

    fn forward(from: &mut dyn Reader<u32>, to: &mut dyn Writer<u32>) -> usize {
        let mut moved = 0;
        while !from.empty() && !to.full() {
            to.write(*from.peek() * 10);
            from.advance();
            moved += 1;
        }
        moved
    }

    #[test]
    fn test_forward_between_queues_of_different_shape() {
        let mut input: Queue<u32, 4> = Queue::new();
        let mut output: Queue<u32, 2, true> = Queue::new();
        let (mut in_tx, mut in_rx) = input.split();
        let (mut out_tx, mut out_rx) = output.split();
        for value in 1..=3 {
            in_tx.write(value);
        }

        assert_eq!(forward(&mut in_rx, &mut out_tx), 2);
        assert_eq!(Reader::size(&in_rx), 1);
        assert_eq!(Writer::size(&out_tx), 2);
        assert_eq!(out_rx.read_with(|value| *value), 10);
        assert_eq!(out_rx.read_with(|value| *value + 1), 21);
        assert!(Reader::empty(&out_rx));
    }
}
