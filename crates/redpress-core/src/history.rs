use std::collections::VecDeque;
use std::time::SystemTime;

/// The transmit times of the most recent probes sent to a peer.
///
/// Always holds exactly `capacity` slots, oldest first; slots which have not
/// yet been filled by a probe are `None`. Pushing evicts the oldest slot.
#[derive(Debug, Clone)]
pub struct TransmitHistory {
    slots: VecDeque<Option<SystemTime>>,
}

impl TransmitHistory {
    /// Create an empty history. A zero `capacity` is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = VecDeque::with_capacity(capacity);
        slots.resize(capacity, None);
        Self { slots }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn push(&mut self, sent: SystemTime) {
        self.slots.pop_front();
        self.slots.push_back(Some(sent));
    }

    /// The transmit time of the probe sent `age` probes before the newest.
    ///
    /// `age` 0 is the newest probe. Returns `None` if `age` is beyond the
    /// capacity or the slot has not been filled yet.
    #[must_use]
    pub fn get(&self, age: usize) -> Option<SystemTime> {
        let capacity = self.capacity();
        if age < capacity {
            self.slots[capacity - 1 - age]
        } else {
            None
        }
    }

    /// The slots, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = Option<SystemTime>> + '_ {
        self.slots.iter().copied()
    }
}
