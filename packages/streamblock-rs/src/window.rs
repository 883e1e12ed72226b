// Fixed-capacity sample window
//
// Keeps the most recent `capacity` samples, oldest first. The length never
// changes between resets: every append evicts the oldest sample, which is the
// drop-oldest behaviour of a ring buffer applied to a buffer that starts full.

use crate::types::Sample;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct WindowBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl WindowBuffer {
    /// Create a window holding `capacity` zero samples
    pub fn new(capacity: usize) -> Self {
        let mut window = Self::default();
        window.reset(capacity);
        window
    }

    /// Discard all history and refill with `capacity` zero samples
    pub fn reset(&mut self, capacity: usize) {
        self.samples.clear();
        self.samples.reserve(capacity);
        self.samples.resize(capacity, Sample::default());
        self.capacity = capacity;
    }

    /// Append a sample, evicting the oldest one
    ///
    /// Returns the evicted sample, if any.
    pub fn append(&mut self, sample: Sample) -> Option<Sample> {
        if self.capacity == 0 {
            return None;
        }

        let evicted = if self.samples.len() >= self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    /// Ordered copy of the window, oldest first
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    /// Value sequence of the window, oldest first
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: f64) -> Sample {
        Sample::new(value * 10.0, value)
    }

    #[test]
    fn test_reset_fills_zeros() {
        let window = WindowBuffer::new(4);
        assert_eq!(window.len(), 4);
        assert!(window
            .iter()
            .all(|s| s.timestamp == 0.0 && s.value == 0.0));
    }

    #[test]
    fn test_append_evicts_oldest() {
        let mut window = WindowBuffer::new(3);

        for v in 1..=4 {
            window.append(sample(v as f64));
        }

        assert_eq!(window.len(), 3);
        assert_eq!(window.values(), vec![2.0, 3.0, 4.0]);
        assert_eq!(window.snapshot()[0].timestamp, 20.0);
    }

    #[test]
    fn test_append_returns_evicted() {
        let mut window = WindowBuffer::new(2);
        assert_eq!(window.append(sample(1.0)), Some(Sample::default()));
        assert_eq!(window.append(sample(2.0)), Some(Sample::default()));
        assert_eq!(window.append(sample(3.0)), Some(sample(1.0)));
    }

    #[test]
    fn test_length_invariant_for_many_capacities() {
        for capacity in 1..=16 {
            let mut window = WindowBuffer::new(capacity);
            for v in 0..(capacity * 3) {
                window.append(sample(v as f64));
                assert_eq!(window.len(), capacity);
            }
            let expected: Vec<f64> = ((capacity * 2)..(capacity * 3)).map(|v| v as f64).collect();
            assert_eq!(window.values(), expected);
        }
    }

    #[test]
    fn test_reset_discards_history() {
        let mut window = WindowBuffer::new(2);
        window.append(sample(7.0));
        window.reset(5);
        assert_eq!(window.capacity(), 5);
        assert_eq!(window.values(), vec![0.0; 5]);
    }

    #[test]
    fn test_zero_capacity_is_inert() {
        let mut window = WindowBuffer::new(0);
        assert!(window.append(sample(1.0)).is_none());
        assert!(window.is_empty());
    }
}
