use std::time::Instant;

use crate::models::audio_models::SampleRange;

/// What one poll of the write cursor produced.
///
/// Ranges are yielded by [`Drain::ranges`] in emission order: for a wrapped
/// cursor the tail of the buffer comes before the head, which keeps the
/// signal in temporal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Cursor did not move.
    Idle,
    /// `[last, cursor)` with no wrap.
    Contiguous(SampleRange),
    /// `[last, capacity)` then, if the cursor is past 0, `[0, cursor)`.
    Wrapped {
        tail: SampleRange,
        head: Option<SampleRange>,
    },
}

impl Drain {
    pub fn ranges(&self) -> impl Iterator<Item = SampleRange> {
        let (first, second) = match *self {
            Drain::Idle => (None, None),
            Drain::Contiguous(range) => (Some(range), None),
            Drain::Wrapped { tail, head } => (Some(tail), head),
        };
        first.into_iter().chain(second)
    }

    pub fn sample_count(&self) -> usize {
        self.ranges().map(|r| r.len()).sum()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Drain::Idle)
    }
}

/// Tracks the last seen write cursor of a circular capture buffer and turns
/// each new cursor position into the sample ranges written since.
///
/// Every sample is emitted exactly once as long as the buffer is polled at
/// least once per lap. A device that writes more than `capacity` samples
/// between polls overwrites unread data; the drainer cannot see that from
/// the cursor alone (see [`OverrunDetector`]).
#[derive(Debug, Clone)]
pub struct RingBufferDrainer {
    capacity: usize,
    last_position: usize,
}

impl RingBufferDrainer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be positive");
        Self {
            capacity,
            last_position: 0,
        }
    }

    /// Forget the previous cursor. Called when a stream starts.
    pub fn reset(&mut self) {
        self.last_position = 0;
    }

    pub fn last_position(&self) -> usize {
        self.last_position
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Compute the ranges written since the previous poll and remember `cursor`.
    pub fn poll(&mut self, cursor: usize) -> Drain {
        let cursor = cursor % self.capacity;
        let last = self.last_position;
        self.last_position = cursor;

        if cursor == last {
            Drain::Idle
        } else if cursor > last {
            Drain::Contiguous(SampleRange::new(last, cursor))
        } else {
            Drain::Wrapped {
                tail: SampleRange::new(last, self.capacity),
                head: (cursor > 0).then(|| SampleRange::new(0, cursor)),
            }
        }
    }
}

/// Whether missed buffer laps are looked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrunPolicy {
    /// Lossy and silent.
    Ignore,
    /// Compare wall-clock time with drained samples and log a warning.
    #[default]
    DetectAndLog,
}

/// A poll that probably missed at least one full lap of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overrun {
    /// Samples the device should have produced since the previous poll.
    pub expected_samples: u64,
    /// Samples the drainer actually emitted.
    pub drained_samples: u64,
}

impl Overrun {
    pub fn lost_samples(&self) -> u64 {
        self.expected_samples.saturating_sub(self.drained_samples)
    }
}

/// Flags polls spaced so far apart that the device must have lapped the
/// buffer, based on the nominal sample rate.
#[derive(Debug, Clone)]
pub struct OverrunDetector {
    capacity: u64,
    sample_rate: u32,
    last_poll: Instant,
}

impl OverrunDetector {
    pub fn new(capacity: usize, sample_rate: u32, now: Instant) -> Self {
        Self {
            capacity: capacity as u64,
            sample_rate,
            last_poll: now,
        }
    }

    pub fn reset(&mut self, now: Instant) {
        self.last_poll = now;
    }

    pub fn observe(&mut self, drained_samples: usize, now: Instant) -> Option<Overrun> {
        let elapsed = now.saturating_duration_since(self.last_poll);
        self.last_poll = now;

        let expected_samples = (elapsed.as_secs_f64() * self.sample_rate as f64) as u64;
        if expected_samples < self.capacity {
            return None;
        }
        Some(Overrun {
            expected_samples,
            drained_samples: drained_samples as u64,
        })
    }
}
