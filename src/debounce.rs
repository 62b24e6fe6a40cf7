use circular_buffer::CircularBuffer;

use crate::measurement::Measurement;

/// Most recent samples kept while waiting for the weight to settle.
pub const BUFFER_CAPACITY: usize = 10;

/// A reading released by the filter, ready to be stored.
#[derive(Debug, Clone, Copy)]
pub struct Emission {
    pub measurement: Measurement,
    pub is_stable: bool,
    pub raw_count: usize,
}

/// Debounces raw scale samples into one reading per stable window.
///
/// A person stepping on the scale produces a burst of in-motion samples
/// before the weight settles. The filter buffers recent samples and releases
/// the newest one once the last `required_count` weights agree within
/// `tolerance_kg`. A weight far from the previously released reading means
/// somebody else stepped on, so accumulation starts over.
#[derive(Debug)]
pub struct Debouncer {
    required_count: usize,
    tolerance_kg: f64,
    max_jump_kg: f64,
    buffer: CircularBuffer<BUFFER_CAPACITY, Measurement>,
    last_emitted_kg: Option<f64>,
}

impl Debouncer {
    pub fn new(required_count: usize, tolerance_kg: f64, max_jump_kg: f64) -> Self {
        Self {
            // a single sample can never demonstrate stability, and a window
            // larger than the buffer could never fill
            required_count: required_count.clamp(2, BUFFER_CAPACITY),
            tolerance_kg,
            max_jump_kg,
            buffer: CircularBuffer::new(),
            last_emitted_kg: None,
        }
    }

    /// Feeds one sample through the filter. Returns the reading to store
    /// once a stable window has been observed.
    pub fn add(&mut self, measurement: Measurement) -> Option<Emission> {
        if let Some(last_kg) = self.last_emitted_kg {
            if (measurement.weight_kg - last_kg).abs() > self.max_jump_kg {
                // likely a different person; restart accumulation
                self.buffer.clear();
                self.last_emitted_kg = None;
            }
        }

        self.buffer.push_back(measurement);
        if self.buffer.len() < self.required_count {
            return None;
        }

        let window = self
            .buffer
            .iter()
            .skip(self.buffer.len() - self.required_count)
            .map(|m| m.weight_kg);
        let mut min_kg = f64::INFINITY;
        let mut max_kg = f64::NEG_INFINITY;
        for kg in window {
            min_kg = min_kg.min(kg);
            max_kg = max_kg.max(kg);
        }
        if max_kg - min_kg > self.tolerance_kg {
            return None;
        }

        let newest = *self.buffer.back()?;
        let raw_count = self.buffer.len();
        self.last_emitted_kg = Some(newest.weight_kg);
        self.buffer.clear();

        Some(Emission {
            measurement: newest,
            is_stable: true,
            raw_count,
        })
    }

    /// Releases the newest buffered sample regardless of stability. Used on
    /// shutdown so a half-settled reading is not lost.
    pub fn force(&mut self) -> Option<Emission> {
        let newest = *self.buffer.back()?;
        self.last_emitted_kg = Some(newest.weight_kg);
        self.buffer.clear();

        Some(Emission {
            measurement: newest,
            is_stable: false,
            raw_count: 1,
        })
    }

    /// Number of samples currently waiting for the weight to settle.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
