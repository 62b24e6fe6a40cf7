use chrono::Local;

use crate::measurement::Measurement;

/// Acquires finished readings from the scale.
///
/// A real TBF-400 speaks a serial protocol on its RS-232 port; wiring that in
/// means replacing the body of [`Scale::poll`] with the actual transport.
/// Until then every poll yields the reference sample, timestamped at capture.
#[derive(Debug)]
pub struct Scale {}

impl Scale {
    pub fn new() -> Scale {
        Scale {}
    }

    /// One finished measurement, or `None` when the scale has nothing new.
    pub fn poll(&mut self) -> Result<Option<Measurement>, anyhow::Error> {
        Ok(Some(Measurement {
            timestamp: Local::now(),
            weight_kg: 85.3,
            body_fat_percent: 18.5,
            fat_mass_kg: 15.8,
            fat_free_mass_kg: 69.5,
            water_kg: 50.2,
            water_percent: 58.8,
            bmi: 24.7,
        }))
    }
}
