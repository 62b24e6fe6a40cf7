use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub timestamp: DateTime<Local>,
    pub weight_kg: f64,
    pub body_fat_percent: f64,
    pub fat_mass_kg: f64,
    pub fat_free_mass_kg: f64,
    pub water_kg: f64,
    pub water_percent: f64,
    pub bmi: f64,
}
