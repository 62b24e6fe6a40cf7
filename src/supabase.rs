use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::Client;
use serde::Serialize;

use crate::config::Device;
use crate::measurement::Measurement;

pub const READINGS_TABLE: &str = "scale_readings";
pub const HEARTBEATS_TABLE: &str = "scale_heartbeats";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One row of the readings table.
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    pub device_id: String,
    pub measured_at: DateTime<Local>,
    pub weight_kg: f64,
    pub body_fat_percent: f64,
    pub fat_mass_kg: f64,
    pub fat_free_mass_kg: f64,
    pub water_kg: f64,
    pub water_percent: f64,
    pub bmi: f64,
    pub is_stable: bool,
    pub raw_count: usize,
}

impl Reading {
    pub fn new(device_id: &str, measurement: &Measurement, is_stable: bool, raw_count: usize) -> Self {
        Reading {
            device_id: device_id.to_string(),
            measured_at: measurement.timestamp,
            weight_kg: measurement.weight_kg,
            body_fat_percent: measurement.body_fat_percent,
            fat_mass_kg: measurement.fat_mass_kg,
            fat_free_mass_kg: measurement.fat_free_mass_kg,
            water_kg: measurement.water_kg,
            water_percent: measurement.water_percent,
            bmi: measurement.bmi,
            is_stable,
            raw_count,
        }
    }
}

/// Where finished readings and heartbeats end up. Both tables are
/// append-only; there is no update or delete path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sink: Send + Sync {
    async fn insert_reading(&self, reading: &Reading) -> Result<(), anyhow::Error>;
    async fn insert_heartbeat(&self, device: &Device, version: &str) -> Result<(), anyhow::Error>;
}

/// Supabase backend reached through its PostgREST interface.
#[derive(Debug)]
pub struct Supabase {
    client: Client,
    base_url: String,
    service_key: String,
}

impl Supabase {
    pub fn new(base_url: &str, service_key: &str) -> Result<Self, anyhow::Error> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Supabase {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn insert<T: Serialize + Sync>(&self, table: &str, row: &T) -> Result<(), anyhow::Error> {
        let response = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await
            .with_context(|| format!("Failed to send insert request for {table}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Insert into {table} failed with status {status}: {body}");
        }

        Ok(())
    }
}

fn heartbeat_row(device: &Device, version: &str) -> serde_json::Value {
    serde_json::json!({
        "device_id": device.id,
        "device_name": device.name,
        "version": version,
    })
}

#[async_trait]
impl Sink for Supabase {
    async fn insert_reading(&self, reading: &Reading) -> Result<(), anyhow::Error> {
        self.insert(READINGS_TABLE, reading).await
    }

    async fn insert_heartbeat(&self, device: &Device, version: &str) -> Result<(), anyhow::Error> {
        self.insert(HEARTBEATS_TABLE, &heartbeat_row(device, version))
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Local;

    use super::*;

    #[test]
    fn reading_row_uses_the_backend_column_names() {
        let measurement = Measurement {
            timestamp: Local::now(),
            weight_kg: 85.3,
            body_fat_percent: 18.5,
            fat_mass_kg: 15.8,
            fat_free_mass_kg: 69.5,
            water_kg: 50.2,
            water_percent: 58.8,
            bmi: 24.7,
        };
        let reading = Reading::new("lobby", &measurement, true, 2);

        let row = serde_json::to_value(&reading).unwrap();
        assert_eq!(row["device_id"], "lobby");
        assert_eq!(row["weight_kg"], 85.3);
        assert_eq!(row["body_fat_percent"], 18.5);
        assert_eq!(row["fat_mass_kg"], 15.8);
        assert_eq!(row["fat_free_mass_kg"], 69.5);
        assert_eq!(row["water_kg"], 50.2);
        assert_eq!(row["water_percent"], 58.8);
        assert_eq!(row["bmi"], 24.7);
        assert_eq!(row["is_stable"], true);
        assert_eq!(row["raw_count"], 2);
        assert!(row["measured_at"].is_string());
    }

    #[test]
    fn heartbeat_row_carries_identity_and_version() {
        let device = Device {
            id: "default".to_string(),
            name: "Tanita TBF-400".to_string(),
        };

        let row = heartbeat_row(&device, "0.1.0");
        assert_eq!(row["device_id"], "default");
        assert_eq!(row["device_name"], "Tanita TBF-400");
        assert_eq!(row["version"], "0.1.0");
    }

    #[test]
    fn table_urls_tolerate_a_trailing_slash() {
        let supabase = Supabase::new("https://example.supabase.co/", "service-key").unwrap();
        assert_eq!(
            supabase.table_url(READINGS_TABLE),
            "https://example.supabase.co/rest/v1/scale_readings"
        );
    }
}
