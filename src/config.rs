use clap::Parser;

/// Forwards Tanita scale readings to a Supabase backend.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Config {
    /// Supabase project URL.
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: String,

    /// Supabase service role key (not the anon key).
    #[arg(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true)]
    pub supabase_service_key: String,

    /// Identifier attached to every stored reading.
    #[arg(long, env = "SCALE_DEVICE_ID", default_value = "default")]
    pub device_id: String,

    /// Human-readable device name reported with heartbeats.
    #[arg(long, env = "SCALE_DEVICE_NAME", default_value = "Tanita TBF-400")]
    pub device_name: String,

    /// Seconds between scale polls.
    #[arg(long, env = "SCALE_POLL_INTERVAL", default_value_t = 1)]
    pub poll_interval_secs: u64,

    /// Seconds between heartbeat reports.
    #[arg(long, env = "SCALE_HEARTBEAT_INTERVAL", default_value_t = 10)]
    pub heartbeat_interval_secs: u64,

    /// Consecutive samples whose weights must agree before a reading is stored.
    #[arg(long, env = "SCALE_REQUIRED_COUNT", default_value_t = 2)]
    pub required_count: usize,

    /// Maximum weight spread within a stable window, in kilograms.
    #[arg(long, env = "SCALE_TOLERANCE_KG", default_value_t = 0.1)]
    pub tolerance_kg: f64,

    /// Weight change treated as a new person stepping on, in kilograms.
    #[arg(long, env = "SCALE_MAX_JUMP_KG", default_value_t = 2.0)]
    pub max_jump_kg: f64,

    /// Store a single reading and exit.
    #[arg(long)]
    pub send_test_reading: bool,
}

/// Identity attached to every outgoing record, constant for the process
/// lifetime.
#[derive(Debug, Clone)]
pub struct Device {
    pub id: String,
    pub name: String,
}

impl Config {
    pub fn device(&self) -> Device {
        Device {
            id: self.device_id.clone(),
            name: self.device_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Config, clap::Error> {
        let mut args = vec![
            "scale-bridge",
            "--supabase-url",
            "https://example.supabase.co",
            "--supabase-service-key",
            "service-key",
        ];
        args.extend_from_slice(extra);
        Config::try_parse_from(args)
    }

    #[test]
    fn applies_defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.device_id, "default");
        assert_eq!(config.device_name, "Tanita TBF-400");
        assert_eq!(config.poll_interval_secs, 1);
        assert_eq!(config.heartbeat_interval_secs, 10);
        assert_eq!(config.required_count, 2);
        assert_eq!(config.tolerance_kg, 0.1);
        assert_eq!(config.max_jump_kg, 2.0);
        assert!(!config.send_test_reading);
    }

    #[test]
    fn accepts_overrides() {
        let config = parse(&[
            "--device-id",
            "lobby",
            "--device-name",
            "Tanita BC-545N",
            "--tolerance-kg",
            "0.2",
            "--send-test-reading",
        ])
        .unwrap();
        assert_eq!(config.device_id, "lobby");
        assert_eq!(config.device_name, "Tanita BC-545N");
        assert_eq!(config.tolerance_kg, 0.2);
        assert!(config.send_test_reading);
    }

    #[test]
    fn missing_service_key_is_an_error() {
        let result = Config::try_parse_from([
            "scale-bridge",
            "--supabase-url",
            "https://example.supabase.co",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn device_identity_comes_from_config() {
        let device = parse(&["--device-id", "gym-floor"]).unwrap().device();
        assert_eq!(device.id, "gym-floor");
        assert_eq!(device.name, "Tanita TBF-400");
    }
}
