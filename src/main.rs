use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use backon::ConstantBuilder;
use backon::Retryable;
use clap::Parser as _;
use config::Config;
use debounce::Debouncer;
use heartbeat::Heartbeat;
use log::LevelFilter;
use scale::Scale;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use supabase::{Reading, Sink as _, Supabase};

mod config;
mod debounce;
mod heartbeat;
mod measurement;
mod scale;
mod supabase;

const ERROR_PAUSE: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    TermLogger::init(
        LevelFilter::Info,
        ConfigBuilder::new()
            .set_time_format_rfc3339()
            .set_time_offset_to_local()
            .map_err(|_| anyhow::anyhow!("Failed to set time offset to local"))?
            .build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;

    if let Err(e) = run().await {
        log::error!("{e:#}");
    }

    Ok(())
}

pub async fn run() -> Result<(), anyhow::Error> {
    let config = Config::parse();
    let device = config.device();

    let supabase = Arc::new(
        Supabase::new(&config.supabase_url, &config.supabase_service_key)
            .context("Failed to initialize Supabase client")?,
    );

    let mut scale = Scale::new();

    if config.send_test_reading {
        let measurement = scale
            .poll()
            .context("Failed to read test measurement")?
            .ok_or_else(|| anyhow::anyhow!("Scale returned no reading"))?;
        let reading = Reading::new(&device.id, &measurement, true, 1);
        supabase
            .insert_reading(&reading)
            .await
            .context("Failed to store test reading")?;
        log::info!("Test reading stored: {:.1} kg", reading.weight_kg);
        return Ok(());
    }

    let mut debouncer = Debouncer::new(
        config.required_count,
        config.tolerance_kg,
        config.max_jump_kg,
    );

    let retry = ConstantBuilder::default()
        .with_delay(Duration::from_millis(500))
        .with_max_times(2);

    let mut heartbeat = Heartbeat::start(
        Arc::clone(&supabase),
        device.clone(),
        Duration::from_secs(config.heartbeat_interval_secs),
    );

    log::info!(
        "Scale bridge started: device {} ({}), backend {}",
        device.id,
        device.name,
        config.supabase_url
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Interrupt received, shutting down");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = tick(&mut scale, &mut debouncer, supabase.as_ref(), &device.id, retry).await {
                    log::error!("{e:#}");
                    tokio::time::sleep(ERROR_PAUSE).await;
                }
            }
        }
    }

    if let Some(emission) = debouncer.force() {
        let reading = Reading::new(
            &device.id,
            &emission.measurement,
            emission.is_stable,
            emission.raw_count,
        );
        match supabase.insert_reading(&reading).await {
            Ok(()) => log::info!("Flushed final reading: {:.1} kg (unstable)", reading.weight_kg),
            Err(e) => log::error!("Failed to flush final reading: {e:#}"),
        }
    }

    heartbeat.stop().await;

    Ok(())
}

async fn tick(
    scale: &mut Scale,
    debouncer: &mut Debouncer,
    supabase: &Supabase,
    device_id: &str,
    retry: ConstantBuilder,
) -> Result<(), anyhow::Error> {
    let measurement = match scale.poll() {
        Ok(Some(measurement)) => measurement,
        Ok(None) => return Ok(()),
        Err(e) => {
            log::warn!("Failed to poll scale: {e:#}");
            return Ok(());
        }
    };

    let Some(emission) = debouncer.add(measurement) else {
        log::debug!("Stabilizing ({} samples buffered)", debouncer.buffered());
        return Ok(());
    };

    let reading = Reading::new(
        device_id,
        &emission.measurement,
        emission.is_stable,
        emission.raw_count,
    );
    (|| supabase.insert_reading(&reading))
        .retry(retry)
        .notify(|e, dur| {
            log::error!("{e:#}");
            log::info!("Retrying in {dur:?}");
        })
        .await
        .context("Failed to store reading")?;

    log::info!(
        "Stored reading: {:.1} kg, body fat {:.1}% ({} samples)",
        reading.weight_kg,
        reading.body_fat_percent,
        reading.raw_count
    );

    Ok(())
}
