use std::{
    io::Write,
    path::PathBuf,
    thread::sleep,
    time::{Duration, Instant},
};

use chrono::{DateTime, FixedOffset, Local, SecondsFormat};

use crate::{data::BlockDeviceStats, error::Result, Measurement};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
pub const HEADER: &str = "DEV,%UTIL,TIME";
pub const NO_DEVICES: &str = "No devices found";

/// One collection pass and the moment it completed.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub stats: Vec<BlockDeviceStats>,
    /// Monotonic clock reading used for elapsed time
    pub instant: Instant,
    /// Wall clock reading printed next to each device
    pub timestamp: DateTime<FixedOffset>,
}

impl Snapshot {
    pub fn now(stats: Vec<BlockDeviceStats>) -> Self {
        Snapshot {
            stats,
            instant: Instant::now(),
            timestamp: Local::now().fixed_offset(),
        }
    }
}

/// `name,utilization,timestamp` with two decimals and an RFC 3339
/// timestamp at second precision.
pub fn format_line(
    stats: &BlockDeviceStats,
    util: f64,
    timestamp: &DateTime<FixedOffset>,
) -> String {
    format!(
        "{},{:.2},{}",
        stats.name,
        util,
        timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Fixed period timer. Missed ticks are dropped rather than queued.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Ticker {
            period,
            next: Instant::now() + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Blocks until the next tick.
    pub fn wait(&mut self) {
        let now = Instant::now();
        match self.next.checked_duration_since(now) {
            Some(remaining) => {
                sleep(remaining);
                self.next += self.period;
            }
            None => self.next = now + self.period,
        }
    }
}

pub enum Startup<M, W> {
    /// Discovery matched nothing; the collector was never called.
    NoDevices,
    Running(Reporter<M, W>),
}

/// Owns the baseline sample set and prints utilization against it on every
/// tick.
pub struct Reporter<M, W> {
    measurement: M,
    devices: Vec<PathBuf>,
    baseline: Snapshot,
    out: W,
}

impl<M: Measurement, W: Write> Reporter<M, W> {
    /// Discovers devices, takes the baseline sample and prints the header.
    pub fn start(measurement: M, mut out: W) -> Result<Startup<M, W>> {
        let devices = measurement.block_devices()?;
        if devices.is_empty() {
            writeln!(out, "{NO_DEVICES}")?;
            out.flush()?;
            return Ok(Startup::NoDevices);
        }

        let baseline = Snapshot::now(measurement.block_device_stats(&devices)?);
        log::info!("monitoring {} block devices", devices.len());

        writeln!(out, "{HEADER}")?;
        out.flush()?;
        Ok(Startup::Running(Reporter {
            measurement,
            devices,
            baseline,
            out,
        }))
    }

    /// Ticks forever. Only a failure to write the report ends the loop.
    pub fn run(mut self, mut ticker: Ticker) -> Result<()> {
        loop {
            ticker.wait();
            self.tick()?;
        }
    }

    /// Collects a new sample set and reports it. A failed collection is
    /// logged and the baseline kept, so the next tick spans both periods.
    pub fn tick(&mut self) -> Result<()> {
        match self.measurement.block_device_stats(&self.devices) {
            Ok(stats) => self.report(Snapshot::now(stats)),
            Err(err) => {
                log::error!("Failed to load device stats: {err}");
                Ok(())
            }
        }
    }

    /// Prints one line per device of `current` against the baseline, then
    /// makes `current` the new baseline.
    pub fn report(&mut self, current: Snapshot) -> Result<()> {
        let elapsed = current
            .instant
            .saturating_duration_since(self.baseline.instant);
        for (stats, prev) in current.stats.iter().zip(&self.baseline.stats) {
            log::debug!(
                "{stats} (read {}, written {})",
                stats.bytes_read(),
                stats.bytes_written()
            );
            let util = stats.utilization(prev, elapsed);
            let line = format_line(stats, util, &current.timestamp);
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()?;
        self.baseline = current;
        Ok(())
    }
}
