//! Command line configuration.
//!
//! Running without flags monitors `/sys/block/sd*/stat` every five seconds.

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::platform::sysfs::{DevicePattern, SysfsMeasurement, DEFAULT_PATTERN};

/// Longest accepted sampling interval, one day. Keeps `Instant` arithmetic
/// in the ticker from overflowing.
pub const MAX_INTERVAL_SECS: u64 = 86_400;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Print block device utilization at a fixed interval"
)]
pub struct Config {
    /// Interval in seconds between samples, at most one day.
    #[arg(
        short,
        long,
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_SECS)
    )]
    pub interval: u64,

    /// Glob matching the per-device statistics files. Exactly one `*` in a
    /// directory segment; the device name is the segment it matches.
    #[arg(short, long, default_value = DEFAULT_PATTERN)]
    pub pattern: DevicePattern,

    /// Directory the sysfs paths are resolved under, e.g. a host's `/`
    /// mounted inside a container.
    #[arg(short, long, default_value = "/")]
    pub root: PathBuf,
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn measurement(&self) -> SysfsMeasurement {
        SysfsMeasurement::new(self.root.clone(), self.pattern.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::report::{Ticker, DEFAULT_INTERVAL};

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["disk-util"]).unwrap();
        assert_eq!(config.interval(), DEFAULT_INTERVAL);
        assert_eq!(config.pattern.to_string(), DEFAULT_PATTERN);
        assert_eq!(config.root, Path::new("/"));
    }

    #[test]
    fn overrides() {
        let config = Config::try_parse_from([
            "disk-util",
            "-i",
            "1",
            "--pattern",
            "/sys/block/nvme*/stat",
            "--root",
            "/host",
        ])
        .unwrap();
        assert_eq!(config.interval(), Duration::from_secs(1));
        assert!(config.pattern.matches("nvme0n1"));
        assert_eq!(config.measurement().pattern(), &config.pattern);
    }

    #[test]
    fn rejects_zero_interval() {
        assert!(Config::try_parse_from(["disk-util", "-i", "0"]).is_err());
    }

    #[test]
    fn rejects_interval_beyond_one_day() {
        let max = MAX_INTERVAL_SECS.to_string();
        let config =
            Config::try_parse_from(["disk-util", "-i", max.as_str()]).unwrap();
        assert_eq!(config.interval(), Duration::from_secs(86_400));

        for huge in ["86401", "18446744073709551615"] {
            let result = Config::try_parse_from(["disk-util", "-i", huge]);
            assert!(result.is_err(), "{huge}");
        }
    }

    #[test]
    fn maximum_interval_drives_a_ticker() {
        let max = MAX_INTERVAL_SECS.to_string();
        let config =
            Config::try_parse_from(["disk-util", "-i", max.as_str()]).unwrap();
        let ticker = Ticker::new(config.interval());
        assert_eq!(ticker.period(), config.interval());
    }

    #[test]
    fn rejects_pattern_without_wildcard() {
        let result =
            Config::try_parse_from(["disk-util", "-p", "/sys/block/sda/stat"]);
        assert!(result.is_err());
    }
}
