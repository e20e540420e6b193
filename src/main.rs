use std::{io, process};

use clap::Parser;
use disk_util::{config::Config, Measurement, Reporter, Startup, Ticker};
use env_logger::Env;

/// Runs the reporter until it stops and returns the process exit code: 0
/// when there is nothing to monitor, 1 when startup or output fails.
fn run<M: Measurement, W: io::Write>(
    measurement: M,
    out: W,
    ticker: Ticker,
) -> i32 {
    let reporter = match Reporter::start(measurement, out) {
        Ok(Startup::Running(reporter)) => reporter,
        Ok(Startup::NoDevices) => return 0,
        Err(err) => {
            log::error!("{err}");
            return 1;
        }
    };

    match reporter.run(ticker) {
        Ok(()) => 0,
        Err(err) => {
            log::error!("{err}");
            1
        }
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();

    let config = Config::parse();
    log::info!(
        "sampling {} under {} every {}s",
        config.pattern,
        config.root.display(),
        config.interval
    );

    let code = run(
        config.measurement(),
        io::stdout().lock(),
        Ticker::new(config.interval()),
    );
    process::exit(code);
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::{self, Write},
        path::Path,
        time::Duration,
    };

    use disk_util::SysfsMeasurement;

    use super::*;

    const STAT: &str = "4 0 8 1 2 0 16 3 0 100 4\n";

    /// Accepts `budget` bytes, then fails every write like a closed pipe.
    struct ClosingPipe {
        budget: usize,
    }

    impl Write for ClosingPipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.len() > self.budget {
                return Err(io::ErrorKind::BrokenPipe.into());
            }
            self.budget -= buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn measurement(root: &Path) -> SysfsMeasurement {
        SysfsMeasurement::new(root, "/sys/block/sd*/stat".parse().unwrap())
    }

    fn ticker() -> Ticker {
        Ticker::new(Duration::from_millis(1))
    }

    fn write_stat(root: &Path, device: &str, content: &str) {
        let dir = root.join("sys/block").join(device);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stat"), content).unwrap();
    }

    #[test]
    fn no_devices_exits_zero() {
        let root = tempfile::tempdir().unwrap();
        let mut out = Vec::new();

        assert_eq!(run(measurement(root.path()), &mut out, ticker()), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "No devices found\n");
    }

    #[test]
    fn discovery_failure_exits_one() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("sys")).unwrap();
        fs::write(root.path().join("sys/block"), "not a directory").unwrap();

        assert_eq!(run(measurement(root.path()), Vec::new(), ticker()), 1);
    }

    #[test]
    fn first_collection_failure_exits_one() {
        let root = tempfile::tempdir().unwrap();
        write_stat(root.path(), "sda", STAT);
        write_stat(root.path(), "sdb", "not counters\n");
        let mut out = Vec::new();

        assert_eq!(run(measurement(root.path()), &mut out, ticker()), 1);
        assert!(out.is_empty());
    }

    #[test]
    fn output_failure_exits_one() {
        let root = tempfile::tempdir().unwrap();
        write_stat(root.path(), "sda", STAT);
        let out = ClosingPipe {
            budget: "DEV,%UTIL,TIME\n".len(),
        };

        assert_eq!(run(measurement(root.path()), out, ticker()), 1);
    }
}
