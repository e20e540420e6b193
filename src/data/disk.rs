use std::{fmt, time::Duration};

use bytesize::ByteSize;

/// The kernel reports block stat sectors in fixed 512-byte units,
/// independent of the device's logical block size.
pub const SECTOR_SIZE: u64 = 512;

/// Cumulative counters for one I/O direction of a block device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounters {
    /// Completed requests
    pub ios: u64,
    /// Requests merged with an already queued request
    pub merges: u64,
    /// Sectors transferred
    pub sectors: u64,
    /// Milliseconds spent on these requests
    pub ticks: u64,
}

impl RequestCounters {
    #[inline(always)]
    pub fn bytes(&self) -> ByteSize {
        ByteSize::b(self.sectors.saturating_mul(SECTOR_SIZE))
    }
}

/// One read of a device's `stat` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockDeviceStats {
    pub name: String,
    pub read: RequestCounters,
    pub write: RequestCounters,
    /// Requests currently in progress, not cumulative
    pub in_flight: u64,
    /// Milliseconds the device had at least one request outstanding
    /// (`io_ticks` in kernel terms)
    pub total_ticks: u64,
    /// Weighted milliseconds of queued work
    pub time_in_queue: u64,
}

impl BlockDeviceStats {
    /// Percentage of `elapsed` during which the device was busy, measured
    /// against an earlier sample of the same device.
    ///
    /// The counter delta is taken as a signed value, so a reset counter
    /// yields a negative percentage. Multi-queue devices can exceed 100.
    pub fn utilization(
        &self,
        prev: &BlockDeviceStats,
        elapsed: Duration,
    ) -> f64 {
        let busy = self.total_ticks as f64 - prev.total_ticks as f64;
        busy / elapsed.as_millis() as f64 * 100.0
    }

    #[inline(always)]
    pub fn bytes_read(&self) -> ByteSize {
        self.read.bytes()
    }

    #[inline(always)]
    pub fn bytes_written(&self) -> ByteSize {
        self.write.bytes()
    }
}

impl fmt::Display for BlockDeviceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {} {} {} {} {}",
            self.name,
            self.read.ios,
            self.read.merges,
            self.read.sectors,
            self.read.ticks,
            self.write.ios,
            self.write.merges,
            self.write.sectors,
            self.write.ticks,
            self.in_flight,
            self.total_ticks,
            self.time_in_queue,
        )
    }
}
