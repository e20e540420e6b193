use std::path::PathBuf;

use crate::{data::BlockDeviceStats, error::Result};

pub trait Measurement {
    /// Logical paths of every device statistics file to monitor. An empty
    /// list is a valid answer.
    fn block_devices(&self) -> Result<Vec<PathBuf>>;

    /// Reads every device in `devices`, in order. Any failing device fails
    /// the whole call and no samples are returned.
    fn block_device_stats(
        &self,
        devices: &[PathBuf],
    ) -> Result<Vec<BlockDeviceStats>>;
}
