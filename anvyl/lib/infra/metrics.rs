use std::time::Duration;

use sysinfo::{Disks, System};

use crate::AnvylResult;

use super::HostMetricsResponse;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Samples CPU, memory, disk and load for the local machine.
///
/// CPU usage needs two refreshes a short interval apart, so the sample runs
/// on the blocking pool.
pub async fn sample_local_metrics() -> AnvylResult<HostMetricsResponse> {
    let metrics = tokio::task::spawn_blocking(sample_blocking)
        .await
        .map_err(crate::AnvylError::custom)?;

    Ok(metrics)
}

fn sample_blocking() -> HostMetricsResponse {
    let mut system = System::new_all();
    std::thread::sleep(Duration::from_millis(250));
    system.refresh_cpu_usage();
    system.refresh_memory();

    let disks = Disks::new_with_refreshed_list();
    let (disk_total, disk_available) = disks.list().iter().fold((0u64, 0u64), |acc, disk| {
        (acc.0 + disk.total_space(), acc.1 + disk.available_space())
    });

    let load = System::load_average();

    HostMetricsResponse {
        cpu_percent: system.global_cpu_usage() as f64,
        memory_used: system.used_memory(),
        memory_total: system.total_memory(),
        disk_used: disk_total.saturating_sub(disk_available),
        disk_total,
        load: [load.one, load.five, load.fifteen],
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
