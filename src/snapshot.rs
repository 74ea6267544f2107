use crate::collectors::system::SystemProvider;
use crate::collectors::CollectError;
use crate::metrics::Metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// One immutable bundle of all telemetry categories captured at a single
/// point in time. Every category may be absent when its fetch failed; the
/// response engine degrades per topic instead of failing the whole snapshot.
///
/// The same shape backs the `/stats` JSON body and the chat payload, so a
/// client can hand the bundle it polled straight back with its messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub cpu: Option<CpuStat>,
    #[serde(default)]
    pub memory: Option<MemoryStat>,
    #[serde(default)]
    pub gpu: Option<GraphicsStat>,
    #[serde(default)]
    pub processes: Option<ProcessesStat>,
    #[serde(default)]
    pub disks: Option<Vec<DiskStat>>,
    #[serde(default)]
    pub network: Option<Vec<NetStat>>,
    #[serde(default)]
    pub os: Option<OsStat>,
    #[serde(default)]
    pub uptime: Option<UptimeStat>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.cpu.is_none()
            && self.memory.is_none()
            && self.gpu.is_none()
            && self.processes.is_none()
            && self.disks.is_none()
            && self.network.is_none()
            && self.os.is_none()
            && self.uptime.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuStat {
    #[serde(rename = "currentLoad")]
    pub current_load: f64,
    #[serde(default)]
    pub cpus: Vec<CoreLoad>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreLoad {
    pub load: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStat {
    pub used: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphicsStat {
    #[serde(default)]
    pub controllers: Vec<GpuControllerStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuControllerStat {
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessesStat {
    pub all: u64,
    #[serde(default)]
    pub list: Vec<ProcessStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStat {
    #[serde(default)]
    pub name: String,
    pub cpu: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskStat {
    #[serde(default)]
    pub mount: String,
    pub used: u64,
    pub size: u64,
    #[serde(rename = "use", default)]
    pub use_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetStat {
    #[serde(default)]
    pub iface: String,
    #[serde(rename = "rx_sec")]
    pub rx_bytes_per_sec: f64,
    #[serde(rename = "tx_sec")]
    pub tx_bytes_per_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsStat {
    #[serde(default)]
    pub distro: String,
    #[serde(default)]
    pub platform: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeStat {
    pub seconds: f64,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("every telemetry category failed, first cause: {0}")]
    AllCategoriesFailed(CollectError),
}

/// Builds a fresh snapshot by issuing all eight category fetches
/// concurrently, each bounded by `timeout`. A failed category degrades to
/// `None`; only the total loss of every category is a request-level error.
pub async fn build_snapshot(
    provider: &Arc<SystemProvider>,
    timeout: Duration,
    metrics: &Metrics,
) -> Result<Snapshot, SnapshotError> {
    let (cpu, memory, gpu, processes, disks, network, os, uptime) = tokio::join!(
        fetch(provider, timeout, SystemProvider::fetch_cpu),
        fetch(provider, timeout, SystemProvider::fetch_memory),
        fetch(provider, timeout, SystemProvider::fetch_gpu),
        fetch(provider, timeout, SystemProvider::fetch_processes),
        fetch(provider, timeout, SystemProvider::fetch_disks),
        fetch(provider, timeout, SystemProvider::fetch_network),
        fetch(provider, timeout, SystemProvider::fetch_os),
        fetch(provider, timeout, SystemProvider::fetch_uptime),
    );

    let mut first_error: Option<CollectError> = None;
    let mut failed = 0_u32;

    let snapshot = Snapshot {
        cpu: keep("cpu", cpu, metrics, &mut failed, &mut first_error),
        memory: keep("memory", memory, metrics, &mut failed, &mut first_error),
        gpu: keep("gpu", gpu, metrics, &mut failed, &mut first_error),
        processes: keep(
            "processes",
            processes,
            metrics,
            &mut failed,
            &mut first_error,
        ),
        disks: keep("disks", disks, metrics, &mut failed, &mut first_error),
        network: keep("network", network, metrics, &mut failed, &mut first_error),
        os: keep("os", os, metrics, &mut failed, &mut first_error),
        uptime: keep("uptime", uptime, metrics, &mut failed, &mut first_error),
    };

    if failed == 8 {
        let cause = first_error.unwrap_or(CollectError::Timeout);
        return Err(SnapshotError::AllCategoriesFailed(cause));
    }

    Ok(snapshot)
}

fn keep<T>(
    category: &'static str,
    result: Result<T, CollectError>,
    metrics: &Metrics,
    failed: &mut u32,
    first_error: &mut Option<CollectError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(category, error = %err, "category collection failed");
            metrics.inc_collect_error(category);
            *failed += 1;
            if first_error.is_none() {
                *first_error = Some(err);
            }
            None
        }
    }
}

async fn fetch<T, F>(
    provider: &Arc<SystemProvider>,
    timeout: Duration,
    f: F,
) -> Result<T, CollectError>
where
    T: Send + 'static,
    F: FnOnce(&SystemProvider) -> Result<T, CollectError> + Send + 'static,
{
    let provider = Arc::clone(provider);
    let task = tokio::task::spawn_blocking(move || f(&provider));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(CollectError::Task(join_err.to_string())),
        Err(_elapsed) => Err(CollectError::Timeout),
    }
}
