use crate::collectors::CollectError;
use crate::snapshot::{
    CoreLoad, CpuStat, DiskStat, GpuControllerStat, GraphicsStat, MemoryStat, NetStat, OsStat,
    ProcessStat, ProcessesStat, UptimeStat,
};
use std::process::Command;
use std::sync::Mutex;
use std::time::Instant;
use sysinfo::{CpuExt, DiskExt, NetworkExt, NetworksExt, ProcessExt, System, SystemExt};

/// Adapter over the host telemetry source. Each category is an independent
/// fetch; the shared `System` handle is refreshed only for the subsystem a
/// fetch actually reads. Fetches run on blocking tasks and serialize on the
/// internal lock.
pub struct SystemProvider {
    system: Mutex<System>,
    net_refreshed_at: Mutex<Instant>,
    top_processes: usize,
}

impl SystemProvider {
    pub fn new(top_processes: usize) -> Self {
        Self {
            system: Mutex::new(System::new()),
            net_refreshed_at: Mutex::new(Instant::now()),
            top_processes,
        }
    }

    fn lock_system(&self) -> std::sync::MutexGuard<'_, System> {
        self.system.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn fetch_cpu(&self) -> Result<CpuStat, CollectError> {
        let mut system = self.lock_system();
        system.refresh_cpu();
        if system.cpus().is_empty() {
            return Err(CollectError::Empty("cpu"));
        }

        let cpus: Vec<CoreLoad> = system
            .cpus()
            .iter()
            .map(|cpu| CoreLoad {
                load: cpu.cpu_usage() as f64,
            })
            .collect();
        let current_load = cpus.iter().map(|core| core.load).sum::<f64>() / cpus.len() as f64;

        Ok(CpuStat { current_load, cpus })
    }

    pub fn fetch_memory(&self) -> Result<MemoryStat, CollectError> {
        let mut system = self.lock_system();
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return Err(CollectError::Empty("memory"));
        }

        Ok(MemoryStat {
            used: system.used_memory(),
            total,
        })
    }

    pub fn fetch_disks(&self) -> Result<Vec<DiskStat>, CollectError> {
        let mut system = self.lock_system();
        system.refresh_disks_list();
        system.refresh_disks();

        let disks = system
            .disks()
            .iter()
            .map(|disk| {
                let size = disk.total_space();
                let used = size.saturating_sub(disk.available_space());
                let use_percent = if size > 0 {
                    Some(used as f64 / size as f64 * 100.0)
                } else {
                    None
                };
                DiskStat {
                    mount: disk.mount_point().to_string_lossy().to_string(),
                    used,
                    size,
                    use_percent,
                }
            })
            .collect();

        Ok(disks)
    }

    pub fn fetch_gpu(&self) -> Result<GraphicsStat, CollectError> {
        let controllers = collect_gpu_controllers();
        if controllers.is_empty() {
            return Err(CollectError::Empty("gpu"));
        }
        Ok(GraphicsStat { controllers })
    }

    pub fn fetch_network(&self) -> Result<Vec<NetStat>, CollectError> {
        let mut system = self.lock_system();
        system.refresh_networks_list();
        system.refresh_networks();

        // sysinfo reports byte deltas since the previous refresh; divide by
        // the elapsed window to get per-second rates.
        let mut refreshed_at = self
            .net_refreshed_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let elapsed = refreshed_at.elapsed().as_secs_f64().max(0.001);
        *refreshed_at = Instant::now();

        let interfaces = system
            .networks()
            .iter()
            .map(|(iface, data)| NetStat {
                iface: iface.clone(),
                rx_bytes_per_sec: data.received() as f64 / elapsed,
                tx_bytes_per_sec: data.transmitted() as f64 / elapsed,
            })
            .collect();

        Ok(interfaces)
    }

    pub fn fetch_os(&self) -> Result<OsStat, CollectError> {
        let system = self.lock_system();
        let distro = match (system.name(), system.os_version()) {
            (Some(name), Some(version)) => format!("{name} {version}"),
            (Some(name), None) => name,
            _ => String::new(),
        };

        Ok(OsStat {
            distro,
            platform: std::env::consts::OS.to_string(),
        })
    }

    pub fn fetch_uptime(&self) -> Result<UptimeStat, CollectError> {
        let system = self.lock_system();
        Ok(UptimeStat {
            seconds: system.uptime() as f64,
        })
    }

    pub fn fetch_processes(&self) -> Result<ProcessesStat, CollectError> {
        let mut system = self.lock_system();
        system.refresh_processes();
        let processes = system.processes();
        if processes.is_empty() {
            return Err(CollectError::Empty("processes"));
        }

        let all = processes.len() as u64;
        let mut list: Vec<ProcessStat> = processes
            .values()
            .map(|process| ProcessStat {
                name: process.name().to_string(),
                cpu: process.cpu_usage() as f64,
            })
            .collect();
        // Index 0 must be the most active process.
        list.sort_by(|a, b| b.cpu.total_cmp(&a.cpu));
        list.truncate(self.top_processes);

        Ok(ProcessesStat { all, list })
    }
}

fn collect_gpu_controllers() -> Vec<GpuControllerStat> {
    let nvidia = collect_nvidia_controllers();
    if !nvidia.is_empty() {
        return nvidia;
    }
    collect_lspci_controllers()
}

fn collect_nvidia_controllers() -> Vec<GpuControllerStat> {
    let output = Command::new("nvidia-smi")
        .args(["--query-gpu=name", "--format=csv,noheader"])
        .output();

    let Ok(output) = output else {
        return Vec::new();
    };
    if !output.status.success() {
        return Vec::new();
    }
    let Ok(text) = String::from_utf8(output.stdout) else {
        return Vec::new();
    };

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|model| GpuControllerStat {
            vendor: "NVIDIA".to_string(),
            model: model.to_string(),
        })
        .collect()
}

fn collect_lspci_controllers() -> Vec<GpuControllerStat> {
    let output = Command::new("lspci").output();

    let Ok(output) = output else {
        return Vec::new();
    };
    if !output.status.success() {
        return Vec::new();
    }
    let Ok(text) = String::from_utf8(output.stdout) else {
        return Vec::new();
    };

    text.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            lower.contains("vga compatible controller") || lower.contains("3d controller")
        })
        .filter_map(|line| {
            let device = line.splitn(3, ':').nth(2)?.trim();
            if device.is_empty() {
                return None;
            }
            Some(GpuControllerStat {
                vendor: guess_gpu_vendor(device),
                model: device.to_string(),
            })
        })
        .collect()
}

fn guess_gpu_vendor(device: &str) -> String {
    let lower = device.to_lowercase();
    if lower.contains("nvidia") {
        "NVIDIA".to_string()
    } else if lower.contains("amd") || lower.contains("ati") || lower.contains("radeon") {
        "AMD".to_string()
    } else if lower.contains("intel") {
        "Intel".to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_fetch_always_reports_platform() {
        let provider = SystemProvider::new(10);
        let os = provider.fetch_os().expect("os fetch must succeed");
        assert!(!os.platform.is_empty());
    }

    #[test]
    fn uptime_is_non_negative() {
        let provider = SystemProvider::new(10);
        let uptime = provider.fetch_uptime().expect("uptime fetch must succeed");
        assert!(uptime.seconds >= 0.0);
    }

    #[test]
    fn process_list_is_ordered_by_cpu_descending_and_capped() {
        let provider = SystemProvider::new(3);
        let processes = provider
            .fetch_processes()
            .expect("process fetch must succeed");
        assert!(processes.list.len() <= 3);
        assert!(processes.all >= processes.list.len() as u64);
        for pair in processes.list.windows(2) {
            assert!(pair[0].cpu >= pair[1].cpu);
        }
    }

    #[test]
    fn memory_used_never_exceeds_total() {
        let provider = SystemProvider::new(10);
        let memory = provider.fetch_memory().expect("memory fetch must succeed");
        assert!(memory.total >= memory.used);
    }

    #[test]
    fn vendor_guess_recognizes_common_devices() {
        assert_eq!(guess_gpu_vendor("NVIDIA Corporation GA102"), "NVIDIA");
        assert_eq!(guess_gpu_vendor("Advanced Micro Devices AMD Radeon"), "AMD");
        assert_eq!(guess_gpu_vendor("Intel Corporation UHD Graphics"), "Intel");
        assert_eq!(guess_gpu_vendor("Matrox G200"), "");
    }
}
