use crate::snapshot::Snapshot;
use std::panic::{catch_unwind, AssertUnwindSafe};

const STILL_WAITING: &str =
    "I'm still waiting for the first batch of system data. Please try again in a moment.";
const CAPABILITIES: &str =
    "I can answer questions about CPU, memory, disk, GPU, network, OS, and processes. How can I assist you?";
const INTERNAL_FAULT: &str = "I ran into an issue interpreting the data. Please try again.";

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const KIB: f64 = 1024.0;
const SECS_PER_HOUR: f64 = 3600.0;

/// Classifies a free-text query against a snapshot and renders the answer.
/// Pure and total: identical inputs always yield the identical string, and
/// no input makes it fail. A panic anywhere in the formatting path is caught
/// at this boundary and converted to a fixed message.
pub fn respond(query: &str, snapshot: Option<&Snapshot>) -> String {
    catch_unwind(AssertUnwindSafe(|| respond_inner(query, snapshot)))
        .unwrap_or_else(|_| INTERNAL_FAULT.to_string())
}

fn respond_inner(query: &str, snapshot: Option<&Snapshot>) -> String {
    let Some(snapshot) = snapshot else {
        return STILL_WAITING.to_string();
    };
    if snapshot.is_empty() {
        return STILL_WAITING.to_string();
    }

    let query = query.to_lowercase();
    match Topic::classify(&query) {
        Some(Topic::Cpu) => cpu_answer(snapshot),
        Some(Topic::Memory) => memory_answer(snapshot),
        Some(Topic::Disk) => disk_answer(snapshot),
        Some(Topic::Gpu) => gpu_answer(snapshot),
        Some(Topic::Network) => network_answer(snapshot),
        Some(Topic::Os) => os_answer(snapshot),
        Some(Topic::Process) => process_answer(snapshot),
        None => CAPABILITIES.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Cpu,
    Memory,
    Disk,
    Gpu,
    Network,
    Os,
    Process,
}

impl Topic {
    /// First matching topic wins; the priority order is fixed and total.
    fn classify(query: &str) -> Option<Self> {
        const KEYWORDS: &[(Topic, &[&str])] = &[
            (Topic::Cpu, &["cpu"]),
            (Topic::Memory, &["memory", "ram"]),
            (Topic::Disk, &["disk", "storage"]),
            (Topic::Gpu, &["gpu", "graphics"]),
            (Topic::Network, &["network"]),
            (Topic::Os, &["os", "system"]),
            (Topic::Process, &["process"]),
        ];

        KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|word| query.contains(word)))
            .map(|(topic, _)| *topic)
    }
}

fn cpu_answer(snapshot: &Snapshot) -> String {
    match snapshot.cpu.as_ref() {
        Some(cpu) if cpu.current_load.is_finite() => {
            let cores_text = if cpu.cpus.is_empty() {
                "multiple cores".to_string()
            } else {
                format!("{} cores", cpu.cpus.len())
            };
            format!(
                "✅ CPU load is currently at {:.1}%. The system is running on {cores_text}.",
                cpu.current_load
            )
        }
        _ => "I couldn't read the current CPU load.".to_string(),
    }
}

fn memory_answer(snapshot: &Snapshot) -> String {
    match snapshot.memory.as_ref() {
        Some(memory) if memory.total > 0 => format!(
            "✅ Memory usage is at {:.2} GB out of {:.2} GB total.",
            memory.used as f64 / GIB,
            memory.total as f64 / GIB
        ),
        _ => "I couldn't read memory usage data.".to_string(),
    }
}

fn disk_answer(snapshot: &Snapshot) -> String {
    if let Some(disk) = snapshot.disks.as_ref().and_then(|disks| disks.first()) {
        let use_text = match disk.use_percent {
            Some(percent) if percent.is_finite() => format!(" ({percent:.1}%)"),
            _ => String::new(),
        };
        return format!(
            "✅ The main disk has used {:.2} GB of {:.2} GB{use_text}.",
            disk.used as f64 / GIB,
            disk.size as f64 / GIB
        );
    }
    "I couldn't retrieve any disk storage information from the system.".to_string()
}

fn gpu_answer(snapshot: &Snapshot) -> String {
    if let Some(controller) = snapshot
        .gpu
        .as_ref()
        .and_then(|gpu| gpu.controllers.first())
    {
        let vendor = if controller.vendor.trim().is_empty() {
            "Unknown vendor"
        } else {
            controller.vendor.as_str()
        };
        let model = if controller.model.trim().is_empty() {
            "Unknown model"
        } else {
            controller.model.as_str()
        };
        return format!("✅ The graphics card is a {vendor} {model}.");
    }
    "I couldn't retrieve specific GPU details from the system.".to_string()
}

fn network_answer(snapshot: &Snapshot) -> String {
    if let Some(net) = snapshot
        .network
        .as_ref()
        .and_then(|interfaces| interfaces.first())
    {
        let down = if net.rx_bytes_per_sec.is_finite() {
            format!("{:.1}", net.rx_bytes_per_sec / KIB)
        } else {
            "0.0".to_string()
        };
        let up = if net.tx_bytes_per_sec.is_finite() {
            format!("{:.1}", net.tx_bytes_per_sec / KIB)
        } else {
            "0.0".to_string()
        };
        return format!(
            "✅ Current network speed is {down} KB/s download and {up} KB/s upload."
        );
    }
    "I couldn't retrieve any network activity information.".to_string()
}

fn os_answer(snapshot: &Snapshot) -> String {
    let (distro, platform) = match snapshot.os.as_ref() {
        Some(os) => (
            if os.distro.trim().is_empty() {
                "Unknown OS"
            } else {
                os.distro.as_str()
            },
            if os.platform.trim().is_empty() {
                "unknown platform"
            } else {
                os.platform.as_str()
            },
        ),
        None => ("Unknown OS", "unknown platform"),
    };

    let hours = match snapshot.uptime.as_ref() {
        Some(uptime) if uptime.seconds.is_finite() && uptime.seconds >= 0.0 => {
            format!("{:.2}", uptime.seconds / SECS_PER_HOUR)
        }
        _ => "unknown".to_string(),
    };

    format!(
        "✅ The OS is {distro} on the {platform} platform. The system has been running for {hours} hours."
    )
}

fn process_answer(snapshot: &Snapshot) -> String {
    if let Some(processes) = snapshot.processes.as_ref() {
        if let Some(top) = processes.list.first() {
            let name = if top.name.trim().is_empty() {
                "unknown process"
            } else {
                top.name.as_str()
            };
            let cpu = if top.cpu.is_finite() {
                format!("{:.1}", top.cpu)
            } else {
                "0.0".to_string()
            };
            let total = if processes.all > 0 {
                processes.all
            } else {
                processes.list.len() as u64
            };
            return format!(
                "✅ There are {total} processes running. The most active is \"{name}\" using {cpu}% of the CPU."
            );
        }
    }
    "I was unable to retrieve details about running processes.".to_string()
}
