//! Result envelope and device model.
//!
//! The orchestrator consumes the scan result as a document, so everything
//! here is serde-serializable. Field names and the synthetic processor and
//! memory entries follow the inventory schema the surrounding scanner
//! expects for virtual machines.

use serde::Serialize;

/// Device type marker for the hypervisor host itself.
pub const DEVICE_TYPE_UNKNOWN: &str = "unknown";

/// Model name reported for every discovered VM.
pub const VM_MODEL_NAME: &str = "XEN Virtual Server";

/// Scan outcome status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Success,
    Error,
}

/// Top-level result envelope returned to the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Name of the plugin that produced this result.
    pub plugin: String,

    pub status: ScanStatus,

    /// Human-readable messages, in the order they were produced.
    pub messages: Vec<String>,

    /// The assembled device record; present only on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceInfo>,
}

impl ScanResult {
    /// Base result template: error status, no messages, no device.
    pub fn template(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            status: ScanStatus::Error,
            messages: Vec::new(),
            device: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ScanStatus::Success
    }
}

/// Host-level inventory document.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    /// Device type marker; the hypervisor host type is not determined here.
    #[serde(rename = "type")]
    pub device_type: String,

    /// The scanned address.
    pub system_ip_addresses: Vec<String>,

    /// One record per running VM.
    pub subdevices: Vec<VmDevice>,
}

/// Inventory record for one virtual machine.
#[derive(Debug, Clone, Serialize)]
pub struct VmDevice {
    pub model_name: String,
    pub mac_addresses: Vec<String>,
    /// The VM UUID serves as the serial number.
    pub serial_number: String,
    /// The VM display name serves as the hostname.
    pub hostname: String,
    pub processors: Vec<Processor>,
    pub memory: Vec<MemoryModule>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub disks: Option<Vec<Disk>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_shares: Option<Vec<DiskShare>>,
}

/// Synthetic processor entry; one per virtual CPU.
#[derive(Debug, Clone, Serialize)]
pub struct Processor {
    pub family: String,
    pub name: String,
    pub label: String,
    pub model_name: String,
    pub cores: u32,
    pub index: u32,
}

impl Processor {
    /// The fixed virtual-CPU entry at a 0-based index.
    pub fn virtual_cpu(index: u32) -> Self {
        Self {
            family: "XEN Virtual".to_string(),
            name: "XEN Virtual CPU".to_string(),
            label: format!("CPU {}", index),
            model_name: "XEN Virtual".to_string(),
            cores: 1,
            index,
        }
    }
}

/// Synthetic memory entry; one per VM.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryModule {
    pub family: String,
    /// Size in MiB.
    pub size: u64,
    pub label: String,
}

impl MemoryModule {
    pub fn virtual_module(size_mib: u64) -> Self {
        Self {
            family: "Virtual".to_string(),
            size: size_mib,
            label: "XEN Virtual".to_string(),
        }
    }
}

/// A plain local disk.
#[derive(Debug, Clone, Serialize)]
pub struct Disk {
    /// Size in MiB.
    pub size: u64,
    /// Guest device path.
    pub label: String,
    pub family: String,
}

impl Disk {
    pub fn xen_virtual(size_mib: u64, device: impl Into<String>) -> Self {
        Self {
            size: size_mib,
            label: device.into(),
            family: "XEN Virtual Disk".to_string(),
        }
    }
}

/// A disk backed by a shared/mounted volume, identified by its WWN.
#[derive(Debug, Clone, Serialize)]
pub struct DiskShare {
    /// World Wide Name of the backing volume.
    pub serial_number: String,
    pub is_virtual: bool,
    /// Mount size in MiB.
    pub size: u64,
    /// Guest device path.
    pub volume: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_processor_entry() {
        let cpu = Processor::virtual_cpu(1);
        assert_eq!(cpu.label, "CPU 1");
        assert_eq!(cpu.cores, 1);
        assert_eq!(cpu.index, 1);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ScanStatus::Success).unwrap(),
            json!("success")
        );
        assert_eq!(
            serde_json::to_value(ScanStatus::Error).unwrap(),
            json!("error")
        );
    }

    #[test]
    fn test_envelope_omits_empty_optionals() {
        let result = ScanResult::template("ssh_xen");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["plugin"], "ssh_xen");
        assert_eq!(value["status"], "error");
        assert!(value.get("device").is_none());

        let vm = VmDevice {
            model_name: VM_MODEL_NAME.to_string(),
            mac_addresses: vec![],
            serial_number: "vm-1".to_string(),
            hostname: "web01".to_string(),
            processors: vec![],
            memory: vec![],
            disks: None,
            disk_shares: None,
        };
        let value = serde_json::to_value(&vm).unwrap();
        assert!(value.get("disks").is_none());
        assert!(value.get("disk_shares").is_none());
    }
}
