//! Disk enumeration from `xe vm-disk-list --multiple`.
//!
//! In multiple mode the command interleaves VBD records (vm-name-label,
//! type, device) with VDI records (sr-uuid, uuid, virtual-size) as one flat
//! line sequence; not every field is repeated per record. A `virtual-size`
//! line therefore closes out a disk using whatever VM, SR, device and type
//! were seen most recently. The accumulator makes that carried context
//! explicit.

use indexmap::IndexMap;
use log::debug;

use super::{bytes_to_mib, commands, parse_number, sanitize_line, split_pair};
use crate::error::{Result, ScanError};
use crate::session::XeSession;

/// One virtual disk attached to a VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskObservation {
    /// VDI UUID.
    pub uuid: String,
    /// Owning storage repository UUID; the key for share correlation.
    pub sr_uuid: String,
    /// Virtual size in whole MiB.
    pub size_mib: u64,
    /// Guest device path (e.g. `xvda`).
    pub device: String,
}

/// Disk lists keyed by VM display name.
pub type DiskMap = IndexMap<String, Vec<DiskObservation>>;

/// Single-pass accumulator over vm-disk-list lines.
#[derive(Debug, Default)]
pub struct DiskAccumulator {
    vm: Option<String>,
    sr_uuid: Option<String>,
    uuid: Option<String>,
    device_type: Option<String>,
    device: Option<String>,
    disks: DiskMap,
}

impl DiskAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw output line.
    ///
    /// A `virtual-size` line emits a disk when the current device type is
    /// `Disk` (CD records are ignored); emitting without the carried VM, SR,
    /// UUID and device context is a parsing contract violation.
    pub fn feed(&mut self, line: &str) -> std::result::Result<(), ScanError> {
        let line = sanitize_line(line);
        if line.is_empty() {
            return Ok(());
        }
        let Some((key, value)) = split_pair(&line) else {
            return Ok(());
        };
        match key {
            "vm-name-label" => self.vm = Some(value.to_string()),
            "sr-uuid" => self.sr_uuid = Some(value.to_string()),
            "uuid" => self.uuid = Some(value.to_string()),
            "type" => self.device_type = Some(value.to_string()),
            "device" => self.device = Some(value.to_string()),
            "virtual-size" => {
                if self.device_type.as_deref() != Some("Disk") {
                    return Ok(());
                }
                let size_bytes: u64 = parse_number(value, "virtual-size")?;
                let vm = self.context("vm-name-label")?;
                let observation = DiskObservation {
                    uuid: self.context("uuid")?,
                    sr_uuid: self.context("sr-uuid")?,
                    size_mib: bytes_to_mib(size_bytes),
                    device: self.context("device")?,
                };
                self.disks.entry(vm).or_default().push(observation);
            }
            _ => {}
        }
        Ok(())
    }

    /// Consume the accumulator and return the per-VM disk lists.
    pub fn finish(self) -> DiskMap {
        self.disks
    }

    fn context(&self, field: &'static str) -> std::result::Result<String, ScanError> {
        let value = match field {
            "vm-name-label" => self.vm.as_ref(),
            "sr-uuid" => self.sr_uuid.as_ref(),
            "uuid" => self.uuid.as_ref(),
            "device" => self.device.as_ref(),
            _ => None,
        };
        value.cloned().ok_or(ScanError::OrphanedField {
            field: "virtual-size",
            missing: field,
            context: "vm-disk-list",
        })
    }
}

/// Run vm-disk-list and collect disks per VM name.
pub async fn vm_disks<S: XeSession>(session: &mut S) -> Result<DiskMap> {
    let output = session.run(commands::VM_DISK_LIST).await?;
    let disks = parse_disk_list(&output)?;
    debug!("Collected disks for {} VMs", disks.len());
    Ok(disks)
}

/// Parse the full vm-disk-list output.
pub fn parse_disk_list(output: &str) -> std::result::Result<DiskMap, ScanError> {
    let mut acc = DiskAccumulator::new();
    for line in output.lines() {
        acc.feed(line)?;
    }
    Ok(acc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISK_LIST: &str = "\
Disk 0 VBD:
uuid ( RO)             : vbd-1
    vm-name-label ( RO): web01
    type ( RW): Disk
    device ( RO): xvda


Disk 0 VDI:
uuid ( RO)             : vdi-1
    sr-uuid ( RO): sr-1
    virtual-size ( RO): 10737418240


CD 0 VBD:
uuid ( RO)             : vbd-2
    vm-name-label ( RO): web01
    type ( RW): CD
    device ( RO): xvdd


CD 0 VDI:
uuid ( RO)             : vdi-2
    sr-uuid ( RO): sr-iso
    virtual-size ( RO): 4294967296


Disk 1 VBD:
uuid ( RO)             : vbd-3
    vm-name-label ( RO): db01
    type ( RW): Disk
    device ( RO): xvda


Disk 1 VDI:
uuid ( RO)             : vdi-3
    sr-uuid ( RO): sr-2
    virtual-size ( RO): 21474836480
";

    #[test]
    fn test_disks_keyed_by_carried_vm_context() {
        let disks = parse_disk_list(DISK_LIST).unwrap();
        assert_eq!(disks.len(), 2);

        let web = disks.get("web01").unwrap();
        assert_eq!(web.len(), 1);
        assert_eq!(
            web[0],
            DiskObservation {
                uuid: "vdi-1".to_string(),
                sr_uuid: "sr-1".to_string(),
                size_mib: 10240,
                device: "xvda".to_string(),
            }
        );

        let db = disks.get("db01").unwrap();
        assert_eq!(db[0].sr_uuid, "sr-2");
        assert_eq!(db[0].size_mib, 20480);
    }

    #[test]
    fn test_cd_records_are_ignored() {
        let disks = parse_disk_list(DISK_LIST).unwrap();
        let web = disks.get("web01").unwrap();
        assert!(web.iter().all(|d| d.uuid != "vdi-2"));
    }

    #[test]
    fn test_size_before_any_vbd_context_errors() {
        let output = "\
uuid : vdi-1
sr-uuid : sr-1
type : Disk
virtual-size : 1073741824";
        let err = parse_disk_list(output).unwrap_err();
        assert!(matches!(
            err,
            ScanError::OrphanedField {
                missing: "vm-name-label",
                ..
            }
        ));
    }

    #[test]
    fn test_bad_size_errors() {
        let output = "\
uuid : vbd-1
vm-name-label : web01
type : Disk
device : xvda
sr-uuid : sr-1
virtual-size : huge";
        let err = parse_disk_list(output).unwrap_err();
        assert!(matches!(
            err,
            ScanError::InvalidField {
                field: "virtual-size",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_disk_list("").unwrap().is_empty());
    }
}
