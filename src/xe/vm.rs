//! Running-VM enumeration.

use std::collections::BTreeSet;

use log::debug;

use super::{bytes_to_mib, commands, is_helper_vm, parse_block, parse_number, require};
use crate::error::{Result, ScanError};
use crate::session::XeSession;

/// One running virtual machine as reported by `xe vm-list`.
///
/// The display name is the correlation key across the other list commands;
/// VMs sharing a name merge into one bucket (known limitation of the xe
/// output, not corrected here).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VmRecord {
    pub name: String,
    pub uuid: String,
    pub cores: u32,
    pub memory_mib: u64,
}

/// Enumerate running VMs resident on the given host.
pub async fn running_vms<S: XeSession>(
    session: &mut S,
    host_uuid: &str,
) -> Result<BTreeSet<VmRecord>> {
    let output = session.run(&commands::vm_list(host_uuid)).await?;
    let vms = parse_vm_list(&output)?;
    debug!("Found {} running VMs on host {}", vms.len(), host_uuid);
    Ok(vms)
}

/// Parse vm-list output into the set of running, non-helper VMs.
///
/// Blocks are separated by blank lines. Helper VMs and VMs in any power
/// state other than `running` are dropped; a block missing one of the
/// requested fields is a parsing contract violation and errors out. The set
/// collapses exact duplicate observations only, since the VM UUID is part
/// of the record.
pub fn parse_vm_list(output: &str) -> std::result::Result<BTreeSet<VmRecord>, ScanError> {
    let mut vms = BTreeSet::new();
    for block in output.split("\n\n") {
        let pairs = parse_block(block);
        if pairs.is_empty() {
            continue;
        }
        let name = require(&pairs, "name-label", "vm-list")?;
        if is_helper_vm(name) {
            continue;
        }
        if require(&pairs, "power-state", "vm-list")? != "running" {
            continue;
        }
        let cores = parse_number(require(&pairs, "VCPUs-number", "vm-list")?, "VCPUs-number")?;
        let memory_bytes: u64 =
            parse_number(require(&pairs, "memory-actual", "vm-list")?, "memory-actual")?;
        vms.insert(VmRecord {
            name: name.to_string(),
            uuid: require(&pairs, "uuid", "vm-list")?.to_string(),
            cores,
            memory_mib: bytes_to_mib(memory_bytes),
        });
    }
    Ok(vms)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VM_LIST: &str = "\
uuid ( RO)           : vm-uuid-9
     name-label ( RW): web01
     power-state ( RO): running
     VCPUs-number ( RO): 2
     memory-actual ( RO): 4294967296


uuid ( RO)           : vm-uuid-3
     name-label ( RW): db01
     power-state ( RO): halted
     VCPUs-number ( RO): 4
     memory-actual ( RO): 8589934592


uuid ( RO)           : vm-uuid-0
     name-label ( RW): Control domain on host: xen-01
     power-state ( RO): running
     VCPUs-number ( RO): 8
     memory-actual ( RO): 1073741824


uuid ( RO)           : vm-uuid-7
     name-label ( RW): Transfer VM for VDI 1234
     power-state ( RO): running
     VCPUs-number ( RO): 1
     memory-actual ( RO): 268435456

";

    #[test]
    fn test_only_running_non_helper_vms() {
        let vms = parse_vm_list(VM_LIST).unwrap();
        assert_eq!(vms.len(), 1);
        let vm = vms.iter().next().unwrap();
        assert_eq!(vm.name, "web01");
        assert_eq!(vm.uuid, "vm-uuid-9");
        assert_eq!(vm.cores, 2);
        assert_eq!(vm.memory_mib, 4096);
    }

    #[test]
    fn test_duplicate_observations_collapse() {
        let doubled = format!("{}\n\n{}", VM_LIST.trim_end(), VM_LIST);
        let vms = parse_vm_list(&doubled).unwrap();
        assert_eq!(vms.len(), 1);
    }

    #[test]
    fn test_empty_output_yields_no_vms() {
        assert!(parse_vm_list("").unwrap().is_empty());
        assert!(parse_vm_list("\n\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_missing_field_fails_loudly() {
        let output = "\
uuid ( RO)           : vm-uuid-9
     name-label ( RW): web01
     power-state ( RO): running
     memory-actual ( RO): 4294967296";
        let err = parse_vm_list(output).unwrap_err();
        assert!(matches!(
            err,
            ScanError::MissingField {
                field: "VCPUs-number",
                ..
            }
        ));
    }

    #[test]
    fn test_bad_number_fails_loudly() {
        let output = "\
uuid ( RO)           : vm-uuid-9
     name-label ( RW): web01
     power-state ( RO): running
     VCPUs-number ( RO): two
     memory-actual ( RO): 4294967296";
        let err = parse_vm_list(output).unwrap_err();
        assert!(matches!(
            err,
            ScanError::InvalidField {
                field: "VCPUs-number",
                ..
            }
        ));
    }

    #[test]
    fn test_memory_floor_division() {
        let output = "\
uuid : vm-1
name-label : web01
power-state : running
VCPUs-number : 1
memory-actual : 2147483649";
        let vms = parse_vm_list(output).unwrap();
        assert_eq!(vms.iter().next().unwrap().memory_mib, 2048);
    }
}
