//! Parsers for `xe` command-line output.
//!
//! The xe CLI prints semi-structured text in two shapes: `key ( RO): value`
//! blocks separated by blank lines (host-list, vm-list), and flat line
//! sequences where later fields implicitly belong to the most recent record
//! (vif-list, vm-disk-list). The submodules here turn each of the four
//! inventory commands into typed data, keyed by VM display name.

pub mod disk;
pub mod host;
pub mod vif;
pub mod vm;

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::ScanError;

/// Decorative role suffixes xe appends to parameter names.
static ROLE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\( RO\)|\( RW\)|\(MRO\)").unwrap());

/// Strip role suffixes and surrounding whitespace from an output line.
pub fn sanitize_line(line: &str) -> String {
    ROLE_SUFFIX.replace_all(line, "").trim().to_string()
}

/// Split a sanitized line into a `(key, value)` pair on the first colon.
///
/// Returns `None` for lines without a colon (banners, separators).
pub fn split_pair(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    Some((key.trim(), value.trim()))
}

/// Parse one blank-line-delimited block into a key/value map.
///
/// Lines without a colon are skipped; duplicate keys keep the last value.
pub fn parse_block(block: &str) -> IndexMap<String, String> {
    let mut pairs = IndexMap::new();
    for line in block.lines() {
        let line = sanitize_line(line);
        if let Some((key, value)) = split_pair(&line) {
            pairs.insert(key.to_string(), value.to_string());
        }
    }
    pairs
}

/// Look up a field the command was explicitly asked to print.
///
/// Absence means the remote output format has changed, which is surfaced
/// rather than skipped.
pub fn require<'a>(
    pairs: &'a IndexMap<String, String>,
    field: &'static str,
    context: &'static str,
) -> Result<&'a str, ScanError> {
    pairs
        .get(field)
        .map(String::as_str)
        .ok_or(ScanError::MissingField { field, context })
}

/// Parse a numeric field, reporting the offending value on failure.
pub fn parse_number<T: std::str::FromStr>(
    value: &str,
    field: &'static str,
) -> Result<T, ScanError> {
    value.parse().map_err(|_| ScanError::InvalidField {
        field,
        value: value.to_string(),
    })
}

/// Convert a byte count to whole mebibytes, truncating the remainder.
pub fn bytes_to_mib(bytes: u64) -> u64 {
    bytes / 1024 / 1024
}

/// Platform-internal VMs (transfer and control domains) excluded from
/// inventory.
pub fn is_helper_vm(name: &str) -> bool {
    name.starts_with("Transfer VM for") || name.starts_with("Control domain on host:")
}

/// The four read-only inventory commands issued per scan.
pub mod commands {
    /// List all hosts in the pool with their addresses.
    pub const HOST_LIST: &str = "sudo xe host-list params=address,name-label,uuid";

    /// List VIFs with their owning VM's name and MAC.
    pub const VIF_LIST: &str = "sudo xe vif-list params=vm-name-label,MAC";

    /// List disk images joined with their block devices, in multiple mode.
    pub const VM_DISK_LIST: &str = "sudo xe vm-disk-list \
         vdi-params=sr-uuid,uuid,virtual-size \
         vbd-params=vm-name-label,type,device \
         --multiple";

    /// List VMs resident on the given host.
    pub fn vm_list(host_uuid: &str) -> String {
        format!(
            "sudo xe vm-list resident-on={} \
             params=uuid,name-label,power-state,VCPUs-number,memory-actual",
            host_uuid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_role_suffixes() {
        let line = sanitize_line("uuid ( RO)     : abc-123");
        assert_eq!(split_pair(&line), Some(("uuid", "abc-123")));
        assert_eq!(sanitize_line("name-label ( RW): web01"), "name-label : web01");
        assert_eq!(sanitize_line("tags (MRO): "), "tags :");
        assert_eq!(sanitize_line("  plain line  "), "plain line");
    }

    #[test]
    fn test_split_pair() {
        assert_eq!(
            split_pair("address : 10.0.0.5"),
            Some(("address", "10.0.0.5"))
        );
        // Only the first colon separates; MACs keep their colons.
        assert_eq!(
            split_pair("MAC : aa:bb:cc:dd:ee:01"),
            Some(("MAC", "aa:bb:cc:dd:ee:01"))
        );
        assert_eq!(split_pair("no separator here"), None);
    }

    #[test]
    fn test_parse_block() {
        let block = "uuid ( RO)          : vm-1\n\
                     name-label ( RW)    : web01\n\
                     power-state ( RO)   : running";
        let pairs = parse_block(block);
        assert_eq!(pairs.get("uuid").unwrap(), "vm-1");
        assert_eq!(pairs.get("name-label").unwrap(), "web01");
        assert_eq!(pairs.get("power-state").unwrap(), "running");
    }

    #[test]
    fn test_bytes_to_mib_truncates() {
        assert_eq!(bytes_to_mib(2147483648), 2048);
        assert_eq!(bytes_to_mib(1073741824), 1024);
        assert_eq!(bytes_to_mib(1048576), 1);
        assert_eq!(bytes_to_mib(1048577), 1);
        assert_eq!(bytes_to_mib(1048575), 0);
    }

    #[test]
    fn test_is_helper_vm() {
        assert!(is_helper_vm("Transfer VM for VDI abc"));
        assert!(is_helper_vm("Control domain on host: xen-03"));
        assert!(!is_helper_vm("web01"));
        assert!(!is_helper_vm("control domain on host: xen-03"));
    }

    #[test]
    fn test_require_missing_field() {
        let pairs = parse_block("uuid : vm-1");
        let err = require(&pairs, "power-state", "vm-list").unwrap_err();
        assert!(matches!(
            err,
            ScanError::MissingField {
                field: "power-state",
                ..
            }
        ));
    }
}
