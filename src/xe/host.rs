//! Host UUID resolution.
//!
//! `xe host-list` prints every host in the pool; the scan only concerns the
//! host behind the queried address, and its UUID is needed to scope the
//! vm-list query.

use log::debug;

use super::{commands, sanitize_line, split_pair};
use crate::error::{Result, ScanError};
use crate::session::XeSession;

/// Resolve the UUID of the host answering on `address`.
///
/// Failing to find one is fatal for the scan: without the host UUID there is
/// no way to scope the VM query.
pub async fn resolve_host_uuid<S: XeSession>(session: &mut S, address: &str) -> Result<String> {
    let output = session.run(commands::HOST_LIST).await?;
    let uuid = parse_host_uuid(&output, address).ok_or(ScanError::HostUuidNotFound)?;
    debug!("Host {} resolved to UUID {}", address, uuid);
    Ok(uuid)
}

/// Scan host-list output for the block whose `address` equals the target.
///
/// xe prints `uuid` before `address` within a block, so the most recently
/// seen UUID is the one the matching address belongs to.
pub fn parse_host_uuid(output: &str, address: &str) -> Option<String> {
    let mut uuid = String::new();
    for line in output.lines() {
        let line = sanitize_line(line);
        let Some((key, value)) = split_pair(&line) else {
            continue;
        };
        match key {
            "uuid" => uuid = value.to_string(),
            "address" if value == address => {
                if uuid.is_empty() {
                    return None;
                }
                return Some(uuid);
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST_LIST: &str = "\
uuid ( RO)                : host-uuid-1
    name-label ( RW)      : xen-01
    address ( RO)         : 10.0.0.5


uuid ( RO)                : host-uuid-2
    name-label ( RW)      : xen-02
    address ( RO)         : 10.0.0.6

";

    #[test]
    fn test_matching_block_returns_its_uuid() {
        assert_eq!(
            parse_host_uuid(HOST_LIST, "10.0.0.5"),
            Some("host-uuid-1".to_string())
        );
        assert_eq!(
            parse_host_uuid(HOST_LIST, "10.0.0.6"),
            Some("host-uuid-2".to_string())
        );
    }

    #[test]
    fn test_unknown_address_is_not_found() {
        assert_eq!(parse_host_uuid(HOST_LIST, "10.0.0.99"), None);
    }

    #[test]
    fn test_address_before_any_uuid_is_not_found() {
        let output = "address ( RO) : 10.0.0.5\nuuid ( RO) : host-uuid-1";
        assert_eq!(parse_host_uuid(output, "10.0.0.5"), None);
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(parse_host_uuid("", "10.0.0.5"), None);
    }
}
