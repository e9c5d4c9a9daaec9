//! # xenscan
//!
//! SSH inventory scanner for XenServer hypervisor hosts.
//!
//! xenscan is a discovery plugin: given a target address and an SNMP system
//! name hint, it connects over SSH, runs the `xe` host/VM/VIF/disk list
//! commands, correlates their semi-structured output by VM name, and
//! returns a normalized inventory record per running virtual machine (CPU
//! count, memory, MAC addresses, disks and disk shares).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use xenscan::{PluginConfig, ScanHints, XenPlugin};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), xenscan::NoMatch> {
//!     let plugin = XenPlugin::new(PluginConfig::new("root", "secret"));
//!     let hints = ScanHints::new().snmp_name("xenserver-01");
//!
//!     let result = plugin.scan("10.0.0.5", &hints).await?;
//!     println!("{}", serde_json::to_string_pretty(&result).unwrap());
//!     Ok(())
//! }
//! ```
//!
//! A scan never fails outright: connectivity, configuration, and parsing
//! problems come back as an error-status [`ScanResult`]. The one exception
//! is [`NoMatch`], returned when the hints do not indicate a XenServer
//! target so the orchestrator can try its next plugin.

pub mod error;
pub mod plugin;
pub mod report;
pub mod session;
pub mod shares;
pub mod transport;
pub mod xe;

// Re-export main types for convenience
pub use error::{Error, NoMatch, Result, ScanError, TransportError};
pub use plugin::{PLUGIN_NAME, PluginConfig, ScanHints, XenPlugin};
pub use report::{DeviceInfo, ScanResult, ScanStatus, VmDevice};
pub use session::{Connector, Credentials, SshConnector, XeSession};
pub use shares::{NoShares, ShareInfo, ShareMap, ShareResolver, StaticShares};
pub use transport::{SshConfig, SshTransport};
