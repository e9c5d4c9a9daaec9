//! Top-level orchestration: gating, configuration, the inventory pipeline,
//! and envelope assembly.
//!
//! A scan is one linear pass: probe the port, open one session, run the four
//! list commands, correlate their outputs by VM name, close the session.
//! Expected failures (connectivity, configuration, unresolvable host, output
//! format drift) fold into an error-status envelope; only abstention
//! ([`NoMatch`]) is returned as an error, so the orchestrator can hand the
//! address to the next plugin.

use std::collections::BTreeSet;

use log::debug;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{NoMatch, Result};
use crate::report::{
    DEVICE_TYPE_UNKNOWN, DeviceInfo, Disk, DiskShare, MemoryModule, Processor, ScanResult,
    ScanStatus, VM_MODEL_NAME, VmDevice,
};
use crate::session::{Connector, Credentials, SshConnector, XeSession, port_closed};
use crate::shares::{NoShares, ShareMap, ShareResolver, share_label};
use crate::xe;
use crate::xe::disk::DiskMap;
use crate::xe::vif::MacMap;
use crate::xe::vm::VmRecord;

/// Plugin identifier carried in every result envelope.
pub const PLUGIN_NAME: &str = "ssh_xen";

/// Credentials configuration, resolved once by the surrounding orchestrator
/// and passed in explicitly.
#[derive(Debug, Clone, Default)]
pub struct PluginConfig {
    pub xen_user: Option<String>,
    pub xen_password: Option<SecretString>,
}

impl PluginConfig {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            xen_user: Some(user.into()),
            xen_password: Some(SecretString::from(password.into())),
        }
    }

    /// Read `XEN_USER` and `XEN_PASSWORD` from the environment. Unset or
    /// empty variables count as missing.
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            xen_user: non_empty("XEN_USER"),
            xen_password: non_empty("XEN_PASSWORD").map(SecretString::from),
        }
    }

    fn credentials(&self) -> Option<Credentials> {
        let user = self.xen_user.as_ref().filter(|u| !u.is_empty())?;
        let password = self
            .xen_password
            .as_ref()
            .filter(|p| !p.expose_secret().is_empty())?;
        Some(Credentials {
            user: user.clone(),
            password: password.clone(),
        })
    }
}

/// Auxiliary hints supplied by the orchestrator alongside the address.
#[derive(Debug, Clone, Default)]
pub struct ScanHints {
    snmp_name: Option<String>,
}

impl ScanHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SNMP system name reported for this address.
    pub fn snmp_name(mut self, name: impl Into<String>) -> Self {
        self.snmp_name = Some(name.into());
        self
    }

    fn snmp_name_str(&self) -> &str {
        self.snmp_name.as_deref().unwrap_or("")
    }
}

/// The XenServer SSH discovery plugin.
///
/// Generic over the connector and share resolver so tests (and orchestrators
/// with their own transports) can substitute the collaborators.
pub struct XenPlugin<C = SshConnector, R = NoShares> {
    connector: C,
    resolver: R,
    config: PluginConfig,
}

impl XenPlugin {
    /// Plugin with the production SSH connector and no share lookup.
    pub fn new(config: PluginConfig) -> Self {
        Self {
            connector: SshConnector::new(),
            resolver: NoShares,
            config,
        }
    }
}

impl<C, R> XenPlugin<C, R>
where
    C: Connector,
    R: ShareResolver,
{
    /// Replace the connector.
    pub fn with_connector<C2: Connector>(self, connector: C2) -> XenPlugin<C2, R> {
        XenPlugin {
            connector,
            resolver: self.resolver,
            config: self.config,
        }
    }

    /// Replace the share resolver.
    pub fn with_resolver<R2: ShareResolver>(self, resolver: R2) -> XenPlugin<C, R2> {
        XenPlugin {
            connector: self.connector,
            resolver,
            config: self.config,
        }
    }

    /// Scan one address.
    ///
    /// Returns `Err(NoMatch)` when the hints do not indicate a XenServer
    /// target; every other outcome, including failures, is an envelope.
    pub async fn scan(
        &self,
        address: &str,
        hints: &ScanHints,
    ) -> std::result::Result<ScanResult, NoMatch> {
        check_applicability(hints)?;

        let mut result = ScanResult::template(PLUGIN_NAME);
        let Some(credentials) = self.config.credentials() else {
            result.messages.push(
                "Not configured. Set XEN_USER and XEN_PASSWORD in your configuration file."
                    .to_string(),
            );
            return Ok(result);
        };

        match self.inventory(address, &credentials).await {
            Ok(device) => {
                result.status = ScanStatus::Success;
                result.device = Some(device);
            }
            Err(e) => result.messages.push(e.to_string()),
        }
        Ok(result)
    }

    /// Probe, connect, run the pipeline, and close the session on every
    /// exit path. A close failure is only surfaced when the pipeline itself
    /// succeeded.
    async fn inventory(&self, address: &str, credentials: &Credentials) -> Result<DeviceInfo> {
        if !self.connector.probe(address).await {
            return Err(port_closed(address, self.connector.ssh_port()).into());
        }

        let mut session = self.connector.connect(address, credentials).await?;
        let outcome = self.collect(&mut session, address).await;
        let closed = session.close().await;

        let device = outcome?;
        closed?;
        Ok(device)
    }

    /// The four list commands plus share resolution, on one open session.
    async fn collect(&self, session: &mut C::Session, address: &str) -> Result<DeviceInfo> {
        let host_uuid = xe::host::resolve_host_uuid(session, address).await?;
        let vms = xe::vm::running_vms(session, &host_uuid).await?;
        let macs = xe::vif::vm_macs(session).await?;
        let disks = xe::disk::vm_disks(session).await?;
        let shares = self.resolver.resolve(session).await?;
        debug!("Assembling inventory for {} VMs on {}", vms.len(), address);
        Ok(assemble(address, &vms, &macs, &disks, &shares))
    }
}

/// Gate on the SNMP system name: "nx-os" anywhere (case-insensitive) means
/// an incompatible Nexus device; otherwise "xen" (case-sensitive) must be
/// present. Runs before any I/O.
fn check_applicability(hints: &ScanHints) -> std::result::Result<(), NoMatch> {
    let snmp_name = hints.snmp_name_str();
    if snmp_name.to_lowercase().contains("nx-os") {
        return Err(NoMatch::new("Incompatible Nexus found."));
    }
    if !snmp_name.contains("xen") {
        return Err(NoMatch::new("XEN not found."));
    }
    Ok(())
}

/// Correlate the four per-command mappings into one record per VM, keyed by
/// display name.
fn assemble(
    address: &str,
    vms: &BTreeSet<VmRecord>,
    macs: &MacMap,
    disks: &DiskMap,
    shares: &ShareMap,
) -> DeviceInfo {
    let mut subdevices = Vec::with_capacity(vms.len());
    for vm in vms {
        let mut device = VmDevice {
            model_name: VM_MODEL_NAME.to_string(),
            mac_addresses: macs
                .get(&vm.name)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default(),
            serial_number: vm.uuid.clone(),
            hostname: vm.name.clone(),
            processors: (0..vm.cores).map(Processor::virtual_cpu).collect(),
            memory: vec![MemoryModule::virtual_module(vm.memory_mib)],
            disks: None,
            disk_shares: None,
        };

        for observation in disks.get(&vm.name).map(Vec::as_slice).unwrap_or_default() {
            // A disk is a share or local storage, never both.
            match shares.get(&share_label(&observation.sr_uuid)) {
                Some(info) => device.disk_shares.get_or_insert_default().push(DiskShare {
                    serial_number: info.serial.clone(),
                    is_virtual: true,
                    size: info.size_mib,
                    volume: observation.device.clone(),
                }),
                None => device
                    .disks
                    .get_or_insert_default()
                    .push(Disk::xen_virtual(observation.size_mib, &observation.device)),
            }
        }

        subdevices.push(device);
    }

    DeviceInfo {
        device_type: DEVICE_TYPE_UNKNOWN.to_string(),
        system_ip_addresses: vec![address.to_string()],
        subdevices,
    }
}
