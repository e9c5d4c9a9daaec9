//! MAC address extraction from `xe vif-list`.
//!
//! Unlike the block-structured commands, vif-list with two params prints a
//! flat alternation of `vm-name-label` and `MAC` lines. A MAC line belongs
//! to the most recent label line, so parsing is a single pass with explicit
//! carried state.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use log::debug;

use super::{commands, is_helper_vm, sanitize_line, split_pair};
use crate::error::Result;
use crate::session::XeSession;

/// MAC sets keyed by VM display name.
pub type MacMap = IndexMap<String, BTreeSet<String>>;

/// Single-pass accumulator over vif-list lines.
///
/// `label` is the VM name of the most recent `vm-name-label` line; MAC
/// lines accumulate under it. Sets collapse duplicate MACs naturally.
#[derive(Debug, Default)]
pub struct VifAccumulator {
    label: String,
    macs: MacMap,
}

impl VifAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw output line.
    pub fn feed(&mut self, line: &str) {
        let line = sanitize_line(line);
        if line.is_empty() {
            return;
        }
        let Some((key, value)) = split_pair(&line) else {
            return;
        };
        if key == "vm-name-label" {
            self.label = value.to_string();
        }
        if is_helper_vm(&self.label) {
            return;
        }
        if key == "MAC" {
            self.macs
                .entry(self.label.clone())
                .or_default()
                .insert(value.to_string());
        }
    }

    /// Consume the accumulator and return the per-VM MAC sets.
    pub fn finish(self) -> MacMap {
        self.macs
    }
}

/// Run vif-list and collect MAC addresses per VM name.
pub async fn vm_macs<S: XeSession>(session: &mut S) -> Result<MacMap> {
    let output = session.run(commands::VIF_LIST).await?;
    let macs = parse_vif_list(&output);
    debug!("Collected MACs for {} VMs", macs.len());
    Ok(macs)
}

/// Parse the full vif-list output.
pub fn parse_vif_list(output: &str) -> MacMap {
    let mut acc = VifAccumulator::new();
    for line in output.lines() {
        acc.feed(line);
    }
    acc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIF_LIST: &str = "\
vm-name-label ( RO): web01
              MAC ( RO): aa:bb:cc:dd:ee:01


vm-name-label ( RO): web01
              MAC ( RO): aa:bb:cc:dd:ee:02


vm-name-label ( RO): Transfer VM for VDI 1234
              MAC ( RO): 00:00:00:00:00:01


vm-name-label ( RO): db01
              MAC ( RO): aa:bb:cc:dd:ee:03
";

    #[test]
    fn test_macs_accumulate_per_label() {
        let macs = parse_vif_list(VIF_LIST);
        assert_eq!(macs.len(), 2);
        let web = macs.get("web01").unwrap();
        assert_eq!(web.len(), 2);
        assert!(web.contains("aa:bb:cc:dd:ee:01"));
        assert!(web.contains("aa:bb:cc:dd:ee:02"));
        assert_eq!(macs.get("db01").unwrap().len(), 1);
    }

    #[test]
    fn test_helper_vm_macs_are_skipped() {
        let macs = parse_vif_list(VIF_LIST);
        assert!(!macs.keys().any(|name| name.starts_with("Transfer VM for")));
    }

    #[test]
    fn test_duplicate_macs_collapse() {
        let output = "\
vm-name-label : web01
MAC : aa:bb:cc:dd:ee:01
vm-name-label : web01
MAC : aa:bb:cc:dd:ee:01";
        let macs = parse_vif_list(output);
        assert_eq!(macs.get("web01").unwrap().len(), 1);
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_vif_list("").is_empty());
    }
}
