// SPDX-License-Identifier: GPL-2.0
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Interfaces to the hardware-facing collaborators of the classifier.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use glob::glob;
use log::debug;
use sscanf::sscanf;

use crate::types::CpuId;
use crate::types::HwClass;

const SYSFS_CPU_PATH: &str = "/sys/devices/system/cpu";

/// Why no classification could be read for a CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    /// The processor or kernel has no classification feedback.
    NotSupported,
    /// Feedback exists but has not produced a class for this context yet.
    NotReady,
    /// The read failed and may succeed on a later tick.
    Transient,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::NotSupported => write!(f, "classification not supported"),
            Unavailable::NotReady => write!(f, "classification not ready"),
            Unavailable::Transient => write!(f, "classification read failed"),
        }
    }
}

impl std::error::Error for Unavailable {}

/// Source of raw hardware classification.
pub trait ClassSource {
    /// Read the class hardware currently reports for whatever runs on `cpu`.
    fn read_class(&self, cpu: CpuId) -> Result<HwClass, Unavailable>;
}

impl<F> ClassSource for F
where
    F: Fn(CpuId) -> Result<HwClass, Unavailable>,
{
    fn read_class(&self, cpu: CpuId) -> Result<HwClass, Unavailable> {
        self(cpu)
    }
}

/// Whether the other hardware threads of a physical core are idle.
pub trait SiblingIdle {
    fn siblings_idle(&self, cpu: CpuId) -> bool;
}

impl<F> SiblingIdle for F
where
    F: Fn(CpuId) -> bool,
{
    fn siblings_idle(&self, cpu: CpuId) -> bool {
        self(cpu)
    }
}

/// SMT sibling map with per-CPU busy tracking.
///
/// The host marks a CPU busy when it starts running a task and idle when it
/// goes idle. A CPU whose core has no other online thread always reports
/// idle siblings.
#[derive(Debug)]
pub struct SmtSiblings {
    siblings: BTreeMap<CpuId, Vec<CpuId>>,
    busy: Vec<AtomicBool>,
}

impl SmtSiblings {
    /// Build from groups of CPUs, each group being the hardware threads of
    /// one physical core.
    pub fn new(cores: impl IntoIterator<Item = Vec<CpuId>>) -> Self {
        let mut siblings = BTreeMap::new();
        let mut nr_cpus = 0;

        for core in cores {
            for cpu in core.iter() {
                let others: Vec<CpuId> = core.iter().copied().filter(|s| s != cpu).collect();
                siblings.insert(*cpu, others);
                nr_cpus = nr_cpus.max(cpu.0 as usize + 1);
            }
        }

        Self {
            siblings,
            busy: (0..nr_cpus).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    /// Build from the host's `thread_siblings_list` files.
    pub fn from_sysfs() -> Result<Self> {
        Self::from_sysfs_root(Path::new(SYSFS_CPU_PATH))
    }

    /// Build from a sysfs CPU directory laid out like
    /// `/sys/devices/system/cpu`.
    pub fn from_sysfs_root(root: &Path) -> Result<Self> {
        let mut cores: BTreeSet<Vec<CpuId>> = BTreeSet::new();

        let pattern = root.join("cpu[0-9]*");
        for cpu_path in glob(pattern.to_string_lossy().as_ref())?.filter_map(Result::ok) {
            let Some(name) = cpu_path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let cpu_id = match sscanf!(name, "cpu{u32}") {
                Ok(id) => id,
                Err(_) => bail!("Failed to parse cpu ID {}", name),
            };

            // Offline CPUs have no topology directory.
            let list_path = cpu_path.join("topology").join("thread_siblings_list");
            if !list_path.exists() {
                debug!("cpu {} has no topology, skipping", cpu_id);
                continue;
            }
            let list = std::fs::read_to_string(&list_path)
                .with_context(|| format!("Failed to read {:?}", list_path))?;
            let mut core = parse_cpu_list(&list)?;
            core.sort();
            cores.insert(core);
        }

        if cores.is_empty() {
            bail!("No CPU topology found under {:?}", root);
        }

        Ok(Self::new(cores))
    }

    pub fn siblings(&self, cpu: CpuId) -> &[CpuId] {
        self.siblings
            .get(&cpu)
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }

    pub fn smt_enabled(&self) -> bool {
        self.siblings.values().any(|s| !s.is_empty())
    }

    pub fn set_busy(&self, cpu: CpuId, busy: bool) {
        if let Some(state) = self.busy.get(cpu.0 as usize) {
            state.store(busy, Ordering::Relaxed);
        }
    }

    pub fn is_busy(&self, cpu: CpuId) -> bool {
        self.busy
            .get(cpu.0 as usize)
            .is_some_and(|state| state.load(Ordering::Relaxed))
    }
}

impl SiblingIdle for SmtSiblings {
    fn siblings_idle(&self, cpu: CpuId) -> bool {
        self.siblings(cpu).iter().all(|s| !self.is_busy(*s))
    }
}

/// Parse a kernel CPU list such as `0-1,8-9` or `3`.
fn parse_cpu_list(list: &str) -> Result<Vec<CpuId>> {
    let mut cpus = Vec::new();

    for group in list.trim().trim_end_matches('\0').split(',') {
        let group = group.trim();
        if group.is_empty() {
            continue;
        }
        let (min, max) = match sscanf!(group, "{u32}-{u32}") {
            Ok((x, y)) => (x, y),
            Err(_) => match group.parse::<u32>() {
                Ok(x) => (x, x),
                Err(_) => bail!("Failed to parse cpu list {}", list.trim()),
            },
        };
        cpus.extend((min..=max).map(CpuId));
    }

    Ok(cpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_siblings(root: &Path, cpu: u32, list: &str) {
        let topo = root.join(format!("cpu{}", cpu)).join("topology");
        std::fs::create_dir_all(&topo).unwrap();
        std::fs::write(topo.join("thread_siblings_list"), format!("{}\n", list)).unwrap();
    }

    #[test]
    fn test_parse_cpu_list() {
        assert_eq!(parse_cpu_list("3\n").unwrap(), vec![CpuId(3)]);
        assert_eq!(parse_cpu_list("0,8").unwrap(), vec![CpuId(0), CpuId(8)]);
        assert_eq!(
            parse_cpu_list("0-1,8-9").unwrap(),
            vec![CpuId(0), CpuId(1), CpuId(8), CpuId(9)]
        );
        assert!(parse_cpu_list("zero").is_err());
    }

    #[test]
    fn test_siblings_idle() {
        let smt = SmtSiblings::new([vec![CpuId(0), CpuId(1)], vec![CpuId(2)]]);
        assert!(smt.smt_enabled());
        assert_eq!(smt.siblings(CpuId(0)), &[CpuId(1)]);

        assert!(smt.siblings_idle(CpuId(0)));
        smt.set_busy(CpuId(0), true);
        assert!(smt.siblings_idle(CpuId(0)), "own activity must not count");
        assert!(!smt.siblings_idle(CpuId(1)));

        smt.set_busy(CpuId(0), false);
        assert!(smt.siblings_idle(CpuId(1)));

        smt.set_busy(CpuId(2), true);
        assert!(smt.siblings_idle(CpuId(2)));
    }

    #[test]
    fn test_unknown_cpu() {
        let smt = SmtSiblings::new([vec![CpuId(0), CpuId(1)]]);
        smt.set_busy(CpuId(64), true);
        assert!(!smt.is_busy(CpuId(64)));
        assert!(smt.siblings_idle(CpuId(64)));
    }

    #[test]
    fn test_from_sysfs_root() {
        let tmp = TempDir::new().unwrap();
        write_siblings(tmp.path(), 0, "0-1");
        write_siblings(tmp.path(), 1, "0-1");
        write_siblings(tmp.path(), 2, "2,10");
        write_siblings(tmp.path(), 10, "2,10");
        write_siblings(tmp.path(), 16, "16");
        // Offline CPU without topology.
        std::fs::create_dir_all(tmp.path().join("cpu17")).unwrap();
        // Not a CPU directory.
        std::fs::create_dir_all(tmp.path().join("cpufreq")).unwrap();

        let smt = SmtSiblings::from_sysfs_root(tmp.path()).unwrap();
        assert_eq!(smt.siblings(CpuId(1)), &[CpuId(0)]);
        assert_eq!(smt.siblings(CpuId(2)), &[CpuId(10)]);
        assert_eq!(smt.siblings(CpuId(10)), &[CpuId(2)]);
        assert!(smt.siblings(CpuId(16)).is_empty());
        assert!(smt.siblings(CpuId(17)).is_empty());

        smt.set_busy(CpuId(10), true);
        assert!(!smt.siblings_idle(CpuId(2)));
    }

    #[test]
    fn test_from_empty_sysfs_root() {
        let tmp = TempDir::new().unwrap();
        assert!(SmtSiblings::from_sysfs_root(tmp.path()).is_err());
    }
}
