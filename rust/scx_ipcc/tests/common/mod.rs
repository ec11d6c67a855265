// SPDX-License-Identifier: GPL-2.0
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use scx_ipcc::*;

/// Hardware feedback replaying a fixed sequence of reads, then reporting
/// `NotReady` forever.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<HwClass, Unavailable>>>,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Result<HwClass, Unavailable>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    pub fn classes(classes: &[HwClass]) -> Self {
        Self::new(classes.iter().map(|c| Ok(*c)))
    }
}

impl ClassSource for ScriptedSource {
    fn read_class(&self, _cpu: CpuId) -> Result<HwClass, Unavailable> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(Unavailable::NotReady))
    }
}

pub fn alderlake() -> CpuModel {
    CpuModel::intel(6, INTEL_FAM6_ALDERLAKE)
}

/// Two-thread cores: (0, 1), (2, 3).
pub fn smt_pairs() -> SmtSiblings {
    SmtSiblings::new([vec![CpuId(0), CpuId(1)], vec![CpuId(2), CpuId(3)]])
}

/// Run `nr` user ticks on `cpu`, returning the stable class after each.
pub fn run_ticks<S: ClassSource, I: SiblingIdle>(
    classifier: &Classifier<S, I>,
    task: &mut TaskIpcc,
    cpu: CpuId,
    nr: usize,
) -> Vec<Option<IpcClass>> {
    (0..nr)
        .map(|_| {
            classifier.update_classification(task, Tick::user(cpu));
            task.stable_class()
        })
        .collect()
}
