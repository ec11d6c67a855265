// SPDX-License-Identifier: GPL-2.0
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Classification state for schedulers that cannot embed [`TaskIpcc`] in
//! their own task records.
//!
//! The table is owned by the scheduling loop, which makes it the only
//! writer of every entry. Other threads get [`StableClassReader`] handles.

use std::collections::BTreeMap;

use log::debug;

use crate::classifier::Classifier;
use crate::classifier::Tick;
use crate::classifier::TickOutcome;
use crate::hw::ClassSource;
use crate::hw::SiblingIdle;
use crate::task::StableClassReader;
use crate::task::TaskIpcc;
use crate::types::IpcClass;
use crate::types::Pid;

#[derive(Debug, Default)]
pub struct IpccTable {
    tasks: BTreeMap<Pid, TaskIpcc>,
}

impl IpccTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `pid` as an unclassified task. A stale entry left by a
    /// previous task with the same pid is replaced.
    pub fn create(&mut self, pid: Pid) -> StableClassReader {
        let task = TaskIpcc::new();
        let reader = task.reader();
        if self.tasks.insert(pid, task).is_some() {
            debug!("pid {} reused, classification reset", pid);
        }
        reader
    }

    /// Stop tracking `pid`. Outstanding readers keep the last stable class.
    pub fn remove(&mut self, pid: Pid) -> Option<TaskIpcc> {
        self.tasks.remove(&pid)
    }

    pub fn get(&self, pid: Pid) -> Option<&TaskIpcc> {
        self.tasks.get(&pid)
    }

    pub fn reader(&self, pid: Pid) -> Option<StableClassReader> {
        self.tasks.get(&pid).map(TaskIpcc::reader)
    }

    /// Stable class of `pid`; unknown tasks are unclassified.
    pub fn stable_class(&self, pid: Pid) -> Option<IpcClass> {
        self.tasks.get(&pid).and_then(TaskIpcc::stable_class)
    }

    /// Run the classifier for `pid` on `tick`. Returns `None` if `pid` is not
    /// tracked.
    pub fn tick<S: ClassSource, I: SiblingIdle>(
        &mut self,
        classifier: &Classifier<S, I>,
        pid: Pid,
        tick: Tick,
    ) -> Option<TickOutcome> {
        let task = self.tasks.get_mut(&pid)?;
        Some(classifier.update_classification(task, tick))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
