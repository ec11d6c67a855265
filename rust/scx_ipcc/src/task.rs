// SPDX-License-Identifier: GPL-2.0
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Per-task classification state.
//!
//! A [`TaskIpcc`] has exactly one writer: whoever holds `&mut` to it, which
//! is the CPU currently running the task. Only the stable class is shared,
//! through [`StableClassReader`] handles that placement logic can load from
//! any thread.

use std::sync::atomic::AtomicU16;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::types::IpcClass;

/// Classification state of a single task.
///
/// `Default` is the state of a freshly created task: unclassified, with no
/// candidate and an empty streak.
#[derive(Debug, Default)]
pub struct TaskIpcc {
    /// Committed class, [`IpcClass::UNCLASSIFIED`] until the first commit.
    pub(crate) stable: Arc<AtomicU16>,
    /// Most recent class fed to the debouncer.
    pub(crate) candidate: u16,
    /// Consecutive ticks `candidate` has been observed.
    pub(crate) streak: u16,
}

impl TaskIpcc {
    pub fn new() -> Self {
        Self::default()
    }

    /// The class placement logic should use for this task.
    pub fn stable_class(&self) -> Option<IpcClass> {
        IpcClass::from_raw(self.stable.load(Ordering::Relaxed))
    }

    /// The last class observed for this task, committed or not.
    pub fn candidate_class(&self) -> Option<IpcClass> {
        IpcClass::from_raw(self.candidate)
    }

    pub fn match_streak(&self) -> u16 {
        self.streak
    }

    /// A handle to read the stable class from other threads.
    pub fn reader(&self) -> StableClassReader {
        StableClassReader(self.stable.clone())
    }

    pub fn snapshot(&self) -> IpccSnapshot {
        IpccSnapshot {
            stable: self.stable.load(Ordering::Relaxed),
            candidate: self.candidate,
            streak: self.streak,
        }
    }

    /// Store `class` as the stable class. Returns whether it changed.
    pub(crate) fn commit(&self, class: IpcClass) -> bool {
        self.stable.swap(class.get(), Ordering::Relaxed) != class.get()
    }
}

/// Read-only view of a task's stable class.
///
/// The handle keeps the value alive after the task's state is dropped, in
/// which case it keeps returning the last committed class.
#[derive(Debug, Clone)]
pub struct StableClassReader(Arc<AtomicU16>);

impl StableClassReader {
    pub fn get(&self) -> Option<IpcClass> {
        IpcClass::from_raw(self.0.load(Ordering::Relaxed))
    }
}

/// Raw copy of all classification fields of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IpccSnapshot {
    pub stable: u16,
    pub candidate: u16,
    pub streak: u16,
}
