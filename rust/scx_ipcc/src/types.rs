// SPDX-License-Identifier: GPL-2.0
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Identifier newtypes and class values.

use std::fmt;
use std::num::NonZeroU16;

/// CPU identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CpuId(pub u32);

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pid(pub i32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw classification ordinal as reported by hardware. 0 is a valid class.
pub type HwClass = u8;

/// Scheduler IPC class of a task.
///
/// Hardware class 0 is a legitimate classification while the scheduler
/// reserves 0 for "unclassified". Scheduler classes are therefore the
/// hardware class plus one, and an unclassified task is represented as
/// `Option::<IpcClass>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IpcClass(NonZeroU16);

impl IpcClass {
    /// Raw value of an unclassified task.
    pub const UNCLASSIFIED: u16 = 0;

    /// Convert a hardware class into a scheduler class.
    pub fn from_hw(hw: HwClass) -> Self {
        IpcClass(NonZeroU16::MIN.saturating_add(u16::from(hw)))
    }

    /// Build a class from its raw scheduler value. Returns `None` for
    /// [`IpcClass::UNCLASSIFIED`].
    pub fn from_raw(raw: u16) -> Option<Self> {
        NonZeroU16::new(raw).map(IpcClass)
    }

    /// Raw scheduler value of an optional class, [`IpcClass::UNCLASSIFIED`]
    /// for `None`.
    pub fn to_raw(class: Option<Self>) -> u16 {
        class.map_or(Self::UNCLASSIFIED, Self::get)
    }

    pub fn get(self) -> u16 {
        self.0.get()
    }

    /// The hardware class this scheduler class was derived from.
    pub fn hw(self) -> u16 {
        self.0.get() - 1
    }
}

impl fmt::Display for IpcClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hw_zero_is_not_unclassified() {
        let class = IpcClass::from_hw(0);
        assert_eq!(class.get(), 1);
        assert_ne!(class.get(), IpcClass::UNCLASSIFIED);
        assert_eq!(class.hw(), 0);
    }

    #[test]
    fn test_hw_max_does_not_wrap() {
        let class = IpcClass::from_hw(u8::MAX);
        assert_eq!(class.get(), 256);
        assert_eq!(class.hw(), 255);
    }

    #[test]
    fn test_raw_conversions() {
        assert_eq!(IpcClass::from_raw(0), None);
        assert_eq!(IpcClass::from_raw(4), Some(IpcClass::from_hw(3)));
        assert_eq!(IpcClass::to_raw(None), 0);
        assert_eq!(IpcClass::to_raw(Some(IpcClass::from_hw(2))), 3);
    }
}
