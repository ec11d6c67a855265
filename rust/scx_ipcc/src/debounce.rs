// SPDX-License-Identifier: GPL-2.0
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

use crate::task::TaskIpcc;
use crate::types::IpcClass;

/// Number of consecutive identical observations needed to commit a class.
pub const CLASS_DEBOUNCER_SKIPS: u16 = 4;

/// What a debouncer step did to the task's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceOutcome {
    /// The class differs from the previous candidate; streak is back to 1.
    Restarted,
    /// Same class as before, not yet observed long enough.
    Pending { streak: u16 },
    /// The class has been stable long enough and is the task's class.
    /// `changed` is false when it already was.
    Committed { changed: bool },
}

/// Update the classification of `task` with a fresh class from hardware.
///
/// The stable class only changes once `class` has been the candidate for
/// [`CLASS_DEBOUNCER_SKIPS`] consecutive calls. The candidate is updated on
/// every call.
pub fn debounce_and_update(task: &mut TaskIpcc, class: IpcClass) -> DebounceOutcome {
    let outcome = if task.candidate != class.get() {
        task.streak = 1;
        DebounceOutcome::Restarted
    } else if task.streak + 1 < CLASS_DEBOUNCER_SKIPS {
        task.streak += 1;
        DebounceOutcome::Pending {
            streak: task.streak,
        }
    } else {
        DebounceOutcome::Committed {
            changed: task.commit(class),
        }
    };

    task.candidate = class.get();
    outcome
}

/// Commit `class` right away, bypassing hysteresis.
///
/// Candidate and streak are still maintained so the task state stays
/// consistent. Returns whether the stable class changed.
pub fn commit_immediate(task: &mut TaskIpcc, class: IpcClass) -> bool {
    if task.candidate != class.get() {
        task.streak = 1;
    } else if task.streak + 1 < CLASS_DEBOUNCER_SKIPS {
        task.streak += 1;
    }
    task.candidate = class.get();
    task.commit(class)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(task: &mut TaskIpcc, classes: &[u8]) -> Vec<DebounceOutcome> {
        classes
            .iter()
            .map(|hw| debounce_and_update(task, IpcClass::from_hw(*hw)))
            .collect()
    }

    #[test]
    fn test_commit_on_fourth_match() {
        let mut task = TaskIpcc::new();
        let class = IpcClass::from_hw(5);

        for i in 1..CLASS_DEBOUNCER_SKIPS {
            debounce_and_update(&mut task, class);
            assert_eq!(task.stable_class(), None, "committed after {i} ticks");
        }
        let outcome = debounce_and_update(&mut task, class);
        assert_eq!(outcome, DebounceOutcome::Committed { changed: true });
        assert_eq!(task.stable_class(), Some(class));
    }

    #[test]
    fn test_outcome_sequence() {
        let mut task = TaskIpcc::new();
        assert_eq!(
            feed(&mut task, &[5, 5, 5, 5, 5]),
            vec![
                DebounceOutcome::Restarted,
                DebounceOutcome::Pending { streak: 2 },
                DebounceOutcome::Pending { streak: 3 },
                DebounceOutcome::Committed { changed: true },
                DebounceOutcome::Committed { changed: false },
            ]
        );
        assert_eq!(task.match_streak(), CLASS_DEBOUNCER_SKIPS - 1);
    }

    #[test]
    fn test_change_before_threshold_restarts() {
        let mut task = TaskIpcc::new();
        feed(&mut task, &[5, 5, 5, 6]);

        assert_eq!(task.stable_class(), None);
        assert_eq!(task.candidate_class(), Some(IpcClass::from_hw(6)));
        assert_eq!(task.match_streak(), 1);

        feed(&mut task, &[6, 6, 6]);
        assert_eq!(task.stable_class(), Some(IpcClass::from_hw(6)));
    }

    #[test]
    fn test_stable_class_survives_noise() {
        let mut task = TaskIpcc::new();
        feed(&mut task, &[2, 2, 2, 2]);
        feed(&mut task, &[1, 1, 1, 3, 1, 1]);

        assert_eq!(task.stable_class(), Some(IpcClass::from_hw(2)));
        assert_eq!(task.candidate_class(), Some(IpcClass::from_hw(1)));

        feed(&mut task, &[1, 1]);
        assert_eq!(task.stable_class(), Some(IpcClass::from_hw(1)));
    }

    #[test]
    fn test_candidate_is_last_input() {
        let mut task = TaskIpcc::new();
        for hw in [0u8, 3, 3, 1, 2, 2, 2, 2, 0] {
            debounce_and_update(&mut task, IpcClass::from_hw(hw));
            assert_eq!(task.candidate_class(), Some(IpcClass::from_hw(hw)));
            assert!(task.match_streak() >= 1 && task.match_streak() <= CLASS_DEBOUNCER_SKIPS);
        }
    }

    #[test]
    fn test_immediate_commit() {
        let mut task = TaskIpcc::new();
        assert!(commit_immediate(&mut task, IpcClass::from_hw(0)));
        assert_eq!(task.stable_class(), Some(IpcClass::from_hw(0)));
        assert!(!commit_immediate(&mut task, IpcClass::from_hw(0)));
        assert_eq!(task.match_streak(), 2);

        assert!(commit_immediate(&mut task, IpcClass::from_hw(3)));
        assert_eq!(task.stable_class(), Some(IpcClass::from_hw(3)));
        assert_eq!(task.match_streak(), 1);
    }
}
