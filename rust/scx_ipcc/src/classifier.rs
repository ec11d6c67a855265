// SPDX-License-Identifier: GPL-2.0
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

use clap::ValueEnum;
use log::debug;
use log::info;
use log::trace;
use log::warn;
use serde::Deserialize;
use serde::Serialize;

use crate::config::IpccConfig;
use crate::debounce::commit_immediate;
use crate::debounce::debounce_and_update;
use crate::debounce::DebounceOutcome;
use crate::filter::AccuracyPolicy;
use crate::hw::ClassSource;
use crate::hw::SiblingIdle;
use crate::hw::Unavailable;
use crate::model::CpuModel;
use crate::stats::Counters;
use crate::stats::Metrics;
use crate::task::TaskIpcc;
use crate::types::CpuId;
use crate::types::IpcClass;

/// How hardware classes become a task's stable class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CommitMode {
    /// Filter for accuracy and commit only after the class has been stable
    /// for several ticks.
    #[default]
    Debounce,
    /// Commit every class hardware reports as soon as it is read.
    Immediate,
}

/// A scheduler tick on `cpu` while a task was running there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub cpu: CpuId,
    /// The tick interrupted user-mode execution.
    pub user_mode: bool,
}

impl Tick {
    pub fn user(cpu: CpuId) -> Self {
        Self {
            cpu,
            user_mode: true,
        }
    }

    pub fn kernel(cpu: CpuId) -> Self {
        Self {
            cpu,
            user_mode: false,
        }
    }
}

/// What a tick did to the task's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Classification is disabled.
    Disabled,
    /// The tick interrupted kernel mode; hardware feedback describes the
    /// kernel, not the task.
    KernelTick,
    /// No classification could be read.
    Unavailable(Unavailable),
    /// The accuracy filter rejected the class.
    Untrusted,
    Debounced(DebounceOutcome),
    Immediate { changed: bool },
}

impl TickOutcome {
    /// Whether the task's state was left untouched.
    pub fn skipped(&self) -> bool {
        !matches!(self, TickOutcome::Debounced(_) | TickOutcome::Immediate { .. })
    }
}

/// Turns per-CPU hardware classification into stable per-task classes.
///
/// One classifier serves every CPU; per-task state is passed in by the
/// caller, which must be the CPU running the task.
pub struct Classifier<S, I> {
    source: S,
    idle: I,
    model: CpuModel,
    policy: AccuracyPolicy,
    enabled: bool,
    mode: CommitMode,
    accuracy_filter: bool,
    counters: Counters,
}

impl<S: ClassSource, I: SiblingIdle> Classifier<S, I> {
    pub fn new(source: S, idle: I, model: CpuModel, config: &IpccConfig) -> Self {
        let policy = config.policy();
        let covered = policy.covers(&model);

        info!(
            "IPC classes {} on {}: mode={:?} accuracy_filter={} model_rule={}",
            if config.enabled { "enabled" } else { "disabled" },
            model,
            config.mode,
            config.accuracy_filter,
            covered
        );
        if config.enabled
            && config.mode == CommitMode::Debounce
            && config.accuracy_filter
            && !covered
        {
            warn!("No accuracy rule for {}, tasks will stay unclassified", model);
        }

        Self {
            source,
            idle,
            model,
            policy,
            enabled: config.enabled,
            mode: config.mode,
            accuracy_filter: config.accuracy_filter,
            counters: Counters::default(),
        }
    }

    /// Refresh the classification of the task running on `tick.cpu`.
    ///
    /// Any reason not to act on the hardware class (disabled, kernel tick,
    /// no class, untrusted class) leaves `task` untouched.
    pub fn update_classification(&self, task: &mut TaskIpcc, tick: Tick) -> TickOutcome {
        if !self.enabled {
            return TickOutcome::Disabled;
        }
        Counters::inc(&self.counters.nr_ticks);

        if !tick.user_mode {
            Counters::inc(&self.counters.nr_kernel_ticks);
            return TickOutcome::KernelTick;
        }

        let hw_class = match self.source.read_class(tick.cpu) {
            Ok(hw_class) => hw_class,
            Err(reason) => {
                Counters::inc(&self.counters.nr_unavailable);
                trace!("cpu {}: {}", tick.cpu, reason);
                return TickOutcome::Unavailable(reason);
            }
        };

        // Hardware class 0 is valid, scheduler class 0 is "unclassified".
        let class = IpcClass::from_hw(hw_class);

        if self.mode == CommitMode::Immediate {
            let changed = commit_immediate(task, class);
            self.account_commit(tick.cpu, class, changed);
            return TickOutcome::Immediate { changed };
        }

        if self.accuracy_filter {
            let idle = self.idle.siblings_idle(tick.cpu);
            if !self.policy.is_trustworthy(hw_class, idle, &self.model) {
                Counters::inc(&self.counters.nr_untrusted);
                trace!(
                    "cpu {}: untrusted class {} (siblings idle: {})",
                    tick.cpu,
                    hw_class,
                    idle
                );
                return TickOutcome::Untrusted;
            }
        }

        let outcome = debounce_and_update(task, class);
        if let DebounceOutcome::Committed { changed } = outcome {
            self.account_commit(tick.cpu, class, changed);
        }
        TickOutcome::Debounced(outcome)
    }

    fn account_commit(&self, cpu: CpuId, class: IpcClass, changed: bool) {
        Counters::inc(&self.counters.nr_commits);
        if changed {
            Counters::inc(&self.counters.nr_class_changes);
            debug!("cpu {}: task class is now {}", cpu, class);
        }
    }

    pub fn metrics(&self) -> Metrics {
        self.counters.snapshot()
    }

    pub fn model(&self) -> &CpuModel {
        &self.model
    }

    pub fn policy(&self) -> &AccuracyPolicy {
        &self.policy
    }

    pub fn mode(&self) -> CommitMode {
        self.mode
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn accuracy_filter(&self) -> bool {
        self.accuracy_filter
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The sibling-idle source, e.g. to feed busy transitions into
    /// [`crate::SmtSiblings`].
    pub fn idle(&self) -> &I {
        &self.idle
    }
}
