// SPDX-License-Identifier: GPL-2.0
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! # IPC class tracking for sched_ext schedulers
//!
//! On hybrid processors, the architecture differences between types of CPUs
//! lead to a different number of retired instructions per cycle (IPC), and
//! IPCs differ further by the class of instructions a task executes. Hardware
//! feedback (e.g. Intel Thread Director) reports a raw class for whatever is
//! running on a CPU, but the raw value is noisy and flips between samples.
//!
//! This crate turns the raw per-CPU signal into a stable per-task IPC class
//! that placement logic can consume:
//!
//! - [`AccuracyPolicy`] decides, per processor model, whether a raw class is
//!   trustworthy given whether the SMT siblings of the sampling CPU are idle.
//! - [`debounce_and_update`] commits a class only after it has been observed
//!   for [`CLASS_DEBOUNCER_SKIPS`] consecutive ticks.
//! - [`Classifier`] runs the two on every user tick of a running task.
//!
//! Reading the raw class and tracking sibling idleness are left to the host
//! through the [`ClassSource`] and [`SiblingIdle`] traits.
//!
//! ```
//! use scx_ipcc::*;
//!
//! let model = CpuModel::intel(6, INTEL_FAM6_ALDERLAKE);
//! let source = |_cpu: CpuId| -> Result<HwClass, Unavailable> { Ok(3) };
//! let idle = |_cpu: CpuId| false;
//! let classifier = Classifier::new(source, idle, model, &IpccConfig::default());
//!
//! let mut task = TaskIpcc::new();
//! let reader = task.reader();
//! for _ in 0..CLASS_DEBOUNCER_SKIPS {
//!     classifier.update_classification(&mut task, Tick::user(CpuId(0)));
//! }
//! assert_eq!(reader.get(), Some(IpcClass::from_hw(3)));
//! ```

mod types;
pub use types::CpuId;
pub use types::HwClass;
pub use types::IpcClass;
pub use types::Pid;

mod task;
pub use task::IpccSnapshot;
pub use task::StableClassReader;
pub use task::TaskIpcc;

mod debounce;
pub use debounce::commit_immediate;
pub use debounce::debounce_and_update;
pub use debounce::DebounceOutcome;
pub use debounce::CLASS_DEBOUNCER_SKIPS;

pub mod model;
pub use model::CpuModel;
pub use model::INTEL_FAM6_ALDERLAKE;
pub use model::INTEL_FAM6_ALDERLAKE_L;
pub use model::INTEL_FAM6_RAPTORLAKE;
pub use model::INTEL_FAM6_RAPTORLAKE_P;
pub use model::INTEL_FAM6_RAPTORLAKE_S;

mod filter;
pub use filter::AccuracyPolicy;
pub use filter::ModelRule;

mod hw;
pub use hw::ClassSource;
pub use hw::SiblingIdle;
pub use hw::SmtSiblings;
pub use hw::Unavailable;

mod classifier;
pub use classifier::Classifier;
pub use classifier::CommitMode;
pub use classifier::Tick;
pub use classifier::TickOutcome;

mod table;
pub use table::IpccTable;

pub mod config;
pub use config::IpccConfig;

mod cli;
pub use cli::IpccArgs;

pub mod stats;
pub use stats::Metrics;
