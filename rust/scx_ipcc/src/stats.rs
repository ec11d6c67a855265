// SPDX-License-Identifier: GPL-2.0
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

use std::io::Write;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use anyhow::Result;
use scx_stats::prelude::*;
use scx_stats_derive::stat_doc;
use scx_stats_derive::Stats;
use serde::Deserialize;
use serde::Serialize;

#[stat_doc]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Stats)]
#[stat(top)]
pub struct Metrics {
    #[stat(desc = "Number of ticks seen by the classifier")]
    pub nr_ticks: u64,
    #[stat(desc = "Number of ticks skipped because they interrupted kernel mode")]
    pub nr_kernel_ticks: u64,
    #[stat(desc = "Number of ticks without hardware classification")]
    pub nr_unavailable: u64,
    #[stat(desc = "Number of classifications rejected by the accuracy filter")]
    pub nr_untrusted: u64,
    #[stat(desc = "Number of class commits")]
    pub nr_commits: u64,
    #[stat(desc = "Number of commits that changed the class of a task")]
    pub nr_class_changes: u64,
}

impl Metrics {
    pub fn format<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(
            w,
            "[ipcc] ticks: {:<6} kern: {:<6} unavail: {:<6} untrusted: {:<6} commits: {:<6} changes: {:<6}",
            self.nr_ticks,
            self.nr_kernel_ticks,
            self.nr_unavailable,
            self.nr_untrusted,
            self.nr_commits,
            self.nr_class_changes,
        )?;
        Ok(())
    }

    pub fn delta(&self, rhs: &Self) -> Self {
        Self {
            nr_ticks: self.nr_ticks - rhs.nr_ticks,
            nr_kernel_ticks: self.nr_kernel_ticks - rhs.nr_kernel_ticks,
            nr_unavailable: self.nr_unavailable - rhs.nr_unavailable,
            nr_untrusted: self.nr_untrusted - rhs.nr_untrusted,
            nr_commits: self.nr_commits - rhs.nr_commits,
            nr_class_changes: self.nr_class_changes - rhs.nr_class_changes,
        }
    }
}

/// Live counters behind [`Metrics`], updated from every CPU.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub nr_ticks: AtomicU64,
    pub nr_kernel_ticks: AtomicU64,
    pub nr_unavailable: AtomicU64,
    pub nr_untrusted: AtomicU64,
    pub nr_commits: AtomicU64,
    pub nr_class_changes: AtomicU64,
}

impl Counters {
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Metrics {
        Metrics {
            nr_ticks: self.nr_ticks.load(Ordering::Relaxed),
            nr_kernel_ticks: self.nr_kernel_ticks.load(Ordering::Relaxed),
            nr_unavailable: self.nr_unavailable.load(Ordering::Relaxed),
            nr_untrusted: self.nr_untrusted.load(Ordering::Relaxed),
            nr_commits: self.nr_commits.load(Ordering::Relaxed),
            nr_class_changes: self.nr_class_changes.load(Ordering::Relaxed),
        }
    }
}

/// Stats server plumbing for schedulers exporting classifier metrics. The
/// scheduler answers each `()` request with a [`Metrics`] snapshot.
pub fn server_data() -> StatsServerData<(), Metrics> {
    let open: Box<dyn StatsOpener<(), Metrics>> = Box::new(move |(req_ch, res_ch)| {
        req_ch.send(())?;
        let mut prev = res_ch.recv()?;

        let read: Box<dyn StatsReader<(), Metrics>> = Box::new(move |_args, (req_ch, res_ch)| {
            req_ch.send(())?;
            let cur = res_ch.recv()?;
            let delta = cur.delta(&prev);
            prev = cur;
            delta.to_json()
        });

        Ok(read)
    });

    StatsServerData::new()
        .add_meta(Metrics::meta())
        .add_ops("top", StatsOps { open, close: None })
}
