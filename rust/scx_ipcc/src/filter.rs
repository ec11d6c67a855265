// SPDX-License-Identifier: GPL-2.0
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Per-model accuracy policy for hardware classification.
//!
//! Some processors report low and mid classes unreliably while the SMT
//! sibling of the sampling CPU is busy, since the sibling's instructions
//! contaminate the measurement. Each known model gets a [`ModelRule`] naming
//! the classes that can be trusted unconditionally and whether an idle
//! sibling makes any class trustworthy. Models without a rule are not
//! classified at all.

use serde::Deserialize;
use serde::Serialize;

use crate::model::CpuModel;
use crate::model::INTEL_FAM6_ALDERLAKE;
use crate::model::INTEL_FAM6_ALDERLAKE_L;
use crate::model::INTEL_FAM6_RAPTORLAKE;
use crate::model::INTEL_FAM6_RAPTORLAKE_P;
use crate::model::INTEL_FAM6_RAPTORLAKE_S;
use crate::model::INTEL_VENDOR;
use crate::types::HwClass;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRule {
    pub vendor: String,
    pub family: u16,
    pub model: u8,
    /// Classes accepted regardless of sibling activity.
    #[serde(default)]
    pub trusted_classes: Vec<HwClass>,
    /// Accept every class while all SMT siblings are idle.
    #[serde(default)]
    pub trust_idle_siblings: bool,
}

impl ModelRule {
    pub fn new(model: &CpuModel, trusted_classes: &[HwClass], trust_idle_siblings: bool) -> Self {
        Self {
            vendor: model.vendor.clone(),
            family: model.family,
            model: model.model,
            trusted_classes: trusted_classes.to_vec(),
            trust_idle_siblings,
        }
    }

    pub fn model(&self) -> CpuModel {
        CpuModel::new(&self.vendor, self.family, self.model)
    }

    pub fn matches(&self, model: &CpuModel) -> bool {
        self.vendor == model.vendor && self.family == model.family && self.model == model.model
    }

    pub fn accepts(&self, hw_class: HwClass, siblings_idle: bool) -> bool {
        self.trusted_classes.contains(&hw_class) || (self.trust_idle_siblings && siblings_idle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccuracyPolicy {
    rules: Vec<ModelRule>,
}

impl AccuracyPolicy {
    /// A policy without rules. Rejects every signal.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Intel hybrid parts whose classes 0 and 1 are only reliable while the
    /// SMT sibling is idle.
    pub fn intel_hybrid() -> Self {
        let rules = [
            INTEL_FAM6_ALDERLAKE,
            INTEL_FAM6_ALDERLAKE_L,
            INTEL_FAM6_RAPTORLAKE,
            INTEL_FAM6_RAPTORLAKE_P,
            INTEL_FAM6_RAPTORLAKE_S,
        ]
        .iter()
        .map(|model| ModelRule::new(&CpuModel::new(INTEL_VENDOR, 6, *model), &[2, 3], true))
        .collect();

        Self { rules }
    }

    /// Add `rules` to the policy. A rule for a model that already has one
    /// replaces it.
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = ModelRule>) -> Self {
        for rule in rules {
            match self.rules.iter_mut().find(|r| r.matches(&rule.model())) {
                Some(existing) => *existing = rule,
                None => self.rules.push(rule),
            }
        }
        self
    }

    pub fn rules(&self) -> &[ModelRule] {
        &self.rules
    }

    pub fn rule_for(&self, model: &CpuModel) -> Option<&ModelRule> {
        self.rules.iter().find(|r| r.matches(model))
    }

    pub fn covers(&self, model: &CpuModel) -> bool {
        self.rule_for(model).is_some()
    }

    /// Whether `hw_class`, sampled while the SMT siblings were
    /// (`siblings_idle`) or were not idle, can be acted upon on `model`.
    pub fn is_trustworthy(&self, hw_class: HwClass, siblings_idle: bool, model: &CpuModel) -> bool {
        self.rule_for(model)
            .is_some_and(|rule| rule.accepts(hw_class, siblings_idle))
    }
}

impl Default for AccuracyPolicy {
    fn default() -> Self {
        Self::intel_hybrid()
    }
}
