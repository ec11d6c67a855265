// SPDX-License-Identifier: GPL-2.0
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

use crate::classifier::CommitMode;
use crate::filter::AccuracyPolicy;
use crate::filter::ModelRule;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpccConfig {
    pub enabled: bool,
    pub mode: CommitMode,
    pub accuracy_filter: bool,
    /// Accuracy rules added on top of the built-in ones.
    pub models: Vec<ModelRule>,
}

impl Default for IpccConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: CommitMode::Debounce,
            accuracy_filter: true,
            models: Vec::new(),
        }
    }
}

impl IpccConfig {
    /// The built-in accuracy policy extended with the configured rules.
    pub fn policy(&self) -> AccuracyPolicy {
        AccuracyPolicy::default().with_rules(self.models.iter().cloned())
    }
}

/// Initialize config from first found config path, otherwise fallback to
/// default config
pub fn init_config() -> Result<IpccConfig> {
    match get_config_path() {
        Some(config_path) => parse_config_file(&config_path),
        None => Ok(IpccConfig::default()),
    }
}

pub fn parse_config_file(filepath: &Path) -> Result<IpccConfig> {
    let file_content = fs::read_to_string(filepath)
        .with_context(|| format!("Failed to read config {:?}", filepath))?;
    parse_config_content(&file_content).with_context(|| format!("Invalid config {:?}", filepath))
}

pub fn get_config_path() -> Option<PathBuf> {
    let check_paths = ["/etc/scx_ipcc/config.toml", "/etc/scx_ipcc.toml"];
    check_paths
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

fn parse_config_content(file_content: &str) -> Result<IpccConfig> {
    if file_content.trim().is_empty() {
        anyhow::bail!("The config file is empty!")
    }
    let config: IpccConfig = toml::from_str(file_content)?;
    Ok(config)
}
