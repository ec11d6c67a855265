// SPDX-License-Identifier: GPL-2.0
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! CLI arguments for schedulers using IPC classes.
//!

use std::path::PathBuf;

use anyhow::bail;
use anyhow::Result;
use clap::Args;
use log::warn;

use crate::classifier::CommitMode;
use crate::config::init_config;
use crate::config::parse_config_file;
use crate::config::IpccConfig;

/// IPC class arguments, meant to be flattened into a scheduler's options.
#[derive(Args, Debug, Clone, Default)]
pub struct IpccArgs {
    /// Disable IPC class tracking.
    #[clap(long = "ipcc-disable", action = clap::ArgAction::SetTrue)]
    pub ipcc_disable: bool,

    /// How hardware classes are committed to tasks.
    ///
    /// "debounce" commits a class once it has been reported for several consecutive ticks
    /// and discards unreliable reports. "immediate" commits every report as it arrives.
    #[clap(long = "ipcc-mode", value_enum)]
    pub ipcc_mode: Option<CommitMode>,

    /// Act on hardware classes regardless of processor model and SMT sibling activity.
    #[clap(long = "ipcc-no-filter", action = clap::ArgAction::SetTrue)]
    pub ipcc_no_filter: bool,

    /// Path to a TOML configuration file. The system configuration is used when omitted.
    #[clap(long = "ipcc-config")]
    pub ipcc_config: Option<PathBuf>,
}

impl IpccArgs {
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.ipcc_config {
            if !path.exists() {
                bail!("IPC class config {:?} does not exist", path);
            }
        }
        Ok(())
    }

    /// Load the configuration and apply the command line on top of it.
    pub fn to_config(&self) -> Result<IpccConfig> {
        self.validate()?;
        let mut config = match &self.ipcc_config {
            Some(path) => parse_config_file(path)?,
            None => init_config()?,
        };
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut IpccConfig) {
        if self.ipcc_disable {
            config.enabled = false;
        }
        if let Some(mode) = self.ipcc_mode {
            config.mode = mode;
        }
        if self.ipcc_no_filter {
            config.accuracy_filter = false;
        }
        if config.mode == CommitMode::Immediate && self.ipcc_no_filter {
            warn!("--ipcc-no-filter has no effect in immediate mode");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Opts {
        #[clap(flatten)]
        ipcc: IpccArgs,
    }

    #[test]
    fn test_defaults() {
        let opts = Opts::try_parse_from(["sched"]).unwrap();
        let mut config = IpccConfig::default();
        opts.ipcc.apply(&mut config);
        assert_eq!(config, IpccConfig::default());
    }

    #[test]
    fn test_flags_override_config() {
        let opts = Opts::try_parse_from([
            "sched",
            "--ipcc-mode",
            "immediate",
            "--ipcc-no-filter",
            "--ipcc-disable",
        ])
        .unwrap();
        let mut config = IpccConfig::default();
        opts.ipcc.apply(&mut config);
        assert!(!config.enabled);
        assert!(!config.accuracy_filter);
        assert_eq!(config.mode, CommitMode::Immediate);
    }

    #[test]
    fn test_bad_mode() {
        assert!(Opts::try_parse_from(["sched", "--ipcc-mode", "never"]).is_err());
    }

    #[test]
    fn test_config_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("ipcc.toml");
        std::fs::write(&path, "mode = \"immediate\"\naccuracy_filter = false\n").unwrap();

        let opts = Opts::try_parse_from([
            "sched",
            "--ipcc-config",
            path.to_str().unwrap(),
            "--ipcc-mode",
            "debounce",
        ])
        .unwrap();
        let config = opts.ipcc.to_config().unwrap();
        assert_eq!(config.mode, CommitMode::Debounce);
        assert!(!config.accuracy_filter);
    }

    #[test]
    fn test_missing_config_file() {
        let args = IpccArgs {
            ipcc_config: Some(PathBuf::from("/nonexistent/ipcc.toml")),
            ..Default::default()
        };
        assert!(args.validate().is_err());
        assert!(args.to_config().is_err());
    }
}
