// SPDX-License-Identifier: GPL-2.0
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! # Processor model identity
//!
//! How trustworthy hardware classification is depends on the processor
//! model, so the accuracy policy is keyed by vendor, family and model as
//! reported in `/proc/cpuinfo`. The host model is detected once and cached
//! for the lifetime of the process:
//!
//!```
//!     let model = scx_ipcc::CpuModel::host();
//!```

use std::fmt;
use std::path::Path;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use log::warn;
use serde::Deserialize;
use serde::Serialize;

pub const INTEL_VENDOR: &str = "GenuineIntel";
pub const AMD_VENDOR: &str = "AuthenticAMD";

// Intel family 6 hybrid models with Thread Director.
pub const INTEL_FAM6_ALDERLAKE: u8 = 0x97;
pub const INTEL_FAM6_ALDERLAKE_L: u8 = 0x9A;
pub const INTEL_FAM6_RAPTORLAKE: u8 = 0xB7;
pub const INTEL_FAM6_RAPTORLAKE_P: u8 = 0xBA;
pub const INTEL_FAM6_RAPTORLAKE_S: u8 = 0xBF;

const CPUINFO_PATH: &str = "/proc/cpuinfo";

lazy_static::lazy_static! {
    static ref HOST_MODEL: Option<CpuModel> = match CpuModel::detect() {
        Ok(model) => Some(model),
        Err(e) => {
            warn!("Failed to identify the processor model: {:#}", e);
            None
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CpuModel {
    pub vendor: String,
    pub family: u16,
    pub model: u8,
}

impl CpuModel {
    pub fn new(vendor: &str, family: u16, model: u8) -> Self {
        Self {
            vendor: vendor.to_string(),
            family,
            model,
        }
    }

    pub fn intel(family: u16, model: u8) -> Self {
        Self::new(INTEL_VENDOR, family, model)
    }

    /// The model of the host processor, `None` if it could not be
    /// identified. Detection runs once per process.
    pub fn host() -> Option<&'static CpuModel> {
        HOST_MODEL.as_ref()
    }

    /// Read the model of the host processor from `/proc/cpuinfo`.
    pub fn detect() -> Result<CpuModel> {
        Self::from_path(Path::new(CPUINFO_PATH))
    }

    pub fn from_path(path: &Path) -> Result<CpuModel> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        Self::parse_cpuinfo(&content)
    }

    /// Parse the first processor entry of `/proc/cpuinfo` content. All
    /// entries describe the same model on the systems we care about.
    pub fn parse_cpuinfo(content: &str) -> Result<CpuModel> {
        let mut vendor = None;
        let mut family = None;
        let mut model = None;

        for line in content.lines() {
            if line.trim().is_empty() {
                if vendor.is_some() {
                    break;
                }
                continue;
            }
            let Some((key, val)) = line.split_once(':') else {
                continue;
            };
            let val = val.trim();
            match key.trim() {
                "vendor_id" => vendor = Some(val.to_string()),
                "cpu family" => {
                    family = Some(
                        val.parse::<u16>()
                            .with_context(|| format!("Invalid cpu family '{}'", val))?,
                    )
                }
                "model" => {
                    model = Some(
                        val.parse::<u8>()
                            .with_context(|| format!("Invalid cpu model '{}'", val))?,
                    )
                }
                _ => {}
            }
        }

        match (vendor, family, model) {
            (Some(vendor), Some(family), Some(model)) => Ok(CpuModel {
                vendor,
                family,
                model,
            }),
            _ => bail!("No x86 vendor_id, cpu family and model in cpuinfo"),
        }
    }
}

impl fmt::Display for CpuModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} family {} model 0x{:02x}",
            self.vendor, self.family, self.model
        )
    }
}
