//! Desired-state manifest loading.
//!
//! A manifest is a YAML document with a top-level `ospf_vrfs` list. Each
//! entry names an instance by title (`"<process> <vrf>"`) or by explicit
//! `ospf`/`vrf` fields, and carries any managed properties by name.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_yaml::Value;
use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult, Ensure};

use crate::properties::Property;
use crate::types::{DesiredResource, DesiredValue, PropertyValue, ResourceKey};

/// Resource title: process id and VRF separated by whitespace.
static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\S+)\s+(\S+)\s*$").expect("Invalid regex pattern"));

/// Keyword requesting the device default for a property.
const DEFAULT_KEYWORD: &str = "default";

/// Parsed manifest document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub ospf_vrfs: Vec<ManifestEntry>,
}

/// One declared OSPF VRF instance.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ospf: Option<String>,
    #[serde(default)]
    pub vrf: Option<String>,
    #[serde(default)]
    pub ensure: Ensure,
    /// Everything else is a property.
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

impl Manifest {
    /// Parses a manifest from YAML text.
    pub fn from_yaml_str(data: &str) -> CfgMgrResult<Self> {
        serde_yaml::from_str(data).map_err(|e| CfgMgrError::invalid_config("manifest", e.to_string()))
    }

    /// Loads a manifest from a file.
    pub fn load(path: &Path) -> CfgMgrResult<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| CfgMgrError::manifest(path.display().to_string(), e.to_string()))?;
        Self::from_yaml_str(&data).map_err(|e| match e {
            CfgMgrError::InvalidConfig { message, .. } => {
                CfgMgrError::manifest(path.display().to_string(), message)
            }
            other => other,
        })
    }

    /// Converts every entry into a validated desired resource.
    pub fn into_desired(self) -> CfgMgrResult<Vec<DesiredResource>> {
        self.ospf_vrfs
            .into_iter()
            .map(ManifestEntry::into_desired)
            .collect()
    }
}

impl ManifestEntry {
    /// Returns the instance identity; explicit fields override the title.
    pub fn key(&self) -> CfgMgrResult<ResourceKey> {
        let (title_ospf, title_vrf) = match &self.name {
            Some(name) => {
                let caps = TITLE_RE.captures(name).ok_or_else(|| {
                    CfgMgrError::invalid_config(
                        "name",
                        format!("'{}' is not of the form '<process> <vrf>'", name),
                    )
                })?;
                (Some(caps[1].to_string()), Some(caps[2].to_string()))
            }
            None => (None, None),
        };

        let ospf = self.ospf.clone().or(title_ospf).ok_or_else(|| {
            CfgMgrError::invalid_config("ospf", "missing OSPF process id")
        })?;
        let vrf = self
            .vrf
            .clone()
            .or(title_vrf)
            .ok_or_else(|| CfgMgrError::invalid_config("vrf", "missing VRF name"))?;

        Ok(ResourceKey::new(ospf, vrf))
    }

    /// Converts the entry into a validated desired resource.
    pub fn into_desired(self) -> CfgMgrResult<DesiredResource> {
        let key = self.key()?;
        let mut desired = match self.ensure {
            Ensure::Present => DesiredResource::new(key),
            Ensure::Absent => DesiredResource::absent(key),
        };

        for (name, raw) in &self.properties {
            let property = Property::from_name(name).ok_or_else(|| {
                CfgMgrError::invalid_config(name.as_str(), "unknown property")
            })?;
            desired
                .properties
                .insert(property, desired_value(property, raw)?);
        }

        desired.validate()?;
        Ok(desired)
    }
}

fn desired_value(property: Property, raw: &Value) -> CfgMgrResult<DesiredValue> {
    let invalid = || {
        CfgMgrError::invalid_config(
            property.name(),
            format!("unsupported value {:?}", raw),
        )
    };

    match raw {
        Value::String(s) if s == DEFAULT_KEYWORD => Ok(DesiredValue::Default),
        Value::String(s) if property.is_numeric() => s
            .trim()
            .parse::<u32>()
            .map(|n| DesiredValue::Value(PropertyValue::Number(n)))
            .map_err(|_| {
                CfgMgrError::invalid_config(property.name(), format!("'{}' is not a number", s))
            }),
        Value::String(s) => Ok(DesiredValue::Value(PropertyValue::Text(s.clone()))),
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(|n| DesiredValue::Value(PropertyValue::Number(n)))
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}
