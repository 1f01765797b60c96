// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{ForwarderError, Result};
use crate::manifest::ServiceManifest;

/// Stage used when neither the command line nor `provider.stage` names one.
pub const DEFAULT_STAGE: &str = "dev";

/// Resolves the active stage.
///
/// An explicitly requested stage wins over `provider.stage`, which wins over
/// [`DEFAULT_STAGE`]. Blank values are treated as absent.
pub fn resolve_stage(requested: Option<&str>, provider_stage: Option<&str>) -> String {
    [requested, provider_stage]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|stage| !stage.is_empty())
        .unwrap_or(DEFAULT_STAGE)
        .to_string()
}

/// The `custom.splunk` section as written by the user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SplunkConfig {
    /// ARN of an already deployed forwarder. When set, no forwarder is declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    /// Splunk HTTP Event Collector endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Splunk HTTP Event Collector token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(
        default,
        alias = "excludeStages",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub excludestages: Vec<String>,
}

/// Accepts `excludestages: dev` as well as a list of stages.
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::One(stage) => vec![stage],
        Raw::Many(stages) => stages,
    })
}

/// Where function logs are delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwarderTarget {
    /// Reuse a forwarder deployed outside this service.
    Existing { arn: String },
    /// Deploy a forwarder with this service, pointed at the given collector.
    Managed { url: String, token: String },
}

/// Validated Splunk settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplunkSettings {
    pub target: ForwarderTarget,
    pub exclude_stages: BTreeSet<String>,
}

impl SplunkSettings {
    /// Reads and validates `custom.splunk` from the manifest.
    pub fn from_manifest(manifest: &ServiceManifest) -> Result<Self> {
        manifest
            .custom
            .splunk
            .as_ref()
            .ok_or_else(|| {
                ForwarderError::InvalidConfig("custom.splunk section is required".to_string())
            })?
            .validate()
    }

    pub fn is_excluded(&self, stage: &str) -> bool {
        self.exclude_stages.contains(stage)
    }

    pub fn existing_arn(&self) -> Option<&str> {
        match &self.target {
            ForwarderTarget::Existing { arn } => Some(arn.as_str()),
            ForwarderTarget::Managed { .. } => None,
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl SplunkConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<SplunkSettings> {
        let exclude_stages = self
            .excludestages
            .iter()
            .map(|stage| stage.trim())
            .filter(|stage| !stage.is_empty())
            .map(str::to_string)
            .collect();

        if let Some(arn) = non_blank(self.arn.as_ref()) {
            if self.url.is_some() || self.token.is_some() {
                debug!("custom.splunk.arn is set, ignoring custom.splunk.url and custom.splunk.token");
            }
            return Ok(SplunkSettings {
                target: ForwarderTarget::Existing { arn },
                exclude_stages,
            });
        }

        let url = non_blank(self.url.as_ref()).ok_or_else(|| {
            ForwarderError::InvalidConfig(
                "custom.splunk.url is required unless custom.splunk.arn is set".to_string(),
            )
        })?;
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(ForwarderError::InvalidConfig(format!(
                "custom.splunk.url must be an http(s) URL, got '{url}'"
            )));
        }

        let token = non_blank(self.token.as_ref()).ok_or_else(|| {
            ForwarderError::InvalidConfig(
                "custom.splunk.token is required unless custom.splunk.arn is set".to_string(),
            )
        })?;

        Ok(SplunkSettings {
            target: ForwarderTarget::Managed { url, token },
            exclude_stages,
        })
    }
}
