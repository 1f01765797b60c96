// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Typed view of a `serverless.yml` service definition.
//!
//! Only the parts of the manifest that the forwarder reads or writes are
//! modelled explicitly. Every other key, at every level, is captured in a
//! flattened `extra` map so a manifest survives a load/emit cycle unchanged.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cicd::CicdConfig;
use crate::config::SplunkConfig;
use crate::error::{ForwarderError, Result};
use crate::naming;

/// Region assumed by the host when `provider.region` is not set.
pub const DEFAULT_REGION: &str = "us-east-1";

/// The `service` key, which the host accepts either as a bare string or as an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceName {
    Name(String),
    Detailed {
        name: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl ServiceName {
    pub fn as_str(&self) -> &str {
        match self {
            ServiceName::Name(name) => name,
            ServiceName::Detailed { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Provider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Environment shared by every function of the service.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub environment: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// Deployed (realized) function name. The host fills in its own naming
    /// convention when this is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub environment: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FunctionDeclaration {
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            handler: Some(handler.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Custom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splunk: Option<SplunkConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cicd: Option<CicdConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Custom {
    pub fn is_empty(&self) -> bool {
        self.splunk.is_none() && self.cicd.is_none() && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceManifest {
    pub service: ServiceName,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub functions: IndexMap<String, FunctionDeclaration>,
    /// Raw infrastructure document. Kept untyped: other plugins and users
    /// write arbitrary CloudFormation here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Value>,
    #[serde(default, skip_serializing_if = "Custom::is_empty")]
    pub custom: Custom,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServiceManifest {
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(ForwarderError::ManifestParse)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| ForwarderError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(ForwarderError::Emit)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn service_name(&self) -> &str {
        self.service.as_str()
    }

    pub fn region(&self) -> &str {
        self.provider
            .region
            .as_deref()
            .filter(|region| !region.trim().is_empty())
            .unwrap_or(DEFAULT_REGION)
    }

    /// Logical keys of every declared function.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn function(&self, key: &str) -> Option<&FunctionDeclaration> {
        self.functions.get(key)
    }

    /// The name the function will carry once deployed, which is not necessarily
    /// its key in `functions`.
    pub fn realized_function_name(&self, key: &str, stage: &str) -> String {
        self.function(key)
            .and_then(|function| function.name.clone())
            .unwrap_or_else(|| naming::default_function_name(self.service_name(), stage, key))
    }

    /// Entries currently declared under `resources.Resources`, if any.
    pub fn declared_resources(&self) -> Option<&Map<String, Value>> {
        self.resources
            .as_ref()
            .and_then(|resources| resources.get("Resources"))
            .and_then(Value::as_object)
    }
}
