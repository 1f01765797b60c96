// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CloudFormation resource declarations and the merge into `resources.Resources`.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::{ForwarderError, Result};

pub const LAMBDA_PERMISSION: &str = "AWS::Lambda::Permission";
pub const LOGS_SUBSCRIPTION_FILTER: &str = "AWS::Logs::SubscriptionFilter";
pub const IAM_ROLE: &str = "AWS::IAM::Role";
pub const CODEBUILD_PROJECT: &str = "AWS::CodeBuild::Project";
pub const CODEPIPELINE_PIPELINE: &str = "AWS::CodePipeline::Pipeline";

/// Resources produced by one synthesis pass, keyed by logical id.
pub type ResourceSet = IndexMap<String, ResourceDeclaration>;

/// `{"Ref": name}`
pub fn ref_to(name: &str) -> Value {
    json!({ "Ref": name })
}

/// `{"Fn::GetAtt": [resource, attribute]}`
pub fn get_att(resource: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [resource, attribute] })
}

/// Target of log delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A resource that exists outside the document, by ARN.
    Arn(String),
    /// An attribute of a resource declared in the same document.
    Attribute { resource: String, attribute: String },
}

impl Destination {
    pub fn arn_of(resource: impl Into<String>) -> Self {
        Destination::Attribute {
            resource: resource.into(),
            attribute: "Arn".to_string(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Destination::Arn(arn) => Value::String(arn.clone()),
            Destination::Attribute {
                resource,
                attribute,
            } => get_att(resource, attribute),
        }
    }
}

impl From<&Destination> for Value {
    fn from(destination: &Destination) -> Self {
        destination.to_value()
    }
}

impl Serialize for Destination {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Ordered, duplicate-free list of logical ids a resource waits on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct DependsOn(Vec<String>);

impl DependsOn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `name` unless already present. Returns whether it was added.
    pub fn push(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.0.contains(&name) {
            return false;
        }
        self.0.push(name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|existing| existing == name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for DependsOn {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut depends_on = DependsOn::new();
        for name in iter {
            depends_on.push(name);
        }
        depends_on
    }
}

impl<'de> Deserialize<'de> for DependsOn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // CloudFormation accepts a single logical id as well as a list.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::One(name) => std::iter::once(name).collect(),
            Raw::Many(names) => names.into_iter().collect(),
        })
    }
}

/// A single entry of `resources.Resources`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDeclaration {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Properties", default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(rename = "DependsOn", default, skip_serializing_if = "DependsOn::is_empty")]
    pub depends_on: DependsOn,
}

impl ResourceDeclaration {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: Map::new(),
            depends_on: DependsOn::new(),
        }
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name);
        self
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Merges `produced` into `resources.Resources`, creating the intermediate
/// mappings when they are absent. Entries with the same logical id are
/// replaced, everything else is left untouched.
pub fn merge_resources(resources: &mut Option<Value>, produced: &ResourceSet) -> Result<()> {
    if matches!(resources, None | Some(Value::Null)) {
        *resources = Some(Value::Object(Map::new()));
    }
    let Some(Value::Object(section)) = resources else {
        return Err(ForwarderError::InvalidManifest(
            "`resources` must be a mapping".to_string(),
        ));
    };

    let declared = section
        .entry("Resources")
        .or_insert_with(|| Value::Object(Map::new()));
    if declared.is_null() {
        *declared = Value::Object(Map::new());
    }
    let Value::Object(declared) = declared else {
        return Err(ForwarderError::InvalidManifest(
            "`resources.Resources` must be a mapping".to_string(),
        ));
    };

    for (name, declaration) in produced {
        declared.insert(name.clone(), declaration.to_value()?);
    }
    Ok(())
}
