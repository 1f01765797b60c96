// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Builds the CloudFormation resources that route every function's log group
//! to the Splunk forwarder, and merges them into the manifest.
//!
//! One synthesis pass produces:
//!
//! - a single `AWS::Lambda::Permission` allowing CloudWatch Logs to invoke the forwarder,
//! - one `AWS::Logs::SubscriptionFilter` per function (the forwarder itself excluded),
//! - whatever the registered [`ResourceExtension`]s contribute.
//!
//! The output only depends on the manifest and the stage, so merging it again
//! replaces the previous pass's entries with identical ones.

use std::fmt::Debug;

use tracing::{debug, info};

use crate::config::SplunkSettings;
use crate::error::Result;
use crate::manifest::ServiceManifest;
use crate::naming;
use crate::provisioner::{ForwarderNaming, FORWARDER_FUNCTION_KEY};
use crate::resources::{
    merge_resources, Destination, ResourceDeclaration, ResourceSet, LAMBDA_PERMISSION,
    LOGS_SUBSCRIPTION_FILTER,
};

/// Logical id of the permission every subscription filter depends on.
pub const PERMISSION_RESOURCE: &str = "SplunkLambdaPermission";

const SUBSCRIPTION_SUFFIX: &str = "Splunk";

/// Logical id of the subscription filter attached to a function's log group.
pub fn subscription_logical_id(function_key: &str) -> String {
    format!(
        "{}{SUBSCRIPTION_SUFFIX}",
        naming::log_group_logical_id(function_key)
    )
}

/// Additional resources synthesized alongside the log forwarding wiring.
pub trait ResourceExtension: Debug {
    fn name(&self) -> &str;

    fn resources(&self, manifest: &ServiceManifest, stage: &str) -> Result<ResourceSet>;
}

#[derive(Debug)]
pub struct ResourceSynthesizer {
    settings: SplunkSettings,
    naming: ForwarderNaming,
    extensions: Vec<Box<dyn ResourceExtension>>,
}

impl ResourceSynthesizer {
    pub fn new(settings: SplunkSettings, naming: ForwarderNaming) -> Self {
        Self {
            settings,
            naming,
            extensions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl ResourceExtension + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Where subscription filters deliver: the configured ARN, or the forwarder
    /// function declared in this service.
    pub fn destination(&self) -> Destination {
        match self.settings.existing_arn() {
            Some(arn) => Destination::Arn(arn.to_string()),
            None => Destination::arn_of(naming::lambda_logical_id(FORWARDER_FUNCTION_KEY)),
        }
    }

    /// Produces the resources for `stage`. Empty when the stage is excluded.
    pub fn synthesize(&self, manifest: &ServiceManifest, stage: &str) -> Result<ResourceSet> {
        if self.settings.is_excluded(stage) {
            info!("Splunk is ignored for {stage} stage");
            return Ok(ResourceSet::new());
        }

        let destination = self.destination();
        let forwarder_name = self.naming.realized_name(manifest, stage);
        // a managed forwarder replaces whatever is declared under its key
        let forwarder_key = self
            .settings
            .existing_arn()
            .is_none()
            .then_some(FORWARDER_FUNCTION_KEY);

        let mut resources = ResourceSet::new();
        resources.insert(
            PERMISSION_RESOURCE.to_string(),
            permission(&destination, manifest.region()),
        );

        for function_key in manifest.function_names() {
            let function_name = manifest.realized_function_name(function_key, stage);
            if function_name == forwarder_name || forwarder_key == Some(function_key) {
                debug!("Skipping log subscription for forwarder function {function_name}");
                continue;
            }

            let logical_id = subscription_logical_id(function_key);
            debug!("Subscribing {function_name} logs to Splunk as {logical_id}");
            resources.insert(
                logical_id,
                subscription_filter(
                    &destination,
                    &naming::log_group_name(&function_name),
                    &naming::log_group_logical_id(function_key),
                ),
            );
        }

        for extension in &self.extensions {
            let produced = extension.resources(manifest, stage)?;
            debug!(
                "Extension {} produced {} resources",
                extension.name(),
                produced.len()
            );
            resources.extend(produced);
        }

        Ok(resources)
    }

    /// Synthesizes and merges into `resources.Resources`. Returns the number of
    /// entries written.
    pub fn update(&self, manifest: &mut ServiceManifest, stage: &str) -> Result<usize> {
        let produced = self.synthesize(manifest, stage)?;
        if produced.is_empty() {
            return Ok(0);
        }

        info!("Updating Splunk Resources...");
        merge_resources(&mut manifest.resources, &produced)?;
        info!("Splunk Resources Updated");
        Ok(produced.len())
    }
}

fn permission(destination: &Destination, region: &str) -> ResourceDeclaration {
    ResourceDeclaration::new(LAMBDA_PERMISSION)
        .property("FunctionName", destination)
        .property("Action", "lambda:InvokeFunction")
        .property("Principal", naming::logs_principal(region))
}

fn subscription_filter(
    destination: &Destination,
    log_group_name: &str,
    log_group_logical_id: &str,
) -> ResourceDeclaration {
    ResourceDeclaration::new(LOGS_SUBSCRIPTION_FILTER)
        .property("DestinationArn", destination)
        .property("FilterPattern", "")
        .property("LogGroupName", log_group_name)
        .depends_on(PERMISSION_RESOURCE)
        .depends_on(log_group_logical_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForwarderTarget;
    use crate::manifest::FunctionDeclaration;
    use serde_json::json;
    use std::collections::BTreeSet;
    use tracing_test::traced_test;

    const ARN: &str = "arn:aws:lambda:eu-west-1:123456789012:function:central-splunk";

    fn manifest() -> ServiceManifest {
        ServiceManifest::from_yaml_str(
            r#"
service: orders
provider:
  name: aws
  region: eu-west-1
functions:
  api:
    handler: src/api.handler
  worker:
    name: orders-background-worker
    handler: src/worker.handler
"#,
        )
        .unwrap()
    }

    fn managed(exclude: &[&str]) -> SplunkSettings {
        SplunkSettings {
            target: ForwarderTarget::Managed {
                url: "https://hec.example.com".to_string(),
                token: "token".to_string(),
            },
            exclude_stages: exclude.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn existing() -> SplunkSettings {
        SplunkSettings {
            target: ForwarderTarget::Existing {
                arn: ARN.to_string(),
            },
            exclude_stages: BTreeSet::new(),
        }
    }

    #[derive(Debug)]
    struct StaticExtension;

    impl ResourceExtension for StaticExtension {
        fn name(&self) -> &str {
            "static"
        }

        fn resources(&self, _manifest: &ServiceManifest, stage: &str) -> Result<ResourceSet> {
            let mut set = ResourceSet::new();
            set.insert(
                "Topic".to_string(),
                ResourceDeclaration::new("AWS::SNS::Topic").property("TopicName", stage),
            );
            Ok(set)
        }
    }

    #[test]
    fn test_synthesize_managed_forwarder() {
        let synthesizer = ResourceSynthesizer::new(managed(&[]), ForwarderNaming::ServiceStage);
        let resources = synthesizer.synthesize(&manifest(), "prod").unwrap();

        assert_eq!(
            resources.keys().collect::<Vec<_>>(),
            [PERMISSION_RESOURCE, "ApiLogGroupSplunk", "WorkerLogGroupSplunk"]
        );

        let permission = resources[PERMISSION_RESOURCE].to_value().unwrap();
        assert_eq!(
            permission,
            json!({
                "Type": "AWS::Lambda::Permission",
                "Properties": {
                    "FunctionName": {"Fn::GetAtt": ["SplunkLambdaFunction", "Arn"]},
                    "Action": "lambda:InvokeFunction",
                    "Principal": "logs.eu-west-1.amazonaws.com",
                }
            })
        );

        let api = resources["ApiLogGroupSplunk"].to_value().unwrap();
        assert_eq!(
            api,
            json!({
                "Type": "AWS::Logs::SubscriptionFilter",
                "Properties": {
                    "DestinationArn": {"Fn::GetAtt": ["SplunkLambdaFunction", "Arn"]},
                    "FilterPattern": "",
                    "LogGroupName": "/aws/lambda/orders-prod-api",
                },
                "DependsOn": ["SplunkLambdaPermission", "ApiLogGroup"],
            })
        );
    }

    #[test]
    fn test_log_group_uses_realized_name() {
        let synthesizer = ResourceSynthesizer::new(managed(&[]), ForwarderNaming::ServiceStage);
        let resources = synthesizer.synthesize(&manifest(), "prod").unwrap();
        assert_eq!(
            resources["WorkerLogGroupSplunk"].properties["LogGroupName"],
            json!("/aws/lambda/orders-background-worker")
        );
    }

    #[test]
    fn test_each_subscription_has_independent_dependencies() {
        let synthesizer = ResourceSynthesizer::new(managed(&[]), ForwarderNaming::ServiceStage);
        let resources = synthesizer.synthesize(&manifest(), "prod").unwrap();
        for (key, log_group) in [("ApiLogGroupSplunk", "ApiLogGroup"), ("WorkerLogGroupSplunk", "WorkerLogGroup")] {
            let depends_on = &resources[key].depends_on;
            assert_eq!(depends_on.len(), 2, "{key} has {depends_on:?}");
            assert!(depends_on.contains(PERMISSION_RESOURCE));
            assert!(depends_on.contains(log_group));
        }
    }

    #[test]
    fn test_existing_arn_destination() {
        let synthesizer = ResourceSynthesizer::new(existing(), ForwarderNaming::ServiceStage);
        assert_eq!(synthesizer.destination(), Destination::Arn(ARN.to_string()));

        let resources = synthesizer.synthesize(&manifest(), "prod").unwrap();
        assert_eq!(resources[PERMISSION_RESOURCE].properties["FunctionName"], json!(ARN));
        for declaration in resources.values() {
            if declaration.kind == LOGS_SUBSCRIPTION_FILTER {
                assert_eq!(declaration.properties["DestinationArn"], json!(ARN));
            }
        }
    }

    #[traced_test]
    #[test]
    fn test_excluded_stage_produces_nothing() {
        let synthesizer = ResourceSynthesizer::new(managed(&["dev"]), ForwarderNaming::ServiceStage);
        let mut manifest = manifest();
        manifest.resources = Some(json!({"Resources": {"Bucket": {"Type": "AWS::S3::Bucket"}}}));
        let before = manifest.clone();

        assert!(synthesizer.synthesize(&manifest, "dev").unwrap().is_empty());
        assert_eq!(synthesizer.update(&mut manifest, "dev").unwrap(), 0);
        assert_eq!(manifest, before);
        assert!(logs_contain("Splunk is ignored for dev stage"));
    }

    #[test]
    fn test_excluded_stage_does_not_create_resources_section() {
        let synthesizer = ResourceSynthesizer::new(managed(&["dev"]), ForwarderNaming::ServiceStage);
        let mut manifest = manifest();
        synthesizer.update(&mut manifest, "dev").unwrap();
        assert!(manifest.resources.is_none());
    }

    #[test]
    fn test_forwarder_is_not_subscribed_to_itself() {
        let mut manifest = manifest();
        manifest.functions.insert(
            FORWARDER_FUNCTION_KEY.to_string(),
            FunctionDeclaration::new("splunk.handler"),
        );
        let synthesizer = ResourceSynthesizer::new(managed(&[]), ForwarderNaming::ServiceStage);
        let resources = synthesizer.synthesize(&manifest, "prod").unwrap();
        assert!(!resources.contains_key("SplunkLogGroupSplunk"));
        assert_eq!(resources.len(), 3);
    }

    #[test]
    fn test_renamed_function_under_forwarder_key_is_not_subscribed() {
        let mut manifest = manifest();
        manifest.functions.insert(
            FORWARDER_FUNCTION_KEY.to_string(),
            FunctionDeclaration {
                name: Some("my-own-splunk".to_string()),
                ..FunctionDeclaration::new("splunk.handler")
            },
        );

        for naming in [ForwarderNaming::ServiceStage, ForwarderNaming::Reserved] {
            let synthesizer = ResourceSynthesizer::new(managed(&[]), naming);
            let resources = synthesizer.synthesize(&manifest, "prod").unwrap();
            assert!(!resources.contains_key("SplunkLogGroupSplunk"), "{naming:?}");
            assert_eq!(resources.len(), 3);
        }

        // an external forwarder leaves the user's `splunk` function in place
        let synthesizer = ResourceSynthesizer::new(existing(), ForwarderNaming::ServiceStage);
        let resources = synthesizer.synthesize(&manifest, "prod").unwrap();
        assert_eq!(
            resources["SplunkLogGroupSplunk"].properties["LogGroupName"],
            json!("/aws/lambda/my-own-splunk")
        );
    }

    #[test]
    fn test_forwarder_identity_compares_realized_names() {
        // A function under another key that deploys with the forwarder's reserved name.
        let mut manifest = manifest();
        manifest.functions.insert(
            "shipper".to_string(),
            FunctionDeclaration {
                name: Some(crate::provisioner::RESERVED_FORWARDER_NAME.to_string()),
                ..FunctionDeclaration::new("shipper.handler")
            },
        );

        let synthesizer = ResourceSynthesizer::new(managed(&[]), ForwarderNaming::Reserved);
        let resources = synthesizer.synthesize(&manifest, "prod").unwrap();
        assert!(!resources.contains_key("ShipperLogGroupSplunk"));

        let synthesizer = ResourceSynthesizer::new(managed(&[]), ForwarderNaming::ServiceStage);
        let resources = synthesizer.synthesize(&manifest, "prod").unwrap();
        assert!(resources.contains_key("ShipperLogGroupSplunk"));
    }

    #[test]
    fn test_update_is_idempotent() {
        let synthesizer = ResourceSynthesizer::new(managed(&[]), ForwarderNaming::ServiceStage)
            .with_extension(StaticExtension);
        let mut manifest = manifest();
        manifest.resources = Some(json!({"Resources": {"Bucket": {"Type": "AWS::S3::Bucket"}}}));

        assert_eq!(synthesizer.update(&mut manifest, "prod").unwrap(), 4);
        let once = manifest.clone();
        synthesizer.update(&mut manifest, "prod").unwrap();
        assert_eq!(manifest, once);

        let declared = manifest.declared_resources().unwrap();
        assert_eq!(declared.len(), 5);
        assert_eq!(declared["Bucket"], json!({"Type": "AWS::S3::Bucket"}));
        assert_eq!(declared["Topic"]["Properties"]["TopicName"], json!("prod"));
    }

    #[test]
    fn test_update_into_absent_resources() {
        let synthesizer = ResourceSynthesizer::new(managed(&[]), ForwarderNaming::ServiceStage);
        let mut manifest = manifest();
        let expected = synthesizer.synthesize(&manifest, "prod").unwrap();

        synthesizer.update(&mut manifest, "prod").unwrap();
        let declared = manifest.declared_resources().unwrap();
        assert_eq!(declared.len(), expected.len());
        for (name, declaration) in &expected {
            assert_eq!(declared[name], declaration.to_value().unwrap());
        }
    }

    #[test]
    fn test_no_functions_still_grants_permission() {
        let manifest = ServiceManifest::from_yaml_str("service: empty\n").unwrap();
        let synthesizer = ResourceSynthesizer::new(managed(&[]), ForwarderNaming::ServiceStage);
        let resources = synthesizer.synthesize(&manifest, "prod").unwrap();
        assert_eq!(resources.keys().collect::<Vec<_>>(), [PERMISSION_RESOURCE]);
        assert_eq!(
            resources[PERMISSION_RESOURCE].properties["Principal"],
            json!("logs.us-east-1.amazonaws.com")
        );
    }
}
