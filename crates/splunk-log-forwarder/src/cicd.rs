// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Optional CI/CD pipeline for the service.
//!
//! When `custom.cicd` is present, a CodePipeline is declared that pulls the
//! configured GitHub branch and hands it to a CodeBuild project, both running
//! under a dedicated IAM role.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::error::Result;
use crate::manifest::ServiceManifest;
use crate::resources::{
    get_att, ref_to, ResourceDeclaration, ResourceSet, CODEBUILD_PROJECT, CODEPIPELINE_PIPELINE,
    IAM_ROLE,
};
use crate::synthesizer::ResourceExtension;

pub const CICD_ROLE: &str = "CicdRole";
pub const CICD_BUILD_PROJECT: &str = "CicdBuildProject";
pub const CICD_PIPELINE: &str = "CicdPipeline";

/// Bucket the host creates for deployment artifacts; the pipeline stores its
/// artifacts there too.
pub const DEPLOYMENT_BUCKET: &str = "ServerlessDeploymentBucket";

pub const DEFAULT_BRANCH: &str = "master";

const SOURCE_ARTIFACT: &str = "SourceOutput";
const BUILD_ARTIFACT: &str = "BuildOutput";

/// The `custom.cicd` section as written by the user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CicdConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, alias = "githubToken", skip_serializing_if = "Option::is_none")]
    pub githubtoken: Option<String>,
}

/// Fully resolved pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CicdSettings {
    pub image: String,
    pub owner: String,
    pub repository: String,
    pub branch: String,
    pub github_token: String,
}

/// CodeBuild curated image matching a Lambda runtime identifier.
pub fn default_build_image(runtime: Option<&str>) -> Option<&'static str> {
    let runtime = runtime?;
    let image = if runtime.starts_with("nodejs") {
        "aws/codebuild/nodejs:10.14.1"
    } else if runtime.starts_with("python") {
        "aws/codebuild/python:3.7.1"
    } else if runtime.starts_with("java") {
        "aws/codebuild/java:openjdk-8"
    } else if runtime.starts_with("go") {
        "aws/codebuild/golang:1.11"
    } else if runtime.starts_with("dotnet") {
        "aws/codebuild/dot-net:core-2.1"
    } else if runtime.starts_with("ruby") {
        "aws/codebuild/ruby:2.5.3"
    } else {
        return None;
    };
    Some(image)
}

fn explicit(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl CicdSettings {
    /// Explicit settings win, then runtime based defaults, then empty strings
    /// (`master` for the branch).
    pub fn resolve(config: &CicdConfig, runtime: Option<&str>) -> Self {
        Self {
            image: explicit(&config.image)
                .or_else(|| default_build_image(runtime))
                .unwrap_or_default()
                .to_string(),
            owner: explicit(&config.owner).unwrap_or_default().to_string(),
            repository: explicit(&config.repository).unwrap_or_default().to_string(),
            branch: explicit(&config.branch)
                .unwrap_or(DEFAULT_BRANCH)
                .to_string(),
            github_token: explicit(&config.githubtoken).unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CicdExtension {
    config: CicdConfig,
}

impl CicdExtension {
    pub fn new(config: CicdConfig) -> Self {
        Self { config }
    }

    /// Enabled only when the manifest has a `custom.cicd` section.
    pub fn from_manifest(manifest: &ServiceManifest) -> Option<Self> {
        manifest.custom.cicd.clone().map(Self::new)
    }
}

impl ResourceExtension for CicdExtension {
    fn name(&self) -> &str {
        "cicd"
    }

    fn resources(&self, manifest: &ServiceManifest, stage: &str) -> Result<ResourceSet> {
        let settings = CicdSettings::resolve(&self.config, manifest.provider.runtime.as_deref());
        if settings.owner.is_empty() || settings.repository.is_empty() {
            warn!("custom.cicd.owner and custom.cicd.repository should be set for the pipeline source stage");
        }
        if settings.image.is_empty() {
            warn!("No CodeBuild image configured and none known for the provider runtime");
        }

        let service_stage = format!("{}-{stage}", manifest.service_name());

        let mut resources = ResourceSet::new();
        resources.insert(CICD_ROLE.to_string(), role(&service_stage));
        resources.insert(
            CICD_BUILD_PROJECT.to_string(),
            build_project(&service_stage, stage, &settings),
        );
        resources.insert(CICD_PIPELINE.to_string(), pipeline(&service_stage, &settings));
        Ok(resources)
    }
}

fn role(service_stage: &str) -> ResourceDeclaration {
    ResourceDeclaration::new(IAM_ROLE)
        .property("RoleName", format!("{service_stage}-cicd"))
        .property(
            "AssumeRolePolicyDocument",
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": {
                        "Service": ["codebuild.amazonaws.com", "codepipeline.amazonaws.com"]
                    },
                    "Action": ["sts:AssumeRole"],
                }],
            }),
        )
        .property(
            "ManagedPolicyArns",
            json!(["arn:aws:iam::aws:policy/AdministratorAccess"]),
        )
}

fn build_project(service_stage: &str, stage: &str, settings: &CicdSettings) -> ResourceDeclaration {
    ResourceDeclaration::new(CODEBUILD_PROJECT)
        .property("Name", service_stage)
        .property("ServiceRole", get_att(CICD_ROLE, "Arn"))
        .property("Artifacts", json!({ "Type": "CODEPIPELINE" }))
        .property("Source", json!({ "Type": "CODEPIPELINE" }))
        .property(
            "Environment",
            json!({
                "Type": "LINUX_CONTAINER",
                "ComputeType": "BUILD_GENERAL1_SMALL",
                "Image": settings.image,
                "EnvironmentVariables": [{ "Name": "STAGE", "Value": stage }],
            }),
        )
        .depends_on(CICD_ROLE)
}

fn pipeline(service_stage: &str, settings: &CicdSettings) -> ResourceDeclaration {
    let source_stage = json!({
        "Name": "Source",
        "Actions": [{
            "Name": "Source",
            "ActionTypeId": {
                "Category": "Source",
                "Owner": "ThirdParty",
                "Provider": "GitHub",
                "Version": "1",
            },
            "Configuration": {
                "Owner": settings.owner,
                "Repo": settings.repository,
                "Branch": settings.branch,
                "OAuthToken": settings.github_token,
            },
            "OutputArtifacts": [{ "Name": SOURCE_ARTIFACT }],
            "RunOrder": 1,
        }],
    });
    let build_stage = json!({
        "Name": "Build",
        "Actions": [{
            "Name": "Build",
            "ActionTypeId": {
                "Category": "Build",
                "Owner": "AWS",
                "Provider": "CodeBuild",
                "Version": "1",
            },
            "Configuration": { "ProjectName": ref_to(CICD_BUILD_PROJECT) },
            "InputArtifacts": [{ "Name": SOURCE_ARTIFACT }],
            "OutputArtifacts": [{ "Name": BUILD_ARTIFACT }],
            "RunOrder": 1,
        }],
    });

    ResourceDeclaration::new(CODEPIPELINE_PIPELINE)
        .property("Name", service_stage)
        .property("RoleArn", get_att(CICD_ROLE, "Arn"))
        .property(
            "ArtifactStore",
            json!({ "Type": "S3", "Location": ref_to(DEPLOYMENT_BUCKET) }),
        )
        .property("Stages", json!([source_stage, build_stage]))
        .depends_on(CICD_ROLE)
        .depends_on(CICD_BUILD_PROJECT)
}
