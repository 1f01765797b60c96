// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info};

use crate::artifact;
use crate::config::{ForwarderTarget, SplunkSettings};
use crate::error::Result;
use crate::manifest::{FunctionDeclaration, ServiceManifest};
use crate::naming;

/// Key of the forwarder in `functions`.
pub const FORWARDER_FUNCTION_KEY: &str = "splunk";
/// Deployed name of the forwarder under [`ForwarderNaming::Reserved`].
pub const RESERVED_FORWARDER_NAME: &str = "splunk-cloudwatch-logs-processor";

pub const HEC_URL_ENV: &str = "SPLUNK_HEC_URL";
pub const HEC_TOKEN_ENV: &str = "SPLUNK_HEC_TOKEN";

/// Handler of the forwarder when it is referenced inside the installed plugin package.
pub const BUNDLED_HANDLER: &str =
    "node_modules/serverless-splunk/splunk/splunk-cloudwatch-logs-processor/index.handler";
/// Handler of the forwarder once staged into the service directory.
pub const STAGED_HANDLER: &str = "splunk.handler";

/// How the forwarder function is named once deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForwarderNaming {
    /// Left to the host: `<service>-<stage>-splunk`.
    #[default]
    ServiceStage,
    /// Always [`RESERVED_FORWARDER_NAME`].
    Reserved,
}

impl ForwarderNaming {
    /// Explicit `name` to put on the declaration, if any.
    pub fn declared_name(&self) -> Option<&'static str> {
        match self {
            ForwarderNaming::ServiceStage => None,
            ForwarderNaming::Reserved => Some(RESERVED_FORWARDER_NAME),
        }
    }

    pub fn realized_name(&self, manifest: &ServiceManifest, stage: &str) -> String {
        match self.declared_name() {
            Some(name) => name.to_string(),
            None => naming::default_function_name(
                manifest.service_name(),
                stage,
                FORWARDER_FUNCTION_KEY,
            ),
        }
    }
}

/// Where the forwarder code comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactMode {
    /// Reference the artifact where it is installed.
    InPlace { handler: String },
    /// Copy the artifact into the service directory before packaging and
    /// remove it after deployment.
    Staged { source: PathBuf },
}

impl Default for ArtifactMode {
    fn default() -> Self {
        ArtifactMode::InPlace {
            handler: BUNDLED_HANDLER.to_string(),
        }
    }
}

/// Declares the forwarder function when the service has to deploy its own.
#[derive(Debug, Clone)]
pub struct ForwarderProvisioner {
    settings: SplunkSettings,
    naming: ForwarderNaming,
    artifact: ArtifactMode,
    service_path: PathBuf,
}

impl ForwarderProvisioner {
    pub fn new(
        settings: SplunkSettings,
        naming: ForwarderNaming,
        artifact: ArtifactMode,
        service_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings,
            naming,
            artifact,
            service_path: service_path.into(),
        }
    }

    fn handler(&self) -> &str {
        match &self.artifact {
            ArtifactMode::InPlace { handler } => handler.as_str(),
            ArtifactMode::Staged { .. } => STAGED_HANDLER,
        }
    }

    /// Adds the forwarder to `functions` and its collector settings to the
    /// provider environment. Returns whether a forwarder was declared.
    pub fn provision(&self, manifest: &mut ServiceManifest, stage: &str) -> Result<bool> {
        if self.settings.is_excluded(stage) {
            debug!("Not adding Splunk Function for excluded stage {stage}");
            return Ok(false);
        }

        let (url, token) = match &self.settings.target {
            ForwarderTarget::Existing { arn } => {
                debug!("Using existing Splunk Function {arn}");
                return Ok(false);
            }
            ForwarderTarget::Managed { url, token } => (url, token),
        };

        info!("Adding Splunk Function...");

        // Stage first so a failed copy leaves the manifest untouched.
        if let ArtifactMode::Staged { source } = &self.artifact {
            artifact::stage_artifact(source, &self.service_path)?;
        }

        let environment = &mut manifest.provider.environment;
        environment.insert(HEC_URL_ENV.to_string(), Value::String(url.clone()));
        environment.insert(HEC_TOKEN_ENV.to_string(), Value::String(token.clone()));

        let declaration = FunctionDeclaration {
            name: self.naming.declared_name().map(str::to_string),
            events: Some(Vec::new()),
            ..FunctionDeclaration::new(self.handler())
        };
        manifest
            .functions
            .insert(FORWARDER_FUNCTION_KEY.to_string(), declaration);

        info!("Splunk Function Added...");
        Ok(true)
    }

    /// Removes the artifact [`provision`](Self::provision) staged for `stage`.
    /// Nothing is staged for excluded stages or an existing forwarder, so a
    /// file at the staging path is then left alone.
    pub fn cleanup(&self, stage: &str) -> Result<()> {
        let ArtifactMode::Staged { .. } = self.artifact else {
            return Ok(());
        };
        if self.settings.is_excluded(stage) || self.settings.existing_arn().is_some() {
            debug!("No forwarder artifact was staged for stage {stage}");
            return Ok(());
        }

        info!("Removing temporary Splunk function file");
        artifact::remove_staged_artifact(&self.service_path)?;
        Ok(())
    }
}
