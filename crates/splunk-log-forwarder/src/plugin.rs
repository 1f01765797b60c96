// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use tracing::debug;

use crate::cicd::CicdExtension;
use crate::config::{resolve_stage, SplunkSettings};
use crate::error::Result;
use crate::lifecycle::{LifecycleEvent, LifecycleHooks};
use crate::manifest::ServiceManifest;
use crate::provisioner::{ArtifactMode, ForwarderNaming, ForwarderProvisioner};
use crate::synthesizer::ResourceSynthesizer;

const HOOKS: [LifecycleEvent; 3] = [
    LifecycleEvent::BeforePackageInitialize,
    LifecycleEvent::BeforePackageCompileFunctions,
    LifecycleEvent::AfterDeployDeploy,
];

/// Options supplied by the host when the plugin is loaded.
#[derive(Debug, Clone, Default)]
pub struct PluginOptions {
    /// Stage requested on the command line, if any.
    pub stage: Option<String>,
    /// Directory containing the service definition.
    pub service_path: PathBuf,
    pub naming: ForwarderNaming,
    pub artifact: ArtifactMode,
}

/// Forwards the logs of every function in a service to Splunk.
#[derive(Debug)]
pub struct SplunkPlugin {
    stage: String,
    synthesizer: ResourceSynthesizer,
    provisioner: ForwarderProvisioner,
}

impl SplunkPlugin {
    /// Resolves the stage and validates `custom.splunk` once, up front.
    pub fn new(manifest: &ServiceManifest, options: PluginOptions) -> Result<Self> {
        let stage = resolve_stage(options.stage.as_deref(), manifest.provider.stage.as_deref());
        let settings = SplunkSettings::from_manifest(manifest)?;

        let mut synthesizer = ResourceSynthesizer::new(settings.clone(), options.naming);
        if let Some(cicd) = CicdExtension::from_manifest(manifest) {
            debug!("custom.cicd found, adding pipeline resources");
            synthesizer = synthesizer.with_extension(cicd);
        }

        let provisioner = ForwarderProvisioner::new(
            settings,
            options.naming,
            options.artifact,
            options.service_path,
        );

        Ok(Self {
            stage,
            synthesizer,
            provisioner,
        })
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    fn start(&self, manifest: &mut ServiceManifest) -> Result<()> {
        self.synthesizer.update(manifest, &self.stage)?;
        self.provisioner.provision(manifest, &self.stage)?;
        Ok(())
    }
}

impl LifecycleHooks for SplunkPlugin {
    fn hooks(&self) -> &[LifecycleEvent] {
        &HOOKS
    }

    fn on_event(&self, event: LifecycleEvent, manifest: &mut ServiceManifest) -> Result<()> {
        match event {
            LifecycleEvent::BeforePackageInitialize => self.start(manifest),
            // functions added by other plugins since initialization get subscribed too
            LifecycleEvent::BeforePackageCompileFunctions => self
                .synthesizer
                .update(manifest, &self.stage)
                .map(|_| ()),
            LifecycleEvent::AfterDeployDeploy => self.provisioner.cleanup(&self.stage),
        }
    }
}
