// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle events of the host framework and a minimal dispatcher for them.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{ForwarderError, Result};
use crate::manifest::ServiceManifest;

/// Host lifecycle events the plugin can hook into. The string forms are
/// defined by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    BeforePackageInitialize,
    BeforePackageCompileFunctions,
    AfterDeployDeploy,
}

impl LifecycleEvent {
    /// Events fired, in order, when the host packages a service.
    pub const PACKAGE: [LifecycleEvent; 2] = [
        LifecycleEvent::BeforePackageInitialize,
        LifecycleEvent::BeforePackageCompileFunctions,
    ];

    /// Events fired, in order, when the host deploys a service.
    pub const DEPLOY: [LifecycleEvent; 3] = [
        LifecycleEvent::BeforePackageInitialize,
        LifecycleEvent::BeforePackageCompileFunctions,
        LifecycleEvent::AfterDeployDeploy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::BeforePackageInitialize => "before:package:initialize",
            LifecycleEvent::BeforePackageCompileFunctions => "before:package:compileFunctions",
            LifecycleEvent::AfterDeployDeploy => "after:deploy:deploy",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleEvent {
    type Err = ForwarderError;

    fn from_str(s: &str) -> Result<Self> {
        LifecycleEvent::DEPLOY
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| ForwarderError::UnknownLifecycleEvent(s.to_string()))
    }
}

/// A plugin reacting to host lifecycle events.
pub trait LifecycleHooks {
    /// Events this plugin handles.
    fn hooks(&self) -> &[LifecycleEvent];

    fn on_event(&self, event: LifecycleEvent, manifest: &mut ServiceManifest) -> Result<()>;
}

/// Dispatches lifecycle events to registered plugins in registration order.
///
/// The first failing hook aborts the run; nothing already applied is rolled back.
#[derive(Default)]
pub struct Lifecycle {
    plugins: Vec<Box<dyn LifecycleHooks>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: impl LifecycleHooks + 'static) {
        self.plugins.push(Box::new(plugin));
    }

    pub fn fire(&self, event: LifecycleEvent, manifest: &mut ServiceManifest) -> Result<()> {
        for plugin in &self.plugins {
            if plugin.hooks().contains(&event) {
                debug!("Running hook {event}");
                plugin.on_event(event, manifest)?;
            }
        }
        Ok(())
    }

    pub fn run(&self, events: &[LifecycleEvent], manifest: &mut ServiceManifest) -> Result<()> {
        for event in events {
            self.fire(*event, manifest)?;
        }
        Ok(())
    }
}
