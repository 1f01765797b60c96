// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Forwards the CloudWatch logs of every function in a serverless service to
//! Splunk.
//!
//! The crate works on a service definition in memory: it declares a forwarder
//! function (unless an existing one is referenced by ARN) and synthesizes the
//! CloudFormation permission and subscription filters wiring each function's
//! log group to it. Nothing here talks to AWS or Splunk.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod artifact;
pub mod cicd;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logger;
pub mod manifest;
pub mod naming;
pub mod plugin;
pub mod provisioner;
pub mod resources;
pub mod synthesizer;

pub use config::{resolve_stage, ForwarderTarget, SplunkConfig, SplunkSettings, DEFAULT_STAGE};
pub use error::{ForwarderError, Result};
pub use lifecycle::{Lifecycle, LifecycleEvent, LifecycleHooks};
pub use manifest::ServiceManifest;
pub use plugin::{PluginOptions, SplunkPlugin};
pub use provisioner::{ArtifactMode, ForwarderNaming, ForwarderProvisioner};
pub use resources::{Destination, ResourceDeclaration, ResourceSet};
pub use synthesizer::{ResourceExtension, ResourceSynthesizer};
