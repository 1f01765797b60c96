// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Staging of the forwarder artifact into the service directory.
//!
//! The staged file only has to exist while the host packages the service;
//! [`remove_staged_artifact`] deletes it again once the deployment finished.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ForwarderError, Result};

/// File name of the staged forwarder inside the service directory.
pub const STAGED_ARTIFACT_FILE: &str = "splunk.js";

pub fn staged_artifact_path(service_path: &Path) -> PathBuf {
    service_path.join(STAGED_ARTIFACT_FILE)
}

/// Copies the forwarder artifact at `source` into `service_path`.
pub fn stage_artifact(source: &Path, service_path: &Path) -> Result<PathBuf> {
    let contents = fs::read(source).map_err(|source_err| ForwarderError::ArtifactStaging {
        path: source.to_path_buf(),
        source: source_err,
    })?;

    let destination = staged_artifact_path(service_path);
    fs::write(&destination, contents).map_err(|source| ForwarderError::ArtifactStaging {
        path: destination.clone(),
        source,
    })?;

    debug!("Staged forwarder artifact at {}", destination.display());
    Ok(destination)
}

/// Removes the staged artifact. An artifact that is already gone is not an
/// error; returns whether a file was removed.
pub fn remove_staged_artifact(service_path: &Path) -> Result<bool> {
    let path = staged_artifact_path(service_path);
    if !path.exists() {
        debug!("No staged forwarder artifact at {}", path.display());
        return Ok(false);
    }

    match fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(ForwarderError::ArtifactCleanup { path, source }),
    }
}
