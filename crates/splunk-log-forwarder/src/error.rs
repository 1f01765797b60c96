// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Errors that can occur while wiring function logs to the Splunk forwarder
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown lifecycle event: {0}")]
    UnknownLifecycleEvent(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Failed to read manifest {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest: {0}")]
    ManifestParse(#[source] serde_yaml::Error),

    #[error("Failed to emit manifest: {0}")]
    Emit(#[source] serde_yaml::Error),

    #[error("Failed to serialize resource: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to stage forwarder artifact {}: {source}", path.display())]
    ArtifactStaging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove forwarder artifact {}: {source}", path.display())]
    ArtifactCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = ForwarderError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let error = ForwarderError::InvalidConfig("custom.splunk.url is required".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid configuration: custom.splunk.url is required"
        );
    }

    #[test]
    fn test_filesystem_errors_carry_path() {
        let error = ForwarderError::ArtifactStaging {
            path: PathBuf::from("/srv/app/splunk.js"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            error.to_string(),
            "Failed to stage forwarder artifact /srv/app/splunk.js: denied"
        );

        let error = ForwarderError::ArtifactCleanup {
            path: PathBuf::from("/srv/app/splunk.js"),
            source: io::Error::new(io::ErrorKind::Other, "busy"),
        };
        assert!(error.to_string().contains("/srv/app/splunk.js"));
    }

    #[test]
    fn test_error_source_is_preserved() {
        use std::error::Error;

        let error = ForwarderError::ManifestRead {
            path: PathBuf::from("serverless.yml"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        let source = error.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("missing"));
    }
}
