use palmer_core::{PipelineError, PipelineResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::write_atomic;

/// Version of the on-disk artifact layout.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Serializable wrapper tagging a persisted object with its kind.
#[derive(Serialize, Deserialize)]
pub struct ArtifactEnvelope<T> {
    pub kind: String,
    pub format_version: u32,
    pub payload: T,
}

/// Persist `payload` as a JSON artifact of the given kind.
pub fn save_artifact<T: Serialize>(path: &Path, kind: &str, payload: &T) -> PipelineResult<()> {
    let envelope = ArtifactEnvelope {
        kind: kind.to_string(),
        format_version: ARTIFACT_FORMAT_VERSION,
        payload,
    };
    let json = serde_json::to_vec_pretty(&envelope).map_err(|e| PipelineError::ArtifactCorrupt {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    write_atomic(path, &json)?;
    info!(path = %path.display(), kind, "saved artifact");
    Ok(())
}

/// Load an artifact written by [`save_artifact`], checking its kind and version.
pub fn load_artifact<T: DeserializeOwned>(path: &Path, kind: &str) -> PipelineResult<T> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(PipelineError::ArtifactMissing { path: display });
    }
    let corrupt = |reason: String| PipelineError::ArtifactCorrupt {
        path: display.clone(),
        reason,
    };

    let bytes = fs::read(path)?;
    let envelope: ArtifactEnvelope<serde_json::Value> =
        serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;

    if envelope.kind != kind {
        return Err(PipelineError::SchemaMismatch {
            expected: kind.to_string(),
            got: envelope.kind,
        });
    }
    if envelope.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(PipelineError::SchemaMismatch {
            expected: format!("{} v{}", kind, ARTIFACT_FORMAT_VERSION),
            got: format!("{} v{}", kind, envelope.format_version),
        });
    }
    serde_json::from_value(envelope.payload).map_err(|e| corrupt(e.to_string()))
}
