//! Artifacts passed between pipeline commands
//!
//! Every stage command reads one artifact and writes one artifact, so
//! `lehrer apt-base | lehrer locales | lehrer get-code ...` composes a plan
//! without any process holding state.

use serde::{Deserialize, Serialize};

use super::container::{Container, DirectoryRef, FileRef};
use crate::error::PlanError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "artifact", content = "value", rename_all = "snake_case")]
pub enum Artifact {
    Container(Container),
    File(FileRef),
    Directory(DirectoryRef),
}

impl Artifact {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Container(_) => "container",
            Self::File(_) => "file",
            Self::Directory(_) => "directory",
        }
    }

    pub fn into_container(self) -> Result<Container, PlanError> {
        match self {
            Self::Container(c) => Ok(c),
            other => Err(PlanError::WrongArtifact {
                expected: "container",
                actual: other.kind(),
            }),
        }
    }

    pub fn into_file(self) -> Result<FileRef, PlanError> {
        match self {
            Self::File(f) => Ok(f),
            other => Err(PlanError::WrongArtifact {
                expected: "file",
                actual: other.kind(),
            }),
        }
    }

    pub fn into_directory(self) -> Result<DirectoryRef, PlanError> {
        match self {
            Self::Directory(d) => Ok(d),
            other => Err(PlanError::WrongArtifact {
                expected: "directory",
                actual: other.kind(),
            }),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, PlanError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, PlanError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_artifact_kind() {
        let artifact = Artifact::File(FileRef::host("/tmp/dockerize"));
        let err = artifact.into_container().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected a container artifact, got a file artifact"
        );
    }

    #[test]
    fn test_nested_plan_survives_json() {
        let tutor = Container::from_image("debian:bookworm-slim")
            .with_exec(["apt-get", "update"])
            .directory("/openedx/tutor/tutor/templates/build/openedx/bin");
        let artifact = Artifact::Directory(tutor.clone());

        let json = artifact.to_json().unwrap();
        assert!(json.contains("\"artifact\": \"directory\""));
        let back = Artifact::from_json(&json).unwrap();
        assert_eq!(back.into_directory().unwrap(), tutor);
    }

    #[test]
    fn test_malformed_input() {
        let err = Artifact::from_json("{\"artifact\": \"image\"}").unwrap_err();
        assert!(matches!(err, PlanError::Malformed(_)));
    }
}
