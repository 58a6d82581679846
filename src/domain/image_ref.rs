//! Image references for publication

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::error::PlanError;

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("tag pattern is valid")
    })
}

/// `{registry}/{repository}:{tag}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub registry: String,
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(
        registry: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Result<Self, PlanError> {
        let image = Self {
            registry: registry.into().trim_end_matches('/').to_string(),
            repository: repository.into().trim_matches('/').to_string(),
            tag: tag.into(),
        };
        image.validate()?;
        Ok(image)
    }

    fn validate(&self) -> Result<(), PlanError> {
        let invalid = |reason: &str| PlanError::InvalidImageRef {
            reference: self.to_string(),
            reason: reason.to_string(),
        };

        if self.registry.is_empty() {
            return Err(invalid("registry is empty"));
        }
        if self.repository.is_empty() {
            return Err(invalid("repository is empty"));
        }
        if self.repository.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(invalid("repository must be lowercase"));
        }
        if !tag_pattern().is_match(&self.tag) {
            return Err(invalid("tag must match [A-Za-z0-9_][A-Za-z0-9_.-]{0,127}"));
        }
        Ok(())
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let image = ImageRef::new("ghcr.io", "mitodl/openedx-platform", "latest").unwrap();
        assert_eq!(image.to_string(), "ghcr.io/mitodl/openedx-platform:latest");
    }

    #[test]
    fn test_trims_slashes() {
        let image = ImageRef::new("docker.io/", "/mitodl/codejail", "sumac").unwrap();
        assert_eq!(image.to_string(), "docker.io/mitodl/codejail:sumac");
    }

    #[test]
    fn test_rejects_bad_tag() {
        assert!(ImageRef::new("ghcr.io", "mitodl/notes", "-bad").is_err());
        assert!(ImageRef::new("ghcr.io", "mitodl/notes", "with space").is_err());
        assert!(ImageRef::new("ghcr.io", "mitodl/notes", "").is_err());
    }

    #[test]
    fn test_rejects_uppercase_repository() {
        let err = ImageRef::new("ghcr.io", "MITODL/notes", "latest").unwrap_err();
        assert!(err.to_string().contains("lowercase"));
    }
}
