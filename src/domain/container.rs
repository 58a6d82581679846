//! Declarative container build plans
//!
//! A [`Container`] is plain data: a base image plus the ordered operations
//! applied on top of it. Plans serialize to JSON so stages can be chained
//! across processes, and the engine adapter turns them into real images.
//! Builders consume `self` and return the extended plan, so a pipeline
//! reads top to bottom the way the resulting Containerfile does.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// A container build plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Base image reference (`python:3.11-bookworm`, `repo@sha256:...`)
    pub base: String,
    /// Operations applied in order on top of the base image
    #[serde(default)]
    pub ops: Vec<Op>,
}

/// One build operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Env { name: String, value: String },
    Exec { args: Vec<String> },
    Workdir { path: String },
    User { name: String },
    CopyFile { dest: String, source: FileRef },
    CopyDirectory { dest: String, source: DirectoryRef },
    Entrypoint { args: Vec<String> },
    ExposePort { port: u16 },
    Label { name: String, value: String },
}

/// A single file, either on the host or inside another plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileRef {
    Host {
        path: PathBuf,
    },
    Container {
        container: Box<Container>,
        path: String,
    },
}

/// A directory tree, either on the host or inside another plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DirectoryRef {
    Host {
        path: PathBuf,
    },
    Container {
        container: Box<Container>,
        path: String,
    },
}

impl FileRef {
    #[cfg(test)]
    pub fn host(path: impl Into<PathBuf>) -> Self {
        Self::Host { path: path.into() }
    }
}

impl DirectoryRef {
    pub fn host(path: impl Into<PathBuf>) -> Self {
        Self::Host { path: path.into() }
    }

    /// Reference a file below this directory
    pub fn file(&self, name: &str) -> FileRef {
        match self {
            Self::Host { path } => FileRef::Host {
                path: path.join(name),
            },
            Self::Container { container, path } => FileRef::Container {
                container: container.clone(),
                path: format!("{}/{}", path.trim_end_matches('/'), name),
            },
        }
    }
}

impl Container {
    /// Start a plan from a base image
    pub fn from_image(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ops: Vec::new(),
        }
    }

    fn push(mut self, op: Op) -> Self {
        self.ops.push(op);
        self
    }

    pub fn with_env_variable(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(Op::Env {
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn with_exec<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Op::Exec {
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    /// Run a command through `sh -c` (globs, redirects, `|| true`)
    pub fn with_shell(self, script: impl Into<String>) -> Self {
        self.with_exec(["sh".to_string(), "-c".to_string(), script.into()])
    }

    pub fn with_workdir(self, path: impl Into<String>) -> Self {
        self.push(Op::Workdir { path: path.into() })
    }

    pub fn with_user(self, name: impl Into<String>) -> Self {
        self.push(Op::User { name: name.into() })
    }

    pub fn with_file(self, dest: impl Into<String>, source: FileRef) -> Self {
        self.push(Op::CopyFile {
            dest: dest.into(),
            source,
        })
    }

    pub fn with_directory(self, dest: impl Into<String>, source: DirectoryRef) -> Self {
        self.push(Op::CopyDirectory {
            dest: dest.into(),
            source,
        })
    }

    pub fn with_entrypoint<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Op::Entrypoint {
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    pub fn with_exposed_port(self, port: u16) -> Self {
        self.push(Op::ExposePort { port })
    }

    pub fn with_label(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(Op::Label {
            name: name.into(),
            value: value.into(),
        })
    }

    /// Reference a file produced inside this plan
    pub fn file(&self, path: impl Into<String>) -> FileRef {
        FileRef::Container {
            container: Box::new(self.clone()),
            path: path.into(),
        }
    }

    /// Reference a directory produced inside this plan
    pub fn directory(&self, path: impl Into<String>) -> DirectoryRef {
        DirectoryRef::Container {
            container: Box::new(self.clone()),
            path: path.into(),
        }
    }

    /// Last value assigned to an environment variable
    pub fn env(&self, name: &str) -> Option<&str> {
        self.ops.iter().rev().find_map(|op| match op {
            Op::Env { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Entrypoint in effect at the end of the plan
    pub fn entrypoint(&self) -> Option<&[String]> {
        self.ops.iter().rev().find_map(|op| match op {
            Op::Entrypoint { args } => Some(args.as_slice()),
            _ => None,
        })
    }

    /// User in effect at the end of the plan
    pub fn user(&self) -> Option<&str> {
        self.ops.iter().rev().find_map(|op| match op {
            Op::User { name } => Some(name.as_str()),
            _ => None,
        })
    }

    /// All commands executed by this plan, in order
    pub fn execs(&self) -> impl Iterator<Item = &[String]> {
        self.ops.iter().filter_map(|op| match op {
            Op::Exec { args } => Some(args.as_slice()),
            _ => None,
        })
    }

    /// Stable SHA-256 over the plan's JSON form
    pub fn digest(&self) -> String {
        // Plain data with string keys always serializes.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        format!("{:x}", Sha256::digest(&bytes))
    }
}
