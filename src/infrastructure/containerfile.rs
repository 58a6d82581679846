//! Containerfile rendering
//!
//! Turns a [`Container`] plan into a multi-stage Containerfile for BuildKit.
//!
//! - Every plan referenced through a `FileRef`/`DirectoryRef` becomes its own
//!   named stage (`stage-N`), rendered before the stage that copies from it.
//!   Identical plans share one stage.
//! - Host paths become named build contexts (`ctx-N`), passed to
//!   `docker buildx build --build-context ctx-N=<path>`.
//! - Commands use the exec form, so arguments reach the process verbatim.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::domain::container::{Container, DirectoryRef, FileRef, Op};
use crate::error::EngineError;

const SYNTAX_HEADER: &str = "# syntax=docker/dockerfile:1";

/// Stage name used when exporting an artifact to the host
pub const EXPORT_STAGE: &str = "export";

/// A rendered build definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Containerfile {
    pub text: String,
    /// Named build contexts: name -> host path
    pub contexts: BTreeMap<String, PathBuf>,
    /// Stage to build
    pub target: String,
}

/// Render the plan; the last stage is the image itself
pub fn render(container: &Container) -> Containerfile {
    let mut renderer = Renderer::default();
    let target = renderer.stage(container);
    renderer.finish(target)
}

/// Render a scratch stage holding only the directory's contents
pub fn render_directory_export(dir: &DirectoryRef) -> Result<Containerfile, EngineError> {
    match dir {
        DirectoryRef::Host { path } => Err(EngineError::HostArtifact {
            path: path.display().to_string(),
        }),
        DirectoryRef::Container { container, path } => {
            Ok(render_export(container, path, "/"))
        }
    }
}

/// Render a scratch stage holding only the file, under its base name
pub fn render_file_export(file: &FileRef) -> Result<Containerfile, EngineError> {
    match file {
        FileRef::Host { path } => Err(EngineError::HostArtifact {
            path: path.display().to_string(),
        }),
        FileRef::Container { container, path } => {
            let name = Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "artifact".to_string());
            Ok(render_export(container, path, &format!("/{}", name)))
        }
    }
}

fn render_export(container: &Container, path: &str, dest: &str) -> Containerfile {
    let mut renderer = Renderer::default();
    let stage = renderer.stage(container);
    renderer.blocks.push(format!(
        "FROM scratch AS {}\nCOPY --from={} {}",
        EXPORT_STAGE,
        stage,
        json_array(&[path.to_string(), dest.to_string()])
    ));
    renderer.finish(EXPORT_STAGE.to_string())
}

#[derive(Default)]
struct Renderer {
    blocks: Vec<String>,
    stages: HashMap<String, String>,
    contexts: BTreeMap<String, PathBuf>,
    context_names: HashMap<PathBuf, String>,
}

impl Renderer {
    /// Render a plan as a stage (once) and return its name
    fn stage(&mut self, container: &Container) -> String {
        let digest = container.digest();
        if let Some(name) = self.stages.get(&digest) {
            return name.clone();
        }

        let mut lines = Vec::with_capacity(container.ops.len());
        for op in &container.ops {
            lines.push(self.instruction(op));
        }

        // Dependencies pushed their blocks while rendering the lines above.
        let name = format!("stage-{}", self.blocks.len());
        let mut block = format!("FROM {} AS {}", container.base, name);
        for line in lines {
            block.push('\n');
            block.push_str(&line);
        }
        self.blocks.push(block);
        self.stages.insert(digest, name.clone());
        name
    }

    fn context(&mut self, path: &Path) -> String {
        if let Some(name) = self.context_names.get(path) {
            return name.clone();
        }
        let name = format!("ctx-{}", self.contexts.len());
        self.contexts.insert(name.clone(), path.to_path_buf());
        self.context_names.insert(path.to_path_buf(), name.clone());
        name
    }

    fn instruction(&mut self, op: &Op) -> String {
        match op {
            Op::Env { name, value } => format!("ENV {}={}", name, quote(value)),
            Op::Exec { args } => format!("RUN {}", json_array(args)),
            Op::Workdir { path } => format!("WORKDIR {}", path),
            Op::User { name } => format!("USER {}", name),
            Op::Entrypoint { args } => format!("ENTRYPOINT {}", json_array(args)),
            Op::ExposePort { port } => format!("EXPOSE {}", port),
            Op::Label { name, value } => format!("LABEL {}={}", name, quote(value)),
            Op::CopyFile { dest, source } => match source {
                FileRef::Host { path } => {
                    let parent = path.parent().unwrap_or_else(|| Path::new("."));
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    let ctx = self.context(parent);
                    format!(
                        "COPY --from={} {}",
                        ctx,
                        json_array(&[file_name, dest.clone()])
                    )
                }
                FileRef::Container { container, path } => {
                    let stage = self.stage(container);
                    format!(
                        "COPY --from={} {}",
                        stage,
                        json_array(&[path.clone(), dest.clone()])
                    )
                }
            },
            Op::CopyDirectory { dest, source } => match source {
                DirectoryRef::Host { path } => {
                    let ctx = self.context(path);
                    format!(
                        "COPY --from={} {}",
                        ctx,
                        json_array(&[".".to_string(), dest.clone()])
                    )
                }
                DirectoryRef::Container { container, path } => {
                    let stage = self.stage(container);
                    format!(
                        "COPY --from={} {}",
                        stage,
                        json_array(&[path.clone(), dest.clone()])
                    )
                }
            },
        }
    }

    fn finish(self, target: String) -> Containerfile {
        let mut text = String::from(SYNTAX_HEADER);
        for block in &self.blocks {
            text.push_str("\n\n");
            text.push_str(block);
        }
        text.push('\n');

        Containerfile {
            text,
            contexts: self.contexts,
            target,
        }
    }
}

/// Exec-form JSON array
fn json_array(items: &[String]) -> String {
    // A list of strings always serializes.
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Double-quoted value with Containerfile escapes for `\`, `"` and `$`
///
/// Control characters are written as escape sequences so a value always stays
/// on its instruction's line.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' | '"' | '$' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push('\t'),
            c if c.is_control() => out.push_str(&format!("\\u{{{:04x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
