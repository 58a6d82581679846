//! `render`: print the Containerfile for an artifact

use anyhow::Result;

use super::io;
use crate::domain::Artifact;
use crate::infrastructure::containerfile::{self, Containerfile};

/// Containerfile for any artifact; files and directories get an export stage
pub fn render_artifact(artifact: &Artifact) -> Result<Containerfile> {
    Ok(match artifact {
        Artifact::Container(container) => containerfile::render(container),
        Artifact::File(file) => containerfile::render_file_export(file)?,
        Artifact::Directory(dir) => containerfile::render_directory_export(dir)?,
    })
}

/// Build contexts as `# --build-context` comments ahead of the file text
pub fn annotated(file: &Containerfile) -> String {
    let mut text = String::new();
    for (name, path) in &file.contexts {
        text.push_str(&format!("# --build-context {}={}\n", name, path.display()));
    }
    text.push_str(&format!("# --target {}\n", file.target));
    text.push_str(&file.text);
    text
}

pub async fn execute(input: String) -> Result<()> {
    let artifact = io::read_artifact(&input).await?;
    let file = render_artifact(&artifact)?;
    io::write_stdout(&annotated(&file)).await
}
