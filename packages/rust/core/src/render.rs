//! External document renderer.
//!
//! Source markup is turned into HTML by a separate program. The pipeline only
//! depends on the [`Renderer`] trait, so builds can be driven by a fake in
//! tests or by another converter in production.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, instrument};

use docsetkit_shared::{DocsetError, RendererConfig, Result};

/// Converts every source document in `source_dir` into HTML in `output_dir`.
pub trait Renderer: Send + Sync {
    fn render(&self, source_dir: &Path, output_dir: &Path) -> Result<()>;
}

/// Runs `<program> -D <output_dir> -B <source_dir> <sources...>` and waits for it.
///
/// The argument shape matches asciidoctor's CLI.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    extension: String,
}

impl CommandRenderer {
    /// `extension` is matched without the leading dot.
    pub fn new(program: impl Into<String>, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            program: program.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Source files in `source_dir` with the configured extension, sorted by name.
    pub fn sources(&self, source_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut sources = Vec::new();
        for entry in std::fs::read_dir(source_dir).map_err(|e| DocsetError::io(source_dir, e))? {
            let entry = entry.map_err(|e| DocsetError::io(source_dir, e))?;
            let path = entry.path();
            let matches = path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy() == self.extension);
            if matches && path.is_file() {
                sources.push(path);
            }
        }
        sources.sort();
        Ok(sources)
    }
}

impl Default for CommandRenderer {
    fn default() -> Self {
        Self::from(&RendererConfig::default())
    }
}

impl From<&RendererConfig> for CommandRenderer {
    fn from(config: &RendererConfig) -> Self {
        Self::new(&config.program, &config.extension)
    }
}

impl Renderer for CommandRenderer {
    #[instrument(skip_all, fields(program = %self.program))]
    fn render(&self, source_dir: &Path, output_dir: &Path) -> Result<()> {
        let source_dir = source_dir
            .canonicalize()
            .map_err(|e| DocsetError::io(source_dir, e))?;
        let output_dir = output_dir
            .canonicalize()
            .map_err(|e| DocsetError::io(output_dir, e))?;

        let sources = self.sources(&source_dir)?;
        if sources.is_empty() {
            return Err(DocsetError::Render(format!(
                "no .{} sources found in {}",
                self.extension,
                source_dir.display()
            )));
        }
        debug!(sources = sources.len(), "running renderer");

        let output = Command::new(&self.program)
            .arg("-D")
            .arg(&output_dir)
            .arg("-B")
            .arg(&source_dir)
            .args(&sources)
            .current_dir(&source_dir)
            .output()
            .map_err(|e| DocsetError::Render(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocsetError::Render(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        info!(sources = sources.len(), "documents rendered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dk-render-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(dir.join("src")).unwrap();
        std::fs::create_dir_all(dir.join("out")).unwrap();
        dir
    }

    #[test]
    fn collects_sorted_sources_with_extension() {
        let tmp = temp_dir();
        for name in ["m-code.adoc", "g-code.adoc", "notes.txt", "overview.adoc"] {
            std::fs::write(tmp.join("src").join(name), "").unwrap();
        }

        let renderer = CommandRenderer::new("asciidoctor", ".adoc");
        let names: Vec<String> = renderer
            .sources(&tmp.join("src"))
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["g-code.adoc", "m-code.adoc", "overview.adoc"]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn no_sources_is_a_render_error() {
        let tmp = temp_dir();
        let err = CommandRenderer::new("true", "adoc")
            .render(&tmp.join("src"), &tmp.join("out"))
            .unwrap_err();
        assert!(matches!(err, DocsetError::Render(_)));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_program_is_a_render_error() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("src/g-code.adoc"), "= G-code").unwrap();

        let err = CommandRenderer::new("docsetkit-no-such-renderer", "adoc")
            .render(&tmp.join("src"), &tmp.join("out"))
            .unwrap_err();
        assert!(matches!(err, DocsetError::Render(_)));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_decides_success() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("src/g-code.adoc"), "= G-code").unwrap();

        CommandRenderer::new("true", "adoc")
            .render(&tmp.join("src"), &tmp.join("out"))
            .expect("true exits 0");

        let err = CommandRenderer::new("false", "adoc")
            .render(&tmp.join("src"), &tmp.join("out"))
            .unwrap_err();
        assert!(matches!(err, DocsetError::Render(_)));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn defaults_to_asciidoctor() {
        let renderer = CommandRenderer::default();
        assert_eq!(renderer.program(), "asciidoctor");
        assert_eq!(renderer.extension, "adoc");
    }
}
