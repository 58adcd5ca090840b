use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use async_trait::async_trait;
use pictobot_contracts::generation::{Artifact, ArtifactSource};
use pictobot_contracts::GenerationError;
use pictobot_engine::{MessageRef, RegenerateControl, ResultContent, SurfaceAdapter};

/// Terminal stand-in for a chat channel.
///
/// A terminal cannot edit lines in place, so every edit prints a new line
/// tagged with the message id. Byte artifacts are written under `out_dir`.
pub struct ConsoleSurface {
    out_dir: PathBuf,
    writer: Mutex<Box<dyn Write + Send>>,
    next_message: AtomicU64,
    last_control: Mutex<Option<RegenerateControl>>,
}

impl ConsoleSurface {
    pub fn stdout(out_dir: impl Into<PathBuf>) -> Self {
        Self::new(out_dir, Box::new(std::io::stdout()))
    }

    pub fn new(out_dir: impl Into<PathBuf>, writer: Box<dyn Write + Send>) -> Self {
        Self {
            out_dir: out_dir.into(),
            writer: Mutex::new(writer),
            next_message: AtomicU64::new(0),
            last_control: Mutex::new(None),
        }
    }

    /// Control attached to the most recent published result.
    pub fn last_control(&self) -> Option<RegenerateControl> {
        self.last_control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn print(&self, line: &str) -> Result<(), GenerationError> {
        let mut writer = self.writer();
        writeln!(writer, "{line}")
            .and_then(|_| writer.flush())
            .map_err(|err| GenerationError::presentation(format!("terminal write failed: {err}")))
    }

    fn writer(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn describe(
        &self,
        message: &MessageRef,
        index: usize,
        content: &ResultContent,
        artifact: &Artifact,
    ) -> anyhow::Result<String> {
        let location = match &artifact.source {
            ArtifactSource::Url(url) => url.clone(),
            ArtifactSource::Bytes { bytes, .. } => {
                let file_name = format!(
                    "{}-{}-{index}.{}",
                    slug(&content.prompt),
                    message.as_str(),
                    artifact.file_extension()
                );
                save_artifact(&self.out_dir, &file_name, bytes)?
                    .display()
                    .to_string()
            }
        };
        let mut line = format!("  🖼  {location}");
        if let Some(author) = &artifact.attribution.author {
            line.push_str(&format!(" by {author}"));
        }
        if let Some(page) = &artifact.attribution.page_url {
            line.push_str(&format!(" ({page})"));
        }
        Ok(line)
    }
}

#[async_trait]
impl SurfaceAdapter for ConsoleSurface {
    async fn send_progress(&self, slot: &str, text: &str) -> Result<MessageRef, GenerationError> {
        let id = self.next_message.fetch_add(1, Ordering::SeqCst) + 1;
        let message = MessageRef(format!("m{id}"));
        self.print(&format!("[#{slot} {}] {text}", message.as_str()))?;
        Ok(message)
    }

    async fn update_progress(
        &self,
        message: &MessageRef,
        text: &str,
    ) -> Result<(), GenerationError> {
        self.print(&format!("[{}] {text}", message.as_str()))
    }

    async fn remove_progress(&self, message: &MessageRef) -> Result<(), GenerationError> {
        self.print(&format!("[{}] (removed)", message.as_str()))
    }

    async fn publish_result(
        &self,
        message: &MessageRef,
        content: &ResultContent,
        control: &RegenerateControl,
    ) -> Result<(), GenerationError> {
        let mut lines = vec![format!(
            "[{}] ✅ **{}** via {}",
            message.as_str(),
            content.prompt,
            content.provider
        )];
        for (index, artifact) in content.artifacts.iter().enumerate() {
            let line = self
                .describe(message, index, content, artifact)
                .map_err(|err| GenerationError::presentation(format!("{err:#}")))?;
            lines.push(line);
        }
        lines.push(format!("  [{}] {}", control.label, control.custom_id()));
        self.print(&lines.join("\n"))?;

        *self
            .last_control
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(control.clone());
        Ok(())
    }

    async fn publish_error(&self, message: &MessageRef, text: &str) -> Result<(), GenerationError> {
        self.print(&format!("[{}] {text}", message.as_str()))
    }
}

fn save_artifact(out_dir: &Path, file_name: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let path = out_dir.join(file_name);
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn slug(prompt: &str) -> String {
    let mut out = String::new();
    for ch in prompt.chars().take(40) {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use pictobot_contracts::generation::{Artifact, Attribution, GenerationRequest};
    use pictobot_engine::{ControlRegistry, MessageRef, ResultContent, SurfaceAdapter};
    use pretty_assertions::assert_eq;

    use super::{slug, ConsoleSurface};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().expect("buffer lock").clone()).expect("utf8 output")
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("buffer lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn slug_keeps_alphanumerics() {
        assert_eq!(slug("A red fox, at dawn!"), "a-red-fox-at-dawn");
        assert_eq!(slug("🔥🔥"), "image");
    }

    #[tokio::test]
    async fn progress_then_result_lines() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let buffer = SharedBuffer::default();
        let surface = ConsoleSurface::new(dir.path(), Box::new(buffer.clone()));

        let message = surface.send_progress("general", "⏳ Generating **fox**: 30s").await?;
        assert_eq!(message, MessageRef("m1".to_string()));
        surface.update_progress(&message, "⏳ Generating **fox**: 25s").await?;

        let content = ResultContent {
            prompt: "fox".to_string(),
            provider: "unsplash".to_string(),
            artifacts: vec![Artifact::from_url(
                "https://images.example/fox.jpg",
                Attribution {
                    provider: "unsplash".to_string(),
                    author: Some("Ada".to_string()),
                    page_url: Some("https://unsplash.example/p/1".to_string()),
                },
            )],
        };
        let control = ControlRegistry::new().issue("general", &GenerationRequest::new("fox")?);
        surface.publish_result(&message, &content, &control).await?;

        assert_eq!(
            buffer.text(),
            "[#general m1] ⏳ Generating **fox**: 30s\n\
             [m1] ⏳ Generating **fox**: 25s\n\
             [m1] ✅ **fox** via unsplash\n\
             \x20 🖼  https://images.example/fox.jpg by Ada (https://unsplash.example/p/1)\n\
             \x20 [🔁 Regenerate] generate_fox\n"
        );
        assert_eq!(surface.last_control(), Some(control));
        Ok(())
    }

    #[tokio::test]
    async fn byte_artifacts_are_saved_to_out_dir() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let out_dir = dir.path().join("images");
        let surface = ConsoleSurface::new(&out_dir, Box::new(SharedBuffer::default()));

        let message = surface.send_progress("general", "start").await?;
        let content = ResultContent {
            prompt: "Red Fox".to_string(),
            provider: "dryrun".to_string(),
            artifacts: vec![Artifact::from_bytes(
                vec![1, 2, 3],
                Some("image/png".to_string()),
                Attribution::default(),
            )],
        };
        let control = ControlRegistry::new().issue("general", &GenerationRequest::new("Red Fox")?);
        surface.publish_result(&message, &content, &control).await?;

        let saved = std::fs::read(out_dir.join("red-fox-m1-0.png"))?;
        assert_eq!(saved, vec![1, 2, 3]);
        Ok(())
    }
}
