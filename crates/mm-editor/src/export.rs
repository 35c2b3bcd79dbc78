//! Export pipeline: frozen snapshot → renderer → sink.
//!
//! Rendering runs on a blocking worker under a timeout. The sink only sees
//! finished output, and `FileSink` publishes it with a rename, so a failed
//! or timed-out export leaves nothing behind.

use mm_core::emitter::emit_snapshot_outline;
use mm_core::snapshot::Snapshot;
use mm_render::svg::render_svg;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("render failed: {0}")]
    Render(String),
    #[error("sink rejected output: {0}")]
    Sink(String),
    #[error("export timed out after {0:?}")]
    TimedOut(Duration),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Finished renderer output.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// File extension without the dot.
    pub extension: &'static str,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Summary of a completed export.
#[derive(Debug, Clone, PartialEq)]
pub struct Exported {
    pub filename: String,
    pub bytes: usize,
}

pub trait Renderer: Send + Sync {
    fn render(&self, snapshot: &Snapshot) -> Result<Rendered, ExportError>;
}

pub trait ExportSink {
    fn accept(&mut self, filename: &str, rendered: &Rendered) -> Result<(), ExportError>;
}

// ─── Renderers ──────────────────────────────────────────────────────────

/// Vector image of the whole map.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgRenderer;

impl Renderer for SvgRenderer {
    fn render(&self, snapshot: &Snapshot) -> Result<Rendered, ExportError> {
        Ok(Rendered {
            extension: "svg",
            media_type: "image/svg+xml",
            bytes: render_svg(snapshot).into_bytes(),
        })
    }
}

/// Indented outline document.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineRenderer;

impl Renderer for OutlineRenderer {
    fn render(&self, snapshot: &Snapshot) -> Result<Rendered, ExportError> {
        Ok(Rendered {
            extension: "md",
            media_type: "text/markdown",
            bytes: emit_snapshot_outline(snapshot).into_bytes(),
        })
    }
}

// ─── Sinks ──────────────────────────────────────────────────────────────

/// Writes exports into a directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportSink for FileSink {
    fn accept(&mut self, filename: &str, rendered: &Rendered) -> Result<(), ExportError> {
        if filename.is_empty() || filename.contains(['/', '\\']) {
            return Err(ExportError::Sink(format!("bad file name {filename:?}")));
        }
        fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(filename);
        let tmp = self
            .dir
            .join(format!(".{filename}.{}.partial", std::process::id()));
        if let Err(e) = fs::write(&tmp, &rendered.bytes).and_then(|()| fs::rename(&tmp, &target))
        {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        log::info!("wrote {}", target.display());
        Ok(())
    }
}

// ─── Pipeline ───────────────────────────────────────────────────────────

/// File name for an export of a map titled `title`.
///
/// ASCII alphanumerics, `-` and `_` are kept, whitespace runs become a
/// single `-`, everything else is dropped. An empty result falls back to
/// `mind-map`.
pub fn suggested_filename(title: &str, extension: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    let mut gap = false;
    for c in title.trim().chars() {
        if c.is_whitespace() {
            gap = true;
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            if gap && !stem.is_empty() {
                stem.push('-');
            }
            gap = false;
            stem.push(c);
        }
    }
    if stem.is_empty() {
        stem.push_str("mind-map");
    }
    format!("{stem}.{extension}")
}

/// Render `snapshot` off the async executor and hand the result to `sink`.
///
/// On timeout or render failure the sink is never called. The render task
/// is not cancelled on timeout; its result is discarded.
pub async fn export(
    snapshot: Snapshot,
    renderer: Arc<dyn Renderer>,
    sink: &mut dyn ExportSink,
    timeout: Duration,
) -> Result<Exported, ExportError> {
    let title = snapshot.title().to_string();
    let task = tokio::task::spawn_blocking(move || renderer.render(&snapshot));

    let rendered = match tokio::time::timeout(timeout, task).await {
        Err(_) => {
            log::warn!("export of {title:?} timed out after {timeout:?}");
            return Err(ExportError::TimedOut(timeout));
        }
        Ok(Err(join)) => return Err(ExportError::Render(join.to_string())),
        Ok(Ok(result)) => result?,
    };

    let filename = suggested_filename(&title, rendered.extension);
    sink.accept(&filename, &rendered)?;
    log::info!("exported {title:?} as {filename} ({} bytes)", rendered.bytes.len());
    Ok(Exported {
        filename,
        bytes: rendered.bytes.len(),
    })
}
