//! Layout engine seam and output writing.
//!
//! The core never inspects rendered bytes: a [`LayoutEngine`] turns DOT text
//! into PNG or SVG, and [`write_outputs`] persists whichever artifacts were
//! requested next to a common base path.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use crate::error::HarnessError;
use crate::graph::ColorTranslator;
use crate::harness::Harness;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

/// Renders a DOT graph description into image bytes.
pub trait LayoutEngine {
    fn render(&self, dot: &str, format: ImageFormat) -> Result<Vec<u8>, HarnessError>;
}

/// Runs a Graphviz program (`dot` by default) as a child process.
#[derive(Debug, Clone)]
pub struct GraphvizCommand {
    pub program: PathBuf,
}

impl Default for GraphvizCommand {
    fn default() -> Self {
        Self {
            program: PathBuf::from("dot"),
        }
    }
}

impl GraphvizCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl LayoutEngine for GraphvizCommand {
    fn render(&self, dot: &str, format: ImageFormat) -> Result<Vec<u8>, HarnessError> {
        let mut child = Command::new(&self.program)
            .arg(format!("-T{}", format.extension()))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                HarnessError::Render(format!("failed to start {}: {}", self.program.display(), e))
            })?;

        // Feed stdin from a separate thread so a large output cannot
        // deadlock against a full stdout pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = dot.to_owned();
            std::thread::spawn(move || stdin.write_all(input.as_bytes()))
        });

        let output = child.wait_with_output()?;
        let written = match writer {
            Some(writer) => writer
                .join()
                .map_err(|_| HarnessError::Render("stdin writer panicked".to_string()))?,
            None => Ok(()),
        };

        if !output.status.success() {
            return Err(HarnessError::Render(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        written?;
        Ok(output.stdout)
    }
}

/// Artifacts `write_outputs` can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Png,
    Svg,
    Gv,
    Tsv,
    Csv,
    Pdf,
    Html,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Png,
        OutputFormat::Svg,
        OutputFormat::Gv,
        OutputFormat::Tsv,
        OutputFormat::Csv,
        OutputFormat::Pdf,
        OutputFormat::Html,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
            OutputFormat::Gv => "gv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Csv => "csv",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Html => "html",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, OutputFormat::Csv | OutputFormat::Pdf | OutputFormat::Html)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown output format '{}'", s))
    }
}

/// What `write_outputs` did.
#[derive(Debug, Clone, Default)]
pub struct OutputReport {
    pub written: Vec<PathBuf>,
    /// Requested formats that are recognised but not produced.
    pub skipped: Vec<OutputFormat>,
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Write the requested artifacts for `harness` next to `base`
/// (`base.png`, `base.svg`, `base.gv`, `base.bom.tsv`).
///
/// The graph is built once and shared by every graphical format. Formats
/// that are not implemented are logged and reported, never fatal.
pub fn write_outputs(
    harness: &Harness,
    engine: &dyn LayoutEngine,
    colors: &dyn ColorTranslator,
    base: &Path,
    formats: &[OutputFormat],
) -> Result<OutputReport, HarnessError> {
    let mut report = OutputReport::default();
    let needs_graph = formats
        .iter()
        .any(|f| matches!(f, OutputFormat::Png | OutputFormat::Svg | OutputFormat::Gv));
    let dot = if needs_graph {
        Some(harness.graph(colors)?.to_dot())
    } else {
        None
    };

    for format in formats {
        let path = match format {
            OutputFormat::Png | OutputFormat::Svg => {
                let image = if *format == OutputFormat::Png {
                    ImageFormat::Png
                } else {
                    ImageFormat::Svg
                };
                let bytes = engine.render(dot.as_deref().unwrap_or_default(), image)?;
                let path = with_suffix(base, &format!(".{}", image.extension()));
                std::fs::write(&path, bytes)?;
                path
            }
            OutputFormat::Gv => {
                let path = with_suffix(base, ".gv");
                std::fs::write(&path, dot.as_deref().unwrap_or_default())?;
                path
            }
            OutputFormat::Tsv => {
                let path = with_suffix(base, ".bom.tsv");
                harness.bom().write_tsv(std::fs::File::create(&path)?)?;
                path
            }
            OutputFormat::Csv | OutputFormat::Pdf | OutputFormat::Html => {
                tracing::warn!("{} output is not yet supported", format.as_str().to_uppercase());
                report.skipped.push(*format);
                continue;
            }
        };
        tracing::info!("Wrote {}", path.display());
        report.written.push(path);
    }
    Ok(report)
}
