//! Reader/Writer traits and format dispatch
//!
//! Graphs are read from, and layouts written to, JSON or YAML files. The
//! format is chosen from the file extension through a [`FormatRegistry`].

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::graph::{GraphData, Layout};

/// Errors that can occur during reading or writing
#[derive(Error, Debug)]
pub enum IoError {
    /// The file format is not supported
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file extension could not be determined
    #[error("could not determine file format from path: {0}")]
    UnknownExtension(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A parsing error occurred
    #[error("parse error: {0}")]
    Parse(String),

    /// A serialization/writing error occurred
    #[error("write error: {0}")]
    Write(String),
}

/// Result type for reader/writer operations
pub type IoResult<T> = Result<T, IoError>;

/// A reader parses an input file into a [`GraphData`]
pub trait GraphReader {
    /// Parse the input file. Edges that reference unknown nodes are dropped.
    fn read(&self, input: &Path) -> IoResult<GraphData>;

    /// File extensions this reader can handle (e.g., ["yaml", "yml"])
    fn supported_extensions(&self) -> &[&str];

    /// Check if this reader can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// A writer outputs a [`Layout`] in a specific format
pub trait LayoutWriter {
    /// Write the layout to the output path
    fn write(&self, layout: &Layout, output: &Path) -> IoResult<()>;

    /// Identifier for this output format (e.g., "json", "yaml")
    fn format_id(&self) -> &str;

    /// File extensions this writer produces
    fn supported_extensions(&self) -> &[&str];

    fn supports_extension(&self, ext: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

fn read_graph(input: &Path, parse: impl FnOnce(&str) -> IoResult<GraphData>) -> IoResult<GraphData> {
    let content = std::fs::read_to_string(input)?;
    let mut graph = parse(&content)?;
    let dropped = graph.drop_dangling_edges();
    if dropped > 0 {
        warn!(
            dropped,
            path = %input.display(),
            "dropped edges referencing unknown nodes"
        );
    }
    debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "read graph"
    );
    Ok(graph)
}

fn write_file(output: &Path, content: String) -> IoResult<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, content)?;
    debug!(path = %output.display(), "wrote layout");
    Ok(())
}

/// JSON graphs and layouts
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormat;

impl JsonFormat {
    pub fn new() -> Self {
        Self
    }

    pub fn parse<T: DeserializeOwned>(content: &str) -> IoResult<T> {
        serde_json::from_str(content).map_err(|e| IoError::Parse(e.to_string()))
    }

    pub fn render<T: Serialize>(value: &T) -> IoResult<String> {
        serde_json::to_string_pretty(value).map_err(|e| IoError::Write(e.to_string()))
    }
}

impl GraphReader for JsonFormat {
    fn read(&self, input: &Path) -> IoResult<GraphData> {
        read_graph(input, Self::parse)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}

impl LayoutWriter for JsonFormat {
    fn write(&self, layout: &Layout, output: &Path) -> IoResult<()> {
        write_file(output, Self::render(layout)?)
    }

    fn format_id(&self) -> &str {
        "json"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}

/// YAML graphs and layouts
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlFormat;

impl YamlFormat {
    pub fn new() -> Self {
        Self
    }

    pub fn parse<T: DeserializeOwned>(content: &str) -> IoResult<T> {
        serde_yaml::from_str(content).map_err(|e| IoError::Parse(e.to_string()))
    }

    pub fn render<T: Serialize>(value: &T) -> IoResult<String> {
        serde_yaml::to_string(value).map_err(|e| IoError::Write(e.to_string()))
    }
}

impl GraphReader for YamlFormat {
    fn read(&self, input: &Path) -> IoResult<GraphData> {
        read_graph(input, Self::parse)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }
}

impl LayoutWriter for YamlFormat {
    fn write(&self, layout: &Layout, output: &Path) -> IoResult<()> {
        write_file(output, Self::render(layout)?)
    }

    fn format_id(&self) -> &str {
        "yaml"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }
}

/// Registry of available readers and writers
pub struct FormatRegistry {
    readers: Vec<Box<dyn GraphReader>>,
    writers: Vec<Box<dyn LayoutWriter>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
            writers: Vec::new(),
        }
    }

    /// Create a registry with JSON and YAML readers and writers registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_reader(Box::new(JsonFormat::new()));
        registry.register_reader(Box::new(YamlFormat::new()));
        registry.register_writer(Box::new(JsonFormat::new()));
        registry.register_writer(Box::new(YamlFormat::new()));
        registry
    }

    pub fn register_reader(&mut self, reader: Box<dyn GraphReader>) {
        self.readers.push(reader);
    }

    pub fn register_writer(&mut self, writer: Box<dyn LayoutWriter>) {
        self.writers.push(writer);
    }

    /// Find a reader for the given file extension
    pub fn reader_for_extension(&self, ext: &str) -> Option<&dyn GraphReader> {
        self.readers
            .iter()
            .find(|r| r.supports_extension(ext))
            .map(|r| r.as_ref())
    }

    /// Find a writer by format ID
    pub fn writer_for_format(&self, format_id: &str) -> Option<&dyn LayoutWriter> {
        self.writers
            .iter()
            .find(|w| w.format_id().eq_ignore_ascii_case(format_id))
            .map(|w| w.as_ref())
    }

    /// Get file extension from a path
    pub fn extension_from_path(path: &Path) -> Option<&str> {
        path.extension().and_then(|e| e.to_str())
    }

    /// Find a reader for the given path based on its extension
    pub fn reader_for_path(&self, path: &Path) -> IoResult<&dyn GraphReader> {
        let ext = Self::extension_from_path(path)
            .ok_or_else(|| IoError::UnknownExtension(path.display().to_string()))?;

        self.reader_for_extension(ext)
            .ok_or_else(|| IoError::UnsupportedFormat(ext.to_string()))
    }

    /// Find a writer for the given path based on its extension
    pub fn writer_for_path(&self, path: &Path) -> IoResult<&dyn LayoutWriter> {
        let ext = Self::extension_from_path(path)
            .ok_or_else(|| IoError::UnknownExtension(path.display().to_string()))?;

        self.writers
            .iter()
            .find(|w| w.supports_extension(ext))
            .map(|w| w.as_ref())
            .ok_or_else(|| IoError::UnsupportedFormat(ext.to_string()))
    }
}
