//! Format Converter: archive documents as HTML, Markdown or plain text.

pub mod html;
pub mod markdown;
pub mod markup;
pub mod text;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::model::ArchiveDocument;
use crate::store::{read_json, write_text};
use crate::{AppError, Result};

pub use markup::Markup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Html,
    Markdown,
    Text,
}

impl OutputFormat {
    pub fn all() -> Vec<OutputFormat> {
        vec![OutputFormat::Html, OutputFormat::Markdown, OutputFormat::Text]
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
            OutputFormat::Text => "txt",
        }
    }

    /// Parse a format name; `all` expands to every format.
    pub fn parse_selection(s: &str) -> Result<Vec<OutputFormat>> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        Ok(vec![s.parse()?])
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(OutputFormat::Html),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "text" | "txt" => Ok(OutputFormat::Text),
            _ => Err(AppError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Text => "text",
        };
        f.write_str(name)
    }
}

fn render_with(doc: &ArchiveDocument, format: OutputFormat, markup: &Markup) -> String {
    match format {
        OutputFormat::Html => html::render(doc, markup),
        OutputFormat::Markdown => markdown::render(doc, markup),
        OutputFormat::Text => text::render(doc, markup),
    }
}

/// Convert the archive at `input` into one file per format, named `<base>.<ext>`.
///
/// Without an explicit base the input path minus its extension is used, so the
/// output lands next to the archive.
pub fn convert_file(
    input: &Path,
    formats: &[OutputFormat],
    output_base: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let doc: ArchiveDocument = read_json(input)?;
    let markup = Markup::new()?;
    let base = match output_base {
        Some(base) => base.to_path_buf(),
        None => input.with_extension(""),
    };

    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let path = with_added_extension(&base, format.extension());
        write_text(&path, &render_with(&doc, *format, &markup))?;
        written.push(path);
    }
    Ok(written)
}

// `general.v2` + `md` must give `general.v2.md`, not `general.md`.
fn with_added_extension(base: &Path, extension: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}
