//! Output utilities.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::warn;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// YAML format (default).
    #[default]
    Yaml,
    /// JSON format.
    Json,
}

/// Output configuration.
pub struct Output {
    pub format: OutputFormat,
    pub file: Option<String>,
}

impl Output {
    /// Creates a new output configuration.
    pub fn new(format: OutputFormat, file: Option<String>) -> Self {
        Self { format, file }
    }

    /// Serializes `value` in the configured format.
    pub fn render<T: Serialize>(&self, value: &T) -> anyhow::Result<String> {
        Ok(match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json => serde_json::to_string_pretty(value)? + "\n",
        })
    }

    /// Writes `value` to the output file, or stdout.
    pub fn write<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let rendered = self.render(value)?;
        self.write_text(&rendered)
    }

    /// Writes preformatted text to the output file, or stdout.
    pub fn write_text(&self, text: &str) -> anyhow::Result<()> {
        match &self.file {
            Some(path) => {
                if Path::new(path).exists() {
                    warn!(path = %path, "overwriting existing output file");
                }
                let mut file = File::create(path)?;
                file.write_all(text.as_bytes())?;
            }
            None => print!("{}", text),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct Row {
        name: &'static str,
        value: u32,
    }

    #[test]
    fn test_render_formats() {
        let row = Row {
            name: "x",
            value: 3,
        };
        let yaml = Output::new(OutputFormat::Yaml, None).render(&row).unwrap();
        assert_eq!(yaml, "name: x\nvalue: 3\n");
        let json = Output::new(OutputFormat::Json, None).render(&row).unwrap();
        let back: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back["value"], 3);
    }

    #[test]
    fn test_write_file_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let out = Output::new(
            OutputFormat::Json,
            Some(path.to_string_lossy().into_owned()),
        );

        out.write(&Row { name: "a", value: 1 }).unwrap();
        out.write(&Row { name: "b", value: 2 }).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"b\""));
        assert!(!content.contains("\"a\""));
    }
}
