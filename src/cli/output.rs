// Output formatting for CLI

use std::io::Write;

use anyhow::Result;

use crate::cli::OutputFormat;

/// Format and output data
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Output metadata
    pub fn output_metadata(&self, metadata: &serde_json::Value, writer: &mut dyn Write) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => {
                writeln!(writer, "{}", serde_json::to_string_pretty(metadata)?)?;
            }
            OutputFormat::Json => {
                writeln!(writer, "{}", serde_json::to_string(metadata)?)?;
            }
            OutputFormat::KeyValue => {
                self.output_key_value(metadata, writer)?;
            }
            OutputFormat::Table => {
                self.output_table(metadata, writer)?;
            }
        }
        Ok(())
    }

    /// Output as key-value pairs, nested objects flattened with dotted keys
    fn output_key_value(&self, metadata: &serde_json::Value, writer: &mut dyn Write) -> Result<()> {
        let mut items = Vec::new();
        flatten("", metadata, &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, value) in items {
            writeln!(writer, "{}: {}", key, value)?;
        }
        Ok(())
    }

    /// Output as table
    fn output_table(&self, metadata: &serde_json::Value, writer: &mut dyn Write) -> Result<()> {
        let mut items = Vec::new();
        flatten("", metadata, &mut items);
        let max_key_len = items.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

        writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;
        for (key, value) in items {
            writeln!(writer, "{:<width$} {}", format!("{}:", key), value, width = max_key_len + 2)?;
        }
        writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;
        Ok(())
    }

    /// Print success message
    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            println!("✓ {}", message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            println!("  {}", message);
        }
    }
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(obj) if !obj.is_empty() => {
            for (key, child) in obj {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&key, child, out);
            }
        }
        other => out.push((prefix.to_string(), format_value(other))),
    }
}

/// Format a JSON value for display
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "(null)".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Array(arr) => format!("[{} items]", arr.len()),
        serde_json::Value::Object(_) => "{}".to_string(),
    }
}
