use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::{AnswerReport, IngestReport, OutputFormat, QueryResult, SearchReport};
use crate::utils::preview;

const PREVIEW_CHARS: usize = 200;

pub trait Formatter {
    fn format_search(&self, report: &SearchReport) -> String;
    fn format_answer(&self, report: &AnswerReport) -> String;
    fn format_ingest(&self, report: &IngestReport) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub config_path: Option<String>,
    pub config_exists: bool,
    pub embedding_model: String,
    pub model_dir: Option<String>,
    pub model_files_present: bool,
    pub ort_library: Option<String>,
    pub gemini_model: String,
    pub api_key_configured: bool,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub max_tokens: u32,
    /// Default chunks likely exceed the embedding token window
    pub chunk_exceeds_window: bool,
}

fn yes_no(ok: bool) -> &'static str {
    if ok { "[OK]" } else { "[MISSING]" }
}

pub struct TextFormatter;

impl TextFormatter {
    fn write_hits(output: &mut String, results: &QueryResult) {
        for (i, hit) in results.iter().enumerate() {
            let _ = writeln!(output, "{}. [Score: {:.3}]", i + 1, hit.score);
            let _ = writeln!(output, "   Location: {}", hit.chunk.location());
            let _ = writeln!(output, "   ---");
            for line in preview(&hit.chunk.text, PREVIEW_CHARS).lines() {
                let _ = writeln!(output, "   {}", line);
            }
            let _ = writeln!(output);
        }
    }
}

impl Formatter for TextFormatter {
    fn format_search(&self, report: &SearchReport) -> String {
        if report.results.is_empty() {
            return format!("No results found for: {}\n", report.query);
        }

        let mut output = String::new();
        let _ = writeln!(output, "Search results for: \"{}\"", report.query);
        let _ = writeln!(
            output,
            "Found {} results in {}ms\n",
            report.results.len(),
            report.duration_ms
        );
        Self::write_hits(&mut output, &report.results);
        output
    }

    fn format_answer(&self, report: &AnswerReport) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "{}\n", report.answer);
        if !report.context.is_empty() {
            let sources: Vec<String> = report
                .context
                .iter()
                .map(|h| format!("{} ({:.3})", h.chunk.location(), h.score))
                .collect();
            let _ = writeln!(output, "Sources: {}", sources.join(", "));
        }
        output
    }

    fn format_ingest(&self, report: &IngestReport) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Ingest Complete");
        let _ = writeln!(output, "---------------");
        let _ = writeln!(output, "Document chunks: {}", report.document_chunks);
        let _ = writeln!(
            output,
            "Image summary:   {}",
            if report.image_indexed { "indexed" } else { "none" }
        );
        if let Some(dimension) = report.dimension {
            let _ = writeln!(output, "Dimension:       {}", dimension);
        }
        let _ = writeln!(output, "Duration:        {}ms", report.duration_ms);
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Status");
        let _ = writeln!(output, "------");

        let _ = writeln!(
            output,
            "Config:        {} {}",
            status.config_path.as_deref().unwrap_or("-"),
            if status.config_exists {
                "[OK]"
            } else {
                "[DEFAULTS]"
            }
        );
        let _ = writeln!(
            output,
            "Embedding:     {} {}",
            status.embedding_model,
            yes_no(status.model_files_present)
        );
        if let Some(ref dir) = status.model_dir {
            let _ = writeln!(output, "  Model dir:   {}", dir);
        }
        let _ = writeln!(
            output,
            "ONNX Runtime:  {}",
            status.ort_library.as_deref().unwrap_or("[MISSING]")
        );
        let _ = writeln!(
            output,
            "Gemini:        {} (API key {})",
            status.gemini_model,
            yes_no(status.api_key_configured)
        );
        let _ = writeln!(
            output,
            "Chunking:      {} words, {} overlap, {} token window",
            status.chunk_size, status.chunk_overlap, status.max_tokens
        );
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        match rendered {
            Ok(json) => format!("{}\n", json),
            Err(e) => format!("{}\n", serde_json::json!({ "error": e.to_string() })),
        }
    }
}

impl Formatter for JsonFormatter {
    fn format_search(&self, report: &SearchReport) -> String {
        self.render(report)
    }

    fn format_answer(&self, report: &AnswerReport) -> String {
        self.render(report)
    }

    fn format_ingest(&self, report: &IngestReport) -> String {
        self.render(report)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(status)
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", serde_json::json!({ "message": message }))
    }

    fn format_error(&self, error: &str) -> String {
        format!("{}\n", serde_json::json!({ "error": error }))
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_search(&self, report: &SearchReport) -> String {
        if report.results.is_empty() {
            return format!("## No results found\n\nQuery: `{}`\n", report.query);
        }

        let mut output = String::new();
        let _ = writeln!(output, "## Search Results\n");
        let _ = writeln!(output, "**Query:** `{}`\n", report.query);
        let _ = writeln!(
            output,
            "Found {} results in {}ms\n",
            report.results.len(),
            report.duration_ms
        );

        for (i, hit) in report.results.iter().enumerate() {
            let _ = writeln!(output, "### {}. Score: {:.3}\n", i + 1, hit.score);
            let _ = writeln!(output, "**Location:** {}\n", hit.chunk.location());
            let _ = writeln!(output, "```");
            let _ = writeln!(output, "{}", hit.chunk.text);
            let _ = writeln!(output, "```\n");
        }
        output
    }

    fn format_answer(&self, report: &AnswerReport) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "## {}\n", report.question);
        let _ = writeln!(output, "{}\n", report.answer);
        if !report.context.is_empty() {
            let _ = writeln!(output, "### Sources\n");
            for hit in &report.context {
                let _ = writeln!(
                    output,
                    "- {} (score {:.3}): {}",
                    hit.chunk.location(),
                    hit.score,
                    preview(&hit.chunk.text, 80).replace('\n', " ")
                );
            }
        }
        output
    }

    fn format_ingest(&self, report: &IngestReport) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "## Ingest Complete\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Document chunks | {} |", report.document_chunks);
        let _ = writeln!(output, "| Image summary | {} |", report.image_indexed);
        let _ = writeln!(output, "| Duration | {}ms |", report.duration_ms);
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mark = |ok: bool| if ok { "✅" } else { "❌" };

        let mut output = String::new();
        let _ = writeln!(output, "## Status\n");
        let _ = writeln!(
            output,
            "- **Config:** `{}` {}",
            status.config_path.as_deref().unwrap_or("-"),
            mark(status.config_exists)
        );
        let _ = writeln!(
            output,
            "- **Embedding:** {} {}",
            status.embedding_model,
            mark(status.model_files_present)
        );
        let _ = writeln!(
            output,
            "- **ONNX Runtime:** {}",
            status
                .ort_library
                .as_deref()
                .map(|p| format!("`{}` ✅", p))
                .unwrap_or_else(|| "❌".to_string())
        );
        let _ = writeln!(
            output,
            "- **Gemini:** {} (API key {})",
            status.gemini_model,
            mark(status.api_key_configured)
        );
        let _ = writeln!(
            output,
            "- **Chunking:** {} words / {} overlap / {} tokens",
            status.chunk_size, status.chunk_overlap, status.max_tokens
        );
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}
