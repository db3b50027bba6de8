//! Terminal output utilities: result rendering, ANSI formatting, tables.

use nitrilens_core::{
    AnalysisError, AnalysisResult, ConcentrationUnit, ConfidenceBand, HistoryEntry, HistoryStats,
};

// ---------------------------------------------------------------------------
// ANSI Color/Style helpers
// ---------------------------------------------------------------------------

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

/// Strip ANSI escape codes from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip until 'm'
            for next in chars.by_ref() {
                if next == 'm' { break; }
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn paint(text: &str, style: &str) -> String {
    if supports_color() {
        format!("{style}{text}{RESET}")
    } else {
        text.to_string()
    }
}

// ---------------------------------------------------------------------------
// Formatted notes
// ---------------------------------------------------------------------------

/// Print a formatted INFO note to stdout.
pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

/// Print a formatted WARNING note.
pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

/// Print a formatted ERROR note.
pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

/// Print a formatted SUCCESS note.
pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

// ---------------------------------------------------------------------------
// Analysis rendering
// ---------------------------------------------------------------------------

/// `[#########-] 85%`
pub fn confidence_bar(confidence: u8, width: usize) -> String {
    let filled = (usize::from(confidence.min(100)) * width + 50) / 100;
    format!(
        "[{}{}] {confidence}%",
        "#".repeat(filled),
        "-".repeat(width - filled)
    )
}

fn band_style(band: ConfidenceBand) -> &'static str {
    match band {
        ConfidenceBand::VeryHigh => GREEN,
        ConfidenceBand::High => CYAN,
        ConfidenceBand::Moderate => YELLOW,
        ConfidenceBand::Low => RED,
    }
}

/// Full report for one analysis.
pub fn render_result(source: &str, result: &AnalysisResult, unit: ConcentrationUnit) -> String {
    let band = result.band();
    let mut out = String::new();
    out.push_str(&format!("{}\n", paint(source, DIM)));
    out.push_str(&format!(
        "  Predicted Nitrite Level: {}\n",
        paint(&format!("{:.1} {unit}", result.predicted_level()), BOLD)
    ));
    out.push_str(&format!(
        "  AI Confidence:           {}\n",
        confidence_bar(result.confidence(), 20)
    ));
    out.push_str(&format!("  {}\n\n", paint(band.message(), band_style(band))));
    out.push_str(&format!("  Test Tube Description: {}\n", or_na(result.tube_description())));
    out.push_str(&format!("  Matched Reference:     {}\n", or_na(result.matched_reference())));
    out.push_str(&format!("  AI Explanation:        {}\n", or_na(result.explanation())));
    out
}

fn or_na(text: &str) -> &str {
    if text.trim().is_empty() { "N/A" } else { text }
}

/// Plain-text error message with a follow-up hint.
pub fn render_error(source: &str, err: &AnalysisError) -> String {
    format!("{source}: {err}\n  {}", err.hint())
}

/// Session statistics line.
pub fn render_stats(stats: &HistoryStats, unit: ConcentrationUnit) -> String {
    format!(
        "Total Tests: {}   Average Level: {:.1} {unit}   Average Confidence: {:.1}%",
        stats.total, stats.average_level, stats.average_confidence
    )
}

// ---------------------------------------------------------------------------
// Table rendering
// ---------------------------------------------------------------------------

/// Column alignment.
pub enum Align { Left, Right }

/// A table column definition.
pub struct Column {
    pub header: String,
    pub align: Align,
}

impl Column {
    pub fn left(header: impl Into<String>) -> Self {
        Self { header: header.into(), align: Align::Left }
    }
    pub fn right(header: impl Into<String>) -> Self {
        Self { header: header.into(), align: Align::Right }
    }
}

/// Render a table with given columns and rows.
pub fn render_table(columns: &[Column], rows: &[Vec<String>]) -> String {
    let num_cols = columns.len();
    let mut widths: Vec<usize> = columns.iter().map(|c| strip_ansi(&c.header).chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(num_cols) {
            widths[i] = widths[i].max(strip_ansi(cell).chars().count());
        }
    }

    let mut out = String::new();

    let header_cells: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| pad_cell(&col.header, widths[i], &col.align))
        .collect();
    out.push_str(&format!("  {}  \n", header_cells.join("  ")));

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}  \n", sep.join("  ")));

    for row in rows {
        let cells: Vec<String> = (0..num_cols)
            .map(|i| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                pad_cell(cell, widths[i], &columns[i].align)
            })
            .collect();
        out.push_str(&format!("  {}  \n", cells.join("  ")));
    }

    out
}

fn pad_cell(s: &str, width: usize, align: &Align) -> String {
    let pad = width.saturating_sub(strip_ansi(s).chars().count());
    match align {
        Align::Left => format!("{s}{}", " ".repeat(pad)),
        Align::Right => format!("{}{s}", " ".repeat(pad)),
    }
}

/// History table for the session summary.
pub fn render_history(entries: &[HistoryEntry]) -> String {
    let columns = [
        Column::left("Time"),
        Column::right("Level"),
        Column::left("Unit"),
        Column::right("Confidence"),
    ];
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                format!("{:.1}", e.predicted_level),
                e.unit.to_string(),
                format!("{}%", e.confidence),
            ]
        })
        .collect();
    render_table(&columns, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ansi() {
        let colored = format!("{GREEN}hello{RESET}");
        assert_eq!(strip_ansi(&colored), "hello");
    }

    #[test]
    fn renders_table() {
        let cols = vec![Column::left("Name"), Column::right("Count")];
        let rows = vec![
            vec!["Alice".to_string(), "42".to_string()],
            vec!["Bob".to_string(), "7".to_string()],
        ];
        let table = render_table(&cols, &rows);
        assert!(table.contains("Alice"));
        assert!(table.contains("   7"));
    }

    #[test]
    fn confidence_bar_scales() {
        assert_eq!(confidence_bar(0, 10), "[----------] 0%");
        assert_eq!(confidence_bar(85, 10), "[#########-] 85%");
        assert_eq!(confidence_bar(100, 10), "[##########] 100%");
    }

    #[test]
    fn result_report_has_details() {
        let result =
            AnalysisResult::new(2.0, 85.0, "", "Medium pink", "2.0 mg/L reference block").unwrap();
        let text = strip_ansi(&render_result("kit.png", &result, ConcentrationUnit::MgPerL));
        assert!(text.contains("Predicted Nitrite Level: 2.0 mg/L"));
        assert!(text.contains("High Confidence - Good match"));
        assert!(text.contains("Matched Reference:     2.0 mg/L reference block"));
        assert!(text.contains("AI Explanation:        N/A"));
    }

    #[test]
    fn error_text_is_plain() {
        let err = AnalysisError::MalformedResponse("no JSON object in reply".into());
        let text = render_error("kit.png", &err);
        assert!(text.starts_with("kit.png: the AI service returned an unreadable response"));
        assert!(text.contains(err.hint()));
    }
}
