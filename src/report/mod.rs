//! Report renderers: markdown, JSON and terminal text over run summaries.

pub mod json;
pub mod markdown;
pub mod text;

use crate::error::Result;
use std::path::Path;

/// Write a report, creating the output directory if needed.
pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)?;
    log::info!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

/// Integer with `,` thousands separators.
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Fraction rendered as a percentage with the given precision, e.g. `72.5%`.
pub fn percent(fraction: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, fraction * 100.0)
}
