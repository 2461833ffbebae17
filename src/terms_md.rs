use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::json_io;
use crate::terms::{CatalogueOutput, Category};

/// One `| n | original | translated |` row per resolved pair, numbered
/// across all categories.
pub fn render_table(catalogue: &CatalogueOutput, unresolved_marker: &str) -> String {
    let mut output = String::new();
    let mut count = 0usize;
    for category in Category::ALL {
        for pair in catalogue.category(category) {
            if !unresolved_marker.is_empty() && pair.translated.contains(unresolved_marker) {
                continue;
            }
            count += 1;
            output.push_str(&format!(
                "| {} | {} | {} |\n",
                count,
                escape_cell(&pair.original),
                escape_cell(&pair.translated)
            ));
        }
    }
    output
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

pub fn convert_file(terms_path: &Path, output_path: &Path, unresolved_marker: &str) -> Result<()> {
    let content = fs::read_to_string(terms_path)
        .with_context(|| format!("failed to read terms: {}", terms_path.display()))?;
    let catalogue: CatalogueOutput = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse terms: {}", terms_path.display()))?;
    let table = render_table(&catalogue, unresolved_marker);
    json_io::write_text(output_path, &table)?;
    info!("wrote markdown table to {}", output_path.display());
    Ok(())
}
