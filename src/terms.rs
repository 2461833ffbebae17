use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use tracing::{debug, error, info};

use crate::json_io;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Characters,
    Positions,
    Locations,
    Content,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Characters,
        Category::Positions,
        Category::Locations,
        Category::Content,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Characters => "characters",
            Category::Positions => "positions",
            Category::Locations => "locations",
            Category::Content => "content",
        }
    }

    /// Record field that feeds this category.
    pub fn field(&self) -> &'static str {
        match self {
            Category::Characters => "teller",
            Category::Positions => "title",
            Category::Locations => "place",
            Category::Content => "content",
        }
    }

    fn index(&self) -> usize {
        match self {
            Category::Characters => 0,
            Category::Positions => 1,
            Category::Locations => 2,
            Category::Content => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Translated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermEntry {
    pub original: String,
    pub translated: String,
    pub id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new source entry was created.
    Added,
    /// The text was already seen in this category; nothing changed.
    Duplicate,
    /// A pending source entry with the same id received its translation.
    Matched,
    /// Translated text with no pending source entry for its id.
    Unmatched,
    /// Empty text.
    Ignored,
}

#[derive(Debug, Default)]
struct CategoryTable {
    entries: Vec<TermEntry>,
    seen: HashMap<String, i64>,
    // ids of untranslated entries, oldest first
    pending: HashMap<i64, VecDeque<usize>>,
}

impl CategoryTable {
    fn register(&mut self, text: &str, id: i64, side: Side) -> Registration {
        if text.is_empty() {
            return Registration::Ignored;
        }
        if self.seen.contains_key(text) {
            return Registration::Duplicate;
        }
        match side {
            Side::Source => {
                self.seen.insert(text.to_string(), id);
                self.pending
                    .entry(id)
                    .or_default()
                    .push_back(self.entries.len());
                self.entries.push(TermEntry {
                    original: text.to_string(),
                    translated: String::new(),
                    id,
                });
                Registration::Added
            }
            Side::Translated => {
                let Some(queue) = self.pending.get_mut(&id) else {
                    return Registration::Unmatched;
                };
                let Some(index) = queue.pop_front() else {
                    return Registration::Unmatched;
                };
                if queue.is_empty() {
                    self.pending.remove(&id);
                }
                self.entries[index].translated = text.to_string();
                Registration::Matched
            }
        }
    }
}

/// Per-category term tables built from source/translated file pairs.
#[derive(Debug, Default)]
pub struct TermCatalogue {
    tables: [CategoryTable; 4],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairStats {
    pub source_records: usize,
    pub translated_records: usize,
    pub added: usize,
    pub duplicates: usize,
    pub matched: usize,
    pub unmatched: usize,
}

impl PairStats {
    fn record(&mut self, outcome: Registration) {
        match outcome {
            Registration::Added => self.added += 1,
            Registration::Duplicate => self.duplicates += 1,
            Registration::Matched => self.matched += 1,
            Registration::Unmatched => self.unmatched += 1,
            Registration::Ignored => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPair {
    pub original: String,
    pub translated: String,
}

/// The saved catalogue: only fully matched pairs, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueOutput {
    #[serde(default)]
    pub characters: Vec<TermPair>,
    #[serde(default)]
    pub positions: Vec<TermPair>,
    #[serde(default)]
    pub locations: Vec<TermPair>,
    #[serde(default)]
    pub content: Vec<TermPair>,
}

impl CatalogueOutput {
    pub fn category(&self, category: Category) -> &[TermPair] {
        match category {
            Category::Characters => &self.characters,
            Category::Positions => &self.positions,
            Category::Locations => &self.locations,
            Category::Content => &self.content,
        }
    }

    fn category_mut(&mut self, category: Category) -> &mut Vec<TermPair> {
        match category {
            Category::Characters => &mut self.characters,
            Category::Positions => &mut self.positions,
            Category::Locations => &mut self.locations,
            Category::Content => &mut self.content,
        }
    }
}

impl TermCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self, category: Category) -> &[TermEntry] {
        &self.tables[category.index()].entries
    }

    pub fn register_text(
        &mut self,
        category: Category,
        text: &str,
        id: i64,
        side: Side,
    ) -> Registration {
        let outcome = self.tables[category.index()].register(text, id, side);
        match outcome {
            Registration::Added => debug!("added {}: {}", category.as_str(), text),
            Registration::Duplicate => {
                debug!("skipped duplicate {}: {}", category.as_str(), text)
            }
            Registration::Matched => {
                debug!("matched {} translation for id {}: {}", category.as_str(), id, text)
            }
            Registration::Unmatched => debug!(
                "no pending {} entry for id {}; dropped: {}",
                category.as_str(),
                id,
                text
            ),
            Registration::Ignored => {}
        }
        outcome
    }

    /// Registers every source record, then every translated record. A read or
    /// parse failure abandons the rest of the pair; source entries already
    /// registered stay in the catalogue.
    pub fn process_file_pair(
        &mut self,
        source_path: &Path,
        translated_path: &Path,
    ) -> Result<PairStats> {
        info!(
            "processing file pair: {} -> {}",
            json_io::file_name(source_path),
            json_io::file_name(translated_path)
        );
        let mut stats = PairStats::default();

        let source = json_io::read_json(source_path)?;
        let source_records =
            self.register_records(&source, source_path, Side::Source, &mut stats)?;
        stats.source_records = source_records;

        let translated = json_io::read_json(translated_path)?;
        let translated_records =
            self.register_records(&translated, translated_path, Side::Translated, &mut stats)?;
        stats.translated_records = translated_records;

        Ok(stats)
    }

    fn register_records(
        &mut self,
        document: &Value,
        path: &Path,
        side: Side,
        stats: &mut PairStats,
    ) -> Result<usize> {
        let records = data_list(document, path)?;
        let mut count = 0;
        for record in records {
            let Some(id) = record.get("id").and_then(Value::as_i64) else {
                continue;
            };
            count += 1;
            for category in Category::ALL {
                if let Some(text) = record.get(category.field()).and_then(Value::as_str) {
                    let outcome = self.register_text(category, text, id, side);
                    stats.record(outcome);
                }
            }
        }
        Ok(count)
    }

    pub fn to_output(&self) -> CatalogueOutput {
        let mut output = CatalogueOutput::default();
        for category in Category::ALL {
            let pairs = output.category_mut(category);
            for entry in self.entries(category) {
                if entry.translated.is_empty() {
                    continue;
                }
                pairs.push(TermPair {
                    original: entry.original.clone(),
                    translated: entry.translated.clone(),
                });
            }
        }
        output
    }

    pub fn save(&self, output_path: &Path) -> Result<()> {
        let output = self.to_output();
        json_io::write_json_pretty(output_path, &output)?;
        info!("saved terms to {}", output_path.display());
        Ok(())
    }
}

fn data_list<'a>(document: &'a Value, path: &Path) -> Result<&'a [Value]> {
    match document.get("dataList") {
        None => Ok(&[]),
        Some(Value::Array(records)) => Ok(records),
        Some(_) => Err(anyhow!("dataList is not an array: {}", path.display())),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Pairs every `<prefix><name>.json` in `source_dir` with `<name>.json` in
/// `translated_dir`. Missing counterparts are skipped; unreadable pairs are
/// logged and counted as failed.
pub fn extract_directory(
    catalogue: &mut TermCatalogue,
    source_dir: &Path,
    translated_dir: &Path,
    prefix: &str,
) -> Result<ExtractSummary> {
    let mut summary = ExtractSummary::default();
    for source_path in json_io::list_json_files(source_dir)? {
        let file_name = json_io::file_name(&source_path);
        let Some(translated_name) = file_name.strip_prefix(prefix) else {
            continue;
        };
        let translated_path = translated_dir.join(translated_name);
        if !translated_path.is_file() {
            info!("skipped: no translated file {}", translated_name);
            summary.skipped += 1;
            continue;
        }
        match catalogue.process_file_pair(&source_path, &translated_path) {
            Ok(stats) => {
                debug!(
                    "{}: added {}, matched {}, duplicates {}, unmatched {}",
                    file_name, stats.added, stats.matched, stats.duplicates, stats.unmatched
                );
                summary.processed += 1;
            }
            Err(err) => {
                error!("failed to process {}: {:#}", file_name, err);
                summary.failed += 1;
            }
        }
    }
    info!(
        "extraction finished: processed {}, skipped {}, failed {}",
        summary.processed, summary.skipped, summary.failed
    );
    Ok(summary)
}
