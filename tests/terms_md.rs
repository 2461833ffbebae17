use std::fs;

use story_translator_rust::terms::{Category, Side, TermCatalogue};
use story_translator_rust::terms_md;
use tempfile::tempdir;

#[test]
fn catalogue_to_markdown_table() {
    let dir = tempdir().unwrap();
    let mut catalogue = TermCatalogue::new();
    for (category, original, translated, id) in [
        (Category::Characters, "Alice", "爱丽丝", 1),
        (Category::Characters, "???", "？？？", 2),
        (Category::Locations, "Bar | Grill", "酒吧|烧烤", 3),
        (Category::Content, "Line one\nLine two", "第一行\n第二行", 4),
    ] {
        catalogue.register_text(category, original, id, Side::Source);
        catalogue.register_text(category, translated, id, Side::Translated);
    }
    let terms_path = dir.path().join("terms.json");
    let table_path = dir.path().join("terms.md");
    catalogue.save(&terms_path).unwrap();

    terms_md::convert_file(&terms_path, &table_path, "？？？").unwrap();
    let table = fs::read_to_string(&table_path).unwrap();
    insta::assert_snapshot!(table, @r"
    | 1 | Alice | 爱丽丝 |
    | 2 | Bar \| Grill | 酒吧\|烧烤 |
    | 3 | Line one Line two | 第一行 第二行 |
    ");
}
