//! Tests for extract module - block scanning, combination and document operations.

use serde::Deserialize;

use omni_frontmatter::{
    FrontmatterError, MAX_SECTIONS, Properties, Value, add_metadata, combine_all,
    combine_properties, extract_as, extract_body, extract_metadata, extract_sections,
    has_metadata, parse_block, remove_metadata, replace_metadata, serialize_mapping,
};

fn props(yaml: &str) -> Properties {
    parse_block(yaml).unwrap()
}

fn stacked(count: usize) -> String {
    let mut doc = String::new();
    for i in 0..count {
        doc.push_str(&format!("---\nkey{i}: {i}\n---\n"));
    }
    doc.push_str("Body\n");
    doc
}

#[test]
fn test_single_block_scenario() {
    let doc = "---\ntitle: A\n---\nBody";
    assert!(has_metadata(doc));
    let metadata = extract_metadata(doc).unwrap().unwrap();
    assert_eq!(metadata, props("title: A"));
    assert_eq!(extract_body(doc).unwrap(), "Body");
}

#[test]
fn test_no_leading_delimiter() {
    let doc = "Just some text\n---\ntitle: A\n---\n";
    assert!(!has_metadata(doc));
    assert!(extract_metadata(doc).unwrap().is_none());
    assert_eq!(extract_body(doc).unwrap(), doc);
}

#[test]
fn test_partial_delimiter_is_not_metadata() {
    assert!(!has_metadata("--\ntitle: A\n--\n"));
    assert!(!has_metadata("---title: A\n---\n"));
}

#[test]
fn test_crlf_document() {
    let doc = "---\r\ntitle: A\r\n---\r\nBody\r\n";
    let metadata = extract_metadata(doc).unwrap().unwrap();
    assert_eq!(metadata.get("title"), Some(&Value::from("A")));
    assert_eq!(extract_body(doc).unwrap(), "Body\r\n");
}

#[test]
fn test_first_block_wins_on_scalars() {
    let doc = "---\ntitle: A\n---\n---\ntitle: B\nextra: 1\n---\nBody";
    let metadata = extract_metadata(doc).unwrap().unwrap();
    assert_eq!(metadata.get("title"), Some(&Value::from("A")));
    assert_eq!(metadata.get("extra"), Some(&Value::from(1)));
    assert_eq!(extract_body(doc).unwrap(), "Body");
}

#[test]
fn test_sections_are_kept_in_document_order() {
    let doc = "---\na: 1\n---\n---\nb: 2\n---\n";
    let sections = extract_sections(doc).unwrap().unwrap();
    assert_eq!(sections, vec![props("a: 1"), props("b: 2")]);
}

#[test]
fn test_malformed_block_degrades_to_no_metadata() {
    let doc = "---\ntitle: A\n---\n---\ntags: [unclosed\n---\nBody";
    assert!(has_metadata(doc));
    assert!(extract_metadata(doc).unwrap().is_none());
    assert!(extract_sections(doc).unwrap().is_none());
    assert_eq!(extract_body(doc).unwrap(), doc);
    assert_eq!(remove_metadata(doc).unwrap(), doc);
}

#[test]
fn test_scalar_block_degrades_to_no_metadata() {
    let doc = "---\njust a sentence\n---\nBody";
    assert!(extract_metadata(doc).unwrap().is_none());
}

#[test]
fn test_empty_block_is_empty_mapping() {
    let doc = "---\n---\n---\ntitle: A\n---\nBody";
    let sections = extract_sections(doc).unwrap().unwrap();
    assert_eq!(sections.len(), 2);
    assert!(sections[0].is_empty());
    assert_eq!(
        extract_metadata(doc).unwrap().unwrap().get("title"),
        Some(&Value::from("A"))
    );
}

#[test]
fn test_duplicate_keys_in_one_block_keep_first() {
    let doc = "---\ntitle: First\ntitle: Second\n---\n";
    let metadata = extract_metadata(doc).unwrap().unwrap();
    assert_eq!(metadata.get("title"), Some(&Value::from("First")));
}

#[test]
fn test_section_ceiling() {
    assert_eq!(
        extract_sections(&stacked(MAX_SECTIONS)).unwrap().unwrap().len(),
        MAX_SECTIONS
    );

    let err = extract_metadata(&stacked(MAX_SECTIONS + 1)).unwrap_err();
    assert!(matches!(
        err,
        FrontmatterError::TooManySections { found: 101, limit: 100 }
    ));
}

#[test]
fn test_combine_unions_sequences_left_first() {
    let combined = combine_properties(&props("tags: [a, b]"), &props("tags: [b, c]"));
    assert_eq!(combined, props("tags: [a, b, c]"));
}

#[test]
fn test_combine_recurses_into_mappings() {
    let left = props("meta:\n  owner: ann\n  labels: [x]\n");
    let right = props("meta:\n  owner: bob\n  team: core\n  labels: [y]\n");
    let combined = combine_properties(&left, &right);
    assert_eq!(
        combined,
        props("meta:\n  owner: ann\n  labels: [x, y]\n  team: core\n")
    );
}

#[test]
fn test_combine_type_mismatch_keeps_left() {
    let combined = combine_properties(&props("tags: solo"), &props("tags: [a, b]"));
    assert_eq!(combined.get("tags"), Some(&Value::from("solo")));
}

#[test]
fn test_combine_all_empty() {
    assert!(combine_all(&[]).is_empty());
}

#[test]
fn test_add_metadata_to_plain_document() {
    let added = add_metadata("Body\n", &props("title: A")).unwrap();
    assert_eq!(added, "---\ntitle: A\n---\nBody\n");
}

#[test]
fn test_add_metadata_keeps_existing_values() {
    let doc = "---\ntitle: A\ntags: [x]\n---\nBody";
    let added = add_metadata(doc, &props("title: B\ntags: [y]\ndraft: true")).unwrap();
    let metadata = extract_metadata(&added).unwrap().unwrap();
    assert_eq!(metadata, props("title: A\ntags: [x, y]\ndraft: true"));
    assert_eq!(extract_body(&added).unwrap(), "Body");
}

#[test]
fn test_add_empty_metadata_is_noop() {
    let doc = "---\ntitle: A\n---\nBody";
    assert_eq!(add_metadata(doc, &Properties::new()).unwrap(), doc);
}

#[test]
fn test_replace_metadata() {
    let doc = "---\ntitle: A\n---\n---\nold: 1\n---\nBody";
    let replaced = replace_metadata(doc, Some(&props("title: B"))).unwrap();
    assert_eq!(replaced, "---\ntitle: B\n---\nBody");
}

#[test]
fn test_replace_with_nothing_removes() {
    let doc = "---\ntitle: A\n---\nBody";
    assert_eq!(replace_metadata(doc, None).unwrap(), "Body");
    assert_eq!(replace_metadata(doc, Some(&Properties::new())).unwrap(), "Body");
}

#[test]
fn test_remove_metadata_all_sections() {
    let doc = "---\na: 1\n---\n---\nb: 2\n---\n# Heading\n";
    assert_eq!(remove_metadata(doc).unwrap(), "# Heading\n");
    assert_eq!(remove_metadata("plain").unwrap(), "plain");
}

#[derive(Debug, Deserialize, PartialEq)]
struct PostMeta {
    title: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[test]
fn test_extract_as_typed() {
    let doc = "---\ntitle: Notes\n---\n---\ntags: [rust]\n---\n";
    let meta: PostMeta = extract_as(doc).unwrap().unwrap();
    assert_eq!(
        meta,
        PostMeta {
            title: "Notes".to_string(),
            tags: vec!["rust".to_string()],
        }
    );

    let missing: Option<PostMeta> = extract_as("---\ntags: [x]\n---\n").unwrap();
    assert!(missing.is_none());
}

#[test]
fn test_round_trip_supported_types() {
    let original = props(
        "title: Round Trip\ncount: 42\nratio: 1.5\ndraft: false\ndate: 2024-01-15\n\
         tags: [a, b]\nmeta:\n  owner: ann\n  nested:\n    depth: 2\n",
    );
    let text = serialize_mapping(&original).unwrap();
    assert_eq!(parse_block(&text).unwrap(), original);
}
