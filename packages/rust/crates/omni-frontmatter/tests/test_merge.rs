//! Tests for merge module - strategies, grouping and the resolution memo.

use std::sync::Arc;

use omni_frontmatter::{
    CanonicalNameTable, MergeCacheMode, MergeStrategy, Properties, PropertyMerger, Value,
    parse_block,
};

fn props(yaml: &str) -> Properties {
    parse_block(yaml).unwrap()
}

fn scoped_merger() -> PropertyMerger {
    PropertyMerger::with_mode(
        Arc::new(CanonicalNameTable::builtin().clone()),
        MergeCacheMode::Scoped,
    )
}

fn keys(properties: &Properties) -> Vec<&str> {
    properties.keys().collect()
}

#[test]
fn test_none_is_identity() {
    let merger = PropertyMerger::default();
    let input = props("writer: Ann\nauthor: Bob\n");
    assert_eq!(merger.merge(&input, MergeStrategy::None), input);
    assert_eq!(merger.cache_len(), 0);
}

#[test]
fn test_conservative_unions_tag_variants() {
    let merger = PropertyMerger::default();
    let merged = merger.merge(&props("tags: [a, b]\nkeywords: [b, c]\n"), MergeStrategy::Conservative);
    assert_eq!(merged, props("tags: [a, b, c]"));
    assert_eq!(
        merged.get("tags"),
        Some(&Value::Sequence(vec![
            Value::from("a"),
            Value::from("b"),
            Value::from("c")
        ]))
    );
}

#[test]
fn test_conservative_first_key_value_wins() {
    let merger = PropertyMerger::default();
    let merged = merger.merge(&props("writer: Ann\nauthor: Bob\n"), MergeStrategy::Conservative);
    assert_eq!(merged, props("author: Ann"));
}

#[test]
fn test_conservative_renames_single_variant() {
    let merger = PropertyMerger::default();
    let merged = merger.merge(&props("summary: Short\nfoo: 1\n"), MergeStrategy::Conservative);
    assert_eq!(keys(&merged), vec!["description", "foo"]);
}

#[test]
fn test_conservative_ignores_unknown_keys() {
    let merger = PropertyMerger::default();
    let input = props("page_heading: A\ntitle: B\n");
    assert_eq!(merger.merge(&input, MergeStrategy::Conservative), input);
}

#[test]
fn test_mixed_types_are_not_merged() {
    let merger = PropertyMerger::default();
    let merged = merger.merge(&props("tags: [a]\nkeywords: b\n"), MergeStrategy::Conservative);
    assert_eq!(merged, props("tags: [a]\nkeywords: b\n"));
}

#[test]
fn test_aggressive_merges_by_category() {
    let merger = scoped_merger();
    let merged = merger.merge(&props("title: A\npage_heading: B\n"), MergeStrategy::Aggressive);
    assert_eq!(merged, props("title: A"));
}

#[test]
fn test_aggressive_merges_by_normalized_form() {
    let merger = scoped_merger();
    let merged = merger.merge(&props("foo_value: 1\nfoo: 2\n"), MergeStrategy::Aggressive);
    assert_eq!(merged, props("foo_value: 1"));
}

#[test]
fn test_aggressive_requires_a_partner() {
    let merger = scoped_merger();
    let input = props("page_heading: A\nbody_class: wide\n");
    assert_eq!(merger.merge(&input, MergeStrategy::Aggressive), input);
}

#[test]
fn test_maximum_uses_word_overlap() {
    let input = props("hero_image: a.png\nimage_cover: b.png\n");

    let merger = scoped_merger();
    assert_eq!(merger.merge(&input, MergeStrategy::Aggressive), input);
    assert_eq!(
        merger.merge(&input, MergeStrategy::Maximum),
        props("hero_image: a.png")
    );
}

#[test]
fn test_aggressive_chain_forms_one_group() {
    // alt and image are unrelated, but both are contained in image_alt
    let merger = scoped_merger();
    let merged = merger.merge(&props("alt: a\nimage: b\nimage_alt: c\n"), MergeStrategy::Aggressive);
    assert_eq!(merged, props("alt: a"));

    let keys = ["alt", "image", "image_alt"];
    let targets: Vec<String> = keys
        .iter()
        .map(|k| merger.resolve(k, MergeStrategy::Aggressive, &keys))
        .collect();
    assert_eq!(targets, vec!["alt", "alt", "alt"]);
}

#[test]
fn test_maximum_chain_forms_one_group() {
    let merger = scoped_merger();
    let input = props("cover_image: a\nimage_alt: b\nalt_text: c\n");
    assert_eq!(
        merger.merge(&input, MergeStrategy::Aggressive),
        props("cover_image: a\nimage_alt: b\n")
    );
    assert_eq!(
        merger.merge(&input, MergeStrategy::Maximum),
        props("cover_image: a")
    );
}

#[test]
fn test_single_sequence_is_deduplicated() {
    let merger = PropertyMerger::default();
    let merged = merger.merge(&props("tags: [a, a, b]\nfoo: [x, x]\n"), MergeStrategy::Conservative);
    assert_eq!(merged, props("tags: [a, b]\nfoo: [x]\n"));

    let input = props("tags: [a, a]");
    assert_eq!(merger.merge(&input, MergeStrategy::None), input);
}

#[test]
fn test_maximum_unrelated_keys_stay() {
    let merger = scoped_merger();
    let input = props("alpha: 1\nbeta: 2\n");
    assert_eq!(merger.merge(&input, MergeStrategy::Maximum), input);
}

#[test]
fn test_strategy_monotonicity() {
    let input = props(
        "writer: Ann\nauthor: Bob\ntags: [a]\nkeywords: [b]\npage_heading: H\ntitle: T\n\
         summary: S\nhero_image: x\nimage_cover: y\n",
    );
    let names: Vec<&str> = input.keys().collect();
    let merger = scoped_merger();

    let strategies = [
        MergeStrategy::Conservative,
        MergeStrategy::Aggressive,
        MergeStrategy::Maximum,
    ];
    for (weaker_idx, weaker) in strategies.iter().enumerate() {
        for stronger in &strategies[weaker_idx..] {
            for a in &names {
                for b in &names {
                    let merged_weak = merger.resolve(a, *weaker, &names)
                        == merger.resolve(b, *weaker, &names);
                    let merged_strong = merger.resolve(a, *stronger, &names)
                        == merger.resolve(b, *stronger, &names);
                    assert!(
                        !merged_weak || merged_strong,
                        "{a} and {b} merged under {weaker} but not under {stronger}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_merge_does_not_mutate_input() {
    let merger = PropertyMerger::default();
    let input = props("writer: Ann\nauthor: Bob\n");
    let snapshot = input.clone();
    let _ = merger.merge(&input, MergeStrategy::Maximum);
    assert_eq!(input, snapshot);
    assert_eq!(keys(&input), vec!["writer", "author"]);
}

#[test]
fn test_sticky_memo_leaks_first_resolution() {
    let input = props("title: A\npage_heading: B\n");

    let sticky = PropertyMerger::default();
    assert_eq!(sticky.mode(), MergeCacheMode::Sticky);
    let _ = sticky.merge(&input, MergeStrategy::Conservative);
    // page_heading was memoized as itself under Conservative
    assert_eq!(sticky.merge(&input, MergeStrategy::Aggressive), input);

    sticky.clear();
    assert_eq!(sticky.cache_len(), 0);
    assert_eq!(
        sticky.merge(&input, MergeStrategy::Aggressive),
        props("title: A")
    );
}

#[test]
fn test_scoped_memo_is_per_call() {
    let input = props("title: A\npage_heading: B\n");
    let merger = scoped_merger();
    let _ = merger.merge(&input, MergeStrategy::Conservative);
    assert_eq!(
        merger.merge(&input, MergeStrategy::Aggressive),
        props("title: A")
    );
    assert_eq!(merger.cache_len(), 2);
}

#[test]
fn test_custom_table() {
    use omni_frontmatter::{NameCategory, NameGroup};

    let table = CanonicalNameTable::from_groups(&[NameGroup {
        category: NameCategory::Author,
        canonical: "maintainer",
        variants: &["owner", "steward"],
    }])
    .unwrap();
    let merger = PropertyMerger::new(Arc::new(table));
    let merged = merger.merge(&props("owner: Ann\nsteward: Bob\n"), MergeStrategy::Conservative);
    assert_eq!(merged, props("maintainer: Ann"));
}

#[test]
fn test_conflicting_table_is_rejected() {
    use omni_frontmatter::{FrontmatterError, NameCategory, NameGroup};

    let result = CanonicalNameTable::from_groups(&[
        NameGroup {
            category: NameCategory::Title,
            canonical: "title",
            variants: &["name"],
        },
        NameGroup {
            category: NameCategory::Author,
            canonical: "author",
            variants: &["Name"],
        },
    ]);
    assert!(matches!(
        result,
        Err(FrontmatterError::ConflictingVariant { ref variant, .. }) if variant == "name"
    ));
}
