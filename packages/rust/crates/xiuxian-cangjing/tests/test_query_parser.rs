use xiuxian_cangjing::note::parse_note;
use xiuxian_cangjing::search::{FieldFilter, matches_predicate, parse_query};

#[test]
fn test_parse_query_classifies_every_token_once() {
    let parsed = parse_query(r#"tag:rust title:"link graph" "exact phrase" +must -never free Words"#);

    assert_eq!(
        parsed.fields,
        vec![
            FieldFilter {
                field: "tag".to_string(),
                value: "rust".to_string(),
            },
            FieldFilter {
                field: "title".to_string(),
                value: "link graph".to_string(),
            },
        ]
    );
    assert_eq!(parsed.phrases, vec!["exact phrase".to_string()]);
    assert_eq!(parsed.required, vec!["must".to_string()]);
    assert_eq!(parsed.excluded, vec!["never".to_string()]);
    assert_eq!(parsed.terms, vec!["free".to_string(), "words".to_string()]);
    assert!(!parsed.is_filter_only());
}

#[test]
fn test_parse_query_filter_only_and_empty() {
    let filter_only = parse_query("tag:todo -done");
    assert!(filter_only.is_filter_only());
    assert!(!filter_only.is_empty());

    let blank = parse_query("   ");
    assert!(blank.is_empty());
    let lone_signs = parse_query("+ -");
    assert!(lone_signs.is_empty());
}

#[test]
fn test_predicate_applies_fields_and_exclusions() {
    let doc = parse_note(
        "projects/engine.md",
        "---\ntype: design\ntags: [rust, graph/links]\nowner:\n  team: core\n---\n# Engine\n\nThe link graph drives traversal.\n",
        0,
        300,
    );

    assert!(matches_predicate(&doc, &parse_query("tag:graph")));
    assert!(matches_predicate(&doc, &parse_query("type:design in:projects")));
    assert!(matches_predicate(&doc, &parse_query("owner.team:core")));
    assert!(matches_predicate(&doc, &parse_query(r#""link graph" +traversal"#)));
    assert!(!matches_predicate(&doc, &parse_query("tag:python")));
    assert!(!matches_predicate(&doc, &parse_query("graph -traversal")));
    assert!(!matches_predicate(&doc, &parse_query(r#""graph link""#)));
}

#[test]
fn test_highlight_words_skip_single_characters() {
    let parsed = parse_query(r#"a graph "b link" +notes"#);
    assert_eq!(
        parsed.highlight_words(),
        vec!["graph".to_string(), "link".to_string(), "notes".to_string()]
    );
}
