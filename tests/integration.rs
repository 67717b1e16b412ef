//! Integration tests for bibsweep.

use bibsweep::config::{Action, PatternType, Severity, Target};
use bibsweep::{bbl, bibtex, Entry, SweepConfig, Sweeper, SweeperError};
use std::collections::HashSet;
use std::fs;

fn doe2020() -> Entry {
    Entry::new("article", "doe2020")
        .with_field("title", "a study of nasa")
        .with_field("author", "J. Doe")
        .with_field("note", "draft")
}

// =============================================================================
// Configuration Parsing Tests
// =============================================================================

#[test]
fn test_parse_minimal_config() {
    let yaml = r#"
version: "1"
rules: []
"#;
    let config: SweepConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.version, "1");
    assert!(config.rules.is_empty());
    assert!(config.settings.expand_opt_fields);
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
version: "1"
settings:
  type_aliases:
    inproceedings: [conference]
  allow_fields:
    all: [title, author, year]
  deny_fields: [abstract]
  required:
    all: [[author, organization], title]
  missing_required: exclude
  duplicate_keys: exclude
  checks:
    year_in_booktitle: false
  et_al:
    threshold: 3
    ieee_mode: true

rules:
  - name: "lower-keys"
    description: "Normalize citation keys"
    target: key
    action: lowercase
  - name: "fix-pages"
    enabled: false
    match:
      entry_types: [article, inproceedings]
      field:
        pattern: "pages"
      when:
        - name: year
          matches: "^20"
    action:
      substitute:
        pattern: "-+"
        replacement: "--"
    on_failure: exclude
    must_match: true
"#;
    let config: SweepConfig = serde_yaml::from_str(yaml).unwrap();
    let settings = &config.settings;
    assert_eq!(settings.type_aliases["inproceedings"], vec!["conference"]);
    assert_eq!(settings.missing_required, Severity::Exclude);
    assert_eq!(settings.duplicate_keys, Severity::Exclude);
    assert!(settings.checks.et_al_in_author);
    assert!(!settings.checks.year_in_booktitle);
    assert_eq!(settings.et_al.threshold, 3);
    assert!(settings.et_al.ieee_mode);

    assert_eq!(config.rules.len(), 2);
    assert_eq!(config.rules[0].target, Target::Key);
    assert_eq!(config.rules[0].action, Action::Lowercase);
    let fix_pages = &config.rules[1];
    assert!(!fix_pages.enabled);
    assert!(fix_pages.must_match);
    assert_eq!(fix_pages.on_failure, Severity::Exclude);
    assert_eq!(fix_pages.matcher.when.len(), 1);

    assert!(Sweeper::new(config).is_ok());
}

#[test]
fn test_parse_json_config() {
    let json_str = r#"{
        "version": "1",
        "rules": [
            {
                "name": "json-rule",
                "match": {
                    "field": {
                        "pattern": "^(journal|booktitle)$",
                        "type": "regex"
                    }
                },
                "action": {"protect_acronyms": {"acronyms": ["IEEE"]}}
            }
        ]
    }"#;
    let config: SweepConfig = serde_json::from_str(json_str).unwrap();
    assert_eq!(config.rules.len(), 1);
    assert_eq!(config.rules[0].name, "json-rule");
    let field = config.rules[0].matcher.field.as_ref().unwrap();
    assert_eq!(field.pattern_type, PatternType::Regex);
}

#[test]
fn test_invalid_config_fails_before_processing() {
    let bad_regex = r#"
rules:
  - name: "ok"
    action: strip_whitespace
  - name: "bad-pattern"
    match:
      field: { pattern: "[", type: regex }
    action: drop
"#;
    let err = Sweeper::from_yaml(bad_regex).unwrap_err();
    assert!(matches!(err, SweeperError::Rule(_)));
    assert!(err.to_string().contains("bad-pattern"));

    let field_action_on_key = r#"
rules:
  - name: "rename-key"
    target: key
    action: { rename: { to: id } }
"#;
    let err = Sweeper::from_yaml(field_action_on_key).unwrap_err();
    assert!(err.to_string().contains("rename-key"));

    let empty_rename = r#"
rules:
  - name: "empty-rename"
    match: { field: { pattern: year } }
    action: { rename: { to: "" } }
"#;
    assert!(Sweeper::from_yaml(empty_rename).is_err());

    let unknown_action = r#"
rules:
  - name: "mystery"
    action: { reverse: {} }
"#;
    assert!(matches!(
        Sweeper::from_yaml(unknown_action),
        Err(SweeperError::Yaml(_))
    ));
}

// =============================================================================
// End-to-End Tests
// =============================================================================

#[test]
fn test_end_to_end_protect_and_drop() {
    let sweeper = Sweeper::from_yaml(
        r#"
rules:
  - name: "protect-nasa"
    match:
      field: { pattern: title }
    action:
      protect_acronyms: { acronyms: [NASA] }
  - name: "drop-note"
    match:
      field: { pattern: note }
    action: drop
"#,
    )
    .unwrap();

    let entries = bibtex::read_entries(
        "@article{doe2020, title={a study of nasa}, author={J. Doe}, note={draft}}",
    )
    .unwrap();
    let report = sweeper.sweep(entries);

    assert!(report.is_clean());
    assert_eq!(report.entries.len(), 1);
    let entry = &report.entries[0];
    assert_eq!(entry.key, "doe2020");
    assert_eq!(entry.entry_type, "article");
    assert_eq!(entry.get("title"), Some("a study of {NASA}"));
    assert_eq!(entry.get("author"), Some("J. Doe"));
    assert!(!entry.has("note"));

    let out = bibtex::write_entries(&report.entries);
    assert!(out.starts_with("@article{doe2020,\n"));
    assert!(out.contains("  title = {a study of {NASA}},\n"));
    assert!(!out.contains("note"));
}

#[test]
fn test_acronym_survives_lowercase() {
    let sweeper = Sweeper::from_yaml(
        r#"
rules:
  - name: "protect"
    match: { field: { pattern: title } }
    action: { protect_acronyms: { acronyms: [NASA, SDRAM] } }
  - name: "lower"
    match: { field: { pattern: title } }
    action: lowercase
"#,
    )
    .unwrap();

    let entry = Entry::new("article", "k").with_field("title", "A Study of NASA Systems and SDRAMs");
    let report = sweeper.sweep(vec![entry]);
    assert_eq!(
        report.entries[0].get("title"),
        Some("a study of {NASA} systems and {SDRAM}s")
    );
}

#[test]
fn test_sweep_is_idempotent() {
    let sweeper = Sweeper::from_yaml(
        r#"
settings:
  type_aliases:
    inproceedings: [conference]
  deny_fields: [abstract]
  et_al: { threshold: 2 }
rules:
  - name: "ws"
    action: strip_whitespace
  - name: "acronyms"
    match: { field: { pattern: "*title", type: glob } }
    action: { protect_acronyms: { acronyms: [DATE], detect_all_caps: true } }
  - name: "pages"
    match: { field: { pattern: pages } }
    action: { substitute: { pattern: "\\s*-+\\s*", replacement: "--" } }
  - name: "short-title"
    match: { field: { pattern: title } }
    action: { truncate: { max_chars: 24, ellipsis: "..." } }
  - name: "lower-keys"
    target: key
    action: lowercase
"#,
    )
    .unwrap();

    let entries = vec![
        Entry::new("conference", "Roe2021")
            .with_field("title", "  Fast   DRAM Refresh for Large Memory Systems ")
            .with_field("booktitle", "Proc. of DATE")
            .with_field("author", "A. Roe and B. Poe and C. Moe")
            .with_field("optpages", "1 - 10")
            .with_field("abstract", "long text"),
        doe2020(),
    ];

    let once = sweeper.sweep(entries);
    let twice = sweeper.sweep(once.entries.clone());
    assert_eq!(once.entries, twice.entries);

    let roe = &once.entries[0];
    assert_eq!(roe.key, "roe2021");
    assert_eq!(roe.entry_type, "inproceedings");
    assert_eq!(roe.get("pages"), Some("1--10"));
    assert_eq!(roe.get("booktitle"), Some("Proc. of {DATE}"));
    assert!(!roe.has("abstract"));
    assert_eq!(roe.get("author"), Some(r"A. Roe and B. Poe~{\it{et al.}}"));
}

#[test]
fn test_truncate_then_protect_is_idempotent() {
    let sweeper = Sweeper::from_json(
        r#"{"rules": [
            {"name": "short-title", "match": {"field": {"pattern": "title"}},
             "action": {"truncate": {"max_chars": 8, "ellipsis": "..."}}},
            {"name": "acronyms", "match": {"field": {"pattern": "title"}},
             "action": {"protect_acronyms": {"acronyms": ["NASA"]}}},
            {"name": "short-publisher", "match": {"field": {"pattern": "publisher"}},
             "action": {"truncate": {"max_chars": 8}}},
            {"name": "publisher", "match": {"field": {"pattern": "publisher"}},
             "action": "protect"}
        ]}"#,
    )
    .unwrap();

    let entry = Entry::new("book", "k")
        .with_field("title", "abc nasa defgh")
        .with_field("publisher", "IEEE Computer Society");
    let once = sweeper.sweep(vec![entry]);
    let twice = sweeper.sweep(once.entries.clone());
    assert_eq!(once.entries, twice.entries);
    assert_eq!(once.entries[0].get("title"), Some("abc {NASA}..."));
    assert_eq!(once.entries[0].get("publisher"), Some("{IEEE Com}"));
}

#[test]
fn test_output_keys_subset_of_input() {
    let sweeper = Sweeper::from_yaml(
        r#"
settings:
  required:
    all: [year]
  missing_required: exclude
rules:
  - name: "drop-note"
    match: { field: { pattern: note } }
    action: drop
"#,
    )
    .unwrap();

    let entries = vec![
        doe2020(),
        Entry::new("book", "roe2021").with_field("year", "2021"),
        Entry::new("misc", "poe2019").with_field("year", "2019"),
    ];
    let input: HashSet<String> = entries.iter().map(|e| e.key.clone()).collect();
    let report = sweeper.sweep(entries);

    assert!(report
        .entries
        .iter()
        .all(|e| input.contains(&e.key)));
    assert_eq!(report.excluded, vec!["doe2020".to_string()]);
    assert_eq!(report.entries.len(), 2);
}

// =============================================================================
// Field Filtering Tests
// =============================================================================

#[test]
fn test_allow_list_removes_other_fields() {
    let sweeper = Sweeper::from_yaml(
        r#"
settings:
  allow_fields:
    all: [title, author, year]
"#,
    )
    .unwrap();
    let report = sweeper.sweep(vec![doe2020().with_field("year", "2020")]);
    let entry = &report.entries[0];
    assert!(!entry.has("note"));
    assert_eq!(
        entry.fields.names().collect::<Vec<_>>(),
        vec!["title", "author", "year"]
    );
}

#[test]
fn test_deny_list_wins_over_allow_list() {
    let sweeper = Sweeper::from_yaml(
        r#"
settings:
  allow_fields:
    article: [title, author, note]
  deny_fields: [note]
"#,
    )
    .unwrap();
    let report = sweeper.sweep(vec![doe2020()]);
    assert!(!report.entries[0].has("note"));
    assert!(report.entries[0].has("title"));
}

#[test]
fn test_rename_and_set() {
    let sweeper = Sweeper::from_yaml(
        r#"
rules:
  - name: "journal-name"
    match:
      entry_types: [article]
      field: { pattern: journaltitle }
    action: { rename: { to: journal } }
  - name: "ids"
    match:
      field: { pattern: ids }
      when:
        - name: year
          present: true
    action: { set: { value: "${key}-${field.year}" } }
"#,
    )
    .unwrap();

    let entry = Entry::new("article", "doe2020")
        .with_field("journaltitle", "Nature")
        .with_field("year", "2020");
    let report = sweeper.sweep(vec![entry, doe2020()]);

    let first = &report.entries[0];
    assert_eq!(first.get("journal"), Some("Nature"));
    assert!(!first.has("journaltitle"));
    assert_eq!(first.get("ids"), Some("doe2020-2020"));
    // No year, so the condition does not select the entry.
    assert!(!report.entries[1].has("ids"));
}

// =============================================================================
// Consistency Check Tests
// =============================================================================

#[test]
fn test_duplicate_keys_after_normalization() {
    let sweeper = Sweeper::from_yaml(
        r#"
rules:
  - name: "lower-keys"
    target: key
    action: lowercase
"#,
    )
    .unwrap();

    let entries = vec![doe2020(), Entry::new("misc", "DOE2020")];
    let report = sweeper.sweep(entries);
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].message.contains("duplicate citation key"));
    assert!(report.warnings[0].to_string().starts_with("entry doe2020"));
}

#[test]
fn test_duplicate_keys_excluded() {
    let sweeper = Sweeper::from_yaml("settings: { duplicate_keys: exclude }").unwrap();
    let entries = vec![
        doe2020(),
        Entry::new("misc", "Doe2020"),
        Entry::new("misc", "roe2021"),
    ];
    let report = sweeper.sweep(entries);
    assert_eq!(
        report.entries.iter().map(|e| e.key.as_str()).collect::<Vec<_>>(),
        vec!["doe2020", "roe2021"]
    );
    assert_eq!(report.excluded, vec!["Doe2020".to_string()]);
}

#[test]
fn test_rule_failure_policies() {
    let sweeper = Sweeper::from_yaml(
        r#"
rules:
  - name: "need-journal"
    match:
      entry_types: [article]
      field: { pattern: journal }
    action: require
    on_failure: exclude
  - name: "need-year"
    match: { field: { pattern: year } }
    action: require
"#,
    )
    .unwrap();

    let entries = vec![
        doe2020(),
        Entry::new("article", "roe2021").with_field("journal", "Nature"),
    ];
    let report = sweeper.sweep(entries);

    assert_eq!(report.excluded, vec!["doe2020".to_string()]);
    assert_eq!(report.entries.len(), 1);

    let roe: Vec<_> = report.warnings_for("roe2021").collect();
    assert_eq!(roe.len(), 1);
    assert_eq!(roe[0].rule.as_deref(), Some("need-year"));
    assert_eq!(roe[0].message, "missing required field `year`");
}

#[test]
fn test_lint_checks_can_be_disabled() {
    let entry = Entry::new("inproceedings", "k")
        .with_field("author", "Doe, J. et al.")
        .with_field("booktitle", "Proc. ISCA '95");

    let report = Sweeper::new(SweepConfig::default())
        .unwrap()
        .sweep(vec![entry.clone()]);
    assert_eq!(report.warnings.len(), 2);

    let quiet = Sweeper::from_yaml(
        r#"
settings:
  checks: { et_al_in_author: false, year_in_booktitle: false }
"#,
    )
    .unwrap();
    assert!(quiet.sweep(vec![entry]).is_clean());
}

// =============================================================================
// File I/O Tests
// =============================================================================

#[test]
fn test_config_from_path() {
    let dir = tempfile::tempdir().unwrap();

    let yaml_path = dir.path().join("rules.yml");
    fs::write(&yaml_path, "rules: [{name: lower, action: lowercase}]").unwrap();
    assert_eq!(Sweeper::from_path(&yaml_path).unwrap().config().rules.len(), 1);

    let json_path = dir.path().join("refs.bib_config.json");
    fs::write(&json_path, r#"{"settings": {"deny_fields": ["note"]}}"#).unwrap();
    let sweeper = Sweeper::from_path(&json_path).unwrap();
    assert_eq!(sweeper.config().settings.deny_fields, vec!["note"]);

    let missing = dir.path().join("missing.yaml");
    assert!(matches!(
        Sweeper::from_path(&missing),
        Err(SweeperError::Io { .. })
    ));
}

#[test]
fn test_bib_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("refs.bib");
    let output = dir.path().join("out.bib");
    fs::write(
        &input,
        r#"
@article{doe2020,
  title = {A Study of {NASA} Systems},
  author = {Doe, John},
  year = {2020},
}
"#,
    )
    .unwrap();

    let entries = bibtex::read_file(&input).unwrap();
    let report = Sweeper::new(SweepConfig::default()).unwrap().sweep(entries);
    bibtex::write_file(&output, &report.entries).unwrap();

    let written = bibtex::read_file(&output).unwrap();
    assert_eq!(written, report.entries);
    assert_eq!(written[0].get("title"), Some("A Study of {NASA} Systems"));
}

#[test]
fn test_bib_file_keeps_latex_source() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("refs.bib");
    let output = dir.path().join("out.bib");
    fs::write(
        &input,
        r#"@book{k,
  title = {The {\LaTeX} Companion and {\"U}bersicht},
  author = {G{\"o}del, Kurt},
  publisher = "Addison {\&} Wesley",
}
"#,
    )
    .unwrap();

    let sweeper = Sweeper::from_yaml(
        r#"
rules:
  - name: "lower"
    match: { field: { pattern: title } }
    action: lowercase
"#,
    )
    .unwrap();
    let report = sweeper.sweep(bibtex::read_file(&input).unwrap());
    let entry = &report.entries[0];
    assert_eq!(
        entry.get("title"),
        Some(r#"the {\LaTeX} companion and {\"U}bersicht"#)
    );
    assert_eq!(entry.get("author"), Some(r#"G{\"o}del, Kurt"#));
    assert_eq!(entry.get("publisher"), Some(r"Addison {\&} Wesley"));

    bibtex::write_file(&output, &report.entries).unwrap();
    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains(r#"author = {G{\"o}del, Kurt},"#));
    assert_eq!(bibtex::read_file(&output).unwrap(), report.entries);
}

#[test]
fn test_bbl_restricts_entries() {
    let dir = tempfile::tempdir().unwrap();
    let bbl_path = dir.path().join("paper.bbl");
    fs::write(
        &bbl_path,
        "\\begin{thebibliography}{1}\n\\bibitem[Doe(2020)]{doe2020}\nJ. Doe.\n\\end{thebibliography}\n",
    )
    .unwrap();

    let cited = bbl::read_bbl(&bbl_path).unwrap();
    let sweeper = Sweeper::new(SweepConfig::default()).unwrap();
    let report = sweeper.sweep_cited(
        vec![doe2020(), Entry::new("misc", "roe2021")],
        &cited,
    );
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].key, "doe2020");
}
