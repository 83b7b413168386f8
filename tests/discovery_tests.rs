//! Discovery through the public API

use std::fs;
use std::path::{Path, PathBuf};

use casper_adapter::config::DiscoveryConfig;
use casper_adapter::discovery::{CallPattern, DiscoveryError, TestCase, collect_source_files, discover};
use tempfile::TempDir;

fn write(dir: &Path, rel: &str, text: &str) -> PathBuf {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, text).unwrap();
    path
}

const LOGIN_SUITE: &str = r#"// login.js
var helpers = require('./lib/helpers');

casper.options.waitTimeout = 5000;
casper.test.begin('adds two numbers', function (test) {
    test.assertEquals(1 + 1, 2);
    test.done();
});

casper.test.begin("shows the dashboard", 3, {
    setUp: function () {},
    test: function (test) { test.done(); }
});
"#;

#[test]
fn declarations_are_found_with_their_lines() {
    let dir = TempDir::new().unwrap();
    let file = write(dir.path(), "login.js", LOGIN_SUITE);

    let report = discover(&[file.clone()], &CallPattern::default());
    assert!(report.errors.is_empty());
    let found: Vec<(&str, usize)> = report
        .cases
        .iter()
        .map(|c| (c.display_name.as_str(), c.line))
        .collect();
    assert_eq!(found, vec![("adds two numbers", 5), ("shows the dashboard", 10)]);
    assert!(report.cases.iter().all(|c| c.source_file == file));
}

#[test]
fn rediscovery_is_identical() {
    let dir = TempDir::new().unwrap();
    let file = write(dir.path(), "login.js", LOGIN_SUITE);
    let first = discover(&[file.clone()], &CallPattern::default()).cases;
    let second = discover(&[file], &CallPattern::default()).cases;
    assert_eq!(first, second);
}

#[test]
fn one_invalid_file_yields_one_error_and_others_still_discovered() {
    let dir = TempDir::new().unwrap();
    let bad = write(dir.path(), "a_bad.js", "casper.test.begin('x', function () {});\nvar 1 = 2;\n");
    let good = write(dir.path(), "b_good.js", LOGIN_SUITE);

    let report = discover(&[bad.clone(), good], &CallPattern::default());
    assert_eq!(report.cases.len(), 2);
    assert_eq!(report.errors.len(), 1);
    match &report.errors[0] {
        DiscoveryError::Parse { path, error, .. } => {
            assert_eq!(path, &bad);
            assert_eq!(error.line, 2);
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
    assert!(report.errors[0].to_string().contains("a_bad.js"));
}

#[test]
fn deeply_nested_file_is_an_error_not_a_crash() {
    let dir = TempDir::new().unwrap();
    let depth = 10_000;
    let deep = write(
        dir.path(),
        "a_deep.js",
        &format!("casper.test.begin('x');\nvar data = {}1{};\n", "[".repeat(depth), "]".repeat(depth)),
    );
    let good = write(dir.path(), "b_good.js", LOGIN_SUITE);

    let report = discover(&[deep.clone(), good], &CallPattern::default());
    assert_eq!(report.cases.len(), 2);
    assert_eq!(report.errors.len(), 1);
    match &report.errors[0] {
        DiscoveryError::Parse { path, error, .. } => {
            assert_eq!(path, &deep);
            assert_eq!(error.line, 2);
            assert_eq!(error.description, "Nesting too deep");
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn configured_pattern_is_used() {
    let config = DiscoveryConfig {
        call_path: "casper.test.suite".into(),
        argument_index: 1,
        extensions: vec!["js".into()],
    };
    let pattern = config.call_pattern().unwrap();
    assert_eq!(pattern.to_string(), "casper.test.suite");

    let dir = TempDir::new().unwrap();
    let file = write(
        dir.path(),
        "custom.js",
        "casper.test.suite(1, 'second argument');\ncasper.test.begin('default shape');\n",
    );
    let report = discover(&[file], &pattern);
    assert_eq!(report.cases.len(), 1);
    assert_eq!(report.cases[0].display_name, "second argument");
}

#[test]
fn directory_collection_feeds_discovery() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "suite/login.js", LOGIN_SUITE);
    write(dir.path(), "suite/lib/helpers.js", "module.exports = {};\n");
    write(dir.path(), "node_modules/casper/index.js", LOGIN_SUITE);

    let sources = collect_source_files(dir.path(), &["js".to_string()]);
    assert_eq!(sources.len(), 2);
    let report = discover(&sources, &CallPattern::default());
    assert_eq!(report.cases.len(), 2);
}

#[test]
fn test_case_json_shape() {
    let case = TestCase::new("suite/login.js", "adds two numbers", 5, 0);
    insta::assert_snapshot!(serde_json::to_string_pretty(&case).unwrap(), @r#"
    {
      "id": "suite/login.js::adds two numbers",
      "display_name": "adds two numbers",
      "source_file": "suite/login.js",
      "line": 5,
      "column": 0
    }
    "#);
}
