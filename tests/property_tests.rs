//! Property-based tests for discovery and the result stream
//!
//! These tests use proptest to verify invariants across many randomly
//! generated inputs.

use std::collections::BTreeSet;
use std::path::Path;

use casper_adapter::config::ProtocolConfig;
use casper_adapter::discovery::{CallPattern, TestCase, discover_source};
use casper_adapter::execution::{ResultStreamParser, StreamEvent};
use proptest::prelude::*;

// =============================================================================
// Discovery Properties
// =============================================================================

fn suite_source(names: &[String]) -> String {
    let mut source = String::from("// generated suite\n");
    for name in names {
        source.push_str(&format!("casper.test.begin('{}', function (test) {{ test.done(); }});\n", name));
    }
    source
}

proptest! {
    /// N declarations with distinct literal names yield exactly N cases at their lines
    #[test]
    fn discovery_finds_every_declaration(names in prop::collection::btree_set("[a-z][a-z0-9 ]{0,15}[a-z0-9]", 0..8)) {
        let names: Vec<String> = names.into_iter().collect();
        let source = suite_source(&names);
        let cases = discover_source(Path::new("suite.js"), &source, &CallPattern::default()).unwrap();

        prop_assert_eq!(cases.len(), names.len());
        for (i, (case, name)) in cases.iter().zip(&names).enumerate() {
            prop_assert_eq!(&case.display_name, name);
            prop_assert_eq!(case.line, i + 2);
        }
    }

    /// Re-running discovery on unchanged text gives identical output
    #[test]
    fn discovery_is_idempotent(names in prop::collection::vec("[a-z ]{1,12}", 0..6)) {
        let source = suite_source(&names);
        let first = discover_source(Path::new("suite.js"), &source, &CallPattern::default());
        let second = discover_source(Path::new("suite.js"), &source, &CallPattern::default());
        prop_assert_eq!(first, second);
    }
}

// =============================================================================
// Result Stream Properties
// =============================================================================

fn protocol_line() -> impl Strategy<Value = String> {
    prop_oneof![
        "(alpha|beta|gamma|delta)".prop_map(|n| format!("# {}", n)),
        "[a-z]{1,8}".prop_map(|s| format!("FAIL {}", s)),
        "[a-z ]{0,20}",
        Just("CasperError: boom".to_string()),
        Just("PASS".to_string()),
    ]
}

proptest! {
    /// Every reported case belongs to the group, and no case is reported more often than its
    /// marker appears
    #[test]
    fn parser_never_fabricates_cases(lines in prop::collection::vec(protocol_line(), 0..40)) {
        let known: Vec<TestCase> = ["alpha", "gamma"]
            .iter()
            .enumerate()
            .map(|(i, n)| TestCase::new("suite.js", *n, i + 1, 0))
            .collect();
        let mut parser = ResultStreamParser::new(known.clone(), ProtocolConfig::default());

        let mut finished = Vec::new();
        let mut started = 0usize;
        for line in &lines {
            for event in parser.feed(line) {
                match event {
                    StreamEvent::Started(case) => {
                        prop_assert!(known.contains(&case));
                        started += 1;
                    }
                    StreamEvent::Finished(result) => finished.push(result),
                }
            }
        }
        let outcome = parser.finish();
        finished.extend(outcome.last_result);

        let markers = lines
            .iter()
            .take_while(|l| !l.contains("CasperError"))
            .filter(|l| *l == "# alpha" || *l == "# gamma")
            .count();
        prop_assert_eq!(started, markers);
        prop_assert_eq!(finished.len(), markers);
        let names: BTreeSet<&str> = finished.iter().map(|r| r.test_case.display_name.as_str()).collect();
        prop_assert!(names.is_subset(&["alpha", "gamma"].into_iter().collect()));
        prop_assert_eq!(
            outcome.execution_error.is_some(),
            lines.iter().any(|l| l.contains("CasperError"))
        );
    }
}
