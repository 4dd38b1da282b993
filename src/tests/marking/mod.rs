// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! YAML-driven marking tests.
//!
//! Each case embeds a program (entities and units, in the same shape the
//! front end serializes) and lists the expected verdicts. Cases run with
//! `default_mode: on` unless they carry their own options, so violations
//! are reported.

use crate::diagnostics::{Anchor, Diagnostic, DiagnosticKind, Diagnostics};
use crate::marking::{mark_program, MarkingOptions, MarkingResult};
use crate::program::{EntityId, Program, SubsetMode};

use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use test_generator::test_resources;

#[derive(Debug, Deserialize)]
struct YamlTest {
    cases: Vec<TestCase>,
}

#[derive(Debug, Deserialize)]
struct TestCase {
    note: String,
    #[serde(default)]
    options: Option<serde_yaml::Value>,
    program: serde_yaml::Value,
    #[serde(default)]
    in_subset: Vec<String>,
    #[serde(default)]
    not_in_subset: Vec<String>,
    #[serde(default)]
    body_in_subset: Vec<String>,
    #[serde(default)]
    body_not_in_subset: Vec<String>,
    #[serde(default)]
    ordered: Option<Vec<String>>,
    #[serde(default)]
    full_view_hidden: Vec<String>,
    #[serde(default)]
    rejected_aspects: Vec<String>,
    #[serde(default)]
    diagnostics: Vec<DiagnosticExpectation>,
    /// Fail on any diagnostic that is not listed.
    #[serde(default)]
    exact_diagnostics: bool,
    #[serde(default)]
    want_error: Option<String>,
    #[serde(default)]
    skip: bool,
}

#[derive(Debug, Deserialize)]
struct DiagnosticExpectation {
    #[serde(default)]
    violation: Option<String>,
    #[serde(default)]
    unsupported: Option<String>,
    #[serde(default)]
    warning: Option<String>,
    /// Entity the report is attached to.
    #[serde(default)]
    at: Option<String>,
    /// Line of the report.
    #[serde(default)]
    line: Option<u32>,
    /// Entity named by the root cause.
    #[serde(default)]
    root_cause: Option<String>,
    #[serde(default)]
    root_line: Option<u32>,
}

/// Category and snake_case name of a diagnostic.
fn describe(diagnostic: &Diagnostic) -> Result<(&'static str, String)> {
    let (category, tag, value) = match &diagnostic.kind {
        DiagnosticKind::Violation(kind) => ("violation", "kind", serde_json::to_value(kind)?),
        DiagnosticKind::Unsupported(feature) => {
            ("unsupported", "feature", serde_json::to_value(feature)?)
        }
        DiagnosticKind::Warning(warning) => {
            ("warning", "warning", serde_json::to_value(warning)?)
        }
    };
    match value[tag].as_str() {
        Some(name) => Ok((category, name.to_string())),
        None => bail!("diagnostic without a `{tag}` tag: {value}"),
    }
}

fn anchor_matches(anchor: &Anchor, entity: &Option<String>, line: &Option<u32>) -> bool {
    let entity_ok = match entity {
        Some(name) => anchor.entity_id().map(|e| e.as_str()) == Some(name.as_str()),
        None => true,
    };
    let line_ok = match line {
        Some(line) => anchor.loc().line == *line,
        None => true,
    };
    entity_ok && line_ok
}

fn matches_expectation(diagnostic: &Diagnostic, expected: &DiagnosticExpectation) -> Result<bool> {
    let (category, name) = describe(diagnostic)?;
    let wanted = match category {
        "violation" => &expected.violation,
        "unsupported" => &expected.unsupported,
        _ => &expected.warning,
    };
    if wanted.as_deref() != Some(name.as_str()) {
        return Ok(false);
    }
    if !anchor_matches(&diagnostic.at, &expected.at, &expected.line) {
        return Ok(false);
    }
    if expected.root_cause.is_some() || expected.root_line.is_some() {
        return Ok(match &diagnostic.root_cause {
            Some(cause) => anchor_matches(cause, &expected.root_cause, &expected.root_line),
            None => false,
        });
    }
    Ok(true)
}

fn check_diagnostics(case: &TestCase, diagnostics: &Diagnostics) -> Result<()> {
    let reported: Vec<&Diagnostic> = diagnostics.iter().collect();
    let mut used = alloc::vec![false; reported.len()];

    for expected in &case.diagnostics {
        let mut found = false;
        for (idx, diagnostic) in reported.iter().enumerate() {
            if !used[idx] && matches_expectation(diagnostic, expected)? {
                used[idx] = true;
                found = true;
                break;
            }
        }
        if !found {
            bail!("missing diagnostic {expected:?}\nreported: {reported:#?}");
        }
    }

    if case.exact_diagnostics {
        let extra: Vec<_> = reported
            .iter()
            .zip(&used)
            .filter(|(_, used)| !**used)
            .map(|(d, _)| *d)
            .collect();
        if !extra.is_empty() {
            bail!("unexpected diagnostics: {extra:#?}");
        }
    }
    Ok(())
}

fn check_verdicts(case: &TestCase, result: &MarkingResult) -> Result<()> {
    let id = |name: &String| EntityId::new(name);
    for name in &case.in_subset {
        if !result.in_subset(&id(name)) {
            bail!("`{name}` should be in the subset (root cause {:?})", result.root_cause(&id(name)));
        }
    }
    for name in &case.not_in_subset {
        if result.in_subset(&id(name)) {
            bail!("`{name}` should not be in the subset");
        }
    }
    for name in &case.body_in_subset {
        if !result.body_in_subset(&id(name)) {
            bail!(
                "body of `{name}` should be in the subset (root cause {:?})",
                result.body_root_cause(&id(name))
            );
        }
    }
    for name in &case.body_not_in_subset {
        if result.body_in_subset(&id(name)) {
            bail!("body of `{name}` should not be in the subset");
        }
    }
    for name in &case.full_view_hidden {
        if !result.full_view_hidden(&id(name)) {
            bail!("full view of `{name}` should be hidden");
        }
    }
    for name in &case.rejected_aspects {
        if !result.has_rejected_aspects(&id(name)) {
            bail!("aspects of `{name}` should be rejected");
        }
    }
    if let Some(ordered) = &case.ordered {
        let computed: Vec<&str> = result
            .ordered_entities()
            .iter()
            .map(|e| e.as_str())
            .collect();
        if computed != *ordered {
            bail!("ordered entities differ\nexpected: {ordered:?}\ncomputed: {computed:?}");
        }
    }
    Ok(())
}

fn run_case(case: &TestCase) -> Result<()> {
    let options = match &case.options {
        Some(options) => MarkingOptions::from_yaml_str(&serde_yaml::to_string(options)?)?,
        None => MarkingOptions::default().with_default_mode(SubsetMode::On),
    };
    let program = Program::from_yaml_str(&serde_yaml::to_string(&case.program)?)?;

    let mut diagnostics = Diagnostics::new();
    let result = mark_program(&program, &options, &mut diagnostics);

    match (&case.want_error, result) {
        (Some(want), Err(e)) => {
            let message = e.to_string();
            if !message.contains(want.as_str()) {
                bail!("error `{message}` does not mention `{want}`");
            }
            Ok(())
        }
        (Some(want), Ok(_)) => bail!("expected an error mentioning `{want}`"),
        (None, Err(e)) => Err(e.into()),
        (None, Ok(result)) => {
            check_verdicts(case, &result)?;
            check_diagnostics(case, &diagnostics)
        }
    }
}

fn yaml_test_impl(path: &str) -> Result<()> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read yaml test file {path}"))?;
    let test: YamlTest = serde_yaml::from_str(&yaml)
        .with_context(|| format!("failed to parse yaml test file {path}"))?;

    for case in test.cases.iter().filter(|case| !case.skip) {
        std::println!("case {}", case.note);
        run_case(case).with_context(|| format!("case `{}`", case.note))?;
    }
    Ok(())
}

#[test_resources("tests/marking/cases/**/*.yaml")]
fn run(path: &str) {
    yaml_test_impl(path).unwrap();
}
