// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::Result;
use serde_json::json;

use subset_marker::program::{TypeDef, TypeInfo};
use subset_marker::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn id(name: &str) -> EntityId {
    EntityId::new(name)
}

fn on() -> MarkingOptions {
    MarkingOptions::default().with_default_mode(SubsetMode::On)
}

fn mark(program: &Program, options: &MarkingOptions) -> Result<(MarkingResult, Diagnostics)> {
    let mut diagnostics = Diagnostics::new();
    let result = mark_program(program, options, &mut diagnostics)?;
    Ok((result, diagnostics))
}

const SIDE_EFFECTS: &str = r#"
entities:
  - name: Integer
    type: { signed: { low: -2147483648, high: 2147483647 } }
  - name: Counter
    object: { type: Integer }
  - name: Bump
    loc: { line: 5, col: 4 }
    subprogram:
      kind: function
      result: Integer
      effects: { writes: [Counter], loc: { line: 7, col: 8 } }
  - name: Reset
    subprogram:
      kind: procedure
      effects: { writes: [Counter] }
units:
  - object_declaration: { entity: Counter }
  - subprogram_declaration: { entity: Bump }
  - subprogram_body:
      entity: Bump
      statements:
        - return:
            value: { identifier: { entity: Counter }, type: Integer }
  - subprogram_declaration: { entity: Reset }
  - subprogram_body:
      entity: Reset
      statements:
        - assignment:
            target: { identifier: { entity: Counter }, type: Integer }
            value: { integer_literal: { value: 0 }, type: Integer }
"#;

#[test]
fn side_effects_blame_the_global_effects_facet() -> Result<()> {
    init_logger();
    let program = Program::from_yaml_str(SIDE_EFFECTS)?;
    let (result, diagnostics) = mark(&program, &on())?;

    assert!(!result.in_subset(&id("Bump")));
    assert_eq!(
        result.root_cause(&id("Bump")),
        Some(&Anchor::GlobalEffects {
            subprogram: id("Bump"),
            loc: Location::new(7, 8),
        })
    );
    assert_eq!(diagnostics.violations().count(), 1);
    Ok(())
}

#[test]
fn bodies_are_never_in_subset_without_their_spec() -> Result<()> {
    init_logger();
    let program = Program::from_yaml_str(SIDE_EFFECTS)?;
    let (result, _) = mark(&program, &on())?;

    assert!(result.body_in_subset(&id("Reset")));
    assert!(!result.body_in_subset(&id("Bump")));
    assert_eq!(
        result.body_root_cause(&id("Bump")),
        result.root_cause(&id("Bump"))
    );
    assert!(result
        .body_in_subset_entities()
        .is_subset(result.in_subset_entities()));
    Ok(())
}

#[test]
fn marking_an_entity_again_changes_nothing() -> Result<()> {
    init_logger();
    let program = Program::from_yaml_str(SIDE_EFFECTS)?;
    let options = on();
    let mut diagnostics = Diagnostics::new();
    let marker = Marker::new(&program, &options, &mut diagnostics);

    let mut state = MarkingState::new();
    marker.mark_program(&mut state)?;
    let snapshot = state.clone();

    for entity in program.entities() {
        if state.is_visited(&entity.name) {
            marker.mark_entity(&mut state, &entity.name)?;
        }
    }
    marker.drain(&mut state)?;
    assert_eq!(state, snapshot);
    assert!(state.queues().is_empty());
    Ok(())
}

fn cycle_with_bad_component(units: &[&str]) -> Result<Program> {
    let units: Vec<_> = units
        .iter()
        .map(|name| json!({ "type_declaration": { "entity": name } }))
        .collect();
    let program = json!({
        "entities": [
            { "name": "Integer", "type": { "signed": { "low": -128, "high": 127 } } },
            { "name": "Anon", "type": { "access": { "designated": "Integer", "anonymous": true } } },
            { "name": "A", "type": { "record": { "components": ["A.To_B"] } } },
            { "name": "A.To_B", "component": { "type": "B_Ptr" } },
            { "name": "A_Ptr", "type": { "access": { "designated": "A" } } },
            { "name": "B", "type": { "record": { "components": ["B.To_A", "B.Bad"] } } },
            { "name": "B.To_A", "component": { "type": "A_Ptr" } },
            { "name": "B.Bad", "component": { "type": "Anon" } },
            { "name": "B_Ptr", "type": { "access": { "designated": "B" } } }
        ],
        "units": units,
    });
    Ok(Program::from_json_str(&program.to_string())?)
}

#[test]
fn verdicts_do_not_depend_on_unit_order() -> Result<()> {
    init_logger();
    let forward = cycle_with_bad_component(&["A", "B"])?;
    let backward = cycle_with_bad_component(&["B", "A"])?;

    let (forward, _) = mark(&forward, &on())?;
    let (backward, _) = mark(&backward, &on())?;

    assert_eq!(forward.in_subset_entities(), backward.in_subset_entities());
    assert_eq!(forward.ordered_entities(), backward.ordered_entities());
    for result in [&forward, &backward] {
        let cause = result.root_cause(&id("B")).and_then(|a| a.entity_id());
        assert_eq!(cause, Some(&id("B.Bad")));
    }
    Ok(())
}

#[test]
fn loop_entities_and_incomplete_views() -> Result<()> {
    init_logger();
    let program = Program::from_yaml_str(
        r#"
entities:
  - name: Integer
    type: { signed: { low: 0, high: 100 } }
  - name: Cell
    type: { incomplete: { full_view: Cell_Full } }
  - name: Cell_Ptr
    type: { access: { designated: Cell } }
  - name: Cell_Full
    type: { record: { components: [Cell_Full.Next] } }
  - name: Cell_Full.Next
    component: { type: Cell_Ptr }
  - name: Walk
    subprogram: { kind: procedure }
  - name: Walk.Count
    scope: Walk
    object: { type: Integer }
  - name: Walk.I
    scope: Walk
    object: { type: Integer, constant: true }
  - name: Walk.Tmp
    scope: Walk
    object: { type: Cell_Ptr }
units:
  - type_declaration: { entity: Cell_Ptr }
  - subprogram_body:
      entity: Walk
      declarations:
        - object_declaration: { entity: Walk.Count }
      statements:
        - loop:
            scheme:
              for:
                parameter: Walk.I
                domain:
                  range:
                    low: { integer_literal: { value: 1 }, type: Integer }
                    high: { integer_literal: { value: 10 }, type: Integer }
            body:
              - block:
                  declarations:
                    - object_declaration: { entity: Walk.Tmp }
"#,
    )?;
    let (result, diagnostics) = mark(&program, &on())?;

    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
    assert_eq!(result.incomplete_view(&id("Cell")), Some(&id("Cell_Ptr")));
    assert_eq!(result.incomplete_view(&id("Cell_Full")), None);

    let parameter_loop = result.enclosing_loop(&id("Walk.I"));
    assert!(parameter_loop.is_some());
    assert_eq!(result.enclosing_loop(&id("Walk.Tmp")), parameter_loop);
    assert_eq!(result.enclosing_loop(&id("Walk.Count")), None);
    assert!(result.body_in_subset(&id("Walk")));
    Ok(())
}

#[test]
fn protected_operations_follow_their_type() -> Result<()> {
    init_logger();
    let program = Program::from_yaml_str(
        r#"
entities:
  - name: Buffer
    type: { protected: { operations: [Buffer.Put, Buffer.Reset] } }
  - name: Buffer.Put
    scope: Buffer
    subprogram: { kind: procedure }
  - name: Buffer.Reset
    scope: Buffer
    subprogram: { kind: procedure }
units:
  - subprogram_declaration: { entity: Buffer.Put }
"#,
    )?;
    let (result, _) = mark(&program, &on())?;

    assert_eq!(
        result.ordered_entities(),
        &[id("Buffer"), id("Buffer.Put"), id("Buffer.Reset")]
    );
    Ok(())
}

#[derive(Default)]
struct Tally {
    violations: Vec<ViolationKind>,
    unsupported: usize,
    warnings: Vec<WarningKind>,
}

impl DiagnosticSink for Tally {
    fn report_violation(&mut self, _at: &Anchor, kind: ViolationKind, _root: Option<&Anchor>) {
        self.violations.push(kind);
    }

    fn report_unsupported(&mut self, _at: &Anchor, _feature: UnsupportedFeature) {
        self.unsupported += 1;
    }

    fn report_warning(&mut self, _at: &Anchor, warning: WarningKind) {
        self.warnings.push(warning);
    }
}

#[test]
fn custom_sinks_receive_every_report() -> Result<()> {
    init_logger();
    let program = Program::from_yaml_str(
        r#"
entities:
  - name: Jump
    subprogram: { kind: procedure }
units:
  - subprogram_body:
      entity: Jump
      statements:
        - pragma: { name: Frobnicate }
        - goto: { label: Done }
"#,
    )?;
    let options = on();

    let mut tally = Tally::default();
    let result = mark_program(&program, &options, &mut tally)?;
    assert!(result.in_subset(&id("Jump")));
    assert!(!result.body_in_subset(&id("Jump")));
    assert_eq!(tally.violations, vec![ViolationKind::GotoStatement]);
    assert_eq!(tally.unsupported, 0);
    assert_eq!(
        tally.warnings,
        vec![WarningKind::UnknownPragma {
            name: "Frobnicate".to_string()
        }]
    );

    let strict = MarkingOptions::from_json_str(
        r#"{ "default_mode": "on", "reject_unknown_pragmas": true }"#,
    )?;
    let mut tally = Tally::default();
    mark_program(&program, &strict, &mut tally)?;
    assert_eq!(tally.violations.len(), 2);
    assert!(tally.warnings.is_empty());
    Ok(())
}

#[test]
fn programs_built_in_code() -> Result<()> {
    init_logger();
    let floating = || EntityKind::Type(TypeInfo::new(TypeDef::Floating { digits: 3 }));

    let mut ratio = Entity::new("Ratio", floating());
    ratio.loc = Location::new(2, 4);
    let entities = vec![
        Entity::new("Legacy", EntityKind::Package(Default::default())).with_mode(SubsetMode::Off),
        Entity::new("Legacy.Half", floating()).in_scope("Legacy"),
        ratio,
    ];
    let units = vec![
        Node::new(NodeKind::PackageDeclaration {
            entity: id("Legacy"),
            visible: vec![Node::new(NodeKind::TypeDeclaration {
                entity: id("Legacy.Half"),
            })],
            private: vec![],
        }),
        Node::new(NodeKind::TypeDeclaration { entity: id("Ratio") }).at(Location::new(2, 1)),
    ];
    let program = Program::new(entities, units)?;
    let (result, diagnostics) = mark(&program, &on())?;

    assert!(result.in_subset_entities().is_empty());
    let reported: Vec<_> = diagnostics.unsupported().collect();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].0.entity_id(), Some(&id("Ratio")));
    assert_eq!(reported[0].1, &UnsupportedFeature::FloatDigits { digits: 3 });
    Ok(())
}

#[test]
fn contract_breaches_abort_the_run() -> Result<()> {
    init_logger();
    let duplicated = Program::new(
        vec![
            Entity::new("E", EntityKind::Exception {}),
            Entity::new("E", EntityKind::Exception {}),
        ],
        vec![],
    );
    assert!(matches!(duplicated, Err(MarkingError::Invariant(_))));

    let dangling = Program::new(
        vec![],
        vec![Node::new(NodeKind::TypeDeclaration {
            entity: id("Missing"),
        })],
    )?;
    let err = mark(&dangling, &on()).err().map(|e| e.to_string());
    assert_eq!(
        err.as_deref(),
        Some("reference to undeclared entity `Missing`")
    );

    let misused = Program::from_json_str(
        r#"{
            "entities": [
                { "name": "Proc", "subprogram": { "kind": "procedure" } },
                { "name": "X", "object": { "type": "Proc" } }
            ],
            "units": [{ "object_declaration": { "entity": "X" } }]
        }"#,
    )?;
    let err = mark(&misused, &on()).err().map(|e| e.to_string());
    assert_eq!(
        err.as_deref(),
        Some("internal invariant violated: subprogram `Proc` is used as a type")
    );

    assert!(matches!(
        Program::from_json_str("{ \"units\": 3 }"),
        Err(MarkingError::Load { what: "program", .. })
    ));
    Ok(())
}

#[test]
fn results_serialize() -> Result<()> {
    let program = Program::from_yaml_str(SIDE_EFFECTS)?;
    let (result, diagnostics) = mark(&program, &on())?;

    let value = serde_json::to_value(&result)?;
    assert_eq!(value["in_subset"], json!(["Counter", "Integer", "Reset"]));
    assert_eq!(value["root_causes"]["Bump"]["anchor"], json!("global_effects"));

    let reports = serde_json::to_value(diagnostics.into_vec())?;
    assert_eq!(
        reports[0]["kind"]["violation"]["kind"],
        json!("function_with_side_effects")
    );
    Ok(())
}
