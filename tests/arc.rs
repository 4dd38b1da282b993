// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(feature = "arc")]

use lazy_static::lazy_static;
use std::thread;

use subset_marker::*;

// Programs and options can be shared between threads.
lazy_static! {
    static ref PROGRAM: Program = Program::from_json_str(
        r#"{
            "entities": [
                { "name": "Integer", "type": { "signed": { "low": 0, "high": 255 } } },
                { "name": "Half", "type": { "floating": { "digits": 3 } } },
                { "name": "Level", "object": { "type": "Integer" } },
                { "name": "Ratio", "object": { "type": "Half" } }
            ],
            "units": [
                { "object_declaration": { "entity": "Level" } },
                { "object_declaration": { "entity": "Ratio" } }
            ]
        }"#
    )
    .expect("failed to load program");
    static ref OPTIONS: MarkingOptions = MarkingOptions::default();
}

#[test]
fn shared_program() -> anyhow::Result<()> {
    let workers: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(|| {
                let mut diagnostics = Diagnostics::new();
                mark_program(&PROGRAM, &OPTIONS, &mut diagnostics)
                    .map(|result| result.ordered_entities().to_vec())
            })
        })
        .collect();

    for worker in workers {
        let ordered = worker.join().expect("worker panicked")?;
        assert_eq!(ordered, vec![EntityId::new("Integer"), EntityId::new("Level")]);
    }
    Ok(())
}
