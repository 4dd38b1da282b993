// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::collections::BTreeMap;

use lazy_static::lazy_static;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PragmaClass {
    /// Arguments are boolean expressions checked like any other.
    Assertion,
    /// Subset-mode annotation, already applied by the front end.
    Mode,
    /// Recognized directive with no effect on marking.
    NoEffect,
    Unsupported,
    Unknown,
}

lazy_static! {
    static ref PRAGMAS: BTreeMap<&'static str, PragmaClass> = {
        use PragmaClass::*;
        let mut table = BTreeMap::new();
        for name in [
            "assert", "assert_and_cut", "assume", "check", "loop_invariant", "loop_variant",
            "postcondition", "precondition",
        ] {
            table.insert(name, Assertion);
        }
        table.insert("subset_mode", Mode);
        for name in [
            "ada_2012", "annotate", "assertion_policy", "check_policy", "convention",
            "elaborate", "elaborate_all", "elaborate_body", "export", "import", "inline",
            "inline_always", "linker_options", "no_return", "pack", "preelaborate", "pure",
            "restrictions", "style_checks", "suppress", "unreferenced", "unsuppress",
            "unused", "volatile", "warnings",
        ] {
            table.insert(name, NoEffect);
        }
        for name in [
            "attach_handler", "default_storage_pool", "interrupt_handler",
            "machine_attribute", "overflow_mode",
        ] {
            table.insert(name, Unsupported);
        }
        table
    };
}

pub fn classify_pragma(name: &str) -> PragmaClass {
    let lowered = name.to_ascii_lowercase();
    PRAGMAS
        .get(lowered.as_str())
        .copied()
        .unwrap_or(PragmaClass::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(classify_pragma("Loop_Invariant"), PragmaClass::Assertion);
        assert_eq!(classify_pragma("SUBSET_MODE"), PragmaClass::Mode);
        assert_eq!(classify_pragma("Inline"), PragmaClass::NoEffect);
        assert_eq!(
            classify_pragma("Interrupt_Handler"),
            PragmaClass::Unsupported
        );
        assert_eq!(classify_pragma("Frobnicate"), PragmaClass::Unknown);
    }
}
