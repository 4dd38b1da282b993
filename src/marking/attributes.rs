// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::collections::BTreeMap;

use lazy_static::lazy_static;

/// How an attribute reference is treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeCategory {
    Always,
    /// The prefix must denote a type.
    StaticOnly,
    /// Supported, but its value is only known to the compiler.
    Warn,
    Unsupported,
}

lazy_static! {
    static ref ATTRIBUTES: BTreeMap<&'static str, AttributeCategory> = {
        use AttributeCategory::*;
        let mut table = BTreeMap::new();
        for name in [
            "access", "adjacent", "aft", "callable", "ceiling", "constrained", "copy_sign",
            "enum_rep", "enum_val", "first", "floor", "fore", "image", "img", "initialized",
            "last", "length", "loop_entry", "machine", "max", "min", "mod", "old", "pos",
            "pred", "range", "remainder", "result", "rounding", "succ", "truncation",
            "update", "val", "valid", "value", "wide_image", "wide_value", "width",
        ] {
            table.insert(name, Always);
        }
        for name in [
            "base", "class", "delta", "digits", "first_valid", "last_valid", "modulus",
            "small",
        ] {
            table.insert(name, StaticOnly);
        }
        for name in [
            "address", "alignment", "component_size", "first_bit", "last_bit",
            "object_size", "position", "size", "value_size",
        ] {
            table.insert(name, Warn);
        }
        for name in [
            "body_version", "caller", "count", "external_tag", "identity", "input",
            "output", "read", "storage_pool", "storage_size", "tag", "terminated",
            "unchecked_access", "unrestricted_access", "version", "write",
        ] {
            table.insert(name, Unsupported);
        }
        table
    };
}

/// Category of an attribute, case-insensitively. Unknown attributes are
/// unsupported.
pub fn attribute_category(name: &str) -> AttributeCategory {
    let lowered = name.to_ascii_lowercase();
    ATTRIBUTES
        .get(lowered.as_str())
        .copied()
        .unwrap_or(AttributeCategory::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(attribute_category("First"), AttributeCategory::Always);
        assert_eq!(attribute_category("SMALL"), AttributeCategory::StaticOnly);
        assert_eq!(attribute_category("Size"), AttributeCategory::Warn);
        assert_eq!(
            attribute_category("Unchecked_Access"),
            AttributeCategory::Unsupported
        );
        assert_eq!(
            attribute_category("Made_Up"),
            AttributeCategory::Unsupported
        );
    }
}
