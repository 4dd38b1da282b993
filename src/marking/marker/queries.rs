// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structural questions about types, answered from the program alone.

use alloc::{collections::BTreeSet, format};

use num_bigint::BigInt;
use num_traits::{One, Signed};

use crate::error::{MarkingError, Result};
use crate::program::{
    AccessKind, EntityId, EntityKind, ParameterMode, Rational, SubprogramInfo, SubsetMode,
    TypeDef, TypeInfo,
};

use super::Marker;

/// Access facet of a representative type.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AccessView<'a> {
    pub kind: AccessKind,
    pub anonymous: bool,
    pub designated: &'a EntityId,
}

/// Bits needed to hold `value` as a two's-complement integer.
pub(crate) fn signed_bits(value: &BigInt) -> u64 {
    if value.is_negative() {
        (-(value + BigInt::one())).bits() + 1
    } else {
        value.bits() + 1
    }
}

fn machine_size(bits: u64) -> u64 {
    [8, 16, 32, 64, 128]
        .into_iter()
        .find(|size| bits <= *size)
        .unwrap_or(bits)
}

impl<'a> Marker<'a> {
    /// Whether the full view of a private type is excluded from analysis.
    pub(crate) fn is_full_view_hidden(&self, info: &TypeInfo) -> Result<bool> {
        match &info.def {
            TypeDef::Private {
                full_view: Some(full),
                ..
            } => Ok(self.entity_mode(full)?.0 == Some(SubsetMode::Off)),
            _ => Ok(false),
        }
    }

    /// Follow subtype, derivation and completion links down to the
    /// representative type. Stops at private types whose full view is
    /// hidden.
    pub(crate) fn representative(&self, ty: &EntityId) -> Result<(&'a EntityId, &'a TypeInfo)> {
        let mut entity = self.program.entity(ty)?;
        let limit = self.program.entity_count();
        for _ in 0..=limit {
            let info = match &entity.kind {
                EntityKind::Type(info) => info,
                _ => {
                    return Err(MarkingError::invariant(format!(
                        "{} `{}` is used as a type",
                        entity.kind.describe(),
                        entity.name
                    )))
                }
            };
            let next = match info.underlying() {
                Some(next) if !self.is_full_view_hidden(info)? => next,
                _ => return Ok((&entity.name, info)),
            };
            entity = self.program.entity(next)?;
        }
        Err(MarkingError::invariant(format!(
            "derivation chain of `{ty}` is cyclic"
        )))
    }

    pub(crate) fn access_view(&self, ty: &EntityId) -> Result<Option<AccessView<'a>>> {
        let (_, info) = self.representative(ty)?;
        Ok(match &info.def {
            TypeDef::Access {
                designated,
                kind,
                anonymous,
                ..
            } => Some(AccessView {
                kind: *kind,
                anonymous: *anonymous,
                designated,
            }),
            _ => None,
        })
    }

    /// Access-to-object type, named or anonymous.
    pub(crate) fn is_object_access(&self, ty: &EntityId) -> Result<bool> {
        Ok(matches!(
            self.access_view(ty)?,
            Some(AccessView {
                kind: AccessKind::Variable | AccessKind::Constant,
                ..
            })
        ))
    }

    /// Anonymous access-to-object type.
    pub(crate) fn is_anonymous_access(&self, ty: &EntityId) -> Result<bool> {
        Ok(matches!(
            self.access_view(ty)?,
            Some(AccessView {
                kind: AccessKind::Variable | AccessKind::Constant,
                anonymous: true,
                ..
            })
        ))
    }

    /// Types whose values own memory and are subject to move semantics.
    pub(crate) fn is_deep(&self, ty: &EntityId) -> Result<bool> {
        let mut seen = BTreeSet::new();
        self.is_deep_guarded(ty, &mut seen)
    }

    fn is_deep_guarded(&self, ty: &EntityId, seen: &mut BTreeSet<EntityId>) -> Result<bool> {
        let (rep, info) = self.representative(ty)?;
        if !seen.insert(rep.clone()) {
            return Ok(false);
        }
        match &info.def {
            TypeDef::Access { kind, .. } => Ok(*kind == AccessKind::Variable),
            TypeDef::Array { component, .. } => self.is_deep_guarded(component, seen),
            TypeDef::Record {
                discriminants,
                components,
                parent,
                ..
            } => {
                if let Some(parent) = parent {
                    if self.is_deep_guarded(parent, seen)? {
                        return Ok(true);
                    }
                }
                for part in discriminants.iter().chain(components) {
                    if let Some(part_ty) = self.program.declared_type(part)? {
                        if self.is_deep_guarded(part_ty, seen)? {
                            return Ok(true);
                        }
                    }
                }
                Ok(false)
            }
            TypeDef::Private { .. } => Ok(info.ownership),
            TypeDef::ClassWide { root, .. } => self.is_deep_guarded(root, seen),
            _ => Ok(false),
        }
    }

    pub(crate) fn is_concurrent_type(&self, id: &EntityId) -> Result<bool> {
        match &self.program.entity(id)?.kind {
            EntityKind::Type(_) => Ok(self.representative(id)?.1.is_concurrent()),
            _ => Ok(false),
        }
    }

    pub(crate) fn is_volatile_type(&self, ty: &EntityId) -> Result<bool> {
        let own = self.program.type_info(ty)?.volatile;
        Ok(own || self.representative(ty)?.1.volatile)
    }

    pub(crate) fn is_floating_type(&self, ty: &EntityId) -> Result<bool> {
        Ok(matches!(
            self.representative(ty)?.1.def,
            TypeDef::Floating { .. }
        ))
    }

    pub(crate) fn fixed_small(&self, ty: &EntityId) -> Result<Option<&'a Rational>> {
        Ok(match &self.representative(ty)?.1.def {
            TypeDef::OrdinaryFixed { small } => Some(small),
            _ => None,
        })
    }

    pub(crate) fn is_array_type(&self, ty: &EntityId) -> Result<bool> {
        Ok(matches!(
            self.representative(ty)?.1.def,
            TypeDef::Array { .. }
        ))
    }

    pub(crate) fn array_indices(&self, ty: &EntityId) -> Result<&'a [EntityId]> {
        match &self.representative(ty)?.1.def {
            TypeDef::Array { indices, .. } => Ok(indices),
            _ => Err(MarkingError::invariant(format!("`{ty}` is not an array type"))),
        }
    }

    /// Signedness and machine size of a discrete type.
    pub(crate) fn index_representation(&self, ty: &EntityId) -> Result<Option<(bool, u64)>> {
        Ok(match &self.representative(ty)?.1.def {
            TypeDef::Signed { low, high } => Some((
                true,
                machine_size(signed_bits(low).max(signed_bits(high))),
            )),
            TypeDef::Modular { modulus } => {
                Some((false, machine_size((modulus - BigInt::one()).bits())))
            }
            TypeDef::Enumeration { literals } => {
                let last = BigInt::from(literals.len().saturating_sub(1));
                Some((false, machine_size(last.bits().max(1))))
            }
            _ => None,
        })
    }

    /// Functions returning an anonymous access type derived from their
    /// first parameter, which must itself be of an access type.
    pub(crate) fn is_traversal_function(&self, info: &SubprogramInfo) -> Result<bool> {
        if !info.is_function() {
            return Ok(false);
        }
        let Some(result) = &info.result else {
            return Ok(false);
        };
        if !self.is_anonymous_access(result)? {
            return Ok(false);
        }
        match self.first_parameter_type(info)? {
            Some(first) => self.is_object_access(first),
            None => Ok(false),
        }
    }

    pub(crate) fn is_traversal_call(&self, callee: &EntityId) -> Result<bool> {
        match &self.program.entity(callee)?.kind {
            EntityKind::Subprogram(info) => self.is_traversal_function(info),
            _ => Ok(false),
        }
    }

    pub(crate) fn first_parameter_type(&self, info: &SubprogramInfo) -> Result<Option<&'a EntityId>> {
        match info.params.first() {
            Some(param) => self.program.declared_type(param),
            None => Ok(None),
        }
    }

    /// Constant objects and `in` parameters.
    pub(crate) fn is_constant_object(&self, id: &EntityId) -> Result<bool> {
        Ok(match &self.program.entity(id)?.kind {
            EntityKind::Object(info) => info.constant,
            EntityKind::Parameter(info) => info.mode == ParameterMode::In,
            _ => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_complement_widths() {
        assert_eq!(signed_bits(&BigInt::from(127)), 8);
        assert_eq!(signed_bits(&BigInt::from(-128)), 8);
        assert_eq!(signed_bits(&BigInt::from(128)), 9);
        assert_eq!(signed_bits(&BigInt::from(0)), 1);
        assert_eq!(machine_size(9), 16);
        assert_eq!(machine_size(200), 200);
    }
}
