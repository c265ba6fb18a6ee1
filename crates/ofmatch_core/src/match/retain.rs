//! Deriving new matches from existing ones.
//!
//! A [Match] observed from a packet usually pins every header field. Before it
//! is installed as a rule it is often narrowed to the fields that matter
//! ([mask_l4_and_up], [project]) or edited without losing the fields nobody
//! touched ([retentive_builder]).
use fxhash::FxBuildHasher;
use indexmap::IndexSet;

use super::{Match, MatchBuilder};
use crate::field::FieldId;

/// Ordered allow-list of fields.
pub type FieldSet = IndexSet<FieldId, FxBuildHasher>;

/// Fields kept by [mask_l4_and_up]. IP protocol is kept so that the L3
/// header stays unambiguous.
pub const L3_AND_BELOW: [FieldId; 7] = [
    FieldId::InPort,
    FieldId::EthType,
    FieldId::EthSrc,
    FieldId::EthDst,
    FieldId::Ipv4Src,
    FieldId::Ipv4Dst,
    FieldId::IpProto,
];

pub fn l3_and_below() -> FieldSet {
    L3_AND_BELOW.into_iter().collect()
}

/// Keeps only the fields in `fields`, exact or masked as they were in `m`.
/// Fields outside the set, and fields wildcarded in `m`, come out wildcarded.
pub fn project(m: &Match, fields: &FieldSet) -> Match {
    let mut mb = forgetful_builder(m);
    for (field, state) in m.field_states() {
        if fields.contains(&field) {
            mb.assign(field, state);
        } else {
            tracing::trace!(%field, "drop field from projection");
        }
    }
    mb.build()
}

/// Point-to-point match at the IP layer: every field above L3 is wildcarded.
pub fn mask_l4_and_up(m: &Match) -> Match {
    project(m, &l3_and_below())
}

/// Creates a builder seeded with every exact and masked field of `m`. Building
/// it untouched yields a match equal to `m`; each later `set_*` or `wildcard`
/// replaces only the field it names.
pub fn retentive_builder(m: &Match) -> MatchBuilder {
    let mut mb = forgetful_builder(m);
    for (field, state) in m.field_states() {
        mb.assign(field, state);
    }
    mb
}

/// Creates an empty builder for the same protocol version as `m`.
#[inline]
pub fn forgetful_builder(m: &Match) -> MatchBuilder {
    MatchBuilder::new(m.version())
}

/// Creates an independent copy of `m`.
pub fn copy(m: &Match) -> Match {
    retentive_builder(m).build()
}
