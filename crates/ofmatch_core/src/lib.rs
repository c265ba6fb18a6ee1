//! This crate provides the flow match model: the field catalog, the ternary
//! header layout, and match construction/retention utilities.
pub mod field;
pub mod r#match;
pub mod version;

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        field::{eth_type, ip_proto, FieldDeclaration, FieldId, FieldKind, TransportDir},
        r#match::{
            retain::{
                copy, forgetful_builder, l3_and_below, mask_l4_and_up, project,
                retentive_builder, FieldSet, L3_AND_BELOW,
            },
            FieldState, MacAddr, MaskedValue, Match, MatchBuilder, MatchError,
        },
        version::OfVersion,
    };
}
