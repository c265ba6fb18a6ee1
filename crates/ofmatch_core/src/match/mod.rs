//! # Match
//!
//! ## Relations of important structs
//! ```text
//!   FieldId --declaration--> MaskedValue (value bits, mask bits)
//!                                 ^
//!                                 |
//!   MatchBuilder --build--> Match (immutable)
//!        ^                        |
//!        +------ retain ----------+
//! ```
//!
//! Every field of a [Match] is in one of three [FieldState]s: wildcarded (no
//! mask bit set), exact (every mask bit of the field set) or partially
//! masked. A field that was never set is wildcarded.
//!
//! ## Example
//! ```no_run
//! use ofmatch_core::prelude::*;
//!
//! let mut mb = MatchBuilder::new(OfVersion::Of13);
//! mb.set_exact(FieldId::EthType, eth_type::IPV4).unwrap();
//! mb.set_masked(FieldId::Ipv4Dst, 0x0a00_0000u32, 0xff00_0000u32).unwrap();
//! let m = mb.build();
//!
//! assert!(m.is_exact(FieldId::EthType));
//! assert!(m.is_partially_masked(FieldId::Ipv4Dst));
//! assert!(m.is_wildcarded(FieldId::TcpDst));
//! ```

pub mod retain;

use std::{
    fmt::{Debug, Display, Formatter},
    net::Ipv4Addr,
};

use bitvec::{field::BitField, prelude::*};
use thiserror::Error;

use crate::{
    field::{constant, FieldDeclaration, FieldId, FieldKind},
    version::OfVersion,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("field {field} is not supported by {version}")]
    UnsupportedField { field: FieldId, version: OfVersion },
    #[error("value {value:#x} does not fit into the {width} bits of field {field}")]
    ValueOutOfRange {
        field: FieldId,
        value: u128,
        width: usize,
    },
    #[error("mask {mask:#x} does not fit into the {width} bits of field {field}")]
    MaskOutOfRange {
        field: FieldId,
        mask: u128,
        width: usize,
    },
}

/// State of one field in a match. No field exceeds 128 bits, so u128 is
/// adequate for every value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FieldState {
    #[default]
    Wildcarded,
    Exact(u128),
    Masked { value: u128, mask: u128 },
}

impl FieldState {
    fn classify(value: u128, mask: u128, full: u128) -> Self {
        if mask == 0 {
            FieldState::Wildcarded
        } else if mask == full {
            FieldState::Exact(value)
        } else {
            FieldState::Masked { value, mask }
        }
    }

    #[inline]
    pub fn is_wildcarded(&self) -> bool {
        matches!(self, FieldState::Wildcarded)
    }

    #[inline]
    pub fn is_exact(&self) -> bool {
        matches!(self, FieldState::Exact(_))
    }

    #[inline]
    pub fn is_partially_masked(&self) -> bool {
        matches!(self, FieldState::Masked { .. })
    }

    /// The constrained value bits, `None` when wildcarded.
    pub fn value(&self) -> Option<u128> {
        match self {
            FieldState::Wildcarded => None,
            FieldState::Exact(value) | FieldState::Masked { value, .. } => Some(*value),
        }
    }

    /// Returns the exact value, `None` unless the state is exact.
    pub fn exact(&self) -> Option<u128> {
        match self {
            FieldState::Exact(value) => Some(*value),
            _ => None,
        }
    }
}

/// MaskedValue is a ternary string representing an entire header match.
#[derive(Eq, PartialEq, Hash, Clone, Copy, Debug)]
pub struct MaskedValue {
    pub value:
        BitArray<[constant::HeaderBitStore; constant::HEADERSTORENUM], constant::HeaderBitOrder>,
    pub mask:
        BitArray<[constant::HeaderBitStore; constant::HEADERSTORENUM], constant::HeaderBitOrder>,
}

impl Default for MaskedValue {
    fn default() -> Self {
        Self {
            value: BitArray::ZERO,
            mask: BitArray::ZERO,
        }
    }
}

impl MaskedValue {
    pub fn store(&mut self, decl: FieldDeclaration, value: u128, mask: u128) {
        self.value[decl.from..decl.to].store_le(value & mask);
        self.mask[decl.from..decl.to].store_le(mask);
    }

    pub fn load(&self, decl: FieldDeclaration) -> (u128, u128) {
        (
            self.value[decl.from..decl.to].load_le::<u128>(),
            self.mask[decl.from..decl.to].load_le::<u128>(),
        )
    }

    pub fn clear(&mut self, decl: FieldDeclaration) {
        self.value[decl.from..decl.to].fill(false);
        self.mask[decl.from..decl.to].fill(false);
    }

    #[inline]
    pub fn is_wildcard(&self) -> bool {
        self.mask.not_any()
    }
}

impl Display for MaskedValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut ternary_bits_disp = vec![b'*'; constant::MAX_POS];
        for (i, bit) in ternary_bits_disp.iter_mut().rev().enumerate() {
            *bit = if !self.mask[i] {
                b'*'
            } else if self.value[i] {
                b'1'
            } else {
                b'0'
            };
        }
        f.write_str(&String::from_utf8_lossy(&ternary_bits_disp))
    }
}

/// 48-bit Ethernet hardware address.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Takes the low 48 bits of a raw field value.
    pub fn from_raw(raw: u128) -> Self {
        let bytes = (raw as u64).to_be_bytes();
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&bytes[2..]);
        MacAddr(mac)
    }
}

impl From<MacAddr> for u128 {
    fn from(mac: MacAddr) -> u128 {
        mac.0.iter().fold(0u128, |acc, b| (acc << 8) | *b as u128)
    }
}

impl Display for MacAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Renders a raw field value the way its [FieldKind] is written.
pub fn fmt_field_value(f: &mut Formatter<'_>, kind: FieldKind, value: u128) -> std::fmt::Result {
    match kind {
        FieldKind::Decimal => write!(f, "{}", value),
        FieldKind::Hex => write!(f, "{:#x}", value),
        FieldKind::Mac => write!(f, "{}", MacAddr::from_raw(value)),
        FieldKind::Ipv4 => write!(f, "{}", Ipv4Addr::from(value as u32)),
    }
}

/// Mutable accumulator of field assignments, finalized once into a [Match].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchBuilder {
    version: OfVersion,
    header: MaskedValue,
}

impl MatchBuilder {
    pub fn new(version: OfVersion) -> Self {
        Self {
            version,
            header: MaskedValue::default(),
        }
    }

    #[inline]
    pub fn version(&self) -> OfVersion {
        self.version
    }

    pub fn set_exact(
        &mut self,
        field: FieldId,
        value: impl Into<u128>,
    ) -> Result<&mut Self, MatchError> {
        let mask = field.declaration().full_mask();
        let (value, mask) = self.check(field, value.into(), mask)?;
        Ok(self.store(field, value, mask))
    }

    /// Sets a value under a mask. Value bits outside the mask are dropped, an
    /// all-zero mask leaves the field wildcarded.
    pub fn set_masked(
        &mut self,
        field: FieldId,
        value: impl Into<u128>,
        mask: impl Into<u128>,
    ) -> Result<&mut Self, MatchError> {
        let (value, mask) = self.check(field, value.into(), mask.into())?;
        Ok(self.store(field, value, mask))
    }

    pub fn set(&mut self, field: FieldId, state: FieldState) -> Result<&mut Self, MatchError> {
        match state {
            FieldState::Wildcarded => Ok(self.wildcard(field)),
            FieldState::Exact(value) => self.set_exact(field, value),
            FieldState::Masked { value, mask } => self.set_masked(field, value, mask),
        }
    }

    pub fn wildcard(&mut self, field: FieldId) -> &mut Self {
        self.header.clear(field.declaration());
        self
    }

    pub fn get(&self, field: FieldId) -> FieldState {
        read_state(&self.header, field)
    }

    pub fn build(self) -> Match {
        Match {
            version: self.version,
            header: self.header,
        }
    }

    /// Writes a state read from a match of the same version, which has
    /// already been validated.
    pub(crate) fn assign(&mut self, field: FieldId, state: FieldState) -> &mut Self {
        let decl = field.declaration();
        match state {
            FieldState::Wildcarded => self.header.clear(decl),
            FieldState::Exact(value) => self.header.store(decl, value, decl.full_mask()),
            FieldState::Masked { value, mask } => self.header.store(decl, value, mask),
        }
        self
    }

    fn check(&self, field: FieldId, value: u128, mask: u128) -> Result<(u128, u128), MatchError> {
        if !self.version.supports(field) {
            return Err(MatchError::UnsupportedField {
                field,
                version: self.version,
            });
        }
        let decl = field.declaration();
        let full = decl.full_mask();
        if value & !full != 0 {
            return Err(MatchError::ValueOutOfRange {
                field,
                value,
                width: decl.width(),
            });
        }
        if mask & !full != 0 {
            return Err(MatchError::MaskOutOfRange {
                field,
                mask,
                width: decl.width(),
            });
        }
        Ok((value, mask))
    }

    fn store(&mut self, field: FieldId, value: u128, mask: u128) -> &mut Self {
        tracing::trace!(%field, ?value, ?mask, "store field");
        self.header.store(field.declaration(), value, mask);
        self
    }
}

fn read_state(header: &MaskedValue, field: FieldId) -> FieldState {
    let decl = field.declaration();
    let (value, mask) = header.load(decl);
    FieldState::classify(value, mask, decl.full_mask())
}

/// Immutable set of per-field constraints.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Match {
    version: OfVersion,
    header: MaskedValue,
}

impl Match {
    /// The match-everything match.
    pub fn empty(version: OfVersion) -> Match {
        MatchBuilder::new(version).build()
    }

    #[inline]
    pub fn version(&self) -> OfVersion {
        self.version
    }

    #[inline]
    pub fn header(&self) -> &MaskedValue {
        &self.header
    }

    pub fn get(&self, field: FieldId) -> FieldState {
        read_state(&self.header, field)
    }

    pub fn is_exact(&self, field: FieldId) -> bool {
        self.get(field).is_exact()
    }

    pub fn is_partially_masked(&self, field: FieldId) -> bool {
        self.get(field).is_partially_masked()
    }

    pub fn is_wildcarded(&self, field: FieldId) -> bool {
        self.get(field).is_wildcarded()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.header.is_wildcard()
    }

    /// Exact and masked fields, in layout order.
    pub fn fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.field_states().map(|(field, _)| field)
    }

    /// Exact and masked fields with their states, in layout order.
    pub fn field_states(&self) -> impl Iterator<Item = (FieldId, FieldState)> + '_ {
        FieldId::ALL
            .into_iter()
            .map(|field| (field, self.get(field)))
            .filter(|(_, state)| !state.is_wildcarded())
    }
}

impl Debug for Match {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Match({}){}", self.version, self)
    }
}

/// `Match[eth_type=0x800, ipv4_dst=10.0.0.0/255.0.0.0]`
impl Display for Match {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Match[")?;
        for (i, (field, state)) in self.field_states().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}=", field)?;
            match state {
                FieldState::Exact(value) => fmt_field_value(f, field.kind(), value)?,
                FieldState::Masked { value, mask } => {
                    fmt_field_value(f, field.kind(), value)?;
                    f.write_str("/")?;
                    fmt_field_value(f, field.kind(), mask)?;
                }
                FieldState::Wildcarded => {}
            }
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{eth_type, ip_proto};

    #[test]
    fn test_builder_states() {
        let mut mb = MatchBuilder::new(OfVersion::Of13);
        mb.set_exact(FieldId::IpProto, ip_proto::TCP).unwrap();
        mb.set_masked(FieldId::Ipv4Src, 0xc0a8_01ffu32, 0xffff_ff00u32)
            .unwrap();
        assert_eq!(mb.get(FieldId::IpProto), FieldState::Exact(6));
        // value bits outside the mask are dropped
        assert_eq!(
            mb.get(FieldId::Ipv4Src),
            FieldState::Masked {
                value: 0xc0a8_0100,
                mask: 0xffff_ff00
            }
        );
        assert_eq!(mb.get(FieldId::Ipv4Dst), FieldState::Wildcarded);

        let m = mb.build();
        assert_eq!(
            m.fields().collect::<Vec<_>>(),
            vec![FieldId::Ipv4Src, FieldId::IpProto]
        );
    }

    #[test]
    fn test_mask_classification() {
        let mut mb = MatchBuilder::new(OfVersion::Of13);
        mb.set_masked(FieldId::Ipv4Dst, 0x0a00_0001u32, u32::MAX)
            .unwrap();
        mb.set_masked(FieldId::Ipv4Src, 0x0a00_0001u32, 0u32).unwrap();
        let m = mb.build();
        assert!(m.is_exact(FieldId::Ipv4Dst));
        assert!(m.is_wildcarded(FieldId::Ipv4Src));
    }

    #[test]
    fn test_overwrite_and_wildcard() {
        let mut mb = MatchBuilder::new(OfVersion::Of13);
        mb.set_exact(FieldId::TcpDst, 80u16).unwrap();
        mb.set_exact(FieldId::TcpDst, 443u16).unwrap();
        assert_eq!(mb.get(FieldId::TcpDst).exact(), Some(443));
        mb.wildcard(FieldId::TcpDst);
        assert!(mb.build().is_empty());
    }

    #[test]
    fn test_neighbours_untouched() {
        let mut mb = MatchBuilder::new(OfVersion::Of13);
        mb.set_exact(FieldId::IpDscp, 0x3fu8).unwrap();
        mb.set_exact(FieldId::IpEcn, 0u8).unwrap();
        mb.set_exact(FieldId::EthSrc, MacAddr([0xff; 6])).unwrap();
        mb.set_exact(FieldId::EthDst, 0u8).unwrap();
        let m = mb.build();
        assert_eq!(m.get(FieldId::IpDscp).exact(), Some(0x3f));
        assert_eq!(m.get(FieldId::IpEcn).exact(), Some(0));
        assert_eq!(m.get(FieldId::EthSrc).exact(), Some(0xffff_ffff_ffff));
        assert_eq!(m.get(FieldId::EthDst).exact(), Some(0));
    }

    #[test]
    fn test_out_of_range() {
        let mut mb = MatchBuilder::new(OfVersion::Of13);
        assert_eq!(
            mb.set_exact(FieldId::VlanVid, 4096u16).unwrap_err(),
            MatchError::ValueOutOfRange {
                field: FieldId::VlanVid,
                value: 4096,
                width: 12
            }
        );
        assert!(matches!(
            mb.set_masked(FieldId::IpEcn, 1u8, 0xffu8),
            Err(MatchError::MaskOutOfRange { .. })
        ));
        assert!(mb.build().is_empty());
    }

    #[test]
    fn test_unsupported_field() {
        let mut mb = MatchBuilder::new(OfVersion::Of10);
        assert_eq!(
            mb.set_exact(FieldId::MplsLabel, 16u32).unwrap_err(),
            MatchError::UnsupportedField {
                field: FieldId::MplsLabel,
                version: OfVersion::Of10
            }
        );
        mb.set_exact(FieldId::EthType, eth_type::IPV4).unwrap();
        assert_eq!(mb.build().version(), OfVersion::Of10);
    }

    #[test]
    fn test_mac_addr() {
        let mac = MacAddr([0x00, 0x20, 0x01, 0x11, 0x22, 0x33]);
        let raw: u128 = mac.into();
        assert_eq!(raw, 0x0020_0111_2233);
        assert_eq!(MacAddr::from_raw(raw), mac);
        assert_eq!(mac.to_string(), "00:20:01:11:22:33");
    }

    #[test]
    fn test_display() {
        let mut mb = MatchBuilder::new(OfVersion::Of13);
        mb.set_exact(FieldId::EthType, eth_type::IPV4).unwrap();
        mb.set_masked(FieldId::Ipv4Dst, 0x0a00_0000u32, 0xff00_0000u32)
            .unwrap();
        let m = mb.build();
        assert_eq!(
            m.to_string(),
            "Match[eth_type=0x800, ipv4_dst=10.0.0.0/255.0.0.0]"
        );
        let ternary = m.header().to_string();
        assert_eq!(ternary.len(), constant::MAX_POS);
        assert_eq!(ternary.chars().filter(|c| *c != '*').count(), 16 + 8);
        assert_eq!(Match::empty(OfVersion::Of13).to_string(), "Match[]");
    }
}
