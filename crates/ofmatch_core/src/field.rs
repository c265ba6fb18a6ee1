//! # Field catalog
//!
//! ## What is a field?
//! A field is one packet-header value a flow match can constrain, such as the
//! ingress port, the Ethernet destination or the TCP destination port. The
//! catalog is closed: every field is a variant of [FieldId].
//!
//! ## How is it laid out?
//! All fields are packed into one ternary header ([MaskedValue](crate::r#match::MaskedValue)).
//! The bit range of each field is generated at build time, so a
//! [FieldDeclaration] is all a match needs to read or write a field.
//!
//! ## Example
//! ```no_run
//! use ofmatch_core::field::{FieldId, TransportDir, ip_proto};
//!
//! let field = FieldId::transport(ip_proto::UDP, TransportDir::Src);
//! assert_eq!(field, Some(FieldId::UdpSrc));
//! assert_eq!(FieldId::from_name("udp_src"), field);
//! ```

use std::fmt::{Display, Formatter};

/// Describes where a field lives in the header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldDeclaration {
    pub name: &'static str,
    pub from: usize,
    pub to: usize,
}

impl FieldDeclaration {
    #[inline]
    pub fn width(&self) -> usize {
        self.to - self.from
    }

    /// All-ones mask covering the field width.
    #[inline]
    pub fn full_mask(&self) -> u128 {
        if self.width() >= u128::BITS as usize {
            u128::MAX
        } else {
            (1u128 << self.width()) - 1
        }
    }
}

pub mod constant {
    include!(concat!(env!("OUT_DIR"), "/codegen.rs"));

    pub type HeaderBitOrder = bitvec::order::Lsb0;
    pub type HeaderBitStore = u8;

    pub const HEADERSTORENUM: usize = MAX_POS.div_ceil(HeaderBitStore::BITS as usize);
}

/// How a field value is written in text.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Decimal,
    Hex,
    Mac,
    Ipv4,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldId {
    InPort,
    EthSrc,
    EthDst,
    EthType,
    VlanVid,
    VlanPcp,
    Ipv4Src,
    Ipv4Dst,
    IpProto,
    IpDscp,
    IpEcn,
    TcpSrc,
    TcpDst,
    UdpSrc,
    UdpDst,
    SctpSrc,
    SctpDst,
    IcmpType,
    IcmpCode,
    ArpOp,
    ArpSha,
    ArpTha,
    ArpSpa,
    ArpTpa,
    MplsLabel,
    MplsTc,
    Metadata,
}

/// Direction of a transport port.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransportDir {
    Src,
    Dst,
}

impl FieldId {
    /// Every field, in header layout order.
    pub const ALL: [FieldId; 27] = [
        FieldId::InPort,
        FieldId::EthSrc,
        FieldId::EthDst,
        FieldId::EthType,
        FieldId::VlanVid,
        FieldId::VlanPcp,
        FieldId::Ipv4Src,
        FieldId::Ipv4Dst,
        FieldId::IpProto,
        FieldId::IpDscp,
        FieldId::IpEcn,
        FieldId::TcpSrc,
        FieldId::TcpDst,
        FieldId::UdpSrc,
        FieldId::UdpDst,
        FieldId::SctpSrc,
        FieldId::SctpDst,
        FieldId::IcmpType,
        FieldId::IcmpCode,
        FieldId::ArpOp,
        FieldId::ArpSha,
        FieldId::ArpTha,
        FieldId::ArpSpa,
        FieldId::ArpTpa,
        FieldId::MplsLabel,
        FieldId::MplsTc,
        FieldId::Metadata,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FieldId::InPort => "in_port",
            FieldId::EthSrc => "eth_src",
            FieldId::EthDst => "eth_dst",
            FieldId::EthType => "eth_type",
            FieldId::VlanVid => "vlan_vid",
            FieldId::VlanPcp => "vlan_pcp",
            FieldId::Ipv4Src => "ipv4_src",
            FieldId::Ipv4Dst => "ipv4_dst",
            FieldId::IpProto => "ip_proto",
            FieldId::IpDscp => "ip_dscp",
            FieldId::IpEcn => "ip_ecn",
            FieldId::TcpSrc => "tcp_src",
            FieldId::TcpDst => "tcp_dst",
            FieldId::UdpSrc => "udp_src",
            FieldId::UdpDst => "udp_dst",
            FieldId::SctpSrc => "sctp_src",
            FieldId::SctpDst => "sctp_dst",
            FieldId::IcmpType => "icmpv4_type",
            FieldId::IcmpCode => "icmpv4_code",
            FieldId::ArpOp => "arp_op",
            FieldId::ArpSha => "arp_sha",
            FieldId::ArpTha => "arp_tha",
            FieldId::ArpSpa => "arp_spa",
            FieldId::ArpTpa => "arp_tpa",
            FieldId::MplsLabel => "mpls_label",
            FieldId::MplsTc => "mpls_tc",
            FieldId::Metadata => "metadata",
        }
    }

    /// Looks a field up by its layout name, e.g. `"ipv4_dst"`.
    pub fn from_name(name: &str) -> Option<FieldId> {
        constant::FIELD_MAP
            .get_index(name)
            .and_then(|idx| FieldId::ALL.get(idx).copied())
    }

    #[inline]
    pub fn declaration(self) -> FieldDeclaration {
        let (from, to) = constant::FIELD_RANGES[self as usize];
        FieldDeclaration {
            name: self.name(),
            from,
            to,
        }
    }

    #[inline]
    pub fn width(self) -> usize {
        self.declaration().width()
    }

    pub fn kind(self) -> FieldKind {
        match self {
            FieldId::EthSrc | FieldId::EthDst | FieldId::ArpSha | FieldId::ArpTha => FieldKind::Mac,
            FieldId::Ipv4Src | FieldId::Ipv4Dst | FieldId::ArpSpa | FieldId::ArpTpa => {
                FieldKind::Ipv4
            }
            FieldId::EthType | FieldId::VlanVid => FieldKind::Hex,
            _ => FieldKind::Decimal,
        }
    }

    /// Resolves a transport port field from the IP protocol number. Only TCP,
    /// UDP and SCTP carry ports.
    pub fn transport(proto: u8, dir: TransportDir) -> Option<FieldId> {
        match (proto, dir) {
            (ip_proto::TCP, TransportDir::Src) => Some(FieldId::TcpSrc),
            (ip_proto::TCP, TransportDir::Dst) => Some(FieldId::TcpDst),
            (ip_proto::UDP, TransportDir::Src) => Some(FieldId::UdpSrc),
            (ip_proto::UDP, TransportDir::Dst) => Some(FieldId::UdpDst),
            (ip_proto::SCTP, TransportDir::Src) => Some(FieldId::SctpSrc),
            (ip_proto::SCTP, TransportDir::Dst) => Some(FieldId::SctpDst),
            _ => None,
        }
    }

    /// The inverse of [FieldId::transport].
    pub fn transport_dir(self) -> Option<TransportDir> {
        match self {
            FieldId::TcpSrc | FieldId::UdpSrc | FieldId::SctpSrc => Some(TransportDir::Src),
            FieldId::TcpDst | FieldId::UdpDst | FieldId::SctpDst => Some(TransportDir::Dst),
            _ => None,
        }
    }
}

impl Display for FieldId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub mod ip_proto {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const SCTP: u8 = 132;
}

pub mod eth_type {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const VLAN: u16 = 0x8100;
    pub const MPLS_UNICAST: u16 = 0x8847;
    pub const MPLS_MULTICAST: u16 = 0x8848;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_follows_catalog() {
        assert_eq!(constant::FIELD_MAP.len(), FieldId::ALL.len());
        let mut pos = 0;
        for (idx, field) in FieldId::ALL.iter().enumerate() {
            assert_eq!(*field as usize, idx);
            let (name, range) = constant::FIELD_MAP.index(idx).unwrap();
            assert_eq!(*name, field.name());
            let decl = field.declaration();
            assert_eq!((decl.from, decl.to), *range);
            assert_eq!(decl.from, pos);
            pos = decl.to;
        }
        assert_eq!(pos, constant::MAX_POS);
    }

    #[test]
    fn test_from_name() {
        for field in FieldId::ALL {
            assert_eq!(FieldId::from_name(field.name()), Some(field));
        }
        assert_eq!(FieldId::from_name("tp_dst"), None);
    }

    #[test]
    fn test_widths() {
        assert_eq!(FieldId::EthDst.width(), 48);
        assert_eq!(FieldId::Ipv4Src.width(), 32);
        assert_eq!(FieldId::VlanVid.width(), 12);
        assert_eq!(FieldId::IpDscp.width(), 6);
        assert_eq!(FieldId::Metadata.width(), 64);
        assert_eq!(FieldId::Metadata.declaration().full_mask(), u64::MAX as u128);
        assert_eq!(FieldId::IpEcn.declaration().full_mask(), 0b11);
    }

    #[test]
    fn test_transport() {
        assert_eq!(
            FieldId::transport(ip_proto::TCP, TransportDir::Dst),
            Some(FieldId::TcpDst)
        );
        assert_eq!(
            FieldId::transport(ip_proto::SCTP, TransportDir::Src),
            Some(FieldId::SctpSrc)
        );
        assert_eq!(FieldId::transport(ip_proto::ICMP, TransportDir::Src), None);
        assert_eq!(FieldId::UdpDst.transport_dir(), Some(TransportDir::Dst));
        assert_eq!(FieldId::IpProto.transport_dir(), None);
    }
}
