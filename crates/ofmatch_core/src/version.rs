//! OpenFlow protocol versions and the match fields each of them can carry.
use std::fmt::{Display, Formatter};

use crate::field::FieldId;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OfVersion {
    Of10,
    Of11,
    Of12,
    #[default]
    Of13,
    Of14,
    Of15,
}

impl OfVersion {
    /// Wire version byte.
    pub fn wire(self) -> u8 {
        match self {
            OfVersion::Of10 => 0x01,
            OfVersion::Of11 => 0x02,
            OfVersion::Of12 => 0x03,
            OfVersion::Of13 => 0x04,
            OfVersion::Of14 => 0x05,
            OfVersion::Of15 => 0x06,
        }
    }

    pub fn from_wire(wire: u8) -> Option<OfVersion> {
        match wire {
            0x01 => Some(OfVersion::Of10),
            0x02 => Some(OfVersion::Of11),
            0x03 => Some(OfVersion::Of12),
            0x04 => Some(OfVersion::Of13),
            0x05 => Some(OfVersion::Of14),
            0x06 => Some(OfVersion::Of15),
            _ => None,
        }
    }

    /// Whether the match structure of this version has room for `field`.
    pub fn supports(self, field: FieldId) -> bool {
        self >= min_version(field)
    }
}

// OF1.0 has a fixed 12-tuple; OF1.1 adds MPLS, metadata, SCTP and ECN;
// OXM (OF1.2+) adds the ARP hardware addresses.
fn min_version(field: FieldId) -> OfVersion {
    use FieldId::*;
    match field {
        InPort | EthSrc | EthDst | EthType | VlanVid | VlanPcp | Ipv4Src | Ipv4Dst | IpProto
        | IpDscp | TcpSrc | TcpDst | UdpSrc | UdpDst | IcmpType | IcmpCode | ArpOp | ArpSpa
        | ArpTpa => OfVersion::Of10,
        IpEcn | SctpSrc | SctpDst | MplsLabel | MplsTc | Metadata => OfVersion::Of11,
        ArpSha | ArpTha => OfVersion::Of12,
    }
}

impl Display for OfVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OfVersion::Of10 => "OF_10",
            OfVersion::Of11 => "OF_11",
            OfVersion::Of12 => "OF_12",
            OfVersion::Of13 => "OF_13",
            OfVersion::Of14 => "OF_14",
            OfVersion::Of15 => "OF_15",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports() {
        assert!(OfVersion::Of10.supports(FieldId::TcpDst));
        assert!(!OfVersion::Of10.supports(FieldId::IpEcn));
        assert!(!OfVersion::Of11.supports(FieldId::ArpSha));
        for field in FieldId::ALL {
            assert!(OfVersion::Of13.supports(field));
        }
    }

    #[test]
    fn test_wire() {
        for wire in 1..=6 {
            assert_eq!(OfVersion::from_wire(wire).unwrap().wire(), wire);
        }
        assert_eq!(OfVersion::from_wire(0x07), None);
        assert_eq!(OfVersion::default().to_string(), "OF_13");
    }
}
