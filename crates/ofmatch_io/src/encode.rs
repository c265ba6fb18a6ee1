use std::net::Ipv4Addr;

use ofmatch_core::{
    field::{FieldId, FieldKind},
    r#match::{FieldState, MacAddr, Match},
};
use thiserror::Error;

use crate::{basic::parser::mask_to_prefix, MatchKey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("field {field} in state {state:?} has no textual form")]
    Unrepresentable { field: FieldId, state: FieldState },
}

/// Writes `m` as `Match[key=value,...]`, listing only the constrained fields
/// in layout order. The match-everything match is `Match[]`.
///
/// The text must decode back to `m`, so a few states are refused: masks on
/// anything but an IPv4 prefix, DSCP and ECN that differ (`nw_tos` sets
/// both), and transport ports that `nw_proto` does not route to.
pub fn encode(m: &Match) -> Result<String, EncodeError> {
    let mut entries = Vec::new();
    for (field, state) in m.field_states() {
        let value = match (field, state) {
            (FieldId::Ipv4Src | FieldId::Ipv4Dst, FieldState::Masked { value, mask }) => {
                let len = mask_to_prefix(mask as u32)
                    .ok_or(EncodeError::Unrepresentable { field, state })?;
                format!("{}/{}", Ipv4Addr::from(value as u32), len)
            }
            (_, FieldState::Masked { .. }) => {
                return Err(EncodeError::Unrepresentable { field, state });
            }
            (_, FieldState::Wildcarded) => continue,
            (FieldId::IpDscp | FieldId::IpEcn, FieldState::Exact(_)) => match tos_value(m)? {
                // written once, at DSCP
                Some(tos) if field == FieldId::IpDscp => tos.to_string(),
                _ => continue,
            },
            (_, FieldState::Exact(value)) => {
                if let Some(dir) = field.transport_dir() {
                    let proto = m.get(FieldId::IpProto).exact();
                    let routed = proto.and_then(|proto| FieldId::transport(proto as u8, dir));
                    if routed != Some(field) {
                        return Err(EncodeError::Unrepresentable { field, state });
                    }
                }
                format_value(field, value)
            }
        };
        entries.push(format!("{}={}", MatchKey::for_field(field), value));
    }
    Ok(format!("Match[{}]", entries.join(",")))
}

/// The single `nw_tos` value standing for DSCP and ECN, if any.
fn tos_value(m: &Match) -> Result<Option<u128>, EncodeError> {
    let dscp = m.get(FieldId::IpDscp);
    if !m.version().supports(FieldId::IpEcn) {
        return Ok(dscp.exact());
    }
    let ecn = m.get(FieldId::IpEcn);
    match (dscp, ecn) {
        (FieldState::Wildcarded, FieldState::Wildcarded) => Ok(None),
        (FieldState::Exact(d), FieldState::Exact(e)) if d == e => Ok(Some(d)),
        (FieldState::Exact(_), state) => Err(EncodeError::Unrepresentable {
            field: FieldId::IpEcn,
            state,
        }),
        (state, _) => Err(EncodeError::Unrepresentable {
            field: FieldId::IpDscp,
            state,
        }),
    }
}

fn format_value(field: FieldId, value: u128) -> String {
    match field.kind() {
        FieldKind::Decimal => value.to_string(),
        FieldKind::Hex if field == FieldId::EthType => format!("{:#06x}", value),
        FieldKind::Hex => format!("{:#x}", value),
        FieldKind::Mac => MacAddr::from_raw(value).to_string(),
        FieldKind::Ipv4 => Ipv4Addr::from(value as u32).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;
    use ofmatch_core::{
        field::{eth_type, ip_proto},
        r#match::{retain::retentive_builder, MatchBuilder},
        version::OfVersion,
    };

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode(&Match::empty(OfVersion::Of13)).unwrap(), "Match[]");
    }

    #[test]
    fn test_encode_fields() {
        let mut mb = MatchBuilder::new(OfVersion::Of13);
        mb.set_exact(FieldId::EthSrc, MacAddr([0x00, 0x20, 0x01, 0x11, 0x22, 0x33]))
            .unwrap();
        mb.set_exact(FieldId::EthType, eth_type::IPV4).unwrap();
        mb.set_exact(FieldId::VlanVid, 10u16).unwrap();
        mb.set_masked(FieldId::Ipv4Src, 0xc0a8_0000u32, 0xffff_ff00u32)
            .unwrap();
        mb.set_exact(FieldId::Ipv4Dst, 0x0a00_0001u32).unwrap();
        mb.set_exact(FieldId::IpProto, ip_proto::TCP).unwrap();
        mb.set_exact(FieldId::IpDscp, 3u8).unwrap();
        mb.set_exact(FieldId::IpEcn, 3u8).unwrap();
        mb.set_exact(FieldId::TcpDst, 80u16).unwrap();
        assert_eq!(
            encode(&mb.build()).unwrap(),
            "Match[dl_src=00:20:01:11:22:33,dl_type=0x0800,dl_vlan=0xa,\
             nw_src=192.168.0.0/24,nw_dst=10.0.0.1,nw_proto=6,nw_tos=3,tp_dst=80]"
        );
    }

    #[test]
    fn test_encode_unrepresentable() {
        let mut mb = MatchBuilder::new(OfVersion::Of13);
        mb.set_masked(FieldId::Metadata, 0x10u64, 0xf0u64).unwrap();
        assert_eq!(
            encode(&mb.build()).unwrap_err(),
            EncodeError::Unrepresentable {
                field: FieldId::Metadata,
                state: FieldState::Masked {
                    value: 0x10,
                    mask: 0xf0
                }
            }
        );

        let mut mb = MatchBuilder::new(OfVersion::Of13);
        mb.set_masked(FieldId::Ipv4Dst, 0x0a00_000au32, 0xff00_00ffu32)
            .unwrap();
        assert!(encode(&mb.build()).is_err());
    }

    #[test]
    fn test_encode_tos() {
        let mut mb = MatchBuilder::new(OfVersion::Of13);
        mb.set_exact(FieldId::IpDscp, 46u8).unwrap();
        mb.set_exact(FieldId::IpEcn, 1u8).unwrap();
        assert_eq!(
            encode(&mb.build()).unwrap_err(),
            EncodeError::Unrepresentable {
                field: FieldId::IpEcn,
                state: FieldState::Exact(1)
            }
        );

        let mut mb = MatchBuilder::new(OfVersion::Of13);
        mb.set_exact(FieldId::IpEcn, 2u8).unwrap();
        assert_eq!(
            encode(&mb.build()).unwrap_err(),
            EncodeError::Unrepresentable {
                field: FieldId::IpDscp,
                state: FieldState::Wildcarded
            }
        );

        let mut mb = MatchBuilder::new(OfVersion::Of10);
        mb.set_exact(FieldId::IpDscp, 46u8).unwrap();
        assert_eq!(encode(&mb.build()).unwrap(), "Match[nw_tos=46]");

        let m = decode("nw_tos=2", OfVersion::Of13).unwrap();
        assert_eq!(encode(&m).unwrap(), "Match[nw_tos=2]");
    }

    #[test]
    fn test_encode_transport_needs_proto() {
        let m = decode("nw_proto=17,tp_dst=53", OfVersion::Of13).unwrap();
        assert_eq!(encode(&m).unwrap(), "Match[nw_proto=17,tp_dst=53]");

        // protocol switched under the port
        let mut rb = retentive_builder(&m);
        rb.set_exact(FieldId::IpProto, ip_proto::TCP).unwrap();
        assert_eq!(
            encode(&rb.build()).unwrap_err(),
            EncodeError::Unrepresentable {
                field: FieldId::UdpDst,
                state: FieldState::Exact(53)
            }
        );

        // no protocol at all
        let mut mb = MatchBuilder::new(OfVersion::Of13);
        mb.set_exact(FieldId::TcpDst, 80u16).unwrap();
        assert_eq!(
            encode(&mb.build()).unwrap_err(),
            EncodeError::Unrepresentable {
                field: FieldId::TcpDst,
                state: FieldState::Exact(80)
            }
        );
    }

    #[test]
    fn test_encode_then_decode() {
        let text = "Match[ingress_port=3,dl_dst=aa:bb:cc:dd:ee:ff,dl_type=0x0806,\
                    arp_opcode=1,arp_sha=00:00:00:00:00:01,arp_dha=00:00:00:00:00:02,\
                    arp_spa=10.0.0.1,arp_dpa=10.0.0.2,mpls_label=16,mpls_tc=2,metadata=42]";
        let m = decode(text, OfVersion::Of13).unwrap();
        let encoded = encode(&m).unwrap();
        assert_eq!(encoded, text);
        assert_eq!(decode(&encoded, OfVersion::Of13).unwrap(), m);
    }
}
