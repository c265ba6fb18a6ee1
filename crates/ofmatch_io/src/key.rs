use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use ofmatch_core::field::FieldId;

/// Keys of the dpctl-style match syntax.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MatchKey {
    InPort,
    DlDst,
    DlSrc,
    DlType,
    DlVlan,
    DlVlanPcp,
    NwDst,
    NwSrc,
    NwProto,
    NwTos,
    TpDst,
    TpSrc,
    IcmpType,
    IcmpCode,
    ArpOpcode,
    ArpSha,
    ArpDha,
    ArpSpa,
    ArpDpa,
    MplsLabel,
    MplsTc,
    MplsBos,
    Metadata,
    TunnelId,
    PbbIsid,
}

impl MatchKey {
    pub const ALL: [MatchKey; 25] = [
        MatchKey::InPort,
        MatchKey::DlDst,
        MatchKey::DlSrc,
        MatchKey::DlType,
        MatchKey::DlVlan,
        MatchKey::DlVlanPcp,
        MatchKey::NwDst,
        MatchKey::NwSrc,
        MatchKey::NwProto,
        MatchKey::NwTos,
        MatchKey::TpDst,
        MatchKey::TpSrc,
        MatchKey::IcmpType,
        MatchKey::IcmpCode,
        MatchKey::ArpOpcode,
        MatchKey::ArpSha,
        MatchKey::ArpDha,
        MatchKey::ArpSpa,
        MatchKey::ArpDpa,
        MatchKey::MplsLabel,
        MatchKey::MplsTc,
        MatchKey::MplsBos,
        MatchKey::Metadata,
        MatchKey::TunnelId,
        MatchKey::PbbIsid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MatchKey::InPort => "ingress_port",
            MatchKey::DlDst => "dl_dst",
            MatchKey::DlSrc => "dl_src",
            MatchKey::DlType => "dl_type",
            MatchKey::DlVlan => "dl_vlan",
            MatchKey::DlVlanPcp => "dl_vpcp",
            MatchKey::NwDst => "nw_dst",
            MatchKey::NwSrc => "nw_src",
            MatchKey::NwProto => "nw_proto",
            MatchKey::NwTos => "nw_tos",
            MatchKey::TpDst => "tp_dst",
            MatchKey::TpSrc => "tp_src",
            MatchKey::IcmpType => "icmp_type",
            MatchKey::IcmpCode => "icmp_code",
            MatchKey::ArpOpcode => "arp_opcode",
            MatchKey::ArpSha => "arp_sha",
            MatchKey::ArpDha => "arp_dha",
            MatchKey::ArpSpa => "arp_spa",
            MatchKey::ArpDpa => "arp_dpa",
            MatchKey::MplsLabel => "mpls_label",
            MatchKey::MplsTc => "mpls_tc",
            MatchKey::MplsBos => "mpls_bos",
            MatchKey::Metadata => "metadata",
            MatchKey::TunnelId => "tunnel_id",
            MatchKey::PbbIsid => "pbb_isid",
        }
    }

    /// The key a field is written under. DSCP and ECN share `nw_tos`, the
    /// per-protocol transport ports share `tp_src`/`tp_dst`.
    pub fn for_field(field: FieldId) -> MatchKey {
        match field {
            FieldId::InPort => MatchKey::InPort,
            FieldId::EthSrc => MatchKey::DlSrc,
            FieldId::EthDst => MatchKey::DlDst,
            FieldId::EthType => MatchKey::DlType,
            FieldId::VlanVid => MatchKey::DlVlan,
            FieldId::VlanPcp => MatchKey::DlVlanPcp,
            FieldId::Ipv4Src => MatchKey::NwSrc,
            FieldId::Ipv4Dst => MatchKey::NwDst,
            FieldId::IpProto => MatchKey::NwProto,
            FieldId::IpDscp | FieldId::IpEcn => MatchKey::NwTos,
            FieldId::IcmpType => MatchKey::IcmpType,
            FieldId::IcmpCode => MatchKey::IcmpCode,
            FieldId::ArpOp => MatchKey::ArpOpcode,
            FieldId::ArpSha => MatchKey::ArpSha,
            FieldId::ArpTha => MatchKey::ArpDha,
            FieldId::ArpSpa => MatchKey::ArpSpa,
            FieldId::ArpTpa => MatchKey::ArpDpa,
            FieldId::MplsLabel => MatchKey::MplsLabel,
            FieldId::MplsTc => MatchKey::MplsTc,
            FieldId::Metadata => MatchKey::Metadata,
            FieldId::TcpSrc | FieldId::UdpSrc | FieldId::SctpSrc => MatchKey::TpSrc,
            FieldId::TcpDst | FieldId::UdpDst | FieldId::SctpDst => MatchKey::TpDst,
        }
    }
}

/// Case-insensitive.
impl FromStr for MatchKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        MatchKey::ALL
            .into_iter()
            .find(|key| key.as_str() == lower)
            .ok_or(())
    }
}

impl Display for MatchKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
