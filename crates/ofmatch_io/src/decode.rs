use std::collections::VecDeque;

use nom::{error::Error as NomError, IResult};
use ofmatch_core::{
    field::{FieldId, TransportDir},
    r#match::{MacAddr, Match, MatchBuilder},
    version::OfVersion,
};
use tracing::{debug, trace, warn};

use crate::{
    basic::parser::{
        parse_all, parse_cidr, parse_dec, parse_hex_digits, parse_hex_or_dec, parse_ipv4_dotted,
        parse_mac, parse_match_all,
    },
    DecodeError, MatchKey,
};

const MATCH_TAG: &str = "Match";

/// One `key=value` segment of the input, key not yet resolved.
#[derive(Debug, Clone, Copy)]
struct Segment<'x> {
    raw: &'x str,
    key: &'x str,
    value: &'x str,
}

/// A segment whose key is known.
#[derive(Debug, Clone)]
struct Token<'x> {
    raw: &'x str,
    key: MatchKey,
    value: &'x str,
}

impl<'x> Segment<'x> {
    fn resolve(self, input: &str) -> Result<Token<'x>, DecodeError> {
        let key = self.key.parse::<MatchKey>().map_err(|_| DecodeError::UnknownKey {
            key: self.key.to_ascii_lowercase(),
            token: self.raw.to_owned(),
            input: input.to_owned(),
        })?;
        Ok(Token {
            raw: self.raw,
            key,
            value: self.value,
        })
    }
}

enum Step {
    Applied,
    Deferred,
}

/// Decodes dpctl-style match strings, e.g.
/// `Match[ingress_port=5,nw_dst=192.168.0.0/16,nw_proto=6,tp_src=80]`.
///
/// Tokens may come in any order. `tp_src` and `tp_dst` are routed to the TCP,
/// UDP or SCTP port by `nw_proto`, so they wait in the queue until `nw_proto`
/// has been applied. Keys are resolved as their token is dispatched, so the
/// first failing token in queue order decides the error.
#[derive(Copy, Clone, Debug, Default)]
pub struct Decoder {
    version: OfVersion,
    strict_transport: bool,
}

/// Decodes `input` with the default [Decoder] for `version`.
pub fn decode(input: &str, version: OfVersion) -> Result<Match, DecodeError> {
    Decoder::new(version).decode(input)
}

impl Decoder {
    pub fn new(version: OfVersion) -> Self {
        Self {
            version,
            strict_transport: false,
        }
    }

    /// When set, `tp_src`/`tp_dst` under an `nw_proto` without ports is an
    /// error instead of being ignored.
    pub fn strict_transport(mut self, strict: bool) -> Self {
        self.strict_transport = strict;
        self
    }

    #[inline]
    pub fn version(&self) -> OfVersion {
        self.version
    }

    #[tracing::instrument(level = "debug", skip(self), fields(version = %self.version))]
    pub fn decode(&self, input: &str) -> Result<Match, DecodeError> {
        let mut queue = tokenize(input)?;
        let mut mb = MatchBuilder::new(self.version);

        // Counts consecutive deferrals; once every queued token has been
        // deferred in a row, no further pass can make progress.
        let mut stalled = 0usize;
        while let Some(segment) = queue.pop_front() {
            let token = segment.resolve(input)?;
            match self.apply(&mut mb, &token)? {
                Step::Applied => stalled = 0,
                Step::Deferred => {
                    stalled += 1;
                    if stalled > queue.len() {
                        return Err(DecodeError::UnresolvedDependency {
                            token: token.raw.to_owned(),
                            input: input.to_owned(),
                        });
                    }
                    debug!(token = token.raw, "nw_proto unknown yet, deferred");
                    queue.push_back(segment);
                }
            }
        }
        Ok(mb.build())
    }

    fn apply(&self, mb: &mut MatchBuilder, token: &Token) -> Result<Step, DecodeError> {
        trace!(key = %token.key, value = token.value, "apply token");
        let value = token.value;
        match token.key {
            MatchKey::InPort => {
                mb.set_exact(FieldId::InPort, leaf(token, parse_dec, "a decimal port")?)?;
            }
            MatchKey::DlDst => {
                mb.set_exact(FieldId::EthDst, mac(token)?)?;
            }
            MatchKey::DlSrc => {
                mb.set_exact(FieldId::EthSrc, mac(token)?)?;
            }
            MatchKey::DlType => {
                mb.set_exact(
                    FieldId::EthType,
                    leaf(token, parse_hex_or_dec, "a decimal or 0x-hex ethertype")?,
                )?;
            }
            MatchKey::DlVlan => {
                // anything carrying "0x" is read as hex
                let vid = if value.contains("0x") {
                    parse_all(parse_hex_digits, &value.replacen("0x", "", 1)).ok()
                } else {
                    parse_all(parse_dec, value).ok()
                };
                let vid = vid.ok_or_else(|| malformed(token, "a decimal or 0x-hex VLAN id"))?;
                mb.set_exact(FieldId::VlanVid, vid)?;
            }
            MatchKey::DlVlanPcp => {
                mb.set_exact(FieldId::VlanPcp, byte(token)?)?;
            }
            MatchKey::NwDst => {
                let (ip, mask) = leaf(token, parse_cidr, "an IPv4 CIDR")?;
                mb.set_masked(FieldId::Ipv4Dst, ip, mask)?;
            }
            MatchKey::NwSrc => {
                let (ip, mask) = leaf(token, parse_cidr, "an IPv4 CIDR")?;
                mb.set_masked(FieldId::Ipv4Src, ip, mask)?;
            }
            MatchKey::NwProto => {
                mb.set_exact(FieldId::IpProto, byte(token)?)?;
            }
            MatchKey::NwTos => {
                // ECN and DSCP both take the whole value
                let tos = byte(token)?;
                if mb.version().supports(FieldId::IpEcn) {
                    mb.set_exact(FieldId::IpEcn, tos)?;
                } else {
                    warn!(version = %mb.version(), tos, "no ECN field, only DSCP is matched");
                }
                mb.set_exact(FieldId::IpDscp, tos)?;
            }
            MatchKey::TpDst => return self.apply_transport(mb, token, TransportDir::Dst),
            MatchKey::TpSrc => return self.apply_transport(mb, token, TransportDir::Src),
            MatchKey::IcmpType => {
                mb.set_exact(FieldId::IcmpType, u16_value(token, "a decimal ICMP type")?)?;
            }
            MatchKey::IcmpCode => {
                mb.set_exact(FieldId::IcmpCode, u16_value(token, "a decimal ICMP code")?)?;
            }
            MatchKey::ArpOpcode => {
                mb.set_exact(FieldId::ArpOp, leaf(token, parse_dec, "a decimal ARP opcode")?)?;
            }
            MatchKey::ArpSha => {
                mb.set_exact(FieldId::ArpSha, mac(token)?)?;
            }
            MatchKey::ArpDha => {
                mb.set_exact(FieldId::ArpTha, mac(token)?)?;
            }
            MatchKey::ArpSpa => {
                mb.set_exact(FieldId::ArpSpa, ipv4(token)?)?;
            }
            MatchKey::ArpDpa => {
                mb.set_exact(FieldId::ArpTpa, ipv4(token)?)?;
            }
            MatchKey::MplsLabel => {
                let label = leaf(token, parse_dec, "a decimal 32-bit MPLS label")?;
                let label = u32::try_from(label)
                    .map_err(|_| malformed(token, "a decimal 32-bit MPLS label"))?;
                mb.set_exact(FieldId::MplsLabel, label)?;
            }
            MatchKey::MplsTc => {
                mb.set_exact(FieldId::MplsTc, byte(token)?)?;
            }
            MatchKey::Metadata => {
                mb.set_exact(FieldId::Metadata, leaf(token, parse_dec, "a decimal u64")?)?;
            }
            MatchKey::MplsBos | MatchKey::TunnelId | MatchKey::PbbIsid => {
                debug!(key = %token.key, value, "accepted but not matched on");
            }
        }
        Ok(Step::Applied)
    }

    fn apply_transport(
        &self,
        mb: &mut MatchBuilder,
        token: &Token,
        dir: TransportDir,
    ) -> Result<Step, DecodeError> {
        let Some(proto) = mb.get(FieldId::IpProto).exact() else {
            return Ok(Step::Deferred);
        };
        let proto = proto as u8;
        let port = u16_value(token, "a decimal transport port")?;
        match FieldId::transport(proto, dir) {
            Some(field) => {
                mb.set_exact(field, port)?;
            }
            None if self.strict_transport => {
                return Err(DecodeError::UnsupportedTransport {
                    proto,
                    token: token.raw.to_owned(),
                });
            }
            None => warn!(proto, token = token.raw, "nw_proto has no ports, ignored"),
        }
        Ok(Step::Applied)
    }
}

/// Splits `input` into `key=value` segments. The match-everything spellings
/// ("", "any", "all", "[]") yield no segments. A leading `Match` tag and the
/// enclosing brackets are dropped; any other segment, empty ones included,
/// must have the form `key=value`.
fn tokenize(input: &str) -> Result<VecDeque<Segment<'_>>, DecodeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || parse_all(parse_match_all, trimmed).is_ok() {
        return Ok(VecDeque::new());
    }

    let body = match trimmed.strip_prefix(MATCH_TAG) {
        Some(rest) if rest.is_empty() || rest.trim_start().starts_with('[') => rest.trim_start(),
        _ => trimmed,
    };
    let body = body.strip_prefix('[').unwrap_or(body);
    let body = body.strip_suffix(']').unwrap_or(body).trim();
    if body.is_empty() {
        return Ok(VecDeque::new());
    }

    body.split(['[', ',', ']'])
        .map(str::trim)
        .map(|raw| {
            let malformed = || DecodeError::MalformedToken {
                token: raw.to_owned(),
                input: input.to_owned(),
            };
            let mut parts = raw.split('=');
            let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(malformed());
            };
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                return Err(malformed());
            }
            Ok(Segment { raw, key, value })
        })
        .collect()
}

fn malformed(token: &Token, expected: &'static str) -> DecodeError {
    DecodeError::MalformedValue {
        key: token.key,
        value: token.value.to_owned(),
        expected,
    }
}

/// Runs a leaf parser over the whole value of `token`.
fn leaf<'x, O>(
    token: &Token<'x>,
    parser: impl FnMut(&'x str) -> IResult<&'x str, O, NomError<&'x str>>,
    expected: &'static str,
) -> Result<O, DecodeError> {
    parse_all(parser, token.value).map_err(|_| malformed(token, expected))
}

fn byte(token: &Token) -> Result<u8, DecodeError> {
    let num = leaf(token, parse_dec, "a decimal byte")?;
    u8::try_from(num).map_err(|_| malformed(token, "a decimal byte"))
}

fn u16_value(token: &Token, expected: &'static str) -> Result<u16, DecodeError> {
    let num = leaf(token, parse_dec, expected)?;
    u16::try_from(num).map_err(|_| malformed(token, expected))
}

fn mac(token: &Token) -> Result<MacAddr, DecodeError> {
    leaf(token, parse_mac, "a colon-hex MAC address").map(MacAddr)
}

fn ipv4(token: &Token) -> Result<u32, DecodeError> {
    leaf(token, parse_ipv4_dotted, "a dotted IPv4 address")
}
