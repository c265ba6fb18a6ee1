//! This crate provides the textual codec of flow matches: a dpctl-style
//! `Match[key=value,...]` string to [Match](ofmatch_core::r#match::Match) and
//! back.
//!
//! ## Example
//! ```no_run
//! use ofmatch_core::prelude::*;
//! use ofmatch_io::{decode, encode};
//!
//! let m = decode("Match[tp_dst=80,nw_proto=6,nw_dst=10.0.0.0/8]", OfVersion::Of13).unwrap();
//! assert_eq!(m.get(FieldId::TcpDst).exact(), Some(80));
//! assert_eq!(encode(&m).unwrap(), "Match[nw_dst=10.0.0.0/8,nw_proto=6,tp_dst=80]");
//! ```
mod decode;
mod encode;
mod key;

use ofmatch_core::r#match::MatchError;
use thiserror::Error;

pub use decode::{decode, Decoder};
pub use encode::{encode, EncodeError};
pub use key::MatchKey;

/// Decoding is all-or-nothing: any of these aborts the whole match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("token `{token}` does not have form 'key=value' parsing `{input}`")]
    MalformedToken { token: String, input: String },
    #[error("unknown key `{key}` in token `{token}` parsing `{input}`")]
    UnknownKey {
        key: String,
        token: String,
        input: String,
    },
    #[error("invalid value `{value}` for {key}, expected {expected}")]
    MalformedValue {
        key: MatchKey,
        value: String,
        expected: &'static str,
    },
    #[error("token `{token}` needs nw_proto, which never appears in `{input}`")]
    UnresolvedDependency { token: String, input: String },
    #[error("nw_proto={proto} has no transport ports, token `{token}`")]
    UnsupportedTransport { proto: u8, token: String },
    #[error(transparent)]
    Match(#[from] MatchError),
}

/// Basics for io
pub mod basic {
    /// Leaf value parsers
    pub mod parser {
        use nom::branch::alt;
        use nom::bytes::complete::{tag, tag_no_case, take_while_m_n};
        use nom::character::complete::{char, digit1, hex_digit1};
        use nom::combinator::{all_consuming, map, map_res, opt, verify};
        use nom::error::{Error as NomError, ErrorKind, ParseError};
        use nom::multi::separated_list1;
        use nom::sequence::{preceded, tuple};
        use nom::Err::Error;
        use nom::{Finish, IResult};

        /// Runs `parser` over the whole of `input`.
        pub fn parse_all<'a, O>(
            parser: impl FnMut(&'a str) -> IResult<&'a str, O, NomError<&'a str>>,
            input: &'a str,
        ) -> Result<O, NomError<&'a str>> {
            all_consuming(parser)(input)
                .finish()
                .map(|(_, out)| out)
        }

        /// r"[0-9]+"
        pub fn parse_digits<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, &'a str, E> {
            digit1(input)
        }

        /// r"[0-9]+" fitting into u64
        pub fn parse_dec<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u64, E> {
            let (rest, num) = digit1(input)?;
            match num.parse::<u64>() {
                Ok(num) => Ok((rest, num)),
                Err(_) => Err(Error(E::from_error_kind(input, ErrorKind::Digit))),
            }
        }

        /// r"0x[0-9a-fA-F]+" fitting into u64
        pub fn parse_hex<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u64, E> {
            preceded(tag_no_case("0x"), parse_hex_digits)(input)
        }

        /// r"[0-9a-fA-F]+" fitting into u64
        pub fn parse_hex_digits<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, u64, E> {
            let (rest, num) = hex_digit1(input)?;
            match u64::from_str_radix(num, 16) {
                Ok(num) => Ok((rest, num)),
                Err(_) => Err(Error(E::from_error_kind(input, ErrorKind::HexDigit))),
            }
        }

        /// r"0x[0-9a-fA-F]+|[0-9]+"
        pub fn parse_hex_or_dec<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, u64, E> {
            alt((parse_hex, parse_dec))(input)
        }

        /// r"[0-9a-fA-F]{1,2}(:[0-9a-fA-F]{1,2}){5}"
        pub fn parse_mac<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, [u8; 6], E> {
            fn parse_octet<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u8, E> {
                map_res(
                    take_while_m_n(1, 2, |c: char| c.is_ascii_hexdigit()),
                    |s: &str| u8::from_str_radix(s, 16),
                )(input)
                .map_err(|_: nom::Err<NomError<&str>>| {
                    Error(E::from_error_kind(input, ErrorKind::HexDigit))
                })
            }

            let (rest, octets) = verify(separated_list1(char(':'), parse_octet), |v: &Vec<u8>| {
                v.len() == 6
            })(input)?;
            let mut mac = [0u8; 6];
            mac.copy_from_slice(&octets);
            Ok((rest, mac))
        }

        /// r"[<=255].[<=255].[<=255].[<=255]"
        pub fn parse_ipv4_dotted<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, u32, E> {
            fn parse_u8<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u8, E> {
                let (rest, num) = digit1(input)?;
                if let Ok(num) = num.parse::<u8>() {
                    Ok((rest, num))
                } else {
                    Err(Error(E::from_error_kind(input, ErrorKind::Digit)))
                }
            }

            let (rest, (o1, _, o2, _, o3, _, o4)) = tuple((
                parse_u8,
                char('.'),
                parse_u8,
                char('.'),
                parse_u8,
                char('.'),
                parse_u8,
            ))(input)?;
            Ok((
                rest,
                (o1 as u32) << 24 | (o2 as u32) << 16 | (o3 as u32) << 8 | o4 as u32,
            ))
        }

        /// r"[0-32]", returns the netmask
        pub fn parse_prefix_mask<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, u32, E> {
            let (rest, len) = parse_dec(input)?;
            if len <= 32 {
                Ok((rest, prefix_to_mask(len as u32)))
            } else {
                Err(Error(E::from_error_kind(input, ErrorKind::Verify)))
            }
        }

        /// r"a.b.c.d(/len|/a.b.c.d)?", returns (address, mask). No suffix means
        /// a /32 host address.
        pub fn parse_cidr<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, (u32, u32), E> {
            let (rest, ip) = parse_ipv4_dotted(input)?;
            let (rest, mask) = opt(preceded(
                char('/'),
                alt((parse_ipv4_dotted, parse_prefix_mask)),
            ))(rest)?;
            Ok((rest, (ip, mask.unwrap_or(u32::MAX))))
        }

        pub fn prefix_to_mask(len: u32) -> u32 {
            match len {
                0 => 0,
                len => u32::MAX << (32 - len.min(32)),
            }
        }

        /// Inverse of [prefix_to_mask], `None` for non-contiguous masks.
        pub fn mask_to_prefix(mask: u32) -> Option<u32> {
            let len = mask.leading_ones();
            (prefix_to_mask(len) == mask).then_some(len)
        }

        /// r"(any)|(all)|(\[\])|" maps to the match-everything text
        pub fn parse_match_all<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, (), E> {
            map(
                alt((tag_no_case("any"), tag_no_case("all"), tag("[]"))),
                |_| (),
            )(input)
        }
    }
}

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{decode, encode, DecodeError, Decoder, EncodeError, MatchKey};
}

#[cfg(test)]
mod tests {
    use super::basic::parser::*;

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_all(parse_dec, "2054"), Ok(2054));
        assert_eq!(parse_all(parse_hex_or_dec, "0x0806"), Ok(0x806));
        assert_eq!(parse_all(parse_hex_or_dec, "2054"), Ok(2054));
        assert!(parse_all(parse_dec, "0x10").is_err());
        assert!(parse_all(parse_dec, "-1").is_err());
        assert!(parse_all(parse_dec, "99999999999999999999").is_err());
        assert!(parse_all(parse_hex_or_dec, "zz").is_err());
        assert_eq!(parse_all(parse_digits, "42").map(str::len), Ok(2));
    }

    #[test]
    fn test_parse_mac() {
        assert_eq!(
            parse_all(parse_mac, "00:20:01:11:22:33"),
            Ok([0x00, 0x20, 0x01, 0x11, 0x22, 0x33])
        );
        assert_eq!(
            parse_all(parse_mac, "a:B:c:D:e:F"),
            Ok([0xa, 0xb, 0xc, 0xd, 0xe, 0xf])
        );
        assert!(parse_all(parse_mac, "00:20:01:11:22").is_err());
        assert!(parse_all(parse_mac, "00:20:01:11:22:33:44").is_err());
        assert!(parse_all(parse_mac, "00:20:01:11:22:3g").is_err());
        assert!(parse_all(parse_mac, "002001112233").is_err());
    }

    #[test]
    fn test_parse_cidr() {
        assert_eq!(
            parse_all(parse_cidr, "192.168.1.0/24"),
            Ok((0xc0a8_0100, 0xffff_ff00))
        );
        assert_eq!(
            parse_all(parse_cidr, "128.8.128.118"),
            Ok((0x8008_8076, u32::MAX))
        );
        assert_eq!(
            parse_all(parse_cidr, "10.0.0.0/255.0.0.0"),
            Ok((0x0a00_0000, 0xff00_0000))
        );
        assert_eq!(parse_all(parse_cidr, "0.0.0.0/0"), Ok((0, 0)));
        assert!(parse_all(parse_cidr, "10.0.0.0/33").is_err());
        assert!(parse_all(parse_cidr, "10.0.0.256").is_err());
        assert!(parse_all(parse_cidr, "10.0.0").is_err());
    }

    #[test]
    fn test_masks() {
        assert_eq!(prefix_to_mask(0), 0);
        assert_eq!(prefix_to_mask(8), 0xff00_0000);
        assert_eq!(prefix_to_mask(32), u32::MAX);
        assert_eq!(mask_to_prefix(0xffff_ff00), Some(24));
        assert_eq!(mask_to_prefix(0), Some(0));
        assert_eq!(mask_to_prefix(0xff00_ff00), None);
    }

    #[test]
    fn test_match_all() {
        for text in ["any", "ALL", "[]"] {
            assert!(parse_all(parse_match_all, text).is_ok());
        }
        assert!(parse_all(parse_match_all, "anything").is_err());
    }
}
