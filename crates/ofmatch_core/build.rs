use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Header layout in catalog order: (field name, bit width). The order must
/// follow `FieldId::ALL`.
const FIELDS: &[(&str, usize)] = &[
    ("in_port", 32),
    ("eth_src", 48),
    ("eth_dst", 48),
    ("eth_type", 16),
    ("vlan_vid", 12),
    ("vlan_pcp", 8),
    ("ipv4_src", 32),
    ("ipv4_dst", 32),
    ("ip_proto", 8),
    ("ip_dscp", 6),
    ("ip_ecn", 2),
    ("tcp_src", 16),
    ("tcp_dst", 16),
    ("udp_src", 16),
    ("udp_dst", 16),
    ("sctp_src", 16),
    ("sctp_dst", 16),
    ("icmpv4_type", 8),
    ("icmpv4_code", 8),
    ("arp_op", 16),
    ("arp_sha", 48),
    ("arp_tha", 48),
    ("arp_spa", 32),
    ("arp_tpa", 32),
    ("mpls_label", 32),
    ("mpls_tc", 8),
    ("metadata", 64),
];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    let path = Path::new(&env::var("OUT_DIR").unwrap()).join("codegen.rs");
    let mut file = BufWriter::new(File::create(&path).unwrap());
    let mut m: phf_codegen::OrderedMap<&'static str> = phf_codegen::OrderedMap::new();
    let mut ranges = vec![];
    let mut counter: usize = 0;

    for &(name, width) in FIELDS {
        let range = format!("({}usize, {}usize)", counter, counter + width);
        m.entry(name, range.as_str());
        ranges.push(range);
        counter += width;
    }

    write!(
        &mut file,
        "pub static FIELD_MAP: phf::OrderedMap<&'static str, (usize, usize)> = {}",
        m.build()
    )
    .unwrap();
    writeln!(&mut file, ";\n").unwrap();
    writeln!(
        &mut file,
        "pub const FIELD_RANGES: [(usize, usize); {}] = [{}];\n",
        ranges.len(),
        ranges.join(", ")
    )
    .unwrap();
    writeln!(&mut file, "pub const MAX_POS: usize = {}usize;\n", counter).unwrap();
}
