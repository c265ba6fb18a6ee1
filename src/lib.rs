//! Flow match model and its dpctl-style text codec.
//!
//! ```no_run
//! use ofmatch::prelude::*;
//!
//! let m = decode("Match[ingress_port=1,dl_type=0x0800,nw_proto=6,tp_dst=22]", OfVersion::Of13)
//!     .unwrap();
//! let l3 = mask_l4_and_up(&m);
//! assert_eq!(encode(&l3).unwrap(), "Match[ingress_port=1,dl_type=0x0800,nw_proto=6]");
//! ```
pub use ofmatch_core as core;
pub use ofmatch_io as io;

pub use ofmatch_core::r#match::{Match, MatchBuilder};
pub use ofmatch_io::{decode, encode};

pub mod prelude {
    pub use ofmatch_core::prelude::*;
    pub use ofmatch_io::prelude::*;
}
