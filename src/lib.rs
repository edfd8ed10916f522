//! An iterative DNS client: encodes queries, decodes responses and follows
//! referrals from a root server down to an address.

pub mod dns;
pub mod error;
pub mod parser;
pub mod settings;

pub use dns::{Resolver, Transport, UdpTransport};
pub use error::{Error, Result};
