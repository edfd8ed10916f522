use std::io;
use std::net::SocketAddr;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid domain name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("message is truncated")]
    TruncatedMessage,
    #[error("malformed message: {0}")]
    MalformedMessage(&'static str),
    #[error("malformed domain name at offset {0}")]
    MalformedName(usize),
    #[error("failed to exchange messages with {server}")]
    Transport {
        server: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("no address found for {0}")]
    NotFound(String),
    #[error("failed to resolve name server {name}")]
    ResolutionFailed {
        name: String,
        #[source]
        source: Box<Error>,
    },
    #[error("gave up after {0} referrals")]
    TooManyReferrals(usize),
}
