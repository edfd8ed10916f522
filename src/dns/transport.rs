use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::thread;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::runtime::{Builder, Runtime};
use tokio::time::{timeout_at, Instant};

use crate::{
    dns::MAX_UDP_MESSAGE_LEN,
    error::{Error, Result},
    settings::Settings,
};

/// Moves one query to a server and hands back the raw reply.
pub trait Transport {
    fn send(&self, server: SocketAddr, query: &[u8]) -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, server: SocketAddr, query: &[u8]) -> Result<Vec<u8>> {
        (**self).send(server, query)
    }
}

/// Blocking UDP exchanges, one fresh socket per attempt.
///
/// Replies are read into a 512 byte buffer; anything longer is cut by the
/// socket and decodes as truncated.
pub struct UdpTransport {
    runtime: Runtime,
    timeout: Duration,
    retries: u32,
    backoff: Duration,
}

impl UdpTransport {
    pub fn new(timeout: Duration, retries: u32, backoff: Duration) -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_io().enable_time().build()?;

        Ok(UdpTransport {
            runtime,
            timeout,
            retries,
            backoff,
        })
    }

    pub fn from_settings(settings: &Settings) -> io::Result<Self> {
        UdpTransport::new(
            settings.query_timeout(),
            settings.retries,
            settings.retry_backoff(),
        )
    }

    async fn exchange(&self, server: SocketAddr, query: &[u8]) -> io::Result<Vec<u8>> {
        let local = match server {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(server).await?;
        socket.send(query).await?;

        // a timeout too large to add to the clock means no deadline
        let deadline = Instant::now().checked_add(self.timeout);
        let mut buf = [0u8; MAX_UDP_MESSAGE_LEN];
        loop {
            let received = match deadline {
                Some(deadline) => timeout_at(deadline, socket.recv(&mut buf))
                    .await
                    .map_err(|_| {
                        io::Error::new(io::ErrorKind::TimedOut, "no reply before the deadline")
                    })?,
                None => socket.recv(&mut buf).await,
            };
            let len = received?;

            let reply = &buf[..len];
            // the first two bytes of both messages are the transaction id
            if reply.len() >= 2 && reply.get(..2) == query.get(..2) {
                return Ok(reply.to_vec());
            }
            log::warn!(
                "discarding {} byte datagram from {} with an unexpected id",
                len,
                server
            );
        }
    }
}

impl Transport for UdpTransport {
    fn send(&self, server: SocketAddr, query: &[u8]) -> Result<Vec<u8>> {
        let mut backoff = self.backoff;
        let mut attempt = 0;

        loop {
            match self.runtime.block_on(self.exchange(server, query)) {
                Ok(reply) => {
                    log::trace!("received {} bytes from {}", reply.len(), server);
                    return Ok(reply);
                }
                Err(err) if attempt < self.retries => {
                    attempt += 1;
                    log::warn!(
                        "exchange with {} failed: {}, retry {}/{} in {:?}",
                        server,
                        err,
                        attempt,
                        self.retries,
                        backoff
                    );
                    thread::sleep(backoff);
                    backoff = backoff.saturating_mul(2);
                }
                Err(source) => return Err(Error::Transport { server, source }),
            }
        }
    }
}
