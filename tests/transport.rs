use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::Duration;

use iterdns::dns::{decode_response, encode_message, Message, QueryType, Question, ResourceRecord};
use iterdns::{Error, Transport, UdpTransport};

/// A one-shot UDP server on the loopback interface. `reply` builds the
/// datagrams to send back for the query it receives.
fn serve_once<F>(reply: F) -> (SocketAddr, thread::JoinHandle<()>)
where
    F: FnOnce(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = socket.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let mut buf = [0u8; 512];
        let (len, peer) = socket.recv_from(&mut buf).unwrap();
        for datagram in reply(&buf[..len]) {
            socket.send_to(&datagram, peer).unwrap();
        }
    });

    (addr, handle)
}

fn answer_for(query: &[u8]) -> Vec<u8> {
    let query = decode_response(query).unwrap();
    let name = query.question().name.clone();
    let response = Message::response(
        query.header().id,
        query.question().clone(),
        vec![ResourceRecord::a(name, 60, "127.0.0.2".parse().unwrap())],
        vec![],
        vec![],
    )
    .unwrap();

    encode_message(&response).unwrap()
}

fn raw_query(id: u16) -> Vec<u8> {
    let query = Message::query(id, Question::new("example.com", QueryType::A), false);
    iterdns::dns::encode_query(query.header(), query.question()).unwrap()
}

#[test]
fn exchanges_a_datagram() {
    let _ = pretty_env_logger::try_init();
    let (addr, server) = serve_once(|query| vec![answer_for(query)]);
    let transport =
        UdpTransport::new(Duration::from_secs(2), 0, Duration::from_millis(10)).unwrap();

    let reply = transport.send(addr, &raw_query(0x1234)).unwrap();
    server.join().unwrap();

    let response = decode_response(&reply).unwrap();
    assert_eq!(response.header().id, 0x1234);
    assert_eq!(response.answers()[0].data.to_string(), "127.0.0.2");
}

#[test]
fn accepts_unbounded_timeout() {
    let (addr, server) = serve_once(|query| vec![answer_for(query)]);
    let transport = UdpTransport::new(Duration::MAX, 0, Duration::MAX).unwrap();

    let reply = transport.send(addr, &raw_query(0x0101)).unwrap();
    server.join().unwrap();

    assert_eq!(decode_response(&reply).unwrap().header().id, 0x0101);
}

#[test]
fn skips_replies_with_another_id() {
    let (addr, server) = serve_once(|query| {
        let mut stray = answer_for(query);
        stray[0] ^= 0xff;
        vec![stray, answer_for(query)]
    });
    let transport =
        UdpTransport::new(Duration::from_secs(2), 0, Duration::from_millis(10)).unwrap();

    let reply = transport.send(addr, &raw_query(0x4242)).unwrap();
    server.join().unwrap();

    assert_eq!(decode_response(&reply).unwrap().header().id, 0x4242);
}

#[test]
fn times_out_without_reply() {
    // bound but never answering
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = silent.local_addr().unwrap();
    let transport =
        UdpTransport::new(Duration::from_millis(50), 1, Duration::from_millis(5)).unwrap();

    let result = transport.send(addr, &raw_query(7));

    match result {
        Err(Error::Transport { server, source }) => {
            assert_eq!(server, addr);
            assert_eq!(source.kind(), io::ErrorKind::TimedOut);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}
