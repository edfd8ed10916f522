use std::net::Ipv4Addr;

use spectral::prelude::*;

use iterdns::dns::{decode_response, DomainName, QueryType, RData};
use iterdns::Error;

/// A root server referral for www.example.com with compressed names: two
/// name servers for com, their glue, and an AAAA record the client skips.
fn root_referral() -> Vec<u8> {
    let parts: [&[u8]; 9] = [
        // header: response, 1 question, 0 answers, 2 authority, 3 additional
        b"\x1f\x2e\x80\x00\x00\x01\x00\x00\x00\x02\x00\x03",
        // question at 12, "com" starts at 24
        b"\x03www\x07example\x03com\x00\x00\x01\x00\x01",
        // com NS a.gtld-servers.com, rdata at 45, "gtld-servers" at 47
        b"\xc0\x18\x00\x02\x00\x01\x00\x02\xa3\x00\x00\x11",
        b"\x01a\x0cgtld-servers\xc0\x18",
        // com NS b.gtld-servers.com, rdata at 74
        b"\xc0\x18\x00\x02\x00\x01\x00\x02\xa3\x00\x00\x04\x01b\xc0\x2f",
        // a.gtld-servers.com A 192.5.6.30
        b"\xc0\x2d\x00\x01\x00\x01\x00\x02\xa3\x00\x00\x04\xc0\x05\x06\x1e",
        // b.gtld-servers.com A 192.33.14.30
        b"\xc0\x4a\x00\x01\x00\x01\x00\x02\xa3\x00\x00\x04\xc0\x21\x0e\x1e",
        // a.gtld-servers.com AAAA 2001:503:a83e::2:30
        b"\xc0\x2d\x00\x1c\x00\x01\x00\x02\xa3\x00\x00\x10",
        b"\x20\x01\x05\x03\xa8\x3e\x00\x00\x00\x00\x00\x00\x00\x02\x00\x30",
    ];

    parts.concat()
}

#[test]
fn decodes_compressed_referral() {
    let msg = decode_response(&root_referral()).unwrap();

    assert_eq!(msg.header().id, 0x1f2e);
    assert!(msg.header().is_response());
    assert_eq!(msg.question().name.as_str(), "www.example.com");
    assert_that(&msg.answers().len()).is_equal_to(0);

    let hosts: Vec<&DomainName> = msg.name_servers().collect();
    assert_eq!(
        hosts,
        vec![
            &DomainName::from("a.gtld-servers.com"),
            &DomainName::from("b.gtld-servers.com"),
        ]
    );
    assert!(msg.authority().iter().all(|rr| rr.name.as_str() == "com"));
}

#[test]
fn decodes_glue_and_skips_other_types() {
    let msg = decode_response(&root_referral()).unwrap();
    let additional = msg.additional();

    assert_that(&additional.len()).is_equal_to(3);
    assert_eq!(additional[0].name.as_str(), "a.gtld-servers.com");
    assert_eq!(additional[0].data, RData::A(Ipv4Addr::new(192, 5, 6, 30)));
    assert_eq!(additional[1].data.to_string(), "192.33.14.30");
    assert_eq!(additional[2].rtype, QueryType::AAAA);
    assert_eq!(additional[2].rdlength, 16);

    let b = DomainName::from("b.gtld-servers.com");
    assert_eq!(msg.glue_for(&b), Some(Ipv4Addr::new(192, 33, 14, 30)));
}

#[test]
fn rejects_referral_cut_inside_a_record() {
    let raw = root_referral();

    let result = decode_response(&raw[..raw.len() - 5]);

    assert!(matches!(result, Err(Error::TruncatedMessage)));
}

#[test]
fn rejects_referral_missing_records() {
    let raw = root_referral();

    // ends right after the second additional record
    let result = decode_response(&raw[..110]);

    assert!(matches!(result, Err(Error::MalformedMessage(_))));
}
