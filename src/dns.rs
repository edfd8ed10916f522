pub mod codec;
pub mod resolver;
pub mod transport;

pub use codec::{decode_response, encode_message, encode_query};
pub use resolver::Resolver;
pub use transport::{Transport, UdpTransport};

use bitflags::bitflags;
use bytes::BufMut;

use std::fmt;
use std::net::Ipv4Addr;

use crate::error::{Error, Result};

pub const HEADER_LEN: usize = 12;
pub const MAX_LABEL_LEN: usize = 63;
/// Longest encoded name, length octets and terminator included.
pub const MAX_NAME_LEN: usize = 255;
/// Ceiling for a DNS message over UDP without EDNS0.
pub const MAX_UDP_MESSAGE_LEN: usize = 512;
pub const DNS_PORT: u16 = 53;

bitflags! {
    /// The single-bit fields of the second header word, at their wire positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: u16 {
        const QR = 0b1000_0000_0000_0000;
        const AA = 0b0000_0100_0000_0000;
        const TC = 0b0000_0010_0000_0000;
        const RD = 0b0000_0001_0000_0000;
        const RA = 0b0000_0000_1000_0000;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub id: u16,
    pub flags: Flags,
    pub opcode: OpCode,
    /// Reserved, always zero on messages built here.
    pub z: u8,
    pub response_code: ResponseCode,
    pub qd_count: u16,
    pub an_count: u16,
    pub ns_count: u16,
    pub ar_count: u16,
}

impl Header {
    pub fn query(id: u16, recursion_desired: bool) -> Self {
        let mut flags = Flags::empty();
        flags.set(Flags::RD, recursion_desired);

        Header {
            id,
            flags,
            opcode: OpCode::StandardQuery,
            z: 0,
            response_code: ResponseCode::NoError,
            qd_count: 1,
            an_count: 0,
            ns_count: 0,
            ar_count: 0,
        }
    }

    pub fn response(id: u16) -> Self {
        Header {
            flags: Flags::QR,
            ..Header::query(id, false)
        }
    }

    pub fn is_response(&self) -> bool {
        self.flags.contains(Flags::QR)
    }

    pub fn is_truncated(&self) -> bool {
        self.flags.contains(Flags::TC)
    }

    /// Packs the flag bits, OPCODE, Z and RCODE into the second header word.
    pub fn flags_word(&self) -> u16 {
        let mut word = self.flags.bits();
        word |= (u16::from(u8::from(self.opcode)) << 11) & 0b0111_1000_0000_0000;
        word |= (u16::from(self.z) << 4) & 0b0000_0000_0111_0000;
        word |= u16::from(u8::from(self.response_code)) & 0b0000_0000_0000_1111;
        word
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpCode {
    StandardQuery,
    InverseQuery,
    ServerStatusRequest,
    Reserved(u8),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Other(u8),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum QueryType {
    A,
    NS,
    CNAME,
    SOA,
    MX,
    AAAA,
    ALL,
    Unknown(u16),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum QueryClass {
    IN,
    CS,
    CH,
    HS,
    Unknown(u16),
}

/// A dot separated domain name without the trailing root dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainName(String);

impl DomainName {
    /// Builds a name from labels read off the wire. Labels are kept as they are.
    pub(crate) fn from_labels(labels: Vec<String>) -> Self {
        Self(labels.join("."))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Compares two names the way DNS does, ignoring ASCII case.
    pub fn matches(&self, other: &DomainName) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    /// Length prefixed labels followed by the zero octet of the root.
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        let mut raw = Vec::with_capacity(self.0.len() + 2);

        if !self.is_root() {
            for label in self.0.split('.') {
                let bytes = label.as_bytes();
                if bytes.is_empty() {
                    return Err(self.invalid("empty label"));
                }
                if bytes.len() > MAX_LABEL_LEN {
                    return Err(self.invalid("label is longer than 63 octets"));
                }

                raw.put_u8(bytes.len() as u8);
                raw.put_slice(bytes);
            }
        }
        // null terminated
        raw.put_u8(0);

        if raw.len() > MAX_NAME_LEN {
            return Err(self.invalid("name is longer than 255 octets"));
        }

        Ok(raw)
    }

    fn invalid(&self, reason: &'static str) -> Error {
        Error::InvalidName {
            name: self.0.clone(),
            reason,
        }
    }
}

impl From<&str> for DomainName {
    fn from(name: &str) -> Self {
        Self(name.strip_suffix('.').unwrap_or(name).to_string())
    }
}

impl From<String> for DomainName {
    fn from(name: String) -> Self {
        DomainName::from(name.as_str())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Question {
    pub name: DomainName,
    pub query_type: QueryType,
    pub query_class: QueryClass,
}

impl Question {
    pub fn new(name: impl Into<DomainName>, query_type: QueryType) -> Self {
        Question {
            name: name.into(),
            query_type,
            query_class: QueryClass::IN,
        }
    }

    pub fn to_wire(&self) -> Result<Vec<u8>> {
        let mut raw = self.name.to_wire()?;
        raw.put_u16(self.query_type.into());
        raw.put_u16(self.query_class.into());
        Ok(raw)
    }
}

/// Record data, interpreted for the types referral chasing needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    NS(DomainName),
    // anything else is carried as raw bytes
    Other(Vec<u8>),
}

impl RData {
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        match self {
            RData::A(addr) => Ok(addr.octets().to_vec()),
            RData::NS(host) => host.to_wire(),
            RData::Other(data) => Ok(data.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: DomainName,
    pub rtype: QueryType,
    pub class: QueryClass,
    pub ttl: u32,
    pub rdlength: u16,
    pub data: RData,
}

impl ResourceRecord {
    pub fn a(name: impl Into<DomainName>, ttl: u32, addr: Ipv4Addr) -> Self {
        ResourceRecord {
            name: name.into(),
            rtype: QueryType::A,
            class: QueryClass::IN,
            ttl,
            // IPv4 addr consists of 4 byte octets
            rdlength: 4,
            data: RData::A(addr),
        }
    }

    pub fn ns(name: impl Into<DomainName>, ttl: u32, host: impl Into<DomainName>) -> Result<Self> {
        let host = host.into();
        let rdlength = host.to_wire()?.len() as u16;

        Ok(ResourceRecord {
            name: name.into(),
            rtype: QueryType::NS,
            class: QueryClass::IN,
            ttl,
            rdlength,
            data: RData::NS(host),
        })
    }

    pub fn other(
        name: impl Into<DomainName>,
        rtype: QueryType,
        ttl: u32,
        data: Vec<u8>,
    ) -> Result<Self> {
        let rdlength = u16::try_from(data.len())
            .map_err(|_| Error::MalformedMessage("record data is longer than 65535 octets"))?;

        Ok(ResourceRecord {
            name: name.into(),
            rtype,
            class: QueryClass::IN,
            ttl,
            rdlength,
            data: RData::Other(data),
        })
    }

    /// Serialises the record without compression. RDLENGTH is taken from the
    /// encoded data, not from `rdlength`.
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        let mut raw = self.name.to_wire()?;
        raw.put_u16(self.rtype.into());
        raw.put_u16(self.class.into());
        raw.put_u32(self.ttl);

        let rdata = self.data.to_wire()?;
        let rdlength = u16::try_from(rdata.len())
            .map_err(|_| Error::MalformedMessage("record data is longer than 65535 octets"))?;
        raw.put_u16(rdlength);
        raw.extend(rdata);

        Ok(raw)
    }
}

/// A decoded or to-be-encoded DNS message with exactly one question.
///
/// The header counts always agree with the section lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    header: Header,
    question: Question,
    answers: Vec<ResourceRecord>,
    authority: Vec<ResourceRecord>,
    additional: Vec<ResourceRecord>,
}

impl Message {
    pub fn query(id: u16, question: Question, recursion_desired: bool) -> Self {
        Message {
            header: Header::query(id, recursion_desired),
            question,
            answers: vec![],
            authority: vec![],
            additional: vec![],
        }
    }

    /// Assembles a message, overwriting the header counts with the section lengths.
    pub fn new(
        mut header: Header,
        question: Question,
        answers: Vec<ResourceRecord>,
        authority: Vec<ResourceRecord>,
        additional: Vec<ResourceRecord>,
    ) -> Result<Self> {
        let count = |records: &[ResourceRecord]| {
            u16::try_from(records.len())
                .map_err(|_| Error::MalformedMessage("more than 65535 records in a section"))
        };

        header.qd_count = 1;
        header.an_count = count(&answers)?;
        header.ns_count = count(&authority)?;
        header.ar_count = count(&additional)?;

        Ok(Message {
            header,
            question,
            answers,
            authority,
            additional,
        })
    }

    pub fn response(
        id: u16,
        question: Question,
        answers: Vec<ResourceRecord>,
        authority: Vec<ResourceRecord>,
        additional: Vec<ResourceRecord>,
    ) -> Result<Self> {
        Message::new(Header::response(id), question, answers, authority, additional)
    }

    /// Used by the parser once every declared record has been read.
    pub(crate) fn from_parts(
        header: Header,
        question: Question,
        answers: Vec<ResourceRecord>,
        authority: Vec<ResourceRecord>,
        additional: Vec<ResourceRecord>,
    ) -> Self {
        Message {
            header,
            question,
            answers,
            authority,
            additional,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn answers(&self) -> &[ResourceRecord] {
        &self.answers
    }

    pub fn authority(&self) -> &[ResourceRecord] {
        &self.authority
    }

    pub fn additional(&self) -> &[ResourceRecord] {
        &self.additional
    }

    /// Host names of the name server records in the authority section, in order.
    pub fn name_servers(&self) -> impl Iterator<Item = &DomainName> {
        self.authority.iter().filter_map(|rr| match &rr.data {
            RData::NS(host) => Some(host),
            _ => None,
        })
    }

    /// The address glue for `host` from the additional section, if any.
    pub fn glue_for(&self, host: &DomainName) -> Option<Ipv4Addr> {
        self.additional.iter().find_map(|rr| match rr.data {
            RData::A(addr) if rr.name.matches(host) => Some(addr),
            _ => None,
        })
    }
}

impl From<&Header> for Vec<u8> {
    fn from(header: &Header) -> Self {
        let mut raw_header = Vec::with_capacity(HEADER_LEN);

        raw_header.put_u16(header.id);
        raw_header.put_u16(header.flags_word());
        raw_header.put_u16(header.qd_count);
        raw_header.put_u16(header.an_count);
        raw_header.put_u16(header.ns_count);
        raw_header.put_u16(header.ar_count);

        raw_header
    }
}

impl From<u8> for OpCode {
    fn from(code: u8) -> Self {
        match code {
            0 => OpCode::StandardQuery,
            1 => OpCode::InverseQuery,
            2 => OpCode::ServerStatusRequest,
            v => OpCode::Reserved(v),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(code: OpCode) -> Self {
        match code {
            OpCode::StandardQuery => 0,
            OpCode::InverseQuery => 1,
            OpCode::ServerStatusRequest => 2,
            OpCode::Reserved(code) => code,
        }
    }
}

impl From<u8> for ResponseCode {
    fn from(code: u8) -> Self {
        match code {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            v => ResponseCode::Other(v),
        }
    }
}

impl From<ResponseCode> for u8 {
    fn from(value: ResponseCode) -> Self {
        match value {
            ResponseCode::NoError => 0,
            ResponseCode::FormatError => 1,
            ResponseCode::ServerFailure => 2,
            ResponseCode::NameError => 3,
            ResponseCode::NotImplemented => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Other(v) => v,
        }
    }
}

impl From<u16> for QueryType {
    fn from(value: u16) -> Self {
        match value {
            1 => QueryType::A,
            2 => QueryType::NS,
            //NOTE: 3 and 4 Obsolete
            5 => QueryType::CNAME,
            6 => QueryType::SOA,
            15 => QueryType::MX,
            28 => QueryType::AAAA,
            255 => QueryType::ALL,
            t => QueryType::Unknown(t),
        }
    }
}

impl From<QueryType> for u16 {
    fn from(value: QueryType) -> u16 {
        match value {
            QueryType::A => 1,
            QueryType::NS => 2,
            QueryType::CNAME => 5,
            QueryType::SOA => 6,
            QueryType::MX => 15,
            QueryType::AAAA => 28,
            QueryType::ALL => 255,
            QueryType::Unknown(t) => t,
        }
    }
}

impl From<u16> for QueryClass {
    fn from(value: u16) -> Self {
        match value {
            1 => QueryClass::IN,
            2 => QueryClass::CS,
            3 => QueryClass::CH,
            4 => QueryClass::HS,
            c => QueryClass::Unknown(c),
        }
    }
}

impl From<QueryClass> for u16 {
    fn from(value: QueryClass) -> Self {
        match value {
            QueryClass::IN => 1,
            QueryClass::CS => 2,
            QueryClass::CH => 3,
            QueryClass::HS => 4,
            QueryClass::Unknown(c) => c,
        }
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str(".")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Unknown(t) => write!(f, "TYPE{}", t),
            known => write!(f, "{:?}", known),
        }
    }
}

impl fmt::Display for QueryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryClass::Unknown(c) => write!(f, "CLASS{}", c),
            known => write!(f, "{:?}", known),
        }
    }
}

/// Uninterpreted data renders as nothing.
impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RData::A(addr) => write!(f, "{}", addr),
            RData::NS(host) => write!(f, "{}", host),
            RData::Other(_) => Ok(()),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "QR: {}", self.flags.contains(Flags::QR))?;
        writeln!(f, "OPCODE: {}", u8::from(self.opcode))?;
        writeln!(f, "AA: {}", self.flags.contains(Flags::AA))?;
        writeln!(f, "TC: {}", self.flags.contains(Flags::TC))?;
        writeln!(f, "RD: {}", self.flags.contains(Flags::RD))?;
        writeln!(f, "RA: {}", self.flags.contains(Flags::RA))?;
        writeln!(f, "Z: {}", self.z)?;
        writeln!(f, "RCODE: {}", u8::from(self.response_code))?;
        writeln!(f, "QDCOUNT: {}", self.qd_count)?;
        writeln!(f, "ANCOUNT: {}", self.an_count)?;
        writeln!(f, "NSCOUNT: {}", self.ns_count)?;
        writeln!(f, "ARCOUNT: {}", self.ar_count)
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "QNAME: {}", self.name)?;
        writeln!(f, "QTYPE: {}", self.query_type)?;
        writeln!(f, "QCLASS: {}", self.query_class)
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NAME: {}", self.name)?;
        writeln!(f, "TYPE: {}", self.rtype)?;
        writeln!(f, "CLASS: {}", self.class)?;
        writeln!(f, "TTL: {}", self.ttl)?;
        writeln!(f, "RDLENGTH: {}", self.rdlength)?;
        writeln!(f, "RDATA: {}", self.data)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)?;
        write!(f, "{}", self.question)?;

        let sections = [
            ("ANSWER", &self.answers),
            ("AUTHORITY", &self.authority),
            ("ADDITIONAL", &self.additional),
        ];
        for (title, records) in sections {
            if records.is_empty() {
                continue;
            }
            writeln!(f, ";; {} SECTION", title)?;
            for rr in records.iter() {
                write!(f, "{}", rr)?;
            }
        }

        Ok(())
    }
}
