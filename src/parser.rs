use std::net::Ipv4Addr;

use nom::{
    bytes::complete::take,
    error::{ErrorKind, ParseError},
    multi::count,
    number::complete::{be_u16, be_u32},
    sequence::{preceded, tuple},
    Err as NomErr, IResult,
};

use crate::dns::{
    DomainName, Flags, Header, Message, OpCode, QueryType, Question, RData, ResourceRecord,
    ResponseCode, MAX_NAME_LEN,
};

/// Both high bits set turn a length octet into the first half of a pointer.
const POINTER_MASK: u8 = 0b1100_0000;
/// Bytes a single name may walk across all pointer jumps.
const MAX_NAME_WORK: usize = 2 * MAX_NAME_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A field runs past the end of the buffer.
    Truncated,
    /// Bad label type, pointer outside the message, or a name that never ends.
    MalformedName(usize),
    Malformed(&'static str),
}

impl<I> ParseError<I> for Error {
    fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Eof => Error::Truncated,
            _ => Error::Malformed("unexpected input"),
        }
    }

    fn append(_input: I, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl From<Error> for crate::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Truncated => crate::Error::TruncatedMessage,
            Error::MalformedName(offset) => crate::Error::MalformedName(offset),
            Error::Malformed(reason) => crate::Error::MalformedMessage(reason),
        }
    }
}

type Res<'a, T> = IResult<&'a [u8], T, Error>;

fn failure(err: Error) -> NomErr<Error> {
    NomErr::Failure(err)
}

fn flatten(err: NomErr<Error>) -> Error {
    match err {
        NomErr::Error(e) | NomErr::Failure(e) => e,
        NomErr::Incomplete(_) => Error::Truncated,
    }
}

pub fn dns_header(input: &[u8]) -> Res<'_, Header> {
    let mut parser = tuple::<_, _, Error, _>((be_u16, be_u16, be_u16, be_u16, be_u16, be_u16));

    let (input, (id, word, qd_count, an_count, ns_count, ar_count)) = parser(input)?;

    Ok((
        input,
        Header {
            id,
            flags: Flags::from_bits_truncate(word),
            opcode: OpCode::from(((word >> 11) & 0x0f) as u8),
            z: ((word >> 4) & 0x07) as u8,
            response_code: ResponseCode::from((word & 0x0f) as u8),
            qd_count,
            an_count,
            ns_count,
            ar_count,
        },
    ))
}

/// Decodes the possibly compressed name starting at `start` in `message`.
///
/// Returns the name and the number of bytes it occupies at `start`: the
/// literal labels up to the first pointer plus the two pointer bytes, or all
/// labels plus the terminating zero when no pointer is involved. Label and
/// pointer bytes walked across every jump are capped at twice the maximum
/// name length, which also ends pointer cycles.
pub fn decode_name(message: &[u8], start: usize) -> Result<(DomainName, usize), Error> {
    let mut labels = Vec::new();
    let mut pos = start;
    let mut consumed = None;
    let mut work = 0;

    loop {
        let len = *message.get(pos).ok_or(Error::Truncated)?;

        match len & POINTER_MASK {
            POINTER_MASK => {
                let low = *message.get(pos + 1).ok_or(Error::Truncated)?;
                work += 2;
                if work > MAX_NAME_WORK {
                    return Err(Error::MalformedName(start));
                }
                if consumed.is_none() {
                    consumed = Some(pos + 2 - start);
                }

                let target = usize::from(u16::from_be_bytes([len & !POINTER_MASK, low]));
                if target >= message.len() {
                    return Err(Error::MalformedName(pos));
                }
                pos = target;
            }
            0 if len == 0 => {
                let consumed = consumed.unwrap_or_else(|| pos + 1 - start);
                return Ok((DomainName::from_labels(labels), consumed));
            }
            0 => {
                let end = pos + 1 + usize::from(len);
                let label = message.get(pos + 1..end).ok_or(Error::Truncated)?;
                work += label.len() + 1;
                if work > MAX_NAME_WORK {
                    return Err(Error::MalformedName(start));
                }

                labels.push(String::from_utf8_lossy(label).into_owned());
                pos = end;
            }
            // 0b01 and 0b10 label types are reserved
            _ => return Err(Error::MalformedName(pos)),
        }
    }
}

/// nom adapter for [`decode_name`]. `input` must be a suffix of `message`.
fn dns_name<'a>(message: &'a [u8]) -> impl Fn(&'a [u8]) -> Res<'a, DomainName> {
    move |input: &'a [u8]| -> Res<'a, DomainName> {
        let start = message
            .len()
            .checked_sub(input.len())
            .ok_or_else(|| failure(Error::Malformed("name input is not part of the message")))?;

        let (name, consumed) = decode_name(message, start).map_err(failure)?;
        let rest = input.get(consumed..).ok_or_else(|| failure(Error::Truncated))?;

        Ok((rest, name))
    }
}

fn dns_question<'a>(message: &'a [u8]) -> impl Fn(&'a [u8]) -> Res<'a, Question> {
    move |input: &'a [u8]| -> Res<'a, Question> {
        let (rest, (name, qtype, qclass)) = tuple((dns_name(message), be_u16, be_u16))(input)?;

        Ok((
            rest,
            Question {
                name,
                query_type: qtype.into(),
                query_class: qclass.into(),
            },
        ))
    }
}

/// Parses one record. Exactly RDLENGTH bytes of RDATA are consumed whatever
/// the type, so the next record starts in the right place.
fn resource_record<'a>(message: &'a [u8]) -> impl Fn(&'a [u8]) -> Res<'a, ResourceRecord> {
    move |input: &'a [u8]| -> Res<'a, ResourceRecord> {
        let (input, (name, rtype, class, ttl, rdlength)) =
            tuple((dns_name(message), be_u16, be_u16, be_u32, be_u16))(input)?;
        let (rest, rdata) = take::<_, _, Error>(rdlength)(input)?;

        let rtype = QueryType::from(rtype);
        let data = match rtype {
            QueryType::A => {
                let octets: [u8; 4] = rdata.try_into().map_err(|_| {
                    failure(Error::Malformed("address record data is not 4 octets"))
                })?;
                RData::A(Ipv4Addr::from(octets))
            }
            QueryType::NS => RData::NS(name_server(message, input, rdata)?),
            _ => RData::Other(rdata.to_vec()),
        };

        Ok((
            rest,
            ResourceRecord {
                name,
                rtype,
                class: class.into(),
                ttl,
                rdlength,
                data,
            },
        ))
    }
}

/// Decodes the host of an NS record. The name may point back into the
/// message, so it is read from there, but its own bytes must stay inside
/// the record data.
fn name_server(
    message: &[u8],
    input: &[u8],
    rdata: &[u8],
) -> Result<DomainName, NomErr<Error>> {
    let start = message
        .len()
        .checked_sub(input.len())
        .ok_or_else(|| failure(Error::Malformed("record data is not part of the message")))?;

    let (host, consumed) = decode_name(message, start).map_err(failure)?;
    if consumed > rdata.len() {
        return Err(failure(Error::Malformed(
            "name server host runs past the record data",
        )));
    }

    Ok(host)
}

/// Running out of bytes between records means the header promised more
/// records than the message holds.
fn record_boundary(input: &[u8]) -> Res<'_, ()> {
    if input.is_empty() {
        Err(failure(Error::Malformed(
            "message holds fewer records than its header declares",
        )))
    } else {
        Ok((input, ()))
    }
}

fn section<'a>(
    message: &'a [u8],
    records: u16,
) -> impl FnMut(&'a [u8]) -> Res<'a, Vec<ResourceRecord>> {
    count(
        preceded(record_boundary, resource_record(message)),
        usize::from(records),
    )
}

/// Decodes a complete message with exactly one question.
pub fn dns_message(input: &[u8]) -> Result<Message, Error> {
    let (rest, header) = dns_header(input).map_err(flatten)?;
    if header.qd_count != 1 {
        return Err(Error::Malformed("message must carry exactly one question"));
    }

    let (rest, question) = dns_question(input)(rest).map_err(flatten)?;
    let (rest, (answers, authority, additional)) = tuple((
        section(input, header.an_count),
        section(input, header.ns_count),
        section(input, header.ar_count),
    ))(rest)
    .map_err(flatten)?;

    if !rest.is_empty() {
        log::trace!("ignoring {} trailing bytes", rest.len());
    }

    Ok(Message::from_parts(
        header, question, answers, authority, additional,
    ))
}
