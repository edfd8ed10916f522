use crate::{
    dns::{Header, Message, Question},
    error::{Error, Result},
    parser,
};

/// Serialises a query: the 12 byte header followed by its single question.
pub fn encode_query(header: &Header, question: &Question) -> Result<Vec<u8>> {
    if header.qd_count != 1 || header.an_count != 0 || header.ns_count != 0 || header.ar_count != 0
    {
        return Err(Error::MalformedMessage(
            "a query carries one question and no records",
        ));
    }

    let mut raw_query: Vec<u8> = header.into();
    raw_query.extend(question.to_wire()?);

    Ok(raw_query)
}

/// Serialises every section of `message` without name compression.
pub fn encode_message(message: &Message) -> Result<Vec<u8>> {
    let mut raw_message: Vec<u8> = message.header().into();
    raw_message.extend(message.question().to_wire()?);

    let records = message
        .answers()
        .iter()
        .chain(message.authority())
        .chain(message.additional());
    for rr in records {
        raw_message.extend(rr.to_wire()?);
    }

    Ok(raw_message)
}

/// Decodes a response. Either every declared record is present and parsed,
/// or the whole message is rejected.
pub fn decode_response(raw: &[u8]) -> Result<Message> {
    log::trace!("decoding {} byte message", raw.len());

    let message = parser::dns_message(raw)?;

    Ok(message)
}
