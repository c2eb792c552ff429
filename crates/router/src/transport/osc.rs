//! OSC 1.0 message codec.
//!
//! Layout: padded address string, padded type-tag string (`,` followed by
//! one tag per argument), then the arguments. Numbers are 4-byte big-endian,
//! strings are NUL-terminated and padded to a multiple of 4 bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use contracts::{ContractError, MessageArg, OutboundMessage};

/// Encode a message into a single OSC packet
///
/// # Errors
/// Fails if the address or a string argument contains a NUL byte, which
/// would terminate the OSC string early.
pub fn encode(message: &OutboundMessage) -> Result<Bytes, ContractError> {
    check_str(&message.address)?;
    for arg in &message.args {
        if let MessageArg::Str(s) = arg {
            check_str(s)?;
        }
    }

    let mut buf = BytesMut::with_capacity(encoded_len(message));

    put_padded_str(&mut buf, &message.address);

    let mut tags = String::with_capacity(message.args.len() + 1);
    tags.push(',');
    for arg in &message.args {
        tags.push(type_tag(arg));
    }
    put_padded_str(&mut buf, &tags);

    for arg in &message.args {
        match arg {
            MessageArg::Int32(v) => buf.put_i32(*v),
            MessageArg::Float32(v) => buf.put_f32(*v),
            MessageArg::Str(s) => put_padded_str(&mut buf, s),
        }
    }

    Ok(buf.freeze())
}

/// Decode a single OSC packet
///
/// # Errors
/// Returns an error for truncated packets, missing type tags, or tags
/// other than `i`, `f` and `s`.
pub fn decode(packet: &[u8]) -> Result<OutboundMessage, ContractError> {
    let mut buf = packet;

    let address = get_padded_str(&mut buf)?;
    if !address.starts_with('/') {
        return Err(malformed(format!("bad address '{address}'")));
    }

    let tags = get_padded_str(&mut buf)?;
    let tags = tags
        .strip_prefix(',')
        .ok_or_else(|| malformed("type tag string must start with ','"))?;

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        let arg = match tag {
            'i' => {
                ensure_remaining(buf, 4)?;
                MessageArg::Int32(buf.get_i32())
            }
            'f' => {
                ensure_remaining(buf, 4)?;
                MessageArg::Float32(buf.get_f32())
            }
            's' => MessageArg::Str(get_padded_str(&mut buf)?),
            other => return Err(malformed(format!("unsupported type tag '{other}'"))),
        };
        args.push(arg);
    }

    Ok(OutboundMessage { address, args })
}

fn type_tag(arg: &MessageArg) -> char {
    match arg {
        MessageArg::Int32(_) => 'i',
        MessageArg::Float32(_) => 'f',
        MessageArg::Str(_) => 's',
    }
}

fn padded_len(len: usize) -> usize {
    // NUL terminator included
    (len + 4) & !3
}

fn encoded_len(message: &OutboundMessage) -> usize {
    let args: usize = message
        .args
        .iter()
        .map(|a| match a {
            MessageArg::Str(s) => padded_len(s.len()),
            _ => 4,
        })
        .sum();
    padded_len(message.address.len()) + padded_len(message.args.len() + 1) + args
}

fn check_str(s: &str) -> Result<(), ContractError> {
    if s.contains('\0') {
        return Err(ContractError::Other(format!(
            "OSC string contains NUL byte: {s:?}"
        )));
    }
    Ok(())
}

fn put_padded_str(buf: &mut BytesMut, s: &str) {
    buf.put_slice(s.as_bytes());
    let pad = padded_len(s.len()) - s.len();
    buf.put_bytes(0, pad);
}

fn get_padded_str(buf: &mut &[u8]) -> Result<String, ContractError> {
    let nul = buf
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| malformed("unterminated string"))?;
    let s = std::str::from_utf8(&buf[..nul])
        .map_err(|e| malformed(format!("invalid utf-8: {e}")))?
        .to_string();
    let total = padded_len(nul);
    ensure_remaining(*buf, total)?;
    buf.advance(total);
    Ok(s)
}

fn ensure_remaining(buf: &[u8], n: usize) -> Result<(), ContractError> {
    if buf.remaining() < n {
        return Err(malformed("truncated packet"));
    }
    Ok(())
}

fn malformed(message: impl Into<String>) -> ContractError {
    ContractError::Other(format!("malformed OSC packet: {}", message.into()))
}
