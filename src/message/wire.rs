//! Binary wire form for node messages.
//!
//! Used by the recorder and by serialization round trips. Integers are
//! little-endian; strings carry a u16 length prefix, byte blobs a u32 length
//! prefix.
//!
//! ## Node message layout
//!
//! | Field     | Size     | Notes                                   |
//! |-----------|----------|-----------------------------------------|
//! | kind      | 1 byte   | 0x01 data, 0x02 command                 |
//! | topic     | 2+n      | u16 length + UTF-8 bytes                |
//! | body      | variable | payload blob, or command (see below)    |
//! | ttl       | 2 bytes  | LE u16                                  |
//! | receivers | 2+...    | u16 count, then length-prefixed ids     |
//!
//! Command bodies are a 1-byte opcode (0x01 put, 0x02 erase, 0x03 clear)
//! followed by their key/value fields.

use thiserror::Error;

use crate::identity::PeerId;
use crate::message::{CommandMessage, DataMessage, InternalCommand, MessageContent, NodeMessage};
use crate::topic::Topic;

/// Errors raised while decoding wire data.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("message too short: expected {expected} more bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("unknown tag: {0:#04x}")]
    UnknownTag(u8),

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("trailing garbage: {0} bytes left after decoding")]
    TrailingBytes(usize),
}

const KIND_DATA: u8 = 0x01;
const KIND_COMMAND: u8 = 0x02;

const CMD_PUT: u8 = 0x01;
const CMD_ERASE: u8 = 0x02;
const CMD_CLEAR: u8 = 0x03;

// -- writer helpers ---------------------------------------------------------

pub(crate) fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_str(buf: &mut Vec<u8>, value: &str) {
    put_u16(buf, value.len() as u16);
    buf.extend_from_slice(value.as_bytes());
}

fn put_bytes(buf: &mut Vec<u8>, value: &[u8]) {
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.extend_from_slice(value);
}

// -- reader -----------------------------------------------------------------

/// Cursor over a byte slice with bounds-checked reads.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::Truncated {
                expected: n,
                got: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, WireError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, WireError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn str(&mut self) -> Result<String, WireError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| WireError::Malformed("string is not valid UTF-8".into()))
    }

    fn bytes(&mut self) -> Result<Vec<u8>, WireError> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }
}

// -- node message codec -----------------------------------------------------

/// Encode a node message into `buf`.
pub fn encode_node_message(msg: &NodeMessage, buf: &mut Vec<u8>) {
    match &msg.content {
        MessageContent::Data(data) => {
            buf.push(KIND_DATA);
            put_str(buf, data.topic.as_str());
            put_bytes(buf, &data.payload);
        }
        MessageContent::Command(cmd) => {
            buf.push(KIND_COMMAND);
            put_str(buf, cmd.topic.as_str());
            match &cmd.command {
                InternalCommand::Put { key, value } => {
                    buf.push(CMD_PUT);
                    put_str(buf, key);
                    put_bytes(buf, value);
                }
                InternalCommand::Erase { key } => {
                    buf.push(CMD_ERASE);
                    put_str(buf, key);
                }
                InternalCommand::Clear => buf.push(CMD_CLEAR),
            }
        }
    }
    put_u16(buf, msg.ttl);
    put_u16(buf, msg.receivers.len() as u16);
    for receiver in &msg.receivers {
        put_str(buf, receiver.as_str());
    }
}

/// Decode a node message, requiring the buffer to be fully consumed.
pub fn decode_node_message(buf: &[u8]) -> Result<NodeMessage, WireError> {
    let mut reader = ByteReader::new(buf);
    let msg = decode_node_message_from(&mut reader)?;
    if reader.remaining() > 0 {
        return Err(WireError::TrailingBytes(reader.remaining()));
    }
    Ok(msg)
}

pub(crate) fn decode_node_message_from(reader: &mut ByteReader<'_>) -> Result<NodeMessage, WireError> {
    let kind = reader.u8()?;
    let content = match kind {
        KIND_DATA => {
            let topic = Topic::new(reader.str()?);
            let payload = reader.bytes()?;
            MessageContent::Data(DataMessage { topic, payload })
        }
        KIND_COMMAND => {
            let topic = Topic::new(reader.str()?);
            let command = match reader.u8()? {
                CMD_PUT => InternalCommand::Put {
                    key: reader.str()?,
                    value: reader.bytes()?,
                },
                CMD_ERASE => InternalCommand::Erase { key: reader.str()? },
                CMD_CLEAR => InternalCommand::Clear,
                other => return Err(WireError::UnknownTag(other)),
            };
            MessageContent::Command(CommandMessage { topic, command })
        }
        other => return Err(WireError::UnknownTag(other)),
    };
    let ttl = reader.u16()?;
    let count = reader.u16()? as usize;
    let mut receivers = Vec::with_capacity(count);
    for _ in 0..count {
        receivers.push(PeerId::new(reader.str()?));
    }
    Ok(NodeMessage {
        content,
        ttl,
        receivers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> NodeMessage {
        NodeMessage::new(
            DataMessage::new("zeek/events/http", b"body".to_vec()),
            16,
            vec![PeerId::new("b"), PeerId::new("c")],
        )
    }

    #[test]
    fn test_data_round_trip() {
        let msg = sample_data();
        let mut buf = Vec::new();
        encode_node_message(&msg, &mut buf);
        let decoded = decode_node_message(&buf).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_command_round_trip() {
        let msg = NodeMessage::new(
            CommandMessage::new(
                "store/foo/data/master",
                InternalCommand::Put {
                    key: "k".into(),
                    value: vec![1, 2, 3],
                },
            ),
            8,
            vec![PeerId::new("b")],
        );
        let mut buf = Vec::new();
        encode_node_message(&msg, &mut buf);
        assert_eq!(decode_node_message(&buf).unwrap(), msg);
    }

    #[test]
    fn test_truncated_is_rejected() {
        let msg = sample_data();
        let mut buf = Vec::new();
        encode_node_message(&msg, &mut buf);
        let result = decode_node_message(&buf[..buf.len() - 3]);
        assert!(matches!(result, Err(WireError::Truncated { .. })));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result = decode_node_message(&[0x7f, 0, 0]);
        assert!(matches!(result, Err(WireError::UnknownTag(0x7f))));
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let msg = sample_data();
        let mut buf = Vec::new();
        encode_node_message(&msg, &mut buf);
        buf.push(0xAA);
        assert!(matches!(
            decode_node_message(&buf),
            Err(WireError::TrailingBytes(1))
        ));
    }
}
