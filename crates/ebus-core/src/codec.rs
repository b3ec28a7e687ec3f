//! Flat text wire format.
//!
//! A frame is `field0 ␟ topic ␟ data0 ␟ data1 ...` where `␟` is the ASCII unit
//! separator (0x1F). The meaning of `field0` depends on the direction: frames
//! sent to a client carry the sender (`from`), frames sent to the server carry
//! the destination (`to`). An empty data sequence adds no trailing field, so
//! `to␟topic` has no data and `to␟topic␟` has a single empty field.

use crate::errors::CodecError;
use crate::event::Event;

/// Field separator (ASCII unit separator).
pub const SEPARATOR: char = '\u{1f}';

/// Which side of the connection a frame travels towards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Server to client: `field0` is the sender address.
    ToClient,
    /// Client to server: `field0` is the destination address.
    ToServer,
}

/// Encode an event for the given direction.
pub fn encode(direction: Direction, event: &Event) -> String {
    let address = match direction {
        Direction::ToClient => &event.from,
        Direction::ToServer => &event.to,
    };
    let capacity = address.len()
        + event.topic.len()
        + event.data.iter().map(|d| d.len() + 1).sum::<usize>()
        + 1;
    let mut frame = String::with_capacity(capacity);
    frame.push_str(address);
    frame.push(SEPARATOR);
    frame.push_str(&event.topic);
    for field in &event.data {
        frame.push(SEPARATOR);
        frame.push_str(field);
    }
    frame
}

/// Decode a frame travelling in the given direction.
///
/// The address field not carried on the wire is left empty.
pub fn decode(direction: Direction, raw: &str) -> Result<Event, CodecError> {
    let mut fields = raw.split(SEPARATOR);
    let address = fields.next().unwrap_or_default().to_owned();
    let topic = fields
        .next()
        .ok_or(CodecError::MissingTopic)?
        .to_owned();
    let data = fields.map(str::to_owned).collect();

    let (from, to) = match direction {
        Direction::ToClient => (address, String::new()),
        Direction::ToServer => (String::new(), address),
    };
    Ok(Event {
        from,
        to,
        topic,
        data,
    })
}

impl Event {
    /// Encode for delivery to a client (`field0` = `from`).
    pub fn server_marshal(&self) -> String {
        encode(Direction::ToClient, self)
    }

    /// Encode for sending to the server (`field0` = `to`).
    pub fn client_marshal(&self) -> String {
        encode(Direction::ToServer, self)
    }

    /// Decode a frame received by the server (`field0` = `to`).
    pub fn server_unmarshal(raw: &str) -> Result<Self, CodecError> {
        decode(Direction::ToServer, raw)
    }

    /// Decode a frame received by a client (`field0` = `from`).
    pub fn client_unmarshal(raw: &str) -> Result<Self, CodecError> {
        decode(Direction::ToClient, raw)
    }
}
