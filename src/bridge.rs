//! Textual publish/subscribe conventions of the heat pump gateway.
//!
//! Responses addressed to the gateway are published as `wp/read/<REGISTER>` with the formatted
//! value as payload. Commands arrive as `wp/write/<REGISTER>` and turn into a write frame followed
//! by a read of the same register, so that the new value gets published right away.

use crate::frame::{self, Frame};
use crate::packet::{PacketType, ReceivedPacket, SendRequest};
use crate::registers::{Register, ValueType};
use crate::value::{self, ParseValueError};

/// Bus id the gateway sends its frames with and expects responses to be addressed to.
pub const GATEWAY_ID: u16 = 0x680;

pub const READ_TOPIC_PREFIX: &str = "wp/read/";
pub const WRITE_TOPIC_PREFIX: &str = "wp/write/";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Publication {
    pub topic: String,
    pub payload: String,
}

/// The publication for `packet`, if it is a response to the gateway about a known register.
pub fn publication(packet: &ReceivedPacket, gateway: u16) -> Option<Publication> {
    if packet.receiver != Some(gateway) || packet.packet_type != PacketType::Response {
        return None;
    }
    if !packet.is_known() {
        return None;
    }
    Some(Publication {
        topic: format!("{READ_TOPIC_PREFIX}{}", packet.name),
        payload: packet.value.clone(),
    })
}

const fn read(receiver: u16, index: u16) -> SendRequest {
    SendRequest { receiver, packet_type: PacketType::Read, index }
}

/// Registers the gateway reads out, one per poll tick, round robin.
pub static POLL_LIST: &[SendRequest] = &[
    read(0x480, 0x0112), // PROGRAMMSCHALTER
    read(0x180, 0x4f07), // KUEHLEN_AKTIVIERT
    read(0x180, 0x000e), // SPEICHERISTTEMP
    read(0x500, 0x01d6), // WPVORLAUFIST
    read(0x500, 0x0016), // RUECKLAUFISTTEMP
    read(0x500, 0x000c), // AUSSENTEMP
    read(0x601, 0x4ec7), // RAUM_IST_TEMPERATUR
    read(0x601, 0x4ece), // RAUM_SOLL_TEMPERATUR
    read(0x601, 0x4ec8), // RAUM_IST_FEUCHTE
    read(0x601, 0x4ee0), // RAUM_TAUPUNKT_TEMPERATUR
    read(0x514, 0x091c), // WW_SUM_KWH
    read(0x514, 0x091d), // WW_SUM_MWH
    read(0x514, 0x0920), // HEIZ_SUM_KWH
    read(0x514, 0x0921), // HEIZ_SUM_MWH
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Insertion {
    Value,
    Bool,
}

#[derive(Clone, Copy, Debug)]
struct WriteTarget {
    register: &'static str,
    receiver: u16,
    parse_as: ValueType,
    insertion: Insertion,
    max_high_byte: Option<u8>,
}

const fn target(register: &'static str, receiver: u16, parse_as: ValueType) -> WriteTarget {
    WriteTarget { register, receiver, parse_as, insertion: Insertion::Value, max_high_byte: None }
}

static WRITE_TARGETS: &[WriteTarget] = &[
    WriteTarget {
        max_high_byte: Some(5),
        ..target("PROGRAMMSCHALTER", 0x480, ValueType::LittleEndian)
    },
    WriteTarget {
        insertion: Insertion::Bool,
        ..target("KUEHLEN_AKTIVIERT", 0x180, ValueType::Bool)
    },
    target("DATUM", 0x480, ValueType::Datum),
    target("TAG", 0x480, ValueType::LittleEndian),
    target("MONAT", 0x480, ValueType::LittleEndian),
    target("JAHR", 0x480, ValueType::LittleEndian),
    target("UHRZEIT", 0x480, ValueType::Zeit),
];

/// Register names that can be written through `wp/write/<REGISTER>`.
pub fn writable_registers() -> impl Iterator<Item = &'static str> {
    WRITE_TARGETS.iter().map(|t| t.register)
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("`{0}` is not a writable register topic")]
    UnknownTopic(String),
    #[error("could not parse the payload for {0}")]
    Parse(&'static str, #[source] ParseValueError),
    #[error("value {1:#06x} is out of range for {0}")]
    OutOfRange(&'static str, u32),
}

/// Translate a `wp/write/<REGISTER>` command into the write frame and the read-back frame.
pub fn command_frames(topic: &str, payload: &str) -> Result<[Frame; 2], CommandError> {
    let unknown = || CommandError::UnknownTopic(topic.to_string());
    let name = topic.strip_prefix(WRITE_TOPIC_PREFIX).ok_or_else(unknown)?;
    let target = WRITE_TARGETS.iter().find(|t| t.register == name).ok_or_else(unknown)?;
    let register = Register::from_name(target.register).ok_or_else(unknown)?;
    let value = value::parse(target.parse_as, payload)
        .map_err(|e| CommandError::Parse(target.register, e))?;
    if let Some(max) = target.max_high_byte {
        if (value >> 8) > u32::from(max) {
            return Err(CommandError::OutOfRange(target.register, value));
        }
    }
    let write = SendRequest {
        receiver: target.receiver,
        packet_type: PacketType::Write,
        index: register.index(),
    };
    let mut write_frame = write.encode();
    match target.insertion {
        Insertion::Value => frame::set_value(&mut write_frame, value),
        Insertion::Bool => frame::set_bool(&mut write_frame, value != 0),
    }
    let read_frame = read(target.receiver, register.index()).encode();
    tracing::debug!(register = target.register, value, "translated write command");
    Ok([write_frame, read_frame])
}

/// The commands that set the device clock to `now`.
pub fn clock_commands(now: &jiff::civil::DateTime) -> Vec<(String, String)> {
    [
        ("UHRZEIT", format!("{:02}:{:02}", now.hour(), now.minute())),
        ("TAG", now.day().to_string()),
        ("MONAT", now.month().to_string()),
        ("JAHR", (now.year() % 100).to_string()),
    ]
    .into_iter()
    .map(|(name, payload)| (format!("{WRITE_TOPIC_PREFIX}{name}"), payload))
    .collect()
}
