use crate::frame::{self, FRAME_LEN, Frame};
use crate::registers::{REGISTERS, ValueType};
use crate::value::FormattedValue;
use tracing::debug;

#[repr(u8)]
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    num_derive::FromPrimitive,
    num_derive::ToPrimitive,
    strum::VariantArray,
    strum::IntoStaticStr,
    strum::EnumString,
    strum::Display,
)]
#[strum(serialize_all = "kebab-case")]
pub enum PacketType {
    Write = 0,
    Read = 1,
    Response = 2,
    Ack = 3,
    WriteAck = 4,
    WriteResponse = 5,
    System = 6,
    SystemResponse = 7,
    Invalid = 8,
}

impl PacketType {
    /// Any value past the known packet types is [`PacketType::Invalid`].
    pub fn from_raw(raw: u8) -> Self {
        num_traits::FromPrimitive::from_u8(raw).unwrap_or(Self::Invalid)
    }

    pub fn to_raw(self) -> u8 {
        self as u8
    }
}

impl serde::Serialize for PacketType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.into())
    }
}

/// A decoded inbound frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ReceivedPacket {
    /// Transport id the frame was received from.
    pub sender: u16,
    pub receiver: Option<u16>,
    pub packet_type: PacketType,
    /// [`ValueType::Default`] unless the index is in the register catalog.
    pub value_type: ValueType,
    pub index: u16,
    pub raw_value: Option<u16>,
    /// Register name, empty for indices not in the catalog.
    pub name: &'static str,
    /// Formatted value, empty for indices not in the catalog.
    pub value: String,
}

impl ReceivedPacket {
    fn invalid(sender: u16) -> Self {
        Self {
            sender,
            receiver: None,
            packet_type: PacketType::Invalid,
            value_type: ValueType::Default,
            index: 0,
            raw_value: None,
            name: "",
            value: String::new(),
        }
    }

    pub fn is_known(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Header of an outbound frame. The value, if any, is inserted after encoding with
/// [`frame::set_value`] or [`frame::set_bool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendRequest {
    pub receiver: u16,
    pub packet_type: PacketType,
    pub index: u16,
}

impl SendRequest {
    pub fn encode(&self) -> Frame {
        let mut data = [0; FRAME_LEN];
        encode_request(&mut data, self);
        data
    }
}

/// Decode a frame received from `sender`.
///
/// Payloads that aren't exactly 7 bytes long decode to an [`PacketType::Invalid`] packet.
pub fn decode(sender: u16, data: &[u8]) -> ReceivedPacket {
    if data.len() != FRAME_LEN {
        debug!(sender, length = data.len(), "cannot decode a frame of unexpected length");
        return ReceivedPacket::invalid(sender);
    }
    let mut packet = ReceivedPacket {
        sender,
        receiver: frame::receiver(data),
        packet_type: frame::packet_type(data),
        value_type: ValueType::Default,
        index: frame::index(data).unwrap_or_default(),
        raw_value: frame::raw_value(data),
        name: "",
        value: String::new(),
    };
    if let Some(register) = REGISTERS.iter().find(|r| r.index == packet.index) {
        packet.value_type = register.value_type;
        packet.name = register.name;
        if let Some(raw) = packet.raw_value {
            packet.value = FormattedValue { value_type: register.value_type, raw }.to_string();
        }
    }
    debug!(
        packet.sender = format_args!("{:#x}", packet.sender),
        packet.receiver = ?packet.receiver,
        packet.kind = %packet.packet_type,
        packet.index = format_args!("{:#06x}", packet.index),
        packet.name = packet.name,
        packet.value = %packet.value,
        "decoded packet"
    );
    packet
}

/// Clear `data` and write the request header into it. Does nothing unless `data` is exactly one
/// frame long.
pub fn encode_request(data: &mut [u8], request: &SendRequest) {
    if data.len() != FRAME_LEN {
        return;
    }
    data.fill(0);
    frame::set_receiver(data, request.receiver);
    frame::set_packet_type(data, request.packet_type);
    frame::set_index(data, request.index);
}
