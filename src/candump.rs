//! Frames in the textual notation of the can-utils tools.
//!
//! Each line holds one frame as `<id>#<hex payload>`, optionally preceded by the timestamp and
//! interface columns written by `candump -L`:
//!
//! ```text
//! (1729270000.123456) can0 680#3100FA4F070000
//! 180#D200FA4F070001
//! ```

use tokio_util::bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    pub id: u16,
    pub data: Vec<u8>,
}

impl std::fmt::Display for CanFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03X}#", self.id)?;
        for byte in &self.data {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseFrameError {
    #[error("line has no `<id>#<data>` column")]
    MissingFrame,
    #[error("`{0}` is not a valid frame id")]
    Id(String),
    #[error("`{0}` is not valid frame data")]
    Data(String),
    #[error("remote request frames carry no data")]
    RemoteRequest,
}

impl std::str::FromStr for CanFrame {
    type Err = ParseFrameError;
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let column = line
            .split_whitespace()
            .find(|c| c.contains('#'))
            .ok_or(ParseFrameError::MissingFrame)?;
        let (id, data) = column.split_once('#').ok_or(ParseFrameError::MissingFrame)?;
        let id = u32::from_str_radix(id, 16)
            .ok()
            .and_then(|id| u16::try_from(id).ok())
            .ok_or_else(|| ParseFrameError::Id(id.to_string()))?;
        if data.starts_with('R') {
            return Err(ParseFrameError::RemoteRequest);
        }
        let digits = data.bytes().filter(|b| *b != b'.').collect::<Vec<u8>>();
        if digits.len() % 2 != 0 || digits.len() > 16 {
            return Err(ParseFrameError::Data(data.to_string()));
        }
        let data = digits
            .chunks(2)
            .map(|pair| {
                std::str::from_utf8(pair).ok().and_then(|s| u8::from_str_radix(s, 16).ok())
            })
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| ParseFrameError::Data(data.to_string()))?;
        Ok(CanFrame { id, data })
    }
}

#[derive(Default)]
pub struct CandumpCodec {}

impl CandumpCodec {
    fn parse_line(line: &[u8]) -> Option<CanFrame> {
        let Ok(line) = std::str::from_utf8(line) else {
            warn!("skipping a line that is not valid UTF-8");
            return None;
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        match line.parse::<CanFrame>() {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(line, error = (&e as &dyn std::error::Error), "skipping a malformed line");
                None
            }
        }
    }
}

impl Decoder for CandumpCodec {
    type Item = CanFrame;
    type Error = std::io::Error;
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            trace!(message = "attempt at decoding", buffer = ?src);
            let Some(newline) = src.iter().position(|b| *b == b'\n') else {
                return Ok(None);
            };
            let line = src.split_to(newline + 1);
            if let Some(frame) = Self::parse_line(&line[..newline]) {
                return Ok(Some(frame));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let frame = Self::parse_line(&src[..]);
        src.advance(src.len());
        Ok(frame)
    }
}

impl Encoder<&CanFrame> for CandumpCodec {
    type Error = std::io::Error;
    fn encode(&mut self, frame: &CanFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(frame.to_string().as_bytes());
        dst.extend_from_slice(b"\n");
        trace!(message = "sending encoded", buffer = ?dst);
        Ok(())
    }
}
