use crate::candump::{CandumpCodec, CanFrame};
use crate::frame::Frame;
use std::io::Write as _;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::Encoder as _;

/// Parse a number given either in decimal or as `0x` prefixed hexadecimal.
pub fn parse_number<T: TryFrom<u64>>(text: &str) -> Result<T, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    let value = parsed.map_err(|e| format!("`{text}` is not a number: {e}"))?;
    T::try_from(value).map_err(|_| format!("{value} is out of range"))
}

/// Print `frames` to the terminal as sent by `gateway`, one per line.
fn write_frames(gateway: u16, frames: impl IntoIterator<Item = Frame>) -> std::io::Result<()> {
    let mut codec = CandumpCodec::default();
    let mut buffer = BytesMut::new();
    for data in frames {
        codec.encode(&CanFrame { id: gateway, data: data.to_vec() }, &mut buffer)?;
    }
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&buffer)?;
    stdout.flush()
}

#[derive(clap::Parser, Clone, Copy)]
pub struct GatewayArgs {
    /// Bus id frames are sent with and responses are expected at.
    #[arg(long, default_value = "0x680", value_parser = parse_number::<u16>)]
    pub gateway: u16,
}

pub mod registers {
    use crate::output;
    use crate::registers::{Register, ValueType};

    /// Search and output the known registers.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        output: output::Args,
        /// Only list registers whose name, index or value type contain this text.
        filter: Option<String>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not output the register list")]
        Output(#[from] output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct RegisterRecord {
        pub index: u16,
        pub name: &'static str,
        pub value_type: ValueType,
    }

    impl RegisterRecord {
        pub fn is_match(&self, pattern: &str) -> bool {
            let upper = pattern.to_uppercase();
            let lower = pattern.to_lowercase();
            self.name.contains(&upper)
                || format!("{:#06x}", self.index).contains(&lower)
                || self.value_type.name().contains(&lower)
        }
    }

    impl From<Register> for RegisterRecord {
        fn from(register: Register) -> Self {
            Self {
                index: register.index(),
                name: register.name(),
                value_type: register.value_type(),
            }
        }
    }

    impl output::Record for RegisterRecord {
        const HEADERS: &'static [&'static str] = &["Index", "Name", "Value type"];
        fn row(&self) -> Vec<String> {
            vec![format!("{:#06x}", self.index), self.name.to_string(), self.value_type.to_string()]
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let mut output = args.output.open::<RegisterRecord>()?;
        let records = Register::all().map(RegisterRecord::from);
        for record in records.filter(|r| args.filter.as_deref().is_none_or(|p| r.is_match(p))) {
            output.write(&record)?;
        }
        Ok(output.finish()?)
    }
}

pub mod decode {
    use crate::bridge::{self, Publication};
    use crate::candump::CandumpCodec;
    use crate::output::{self, Output, Record};
    use crate::packet::{self, ReceivedPacket};
    use futures::StreamExt as _;
    use std::path::PathBuf;
    use std::pin::Pin;
    use tokio::io::AsyncRead;
    use tokio_util::codec::FramedRead;

    type Frames = FramedRead<Pin<Box<dyn AsyncRead>>, CandumpCodec>;

    /// Decode frames logged in the can-utils text notation.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        output: output::Args,
        #[clap(flatten)]
        gateway: super::GatewayArgs,
        /// Read frames from this file instead of the standard input.
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,
        /// Output only the `wp/read/...` publications the gateway would make.
        #[arg(long)]
        publications: bool,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not start the async runtime")]
        Runtime(#[source] std::io::Error),
        #[error("could not open the input file at {1:?}")]
        OpenInput(#[source] std::io::Error, PathBuf),
        #[error("could not read frames")]
        Read(#[source] std::io::Error),
        #[error("could not output decoded packets")]
        Output(#[from] output::Error),
    }

    impl Record for ReceivedPacket {
        const HEADERS: &'static [&'static str] =
            &["Sender", "Receiver", "Type", "Index", "Name", "Raw", "Value"];
        fn row(&self) -> Vec<String> {
            vec![
                format!("{:#05x}", self.sender),
                self.receiver.map(|r| format!("{r:#05x}")).unwrap_or_default(),
                self.packet_type.to_string(),
                format!("{:#06x}", self.index),
                self.name.to_string(),
                self.raw_value.map(|r| format!("{r:#06x}")).unwrap_or_default(),
                self.value.clone(),
            ]
        }
    }

    impl Record for Publication {
        const HEADERS: &'static [&'static str] = &["Topic", "Payload"];
        fn row(&self) -> Vec<String> {
            vec![self.topic.clone(), self.payload.clone()]
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(Error::Runtime)?;
        runtime.block_on(decode(args))
    }

    async fn decode(args: Args) -> Result<(), Error> {
        let input: Pin<Box<dyn AsyncRead>> = match &args.input {
            None => Box::pin(tokio::io::stdin()),
            Some(path) => Box::pin(
                tokio::fs::File::open(path)
                    .await
                    .map_err(|e| Error::OpenInput(e, path.clone()))?,
            ),
        };
        let frames = FramedRead::new(input, CandumpCodec::default());
        let gateway = args.gateway.gateway;
        if args.publications {
            let output = args.output.open::<Publication>()?;
            emit(frames, output, |packet| bridge::publication(&packet, gateway)).await
        } else {
            emit(frames, args.output.open::<ReceivedPacket>()?, Some).await
        }
    }

    async fn emit<R: Record>(
        mut frames: Frames,
        mut output: Output<R>,
        select: impl Fn(ReceivedPacket) -> Option<R>,
    ) -> Result<(), Error> {
        while let Some(frame) = frames.next().await {
            let frame = frame.map_err(Error::Read)?;
            if let Some(record) = select(packet::decode(frame.id, &frame.data)) {
                output.write(&record)?;
            }
        }
        Ok(output.finish()?)
    }
}

pub mod encode {
    use crate::frame;
    use crate::packet::{PacketType, SendRequest};
    use crate::registers::{Register, ValueType};
    use crate::value::{self, ParseValueError};

    /// Build a single frame and print it in the can-utils text notation.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        gateway: super::GatewayArgs,
        #[arg(long, value_parser = super::parse_number::<u16>)]
        receiver: u16,
        #[arg(long, short = 't', default_value = "read")]
        packet_type: PacketType,
        #[arg(long, value_parser = super::parse_number::<u16>)]
        index: u16,
        /// Value text, parsed according to the value type of the register.
        #[arg(long, conflicts_with_all = ["raw", "bool"])]
        value: Option<String>,
        /// Raw value to insert as is.
        #[arg(long, conflicts_with = "bool", value_parser = super::parse_number::<u32>)]
        raw: Option<u32>,
        /// Insert a single 0/1 byte.
        #[arg(long)]
        bool: Option<bool>,
        /// Parse `--value` with this value type instead of the one from the register catalog.
        #[arg(long)]
        value_type: Option<ValueType>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("register {0:#06x} is not known, specify --value-type")]
        UnknownValueType(u16),
        #[error("could not parse the value")]
        Parse(#[from] ParseValueError),
        #[error("could not write the frame to the terminal")]
        Write(#[source] std::io::Error),
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let request = SendRequest {
            receiver: args.receiver,
            packet_type: args.packet_type,
            index: args.index,
        };
        let mut data = request.encode();
        if let Some(text) = &args.value {
            let value_type = args
                .value_type
                .or_else(|| Register::from_index(args.index).map(|r| r.value_type()))
                .ok_or(Error::UnknownValueType(args.index))?;
            frame::set_value(&mut data, value::parse(value_type, text)?);
        } else if let Some(raw) = args.raw {
            frame::set_value(&mut data, raw);
        } else if let Some(flag) = args.bool {
            frame::set_bool(&mut data, flag);
        }
        super::write_frames(args.gateway.gateway, [data]).map_err(Error::Write)
    }
}

pub mod format {
    use crate::registers::ValueType;
    use crate::value;

    /// Format a raw register value.
    #[derive(clap::Parser)]
    pub struct Args {
        value_type: ValueType,
        /// Raw 16-bit value, or a decimal number with `--double`.
        raw: String,
        /// Format an already combined multi-register value.
        #[arg(long)]
        double: bool,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("`{0}` is not a valid raw value")]
        Raw(String),
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let text = if args.double {
            let value = args.raw.parse::<f64>().map_err(|_| Error::Raw(args.raw.clone()))?;
            value::format_double(args.value_type, value)
        } else {
            let raw = super::parse_number::<u16>(&args.raw).map_err(|_| Error::Raw(args.raw))?;
            value::format(args.value_type, raw)
        };
        println!("{text}");
        Ok(())
    }
}

pub mod parse {
    use crate::registers::ValueType;
    use crate::value::{self, ParseValueError};

    /// Convert value text to the raw register value.
    #[derive(clap::Parser)]
    pub struct Args {
        value_type: ValueType,
        text: String,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not parse the value")]
        Parse(#[from] ParseValueError),
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let value = value::parse(args.value_type, &args.text)?;
        println!("{value:#06x}");
        Ok(())
    }
}

pub mod poll {
    use crate::bridge::POLL_LIST;

    /// Print one pass of the read requests the gateway cycles through.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        gateway: super::GatewayArgs,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not write the frames to the terminal")]
        Write(#[source] std::io::Error),
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let frames = POLL_LIST.iter().map(|request| request.encode());
        super::write_frames(args.gateway.gateway, frames).map_err(Error::Write)
    }
}

pub mod command {
    use crate::bridge::{self, CommandError};

    /// Translate a `wp/write/<REGISTER>` command into the frames to send.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        gateway: super::GatewayArgs,
        topic: String,
        payload: String,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not translate the command")]
        Command(#[from] CommandError),
        #[error("could not write the frames to the terminal")]
        Write(#[source] std::io::Error),
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let frames = bridge::command_frames(&args.topic, &args.payload)?;
        super::write_frames(args.gateway.gateway, frames).map_err(Error::Write)
    }
}

pub mod clock {
    use crate::bridge::{self, CommandError};

    /// Print the frames that set the device clock to the current local time.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        gateway: super::GatewayArgs,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not translate the clock commands")]
        Command(#[from] CommandError),
        #[error("could not write the frames to the terminal")]
        Write(#[source] std::io::Error),
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let now = jiff::Zoned::now().datetime();
        tracing::debug!(%now, "setting the device clock");
        let mut frames = Vec::new();
        for (topic, payload) in bridge::clock_commands(&now) {
            frames.extend(bridge::command_frames(&topic, &payload)?);
        }
        super::write_frames(args.gateway.gateway, frames).map_err(Error::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::Register;

    #[test]
    fn numbers() {
        assert_eq!(parse_number::<u16>("1664"), Ok(0x680));
        assert_eq!(parse_number::<u16>("0x680"), Ok(0x680));
        assert_eq!(parse_number::<u16>("0X4F07"), Ok(0x4f07));
        assert!(parse_number::<u16>("0x10000").is_err());
        assert!(parse_number::<u16>("-1").is_err());
        assert!(parse_number::<u32>("0x").is_err());
    }

    #[test]
    fn register_filter() {
        let record = registers::RegisterRecord::from(Register::from_index(0x000c).unwrap());
        assert!(record.is_match("aussen"));
        assert!(record.is_match("0x000c"));
        assert!(record.is_match("DEC_VAL"));
        assert!(!record.is_match("speicher"));
    }
}
