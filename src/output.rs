//! Record sinks for the command line tools.

use std::io::Write as _;
use std::marker::PhantomData;
use std::path::PathBuf;

/// A row of command output, renderable as a table row, a CSV line or a JSON object.
pub trait Record: serde::Serialize {
    const HEADERS: &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum Format {
    Table,
    Jsonl,
    Csv,
}

#[derive(clap::Parser)]
#[group(id = "output::Args")]
pub struct Args {
    /// Write the records to this file instead of the terminal.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
    #[arg(long, short = 'f', value_enum, default_value_t = Format::Table)]
    format: Format,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not open the output file at {1:?}")]
    OpenOutputFile(#[source] std::io::Error, PathBuf),
    #[error("could not write records to {}", describe(.1))]
    Write(#[source] std::io::Error, Option<PathBuf>),
    #[error("could not serialize a record to JSON")]
    SerializeJson(#[source] serde_json::Error),
}

fn describe(path: &Option<PathBuf>) -> String {
    match path {
        None => "the terminal".to_string(),
        Some(path) => format!("{path:?}"),
    }
}

enum Layout {
    /// Rows are collected and rendered once all of them are known.
    Table(comfy_table::Table),
    Jsonl,
    Csv,
}

/// Writes records of type `R` in the format picked on the command line.
pub struct Output<R> {
    path: Option<PathBuf>,
    io: Box<dyn std::io::Write>,
    layout: Layout,
    record: PhantomData<fn(&R)>,
}

impl Args {
    pub fn open<R: Record>(self) -> Result<Output<R>, Error> {
        let io: Box<dyn std::io::Write> = match &self.output {
            None => Box::new(std::io::stdout().lock()),
            Some(path) => Box::new(
                std::fs::File::create(path).map_err(|e| Error::OpenOutputFile(e, path.clone()))?,
            ),
        };
        let layout = match self.format {
            Format::Table => {
                let mut table = comfy_table::Table::new();
                table
                    .set_content_arrangement(comfy_table::ContentArrangement::Dynamic)
                    .set_header(R::HEADERS.to_vec());
                Layout::Table(table)
            }
            Format::Jsonl => Layout::Jsonl,
            Format::Csv => Layout::Csv,
        };
        let mut output = Output { path: self.output, io, layout, record: PhantomData };
        if let Layout::Csv = output.layout {
            output.csv_line(R::HEADERS)?;
        }
        Ok(output)
    }
}

impl<R: Record> Output<R> {
    pub fn write(&mut self, record: &R) -> Result<(), Error> {
        match &mut self.layout {
            Layout::Table(table) => {
                table.add_row(record.row());
                Ok(())
            }
            Layout::Csv => self.csv_line(&record.row()),
            Layout::Jsonl => {
                let mut line = serde_json::to_vec(record).map_err(Error::SerializeJson)?;
                line.push(b'\n');
                self.write_bytes(&line)
            }
        }
    }

    pub fn finish(mut self) -> Result<(), Error> {
        if let Layout::Table(table) = &self.layout {
            let rendered = format!("{table}\n");
            self.write_bytes(rendered.as_bytes())?;
        }
        self.io.flush().map_err(|e| Error::Write(e, self.path.clone()))
    }

    fn csv_line<V: AsRef<str>>(&mut self, fields: &[V]) -> Result<(), Error> {
        let mut writer = csv_core::WriterBuilder::new()
            .terminator(csv_core::Terminator::Any(b'\n'))
            .build();
        // Quoting at most doubles a field and adds the surrounding quotes.
        let widest = fields.iter().map(|f| f.as_ref().len()).max().unwrap_or(0);
        let mut scratch = vec![0; 2 * widest + 2];
        let mut line = Vec::new();
        for (position, field) in fields.iter().enumerate() {
            if position > 0 {
                let (_, n) = writer.delimiter(&mut scratch);
                line.extend_from_slice(&scratch[..n]);
            }
            let (_, _, n) = writer.field(field.as_ref().as_bytes(), &mut scratch);
            line.extend_from_slice(&scratch[..n]);
        }
        let (_, n) = writer.terminator(&mut scratch);
        line.extend_from_slice(&scratch[..n]);
        self.write_bytes(&line)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.io.write_all(bytes).map_err(|e| Error::Write(e, self.path.clone()))
    }
}
