pub mod registers {
    use crate::output;
    use crate::registers::RegisterIndex;

    /// Search and output known registers.
    #[derive(clap::Parser)]
    pub struct Args {
        /// Only list registers whose name, description or address contains this text.
        filter: Option<String>,
        #[clap(flatten)]
        output: output::Args,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not output the register list")]
        Output(#[from] output::Error),
    }

    pub fn matching(filter: Option<&str>) -> impl Iterator<Item = RegisterIndex> {
        RegisterIndex::all().filter(move |register| {
            filter.map_or(true, |pattern| register.descriptor().is_match(pattern))
        })
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let mut output = args.output.to_output()?;
        output.table_headers(vec![
            "Address",
            "Name",
            "Mode",
            "Unit",
            "Scale",
            "Decoding",
            "Description",
        ])?;
        for register in matching(args.filter.as_deref()) {
            let descriptor = register.descriptor();
            output.result(
                || {
                    vec![vec![
                        format!("{:#06x}", descriptor.address),
                        descriptor.name.to_string(),
                        register.mode().to_string(),
                        descriptor.unit.to_string(),
                        descriptor.scale.map(|s| s.to_string()).unwrap_or_default(),
                        <&str>::from(descriptor.rule).to_string(),
                        descriptor.description.to_string(),
                    ]]
                },
                || &descriptor,
            )?;
        }
        Ok(output.commit()?)
    }
}

pub mod decode {
    use std::borrow::Cow;
    use std::io::BufRead as _;
    use std::path::PathBuf;

    use tracing::{debug, info};

    use crate::DecodedFrame;
    use crate::assemble::{Capture, Failure, Shape};
    use crate::input::{Input, InputError};
    use crate::output;

    #[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub enum Encoding {
        /// Hex digits, JSON arrays of byte values, or raw bytes, whichever fits.
        #[default]
        Auto,
        Hex,
        Array,
        Raw,
    }

    /// Decode frames given on the command line, or one per line of the standard input.
    #[derive(clap::Parser)]
    pub struct Args {
        frames: Vec<String>,
        /// Decode the entire contents of this file as a single raw frame.
        #[arg(long, conflicts_with = "frames")]
        file: Option<PathBuf>,
        #[arg(long, short = 'e', value_enum, default_value_t = Encoding::Auto)]
        encoding: Encoding,
        #[arg(long, short = 's', value_enum, default_value_t = Shape::Detailed)]
        shape: Shape,
        /// Report frames that fail to decode and continue with the next one.
        #[arg(long, short = 'k')]
        keep_going: bool,
        #[clap(flatten)]
        output: output::Args,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not read frames from the standard input")]
        ReadStdin(#[source] std::io::Error),
        #[error("could not read the frame from {1:?}")]
        ReadFile(#[source] std::io::Error, PathBuf),
        #[error("could not decode frame {1:?}")]
        Decode(#[source] crate::Error, String),
        #[error("could not project the decoded frame")]
        Project(#[source] serde_json::Error),
        #[error("could not output the decoded frames")]
        Output(#[from] output::Error),
    }

    pub fn interpret(text: &str, encoding: Encoding) -> Result<Input<'_>, InputError> {
        match encoding {
            Encoding::Auto => Input::detect(text),
            Encoding::Hex => Ok(Input::Hex(Cow::Borrowed(text))),
            Encoding::Raw => Ok(Input::Bytes(Cow::Borrowed(text.as_bytes()))),
            Encoding::Array => {
                let value = serde_json::from_str::<serde_json::Value>(text)
                    .map_err(|_| InputError::UnsupportedType("text that is not a JSON array"))?;
                Input::from_json(&value)
            }
        }
    }

    pub fn table_rows(frame: &DecodedFrame, timestamp: &jiff::Timestamp) -> Vec<Vec<String>> {
        let row = |register: &str, address: String, value: String, unit: &str| {
            vec![
                timestamp.to_string(),
                frame.slave_address.to_string(),
                frame.function_name.to_string(),
                register.to_string(),
                address,
                value,
                unit.to_string(),
            ]
        };
        let mut rows = frame
            .registers
            .iter()
            .map(|(name, register)| {
                let address = format!("{:#06x}", register.address);
                row(name, address, register.value.to_string(), register.unit)
            })
            .collect::<Vec<_>>();
        if let Some(error) = &frame.error {
            rows.push(row("error", String::new(), error.description.clone(), ""));
        }
        if rows.is_empty() {
            rows.push(row("", String::new(), String::new(), ""));
        }
        rows
    }

    fn failure_rows(failure: &Failure) -> Vec<Vec<String>> {
        vec![vec![
            failure.timestamp.to_string(),
            String::new(),
            String::new(),
            "error".into(),
            String::new(),
            format!("{} (input {:?})", failure.error, failure.input),
            String::new(),
        ]]
    }

    pub struct Decoder {
        encoding: Encoding,
        shape: Shape,
        keep_going: bool,
        output: output::Output,
    }

    impl Decoder {
        pub fn new(
            encoding: Encoding,
            shape: Shape,
            keep_going: bool,
            mut output: output::Output,
        ) -> Result<Self, Error> {
            output.table_headers(vec![
                "Timestamp", "Slave", "Function", "Register", "Address", "Value", "Unit",
            ])?;
            Ok(Self { encoding, shape, keep_going, output })
        }

        pub fn frame(&mut self, text: &str) -> Result<(), Error> {
            let input = interpret(text, self.encoding);
            self.decode(input, text)
        }

        pub fn raw_frame(&mut self, bytes: &[u8]) -> Result<(), Error> {
            let input = Input::Bytes(Cow::Borrowed(bytes));
            let text = input.to_display_string();
            self.decode(Ok(input), &text)
        }

        fn decode(&mut self, input: Result<Input<'_>, InputError>, text: &str) -> Result<(), Error> {
            let result = input.map_err(crate::Error::Input).and_then(|input| crate::decode(&input));
            match result {
                Ok(frame) => {
                    let capture = Capture::new(frame);
                    debug!(message = "decoded", function = capture.frame.function_code);
                    let record = capture.project(self.shape).map_err(Error::Project)?;
                    self.output.result(|| table_rows(&capture.frame, &capture.timestamp), || record)?;
                }
                Err(error) if self.keep_going => {
                    info!(message = "frame could not be decoded", input = text, %error);
                    let failure = Failure::new(&error, text.to_string());
                    self.output.result(|| failure_rows(&failure), || &failure)?;
                }
                Err(error) => return Err(Error::Decode(error, text.to_string())),
            }
            Ok(())
        }

        pub fn finish(self) -> Result<(), Error> {
            Ok(self.output.commit()?)
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let output = args.output.to_output()?;
        let mut decoder = Decoder::new(args.encoding, args.shape, args.keep_going, output)?;
        if let Some(path) = &args.file {
            let bytes = std::fs::read(path).map_err(|e| Error::ReadFile(e, path.clone()))?;
            decoder.raw_frame(&bytes)?;
        } else if args.frames.is_empty() {
            for line in std::io::stdin().lock().lines() {
                let line = line.map_err(Error::ReadStdin)?;
                if line.trim().is_empty() {
                    continue;
                }
                decoder.frame(&line)?;
            }
        } else {
            for frame in &args.frames {
                decoder.frame(frame)?;
            }
        }
        decoder.finish()
    }
}

pub mod checksum {
    use crate::input::{Input, InputError};
    use crate::output;

    /// Compute the checksum of a frame body and print the complete frame.
    #[derive(clap::Parser)]
    pub struct Args {
        /// The frame body (slave address, function code and data) as hex digits.
        body: String,
        #[clap(flatten)]
        output: output::Args,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not interpret the frame body")]
        Input(#[source] InputError),
        #[error("could not output the checksum")]
        Output(#[from] output::Error),
    }

    #[derive(serde::Serialize, Debug, PartialEq, Eq)]
    pub struct Completed {
        pub checksum: u16,
        pub frame: String,
    }

    pub fn complete(body: &str) -> Result<Completed, InputError> {
        let body = Input::Hex(body.into()).to_bytes()?;
        let frame = crate::checksum::with_checksum(&body);
        Ok(Completed { checksum: crate::checksum::compute(&body), frame: hex::encode_upper(frame) })
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let completed = complete(&args.body).map_err(Error::Input)?;
        let mut output = args.output.to_output()?;
        output.table_headers(vec!["Checksum", "Frame"])?;
        output.result(
            || vec![vec![format!("{:#06x}", completed.checksum), completed.frame.clone()]],
            || &completed,
        )?;
        Ok(output.commit()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::Shape;
    use crate::output::tests::SharedBuffer;
    use crate::output::{Format, Output};

    fn decoder(shape: Shape, keep_going: bool) -> (decode::Decoder, SharedBuffer) {
        decoder_with_format(Format::Jsonl, shape, keep_going)
    }

    fn decoder_with_format(
        format: Format,
        shape: Shape,
        keep_going: bool,
    ) -> (decode::Decoder, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let output = Output::new(Box::new(buffer.clone()), format, None);
        let decoder =
            decode::Decoder::new(decode::Encoding::Auto, shape, keep_going, output).unwrap();
        (decoder, buffer)
    }

    #[test]
    fn decodes_lines_into_jsonl() {
        let (mut decoder, buffer) = decoder(Shape::Simplified, false);
        decoder.frame("3f 83 02 a1 3d").unwrap();
        decoder.frame("[63, 131, 2, 161, 61]").unwrap();
        decoder.finish().unwrap();
        let lines = buffer.contents();
        let lines = lines.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let record: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(record["function"], "Error Response");
            assert_eq!(record["error"]["code"], 2);
        }
    }

    #[test]
    fn stops_at_first_failure() {
        let (mut decoder, _) = decoder(Shape::Detailed, false);
        let error = decoder.frame("3f030").unwrap_err();
        assert!(matches!(
            error,
            decode::Error::Decode(crate::Error::Input(crate::input::InputError::OddLength(5)), _)
        ));
    }

    #[test]
    fn keeps_going_past_failures() {
        let (mut decoder, buffer) = decoder(Shape::Detailed, true);
        decoder.frame("3f8302a13e").unwrap();
        decoder.frame("3f8302a13d").unwrap();
        decoder.finish().unwrap();
        let contents = buffer.contents();
        let records = contents
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(records[0]["input"], "3f8302a13e");
        assert_eq!(
            records[0]["error"],
            "frame failed the integrity check: checksum mismatch (computed 0x3da1, received 0x3ea1)"
        );
        assert_eq!(records[1]["function_code"], 131);
        assert!(records[1]["timestamp"].is_string());
    }

    #[test]
    fn failed_raw_frames_keep_their_bytes() {
        let (mut decoder, buffer) = decoder(Shape::Detailed, true);
        let bytes = [0x3f, 0x83, 0x02, 0xa1, 0x3e];
        decoder.raw_frame(&bytes).unwrap();
        decoder.finish().unwrap();
        let record = serde_json::from_str::<serde_json::Value>(buffer.contents().trim()).unwrap();
        let input = record["input"].as_str().unwrap();
        assert_eq!(input, "3F8302A13E");
        assert_eq!(hex::decode(input).unwrap(), bytes);
    }

    #[test]
    fn csv_rows() {
        let (mut decoder, buffer) = decoder_with_format(Format::Csv, Shape::Detailed, true);
        decoder.frame("3f8302a13d").unwrap();
        decoder.frame("3f8302a13e").unwrap();
        let write = crate::checksum::with_checksum(&[0x3f, 0x06, 0x10, 0x01, 0x00, 0x04]);
        decoder.frame(&hex::encode(write)).unwrap();
        decoder.finish().unwrap();
        let contents = buffer.contents();
        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Timestamp,Slave,Function,Register,Address,Value,Unit");
        // Every row starts with the capture timestamp.
        let rest = |line: &str| line.split_once(',').unwrap().1.to_string();
        assert_eq!(
            rest(lines[1]),
            "63,Error Response,error,,Modbus Error: Illegal Data Address,"
        );
        assert_eq!(
            rest(lines[2]),
            ",,error,,\"frame failed the integrity check: checksum mismatch \
             (computed 0x3da1, received 0x3ea1) (input \"\"3f8302a13e\"\")\","
        );
        assert_eq!(
            rest(lines[3]),
            "63,Write Single Register,status_command,0x1001,stop (4),"
        );
    }

    #[test]
    fn encodings() {
        let bytes = |text, encoding| decode::interpret(text, encoding).and_then(|i| i.to_bytes());
        assert_eq!(bytes("3f83", decode::Encoding::Hex), Ok(vec![0x3f, 0x83]));
        assert_eq!(bytes("3f83", decode::Encoding::Raw), Ok(b"3f83".to_vec()));
        assert_eq!(bytes("[63, 131]", decode::Encoding::Array), Ok(vec![0x3f, 0x83]));
        assert!(bytes("3f83", decode::Encoding::Array).is_err());
    }

    #[test]
    fn completes_frames() {
        assert_eq!(
            checksum::complete("3f 83 02"),
            Ok(checksum::Completed { checksum: 0x3da1, frame: "3F8302A13D".into() })
        );
    }

    #[test]
    fn register_filter() {
        let names = registers::matching(Some("frequency")).map(|r| r.name()).collect::<Vec<_>>();
        assert_eq!(
            names,
            [
                "output_frequency",
                "maximum_frequency",
                "minimum_frequency",
                "carrier_frequency",
                "frequency_setpoint"
            ]
        );
        assert_eq!(registers::matching(None).count(), 20);
    }
}
