use std::{
    fs::File,
    io::{self, BufRead, BufReader},
};

use anyhow::Context as _;
use zenoss_output::measurement::{Measurement, TimestampPrecision};

use crate::GenericError;

const STDIN_INPUT: &str = "-";

/// Reads measurements from the given input: a file path, or `-` for standard input.
///
/// # Errors
///
/// If the input cannot be read, or any line is not a valid measurement, an error is returned.
pub fn read_measurements(input: &str, precision: TimestampPrecision) -> Result<Vec<Measurement>, GenericError> {
    if input == STDIN_INPUT {
        parse_measurements(io::stdin().lock(), precision)
    } else {
        let file = File::open(input).with_context(|| format!("Failed to open input file '{}'.", input))?;
        parse_measurements(BufReader::new(file), precision)
    }
}

/// Parses JSON measurements, one per line. Blank lines are skipped.
fn parse_measurements<R: BufRead>(reader: R, precision: TimestampPrecision) -> Result<Vec<Measurement>, GenericError> {
    let mut measurements = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input.")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let measurement = Measurement::from_json(line, precision)
            .with_context(|| format!("Failed to parse measurement on line {}.", idx + 1))?;
        measurements.push(measurement);
    }

    Ok(measurements)
}
