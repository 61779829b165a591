use std::io::{self, Write};
use std::path::Path;

use crate::sim::Sample;

/// Write a closed-loop response to CSV format.
///
/// Columns: time, setpoint, measurement, output, integral
pub fn write_response<W: Write>(writer: &mut W, samples: &[Sample]) -> io::Result<()> {
    writeln!(writer, "time,setpoint,measurement,output,integral")?;

    for s in samples {
        writeln!(
            writer,
            "{:.4},{:.4},{:.4},{:.4},{:.4}",
            s.time, s.setpoint, s.measurement, s.output, s.integral,
        )?;
    }

    Ok(())
}

/// Write a response to a CSV file at the given path.
pub fn write_response_file<P: AsRef<Path>>(path: P, samples: &[Sample]) -> io::Result<()> {
    let mut file = io::BufWriter::new(std::fs::File::create(path)?);
    write_response(&mut file, samples)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_output_has_header_and_rows() {
        let samples = vec![
            Sample { time: 0.0, setpoint: 60.0, measurement: 20.0, output: 0.0, integral: 0.0 },
            Sample { time: 0.05, setpoint: 60.0, measurement: 20.4, output: 100.0, integral: 1.0 },
        ];

        let mut buf = Vec::new();
        write_response(&mut buf, &samples).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[0].starts_with("time,"));
        assert_eq!(lines.len(), 3); // header + 2 data rows
        assert_eq!(lines[2], "0.0500,60.0000,20.4000,100.0000,1.0000");
    }

    #[test]
    fn csv_file_matches_writer_output() {
        let samples = vec![
            Sample { time: 0.0, setpoint: 1.0, measurement: 0.0, output: 0.5, integral: 0.0 },
        ];
        let path = std::env::temp_dir().join(format!("pid-response-{}.csv", std::process::id()));
        write_response_file(&path, &samples).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let mut buf = Vec::new();
        write_response(&mut buf, &samples).unwrap();
        assert_eq!(written, String::from_utf8(buf).unwrap());
    }
}
