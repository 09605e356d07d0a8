//! Buffered line reading over a finite log file.
//!
//! Strictly sequential, single pass: lines come back in file order and EOF
//! ends the run. Only unavailability of the stream itself is an error; line
//! content is never validated here. Bytes that are not valid UTF-8 are
//! replaced rather than rejected, so a corrupt stretch of log cannot abort
//! the analysis.

use std::fs::File;
use std::io::{BufRead, BufReader};

/// Buffer size for reading log files (8KB).
const BUFFER_SIZE: usize = 8 * 1024;

/// Sequential log file loader.
pub struct LogLoader {
    reader: BufReader<File>,
    line_buffer: Vec<u8>,
}

impl LogLoader {
    /// Create a new log loader.
    ///
    /// # Parameters
    ///
    /// * `path` - Path to the log file
    ///
    /// # Returns
    ///
    /// `Ok(LogLoader)` if the file opens successfully, `Err` otherwise.
    pub fn new(path: &str) -> Result<Self, std::io::Error> {
        let file = File::open(path)?;
        let reader = BufReader::with_capacity(BUFFER_SIZE, file);

        Ok(Self {
            reader,
            line_buffer: Vec::with_capacity(512),
        })
    }

    /// Read the next non-empty line from the log file.
    ///
    /// # Returns
    ///
    /// `Ok(Some(line))` if a line is available, `Ok(None)` at EOF. Read
    /// errors propagate to the caller and terminate the run.
    pub fn next_line(&mut self) -> Result<Option<String>, std::io::Error> {
        loop {
            self.line_buffer.clear();

            match self.reader.read_until(b'\n', &mut self.line_buffer)? {
                0 => return Ok(None),
                _ => {
                    let line = String::from_utf8_lossy(&self.line_buffer);
                    let line = line.trim_end();
                    if !line.is_empty() {
                        return Ok(Some(line.to_string()));
                    }
                    // Skip empty lines
                }
            }
        }
    }
}
