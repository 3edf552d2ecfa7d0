use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

/// Bitstream source reading either a file or stdin (`-`).
pub struct InputReader {
    reader: Box<dyn Read>,
}

impl InputReader {
    pub fn new<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let path = input_path.as_ref();

        let reader: Box<dyn Read> = if path.as_os_str() == "-" {
            Box::new(io::stdin().lock())
        } else {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        };

        Ok(Self { reader })
    }

    #[cfg(test)]
    pub fn from_reader<R: Read + 'static>(reader: R) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }

    /// Feeds the input to `callback` in chunks of at most `chunk_size` bytes
    /// until EOF or until the callback returns `Ok(false)`.
    pub fn process_chunks<F>(&mut self, chunk_size: usize, mut callback: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<bool>,
    {
        let mut buffer = vec![0u8; chunk_size];

        loop {
            let bytes_read = match self.reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if !callback(&buffer[..bytes_read])? {
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_until_callback_stops() -> Result<()> {
        let data = (0..=255u8).collect::<Vec<_>>();

        let mut seen = Vec::new();
        InputReader::from_reader(io::Cursor::new(data.clone())).process_chunks(100, |chunk| {
            seen.extend_from_slice(chunk);
            Ok(true)
        })?;
        assert_eq!(seen, data);

        let mut calls = 0;
        InputReader::from_reader(io::Cursor::new(data)).process_chunks(100, |_| {
            calls += 1;
            Ok(false)
        })?;
        assert_eq!(calls, 1);

        Ok(())
    }
}
