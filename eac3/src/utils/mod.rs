//! Utility functions and supporting infrastructure.
//!
//! Provides bit-level I/O, CRC validation and error types shared by the
//! parsing and rendering stages.

pub mod bitstream_io;
pub mod crc;
pub mod errors;
