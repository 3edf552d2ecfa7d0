#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! Frame header codec for Enhanced AC-3 bitstreams plus an object-based
//! spatial renderer for the decoded audio.
//!
//! ### Bitstream Organization
//!
//! **Framing**: Sync frames of 1, 2, 3 or 6 audio blocks, each starting with
//! the `0x0B77` sync word and closed by a CRC word.
//! **Substreams**: Independent substreams carry complete programs, dependent
//! substreams extend them with additional channels described by a channel
//! map.
//!
//! ### Header Metadata
//!
//! - Dialog normalization and compression words
//! - Mixing metadata (downmix levels, program scales, pan info)
//! - Informational metadata (service type, surround modes, production info)
//! - AC-3 framed streams carried by the alternate decoder id
//!
//! ### Rendering
//!
//! Decoded channels and metadata-driven objects become positioned sources
//! that a balance or directional mixer places onto any speaker layout.
//!
//! ## Quick Start
//!
//! 1. Extract frames from a bitstream using [`process::extract::Extractor`]
//! 2. Parse frame headers using [`process::parse::Parser`]
//! 3. Render decoded audio with a [`render::listener::Listener`]
//!
//! ```rust,no_run
//! use eac3::process::{extract::Extractor, parse::Parser};
//!
//! let mut extractor = Extractor::default();
//! let mut parser = Parser::default();
//!
//! extractor.push_bytes(&std::fs::read("stream.ec3")?);
//!
//! for frame_result in extractor {
//!     match frame_result {
//!         Ok(frame) => {
//!             let parsed = parser.parse_frame(&frame)?;
//!             let channels = parsed.header.channel_arrangement()?;
//!             println!("{} Hz, {} channels", parsed.header.sample_rate(), channels.len());
//!         }
//!         Err(extract_error) => {
//!             // The extractor resynchronizes on its own
//!             eprintln!("Frame extraction error: {extract_error}");
//!         }
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Speaker layouts and spatial mixers.
///
/// - **Layouts** ([`mixer::layout`]): Presets and YAML-configurable layouts
/// - **Balance** ([`mixer::balance`]): Layer/plane/column balancing
/// - **Directional** ([`mixer::directional`]): Angle-weighted panning
pub mod mixer;

/// Processing functionality for audio bitstreams.
///
/// 1. **Frame Extraction** ([`process::extract`]): Cuts CRC-checked frames
///    out of bitstream data using sync word detection.
///
/// 2. **Parsing** ([`process::parse`]): Decodes frame headers.
pub mod process;

/// Turning decoded streams into positioned sources.
///
/// - **Renderers** ([`render::channel`], [`render::object`]): Channel and
///   object based variants
/// - **Movement** ([`render::movement`]): Keyframe interpolation
/// - **Sources** ([`render::source`]): Decoder and metadata traits
/// - **Listener** ([`render::listener`]): Mixing session
pub mod render;

/// Data structures representing format components.
///
/// - **Frame Header** ([`structs::header`]): Sync info and bitstream info
/// - **Mixing Metadata** ([`structs::mixing`]): Downmix and program scales
/// - **Informational Metadata** ([`structs::info`]): Service and production info
/// - **Legacy Body** ([`structs::legacy`]): AC-3 framed bitstream info
/// - **Channels** ([`structs::channel`]): Channel roles and positions
/// - **Object Audio Metadata** ([`structs::oamd`]): Object positions over time
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bit-level reading/writing
/// - **CRC Validation** ([`utils::crc`]): Error detection
/// - **Error Handling** ([`utils::errors`]): Error types
pub mod utils;
