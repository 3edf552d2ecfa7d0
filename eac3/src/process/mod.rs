/// Frame extraction from audio bitstreams.
///
/// Provides the [`Extractor`](extract::Extractor) for finding sync words and
/// cutting individual [`Frame`](extract::Frame) objects out of continuous
/// bitstream data.
pub mod extract;

/// Frame header parsing.
///
/// Provides the [`Parser`](parse::Parser) for turning raw frames into
/// [`FrameHeader`](crate::structs::header::FrameHeader) values plus a bit
/// cursor over the rest of the frame.
pub mod parse;
