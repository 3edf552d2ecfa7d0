//! Data structures representing format components.
//!
//! Contains structured representations of the frame header and its
//! conditional metadata blocks, logical channel roles and the object audio
//! metadata carried alongside object-based streams.

pub mod channel;
pub mod header;
pub mod info;
pub mod legacy;
pub mod mixing;
pub mod oamd;
