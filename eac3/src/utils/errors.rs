/// Returns `$err` when `$level` is at or above the configured fail level,
/// otherwise logs it at `$level` and carries on.
#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        let err = $err;
        if $level <= $state.fail_level {
            return Err(err.into());
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", err),
                ::log::Level::Warn => ::log::warn!("{}", err),
                ::log::Level::Info => ::log::info!("{}", err),
                ::log::Level::Debug => ::log::debug!("{}", err),
                ::log::Level::Trace => ::log::trace!("{}", err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug)]
pub enum BitstreamError {
    #[error("{op}({requested}): out of bounds bits at {position}, {available} available")]
    OutOfRange {
        op: &'static str,
        requested: u64,
        available: u64,
        position: u64,
    },

    #[error("Field width must be between 1 and 32 bits, got {0}")]
    InvalidWidth(u32),

    #[error("Value {value:#X} does not fit in {bits} bits")]
    ValueTooWide { value: u32, bits: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    #[error("Bad sync word: read {0:#06X}, expected 0x0B77")]
    Sync(u16),

    #[error("Reserved value in {field}: {value}")]
    ReservedValue { field: &'static str, value: u32 },

    #[error("Unsupported legacy format: decoder id {0}")]
    UnsupportedLegacy(u8),

    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    #[error("Corrupted channel mapping: {produced} targets for {slots} channel slots")]
    Corruption { produced: usize, slots: usize },

    #[error("Frame of {0} bytes is shorter than its header")]
    FrameTooShort(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("Insufficient buffer data for frame extraction")]
    InsufficientData,

    #[error("CRC check failed for frame of {0} bytes")]
    CrcMismatch(usize),

    #[error("Invalid frame size code at sync")]
    InvalidFrameSize,
}

#[derive(thiserror::Error, Debug)]
pub enum OamdError {
    #[error("Unsupported OAMD version {0}")]
    UnsupportedVersion(u8),

    #[error("Reserved sample_offset_code")]
    ReservedSampleOffset,

    #[error("Reserved intermediate spatial format index {0}")]
    ReservedIsfIndex(u8),
}

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("Decoder produced {produced} channels, renderer expects {expected}")]
    ChannelMismatch { produced: usize, expected: usize },

    #[error("Object metadata describes {objects} objects, stream carries {channels} channels")]
    ObjectMismatch { objects: usize, channels: usize },

    #[error("Speaker layout has no channels")]
    EmptyLayout,

    #[error("Unknown layout preset {0:?}")]
    UnknownPreset(String),
}
