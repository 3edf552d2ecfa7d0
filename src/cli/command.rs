use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use eac3::mixer::MixerKind;
use eac3::render::listener::Quality;

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = concat!(
        env!("CARGO_PKG_VERSION"),
        "\neac3 ", env!("EAC3_VERSION"),
        "\nbuilt ", env!("BUILD_TIMESTAMP"),
    ),
    author       = env!("CARGO_PKG_AUTHORS"),
    about        = "Tools for inspecting Enhanced AC-3 bitstreams and previewing spatial panning",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print stream information
    Info(InfoArgs),

    /// Print the speaker gains of a single source
    Pan(PanArgs),
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input E-AC-3 bitstream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct PanArgs {
    /// Layout preset (2.0, 5.1, 7.1, 5.1.2, 7.1.4) or a YAML layout file.
    #[arg(long, value_name = "LAYOUT", default_value = "7.1.4")]
    pub layout: String,

    /// Listener settings YAML file; command line options override it.
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Source position in room cube space as x,y,z (each -1 to 1).
    #[arg(
        long,
        value_name = "X,Y,Z",
        value_delimiter = ',',
        allow_negative_numbers = true,
        default_values_t = [0.0, 0.0, 1.0],
    )]
    pub position: Vec<f32>,

    /// Spatial mixer strategy.
    #[arg(long, value_enum)]
    pub mixer: Option<MixerArg>,

    /// Panning quality.
    #[arg(long, value_enum)]
    pub quality: Option<QualityArg>,

    /// Source size (0 to 1).
    #[arg(long, default_value_t = 0.0)]
    pub size: f32,

    /// Linear source gain.
    #[arg(long, default_value_t = 1.0)]
    pub gain: f32,

    /// Use sharper theatre panning curves.
    #[arg(long)]
    pub theatre: bool,

    /// Treat the source as a low-frequency effects channel.
    #[arg(long)]
    pub lfe: bool,

    /// Feed every source to the LFE channels as well.
    #[arg(long)]
    pub no_lfe_separation: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum MixerArg {
    /// Layer and plane balancing.
    Balance,
    /// Angle-weighted panning.
    Directional,
}

impl From<MixerArg> for MixerKind {
    fn from(value: MixerArg) -> Self {
        match value {
            MixerArg::Balance => MixerKind::Balance,
            MixerArg::Directional => MixerKind::Directional,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum QualityArg {
    /// Linear angle estimate, three strongest speakers.
    Low,
    /// Linear angle estimate, three strongest speakers.
    Medium,
    /// Exact angles, three strongest speakers.
    High,
    /// Exact angles, every speaker.
    Perfect,
}

impl From<QualityArg> for Quality {
    fn from(value: QualityArg) -> Self {
        match value {
            QualityArg::Low => Quality::Low,
            QualityArg::Medium => Quality::Medium,
            QualityArg::High => Quality::High,
            QualityArg::Perfect => Quality::Perfect,
        }
    }
}
