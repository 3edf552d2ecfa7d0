use std::collections::BTreeMap;

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::Level;

use super::command::{Cli, InfoArgs};
use crate::input::InputReader;
use crate::timestamp::time_str;
use eac3::process::{
    extract::{Extractor, Frame},
    parse::Parser,
};
use eac3::structs::header::{FrameHeader, HeaderBody, StreamType};
use eac3::structs::info::{ProductionInfo, bitstream_mode_name, surround_mode_name};
use eac3::structs::mixing::DOWNMIX_LEVELS_DB;
use eac3::utils::errors::ExtractError;

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing E-AC-3 stream: {}", args.input.display());

    let context = analyze_stream(&args.input, cli, multi)?;

    if context.streams.is_empty() {
        println!("No E-AC-3 sync frame found in the file.");
        println!("This doesn't appear to be a valid E-AC-3 stream.");
        return Ok(());
    }

    display_summary(&context);

    Ok(())
}

fn analyze_stream(
    input_path: &std::path::Path,
    cli: &Cli,
    multi: Option<&MultiProgress>,
) -> Result<AnalysisContext> {
    let mut input_reader = InputReader::new(input_path)?;
    let mut extractor = Extractor::default();
    let mut parser = Parser::default();

    // Configure fail level based on strict mode
    let fail_level = if cli.strict {
        Level::Warn
    } else {
        Level::Error
    };
    parser.set_fail_level(fail_level);

    let mut context = AnalysisContext::default();

    if let Some(multi) = multi {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb.set_message("Analyzing frames...");
        context.pb = Some(pb);
    }

    input_reader.process_chunks(64 * 1024, |chunk| {
        context.total_bytes += chunk.len();
        extractor.push_bytes(chunk);

        for frame_result in extractor.by_ref() {
            let frame = match frame_result {
                Ok(frame) => frame,
                Err(ExtractError::CrcMismatch(len)) if cli.strict => {
                    return Err(ExtractError::CrcMismatch(len).into());
                }
                Err(_) => continue,
            };

            context.process_frame(&frame, &mut parser, cli)?;
        }

        Ok(true)
    })?;

    context.crc_failures = extractor.crc_failures();
    context.finish();

    Ok(context)
}

#[derive(Default)]
struct AnalysisContext {
    /// First header of every (stream type, substream id) pair.
    streams: BTreeMap<(u8, u8), FrameHeader>,
    /// Samples carried by independent substream 0.
    samples: u64,
    sample_rate: u32,
    frame_count: usize,
    parse_errors: usize,
    crc_failures: usize,
    total_bytes: usize,
    pb: Option<ProgressBar>,
}

impl AnalysisContext {
    fn process_frame(&mut self, frame: &Frame, parser: &mut Parser, cli: &Cli) -> Result<()> {
        match parser.parse_frame(frame) {
            Ok(parsed) => {
                let header = parsed.header;
                let key = (header.stream_type.code(), header.substream_id);

                if header.stream_type != StreamType::Dependent && header.substream_id == 0 {
                    self.samples += header.samples_per_frame() as u64;
                    self.sample_rate = header.sample_rate();
                }

                if !self.streams.contains_key(&key) {
                    self.suspend(|| display_header(&header));
                    self.streams.insert(key, header);
                }
            }
            Err(e) => {
                if cli.strict {
                    return Err(e);
                }
                self.parse_errors += 1;
                log::warn!("Parse error at frame {}: {e}", self.frame_count);
            }
        }

        self.frame_count += 1;

        if self.frame_count.is_multiple_of(100) {
            if let Some(ref pb) = self.pb {
                pb.set_message(format!("Analyzing frames...       {}", self.frame_count));
                pb.tick();
            }
        }

        Ok(())
    }

    /// Prints without tearing the progress spinner.
    fn suspend<F: FnOnce()>(&self, f: F) {
        match &self.pb {
            Some(pb) => pb.suspend(f),
            None => f(),
        }
    }

    fn finish(&self) {
        if let Some(ref pb) = self.pb {
            pb.finish_and_clear();
        }
    }
}

fn display_header(header: &FrameHeader) {
    println!();
    println!(
        "{} substream {}",
        header.stream_type, header.substream_id
    );
    println!("  Sampling rate             {} Hz", header.sample_rate());
    println!("  Blocks per frame          {}", header.blocks);
    println!("  Frame size                {} bytes", header.frame_bytes());
    println!("  Bitrate                   {} kbps", header.bitrate() / 1000);
    println!("  Channel mode              {}", header.channel_mode);
    println!("  LFE                       {}", header.lfe);

    match header.channel_arrangement() {
        Ok(channels) => {
            let labels = channels
                .iter()
                .map(|channel| channel.label())
                .collect::<Vec<_>>()
                .join(", ");
            println!("  Channel arrangement       {labels}");
        }
        Err(e) => println!("  Channel arrangement       invalid ({e})"),
    }

    if let Some(channel_map) = header.channel_map() {
        println!("  Channel map               {channel_map:#06X}");
    }

    println!(
        "  Dialogue Level            {:>3} dBFS",
        header.dialog_normalization_db()
    );

    match &header.body {
        HeaderBody::Enhanced(_) => {
            display_mixing(header);
            display_informational(header);
        }
        HeaderBody::Legacy(body) => {
            println!("  Framing                   AC-3");
            println!(
                "  Service                   {}",
                bitstream_mode_name(body.bitstream_mode, header.channel_mode)
            );
            if let Some(mode) = body.surround_mode {
                println!("  Dolby Surround            {}", surround_mode_name(mode));
            }
            if let Some(production) = &body.production {
                display_production(production);
            }
        }
    }
}

fn downmix_db(code: Option<u8>) -> Option<f32> {
    code.map(|code| DOWNMIX_LEVELS_DB[(code & 7) as usize])
}

fn display_mixing(header: &FrameHeader) {
    let Some(mixing) = header.mixing() else {
        return;
    };

    println!("  Mixing metadata");
    if let Some(mode) = mixing.downmix_mode {
        println!("    Preferred downmix       {mode}");
    }
    if let Some(level) = downmix_db(mixing.ltrt_center_level) {
        println!("    LtRt center level       {level:+.1} dB");
    }
    if let Some(level) = downmix_db(mixing.ltrt_surround_level) {
        println!("    LtRt surround level     {level:+.1} dB");
    }
    if let Some(level) = downmix_db(mixing.loro_center_level) {
        println!("    LoRo center level       {level:+.1} dB");
    }
    if let Some(level) = downmix_db(mixing.loro_surround_level) {
        println!("    LoRo surround level     {level:+.1} dB");
    }
    if let Some(scale) = mixing.program_scale_db() {
        println!("    Program scale           {scale:+} dB");
    }
}

fn display_informational(header: &FrameHeader) {
    let Some(info) = header.info() else {
        return;
    };

    println!("  Informational metadata");
    println!(
        "    Service                 {}",
        bitstream_mode_name(info.bitstream_mode, header.channel_mode)
    );
    println!("    Copyright               {}", info.copyright);
    println!("    Original bitstream      {}", info.original);
    if let Some(mode) = info.surround_mode {
        println!("    Dolby Surround          {}", surround_mode_name(mode));
    }
    if let Some(mode) = info.surround_ex_mode {
        println!("    Dolby Surround EX       {}", surround_mode_name(mode));
    }
    if let Some(production) = &info.production {
        display_production(production);
    }
}

fn display_production(production: &ProductionInfo) {
    println!("    Mix Level               {:>3} dB", production.mix_level_db());
    println!("    Room type               {}", production.room_type_name());
}

fn display_summary(context: &AnalysisContext) {
    println!();
    println!("Analysis Summary");
    println!("  Frames processed          {}", context.frame_count);
    println!("  Substreams                {}", context.streams.len());

    let size_mb = context.total_bytes as f64 / 1_000_000.0;
    println!(
        "  Size                      {size_mb:.2} MB ({} bytes)",
        context.total_bytes
    );

    if context.sample_rate > 0 {
        let duration_secs = context.samples as f64 / context.sample_rate as f64;
        println!("  Duration                  {}", time_str(duration_secs));

        if duration_secs > 0.0 {
            let avg_data_rate_kbps = (context.total_bytes as f64 * 8.0) / (duration_secs * 1000.0);
            println!("  Average data rate         {avg_data_rate_kbps:.1} kbps");
        }
    }

    println!("  CRC failures              {}", context.crc_failures);
    if context.parse_errors > 0 {
        println!("  Parse errors              {}", context.parse_errors);
    }

    println!();
}
