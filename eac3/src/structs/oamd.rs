//! Object Audio Metadata (OAMD) payloads.
//!
//! Only the program assignment and the object element are interpreted; other
//! elements are skipped by their declared size. Positions are converted to
//! the listener cube space used by the renderers.

use anyhow::{Result, bail};
use log::{trace, warn};

use crate::render::movement::MovementTimeframe;
use crate::render::source::ObjectMetadata;
use crate::render::vector::Vec3;
use crate::structs::channel::ReferenceChannel;
use crate::utils::bitstream_io::BitCursor;
use crate::utils::errors::OamdError;

pub const MAX_OBJECT_COUNT: usize = 159;
pub const MAX_INFO_BLOCKS: usize = 8;
pub const GAIN_MINUS_INFINITY: i8 = -128;

/// Samples per unit of `block_offset_factor`.
pub const BLOCK_OFFSET_UNIT: u64 = 32;

/// Bed speaker of each assignment bit.
#[rustfmt::skip]
pub const BED_CHANNELS: [ReferenceChannel; 17] = {
    use ReferenceChannel::*;
    [
        FrontLeft, FrontRight, FrontCenter, ScreenLFE,
        SideLeft, SideRight, RearLeft, RearRight,
        TopFrontLeft, TopFrontRight, TopSideLeft, TopSideRight,
        TopRearLeft, TopRearRight, WideLeft, WideRight,
        ScreenLFE,
    ]
};

/// Bed assignment bits covered by each standard assignment flag.
pub const STD_BED_LIST: [&[usize]; 10] = [
    &[0, 1],
    &[2],
    &[3],
    &[4, 5],
    &[6, 7],
    &[8, 9],
    &[10, 11],
    &[12, 13],
    &[14, 15],
    &[16],
];

pub const ISF_COUNT_LIST: [usize; 6] = [4, 8, 10, 14, 15, 30];

#[derive(Debug)]
struct OamdState {
    object_count: usize,
    beds_or_isf: usize,
    alternate_object_data_present: bool,
    prev_object_gain: [i8; MAX_INFO_BLOCKS],
    prev_basic_info: ObjectBasicInfo,
    prev_render_info: ObjectRenderInfo,
}

impl OamdState {
    fn new(object_count: usize) -> Self {
        Self {
            object_count,
            beds_or_isf: 0,
            alternate_object_data_present: false,
            prev_object_gain: [0; MAX_INFO_BLOCKS],
            prev_basic_info: ObjectBasicInfo::default(),
            prev_render_info: ObjectRenderInfo::default(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BedAssignment(pub [bool; 17]);

impl BedAssignment {
    pub fn from_non_std(value: u32) -> Self {
        let mut ret = Self::default();
        for (i, slot) in ret.0.iter_mut().enumerate() {
            *slot = (value >> i) & 1 == 1;
        }

        ret
    }

    pub fn from_std(value: u16) -> Self {
        let mut ret = Self::default();
        for (i, &bed) in STD_BED_LIST.iter().enumerate() {
            if (value >> i) & 1 == 1 {
                for &n in bed {
                    ret.0[n] = true;
                }
            }
        }

        ret
    }

    pub fn lfe_only() -> Self {
        let mut ret = Self::default();
        ret.0[3] = true;

        ret
    }

    pub fn channels(&self) -> impl Iterator<Item = ReferenceChannel> + '_ {
        self.0
            .iter()
            .zip(BED_CHANNELS)
            .filter_map(|(&set, channel)| set.then_some(channel))
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&set| set).count()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramAssignment {
    pub dynamic_only: bool,
    pub bed_channel_distribute: bool,
    pub bed_assignment: Vec<BedAssignment>,
    pub num_bed_objects: usize,
    pub num_isf_objects: usize,
    pub num_dynamic_objects: usize,
}

impl ProgramAssignment {
    pub fn beds_or_isf_count(&self) -> usize {
        self.num_bed_objects + self.num_isf_objects
    }

    /// Bed speaker of every bed object, in object order.
    pub fn bed_channels(&self) -> Vec<ReferenceChannel> {
        self.bed_assignment
            .iter()
            .flat_map(BedAssignment::channels)
            .collect()
    }

    fn read(state: &OamdState, reader: &mut BitCursor) -> Result<Self> {
        let mut prog = Self {
            dynamic_only: reader.get()?,
            ..Default::default()
        };

        if prog.dynamic_only {
            prog.num_dynamic_objects = state.object_count;

            // LFE present
            if reader.get()? {
                prog.bed_assignment.push(BedAssignment::lfe_only());
                prog.num_dynamic_objects = prog.num_dynamic_objects.saturating_sub(1);
            }
        } else {
            let content_description: u8 = reader.get_n(4)?;

            // speaker-anchored bed objects
            if content_description & 1 != 0 {
                prog.bed_channel_distribute = reader.get()?;

                let num_bed_instances = if reader.get()? {
                    reader.get_n::<u8>(3)? + 2
                } else {
                    1
                };

                for _ in 0..num_bed_instances {
                    let bed = if reader.get()? {
                        BedAssignment::lfe_only()
                    } else if reader.get()? {
                        BedAssignment::from_std(reader.get_n(10)?)
                    } else {
                        BedAssignment::from_non_std(reader.get_n(17)?)
                    };

                    prog.bed_assignment.push(bed);
                }
            }

            // intermediate spatial format
            if content_description & 2 != 0 {
                let index: u8 = reader.get_n(3)?;
                prog.num_isf_objects = *ISF_COUNT_LIST
                    .get(index as usize)
                    .ok_or(OamdError::ReservedIsfIndex(index))?;
            }

            // room- or screen-anchored dynamic objects
            if content_description & 4 != 0 {
                let mut num_dynamic_objects: usize = reader.get_n::<u8>(5)? as usize;
                if num_dynamic_objects == 31 {
                    num_dynamic_objects += reader.get_n::<u8>(7)? as usize;
                }

                prog.num_dynamic_objects = num_dynamic_objects + 1;
            }

            if content_description & 8 != 0 {
                let reserved_bits = (reader.get_n::<u32>(4)? + 1) << 3;
                reader.skip_n(reserved_bits)?;
            }
        }

        prog.num_bed_objects = prog.bed_assignment.iter().map(BedAssignment::count).sum();

        Ok(prog)
    }
}

/// Position and size of an element in the payload, for display.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementInfo {
    pub id: u8,
    pub size_bits: u64,
    pub alternate_object_data_id: Option<u8>,
    pub discard_unknown: bool,
}

pub const OBJECT_ELEMENT_ID: u8 = 1;

#[derive(Clone, Debug, Default)]
pub struct ObjectAudioMetadata {
    pub version: u8,
    pub object_count: usize,
    pub program: ProgramAssignment,
    pub alternate_object_data_present: bool,
    pub object_element: Option<ObjectElement>,
    pub elements: Vec<ElementInfo>,
}

impl ObjectAudioMetadata {
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let reader = &mut BitCursor::from_slice(bytes);

        let mut version: u8 = reader.get_n(2)?;
        if version == 3 {
            version += reader.get_n::<u8>(3)?;
        }

        if version != 0 {
            bail!(OamdError::UnsupportedVersion(version));
        }

        let mut object_count_bits: usize = reader.get_n::<u8>(5)? as usize;
        if object_count_bits == 31 {
            object_count_bits += reader.get_n::<u8>(7)? as usize;
        }

        let object_count = (object_count_bits + 1).min(MAX_OBJECT_COUNT);
        let mut state = OamdState::new(object_count);

        let program = ProgramAssignment::read(&state, reader)?;
        state.beds_or_isf = program.beds_or_isf_count();

        state.alternate_object_data_present = reader.get()?;

        let mut element_count: u8 = reader.get_n(4)?;
        if element_count == 15 {
            element_count += reader.get_n::<u8>(5)?;
        }

        let mut payload = Self {
            version,
            object_count,
            program,
            alternate_object_data_present: state.alternate_object_data_present,
            ..Default::default()
        };

        for _ in 0..element_count {
            let (info, element) = read_element(&mut state, reader)?;
            if element.is_some() {
                payload.object_element = element;
            }
            payload.elements.push(info);
        }

        Ok(payload)
    }

    /// Index of the bed object carrying LFE, if any.
    pub fn lfe_index(&self) -> Option<usize> {
        self.program
            .bed_channels()
            .iter()
            .position(|channel| channel.is_lfe())
    }

    /// Converts every object's info blocks into keyframes.
    ///
    /// `sample_pos` is the stream position the payload belongs to. Bed
    /// objects sit at their speaker position; inactive blocks are dropped.
    /// Each keyframe carries the block's linear gain and its largest size
    /// extent.
    pub fn timeframes(&self, sample_pos: u64) -> Vec<Vec<MovementTimeframe>> {
        let mut timeframes = vec![Vec::new(); self.object_count];
        let Some(element) = &self.object_element else {
            return timeframes;
        };

        let beds = self.program.bed_channels();
        let update = &element.md_update_info;
        let base = sample_pos + update.sample_offset as u64;

        for (object_index, (blocks, frames)) in element
            .object_data
            .iter()
            .zip(timeframes.iter_mut())
            .enumerate()
        {
            for (block, timing) in blocks.iter().zip(&update.block_update_info) {
                if block.object_not_active {
                    continue;
                }

                let position = if block.object_in_bed_or_isf {
                    beds.get(object_index)
                        .map_or(Vec3::ZERO, |channel| channel.position())
                } else {
                    block.object_render_info.cube_position()
                };

                frames.push(MovementTimeframe {
                    offset: base + timing.block_offset_factor as u64 * BLOCK_OFFSET_UNIT,
                    fade: timing.ramp_duration as u64,
                    position,
                    gain: block.object_basic_info.linear_gain(),
                    size: block.object_render_info.size(),
                });
            }
        }

        timeframes
    }
}

fn read_element(
    state: &mut OamdState,
    reader: &mut BitCursor,
) -> Result<(ElementInfo, Option<ObjectElement>)> {
    let mut info = ElementInfo {
        id: reader.get_n(4)?,
        ..Default::default()
    };

    info.size_bits = (reader.get_variable_bits_max(4, 4)? as u64 + 1) << 3;

    let pos_start = reader.position();
    let pos_end = if info.size_bits > reader.available() {
        warn!("Truncated OAMD element with id {}", info.id);
        pos_start + reader.available()
    } else {
        pos_start + info.size_bits
    };

    if state.alternate_object_data_present {
        info.alternate_object_data_id = Some(reader.get_n(4)?);
    }
    info.discard_unknown = reader.get()?;

    let element = if info.id == OBJECT_ELEMENT_ID {
        Some(ObjectElement::read(state, reader)?)
    } else {
        trace!("Skipping OAMD element {} ({} bits)", info.id, info.size_bits);
        None
    };

    let pos_current = reader.position();
    if pos_end > pos_current {
        reader.skip_n((pos_end - pos_current) as u32)?;
    }

    trace!(
        "OAMD element {}: start {pos_start}, expected end {pos_end}, actual end {pos_current}",
        info.id
    );

    Ok((info, element))
}

#[derive(Clone, Debug, Default)]
pub struct ObjectElement {
    pub md_update_info: MdUpdateInfo,
    pub reserved_data: Option<u8>,
    /// Info blocks per object.
    pub object_data: Vec<Vec<ObjectInfoBlock>>,
}

impl ObjectElement {
    fn read(state: &mut OamdState, reader: &mut BitCursor) -> Result<Self> {
        let md_update_info = MdUpdateInfo::read(reader)?;
        let reserved_data = if reader.get()? {
            None
        } else {
            Some(reader.get_n(5)?)
        };

        let block_count = md_update_info.block_update_info.len();
        let mut object_data = Vec::with_capacity(state.object_count);

        for object_index in 0..state.object_count {
            let blocks = (0..block_count)
                .map(|block_index| ObjectInfoBlock::read(state, reader, object_index, block_index))
                .collect::<Result<Vec<_>>>()?;

            object_data.push(blocks);
        }

        Ok(Self {
            md_update_info,
            reserved_data,
            object_data,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MdUpdateInfo {
    pub sample_offset: usize,
    pub block_update_info: Vec<BlockUpdateInfo>,
}

impl MdUpdateInfo {
    fn read(reader: &mut BitCursor) -> Result<Self> {
        let sample_offset = match reader.get_n::<u8>(2)? {
            0 => 0,
            1 => [8, 16, 18, 24][reader.get_n::<u8>(2)? as usize],
            2 => reader.get_n::<u8>(5)? as usize,
            _ => bail!(OamdError::ReservedSampleOffset),
        };

        let block_count = reader.get_n::<u8>(3)? as usize + 1;
        let block_update_info = (0..block_count)
            .map(|_| BlockUpdateInfo::read(reader))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            sample_offset,
            block_update_info,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockUpdateInfo {
    pub block_offset_factor: u8,
    pub ramp_duration: u16,
}

impl BlockUpdateInfo {
    pub const RAMP_DURATION_LIST: [u16; 16] = [
        32, 64, 128, 256, 320, 480, 1000, 1001, 1024, 1600, 1601, 1602, 1920, 2000, 2002, 2048,
    ];

    fn read(reader: &mut BitCursor) -> Result<Self> {
        let block_offset_factor = reader.get_n(6)?;

        let ramp_duration = match reader.get_n::<u8>(2)? {
            0 => 0,
            1 => 512,
            2 => 1536,
            _ => {
                if reader.get()? {
                    Self::RAMP_DURATION_LIST[reader.get_n::<u8>(4)? as usize]
                } else {
                    reader.get_n(11)?
                }
            }
        };

        Ok(Self {
            block_offset_factor,
            ramp_duration,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct ObjectInfoBlock {
    pub object_not_active: bool,
    pub object_basic_info: ObjectBasicInfo,
    pub object_in_bed_or_isf: bool,
    pub object_render_info: ObjectRenderInfo,
}

impl ObjectInfoBlock {
    fn read(
        state: &mut OamdState,
        reader: &mut BitCursor,
        object_index: usize,
        block_index: usize,
    ) -> Result<Self> {
        let mut info = Self {
            object_not_active: reader.get()?,
            object_in_bed_or_isf: object_index < state.beds_or_isf,
            ..Default::default()
        };

        let basic_status = if info.object_not_active {
            0
        } else if block_index == 0 {
            1
        } else {
            reader.get_n::<u8>(2)?
        };

        let prev_basic = if block_index == 0 {
            ObjectBasicInfo::default()
        } else {
            state.prev_basic_info.clone()
        };

        info.object_basic_info = match basic_status {
            0 => ObjectBasicInfo::default(),
            1 | 3 => ObjectBasicInfo::read(
                &prev_basic,
                state,
                reader,
                object_index,
                block_index,
                basic_status,
            )?,
            _ => prev_basic,
        };
        state.prev_basic_info = info.object_basic_info.clone();

        let render_status = if info.object_not_active || info.object_in_bed_or_isf {
            0
        } else if block_index == 0 {
            1
        } else {
            reader.get_n::<u8>(2)?
        };

        let prev_render = if block_index == 0 {
            ObjectRenderInfo::default()
        } else {
            state.prev_render_info.clone()
        };

        info.object_render_info = match render_status {
            0 => ObjectRenderInfo::default(),
            1 | 3 => ObjectRenderInfo::read(&prev_render, reader, render_status, block_index)?,
            _ => prev_render,
        };
        state.prev_render_info = info.object_render_info.clone();

        // additional table data
        if reader.get()? {
            let size_bits = (reader.get_n::<u32>(4)? + 1) << 3;
            reader.skip_n(size_bits)?;
        }

        Ok(info)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectBasicInfo {
    /// Gain in dB, [`GAIN_MINUS_INFINITY`] for muted.
    pub object_gain: i8,
    pub object_priority: f32,
}

impl Default for ObjectBasicInfo {
    fn default() -> Self {
        Self {
            object_gain: GAIN_MINUS_INFINITY,
            object_priority: 0.0,
        }
    }
}

impl ObjectBasicInfo {
    pub fn linear_gain(&self) -> f32 {
        match self.object_gain {
            GAIN_MINUS_INFINITY => 0.0,
            gain => 10f32.powf(gain as f32 / 20.0),
        }
    }

    fn read(
        prev: &Self,
        state: &mut OamdState,
        reader: &mut BitCursor,
        object_index: usize,
        block_index: usize,
        status: u8,
    ) -> Result<Self> {
        let mut basic = prev.clone();

        let info_bits = if status == 1 { 3 } else { reader.get_n::<u8>(2)? };

        if info_bits & 1 != 0 {
            let prev_gain = if object_index == 0 {
                0
            } else {
                state.prev_object_gain[block_index % MAX_INFO_BLOCKS]
            };

            basic.object_gain = match reader.get_n::<u8>(2)? {
                0 => 0,
                1 => GAIN_MINUS_INFINITY,
                2 => {
                    let gain_bits: u8 = reader.get_n(6)?;
                    if gain_bits < 15 {
                        15 - gain_bits as i8
                    } else {
                        14 - gain_bits as i8
                    }
                }
                _ => prev_gain,
            };

            state.prev_object_gain[block_index % MAX_INFO_BLOCKS] = basic.object_gain;
        }

        if info_bits & 2 != 0 {
            basic.object_priority = if reader.get()? {
                1.0
            } else {
                reader.get_n::<u8>(5)? as f32 / 32.0
            };
        }

        Ok(basic)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectRenderInfo {
    pub differential_position: bool,
    /// Room coordinates: x left to right, y front to back (0..=1), z height (-1..=1).
    pub pos3d: [f32; 3],
    pub distance_specified: bool,
    pub at_infinity: bool,
    pub distance_factor_idx: u8,
    pub zone_constraints_idx: u8,
    pub enable_elevation: bool,
    pub object_size: [f32; 3],
    pub use_screen_ref: bool,
    pub screen_factor: f32,
    pub depth_factor: f32,
    pub snap: bool,
}

impl Default for ObjectRenderInfo {
    fn default() -> Self {
        Self {
            differential_position: false,
            pos3d: [0.5, 0.5, 0.0],
            distance_specified: false,
            at_infinity: false,
            distance_factor_idx: 0,
            zone_constraints_idx: 0,
            enable_elevation: true,
            object_size: [0.0; 3],
            use_screen_ref: false,
            screen_factor: 0.0,
            depth_factor: 0.25,
            snap: false,
        }
    }
}

impl ObjectRenderInfo {
    /// Position in listener cube space (x right, y up, z front).
    pub fn cube_position(&self) -> Vec3 {
        let [x, y, z] = self.pos3d;

        Vec3::new(
            (x.clamp(0.0, 1.0) - 0.5) * 2.0,
            z.clamp(-1.0, 1.0),
            (0.5 - y.clamp(0.0, 1.0)) * 2.0,
        )
    }

    /// Largest of the per-axis sizes.
    pub fn size(&self) -> f32 {
        self.object_size.into_iter().fold(0.0, f32::max)
    }

    fn read(prev: &Self, reader: &mut BitCursor, status: u8, block_index: usize) -> Result<Self> {
        let mut render = prev.clone();
        let info_bits = if status == 1 { 15 } else { reader.get_n::<u8>(4)? };

        if info_bits & 1 != 0 {
            render.differential_position = block_index != 0 && reader.get()?;

            render.pos3d = if render.differential_position {
                let [x, y, z] = prev.pos3d;
                [
                    x + reader.get_s(3)? as f32 / 62.0,
                    y + reader.get_s(3)? as f32 / 62.0,
                    z + reader.get_s(3)? as f32 / 15.0,
                ]
            } else {
                let x = reader.get_n::<u8>(6)? as f32 / 62.0;
                let y = reader.get_n::<u8>(6)? as f32 / 62.0;
                let sign = if reader.get()? { 1.0 } else { -1.0 };
                let z = reader.get_n::<u8>(4)? as f32 / 15.0 * sign;

                [x, y, z]
            };

            render.distance_specified = reader.get()?;
            if render.distance_specified {
                render.at_infinity = reader.get()?;
                if !render.at_infinity {
                    render.distance_factor_idx = reader.get_n(4)?;
                }
            }
        }

        if info_bits & 2 != 0 {
            render.zone_constraints_idx = reader.get_n(3)?;
            render.enable_elevation = reader.get()?;
        }

        if info_bits & 4 != 0 {
            render.object_size = match reader.get_n::<u8>(2)? {
                1 => [reader.get_n::<u8>(5)? as f32 / 31.0; 3],
                2 => [
                    reader.get_n::<u8>(5)? as f32 / 31.0,
                    reader.get_n::<u8>(5)? as f32 / 31.0,
                    reader.get_n::<u8>(5)? as f32 / 31.0,
                ],
                _ => [0.0; 3],
            };
        }

        if info_bits & 8 != 0 {
            render.use_screen_ref = reader.get()?;
            if render.use_screen_ref {
                render.screen_factor = (reader.get_n::<u8>(3)? + 1) as f32 / 8.0;
                render.depth_factor = 0.25 * (reader.get_n::<u8>(2)? + 1) as f32;
            } else {
                render.screen_factor = 0.0;
            }
        }

        render.snap = reader.get()?;

        Ok(render)
    }
}

/// Accumulates keyframes from successive OAMD payloads of one stream.
///
/// Polling drops keyframes playback has passed, keeping the one being faded
/// into and the one it starts from, so memory stays bounded on long streams.
/// Seeking back before the oldest kept keyframe holds that keyframe.
#[derive(Debug, Default)]
pub struct OamdTimeline {
    object_count: usize,
    lfe_index: Option<usize>,
    timeframes: Vec<Vec<MovementTimeframe>>,
}

impl OamdTimeline {
    /// Parses a payload and appends its keyframes.
    ///
    /// The object layout of the first payload is kept; later payloads with a
    /// different object count are ignored with a warning.
    pub fn push(&mut self, payload: &[u8], sample_pos: u64) -> Result<()> {
        let oamd = ObjectAudioMetadata::read(payload)?;

        if self.timeframes.is_empty() {
            self.object_count = oamd.object_count;
            self.lfe_index = oamd.lfe_index();
            self.timeframes = vec![Vec::new(); oamd.object_count];
        } else if oamd.object_count != self.object_count {
            warn!(
                "OAMD object count changed from {} to {}, payload ignored",
                self.object_count, oamd.object_count
            );
            return Ok(());
        }

        for (frames, new) in self.timeframes.iter_mut().zip(oamd.timeframes(sample_pos)) {
            // Keyframes stay ordered by offset.
            let last = frames.last().map_or(0, |frame: &MovementTimeframe| frame.offset);
            frames.extend(new.into_iter().filter(|frame| frame.offset >= last));
        }

        Ok(())
    }
}

impl ObjectMetadata for OamdTimeline {
    fn object_count(&self) -> usize {
        self.object_count
    }

    fn lfe_index(&self) -> Option<usize> {
        self.lfe_index
    }

    fn timeframes(&self, object: usize) -> &[MovementTimeframe] {
        self.timeframes.get(object).map(Vec::as_slice).unwrap_or_default()
    }

    fn poll(&mut self, position: u64) -> Result<()> {
        for frames in &mut self.timeframes {
            let reached = frames.partition_point(|frame| frame.start() <= position);
            let stale = reached.saturating_sub(2);
            if stale > 0 {
                frames.drain(..stale);
            }
        }

        Ok(())
    }
}

/// Payload with one dynamic object and one 512 sample ramp, 80 samples
/// into the frame.
///
/// `gain_code` is the 2-bit gain field (0 is 0 dB, 1 is muted), `x` the
/// 6-bit left to right coordinate and `size` the 5-bit uniform size. The
/// object sits at the front wall and at the top of the room.
#[cfg(test)]
pub(crate) fn single_object_payload(gain_code: u32, x: u32, size: u32) -> Result<Vec<u8>> {
    use crate::utils::bitstream_io::BitCursorWriter;

    let mut w = BitCursorWriter::default();
    w.put(0, 2)?; // version
    w.put(0, 5)?; // one object
    w.put_bit(true)?; // dynamic only
    w.put_bit(false)?; // no LFE
    w.put_bit(false)?; // no alternate object data
    w.put(1, 4)?; // one element

    w.put(OBJECT_ELEMENT_ID as u32, 4)?;
    w.put(6, 4)?; // 7 bytes
    w.put_bit(false)?;
    let start = w.position();

    w.put_bit(false)?; // discard unknown
    w.put(1, 2)?; // sample offset index
    w.put(1, 2)?; // 16 samples
    w.put(0, 3)?; // one block
    w.put(2, 6)?; // block offset factor
    w.put(1, 2)?; // 512 sample ramp
    w.put_bit(true)?; // no reserved data

    w.put_bit(false)?; // active
    w.put(gain_code, 2)?;
    w.put_bit(true)?; // default priority
    w.put(x, 6)?;
    w.put(0, 6)?; // y
    w.put_bit(true)?; // z sign
    w.put(15, 4)?; // z
    w.put_bit(false)?; // no distance
    w.put(0, 3)?; // zones
    w.put_bit(true)?; // elevation
    w.put(1, 2)?; // uniform size
    w.put(size, 5)?;
    w.put_bit(false)?; // no screen reference
    w.put_bit(false)?; // no snap
    w.put_bit(false)?; // no additional table data

    while w.position() - start < 56 {
        w.put_bit(false)?;
    }

    Ok(w.finish()?)
}

pub const TEST_DATA: &[u8] = &[
    0x1F, 0x88, 0x4B, 0x80, 0x00, 0xA2, 0x70, 0x00, 0x80, 0x40, 0xE0, 0x01, 0x00, 0x81, 0xC0, 0x02,
    0x01, 0x03, 0x80, 0x04, 0x02, 0x07, 0x00, 0x08, 0x04, 0x0E, 0x00, 0x10, 0x08, 0x1C, 0x00, 0x20,
    0x10, 0x38, 0x00, 0x40, 0x20, 0x70, 0x00, 0x80, 0x40, 0xE0, 0x01, 0x00, 0x81, 0xC0, 0x02, 0x01,
    0x03, 0x80, 0x04, 0x02, 0x07, 0x00, 0x08, 0x04, 0x0E, 0x00, 0x10, 0x08, 0x1C, 0x00, 0x20, 0x10,
    0x02, 0x40, 0x24, 0x33, 0x33, 0xF8, 0x00,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::movement::MovementInterpolator;

    #[test]
    fn dynamic_program_with_lfe() -> Result<()> {
        let oamd = ObjectAudioMetadata::read(TEST_DATA)?;

        assert_eq!(oamd.object_count, 16);
        assert!(oamd.program.dynamic_only);
        assert_eq!(oamd.program.num_bed_objects, 1);
        assert_eq!(oamd.program.num_dynamic_objects, 15);
        assert_eq!(oamd.lfe_index(), Some(0));
        assert_eq!(oamd.elements[0].id, OBJECT_ELEMENT_ID);

        let element = oamd.object_element.as_ref().expect("object element");
        assert_eq!(element.object_data.len(), 16);

        let timeframes = oamd.timeframes(0);
        assert_eq!(timeframes.len(), 16);
        for frame in timeframes.iter().flatten() {
            let p = frame.position;
            assert!(p.x.abs() <= 1.0 && p.y.abs() <= 1.0 && p.z.abs() <= 1.0);
        }

        Ok(())
    }

    #[test]
    fn unsupported_version() {
        let err = ObjectAudioMetadata::read(&[0x40, 0x00, 0x00]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OamdError>(),
            Some(OamdError::UnsupportedVersion(1))
        ));
    }

    #[test]
    fn object_element_keyframes() -> Result<()> {
        let oamd = ObjectAudioMetadata::read(&single_object_payload(0, 62, 31)?)?;

        assert_eq!(oamd.object_count, 1);
        assert_eq!(oamd.lfe_index(), None);

        let element = oamd.object_element.as_ref().expect("object element");
        let block = &element.object_data[0][0];
        assert_eq!(block.object_basic_info.object_gain, 0);
        assert_eq!(block.object_basic_info.object_priority, 1.0);
        assert_eq!(block.object_render_info.object_size, [1.0; 3]);

        let timeframes = oamd.timeframes(1000);
        assert_eq!(
            timeframes[0],
            vec![MovementTimeframe {
                offset: 1000 + 16 + 2 * BLOCK_OFFSET_UNIT,
                fade: 512,
                position: Vec3::new(1.0, 1.0, 1.0),
                gain: 1.0,
                size: 1.0,
            }]
        );

        Ok(())
    }

    #[test]
    fn timeline_accumulates_payloads() -> Result<()> {
        let payload = single_object_payload(0, 62, 31)?;
        let mut timeline = OamdTimeline::default();

        timeline.push(&payload, 0)?;
        timeline.push(&payload, 1536)?;
        timeline.push(TEST_DATA, 3072)?;

        assert_eq!(timeline.object_count(), 1);
        let offsets = timeline
            .timeframes(0)
            .iter()
            .map(|frame| frame.offset)
            .collect::<Vec<_>>();
        assert_eq!(offsets, vec![80, 1536 + 80]);
        assert!(timeline.timeframes(3).is_empty());

        Ok(())
    }

    #[test]
    fn muted_object_keyframes() -> Result<()> {
        let oamd = ObjectAudioMetadata::read(&single_object_payload(1, 31, 0)?)?;

        let frame = oamd.timeframes(0)[0][0];
        assert_eq!(frame.gain, 0.0);
        assert_eq!(frame.size, 0.0);
        assert_eq!(frame.position, Vec3::new(0.0, 1.0, 1.0));

        Ok(())
    }

    #[test]
    fn polling_keeps_timeline_bounded() -> Result<()> {
        let left = single_object_payload(0, 0, 0)?;
        let right = single_object_payload(0, 62, 0)?;
        let mut timeline = OamdTimeline::default();
        let mut interpolator = MovementInterpolator::default();

        for n in 0..1000u64 {
            let frame_start = n * 1536;
            let payload = if n % 2 == 0 { &left } else { &right };
            timeline.push(payload, frame_start)?;
            timeline.poll(frame_start)?;
            assert!(timeline.timeframes(0).len() <= 2);

            if n > 0 {
                // Halfway through the ramp towards this frame's keyframe
                let at = frame_start + 80 - 256;
                let state = interpolator.state(timeline.timeframes(0), at);
                assert_eq!(state.map(|s| s.position), Some(Vec3::new(0.0, 1.0, 1.0)));
            }
        }

        timeline.poll(1000 * 1536)?;
        let offsets = timeline
            .timeframes(0)
            .iter()
            .map(|frame| frame.offset)
            .collect::<Vec<_>>();
        assert_eq!(offsets, vec![998 * 1536 + 80, 999 * 1536 + 80]);

        Ok(())
    }
}
