//! Data-memory layout shared by the CPU and the march kernels.

use crate::fixed::{Fixed, FixedVec3};
use std::mem::{offset_of, size_of};

/// Size of the co-processor data memory in 32-bit words.
pub const DMEM_WORDS: usize = 1024;

/// The job record, placed at word 0 of data memory.
///
/// Inputs are `origin`, both `ray_dir_*`, `blend_weights` and `init_dist`;
/// everything else is written by the kernels.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct JobRecord {
    pub origin: FixedVec3,

    pub ray_dir_a: FixedVec3,
    pub hit_pos_a: FixedVec3,
    pub last_dist_a: Fixed,
    pub total_dist_a: Fixed,

    pub ray_dir_b: FixedVec3,
    pub hit_pos_b: FixedVec3,
    pub last_dist_b: Fixed,
    pub total_dist_b: Fixed,

    /// `(lerp_b << 16) | lerp_a`, see [`pack_blend_weights`].
    pub blend_weights: u32,
    pub init_dist: Fixed,
}

pub const JOB_RECORD_WORDS: usize = size_of::<JobRecord>() / 4;

const fn word(byte_offset: usize) -> usize {
    byte_offset / 4
}

pub const ORIGIN: usize = word(offset_of!(JobRecord, origin));
pub const RAY_DIR_A: usize = word(offset_of!(JobRecord, ray_dir_a));
pub const HIT_POS_A: usize = word(offset_of!(JobRecord, hit_pos_a));
pub const LAST_DIST_A: usize = word(offset_of!(JobRecord, last_dist_a));
pub const TOTAL_DIST_A: usize = word(offset_of!(JobRecord, total_dist_a));
pub const RAY_DIR_B: usize = word(offset_of!(JobRecord, ray_dir_b));
pub const HIT_POS_B: usize = word(offset_of!(JobRecord, hit_pos_b));
pub const LAST_DIST_B: usize = word(offset_of!(JobRecord, last_dist_b));
pub const TOTAL_DIST_B: usize = word(offset_of!(JobRecord, total_dist_b));
pub const BLEND_WEIGHTS: usize = word(offset_of!(JobRecord, blend_weights));
pub const INIT_DIST: usize = word(offset_of!(JobRecord, init_dist));

const _: () = assert!(ORIGIN == 0);
const _: () = assert!(size_of::<JobRecord>() % 4 == 0);
const _: () = assert!(JOB_RECORD_WORDS == 21);
const _: () = assert!(JOB_RECORD_WORDS <= DMEM_WORDS);

/// Returns `true` for words the CPU writes as kernel inputs.
#[must_use]
pub const fn is_input_word(index: usize) -> bool {
    index < ORIGIN + 3
        || (index >= RAY_DIR_A && index < RAY_DIR_A + 3)
        || (index >= RAY_DIR_B && index < RAY_DIR_B + 3)
        || index == BLEND_WEIGHTS
        || index == INIT_DIST
}

/// Splits a blend factor in `[0, 1]` into two 16-bit weights, `lerp_a` in
/// the low half and `lerp_b = 1 - lerp_a` in the high half.
#[must_use]
pub fn pack_blend_weights(blend: f32) -> u32 {
    let lerp_a = (blend * 65535.0) as u32;
    let lerp_b = ((1.0 - blend) * 65535.0) as u32;
    (lerp_b << 16) | (lerp_a & 0xFFFF)
}

/// Inverse of [`pack_blend_weights`], returning `(lerp_a, lerp_b)` as Q16.16
/// fractions.
#[must_use]
pub const fn unpack_blend_weights(packed: u32) -> (Fixed, Fixed) {
    (
        Fixed::from_raw((packed & 0xFFFF) as i32),
        Fixed::from_raw((packed >> 16) as i32),
    )
}
