//! # Q16.16 Fixed-Point Bridge
//!
//! Every value that crosses the job channel is a signed 32-bit integer with
//! 16 fractional bits. The multiply here is the same widen, multiply and
//! arithmetic shift the co-processor performs, so positions computed on
//! either side of the channel agree bit-for-bit.

use std::ops::{Add, AddAssign, Mul, Neg, Shr, Sub, SubAssign};

/// Number of fractional bits.
pub const FRAC_BITS: u32 = 16;

const SCALE: f32 = (1u32 << FRAC_BITS) as f32;
const INV_SCALE: f32 = 1.0 / SCALE;
const FRAC_MASK: i32 = (1 << FRAC_BITS) - 1;

/// Signed Q16.16 scalar.
#[repr(transparent)]
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, bytemuck::Pod, bytemuck::Zeroable,
)]
pub struct Fixed(i32);

impl Fixed {
    pub const ZERO: Self = Self(0);
    pub const HALF: Self = Self(1 << (FRAC_BITS - 1));
    pub const ONE: Self = Self(1 << FRAC_BITS);
    /// Smallest positive step, 1/65536.
    pub const EPSILON: Self = Self(1);

    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Truncating conversion. Values outside roughly ±32768 are not
    /// representable and saturate.
    #[must_use]
    pub fn from_f32(value: f32) -> Self {
        Self((value * SCALE) as i32)
    }

    #[must_use]
    pub fn to_f32(self) -> f32 {
        self.0 as f32 * INV_SCALE
    }

    /// Rounds towards negative infinity by dropping the fractional bits.
    #[must_use]
    pub const fn floor(self) -> Self {
        Self(self.0 & !FRAC_MASK)
    }

    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.wrapping_abs())
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl From<f32> for Fixed {
    fn from(value: f32) -> Self {
        Self::from_f32(value)
    }
}

impl From<Fixed> for f32 {
    fn from(value: Fixed) -> Self {
        value.to_f32()
    }
}

impl Add for Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl Mul for Fixed {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let wide = i64::from(self.0) * i64::from(rhs.0);
        Self((wide >> FRAC_BITS) as i32)
    }
}

impl Neg for Fixed {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

impl Shr<u32> for Fixed {
    type Output = Self;

    fn shr(self, bits: u32) -> Self {
        Self(self.0 >> bits)
    }
}

impl AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fixed {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

/// Three Q16.16 components, laid out exactly as three data-memory words.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FixedVec3 {
    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
}

impl FixedVec3 {
    pub const ZERO: Self = Self::new(Fixed::ZERO, Fixed::ZERO, Fixed::ZERO);

    #[must_use]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn from_f32s(v: [f32; 3]) -> Self {
        Self::new(Fixed::from_f32(v[0]), Fixed::from_f32(v[1]), Fixed::from_f32(v[2]))
    }

    #[must_use]
    pub fn to_f32s(self) -> [f32; 3] {
        [self.x.to_f32(), self.y.to_f32(), self.z.to_f32()]
    }

    #[must_use]
    pub const fn floor(self) -> Self {
        Self::new(self.x.floor(), self.y.floor(), self.z.floor())
    }

    #[must_use]
    pub fn dot(self, rhs: Self) -> Fixed {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[must_use]
    pub const fn to_raw(self) -> [i32; 3] {
        [self.x.raw(), self.y.raw(), self.z.raw()]
    }
}

impl Add for FixedVec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for FixedVec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<Fixed> for FixedVec3 {
    type Output = Self;

    fn mul(self, s: Fixed) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl AddAssign for FixedVec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for FixedVec3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}
