//! # Packed Light
//!
//! Every cell carries one `u32` of light, split into 4-bit channels:
//!
//! | bits    | channel   |
//! |---------|-----------|
//! | 0..4    | intensity |
//! | 4..8    | blue      |
//! | 8..12   | green     |
//! | 12..16  | red       |
//! | 16..20  | sunlight  |
//!
//! The value is copied verbatim into mesh vertices, so the layout is shared
//! with the shader side of whatever renderer consumes the buffers.

/// Highest value a light channel can hold.
pub const MAX_LIGHT_LEVEL: u8 = 15;

const INTENSITY_SHIFT: u32 = 0;
const BLUE_SHIFT: u32 = 4;
const GREEN_SHIFT: u32 = 8;
const RED_SHIFT: u32 = 12;
const SUN_SHIFT: u32 = 16;
const NIBBLE: u32 = 0xF;

/// Light emitted by a block kind, before it is packed into a cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EmittedLight {
    pub intensity: u8,
    pub blue: u8,
    pub green: u8,
    pub red: u8,
}

impl EmittedLight {
    pub const NONE: EmittedLight = EmittedLight::new(0, 0, 0, 0);

    pub const fn new(intensity: u8, blue: u8, green: u8, red: u8) -> Self {
        EmittedLight {
            intensity,
            blue,
            green,
            red,
        }
    }

    pub fn is_dark(&self) -> bool {
        *self == EmittedLight::NONE
    }
}

/// A cell's light, packed into a single word.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedLight(u32);

impl PackedLight {
    pub const ZERO: PackedLight = PackedLight(0);

    /// Packs five channels. Each channel must be at most [`MAX_LIGHT_LEVEL`].
    pub fn new(intensity: u8, blue: u8, green: u8, red: u8, sunlight: u8) -> Self {
        PackedLight::ZERO
            .with_channel(INTENSITY_SHIFT, intensity)
            .with_channel(BLUE_SHIFT, blue)
            .with_channel(GREEN_SHIFT, green)
            .with_channel(RED_SHIFT, red)
            .with_channel(SUN_SHIFT, sunlight)
    }

    pub fn from_raw(raw: u32) -> Self {
        PackedLight(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn intensity(self) -> u8 {
        self.channel(INTENSITY_SHIFT)
    }

    pub fn blue(self) -> u8 {
        self.channel(BLUE_SHIFT)
    }

    pub fn green(self) -> u8 {
        self.channel(GREEN_SHIFT)
    }

    pub fn red(self) -> u8 {
        self.channel(RED_SHIFT)
    }

    pub fn sunlight(self) -> u8 {
        self.channel(SUN_SHIFT)
    }

    pub fn with_sunlight(self, level: u8) -> Self {
        self.with_channel(SUN_SHIFT, level)
    }

    /// Replaces the four block-light channels, keeping sunlight.
    pub fn with_emitted(self, emitted: EmittedLight) -> Self {
        self.with_channel(INTENSITY_SHIFT, emitted.intensity)
            .with_channel(BLUE_SHIFT, emitted.blue)
            .with_channel(GREEN_SHIFT, emitted.green)
            .with_channel(RED_SHIFT, emitted.red)
    }

    fn channel(self, shift: u32) -> u8 {
        ((self.0 >> shift) & NIBBLE) as u8
    }

    fn with_channel(self, shift: u32, level: u8) -> Self {
        debug_assert!(level <= MAX_LIGHT_LEVEL, "light level {level} exceeds {MAX_LIGHT_LEVEL}");
        let level = (level as u32) & NIBBLE;
        PackedLight((self.0 & !(NIBBLE << shift)) | (level << shift))
    }
}
