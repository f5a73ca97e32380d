//! Data model (§3): requests, hardware constants, solver/gain outputs, and
//! the post-configure activation map.

use crate::catalog::Prototype;

/// Hardware constants that bound the search space and the fixed-point
/// pipeline. See `SPEC_FULL.md` §3 for where the `DEFAULT` values come
/// from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HardwareProfile {
    pub ioclk_hz: u32,
    pub cic_decim_min: u8,
    pub cic_decim_max: u8,
    pub fir_decim_min: u8,
    pub fir_decim_max: u8,
    pub fir_length_max: u16,
    pub cic_shift_min: i8,
    pub cic_shift_max: i8,
    pub fir_shift_min: i8,
    pub fir_shift_max: i8,
    pub fir_coef_bits: u8,
    pub fir_input_bits: u8,
    pub sensitivity_q28: i32,
    pub osr_min_normal: u16,
    pub osr_min_high_rate: u16,
    pub high_rate_threshold_hz: u32,
    pub pdm_clk_hz_min: u32,
    pub duty_min: u8,
    pub duty_max: u8,
    pub pipeline_overhead: u16,
    pub coef_ram_words: u16,
    pub num_controllers: u8,
    pub num_fifos: u8,
}

impl HardwareProfile {
    /// Constants used throughout `spec.md` §8's concrete end-to-end
    /// scenarios.
    pub const DEFAULT: Self = Self {
        ioclk_hz: 38_400_000,
        cic_decim_min: 5,
        cic_decim_max: 31,
        fir_decim_min: 2,
        fir_decim_max: 20,
        fir_length_max: 250,
        cic_shift_min: -8,
        cic_shift_max: 4,
        fir_shift_min: 0,
        fir_shift_max: 8,
        fir_coef_bits: 20,
        fir_input_bits: 22,
        sensitivity_q28: 1 << 28,
        osr_min_normal: 50,
        osr_min_high_rate: 40,
        high_rate_threshold_hz: 64_000,
        pdm_clk_hz_min: 100_000,
        duty_min: 20,
        duty_max: 80,
        pipeline_overhead: 5,
        coef_ram_words: 1024,
        num_controllers: 4,
        num_fifos: 2,
    };

    /// Minimum OSR to require for a requested output rate `fs` (§4.C.1,
    /// "High-rate OSR relaxation", S5).
    #[must_use]
    pub fn osr_min_for(&self, fs: u32) -> u32 {
        if fs >= self.high_rate_threshold_hz {
            u32::from(self.osr_min_high_rate)
        } else {
            u32::from(self.osr_min_normal)
        }
    }
}

/// Mic-clock and electrical-interface constraints (§3 `io`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IoParams {
    pub min_pdm_clk_freq: u32,
    pub max_pdm_clk_freq: u32,
    pub min_pdm_clk_dc: u8,
    pub max_pdm_clk_dc: u8,
    /// Per-controller data-line polarity, bit `c` for controller `c`.
    pub pdm_data_pol: u8,
    /// Per-controller clock-edge polarity, bit `c` for controller `c`.
    pub pdm_clk_pol: u8,
    /// Four packed 4-bit skew nibbles, one per controller.
    pub pdm_clk_skew: u32,
}

impl IoParams {
    /// Extracts controller `c`'s 4-bit skew nibble from the packed field.
    #[must_use]
    pub fn skew_for(&self, controller: u8) -> u8 {
        ((self.pdm_clk_skew >> (u32::from(controller & 0x7) * 4)) & 0xF) as u8
    }
}

/// Left/right designation for a logical channel, as decoded from the
/// packed channel map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lr {
    Left,
    Right,
}

/// One output stream's PCM parameters (§3, "For each stream").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamCfg {
    /// Output sample rate in Hz. `0` means this FIFO is unused.
    pub pcm_rate: u32,
    pub pcm_width: u8,
    pub dma_block_size: u32,
    /// Opaque handle to the caller-owned memory slab for this stream.
    pub mem_slab: u32,
}

/// A full configuration request (§3 `Request`).
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Request {
    pub io: IoParams,
    pub channel_map_lo: u32,
    pub channel_map_hi: u32,
    pub req_num_channels: u8,
    pub req_num_streams: u8,
    pub streams: [StreamCfg; 2],
}

impl Request {
    /// Decodes logical channel `idx` (0-based, `< req_num_channels`) from
    /// the packed `channel_map_lo`/`channel_map_hi` fields: 4 bits per
    /// logical channel, low-to-high across `lo` (channels 0..8) then `hi`
    /// (channels 8..16). Within a nibble, bits `[1:0]` are the controller
    /// index (0..=3, `NUM_CONTROLLERS`) and bit `2` is the L/R flag; bit 3
    /// is reserved/zero.
    #[must_use]
    pub fn channel(&self, idx: u8) -> (u8, Lr) {
        let nibble = if idx < 8 {
            (self.channel_map_lo >> (u32::from(idx) * 4)) & 0xF
        } else {
            (self.channel_map_hi >> (u32::from(idx - 8) * 4)) & 0xF
        };
        let controller = (nibble & 0x3) as u8;
        let lr = if (nibble >> 2) & 1 == 0 { Lr::Left } else { Lr::Right };
        (controller, lr)
    }
}

/// One feasible `(clkdiv, mcic, mfir)` triple for a single FIFO, or the
/// merged `(clkdiv, mcic, mfir_a, mfir_b)` form once two FIFOs are
/// requested (§3 `ModeCandidate`, §4.C.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeCandidate {
    pub clkdiv: u16,
    pub mcic: u8,
    /// `0` means FIR A is unused.
    pub mfir_a: u8,
    /// `0` means FIR B is unused.
    pub mfir_b: u8,
}

/// The selected mode plus the refined gain-planner outputs (§3
/// `ChosenMode`).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChosenMode {
    pub clkdiv: u16,
    pub mcic: u8,
    pub mfir_a: u8,
    pub mfir_b: u8,
    pub fir_a: Option<Prototype>,
    pub fir_b: Option<Prototype>,
    pub cic_shift: i32,
    pub fir_a_scale: i32,
    pub fir_a_shift: i32,
    pub fir_a_length: u16,
    pub fir_b_scale: i32,
    pub fir_b_shift: i32,
    pub fir_b_length: u16,
}

/// Decoded activation map for register programming and the start sequence
/// (§3 `ActivationMap`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActivationMap {
    pub controller_mask: u8,
    pub stereo_mask: u8,
    pub channel_swap_mask: u8,
    /// Two bits per controller: bit `2c` is left, `2c+1` is right.
    pub mic_enable_mask: u16,
    pub fifo_a_used: bool,
    pub fifo_b_used: bool,
    /// Four 3-bit controller indices packed at nibble boundaries, one per
    /// IPM slot (1..=4), in first-occurrence order.
    pub ipm_source: u32,
    /// Count of active controllers (the IPM "number of decimators" field).
    pub active_controllers: u8,
}
