//! Register access and programming (§4.E, §6, §9).
//!
//! Offsets and bit positions below are taken directly from the hardware
//! this spec is grounded on: a global `OUTCONTROL0/1` pair plus four
//! `0x1000`-spaced per-controller blocks, each holding `CIC_CONTROL`,
//! `CIC_CONFIG`, `MIC_CONTROL`, two independent FIR datapaths (A/B), and
//! two `0x400`-word coefficient RAM windows.

use crate::types::{ActivationMap, ChosenMode, HardwareProfile, IoParams};

const OUTCONTROL0: u32 = 0x0000;
const OUTCONTROL1: u32 = 0x0100;

fn pdm_base(controller: u8) -> u32 {
    (u32::from(controller) + 1) << 12
}
fn cic_control(c: u8) -> u32 {
    pdm_base(c)
}
fn cic_config(c: u8) -> u32 {
    pdm_base(c) + 0x004
}
fn mic_control(c: u8) -> u32 {
    pdm_base(c) + 0x00c
}
fn fir_control_a(c: u8) -> u32 {
    pdm_base(c) + 0x020
}
fn fir_config_a(c: u8) -> u32 {
    pdm_base(c) + 0x024
}
fn dc_offset_left_a(c: u8) -> u32 {
    pdm_base(c) + 0x028
}
fn dc_offset_right_a(c: u8) -> u32 {
    pdm_base(c) + 0x02c
}
fn out_gain_left_a(c: u8) -> u32 {
    pdm_base(c) + 0x030
}
fn out_gain_right_a(c: u8) -> u32 {
    pdm_base(c) + 0x034
}
fn fir_control_b(c: u8) -> u32 {
    pdm_base(c) + 0x040
}
fn fir_config_b(c: u8) -> u32 {
    pdm_base(c) + 0x044
}
fn dc_offset_left_b(c: u8) -> u32 {
    pdm_base(c) + 0x048
}
fn dc_offset_right_b(c: u8) -> u32 {
    pdm_base(c) + 0x04c
}
fn out_gain_left_b(c: u8) -> u32 {
    pdm_base(c) + 0x050
}
fn out_gain_right_b(c: u8) -> u32 {
    pdm_base(c) + 0x054
}
fn coeff_a(c: u8) -> u32 {
    pdm_base(c) + 0x400
}
fn coeff_b(c: u8) -> u32 {
    pdm_base(c) + 0x800
}

const CIC_CONTROL_SOFT_RESET_BIT: u32 = 1 << 16;
const CIC_CONTROL_CIC_START_B_BIT: u32 = 1 << 15;
const CIC_CONTROL_CIC_START_A_BIT: u32 = 1 << 14;
const CIC_CONTROL_MIC_B_POLARITY_BIT: u32 = 1 << 3;
const CIC_CONTROL_MIC_A_POLARITY_BIT: u32 = 1 << 2;
const CIC_CONTROL_STEREO_MODE_BIT: u32 = 1 << 0;

const MIC_CONTROL_PDM_EN_B_BIT: u32 = 1 << 1;
const MIC_CONTROL_PDM_EN_A_BIT: u32 = 1 << 0;
const MIC_CONTROL_CLK_EDGE_BIT: u32 = 1 << 3;

const FIR_CONTROL_START_BIT: u32 = 1 << 7;
const FIR_CONTROL_ARRAY_START_EN_BIT: u32 = 1 << 6;
const FIR_CONTROL_DCCOMP_BIT: u32 = 1 << 4;
const FIR_CONTROL_MUTE_BIT: u32 = 1 << 1;
const FIR_CONTROL_STEREO_BIT: u32 = 1 << 0;

/// Same bit layout on both `OUTCONTROL0` and `OUTCONTROL1` (the header
/// defines one macro set per register, but the fields line up).
const OUTCONTROL_SIP_BIT: u32 = 1 << 26;
const OUTCONTROL_FINIT_BIT: u32 = 1 << 25;
const OUTCONTROL_BFTH_SHIFT: u32 = 20;
const OUTCONTROL_BFTH_MASK: u32 = 0xF << OUTCONTROL_BFTH_SHIFT;
const OUTCONTROL_OF_SHIFT: u32 = 18;
const OUTCONTROL_OF_MASK: u32 = 0b11 << OUTCONTROL_OF_SHIFT;
const OUTCONTROL_TH_MASK: u32 = 0x3F;

/// Output-format field for `OUTCONTROL.OF`: 16-bit -> 0, 24-bit -> 1,
/// 32-bit -> 2 (§4.E.2).
fn output_format_field(pcm_width: u8) -> u32 {
    match pcm_width {
        32 => 2,
        24 => 1,
        _ => 0,
    }
}

/// Raw memory-mapped (or syscall-backed) access to one DMIC peripheral
/// instance. Implementors own the base address; every offset this module
/// computes is relative to it. The higher-level sequences (`reset_all`,
/// `program_mode`, `start`, `stop`) are default methods built on top of
/// `read32`/`write32`/`modify32` so `Device` can call them directly on
/// whatever `R: RegisterAccess` it was constructed with.
///
/// # Safety
/// Implementors are responsible for `read32`/`write32` addressing valid,
/// correctly-sized peripheral registers. This crate only ever issues
/// 32-bit aligned accesses.
pub trait RegisterAccess {
    fn read32(&mut self, offset: u32) -> u32;
    fn write32(&mut self, offset: u32, value: u32);

    /// Read-modify-write `offset` under `mask`: clears every bit set in
    /// `mask`, then ORs in `value & mask`.
    fn modify32(&mut self, offset: u32, mask: u32, value: u32) {
        let current = self.read32(offset);
        self.write32(offset, (current & !mask) | (value & mask));
    }

    fn reset_all(&mut self, hw: &HardwareProfile) {
        reset_all(self, hw);
    }

    fn program_mode(
        &mut self,
        hw: &HardwareProfile,
        chosen: &ChosenMode,
        activation: &ActivationMap,
        io: &IoParams,
        pcm_width_a: u8,
        pcm_width_b: u8,
    ) {
        program_mode(self, hw, chosen, activation, io, pcm_width_a, pcm_width_b);
    }

    fn start(&mut self, hw: &HardwareProfile, activation: &ActivationMap) {
        start(self, hw, activation);
    }

    fn stop(&mut self, hw: &HardwareProfile, activation: &ActivationMap) {
        stop(self, hw, activation);
    }
}

/// `c_scaled = q_mul_shift_round(coef[j], fir_scale, 31, 28, FIR_COEF_BITS-1)` (§4.E.3).
fn coef_q_scale(raw: i32, scale: i32, fir_coef_bits: u8) -> i32 {
    use crate::fixedpoint::{q_mul_shift_round, saturate_i32};
    saturate_i32(q_mul_shift_round(i64::from(raw), i64::from(scale), 31, 28, u32::from(fir_coef_bits) - 1))
}

/// Holds every controller under SOFT_RESET and disables both output FIFOs
/// (§4.E.1).
pub fn reset_all(regs: &mut impl RegisterAccess, hw: &HardwareProfile) {
    regs.modify32(OUTCONTROL0, OUTCONTROL_FINIT_BIT, OUTCONTROL_FINIT_BIT);
    regs.modify32(OUTCONTROL1, OUTCONTROL_FINIT_BIT, OUTCONTROL_FINIT_BIT);
    for c in 0..hw.num_controllers {
        regs.modify32(cic_control(c), CIC_CONTROL_SOFT_RESET_BIT, CIC_CONTROL_SOFT_RESET_BIT);
        regs.modify32(mic_control(c), MIC_CONTROL_PDM_EN_A_BIT | MIC_CONTROL_PDM_EN_B_BIT, 0);
    }
}

const OUTCONTROL_NUMBER_OF_DECIMATORS_MASK: u32 = 0b111 << 15;
const OUTCONTROL_IPM_SOURCE_1_SHIFT: u32 = 13;
const OUTCONTROL_IPM_SOURCE_2_SHIFT: u32 = 11;
const OUTCONTROL_IPM_SOURCE_3_SHIFT: u32 = 9;
const OUTCONTROL_IPM_SOURCE_4_SHIFT: u32 = 7;
const OUTCONTROL_IPM_MASK: u32 =
    (0b11 << OUTCONTROL_IPM_SOURCE_1_SHIFT)
        | (0b11 << OUTCONTROL_IPM_SOURCE_2_SHIFT)
        | (0b11 << OUTCONTROL_IPM_SOURCE_3_SHIFT)
        | (0b11 << OUTCONTROL_IPM_SOURCE_4_SHIFT);

/// Writes every register touched by the chosen mode, gain plan, and
/// activation map (§4.E.2-3): both `OUTCONTROL0`/`OUTCONTROL1` IPM
/// source/decimator count/output-format words, each active controller's
/// `CIC_CONTROL`/`CIC_CONFIG`/`MIC_CONTROL`, `FIR_CONTROL_{A,B}`/
/// `FIR_CONFIG_{A,B}`, DC offset and output gain registers, and the
/// coefficient RAM (written in reverse tap order, matching the original
/// driver's `FIR_COEF_A`/`FIR_COEF_B` load loop which walks the
/// coefficient array from its last element so the hardware's
/// shift-register datapath sees taps in the order it convolves them).
///
/// `pcm_width_a`/`pcm_width_b` are each stream's requested sample width,
/// used only for the `OUTCONTROL.OF` field — unrelated to which FIFO a
/// controller feeds.
pub fn program_mode(
    regs: &mut impl RegisterAccess,
    hw: &HardwareProfile,
    chosen: &ChosenMode,
    activation: &ActivationMap,
    io: &IoParams,
    pcm_width_a: u8,
    pcm_width_b: u8,
) {
    let decimators = activation.active_controllers.min(4);
    let mut ipm_val = u32::from(decimators) << 15;
    ipm_val |= (activation.ipm_source & 0x3) << OUTCONTROL_IPM_SOURCE_1_SHIFT;
    ipm_val |= ((activation.ipm_source >> 4) & 0x3) << OUTCONTROL_IPM_SOURCE_2_SHIFT;
    ipm_val |= ((activation.ipm_source >> 8) & 0x3) << OUTCONTROL_IPM_SOURCE_3_SHIFT;
    ipm_val |= ((activation.ipm_source >> 12) & 0x3) << OUTCONTROL_IPM_SOURCE_4_SHIFT;

    let outctl_mask = OUTCONTROL_NUMBER_OF_DECIMATORS_MASK
        | OUTCONTROL_IPM_MASK
        | OUTCONTROL_OF_MASK
        | OUTCONTROL_BFTH_MASK
        | OUTCONTROL_TH_MASK
        | OUTCONTROL_SIP_BIT
        | OUTCONTROL_FINIT_BIT;
    let common = ipm_val | (3 << OUTCONTROL_BFTH_SHIFT) | 3 | OUTCONTROL_FINIT_BIT;

    regs.modify32(OUTCONTROL0, outctl_mask, common | (output_format_field(pcm_width_a) << OUTCONTROL_OF_SHIFT));
    regs.modify32(OUTCONTROL1, outctl_mask, common | (output_format_field(pcm_width_b) << OUTCONTROL_OF_SHIFT));

    for c in 0..hw.num_controllers {
        if activation.controller_mask & (1 << c) == 0 {
            continue;
        }

        let cic_shift_field = (chosen.cic_shift - i32::from(hw.cic_shift_min)) as u32;
        let comb_count = u32::from(chosen.mcic) - 1;
        regs.modify32(
            cic_config(c),
            (0xF << 24) | (0xFF << 8),
            (cic_shift_field << 24) | (comb_count << 8),
        );
        let data_pol = u32::from((io.pdm_data_pol >> c) & 1);
        regs.modify32(
            cic_control(c),
            CIC_CONTROL_MIC_A_POLARITY_BIT
                | CIC_CONTROL_MIC_B_POLARITY_BIT
                | CIC_CONTROL_STEREO_MODE_BIT
                | CIC_CONTROL_SOFT_RESET_BIT
                | CIC_CONTROL_CIC_START_A_BIT
                | CIC_CONTROL_CIC_START_B_BIT,
            (data_pol << 2)
                | (data_pol << 3)
                | CIC_CONTROL_SOFT_RESET_BIT
                | if activation.stereo_mask & (1 << c) != 0 { CIC_CONTROL_STEREO_MODE_BIT } else { 0 },
        );

        let clkdiv_field = u32::from(chosen.clkdiv).saturating_sub(2);
        let skew_field = u32::from(io.skew_for(c));
        let configured_edge = (io.pdm_clk_pol >> c) & 1;
        let swap_bit = (activation.channel_swap_mask >> c) & 1;
        let clk_edge = u32::from(configured_edge ^ swap_bit);
        // PDM-enable-A/B stay 0 here; they're set at start time from
        // `mic_enable_mask` (§4.E.2, §4.E.4 step 2).
        regs.modify32(
            mic_control(c),
            (0xFF << 8) | (0xF << 4) | MIC_CONTROL_CLK_EDGE_BIT | MIC_CONTROL_PDM_EN_A_BIT | MIC_CONTROL_PDM_EN_B_BIT,
            (clkdiv_field << 8) | (skew_field << 4) | (clk_edge << 3),
        );

        if let Some(fir) = chosen.fir_a {
            write_fir_datapath(regs, c, true, &fir, chosen.fir_a_shift, chosen.fir_a_scale, hw.fir_coef_bits, activation);
        }
        if let Some(fir) = chosen.fir_b {
            write_fir_datapath(regs, c, false, &fir, chosen.fir_b_shift, chosen.fir_b_scale, hw.fir_coef_bits, activation);
        }
    }
}

fn write_fir_datapath(
    regs: &mut impl RegisterAccess,
    controller: u8,
    is_a: bool,
    fir: &crate::catalog::Prototype,
    shift: i32,
    scale: i32,
    fir_coef_bits: u8,
    activation: &ActivationMap,
) {
    let (control_off, config_off, coeff_off, dc_left, dc_right, gain_left, gain_right) = if is_a {
        (
            fir_control_a(controller),
            fir_config_a(controller),
            coeff_a(controller),
            dc_offset_left_a(controller),
            dc_offset_right_a(controller),
            out_gain_left_a(controller),
            out_gain_right_a(controller),
        )
    } else {
        (
            fir_control_b(controller),
            fir_config_b(controller),
            coeff_b(controller),
            dc_offset_left_b(controller),
            dc_offset_right_b(controller),
            out_gain_left_b(controller),
            out_gain_right_b(controller),
        )
    };

    // start=0, array_start=0, mute=0 at configure time (§4.E.2); `start`
    // is set later from the trigger(Start) sequence (§4.E.4 step 2).
    let stereo = activation.stereo_mask & (1 << controller) != 0;
    regs.modify32(
        control_off,
        FIR_CONTROL_START_BIT
            | FIR_CONTROL_ARRAY_START_EN_BIT
            | FIR_CONTROL_DCCOMP_BIT
            | FIR_CONTROL_MUTE_BIT
            | FIR_CONTROL_STEREO_BIT,
        FIR_CONTROL_DCCOMP_BIT | if stereo { FIR_CONTROL_STEREO_BIT } else { 0 },
    );
    regs.modify32(
        config_off,
        (0b11111 << 16) | (0b1111 << 8) | 0xFF,
        (u32::from(fir.decim_factor.saturating_sub(1)) << 16) | ((shift as u32 & 0xF) << 8) | u32::from(fir.length.saturating_sub(1)),
    );

    // Defaults (§4.E.2): DCCOMP_TC0 and zero output gain.
    regs.write32(dc_left, 0);
    regs.write32(dc_right, 0);
    regs.write32(gain_left, 0);
    regs.write32(gain_right, 0);

    // Reverse tap order: the hardware's shift-register datapath consumes
    // coefficients oldest-sample-first, the opposite of the catalog's
    // natural storage order.
    for (i, &tap) in fir.coef.iter().rev().enumerate() {
        regs.write32(coeff_off + (i as u32) * 4, coef_q_scale(tap, scale, fir_coef_bits) as u32);
    }
}

/// Runs the trigger(Start) sequence (§4.E.4 steps 2-4): per-controller
/// `CIC_START_A/B`/`PDM_EN_A/B` from `mic_enable_mask`, FIR datapath start
/// per FIFO in use, SIP/FINIT release on each active FIFO's `OUTCONTROL`,
/// and finally soft-reset release on every controller so all active
/// controllers begin capture in the same cycle.
pub fn start(regs: &mut impl RegisterAccess, hw: &HardwareProfile, activation: &ActivationMap) {
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);

    for c in 0..hw.num_controllers {
        let mic_a = (activation.mic_enable_mask >> (u16::from(c) * 2)) & 1 != 0;
        let mic_b = (activation.mic_enable_mask >> (u16::from(c) * 2 + 1)) & 1 != 0;

        regs.modify32(
            cic_control(c),
            CIC_CONTROL_CIC_START_A_BIT | CIC_CONTROL_CIC_START_B_BIT,
            (if mic_a { CIC_CONTROL_CIC_START_A_BIT } else { 0 }) | (if mic_b { CIC_CONTROL_CIC_START_B_BIT } else { 0 }),
        );
        regs.modify32(
            mic_control(c),
            MIC_CONTROL_PDM_EN_A_BIT | MIC_CONTROL_PDM_EN_B_BIT,
            (if mic_a { MIC_CONTROL_PDM_EN_A_BIT } else { 0 }) | (if mic_b { MIC_CONTROL_PDM_EN_B_BIT } else { 0 }),
        );

        let controller_active = mic_a || mic_b;
        let fir_a_start = controller_active && activation.fifo_a_used;
        let fir_b_start = controller_active && activation.fifo_b_used;
        regs.modify32(fir_control_a(c), FIR_CONTROL_START_BIT, if fir_a_start { FIR_CONTROL_START_BIT } else { 0 });
        regs.modify32(fir_control_b(c), FIR_CONTROL_START_BIT, if fir_b_start { FIR_CONTROL_START_BIT } else { 0 });
    }

    if activation.fifo_a_used {
        regs.modify32(OUTCONTROL0, OUTCONTROL_FINIT_BIT | OUTCONTROL_SIP_BIT, OUTCONTROL_SIP_BIT);
    }
    if activation.fifo_b_used {
        regs.modify32(OUTCONTROL1, OUTCONTROL_FINIT_BIT | OUTCONTROL_SIP_BIT, OUTCONTROL_SIP_BIT);
    }

    for c in 0..hw.num_controllers {
        regs.modify32(cic_control(c), CIC_CONTROL_SOFT_RESET_BIT, 0);
    }
    core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
}

/// Runs the stop/pause sequence (§4.E.5): stops both FIFO packers and
/// asserts `OUTCONTROL.FINIT` on both unconditionally, then asserts
/// `CIC_CONTROL.SOFT_RESET` on every controller, matching the original
/// driver's `dmic_stop` (which touches both `OUTCONTROL` words and every
/// controller regardless of which was active).
pub fn stop(regs: &mut impl RegisterAccess, hw: &HardwareProfile, _activation: &ActivationMap) {
    regs.modify32(OUTCONTROL0, OUTCONTROL_SIP_BIT | OUTCONTROL_FINIT_BIT, OUTCONTROL_FINIT_BIT);
    regs.modify32(OUTCONTROL1, OUTCONTROL_SIP_BIT | OUTCONTROL_FINIT_BIT, OUTCONTROL_FINIT_BIT);
    for c in 0..hw.num_controllers {
        regs.modify32(cic_control(c), CIC_CONTROL_SOFT_RESET_BIT, CIC_CONTROL_SOFT_RESET_BIT);
    }
}

#[cfg(test)]
pub mod test_support {
    use super::RegisterAccess;
    use heapless::FnvIndexMap;

    /// In-memory register file keyed by offset, for tests asserting exact
    /// write sequences without any real hardware.
    #[derive(Default)]
    pub struct FakeRegs {
        pub mem: FnvIndexMap<u32, u32, 256>,
    }

    impl RegisterAccess for FakeRegs {
        fn read32(&mut self, offset: u32) -> u32 {
            *self.mem.get(&offset).unwrap_or(&0)
        }
        fn write32(&mut self, offset: u32, value: u32) {
            let _ = self.mem.insert(offset, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Prototype;
    use test_support::FakeRegs;

    #[test]
    fn reset_all_sets_soft_reset_and_disables_mics() {
        let hw = HardwareProfile::DEFAULT;
        let mut regs = FakeRegs::default();
        reset_all(&mut regs, &hw);
        for c in 0..hw.num_controllers {
            assert_ne!(regs.read32(cic_control(c)) & CIC_CONTROL_SOFT_RESET_BIT, 0);
            assert_eq!(regs.read32(mic_control(c)) & (MIC_CONTROL_PDM_EN_A_BIT | MIC_CONTROL_PDM_EN_B_BIT), 0);
        }
    }

    #[test]
    fn start_clears_soft_reset_and_sets_cic_start_bits() {
        let hw = HardwareProfile::DEFAULT;
        let mut regs = FakeRegs::default();
        let mut activation = ActivationMap::default();
        activation.controller_mask = 0b0001;
        activation.mic_enable_mask = 0b11; // controller 0, left and right both enabled
        activation.fifo_a_used = true;
        reset_all(&mut regs, &hw);
        start(&mut regs, &hw, &activation);
        let v = regs.read32(cic_control(0));
        assert_eq!(v & CIC_CONTROL_SOFT_RESET_BIT, 0);
        assert_ne!(v & CIC_CONTROL_CIC_START_A_BIT, 0);
        assert_ne!(v & CIC_CONTROL_CIC_START_B_BIT, 0);
        assert_ne!(regs.read32(mic_control(0)) & (MIC_CONTROL_PDM_EN_A_BIT | MIC_CONTROL_PDM_EN_B_BIT), 0);
    }

    #[test]
    fn start_releases_only_the_active_fifo() {
        let hw = HardwareProfile::DEFAULT;
        let mut regs = FakeRegs::default();
        let mut activation = ActivationMap::default();
        activation.controller_mask = 0b0001;
        activation.mic_enable_mask = 0b11;
        activation.fifo_a_used = true;
        activation.fifo_b_used = false;
        reset_all(&mut regs, &hw);
        start(&mut regs, &hw, &activation);

        let ctl0 = regs.read32(OUTCONTROL0);
        assert_ne!(ctl0 & OUTCONTROL_SIP_BIT, 0);
        assert_eq!(ctl0 & OUTCONTROL_FINIT_BIT, 0);

        // FIFO B was never requested: OUTCONTROL1 stays held in reset.
        let ctl1 = regs.read32(OUTCONTROL1);
        assert_eq!(ctl1 & OUTCONTROL_SIP_BIT, 0);
        assert_ne!(ctl1 & OUTCONTROL_FINIT_BIT, 0);
    }

    #[test]
    fn stop_resets_both_outcontrol_words_and_every_controller() {
        let hw = HardwareProfile::DEFAULT;
        let mut regs = FakeRegs::default();
        let mut activation = ActivationMap::default();
        activation.controller_mask = 0b0001;
        activation.mic_enable_mask = 0b11;
        activation.fifo_a_used = true;
        reset_all(&mut regs, &hw);
        start(&mut regs, &hw, &activation);
        stop(&mut regs, &hw, &activation);

        let ctl0 = regs.read32(OUTCONTROL0);
        assert_eq!(ctl0 & OUTCONTROL_SIP_BIT, 0);
        assert_ne!(ctl0 & OUTCONTROL_FINIT_BIT, 0);
        let ctl1 = regs.read32(OUTCONTROL1);
        assert_eq!(ctl1 & OUTCONTROL_SIP_BIT, 0);
        assert_ne!(ctl1 & OUTCONTROL_FINIT_BIT, 0);

        for c in 0..hw.num_controllers {
            assert_ne!(regs.read32(cic_control(c)) & CIC_CONTROL_SOFT_RESET_BIT, 0);
        }
    }

    #[test]
    fn program_mode_writes_both_outcontrol_words_and_leaves_fir_start_clear() {
        let hw = HardwareProfile::DEFAULT;
        let mut regs = FakeRegs::default();
        let fir = Prototype {
            decim_factor: 5,
            length: 4,
            shift: 0,
            relative_passband: 0,
            relative_stopband: 0,
            passband_ripple: 0,
            stopband_ripple: 0,
            coef: &[1, -2, 2, -1],
        };
        let chosen = ChosenMode {
            clkdiv: 12,
            mcic: 16,
            mfir_a: 5,
            mfir_b: 0,
            fir_a: Some(fir),
            fir_b: None,
            cic_shift: 0,
            fir_a_scale: 1 << 28,
            fir_a_shift: 0,
            fir_a_length: 4,
            fir_b_scale: 0,
            fir_b_shift: 0,
            fir_b_length: 0,
        };
        let mut activation = ActivationMap::default();
        activation.controller_mask = 0b0001;
        activation.active_controllers = 1;
        activation.fifo_a_used = true;
        let io = IoParams {
            min_pdm_clk_freq: 1_000_000,
            max_pdm_clk_freq: 3_250_000,
            min_pdm_clk_dc: 20,
            max_pdm_clk_dc: 80,
            pdm_data_pol: 0,
            pdm_clk_pol: 0,
            pdm_clk_skew: 0,
        };

        program_mode(&mut regs, &hw, &chosen, &activation, &io, 16, 32);

        let ctl0 = regs.read32(OUTCONTROL0);
        let ctl1 = regs.read32(OUTCONTROL1);
        assert_eq!((ctl0 & OUTCONTROL_OF_MASK) >> OUTCONTROL_OF_SHIFT, 0); // 16-bit -> 0
        assert_eq!((ctl1 & OUTCONTROL_OF_MASK) >> OUTCONTROL_OF_SHIFT, 2); // 32-bit -> 2
        assert_eq!(
            ctl0 & (OUTCONTROL_NUMBER_OF_DECIMATORS_MASK | OUTCONTROL_IPM_MASK),
            ctl1 & (OUTCONTROL_NUMBER_OF_DECIMATORS_MASK | OUTCONTROL_IPM_MASK),
        );

        assert_eq!(regs.read32(mic_control(0)) & (MIC_CONTROL_PDM_EN_A_BIT | MIC_CONTROL_PDM_EN_B_BIT), 0);
        assert_eq!(regs.read32(fir_control_a(0)) & FIR_CONTROL_START_BIT, 0);
    }

    #[test]
    fn coefficients_written_in_reverse_order() {
        let hw = HardwareProfile::DEFAULT;
        let mut regs = FakeRegs::default();
        let fir = Prototype {
            decim_factor: 5,
            length: 3,
            shift: 0,
            relative_passband: 0,
            relative_stopband: 0,
            passband_ripple: 0,
            stopband_ripple: 0,
            coef: &[11, 22, 33],
        };
        let mut activation = ActivationMap::default();
        activation.controller_mask = 0b0001;
        write_fir_datapath(&mut regs, 0, true, &fir, 0, 1 << 28, hw.fir_coef_bits, &activation);
        let first = regs.read32(coeff_a(0));
        assert_eq!(first, coef_q_scale(33, 1 << 28, hw.fir_coef_bits) as u32);
    }
}
