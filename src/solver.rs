//! Mode solver (§4.C): per-FIFO enumeration, two-FIFO merge, and selection.

use heapless::Vec;

use crate::catalog::Catalog;
use crate::error::{Error, InvalidReason};
use crate::types::{ChosenMode, HardwareProfile, IoParams, ModeCandidate};

/// Upper bound on feasible modes kept per search, matching the original
/// driver's `DMIC_MAX_MODES`. `clkdiv` alone ranges up to 256, so this is
/// a generous cap, not a tight one.
pub const MAX_MODES: usize = 50;

type ModeList = Vec<ModeCandidate, MAX_MODES>;

/// Enumerates every feasible `(clkdiv, mcic, mfir)` triple for one FIFO
/// targeting output rate `fs` (§4.C.1). Returns an empty list if `fs == 0`
/// (FIFO disabled) or if `io` itself is out of range.
///
/// # Errors
/// Returns [`Error::Invalid`] if the clock or duty-cycle bounds in `io` are
/// themselves malformed (inverted or outside the hardware's absolute
/// range) — this is checked even when `fs == 0`, matching the original
/// driver validating `io` before looking at the per-FIFO rate.
pub fn find_modes(hw: &HardwareProfile, io: &IoParams, fs: u32) -> Result<ModeList, Error> {
    let mut out = ModeList::new();

    if io.max_pdm_clk_freq < hw.pdm_clk_hz_min || io.max_pdm_clk_freq > hw.ioclk_hz / 2 {
        return Err(Error::Invalid(InvalidReason::ClockOutOfRange));
    }
    if io.min_pdm_clk_freq < hw.pdm_clk_hz_min || io.min_pdm_clk_freq > io.max_pdm_clk_freq {
        return Err(Error::Invalid(InvalidReason::ClockOutOfRange));
    }
    if io.min_pdm_clk_dc > io.max_pdm_clk_dc {
        return Err(Error::Invalid(InvalidReason::DutyOutOfRange));
    }
    if io.min_pdm_clk_dc < hw.duty_min || io.min_pdm_clk_dc > hw.duty_max {
        return Err(Error::Invalid(InvalidReason::DutyOutOfRange));
    }
    if io.max_pdm_clk_dc < hw.duty_min || io.max_pdm_clk_dc > hw.duty_max {
        return Err(Error::Invalid(InvalidReason::DutyOutOfRange));
    }

    if fs == 0 {
        return Ok(out);
    }

    let osr_min = hw.osr_min_for(fs);

    let clkdiv_min = {
        let raw = (hw.ioclk_hz + io.max_pdm_clk_freq - 1) / io.max_pdm_clk_freq;
        raw.max(u32::from(hw.cic_decim_min))
    };
    let clkdiv_max = hw.ioclk_hz / io.min_pdm_clk_freq;

    for clkdiv in clkdiv_min..=clkdiv_max {
        let c1 = clkdiv >> 1;
        let du_min = 100 * c1 / clkdiv;
        let du_max = 100 - du_min;
        if du_min < u32::from(io.min_pdm_clk_dc) || du_max > u32::from(io.max_pdm_clk_dc) {
            continue;
        }

        let pdmclk = hw.ioclk_hz / clkdiv;
        let osr = pdmclk / fs;
        if osr < osr_min {
            continue;
        }

        for mfir in hw.fir_decim_min..=hw.fir_decim_max {
            let mfir_u = u32::from(mfir);
            if mfir_u == 0 {
                continue;
            }
            let mcic = osr / mfir_u;
            if mcic == 0 {
                continue;
            }
            let ioclk_test = fs.saturating_mul(mfir_u).saturating_mul(mcic).saturating_mul(clkdiv);
            if ioclk_test == hw.ioclk_hz
                && mcic >= u32::from(hw.cic_decim_min)
                && mcic <= u32::from(hw.cic_decim_max)
            {
                let candidate = ModeCandidate {
                    clkdiv: clkdiv as u16,
                    mcic: mcic as u8,
                    mfir_a: mfir,
                    mfir_b: 0,
                };
                // A full mode list is not a hard error: the original
                // driver simply stops recording further candidates once
                // its fixed-size arrays are full, and later stages only
                // ever need the best one.
                let _ = out.push(candidate);
                if out.is_full() {
                    return Ok(out);
                }
            }
        }
    }

    Ok(out)
}

/// Merges per-FIFO candidate lists `a` (FIFO A) and `b` (FIFO B) into
/// compatible `(clkdiv, mcic, mfir_a, mfir_b)` tuples (§4.C.2).
///
/// If only one FIFO was requested (the other's list is empty), the
/// non-empty list passes through with the unused FIR decimation marked
/// `0`. If both are non-empty, only tuples sharing `clkdiv` and `mcic`
/// survive.
#[must_use]
pub fn match_modes(a: &ModeList, b: &ModeList) -> ModeList {
    let mut out = ModeList::new();

    if b.is_empty() {
        for cand in a {
            let _ = out.push(*cand);
        }
        return out;
    }
    if a.is_empty() {
        for cand in b {
            let _ = out.push(ModeCandidate { clkdiv: cand.clkdiv, mcic: cand.mcic, mfir_a: 0, mfir_b: cand.mfir_a });
        }
        return out;
    }

    for ca in a {
        for cb in b {
            if ca.clkdiv == cb.clkdiv && ca.mcic == cb.mcic {
                let _ = out.push(ModeCandidate {
                    clkdiv: ca.clkdiv,
                    mcic: ca.mcic,
                    mfir_a: ca.mfir_a,
                    mfir_b: cb.mfir_a,
                });
                if out.is_full() {
                    return out;
                }
            }
        }
    }
    out
}

/// Picks one candidate from `modes` per §4.C.3: smallest `mfir` (the FIR
/// that is actually present — FIR A if used, else FIR B); ties broken by
/// largest `clkdiv`; remaining ties broken by "last in the merged list".
///
/// # Errors
/// [`Error::Invalid(InvalidReason::NoModes)`] if `modes` is empty.
pub fn select_candidate(modes: &ModeList) -> Result<ModeCandidate, Error> {
    if modes.is_empty() {
        return Err(Error::Invalid(InvalidReason::NoModes));
    }

    let uses_a = modes[0].mfir_a > 0;
    let mfir_of = |c: &ModeCandidate| if uses_a { c.mfir_a } else { c.mfir_b };

    let mmin = modes.iter().map(mfir_of).min().unwrap();

    // Among candidates at the minimum mfir, pick the largest clkdiv; among
    // those, the last one in list order (>= keeps updating through ties).
    let mut best: Option<ModeCandidate> = None;
    for cand in modes {
        if mfir_of(cand) != mmin {
            continue;
        }
        match &best {
            None => best = Some(*cand),
            Some(b) if cand.clkdiv >= b.clkdiv => best = Some(*cand),
            _ => {}
        }
    }
    Ok(best.unwrap())
}

/// Full selection including FIR catalog lookup (§4.C.3 second half):
/// resolves prototype pointers for whichever of FIR A/B is in use.
///
/// # Errors
/// [`Error::Invalid(InvalidReason::FirNotFound)`] if a used FIR decimation
/// factor has no catalog entry fitting the length budget.
pub fn select_mode(
    hw: &HardwareProfile,
    catalog: &Catalog<'_>,
    modes: &ModeList,
    pcm_rate_a: u32,
    pcm_rate_b: u32,
) -> Result<ChosenMode, Error> {
    let picked = select_candidate(modes)?;

    let cic_fs = hw.ioclk_hz / u32::from(picked.clkdiv) / u32::from(picked.mcic);

    let fir_a = if picked.mfir_a > 0 {
        let fs = if pcm_rate_a > 0 { pcm_rate_a } else { cic_fs / u32::from(picked.mfir_a) };
        let l_max = Catalog::max_length_for(hw.ioclk_hz, fs, hw.pipeline_overhead, hw.fir_length_max);
        Some(*catalog.find(picked.mfir_a, l_max).ok_or(Error::Invalid(InvalidReason::FirNotFound))?)
    } else {
        None
    };

    let fir_b = if picked.mfir_b > 0 {
        let fs = if pcm_rate_b > 0 { pcm_rate_b } else { cic_fs / u32::from(picked.mfir_b) };
        let l_max = Catalog::max_length_for(hw.ioclk_hz, fs, hw.pipeline_overhead, hw.fir_length_max);
        Some(*catalog.find(picked.mfir_b, l_max).ok_or(Error::Invalid(InvalidReason::FirNotFound))?)
    } else {
        None
    };

    Ok(ChosenMode {
        clkdiv: picked.clkdiv,
        mcic: picked.mcic,
        mfir_a: picked.mfir_a,
        mfir_b: picked.mfir_b,
        fir_a_length: fir_a.map_or(0, |f| f.length),
        fir_b_length: fir_b.map_or(0, |f| f.length),
        fir_a,
        fir_b,
        cic_shift: 0,
        fir_a_scale: 0,
        fir_a_shift: 0,
        fir_b_scale: 0,
        fir_b_shift: 0,
    })
}
