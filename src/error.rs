//! Error kinds returned from the public API. See `spec.md` §7.

use core::fmt;

use crate::device::{Command, DeviceState};

/// Why a `configure()` call was rejected.
///
/// Carried alongside [`Error::Invalid`] so a caller can distinguish a
/// solver failure (bad request) from a catalog or gain-planner failure
/// (missing/ill-conditioned filter), without the crate ever applying a
/// partial configuration in either case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidReason {
    /// No `(clkdiv, mcic, mfir)` triple satisfies the requested sample
    /// rate(s) and IO constraints (§4.C.1/§4.C.2).
    NoModes,
    /// The mode solver picked a decimation factor for which the FIR
    /// catalog has no prototype within the length budget (§4.B).
    FirNotFound,
    /// `io.min_pdm_clk_freq`/`max_pdm_clk_freq` fall outside
    /// `[PDM_CLK_HZ_MIN, IOCLK_HZ / 2]` or are inverted.
    ClockOutOfRange,
    /// `io.min_pdm_clk_dc`/`max_pdm_clk_dc` fall outside
    /// `[DUTY_MIN, DUTY_MAX]` or are inverted.
    DutyOutOfRange,
    /// The gain planner (§4.D) produced a `cic_shift` or `fir_shift_hw`
    /// outside the hardware's programmable range.
    GainShiftOutOfRange,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NoModes => "no feasible clkdiv/mcic/mfir mode for the requested rate(s)",
            Self::FirNotFound => "no FIR prototype fits the chosen decimation factor and length budget",
            Self::ClockOutOfRange => "requested PDM clock range is out of bounds",
            Self::DutyOutOfRange => "requested PDM duty-cycle range is out of bounds",
            Self::GainShiftOutOfRange => "gain planner produced a CIC or FIR shift out of hardware range",
        };
        f.write_str(msg)
    }
}

/// Top-level error type for every public entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// `configure()` found no workable hardware configuration. The device
    /// remains in `INITIALIZED` (or, on a re-`configure()`, keeps its
    /// previous `CONFIGURED` state) — no partial configuration survives.
    Invalid(InvalidReason),
    /// `trigger()` was called in a state that forbids the requested
    /// command. No side effects occurred.
    InvalidState {
        /// State the device was actually in.
        in_state: DeviceState,
        /// Command that was rejected.
        command: Command,
    },
    /// `read()` found no buffer in the stream's out-queue before the
    /// deadline. The device keeps running.
    Timeout,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(reason) => write!(f, "invalid configuration: {reason}"),
            Self::InvalidState { in_state, command } => {
                write!(f, "command {command:?} invalid in state {in_state:?}")
            }
            Self::Timeout => f.write_str("timed out waiting for a buffer"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
