//! Device state machine and public API (§5, §4.E).
//!
//! `Device` owns no hardware access directly; it holds a [`RegisterAccess`]
//! implementor plus the I/O collaborators from `crate::io`, and drives them
//! through `initialize` -> `configure` -> `trigger`/`read` the way the
//! original driver's `dmic_initialize`/`dmic_configure`/`dmic_trigger`/
//! `dmic_read` quartet does.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::gain;
use crate::io::{CacheMaintenance, DmaEngine, MemSlab, MsgQueue};
use crate::registers::RegisterAccess;
use crate::solver;
use crate::types::{ActivationMap, ChosenMode, HardwareProfile, Request};

/// Lifecycle states (§5). Transitions are enforced solely by
/// [`Device::trigger`] and the two configuration entry points; there is no
/// other way to move between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    Uninitialized,
    Initialized,
    Configured,
    Active,
    Paused,
}

/// Commands accepted by [`Device::trigger`] (§5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Start,
    Stop,
    Pause,
    Release,
}

/// Depth of the out-queue each FIFO's completed-buffer notifications are
/// posted to. `4` matches the ping-pong-plus-headroom depth the original
/// driver's `K_MSGQ_DEFINE` sizes for a DMA completion queue.
pub const OUT_QUEUE_DEPTH: usize = 4;

/// Per-FIFO runtime bookkeeping (§6 "device-private record").
struct FifoState<S: MsgQueue> {
    used: bool,
    pcm_rate: u32,
    block_size: u32,
    out_queue: S,
}

/// Owned driver instance. `R` is the register-access backend, `D` the DMA
/// engine, `M` the memory-slab allocator, `Q` the out-queue type, and `C`
/// the cache-maintenance hook.
pub struct Device<'a, R, D, M, Q, C>
where
    R: RegisterAccess,
    D: DmaEngine,
    M: MemSlab,
    Q: MsgQueue,
    C: CacheMaintenance,
{
    regs: R,
    dma: D,
    mem: M,
    cache: C,
    hw: HardwareProfile,
    catalog: Catalog<'a>,
    state: DeviceState,
    chosen: Option<ChosenMode>,
    activation: ActivationMap,
    fifo_a: Option<FifoState<Q>>,
    fifo_b: Option<FifoState<Q>>,
}

impl<'a, R, D, M, Q, C> Device<'a, R, D, M, Q, C>
where
    R: RegisterAccess,
    D: DmaEngine,
    M: MemSlab,
    Q: MsgQueue,
    C: CacheMaintenance,
{
    /// Constructs a device in [`DeviceState::Uninitialized`]. No hardware
    /// access occurs until [`Device::initialize`].
    #[must_use]
    pub fn new(regs: R, dma: D, mem: M, cache: C, hw: HardwareProfile, catalog: Catalog<'a>) -> Self {
        Self {
            regs,
            dma,
            mem,
            cache,
            hw,
            catalog,
            state: DeviceState::Uninitialized,
            chosen: None,
            activation: ActivationMap::default(),
            fifo_a: None,
            fifo_b: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Powers on and resets the IP block (§4.E.1). Idempotent: calling this
    /// again from `Initialized` is a no-op success, matching the original
    /// driver's re-entrant `dmic_initialize`.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state == DeviceState::Initialized {
            return Ok(());
        }
        cortex_m::interrupt::free(|_| {
            self.regs.reset_all(&self.hw);
        });
        self.state = DeviceState::Initialized;
        Ok(())
    }

    /// Runs the solver and gain planner against `req`, then programs every
    /// register the chosen mode touches (§4.C, §4.D, §4.E.2-3). On any
    /// failure the device's prior state and register image are left
    /// untouched: either every register write for this configuration
    /// lands, or none do.
    ///
    /// # Errors
    /// - [`Error::InvalidState`] if called from [`DeviceState::Active`] or
    ///   [`DeviceState::Paused`] (must `trigger(Stop)` first).
    /// - [`Error::Invalid`] if no feasible mode, FIR, or gain plan exists
    ///   for `req`.
    pub fn configure(&mut self, req: &Request) -> Result<()> {
        match self.state {
            DeviceState::Active | DeviceState::Paused => {
                return Err(Error::InvalidState { in_state: self.state, command: Command::Start });
            }
            DeviceState::Uninitialized => {
                self.initialize()?;
            }
            DeviceState::Initialized | DeviceState::Configured => {}
        }

        let modes_a = solver::find_modes(&self.hw, &req.io, req.streams[0].pcm_rate)?;
        let modes_b = solver::find_modes(&self.hw, &req.io, req.streams[1].pcm_rate)?;
        let merged = solver::match_modes(&modes_a, &modes_b);
        let mut chosen = solver::select_mode(
            &self.hw,
            &self.catalog,
            &merged,
            req.streams[0].pcm_rate,
            req.streams[1].pcm_rate,
        )?;

        gain::plan_gain(&self.hw, &mut chosen)?;

        let activation = decode_activation(req, &self.hw);

        cortex_m::interrupt::free(|_| {
            self.regs.program_mode(
                &self.hw,
                &chosen,
                &activation,
                &req.io,
                req.streams[0].pcm_width,
                req.streams[1].pcm_width,
            );
        });

        self.fifo_a = (req.streams[0].pcm_rate > 0).then(|| FifoState {
            used: true,
            pcm_rate: req.streams[0].pcm_rate,
            block_size: req.streams[0].dma_block_size,
            out_queue: Q::new(),
        });
        self.fifo_b = (req.streams[1].pcm_rate > 0).then(|| FifoState {
            used: true,
            pcm_rate: req.streams[1].pcm_rate,
            block_size: req.streams[1].dma_block_size,
            out_queue: Q::new(),
        });

        self.chosen = Some(chosen);
        self.activation = activation;
        self.state = DeviceState::Configured;
        Ok(())
    }

    /// Applies `command` to the device's lifecycle (§5).
    ///
    /// # Errors
    /// [`Error::InvalidState`] if `command` is not legal from the current
    /// state. The only legal edges are `Configured --Start--> Active`,
    /// `Active --Pause--> Paused`, `Paused --Start--> Active`,
    /// `{Active,Paused} --Stop--> Configured`, and
    /// `{Initialized,Configured} --Release--> Uninitialized`.
    pub fn trigger(&mut self, command: Command) -> Result<()> {
        let next = match (self.state, command) {
            (DeviceState::Configured, Command::Start) => DeviceState::Active,
            (DeviceState::Paused, Command::Start) => DeviceState::Active,
            (DeviceState::Active, Command::Pause) => DeviceState::Paused,
            (DeviceState::Active, Command::Stop) | (DeviceState::Paused, Command::Stop) => {
                DeviceState::Configured
            }
            (DeviceState::Initialized, Command::Release) | (DeviceState::Configured, Command::Release) => {
                DeviceState::Uninitialized
            }
            _ => return Err(Error::InvalidState { in_state: self.state, command }),
        };

        cortex_m::interrupt::free(|_| match command {
            Command::Start if self.state == DeviceState::Configured => {
                self.regs.start(&self.hw, &self.activation);
                self.dma.start_all();
            }
            Command::Start => self.dma.resume_all(),
            Command::Pause => self.dma.pause_all(),
            Command::Stop => {
                self.regs.stop(&self.hw, &self.activation);
                self.dma.stop_all();
            }
            Command::Release => self.regs.reset_all(&self.hw),
        });

        self.state = next;
        Ok(())
    }

    /// Blocks (via `Q::receive`, which may itself be non-blocking depending
    /// on the collaborator) until a completed buffer is available for the
    /// FIFO identified by `fifo_b` (`false` = A, `true` = B), performs any
    /// required cache invalidation, and returns it (§4.F).
    ///
    /// # Errors
    /// - [`Error::InvalidState`] if the device is not `Active`/`Paused` or
    ///   the requested FIFO was not configured.
    /// - [`Error::Timeout`] if no buffer arrived before the collaborator's
    ///   deadline.
    pub fn read(&mut self, fifo_b: bool, timeout_ticks: u32) -> Result<(u32, u32)> {
        if !matches!(self.state, DeviceState::Active | DeviceState::Paused) {
            return Err(Error::InvalidState { in_state: self.state, command: Command::Start });
        }
        let fifo = if fifo_b { &mut self.fifo_b } else { &mut self.fifo_a };
        let fifo = fifo.as_mut().ok_or(Error::InvalidState { in_state: self.state, command: Command::Start })?;

        let handle = fifo.out_queue.receive(timeout_ticks).ok_or(Error::Timeout)?;
        self.cache.invalidate(handle, fifo.block_size);
        Ok((handle, fifo.block_size))
    }

    /// DMA-complete callback (§4.F, "IRQ handling"). Not part of the public
    /// trigger/read surface: a caller wires this to the actual interrupt
    /// vector. Posts the completed buffer to the FIFO's out-queue and, if
    /// a free slab is available, immediately re-arms the DMA engine with a
    /// freshly allocated buffer; otherwise the FIFO silently drops frames
    /// until the consumer catches up, matching the original driver's
    /// behavior under `mem_slab` exhaustion.
    pub fn on_dma_complete(&mut self, fifo_b: bool, completed_handle: u32) {
        if self.state != DeviceState::Active {
            return;
        }
        let fifo = if fifo_b { &mut self.fifo_b } else { &mut self.fifo_a };
        let Some(fifo) = fifo else { return };
        if !fifo.used {
            return;
        }

        let _ = fifo.out_queue.send(completed_handle);

        if let Some(next) = self.mem.alloc(fifo.block_size) {
            self.dma.requeue(fifo_b, next);
        }
    }
}

/// Derives the register-programming activation map from a request's
/// channel map (§4.E.2, "Channel activation decode").
///
/// Each logical channel's `(controller, lr)` pair claims an IPM slot on
/// first occurrence, in channel order; a controller revisited by a later
/// logical channel (the stereo case) does not consume a second slot but
/// does set that controller's bit in `stereo_mask`, and sets
/// `channel_swap_mask` when the right channel is requested before the
/// left for the same controller.
fn decode_activation(req: &Request, hw: &HardwareProfile) -> ActivationMap {
    let mut map = ActivationMap::default();
    let mut seen_left = 0u8;
    let mut seen_right = 0u8;
    let mut next_slot = 0u8;

    for idx in 0..req.req_num_channels.min(8) {
        let (controller, lr) = req.channel(idx);
        if controller >= hw.num_controllers {
            continue;
        }
        let cbit = 1u8 << controller;
        map.controller_mask |= cbit;

        let already_seen = (seen_left | seen_right) & cbit != 0;

        match lr {
            crate::types::Lr::Left => {
                if seen_right & cbit != 0 {
                    map.channel_swap_mask |= cbit;
                }
                seen_left |= cbit;
                map.mic_enable_mask |= 1 << (u16::from(controller) * 2);
            }
            crate::types::Lr::Right => {
                seen_right |= cbit;
                map.mic_enable_mask |= 1 << (u16::from(controller) * 2 + 1);
            }
        }

        if seen_left & cbit != 0 && seen_right & cbit != 0 {
            map.stereo_mask |= cbit;
        }

        if !already_seen {
            map.ipm_source |= u32::from(controller) << (u32::from(next_slot) * 4);
            next_slot += 1;
        }
    }

    map.active_controllers = map.controller_mask.count_ones() as u8;
    map.fifo_a_used = req.streams[0].pcm_rate > 0;
    map.fifo_b_used = req.streams[1].pcm_rate > 0;
    map
}
