//! Periodic tick runner: tick → plant step → sleep.
//!
//! Drives a [`ControllerBank`] against a [`SimulatedBoard`] at the
//! configured period, with absolute-deadline pacing so that jitter in one
//! tick does not shift the following ones.
//!
//! [`RtPlacement::apply`] locks memory, prefaults the tick stack and
//! optionally pins the thread and switches it to SCHED_FIFO. Outside the
//! `rt` feature it only validates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use embody_common::config::ConfigError;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::LoadedConfig;
use crate::sim::{PlantParams, SimulatedBoard};
use crate::state::bank::{CommandError, ControllerBank};
use crate::trajectory::profile::LinearProfile;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-tick timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total ticks executed.
    pub cycle_count: u64,
    /// Last tick duration [ns].
    pub last_cycle_ns: i64,
    pub min_cycle_ns: i64,
    pub max_cycle_ns: i64,
    /// Running sum for the average.
    pub sum_cycle_ns: i64,
    /// Ticks that exceeded the period.
    pub overruns: u64,
    /// Maximum wake-up latency [ns] (actual minus expected wake time).
    pub max_latency_ns: i64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record one tick. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average tick time [ns] (0 if no ticks).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup or cycle execution.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// Configuration rejected by the controller bank.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Command could not be queued.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Tick exceeded its period (`rt` builds only).
    #[error("cycle overrun: {actual_ns}ns > {budget_ns}ns budget")]
    CycleOverrun { actual_ns: i64, budget_ns: i64 },
}

// ─── RT Placement ───────────────────────────────────────────────────

/// Stack bytes touched before the loop. The tick path is shallow: one
/// joint context plus the PID and trajectory frames.
const TICK_STACK_PREFAULT: usize = 64 * 1024;

/// Where and how the tick thread runs. Fields left `None` keep the
/// inherited setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RtPlacement {
    /// CPU the tick thread is pinned to.
    pub cpu_core: Option<usize>,
    /// SCHED_FIFO priority, 1..=99.
    pub priority: Option<i32>,
}

impl RtPlacement {
    /// Range checks that do not need the `rt` feature.
    pub fn validate(&self) -> Result<(), CycleError> {
        if let Some(p) = self.priority {
            if !(1..=99).contains(&p) {
                return Err(CycleError::RtSetup(format!("SCHED_FIFO priority {p} outside 1..=99")));
            }
        }
        if let Some(cpu) = self.cpu_core {
            let online = std::thread::available_parallelism().map_or(1, |n| n.get());
            if cpu >= online {
                return Err(CycleError::RtSetup(format!("cpu_core {cpu} not online ({online} cpus)")));
            }
        }
        Ok(())
    }

    /// Lock memory, prefault the tick stack, then pin and raise the
    /// calling thread. Call once before [`CycleRunner::run`], from the
    /// thread that will run it.
    pub fn apply(&self) -> Result<(), CycleError> {
        self.validate()?;

        #[cfg(feature = "rt")]
        {
            os::lock_memory()?;
            os::prefault_stack();
            if let Some(cpu) = self.cpu_core {
                os::pin_to_cpu(cpu)?;
            }
            if let Some(priority) = self.priority {
                os::set_fifo(priority)?;
            }
            info!("RT placement applied: {:?}", self);
        }
        #[cfg(not(feature = "rt"))]
        tracing::debug!("rt feature disabled, placement {:?} not applied", self);

        Ok(())
    }
}

#[cfg(feature = "rt")]
mod os {
    use nix::errno::Errno;
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::sys::mman::{MlockallFlags, mlockall};
    use nix::unistd::Pid;

    use super::{CycleError, TICK_STACK_PREFAULT};

    pub(super) fn lock_memory() -> Result<(), CycleError> {
        mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
            .map_err(|e| CycleError::RtSetup(format!("mlockall: {e}")))
    }

    pub(super) fn prefault_stack() {
        let mut buf = [0u8; TICK_STACK_PREFAULT];
        core::hint::black_box(&mut buf).fill(0xA5);
    }

    pub(super) fn pin_to_cpu(cpu: usize) -> Result<(), CycleError> {
        let mut set = CpuSet::new();
        set.set(cpu)
            .and_then(|()| sched_setaffinity(Pid::from_raw(0), &set))
            .map_err(|e| CycleError::RtSetup(format!("pin to cpu {cpu}: {e}")))
    }

    pub(super) fn set_fifo(priority: i32) -> Result<(), CycleError> {
        // SAFETY: plain query, no pointers.
        let max = unsafe { libc::sched_get_priority_max(libc::SCHED_FIFO) };
        let param = libc::sched_param {
            sched_priority: priority.min(max),
        };
        // SAFETY: `param` outlives the call; pid 0 is the calling thread.
        if unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) } != 0 {
            return Err(CycleError::RtSetup(format!("SCHED_FIFO {priority}: {}", Errno::last())));
        }
        Ok(())
    }
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns the controller bank, the simulated board and the timing state.
#[derive(Debug)]
pub struct CycleRunner {
    bank: ControllerBank<LinearProfile>,
    board: SimulatedBoard,
    cycle_time_ns: i64,
    stats: CycleStats,
}

impl CycleRunner {
    /// Build the bank and a simulated board from a validated config.
    pub fn new(config: &LoadedConfig) -> Result<Self, CycleError> {
        Self::with_plant(config, PlantParams::default())
    }

    pub fn with_plant(config: &LoadedConfig, params: PlantParams) -> Result<Self, CycleError> {
        let bank = ControllerBank::with_linear_profile(&config.board)?;
        let board = SimulatedBoard::new(&config.board, params);
        Ok(Self {
            bank,
            board,
            cycle_time_ns: config.cycle_time_ns(),
            stats: CycleStats::new(),
        })
    }

    #[inline]
    pub fn bank(&self) -> &ControllerBank<LinearProfile> {
        &self.bank
    }

    #[inline]
    pub fn bank_mut(&mut self) -> &mut ControllerBank<LinearProfile> {
        &mut self.bank
    }

    #[inline]
    pub fn board(&self) -> &SimulatedBoard {
        &self.board
    }

    #[inline]
    pub fn board_mut(&mut self) -> &mut SimulatedBoard {
        &mut self.board
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// One tick without pacing or timing.
    #[inline]
    pub fn cycle_body(&mut self) {
        self.bank.tick(&mut self.board);
        self.board.step();
    }

    /// Run `ticks` ticks back to back (no sleeping).
    pub fn run_unpaced(&mut self, ticks: u64) {
        for _ in 0..ticks {
            let start = Instant::now();
            self.cycle_body();
            self.stats.record(start.elapsed().as_nanos() as i64, 0);
        }
    }

    /// Paced loop until `running` is cleared or `max_ticks` ticks have run
    /// (`0` = unbounded).
    pub fn run(&mut self, running: &AtomicBool, max_ticks: u64) -> Result<(), CycleError> {
        info!(
            "Entering tick loop: period={}µs, joints={}, max_ticks={}",
            self.cycle_time_ns / 1000,
            self.bank.joint_count(),
            max_ticks
        );

        #[cfg(feature = "rt")]
        let result = self.run_rt_loop(running, max_ticks);
        #[cfg(not(feature = "rt"))]
        let result = self.run_sim_loop(running, max_ticks);

        self.log_summary();
        result
    }

    #[inline]
    fn should_continue(&self, running: &AtomicBool, max_ticks: u64) -> bool {
        running.load(Ordering::Relaxed) && (max_ticks == 0 || self.stats.cycle_count < max_ticks)
    }

    /// Loop on `clock_nanosleep(TIMER_ABSTIME)`; the first overrun aborts.
    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self, running: &AtomicBool, max_ticks: u64) -> Result<(), CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")));
        let mut next_wake = now()?;

        while self.should_continue(running, max_ticks) {
            next_wake = timespec_add_ns(next_wake, self.cycle_time_ns);

            let start = now()?;
            self.cycle_body();
            let end = now()?;

            let duration_ns = timespec_diff_ns(&end, &start);
            self.stats.record(duration_ns, 0);
            if duration_ns > self.cycle_time_ns {
                self.stats.overruns += 1;
                warn!("Tick overrun: {}ns > {}ns budget, aborting", duration_ns, self.cycle_time_ns);
                return Err(CycleError::CycleOverrun {
                    actual_ns: duration_ns,
                    budget_ns: self.cycle_time_ns,
                });
            }

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
            let woke = now()?;
            self.stats.max_latency_ns = self.stats.max_latency_ns.max(timespec_diff_ns(&woke, &next_wake));
        }
        Ok(())
    }

    /// Loop on `std::thread::sleep` toward absolute deadlines. Overruns are
    /// counted and logged, not fatal.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self, running: &AtomicBool, max_ticks: u64) -> Result<(), CycleError> {
        let period = std::time::Duration::from_nanos(self.cycle_time_ns.max(0) as u64);
        let mut next_wake = Instant::now();

        while self.should_continue(running, max_ticks) {
            next_wake += period;

            let start = Instant::now();
            self.cycle_body();
            let elapsed = start.elapsed();
            let latency_ns = start.saturating_duration_since(next_wake - period).as_nanos() as i64;
            self.stats.record(elapsed.as_nanos() as i64, latency_ns);

            if elapsed > period {
                self.stats.overruns += 1;
                if self.stats.overruns == 1 {
                    warn!("Tick overrun: {}ns > {}ns budget", elapsed.as_nanos(), self.cycle_time_ns);
                }
            }

            let now = Instant::now();
            if next_wake > now {
                std::thread::sleep(next_wake - now);
            } else {
                // Fell behind: restart the schedule instead of bursting.
                next_wake = now;
            }
        }
        Ok(())
    }

    fn log_summary(&self) {
        let s = &self.stats;
        info!(
            "Ticks: {} | min {}ns avg {}ns max {}ns | overruns {} | max latency {}ns",
            s.cycle_count,
            if s.cycle_count == 0 { 0 } else { s.min_cycle_ns },
            s.avg_cycle_ns(),
            s.max_cycle_ns,
            s.overruns,
            s.max_latency_ns
        );
        for (j, status) in self.bank.statuses().enumerate() {
            info!(
                "Joint {j}: mode={:?} pos={} desired={} out={} in_position={} faults={:?}",
                status.mode, status.position, status.desired, status.output, status.in_position, status.faults
            );
        }
    }
}

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let total = ts.tv_nsec() + ns;
    TimeSpec::new(ts.tv_sec() + total / 1_000_000_000, total % 1_000_000_000)
}

#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
