//! Elapsed timer (spec.md §4.A): a one-shot millisecond countdown driven
//! by either a hardware tick counter or a calibrated loop counter,
//! correct across 32-bit tick-counter wrap because the timeout and
//! elapsed counts are kept as 64-bit (high/low) pairs.

use crate::board::TickSource;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimerFlags: u8 {
        const HW_BACKED = 1 << 0;
        const TIMED_OUT = 1 << 1;
    }
}

/// A software [`TickSource`] calibrated against a spin loop, used on
/// targets without a pollable hardware timer (spec.md §3, §9).
#[derive(Debug, Clone, Copy)]
pub struct CalibratedLoop {
    loops_per_ms: u32,
    ticks: u32,
}

impl CalibratedLoop {
    pub const fn new(loops_per_ms: u32) -> Self {
        CalibratedLoop {
            loops_per_ms: loops_per_ms.max(1),
            ticks: 0,
        }
    }

    /// Advance the software tick by one unit of elapsed work. A board
    /// calls this from whatever idle-spin it uses to approximate real
    /// time when no hardware timer exists.
    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
    }
}

impl TickSource for CalibratedLoop {
    fn ticks_per_ms(&self) -> u32 {
        self.loops_per_ms
    }

    fn read_ticks(&self) -> u32 {
        self.ticks
    }
}

/// A millisecond countdown, created by [`ElapsedTimer::start`] and
/// mutated only by [`ElapsedTimer::poll`] (spec.md §3).
#[derive(Debug, Clone, Copy)]
pub struct ElapsedTimer {
    ticks_per_ms: u32,
    last_tick: u32,
    elapsed: u64,
    timeout: u64,
    flags: TimerFlags,
}

impl ElapsedTimer {
    /// Start a countdown for `milliseconds`. The target-tick count is
    /// built up in per-step chunks sized so the 32-bit tick counter's
    /// rollover cannot corrupt the 64-bit target (spec.md §4.A).
    pub fn start(ticks: &impl TickSource, milliseconds: u32, hw_backed: bool) -> Self {
        let tpm = ticks.ticks_per_ms().max(1);

        let step_ms = u32::MAX / tpm;
        let step_ticks = u64::from(step_ms) * u64::from(tpm);
        let remainder = milliseconds % step_ms.max(1);

        let mut timeout = u64::from(remainder) * u64::from(tpm);
        let mut remaining_ms = milliseconds - remainder;
        while remaining_ms > 0 {
            timeout += step_ticks;
            remaining_ms -= step_ms;
        }

        let mut flags = TimerFlags::empty();
        if hw_backed {
            flags |= TimerFlags::HW_BACKED;
        }

        ElapsedTimer {
            ticks_per_ms: tpm,
            last_tick: ticks.read_ticks(),
            elapsed: 0,
            timeout,
            flags,
        }
    }

    /// Sample the tick source and report whether the timeout has fired.
    /// Idempotent once expired: it neither re-samples nor double-counts.
    pub fn poll(&mut self, ticks: &impl TickSource) -> bool {
        if self.flags.contains(TimerFlags::TIMED_OUT) {
            return true;
        }

        let now = ticks.read_ticks();
        let delta = now.wrapping_sub(self.last_tick);
        self.last_tick = now;
        self.elapsed = self.elapsed.wrapping_add(u64::from(delta));

        if self.elapsed >= self.timeout {
            self.flags |= TimerFlags::TIMED_OUT;
            true
        } else {
            false
        }
    }

    /// Whether the timeout has already fired, without sampling.
    pub fn is_expired(&self) -> bool {
        self.flags.contains(TimerFlags::TIMED_OUT)
    }

    /// Milliseconds left in the countdown; zero once expired.
    pub fn remaining_ms(&self) -> u32 {
        if self.flags.contains(TimerFlags::TIMED_OUT) {
            return 0;
        }
        let left = self.timeout.saturating_sub(self.elapsed);
        (left / u64::from(self.ticks_per_ms)) as u32
    }

    pub fn elapsed_ms(&self) -> u32 {
        (self.elapsed / u64::from(self.ticks_per_ms)) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTicks {
        per_ms: u32,
        now: core::cell::Cell<u32>,
    }

    impl TickSource for FakeTicks {
        fn ticks_per_ms(&self) -> u32 {
            self.per_ms
        }
        fn read_ticks(&self) -> u32 {
            self.now.get()
        }
    }

    impl FakeTicks {
        fn advance(&self, ticks: u32) {
            self.now.set(self.now.get().wrapping_add(ticks));
        }
    }

    #[test]
    fn remaining_plus_elapsed_tracks_timeout() {
        let ticks = FakeTicks {
            per_ms: 1000,
            now: core::cell::Cell::new(0),
        };
        let mut timer = ElapsedTimer::start(&ticks, 50, true);
        assert!(!timer.is_expired());

        ticks.advance(1000 * 20);
        assert!(!timer.poll(&ticks));
        assert_eq!(timer.elapsed_ms(), 20);
        assert_eq!(timer.remaining_ms(), 30);

        ticks.advance(1000 * 40);
        assert!(timer.poll(&ticks));
        assert_eq!(timer.remaining_ms(), 0);
    }

    #[test]
    fn idempotent_after_expiry() {
        let ticks = FakeTicks {
            per_ms: 10,
            now: core::cell::Cell::new(0),
        };
        let mut timer = ElapsedTimer::start(&ticks, 5, false);
        ticks.advance(1000);
        assert!(timer.poll(&ticks));
        let elapsed_before = timer.elapsed;
        ticks.advance(1000);
        assert!(timer.poll(&ticks));
        assert_eq!(timer.elapsed, elapsed_before);
    }

    #[test]
    fn survives_tick_counter_wrap() {
        let ticks = FakeTicks {
            per_ms: 1,
            now: core::cell::Cell::new(u32::MAX - 5),
        };
        let mut timer = ElapsedTimer::start(&ticks, 20, true);
        ticks.advance(10); // wraps past u32::MAX
        assert!(!timer.poll(&ticks));
        ticks.advance(15);
        assert!(timer.poll(&ticks));
    }
}
