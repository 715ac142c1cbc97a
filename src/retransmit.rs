//! Retransmission policy (spec.md §4.B): the adaptive backoff state
//! machine shared by ARP, DHCP and TFTP. `current_delay` monotonically
//! doubles up to `max_delay`, then pegs until `maxout_count` exceeds
//! `giveup`, at which point every subsequent op returns [`Outcome::Timeout`].

use crate::config::RetransmitTuning;

/// Selects which operation the single [`RetransmitPolicy::process`]
/// entry point performs (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetransmitOp {
    InitArp,
    InitDhcp,
    InitTftp,
    Increment,
    Return,
    OrTimeoutReturn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    DelaySeconds(u32),
    Timeout,
}

/// Process-wide singleton state (spec.md §3). A board embeds exactly
/// one of these per protocol session (the DHCP client and the TFTP
/// session each own their own, the ARP link-local prober owns its own).
#[derive(Debug, Clone, Copy, Default)]
pub struct RetransmitPolicy {
    current_delay: u32,
    max_delay: u32,
    giveup: u32,
    maxout_count: u32,
    random_delta: i32,
}

/// `DELAY:GIVEUP:MAX` as found in e.g. the `DHCPRETRYTUNE` shell
/// variable (spec.md §4.B).
pub fn parse_tuning(s: &str) -> Option<RetransmitTuning> {
    let mut parts = s.split(':');
    let delay_secs = parts.next()?.parse().ok()?;
    let giveup = parts.next()?.parse().ok()?;
    let max_delay_secs = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(RetransmitTuning {
        delay_secs,
        giveup,
        max_delay_secs,
    })
}

/// A random delta in `[-1, +2]` derived from the low 2 bits of the
/// local IP (spec.md §4.B).
fn random_delta(local_ip: [u8; 4]) -> i32 {
    i32::from(local_ip[3] & 0x3) - 1
}

impl RetransmitPolicy {
    pub const fn new() -> Self {
        RetransmitPolicy {
            current_delay: 0,
            max_delay: 0,
            giveup: 0,
            maxout_count: 0,
            random_delta: 0,
        }
    }

    pub fn process(&mut self, op: RetransmitOp, tuning: RetransmitTuning, local_ip: [u8; 4]) -> Outcome {
        match op {
            RetransmitOp::InitArp | RetransmitOp::InitDhcp | RetransmitOp::InitTftp => {
                self.init(tuning, local_ip)
            }
            RetransmitOp::Increment => self.increment(),
            RetransmitOp::Return => self.current(),
            RetransmitOp::OrTimeoutReturn => {
                if self.maxout_count > self.giveup {
                    Outcome::Timeout
                } else {
                    self.current()
                }
            }
        }
    }

    fn init(&mut self, tuning: RetransmitTuning, local_ip: [u8; 4]) -> Outcome {
        self.current_delay = tuning.delay_secs;
        self.max_delay = tuning.max_delay_secs;
        self.giveup = tuning.giveup;
        self.maxout_count = 0;
        self.random_delta = random_delta(local_ip);
        self.current()
    }

    fn current(&self) -> Outcome {
        if self.maxout_count > self.giveup {
            return Outcome::Timeout;
        }
        let delay = (i64::from(self.current_delay) + i64::from(self.random_delta)).max(0);
        Outcome::DelaySeconds(delay as u32)
    }

    fn increment(&mut self) -> Outcome {
        if self.maxout_count > self.giveup {
            return Outcome::Timeout;
        }
        if self.current_delay < self.max_delay {
            self.current_delay = (self.current_delay.saturating_mul(2)).min(self.max_delay);
        } else {
            self.maxout_count += 1;
        }
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_pegged_then_times_out() {
        let tuning = RetransmitTuning {
            delay_secs: 2,
            giveup: 2,
            max_delay_secs: 8,
        };
        let mut policy = RetransmitPolicy::new();
        let ip = [10, 0, 0, 1]; // random_delta = 1-1 = 0
        assert_eq!(
            policy.process(RetransmitOp::InitTftp, tuning, ip),
            Outcome::DelaySeconds(2)
        );
        assert_eq!(
            policy.process(RetransmitOp::Increment, tuning, ip),
            Outcome::DelaySeconds(4)
        );
        assert_eq!(
            policy.process(RetransmitOp::Increment, tuning, ip),
            Outcome::DelaySeconds(8)
        );
        // pegged at max; further increments burn the giveup budget.
        assert_eq!(
            policy.process(RetransmitOp::Increment, tuning, ip),
            Outcome::DelaySeconds(8)
        );
        assert_eq!(
            policy.process(RetransmitOp::Increment, tuning, ip),
            Outcome::DelaySeconds(8)
        );
        assert_eq!(
            policy.process(RetransmitOp::Increment, tuning, ip),
            Outcome::Timeout
        );
        assert_eq!(
            policy.process(RetransmitOp::Return, tuning, ip),
            Outcome::Timeout
        );
    }

    #[test]
    fn parses_shell_variable_format() {
        assert_eq!(
            parse_tuning("4:6:64"),
            Some(RetransmitTuning {
                delay_secs: 4,
                giveup: 6,
                max_delay_secs: 64,
            })
        );
        assert_eq!(parse_tuning("garbage"), None);
    }

    #[test]
    fn non_decreasing_within_a_session() {
        let tuning = RetransmitTuning::DHCP;
        let mut policy = RetransmitPolicy::new();
        let ip = [192, 168, 1, 7];
        let mut last = 0u32;
        policy.process(RetransmitOp::InitDhcp, tuning, ip);
        for _ in 0..10 {
            if let Outcome::DelaySeconds(d) = policy.process(RetransmitOp::Increment, tuning, ip) {
                assert!(d >= last);
                last = d;
            } else {
                break;
            }
        }
    }
}
