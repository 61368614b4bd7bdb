/// file: src/reconnect.rs
/// description: bounded reconnection budget owned by the listener coordinator
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { attempt: u32 },
    GiveUp,
}

#[derive(Debug)]
pub struct ReconnectState {
    attempts: u32,
    max_attempts: u32,
    exhausted: bool,
    last_disconnection_time: Option<Instant>,
}

impl ReconnectState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            exhausted: false,
            last_disconnection_time: None,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn last_disconnection_time(&self) -> Option<Instant> {
        self.last_disconnection_time
    }

    /// Restores the full budget. Called whenever the endpoint or address is
    /// switched explicitly.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.exhausted = false;
    }

    /// Records an unsolicited disconnect and decides whether another
    /// reconnection attempt is allowed.
    pub fn record_disconnect(&mut self) -> RetryDecision {
        self.last_disconnection_time = Some(Instant::now());

        if self.attempts >= self.max_attempts {
            self.exhausted = true;
            return RetryDecision::GiveUp;
        }

        self.attempts += 1;
        RetryDecision::Retry {
            attempt: self.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_is_bounded() {
        let mut state = ReconnectState::new(2);

        assert_eq!(state.record_disconnect(), RetryDecision::Retry { attempt: 1 });
        assert_eq!(state.record_disconnect(), RetryDecision::Retry { attempt: 2 });
        assert_eq!(state.record_disconnect(), RetryDecision::GiveUp);
        assert!(state.is_exhausted());

        // stays exhausted until reset
        assert_eq!(state.record_disconnect(), RetryDecision::GiveUp);
        assert_eq!(state.attempts(), 2);
        assert!(state.last_disconnection_time().is_some());
    }

    #[test]
    fn test_reset_restores_full_budget() {
        let mut state = ReconnectState::new(3);
        state.record_disconnect();
        state.record_disconnect();

        state.reset();
        assert_eq!(state.attempts(), 0);
        assert!(!state.is_exhausted());

        for attempt in 1..=3 {
            assert_eq!(state.record_disconnect(), RetryDecision::Retry { attempt });
        }
        assert_eq!(state.record_disconnect(), RetryDecision::GiveUp);
    }

    #[test]
    fn test_zero_budget_gives_up_immediately() {
        let mut state = ReconnectState::new(0);
        assert_eq!(state.record_disconnect(), RetryDecision::GiveUp);
        assert_eq!(state.max_attempts(), 0);
    }
}
