//! Scheduler states

use std::fmt;

/// One of the two double-buffered idle slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdleSlot {
    First,
    Second,
}

impl IdleSlot {
    /// Index into the scheduler's slot array
    pub fn index(self) -> usize {
        match self {
            IdleSlot::First => 0,
            IdleSlot::Second => 1,
        }
    }

    /// The partner slot of the double buffer
    pub fn other(self) -> Self {
        match self {
            IdleSlot::First => IdleSlot::Second,
            IdleSlot::Second => IdleSlot::First,
        }
    }

    fn number(self) -> u8 {
        match self {
            IdleSlot::First => 1,
            IdleSlot::Second => 2,
        }
    }
}

/// Progress through a running countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountdownStage {
    /// Countdown fading in; idle slots still loaded
    First,
    /// Idle slots released; waiting for the countdown to end
    Second,
}

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    SelectIdleVideo,
    SelectApplauseVideo,
    StartIdle(IdleSlot),
    PlayIdle(IdleSlot),
    SelectCountdownVideo,
    StartCountdownVideo,
    PlayCountdownVideo,
    WaitCountdown(CountdownStage),
    Error,
    Exit,
}

impl Phase {
    /// Phases of the idle/applause loop, where the buzzer is accepted
    pub fn is_idle_side(self) -> bool {
        matches!(
            self,
            Phase::SelectIdleVideo | Phase::SelectApplauseVideo | Phase::StartIdle(_) | Phase::PlayIdle(_)
        )
    }

    /// Phases between accepting the buzzer and the end of the countdown
    pub fn is_countdown(self) -> bool {
        matches!(
            self,
            Phase::SelectCountdownVideo
                | Phase::StartCountdownVideo
                | Phase::PlayCountdownVideo
                | Phase::WaitCountdown(_)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::SelectIdleVideo => f.write_str("SelectIdleVideo"),
            Phase::SelectApplauseVideo => f.write_str("SelectApplauseVideo"),
            Phase::StartIdle(slot) => write!(f, "StartIdle{}", slot.number()),
            Phase::PlayIdle(slot) => write!(f, "PlayIdle{}", slot.number()),
            Phase::SelectCountdownVideo => f.write_str("SelectCountdownVideo"),
            Phase::StartCountdownVideo => f.write_str("StartCountdownVideo"),
            Phase::PlayCountdownVideo => f.write_str("PlayCountdownVideo"),
            Phase::WaitCountdown(CountdownStage::First) => f.write_str("WaitCountdown1"),
            Phase::WaitCountdown(CountdownStage::Second) => f.write_str("WaitCountdown2"),
            Phase::Error => f.write_str("Error"),
            Phase::Exit => f.write_str("Exit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_slot_partner() {
        assert_eq!(IdleSlot::First.other(), IdleSlot::Second);
        assert_eq!(IdleSlot::Second.other().index(), 0);
    }

    #[test]
    fn test_phase_groups_are_disjoint() {
        let all = [
            Phase::SelectIdleVideo,
            Phase::SelectApplauseVideo,
            Phase::StartIdle(IdleSlot::First),
            Phase::PlayIdle(IdleSlot::Second),
            Phase::SelectCountdownVideo,
            Phase::StartCountdownVideo,
            Phase::PlayCountdownVideo,
            Phase::WaitCountdown(CountdownStage::First),
            Phase::WaitCountdown(CountdownStage::Second),
            Phase::Error,
            Phase::Exit,
        ];
        for phase in all {
            assert!(!(phase.is_idle_side() && phase.is_countdown()), "{}", phase);
        }
        assert!(!Phase::Error.is_idle_side());
        assert!(!Phase::Exit.is_countdown());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Phase::StartIdle(IdleSlot::Second).to_string(), "StartIdle2");
        assert_eq!(Phase::WaitCountdown(CountdownStage::First).to_string(), "WaitCountdown1");
    }
}
