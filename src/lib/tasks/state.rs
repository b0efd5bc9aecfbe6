use super::types::State;
use crate::error::InvalidTransition;

impl State {
    /// States reachable from `self` in one step.
    pub fn next_states(self) -> &'static [State] {
        match self {
            State::Pending => &[State::Scheduled],
            State::Scheduled => &[State::Scheduled, State::Running, State::Failed],
            State::Running => &[State::Running, State::Completed, State::Failed],
            State::Completed | State::Failed => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next_states().is_empty()
    }
}

pub fn valid_state_transition(src: State, dst: State) -> bool {
    src.next_states().contains(&dst)
}

pub fn validate_transition(from: State, to: State) -> Result<(), InvalidTransition> {
    if valid_state_transition(from, to) {
        Ok(())
    } else {
        Err(InvalidTransition { from, to })
    }
}
