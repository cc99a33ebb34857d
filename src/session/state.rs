//! Session state machine.

/// Lifecycle state of an interactive session.
///
/// `Created` is instantaneous: a session becomes `Active` the moment
/// its processing loop starts. The three remaining states are terminal;
/// nothing transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Registered but the processing loop has not run yet.
    #[default]
    Created,
    /// Processing loop is running.
    Active,
    /// Closed on request.
    Closed,
    /// Closed because the idle timeout elapsed.
    Expired,
    /// Forcibly terminated.
    Killed,
}

impl SessionState {
    /// Check if transition to the target state is valid.
    ///
    /// Valid transitions:
    /// - Created -> Active
    /// - Active -> Closed | Expired | Killed
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, target),
            (Created, Active) | (Active, Closed) | (Active, Expired) | (Active, Killed)
        )
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Closed | SessionState::Expired | SessionState::Killed
        )
    }
}
