/// Input source lifecycle
///
/// Represents the lifecycle of an input source with clear state transitions:
/// `Inert -> Active -> Invalid`, where `Invalid` is terminal.

/// State of an input source
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SourceState {
    /// Created but not yet registered with a scheduler
    Inert,

    /// Registered with a scheduler and accepting submissions
    Active,

    /// Torn down; submissions and registration are rejected
    Invalid,
}

impl SourceState {
    /// Check if the source has not been registered yet
    pub fn is_inert(&self) -> bool {
        matches!(self, SourceState::Inert)
    }

    /// Check if the source is registered with a scheduler
    pub fn is_active(&self) -> bool {
        matches!(self, SourceState::Active)
    }

    /// Check if the source has been invalidated
    pub fn is_invalid(&self) -> bool {
        matches!(self, SourceState::Invalid)
    }

    /// Get a human-readable description of the state
    pub fn description(&self) -> &'static str {
        match self {
            SourceState::Inert => "inert",
            SourceState::Active => "active",
            SourceState::Invalid => "invalid",
        }
    }
}

impl Default for SourceState {
    fn default() -> Self {
        SourceState::Inert
    }
}
