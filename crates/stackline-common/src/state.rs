//! Per-resource provisioning lifecycle
//!
//! Every declared resource moves `Declared → Submitting → Ready | Failed`.
//! `Failed` is terminal: resubmitting a failed creation risks duplicate side
//! effects on the provider, so it is left to a fresh run.

/// Lifecycle state of a single declared resource
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum ResourceState {
    /// Known to the provisioner, nothing sent yet
    #[default]
    #[strum(serialize = "declared")]
    Declared,
    /// Creation call in flight
    #[strum(serialize = "submitting")]
    Submitting,
    /// Provider confirmed creation
    #[strum(serialize = "ready")]
    Ready,
    /// Provider rejected creation
    #[strum(serialize = "failed")]
    Failed,
}

impl ResourceState {
    /// Check if the state can no longer change
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    /// Check whether moving to `next` is a legal transition
    pub fn can_transition_to(self, next: ResourceState) -> bool {
        matches!(
            (self, next),
            (Self::Declared, Self::Submitting)
                | (Self::Submitting, Self::Ready)
                | (Self::Submitting, Self::Failed)
        )
    }

    /// Parse from string, returning None for unknown values
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        assert!(ResourceState::Declared.can_transition_to(ResourceState::Submitting));
        assert!(ResourceState::Submitting.can_transition_to(ResourceState::Ready));
        assert!(ResourceState::Submitting.can_transition_to(ResourceState::Failed));
    }

    #[test]
    fn test_no_skipping_submission() {
        assert!(!ResourceState::Declared.can_transition_to(ResourceState::Ready));
        assert!(!ResourceState::Declared.can_transition_to(ResourceState::Failed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [ResourceState::Ready, ResourceState::Failed] {
            assert!(terminal.is_terminal());
            for next in [
                ResourceState::Declared,
                ResourceState::Submitting,
                ResourceState::Ready,
                ResourceState::Failed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(!ResourceState::Submitting.is_terminal());
    }

    #[test]
    fn test_parse() {
        assert_eq!(ResourceState::parse("READY"), Some(ResourceState::Ready));
        assert_eq!(ResourceState::parse("failed"), Some(ResourceState::Failed));
        assert_eq!(ResourceState::parse("unknown"), None);
        assert_eq!(ResourceState::default(), ResourceState::Declared);
    }
}
