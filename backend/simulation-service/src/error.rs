use crate::services::rating_store::StoreError;
use crate::services::recommenders::SelectionError;
use mab::MabError;
use thiserror::Error;

/// Errors surfaced by the recommendation engine
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    /// The user has no eligible item left; recovered by the round loop
    #[error("User {0} has no eligible item left")]
    UserExhausted(usize),

    /// No active user is left at the start of a round
    #[error("Every user is exhausted")]
    SystemExhausted,

    #[error("Unknown user index {0}")]
    UnknownUser(usize),

    #[error("Bandit error: {0}")]
    Bandit(MabError),

    #[error("Rating store error: {0}")]
    Store(#[from] StoreError),
}

impl From<SelectionError> for SimulationError {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::UserExhausted(user) => SimulationError::UserExhausted(user),
            SelectionError::Bandit(e) => SimulationError::Bandit(e),
            SelectionError::Store(e) => SimulationError::Store(e),
        }
    }
}

impl From<MabError> for SimulationError {
    fn from(err: MabError) -> Self {
        SimulationError::Bandit(err)
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_exhaustion_maps_to_user_exhausted() {
        let err: SimulationError = SelectionError::UserExhausted(4).into();
        assert_eq!(err, SimulationError::UserExhausted(4));
    }

    #[test]
    fn test_bandit_error_is_wrapped() {
        let err: SimulationError = SelectionError::Bandit(MabError::InvalidReward(0.5)).into();
        assert!(matches!(err, SimulationError::Bandit(MabError::InvalidReward(_))));
        assert!(err.to_string().contains("0.5"));
    }
}
