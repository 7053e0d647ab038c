//! Boundary traits for external collaborators
//!
//! Account storage, match-history persistence and invitation email are
//! owned by other systems; the orchestrators only ever touch them
//! through these traits. Failures here are logged by the caller and
//! converted to a generic failure code, never allowed to corrupt
//! in-memory lobby or match state.

use log::info;
use shared::Color;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// A user profile as the account system exposes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicProfile {
    pub id: u64,
    pub username: String,
    pub avatar: Option<String>,
}

/// Account lookups used to populate lobby membership.
pub trait ProfileResolver: Send + Sync {
    fn user_id_by_username(&self, username: &str) -> Result<u64, CollaboratorError>;

    fn public_profile(&self, id: u64) -> Result<PublicProfile, CollaboratorError>;
}

/// Persistence of a concluded match. Called at most once per match,
/// after the result has been broadcast.
pub trait MatchResultSink: Send + Sync {
    fn save_match_result(
        &self,
        players: &HashMap<String, Color>,
        winner: &str,
    ) -> Result<(), CollaboratorError>;
}

/// Out-of-band invitation email. Fire-and-forget: errors are the
/// implementation's problem, lobby state never depends on delivery.
pub trait InviteMailer: Send + Sync {
    fn send_invitation(&self, from: &str, to: &str, lobby_code: &str);
}

/// Stand-in collaborators that only log. Used by the binary until the
/// real account and persistence services are wired in, and by tests.
#[derive(Debug, Default)]
pub struct LoggingCollaborators;

impl ProfileResolver for LoggingCollaborators {
    fn user_id_by_username(&self, username: &str) -> Result<u64, CollaboratorError> {
        // Stable synthetic id so repeated lookups agree.
        let id = username
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        Ok(id)
    }

    fn public_profile(&self, id: u64) -> Result<PublicProfile, CollaboratorError> {
        Ok(PublicProfile {
            id,
            username: format!("user-{}", id),
            avatar: None,
        })
    }
}

impl MatchResultSink for LoggingCollaborators {
    fn save_match_result(
        &self,
        players: &HashMap<String, Color>,
        winner: &str,
    ) -> Result<(), CollaboratorError> {
        info!(
            "Match result: winner {} of {} players",
            winner,
            players.len()
        );
        Ok(())
    }
}

impl InviteMailer for LoggingCollaborators {
    fn send_invitation(&self, from: &str, to: &str, lobby_code: &str) {
        info!("Invitation email {} -> {} for lobby {}", from, to, lobby_code);
    }
}
