//! Match orchestrator: the registry of running matches
//!
//! Maps lobby codes to active games plus the per-match channel
//! bindings, applies moves through the engine and mediates every
//! player-visible effect: turn broadcasts, forfeits, result
//! persistence. All mutation of one match happens inside a single
//! write-lock critical section; events are delivered after the lock is
//! released so a slow or dead client never stalls the registry.

use crate::error::MatchError;
use crate::external::MatchResultSink;
use crate::game::{Game, PlayerMove};
use crate::session::{EventSender, SessionRegistry};
use log::{error, info, warn};
use shared::{BoardSnapshot, Color, MoveRequest, ServerEvent};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

struct ActiveMatch {
    game: Game,
    /// Full username -> color assignment, kept intact for result
    /// persistence even after players depart.
    colors: HashMap<String, Color>,
    host: String,
    channels: HashMap<String, EventSender>,
    /// Players already processed as gone; makes leave + disconnect
    /// notifications for the same session single-shot.
    departed: HashSet<String>,
}

impl ActiveMatch {
    fn remaining_players(&self) -> Vec<&String> {
        self.colors
            .keys()
            .filter(|name| !self.departed.contains(*name))
            .collect()
    }

    fn recipients(&self) -> Vec<(String, EventSender)> {
        self.channels
            .iter()
            .map(|(name, sender)| (name.clone(), sender.clone()))
            .collect()
    }
}

pub struct MatchManager {
    matches: RwLock<HashMap<String, ActiveMatch>>,
    sessions: Arc<SessionRegistry>,
    results: Arc<dyn MatchResultSink>,
}

impl MatchManager {
    pub fn new(sessions: Arc<SessionRegistry>, results: Arc<dyn MatchResultSink>) -> Self {
        Self {
            matches: RwLock::new(HashMap::new()),
            sessions,
            results,
        }
    }

    /// Creates a running match for a started lobby. Colors are assigned
    /// in member-list order; the first member is the recorded host.
    /// Idempotent: a second start request for the same code is a no-op.
    pub async fn create_match_from_lobby(
        &self,
        code: &str,
        usernames: &[String],
        radius: i32,
    ) -> Result<(), MatchError> {
        if usernames.len() > Color::ALL.len() || usernames.is_empty() {
            return Err(MatchError::TooManyPlayers(usernames.len()));
        }
        if self.matches.read().await.contains_key(code) {
            return Ok(());
        }

        // Seed the per-match bindings from whatever sessions are live
        // right now; late joiners re-register via the session call.
        let mut channels = HashMap::new();
        for name in usernames {
            if let Some(sender) = self.sessions.sender(name).await {
                channels.insert(name.clone(), sender);
            }
        }

        let mut colors = HashMap::new();
        let mut seats = HashMap::new();
        for (i, name) in usernames.iter().enumerate() {
            let color = Color::ALL[i];
            colors.insert(name.clone(), color);
            seats.insert(color, name.clone());
        }
        let game = Game::new(radius, seats)?;

        let mut matches = self.matches.write().await;
        if matches.contains_key(code) {
            return Ok(());
        }
        info!("Match {} started with {} players", code, usernames.len());
        matches.insert(
            code.to_string(),
            ActiveMatch {
                game,
                colors,
                host: usernames[0].clone(),
                channels,
                departed: HashSet::new(),
            },
        );
        Ok(())
    }

    /// Binds (or rebinds, on reconnect) a participant's notification
    /// channel for one match.
    pub async fn register_player_session(
        &self,
        code: &str,
        username: &str,
        sender: EventSender,
    ) -> Result<(), MatchError> {
        let mut matches = self.matches.write().await;
        let active = matches
            .get_mut(code)
            .ok_or_else(|| MatchError::MatchNotFound(code.to_string()))?;
        if !active.colors.contains_key(username) || active.departed.contains(username) {
            return Err(MatchError::PlayerNotInMatch(username.to_string()));
        }
        active.channels.insert(username.to_string(), sender);
        Ok(())
    }

    /// Validates and applies one move, then broadcasts the outcome.
    ///
    /// Rule failures come back to the caller without touching shared
    /// state. A winning move additionally ends the match: the result is
    /// broadcast, handed to the persistence collaborator exactly once,
    /// and the match leaves the registry.
    pub async fn apply_move(&self, request: &MoveRequest) -> Result<(), MatchError> {
        if request.path.iter().any(|coord| !coord.is_valid()) {
            return Err(MatchError::InvalidCoordinate);
        }
        let mv = PlayerMove::new(request.path.clone()).map_err(MatchError::Move)?;

        let mut matches = self.matches.write().await;
        let active = matches
            .get_mut(&request.lobby_code)
            .ok_or_else(|| MatchError::MatchNotFound(request.lobby_code.clone()))?;
        let color = *active
            .colors
            .get(&request.username)
            .ok_or_else(|| MatchError::PlayerNotInMatch(request.username.clone()))?;
        if active.departed.contains(&request.username) {
            return Err(MatchError::PlayerNotInMatch(request.username.clone()));
        }

        let winner = active.game.try_apply_move(color, &mv)?;

        let board = active.game.snapshot();
        let next = active
            .game
            .current_turn()
            .and_then(|c| active.game.player_name(c))
            .map(str::to_string);
        let turn_event = ServerEvent::TurnChanged {
            previous: request.username.clone(),
            next,
            path: request.path.clone(),
            board,
        };
        let recipients = active.recipients();

        if winner.is_some() {
            // Winner is the mover. The engine is Finished now, which
            // blocks further moves while the match stays visible until
            // its result has been broadcast and saved.
            let roster = active.colors.clone();
            drop(matches);

            self.deliver(&request.lobby_code, &recipients, turn_event)
                .await;
            self.deliver(
                &request.lobby_code,
                &recipients,
                ServerEvent::MatchEnded {
                    winner: request.username.clone(),
                },
            )
            .await;
            self.persist_result(&request.lobby_code, &roster, &request.username);
            self.matches.write().await.remove(&request.lobby_code);
        } else {
            drop(matches);
            let failed = self
                .deliver(&request.lobby_code, &recipients, turn_event)
                .await;
            self.evict_channels(&request.lobby_code, &failed).await;
        }

        Ok(())
    }

    /// Removes a player from a running match. Idempotent: only the
    /// first leave/disconnect for a session is processed.
    ///
    /// With exactly two players left, the survivor wins by forfeit and
    /// the match is finalized like a normal win. Otherwise the leaver's
    /// color drops out of the turn rotation (their pieces stay on the
    /// board) and the host role moves on if needed.
    pub async fn remove_player(&self, code: &str, username: &str) {
        let mut matches = self.matches.write().await;
        let Some(active) = matches.get_mut(code) else {
            return;
        };
        let Some(&color) = active.colors.get(username) else {
            return;
        };
        if !active.departed.insert(username.to_string()) {
            return;
        }
        active.channels.remove(username);

        // A decided match is mid-finalization in another call; the
        // departure bookkeeping above is all that is needed.
        if active.game.winner().is_some() {
            return;
        }

        let remaining: Vec<String> = active
            .remaining_players()
            .into_iter()
            .cloned()
            .collect();

        if remaining.len() == 1 {
            let winner = remaining[0].clone();
            info!("Match {}: {} wins by forfeit", code, winner);
            if let Some(&winner_color) = active.colors.get(&winner) {
                active.game.declare_winner(winner_color);
            }
            let recipients = active.recipients();
            let roster = active.colors.clone();
            drop(matches);

            self.deliver(
                code,
                &recipients,
                ServerEvent::PlayerLeftMatch {
                    username: username.to_string(),
                },
            )
            .await;
            self.deliver(
                code,
                &recipients,
                ServerEvent::MatchEnded {
                    winner: winner.clone(),
                },
            )
            .await;
            self.persist_result(code, &roster, &winner);
            self.matches.write().await.remove(code);
            return;
        }

        if remaining.is_empty() {
            info!("Match {} abandoned", code);
            matches.remove(code);
            return;
        }

        active.game.remove_player(color);
        if active.host == username {
            active.host = remaining[0].clone();
            info!("Match {}: host handed to {}", code, active.host);
        }
        let recipients = active.recipients();
        drop(matches);

        let failed = self
            .deliver(
                code,
                &recipients,
                ServerEvent::PlayerLeftMatch {
                    username: username.to_string(),
                },
            )
            .await;
        self.evict_channels(code, &failed).await;
    }

    /// Disconnects are delivered as explicit events and handled the
    /// same way as a voluntary leave.
    pub async fn handle_disconnect(&self, code: &str, username: &str) {
        self.remove_player(code, username).await;
    }

    /// Read-only board snapshot for reconnect and resync.
    pub async fn match_state(&self, code: &str) -> Option<BoardSnapshot> {
        let matches = self.matches.read().await;
        matches.get(code).map(|active| active.game.snapshot())
    }

    pub async fn contains(&self, code: &str) -> bool {
        self.matches.read().await.contains_key(code)
    }

    /// Sends one event to every recipient, isolating failures; returns
    /// the usernames whose channels are dead.
    async fn deliver(
        &self,
        code: &str,
        recipients: &[(String, EventSender)],
        event: ServerEvent,
    ) -> Vec<String> {
        let mut failed = Vec::new();
        for (name, sender) in recipients {
            if sender.send(event.clone()).is_err() {
                warn!("Match {}: dropping dead channel for {}", code, name);
                failed.push(name.clone());
            }
        }
        failed
    }

    async fn evict_channels(&self, code: &str, usernames: &[String]) {
        if usernames.is_empty() {
            return;
        }
        let mut matches = self.matches.write().await;
        if let Some(active) = matches.get_mut(code) {
            for name in usernames {
                active.channels.remove(name);
            }
        }
    }

    /// Exactly one persistence attempt per concluded match; a failure
    /// is logged, never propagated, and never un-finishes the match.
    fn persist_result(&self, code: &str, colors: &HashMap<String, Color>, winner: &str) {
        if let Err(err) = self.results.save_match_result(colors, winner) {
            error!("Match {}: failed to persist result: {}", code, err);
        }
    }
}
