//! Lobby orchestrator: pre-game lobby lifecycle
//!
//! Owns the lobby registry plus report/ban bookkeeping and hands a
//! started lobby over to the match orchestrator. All registry mutation
//! runs inside one write-lock critical section; notifications are
//! collected under the lock and delivered through the session registry
//! after it is released.

use crate::error::LobbyError;
use crate::external::{InviteMailer, ProfileResolver};
use crate::match_manager::MatchManager;
use crate::moderation::ReportTracker;
use crate::session::{EventSender, SessionRegistry};
use crate::utils::unix_time_ms;
use log::{info, warn};
use rand::Rng;
use shared::{
    BanStatus, CreateLobbyRequest, JoinLobbyRequest, LobbyMemberInfo, LobbySnapshot,
    LobbyVisibility, ReportRequest, ServerEvent, ALLOWED_CAPACITIES, DEFAULT_BOARD_RADIUS,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const CODE_LENGTH: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_ATTEMPTS: usize = 16;

#[derive(Debug, Clone)]
struct LobbyMember {
    joined_at_ms: u64,
    avatar: Option<String>,
}

#[derive(Debug, Clone)]
struct Lobby {
    code: String,
    visibility: LobbyVisibility,
    capacity: usize,
    host: String,
    started: bool,
    members: HashMap<String, LobbyMember>,
}

impl Lobby {
    /// Current members with the host first, then join order. A host
    /// who already left the membership map is not listed.
    fn ordered_members(&self) -> Vec<String> {
        let mut rest: Vec<_> = self
            .members
            .iter()
            .filter(|(name, _)| **name != self.host)
            .collect();
        rest.sort_by_key(|(name, member)| (member.joined_at_ms, (*name).clone()));

        let mut ordered = Vec::new();
        if self.members.contains_key(&self.host) {
            ordered.push(self.host.clone());
        }
        ordered.extend(rest.into_iter().map(|(name, _)| name.clone()));
        ordered
    }

    fn snapshot(&self) -> LobbySnapshot {
        let members = self
            .ordered_members()
            .into_iter()
            .map(|name| {
                let avatar = self.members.get(&name).and_then(|m| m.avatar.clone());
                LobbyMemberInfo {
                    is_host: name == self.host,
                    username: name,
                    avatar,
                }
            })
            .collect();

        LobbySnapshot {
            code: self.code.clone(),
            visibility: self.visibility,
            capacity: self.capacity,
            started: self.started,
            members,
        }
    }
}

pub struct LobbyManager {
    lobbies: RwLock<HashMap<String, Lobby>>,
    reports: ReportTracker,
    sessions: Arc<SessionRegistry>,
    matches: Arc<MatchManager>,
    profiles: Arc<dyn ProfileResolver>,
    mailer: Arc<dyn InviteMailer>,
}

impl LobbyManager {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        matches: Arc<MatchManager>,
        profiles: Arc<dyn ProfileResolver>,
        mailer: Arc<dyn InviteMailer>,
    ) -> Self {
        Self {
            lobbies: RwLock::new(HashMap::new()),
            reports: ReportTracker::new(),
            sessions,
            matches,
            profiles,
            mailer,
        }
    }

    /// Creates a lobby with the caller as host and first member, binds
    /// their notification channel and returns the initial snapshot.
    pub async fn create_lobby(
        &self,
        host: &str,
        request: &CreateLobbyRequest,
        sender: EventSender,
    ) -> Result<LobbySnapshot, LobbyError> {
        if !ALLOWED_CAPACITIES.contains(&request.capacity) {
            return Err(LobbyError::InvalidCapacity(request.capacity));
        }
        if self.reports.is_banned(host).await {
            return Err(LobbyError::Banned);
        }

        let avatar = self.resolve_avatar(host);
        self.sessions.bind(host, sender).await;

        let mut lobbies = self.lobbies.write().await;
        scrub_started_membership(&mut lobbies, host);
        if find_lobby_of(&lobbies, host).is_some() {
            return Err(LobbyError::AlreadyInLobby);
        }

        // Check-and-insert runs under the registry write lock, so two
        // creators can never claim the same code.
        let code = generate_code(&lobbies)?;
        let mut members = HashMap::new();
        members.insert(
            host.to_string(),
            LobbyMember {
                joined_at_ms: unix_time_ms(),
                avatar,
            },
        );
        let lobby = Lobby {
            code: code.clone(),
            visibility: request.visibility,
            capacity: request.capacity,
            host: host.to_string(),
            started: false,
            members,
        };
        let snapshot = lobby.snapshot();
        lobbies.insert(code.clone(), lobby);
        info!("Lobby {} created by {}", code, host);

        Ok(snapshot)
    }

    /// Adds a member to an open lobby and broadcasts the refreshed
    /// snapshot to everyone in it.
    pub async fn join_lobby(
        &self,
        username: &str,
        request: &JoinLobbyRequest,
        sender: EventSender,
    ) -> Result<LobbySnapshot, LobbyError> {
        if self.reports.is_banned(username).await {
            return Err(LobbyError::Banned);
        }

        let avatar = self.resolve_avatar(username);
        self.sessions.bind(username, sender).await;

        let mut lobbies = self.lobbies.write().await;
        scrub_started_membership(&mut lobbies, username);
        match find_lobby_of(&lobbies, username) {
            Some(code) if code == request.code => {}
            Some(_) => return Err(LobbyError::AlreadyInLobby),
            None => {}
        }

        let lobby = lobbies
            .get_mut(&request.code)
            .ok_or_else(|| LobbyError::LobbyNotFound(request.code.clone()))?;
        if lobby.started {
            return Err(LobbyError::AlreadyStarted);
        }
        if !lobby.members.contains_key(username) && lobby.members.len() >= lobby.capacity {
            return Err(LobbyError::LobbyFull);
        }

        lobby.members.insert(
            username.to_string(),
            LobbyMember {
                joined_at_ms: unix_time_ms(),
                avatar,
            },
        );
        let snapshot = lobby.snapshot();
        let recipients = lobby.ordered_members();
        drop(lobbies);

        self.notify(
            &recipients,
            ServerEvent::LobbyUpdated {
                lobby: snapshot.clone(),
            },
        )
        .await;
        Ok(snapshot)
    }

    /// Removes the caller from their lobby. An empty lobby disappears;
    /// a host departure closes the lobby for everyone; otherwise the
    /// remaining members get a refreshed snapshot.
    pub async fn leave_lobby(&self, username: &str) -> Result<(), LobbyError> {
        let mut lobbies = self.lobbies.write().await;
        let code = find_lobby_of(&lobbies, username).ok_or(LobbyError::NotInLobby)?;

        let lobby = match lobbies.get_mut(&code) {
            Some(lobby) => lobby,
            None => return Err(LobbyError::LobbyNotFound(code)),
        };
        lobby.members.remove(username);

        if lobby.members.is_empty() {
            lobbies.remove(&code);
            info!("Lobby {} removed (empty)", code);
            return Ok(());
        }

        if lobby.started {
            // In-game membership is bookkeeping only; the match layer
            // owns departure notifications once play has begun.
            return Ok(());
        }

        if lobby.host == username {
            // Host departure always closes the lobby pre-start.
            let remaining = lobby.ordered_members();
            lobbies.remove(&code);
            drop(lobbies);
            info!("Lobby {} closed (host left)", code);
            self.notify(
                &remaining,
                ServerEvent::LobbyClosed {
                    code,
                    reason: "host left".to_string(),
                },
            )
            .await;
            return Ok(());
        }

        let snapshot = lobby.snapshot();
        let recipients = lobby.ordered_members();
        drop(lobbies);

        self.notify(&recipients, ServerEvent::LobbyUpdated { lobby: snapshot })
            .await;
        Ok(())
    }

    /// Host-only removal of another member. Kicking yourself is a
    /// no-op rather than an error.
    pub async fn kick_player(
        &self,
        host: &str,
        code: &str,
        target: &str,
    ) -> Result<(), LobbyError> {
        let mut lobbies = self.lobbies.write().await;
        let lobby = lobbies
            .get_mut(code)
            .ok_or_else(|| LobbyError::LobbyNotFound(code.to_string()))?;
        if lobby.host != host {
            return Err(LobbyError::NotHost);
        }
        if target == host {
            return Ok(());
        }
        if lobby.members.remove(target).is_none() {
            return Err(LobbyError::NotInLobby);
        }

        let snapshot = lobby.snapshot();
        let recipients = lobby.ordered_members();
        drop(lobbies);
        info!("{} kicked from lobby {}", target, code);

        self.sessions
            .send(
                target,
                ServerEvent::Kicked {
                    reason: "removed by host".to_string(),
                },
            )
            .await;
        self.notify(&recipients, ServerEvent::LobbyUpdated { lobby: snapshot })
            .await;
        Ok(())
    }

    /// Starts the caller's lobby: hands the member list (host first) to
    /// the match orchestrator and tells everyone the game is starting.
    /// The lobby leaves the registry; gameplay continues under the same
    /// code in the match registry.
    pub async fn start_game(&self, host: &str) -> Result<String, LobbyError> {
        let mut lobbies = self.lobbies.write().await;
        let code = find_lobby_of(&lobbies, host).ok_or(LobbyError::NotInLobby)?;

        let lobby = match lobbies.get_mut(&code) {
            Some(lobby) => lobby,
            None => return Err(LobbyError::LobbyNotFound(code)),
        };
        if lobby.host != host {
            return Err(LobbyError::NotHost);
        }
        if lobby.started {
            return Err(LobbyError::AlreadyStarted);
        }
        if !ALLOWED_CAPACITIES.contains(&lobby.members.len()) {
            return Err(LobbyError::NotEnoughPlayers(lobby.members.len()));
        }

        // The lobby stays in the registry marked started: joins now
        // fail with the started error and the public listing skips it.
        // The entry drains away as its members move on or disconnect.
        lobby.started = true;
        let members = lobby.ordered_members();
        drop(lobbies);

        self.matches
            .create_match_from_lobby(&code, &members, DEFAULT_BOARD_RADIUS)
            .await
            .map_err(|err| LobbyError::Internal(err.to_string()))?;
        info!("Lobby {} started with {} players", code, members.len());

        self.notify(&members, ServerEvent::GameStarting { code: code.clone() })
            .await;
        Ok(code)
    }

    /// Registers one report and escalates the target's ban when a
    /// threshold is crossed. The target learns of a status change
    /// best-effort.
    pub async fn report_player(&self, request: &ReportRequest) -> Result<BanStatus, LobbyError> {
        if request.reporter == request.target {
            return Err(LobbyError::SelfTarget);
        }

        let status = self.reports.record_report(&request.target).await;
        if status != BanStatus::None {
            self.sessions
                .send(&request.target, ServerEvent::BanStatusChanged { status })
                .await;
        }
        Ok(status)
    }

    /// Host-only invitation: pushes a notification at the friend's live
    /// channel and fires the out-of-band email.
    pub async fn invite_friend(
        &self,
        host: &str,
        friend: &str,
        code: &str,
    ) -> Result<(), LobbyError> {
        if friend == host {
            return Err(LobbyError::SelfTarget);
        }

        {
            let lobbies = self.lobbies.read().await;
            let lobby = lobbies
                .get(code)
                .ok_or_else(|| LobbyError::LobbyNotFound(code.to_string()))?;
            if lobby.host != host {
                return Err(LobbyError::NotHost);
            }
        }
        if self.reports.is_banned(friend).await {
            return Err(LobbyError::Banned);
        }

        let delivered = self
            .sessions
            .send(
                friend,
                ServerEvent::InvitationReceived {
                    from: host.to_string(),
                    code: code.to_string(),
                },
            )
            .await;
        if !delivered {
            return Err(LobbyError::TargetUnreachable(friend.to_string()));
        }

        self.mailer.send_invitation(host, friend, code);
        Ok(())
    }

    /// Relays a chat line to every member of the sender's lobby,
    /// sender included.
    pub async fn send_chat(&self, username: &str, text: &str) -> Result<(), LobbyError> {
        let recipients = {
            let lobbies = self.lobbies.read().await;
            let code = find_lobby_of(&lobbies, username).ok_or(LobbyError::NotInLobby)?;
            lobbies
                .get(&code)
                .map(|lobby| lobby.ordered_members())
                .unwrap_or_default()
        };

        self.notify(
            &recipients,
            ServerEvent::ChatMessage {
                from: username.to_string(),
                text: text.to_string(),
            },
        )
        .await;
        Ok(())
    }

    /// Open public lobbies, for the lobby browser.
    pub async fn get_public_lobbies(&self) -> Vec<LobbySnapshot> {
        let lobbies = self.lobbies.read().await;
        let mut listed: Vec<_> = lobbies
            .values()
            .filter(|lobby| lobby.visibility == LobbyVisibility::Public && !lobby.started)
            .map(Lobby::snapshot)
            .collect();
        listed.sort_by(|a, b| a.code.cmp(&b.code));
        listed
    }

    pub async fn get_lobby_for_user(&self, username: &str) -> Option<LobbySnapshot> {
        let lobbies = self.lobbies.read().await;
        let code = find_lobby_of(&lobbies, username)?;
        lobbies.get(&code).map(Lobby::snapshot)
    }

    /// Expiry-aware ban projection; never clears the counter.
    pub async fn get_ban_info(&self, username: &str) -> BanStatus {
        self.reports.ban_status(username).await
    }

    /// Disconnect handling: a best-effort leave plus channel unbind.
    /// Safe to call after a voluntary leave for the same session.
    pub async fn handle_disconnect(&self, username: &str) {
        if let Err(LobbyError::NotInLobby) = self.leave_lobby(username).await {
            // Already out; nothing to do.
        }
        self.sessions.unbind(username).await;
    }

    async fn notify(&self, usernames: &[String], event: ServerEvent) {
        for username in usernames {
            self.sessions.send(username, event.clone()).await;
        }
    }

    fn resolve_avatar(&self, username: &str) -> Option<String> {
        let profile = self
            .profiles
            .user_id_by_username(username)
            .and_then(|id| self.profiles.public_profile(id));
        match profile {
            Ok(profile) => profile.avatar,
            Err(err) => {
                warn!("Profile lookup for {} failed: {}", username, err);
                None
            }
        }
    }
}

/// Drops a membership left behind in a lobby whose game has started.
/// Gameplay state lives in the match registry, so a stale started-lobby
/// membership must not pin a user out of new lobbies.
fn scrub_started_membership(lobbies: &mut HashMap<String, Lobby>, username: &str) {
    let Some(code) = find_lobby_of(lobbies, username) else {
        return;
    };
    let Some(lobby) = lobbies.get_mut(&code) else {
        return;
    };
    if !lobby.started {
        return;
    }
    lobby.members.remove(username);
    if lobby.members.is_empty() {
        lobbies.remove(&code);
        info!("Lobby {} removed (all players moved on)", code);
    }
}

fn find_lobby_of(lobbies: &HashMap<String, Lobby>, username: &str) -> Option<String> {
    lobbies
        .values()
        .find(|lobby| lobby.members.contains_key(username))
        .map(|lobby| lobby.code.clone())
}

/// Random unused code; the caller holds the registry write lock, so the
/// check-and-claim loop cannot race another creator.
fn generate_code(lobbies: &HashMap<String, Lobby>) -> Result<String, LobbyError> {
    let mut rng = rand::thread_rng();
    for _ in 0..CODE_ATTEMPTS {
        let code: String = (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        if !lobbies.contains_key(&code) {
            return Ok(code);
        }
    }
    Err(LobbyError::CodeGeneration)
}
