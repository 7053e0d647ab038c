//! Server-side runtime for a six-player hexagonal peg-jumping game.
//!
//! The crate is split along the lifecycle of a play session: the
//! [`lobby_manager`] gathers players into lobbies, the
//! [`match_manager`] runs started games through the [`game`] engine on
//! a star-shaped [`board`], and the [`session`] registry carries the
//! one-way notification channel bound to each connected user. Account
//! storage, result persistence and invitation email live behind the
//! [`external`] traits.

pub mod board;
pub mod error;
pub mod external;
pub mod game;
pub mod lobby_manager;
pub mod match_manager;
pub mod moderation;
pub mod session;
pub mod utils;
