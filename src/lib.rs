//! Authoritative real-time crash wagering engine.
//!
//! A single `RoundActor` (see [`round`]) is the only thing that ever
//! mutates round-internal state: bet book, curves, sequence counter. The
//! [`gateway`] translates socket traffic into calls against the actor's
//! handle; the [`rng`] module derives crash points deterministically and
//! verifiably from rotatable seeds; [`wallet`] and [`persistence`] are the
//! ports out to the durable stores that own money and history.

pub mod bet;
pub mod bet_book;
pub mod cashout;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod money;
pub mod persistence;
pub mod rate_limit;
pub mod rng;
pub mod round;
pub mod wallet;
