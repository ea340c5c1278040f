//! Provably-fair RNG component: pure crash-point derivation (`derive`),
//! seed storage and rotation (`seed`), and the `verify` wire operation
//! (`verify`).

pub mod derive;
pub mod seed;
pub mod verify;

pub use derive::{commitment_of, commitment_matches, generate_crash_point};
pub use seed::{RngEngine, RotatedSeed, SeedInfo};
