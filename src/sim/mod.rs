//! Game logic
//!
//! Everything here is platform-free and deterministic:
//! - Time comes in as millisecond timestamps on each input
//! - Randomness comes from the seeded run RNG only
//! - Devices are reached through [`crate::platform::SensorHost`]

pub mod accumulator;
pub mod autoplay;
pub mod detect;
pub mod game;
pub mod levels;

pub use accumulator::{Accumulator, AccumulatorMode, AccumulatorState, TickClock};
pub use game::{EventLog, Game, GameEvent, GameObserver, GamePhase, GameState, final_product};
pub use levels::{Level, LevelContext, LevelDescriptor, LevelKind, LevelView, Reveal, Signal, Step};
