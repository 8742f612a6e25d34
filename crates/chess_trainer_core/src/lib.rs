pub mod builder;
pub mod domain;
pub mod pgn;
pub mod ports;
pub mod stats;
pub mod validation;

pub use builder::{build_game, create_game, CreateGameError, GameSubmission};
pub use domain::{Game, GameHeader, Move, NewGame};
pub use ports::{GameRepository, PortError, PortResult};
pub use stats::TipStats;
pub use validation::{FieldErrors, MoveErrors, ValidationReport};
