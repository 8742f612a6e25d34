//! crates/chess_trainer_core/src/builder.rs
//!
//! Turns a raw game submission into a stored game aggregate.
//!
//! Validation happens entirely up front; the repository is only called once
//! both the header and every move have passed, and it receives the whole
//! aggregate in a single `create` call.

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::{Game, Move, NewGame};
use crate::ports::{GameRepository, PortError};
use crate::stats::TipStats;
use crate::validation::{
    validate_header, validate_move, FieldErrors, MoveErrors, ValidationReport,
};

/// A game as submitted by a client: header fields plus `moves_details`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameSubmission {
    #[serde(default)]
    pub moves_details: Value,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateGameError {
    #[error("game submission failed validation")]
    Invalid(ValidationReport),
    #[error(transparent)]
    Port(#[from] PortError),
}

/// Validates a submission and assembles the aggregate, computing tip stats.
pub fn build_game(
    owner_id: Uuid,
    submission: &GameSubmission,
) -> Result<NewGame, ValidationReport> {
    let mut report = ValidationReport::default();

    let header = validate_header(&submission.fields).map_err(|errors| report.header = errors);

    let moves = match &submission.moves_details {
        Value::Null => Ok(Vec::new()),
        Value::Array(raw_moves) => {
            validate_moves(raw_moves).map_err(|errors| report.moves = errors)
        }
        other => {
            report.header.insert(
                "moves_details".to_string(),
                vec![format!(
                    "Expected a list of items but got type \"{}\".",
                    json_type_name(other)
                )],
            );
            Err(())
        }
    };

    let (Ok(header), Ok(moves)) = (header, moves) else {
        return Err(report);
    };

    let stats = TipStats::from_moves(&moves);
    Ok(NewGame {
        game_id: header.game_id,
        owner_id,
        header: header.header,
        tips_found_percent: stats.found_percent(),
        tips_received_count: stats.received,
        moves_text: header.moves_text,
        moves_count: header.moves_count,
        game_time: header.game_time,
        moves,
    })
}

/// Validates and persists a submission; the repository is untouched on
/// validation failure.
pub async fn create_game(
    repo: &dyn GameRepository,
    owner_id: Uuid,
    submission: &GameSubmission,
) -> Result<Game, CreateGameError> {
    let new_game = build_game(owner_id, submission).map_err(CreateGameError::Invalid)?;
    Ok(repo.create(new_game).await?)
}

/// Validates each move, then checks that order numbers are unique and
/// strictly increasing across the batch.
fn validate_moves(raw_moves: &[Value]) -> Result<Vec<Move>, Vec<MoveErrors>> {
    let mut errors: BTreeMap<usize, FieldErrors> = BTreeMap::new();
    let mut moves = Vec::with_capacity(raw_moves.len());
    let mut seen = HashSet::new();
    let mut last_order = None;

    for (index, raw) in raw_moves.iter().enumerate() {
        match validate_move(index, raw) {
            Ok(mv) => {
                let order = mv.move_order_number;
                if !seen.insert(order) {
                    errors.entry(index).or_default().insert(
                        "move_order_number".to_string(),
                        vec![format!("Duplicate move order number {order}.")],
                    );
                } else if let Some(previous) = last_order.filter(|previous| order < *previous) {
                    errors.entry(index).or_default().insert(
                        "move_order_number".to_string(),
                        vec![format!(
                            "Move order number {order} must be greater than the preceding {previous}."
                        )],
                    );
                }
                last_order = Some(last_order.map_or(order, |previous: u32| previous.max(order)));
                moves.push(mv);
            }
            Err(move_errors) => {
                errors.insert(index, move_errors.errors);
            }
        }
    }

    if errors.is_empty() {
        Ok(moves)
    } else {
        Err(errors
            .into_iter()
            .map(|(index, errors)| MoveErrors { index, errors })
            .collect())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortResult;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every game it is asked to store.
    #[derive(Default)]
    struct RecordingRepo {
        created: Mutex<Vec<NewGame>>,
    }

    #[async_trait]
    impl GameRepository for RecordingRepo {
        async fn list_by_owner(&self, _owner_id: Uuid) -> PortResult<Vec<Game>> {
            Ok(Vec::new())
        }

        async fn get_by_owner(&self, _owner_id: Uuid, game_id: &str) -> PortResult<Game> {
            Err(PortError::NotFound(game_id.to_string()))
        }

        async fn get_by_id(&self, game_id: &str) -> PortResult<Game> {
            Err(PortError::NotFound(game_id.to_string()))
        }

        async fn create(&self, game: NewGame) -> PortResult<Game> {
            self.created.lock().unwrap().push(game.clone());
            Ok(game.into_game(Utc::now()))
        }
    }

    fn raw_move(order: u32, tip_received: bool, tip_followed: bool) -> Value {
        json!({
            "move_order_number": order,
            "move_from": "e2",
            "move_to": "e4",
            "tip_received": tip_received,
            "tip_followed": tip_followed,
            "best_move": "e4",
            "move_time_spend": 4,
            "cp_diff": "",
            "first_pos_cp": "",
            "second_pos_cp": "",
        })
    }

    fn submission(moves: Vec<Value>) -> GameSubmission {
        serde_json::from_value(json!({
            "game_id": "game-42",
            "event": "Club Ch.",
            "site": "Online",
            "date": "2024-01-05",
            "round": "3",
            "white": "Alice",
            "black": "Bob",
            "result": "1-0",
            "selected_tips": "all",
            "moves": "1. e4 e5 2. Nf3 Nc6",
            "moves_count": "4",
            "game_time": "10:00",
            "moves_details": moves,
        }))
        .unwrap()
    }

    #[test]
    fn derives_tip_stats_from_moves() {
        let sub = submission(vec![
            raw_move(1, true, true),
            raw_move(2, true, false),
            raw_move(3, false, false),
            raw_move(4, true, true),
        ]);
        let game = build_game(Uuid::new_v4(), &sub).unwrap();
        assert_eq!(game.tips_received_count, 3);
        assert!((game.tips_found_percent - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(game.moves.len(), 4);
    }

    #[test]
    fn no_moves_gives_zero_stats() {
        let mut sub = submission(Vec::new());
        sub.moves_details = Value::Null;
        let game = build_game(Uuid::new_v4(), &sub).unwrap();
        assert_eq!(game.tips_received_count, 0);
        assert_eq!(game.tips_found_percent, 0.0);
        assert!(game.moves.is_empty());
    }

    #[test]
    fn ignores_client_supplied_stats() {
        let mut sub = submission(vec![raw_move(1, true, false)]);
        sub.fields.insert("tips_found_percent".into(), json!(100.0));
        sub.fields.insert("tips_received_count".into(), json!(9));
        let game = build_game(Uuid::new_v4(), &sub).unwrap();
        assert_eq!(game.tips_received_count, 1);
        assert_eq!(game.tips_found_percent, 0.0);
    }

    #[test]
    fn rejects_duplicate_order_number_at_its_index() {
        let sub = submission(vec![
            raw_move(1, false, false),
            raw_move(2, false, false),
            raw_move(2, false, false),
        ]);
        let report = build_game(Uuid::new_v4(), &sub).unwrap_err();
        assert!(report.header.is_empty());
        assert_eq!(report.moves.len(), 1);
        let errors = report.move_errors(2).unwrap();
        assert_eq!(
            errors["move_order_number"],
            vec!["Duplicate move order number 2."]
        );
    }

    #[test]
    fn rejects_out_of_order_number_at_its_index() {
        let sub = submission(vec![
            raw_move(1, false, false),
            raw_move(5, false, false),
            raw_move(3, false, false),
        ]);
        let report = build_game(Uuid::new_v4(), &sub).unwrap_err();
        assert!(report.move_errors(1).is_none());
        assert!(report.move_errors(2).unwrap().contains_key("move_order_number"));
    }

    #[test]
    fn gaps_in_order_numbers_are_allowed() {
        let sub = submission(vec![
            raw_move(1, false, false),
            raw_move(4, false, false),
            raw_move(9, false, false),
        ]);
        assert!(build_game(Uuid::new_v4(), &sub).is_ok());
    }

    #[test]
    fn combines_header_and_move_errors() {
        let mut sub = submission(vec![raw_move(1, false, false), raw_move(2, false, true)]);
        sub.fields.remove("white");
        sub.fields.insert("date".into(), json!("not a date"));

        let report = build_game(Uuid::new_v4(), &sub).unwrap_err();
        assert!(report.header.contains_key("white"));
        assert!(report.header.contains_key("date"));
        assert!(report.move_errors(0).is_none());
        assert!(report.move_errors(1).unwrap().contains_key("tip_followed"));

        let body = serde_json::to_value(&report).unwrap();
        assert!(body["header"]["white"].is_array());
        assert_eq!(body["moves_details"][0]["index"], 1);
    }

    #[test]
    fn game_id_with_control_character_is_rejected() {
        let mut sub = submission(vec![raw_move(1, false, false)]);
        sub.fields.insert("game_id".into(), json!("g\u{7}1"));
        let report = build_game(Uuid::new_v4(), &sub).unwrap_err();
        assert!(report.header.contains_key("game_id"));
        assert!(report.moves.is_empty());
    }

    #[test]
    fn non_list_moves_details_is_reported() {
        let mut sub = submission(Vec::new());
        sub.moves_details = json!({"move_order_number": 1});
        let report = build_game(Uuid::new_v4(), &sub).unwrap_err();
        assert_eq!(
            report.header["moves_details"],
            vec!["Expected a list of items but got type \"dict\"."]
        );
    }

    #[tokio::test]
    async fn persists_whole_aggregate_once() {
        let repo = RecordingRepo::default();
        let owner = Uuid::new_v4();
        let sub = submission(vec![raw_move(1, true, true), raw_move(2, false, false)]);

        let game = create_game(&repo, owner, &sub).await.unwrap();

        assert_eq!(game.owner_id, owner);
        assert_eq!(game.game_id, "game-42");
        assert_eq!(game.tips_found_percent, 100.0);
        let created = repo.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].moves.len(), 2);
    }

    #[tokio::test]
    async fn invalid_move_leaves_repository_untouched() {
        let repo = RecordingRepo::default();
        let mut bad = raw_move(3, false, false);
        bad["move_time_spend"] = json!("forever");
        let sub = submission(vec![raw_move(1, false, false), raw_move(2, true, true), bad]);

        let err = create_game(&repo, Uuid::new_v4(), &sub).await.unwrap_err();

        match err {
            CreateGameError::Invalid(report) => {
                assert!(report.move_errors(2).unwrap().contains_key("move_time_spend"));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert!(repo.created.lock().unwrap().is_empty());
    }
}
