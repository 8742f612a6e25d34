//! crates/chess_trainer_core/src/validation.rs
//!
//! Field-level validation of raw game and move payloads.
//!
//! Payloads arrive as loosely typed JSON. Every check records its message
//! against the field name instead of bailing out, so a client gets the whole
//! list of problems in one response.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{GameHeader, Move, DEFAULT_ROUND};

/// Messages keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Largest integer the store's integer columns can hold.
const MAX_INTEGER: i64 = 2_147_483_647;

/// Date layouts accepted for the `date` header: ISO and the PGN tag layout.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y.%m.%d"];

/// Errors for one entry of `moves_details`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveErrors {
    /// Position of the move in the submitted list.
    pub index: usize,
    pub errors: FieldErrors,
}

/// Everything wrong with a game submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub header: FieldErrors,
    #[serde(rename = "moves_details", skip_serializing_if = "Vec::is_empty")]
    pub moves: Vec<MoveErrors>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.moves.is_empty()
    }

    /// Errors reported for the move at `index`, if any.
    pub fn move_errors(&self, index: usize) -> Option<&FieldErrors> {
        self.moves
            .iter()
            .find(|entry| entry.index == index)
            .map(|entry| &entry.errors)
    }
}

/// Header data that passed validation, before the owner and stats are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedHeader {
    pub game_id: String,
    pub header: GameHeader,
    pub moves_text: String,
    pub moves_count: String,
    pub game_time: String,
}

/// Validates the top-level game fields.
pub fn validate_header(raw: &Map<String, Value>) -> Result<ValidatedHeader, FieldErrors> {
    let mut fields = FieldReader::new(raw);

    let game_id = fields.identifier("game_id", 50);
    let event = fields.tag_text("event", 200);
    let site = fields.tag_text("site", 100);
    let date = fields.date("date");
    let round = fields.optional_tag_text("round", 10, DEFAULT_ROUND);
    let white = fields.tag_text("white", 100);
    let black = fields.tag_text("black", 100);
    let result = fields.tag_text("result", 50);
    let selected_tips = fields.required_text("selected_tips", 50);
    let moves_text = fields.required_text("moves", usize::MAX);
    let moves_count = fields.required_text("moves_count", usize::MAX);
    let game_time = fields.required_text("game_time", 50);

    fields.finish()?;

    Ok(ValidatedHeader {
        game_id,
        header: GameHeader {
            event,
            site,
            date,
            round,
            white,
            black,
            result,
            selected_tips,
        },
        moves_text,
        moves_count,
        game_time,
    })
}

/// Validates one entry of `moves_details`.
///
/// No `Move` is built unless every field checks out.
pub fn validate_move(index: usize, raw: &Value) -> Result<Move, MoveErrors> {
    let Some(object) = raw.as_object() else {
        let mut errors = FieldErrors::new();
        errors.insert(
            "non_field_errors".to_string(),
            vec!["Invalid data. Expected a dictionary.".to_string()],
        );
        return Err(MoveErrors { index, errors });
    };

    let mut fields = FieldReader::new(object);

    let move_order_number = fields.integer("move_order_number", 1);
    let move_from = fields.required_text("move_from", 10);
    let move_to = fields.required_text("move_to", 10);
    let tip_received = fields.boolean("tip_received");
    let tip_followed = fields.boolean("tip_followed");
    let best_move = fields.optional_text("best_move", 10);
    let move_time_spend = fields.integer("move_time_spend", 0);
    let cp_diff = fields.centipawns("cp_diff");
    let first_pos_cp = fields.centipawns("first_pos_cp");
    let second_pos_cp = fields.centipawns("second_pos_cp");

    if tip_followed && !tip_received {
        fields.error(
            "tip_followed",
            "A tip cannot be followed when no tip was received.",
        );
    }

    fields
        .finish()
        .map_err(|errors| MoveErrors { index, errors })?;

    Ok(Move {
        move_order_number,
        move_from,
        move_to,
        tip_received,
        tip_followed,
        best_move,
        move_time_spend,
        cp_diff,
        first_pos_cp,
        second_pos_cp,
    })
}

//=========================================================================================
// Field Reader
//=========================================================================================

/// Reads typed values out of a JSON object while accumulating errors.
///
/// Each accessor returns a placeholder when the field is invalid; callers
/// must check [`FieldReader::finish`] before using any value.
struct FieldReader<'a> {
    raw: &'a Map<String, Value>,
    errors: FieldErrors,
}

impl<'a> FieldReader<'a> {
    fn new(raw: &'a Map<String, Value>) -> Self {
        Self {
            raw,
            errors: FieldErrors::new(),
        }
    }

    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    fn finish(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    /// `None` for absent and for explicit `null`.
    fn present(&self, field: &str) -> Option<&'a Value> {
        self.raw.get(field).filter(|value| !value.is_null())
    }

    fn text(&mut self, field: &str, max_len: usize, required: bool) -> Option<String> {
        let Some(value) = self.present(field) else {
            if required {
                self.error(field, "This field is required.");
            }
            return None;
        };
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => {
                self.error(field, "Not a valid string.");
                return None;
            }
        };
        if required && text.is_empty() {
            self.error(field, "This field may not be blank.");
            return None;
        }
        if text.contains('\0') {
            self.error(field, "Null characters are not allowed.");
            return None;
        }
        if text.chars().count() > max_len {
            self.error(
                field,
                format!("Ensure this field has no more than {max_len} characters."),
            );
            return None;
        }
        Some(text)
    }

    fn required_text(&mut self, field: &str, max_len: usize) -> String {
        self.text(field, max_len, true).unwrap_or_default()
    }

    /// Blank is allowed and is the default.
    fn optional_text(&mut self, field: &str, max_len: usize) -> String {
        self.text(field, max_len, false).unwrap_or_default()
    }

    /// A required value that is also used as a download file name.
    fn identifier(&mut self, field: &str, max_len: usize) -> String {
        let text = self.required_text(field, max_len);
        if text.chars().any(|c| c.is_control() || c == '"' || c == '\\') {
            self.error(
                field,
                "Control characters, quotes and backslashes are not allowed in this field.",
            );
        }
        text
    }

    /// A required value that ends up inside a PGN tag line.
    fn tag_text(&mut self, field: &str, max_len: usize) -> String {
        let text = self.required_text(field, max_len);
        self.reject_line_breaks(field, &text);
        text
    }

    fn optional_tag_text(&mut self, field: &str, max_len: usize, default: &str) -> String {
        match self.text(field, max_len, false) {
            Some(text) if !text.is_empty() => {
                self.reject_line_breaks(field, &text);
                text
            }
            _ => default.to_string(),
        }
    }

    fn reject_line_breaks(&mut self, field: &str, text: &str) {
        if text.contains(['\n', '\r']) {
            self.error(field, "Line breaks are not allowed in this field.");
        }
    }

    fn integer(&mut self, field: &str, min: u32) -> u32 {
        let Some(value) = self.present(field) else {
            self.error(field, "This field is required.");
            return 0;
        };
        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        let Some(number) = parsed else {
            self.error(field, "A valid integer is required.");
            return 0;
        };
        if number < i64::from(min) {
            self.error(
                field,
                format!("Ensure this value is greater than or equal to {min}."),
            );
            return 0;
        }
        if number > MAX_INTEGER {
            self.error(
                field,
                format!("Ensure this value is less than or equal to {MAX_INTEGER}."),
            );
            return 0;
        }
        u32::try_from(number).unwrap_or_default()
    }

    /// Absent means `false`.
    fn boolean(&mut self, field: &str) -> bool {
        let Some(value) = self.present(field) else {
            return false;
        };
        match value {
            Value::Bool(b) => *b,
            Value::Number(n) if n.as_u64() == Some(1) => true,
            Value::Number(n) if n.as_u64() == Some(0) => false,
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    self.error(field, "Must be a valid boolean.");
                    false
                }
            },
            _ => {
                self.error(field, "Must be a valid boolean.");
                false
            }
        }
    }

    fn date(&mut self, field: &str) -> NaiveDate {
        let text = self.required_text(field, 10);
        if self.errors.contains_key(field) {
            return NaiveDate::default();
        }
        let parsed = DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(&text, format).ok());
        match parsed {
            Some(date) => date,
            None => {
                self.error(
                    field,
                    "Date has wrong format. Use one of these formats instead: YYYY-MM-DD, YYYY.MM.DD.",
                );
                NaiveDate::default()
            }
        }
    }

    /// Optional signed number carried as text; blank when unavailable.
    fn centipawns(&mut self, field: &str) -> String {
        let text = self.optional_text(field, 50);
        if !text.is_empty() && !text.parse::<f64>().is_ok_and(f64::is_finite) {
            self.error(field, "A valid number is required.");
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header_json() -> Value {
        json!({
            "game_id": "g-1",
            "event": "Club Ch.",
            "site": "Online",
            "date": "2024-01-05",
            "round": "3",
            "white": "Alice",
            "black": "Bob",
            "result": "1-0",
            "selected_tips": "beginner",
            "moves": "1. e4 e5",
            "moves_count": "2",
            "game_time": "00:05:10",
        })
    }

    fn header_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn accepts_complete_header() {
        let header = validate_header(&header_map(header_json())).unwrap();
        assert_eq!(header.game_id, "g-1");
        assert_eq!(header.header.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(header.header.round, "3");
        assert_eq!(header.moves_text, "1. e4 e5");
    }

    #[test]
    fn accepts_pgn_style_date() {
        let mut raw = header_json();
        raw["date"] = json!("2024.01.05");
        let header = validate_header(&header_map(raw)).unwrap();
        assert_eq!(header.header.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn missing_round_defaults_to_dash() {
        let mut raw = header_map(header_json());
        raw.remove("round");
        assert_eq!(validate_header(&raw).unwrap().header.round, "-");
    }

    #[test]
    fn numeric_round_is_accepted_as_text() {
        let mut raw = header_json();
        raw["round"] = json!(7);
        assert_eq!(validate_header(&header_map(raw)).unwrap().header.round, "7");
    }

    #[test]
    fn collects_every_header_error() {
        let mut raw = header_map(header_json());
        raw.remove("event");
        raw.insert("date".into(), json!("05/01/2024"));
        raw.insert("result".into(), json!(""));
        raw.insert("white".into(), json!(true));

        let errors = validate_header(&raw).unwrap_err();
        assert_eq!(errors["event"], vec!["This field is required."]);
        assert!(errors["date"][0].starts_with("Date has wrong format"));
        assert_eq!(errors["result"], vec!["This field may not be blank."]);
        assert_eq!(errors["white"], vec!["Not a valid string."]);
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn rejects_overlong_and_multiline_tags() {
        let mut raw = header_json();
        raw["round"] = json!("12345678901");
        raw["site"] = json!("Online\n[Result \"0-1\"]");
        let errors = validate_header(&header_map(raw)).unwrap_err();
        assert_eq!(
            errors["round"],
            vec!["Ensure this field has no more than 10 characters."]
        );
        assert_eq!(
            errors["site"],
            vec!["Line breaks are not allowed in this field."]
        );
    }

    #[test]
    fn game_id_must_be_usable_as_a_file_name() {
        for bad in ["g\u{7}1", "a\"b", "a\\b", "tab\there"] {
            let mut raw = header_json();
            raw["game_id"] = json!(bad);
            let errors = validate_header(&header_map(raw)).unwrap_err();
            assert_eq!(errors["game_id"].len(), 1, "game_id {bad:?}");
            assert!(errors["game_id"][0].starts_with("Control characters"));
        }

        let mut raw = header_json();
        raw["game_id"] = json!("partie-d'échecs 7");
        assert_eq!(
            validate_header(&header_map(raw)).unwrap().game_id,
            "partie-d'échecs 7"
        );
    }

    #[test]
    fn null_characters_are_rejected_everywhere() {
        let mut raw = header_json();
        raw["event"] = json!("Club\u{0}Ch.");
        raw["moves"] = json!("1. e4\u{0}");
        let errors = validate_header(&header_map(raw)).unwrap_err();
        assert_eq!(errors["event"], vec!["Null characters are not allowed."]);
        assert_eq!(errors["moves"], vec!["Null characters are not allowed."]);

        let err = validate_move(
            0,
            &json!({
                "move_order_number": 1,
                "move_from": "e2",
                "move_to": "e4",
                "best_move": "e4\u{0}",
                "move_time_spend": 0,
            }),
        )
        .unwrap_err();
        assert_eq!(err.errors["best_move"], vec!["Null characters are not allowed."]);
    }

    #[test]
    fn accepts_move_with_defaults() {
        let mv = validate_move(
            0,
            &json!({
                "move_order_number": 1,
                "move_from": "e2",
                "move_to": "e4",
                "move_time_spend": 0,
            }),
        )
        .unwrap();
        assert!(!mv.tip_received);
        assert!(!mv.tip_followed);
        assert_eq!(mv.best_move, "");
        assert_eq!(mv.cp_diff, "");
    }

    #[test]
    fn accepts_string_encoded_numbers_and_signed_cp() {
        let mv = validate_move(
            2,
            &json!({
                "move_order_number": "3",
                "move_from": "g1",
                "move_to": "f3",
                "tip_received": "true",
                "tip_followed": true,
                "best_move": "Nf3",
                "move_time_spend": "12",
                "cp_diff": "-35",
                "first_pos_cp": "20",
                "second_pos_cp": "-15.5",
            }),
        )
        .unwrap();
        assert_eq!(mv.move_order_number, 3);
        assert_eq!(mv.move_time_spend, 12);
        assert!(mv.tip_received && mv.tip_followed);
        assert_eq!(mv.cp_diff, "-35");
    }

    #[test]
    fn followed_without_received_is_rejected() {
        let err = validate_move(
            4,
            &json!({
                "move_order_number": 5,
                "move_from": "e7",
                "move_to": "e5",
                "tip_received": false,
                "tip_followed": true,
                "move_time_spend": 1,
            }),
        )
        .unwrap_err();
        assert_eq!(err.index, 4);
        assert!(err.errors.contains_key("tip_followed"));
    }

    #[test]
    fn reports_every_bad_move_field() {
        let err = validate_move(
            1,
            &json!({
                "move_order_number": 0,
                "move_to": "e4",
                "move_time_spend": -1,
                "tip_received": "maybe",
                "cp_diff": "lots",
            }),
        )
        .unwrap_err();
        assert_eq!(
            err.errors["move_order_number"],
            vec!["Ensure this value is greater than or equal to 1."]
        );
        assert_eq!(err.errors["move_from"], vec!["This field is required."]);
        assert_eq!(
            err.errors["move_time_spend"],
            vec!["Ensure this value is greater than or equal to 0."]
        );
        assert_eq!(err.errors["tip_received"], vec!["Must be a valid boolean."]);
        assert_eq!(err.errors["cp_diff"], vec!["A valid number is required."]);
    }

    #[test]
    fn non_object_move_is_rejected() {
        let err = validate_move(0, &json!("e2e4")).unwrap_err();
        assert!(err.errors.contains_key("non_field_errors"));
    }
}
