//! Renders a stored game as a PGN file.

use std::borrow::Cow;

use crate::domain::Game;

/// Media type used when a PGN export is downloaded.
pub const MEDIA_TYPE: &str = "application/octet-stream";

/// Layout of the `Date` tag.
const PGN_DATE_FORMAT: &str = "%Y.%m.%d";

/// Suggested download name for an exported game.
pub fn file_name(game_id: &str) -> String {
    format!("{game_id}.PGN")
}

/// Writes the seven-tag roster, a blank line, and the movetext.
///
/// Only the game header and its pre-rendered movetext are used; the move
/// records are not consulted.
pub fn render(game: &Game) -> String {
    let header = &game.header;
    let date = header.date.format(PGN_DATE_FORMAT).to_string();
    let tags: [(&str, &str); 7] = [
        ("Event", &header.event),
        ("Site", &header.site),
        ("Date", &date),
        ("Round", &header.round),
        ("White", &header.white),
        ("Black", &header.black),
        ("Result", &header.result),
    ];

    let mut out = String::with_capacity(256 + game.moves_text.len());
    for (name, value) in tags {
        out.push_str(&format!("[{name} \"{}\"]\n", escape_tag_value(value)));
    }
    out.push('\n');
    out.push_str(&game.moves_text);
    out.push('\n');
    out
}

// PGN string tokens escape `\` and `"` with a backslash.
fn escape_tag_value(value: &str) -> Cow<'_, str> {
    if !value.contains(['\\', '"']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        if matches!(c, '\\' | '"') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}
