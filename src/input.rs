use crate::constants::MAX_PLAYER_NAME_LEN;

/// Name-entry rules: surrounding whitespace dropped, at most 20 characters.
pub fn sanitize_player_name(value: &str) -> String {
    value.trim().chars().take(MAX_PLAYER_NAME_LEN).collect()
}
