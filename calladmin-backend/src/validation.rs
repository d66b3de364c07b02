/// Input validation for the game server plugin's requests
use thiserror::Error;

use crate::helpers::strip_color_codes;

const MAX_PLAYER_ID_LEN: usize = 64;
const MAX_PLAYER_NAME_LEN: usize = 64;
const MAX_REASON_LEN: usize = 256;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Missing data: a reason is required")]
    ReasonEmpty,

    #[error("Reason too long (max 256 characters, got {0})")]
    ReasonTooLong(usize),

    #[error("Player id cannot be empty")]
    PlayerIdEmpty,

    #[error("Player id too long (max 64 characters, got {0})")]
    PlayerIdTooLong(usize),

    #[error("Player name cannot be empty")]
    PlayerNameEmpty,

    #[error("Player name too long (max 64 characters, got {0})")]
    PlayerNameTooLong(usize),
}

/// Validates a reason and returns it with color codes removed
///
/// Rules:
/// - Cannot be empty once color codes and surrounding whitespace are removed
/// - Max 256 characters
pub fn validate_reason(reason: &str) -> Result<String, ValidationError> {
    let stripped = strip_color_codes(reason);
    let stripped = stripped.trim();

    if stripped.is_empty() {
        return Err(ValidationError::ReasonEmpty);
    }

    let len = stripped.chars().count();
    if len > MAX_REASON_LEN {
        return Err(ValidationError::ReasonTooLong(len));
    }

    Ok(stripped.to_string())
}

/// Validates an opaque player id (guid, slot or database id)
pub fn validate_player_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::PlayerIdEmpty);
    }

    if id.len() > MAX_PLAYER_ID_LEN {
        return Err(ValidationError::PlayerIdTooLong(id.len()));
    }

    Ok(())
}

/// Validates a player display name
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    if strip_color_codes(name).trim().is_empty() {
        return Err(ValidationError::PlayerNameEmpty);
    }

    let len = name.chars().count();
    if len > MAX_PLAYER_NAME_LEN {
        return Err(ValidationError::PlayerNameTooLong(len));
    }

    Ok(())
}
