use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::ValidationError;

use crate::{
    dto::validation::validate_finale_answer,
    engine::events::ScoreTotals,
    state::game::PowerUpKind,
};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from contestant WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContestantInboundMessage {
    /// First message of every connection.
    Identification { id: Uuid },
    Buzz,
    UsePowerUp { power_up: PowerUpKind },
    Wager { amount: i64 },
    FinaleAnswer { answer: String },
    #[serde(other)]
    Unknown,
}

/// Why an inbound frame was refused.
#[derive(Debug, Error)]
pub enum InboundError {
    /// Not JSON, or not one of the known shapes.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Well-formed but semantically invalid.
    #[error("invalid message: {0}")]
    Invalid(ValidationError),
}

impl ContestantInboundMessage {
    /// Parse and validate a text frame.
    pub fn from_json_str(text: &str) -> Result<Self, InboundError> {
        let message: Self = serde_json::from_str(text)?;
        if let Self::FinaleAnswer { answer } = &message {
            validate_finale_answer(answer).map_err(InboundError::Invalid)?;
        }
        Ok(message)
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Messages pushed to contestant WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContestantOutboundMessage {
    /// Identification accepted.
    Identified { id: Uuid, name: String, color: String },
    BuzzEnabled,
    BuzzDisabled,
    /// This contestant answers.
    BuzzWinner,
    /// Someone else was faster.
    BuzzLoser,
    PowerUpEnabled { power_up: PowerUpKind },
    PowerUpsDisabled { power_ups: Vec<PowerUpKind> },
    ScoreChanged { score: i64, hits: u32, misses: u32 },
    WagerAccepted { amount: u32 },
    /// Wager outside `[min, max]`.
    InvalidWager { min: i64, max: i64 },
    /// The last action was refused.
    Rejected { message: String },
}

impl From<ScoreTotals> for ContestantOutboundMessage {
    fn from(totals: ScoreTotals) -> Self {
        Self::ScoreChanged {
            score: totals.score,
            hits: totals.hits,
            misses: totals.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_messages_are_tagged_by_type() {
        let parsed = ContestantInboundMessage::from_json_str(
            r#"{"type":"use_power_up","power_up":"freeze"}"#,
        )
        .unwrap();
        assert!(matches!(
            parsed,
            ContestantInboundMessage::UsePowerUp {
                power_up: PowerUpKind::Freeze
            }
        ));
        let parsed = ContestantInboundMessage::from_json_str(r#"{"type":"dance"}"#).unwrap();
        assert!(matches!(parsed, ContestantInboundMessage::Unknown));
    }

    #[test]
    fn blank_finale_answers_are_refused() {
        let result =
            ContestantInboundMessage::from_json_str(r#"{"type":"finale_answer","answer":"  "}"#);
        assert!(matches!(result, Err(InboundError::Invalid(_))));
        assert!(matches!(
            ContestantInboundMessage::from_json_str("{"),
            Err(InboundError::Malformed(_))
        ));
    }

    #[test]
    fn outbound_messages_use_snake_case_tags() {
        let json = serde_json::to_value(ContestantOutboundMessage::InvalidWager {
            min: 100,
            max: 500,
        })
        .unwrap();
        assert_eq!(json["type"], "invalid_wager");
        assert_eq!(json["max"], 500);
    }
}
