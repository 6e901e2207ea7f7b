//! Timing, arbitration, power-up and scoring core of a live question.
//!
//! Everything in here is synchronous and driven by an explicit clock so it can be tested
//! without a runtime. [`round::RoundEngine`] ties the pieces together; the async plumbing
//! lives in [`crate::state::coordinator`].

pub mod alarms;
pub mod arbiter;
pub mod countdown;
mod error;
pub mod events;
pub mod lifecycle;
pub mod power_ups;
pub mod round;
pub mod scoring;
pub mod wager;

pub use self::error::EngineError;
pub use self::round::{
    AnswerAttempt, EngineSettings, Judgment, QuestionSetup, QuestionVariant, RoundEngine,
};
