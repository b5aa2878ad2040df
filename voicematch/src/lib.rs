//! Voice-reply matching.
//!
//! Given a reply the chat model just produced, decide whether one of the
//! pre-recorded voice clips says the same thing closely enough to be sent
//! along with the text:
//!
//! 1. [`normalize`] strips stage directions such as `[笑]` or `（小声）`.
//! 2. [`segment`] cuts the result into clause-sized fragments.
//! 3. [`VoiceMatcher`] embeds each fragment in order and accepts the first
//!    one whose nearest clip is closer than the distance threshold.
//!
//! Failures never escape [`VoiceMatcher::match_voice`]; the text reply has
//! already been sent and the audio is optional.

pub mod error;
pub mod matcher;
pub mod normalize;
pub mod segment;

pub use error::MatchError;
pub use matcher::{
    DEFAULT_MIN_FRAGMENT_CHARS, DEFAULT_THRESHOLD, MatchConfig, VoiceMatch, VoiceMatcher,
};
pub use normalize::normalize;
pub use segment::segment;
