pub mod voice_call;

pub use voice_call::{OutboundCall, StartCallRequest, VoiceCallClient, VoiceCallError};
