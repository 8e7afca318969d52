// Purpose: the single voice and everything that drives it from other threads

pub mod control;
pub mod message;
pub mod voice;

pub use control::{AdvancedControls, ControlSnapshot, VoiceControls};
pub use message::{MessageReceiver, NoteMessage};
pub use voice::Voice;
