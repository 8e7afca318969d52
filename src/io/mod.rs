// Purpose - note input from the outside world

pub mod converter;
pub mod midi;

pub use converter::{midi_note_to_freq, midi_to_message, velocity_to_q, MonoNoteInput};
pub use midi::MidiEvent;
