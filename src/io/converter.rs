use crate::io::midi::MidiEvent;
use crate::synth::control::VoiceControls;
use crate::synth::message::{MessageReceiver, NoteMessage};

/// Filter `midi` to one channel. A note-on with velocity 0 is a note-off.
pub fn midi_to_message(midi: MidiEvent, channel_filter: u8) -> Option<NoteMessage> {
    match midi {
        MidiEvent::NoteOn {
            channel,
            key,
            velocity: 0,
        } if channel == channel_filter => Some(NoteMessage::NoteOff { note: key }),
        MidiEvent::NoteOn {
            channel,
            key,
            velocity,
        } if channel == channel_filter => Some(NoteMessage::NoteOn {
            note: key,
            velocity,
        }),
        MidiEvent::NoteOff { channel, key, .. } if channel == channel_filter => {
            Some(NoteMessage::NoteOff { note: key })
        }
        _ => None,
    }
}

pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Harder playing gives a more resonant brightness filter: flat up to
/// velocity 40, a gentle rise to Q 1 at 80, then steeper up to about 2.8.
pub fn velocity_to_q(velocity: u8) -> f32 {
    match velocity {
        0..=40 => 0.707,
        41..=80 => 0.707 + (velocity - 40) as f32 * 0.007325,
        _ => 1.0 + (velocity - 80) as f32 * 0.0375,
    }
}

/// Turns a note-message stream into the gate and note of a single voice.
///
/// Only one note sounds at a time: while the gate is open, note-ons for
/// other keys are ignored. A note-off only closes the gate for the key
/// that opened it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MonoNoteInput {
    note: Option<u8>,
}

impl MonoNoteInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one message, pushing the note's frequency and resonance to
    /// `controls` when a new note starts. Returns the gate afterwards.
    pub fn handle(&mut self, message: NoteMessage, controls: &VoiceControls) -> bool {
        match message {
            NoteMessage::NoteOn { note, velocity: 0 } | NoteMessage::NoteOff { note } => {
                if self.note == Some(note) {
                    self.note = None;
                }
            }
            NoteMessage::NoteOn { note, velocity } => {
                if self.note.is_none() {
                    controls.set_frequency(midi_note_to_freq(note));
                    controls.set_resonance_factor(velocity_to_q(velocity));
                    self.note = Some(note);
                }
            }
            NoteMessage::AllNotesOff => self.note = None,
        }
        self.gate()
    }

    /// Drain everything `receiver` holds.
    pub fn drain<R: MessageReceiver + ?Sized>(
        &mut self,
        receiver: &mut R,
        controls: &VoiceControls,
    ) -> bool {
        while let Some(message) = receiver.pop() {
            self.handle(message, controls);
        }
        self.gate()
    }

    pub fn gate(&self) -> bool {
        self.note.is_some()
    }

    /// Key holding the gate open, if any.
    pub fn note(&self) -> Option<u8> {
        self.note
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[test]
    fn a4_is_440() {
        assert!((midi_note_to_freq(69) - 440.0).abs() < 1e-3);
        assert!((midi_note_to_freq(57) - 220.0).abs() < 1e-3);
        assert!((midi_note_to_freq(81) - 880.0).abs() < 1e-2);
    }

    #[test]
    fn velocity_curve_is_continuous() {
        assert_eq!(velocity_to_q(0), 0.707);
        assert_eq!(velocity_to_q(40), 0.707);
        assert!((velocity_to_q(80) - 1.0).abs() < 1e-3);
        assert!((velocity_to_q(81) - 1.0375).abs() < 1e-5);
        assert!((velocity_to_q(127) - 2.7625).abs() < 1e-4);
    }

    #[test]
    fn zero_velocity_note_on_is_note_off() {
        let event = MidiEvent::NoteOn {
            channel: 0,
            key: 60,
            velocity: 0,
        };
        assert_eq!(
            midi_to_message(event, 0),
            Some(NoteMessage::NoteOff { note: 60 })
        );
        assert_eq!(midi_to_message(event, 1), None);
    }

    #[test]
    fn raw_bytes_reach_the_gate_on_their_channel() {
        let controls = VoiceControls::new(440.0);
        let mut input = MonoNoteInput::new();
        let mut queue: VecDeque<NoteMessage> = [[0x92u8, 81, 90], [0x90, 60, 90], [0x92, 81, 0]]
            .iter()
            .filter_map(|bytes| MidiEvent::from_bytes(bytes))
            .filter_map(|event| midi_to_message(event, 2))
            .collect();
        assert_eq!(queue.len(), 2);

        let first = queue.pop_front().unwrap();
        assert!(input.handle(first, &controls));
        assert!((controls.frequency() - 880.0).abs() < 1e-2);
        assert!(!input.drain(&mut queue, &controls));
    }

    #[test]
    fn non_note_events_are_dropped() {
        let event = MidiEvent::ControlChange {
            channel: 0,
            controller: 1,
            value: 64,
        };
        assert_eq!(midi_to_message(event, 0), None);
    }

    #[test]
    fn first_note_wins() {
        let controls = VoiceControls::new(440.0);
        let mut input = MonoNoteInput::new();

        assert!(input.handle(NoteMessage::NoteOn { note: 57, velocity: 100 }, &controls));
        assert!((controls.frequency() - 220.0).abs() < 1e-3);
        assert!((controls.resonance_factor() - 1.75).abs() < 1e-4);

        assert!(input.handle(NoteMessage::NoteOn { note: 72, velocity: 100 }, &controls));
        assert_eq!(input.note(), Some(57));
        assert!((controls.frequency() - 220.0).abs() < 1e-3);

        // Releasing the ignored key does nothing
        assert!(input.handle(NoteMessage::NoteOff { note: 72 }, &controls));
        assert!(!input.handle(NoteMessage::NoteOff { note: 57 }, &controls));
    }

    #[test]
    fn drain_empties_the_queue() {
        let controls = VoiceControls::new(440.0);
        let mut input = MonoNoteInput::new();
        let mut queue: VecDeque<NoteMessage> = VecDeque::from(vec![
            NoteMessage::NoteOn { note: 60, velocity: 64 },
            NoteMessage::NoteOn { note: 60, velocity: 0 },
            NoteMessage::NoteOn { note: 64, velocity: 64 },
        ]);

        assert!(input.drain(&mut queue, &controls));
        assert!(queue.is_empty());
        assert_eq!(input.note(), Some(64));

        queue.push_back(NoteMessage::AllNotesOff);
        assert!(!input.drain(&mut queue, &controls));
    }
}
