//! Channel voice messages as they arrive from a MIDI port.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Centered on 0, range -8192..=8191.
    PitchBend { channel: u8, value: i16 },
    ProgramChange { channel: u8, program: u8 },
}

impl MidiEvent {
    /// Decode one complete message. Running status, system messages and
    /// truncated input give `None`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        if status & 0x80 == 0 || data.iter().any(|b| b & 0x80 != 0) {
            return None;
        }
        let channel = status & 0x0F;

        match (status & 0xF0, data) {
            (0x80, &[key, velocity, ..]) => Some(MidiEvent::NoteOff { channel, key, velocity }),
            (0x90, &[key, velocity, ..]) => Some(MidiEvent::NoteOn { channel, key, velocity }),
            (0xB0, &[controller, value, ..]) => Some(MidiEvent::ControlChange {
                channel,
                controller,
                value,
            }),
            (0xC0, &[program, ..]) => Some(MidiEvent::ProgramChange { channel, program }),
            (0xE0, &[lsb, msb, ..]) => {
                let raw = ((msb as i16) << 7) | lsb as i16;
                Some(MidiEvent::PitchBend {
                    channel,
                    value: raw - 8192,
                })
            }
            _ => None,
        }
    }

    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::PitchBend { channel, .. }
            | MidiEvent::ProgramChange { channel, .. } => channel,
        }
    }
}
