#[cfg(feature = "rtrb")]
use rtrb::Consumer;

/// Note events delivered to the audio thread.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NoteMessage {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    AllNotesOff,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<NoteMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<NoteMessage> {
    fn pop(&mut self) -> Option<NoteMessage> {
        Consumer::pop(self).ok()
    }
}

impl MessageReceiver for std::collections::VecDeque<NoteMessage> {
    fn pop(&mut self) -> Option<NoteMessage> {
        self.pop_front()
    }
}
