//! Hardware MIDI input
//!
//! midir calls back on its own thread with raw bytes. Note messages for the
//! selected channel go to the audio thread through their own rtrb ring.

use color_eyre::eyre::{eyre, Result as EyreResult};
use midir::{Ignore, MidiInput, MidiInputConnection};
use rtrb::Producer;

use timbre_dsp::{
    io::{midi_to_message, MidiEvent},
    synth::NoteMessage,
};

/// Connect to the first input port whose name contains `port_filter`
/// (case-insensitive). The connection closes when the returned handle drops.
pub fn connect(
    port_filter: &str,
    channel: u8,
    mut notes: Producer<NoteMessage>,
) -> EyreResult<MidiInputConnection<()>> {
    let mut input = MidiInput::new("timbre")?;
    input.ignore(Ignore::All);

    let wanted = port_filter.to_lowercase();
    let ports = input.ports();
    let port = ports
        .iter()
        .find(|port| {
            input
                .port_name(port)
                .map(|name| name.to_lowercase().contains(&wanted))
                .unwrap_or(false)
        })
        .ok_or_else(|| eyre!("no MIDI input port matching '{port_filter}'"))?;
    let name = input.port_name(port)?;

    let connection = input
        .connect(
            port,
            "timbre-in",
            move |_, bytes, _| {
                let Some(event) = MidiEvent::from_bytes(bytes) else {
                    return;
                };
                match midi_to_message(event, channel) {
                    Some(message) => {
                        if notes.push(message).is_err() {
                            tracing::warn!(?message, "note queue full, midi message dropped");
                        }
                    }
                    None => tracing::trace!(channel = event.channel(), ?event, "midi event ignored"),
                }
            },
            (),
        )
        .map_err(|err| eyre!("failed to open MIDI port '{name}': {err}"))?;

    tracing::info!(port = %name, channel = channel + 1, "midi input connected");
    Ok(connection)
}
