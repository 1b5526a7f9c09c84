//! Event Handling - Keyboard input processing
//!
//! Every key press interrupts the run. In raw mode Ctrl+C arrives as a key
//! press too, so it takes the same path.

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::future;
use futures::{Stream, StreamExt};

use super::coordinator::KeyPress;

/// Map a terminal event to a key press, ignoring releases and repeats
pub fn key_press(event: &Event) -> Option<KeyPress> {
    match event {
        Event::Key(KeyEvent {
            kind: KeyEventKind::Press,
            ..
        }) => Some(KeyPress),
        _ => None,
    }
}

/// Key presses from the terminal
pub fn key_presses() -> impl Stream<Item = KeyPress> + Unpin {
    EventStream::new().filter_map(|event| {
        future::ready(match event {
            Ok(event) => key_press(&event),
            Err(e) => {
                tracing::debug!(error = %e, "terminal event error");
                None
            }
        })
    })
}
