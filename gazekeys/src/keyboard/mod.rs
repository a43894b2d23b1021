//! On-screen keyboard: layout and hit testing, dwell/blink selection,
//! and the text buffer fed by committed keys.

pub mod layout;
pub mod selection;
pub mod text_buffer;
