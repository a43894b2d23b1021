//! Backends that drive a `TrackerSession` on an event loop.

pub mod headless;

use crate::session::Viewport;

/// Parse a "WxH" viewport string, e.g. "1280x800".
pub fn parse_viewport(s: &str) -> Option<Viewport> {
    let (w, h) = s.split_once(['x', 'X'])?;
    let width: u32 = w.trim().parse().ok()?;
    let height: u32 = h.trim().parse().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(Viewport {
        width: width as f64,
        height: height as f64,
    })
}
