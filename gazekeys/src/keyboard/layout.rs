//! Virtual keyboard layout, on-screen geometry, and hit testing.
//!
//! The layout is static configuration. Geometry places every key on the
//! viewport using the standard panel metrics (keyboard docked to the
//! bottom, rows centered) so a gaze point can be resolved to a key.

use std::fmt;

use crate::gaze::engine::ScreenPoint;

// ── Keys ────────────────────────────────────────────────────

/// Identity of a key on the virtual keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A glyph key; committed as its character.
    Char(char),
    Shift,
    Backspace,
    Space,
    Enter,
    /// Hides the keyboard.
    Hide,
}

impl Key {
    /// Stable identifier, e.g. `"q"` or `"Backspace"`.
    pub fn id(&self) -> String {
        match self {
            Self::Char(c) => c.to_string(),
            Self::Shift => "Shift".to_string(),
            Self::Backspace => "Backspace".to_string(),
            Self::Space => "Space".to_string(),
            Self::Enter => "Enter".to_string(),
            Self::Hide => "Hide".to_string(),
        }
    }

    pub fn from_id(s: &str) -> Option<Self> {
        match s {
            "Shift" => Some(Self::Shift),
            "Backspace" => Some(Self::Backspace),
            "Space" => Some(Self::Space),
            "Enter" => Some(Self::Enter),
            "Hide" => Some(Self::Hide),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Self::Char(c)),
                    _ => None,
                }
            }
        }
    }

    /// Text drawn on the key cap.
    pub fn label(&self, shift_active: bool) -> String {
        match self {
            Self::Shift if shift_active => "⇧".to_string(),
            Self::Backspace => "⌫".to_string(),
            Self::Hide => "✕".to_string(),
            other => other.id(),
        }
    }

}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

// ── Layout ──────────────────────────────────────────────────

/// Ordered rows of keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardLayout {
    rows: Vec<Vec<Key>>,
}

impl KeyboardLayout {
    pub fn new(rows: Vec<Vec<Key>>) -> Self {
        Self { rows }
    }

    /// The default layout: number row, three letter rows, and a
    /// function row.
    pub fn qwerty() -> Self {
        let chars = |s: &str| s.chars().map(Key::Char).collect::<Vec<_>>();

        let mut numbers = chars("1234567890");
        numbers.push(Key::Backspace);

        let mut bottom = vec![Key::Shift];
        bottom.extend(chars("zxcvbnm,.?"));

        Self::new(vec![
            numbers,
            chars("qwertyuiop"),
            chars("asdfghjkl"),
            bottom,
            vec![Key::Space, Key::Enter, Key::Hide],
        ])
    }

    pub fn rows(&self) -> &[Vec<Key>] {
        &self.rows
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.rows.iter().flatten().copied()
    }

    pub fn contains(&self, key: Key) -> bool {
        self.keys().any(|k| k == key)
    }

    /// `(row, column)` of a key.
    pub fn position_of(&self, key: Key) -> Option<(usize, usize)> {
        self.rows.iter().enumerate().find_map(|(r, row)| {
            row.iter().position(|k| *k == key).map(|c| (r, c))
        })
    }

    /// Key to commit for `c`, and whether Shift must be committed first.
    pub fn key_for_char(&self, c: char) -> Option<(Key, bool)> {
        match c {
            ' ' => return Some((Key::Space, false)),
            '\n' => return Some((Key::Enter, false)),
            _ => {}
        }
        if self.contains(Key::Char(c)) {
            return Some((Key::Char(c), false));
        }
        let mut lower = c.to_lowercase();
        match (lower.next(), lower.next()) {
            (Some(l), None) if l != c && self.contains(Key::Char(l)) => Some((Key::Char(l), true)),
            _ => None,
        }
    }
}

impl Default for KeyboardLayout {
    fn default() -> Self {
        Self::qwerty()
    }
}

// ── Geometry ────────────────────────────────────────────────

/// Panel metrics in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyboardMetrics {
    pub key_width: f64,
    pub key_height: f64,
    pub space_width: f64,
    /// Horizontal gap between keys.
    pub key_gap: f64,
    /// Vertical gap between rows.
    pub row_gap: f64,
    pub padding_top: f64,
    pub padding_bottom: f64,
    /// Instruction text above the rows.
    pub header_height: f64,
}

impl KeyboardMetrics {
    /// Viewports at most this wide use the compact metrics.
    pub const COMPACT_BREAKPOINT: f64 = 768.0;

    pub fn standard() -> Self {
        Self {
            key_width: 60.0,
            key_height: 60.0,
            space_width: 300.0,
            key_gap: 8.0,
            row_gap: 10.0,
            padding_top: 20.0,
            padding_bottom: 30.0,
            header_height: 55.0,
        }
    }

    pub fn compact() -> Self {
        Self {
            key_width: 40.0,
            key_height: 50.0,
            space_width: 200.0,
            ..Self::standard()
        }
    }

    pub fn for_viewport(width: f64) -> Self {
        if width <= Self::COMPACT_BREAKPOINT {
            Self::compact()
        } else {
            Self::standard()
        }
    }

    fn width_of(&self, key: Key) -> f64 {
        match key {
            Key::Space => self.space_width,
            _ => self.key_width,
        }
    }
}

/// Key bounds in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl KeyRect {
    /// Edges are inclusive.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// Resolves a screen point to the key rendered there.
pub trait HitTest {
    fn hit_test(&self, x: f64, y: f64) -> Option<Key>;
}

impl<F> HitTest for F
where
    F: Fn(f64, f64) -> Option<Key>,
{
    fn hit_test(&self, x: f64, y: f64) -> Option<Key> {
        self(x, y)
    }
}

/// Rendered key positions for one viewport size.
#[derive(Debug, Clone)]
pub struct KeyboardGeometry {
    pub metrics: KeyboardMetrics,
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Top edge of the keyboard panel.
    pub panel_top: f64,
    keys: Vec<(Key, KeyRect)>,
}

impl KeyboardGeometry {
    pub fn new(layout: &KeyboardLayout, viewport_width: f64, viewport_height: f64) -> Self {
        Self::with_metrics(
            layout,
            KeyboardMetrics::for_viewport(viewport_width),
            viewport_width,
            viewport_height,
        )
    }

    pub fn with_metrics(
        layout: &KeyboardLayout,
        metrics: KeyboardMetrics,
        viewport_width: f64,
        viewport_height: f64,
    ) -> Self {
        let rows = layout.rows();
        let row_count = rows.len() as f64;
        let rows_height = if rows.is_empty() {
            0.0
        } else {
            row_count * metrics.key_height + (row_count - 1.0) * metrics.row_gap
        };
        let panel_height =
            metrics.padding_top + metrics.header_height + rows_height + metrics.padding_bottom;
        let panel_top = viewport_height - panel_height;

        let mut keys = Vec::new();
        let mut y = panel_top + metrics.padding_top + metrics.header_height;
        for row in rows {
            let row_width: f64 = row.iter().map(|k| metrics.width_of(*k)).sum::<f64>()
                + metrics.key_gap * row.len().saturating_sub(1) as f64;
            let mut x = (viewport_width - row_width) / 2.0;
            for key in row {
                let w = metrics.width_of(*key);
                keys.push((
                    *key,
                    KeyRect {
                        x,
                        y,
                        w,
                        h: metrics.key_height,
                    },
                ));
                x += w + metrics.key_gap;
            }
            y += metrics.key_height + metrics.row_gap;
        }

        Self {
            metrics,
            viewport_width,
            viewport_height,
            panel_top,
            keys,
        }
    }

    pub fn bounds(&self, key: Key) -> Option<KeyRect> {
        self.keys.iter().find(|(k, _)| *k == key).map(|(_, r)| *r)
    }

    /// Where to look to select `key`.
    pub fn center_of(&self, key: Key) -> Option<ScreenPoint> {
        self.bounds(key).map(|r| r.center())
    }

    pub fn keys(&self) -> impl Iterator<Item = &(Key, KeyRect)> {
        self.keys.iter()
    }
}

impl HitTest for KeyboardGeometry {
    fn hit_test(&self, x: f64, y: f64) -> Option<Key> {
        self.keys
            .iter()
            .find(|(_, rect)| rect.contains(x, y))
            .map(|(key, _)| *key)
    }
}

// ── Tests ───────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_id_roundtrip() {
        for key in KeyboardLayout::qwerty().keys() {
            assert_eq!(Key::from_id(&key.id()), Some(key));
        }
        assert_eq!(Key::from_id("Tab"), None);
        assert_eq!(Key::from_id(""), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Key::Shift.label(false), "Shift");
        assert_eq!(Key::Shift.label(true), "⇧");
        assert_eq!(Key::Backspace.label(false), "⌫");
        assert_eq!(Key::Hide.label(false), "✕");
        assert_eq!(Key::Space.label(true), "Space");
        assert_eq!(Key::Char('q').label(true), "q");
    }

    #[test]
    fn test_qwerty_rows() {
        let layout = KeyboardLayout::qwerty();
        let lens: Vec<usize> = layout.rows().iter().map(|r| r.len()).collect();
        assert_eq!(lens, vec![11, 10, 9, 11, 3]);
        assert_eq!(layout.position_of(Key::Backspace), Some((0, 10)));
        assert_eq!(layout.position_of(Key::Shift), Some((3, 0)));
        assert_eq!(layout.position_of(Key::Hide), Some((4, 2)));
        assert!(layout.contains(Key::Char('?')));
        assert!(!layout.contains(Key::Char('!')));
    }

    #[test]
    fn test_key_for_char() {
        let layout = KeyboardLayout::qwerty();
        assert_eq!(layout.key_for_char('h'), Some((Key::Char('h'), false)));
        assert_eq!(layout.key_for_char('H'), Some((Key::Char('h'), true)));
        assert_eq!(layout.key_for_char(' '), Some((Key::Space, false)));
        assert_eq!(layout.key_for_char('\n'), Some((Key::Enter, false)));
        assert_eq!(layout.key_for_char('!'), None);
    }

    #[test]
    fn test_geometry_docked_and_centered() {
        let layout = KeyboardLayout::qwerty();
        let geo = KeyboardGeometry::new(&layout, 1000.0, 800.0);
        // 20 + 55 + 5*60 + 4*10 + 30 = 445
        assert_eq!(geo.panel_top, 355.0);

        // Row 0: 11 keys * 60 + 10 gaps * 8 = 740 wide, starts at 130
        let one = geo.bounds(Key::Char('1')).unwrap();
        assert_eq!((one.x, one.y, one.w, one.h), (130.0, 430.0, 60.0, 60.0));
        let bs = geo.bounds(Key::Backspace).unwrap();
        assert_eq!(bs.x + bs.w, 870.0);

        // Function row: 300 + 60 + 60 + 16 = 436 wide, starts at 282
        let space = geo.bounds(Key::Space).unwrap();
        assert_eq!((space.x, space.y, space.w), (282.0, 710.0, 300.0));
    }

    #[test]
    fn test_compact_metrics_below_breakpoint() {
        let layout = KeyboardLayout::qwerty();
        let geo = KeyboardGeometry::new(&layout, 600.0, 800.0);
        assert_eq!(geo.metrics, KeyboardMetrics::compact());
        assert_eq!(geo.bounds(Key::Space).unwrap().w, 200.0);
    }

    #[test]
    fn test_hit_test_centers_and_gaps() {
        let layout = KeyboardLayout::qwerty();
        let geo = KeyboardGeometry::new(&layout, 1000.0, 800.0);
        for (key, rect) in geo.keys() {
            let c = rect.center();
            assert_eq!(geo.hit_test(c.x, c.y), Some(*key));
        }
        // Gap between '1' (130..190) and '2' (198..258)
        assert_eq!(geo.hit_test(194.0, 460.0), None);
        // Above the keyboard
        assert_eq!(geo.hit_test(500.0, 100.0), None);
    }

    #[test]
    fn test_closure_hit_test() {
        let always_a = |_x: f64, _y: f64| Some(Key::Char('a'));
        assert_eq!(always_a.hit_test(1.0, 2.0), Some(Key::Char('a')));
    }
}
