use core_format::ColorPair;
use crossterm::style::Color;
use std::collections::HashMap;
use tracing::warn;

/// Explicit color-pair allocator. Handles are stable for the registry's
/// lifetime and deduplicated, so repeated allocations of the same
/// foreground/background combination return the same handle.
///
/// Pair 0 is always the terminal default and exists from construction.
#[derive(Debug)]
pub struct ColorRegistry {
    pairs: Vec<(Color, Color)>,
    index: HashMap<(Color, Color), ColorPair>,
}

impl Default for ColorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            pairs: Vec::new(),
            index: HashMap::new(),
        };
        reg.alloc(Color::Reset, Color::Reset);
        reg
    }

    pub fn alloc(&mut self, fg: Color, bg: Color) -> ColorPair {
        if let Some(pair) = self.index.get(&(fg, bg)) {
            return *pair;
        }
        if self.pairs.len() > u16::MAX as usize {
            warn!(target: "render.color", "color pair table full, reusing default");
            return ColorPair(0);
        }
        let pair = ColorPair(self.pairs.len() as u16);
        self.pairs.push((fg, bg));
        self.index.insert((fg, bg), pair);
        pair
    }

    /// Unknown handles degrade to the terminal default rather than failing
    /// the draw.
    pub fn get(&self, pair: ColorPair) -> (Color, Color) {
        self.pairs
            .get(pair.0 as usize)
            .copied()
            .unwrap_or((Color::Reset, Color::Reset))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
