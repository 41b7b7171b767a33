//! Colors keyed to what a table cell says about a layer.

use colored::{ColoredString, Colorize};
use planner_core::LayerKind;

/// Role of a piece of terminal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Tensor shapes and titles.
    Shape,
    /// Column labels and separators.
    Label,
    /// A layer that went through all four stages.
    Simulated,
    /// A layer that only ran shape inference.
    PassThrough,
    Failed,
    Skipped,
}

impl Tone {
    /// Tone for a layer of `kind` that completed.
    pub fn for_kind(kind: LayerKind) -> Self {
        if kind.is_hardware_modeled() {
            Tone::Simulated
        } else {
            Tone::PassThrough
        }
    }

    fn rgb(self) -> (u8, u8, u8) {
        match self {
            Tone::Shape => (135, 200, 235),
            Tone::Label => (125, 125, 140),
            Tone::Simulated => (120, 220, 120),
            Tone::PassThrough => (175, 175, 195),
            Tone::Failed => (235, 80, 80),
            Tone::Skipped => (230, 180, 60),
        }
    }
}

pub trait Paint: Colorize + Sized {
    fn tone(self, tone: Tone) -> ColoredString {
        let (r, g, b) = tone.rgb();
        self.truecolor(r, g, b)
    }
}

impl<T: Colorize> Paint for T {}
