//! Status indicator drivers.

#[cfg(target_os = "espidf")]
pub mod base;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Off,
    Red,
    Green,
    Blue,
    Yellow,
    Magenta,
    Cyan,
    White,
}

impl Color {
    /// Colors cycled by the self-test, in order.
    pub const SELF_TEST: [Color; 7] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::White,
    ];

    /// (red, green, blue) channel states.
    pub fn channels(self) -> (bool, bool, bool) {
        match self {
            Color::Off => (false, false, false),
            Color::Red => (true, false, false),
            Color::Green => (false, true, false),
            Color::Blue => (false, false, true),
            Color::Yellow => (true, true, false),
            Color::Magenta => (true, false, true),
            Color::Cyan => (false, true, true),
            Color::White => (true, true, true),
        }
    }
}

pub trait StatusIndicator {
    fn set_color(&mut self, color: Color);

    /// Cycles through every color and ends switched off.
    fn self_test(&mut self);
}

/// Indicator for boards without an LED: color changes go to the log.
#[derive(Debug, Default)]
pub struct LogIndicator {
    current: Option<Color>,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Color> {
        self.current
    }
}

impl StatusIndicator for LogIndicator {
    fn set_color(&mut self, color: Color) {
        if self.current != Some(color) {
            log::info!("Status LED: {:?}", color);
            self.current = Some(color);
        }
    }

    fn self_test(&mut self) {
        log::info!("Status LED self-test: {:?}", Color::SELF_TEST);
        self.current = Some(Color::Off);
    }
}
