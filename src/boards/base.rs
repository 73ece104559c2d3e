use esp_idf_svc::hal::gpio::{AnyOutputPin, Level, Output, PinDriver};

use super::{Color, StatusIndicator};

const SELF_TEST_STEP: std::time::Duration = std::time::Duration::from_millis(250);

/// Common-anode RGB LED on three GPIOs: a channel is lit when its pin is low.
pub struct RgbLed {
    red: PinDriver<'static, AnyOutputPin, Output>,
    green: PinDriver<'static, AnyOutputPin, Output>,
    blue: PinDriver<'static, AnyOutputPin, Output>,
}

impl RgbLed {
    pub fn new(red: AnyOutputPin, green: AnyOutputPin, blue: AnyOutputPin) -> anyhow::Result<Self> {
        let mut led = Self {
            red: PinDriver::output(red)?,
            green: PinDriver::output(green)?,
            blue: PinDriver::output(blue)?,
        };
        led.set_color(Color::Off);
        Ok(led)
    }

    fn level(on: bool) -> Level {
        if on {
            Level::Low
        } else {
            Level::High
        }
    }
}

impl StatusIndicator for RgbLed {
    fn set_color(&mut self, color: Color) {
        let (r, g, b) = color.channels();
        let result = self
            .red
            .set_level(Self::level(r))
            .and_then(|_| self.green.set_level(Self::level(g)))
            .and_then(|_| self.blue.set_level(Self::level(b)));
        if let Err(e) = result {
            log::warn!("set_color {:?} error: {:?}", color, e);
        }
    }

    fn self_test(&mut self) {
        for color in Color::SELF_TEST {
            self.set_color(color);
            std::thread::sleep(SELF_TEST_STEP);
        }
        self.set_color(Color::Off);
    }
}

#[macro_export]
macro_rules! status_led {
    ($peripherals:ident) => {{
        $crate::boards::base::RgbLed::new(
            $peripherals.pins.gpio11.into(),
            $peripherals.pins.gpio12.into(),
            $peripherals.pins.gpio13.into(),
        )
    }};
}
