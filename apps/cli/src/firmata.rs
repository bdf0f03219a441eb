//! The handful of Firmata messages the pin commands need.

const SET_PIN_MODE: u8 = 0xF4;
const SET_DIGITAL_PIN_VALUE: u8 = 0xF5;
const START_SYSEX: u8 = 0xF0;
const END_SYSEX: u8 = 0xF7;
const SAMPLING_INTERVAL: u8 = 0x7A;

/// Pin used by the built-in LED on most ESP32 boards.
pub const LED_PIN: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PinMode {
    Input = 0x00,
    Output = 0x01,
}

pub fn set_pin_mode(pin: u8, mode: PinMode) -> [u8; 3] {
    [SET_PIN_MODE, pin & 0x7F, mode as u8]
}

pub fn digital_write(pin: u8, high: bool) -> [u8; 3] {
    [SET_DIGITAL_PIN_VALUE, pin & 0x7F, u8::from(high)]
}

/// Sysex sampling-interval request, 14-bit milliseconds.
pub fn sampling_interval(ms: u16) -> [u8; 5] {
    [
        START_SYSEX,
        SAMPLING_INTERVAL,
        (ms & 0x7F) as u8,
        ((ms >> 7) & 0x7F) as u8,
        END_SYSEX,
    ]
}
