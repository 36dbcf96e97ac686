use crate::{
    add_native_word,
    runtime::{data_structures::bounded_stack::StackStatus, error, interpreter::Interpreter},
};
use lazy_static::lazy_static;
use std::{collections::HashMap, thread, time::Duration};
use tracing::info;

/// Pin positions given to the port words start at this value.
pub const PORT_OFFSET: i32 = 5;

lazy_static! {
    /// The pins `DIGITALOUT` can drive, indexed by position minus the offset.  The first five
    /// positions all map to p9 and the last five to the board's LEDs.
    static ref DIGITAL_OUT_PINS: Vec<String> = {
        let mut pins = vec!["p9".to_string(); 5];

        pins.extend((10..=29).map(|pin| format!("p{}", pin)));
        pins.extend(["LED1", "LED1", "LED2", "LED3", "LED4"].map(String::from));

        pins
    };

    /// The pins `DIGITALIN` can read, p5 through p30.
    static ref DIGITAL_IN_PINS: Vec<String> = (5..=30).map(|pin| format!("p{}", pin)).collect();

    /// The analog input channels 0 through 4.
    static ref ANALOG_IN_PINS: Vec<String> = (15..=19).map(|pin| format!("p{}", pin)).collect();
}

/// Bus settings for an SPI transfer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SpiConfig {
    /// Word size, either 8 or 16.
    pub bits: u8,

    /// Clock polarity and phase, 0 to 3.
    pub mode: u8,

    /// Clock frequency in hertz.
    pub frequency: i32,
}

impl SpiConfig {
    /// Build a config from raw stack values, falling back to 8 bits and mode 0 for values the bus
    /// doesn't support.
    pub fn from_raw(bits: i32, mode: i32, frequency: i32) -> SpiConfig {
        SpiConfig {
            bits: if bits == 16 { 16 } else { 8 },
            mode: if (0..=3).contains(&mode) { mode as u8 } else { 0 },
            frequency,
        }
    }
}

/// The hardware the port words talk to.  Pins are named the way the board's pinout names them.
pub trait Board {
    fn digital_write(&mut self, pin: &str, high: bool);

    fn digital_read(&mut self, pin: &str) -> bool;

    fn analog_read(&mut self, pin: &str) -> i32;

    /// Drive the analog output pin.
    fn analog_write(&mut self, value: i32);

    /// Select the device, write the data in order and deselect it.
    fn spi_write(&mut self, config: SpiConfig, data: &[i32]);

    fn delay(&mut self, duration: Duration);
}

/// A board simulated in memory, for running on a host machine.  Written pins read back their last
/// level and every transfer is kept for inspection.
#[derive(Default)]
pub struct HostBoard {
    levels: HashMap<String, bool>,
    analog_inputs: HashMap<String, i32>,
    analog_output: i32,
    spi_transfers: Vec<(SpiConfig, Vec<i32>)>,
}

impl HostBoard {
    pub fn new() -> HostBoard {
        HostBoard::default()
    }

    /// Set the value an analog input pin will read.
    pub fn set_analog_input(&mut self, pin: &str, value: i32) {
        let _ = self.analog_inputs.insert(pin.to_string(), value);
    }

    /// The last level written to a pin.
    pub fn level(&self, pin: &str) -> bool {
        self.levels.get(pin).copied().unwrap_or(false)
    }

    pub fn analog_output(&self) -> i32 {
        self.analog_output
    }

    pub fn spi_transfers(&self) -> &[(SpiConfig, Vec<i32>)] {
        &self.spi_transfers
    }
}

impl Board for HostBoard {
    fn digital_write(&mut self, pin: &str, high: bool) {
        info!(pin, high, "digital write");
        let _ = self.levels.insert(pin.to_string(), high);
    }

    fn digital_read(&mut self, pin: &str) -> bool {
        self.level(pin)
    }

    fn analog_read(&mut self, pin: &str) -> i32 {
        self.analog_inputs.get(pin).copied().unwrap_or(0)
    }

    fn analog_write(&mut self, value: i32) {
        info!(value, "analog write");
        self.analog_output = value;
    }

    fn spi_write(&mut self, config: SpiConfig, data: &[i32]) {
        info!(?config, ?data, "spi write");
        self.spi_transfers.push((config, data.to_vec()));
    }

    fn delay(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Map a pin position from the stack to a pin name.
fn pin_name(pins: &[String], position: i32, offset: i32) -> Option<&str> {
    position
        .checked_sub(offset)
        .and_then(|index| usize::try_from(index).ok())
        .and_then(|index| pins.get(index))
        .map(String::as_str)
}

/// Write a digital level, any non-zero value drives the pin high.
///
/// Signature: `value pin -- `
fn word_digital_out(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let Some(values) = interpreter.pop_values(2) else {
        interpreter.write_output("Insufficient parameters\n");
        return Ok(());
    };

    match pin_name(&DIGITAL_OUT_PINS, values[1], PORT_OFFSET) {
        Some(pin) => interpreter.board().digital_write(pin, values[0] != 0),
        None => interpreter.write_output("Invalid port\n"),
    }

    Ok(())
}

/// Read the level of a digital pin as 1 or 0.
///
/// Signature: `pin -- level`
fn word_digital_in(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (position, status) = interpreter.pop();

    if status != StackStatus::Ok {
        interpreter.write_output("Insufficient parameters\n");
        return Ok(());
    }

    match pin_name(&DIGITAL_IN_PINS, position, PORT_OFFSET) {
        Some(pin) => {
            let level = interpreter.board().digital_read(pin);
            interpreter.push(level as i32);
        }

        None => interpreter.write_output("Invalid port\n"),
    }

    Ok(())
}

/// Read an analog channel.
///
/// Signature: `channel -- value`
fn word_analog_in(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (channel, status) = interpreter.pop();

    if status != StackStatus::Ok {
        interpreter.write_output("Insufficient parameters\n");
        return Ok(());
    }

    match pin_name(&ANALOG_IN_PINS, channel, 0) {
        Some(pin) => {
            let value = interpreter.board().analog_read(pin);
            interpreter.push(value);
        }

        None => interpreter.write_output("Invalid port\n"),
    }

    Ok(())
}

/// Signature: `value -- `
fn word_analog_out(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    match interpreter.pop() {
        (value, StackStatus::Ok) => interpreter.board().analog_write(value),
        _ => interpreter.write_output("Insufficient parameters\n"),
    }

    Ok(())
}

/// Write values to the SPI bus.  The data is written in the order it was pushed.
///
/// Signature: `data... count bits mode frequency -- `
fn word_spi_write(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let Some(settings) = interpreter.pop_values(4) else {
        interpreter.write_output("Insufficient parameters\n");
        return Ok(());
    };

    let (count, bits, mode, frequency) = (settings[0], settings[1], settings[2], settings[3]);
    let config = SpiConfig::from_raw(bits, mode, frequency);

    let Some(data) = interpreter.pop_values(count.max(0) as usize) else {
        interpreter.write_output("Insufficient parameters\n");
        return Ok(());
    };

    interpreter.board().spi_write(config, &data);
    Ok(())
}

pub fn register_board_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(
        interpreter,
        "DIGITALOUT",
        word_digital_out,
        "Write a level to a digital pin, pins 5 to 34.",
        "value pin -- "
    );

    add_native_word!(
        interpreter,
        "DIGITALIN",
        word_digital_in,
        "Read the level of a digital pin, pins 5 to 30.",
        "pin -- level"
    );

    add_native_word!(
        interpreter,
        "ANALOGIN",
        word_analog_in,
        "Read an analog channel, 0 to 4.",
        "channel -- value"
    );

    add_native_word!(
        interpreter,
        "ANALOGOUT",
        word_analog_out,
        "Drive the analog output.",
        "value -- "
    );

    add_native_word!(
        interpreter,
        "SPIWRITE",
        word_spi_write,
        "Write count values to the SPI bus.",
        "data... count bits mode frequency -- "
    );
}
