// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Rodrigo Lemos

use {
    super::*,
    gpio_cdev::{Line, LineHandle},
    protocols::{gpio::*, spi::*, *},
    spidev::Spidev,
    std::path::PathBuf,
};

/// The hardware of speaker set: one GPIO line for power and one SPI peripheral for potentiometer.
/// Each field holds the resource acquired by one step of attach.
pub struct ItrigueUnit<L = LineHandle> {
    power_line: Option<Line>,
    power_switch: Option<PowerSwitch<L>>,
    pot_node: Option<PathBuf>,
    pot_device: Option<Spidev>,
    potentiometers: Option<Potentiometers<Spidev>>,
}

impl<L> Default for ItrigueUnit<L> {
    fn default() -> Self {
        Self {
            power_line: None,
            power_switch: None,
            pot_node: None,
            pot_device: None,
            potentiometers: None,
        }
    }
}

fn not_attached(label: &str) -> Error {
    let msg = format!("{} is not attached", label);
    Error::new(ItrigueError::NotAttached, &msg)
}

impl ItrigueUnit<LineHandle> {
    pub fn claim_power_line(&mut self, chip_path: &str, offset: u32) -> Result<(), Error> {
        find_power_line(chip_path, offset).map(|line| self.power_line = Some(line))
    }

    pub fn release_power_line(&mut self) {
        self.power_line = None;
    }

    pub fn configure_power_line(&mut self) -> Result<(), Error> {
        let line = self
            .power_line
            .as_ref()
            .ok_or_else(|| not_attached("power line"))?;
        request_power_line(line).map(|handle| {
            info!(
                "I-Trigue 3300 power switch set to GPIO line {}",
                handle.line().offset()
            );
            self.power_switch = Some(PowerSwitch::new(handle));
        })
    }

    pub fn find_pot_bus(&mut self, bus: u16, chip_select: u8) -> Result<(), Error> {
        find_pot_node(bus, chip_select).map(|path| self.pot_node = Some(path))
    }

    pub fn forget_pot_bus(&mut self) {
        self.pot_node = None;
    }

    pub fn register_pot_device(&mut self) -> Result<(), Error> {
        let path = self
            .pot_node
            .as_ref()
            .ok_or_else(|| not_attached("SPI bus"))?;
        open_pot_device(path).map(|spi| self.pot_device = Some(spi))
    }

    pub fn unregister_pot_device(&mut self) {
        self.pot_device = None;
    }

    pub fn configure_pot_device(&mut self, speed_hz: u32) -> Result<(), Error> {
        let mut spi = self
            .pot_device
            .take()
            .ok_or_else(|| not_attached("SPI device"))?;
        match configure_pot_device(&mut spi, speed_hz) {
            Ok(()) => {
                if let Some(path) = &self.pot_node {
                    info!(
                        "I-Trigue 3300 potentiometers registered to {} at {} Hz",
                        path.display(),
                        speed_hz
                    );
                }
                self.potentiometers = Some(Potentiometers::new(spi));
                Ok(())
            }
            Err(err) => {
                self.pot_device = Some(spi);
                Err(err)
            }
        }
    }

    /// The levels cached so far are discarded.
    pub fn unconfigure_pot_device(&mut self) {
        if let Some(pots) = self.potentiometers.take() {
            self.pot_device = Some(pots.into_inner());
        }
    }
}

impl<L: PowerLineOperation> ItrigueUnit<L> {
    /// Turn the power off, then give the line back.
    pub fn unconfigure_power_line(&mut self) {
        if let Some(mut switch) = self.power_switch.take() {
            let res = switch.set_onoff(false);
            debug!(?res, "power off");
        }
    }
}

impl<L: PowerLineOperation> ItrigueOperation for ItrigueUnit<L> {
    fn get_onoff(&self) -> Result<bool, Error> {
        self.power_switch
            .as_ref()
            .ok_or_else(|| not_attached("power switch"))
            .and_then(|switch| switch.get_onoff())
    }

    fn set_onoff(&mut self, on: bool) -> Result<(), Error> {
        self.power_switch
            .as_mut()
            .ok_or_else(|| not_attached("power switch"))
            .and_then(|switch| switch.set_onoff(on))
    }

    fn get_pot(&self, channel: PotChannel) -> Result<Option<u8>, Error> {
        self.potentiometers
            .as_ref()
            .ok_or_else(|| not_attached("potentiometer"))
            .map(|pots| pots.get_pot(channel))
    }

    fn set_pot(&mut self, channel: PotChannel, value: i32) -> Result<u8, Error> {
        self.potentiometers
            .as_mut()
            .ok_or_else(|| not_attached("potentiometer"))
            .and_then(|pots| pots.set_pot(channel, value))
    }
}
