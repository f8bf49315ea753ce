// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2024 Rodrigo Lemos

//! Protocol implementation for the potentiometer over Linux spidev interface.

use {
    super::*,
    spidev::{SpiModeFlags, Spidev, SpidevOptions},
    std::{
        io::Write,
        path::{Path, PathBuf},
    },
};

/// The number of bits per word in transfer.
pub const BITS_PER_WORD: u8 = 16;

/// The speed of transfer found to work with the potentiometer.
pub const DEFAULT_SPEED_HZ: u32 = 1_500_000;

/// The path of spidev node for the chip select in the bus.
pub fn spidev_path(bus: u16, chip_select: u8) -> PathBuf {
    PathBuf::from(format!("/dev/spidev{}.{}", bus, chip_select))
}

/// Map the bus number and the chip select to the node of existent controller.
pub fn find_pot_node(bus: u16, chip_select: u8) -> Result<PathBuf, Error> {
    let path = spidev_path(bus, chip_select);
    if path.exists() {
        Ok(path)
    } else {
        let msg = format!(
            "No SPI controller for bus {} chip select {}: {} is missing",
            bus,
            chip_select,
            path.display()
        );
        Err(Error::new(ItrigueError::ResourceUnavailable, &msg))
    }
}

/// Open the node of potentiometer.
pub fn open_pot_device(path: &Path) -> Result<Spidev, Error> {
    Spidev::open(path).map_err(|e| {
        let msg = format!("{}: {}", path.display(), e);
        Error::new(ItrigueError::ResourceUnavailable, &msg)
    })
}

/// Negotiate parameters of transfer: mode 0, 16 bits per word, and the speed.
pub fn configure_pot_device(spi: &mut Spidev, speed_hz: u32) -> Result<(), Error> {
    let options = SpidevOptions::new()
        .bits_per_word(BITS_PER_WORD)
        .max_speed_hz(speed_hz)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    spi.configure(&options).map_err(|e| {
        let msg = format!(
            "mode 0, {} bits per word, {} Hz: {}",
            BITS_PER_WORD, speed_hz, e
        );
        Error::new(ItrigueError::NegotiationFailure, &msg)
    })
}

impl WordTransferOperation for Spidev {
    // The controller shifts out each 16-bit word in host order, MSB first.
    fn transfer_word(&mut self, word: u16) -> Result<(), Error> {
        self.write_all(&word.to_ne_bytes()).map_err(|e| {
            let msg = format!("write 0x{:04x}: {}", word, e);
            Error::new(ItrigueError::TransferFailure, &msg)
        })
    }
}
