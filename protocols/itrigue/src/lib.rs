// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2024 Rodrigo Lemos

#![doc = include_str!("../README.md")]

pub mod gpio;
pub mod spi;

use {
    glib::{error::ErrorDomain, Error, Quark},
    std::convert::TryFrom,
};

/// Any error to operate the speaker set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ItrigueError {
    /// The GPIO line or the SPI peripheral is missing, or used by the others.
    ResourceUnavailable,
    /// The SPI controller rejects the parameters of transfer.
    NegotiationFailure,
    /// The sound card is not available to add control elements.
    AllocationFailure,
    /// Any control element is not added to the sound card.
    RegistrationFailure,
    /// The transfer to the potentiometer fails.
    TransferFailure,
    /// The hardware is not attached yet, or already detached.
    NotAttached,
    Invalid(i32),
}

impl std::fmt::Display for ItrigueError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let msg = match self {
            ItrigueError::ResourceUnavailable => "resource-unavailable",
            ItrigueError::NegotiationFailure => "negotiation-failure",
            ItrigueError::AllocationFailure => "allocation-failure",
            ItrigueError::RegistrationFailure => "registration-failure",
            ItrigueError::TransferFailure => "transfer-failure",
            ItrigueError::NotAttached => "not-attached",
            ItrigueError::Invalid(_) => "invalid",
        };

        write!(f, "ItrigueError::{}", msg)
    }
}

impl ErrorDomain for ItrigueError {
    fn domain() -> Quark {
        Quark::from_str("itrigue-error-quark")
    }

    fn code(self) -> i32 {
        match self {
            ItrigueError::ResourceUnavailable => 0,
            ItrigueError::NegotiationFailure => 1,
            ItrigueError::AllocationFailure => 2,
            ItrigueError::RegistrationFailure => 3,
            ItrigueError::TransferFailure => 4,
            ItrigueError::NotAttached => 5,
            ItrigueError::Invalid(v) => v,
        }
    }

    fn from(code: i32) -> Option<Self> {
        let enumeration = match code {
            0 => ItrigueError::ResourceUnavailable,
            1 => ItrigueError::NegotiationFailure,
            2 => ItrigueError::AllocationFailure,
            3 => ItrigueError::RegistrationFailure,
            4 => ItrigueError::TransferFailure,
            5 => ItrigueError::NotAttached,
            _ => ItrigueError::Invalid(code),
        };
        Some(enumeration)
    }
}

/// Operation for the output line to switch power.
pub trait PowerLineOperation {
    /// Read current level of the line.
    fn read_level(&self) -> Result<bool, Error>;

    /// Drive the line to the level.
    fn write_level(&mut self, level: bool) -> Result<(), Error>;
}

/// Operation to transfer one 16-bit word to the potentiometer.
pub trait WordTransferOperation {
    fn transfer_word(&mut self, word: u16) -> Result<(), Error>;
}

/// Operation of the speaker set as a whole.
pub trait ItrigueOperation {
    /// Whether the power is on.
    fn get_onoff(&self) -> Result<bool, Error>;

    /// Switch the power.
    fn set_onoff(&mut self, on: bool) -> Result<(), Error>;

    /// The level written last time to the channel, or `None` if never written.
    fn get_pot(&self, channel: PotChannel) -> Result<Option<u8>, Error>;

    /// Write the level to the channel after clamping, then return the written level.
    fn set_pot(&mut self, channel: PotChannel, value: i32) -> Result<u8, Error>;
}

/// The power switch over one GPIO line.
#[derive(Debug)]
pub struct PowerSwitch<L> {
    line: L,
}

impl<L: PowerLineOperation> PowerSwitch<L> {
    pub fn new(line: L) -> Self {
        Self { line }
    }

    pub fn get_onoff(&self) -> Result<bool, Error> {
        self.line.read_level()
    }

    pub fn set_onoff(&mut self, on: bool) -> Result<(), Error> {
        self.line.write_level(on)
    }

    pub fn into_inner(self) -> L {
        self.line
    }
}

/// The channel of potentiometer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PotChannel {
    Bass,
    Volume,
}

impl PotChannel {
    pub const ALL: [PotChannel; 2] = [PotChannel::Bass, PotChannel::Volume];

    pub fn index(&self) -> usize {
        match self {
            PotChannel::Bass => 0,
            PotChannel::Volume => 1,
        }
    }
}

impl TryFrom<usize> for PotChannel {
    type Error = Error;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        PotChannel::ALL.iter().nth(index).copied().ok_or_else(|| {
            let msg = format!("Invalid index of potentiometer channel: {}", index);
            Error::new(ItrigueError::Invalid(index as i32), &msg)
        })
    }
}

/// The minimum position of wiper.
pub const LEVEL_MIN: u8 = u8::MIN;
/// The maximum position of wiper.
pub const LEVEL_MAX: u8 = u8::MAX;

const CMD_SET_WIPER: u16 = 0x10;

/// Clamp the value into the range of wiper position.
pub fn clamp_level(value: i32) -> u8 {
    value.clamp(LEVEL_MIN as i32, LEVEL_MAX as i32) as u8
}

/// Build the command word to set wiper position of the channel.
pub fn encode_set_wiper(channel: PotChannel, level: u8) -> u16 {
    ((CMD_SET_WIPER | (1 << channel.index())) << 8) | level as u16
}

/// The dual-channel potentiometer, with the cache of levels since it has no read path.
#[derive(Debug)]
pub struct Potentiometers<T> {
    transport: T,
    levels: [Option<u8>; 2],
}

impl<T: WordTransferOperation> Potentiometers<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            levels: Default::default(),
        }
    }

    pub fn get_pot(&self, channel: PotChannel) -> Option<u8> {
        self.levels[channel.index()]
    }

    /// The cache is updated only when the transfer finishes successfully.
    pub fn set_pot(&mut self, channel: PotChannel, value: i32) -> Result<u8, Error> {
        let level = clamp_level(value);
        let word = encode_set_wiper(channel, level);
        self.transport
            .transfer_word(word)
            .map(|_| self.levels[channel.index()] = Some(level))
            .map(|_| level)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}
