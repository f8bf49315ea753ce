// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Rodrigo Lemos

//! Plumbing shared by service programs which expose the state of hardware as control elements
//! in ALSA control core.

pub mod card_cntr;
pub mod cmdline;
pub mod dispatcher;
pub mod elem_value_accessor;

use {clap::ValueEnum, glib::Error};

/// The level to debug runtime.
#[derive(ValueEnum, Debug, Copy, Clone, Eq, PartialEq)]
pub enum LogLevel {
    Debug,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Debug
    }
}

/// The life of service program.
pub trait RuntimeOperation<T>: Sized {
    /// Attach the hardware by the parameters. Nothing is left acquired at failure.
    fn new(params: T, log_level: Option<LogLevel>) -> Result<Self, Error>;

    /// Start receiving events from the system and the sound card.
    fn listen(&mut self) -> Result<(), Error>;

    /// Process the events till shutdown or disconnection.
    fn run(&mut self) -> Result<(), Error>;
}
