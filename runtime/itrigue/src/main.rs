// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Rodrigo Lemos

mod lifecycle;
mod model;
mod resources;
mod unit;

use {
    alsactl::{prelude::*, *},
    clap::Parser,
    glib::Error,
    itrigue_protocols as protocols,
    lifecycle::{AttachStage, Attachment},
    model::*,
    nix::sys::signal,
    protocols::{spi::DEFAULT_SPEED_HZ, ItrigueError},
    resources::*,
    runtime_core::{card_cntr::*, cmdline::*, dispatcher::*, LogLevel, *},
    std::sync::mpsc,
    tracing::{debug, debug_span, info, Level},
};

enum Event {
    Shutdown,
    Disconnected,
    Elem((ElemId, ElemEventMask)),
}

struct ItrigueRuntime {
    attachment: Attachment<ItrigueResources>,
    rx: mpsc::Receiver<Event>,
    tx: mpsc::SyncSender<Event>,
    dispatchers: Vec<Dispatcher>,
}

impl Drop for ItrigueRuntime {
    fn drop(&mut self) {
        // At first, stop event loop in all of dispatchers to avoid queueing new events.
        for dispatcher in &mut self.dispatchers {
            dispatcher.stop();
        }

        // Next, consume all events in queue to release blocked thread for sender.
        for _ in self.rx.try_iter() {}

        // Finally Finish I/O threads.
        self.dispatchers.clear();

        info!("I-Trigue 3300 is going to be detached");
    }
}

impl RuntimeOperation<ItrigueParams> for ItrigueRuntime {
    fn new(params: ItrigueParams, log_level: Option<LogLevel>) -> Result<Self, Error> {
        if let Some(level) = log_level {
            let fmt_level = match level {
                LogLevel::Debug => Level::DEBUG,
            };
            tracing_subscriber::fmt().with_max_level(fmt_level).init();
        }

        let attachment = Attachment::attach(ItrigueResources::new(params))?;
        debug!(steps = AttachStage::STEPS.len(), "attached");

        // Use uni-directional channel for communication to child threads.
        let (tx, rx) = mpsc::sync_channel(32);

        Ok(ItrigueRuntime {
            attachment,
            rx,
            tx,
            dispatchers: Default::default(),
        })
    }

    fn listen(&mut self) -> Result<(), Error> {
        self.launch_system_event_dispatcher()?;

        let _enter = debug_span!("refresh").entered();
        self.attachment.resources_mut().refresh_elems()
    }

    fn run(&mut self) -> Result<(), Error> {
        let enter = debug_span!("event").entered();
        loop {
            let ev = match self.rx.recv() {
                Ok(ev) => ev,
                Err(_) => continue,
            };

            match ev {
                Event::Shutdown => break,
                Event::Disconnected => {
                    debug!("sound card is disconnected");
                    break;
                }
                Event::Elem((elem_id, events)) => {
                    let _enter = debug_span!("element").entered();

                    debug!(
                        numid = elem_id.numid(),
                        name = elem_id.name().as_str(),
                        iface = ?elem_id.iface(),
                        device_id = elem_id.device_id(),
                        subdevice_id = elem_id.subdevice_id(),
                        index = elem_id.index(),
                    );

                    let res = self
                        .attachment
                        .resources_mut()
                        .dispatch_elem_event(&elem_id, &events);
                    debug!(?res);
                }
            }
        }

        enter.exit();

        Ok(())
    }
}

impl ItrigueRuntime {
    const SYSTEM_DISPATCHER_NAME: &'static str = "system event dispatcher";

    fn launch_system_event_dispatcher(&mut self) -> Result<(), Error> {
        let name = Self::SYSTEM_DISPATCHER_NAME.to_string();
        let mut dispatcher = Dispatcher::run(name)?;

        [signal::Signal::SIGINT, signal::Signal::SIGTERM]
            .iter()
            .for_each(|&signum| {
                let tx = self.tx.clone();
                dispatcher.attach_signal_handler(signum, move || {
                    let _ = tx.send(Event::Shutdown);
                    glib::ControlFlow::Break
                });
            });

        let card = self
            .attachment
            .resources()
            .card()
            .ok_or_else(|| Error::new(ItrigueError::NotAttached, "mixer is not registered"))?;

        let tx = self.tx.clone();
        dispatcher.attach_snd_card(card, move |_| {
            let _ = tx.send(Event::Disconnected);
        })?;

        let tx = self.tx.clone();
        card.connect_handle_elem_event(move |_, elem_id, events| {
            let _ = tx.send(Event::Elem((elem_id.clone(), events)));
        });

        self.dispatchers.push(dispatcher);

        Ok(())
    }
}

struct ItrigueServiceCmd;

#[derive(Parser, Default)]
#[clap(name = "snd-itrigue-ctl-service")]
struct Arguments {
    /// The numeric identifier of sound card in Linux sound subsystem.
    card_id: u32,

    /// The GPIO character device with the line to switch power.
    #[clap(long, default_value = "/dev/gpiochip0")]
    gpio_chip: String,

    /// The offset of line to switch power in the GPIO character device.
    #[clap(long, default_value_t = 139)]
    gpio_line: u32,

    /// The number of SPI bus with the potentiometer.
    #[clap(long, default_value_t = 4)]
    spi_bus: u16,

    /// The chip select of potentiometer in the SPI bus.
    #[clap(long, default_value_t = 0)]
    spi_cs: u8,

    /// The speed of SPI transfer in Hz.
    #[clap(long, default_value_t = DEFAULT_SPEED_HZ)]
    speed_hz: u32,

    /// The name of control element for bass.
    #[clap(long, value_enum, default_value_t = BassCtlName::PlaybackVolume)]
    bass_name: BassCtlName,

    /// The level to debug runtime, disabled as a default.
    #[clap(long, short, value_enum)]
    log_level: Option<LogLevel>,
}

impl ServiceCmd<Arguments, ItrigueParams, ItrigueRuntime> for ItrigueServiceCmd {
    fn params(args: &Arguments) -> (ItrigueParams, Option<LogLevel>) {
        let params = ItrigueParams {
            card_id: args.card_id,
            gpio_chip: args.gpio_chip.clone(),
            gpio_line: args.gpio_line,
            spi_bus: args.spi_bus,
            spi_cs: args.spi_cs,
            speed_hz: args.speed_hz,
            bass_name: args.bass_name,
        };
        (params, args.log_level)
    }
}

fn main() {
    ItrigueServiceCmd::run()
}
