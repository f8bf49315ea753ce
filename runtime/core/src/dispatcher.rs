// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Rodrigo Lemos

use {
    super::*,
    alsactl::{prelude::CardExt, Card},
    glib::{prelude::IsA, source, ControlFlow, FileError, MainContext, MainLoop, Source},
    nix::sys::signal,
    std::{
        sync::{mpsc, Arc},
        thread,
    },
    tracing::debug,
};

/// The thread to run glib main loop for event sources.
pub struct Dispatcher {
    name: String,
    th: Option<thread::JoinHandle<()>>,
    ev_loop: Arc<MainLoop>,
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.ev_loop.quit();

        if let Some(th) = self.th.take() {
            let res = th.join();
            debug!(name = self.name.as_str(), joined = res.is_ok());
        }
    }
}

impl Dispatcher {
    /// Launch the thread, then wait for the main loop to dispatch its first source.
    pub fn run(name: String) -> Result<Dispatcher, Error> {
        let ctx = MainContext::new();
        let ev_loop = Arc::new(MainLoop::new(Some(&ctx), false));

        let (tx, rx) = mpsc::sync_channel(1);
        let src = source::idle_source_new(None, source::Priority::DEFAULT_IDLE, move || {
            let _ = tx.send(());
            ControlFlow::Break
        });
        src.attach(Some(&ctx));

        let l = ev_loop.clone();
        let th = thread::spawn(move || {
            l.run();
        });

        rx.recv().map_err(|_| {
            let msg = format!("{} quits before launch", name);
            Error::new(FileError::Failed, &msg)
        })?;

        debug!(name = name.as_str(), "dispatcher is running");

        let th = Some(th);
        Ok(Dispatcher { name, th, ev_loop })
    }

    pub fn stop(&mut self) {
        self.ev_loop.quit();
    }

    fn attach_src_to_ctx(&mut self, src: &Source) {
        let ctx = self.ev_loop.context();
        src.attach(Some(&ctx));
    }

    /// The callback is invoked in the thread of dispatcher.
    pub fn attach_signal_handler<F>(&mut self, signum: signal::Signal, cb: F)
    where
        F: FnMut() -> ControlFlow + Send + 'static,
    {
        let src =
            source::unix_signal_source_new(signum as i32, None, source::Priority::DEFAULT_IDLE, cb);

        self.attach_src_to_ctx(&src);
    }

    /// Dispatch the events of control elements in the sound card. The callback is invoked when
    /// the card is disconnected.
    pub fn attach_snd_card<C, F>(&mut self, card: &C, disconnect_cb: F) -> Result<(), Error>
    where
        C: IsA<Card>,
        F: Fn(&C) + 'static,
    {
        let src = card.create_source()?;

        card.connect_handle_disconnection(disconnect_cb);

        self.attach_src_to_ctx(&src);

        Ok(())
    }
}
