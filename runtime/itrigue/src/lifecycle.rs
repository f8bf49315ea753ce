// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Rodrigo Lemos

use {
    glib::Error,
    tracing::{debug, debug_span},
};

/// The stage of attach reached by one fallible step of acquisition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttachStage {
    GpioClaimed,
    GpioConfigured,
    SpiBusFound,
    SpiDeviceRegistered,
    SpiConfigured,
    MixerRegistered,
}

impl AttachStage {
    /// The stages reached by the steps, in the order of acquisition.
    pub const STEPS: [AttachStage; 6] = [
        AttachStage::GpioClaimed,
        AttachStage::GpioConfigured,
        AttachStage::SpiBusFound,
        AttachStage::SpiDeviceRegistered,
        AttachStage::SpiConfigured,
        AttachStage::MixerRegistered,
    ];
}

/// Acquisition and release of the resources step by step.
pub trait HardwareLifecycle {
    /// Do the step to reach the stage.
    fn acquire(&mut self, stage: AttachStage) -> Result<(), Error>;

    /// Undo the step which reached the stage. Never called for the step not completed.
    fn release(&mut self, stage: AttachStage);
}

/// The resources attached completely, thus the service is running while the instance exists.
/// Before it is created and after it is dropped, nothing is acquired. The resources are released
/// in reverse order when dropped.
#[derive(Debug)]
pub struct Attachment<T: HardwareLifecycle> {
    resources: T,
    completed: Vec<AttachStage>,
}

impl<T: HardwareLifecycle> Drop for Attachment<T> {
    fn drop(&mut self) {
        let _enter = debug_span!("detach").entered();
        unwind(&mut self.resources, &mut self.completed);
    }
}

fn unwind<T: HardwareLifecycle>(resources: &mut T, completed: &mut Vec<AttachStage>) {
    while let Some(stage) = completed.pop() {
        resources.release(stage);
        debug!(?stage, "released");
    }
}

impl<T: HardwareLifecycle> Attachment<T> {
    /// Acquire all of resources in the order of steps. At failure of any step, the steps
    /// completed are undone in reverse order, then the error of the step is returned.
    pub fn attach(mut resources: T) -> Result<Self, Error> {
        let _enter = debug_span!("attach").entered();

        let mut completed = Vec::with_capacity(AttachStage::STEPS.len());

        for &stage in AttachStage::STEPS.iter() {
            let res = resources.acquire(stage);
            debug!(?stage, ?res);

            if let Err(err) = res {
                unwind(&mut resources, &mut completed);
                return Err(err);
            }

            completed.push(stage);
        }

        Ok(Self {
            resources,
            completed,
        })
    }

    pub fn resources(&self) -> &T {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut T {
        &mut self.resources
    }
}
