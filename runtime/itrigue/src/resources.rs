// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Rodrigo Lemos

use {
    super::*,
    crate::{
        lifecycle::{AttachStage, HardwareLifecycle},
        unit::ItrigueUnit,
    },
    protocols::ItrigueError,
};

/// The parameters given at launch, fixed till the end of service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItrigueParams {
    pub card_id: u32,
    pub gpio_chip: String,
    pub gpio_line: u32,
    pub spi_bus: u16,
    pub spi_cs: u8,
    pub speed_hz: u32,
    pub bass_name: BassCtlName,
}

fn not_registered() -> Error {
    Error::new(ItrigueError::NotAttached, "mixer is not registered")
}

/// The hardware of speaker set and the control elements for it.
pub struct ItrigueResources {
    params: ItrigueParams,
    unit: ItrigueUnit,
    card_cntr: Option<CardCntr>,
    model: ItrigueModel,
}

impl ItrigueResources {
    pub fn new(params: ItrigueParams) -> Self {
        let model = ItrigueModel::new(params.bass_name);
        Self {
            params,
            unit: Default::default(),
            card_cntr: None,
            model,
        }
    }

    fn register_mixer(&mut self) -> Result<(), Error> {
        let mut card_cntr = CardCntr::default();
        card_cntr
            .card
            .open(self.params.card_id, 0)
            .map_err(|err| {
                let msg = format!("card {}: {}", self.params.card_id, err);
                Error::new(ItrigueError::AllocationFailure, &msg)
            })?;

        // The container is dropped at failure so that the elements added partially are removed.
        CtlModel::<ItrigueUnit>::load(&mut self.model, &mut card_cntr).map_err(|err| {
            self.model.elem_id_list.clear();
            Error::new(ItrigueError::RegistrationFailure, &err.to_string())
        })?;

        info!(
            "I-Trigue 3300 mixer registered to card {} with {} elements",
            self.params.card_id,
            self.model.elem_id_list.len()
        );
        self.card_cntr = Some(card_cntr);
        Ok(())
    }

    fn unregister_mixer(&mut self) {
        self.card_cntr = None;
        self.model.elem_id_list.clear();
    }

    pub fn card(&self) -> Option<&Card> {
        self.card_cntr.as_ref().map(|card_cntr| &card_cntr.card)
    }

    /// Publish the current state of hardware to the control elements.
    pub fn refresh_elems(&mut self) -> Result<(), Error> {
        let card_cntr = self.card_cntr.as_mut().ok_or_else(not_registered)?;
        card_cntr.refresh_elems(&mut self.unit, &mut self.model)
    }

    pub fn dispatch_elem_event(
        &mut self,
        elem_id: &ElemId,
        events: &ElemEventMask,
    ) -> Result<(), Error> {
        let card_cntr = self.card_cntr.as_mut().ok_or_else(not_registered)?;
        card_cntr.dispatch_elem_event(&mut self.unit, elem_id, events, &mut self.model)
    }
}

impl HardwareLifecycle for ItrigueResources {
    fn acquire(&mut self, stage: AttachStage) -> Result<(), Error> {
        match stage {
            AttachStage::GpioClaimed => self
                .unit
                .claim_power_line(&self.params.gpio_chip, self.params.gpio_line),
            AttachStage::GpioConfigured => self.unit.configure_power_line(),
            AttachStage::SpiBusFound => self
                .unit
                .find_pot_bus(self.params.spi_bus, self.params.spi_cs),
            AttachStage::SpiDeviceRegistered => self.unit.register_pot_device(),
            AttachStage::SpiConfigured => self.unit.configure_pot_device(self.params.speed_hz),
            AttachStage::MixerRegistered => self.register_mixer(),
        }
    }

    fn release(&mut self, stage: AttachStage) {
        match stage {
            AttachStage::GpioClaimed => self.unit.release_power_line(),
            AttachStage::GpioConfigured => self.unit.unconfigure_power_line(),
            AttachStage::SpiBusFound => self.unit.forget_pot_bus(),
            AttachStage::SpiDeviceRegistered => self.unit.unregister_pot_device(),
            AttachStage::SpiConfigured => self.unit.unconfigure_pot_device(),
            AttachStage::MixerRegistered => self.unregister_mixer(),
        }
    }
}
