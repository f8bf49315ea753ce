// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Rodrigo Lemos

use {
    super::*,
    alsactl::{prelude::*, *},
    glib::FileError,
    tracing::{debug, debug_span, enabled, Level},
};

/// The container of control elements added to the sound card by the service, with the value
/// which each element held at the last dispatch. The elements are removed when the container is
/// dropped.
#[derive(Default)]
pub struct CardCntr {
    pub card: Card,
    entries: Vec<(ElemInfo, ElemValue)>,
}

/// The model of control elements over the hardware.
pub trait CtlModel<O: Sized> {
    fn load(&mut self, card_cntr: &mut CardCntr) -> Result<(), Error>;

    /// Fill the value by the state of hardware. False if the element is not for the model.
    fn read(
        &mut self,
        unit: &mut O,
        elem_id: &ElemId,
        elem_value: &mut ElemValue,
    ) -> Result<bool, Error>;

    /// Write the new value to hardware, then return whether the state of hardware changed. False
    /// as well if the element is not for the model.
    fn write(
        &mut self,
        unit: &mut O,
        elem_id: &ElemId,
        old: &ElemValue,
        new: &ElemValue,
    ) -> Result<bool, Error>;
}

/// The destination of values published to control elements.
pub trait ElemValueSink {
    fn publish(&mut self, elem_id: &ElemId, elem_value: &ElemValue) -> Result<(), Error>;
}

impl ElemValueSink for Card {
    fn publish(&mut self, elem_id: &ElemId, elem_value: &ElemValue) -> Result<(), Error> {
        self.write_elem_value(elem_id, elem_value)
    }
}

/// The result to write the value of element to hardware.
#[derive(Debug)]
pub enum ElemUpdate {
    /// The state of hardware changed. The value is what the hardware took.
    Changed(ElemValue),
    /// The state of hardware is kept, thus the element is back to the old value if needed.
    Unchanged,
}

/// Write the new value to hardware, then let the element hold the value which the hardware
/// took. At failure, the element is back to the old value and the error of hardware is
/// returned.
pub fn update_elem_value<O, T, S>(
    unit: &mut O,
    ctl_model: &mut T,
    sink: &mut S,
    elem_id: &ElemId,
    old: &ElemValue,
    new: &ElemValue,
) -> Result<ElemUpdate, Error>
where
    T: CtlModel<O>,
    S: ElemValueSink,
{
    let changed = match ctl_model.write(unit, elem_id, old, new) {
        Ok(changed) => changed,
        Err(err) => {
            let res = sink.publish(elem_id, old);
            debug!(numid = elem_id.numid(), restored = ?res);
            return Err(err);
        }
    };

    if !changed {
        if !old.equal(new) {
            sink.publish(elem_id, old)?;
        }
        return Ok(ElemUpdate::Unchanged);
    }

    // The hardware may take the value different from the request, e.g. clamped.
    let mut effective = ElemValue::new();
    if ctl_model.read(unit, elem_id, &mut effective)? && !effective.equal(new) {
        sink.publish(elem_id, &effective)?;
        Ok(ElemUpdate::Changed(effective))
    } else {
        Ok(ElemUpdate::Changed(new.clone()))
    }
}

/// Publish the value read from the model when it differs from the cached one. The value refused
/// by the sound card is logged and not cached.
pub fn refresh_elem_value<O, T, S>(
    unit: &mut O,
    ctl_model: &mut T,
    sink: &mut S,
    elem_id: &ElemId,
    cached: &mut ElemValue,
) -> Result<bool, Error>
where
    T: CtlModel<O>,
    S: ElemValueSink,
{
    let mut val = ElemValue::new();
    if !ctl_model.read(unit, elem_id, &mut val)? || cached.equal(&val) {
        return Ok(false);
    }

    let res = sink.publish(elem_id, &val);
    debug!(numid = elem_id.numid(), ?res);
    Ok(res.map(|_| *cached = val).is_ok())
}

impl Drop for CardCntr {
    fn drop(&mut self) {
        let card = &self.card;
        self.entries
            .iter()
            .filter_map(|(elem_info, _)| elem_info.as_ref().elem_id())
            .for_each(|elem_id| {
                let res = card.remove_elems(&elem_id);
                debug!(numid = elem_id.numid(), ?res);
            });
    }
}

fn elem_access() -> ElemAccessFlag {
    ElemAccessFlag::READ | ElemAccessFlag::WRITE | ElemAccessFlag::VOLATILE
}

/// Find the element left in the sound card, which has the same name, interface, and indices.
fn find_leftover<'a>(elem_id_list: &'a [ElemId], elem_id: &ElemId) -> Option<&'a ElemId> {
    elem_id_list.iter().find(|eid| {
        eid.name() == elem_id.name()
            && eid.iface() == elem_id.iface()
            && eid.device_id() == elem_id.device_id()
            && eid.subdevice_id() == elem_id.subdevice_id()
            && eid.index() == elem_id.index()
    })
}

fn value_literal(elem_info: &ElemInfo, elem_value: &ElemValue) -> String {
    match elem_info {
        ElemInfo::Boolean(_) => elem_value.boolean()[0].to_string(),
        ElemInfo::Integer(_) => elem_value.int()[0].to_string(),
        _ => "unsupported".to_string(),
    }
}

impl CardCntr {
    /// Add the element with one boolean value.
    pub fn add_bool_elem(&mut self, elem_id: &ElemId) -> Result<ElemId, Error> {
        let _enter = debug_span!("boolean").entered();

        let elem_info = ElemInfoBoolean::new();
        elem_info.set_value_count(1);
        elem_info.set_access(elem_access());

        let res = self.add_elem(elem_id, &elem_info);
        debug!(name = elem_id.name().as_str(), ?res);
        res
    }

    /// Add the element with one integer value in the range.
    pub fn add_int_elem(
        &mut self,
        elem_id: &ElemId,
        min: i32,
        max: i32,
        step: i32,
    ) -> Result<ElemId, Error> {
        let _enter = debug_span!("integer").entered();

        let elem_info = ElemInfoInteger::new();
        elem_info.set_value_count(1);
        elem_info.set_value_min(min);
        elem_info.set_value_max(max);
        elem_info.set_value_step(step);
        elem_info.set_access(elem_access());

        let res = self.add_elem(elem_id, &elem_info);
        debug!(name = elem_id.name().as_str(), min, max, step, ?res);
        res
    }

    fn add_elem<I: AsRef<ElemInfoCommon>>(
        &mut self,
        elem_id: &ElemId,
        elem_info: &I,
    ) -> Result<ElemId, Error> {
        // The element left by the instance of service which was not shut down. The kernel refuses
        // to remove it while the other process owns it.
        let elem_id_list = self.card.elem_id_list()?;
        if let Some(leftover) = find_leftover(&elem_id_list, elem_id) {
            let res = self.card.remove_elems(leftover);
            debug!(numid = leftover.numid(), leftover = true, ?res);
            res?;
        }

        let elem_id = self
            .card
            .add_elems(elem_id, 1, elem_info)?
            .pop()
            .ok_or_else(|| Error::new(FileError::Io, "No element is added"))?;

        let card = &self.card;
        let entry = card.elem_info(&elem_id).and_then(|info| {
            let mut v = ElemValue::new();
            card.read_elem_value(&elem_id, &mut v).map(|_| (info, v))
        });
        let (info, v) = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let _ = card.remove_elems(&elem_id);
                return Err(err);
            }
        };

        if enabled!(Level::DEBUG) {
            let common: &ElemInfoCommon = info.as_ref();
            debug!(
                numid = elem_id.numid(),
                access = ?common.access(),
                elem_type = ?common.elem_type(),
                value = value_literal(&info, &v).as_str(),
            );
        }
        self.entries.push((info, v));

        // Let the other processes write to it.
        let res = self.card.lock_elem(&elem_id, false);
        debug!(numid = elem_id.numid(), unlock = ?res);

        Ok(elem_id)
    }

    /// Publish the state of hardware to all of elements. The element whose value is refused by
    /// the sound card keeps the previous value.
    pub fn refresh_elems<O, T>(&mut self, unit: &mut O, ctl_model: &mut T) -> Result<(), Error>
    where
        O: Sized,
        T: CtlModel<O>,
    {
        let _enter = debug_span!("refresh").entered();

        let card = &mut self.card;

        for (elem_info, cached) in self.entries.iter_mut() {
            if let Some(elem_id) = elem_info.as_ref().elem_id() {
                let published = refresh_elem_value(unit, ctl_model, card, &elem_id, cached)?;
                debug!(
                    numid = elem_id.numid(),
                    published,
                    value = value_literal(elem_info, cached).as_str(),
                );
            }
        }

        Ok(())
    }

    pub fn dispatch_elem_event<O, T>(
        &mut self,
        unit: &mut O,
        elem_id: &ElemId,
        events: &ElemEventMask,
        ctl_model: &mut T,
    ) -> Result<(), Error>
    where
        O: Sized,
        T: CtlModel<O>,
    {
        if events.contains(ElemEventMask::REMOVE) {
            let _enter = debug_span!("remove").entered();
            debug!(numid = elem_id.numid());

            self.entries.retain(|(elem_info, _)| {
                elem_info
                    .as_ref()
                    .elem_id()
                    .map(|eid| !eid.eq(elem_id))
                    .unwrap_or(true)
            });
            return Ok(());
        }

        if !events.contains(ElemEventMask::VALUE) {
            return Ok(());
        }

        let _enter = debug_span!("value").entered();

        let card = &mut self.card;
        let (elem_info, cached) = match self.entries.iter_mut().find(|(elem_info, _)| {
            elem_info
                .as_ref()
                .elem_id()
                .map(|eid| eid.eq(elem_id))
                .unwrap_or_default()
        }) {
            Some(entry) => entry,
            None => return Ok(()),
        };

        let mut val = ElemValue::new();
        card.read_elem_value(elem_id, &mut val)?;

        // Published by the service itself.
        if cached.equal(&val) {
            return Ok(());
        }

        let res = update_elem_value(unit, ctl_model, card, elem_id, cached, &val);
        debug!(
            numid = elem_id.numid(),
            old = value_literal(elem_info, cached).as_str(),
            new = value_literal(elem_info, &val).as_str(),
            ?res,
        );

        if let ElemUpdate::Changed(effective) = res? {
            *cached = effective;
        }

        Ok(())
    }
}
