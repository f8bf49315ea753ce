// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Rodrigo Lemos

use {
    super::*,
    clap::ValueEnum,
    protocols::*,
    runtime_core::elem_value_accessor::ElemValueAccessor,
};

const SWITCH_NAME: &str = "Master Playback Switch";
const VOLUME_NAME: &str = "Master Playback Volume";
const BASS_PLAYBACK_NAME: &str = "Bass Playback Volume";
const BASS_TONE_NAME: &str = "Tone Control - Bass";

/// The value reported for the channel of potentiometer never written.
const LEVEL_UNKNOWN: i32 = -1;

/// The name of control element for bass, since mixer applications differ in the convention.
#[derive(ValueEnum, Debug, Copy, Clone, Eq, PartialEq)]
pub enum BassCtlName {
    /// "Bass Playback Volume", handled as volume.
    PlaybackVolume,
    /// "Tone Control - Bass", handled as tone control.
    ToneControl,
}

impl Default for BassCtlName {
    fn default() -> Self {
        Self::PlaybackVolume
    }
}

impl BassCtlName {
    fn as_str(&self) -> &'static str {
        match self {
            Self::PlaybackVolume => BASS_PLAYBACK_NAME,
            Self::ToneControl => BASS_TONE_NAME,
        }
    }
}

/// The type and range of value in control element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControlInfo {
    Boolean,
    Integer { min: i32, max: i32, step: i32 },
}

/// One control exposed to mixer applications, which delegates to one part of the speaker set.
pub trait MixerControl {
    fn name(&self) -> &str;

    fn info(&self) -> ControlInfo;

    fn get<O: ItrigueOperation>(&self, unit: &O) -> Result<i32, Error>;

    /// Write the value, then return whether it differs from the value read before.
    fn put<O: ItrigueOperation>(&mut self, unit: &mut O, value: i32) -> Result<bool, Error>;
}

/// The switch of power.
#[derive(Debug)]
pub struct SwitchControl;

impl MixerControl for SwitchControl {
    fn name(&self) -> &str {
        SWITCH_NAME
    }

    fn info(&self) -> ControlInfo {
        ControlInfo::Boolean
    }

    fn get<O: ItrigueOperation>(&self, unit: &O) -> Result<i32, Error> {
        unit.get_onoff().map(|on| on as i32)
    }

    fn put<O: ItrigueOperation>(&mut self, unit: &mut O, value: i32) -> Result<bool, Error> {
        let old = unit.get_onoff()?;
        let on = value != 0;
        unit.set_onoff(on).map(|_| old != on)
    }
}

/// The level of one channel in potentiometer.
#[derive(Debug)]
pub struct LevelControl {
    name: &'static str,
    channel: PotChannel,
}

impl MixerControl for LevelControl {
    fn name(&self) -> &str {
        self.name
    }

    fn info(&self) -> ControlInfo {
        ControlInfo::Integer {
            min: LEVEL_MIN as i32,
            max: LEVEL_MAX as i32,
            step: 1,
        }
    }

    fn get<O: ItrigueOperation>(&self, unit: &O) -> Result<i32, Error> {
        unit.get_pot(self.channel)
            .map(|level| level.map(|l| l as i32).unwrap_or(LEVEL_UNKNOWN))
    }

    fn put<O: ItrigueOperation>(&mut self, unit: &mut O, value: i32) -> Result<bool, Error> {
        let old = unit.get_pot(self.channel)?;
        unit.set_pot(self.channel, value)
            .map(|level| old != Some(level))
    }
}

#[derive(Debug)]
enum ItrigueControl {
    Switch(SwitchControl),
    Level(LevelControl),
}

impl ItrigueControl {
    fn name(&self) -> &str {
        match self {
            Self::Switch(ctl) => ctl.name(),
            Self::Level(ctl) => ctl.name(),
        }
    }

    fn info(&self) -> ControlInfo {
        match self {
            Self::Switch(ctl) => ctl.info(),
            Self::Level(ctl) => ctl.info(),
        }
    }

    fn get<O: ItrigueOperation>(&self, unit: &O) -> Result<i32, Error> {
        match self {
            Self::Switch(ctl) => ctl.get(unit),
            Self::Level(ctl) => ctl.get(unit),
        }
    }

    fn put<O: ItrigueOperation>(&mut self, unit: &mut O, value: i32) -> Result<bool, Error> {
        match self {
            Self::Switch(ctl) => ctl.put(unit, value),
            Self::Level(ctl) => ctl.put(unit, value),
        }
    }
}

/// The set of control elements for the speaker set.
#[derive(Debug)]
pub struct ItrigueModel {
    controls: Vec<ItrigueControl>,
    pub elem_id_list: Vec<ElemId>,
}

impl ItrigueModel {
    pub fn new(bass_name: BassCtlName) -> Self {
        let controls = vec![
            ItrigueControl::Switch(SwitchControl),
            ItrigueControl::Level(LevelControl {
                name: VOLUME_NAME,
                channel: PotChannel::Volume,
            }),
            ItrigueControl::Level(LevelControl {
                name: bass_name.as_str(),
                channel: PotChannel::Bass,
            }),
        ];

        Self {
            controls,
            elem_id_list: Default::default(),
        }
    }

    fn find_control(&mut self, elem_id: &ElemId) -> Option<&mut ItrigueControl> {
        let name = elem_id.name();
        self.controls
            .iter_mut()
            .find(|ctl| ctl.name() == name.as_str())
    }
}

impl<O: ItrigueOperation> CtlModel<O> for ItrigueModel {
    fn load(&mut self, card_cntr: &mut CardCntr) -> Result<(), Error> {
        let elem_id_list = &mut self.elem_id_list;
        self.controls.iter().try_for_each(|ctl| {
            let elem_id = ElemId::new_by_name(ElemIfaceType::Mixer, 0, 0, ctl.name(), 0);
            match ctl.info() {
                ControlInfo::Boolean => card_cntr.add_bool_elem(&elem_id),
                ControlInfo::Integer { min, max, step } => {
                    card_cntr.add_int_elem(&elem_id, min, max, step)
                }
            }
            .map(|elem_id| elem_id_list.push(elem_id))
        })
    }

    fn read(
        &mut self,
        unit: &mut O,
        elem_id: &ElemId,
        elem_value: &mut ElemValue,
    ) -> Result<bool, Error> {
        let ctl = match self.find_control(elem_id) {
            Some(ctl) => ctl,
            None => return Ok(false),
        };

        let val = ctl.get(unit)?;
        match ctl.info() {
            ControlInfo::Boolean => ElemValueAccessor::<bool>::set_val(elem_value, val > 0),
            ControlInfo::Integer { .. } => ElemValueAccessor::<i32>::set_val(elem_value, val),
        }
        Ok(true)
    }

    fn write(
        &mut self,
        unit: &mut O,
        elem_id: &ElemId,
        _: &ElemValue,
        elem_value: &ElemValue,
    ) -> Result<bool, Error> {
        let ctl = match self.find_control(elem_id) {
            Some(ctl) => ctl,
            None => return Ok(false),
        };

        let val = match ctl.info() {
            ControlInfo::Boolean => ElemValueAccessor::<bool>::get_val(elem_value) as i32,
            ControlInfo::Integer { .. } => ElemValueAccessor::<i32>::get_val(elem_value),
        };

        let res = ctl.put(unit, val);
        debug!(name = ctl.name(), value = val, changed = ?res);
        res
    }
}

#[cfg(test)]
mod test {
    use {super::*, glib::FileError};

    #[derive(Default, Debug)]
    struct TestLine(bool);

    impl PowerLineOperation for TestLine {
        fn read_level(&self) -> Result<bool, Error> {
            Ok(self.0)
        }

        fn write_level(&mut self, level: bool) -> Result<(), Error> {
            self.0 = level;
            Ok(())
        }
    }

    #[derive(Default, Debug)]
    struct TestTransport {
        words: Vec<u16>,
        rejected: Option<u16>,
    }

    impl WordTransferOperation for TestTransport {
        fn transfer_word(&mut self, word: u16) -> Result<(), Error> {
            if self.rejected == Some(word) {
                Err(Error::new(ItrigueError::TransferFailure, "broken"))
            } else {
                self.words.push(word);
                Ok(())
            }
        }
    }

    /// Record the published values, like the sound card which validates the range of value.
    #[derive(Default, Debug)]
    struct TestSink {
        published: Vec<(String, i32)>,
        refuses_negative: bool,
    }

    impl ElemValueSink for TestSink {
        fn publish(&mut self, elem_id: &ElemId, elem_value: &ElemValue) -> Result<(), Error> {
            let val = elem_value.int()[0];
            if self.refuses_negative && val < 0 {
                Err(Error::new(FileError::Inval, "out of range"))
            } else {
                self.published.push((elem_id.name().to_string(), val));
                Ok(())
            }
        }
    }

    fn int_value(val: i32) -> ElemValue {
        let elem_value = ElemValue::new();
        elem_value.set_int(&[val]);
        elem_value
    }

    struct TestUnit {
        switch: PowerSwitch<TestLine>,
        pots: Potentiometers<TestTransport>,
    }

    impl Default for TestUnit {
        fn default() -> Self {
            Self {
                switch: PowerSwitch::new(TestLine::default()),
                pots: Potentiometers::new(TestTransport::default()),
            }
        }
    }

    impl ItrigueOperation for TestUnit {
        fn get_onoff(&self) -> Result<bool, Error> {
            self.switch.get_onoff()
        }

        fn set_onoff(&mut self, on: bool) -> Result<(), Error> {
            self.switch.set_onoff(on)
        }

        fn get_pot(&self, channel: PotChannel) -> Result<Option<u8>, Error> {
            Ok(self.pots.get_pot(channel))
        }

        fn set_pot(&mut self, channel: PotChannel, value: i32) -> Result<u8, Error> {
            self.pots.set_pot(channel, value)
        }
    }

    #[test]
    fn bass_ctl_name() {
        let model = ItrigueModel::new(BassCtlName::default());
        let names: Vec<&str> = model.controls.iter().map(|ctl| ctl.name()).collect();
        assert_eq!(names, vec![SWITCH_NAME, VOLUME_NAME, BASS_PLAYBACK_NAME]);

        let model = ItrigueModel::new(BassCtlName::ToneControl);
        assert_eq!(model.controls[2].name(), BASS_TONE_NAME);
    }

    #[test]
    fn switch_put_changed() {
        let mut unit = TestUnit::default();
        let mut ctl = SwitchControl;

        assert_eq!(ctl.get(&unit).unwrap(), 0);

        assert_eq!(ctl.put(&mut unit, 1).unwrap(), true);
        assert_eq!(unit.get_onoff().unwrap(), true);
        assert_eq!(ctl.get(&unit).unwrap(), 1);

        assert_eq!(ctl.put(&mut unit, 1).unwrap(), false);
        assert_eq!(ctl.put(&mut unit, 0).unwrap(), true);
        assert_eq!(unit.get_onoff().unwrap(), false);
    }

    #[test]
    fn level_put_changed() {
        let mut unit = TestUnit::default();
        let mut ctl = LevelControl {
            name: VOLUME_NAME,
            channel: PotChannel::Volume,
        };

        assert_eq!(ctl.get(&unit).unwrap(), LEVEL_UNKNOWN);

        assert_eq!(ctl.put(&mut unit, 300).unwrap(), true);
        assert_eq!(unit.get_pot(PotChannel::Volume).unwrap(), Some(255));
        assert_eq!(unit.pots.transport().words.last(), Some(&0x12ff));

        // Equivalent after clamping.
        assert_eq!(ctl.put(&mut unit, 255).unwrap(), false);
        assert_eq!(ctl.put(&mut unit, 1000).unwrap(), false);

        assert_eq!(ctl.put(&mut unit, 10).unwrap(), true);
        assert_eq!(ctl.get(&unit).unwrap(), 10);
        assert_eq!(unit.get_pot(PotChannel::Bass).unwrap(), None);
    }

    #[test]
    fn level_put_zero_to_unknown() {
        let mut unit = TestUnit::default();
        let mut ctl = LevelControl {
            name: BASS_PLAYBACK_NAME,
            channel: PotChannel::Bass,
        };

        assert_eq!(ctl.put(&mut unit, -5).unwrap(), true);
        assert_eq!(ctl.put(&mut unit, 0).unwrap(), false);
        assert_eq!(unit.pots.transport().words, vec![0x1100, 0x1100]);
    }

    #[test]
    fn model_read_write() {
        let mut unit = TestUnit::default();
        let mut model = ItrigueModel::new(BassCtlName::PlaybackVolume);

        let elem_id = ElemId::new_by_name(ElemIfaceType::Mixer, 0, 0, SWITCH_NAME, 0);
        let old = ElemValue::new();
        let new = ElemValue::new();
        new.set_bool(&[true]);
        assert_eq!(model.write(&mut unit, &elem_id, &old, &new).unwrap(), true);
        assert_eq!(unit.get_onoff().unwrap(), true);

        let mut elem_value = ElemValue::new();
        assert_eq!(model.read(&mut unit, &elem_id, &mut elem_value).unwrap(), true);
        assert_eq!(elem_value.boolean()[0], true);

        let elem_id = ElemId::new_by_name(ElemIfaceType::Mixer, 0, 0, VOLUME_NAME, 0);
        let mut elem_value = ElemValue::new();
        assert_eq!(model.read(&mut unit, &elem_id, &mut elem_value).unwrap(), true);
        assert_eq!(elem_value.int()[0], LEVEL_UNKNOWN);

        let new = ElemValue::new();
        new.set_int(&[300]);
        assert_eq!(model.write(&mut unit, &elem_id, &old, &new).unwrap(), true);

        let mut elem_value = ElemValue::new();
        assert_eq!(model.read(&mut unit, &elem_id, &mut elem_value).unwrap(), true);
        assert_eq!(elem_value.int()[0], 255);
        assert_eq!(unit.pots.transport().words, vec![0x12ff]);

        let elem_id = ElemId::new_by_name(ElemIfaceType::Mixer, 0, 0, BASS_TONE_NAME, 0);
        let mut elem_value = ElemValue::new();
        assert_eq!(model.read(&mut unit, &elem_id, &mut elem_value).unwrap(), false);
        assert_eq!(model.write(&mut unit, &elem_id, &old, &new).unwrap(), false);
    }

    #[test]
    fn clamped_value_published() {
        let mut unit = TestUnit::default();
        let mut model = ItrigueModel::new(BassCtlName::PlaybackVolume);
        let mut sink = TestSink::default();
        let elem_id = ElemId::new_by_name(ElemIfaceType::Mixer, 0, 0, VOLUME_NAME, 0);

        let old = int_value(LEVEL_UNKNOWN);
        let new = int_value(300);
        match update_elem_value(&mut unit, &mut model, &mut sink, &elem_id, &old, &new).unwrap() {
            ElemUpdate::Changed(effective) => assert_eq!(effective.int()[0], 255),
            ElemUpdate::Unchanged => unreachable!(),
        }
        assert_eq!(sink.published, vec![(VOLUME_NAME.to_string(), 255)]);
        assert_eq!(unit.pots.transport().words, vec![0x12ff]);

        // Equivalent to the level held by hardware, thus the element is back to it.
        let old = int_value(255);
        let new = int_value(1000);
        let update =
            update_elem_value(&mut unit, &mut model, &mut sink, &elem_id, &old, &new).unwrap();
        assert!(matches!(update, ElemUpdate::Unchanged));
        assert_eq!(
            sink.published,
            vec![
                (VOLUME_NAME.to_string(), 255),
                (VOLUME_NAME.to_string(), 255)
            ]
        );
        assert_eq!(unit.get_pot(PotChannel::Volume).unwrap(), Some(255));
    }

    #[test]
    fn accepted_value_not_published() {
        let mut unit = TestUnit::default();
        let mut model = ItrigueModel::new(BassCtlName::PlaybackVolume);
        let mut sink = TestSink::default();

        let elem_id = ElemId::new_by_name(ElemIfaceType::Mixer, 0, 0, SWITCH_NAME, 0);
        let old = ElemValue::new();
        let new = ElemValue::new();
        new.set_bool(&[true]);
        match update_elem_value(&mut unit, &mut model, &mut sink, &elem_id, &old, &new).unwrap() {
            ElemUpdate::Changed(effective) => assert_eq!(effective.boolean()[0], true),
            ElemUpdate::Unchanged => unreachable!(),
        }
        assert_eq!(unit.get_onoff().unwrap(), true);

        let elem_id = ElemId::new_by_name(ElemIfaceType::Mixer, 0, 0, BASS_PLAYBACK_NAME, 0);
        let old = int_value(LEVEL_UNKNOWN);
        let new = int_value(0);
        let update =
            update_elem_value(&mut unit, &mut model, &mut sink, &elem_id, &old, &new).unwrap();
        assert!(matches!(update, ElemUpdate::Changed(_)));

        assert!(sink.published.is_empty());
    }

    #[test]
    fn failed_transfer_restores_old_value() {
        let mut unit = TestUnit::default();
        unit.pots = Potentiometers::new(TestTransport {
            rejected: Some(0x1214),
            ..Default::default()
        });
        let mut model = ItrigueModel::new(BassCtlName::PlaybackVolume);
        let mut sink = TestSink::default();
        let elem_id = ElemId::new_by_name(ElemIfaceType::Mixer, 0, 0, VOLUME_NAME, 0);

        let old = int_value(LEVEL_UNKNOWN);
        let new = int_value(10);
        update_elem_value(&mut unit, &mut model, &mut sink, &elem_id, &old, &new).unwrap();

        let old = int_value(10);
        let new = int_value(20);
        let err =
            update_elem_value(&mut unit, &mut model, &mut sink, &elem_id, &old, &new).unwrap_err();
        assert_eq!(err.kind::<ItrigueError>(), Some(ItrigueError::TransferFailure));
        assert_eq!(sink.published, vec![(VOLUME_NAME.to_string(), 10)]);
        assert_eq!(unit.get_pot(PotChannel::Volume).unwrap(), Some(10));
        assert_eq!(unit.pots.transport().words, vec![0x120a]);
    }

    #[test]
    fn refresh_with_refused_value() {
        let mut unit = TestUnit::default();
        let mut model = ItrigueModel::new(BassCtlName::PlaybackVolume);
        let elem_id = ElemId::new_by_name(ElemIfaceType::Mixer, 0, 0, VOLUME_NAME, 0);

        // The sound card refuses the level never written.
        let mut sink = TestSink {
            refuses_negative: true,
            ..Default::default()
        };
        let mut cached = int_value(0);
        let published =
            refresh_elem_value(&mut unit, &mut model, &mut sink, &elem_id, &mut cached).unwrap();
        assert_eq!(published, false);
        assert_eq!(cached.int()[0], 0);
        assert!(sink.published.is_empty());

        unit.set_pot(PotChannel::Volume, 40).unwrap();
        let published =
            refresh_elem_value(&mut unit, &mut model, &mut sink, &elem_id, &mut cached).unwrap();
        assert_eq!(published, true);
        assert_eq!(cached.int()[0], 40);
        assert_eq!(sink.published, vec![(VOLUME_NAME.to_string(), 40)]);

        // Nothing to publish.
        let published =
            refresh_elem_value(&mut unit, &mut model, &mut sink, &elem_id, &mut cached).unwrap();
        assert_eq!(published, false);
        assert_eq!(sink.published.len(), 1);
    }
}
