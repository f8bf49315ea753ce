// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2024 Rodrigo Lemos

//! Protocol implementation for the power switch over Linux GPIO character device.

use {
    super::*,
    gpio_cdev::{Chip, Line, LineHandle, LineRequestFlags},
};

/// The label of consumer for the line.
pub const POWER_LINE_CONSUMER: &str = "itrigue::on/off";

fn unavailable(err: gpio_cdev::Error, label: &str) -> Error {
    let msg = format!("{}: {}", label, err);
    Error::new(ItrigueError::ResourceUnavailable, &msg)
}

fn ensure_unused(label: &str, used: bool, consumer: Option<&str>) -> Result<(), Error> {
    if used {
        let msg = format!(
            "{} is already used by {}",
            label,
            consumer.unwrap_or("unknown consumer")
        );
        Err(Error::new(ItrigueError::ResourceUnavailable, &msg))
    } else {
        Ok(())
    }
}

/// Find the line in the chip and check that no one else uses it at the moment. The line is not
/// claimed yet, thus the other process can still request it before `request_power_line()`, which
/// claims it exclusively and fails with `ResourceUnavailable` in the case.
pub fn find_power_line(chip_path: &str, offset: u32) -> Result<Line, Error> {
    let label = format!("line {} of {}", offset, chip_path);

    let mut chip = Chip::new(chip_path).map_err(|e| unavailable(e, chip_path))?;
    let line = chip.get_line(offset).map_err(|e| unavailable(e, &label))?;
    let info = line.info().map_err(|e| unavailable(e, &label))?;
    ensure_unused(&label, info.is_used(), info.consumer()).map(|_| line)
}

/// Claim the line exclusively as output with low level as initial state. The line is held till
/// the handle is dropped.
pub fn request_power_line(line: &Line) -> Result<LineHandle, Error> {
    line.request(LineRequestFlags::OUTPUT, 0, POWER_LINE_CONSUMER)
        .map_err(|e| {
            let label = format!("line {} for output", line.offset());
            unavailable(e, &label)
        })
}

impl PowerLineOperation for LineHandle {
    fn read_level(&self) -> Result<bool, Error> {
        self.get_value()
            .map(|val| val > 0)
            .map_err(|e| unavailable(e, "read level"))
    }

    fn write_level(&mut self, level: bool) -> Result<(), Error> {
        self.set_value(level as u8)
            .map_err(|e| unavailable(e, "write level"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn line_used_by_other() {
        assert!(ensure_unused("line 139 of /dev/gpiochip0", false, None).is_ok());

        let err = ensure_unused("line 139 of /dev/gpiochip0", true, Some("sysfs")).unwrap_err();
        assert_eq!(
            err.kind::<ItrigueError>(),
            Some(ItrigueError::ResourceUnavailable)
        );
        assert_eq!(
            err.message(),
            "line 139 of /dev/gpiochip0 is already used by sysfs"
        );

        let err = ensure_unused("line 139 of /dev/gpiochip0", true, None).unwrap_err();
        assert_eq!(
            err.message(),
            "line 139 of /dev/gpiochip0 is already used by unknown consumer"
        );
    }

    #[test]
    fn missing_chip() {
        let err = find_power_line("/nonexistent/gpiochip", 139).unwrap_err();
        assert_eq!(
            err.kind::<ItrigueError>(),
            Some(ItrigueError::ResourceUnavailable)
        );
    }
}
