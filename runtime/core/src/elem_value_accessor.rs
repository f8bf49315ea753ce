// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Rodrigo Lemos

use {
    alsactl::{prelude::*, ElemValue},
    glib::prelude::IsA,
};

/// Accessor to the first value in control element by the type of value. The elements added by
/// the service have one value each.
pub trait ElemValueAccessor<T: Copy>: IsA<ElemValue> {
    fn set_val(&self, val: T);

    fn get_val(&self) -> T;
}

impl ElemValueAccessor<bool> for ElemValue {
    fn set_val(&self, val: bool) {
        self.set_bool(&[val])
    }

    fn get_val(&self) -> bool {
        self.boolean()[0]
    }
}

impl ElemValueAccessor<i32> for ElemValue {
    fn set_val(&self, val: i32) {
        self.set_int(&[val])
    }

    fn get_val(&self) -> i32 {
        self.int()[0]
    }
}
