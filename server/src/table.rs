//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Fixed-capacity connection table
//!
//! The table is a plain slot arena. An empty slot is `None`, so "slot is free"
//! and "slot holds no transport" cannot disagree. Slots are always scanned in
//! index order, which is also the order sessions are serviced in.

use crate::types::SlotId;

/// Values that may carry a display name.
pub trait Named {
    /// Display name, if one has been chosen.
    fn name(&self) -> Option<&str>;
}

/// Fixed-size collection of optional sessions.
#[derive(Debug)]
pub struct ConnectionTable<T> {
    slots: Box<[Option<T>]>,
    active: usize,
}

impl<T> ConnectionTable<T> {
    /// Create a table with `capacity` empty slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            active: 0,
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.active
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Whether every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.active == self.slots.len()
    }

    /// Lowest-numbered free slot.
    pub fn first_free(&self) -> Option<SlotId> {
        self.slots
            .iter()
            .position(Option::is_none)
            .map(SlotId::new)
    }

    /// Place `value` in the first free slot.
    ///
    /// A full table hands the value back untouched.
    pub fn allocate(&mut self, value: T) -> Result<SlotId, T> {
        match self.first_free() {
            Some(slot) => {
                self.slots[slot.index()] = Some(value);
                self.active += 1;
                Ok(slot)
            }
            None => Err(value),
        }
    }

    /// Empty `slot`, returning what it held.
    pub fn release(&mut self, slot: SlotId) -> Option<T> {
        let value = self.slots.get_mut(slot.index())?.take();
        if value.is_some() {
            self.active -= 1;
        }
        value
    }

    /// Borrow the value in `slot`.
    pub fn get(&self, slot: SlotId) -> Option<&T> {
        self.slots.get(slot.index())?.as_ref()
    }

    /// Mutably borrow the value in `slot`.
    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut T> {
        self.slots.get_mut(slot.index())?.as_mut()
    }

    /// Occupied slots in table order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, value)| value.as_ref().map(|value| (SlotId::new(index), value)))
    }

    /// Mutable access to occupied slots in table order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, value)| value.as_mut().map(|value| (SlotId::new(index), value)))
    }

    /// Ids of occupied slots in table order.
    pub fn active_slots(&self) -> Vec<SlotId> {
        self.iter().map(|(slot, _)| slot).collect()
    }
}

impl<T: Named> ConnectionTable<T> {
    /// Slot of the active value named `name`, compared exactly.
    pub fn find_by_name(&self, name: &str) -> Option<SlotId> {
        self.iter()
            .find(|(_, value)| value.name() == Some(name))
            .map(|(slot, _)| slot)
    }
}
