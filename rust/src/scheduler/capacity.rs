//! Remaining resource capacity per unit of simulated time.

use crate::models::{Time, Units};

/// Remaining capacity vector for every time unit `[0, len)`.
///
/// Time units past the stored range are untouched and report the full
/// availability. The timeline grows when a reservation reaches beyond it.
#[derive(Clone, Debug)]
pub struct CapacityTimeline {
    availability: Vec<Units>,
    slots: Vec<Vec<Units>>,
}

impl CapacityTimeline {
    /// Create a timeline with `initial_len` slots at full availability.
    pub fn new(availability: Vec<Units>, initial_len: usize) -> Self {
        let slots = vec![availability.clone(); initial_len];
        Self {
            availability,
            slots,
        }
    }

    /// Remaining capacity at time `t`.
    #[inline]
    pub fn remaining_at(&self, t: Time) -> &[Units] {
        self.slots
            .get(t as usize)
            .map(|slot| slot.as_slice())
            .unwrap_or(self.availability.as_slice())
    }

    /// True when `demand` fits elementwise into the remaining capacity at `t`.
    pub fn fits(&self, demand: &[Units], t: Time) -> bool {
        demand
            .iter()
            .zip(self.remaining_at(t))
            .all(|(&need, &left)| need <= left)
    }

    /// Subtract `demand` from every slot in `[start, start + duration)`.
    ///
    /// A zero demand leaves the timeline untouched, however long the duration.
    pub fn reserve(&mut self, demand: &[Units], start: Time, duration: Time) {
        if duration == 0 || demand.iter().all(|&need| need == 0) {
            return;
        }
        let begin = start as usize;
        let end = begin + duration as usize;
        if self.slots.len() < end {
            self.slots.resize(end, self.availability.clone());
        }
        for slot in &mut self.slots[begin..end] {
            for (left, &need) in slot.iter_mut().zip(demand) {
                debug_assert!(*left >= need, "capacity overbooked");
                *left = left.saturating_sub(need);
            }
        }
    }

    /// Copy of the slots covering `[0, end)`.
    pub fn truncated(&self, end: Time) -> Vec<Vec<Units>> {
        (0..end).map(|t| self.remaining_at(t).to_vec()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
