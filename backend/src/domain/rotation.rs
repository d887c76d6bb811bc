//! # Rotation Core
//!
//! Pure functions implementing the bath-order state machine. Nothing in
//! this module touches storage, clocks, or global state: every function
//! maps values to values, and the [`RotationService`](super::rotation_service)
//! adapter is responsible for reading inputs from the record store and
//! persisting results.

use rand::seq::SliceRandom;
use rand::Rng;

use shared::{DerivedOrder, Kid, MoveDirection, RotationState};

/// The two modes of the persisted rotation record, made explicit instead
/// of relying on optional-field presence checks.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// No session is being composed; tonight's order comes from the
    /// rotation index
    Fresh,
    /// A session is in progress: a reordered (or shuffled) sequence has
    /// been saved but not yet committed
    Active {
        order_ids: Vec<String>,
        lucky_used: bool,
        lucky_by_kid_id: Option<String>,
    },
}

impl SessionPhase {
    /// Decode the phase from the persisted singleton
    pub fn from_state(state: &RotationState) -> Self {
        match &state.current_order {
            Some(ids) => SessionPhase::Active {
                order_ids: ids.clone(),
                lucky_used: state.current_lucky_used,
                lucky_by_kid_id: state.current_lucky_by_kid_id.clone(),
            },
            None => SessionPhase::Fresh,
        }
    }
}

/// Compute tonight's order from the roster and the rotation state.
///
/// An in-progress order is resumed only when its length matches the
/// roster size and every saved ID still resolves against the roster;
/// anything stale falls back to the round-robin default starting at
/// `rotation_index % roster_len`. Returns `None` for an empty roster.
///
/// This is read-only: it persists nothing, and materializes into state
/// only through the explicit mutation operations.
pub fn derive_order(roster: &[Kid], state: &RotationState) -> Option<DerivedOrder> {
    if roster.is_empty() {
        return None;
    }

    if let SessionPhase::Active {
        order_ids,
        lucky_used,
        lucky_by_kid_id,
    } = SessionPhase::from_state(state)
    {
        if order_ids.len() == roster.len() {
            let resolved: Vec<Kid> = order_ids
                .iter()
                .filter_map(|id| roster.iter().find(|k| &k.id == id).cloned())
                .collect();

            // A deleted kid shortens the resolved sequence below the
            // roster size, which discards the saved order
            if resolved.len() == roster.len() {
                return Some(DerivedOrder {
                    kids: resolved,
                    lucky_used,
                    lucky_by_kid_id,
                    resumed: true,
                });
            }
        }
    }

    let n = roster.len();
    let start = state.rotation_index as usize % n;
    let kids = (0..n).map(|i| roster[(start + i) % n].clone()).collect();

    Some(DerivedOrder {
        kids,
        lucky_used: false,
        lucky_by_kid_id: None,
        resumed: false,
    })
}

/// Swap the kid at `index` with its neighbor in the requested direction.
///
/// Returns `None` when the swap would leave the order's bounds (moving
/// the first entry earlier or the last entry later).
pub fn swap_move(order: &[Kid], index: usize, direction: MoveDirection) -> Option<Vec<Kid>> {
    if index >= order.len() {
        return None;
    }

    let swap_index = match direction {
        MoveDirection::Earlier => index.checked_sub(1)?,
        MoveDirection::Later => {
            let next = index + 1;
            if next >= order.len() {
                return None;
            }
            next
        }
    };

    let mut new_order = order.to_vec();
    new_order.swap(index, swap_index);
    Some(new_order)
}

/// Uniformly random permutation of the full order (Fisher-Yates).
pub fn shuffled_order<R: Rng + ?Sized>(order: &[Kid], rng: &mut R) -> Vec<Kid> {
    let mut shuffled = order.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

/// Advance the round-robin pointer after a committed session.
pub fn advance_rotation_index(index: u32, roster_len: usize) -> u32 {
    if roster_len == 0 {
        return index;
    }
    ((index as usize + 1) % roster_len) as u32
}
