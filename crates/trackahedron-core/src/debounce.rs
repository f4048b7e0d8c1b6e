//! Dwell-time debounce for face classifications
//!
//! Raw classifications flicker while the fixture is being handled. A face is
//! only confirmed after it has been the raw classification continuously for
//! longer than the dwell threshold. Any differing classification restarts the
//! dwell clock from zero.
//!
//! Timestamps are caller-supplied milliseconds, so the machine never reads a
//! wall clock and can be driven deterministically.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::reference::FaceId;

/// Default dwell threshold in milliseconds
pub const DEFAULT_DWELL_MS: u64 = 3000;

/// Observation produced by [`DebounceStateMachine::on_classification`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebounceEvent {
    /// Raw classification changed; dwell clock restarted
    PendingChanged {
        /// New pending face
        face: FaceId,
        /// Time the dwell clock restarted (ms)
        since_ms: u64,
    },
    /// Pending face held past the dwell threshold and is now current
    Confirmed {
        /// Newly confirmed face
        face: FaceId,
        /// Time of confirmation (ms)
        at_ms: u64,
    },
}

/// Pending/confirmed face tracker.
///
/// One instance per sensor connection. State is only changed by
/// [`on_classification`](Self::on_classification) and an explicit
/// [`reset`](Self::reset).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceStateMachine {
    dwell_ms: u64,
    pending: Option<FaceId>,
    pending_since_ms: u64,
    confirmed: Option<FaceId>,
}

impl DebounceStateMachine {
    /// Create an idle state machine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroDwell`] when `dwell_ms` is zero.
    pub fn new(dwell_ms: u64) -> Result<Self, ConfigError> {
        if dwell_ms == 0 {
            return Err(ConfigError::ZeroDwell);
        }

        Ok(Self {
            dwell_ms,
            pending: None,
            pending_since_ms: 0,
            confirmed: None,
        })
    }

    /// Feed one raw classification.
    ///
    /// Returns [`DebounceEvent::PendingChanged`] when the raw face differs
    /// from the pending one, [`DebounceEvent::Confirmed`] when the pending
    /// face has been held for strictly longer than the dwell threshold and
    /// differs from the confirmed face, and `None` otherwise.
    pub fn on_classification(&mut self, face: FaceId, now_ms: u64) -> Option<DebounceEvent> {
        if self.pending != Some(face) {
            self.pending = Some(face);
            self.pending_since_ms = now_ms;
            return Some(DebounceEvent::PendingChanged { face, since_ms: now_ms });
        }

        // A clock that steps backwards counts as no elapsed time
        let held_ms = now_ms.saturating_sub(self.pending_since_ms);
        if self.confirmed != Some(face) && held_ms > self.dwell_ms {
            self.confirmed = Some(face);
            return Some(DebounceEvent::Confirmed { face, at_ms: now_ms });
        }

        None
    }

    /// Most recent raw classification.
    #[inline]
    pub fn pending(&self) -> Option<FaceId> {
        self.pending
    }

    /// When the pending face was first seen (ms).
    #[inline]
    pub fn pending_since_ms(&self) -> u64 {
        self.pending_since_ms
    }

    /// Currently confirmed face.
    #[inline]
    pub fn confirmed(&self) -> Option<FaceId> {
        self.confirmed
    }

    /// Dwell threshold in milliseconds.
    #[inline]
    pub fn dwell_ms(&self) -> u64 {
        self.dwell_ms
    }

    /// Return to idle, forgetting pending and confirmed faces.
    pub fn reset(&mut self) {
        self.pending = None;
        self.pending_since_ms = 0;
        self.confirmed = None;
    }
}

impl Default for DebounceStateMachine {
    fn default() -> Self {
        Self {
            dwell_ms: DEFAULT_DWELL_MS,
            pending: None,
            pending_since_ms: 0,
            confirmed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(i: u8) -> FaceId {
        FaceId::new(i).unwrap()
    }

    /// Feed a sequence and return every confirmation as (face, time).
    fn confirmations(machine: &mut DebounceStateMachine, feed: &[(u8, u64)]) -> Vec<(u8, u64)> {
        feed.iter()
            .filter_map(|&(f, t)| match machine.on_classification(face(f), t) {
                Some(DebounceEvent::Confirmed { face, at_ms }) => Some((face.get(), at_ms)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_starts_idle() {
        let machine = DebounceStateMachine::default();
        assert_eq!(machine.pending(), None);
        assert_eq!(machine.confirmed(), None);
        assert_eq!(machine.dwell_ms(), DEFAULT_DWELL_MS);
    }

    #[test]
    fn test_zero_dwell_rejected() {
        assert_eq!(DebounceStateMachine::new(0), Err(ConfigError::ZeroDwell));
    }

    #[test]
    fn test_first_sample_is_pending_change() {
        let mut machine = DebounceStateMachine::default();
        assert_eq!(
            machine.on_classification(face(3), 0),
            Some(DebounceEvent::PendingChanged { face: face(3), since_ms: 0 })
        );
        assert_eq!(machine.pending(), Some(face(3)));
        assert_eq!(machine.confirmed(), None);
    }

    #[test]
    fn test_confirms_only_after_dwell() {
        let mut machine = DebounceStateMachine::default();
        assert!(machine.on_classification(face(3), 0).is_some());
        assert_eq!(machine.on_classification(face(3), 1000), None);
        assert_eq!(machine.on_classification(face(3), 2000), None);
        assert_eq!(
            machine.on_classification(face(3), 3500),
            Some(DebounceEvent::Confirmed { face: face(3), at_ms: 3500 })
        );
        assert_eq!(machine.confirmed(), Some(face(3)));
    }

    #[test]
    fn test_dwell_is_strictly_greater() {
        let mut machine = DebounceStateMachine::default();
        machine.on_classification(face(5), 100);
        assert_eq!(machine.on_classification(face(5), 3100), None);
        assert!(matches!(
            machine.on_classification(face(5), 3101),
            Some(DebounceEvent::Confirmed { .. })
        ));
    }

    #[test]
    fn test_flicker_restarts_dwell() {
        let mut machine = DebounceStateMachine::default();
        let feed = [(3, 0), (3, 1000), (4, 1500), (3, 1600), (3, 3000), (3, 4700)];
        // Clock restarted at 1600; 4700 - 1600 = 3100 > 3000
        assert_eq!(confirmations(&mut machine, &feed), vec![(3, 4700)]);
    }

    #[test]
    fn test_flicker_before_threshold_blocks_confirmation() {
        let mut machine = DebounceStateMachine::default();
        let feed = [(3, 0), (3, 1000), (4, 1500), (3, 1600), (3, 3000), (3, 4500)];
        assert!(confirmations(&mut machine, &feed).is_empty());
        assert_eq!(machine.pending(), Some(face(3)));
        assert_eq!(machine.pending_since_ms(), 1600);
    }

    #[test]
    fn test_repeated_confirmation_is_silent() {
        let mut machine = DebounceStateMachine::default();
        let feed = [(2, 0), (2, 3001), (2, 5000), (2, 9000), (2, 60_000)];
        assert_eq!(confirmations(&mut machine, &feed), vec![(2, 3001)]);
    }

    #[test]
    fn test_face_change_confirms_new_face() {
        let mut machine = DebounceStateMachine::default();
        let feed = [(1, 0), (1, 3500), (7, 4000), (7, 6000), (7, 7001), (7, 8000)];
        assert_eq!(confirmations(&mut machine, &feed), vec![(1, 3500), (7, 7001)]);
    }

    #[test]
    fn test_return_to_confirmed_face_is_silent() {
        let mut machine = DebounceStateMachine::default();
        let feed = [(1, 0), (1, 3500), (6, 4000), (1, 4200), (1, 9000)];
        // Face 1 is already confirmed, so settling back on it emits nothing
        assert_eq!(confirmations(&mut machine, &feed), vec![(1, 3500)]);
        assert_eq!(machine.confirmed(), Some(face(1)));
    }

    #[test]
    fn test_backwards_clock_never_confirms_early() {
        let mut machine = DebounceStateMachine::default();
        machine.on_classification(face(9), 10_000);
        assert_eq!(machine.on_classification(face(9), 500), None);
        assert_eq!(machine.on_classification(face(9), 13_000), None);
        assert!(matches!(
            machine.on_classification(face(9), 13_001),
            Some(DebounceEvent::Confirmed { .. })
        ));
    }

    #[test]
    fn test_custom_dwell() {
        let mut machine = DebounceStateMachine::new(500).unwrap();
        let feed = [(4, 0), (4, 400), (4, 501)];
        assert_eq!(confirmations(&mut machine, &feed), vec![(4, 501)]);
    }

    #[test]
    fn test_reset() {
        let mut machine = DebounceStateMachine::default();
        machine.on_classification(face(0), 0);
        machine.on_classification(face(0), 4000);
        assert_eq!(machine.confirmed(), Some(face(0)));

        machine.reset();
        assert_eq!(machine.pending(), None);
        assert_eq!(machine.confirmed(), None);
        assert!(matches!(
            machine.on_classification(face(0), 5000),
            Some(DebounceEvent::PendingChanged { .. })
        ));
    }
}
