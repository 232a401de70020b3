//! Current-state replication.
//!
//! Peers that share a machine definition only exchange the current state:
//! a single big-endian `u32`. The receiver applies it through
//! [`IndexedMachine::force_state`], so observers fire exactly as for a local
//! forced transition.

use crate::error::CoreError;
use crate::indexed::IndexedMachine;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Encoder and decoder for replicated machine state.
pub struct StateSync;

impl StateSync {
    /// Size of an encoded state.
    pub const ENCODED_LEN: usize = 4;

    /// Appends the machine's current state to `buf`.
    pub fn encode_current_state(machine: &IndexedMachine, buf: &mut impl BufMut) {
        buf.put_u32(machine.current_state() as u32);
    }

    /// Encodes the machine's current state into a fresh buffer.
    pub fn encode(machine: &IndexedMachine) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::ENCODED_LEN);
        Self::encode_current_state(machine, &mut buf);
        buf.freeze()
    }

    /// Reads one encoded state from `buf` and forces the machine into it.
    ///
    /// Returns whether the current state changed. Payloads that are too
    /// short or name a state the machine does not have leave the machine
    /// untouched; a short payload is not consumed.
    pub fn apply_remote_state(
        machine: &mut IndexedMachine,
        buf: &mut impl Buf,
    ) -> Result<bool, CoreError> {
        if buf.remaining() < Self::ENCODED_LEN {
            return Err(CoreError::TruncatedSync {
                needed: Self::ENCODED_LEN,
                available: buf.remaining(),
            });
        }

        let state = buf.get_u32();
        if state as usize >= machine.num_states() {
            return Err(CoreError::SyncStateOutOfRange {
                state,
                num_states: machine.num_states(),
            });
        }
        Ok(machine.force_state(state as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> IndexedMachine {
        IndexedMachine::with_size(3, 1, 0, 0)
    }

    #[test]
    fn test_encoding_is_big_endian() {
        let mut local = machine();
        local.force_state(2);
        assert_eq!(&StateSync::encode(&local)[..], &[0, 0, 0, 2]);
    }

    #[test]
    fn test_apply_forces_state() {
        let mut local = machine();
        local.force_state(2);
        let mut payload = StateSync::encode(&local);

        let mut remote = machine();
        assert!(StateSync::apply_remote_state(&mut remote, &mut payload).unwrap());
        assert_eq!(remote.current_state(), 2);
        assert_eq!(remote.prev_state(), 0);
        assert_eq!(payload.remaining(), 0);

        let mut again = StateSync::encode(&local);
        assert!(!StateSync::apply_remote_state(&mut remote, &mut again).unwrap());
    }

    #[test]
    fn test_several_states_in_one_buffer() {
        let mut local = machine();
        let mut buf = BytesMut::new();
        local.force_state(1);
        StateSync::encode_current_state(&local, &mut buf);
        local.force_state(2);
        StateSync::encode_current_state(&local, &mut buf);

        let mut remote = machine();
        let mut buf = buf.freeze();
        StateSync::apply_remote_state(&mut remote, &mut buf).unwrap();
        StateSync::apply_remote_state(&mut remote, &mut buf).unwrap();
        assert_eq!(remote.current_state(), 2);
        assert_eq!(remote.prev_state(), 1);
    }

    #[test]
    fn test_truncated_payload() {
        let mut remote = machine();
        let mut payload = Bytes::from_static(&[0, 0, 1]);
        let err = StateSync::apply_remote_state(&mut remote, &mut payload).unwrap_err();
        assert!(matches!(
            err,
            CoreError::TruncatedSync {
                needed: 4,
                available: 3
            }
        ));
        assert_eq!(payload.remaining(), 3);
        assert_eq!(err.error_code(), "BAD_SYNC");
    }

    #[test]
    fn test_out_of_range_state() {
        let mut remote = machine();
        let mut payload = Bytes::from_static(&[0, 0, 0, 7]);
        assert!(matches!(
            StateSync::apply_remote_state(&mut remote, &mut payload),
            Err(CoreError::SyncStateOutOfRange { state: 7, num_states: 3 })
        ));
        assert_eq!(remote.current_state(), 0);
    }
}
