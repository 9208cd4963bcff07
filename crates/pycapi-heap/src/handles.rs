//! Native handle encoding and reference counts
//!
//! A handle word is derived from the object id, so the same object always
//! yields the same word whether it is handed out borrowed or owned. Words
//! are aligned and offset away from zero so they look like real pointers
//! and never collide with NULL.

use parking_lot::Mutex;
use pycapi_sdk::{ManagedRef, NativeValue};
use rustc_hash::FxHashMap;

const HANDLE_BASE: u64 = 0x7f00_0000_0000;
const HANDLE_STRIDE: u64 = 16;

pub(crate) fn encode(obj: ManagedRef) -> NativeValue {
    NativeValue::from_bits(HANDLE_BASE + obj.raw() * HANDLE_STRIDE)
}

/// Decode a handle word; `None` if it cannot have come from `encode`
pub(crate) fn decode(handle: NativeValue) -> Option<ManagedRef> {
    let offset = handle.to_bits().checked_sub(HANDLE_BASE)?;
    if offset % HANDLE_STRIDE != 0 {
        return None;
    }
    Some(ManagedRef::from_raw(offset / HANDLE_STRIDE))
}

/// Native reference counts, keyed by object id
#[derive(Default)]
pub(crate) struct HandleTable {
    counts: Mutex<FxHashMap<u64, usize>>,
}

impl HandleTable {
    pub(crate) fn acquire(&self, obj: ManagedRef) {
        *self.counts.lock().entry(obj.raw()).or_insert(0) += 1;
    }

    /// Drop one reference. Returns false if none was held.
    pub(crate) fn release(&self, obj: ManagedRef) -> bool {
        let mut counts = self.counts.lock();
        match counts.get_mut(&obj.raw()) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                counts.remove(&obj.raw());
                true
            }
            None => false,
        }
    }

    pub(crate) fn count(&self, obj: ManagedRef) -> usize {
        self.counts.lock().get(&obj.raw()).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let obj = ManagedRef::from_raw(42);
        let handle = encode(obj);
        assert!(!handle.is_null());
        assert_eq!(decode(handle), Some(obj));
    }

    #[test]
    fn test_decode_rejects_foreign_words() {
        assert_eq!(decode(NativeValue::NULL), None);
        assert_eq!(decode(NativeValue::from_bits(HANDLE_BASE + 3)), None);
    }

    #[test]
    fn test_acquire_release() {
        let table = HandleTable::default();
        let obj = ManagedRef::from_raw(7);
        table.acquire(obj);
        table.acquire(obj);
        assert_eq!(table.count(obj), 2);
        assert!(table.release(obj));
        assert!(table.release(obj));
        assert_eq!(table.count(obj), 0);
        assert!(!table.release(obj));
    }
}
