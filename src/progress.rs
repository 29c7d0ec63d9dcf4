use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

/// Emitted each time the oracle accepts a candidate byte. Carries no
/// control-flow significance; a byte later discarded by backtracking may
/// still have produced an event, and its slot in the preview is simply
/// overwritten by the value that replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteRecovered {
    /// 1-based index of the ciphertext block the byte belongs to.
    pub block_index: usize,
    /// Position of the byte within its block.
    pub position: usize,
    /// The plaintext as recovered so far: not-yet-known bytes render as `?`,
    /// non-printable bytes as `.`.
    pub preview: String,
}

/// Receives [`ByteRecovered`] events during an attack. Purely observational:
/// implementations cannot influence recovery, and one that panics is
/// contained rather than allowed to abort the decryption.
pub trait ProgressObserver: Sync {
    fn on_byte_recovered(&self, event: &ByteRecovered);
}

/// Per-decryption progress state, threaded through the recovery recursion.
pub(crate) struct ProgressSink<'a> {
    observer: Option<&'a dyn ProgressObserver>,
    block_size: usize,
    preview: Mutex<Vec<u8>>,
}

impl<'a> ProgressSink<'a> {
    pub(crate) fn new(
        observer: Option<&'a dyn ProgressObserver>,
        block_size: usize,
        plaintext_len: usize,
    ) -> Self {
        Self {
            observer,
            block_size,
            preview: Mutex::new(vec![b'?'; plaintext_len]),
        }
    }

    pub(crate) fn record(&self, block_index: usize, position: usize, byte: u8) {
        let observer = match self.observer {
            Some(observer) => observer,
            None => return,
        };
        let preview = {
            let mut state = self.preview.lock().unwrap();
            state[(block_index - 1) * self.block_size + position] = render(byte);
            String::from_utf8_lossy(&state).into_owned()
        };
        let event = ByteRecovered {
            block_index,
            position,
            preview,
        };
        // Contain a panicking observer; the attack outlives it.
        let _ = catch_unwind(AssertUnwindSafe(|| observer.on_byte_recovered(&event)));
    }
}

fn render(byte: u8) -> u8 {
    if (0x20..=0x7E).contains(&byte) {
        byte
    } else {
        b'.'
    }
}
