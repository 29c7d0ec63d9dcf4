// CBC decryption computes
//
//                  P_i = D(C_i) ⊕ C_{i-1},
//
// so every byte of a ciphertext block is XORed into the same position of the
// *next* block's plaintext. If we submit X|C_i for a block X we control, the
// decryption of that two-block message ends with
//
//                  P' = D(C_i) ⊕ X,
//
// and the padding oracle tells us whether P' ends in valid padding. Scanning
// the last byte of X until the oracle says yes pins P'[15] to \x01 (almost
// always), which solves the last byte of D(C_i); re-aiming the solved tail at
// \x02\x02 and scanning the next byte solves the one before it, and so on to
// the front of the block. The plaintext byte then falls out of the XOR
// algebra with the *real* predecessor block:
//
//                  P_i = D(C_i) ⊕ C_{i-1} = X ⊕ pad ⊕ C_{i-1}.
//
// "Almost always" is why the recovery recurses: when the plaintext already
// ends in \x02\x02, a forged \x02 passes the \x01 check too, and committing
// to it poisons every byte after. A passing value is only accepted once its
// entire downstream chain also completes; otherwise we resume the scan where
// it left off. That backtracking, not the XOR trick, is what makes the
// attack reliable.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::blocks::split_into_blocks;
use crate::pad::pkcs7_unpad;
use crate::progress::{ProgressObserver, ProgressSink};
use crate::{AttackError, OracleError, PaddingOracle};

/// Handle for aborting an in-flight [`Decrypter::decrypt`] from another
/// thread. The flag is checked between oracle queries, so an abort lands
/// within one round trip.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives the padding-oracle attack against one oracle session.
pub struct Decrypter<'a, O: PaddingOracle> {
    oracle: &'a O,
    observer: Option<&'a dyn ProgressObserver>,
    guesses: AtomicU64,
    cancel: CancelFlag,
}

impl<'a, O: PaddingOracle> Decrypter<'a, O> {
    pub fn new(oracle: &'a O) -> Self {
        Self {
            oracle,
            observer: None,
            guesses: AtomicU64::new(0),
            cancel: CancelFlag::default(),
        }
    }

    /// Attach a progress observer, notified as bytes are accepted.
    pub fn with_observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Number of oracle queries answered so far. Never reset: re-invoking
    /// [`decrypt`](Decrypter::decrypt) after a failure keeps counting, so the
    /// total cost of a session stays visible.
    pub fn guesses(&self) -> u64 {
        self.guesses.load(Ordering::SeqCst)
    }

    /// A clonable handle that aborts the attack when triggered.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Recover the plaintext behind the oracle's ciphertext, without the
    /// padding. Returns an error rather than ever surfacing partial or
    /// unvalidated plaintext.
    pub fn decrypt(&self) -> Result<Vec<u8>, AttackError> {
        let block_size = self.oracle.block_size();
        let iv = self
            .oracle
            .iv()
            .unwrap_or_else(|| vec![0; block_size]);
        let ciphertext = self.oracle.ciphertext();
        let blocks = split_into_blocks(&iv, &ciphertext, block_size)?;
        let progress = ProgressSink::new(self.observer, block_size, ciphertext.len());

        // Each block only reads its predecessor, so blocks crack in
        // parallel; the brute-force loop inside a block stays sequential
        // because every trial depends on the previous oracle answer.
        let recovered: Vec<Result<Option<Vec<u8>>, OracleError>> = (1..blocks.len())
            .into_par_iter()
            .map(|block_index| {
                let result = self.recover_block(
                    block_index,
                    &blocks[block_index],
                    &blocks[block_index - 1],
                    block_size - 1,
                    vec![0; block_size],
                    &progress,
                );
                if result.is_err() {
                    // A dead oracle dooms every block; stop the siblings.
                    self.cancel.cancel();
                }
                result
            })
            .collect();

        let mut plaintext = Vec::with_capacity(ciphertext.len());
        let mut oracle_failure = None;
        let mut undecipherable = None;
        for (block_index, result) in (1..).zip(recovered) {
            match result {
                Ok(Some(bytes)) => plaintext.extend_from_slice(&bytes),
                Ok(None) => undecipherable = undecipherable.or(Some(block_index)),
                Err(err) => oracle_failure = oracle_failure.or(Some(err)),
            }
        }
        if let Some(err) = oracle_failure {
            return Err(AttackError::Oracle(err));
        }
        if let Some(block_index) = undecipherable {
            if self.cancel.is_cancelled() {
                return Err(AttackError::Cancelled);
            }
            return Err(AttackError::BlockUndecipherable { block_index });
        }

        pkcs7_unpad(&mut plaintext)?;
        Ok(plaintext)
    }

    /// Recover positions `position..=0` of `block`, scanning candidate
    /// values for the current position and recursing on each oracle hit.
    /// Although recovery runs back to front, the returned bytes are in
    /// left-to-right block order, ready to concatenate.
    ///
    /// `Ok(None)` means no value produced a full downstream chain (or the
    /// attack was cancelled); an oracle breakdown propagates as `Err`.
    fn recover_block(
        &self,
        block_index: usize,
        block: &[u8],
        previous: &[u8],
        position: usize,
        mut candidate: Vec<u8>,
        progress: &ProgressSink<'_>,
    ) -> Result<Option<Vec<u8>>, OracleError> {
        let block_size = candidate.len();
        for value in 0..=255u8 {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }
            candidate[position] = value;
            let query = [candidate.as_slice(), block].concat();
            let padding_valid = self.oracle.try_decrypt(&query)?;
            self.guesses.fetch_add(1, Ordering::SeqCst);
            if !padding_valid {
                continue;
            }

            // The oracle saw positions `position..` decode to this many
            // bytes of padding.
            let expected_padding = (block_size - position) as u8;
            // The real ciphertext XORed this byte with the previous block,
            // not with our forgery; substitute it back in.
            let recovered = value ^ expected_padding ^ previous[position];
            progress.record(block_index, position, recovered);

            let tail = match position.checked_sub(1) {
                Some(next_position) => {
                    // Re-aim the solved tail at padding one byte longer
                    // before descending.
                    let mut next_candidate = candidate.clone();
                    for byte in &mut next_candidate[position..] {
                        *byte ^= expected_padding ^ (expected_padding + 1);
                    }
                    self.recover_block(
                        block_index,
                        block,
                        previous,
                        next_position,
                        next_candidate,
                        progress,
                    )?
                }
                None => Some(Vec::new()),
            };
            if let Some(mut bytes) = tail {
                // The tail holds positions below this one, so appending
                // keeps the block in left-to-right byte order.
                bytes.push(recovered);
                return Ok(Some(bytes));
            }
            // A false positive: the padding matched but nothing downstream
            // of it could be made to. Resume the scan.
        }
        Ok(None)
    }
}
