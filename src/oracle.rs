use crate::OracleError;

/// A padding oracle session: the ciphertext under attack plus a predicate
/// telling us whether arbitrary ciphertext decrypts to validly padded
/// plaintext.
///
/// This is the crate's only boundary to the outside world. Implementations
/// range from an in-process simulation with a known key (see the test
/// modules) to a client that submits ciphertext to a live service and maps
/// its response to a boolean; transport, retries and rate limiting are the
/// implementation's business.
///
/// `Sync` is required so blocks can be recovered concurrently.
pub trait PaddingOracle: Sync {
    /// Block size of the underlying cipher in bytes, constant per session.
    fn block_size(&self) -> usize;

    /// The initialization vector used for the encryption. `None` means the
    /// IV is unknown: an all-zero vector is substituted and the first block
    /// of the recovered plaintext comes out garbled.
    fn iv(&self) -> Option<Vec<u8>>;

    /// The ciphertext to recover, IV not included. Its length must be a
    /// multiple of [`block_size`](PaddingOracle::block_size).
    fn ciphertext(&self) -> Vec<u8>;

    /// Submit `data` for decryption and report whether the result ends in
    /// valid padding. Must tolerate arbitrary byte content at any position;
    /// a padding mismatch is an `Ok(false)`, not an error.
    fn try_decrypt(&self, data: &[u8]) -> Result<bool, OracleError>;
}
