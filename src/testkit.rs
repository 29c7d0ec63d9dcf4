// Test-only collaborators: a small invertible keyed block transform, a CBC
// layer over it, and oracle implementations that play the vulnerable
// service. The transform is not a real cipher and must never be; the attack
// relies only on CBC's XOR chaining, so any keyed permutation of block-sized
// strings exercises it fully.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::pad::{padding_length, pkcs7_pad};
use crate::{OracleError, PaddingOracle};

const ROUNDS: usize = 4;

// Multiplying by an odd constant is a bijection modulo 256, so each round is
// invertible byte by byte; the rotation moves every byte through every key
// position across rounds.
fn permute_block(block: &mut [u8], key: &[u8]) {
    for _ in 0..ROUNDS {
        for (byte, k) in block.iter_mut().zip(key) {
            *byte = (*byte ^ k).wrapping_mul(5).wrapping_add(113);
        }
        block.rotate_left(1);
    }
}

fn unpermute_block(block: &mut [u8], key: &[u8]) {
    // 5 * 205 ≡ 1 (mod 256)
    for _ in 0..ROUNDS {
        block.rotate_right(1);
        for (byte, k) in block.iter_mut().zip(key) {
            *byte = byte.wrapping_sub(113).wrapping_mul(205) ^ k;
        }
    }
}

/// CBC-encrypt `plaintext` with PKCS#7 padding. The block size is the IV
/// length; the key must be at least as long.
pub fn encrypt_cbc(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Vec<u8> {
    encrypt_cbc_padded(&pkcs7_pad(plaintext, iv.len()), key, iv)
}

/// CBC-encrypt an already block-aligned message verbatim. Lets tests build
/// ciphertext whose decryption does *not* end in valid padding.
pub fn encrypt_cbc_padded(padded: &[u8], key: &[u8], iv: &[u8]) -> Vec<u8> {
    let block_size = iv.len();
    let mut ciphertext = Vec::with_capacity(padded.len());
    let mut previous = iv.to_vec();
    for block in padded.chunks(block_size) {
        let mut buffer: Vec<u8> = block.iter().zip(&previous).map(|(b, p)| b ^ p).collect();
        permute_block(&mut buffer, key);
        previous = buffer.clone();
        ciphertext.extend_from_slice(&buffer);
    }
    ciphertext
}

/// CBC-decrypt without touching the padding; callers inspect it themselves.
pub fn decrypt_cbc(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Vec<u8> {
    let block_size = iv.len();
    let mut plaintext = Vec::with_capacity(ciphertext.len());
    let mut previous: &[u8] = iv;
    for block in ciphertext.chunks(block_size) {
        let mut buffer = block.to_vec();
        unpermute_block(&mut buffer, key);
        for (byte, p) in buffer.iter_mut().zip(previous) {
            *byte ^= p;
        }
        plaintext.extend_from_slice(&buffer);
        previous = block;
    }
    plaintext
}

/// An in-process vulnerable service: it decrypts whatever it is handed with
/// its secret key and real IV and admits whether the padding checked out.
pub struct SimOracle {
    key: Vec<u8>,
    iv: Vec<u8>,
    hide_iv: bool,
    ciphertext: Vec<u8>,
}

impl SimOracle {
    /// Pad and encrypt `plaintext` under `key`/`iv` and serve the result.
    pub fn encrypting(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Self {
        Self::from_ciphertext(encrypt_cbc(plaintext, key, iv), key, iv)
    }

    /// Encrypt an already-aligned message verbatim, padding included (or,
    /// for negative tests, deliberately absent).
    pub fn from_padded(padded: &[u8], key: &[u8], iv: &[u8]) -> Self {
        Self::from_ciphertext(encrypt_cbc_padded(padded, key, iv), key, iv)
    }

    fn from_ciphertext(ciphertext: Vec<u8>, key: &[u8], iv: &[u8]) -> Self {
        Self {
            key: key.to_vec(),
            iv: iv.to_vec(),
            hide_iv: false,
            ciphertext,
        }
    }

    /// Stop advertising the IV. The service still decrypts with it; the
    /// attacker just no longer knows it.
    pub fn without_iv(mut self) -> Self {
        self.hide_iv = true;
        self
    }
}

impl PaddingOracle for SimOracle {
    fn block_size(&self) -> usize {
        self.iv.len()
    }

    fn iv(&self) -> Option<Vec<u8>> {
        if self.hide_iv {
            None
        } else {
            Some(self.iv.clone())
        }
    }

    fn ciphertext(&self) -> Vec<u8> {
        self.ciphertext.clone()
    }

    fn try_decrypt(&self, data: &[u8]) -> Result<bool, OracleError> {
        let plaintext = decrypt_cbc(data, &self.key, &self.iv);
        Ok(padding_length(&plaintext).is_some())
    }
}

/// Wraps an oracle with a query budget, failing every call past it. Stands
/// in for a remote oracle whose connection drops mid-attack.
pub struct FlakyOracle {
    inner: SimOracle,
    budget: u64,
    calls: AtomicU64,
}

impl FlakyOracle {
    pub fn new(inner: SimOracle, budget: u64) -> Self {
        Self {
            inner,
            budget,
            calls: AtomicU64::new(0),
        }
    }
}

impl PaddingOracle for FlakyOracle {
    fn block_size(&self) -> usize {
        self.inner.block_size()
    }

    fn iv(&self) -> Option<Vec<u8>> {
        self.inner.iv()
    }

    fn ciphertext(&self) -> Vec<u8> {
        self.inner.ciphertext()
    }

    fn try_decrypt(&self, data: &[u8]) -> Result<bool, OracleError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.budget {
            return Err(OracleError("connection reset by peer".to_string()));
        }
        self.inner.try_decrypt(data)
    }
}

pub fn random_bytes_with_seed<const N: usize>(seed: u64) -> [u8; N] {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bytes = [0u8; N];
    rng.fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_permutation_round_trips() {
        let key = random_bytes_with_seed::<16>(7);
        let mut block: Vec<u8> = (0..16).collect();

        permute_block(&mut block, &key);
        assert_ne!(block, (0..16).collect::<Vec<u8>>());

        unpermute_block(&mut block, &key);
        assert_eq!(block, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn cbc_round_trips_with_padding() {
        let key = random_bytes_with_seed::<16>(8);
        let iv = random_bytes_with_seed::<16>(9);
        let plaintext = b"a couple of blocks worth of message";

        let ciphertext = encrypt_cbc(plaintext, &key, &iv);
        let decrypted = decrypt_cbc(&ciphertext, &key, &iv);

        assert_eq!(decrypted, pkcs7_pad(plaintext, 16));
    }

    #[test]
    fn identical_plaintext_blocks_chain_into_distinct_ciphertext_blocks() {
        let key = random_bytes_with_seed::<16>(10);
        let iv = random_bytes_with_seed::<16>(11);

        let ciphertext = encrypt_cbc(&[b'A'; 32], &key, &iv);

        assert_eq!(ciphertext.len(), 48);
        assert_ne!(ciphertext[..16], ciphertext[16..32]);
    }

    #[test]
    fn the_oracle_accepts_its_own_ciphertext() {
        let key = random_bytes_with_seed::<16>(12);
        let iv = random_bytes_with_seed::<16>(13);
        let oracle = SimOracle::encrypting(b"well padded", &key, &iv);

        assert_eq!(oracle.try_decrypt(&oracle.ciphertext()), Ok(true));
    }

    #[test]
    fn the_oracle_rejects_ciphertext_of_an_unpadded_message() {
        let key = random_bytes_with_seed::<16>(12);
        let iv = random_bytes_with_seed::<16>(13);
        // Encrypted verbatim; the decryption ends in '?', which is no
        // padding at all.
        let oracle = SimOracle::from_padded(b"no padding here?", &key, &iv);

        assert_eq!(oracle.try_decrypt(&oracle.ciphertext()), Ok(false));
    }
}
