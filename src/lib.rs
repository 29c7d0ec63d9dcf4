//! Recover CBC-encrypted plaintext from a padding oracle, without ever
//! learning the key.
//!
//! A padding oracle is any system that decrypts attacker-supplied ciphertext
//! and leaks a single bit: did the result end in valid PKCS#7 padding? That
//! bit, asked at most 256 times per plaintext byte, is enough to decrypt the
//! whole message, because CBC XORs each decrypted block with the previous
//! ciphertext block; an attacker who swaps that previous block for a forgery
//! chooses what the oracle's padding check runs against. The derivation and
//! the backtracking that makes it reliable live in the [`Decrypter`]
//! module's header.
//!
//! The oracle itself stays behind the [`PaddingOracle`] trait: this crate
//! performs no I/O and holds no secrets. Implement the trait over an
//! in-process simulation or a remote service, hand it to a [`Decrypter`],
//! and call [`decrypt`](Decrypter::decrypt).

mod attack;
mod blocks;
mod error;
mod oracle;
mod pad;
mod progress;
#[cfg(test)]
mod testkit;

pub use attack::{CancelFlag, Decrypter};
pub use error::{AttackError, OracleError};
pub use oracle::PaddingOracle;
pub use pad::{pkcs7_pad, pkcs7_unpad};
pub use progress::{ByteRecovered, ProgressObserver};
