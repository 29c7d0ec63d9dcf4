use std::fmt;

/// Failure reported by a [`PaddingOracle`](crate::PaddingOracle)
/// implementation, e.g. a transport error or timeout from a remote oracle.
///
/// A `false` oracle answer is the normal outcome of most queries and is never
/// represented as an error; this type is reserved for the oracle itself
/// breaking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleError(pub String);

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "oracle failure: {}", self.0)
    }
}

impl std::error::Error for OracleError {}

/// Ways a [`Decrypter::decrypt`](crate::Decrypter::decrypt) call can fail.
/// No variant ever carries partial plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttackError {
    /// The session parameters cannot be partitioned into blocks: the
    /// ciphertext length is not a multiple of the block size, the IV has the
    /// wrong length, or the block size itself is unusable.
    MalformedInput { length: usize, block_size: usize },
    /// Every candidate chain for the given block was exhausted without the
    /// oracle accepting a full run of padding. The input was likely not
    /// produced by a CBC cipher the oracle understands.
    BlockUndecipherable { block_index: usize },
    /// Recovery completed but the assembled plaintext does not end in valid
    /// padding.
    PaddingValidationFailure,
    /// The oracle failed mid-attack. The in-flight recovery is abandoned;
    /// whether to retry is the caller's decision.
    Oracle(OracleError),
    /// The caller's cancellation flag stopped the attack.
    Cancelled,
}

impl fmt::Display for AttackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackError::MalformedInput { length, block_size } => write!(
                f,
                "ciphertext of {} bytes cannot be split into {} byte blocks",
                length, block_size
            ),
            AttackError::BlockUndecipherable { block_index } => write!(
                f,
                "no candidate chain for block {} produced valid padding",
                block_index
            ),
            AttackError::PaddingValidationFailure => {
                write!(f, "recovered plaintext does not end in valid padding")
            }
            AttackError::Oracle(err) => write!(f, "{}", err),
            AttackError::Cancelled => write!(f, "decryption was cancelled"),
        }
    }
}

impl std::error::Error for AttackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AttackError::Oracle(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OracleError> for AttackError {
    fn from(err: OracleError) -> Self {
        AttackError::Oracle(err)
    }
}
