use crate::AttackError;

/// Prepend the IV to the ciphertext and partition the whole thing into
/// block-size chunks. Block 0 is the IV; it is only ever consumed as the
/// predecessor of block 1.
///
/// Anything that cannot be sliced cleanly is rejected up front: silently
/// mis-slicing would corrupt every byte recovered afterwards. The block size
/// must also fit in a padding byte.
pub(crate) fn split_into_blocks(
    iv: &[u8],
    ciphertext: &[u8],
    block_size: usize,
) -> Result<Vec<Vec<u8>>, AttackError> {
    let malformed = !(1..=255).contains(&block_size)
        || iv.len() != block_size
        || ciphertext.len() % block_size != 0;
    if malformed {
        return Err(AttackError::MalformedInput {
            length: ciphertext.len(),
            block_size,
        });
    }
    Ok(std::iter::once(iv)
        .chain(ciphertext.chunks(block_size))
        .map(<[u8]>::to_vec)
        .collect())
}
