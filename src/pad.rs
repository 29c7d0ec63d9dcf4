// PKCS#7-style padding: N trailing bytes, each of value N. A message whose
// length is already a block multiple gains a full block of padding, so the
// padding is always present and always removable. N = 0 is never valid.

use crate::AttackError;

/// Pad `bytes` up to the next multiple of `block_size` (which must be at
/// most 255 for the pad value to fit a byte).
pub fn pkcs7_pad(bytes: &[u8], block_size: usize) -> Vec<u8> {
    let n_pad = block_size - bytes.len() % block_size;
    let mut out = Vec::with_capacity(bytes.len() + n_pad);
    out.extend_from_slice(bytes);
    out.extend(std::iter::repeat(n_pad as u8).take(n_pad));
    out
}

/// Strip the padding from `bytes` in place, or report that the trailing
/// bytes do not form valid padding.
pub fn pkcs7_unpad(bytes: &mut Vec<u8>) -> Result<(), AttackError> {
    match padding_length(bytes) {
        Some(n_pad) => {
            bytes.truncate(bytes.len() - n_pad as usize);
            Ok(())
        }
        None => Err(AttackError::PaddingValidationFailure),
    }
}

/// The length of the padding on `bytes`, if it is valid.
pub(crate) fn padding_length(bytes: &[u8]) -> Option<u8> {
    let n_pad = *bytes.last()?;
    if n_pad == 0 || n_pad as usize > bytes.len() {
        return None;
    }
    let padding = &bytes[bytes.len() - n_pad as usize..];
    if padding.iter().all(|&b| b == n_pad) {
        Some(n_pad)
    } else {
        None
    }
}
