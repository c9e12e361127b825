//! Minimal ERC-20 ABI encoding.
//!
//! Only the two functions the reward flow needs:
//! - `transfer(address,uint256) -> bool`
//! - `balanceOf(address) -> uint256`

use sha3::{Digest, Keccak256};

use autest_types::{Address, Hex, Result, RewardError};

/// First four bytes of the Keccak-256 hash of a function signature.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest[..4]);
    selector
}

/// Left-pad a 20-byte address into a 32-byte ABI word.
fn address_word(addr: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(addr.as_bytes());
    word
}

/// Big-endian u128 in a 32-byte ABI word.
fn uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Calldata for `transfer(recipient, amount)`.
pub fn encode_transfer(recipient: &Address, amount: u128) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 64);
    data.extend_from_slice(&function_selector("transfer(address,uint256)"));
    data.extend_from_slice(&address_word(recipient));
    data.extend_from_slice(&uint_word(amount));
    data
}

/// Calldata for `balanceOf(owner)`.
pub fn encode_balance_of(owner: &Address) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32);
    data.extend_from_slice(&function_selector("balanceOf(address)"));
    data.extend_from_slice(&address_word(owner));
    data
}

/// Decode a single uint256 return value (as produced by `eth_call`).
///
/// Values above u128::MAX are clamped, same policy as quantity parsing.
pub fn decode_uint256(return_data: &Hex) -> Result<u128> {
    let bytes = autest_types::hex_to_bytes(return_data)?;
    if bytes.len() != 32 {
        return Err(RewardError::InvalidHex(format!(
            "expected 32-byte return word, got {} bytes",
            bytes.len()
        )));
    }
    if bytes[..16].iter().any(|b| *b != 0) {
        return Ok(u128::MAX);
    }
    let mut tail = [0u8; 16];
    tail.copy_from_slice(&bytes[16..]);
    Ok(u128::from_be_bytes(tail))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_selectors() {
        assert_eq!(
            function_selector("transfer(address,uint256)"),
            [0xa9, 0x05, 0x9c, 0xbb]
        );
        assert_eq!(
            function_selector("balanceOf(address)"),
            [0x70, 0xa0, 0x82, 0x31]
        );
    }

    #[test]
    fn test_encode_transfer_layout() {
        let to = Address::from_hex("0x742d35cc6634c0532925a3b844bc9e7595f3a1ac").unwrap();
        let data = encode_transfer(&to, 7 * autest_types::WEI_PER_TOKEN);

        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        // address word: 12 zero bytes then the address
        assert!(data[4..16].iter().all(|b| *b == 0));
        assert_eq!(&data[16..36], to.as_bytes());
        // amount word holds exactly 7 * 10^18
        let mut tail = [0u8; 16];
        tail.copy_from_slice(&data[52..68]);
        assert_eq!(u128::from_be_bytes(tail), 7_000_000_000_000_000_000);
        assert!(data[36..52].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_encode_transfer_scales_for_any_amount() {
        let to = Address::from_hex("0xbe00447a89f5bb9e09fd49acf3cfb4dc3f076a26").unwrap();
        for n in [0u128, 1, 12, 1_000_000] {
            let data = encode_transfer(&to, n * autest_types::WEI_PER_TOKEN);
            let mut word = [0u8; 16];
            word.copy_from_slice(&data[52..68]);
            assert_eq!(u128::from_be_bytes(word), n * autest_types::WEI_PER_TOKEN);
        }
    }

    #[test]
    fn test_decode_uint256() {
        let word = format!("0x{}{:032x}", "0".repeat(32), 42u128);
        assert_eq!(decode_uint256(&word).unwrap(), 42);
        assert!(decode_uint256(&"0x1234".to_string()).is_err());
        let huge = format!("0x01{}", "0".repeat(62));
        assert_eq!(decode_uint256(&huge).unwrap(), u128::MAX);
    }
}
