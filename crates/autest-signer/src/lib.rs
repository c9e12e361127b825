//! Wallet layer: secp256k1 key handling and legacy transaction signing.
//!
//! Flow: private key → sender address (Keccak of the uncompressed public
//! key), then RLP-encode the EIP-155 payload, Keccak, sign recoverably,
//! and re-encode with the (v, r, s) triple appended.

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

use autest_types::{bytes_to_hex, hex_to_bytes, Address, Hex, Result, RewardError};

pub mod rlp;

/// An unsigned legacy (pre-EIP-1559) transaction.
#[derive(Debug, Clone)]
pub struct TxRequest {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
    pub hash: [u8; 32],
}

impl SignedTransaction {
    pub fn raw_hex(&self) -> Hex {
        bytes_to_hex(&self.raw)
    }

    pub fn hash_hex(&self) -> Hex {
        bytes_to_hex(&self.hash)
    }
}

/// A local secp256k1 wallet holding one signing key.
pub struct Wallet {
    signing_key: SigningKey,
    address: Address,
}

impl Wallet {
    /// Load a wallet from a 32-byte hex private key (with or without 0x).
    pub fn from_hex_key(hex_key: &str) -> Result<Self> {
        let bytes = hex_to_bytes(hex_key)?;
        if bytes.len() != 32 {
            return Err(RewardError::Signing(format!(
                "expected 32-byte private key, got {} bytes",
                bytes.len()
            )));
        }
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| RewardError::Signing(format!("invalid private key: {}", e)))?;
        let address = derive_address(&signing_key);
        Ok(Self { signing_key, address })
    }

    /// The sender address derived from the signing key.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a legacy transaction with EIP-155 replay protection.
    pub fn sign_transaction(&self, tx: &TxRequest) -> Result<SignedTransaction> {
        let digest = signing_hash(tx);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| RewardError::Signing(e.to_string()))?;

        let v = tx.chain_id * 2 + 35 + u64::from(recovery_id.to_byte());
        let sig_bytes = signature.to_bytes();
        let r = rlp::trim_leading_zeros(&sig_bytes[..32]);
        let s = rlp::trim_leading_zeros(&sig_bytes[32..]);

        let raw = rlp::encode_list(&[
            rlp::encode_uint(tx.nonce as u128),
            rlp::encode_uint(tx.gas_price),
            rlp::encode_uint(tx.gas_limit as u128),
            rlp::encode_bytes(tx.to.as_bytes()),
            rlp::encode_uint(tx.value),
            rlp::encode_bytes(&tx.data),
            rlp::encode_uint(v as u128),
            rlp::encode_bytes(r),
            rlp::encode_bytes(s),
        ]);

        let hash: [u8; 32] = Keccak256::digest(&raw).into();
        Ok(SignedTransaction { raw, hash })
    }
}

/// Keccak-256 of the EIP-155 signing payload:
/// rlp([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]).
fn signing_hash(tx: &TxRequest) -> [u8; 32] {
    let payload = rlp::encode_list(&[
        rlp::encode_uint(tx.nonce as u128),
        rlp::encode_uint(tx.gas_price),
        rlp::encode_uint(tx.gas_limit as u128),
        rlp::encode_bytes(tx.to.as_bytes()),
        rlp::encode_uint(tx.value),
        rlp::encode_bytes(&tx.data),
        rlp::encode_uint(tx.chain_id as u128),
        rlp::encode_uint(0),
        rlp::encode_uint(0),
    ]);
    Keccak256::digest(&payload).into()
}

fn derive_address(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    // skip the 0x04 uncompressed-point tag
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    Address(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_derivation_known_keys() {
        // private key 0x...01 owns a well-known address
        let wallet = Wallet::from_hex_key(
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(
            wallet.address().to_hex(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );

        // vector from the web3.js documentation
        let wallet = Wallet::from_hex_key(
            "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
        )
        .unwrap();
        assert_eq!(
            wallet.address().to_hex(),
            "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23"
        );
    }

    #[test]
    fn test_rejects_malformed_keys() {
        assert!(Wallet::from_hex_key("0x1234").is_err());
        assert!(Wallet::from_hex_key("not hex at all").is_err());
        assert!(Wallet::from_hex_key("").is_err());
    }

    #[test]
    fn test_eip155_reference_transaction() {
        // the worked example from EIP-155 itself
        let wallet = Wallet::from_hex_key(
            "0x4646464646464646464646464646464646464646464646464646464646464646",
        )
        .unwrap();
        let tx = TxRequest {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: Address::from_hex("0x3535353535353535353535353535353535353535").unwrap(),
            value: 1_000_000_000_000_000_000,
            data: vec![],
            chain_id: 1,
        };

        assert_eq!(
            bytes_to_hex(&signing_hash(&tx)),
            "0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );

        let signed = wallet.sign_transaction(&tx).unwrap();
        assert_eq!(
            signed.raw_hex(),
            "0xf86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn test_distinct_nonces_give_distinct_hashes() {
        let wallet = Wallet::from_hex_key(
            "0x4646464646464646464646464646464646464646464646464646464646464646",
        )
        .unwrap();
        let base = TxRequest {
            nonce: 0,
            gas_price: 30_000_000_000,
            gas_limit: 60_000,
            to: Address::from_hex("0xbe00447a89f5bb9e09fd49acf3cfb4dc3f076a26").unwrap(),
            value: 0,
            data: vec![0xa9, 0x05, 0x9c, 0xbb],
            chain_id: 80_002,
        };
        let mut next = base.clone();
        next.nonce = 1;

        let first = wallet.sign_transaction(&base).unwrap();
        let second = wallet.sign_transaction(&next).unwrap();
        assert_ne!(first.hash, second.hash);
        assert_ne!(first.raw, second.raw);
    }
}
