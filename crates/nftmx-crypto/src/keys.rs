//! secp256k1 signing identity.
//!
//! Flow: mnemonic -> BIP-39 seed -> BIP-32 `m/44'/330'/0'/0/0` -> signing key
//! (or a raw 32-byte hex key) -> compressed public key -> account address.
//!
//! Signatures are ECDSA over SHA-256 with RFC 6979 nonces, so signing the same
//! bytes twice yields the same 64-byte `r || s`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bip32::{DerivationPath, XPrv};
use bip39::{Language, Mnemonic};
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use nftmx_types::{MarketError, Result};
use std::fmt;

use crate::address::address_from_public_key;

/// Terra's registered coin type is 330.
pub const DEFAULT_HD_PATH: &str = "m/44'/330'/0'/0/0";

/// Where the signing key comes from. `Debug` never prints the secret.
#[derive(Clone)]
pub enum KeyMaterial {
    Mnemonic(String),
    PrivateKeyHex(String),
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::Mnemonic(_) => f.write_str("KeyMaterial::Mnemonic(<redacted>)"),
            KeyMaterial::PrivateKeyHex(_) => f.write_str("KeyMaterial::PrivateKeyHex(<redacted>)"),
        }
    }
}

/// A signing key plus its derived public key and address.
pub struct SigningIdentity {
    key: SigningKey,
    public_key: [u8; 33],
    address: String,
}

impl SigningIdentity {
    pub fn from_key_material(material: &KeyMaterial) -> Result<Self> {
        match material {
            KeyMaterial::Mnemonic(phrase) => Self::from_mnemonic(phrase),
            KeyMaterial::PrivateKeyHex(key) => Self::from_private_key_hex(key),
        }
    }

    /// Derive the identity from a BIP-39 phrase at [`DEFAULT_HD_PATH`].
    pub fn from_mnemonic(phrase: &str) -> Result<Self> {
        Self::from_mnemonic_with_path(phrase, DEFAULT_HD_PATH)
    }

    pub fn from_mnemonic_with_path(phrase: &str, path: &str) -> Result<Self> {
        // errors from the mnemonic parser can echo words back, so they are dropped
        let words = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, &words)
            .map_err(|_| MarketError::InvalidKeyMaterial)?;
        let seed = mnemonic.to_seed("");
        let path: DerivationPath = path
            .parse()
            .map_err(|_| MarketError::Config(format!("invalid derivation path {:?}", path)))?;
        let xprv = XPrv::derive_from_path(seed, &path)
            .map_err(|_| MarketError::InvalidKeyMaterial)?;
        Self::from_signing_key(xprv.private_key().clone())
    }

    /// Load a raw 32-byte private key, hex-encoded with or without `0x`.
    pub fn from_private_key_hex(key_hex: &str) -> Result<Self> {
        let key_hex = key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let bytes = hex::decode(key_hex).map_err(|_| MarketError::InvalidKeyMaterial)?;
        if bytes.len() != 32 {
            return Err(MarketError::InvalidKeyMaterial);
        }
        let key = SigningKey::from_slice(&bytes).map_err(|_| MarketError::InvalidKeyMaterial)?;
        Self::from_signing_key(key)
    }

    fn from_signing_key(key: SigningKey) -> Result<Self> {
        let point = key.verifying_key().to_encoded_point(true);
        let public_key: [u8; 33] = point
            .as_bytes()
            .try_into()
            .map_err(|_| MarketError::InvalidKeyMaterial)?;
        let address = address_from_public_key(&public_key)?;
        Ok(Self { key, public_key, address })
    }

    /// The account address, e.g. `terra1...`.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// 33-byte compressed secp256k1 public key.
    pub fn public_key(&self) -> &[u8; 33] {
        &self.public_key
    }

    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.public_key)
    }

    /// Sign `bytes` (hashed with SHA-256), returning the low-S `r || s` form.
    pub fn sign(&self, bytes: &[u8]) -> [u8; 64] {
        let signature: Signature = self.key.sign(bytes);
        let signature = signature.normalize_s().unwrap_or(signature);
        let mut out = [0u8; 64];
        out.copy_from_slice(&signature.to_bytes());
        out
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Verify a 64-byte `r || s` signature over `bytes` against a compressed public key.
pub fn verify_signature(public_key: &[u8], bytes: &[u8], signature: &[u8]) -> bool {
    let Ok(key) = VerifyingKey::from_sec1_bytes(public_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify(bytes, &signature).is_ok()
}
