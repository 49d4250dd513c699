//! Signing identity for the marketplace client.
//!
//! - `keys`: key material -> secp256k1 signing key, deterministic signatures
//! - `address`: compressed public key -> bech32 account address

pub mod address;
pub mod keys;

pub use address::{address_from_public_key, validate_address};
pub use keys::{verify_signature, KeyMaterial, SigningIdentity, DEFAULT_HD_PATH};
