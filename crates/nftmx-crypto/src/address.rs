//! Bech32 account addresses.
//!
//! address = bech32("terra", RIPEMD160(SHA256(compressed_pubkey)))

use bech32::{Bech32, Hrp};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use nftmx_types::{MarketError, Result, ACCOUNT_PREFIX};

/// Derive the account address for a 33-byte compressed secp256k1 public key.
pub fn address_from_public_key(public_key: &[u8]) -> Result<String> {
    let sha = Sha256::digest(public_key);
    let hash = Ripemd160::digest(sha);
    let hrp = Hrp::parse(ACCOUNT_PREFIX).map_err(|e| MarketError::Other(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, &hash).map_err(|e| MarketError::Other(e.to_string()))
}

/// Check that `address` is a well-formed bech32 address with the chain's prefix.
pub fn validate_address(address: &str) -> Result<()> {
    let (hrp, data) = bech32::decode(address)
        .map_err(|e| MarketError::invalid(format!("invalid address {:?}: {}", address, e)))?;
    if hrp.as_str() != ACCOUNT_PREFIX {
        return Err(MarketError::invalid(format!(
            "address {:?} has prefix {:?}, expected {:?}",
            address,
            hrp.as_str(),
            ACCOUNT_PREFIX
        )));
    }
    if data.is_empty() {
        return Err(MarketError::invalid(format!("address {:?} has no payload", address)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_vector() {
        let pk = hex::decode("034ce0dffc8d142fa47cca9c8b4c60ac7740fe5b2ec2ad6f23af499e6f0f9ac9b1").unwrap();
        assert_eq!(
            address_from_public_key(&pk).unwrap(),
            "terra1khx3u8zp9t9vvvg9wk3elzzs8uk72tq9hq8h2u"
        );
    }

    #[test]
    fn test_validate_known_addresses() {
        assert!(validate_address("terra1rmw87h769rt553myzcvnqavvnqzqxm2r9twsju").is_ok());
        assert!(validate_address("terra1d0n6e9k666xurqej0j0tl0znkwzrnqr8sayx37").is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_addresses() {
        // flipped last character breaks the checksum
        assert!(validate_address("terra1rmw87h769rt553myzcvnqavvnqzqxm2r9twsjv").is_err());
        assert!(validate_address("").is_err());
        assert!(validate_address("not an address").is_err());
        assert!(validate_address("cosmos1rmw87h769rt553myzcvnqavvnqzqxm2r9twsju").is_err());
    }
}
