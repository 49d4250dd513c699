//! cw721 messages sent to the NFT contract itself.
//!
//! A seller lists with `create_order` while still owning the NFT, then hands
//! it to the marketplace. Both messages may share one transaction, listing
//! first.

use serde::Serialize;
use nftmx_crypto::validate_address;
use nftmx_types::{AssetRef, MarketError, Result};

use crate::ContractCall;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Cw721ExecuteMsg<'a> {
    TransferNft { recipient: &'a str, token_id: &'a str },
}

/// Transfer `asset` to `recipient`, executed against the NFT contract.
pub fn transfer_nft(asset: &AssetRef, recipient: &str) -> Result<ContractCall> {
    if asset.token_id.trim().is_empty() {
        return Err(MarketError::invalid("token_id must not be empty"));
    }
    validate_address(&asset.nft_address)?;
    validate_address(recipient)?;

    let msg = serde_json::to_value(Cw721ExecuteMsg::TransferNft {
        recipient,
        token_id: &asset.token_id,
    })
    .map_err(|e| MarketError::Other(format!("failed to serialize transfer_nft: {}", e)))?;

    Ok(ContractCall {
        contract: asset.nft_address.clone(),
        msg,
        funds: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transfer_nft_call() {
        let asset = AssetRef::new("terra1rmw87h769rt553myzcvnqavvnqzqxm2r9twsju", "2");
        let call = transfer_nft(&asset, "terra1nxn92p56sfyfds790vgxqannux775ysha7cc75").unwrap();
        assert_eq!(call.contract, "terra1rmw87h769rt553myzcvnqavvnqzqxm2r9twsju");
        assert_eq!(
            call.msg,
            json!({"transfer_nft": {"recipient": "terra1nxn92p56sfyfds790vgxqannux775ysha7cc75", "token_id": "2"}})
        );
        assert!(call.funds.is_empty());
    }

    #[test]
    fn test_transfer_nft_rejects_bad_recipient() {
        let asset = AssetRef::new("terra1rmw87h769rt553myzcvnqavvnqzqxm2r9twsju", "2");
        assert!(transfer_nft(&asset, "").is_err());
    }
}
