//! Read-only marketplace queries.

use serde::{Deserialize, Serialize};
use nftmx_types::{AssetRef, Expiration, Price};

/// Smart queries understood by the marketplace contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMsg {
    ValidOrder { token_id: String, nft_address: String },
    ValidBid { token_id: String, nft_address: String },
    Version {},
}

impl QueryMsg {
    pub fn valid_order(asset: &AssetRef) -> Self {
        QueryMsg::ValidOrder {
            token_id: asset.token_id.clone(),
            nft_address: asset.nft_address.clone(),
        }
    }

    pub fn valid_bid(asset: &AssetRef) -> Self {
        QueryMsg::ValidBid {
            token_id: asset.token_id.clone(),
            nft_address: asset.nft_address.clone(),
        }
    }
}

/// A listing as stored by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub token_id: String,
    pub nft_address: String,
    pub seller: String,
    pub price: Price,
    pub expire_at: Expiration,
}

/// The standing bid on a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub token_id: String,
    pub nft_address: String,
    pub seller: String,
    pub bidder: String,
    pub price: Price,
    pub expire_at: Expiration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_shapes() {
        let asset = AssetRef::new("terra1rmw87h769rt553myzcvnqavvnqzqxm2r9twsju", "1");
        assert_eq!(
            serde_json::to_value(QueryMsg::valid_order(&asset)).unwrap(),
            json!({"valid_order": {"token_id": "1", "nft_address": "terra1rmw87h769rt553myzcvnqavvnqzqxm2r9twsju"}})
        );
        assert_eq!(serde_json::to_value(QueryMsg::Version {}).unwrap(), json!({"version": {}}));
    }

    #[test]
    fn test_parse_order() {
        let order: Order = serde_json::from_value(json!({
            "token_id": "2",
            "nft_address": "terra1rmw87h769rt553myzcvnqavvnqzqxm2r9twsju",
            "seller": "terra13h4nw2y0lkpz8xs55fxa9vaugrnjkyu4czvr8u",
            "price": {"info": {"native_token": {"denom": "uluna"}}, "amount": "10000"},
            "expire_at": {"at_time": "1668544526734254325"}
        }))
        .unwrap();
        assert_eq!(order.price, Price::native("10000", "uluna"));
        assert_eq!(order.expire_at, Expiration::AtTime(1_668_544_526));
    }
}
