//! Record of an order a user has submitted.

use serde::{Deserialize, Serialize};
use std::fmt;
use types::{ExchangeError, Result, Side};

/// What a user remembers about one of their own submissions: enough to
/// cancel it or match incoming messages against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    user: String,
    product: String,
    side: Side,
    order_id: String,
}

impl OrderRecord {
    pub fn new(user: &str, product: &str, side: Side, order_id: &str) -> Result<Self> {
        for (value, what) in [(user, "user name"), (product, "product"), (order_id, "order id")] {
            if value.trim().is_empty() {
                return Err(ExchangeError::InvalidData(format!(
                    "an order record needs a non-empty {what}"
                )));
            }
        }
        Ok(Self {
            user: user.trim().to_uppercase(),
            product: product.trim().to_uppercase(),
            side,
            order_id: order_id.to_string(),
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }
}

impl fmt::Display for OrderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User {}, {} {} ({})",
            self.user, self.side, self.product, self.order_id
        )
    }
}
