//! String identifiers used on the wire and as storage keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Client-generated identifier of a token (hex Blake2b of its preimage).
    TokenId
);
string_id!(
    /// Client-generated idempotency key of a confirmation.
    ConfirmationId
);
string_id!(
    /// Identifier of a ledger transaction.
    TransactionId
);
string_id!(
    /// The ad creative instance a confirmation refers to.
    CreativeInstanceId
);
string_id!(
    /// Identifier of a promotion grant.
    PromotionId
);
string_id!(
    /// Anonymous payment identity of a wallet.
    PaymentId
);

impl ConfirmationId {
    /// A fresh random (UUID v4) confirmation id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl TransactionId {
    /// Redemption transactions share the id of the confirmation that produced them.
    pub fn for_confirmation(id: &ConfirmationId) -> Self {
        Self(id.0.clone())
    }

    /// Promotion transactions are keyed by promotion so a retried grant collides.
    pub fn for_promotion(id: &PromotionId) -> Self {
        Self(format!("promotion:{}", id.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_confirmation_ids_are_unique() {
        let a = ConfirmationId::generate();
        let b = ConfirmationId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn promotion_transaction_id_is_stable() {
        let promo = PromotionId::new("grant-7");
        assert_eq!(
            TransactionId::for_promotion(&promo),
            TransactionId::for_promotion(&PromotionId::new("grant-7"))
        );
        assert_eq!(TransactionId::for_promotion(&promo).as_str(), "promotion:grant-7");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = TokenId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
