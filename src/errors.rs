use thiserror::Error;

/// Rejections returned by inventory and currency mutations.
///
/// Every variant leaves the affected records untouched, so callers can branch on
/// the kind and render a specific message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EconomyError {
    /// The item id is not part of the catalog.
    #[error("unknown item: {0}")]
    ItemNotFound(String),

    /// Adding the items would push the carried weight over the backpack limit.
    #[error("capacity exceeded: carrying {current}, would need {required}, limit {max}")]
    CapacityExceeded {
        current: f64,
        required: f64,
        max: f64,
    },

    /// Removal or transfer asks for more than the user holds.
    #[error("insufficient quantity of {item_id}: holding {held}, requested {requested}")]
    InsufficientQuantity {
        item_id: String,
        held: u64,
        requested: u64,
    },

    /// Zero-quantity mutations are meaningless and rejected up front.
    #[error("quantity must be greater than zero")]
    InvalidQuantity,

    /// Sender and recipient of a transfer are the same user.
    #[error("cannot transfer to the same user: {0}")]
    SelfTransfer(String),

    /// Backpack capacity only ever grows.
    #[error("capacity can only increase: current {current}, requested {requested}")]
    CapacityDowngrade { current: f64, requested: f64 },

    /// Requested backpack tier is not in the tier table.
    #[error("unknown backpack tier: {0}")]
    UnknownTier(usize),

    /// The stored record could not be read, so it cannot be safely modified.
    #[error("inventory storage unavailable: {0}")]
    Storage(String),
}

impl EconomyError {
    /// Stable machine-readable code for front ends that localize messages.
    pub fn code(&self) -> &'static str {
        match self {
            EconomyError::ItemNotFound(_) => "ITEM_NOT_FOUND",
            EconomyError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            EconomyError::InsufficientQuantity { .. } => "INSUFFICIENT_QUANTITY",
            EconomyError::InvalidQuantity => "INVALID_QUANTITY",
            EconomyError::SelfTransfer(_) => "SELF_TRANSFER",
            EconomyError::CapacityDowngrade { .. } => "CAPACITY_DOWNGRADE",
            EconomyError::UnknownTier(_) => "UNKNOWN_TIER",
            EconomyError::Storage(_) => "STORAGE_UNAVAILABLE",
        }
    }
}

/// Errors raised by persistence backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Wrapper around IO errors (directory creation, file access, locking).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Blocking task failed to complete.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        StorageError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_distinguish_rejections() {
        let capacity = EconomyError::CapacityExceeded {
            current: 1.0,
            required: 3.0,
            max: 2.0,
        };
        let quantity = EconomyError::InsufficientQuantity {
            item_id: "silver".into(),
            held: 1,
            requested: 2,
        };
        assert_eq!(capacity.code(), "CAPACITY_EXCEEDED");
        assert_eq!(quantity.code(), "INSUFFICIENT_QUANTITY");
        assert_eq!(EconomyError::ItemNotFound("x".into()).code(), "ITEM_NOT_FOUND");
        assert!(quantity.to_string().contains("holding 1"));
        assert_eq!(EconomyError::Storage("down".into()).code(), "STORAGE_UNAVAILABLE");
    }
}
