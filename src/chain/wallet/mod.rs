mod keys;
mod signer;

pub use keys::{LocalKey, DEFAULT_HD_PATH, DEFAULT_PREFIX};
pub use signer::{KeySigner, SignedTransaction, SigningContext, TransactionSigner};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_usable_through_trait_object() {
        let key: std::sync::Arc<dyn KeySigner> =
            std::sync::Arc::new(LocalKey::from_hex(&"07".repeat(32)).unwrap());
        assert_eq!(key.public_key().unwrap().len(), 33);
        assert_eq!(key.sign(b"payload").unwrap().len(), 64);
    }
}
