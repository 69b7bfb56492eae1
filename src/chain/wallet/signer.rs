use std::sync::Arc;

use cosmos_sdk_proto::cosmos::tx::signing::v1beta1::SignMode;
use prost::Message;
use sha2::{Digest, Sha256};

use crate::chain::encoding::EncodingRegistry;
use crate::chain::proto::{mode_info, AuthInfo, ModeInfo, SignDoc, SignerInfo, TxRaw};
use crate::chain::tx_builder::UnsignedTransaction;
use crate::error::Result;

/// Key material capability: whatever holds the key (file, device, remote
/// service) only has to expose its public key and sign bytes.
pub trait KeySigner: Send + Sync {
    /// Compressed secp256k1 public key
    fn public_key(&self) -> Result<Vec<u8>>;

    /// Signature over the canonical sign bytes
    fn sign(&self, sign_bytes: &[u8]) -> Result<Vec<u8>>;
}

/// Everything needed to produce exactly one valid signature.
///
/// A (chain_id, account_number, sequence) triple must not be signed twice;
/// after a failed broadcast resolve the sequence again.
#[derive(Clone)]
pub struct SigningContext {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
    pub key: Arc<dyn KeySigner>,
}

impl std::fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningContext")
            .field("chain_id", &self.chain_id)
            .field("account_number", &self.account_number)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// Signed, wire-encoded `TxRaw`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub bytes: Vec<u8>,
}

impl SignedTransaction {
    /// Hash the node will report for this transaction
    pub fn hash(&self) -> String {
        hex::encode_upper(Sha256::digest(&self.bytes))
    }
}

/// SIGN_MODE_DIRECT signer
pub struct TransactionSigner<'a> {
    registry: &'a EncodingRegistry,
}

impl<'a> TransactionSigner<'a> {
    pub fn new(registry: &'a EncodingRegistry) -> Self {
        Self { registry }
    }

    /// Sign over SignDoc(body, auth info with sequence, chain id, account
    /// number). Produces exactly one signature and never touches
    /// `ctx.sequence`.
    pub fn sign(&self, unsigned: &UnsignedTransaction, ctx: &SigningContext) -> Result<SignedTransaction> {
        let public_key = ctx.key.public_key()?;

        let signer_info = SignerInfo {
            public_key: Some(self.registry.encode_public_key(&public_key)),
            mode_info: Some(ModeInfo {
                sum: Some(mode_info::Sum::Single(mode_info::Single {
                    mode: SignMode::Direct as i32,
                })),
            }),
            sequence: ctx.sequence,
        };
        let auth_info = AuthInfo {
            signer_infos: vec![signer_info],
            fee: Some(unsigned.fee.clone()),
            ..Default::default()
        };

        let body_bytes = unsigned.body.encode_to_vec();
        let auth_info_bytes = auth_info.encode_to_vec();

        let sign_doc = SignDoc {
            body_bytes: body_bytes.clone(),
            auth_info_bytes: auth_info_bytes.clone(),
            chain_id: ctx.chain_id.clone(),
            account_number: ctx.account_number,
        };
        let signature = ctx.key.sign(&sign_doc.encode_to_vec())?;

        log::debug!(
            "Signed tx for chain {} account {} sequence {}",
            ctx.chain_id,
            ctx.account_number,
            ctx.sequence
        );

        let tx_raw = TxRaw {
            body_bytes,
            auth_info_bytes,
            signatures: vec![signature],
        };
        Ok(SignedTransaction {
            bytes: tx_raw.encode_to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::messages::{MessageIntent, MessageKind};
    use crate::chain::tx_builder::{TransactionMetadata, TxBuilder};
    use crate::chain::wallet::LocalKey;
    use crate::error::TxError;

    fn context(chain_id: &str, account_number: u64, sequence: u64) -> SigningContext {
        SigningContext {
            chain_id: chain_id.to_string(),
            account_number,
            sequence,
            key: Arc::new(LocalKey::from_hex(&"42".repeat(32)).unwrap()),
        }
    }

    fn unsigned(registry: &EncodingRegistry, memo: &str) -> UnsignedTransaction {
        let msg = MessageKind::Send
            .build(&MessageIntent {
                from: "addr1".to_string(),
                to: "addr2".to_string(),
                amount: 1000,
                denom: "utoken".to_string(),
                ..Default::default()
            })
            .unwrap();
        let metadata = TransactionMetadata {
            address: "addr1".to_string(),
            fee_amount: 200,
            fee_denom: "utoken".to_string(),
            gas_limit: 80000,
            memo: memo.to_string(),
            signing: context("test-1", 5, 3),
        };
        TxBuilder::new(registry).build(vec![msg], &metadata).unwrap()
    }

    fn signature(tx: &SignedTransaction) -> Vec<u8> {
        let raw = TxRaw::decode(tx.bytes.as_slice()).unwrap();
        assert_eq!(raw.signatures.len(), 1);
        raw.signatures[0].clone()
    }

    #[test]
    fn test_signature_covers_every_sign_input() {
        let registry = EncodingRegistry::new();
        let signer = TransactionSigner::new(&registry);
        let tx = unsigned(&registry, "");

        let base = signature(&signer.sign(&tx, &context("test-1", 5, 3)).unwrap());
        assert_eq!(base, signature(&signer.sign(&tx, &context("test-1", 5, 3)).unwrap()));

        let variants = [
            signer.sign(&tx, &context("test-2", 5, 3)).unwrap(),
            signer.sign(&tx, &context("test-1", 6, 3)).unwrap(),
            signer.sign(&tx, &context("test-1", 5, 4)).unwrap(),
            signer.sign(&unsigned(&registry, "memo"), &context("test-1", 5, 3)).unwrap(),
        ];
        for v in &variants {
            assert_ne!(signature(v), base);
        }
    }

    #[test]
    fn test_signer_info_carries_sequence() {
        let registry = EncodingRegistry::new();
        let signed = TransactionSigner::new(&registry)
            .sign(&unsigned(&registry, ""), &context("test-1", 5, 3))
            .unwrap();

        let raw = TxRaw::decode(signed.bytes.as_slice()).unwrap();
        let auth_info = AuthInfo::decode(raw.auth_info_bytes.as_slice()).unwrap();
        assert_eq!(auth_info.signer_infos.len(), 1);
        assert_eq!(auth_info.signer_infos[0].sequence, 3);
        assert_eq!(signed.hash().len(), 64);
    }

    struct LockedKey;

    impl KeySigner for LockedKey {
        fn public_key(&self) -> Result<Vec<u8>> {
            Ok(vec![2u8; 33])
        }

        fn sign(&self, _sign_bytes: &[u8]) -> Result<Vec<u8>> {
            Err(TxError::SigningUnavailable("keyring locked".into()))
        }
    }

    #[test]
    fn test_locked_key_fails() {
        let registry = EncodingRegistry::new();
        let mut ctx = context("test-1", 5, 3);
        ctx.key = Arc::new(LockedKey);
        let err = TransactionSigner::new(&registry)
            .sign(&unsigned(&registry, ""), &ctx)
            .unwrap_err();
        assert!(matches!(err, TxError::SigningUnavailable(_)));
    }
}
