use bech32::{Bech32, Hrp};
use bip32::{DerivationPath, XPrv};
use bip39::Mnemonic;
use ripemd::Ripemd160;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::signer::KeySigner;
use crate::error::{Result, TxError};

/// Cosmos coin type 118
pub const DEFAULT_HD_PATH: &str = "m/44'/118'/0'/0/0";
pub const DEFAULT_PREFIX: &str = "cosmos";

/// In-process secp256k1 key.
/// Secret bytes are wiped when the key is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct LocalKey {
    private_key_bytes: [u8; 32],
    #[zeroize(skip)]
    public_key_bytes: [u8; 33],
}

impl LocalKey {
    /// Derive from a BIP39 phrase along `hd_path`.
    pub fn from_mnemonic(phrase: &str, passphrase: &str, hd_path: &str) -> Result<Self> {
        let mnemonic = Mnemonic::parse(phrase.trim())
            .map_err(|e| TxError::SigningUnavailable(format!("invalid mnemonic: {}", e)))?;
        let seed = mnemonic.to_seed(passphrase);

        let path: DerivationPath = hd_path
            .parse()
            .map_err(|e| TxError::SigningUnavailable(format!("invalid HD path {}: {}", hd_path, e)))?;
        let xprv = XPrv::derive_from_path(seed, &path)
            .map_err(|e| TxError::SigningUnavailable(format!("key derivation failed: {}", e)))?;

        let mut private_key = xprv.to_bytes();
        let key = Self::from_bytes(&private_key);
        private_key.zeroize();
        key
    }

    /// Raw 32-byte private key as hex, with or without `0x`.
    pub fn from_hex(private_key_hex: &str) -> Result<Self> {
        let trimmed = private_key_hex.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let mut bytes = hex::decode(digits)
            .map_err(|e| TxError::SigningUnavailable(format!("invalid private key hex: {}", e)))?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }

    fn from_bytes(private_key: &[u8]) -> Result<Self> {
        let secret_key = SecretKey::from_slice(private_key)
            .map_err(|e| TxError::SigningUnavailable(format!("invalid private key: {}", e)))?;
        let public_key = PublicKey::from_secret_key(&Secp256k1::new(), &secret_key);

        let mut private_key_bytes = [0u8; 32];
        private_key_bytes.copy_from_slice(private_key);
        Ok(Self {
            private_key_bytes,
            public_key_bytes: public_key.serialize(),
        })
    }

    /// Bech32 account address: RIPEMD160(SHA256(compressed pubkey)).
    pub fn address(&self, prefix: &str) -> Result<String> {
        let sha = Sha256::digest(self.public_key_bytes);
        let account_id = Ripemd160::digest(sha);

        let hrp = Hrp::parse(prefix)
            .map_err(|e| TxError::Encoding(format!("invalid address prefix {}: {}", prefix, e)))?;
        bech32::encode::<Bech32>(hrp, &account_id)
            .map_err(|e| TxError::Encoding(format!("bech32 encoding failed: {}", e)))
    }

    fn secret_key(&self) -> Result<SecretKey> {
        SecretKey::from_slice(&self.private_key_bytes)
            .map_err(|e| TxError::SigningUnavailable(format!("invalid private key: {}", e)))
    }
}

impl std::fmt::Debug for LocalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKey")
            .field("public_key", &hex::encode(self.public_key_bytes))
            .finish_non_exhaustive()
    }
}

impl KeySigner for LocalKey {
    fn public_key(&self) -> Result<Vec<u8>> {
        Ok(self.public_key_bytes.to_vec())
    }

    /// ECDSA over SHA-256 of the sign bytes, 64-byte compact (r || s).
    fn sign(&self, sign_bytes: &[u8]) -> Result<Vec<u8>> {
        let digest: [u8; 32] = Sha256::digest(sign_bytes).into();
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| TxError::SigningUnavailable(e.to_string()))?;

        let signature = Secp256k1::signing_only().sign_ecdsa(&message, &self.secret_key()?);
        Ok(signature.serialize_compact().to_vec())
    }
}
