//! Encoding registry: maps type URLs to decoders for every message and
//! public key type this client produces or reads back.
//!
//! Built once per run and passed explicitly; there is no global instance.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use prost::Message;
use serde_json::{json, Value};

use crate::chain::messages::ChainMessage;
use crate::chain::proto::{
    type_urls, Any, Ed25519PubKey, MsgExecuteContract, MsgSend, MsgTransfer, Secp256k1PubKey,
};
use crate::error::{Result, TxError};

type MessageDecoder = fn(&[u8]) -> Result<ChainMessage>;
type PublicKeyDecoder = fn(&[u8]) -> Result<Vec<u8>>;

pub struct EncodingRegistry {
    messages: HashMap<&'static str, MessageDecoder>,
    public_keys: HashMap<&'static str, PublicKeyDecoder>,
    amino: LegacyAmino,
}

impl EncodingRegistry {
    /// Registry with crypto public keys, payment messages and the legacy
    /// amino crypto names.
    pub fn new() -> Self {
        let mut registry = Self {
            messages: HashMap::new(),
            public_keys: HashMap::new(),
            amino: LegacyAmino::default(),
        };
        registry.register_crypto_interfaces();
        registry.register_payment_interfaces();
        registry.amino.register_crypto();
        log::debug!(
            "Encoding registry ready: {} message types, {} key types",
            registry.messages.len(),
            registry.public_keys.len()
        );
        registry
    }

    fn register_crypto_interfaces(&mut self) {
        self.register_public_key(type_urls::SECP256K1_PUBKEY, |bytes| {
            Ok(Secp256k1PubKey::decode(bytes)?.key)
        });
        self.register_public_key(type_urls::ED25519_PUBKEY, |bytes| {
            Ok(Ed25519PubKey::decode(bytes)?.key)
        });
    }

    fn register_payment_interfaces(&mut self) {
        self.register_message(type_urls::MSG_SEND, |bytes| {
            Ok(ChainMessage::Send(MsgSend::decode(bytes)?))
        });
        self.register_message(type_urls::MSG_TRANSFER, |bytes| {
            Ok(ChainMessage::Transfer(MsgTransfer::decode(bytes)?))
        });
        self.register_message(type_urls::MSG_EXECUTE_CONTRACT, |bytes| {
            Ok(ChainMessage::Swap(MsgExecuteContract::decode(bytes)?))
        });
    }

    fn register_message(&mut self, type_url: &'static str, decoder: MessageDecoder) {
        let previous = self.messages.insert(type_url, decoder);
        assert!(previous.is_none(), "message type {} registered twice", type_url);
    }

    fn register_public_key(&mut self, type_url: &'static str, decoder: PublicKeyDecoder) {
        let previous = self.public_keys.insert(type_url, decoder);
        assert!(previous.is_none(), "public key type {} registered twice", type_url);
    }

    pub fn is_registered(&self, type_url: &str) -> bool {
        self.messages.contains_key(type_url) || self.public_keys.contains_key(type_url)
    }

    pub fn encode_message(&self, msg: &ChainMessage) -> Result<Any> {
        let type_url = msg.type_url();
        if !self.messages.contains_key(type_url) {
            return Err(TxError::UnregisteredType(type_url.to_string()));
        }
        Ok(msg.to_any())
    }

    pub fn decode_message(&self, any: &Any) -> Result<ChainMessage> {
        let decoder = self
            .messages
            .get(any.type_url.as_str())
            .ok_or_else(|| TxError::UnregisteredType(any.type_url.clone()))?;
        decoder(&any.value)
    }

    /// Wrap a compressed secp256k1 key for a signer info.
    pub fn encode_public_key(&self, key: &[u8]) -> Any {
        Any {
            type_url: type_urls::SECP256K1_PUBKEY.to_string(),
            value: Secp256k1PubKey { key: key.to_vec() }.encode_to_vec(),
        }
    }

    /// Raw key bytes of any registered public key type.
    pub fn decode_public_key(&self, any: &Any) -> Result<Vec<u8>> {
        let decoder = self
            .public_keys
            .get(any.type_url.as_str())
            .ok_or_else(|| TxError::UnregisteredType(any.type_url.clone()))?;
        decoder(&any.value)
    }

    pub fn amino(&self) -> &LegacyAmino {
        &self.amino
    }
}

impl Default for EncodingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

struct AminoEntry {
    type_url: &'static str,
    name: &'static str,
}

/// Legacy amino JSON for the compatibility paths (key display).
#[derive(Default)]
pub struct LegacyAmino {
    entries: Vec<AminoEntry>,
}

impl LegacyAmino {
    fn register_crypto(&mut self) {
        self.register_concrete(type_urls::SECP256K1_PUBKEY, "tendermint/PubKeySecp256k1");
        self.register_concrete(type_urls::ED25519_PUBKEY, "tendermint/PubKeyEd25519");
    }

    fn register_concrete(&mut self, type_url: &'static str, name: &'static str) {
        assert!(
            !self.entries.iter().any(|e| e.type_url == type_url || e.name == name),
            "amino name {} registered twice",
            name
        );
        self.entries.push(AminoEntry { type_url, name });
    }

    pub fn name_of(&self, type_url: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|e| e.type_url == type_url)
            .map(|e| e.name)
    }

    /// `{"type": <amino name>, "value": <base64 key>}`
    pub fn marshal_json(&self, public_key: &Any) -> Result<Value> {
        let name = self
            .name_of(&public_key.type_url)
            .ok_or_else(|| TxError::UnregisteredType(public_key.type_url.clone()))?;
        // secp256k1 and ed25519 keys share the same single-field layout
        let key = Secp256k1PubKey::decode(public_key.value.as_slice())?.key;
        Ok(json!({ "type": name, "value": BASE64.encode(key) }))
    }

    pub fn unmarshal_json(&self, value: &Value) -> Result<Any> {
        let name = value["type"]
            .as_str()
            .ok_or_else(|| TxError::Encoding("amino JSON has no type".into()))?;
        let entry = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| TxError::UnregisteredType(name.to_string()))?;
        let encoded = value["value"]
            .as_str()
            .ok_or_else(|| TxError::Encoding("amino JSON has no value".into()))?;
        let key = BASE64
            .decode(encoded)
            .map_err(|e| TxError::Encoding(format!("invalid base64 key: {}", e)))?;
        Ok(Any {
            type_url: entry.type_url.to_string(),
            value: Secp256k1PubKey { key }.encode_to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::messages::{MessageIntent, MessageKind};

    #[test]
    fn test_message_round_trip_through_registry() {
        let registry = EncodingRegistry::new();
        let msg = MessageKind::Send
            .build(&MessageIntent {
                from: "addr1".to_string(),
                to: "addr2".to_string(),
                amount: 5,
                denom: "utoken".to_string(),
                ..Default::default()
            })
            .unwrap();

        let any = registry.encode_message(&msg).unwrap();
        assert_eq!(registry.decode_message(&any).unwrap(), msg);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let registry = EncodingRegistry::new();
        let any = Any {
            type_url: "/cosmos.staking.v1beta1.MsgDelegate".to_string(),
            value: vec![],
        };
        assert!(matches!(
            registry.decode_message(&any),
            Err(TxError::UnregisteredType(_))
        ));
    }

    #[test]
    fn test_independent_registries_agree() {
        let a = EncodingRegistry::new();
        let b = EncodingRegistry::new();
        let key = [2u8; 33];
        assert_eq!(a.encode_public_key(&key), b.encode_public_key(&key));
        assert!(a.is_registered(type_urls::MSG_TRANSFER));
        assert!(b.is_registered(type_urls::SECP256K1_PUBKEY));
    }

    #[test]
    fn test_amino_public_key_json() {
        let registry = EncodingRegistry::new();
        let any = registry.encode_public_key(&[3u8; 33]);

        let json = registry.amino().marshal_json(&any).unwrap();
        assert_eq!(json["type"], "tendermint/PubKeySecp256k1");

        let back = registry.amino().unmarshal_json(&json).unwrap();
        assert_eq!(back, any);
        assert_eq!(registry.decode_public_key(&back).unwrap(), vec![3u8; 33]);
    }
}
