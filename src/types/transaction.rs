/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The transaction type and its wire encoding.
//!
//! A [`Transaction`] is a signed [`Envelope`]. The envelope carries the metadata that the
//! [middleware chain](crate::chain) inspects (chain ID, expiry, nonce, fee, assumed roles) around a
//! module-addressed [`Payload`] which only the [dispatched](crate::dispatcher) handler interprets.
//!
//! ## Wire format
//!
//! Transactions travel as the Borsh serialization of [`Transaction`]. Signatures are computed over
//! the Borsh serialization of the [`Envelope`] alone ([`sign_bytes`](Envelope::sign_bytes)).

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    crypto_primitives::{Signature, SignatureError, Signer, SigningKey, Verifier, VerifyingKey},
    data_types::{Actor, BlockHeight, ChainID, Coin, CryptoHash, ModuleTag},
};

/// A decoded transaction.
///
/// Once decoded at the boundary, a transaction is only ever passed by reference through the chain.
/// Stages add what they learn from it to the [execution context](crate::context::ExecutionContext),
/// never to the transaction itself.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub envelope: Envelope,
    pub signatures: Vec<TxSignature>,
}

impl Transaction {
    /// Create an unsigned transaction wrapping `envelope`.
    pub fn new(envelope: Envelope) -> Transaction {
        Transaction {
            envelope,
            signatures: Vec::new(),
        }
    }

    /// Sign the envelope with `signing_key` and append the signature.
    pub fn sign(mut self, signing_key: &SigningKey) -> std::io::Result<Transaction> {
        let message = self.envelope.sign_bytes()?;
        self.signatures.push(TxSignature {
            verifying_key: signing_key.verifying_key().to_bytes(),
            signature: signing_key.sign(&message).to_bytes(),
        });
        Ok(self)
    }

    /// Decode a transaction from its wire bytes.
    pub fn decode(bytes: &[u8]) -> std::io::Result<Transaction> {
        Transaction::try_from_slice(bytes)
    }

    /// Encode this transaction into its wire bytes.
    pub fn encode(&self) -> std::io::Result<Vec<u8>> {
        self.try_to_vec()
    }

    /// The module this transaction is addressed to.
    pub fn module(&self) -> &ModuleTag {
        &self.envelope.payload.module
    }
}

/// Everything in a transaction that its signatures cover.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Envelope {
    /// Chain the transaction is intended for.
    pub chain_id: ChainID,

    /// Last height at which the transaction may be included. `None` means it never expires.
    pub expires_at: Option<BlockHeight>,

    /// Replay protection. Required by the [`ReplayCheck`](crate::chain::Stage::ReplayCheck) stage.
    pub nonce: Option<Nonce>,

    /// Optional fee, deducted by the [`Fee`](crate::chain::Stage::Fee) stage.
    pub fee: Option<Fee>,

    /// Names of the roles the transaction acts as. Checked by the [`Roles`](crate::chain::Stage::Roles)
    /// stage.
    pub roles: Vec<String>,

    pub payload: Payload,
}

impl Envelope {
    /// An envelope with no expiry, nonce, fee or roles.
    pub fn new(chain_id: ChainID, payload: Payload) -> Envelope {
        Envelope {
            chain_id,
            expires_at: None,
            nonce: None,
            fee: None,
            roles: Vec::new(),
            payload,
        }
    }

    pub fn with_nonce(mut self, sequence: u64, signers: Vec<Actor>) -> Envelope {
        self.nonce = Some(Nonce { sequence, signers });
        self
    }

    pub fn with_fee(mut self, payer: Actor, amount: Coin) -> Envelope {
        self.fee = Some(Fee { payer, amount });
        self
    }

    pub fn with_expiry(mut self, expires_at: BlockHeight) -> Envelope {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Envelope {
        self.roles.push(role.into());
        self
    }

    /// The bytes signatures on this envelope are computed over.
    pub fn sign_bytes(&self) -> std::io::Result<Vec<u8>> {
        self.try_to_vec()
    }

    /// SHA256 hash of [`sign_bytes`](Self::sign_bytes).
    pub fn hash(&self) -> std::io::Result<CryptoHash> {
        Ok(CryptoHash::digest(&self.sign_bytes()?))
    }
}

/// The module-addressed body of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Payload {
    pub module: ModuleTag,

    /// Module-defined bytes, e.g., the Borsh serialization of a [`CoinTx`](crate::modules::coin::CoinTx).
    pub body: Vec<u8>,
}

impl Payload {
    pub fn new(module: impl Into<ModuleTag>, body: Vec<u8>) -> Payload {
        Payload {
            module: module.into(),
            body,
        }
    }
}

/// Sequence number that makes each transaction from a set of signers unique.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Nonce {
    pub sequence: u64,

    /// Actors whose shared sequence number this nonce advances. Every one of them must have signed.
    pub signers: Vec<Actor>,
}

/// Fee offered by `payer`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Fee {
    pub payer: Actor,
    pub amount: Coin,
}

/// An Ed25519 signature over an [`Envelope`], together with the key that produced it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TxSignature {
    pub verifying_key: [u8; 32],
    pub signature: [u8; 64],
}

impl TxSignature {
    /// Verify this signature over `message`, returning the verifying key if it is valid.
    pub fn verify(&self, message: &[u8]) -> Result<VerifyingKey, SignatureError> {
        let verifying_key = VerifyingKey::from_bytes(&self.verifying_key)?;
        let signature = Signature::from_bytes(&self.signature);
        verifying_key.verify(message, &signature)?;
        Ok(verifying_key)
    }
}
