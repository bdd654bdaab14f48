/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Read-only queries against committed snapshots.
//!
//! Queries travel as the Borsh serialization of a [`QueryRequest`] and are answered with a
//! [`QueryResponse`]. The only supported path is [`KEY_PATH`], whose `data` is a raw app state key.
//! Requests that cannot be decoded, or that name any other path, are answered with
//! [`ErrorCode::MalformedInput`] without touching the store.
//!
//! A key that is absent at the requested height is not an error: the response has code 0, an empty
//! value, an `index` of -1, and no proof.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    errors::{ErrorCode, TxError},
    store::{KVStore, MerkleProof, VersionedStore},
    types::data_types::BlockHeight,
};

/// Path for reading a single key.
pub const KEY_PATH: &str = "/key";

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct QueryRequest {
    pub path: String,
    pub data: Vec<u8>,

    /// Height to read at. 0 means the latest committed height.
    pub height: u64,

    /// Whether to include a Merkle proof of the value.
    pub prove: bool,
}

impl QueryRequest {
    /// A request for the value of `key`.
    pub fn key(key: impl Into<Vec<u8>>, height: u64, prove: bool) -> QueryRequest {
        QueryRequest {
            path: KEY_PATH.to_string(),
            data: key.into(),
            height,
            prove,
        }
    }

    pub fn encode(&self) -> std::io::Result<Vec<u8>> {
        self.try_to_vec()
    }

    pub fn decode(bytes: &[u8]) -> std::io::Result<QueryRequest> {
        QueryRequest::try_from_slice(bytes)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct QueryResponse {
    /// [`ErrorCode`] of the query, 0 on success.
    pub code: u32,
    pub log: String,

    /// Position of `key` among the sorted live keys at `height`, or -1 if the key is absent.
    pub index: i64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,

    /// Borsh-serialized [`MerkleProof`], or empty if no proof was requested or the key is absent.
    pub proof: Vec<u8>,

    /// The height that was actually read.
    pub height: u64,
}

impl QueryResponse {
    pub fn error(err: &TxError) -> QueryResponse {
        QueryResponse {
            code: err.code().code(),
            log: err.to_string(),
            index: -1,
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == ErrorCode::Ok.code()
    }

    /// Decode [`proof`](Self::proof), if there is one.
    pub fn merkle_proof(&self) -> std::io::Result<Option<MerkleProof>> {
        if self.proof.is_empty() {
            return Ok(None);
        }
        MerkleProof::decode(&self.proof).map(Some)
    }
}

pub struct QueryEngine;

impl QueryEngine {
    /// Answer a decoded `request`. [`Node::query`](crate::node::Node::query) decodes requests and turns
    /// the error returned here into a response.
    pub fn handle<K: KVStore>(
        store: &VersionedStore<K>,
        request: &QueryRequest,
    ) -> Result<QueryResponse, TxError> {
        if request.path != KEY_PATH {
            return Err(TxError::MalformedInput(format!(
                "unsupported query path {:?}",
                request.path
            )));
        }

        let result = store.query(&request.data, BlockHeight::new(request.height), request.prove)?;
        let proof = match &result.proof {
            Some(proof) => proof
                .encode()
                .map_err(|err| TxError::InternalFault(err.to_string()))?,
            None => Vec::new(),
        };

        Ok(QueryResponse {
            code: ErrorCode::Ok.code(),
            log: String::new(),
            index: result.index.map_or(-1, |index| index as i64),
            key: result.key,
            value: result.value.unwrap_or_default(),
            proof,
            height: result.height.int(),
        })
    }
}
