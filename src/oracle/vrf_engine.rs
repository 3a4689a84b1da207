use crate::common::traits::{RandomnessOracle, RandomnessRequest};
use crate::common::types::{AccountId, RandomWord, RequestId};
use crate::errors::CollaboratorError;
use dashmap::DashMap;
use schnorrkel::context::SigningContext;
use schnorrkel::{Keypair, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

const VRF_SIGNING_CONTEXT: &[u8] = b"vrf-wager";

#[derive(Debug, thiserror::Error)]
pub enum VrfError {
    #[error("Invalid hex in {field}: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

/// Everything needed to re-check a delivered random word
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfProof {
    pub vrf_output: String,
    pub vrf_proof: String,
    pub public_key: String,
    pub input_message: String,
}

/// Random words for one request plus their proof
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VrfFulfillment {
    pub request_id: RequestId,
    pub requester: AccountId,
    pub random_words: Vec<RandomWord>,
    pub proof: VrfProof,
}

/// Message signed for a request; binds the word to requester and id
pub fn input_message(requester: &AccountId, request_id: RequestId) -> String {
    format!("{}:{}", requester, request_id)
}

/// Randomness oracle backed by schnorrkel signatures.
///
/// The random word for a request is the SHA-256 of the oracle's signature
/// over the request's input message, so anyone holding the public key can
/// check it.
pub struct VrfRandomnessOracle {
    id: AccountId,
    keypair: Arc<Keypair>,
    next_id: AtomicU64,
    outstanding: DashMap<RequestId, RandomnessRequest>,
    notifier: Option<mpsc::UnboundedSender<RequestId>>,
}

impl VrfRandomnessOracle {
    pub fn new(id: impl Into<AccountId>, keypair: Keypair) -> Self {
        Self {
            id: id.into(),
            keypair: Arc::new(keypair),
            next_id: AtomicU64::new(1),
            outstanding: DashMap::new(),
            notifier: None,
        }
    }

    /// Oracle with a freshly generated keypair
    pub fn new_random(id: impl Into<AccountId>) -> Self {
        use rand_core::OsRng;
        let keypair = Keypair::generate_with(OsRng);
        Self::new(id, keypair)
    }

    /// Announce every accepted request id on `notifier`
    pub fn with_notifier(mut self, notifier: mpsc::UnboundedSender<RequestId>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.keypair.public.to_bytes())
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.len()
    }

    /// Produce the random word for an outstanding request, consuming it
    pub fn fulfill(&self, request_id: RequestId) -> Result<VrfFulfillment, CollaboratorError> {
        let (_, request) = self.outstanding.remove(&request_id).ok_or_else(|| {
            CollaboratorError::OracleUnavailable(format!("no outstanding request {}", request_id))
        })?;

        let message = input_message(&request.requester, request_id);
        let (vrf_output, signature) = self.vrf_sign(message.as_bytes());

        let random_words = vec![RandomWord::from_be_bytes(vrf_output)];
        tracing::debug!("VRF fulfilled request {} for {}", request_id, request.requester);

        Ok(VrfFulfillment {
            request_id,
            requester: request.requester,
            random_words,
            proof: VrfProof {
                vrf_output: hex::encode(vrf_output),
                vrf_proof: hex::encode(signature),
                public_key: self.public_key_hex(),
                input_message: message,
            },
        })
    }

    fn vrf_sign(&self, message: &[u8]) -> ([u8; 32], [u8; 64]) {
        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        let signature = self.keypair.sign(ctx.bytes(message)).to_bytes();
        let output: [u8; 32] = Sha256::digest(signature).into();
        (output, signature)
    }

    /// Check that `proof` signs `expected_input` and that its output is the
    /// hash of that signature
    pub fn verify_proof(proof: &VrfProof, expected_input: &str) -> Result<bool, VrfError> {
        if proof.input_message != expected_input {
            return Ok(false);
        }

        let vrf_output = hex::decode(&proof.vrf_output).map_err(|e| VrfError::InvalidHex {
            field: "vrf_output",
            reason: e.to_string(),
        })?;
        let vrf_proof = hex::decode(&proof.vrf_proof).map_err(|e| VrfError::InvalidHex {
            field: "vrf_proof",
            reason: e.to_string(),
        })?;
        let public_key_bytes = hex::decode(&proof.public_key).map_err(|e| VrfError::InvalidHex {
            field: "public_key",
            reason: e.to_string(),
        })?;

        let public_key = PublicKey::from_bytes(&public_key_bytes)
            .map_err(|e| VrfError::InvalidPublicKey(format!("{:?}", e)))?;
        let signature = Signature::from_bytes(&vrf_proof)
            .map_err(|e| VrfError::InvalidSignature(format!("{:?}", e)))?;

        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        if public_key
            .verify(ctx.bytes(expected_input.as_bytes()), &signature)
            .is_err()
        {
            return Ok(false);
        }

        let computed = Sha256::digest(&vrf_proof);
        Ok(computed.as_slice() == vrf_output.as_slice())
    }

    /// Verify a fulfillment end to end: proof, input binding and delivered word
    pub fn verify(fulfillment: &VrfFulfillment) -> Result<bool, VrfError> {
        let expected_input = input_message(&fulfillment.requester, fulfillment.request_id);
        if !Self::verify_proof(&fulfillment.proof, &expected_input)? {
            return Ok(false);
        }
        Ok(match fulfillment.random_words.as_slice() {
            [word] => word.to_hex() == fulfillment.proof.vrf_output,
            _ => false,
        })
    }
}

impl RandomnessOracle for VrfRandomnessOracle {
    fn id(&self) -> AccountId {
        self.id.clone()
    }

    fn request(&self, request: &RandomnessRequest) -> Result<RequestId, CollaboratorError> {
        if request.num_words != 1 {
            return Err(CollaboratorError::OracleUnavailable(format!(
                "only single-word requests are served, got {}",
                request.num_words
            )));
        }
        let request_id = RequestId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.outstanding.insert(request_id, request.clone());

        if let Some(notifier) = &self.notifier {
            if notifier.send(request_id).is_err() {
                tracing::warn!("Fulfillment driver gone; request {} must be fulfilled manually", request_id);
            }
        }
        Ok(request_id)
    }
}
