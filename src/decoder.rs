// File: src/decoder.rs
// Version: 2.0.0 - Layered envelope decoding for Fabric block transaction slots

use chrono::{Local, TimeZone};
use prost::Message;

use crate::error::{DecodeError, Layer};
use crate::model::{ReadEntry, WriteEntry};
use crate::protos::{
    ChaincodeAction, ChaincodeActionPayload, ChaincodeEndorsedAction, ChaincodeInvocationSpec,
    ChaincodeProposalPayload, ChaincodeSpec, ChannelHeader, Envelope, KvRwSet, Payload,
    ProposalResponsePayload, SerializedIdentity, SignatureHeader, Transaction, TxReadWriteSet,
};

/// `proposal_response_payload` value that marks an action without chaincode results.
pub const NO_RESULTS_SENTINEL: &[u8] = b"Application";

/// Lifecycle bookkeeping namespace, never reported.
pub const LIFECYCLE_NAMESPACE: &str = "_lifecycle";

/// Prefix some keys carry that does not belong to the key itself.
const UNKNOWN_KEY_HEADER: [u8; 5] = [0, 244, 143, 191, 191];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header-level layers of one transaction slot.
#[derive(Debug, Clone)]
pub struct EnvelopeLayers {
    pub channel_header: ChannelHeader,
    pub signature_header: SignatureHeader,
    pub creator: SerializedIdentity,
    /// Undecoded `Payload.data`.
    pub data: Vec<u8>,
}

/// Chaincode-level layers of an endorser transaction.
#[derive(Debug, Clone)]
pub struct ChaincodeLayers {
    pub spec: Option<ChaincodeSpec>,
    pub endorsed_action: ChaincodeEndorsedAction,
    /// `None` when the proposal response payload is the no-results sentinel.
    pub chaincode_action: Option<ChaincodeAction>,
}

pub fn decode_layer<M: Message + Default>(layer: Layer, bytes: &[u8]) -> Result<M, DecodeError> {
    M::decode(bytes).map_err(DecodeError::malformed(layer))
}

/// Envelope → Payload → ChannelHeader / SignatureHeader → SerializedIdentity.
pub fn unwrap_envelope(raw: &[u8]) -> Result<EnvelopeLayers, DecodeError> {
    let envelope: Envelope = decode_layer(Layer::Envelope, raw)?;
    let payload: Payload = decode_layer(Layer::Payload, &envelope.payload)?;
    let header = payload
        .header
        .ok_or(DecodeError::MissingField { layer: Layer::Payload, field: "header" })?;

    let channel_header: ChannelHeader = decode_layer(Layer::ChannelHeader, &header.channel_header)?;
    let signature_header: SignatureHeader = decode_layer(Layer::SignatureHeader, &header.signature_header)?;
    let creator: SerializedIdentity = decode_layer(Layer::SerializedIdentity, &signature_header.creator)?;

    Ok(EnvelopeLayers {
        channel_header,
        signature_header,
        creator,
        data: payload.data,
    })
}

/// Transaction → ChaincodeActionPayload → proposal payload / endorsed action → ChaincodeAction.
///
/// Only the first action is read; multi-action transactions are not supported.
pub fn unwrap_chaincode_transaction(data: &[u8]) -> Result<ChaincodeLayers, DecodeError> {
    let transaction: Transaction = decode_layer(Layer::Transaction, data)?;
    let first = transaction.actions.first().ok_or(DecodeError::NoActions)?;

    let action_payload: ChaincodeActionPayload = decode_layer(Layer::ChaincodeActionPayload, &first.payload)?;
    let proposal_payload: ChaincodeProposalPayload =
        decode_layer(Layer::ChaincodeProposalPayload, &action_payload.chaincode_proposal_payload)?;
    let invocation: ChaincodeInvocationSpec = decode_layer(Layer::ChaincodeInvocationSpec, &proposal_payload.input)?;

    let endorsed_action = action_payload
        .action
        .ok_or(DecodeError::MissingField { layer: Layer::ChaincodeActionPayload, field: "action" })?;

    let chaincode_action = if is_no_results_sentinel(&endorsed_action) {
        None
    } else {
        let response_payload: ProposalResponsePayload =
            decode_layer(Layer::ProposalResponsePayload, &endorsed_action.proposal_response_payload)?;
        Some(decode_layer::<ChaincodeAction>(Layer::ChaincodeAction, &response_payload.extension)?)
    };

    Ok(ChaincodeLayers {
        spec: invocation.chaincode_spec,
        endorsed_action,
        chaincode_action,
    })
}

pub fn is_no_results_sentinel(action: &ChaincodeEndorsedAction) -> bool {
    action.proposal_response_payload.as_slice() == NO_RESULTS_SENTINEL
}

/// Reads and writes of every non-lifecycle namespace in `results`, in encounter order.
pub fn collect_read_write_sets(results: &[u8]) -> Result<(Vec<ReadEntry>, Vec<WriteEntry>), DecodeError> {
    let tx_rwset: TxReadWriteSet = decode_layer(Layer::TxReadWriteSet, results)?;
    let mut reads = Vec::new();
    let mut writes = Vec::new();

    for ns in &tx_rwset.ns_rwset {
        if ns.namespace == LIFECYCLE_NAMESPACE {
            continue;
        }
        let kv: KvRwSet = decode_layer(Layer::KvRwSet, &ns.rwset)?;

        reads.extend(kv.reads.iter().map(|r| {
            let (block_num, tx_num) = r.version.as_ref().map_or((0, 0), |v| (v.block_num, v.tx_num));
            ReadEntry {
                namespace: ns.namespace.clone(),
                key: key_to_string(&r.key),
                block_num,
                tx_num,
            }
        }));
        writes.extend(kv.writes.iter().map(|w| WriteEntry {
            namespace: ns.namespace.clone(),
            key: key_to_string(&w.key),
            value: String::from_utf8_lossy(&w.value).into_owned(),
            is_delete: w.is_delete,
        }));
    }

    Ok((reads, writes))
}

/// Strip the 5-byte header some keys are written with.
pub fn trim_unknown_header(key: &[u8]) -> &[u8] {
    key.strip_prefix(&UNKNOWN_KEY_HEADER[..]).unwrap_or(key)
}

fn key_to_string(key: &[u8]) -> String {
    String::from_utf8_lossy(trim_unknown_header(key)).into_owned()
}

/// Seconds since the epoch as local wall-clock time.
pub fn format_timestamp(seconds: i64) -> Result<String, DecodeError> {
    Local
        .timestamp_opt(seconds, 0)
        .single()
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .ok_or(DecodeError::InvalidTimestamp(seconds))
}
