// File: src/transaction.rs
// Version: 1.0.0 - Flatten one transaction slot into a TransactionInfo

use crate::decoder::{collect_read_write_sets, format_timestamp, unwrap_chaincode_transaction, unwrap_envelope};
use crate::error::{DecodeError, Layer};
use crate::identity::{extract_identity, CallerIdentity};
use crate::model::TransactionInfo;
use crate::protos::header_type;

/// Decode a raw transaction slot. All-or-nothing: any layer failure is returned.
pub fn assemble_transaction(raw: &[u8]) -> Result<TransactionInfo, DecodeError> {
    let layers = unwrap_envelope(raw)?;
    let channel_header = &layers.channel_header;

    let seconds = channel_header
        .timestamp
        .as_ref()
        .map(|ts| ts.seconds)
        .ok_or(DecodeError::MissingField { layer: Layer::ChannelHeader, field: "timestamp" })?;
    let created_at = format_timestamp(seconds)?;

    let is_config = channel_header.r#type == header_type::CONFIG;

    // Genesis and config blocks may be written without a creator certificate.
    let caller = if is_config && layers.creator.id_bytes.is_empty() {
        CallerIdentity { common_name: String::new(), organizational_unit: String::new() }
    } else {
        extract_identity(&layers.creator.id_bytes)?
    };

    let mut info = TransactionInfo {
        tx_id: channel_header.tx_id.clone(),
        tx_type: channel_header.r#type,
        channel_id: channel_header.channel_id.clone(),
        created_at,
        chaincode_id: String::new(),
        chaincode_version: String::new(),
        args: Vec::new(),
        caller_msp_id: layers.creator.mspid.clone(),
        caller_name: caller.common_name,
        caller_ou: caller.organizational_unit,
        nonce: layers.signature_header.nonce.clone(),
        reads: Vec::new(),
        writes: Vec::new(),
        response_status: None,
        response_message: None,
        validation_code: None,
    };

    if is_config {
        tracing::debug!(tx_id = %info.tx_id, "config transaction, no chaincode layers");
        return Ok(info);
    }

    let chaincode = unwrap_chaincode_transaction(&layers.data)?;

    if let Some(spec) = &chaincode.spec {
        if let Some(id) = &spec.chaincode_id {
            info.chaincode_id = id.name.clone();
            info.chaincode_version = id.version.clone();
        }
        if let Some(input) = &spec.input {
            info.args = input
                .args
                .iter()
                .map(|arg| String::from_utf8_lossy(arg).into_owned())
                .collect();
        }
    }

    if let Some(action) = &chaincode.chaincode_action {
        let (reads, writes) = collect_read_write_sets(&action.results)?;
        info.reads = reads;
        info.writes = writes;
        if let Some(response) = &action.response {
            info.response_status = Some(response.status);
            info.response_message = Some(response.message.clone());
        }
    }

    tracing::debug!(
        tx_id = %info.tx_id,
        chaincode = %info.chaincode_id,
        reads = info.reads.len(),
        writes = info.writes.len(),
        "transaction decoded"
    );

    Ok(info)
}
