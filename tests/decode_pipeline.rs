//! Block and transaction decoding against synthetic Fabric blocks.

use prost::Message;

use fabric_ledger_inspector::crypto::Sha2Suite;
use fabric_ledger_inspector::error::{DecodeError, Layer};
use fabric_ledger_inspector::protos::{
    header_type, ChaincodeAction, ChaincodeActionPayload, ChaincodeEndorsedAction, ChaincodeProposalPayload,
    ChannelHeader, Envelope, Header, KvRwSet, KvWrite, Payload, ProposalResponsePayload, SerializedIdentity,
    SignatureHeader, Transaction, TransactionAction,
};
use fabric_ledger_inspector::{assemble_transaction, decode_block};

mod common;

use common::{ChainBuilder, EndorserTx, CHANNEL, MSP_ID};

#[test]
fn test_endorser_transaction_round_trip() {
    let raw = EndorserTx::new("tx-round-trip")
        .args(&["TransferAsset", "asset7", "Bob"])
        .identity("Admin@org1.example.com", "admin")
        .namespace(
            "basic",
            vec![common::read("asset7", 3, 1), common::read("asset8", 4, 0)],
            vec![common::write("asset7", "owner=Bob"), common::delete("asset9")],
        )
        .namespace("audit", Vec::new(), vec![common::write("log1", "transfer")])
        .envelope();

    let tx = assemble_transaction(&raw).unwrap();

    assert_eq!(tx.tx_id, "tx-round-trip");
    assert_eq!(tx.tx_type, header_type::ENDORSER_TRANSACTION);
    assert_eq!(tx.channel_id, CHANNEL);
    assert_eq!(tx.created_at.len(), "YYYY-MM-DD HH:MM:SS".len());
    assert_eq!(tx.chaincode_id, "basic");
    assert_eq!(tx.chaincode_version, "1.0");
    assert_eq!(tx.args, vec!["TransferAsset", "asset7", "Bob"]);
    assert_eq!(tx.caller_msp_id, MSP_ID);
    assert_eq!(tx.caller_name, "Admin@org1.example.com");
    assert_eq!(tx.caller_ou, "admin");
    assert_eq!(tx.nonce, vec![9; 24]);
    assert_eq!(tx.response_status, Some(200));

    let reads: Vec<_> = tx.reads.iter().map(|r| (r.key.as_str(), r.block_num, r.tx_num)).collect();
    assert_eq!(reads, vec![("asset7", 3, 1), ("asset8", 4, 0)]);

    let writes: Vec<_> = tx
        .writes
        .iter()
        .map(|w| (w.namespace.as_str(), w.key.as_str(), w.value.as_str(), w.is_delete))
        .collect();
    assert_eq!(
        writes,
        vec![
            ("basic", "asset7", "owner=Bob", false),
            ("basic", "asset9", "", true),
            ("audit", "log1", "transfer", false),
        ]
    );
}

#[test]
fn test_no_results_marker_yields_empty_sets() {
    let raw = EndorserTx::new("tx-init")
        .namespace("basic", vec![common::read("ignored", 1, 1)], Vec::new())
        .without_results()
        .envelope();

    let tx = assemble_transaction(&raw).unwrap();
    assert_eq!(tx.chaincode_id, "basic");
    assert!(tx.reads.is_empty());
    assert!(tx.writes.is_empty());
    assert_eq!(tx.response_status, None);
}

#[test]
fn test_lifecycle_namespace_is_not_reported() {
    let raw = EndorserTx::new("tx-deploy")
        .namespace("_lifecycle", vec![common::read("namespaces/fields/basic", 2, 0)], vec![common::write("x", "y")])
        .namespace("basic", Vec::new(), vec![common::write("asset1", "v1")])
        .envelope();

    let tx = assemble_transaction(&raw).unwrap();
    assert!(tx.reads.is_empty());
    assert_eq!(tx.writes.len(), 1);
    assert!(tx.writes.iter().all(|w| w.namespace == "basic"));
}

#[test]
fn test_key_header_is_trimmed() {
    let mut prefixed = vec![0, 244, 143, 191, 191];
    prefixed.extend_from_slice(b"asset1");
    let mut tx = EndorserTx::new("tx-prefixed");
    tx.namespaces.push((
        "basic".to_string(),
        KvRwSet { reads: Vec::new(), writes: vec![KvWrite { key: prefixed, is_delete: false, value: b"v".to_vec() }] },
    ));

    let info = assemble_transaction(&tx.envelope()).unwrap();
    assert_eq!(info.writes[0].key, "asset1");
}

#[test]
fn test_block_transaction_count_matches_slots() {
    let suite = Sha2Suite::sha256();
    let mut chain = ChainBuilder::new(&suite);
    chain.extend(3, 2).push(Vec::new());
    let blocks = chain.blocks();

    for (number, block) in blocks.iter().enumerate() {
        let decoded = decode_block(block, &chain.hash_of(number)).unwrap();
        let slots = block.data.as_ref().unwrap().data.len();
        assert_eq!(decoded.basic.transaction_count as usize, slots);
        assert_eq!(decoded.transactions.len(), slots);
        assert_eq!(decoded.basic.number, number as u64);
        assert_eq!(decoded.basic.block_hash, hex::encode(chain.hash_of(number)));
    }

    let genesis = decode_block(&blocks[0], &chain.hash_of(0)).unwrap();
    assert_eq!(genesis.transactions[0].tx_type, header_type::CONFIG);
    assert!(genesis.basic.previous_hash.is_empty());

    let second = decode_block(&blocks[2], &chain.hash_of(2)).unwrap();
    assert_eq!(second.transactions[1].tx_id, "tx-2-1");
    assert_eq!(second.transactions[1].validation_code, Some(0));
    assert_eq!(second.basic.previous_hash, hex::encode(chain.hash_of(1)));
}

#[test]
fn test_truncated_envelope_is_rejected() {
    let raw = EndorserTx::new("tx-cut").envelope();
    // Drops the signature and the last byte of the payload
    let err = assemble_transaction(&raw[..raw.len() - 11]).unwrap_err();
    assert_eq!(err.layer(), Some(Layer::Envelope));
}

#[test]
fn test_truncated_inner_layers_are_rejected() {
    let signature_header = SignatureHeader { creator: SerializedIdentity::default().encode_to_vec(), nonce: Vec::new() };
    let channel_header = ChannelHeader {
        r#type: header_type::ENDORSER_TRANSACTION,
        timestamp: Some(prost_types::Timestamp { seconds: common::TIMESTAMP, nanos: 0 }),
        tx_id: "tx-layer".to_string(),
        ..Default::default()
    }
    .encode_to_vec();

    let wrap = |channel_header: Vec<u8>, signature_header: Vec<u8>| {
        let payload = Payload { header: Some(Header { channel_header, signature_header }), data: Vec::new() };
        Envelope { payload: payload.encode_to_vec(), signature: Vec::new() }.encode_to_vec()
    };

    let cut_channel = wrap(channel_header[..channel_header.len() - 3].to_vec(), signature_header.encode_to_vec());
    assert_eq!(assemble_transaction(&cut_channel).unwrap_err().layer(), Some(Layer::ChannelHeader));

    let mut cut_signature = signature_header.encode_to_vec();
    cut_signature.extend_from_slice(&[0x12, 0x10, 0x01]);
    let cut_signature = wrap(channel_header.clone(), cut_signature);
    assert_eq!(assemble_transaction(&cut_signature).unwrap_err().layer(), Some(Layer::SignatureHeader));

    let tx = EndorserTx::new("tx-layer");
    let data = tx.transaction_bytes();
    let creator = SerializedIdentity {
        mspid: MSP_ID.to_string(),
        id_bytes: common::creator_certificate("User1@org1.example.com", "client"),
    };
    let cut_data = common::envelope(header_type::ENDORSER_TRANSACTION, "tx-layer", creator, data[..data.len() - 3].to_vec());
    assert_eq!(assemble_transaction(&cut_data).unwrap_err().layer(), Some(Layer::Transaction));
}

/// Field 1, length 16, one byte of content.
const UNDERFLOW: &[u8] = &[0x0a, 0x10, 0x01];

fn endorser_slot(action_payload: Vec<u8>) -> Vec<u8> {
    let creator = SerializedIdentity {
        mspid: MSP_ID.to_string(),
        id_bytes: common::creator_certificate("User1@org1.example.com", "client"),
    };
    let data = Transaction { actions: vec![TransactionAction { header: Vec::new(), payload: action_payload }] };
    common::envelope(header_type::ENDORSER_TRANSACTION, "tx-layer", creator, data.encode_to_vec())
}

fn action_payload(proposal_payload: Vec<u8>, proposal_response_payload: Vec<u8>) -> Vec<u8> {
    ChaincodeActionPayload {
        chaincode_proposal_payload: proposal_payload,
        action: Some(ChaincodeEndorsedAction { proposal_response_payload, endorsements: Vec::new() }),
    }
    .encode_to_vec()
}

fn proposal_payload(input: Vec<u8>) -> Vec<u8> {
    ChaincodeProposalPayload { input, ..Default::default() }.encode_to_vec()
}

fn response_payload(results: Option<Vec<u8>>, extension: Option<Vec<u8>>) -> Vec<u8> {
    let extension = extension.unwrap_or_else(|| {
        ChaincodeAction { results: results.unwrap_or_default(), ..Default::default() }.encode_to_vec()
    });
    ProposalResponsePayload { proposal_hash: vec![1; 32], extension }.encode_to_vec()
}

#[test]
fn test_malformed_layer_is_named() {
    let bad = || UNDERFLOW.to_vec();

    let bad_creator = {
        let channel_header = ChannelHeader {
            r#type: header_type::ENDORSER_TRANSACTION,
            timestamp: Some(prost_types::Timestamp { seconds: common::TIMESTAMP, nanos: 0 }),
            ..Default::default()
        };
        let signature_header = SignatureHeader { creator: bad(), nonce: Vec::new() };
        let payload = Payload {
            header: Some(Header {
                channel_header: channel_header.encode_to_vec(),
                signature_header: signature_header.encode_to_vec(),
            }),
            data: Vec::new(),
        };
        Envelope { payload: payload.encode_to_vec(), signature: Vec::new() }.encode_to_vec()
    };

    let cases = vec![
        (Layer::Payload, Envelope { payload: bad(), signature: Vec::new() }.encode_to_vec()),
        (Layer::SerializedIdentity, bad_creator),
        (Layer::ChaincodeActionPayload, endorser_slot(bad())),
        (
            Layer::ChaincodeProposalPayload,
            endorser_slot(action_payload(bad(), response_payload(None, None))),
        ),
        (
            Layer::ChaincodeInvocationSpec,
            endorser_slot(action_payload(proposal_payload(bad()), response_payload(None, None))),
        ),
        (
            Layer::ProposalResponsePayload,
            endorser_slot(action_payload(proposal_payload(Vec::new()), bad())),
        ),
        (
            Layer::ChaincodeAction,
            endorser_slot(action_payload(proposal_payload(Vec::new()), response_payload(None, Some(bad())))),
        ),
        (
            Layer::TxReadWriteSet,
            endorser_slot(action_payload(proposal_payload(Vec::new()), response_payload(Some(bad()), None))),
        ),
    ];

    // The well-formed variant decodes, so each failure comes from the corrupted layer
    let intact = endorser_slot(action_payload(proposal_payload(Vec::new()), response_payload(None, None)));
    assert!(assemble_transaction(&intact).is_ok());

    for (layer, raw) in cases {
        match assemble_transaction(&raw) {
            Err(err @ DecodeError::Malformed { .. }) => assert_eq!(err.layer(), Some(layer), "{}", err),
            other => panic!("{}: expected a malformed layer, got {:?}", layer, other),
        }
    }
}

#[test]
fn test_bad_slot_fails_whole_block() {
    let suite = Sha2Suite::sha256();
    let mut chain = ChainBuilder::new(&suite);
    chain.extend(1, 3);
    let mut blocks = chain.blocks();

    let slots = &mut blocks[1].data.as_mut().unwrap().data;
    let len = slots[2].len();
    slots[2].truncate(len - 11);

    match decode_block(&blocks[1], &chain.hash_of(1)) {
        Err(DecodeError::InTransaction { block, index, source }) => {
            assert_eq!((block, index), (1, 2));
            assert_eq!(source.layer(), Some(Layer::Envelope));
        }
        other => panic!("expected a slot failure, got {:?}", other),
    }
}
