//! Synthetic Fabric chain fixtures shared by the integration tests.

#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::x509::{X509, X509Name};
use prost::Message;

use fabric_ledger_inspector::crypto::{block_data_hash, block_header_hash, CryptoSuite};
use fabric_ledger_inspector::decoder::NO_RESULTS_SENTINEL;
use fabric_ledger_inspector::protos::{
    header_type, Block, BlockData, BlockHeader, BlockMetadata, ChaincodeAction, ChaincodeActionPayload,
    ChaincodeEndorsedAction, ChaincodeId, ChaincodeInput, ChaincodeInvocationSpec, ChaincodeProposalPayload,
    ChaincodeSpec, ChannelHeader, Envelope, Header, KvRead, KvRwSet, KvWrite, NsReadWriteSet, Payload,
    ProposalResponsePayload, Response, SerializedIdentity, SignatureHeader, Transaction, TransactionAction,
    TxReadWriteSet, Version,
};

pub const CHANNEL: &str = "mychannel";
pub const MSP_ID: &str = "Org1MSP";
pub const TIMESTAMP: i64 = 1_700_000_000;

/// Self-signed P-256 creator certificate in PEM form.
pub fn creator_certificate(cn: &str, ou: &str) -> Vec<u8> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut name = X509Name::builder().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, cn).unwrap();
    name.append_entry_by_nid(Nid::ORGANIZATIONNAME, "org1.example.com").unwrap();
    name.append_entry_by_nid(Nid::ORGANIZATIONALUNITNAME, ou).unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(30).unwrap()).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    builder.build().to_pem().unwrap()
}

pub fn read(key: &str, block_num: u64, tx_num: u64) -> KvRead {
    KvRead { key: key.as_bytes().to_vec(), version: Some(Version { block_num, tx_num }) }
}

pub fn write(key: &str, value: &str) -> KvWrite {
    KvWrite { key: key.as_bytes().to_vec(), is_delete: false, value: value.as_bytes().to_vec() }
}

pub fn delete(key: &str) -> KvWrite {
    KvWrite { key: key.as_bytes().to_vec(), is_delete: true, value: Vec::new() }
}

/// Description of one endorser transaction slot.
#[derive(Debug, Clone)]
pub struct EndorserTx {
    pub tx_id: String,
    pub chaincode: String,
    pub version: String,
    pub args: Vec<String>,
    pub cn: String,
    pub ou: String,
    pub namespaces: Vec<(String, KvRwSet)>,
    /// Write `Application` as the proposal response payload.
    pub no_results: bool,
}

impl EndorserTx {
    pub fn new(tx_id: &str) -> Self {
        Self {
            tx_id: tx_id.to_string(),
            chaincode: "basic".to_string(),
            version: "1.0".to_string(),
            args: vec!["CreateAsset".to_string(), "asset1".to_string()],
            cn: "User1@org1.example.com".to_string(),
            ou: "client".to_string(),
            namespaces: Vec::new(),
            no_results: false,
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn identity(mut self, cn: &str, ou: &str) -> Self {
        self.cn = cn.to_string();
        self.ou = ou.to_string();
        self
    }

    pub fn namespace(mut self, namespace: &str, reads: Vec<KvRead>, writes: Vec<KvWrite>) -> Self {
        self.namespaces.push((namespace.to_string(), KvRwSet { reads, writes }));
        self
    }

    pub fn without_results(mut self) -> Self {
        self.no_results = true;
        self
    }

    /// `Transaction` bytes carried in `Payload.data`.
    pub fn transaction_bytes(&self) -> Vec<u8> {
        let spec = ChaincodeSpec {
            r#type: 1,
            chaincode_id: Some(ChaincodeId { name: self.chaincode.clone(), version: self.version.clone(), ..Default::default() }),
            input: Some(ChaincodeInput {
                args: self.args.iter().map(|a| a.as_bytes().to_vec()).collect(),
                ..Default::default()
            }),
            timeout: 0,
        };
        let proposal_payload = ChaincodeProposalPayload {
            input: ChaincodeInvocationSpec { chaincode_spec: Some(spec) }.encode_to_vec(),
            ..Default::default()
        };

        let proposal_response_payload = if self.no_results {
            NO_RESULTS_SENTINEL.to_vec()
        } else {
            let results = TxReadWriteSet {
                data_model: 0,
                ns_rwset: self
                    .namespaces
                    .iter()
                    .map(|(namespace, kv)| NsReadWriteSet { namespace: namespace.clone(), rwset: kv.encode_to_vec() })
                    .collect(),
            };
            let action = ChaincodeAction {
                results: results.encode_to_vec(),
                response: Some(Response { status: 200, message: "OK".to_string(), payload: Vec::new() }),
                ..Default::default()
            };
            ProposalResponsePayload { proposal_hash: vec![1; 32], extension: action.encode_to_vec() }.encode_to_vec()
        };

        let action_payload = ChaincodeActionPayload {
            chaincode_proposal_payload: proposal_payload.encode_to_vec(),
            action: Some(ChaincodeEndorsedAction { proposal_response_payload, endorsements: Vec::new() }),
        };

        Transaction {
            actions: vec![TransactionAction { header: Vec::new(), payload: action_payload.encode_to_vec() }],
        }
        .encode_to_vec()
    }

    /// Complete envelope for a block data slot.
    pub fn envelope(&self) -> Vec<u8> {
        let creator = SerializedIdentity { mspid: MSP_ID.to_string(), id_bytes: creator_certificate(&self.cn, &self.ou) };
        envelope(header_type::ENDORSER_TRANSACTION, &self.tx_id, creator, self.transaction_bytes())
    }
}

/// Envelope bytes with the given header type, creator and payload data.
pub fn envelope(tx_type: i32, tx_id: &str, creator: SerializedIdentity, data: Vec<u8>) -> Vec<u8> {
    let channel_header = ChannelHeader {
        r#type: tx_type,
        timestamp: Some(prost_types::Timestamp { seconds: TIMESTAMP, nanos: 0 }),
        channel_id: CHANNEL.to_string(),
        tx_id: tx_id.to_string(),
        ..Default::default()
    };
    let signature_header = SignatureHeader { creator: creator.encode_to_vec(), nonce: vec![9; 24] };
    let payload = Payload {
        header: Some(Header {
            channel_header: channel_header.encode_to_vec(),
            signature_header: signature_header.encode_to_vec(),
        }),
        data,
    };
    Envelope { payload: payload.encode_to_vec(), signature: vec![0; 8] }.encode_to_vec()
}

/// Genesis-style config envelope without a creator certificate.
pub fn config_envelope() -> Vec<u8> {
    envelope(header_type::CONFIG, "", SerializedIdentity::default(), vec![0x0a, 0x00])
}

/// Builds a hash-linked chain, starting at a config genesis block.
pub struct ChainBuilder<'a> {
    suite: &'a dyn CryptoSuite,
    blocks: Vec<Block>,
    previous: Vec<u8>,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(suite: &'a dyn CryptoSuite) -> Self {
        let mut builder = Self { suite, blocks: Vec::new(), previous: Vec::new() };
        builder.push(vec![config_envelope()]);
        builder
    }

    /// Append a block holding `slots`, every one marked valid.
    pub fn push(&mut self, slots: Vec<Vec<u8>>) -> &mut Self {
        let data = BlockData { data: slots };
        let header = BlockHeader {
            number: self.blocks.len() as u64,
            previous_hash: self.previous.clone(),
            data_hash: block_data_hash(self.suite, &data),
        };
        let filter = vec![0u8; data.data.len()];
        let metadata = BlockMetadata { metadata: vec![Vec::new(), Vec::new(), filter, Vec::new(), Vec::new()] };

        self.previous = block_header_hash(self.suite, &header);
        self.blocks.push(Block { header: Some(header), data: Some(data), metadata: Some(metadata) });
        self
    }

    /// Append `count` blocks of `per_block` transactions with ids `tx-<block>-<slot>`.
    pub fn extend(&mut self, count: usize, per_block: usize) -> &mut Self {
        for _ in 0..count {
            let number = self.blocks.len();
            let slots = (0..per_block)
                .map(|slot| {
                    EndorserTx::new(&format!("tx-{}-{}", number, slot))
                        .namespace("basic", vec![read("asset1", 1, 0)], vec![write("asset1", &format!("v{}", number))])
                        .envelope()
                })
                .collect();
            self.push(slots);
        }
        self
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.clone()
    }

    /// Header hash of block `number`.
    pub fn hash_of(&self, number: usize) -> Vec<u8> {
        let header = self.blocks[number].header.as_ref().unwrap();
        block_header_hash(self.suite, header)
    }
}
