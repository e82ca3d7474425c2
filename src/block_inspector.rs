// File: src/block_inspector.rs
// Version: 2.0.0 - Layer-by-layer block structure investigation and debugging tools
//
// Walks one block through every wire layer the decoder touches and reports
// what it finds at each step, so a block that fails to decode can be located
// down to the exact slot and layer.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use fabric_ledger_inspector::browser::LedgerQuery;
use fabric_ledger_inspector::crypto::{block_data_hash, block_header_hash, CertPublicKey, CryptoSuite};
use fabric_ledger_inspector::decoder::{
    decode_layer, is_no_results_sentinel, unwrap_chaincode_transaction, unwrap_envelope, LIFECYCLE_NAMESPACE,
};
use fabric_ledger_inspector::error::Layer;
use fabric_ledger_inspector::identity::{identity_from_certificate, parse_certificate};
use fabric_ledger_inspector::ledger_store::{is_block_file, FileLedger};
use fabric_ledger_inspector::protos::{header_type, metadata_index, Block, TxReadWriteSet};

/// Check the ledger directory and list the block files it holds
pub fn check_ledger_availability(path: &Path) -> Result<()> {
    println!("📋 Ledger Availability Check:");
    println!("Path: {:?}", path);
    println!("{}", "-".repeat(70));

    let mut files: Vec<_> = fs::read_dir(path)
        .with_context(|| format!("cannot read ledger directory {}", path.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    files.sort();

    let mut block_files = 0;
    for file in &files {
        let name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if is_block_file(file) {
            let size = fs::metadata(file).map(|m| m.len()).unwrap_or(0);
            println!("  ✅ {:30} - {} bytes", name, size);
            block_files += 1;
        } else {
            println!("  ❌ {:30} - Not a block file", name);
        }
    }

    println!("{}", "-".repeat(70));
    println!("📊 Summary: {}/{} entries are block files", block_files, files.len());

    if block_files == 0 {
        anyhow::bail!("No block files found. Check ledger path.");
    }
    Ok(())
}

/// Dump the structure of one block, layer by layer
pub fn inspect_block(ledger: &FileLedger, suite: &dyn CryptoSuite, number: u64) -> Result<()> {
    let block = ledger.query_block_by_number(number)?;

    println!("\n🔍 Block Structure Investigation for Block {}", number);
    println!("{}", "=".repeat(70));

    inspect_header(ledger, suite, &block, number)?;
    inspect_metadata(&block);

    let Some(data) = block.data.as_ref() else {
        println!("❌ Block has no data section");
        return Ok(());
    };

    println!("\n📊 Transaction slots: {}", data.data.len());
    for (index, raw) in data.data.iter().enumerate() {
        println!("\n--- Slot {} ({} bytes) ---", index, raw.len());
        inspect_slot(suite, raw);
    }
    Ok(())
}

/// Inspect every block in the ledger, continuing past failures
pub fn inspect_all_blocks(ledger: &FileLedger, suite: &dyn CryptoSuite) -> Result<()> {
    let height = ledger.query_chain_info()?.height;
    println!("🔍 Inspecting {} blocks", height);

    for number in 0..height {
        match inspect_block(ledger, suite, number) {
            Ok(()) => println!("✅ Block {} investigation completed", number),
            Err(e) => println!("❌ Error investigating block {}: {}", number, e),
        }
        println!("{}", "-".repeat(70));
    }
    Ok(())
}

fn inspect_header(ledger: &FileLedger, suite: &dyn CryptoSuite, block: &Block, number: u64) -> Result<()> {
    let header = block.header.as_ref().context("block has no header")?;
    let computed = block_header_hash(suite, header);

    println!("📋 Header:");
    println!("  Number:        {}", header.number);
    println!("  Previous hash: {}", hex::encode(&header.previous_hash));
    println!("  Data hash:     {}", hex::encode(&header.data_hash));
    println!("  Header hash:   {} ({})", hex::encode(&computed), suite.name());

    if header.number != number {
        println!("  ⚠️  Header number differs from requested number {}", number);
    }

    // The next block's previous hash must point back at this header
    match ledger.query_block_by_number(number + 1) {
        Ok(next) => {
            let link = next.header.map(|h| h.previous_hash).unwrap_or_default();
            if link == computed {
                println!("  ✅ Block {} links back to this header", number + 1);
            } else {
                println!("  ❌ Block {} previous hash {} does not match", number + 1, hex::encode(&link));
            }
        }
        Err(_) => println!("  ℹ️  No block {} to check the link against", number + 1),
    }

    if let Some(data) = block.data.as_ref() {
        if block_data_hash(suite, data) == header.data_hash {
            println!("  ✅ Data hash matches transaction slots");
        } else {
            println!("  ❌ Data hash does not match transaction slots");
        }
    }
    Ok(())
}

fn inspect_metadata(block: &Block) {
    let Some(metadata) = block.metadata.as_ref() else {
        println!("\n📋 Metadata: none");
        return;
    };

    println!("\n📋 Metadata entries:");
    let names = [
        (metadata_index::SIGNATURES, "SIGNATURES"),
        (metadata_index::LAST_CONFIG, "LAST_CONFIG"),
        (metadata_index::TRANSACTIONS_FILTER, "TRANSACTIONS_FILTER"),
        (metadata_index::COMMIT_HASH, "COMMIT_HASH"),
    ];
    for (i, entry) in metadata.metadata.iter().enumerate() {
        let name = names.iter().find(|(idx, _)| *idx == i).map_or("UNKNOWN", |(_, n)| n);
        let preview = hex::encode(&entry[..entry.len().min(16)]);
        println!("  [{}] {:20} {:>6} bytes  {}", i, name, entry.len(), preview);
    }
}

fn inspect_slot(suite: &dyn CryptoSuite, raw: &[u8]) {
    let envelope = match unwrap_envelope(raw) {
        Ok(layers) => layers,
        Err(e) => {
            println!("  ❌ Envelope layers: {}", e);
            return;
        }
    };

    let ch = &envelope.channel_header;
    println!("  ✅ {} / {} / {}", Layer::Envelope, Layer::Payload, Layer::ChannelHeader);
    println!("     Type: {}  Channel: {}  TxID: {}", ch.r#type, ch.channel_id, ch.tx_id);
    println!("  ✅ {}: nonce {} bytes", Layer::SignatureHeader, envelope.signature_header.nonce.len());
    println!(
        "  ✅ {}: mspid {:?}, {} identity bytes",
        Layer::SerializedIdentity,
        envelope.creator.mspid,
        envelope.creator.id_bytes.len()
    );

    if !envelope.creator.id_bytes.is_empty() {
        inspect_creator(suite, &envelope.creator.id_bytes);
    }

    if ch.r#type == header_type::CONFIG {
        println!("  ℹ️  Config transaction, chaincode layers not present");
        return;
    }

    let chaincode = match unwrap_chaincode_transaction(&envelope.data) {
        Ok(layers) => layers,
        Err(e) => {
            println!("  ❌ Chaincode layers: {}", e);
            return;
        }
    };

    if let Some(id) = chaincode.spec.as_ref().and_then(|s| s.chaincode_id.as_ref()) {
        println!("  ✅ {}: {} {}", Layer::ChaincodeInvocationSpec, id.name, id.version);
    }
    println!("  📊 Endorsements: {}", chaincode.endorsed_action.endorsements.len());

    if is_no_results_sentinel(&chaincode.endorsed_action) {
        println!("  ℹ️  Proposal response payload is the no-results marker");
        return;
    }

    let Some(action) = chaincode.chaincode_action else {
        return;
    };
    match decode_layer::<TxReadWriteSet>(Layer::TxReadWriteSet, &action.results) {
        Ok(rwset) => {
            for ns in &rwset.ns_rwset {
                let skipped = if ns.namespace == LIFECYCLE_NAMESPACE { " (skipped)" } else { "" };
                println!("  📦 Namespace {:20} {:>6} bytes{}", ns.namespace, ns.rwset.len(), skipped);
            }
        }
        Err(e) => println!("  ❌ Read/write sets: {}", e),
    }
}

fn inspect_creator(suite: &dyn CryptoSuite, id_bytes: &[u8]) {
    let cert = match parse_certificate(id_bytes) {
        Ok(cert) => cert,
        Err(e) => {
            println!("  ❌ Creator certificate: {}", e);
            return;
        }
    };

    match identity_from_certificate(&cert) {
        Ok(identity) => println!("     CN: {:?}  OU: {:?}", identity.common_name, identity.organizational_unit),
        Err(e) => println!("     ⚠️  Subject: {}", e),
    }

    match CertPublicKey::from_certificate(&cert) {
        Ok(key) => match key.subject_key_identifier(suite) {
            Ok(ski) => println!("     Key: {}  SKI: {}", key.algorithm(), hex::encode(ski)),
            Err(e) => println!("     Key: {}  SKI unavailable: {}", key.algorithm(), e),
        },
        Err(e) => println!("     ❌ Key import: {}", e),
    }
}
