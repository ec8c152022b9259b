//! Block scripts and their receipts.
//!
//! A script is an ordered list of blocks, each an ordered list of
//! transactions:
//!
//! ```json
//! { "blocks": [
//!     [ { "sender": "wallet_1",
//!         "call": { "function": "award-points", "target": "wallet_1", "amount": 60 } } ],
//!     [ { "sender": "wallet_1",
//!         "call": { "function": "create-gallery", "title": "Dusk", "description": "Evening" } } ]
//! ] }
//! ```

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use frame_hive::{LedgerState, Receipt, Registry, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockScript {
    pub blocks: Vec<Vec<Transaction>>,
}

impl BlockScript {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing script {}", path.display()))
    }

    pub fn transaction_count(&self) -> usize {
        self.blocks.iter().map(Vec::len).sum()
    }

    /// Transactions whose calls may change the ledger.
    pub fn write_count(&self) -> usize {
        self.blocks
            .iter()
            .flatten()
            .filter(|tx| !tx.call.is_read_only())
            .count()
    }
}

/// Receipts of one applied block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockReceipts {
    pub height: u64,
    pub mined_at: DateTime<Utc>,
    pub receipts: Vec<Receipt>,
}

/// Apply every block of `script` in order, numbering heights from 1.
pub fn replay(registry: &mut Registry, script: &BlockScript) -> Vec<BlockReceipts> {
    info!(
        blocks = script.blocks.len(),
        transactions = script.transaction_count(),
        writes = script.write_count(),
        "Replaying script"
    );

    script
        .blocks
        .iter()
        .zip(1u64..)
        .map(|(block, height)| {
            let receipts = registry.apply_block(block);
            let failed = receipts.iter().filter(|r| !r.is_ok()).count();
            debug!(height, calls = receipts.len(), failed, "Block applied");
            BlockReceipts {
                height,
                mined_at: Utc::now(),
                receipts,
            }
        })
        .collect()
}

/// Read a ledger snapshot; a missing file means an empty ledger.
pub fn load_state(path: &Path) -> anyhow::Result<LedgerState> {
    if !path.exists() {
        info!(path = %path.display(), "No snapshot found, starting empty");
        return Ok(LedgerState::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    LedgerState::from_json(&content).with_context(|| format!("loading snapshot {}", path.display()))
}

pub fn save_state(path: &Path, state: &LedgerState) -> anyhow::Result<()> {
    let json = state.to_json().context("encoding snapshot")?;
    std::fs::write(path, json).with_context(|| format!("writing snapshot {}", path.display()))?;
    info!(path = %path.display(), "Snapshot saved");
    Ok(())
}
