//! Trade book
//!
//! Tracks pending proposals and active trades. Each move between collections
//! is a single remove-by-id, so concurrent callers never both win the same id.

use dashmap::DashMap;
use tracing::{debug, info};

use crate::strategy::{ProposalStatus, TradeProposal};

/// Pending proposals and active trades keyed by proposal id
#[derive(Debug, Default)]
pub struct TradeBook {
    pending: DashMap<String, TradeProposal>,
    active: DashMap<String, TradeProposal>,
}

impl TradeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly generated proposal
    pub fn insert_pending(&self, proposal: TradeProposal) {
        debug!(id = %proposal.id, "Proposal queued");
        self.pending.insert(proposal.id.clone(), proposal);
    }

    /// Move a pending proposal into active trades, marked executed
    pub fn approve(&self, id: &str) -> Option<TradeProposal> {
        let (_, mut proposal) = self.pending.remove(id)?;
        proposal.status = ProposalStatus::Executed;
        self.active.insert(proposal.id.clone(), proposal.clone());
        info!(id = %id, ticker = %proposal.ticker, "Proposal approved");
        Some(proposal)
    }

    /// Drop a pending proposal, returning it marked rejected
    pub fn discard(&self, id: &str) -> Option<TradeProposal> {
        let (_, mut proposal) = self.pending.remove(id)?;
        proposal.status = ProposalStatus::Rejected;
        Some(proposal)
    }

    /// Remove an active trade for closing
    pub fn take_active(&self, id: &str) -> Option<TradeProposal> {
        self.active.remove(id).map(|(_, proposal)| proposal)
    }

    pub fn get_pending(&self, id: &str) -> Option<TradeProposal> {
        self.pending.get(id).map(|p| p.clone())
    }

    pub fn get_active(&self, id: &str) -> Option<TradeProposal> {
        self.active.get(id).map(|p| p.clone())
    }

    /// All pending proposals, oldest first
    pub fn pending(&self) -> Vec<TradeProposal> {
        let mut proposals: Vec<_> = self.pending.iter().map(|e| e.value().clone()).collect();
        proposals.sort_by_key(|p| p.created_at);
        proposals
    }

    /// All active trades, oldest first
    pub fn active(&self) -> Vec<TradeProposal> {
        let mut trades: Vec<_> = self.active.iter().map(|e| e.value().clone()).collect();
        trades.sort_by_key(|p| p.created_at);
        trades
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
