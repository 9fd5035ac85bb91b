//! Matching M-Pesa transactions to open orders.
//!
//! Every open order is ranked against a transaction using the first rule it satisfies, strongest first:
//!
//! 1. [`MatchTier::Reference`]: the account reference the customer typed equals the order number.
//! 2. [`MatchTier::AmountAndPhone`]: the amount settles the balance and it was sent from the client's phone.
//! 3. [`MatchTier::AmountOnly`]: the amount settles the balance.
//! 4. [`MatchTier::PhoneOnly`]: it was sent from the client's phone, but the amount differs from the balance.
//!
//! Only the orders in the best tier found are candidates. A single candidate in tiers 1 to 3 is connected
//! automatically. Several candidates, or any phone-only match, are left for an administrator to pick from.
//!
//! M-Pesa only moves whole shillings, so an amount "settles" a balance when it equals the balance, or the balance
//! rounded up to the next shilling.
use serde::{Deserialize, Serialize};

use crate::db_types::{Money, MpesaTransaction, Order};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Reference,
    AmountAndPhone,
    AmountOnly,
    PhoneOnly,
}

impl MatchTier {
    pub fn allows_auto_connect(&self) -> bool {
        !matches!(self, MatchTier::PhoneOnly)
    }
}

/// What to do with a transaction after ranking the open orders against it.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchDecision<'a> {
    /// Exactly one strong candidate
    Connect(&'a Order, MatchTier),
    /// More than one candidate in the best tier
    Ambiguous(MatchTier, Vec<&'a Order>),
    /// Candidates exist, but the evidence is too weak to connect without a human
    Review(MatchTier, Vec<&'a Order>),
    NoMatch,
}

pub fn amount_settles(amount: Money, balance: Money) -> bool {
    balance.is_positive() && (amount == balance || amount == Money::from_shillings(balance.ceil_shillings()))
}

/// Account references are typed by hand on a phone. Ignore case and punctuation when comparing them.
pub fn normalize_reference(reference: &str) -> String {
    reference.chars().filter(|c| c.is_ascii_alphanumeric()).map(|c| c.to_ascii_uppercase()).collect()
}

/// The strongest rule under which `order` matches `tx`, if any. Orders that cannot take payments never match.
pub fn match_tier(tx: &MpesaTransaction, order: &Order) -> Option<MatchTier> {
    if !order.is_payable() {
        return None;
    }
    let reference_matches = tx
        .account_reference
        .as_deref()
        .map(normalize_reference)
        .filter(|r| !r.is_empty())
        .map(|r| r == normalize_reference(&order.order_number))
        .unwrap_or(false);
    let phone_matches = tx.phone.as_ref().map(|p| p == &order.client_phone).unwrap_or(false);
    let amount_matches = amount_settles(tx.amount, order.balance());
    match (reference_matches, amount_matches, phone_matches) {
        (true, _, _) => Some(MatchTier::Reference),
        (false, true, true) => Some(MatchTier::AmountAndPhone),
        (false, true, false) => Some(MatchTier::AmountOnly),
        (false, false, true) => Some(MatchTier::PhoneOnly),
        (false, false, false) => None,
    }
}

/// Ranks `orders` against `tx`, returning the orders in the best tier found, oldest first.
pub fn best_candidates<'a>(tx: &MpesaTransaction, orders: &'a [Order]) -> Option<(MatchTier, Vec<&'a Order>)> {
    let ranked = orders.iter().filter_map(|o| match_tier(tx, o).map(|t| (t, o))).collect::<Vec<_>>();
    let best = ranked.iter().map(|(t, _)| *t).min()?;
    let mut candidates = ranked.into_iter().filter(|(t, _)| *t == best).map(|(_, o)| o).collect::<Vec<_>>();
    candidates.sort_by_key(|o| (o.created_at, o.id));
    Some((best, candidates))
}

pub fn decide<'a>(tx: &MpesaTransaction, orders: &'a [Order]) -> MatchDecision<'a> {
    match best_candidates(tx, orders) {
        None => MatchDecision::NoMatch,
        Some((tier, candidates)) if !tier.allows_auto_connect() => MatchDecision::Review(tier, candidates),
        Some((tier, candidates)) if candidates.len() == 1 => MatchDecision::Connect(candidates[0], tier),
        Some((tier, candidates)) => MatchDecision::Ambiguous(tier, candidates),
    }
}

/// The reverse lookup: unmatched transactions that could belong to `order`, best first.
pub fn rank_transactions<'a>(order: &Order, txs: &'a [MpesaTransaction]) -> Vec<(&'a MpesaTransaction, MatchTier)> {
    let mut ranked = txs.iter().filter_map(|tx| match_tier(tx, order).map(|t| (tx, t))).collect::<Vec<_>>();
    ranked.sort_by_key(|(tx, t)| (*t, tx.transaction_time, tx.id));
    ranked
}
