//! Application services tying the domain, the profit engine and storage together.

mod members;
mod periods;
mod shop;

pub use members::{ChangeSponsorRequest, RegisterMemberRequest};
pub use periods::{CalculatePeriodRequest, MemberEarning};
pub use shop::AddToCartRequest;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use crate::domain::aggregates::{Cart, RankTable};
use crate::engine::CommissionCalculator;
use crate::events::EventPublisher;
use crate::store::NetworkStore;

pub const DEFAULT_CURRENCY: &str = "NGN";

/// Largest unit price or per-member period input accepted from callers, in whole units.
pub const MAX_AMOUNT_UNITS: i64 = 1_000_000_000_000;

pub struct NetworkService {
    store: Arc<dyn NetworkStore>,
    calculator: CommissionCalculator,
    ranks: RankTable,
    events: EventPublisher,
    /// Server-held carts keyed by session id.
    carts: RwLock<HashMap<String, Cart>>,
    /// Serializes every period write: calculate, recalculate and close.
    calculation_lock: Mutex<()>,
    /// Serializes sponsor changes so two moves cannot close a loop between them.
    sponsor_lock: Mutex<()>,
}

impl NetworkService {
    pub fn new(store: Arc<dyn NetworkStore>, events: EventPublisher) -> Self {
        Self::with_engine(store, events, CommissionCalculator::default(), RankTable::default())
    }

    pub fn with_engine(store: Arc<dyn NetworkStore>, events: EventPublisher, calculator: CommissionCalculator, ranks: RankTable) -> Self {
        Self { store, calculator, ranks, events, carts: RwLock::new(HashMap::new()), calculation_lock: Mutex::new(()), sponsor_lock: Mutex::new(()) }
    }

    pub fn calculator(&self) -> &CommissionCalculator { &self.calculator }
    pub fn rank_table(&self) -> &RankTable { &self.ranks }
}
