// 8.0 engine/core.rs: main engine. holds the charge aggregator, the settings and
// every external collaborator behind a trait object.

use chrono::NaiveDateTime;
use std::sync::Arc;

use super::config::PayoutSettings;
use super::results::EngineError;
use crate::aggregator::{BrokerChargeAggregator, ChargeBreakdown, ChargeRequest};
use crate::config::{ChargeSchedule, Settings};
use crate::settlement::SettlementWindowPolicy;
use crate::sources::{FundsSource, OrderSource, PositionSource, StaticMarketData};
use crate::store::{InMemoryPayoutStore, InMemoryQueueStore, PayoutStore, QueueStore};
use crate::types::{Clock, SystemClock};

/// Everything the engine talks to outside its own process.
#[derive(Clone)]
pub struct Collaborators {
    pub funds: Arc<dyn FundsSource>,
    pub positions: Arc<dyn PositionSource>,
    pub orders: Arc<dyn OrderSource>,
    pub store: Arc<dyn PayoutStore>,
    pub queue: Arc<dyn QueueStore>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// One static data set serves all three feeds.
    pub fn in_memory(
        data: StaticMarketData,
        store: InMemoryPayoutStore,
        queue: InMemoryQueueStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let data = Arc::new(data);
        Self {
            funds: data.clone(),
            positions: data.clone(),
            orders: data,
            store: Arc::new(store),
            queue: Arc::new(queue),
            clock,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::in_memory(
            StaticMarketData::new(),
            InMemoryPayoutStore::new(),
            InMemoryQueueStore::new(),
            Arc::new(SystemClock),
        )
    }
}

/** 8.1: main engine struct. stateless between calls; all state lives in the stores */
pub struct Engine {
    pub(super) settings: PayoutSettings,
    pub(super) aggregator: BrokerChargeAggregator,
    pub(super) funds: Arc<dyn FundsSource>,
    pub(super) positions: Arc<dyn PositionSource>,
    pub(super) orders: Arc<dyn OrderSource>,
    pub(super) store: Arc<dyn PayoutStore>,
    pub(super) queue: Arc<dyn QueueStore>,
    pub(super) clock: Arc<dyn Clock>,
}

impl Engine {
    pub fn new(settings: Settings, collaborators: Collaborators) -> Self {
        Self {
            settings: settings.payout,
            aggregator: BrokerChargeAggregator::new(Arc::new(settings.charges)),
            funds: collaborators.funds,
            positions: collaborators.positions,
            orders: collaborators.orders,
            store: collaborators.store,
            queue: collaborators.queue,
            clock: collaborators.clock,
        }
    }

    pub fn settings(&self) -> &PayoutSettings {
        &self.settings
    }

    pub fn schedule(&self) -> &ChargeSchedule {
        self.aggregator.schedule()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn compute_broker_charges(&self, request: &ChargeRequest) -> Result<ChargeBreakdown, EngineError> {
        Ok(self.aggregator.compute_charges(request)?)
    }

    pub fn combine_broker_charges(&self, requests: &[ChargeRequest]) -> Result<Vec<ChargeBreakdown>, EngineError> {
        Ok(self.aggregator.combine_broker_charges(requests)?)
    }

    /// Current value of the shared withdrawal-window flag.
    pub async fn settlement_window(&self) -> Result<SettlementWindowPolicy, EngineError> {
        Ok(SettlementWindowPolicy::load(self.queue.as_ref(), &self.settings.window_flag_key).await?)
    }
}
