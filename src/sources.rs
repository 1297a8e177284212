//! Upstream data sources the payout decision is built from.
//!
//! Each source is a trait so the back-office clients can be swapped for the
//! in-memory [`StaticMarketData`] in tests and the simulation.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::funds::FundsRow;
use crate::order::CompletedOrder;
use crate::position::Position;
use crate::types::ClientId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("upstream payload malformed: {0}")]
    Malformed(String),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

/// Funds feed, all rows.
#[async_trait]
pub trait FundsSource: Send + Sync {
    async fn fetch_funds(&self, client_id: &ClientId) -> Result<Vec<FundsRow>, UpstreamError>;
}

/// Historical (day) positions.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn historical_positions(&self, client_id: &ClientId) -> Result<Vec<Position>, UpstreamError>;
}

/// Order book filtered to completed orders.
#[async_trait]
pub trait OrderSource: Send + Sync {
    async fn completed_orders(&self, client_id: &ClientId) -> Result<Vec<CompletedOrder>, UpstreamError>;
}

/// In-memory stand-in for all three feeds.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    funds: HashMap<ClientId, Vec<FundsRow>>,
    positions: HashMap<ClientId, Vec<Position>>,
    orders: HashMap<ClientId, Vec<CompletedOrder>>,
    funds_failure: Option<UpstreamError>,
    positions_failure: Option<UpstreamError>,
    orders_failure: Option<UpstreamError>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_funds(mut self, client_id: ClientId, rows: Vec<FundsRow>) -> Self {
        self.funds.insert(client_id, rows);
        self
    }

    pub fn with_positions(mut self, client_id: ClientId, positions: Vec<Position>) -> Self {
        self.positions.insert(client_id, positions);
        self
    }

    pub fn with_orders(mut self, client_id: ClientId, orders: Vec<CompletedOrder>) -> Self {
        self.orders.insert(client_id, orders);
        self
    }

    pub fn failing_funds(mut self, error: UpstreamError) -> Self {
        self.funds_failure = Some(error);
        self
    }

    pub fn failing_positions(mut self, error: UpstreamError) -> Self {
        self.positions_failure = Some(error);
        self
    }

    pub fn failing_orders(mut self, error: UpstreamError) -> Self {
        self.orders_failure = Some(error);
        self
    }
}

#[async_trait]
impl FundsSource for StaticMarketData {
    // unknown client behaves like the back office: not found
    async fn fetch_funds(&self, client_id: &ClientId) -> Result<Vec<FundsRow>, UpstreamError> {
        if let Some(error) = &self.funds_failure {
            return Err(error.clone());
        }
        self.funds.get(client_id).cloned().ok_or(UpstreamError::Status(404))
    }
}

#[async_trait]
impl PositionSource for StaticMarketData {
    async fn historical_positions(&self, client_id: &ClientId) -> Result<Vec<Position>, UpstreamError> {
        if let Some(error) = &self.positions_failure {
            return Err(error.clone());
        }
        Ok(self.positions.get(client_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl OrderSource for StaticMarketData {
    async fn completed_orders(&self, client_id: &ClientId) -> Result<Vec<CompletedOrder>, UpstreamError> {
        if let Some(error) = &self.orders_failure {
            return Err(error.clone());
        }
        Ok(self.orders.get(client_id).cloned().unwrap_or_default())
    }
}
