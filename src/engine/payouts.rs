// 8.4 engine/payouts.rs: payout request and cancellation.
// 8.4.1 states: none -> Pending|Process -> Proceed|Cancelled. Proceed is set downstream.
// 8.4.2 the queue write and the durable insert are separate stores; an insert
//       failure deletes the queue entry again, best effort.
// 8.4.3 the durable store enforces one active request per client. the existence
//       check here only avoids the eligibility fetch for obvious repeats.

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::core::Engine;
use super::results::{CancelOutcome, EngineError, PayoutReceipt};
use crate::settlement::{resolve_queue_bucket, PayoutQueueEntry, SettlementWindowPolicy};
use crate::store::{StoreError, TransactionUpdate};
use crate::transaction::{PayoutRequest, PayoutStatus, PayoutTransaction};
use crate::types::{ClientId, TransactionId};

const ALREADY_PROCESSED: &str = "Payout request has already been processed and cannot be cancelled";

impl Engine {
    pub async fn request_payout(
        &self,
        request: PayoutRequest,
        window: SettlementWindowPolicy,
    ) -> Result<PayoutReceipt, EngineError> {
        let span = info_span!(
            "request_payout",
            correlation_id = %Uuid::new_v4(),
            client_id = %request.client_id
        );
        self.request_payout_inner(request, window).instrument(span).await
    }

    async fn request_payout_inner(
        &self,
        request: PayoutRequest,
        window: SettlementWindowPolicy,
    ) -> Result<PayoutReceipt, EngineError> {
        let amount = request.validate().map_err(|e| {
            warn!(error = %e, "payout request rejected");
            e
        })?;
        let client_id = &request.client_id;

        // 1. one in-flight request per client
        if self.store.check_existing_payout_request(client_id).await.map_err(|e| {
            error!(error = %e, "existing request check failed");
            e
        })? {
            warn!("payout request already in progress");
            return Err(EngineError::Conflict(format!(
                "client {client_id} already has an active payout request"
            )));
        }

        // 2. eligibility
        let decision = self.compute_payout_eligibility(client_id).await?;
        if request.amount > decision.payout_amount {
            warn!(
                requested = %request.amount,
                eligible = %decision.payout_amount,
                "payout request over limit"
            );
            return Err(EngineError::LimitExceeded {
                requested: request.amount,
                eligible: decision.payout_amount,
            });
        }

        // 3-4. id, timestamps and settlement day
        let now = self.clock.now();
        let transaction_id = TransactionId::generate();
        let status = window.transaction_status();
        let bucket = resolve_queue_bucket(now, self.settings.cutoff_hour);
        let bucket_key = bucket.key(&self.settings.queue_key_prefix);

        // 5. queue entry; a closed window queues a zero amount
        let entry = PayoutQueueEntry::new(
            transaction_id.clone(),
            client_id.clone(),
            window.queued_amount(amount),
            &request.bank,
            status,
            now,
        );
        let payload = entry.to_json()?;
        self.queue
            .hset(&bucket_key, client_id.as_str(), &payload)
            .await
            .map_err(|e| {
                error!(bucket = %bucket_key, error = %e, "queue write failed");
                e
            })?;

        // 6. durable record
        let transaction = PayoutTransaction::new(transaction_id.clone(), &request, amount, status, now);
        if let Err(e) = self.store.insert_transaction(&transaction).await {
            error!(transaction_id = %transaction_id, error = %e, "transaction insert failed, rolling back queue entry");

            // 7. compensate; the caller still sees the insert failure
            match self.queue.hdelete(&bucket_key, client_id.as_str()).await {
                Ok(true) => {}
                Ok(false) => warn!(bucket = %bucket_key, "queue entry already gone during rollback"),
                Err(rollback) => error!(
                    bucket = %bucket_key,
                    error = %rollback,
                    "queue rollback failed, entry needs reconciliation"
                ),
            }

            return Err(match e {
                StoreError::UniqueViolation(client) => {
                    // queue fields are keyed by client, so the active request's entry was
                    // overwritten above and has now been deleted with ours
                    warn!(
                        bucket = %bucket_key,
                        field = %client,
                        "active payout request lost its queue entry, needs reconciliation"
                    );
                    EngineError::Conflict(format!("client {client} already has an active payout request"))
                }
                other => EngineError::Persistence(other),
            });
        }

        info!(
            transaction_id = %transaction_id,
            bucket = %bucket_key,
            amount,
            status = ?status,
            "payout request queued"
        );

        Ok(PayoutReceipt {
            transaction_id,
            status,
            bucket,
            amount,
        })
    }

    pub async fn cancel_payout(
        &self,
        client_id: &ClientId,
        transaction_id: &TransactionId,
    ) -> Result<CancelOutcome, EngineError> {
        let span = info_span!(
            "cancel_payout",
            correlation_id = %Uuid::new_v4(),
            client_id = %client_id,
            transaction_id = %transaction_id
        );
        self.cancel_payout_inner(client_id, transaction_id).instrument(span).await
    }

    async fn cancel_payout_inner(
        &self,
        client_id: &ClientId,
        transaction_id: &TransactionId,
    ) -> Result<CancelOutcome, EngineError> {
        let transaction = self
            .store
            .get_transaction(transaction_id)
            .await
            .map_err(|e| {
                error!(error = %e, "transaction lookup failed");
                e
            })?
            .filter(|tx| &tx.client_id == client_id)
            .ok_or_else(|| {
                warn!("cancel for unknown transaction");
                EngineError::Validation(format!("no payout {transaction_id} for client {client_id}"))
            })?;

        if transaction.status == PayoutStatus::Proceed {
            info!("cancel after settlement, nothing changed");
            return Ok(CancelOutcome::AlreadyProcessed {
                message: ALREADY_PROCESSED.to_string(),
            });
        }

        // a repeated cancel re-runs both steps, so a failed queue delete can be retried
        let now = self.clock.now();
        self.store
            .update_transaction(
                transaction_id,
                TransactionUpdate::status(PayoutStatus::Cancelled, now).with_remarks("cancelled by client"),
            )
            .await
            .map_err(|e| {
                error!(error = %e, "transaction cancel failed");
                e
            })?;

        // bucket from the cancel time, same rule as the request
        let bucket_key = resolve_queue_bucket(now, self.settings.cutoff_hour).key(&self.settings.queue_key_prefix);
        let removed = self
            .queue
            .hdelete(&bucket_key, client_id.as_str())
            .await
            .map_err(|e| {
                error!(bucket = %bucket_key, error = %e, "queue delete failed after cancel");
                e
            })?;
        if !removed {
            warn!(bucket = %bucket_key, "no queue entry in cancel bucket");
        }

        info!(bucket = %bucket_key, "payout request cancelled");
        Ok(CancelOutcome::Cancelled {
            transaction_id: transaction_id.clone(),
        })
    }
}
