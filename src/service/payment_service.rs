// service/payment_service.rs
use std::{collections::HashSet, sync::Arc, time::Duration};

use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
    db::{
        db::DBClient,
        paymentdb::{NewPayment, PaymentExt},
    },
    dtos::paymentdtos::PaymentSummaryDto,
    error::{ErrorMessage, PortalError},
    models::paymentmodels::{PaymentMethod, PaymentRecord, PaymentRecordStatus},
    utils::reference::generate_payment_reference,
};

/// An accepted online payment and the task that will settle it.
#[derive(Debug)]
pub struct PendingSettlement {
    pub record: PaymentRecord,
    pub settlement: JoinHandle<()>,
}

/// SIWES fee collection.
///
/// Online payments go through a simulated gateway: the pending record is
/// written at once and a background task settles it after `settle_delay`.
/// The task runs to completion even if the requester has gone away.
#[derive(Debug, Clone)]
pub struct PaymentService {
    db_client: Arc<DBClient>,
    fee: i64,
    settle_delay: Duration,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl PaymentService {
    pub fn new(db_client: Arc<DBClient>, fee: i64, settle_delay: Duration) -> Self {
        PaymentService {
            db_client,
            fee,
            settle_delay,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn fee(&self) -> i64 {
        self.fee
    }

    pub async fn is_in_flight(&self, student_id: &str) -> bool {
        self.in_flight.lock().await.contains(student_id)
    }

    pub async fn summary(&self, student_id: &str) -> Result<PaymentSummaryDto, PortalError> {
        Ok(PaymentSummaryDto {
            payment_status: self.db_client.effective_payment_status(student_id).await?,
            amount_due: self.fee,
            in_progress: self.is_in_flight(student_id).await,
            payments: self.db_client.payments_for(student_id).await?,
        })
    }

    pub async fn start_online_payment(&self, student_id: &str) -> Result<PendingSettlement, PortalError> {
        if !self.in_flight.lock().await.insert(student_id.to_string()) {
            return Err(PortalError::Conflict(ErrorMessage::PaymentInProgress.to_string()));
        }

        // No task of ours settles this student, so any pending online record
        // was abandoned by an earlier process or a failed settlement.
        let created = match self
            .db_client
            .fail_stale_online_payments(Some(student_id))
            .await
        {
            Ok(_) => {
                self.db_client
                    .create_payment(NewPayment {
                        student_id: student_id.to_string(),
                        amount: self.fee,
                        method: PaymentMethod::Online,
                        reference_number: generate_payment_reference(),
                        evidence: None,
                    })
                    .await
            }
            Err(e) => Err(e),
        };

        let record = match created {
            Ok(record) => record,
            Err(e) => {
                self.in_flight.lock().await.remove(student_id);
                return Err(e);
            }
        };

        let service = self.clone();
        let payment_id = record.id.clone();
        let student_id = student_id.to_string();
        let settlement = tokio::spawn(async move {
            tokio::time::sleep(service.settle_delay).await;
            service.settle_online(&payment_id).await;
            service.in_flight.lock().await.remove(&student_id);
        });

        Ok(PendingSettlement { record, settlement })
    }

    /// Fails online records left pending by a previous process. Must run
    /// before any online payment is started.
    pub async fn recover_unsettled_payments(&self) -> Result<usize, PortalError> {
        let failed = self.db_client.fail_stale_online_payments(None).await?;
        Ok(failed.len())
    }

    async fn settle_online(&self, payment_id: &str) {
        match self
            .db_client
            .set_payment_status(payment_id, PaymentRecordStatus::Completed)
            .await
        {
            Ok(record) => tracing::info!(
                "Online payment {} completed for student {}",
                record.reference_number,
                record.student_id
            ),
            Err(e) => {
                tracing::warn!("Could not complete online payment {}: {}", payment_id, e);
                if let Err(e) = self
                    .db_client
                    .set_payment_status(payment_id, PaymentRecordStatus::Failed)
                    .await
                {
                    tracing::error!("Could not mark payment {} as failed: {}", payment_id, e);
                }
            }
        }
    }

    pub async fn submit_manual_payment(
        &self,
        student_id: &str,
        evidence: &str,
        bank_reference: &str,
    ) -> Result<PaymentRecord, PortalError> {
        self.db_client
            .create_payment(NewPayment {
                student_id: student_id.to_string(),
                amount: self.fee,
                method: PaymentMethod::Manual,
                reference_number: bank_reference.trim().to_string(),
                evidence: Some(evidence.trim().to_string()),
            })
            .await
    }

    pub async fn confirm_manual_payment(&self, payment_id: &str) -> Result<PaymentRecord, PortalError> {
        self.settle_manual(payment_id, PaymentRecordStatus::Completed).await
    }

    pub async fn reject_manual_payment(&self, payment_id: &str) -> Result<PaymentRecord, PortalError> {
        self.settle_manual(payment_id, PaymentRecordStatus::Failed).await
    }

    async fn settle_manual(
        &self,
        payment_id: &str,
        status: PaymentRecordStatus,
    ) -> Result<PaymentRecord, PortalError> {
        let payment = self
            .db_client
            .all_payments()
            .await?
            .into_iter()
            .find(|p| p.id == payment_id)
            .ok_or_else(|| PortalError::NotFound("Payment not found".to_string()))?;

        if payment.payment_method != PaymentMethod::Manual {
            return Err(PortalError::Conflict(
                "Only manual payments are confirmed by the coordinator".to_string(),
            ));
        }

        self.db_client.set_payment_status(payment_id, status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::testutil::seeded_client, models::usermodel::PaymentStatus};

    async fn service() -> PaymentService {
        PaymentService::new(seeded_client().await, 7000, Duration::from_millis(20))
    }

    #[tokio::test]
    async fn online_payment_settles_in_background() {
        let service = service().await;

        let pending = service.start_online_payment("3").await.unwrap();
        assert_eq!(pending.record.status, PaymentRecordStatus::Pending);
        assert_eq!(pending.record.amount, 7000);
        assert!(pending.record.reference_number.starts_with("PAY-"));
        assert!(service.is_in_flight("3").await);

        let summary = service.summary("3").await.unwrap();
        assert!(summary.in_progress);
        assert_eq!(summary.payment_status, PaymentStatus::Pending);

        pending.settlement.await.unwrap();

        let summary = service.summary("3").await.unwrap();
        assert!(!summary.in_progress);
        assert_eq!(summary.payment_status, PaymentStatus::Paid);
        assert_eq!(summary.payments[0].status, PaymentRecordStatus::Completed);
    }

    #[tokio::test]
    async fn duplicate_online_submission_is_refused() {
        let service = service().await;
        let pending = service.start_online_payment("3").await.unwrap();

        assert!(matches!(
            service.start_online_payment("3").await,
            Err(PortalError::Conflict(_))
        ));

        pending.settlement.await.unwrap();
        // Paid now, so a fresh attempt is refused by the store instead.
        assert!(matches!(
            service.start_online_payment("3").await,
            Err(PortalError::Conflict(_))
        ));
        assert!(!service.is_in_flight("3").await);
        assert_eq!(service.summary("3").await.unwrap().payments.len(), 1);
    }

    #[tokio::test]
    async fn coordinator_settles_manual_payments() {
        let service = service().await;

        let submitted = service
            .submit_manual_payment("3", "uploads/teller.jpg", " FBN-778812 ")
            .await
            .unwrap();
        assert_eq!(submitted.reference_number, "FBN-778812");
        assert_eq!(submitted.payment_method, PaymentMethod::Manual);

        let rejected = service.reject_manual_payment(&submitted.id).await.unwrap();
        assert_eq!(rejected.status, PaymentRecordStatus::Failed);
        assert_eq!(
            service.summary("3").await.unwrap().payment_status,
            PaymentStatus::Pending
        );

        let resubmitted = service
            .submit_manual_payment("3", "uploads/teller-2.jpg", "FBN-778813")
            .await
            .unwrap();
        service.confirm_manual_payment(&resubmitted.id).await.unwrap();
        assert_eq!(
            service.summary("3").await.unwrap().payment_status,
            PaymentStatus::Paid
        );
    }

    #[tokio::test]
    async fn abandoned_online_payment_does_not_block_a_retry() {
        let db = seeded_client().await;
        let first = PaymentService::new(db.clone(), 7000, Duration::from_secs(3600));
        let pending = first.start_online_payment("3").await.unwrap();
        pending.settlement.abort();

        // A fresh service stands in for the restarted process.
        let restarted = PaymentService::new(db.clone(), 7000, Duration::from_millis(20));
        assert!(!restarted.is_in_flight("3").await);
        let retry = restarted.start_online_payment("3").await.unwrap();
        retry.settlement.await.unwrap();

        let payments = db.payments_for("3").await.unwrap();
        let abandoned = payments.iter().find(|p| p.id == pending.record.id).unwrap();
        assert_eq!(abandoned.status, PaymentRecordStatus::Failed);
        assert_eq!(
            restarted.summary("3").await.unwrap().payment_status,
            PaymentStatus::Paid
        );
    }

    #[tokio::test]
    async fn boot_recovery_fails_unsettled_online_records() {
        let db = seeded_client().await;
        let before = PaymentService::new(db.clone(), 7000, Duration::from_secs(3600));
        let pending = before.start_online_payment("3").await.unwrap();
        pending.settlement.abort();
        let manual = before
            .submit_manual_payment("3", "uploads/teller.jpg", "FBN-1001")
            .await
            .unwrap();

        let after = PaymentService::new(db.clone(), 7000, Duration::from_millis(20));
        assert_eq!(after.recover_unsettled_payments().await.unwrap(), 1);
        assert_eq!(after.recover_unsettled_payments().await.unwrap(), 0);

        let payments = db.payments_for("3").await.unwrap();
        let online = payments.iter().find(|p| p.id == pending.record.id).unwrap();
        assert_eq!(online.status, PaymentRecordStatus::Failed);
        // Manual submissions wait for the coordinator, not for a task.
        let manual = payments.iter().find(|p| p.id == manual.id).unwrap();
        assert_eq!(manual.status, PaymentRecordStatus::Pending);
    }

    #[tokio::test]
    async fn confirmed_manual_payment_fails_the_racing_online_one() {
        let service = PaymentService::new(seeded_client().await, 7000, Duration::from_millis(200));
        let manual = service
            .submit_manual_payment("3", "uploads/teller.jpg", "FBN-2002")
            .await
            .unwrap();
        let pending = service.start_online_payment("3").await.unwrap();

        service.confirm_manual_payment(&manual.id).await.unwrap();
        pending.settlement.await.unwrap();

        let payments = service.summary("3").await.unwrap().payments;
        let completed = payments
            .iter()
            .filter(|p| p.status == PaymentRecordStatus::Completed)
            .count();
        assert_eq!(completed, 1);
        let online = payments.iter().find(|p| p.id == pending.record.id).unwrap();
        assert_eq!(online.status, PaymentRecordStatus::Failed);
    }

    #[tokio::test]
    async fn online_records_are_not_manually_settled() {
        let service = service().await;
        assert!(matches!(
            service.confirm_manual_payment("pay-1").await,
            Err(PortalError::Conflict(_))
        ));
        assert!(matches!(
            service.reject_manual_payment("pay-404").await,
            Err(PortalError::NotFound(_))
        ));
    }
}
