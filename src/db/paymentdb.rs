// db/paymentdb.rs
use async_trait::async_trait;
use chrono::Utc;

use super::{db::DBClient, store::keys};
use crate::{
    error::{ErrorMessage, PortalError},
    models::{
        paymentmodels::{PaymentMethod, PaymentRecord, PaymentRecordStatus},
        usermodel::PaymentStatus,
    },
    utils::reference::new_record_id,
};

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub student_id: String,
    pub amount: i64,
    pub method: PaymentMethod,
    pub reference_number: String,
    pub evidence: Option<String>,
}

#[async_trait]
pub trait PaymentExt {
    /// Newest first.
    async fn payments_for(&self, student_id: &str) -> Result<Vec<PaymentRecord>, PortalError>;

    async fn all_payments(&self) -> Result<Vec<PaymentRecord>, PortalError>;

    /// `Paid` as soon as one completed record exists for the student.
    async fn effective_payment_status(&self, student_id: &str) -> Result<PaymentStatus, PortalError>;

    async fn create_payment(&self, payment: NewPayment) -> Result<PaymentRecord, PortalError>;

    /// Settles a pending record as completed or failed. A student who has
    /// already paid cannot have a second record completed.
    async fn set_payment_status(
        &self,
        payment_id: &str,
        status: PaymentRecordStatus,
    ) -> Result<PaymentRecord, PortalError>;

    /// Marks pending online records failed, for one student or for all.
    /// Only valid while no settlement task is running for them.
    async fn fail_stale_online_payments(
        &self,
        student_id: Option<&str>,
    ) -> Result<Vec<PaymentRecord>, PortalError>;
}

pub fn derive_payment_status<'a>(
    student_id: &str,
    payments: impl IntoIterator<Item = &'a PaymentRecord>,
) -> PaymentStatus {
    let paid = payments
        .into_iter()
        .any(|p| p.student_id == student_id && p.is_completed());
    if paid {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Pending
    }
}

#[async_trait]
impl PaymentExt for DBClient {
    async fn payments_for(&self, student_id: &str) -> Result<Vec<PaymentRecord>, PortalError> {
        let mut payments: Vec<PaymentRecord> = self
            .all_payments()
            .await?
            .into_iter()
            .filter(|p| p.student_id == student_id)
            .collect();
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(payments)
    }

    async fn all_payments(&self) -> Result<Vec<PaymentRecord>, PortalError> {
        Ok(self.store.get_collection(keys::PAYMENTS).await?)
    }

    async fn effective_payment_status(&self, student_id: &str) -> Result<PaymentStatus, PortalError> {
        let payments = self.all_payments().await?;
        Ok(derive_payment_status(student_id, &payments))
    }

    async fn create_payment(&self, payment: NewPayment) -> Result<PaymentRecord, PortalError> {
        let record = self
            .store
            .update_collection::<PaymentRecord, _, PortalError, _>(keys::PAYMENTS, |payments| {
                if derive_payment_status(&payment.student_id, payments.iter()) == PaymentStatus::Paid {
                    return Err(PortalError::Conflict(ErrorMessage::AlreadyPaid.to_string()));
                }

                let pending_same_method = payments.iter().any(|p| {
                    p.student_id == payment.student_id
                        && p.status == PaymentRecordStatus::Pending
                        && p.payment_method == payment.method
                });
                if pending_same_method {
                    return Err(PortalError::Conflict(ErrorMessage::PaymentInProgress.to_string()));
                }

                let record = PaymentRecord {
                    id: new_record_id(),
                    student_id: payment.student_id,
                    amount: payment.amount,
                    reference_number: payment.reference_number,
                    payment_date: Utc::now(),
                    status: PaymentRecordStatus::Pending,
                    payment_method: payment.method,
                    evidence: payment.evidence,
                };
                payments.push(record.clone());
                Ok(record)
            })
            .await?;

        tracing::info!(
            "Payment {} ({}) recorded as pending for student {}",
            record.id,
            record.reference_number,
            record.student_id
        );
        Ok(record)
    }

    async fn set_payment_status(
        &self,
        payment_id: &str,
        status: PaymentRecordStatus,
    ) -> Result<PaymentRecord, PortalError> {
        if status == PaymentRecordStatus::Pending {
            return Err(PortalError::Validation(
                "A payment can only be settled as completed or failed".to_string(),
            ));
        }

        let record = self
            .store
            .update_collection::<PaymentRecord, _, PortalError, _>(keys::PAYMENTS, |payments| {
                let record = payments
                    .iter_mut()
                    .find(|p| p.id == payment_id)
                    .ok_or_else(|| PortalError::NotFound("Payment not found".to_string()))?;
                if record.status != PaymentRecordStatus::Pending {
                    return Err(PortalError::Conflict("Payment has already been settled".to_string()));
                }
                let student_id = record.student_id.clone();

                if status == PaymentRecordStatus::Completed
                    && derive_payment_status(&student_id, payments.iter()) == PaymentStatus::Paid
                {
                    return Err(PortalError::Conflict(ErrorMessage::AlreadyPaid.to_string()));
                }

                let record = payments
                    .iter_mut()
                    .find(|p| p.id == payment_id)
                    .ok_or_else(|| PortalError::NotFound("Payment not found".to_string()))?;
                record.status = status;
                Ok(record.clone())
            })
            .await?;

        tracing::info!("Payment {} settled as {:?}", record.id, record.status);
        Ok(record)
    }

    async fn fail_stale_online_payments(
        &self,
        student_id: Option<&str>,
    ) -> Result<Vec<PaymentRecord>, PortalError> {
        let failed = self
            .store
            .update_collection::<PaymentRecord, _, PortalError, _>(keys::PAYMENTS, |payments| {
                let mut failed = Vec::new();
                for p in payments.iter_mut().filter(|p| {
                    p.status == PaymentRecordStatus::Pending
                        && p.payment_method == PaymentMethod::Online
                        && student_id.map_or(true, |id| p.student_id == id)
                }) {
                    p.status = PaymentRecordStatus::Failed;
                    failed.push(p.clone());
                }
                Ok(failed)
            })
            .await?;

        for record in &failed {
            tracing::warn!(
                "Online payment {} for student {} was never settled; marked failed",
                record.reference_number,
                record.student_id
            );
        }
        Ok(failed)
    }
}
