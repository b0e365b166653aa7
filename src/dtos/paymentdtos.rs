use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{
    paymentmodels::{PaymentMethod, PaymentRecord, PaymentRecordStatus},
    usermodel::PaymentStatus,
};

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualPaymentDto {
    /// Uploaded teller or transfer receipt.
    #[validate(length(min = 1, message = "Payment evidence is required"))]
    pub evidence: String,
    #[validate(length(min = 1, message = "Bank reference is required"))]
    pub bank_reference: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummaryDto {
    pub payment_status: PaymentStatus,
    pub amount_due: i64,
    pub in_progress: bool,
    pub payments: Vec<PaymentRecord>,
}

/// Payment joined with the paying student for the coordinator's list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListItemDto {
    #[serde(flatten)]
    pub payment: PaymentRecord,
    pub student_name: String,
    pub matric_number: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQueryDto {
    pub status: Option<PaymentRecordStatus>,
    pub method: Option<PaymentMethod>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_payment_needs_evidence_and_reference() {
        let dto = ManualPaymentDto {
            evidence: String::new(),
            bank_reference: "FBN-001".to_string(),
        };
        assert!(dto.validate().unwrap_err().field_errors().contains_key("evidence"));

        let dto: ManualPaymentDto =
            serde_json::from_str(r#"{"evidence":"uploads/teller.jpg","bankReference":"FBN-001"}"#)
                .unwrap();
        assert!(dto.validate().is_ok());
    }
}
