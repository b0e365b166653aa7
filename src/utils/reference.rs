// utils/reference.rs
use chrono::{Datelike, Utc};
use rand::distr::Alphanumeric;
use rand::{rng, Rng};

/// Payment reference such as `PAY-2024-8K2M4Q`.
pub fn generate_payment_reference() -> String {
    let suffix: String = rng()
        .sample_iter(Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();

    format!("PAY-{}-{}", Utc::now().year(), suffix)
}

pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_reference_shape() {
        let reference = generate_payment_reference();
        let parts: Vec<&str> = reference.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "PAY");
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn record_ids_are_unique() {
        assert_ne!(new_record_id(), new_record_id());
    }
}
