use async_trait::async_trait;
use thiserror::Error;
use toll_common::middleware::Fault;
use toll_common::types::{DistanceSample, Invoice};

use crate::store::{Store, StoreError};

/// Price per unit of distance.
pub const BASE_PRICE: f64 = 3.7;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregatorError {
    #[error("no data for obu {0}")]
    NoData(i64),
    #[error("invalid distance {value} for obu {obu_id}")]
    InvalidSample { obu_id: i64, value: f64 },
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AggregatorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(obu_id) => AggregatorError::NoData(obu_id),
            err => AggregatorError::Store(err),
        }
    }
}

impl Fault for AggregatorError {
    fn is_fault(&self) -> bool {
        matches!(self, AggregatorError::Store(_))
    }
}

#[async_trait]
pub trait Aggregator: Send + Sync {
    async fn aggregate_distance(&self, sample: DistanceSample) -> Result<(), AggregatorError>;
    async fn calculate_invoice(&self, obu_id: i64) -> Result<Invoice, AggregatorError>;
}

pub struct InvoiceAggregator<S> {
    store: S,
}

impl<S: Store> InvoiceAggregator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: Store> Aggregator for InvoiceAggregator<S> {
    async fn aggregate_distance(&self, sample: DistanceSample) -> Result<(), AggregatorError> {
        if !sample.is_valid() {
            return Err(AggregatorError::InvalidSample {
                obu_id: sample.obu_id,
                value: sample.value,
            });
        }
        self.store.insert(sample.obu_id, sample.value).await?;
        Ok(())
    }

    async fn calculate_invoice(&self, obu_id: i64) -> Result<Invoice, AggregatorError> {
        let total_distance = self.store.get(obu_id).await?;
        Ok(Invoice {
            obu_id,
            total_distance,
            total_amount: BASE_PRICE * total_distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    struct BrokenStore;

    #[async_trait]
    impl Store for BrokenStore {
        async fn insert(&self, _: i64, _: f64) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk on fire".to_owned()))
        }

        async fn get(&self, _: i64) -> Result<f64, StoreError> {
            Err(StoreError::Backend("disk on fire".to_owned()))
        }
    }

    #[tokio::test]
    async fn invoice_amount_is_base_price_times_total() {
        let service = InvoiceAggregator::new(MemoryStore::new());
        service
            .aggregate_distance(DistanceSample::new(9, 10.0, 0, None))
            .await
            .unwrap();

        let invoice = service.calculate_invoice(9).await.unwrap();
        assert_eq!(
            invoice,
            Invoice {
                obu_id: 9,
                total_distance: 10.0,
                total_amount: 37.0,
            }
        );
    }

    #[tokio::test]
    async fn sums_samples() {
        let service = InvoiceAggregator::new(MemoryStore::new());
        for value in [2.0, 3.0] {
            service
                .aggregate_distance(DistanceSample::new(1, value, 0, None))
                .await
                .unwrap();
        }

        let invoice = service.calculate_invoice(1).await.unwrap();
        assert_eq!(invoice.total_distance, 5.0);
        assert_eq!(invoice.total_amount, 18.5);
    }

    #[tokio::test]
    async fn unknown_obu_has_no_data() {
        let service = InvoiceAggregator::new(MemoryStore::new());
        let err = service.calculate_invoice(404).await.unwrap_err();
        assert_eq!(err, AggregatorError::NoData(404));
        assert!(!err.is_fault());
    }

    #[tokio::test]
    async fn rejects_invalid_samples_without_storing() {
        let service = InvoiceAggregator::new(MemoryStore::new());
        let err = service
            .aggregate_distance(DistanceSample::new(5, -1.0, 0, None))
            .await
            .unwrap_err();

        assert!(matches!(err, AggregatorError::InvalidSample { obu_id: 5, .. }));
        assert_eq!(
            service.calculate_invoice(5).await,
            Err(AggregatorError::NoData(5))
        );
    }

    #[tokio::test]
    async fn store_failures_are_faults() {
        let service = InvoiceAggregator::new(BrokenStore);

        let err = service
            .aggregate_distance(DistanceSample::new(1, 1.0, 0, None))
            .await
            .unwrap_err();
        assert!(matches!(err, AggregatorError::Store(_)));
        assert!(err.is_fault());

        let err = service.calculate_invoice(1).await.unwrap_err();
        assert!(matches!(err, AggregatorError::Store(_)));
    }
}
