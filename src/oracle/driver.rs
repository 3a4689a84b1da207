//! Fulfillment driver
//!
//! Background task that closes the loop between the oracle and an engine:
//! it waits for request ids announced by the oracle, produces the random
//! word, and delivers it through the engine's fulfillment entry point.

use crate::common::traits::RandomnessOracle;
use crate::common::types::RequestId;
use crate::engine::{SettlementReport, WagerEngine};
use crate::errors::WagerResult;
use crate::games::GameVariant;
use crate::oracle::vrf_engine::{VrfFulfillment, VrfRandomnessOracle};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// One delivery attempt.
///
/// A failed `result` leaves the request pending in the engine; the words in
/// `fulfillment` can be delivered again once the cause is fixed.
#[derive(Debug)]
pub struct Delivery<S, O> {
    pub fulfillment: VrfFulfillment,
    pub result: WagerResult<SettlementReport<S, O>>,
}

pub struct FulfillmentDriver<G: GameVariant> {
    engine: Arc<Mutex<WagerEngine<G>>>,
    oracle: Arc<VrfRandomnessOracle>,
    deliveries: Option<mpsc::UnboundedSender<Delivery<G::Selection, G::Outcome>>>,
}

impl<G: GameVariant + 'static> FulfillmentDriver<G> {
    pub fn new(engine: Arc<Mutex<WagerEngine<G>>>, oracle: Arc<VrfRandomnessOracle>) -> Self {
        Self {
            engine,
            oracle,
            deliveries: None,
        }
    }

    /// Forward every delivery attempt to `deliveries`
    pub fn with_deliveries(mut self, deliveries: mpsc::UnboundedSender<Delivery<G::Selection, G::Outcome>>) -> Self {
        self.deliveries = Some(deliveries);
        self
    }

    /// Run until the oracle's notifier is dropped
    pub fn spawn(self, mut requests: mpsc::UnboundedReceiver<RequestId>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let oracle_id = self.oracle.id();
            while let Some(request_id) = requests.recv().await {
                let fulfillment = match self.oracle.fulfill(request_id) {
                    Ok(fulfillment) => fulfillment,
                    Err(e) => {
                        tracing::warn!("Skipping request {}: {}", request_id, e);
                        continue;
                    }
                };

                let result = {
                    let mut engine = self.engine.lock().await;
                    engine.fulfill_random_words(&oracle_id, request_id, &fulfillment.random_words)
                };
                if let Err(e) = &result {
                    tracing::error!("Delivery of request {} failed: {}", request_id, e);
                }

                if let Some(deliveries) = &self.deliveries {
                    if deliveries.send(Delivery { fulfillment, result }).is_err() {
                        tracing::debug!("Delivery receiver dropped");
                    }
                }
            }
            tracing::info!("Fulfillment driver for {} stopped", oracle_id);
        })
    }
}
