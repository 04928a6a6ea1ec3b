use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};
use tokio::sync::TryAcquireError;
use tokio::time::sleep;

use crate::outstanding::OutstandingRequests;

quick_error! {
    #[derive(Debug, Eq, PartialEq)]
    pub enum ShaperError {
        /// The admission of this client is closed, no more request may be issued.
        Closed {
            display("admission closed")
        }
    }
}

/// RateShaper decides when a client may issue its next request.
///
/// Closed loop: wait for a free admission permit.
///
/// Open loop: requests depart at exponentially distributed intervals. A departure that finds
/// no free permit is counted as queued and the shaper waits one more interval before retrying.
/// A queued departure is paid back by admitting a later request without waiting, so that the
/// schedule catches up after a burst of slow replies.
pub struct RateShaper {
    table: Arc<OutstandingRequests>,
    arrival: Option<Exp<f64>>,
    rng: StdRng,
    queued: u64,
}

impl RateShaper {
    /// new creates a shaper taking permits from `table`.
    /// `mean` is the mean inter-arrival time, None (or zero) means closed loop.
    pub fn new(table: Arc<OutstandingRequests>, mean: Option<Duration>, rng: StdRng) -> RateShaper {
        let arrival = mean
            .map(|m| m.as_secs_f64() * 1e6)
            .filter(|us| *us > 0.0)
            .and_then(|us| Exp::new(1.0 / us).ok());

        RateShaper {
            table,
            arrival,
            rng,
            queued: 0,
        }
    }

    pub fn is_open_loop(&self) -> bool {
        self.arrival.is_some()
    }

    /// queued returns the number of departures that are missed and not yet paid back.
    pub fn queued(&self) -> u64 {
        self.queued
    }

    /// admit returns once the client holds one admission permit.
    /// The permit is not returned by dropping anything: it is given back by
    /// `OutstandingRequests::complete()` when the request completes.
    pub async fn admit(&mut self) -> Result<(), ShaperError> {
        let exp = match self.arrival {
            None => {
                let permit = self
                    .table
                    .admission()
                    .acquire()
                    .await
                    .map_err(|_| ShaperError::Closed)?;
                permit.forget();
                return Ok(());
            }
            Some(exp) => exp,
        };

        loop {
            let tried = self.table.admission().try_acquire().map(|p| p.forget());
            match tried {
                Ok(()) => {
                    if self.queued == 0 {
                        sleep(self.next_arrival(&exp)).await;
                    } else {
                        self.queued -= 1;
                    }
                    return Ok(());
                }
                Err(TryAcquireError::NoPermits) => {
                    sleep(self.next_arrival(&exp)).await;
                    self.queued += 1;
                }
                Err(TryAcquireError::Closed) => return Err(ShaperError::Closed),
            }
        }
    }

    fn next_arrival(&mut self, exp: &Exp<f64>) -> Duration {
        let us = exp.sample(&mut self.rng);
        Duration::from_nanos((us * 1e3) as u64)
    }
}
