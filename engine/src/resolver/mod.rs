//! The hybrid fetch resolver.
//!
//! For every requested (client, year, month) combination the resolver picks
//! one of three ways to produce nested rollup documents:
//!
//! 1. **Live**: the period is the current calendar month and the client is
//!    flagged for live dashboards. A reactive subscription over raw records
//!    is opened; every pushed snapshot is synthesized into nested rollups at
//!    the requested granularity and forwarded on the updates channel.
//! 2. **Precomputed**: the rollup documents for the period are read by key,
//!    at daily or monthly granularity as requested.
//! 3. **Raw fallback**: a fetched rollup that predates the breakdown schema
//!    (or cannot be read as it) is replaced by a raw-record range query for
//!    that exact period, synthesized into an equivalent document, so
//!    downstream consumers never see schema versions.
//!
//! Combinations are resolved independently: a failure in one slice is
//! logged and yields an empty contribution, never aborting the others.
//! Changing the requested filter set cancels every previous live
//! subscription before opening the new ones; cancellation is immediate and
//! silent.

use crate::period::{day_bounds_ms, Period};
use crate::rollup::{
    nested_from_document, synthesize_daily_from_records, synthesize_from_records,
};
use crate::store::{ClientCatalog, RecordSubscription, RemoteStore, SubscriptionHandle};
use chrono::{NaiveDate, Utc};
use common::error::CoreError;
use common::model::record::MeasurementRecord;
use common::model::rollup::{NestedRollup, RollupDocument};
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Which rollup granularity a request wants. Daily is what the carbon
/// evolution series needs; monthly is enough for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Monthly,
}

/// The requested filter set: the cartesian product of clients, years and
/// months is resolved slice by slice.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub clients: Vec<String>,
    pub years: Vec<i32>,
    pub months: Vec<u32>,
    pub granularity: Granularity,
}

/// The documents resolved for one (client, period) slice. Also the shape
/// pushed on the updates channel when a live subscription fires.
#[derive(Debug, Clone)]
pub struct SliceUpdate {
    pub client_id: String,
    pub period: Period,
    pub docs: Vec<NestedRollup>,
}

pub struct HybridFetchResolver<R: RemoteStore, C: ClientCatalog> {
    remote: Arc<R>,
    catalog: Arc<C>,
    updates_tx: mpsc::Sender<SliceUpdate>,
    live_handles: Vec<SubscriptionHandle>,
}

impl<R: RemoteStore, C: ClientCatalog> HybridFetchResolver<R, C> {
    /// Returns the resolver and the receiving end of its updates channel,
    /// on which live slices push fresh snapshots.
    pub fn new(remote: Arc<R>, catalog: Arc<C>) -> (Self, mpsc::Receiver<SliceUpdate>) {
        let (updates_tx, updates_rx) = mpsc::channel(32);
        (
            HybridFetchResolver {
                remote,
                catalog,
                updates_tx,
                live_handles: Vec::new(),
            },
            updates_rx,
        )
    }

    /// Resolve a filter set against the current calendar month.
    pub async fn resolve(&mut self, request: &ResolveRequest) -> Vec<SliceUpdate> {
        self.resolve_at(request, Utc::now().date_naive()).await
    }

    /// Resolve with an explicit "today", which decides which periods count
    /// as the current month.
    pub async fn resolve_at(
        &mut self,
        request: &ResolveRequest,
        today: NaiveDate,
    ) -> Vec<SliceUpdate> {
        // A new filter set first tears down every prior live subscription.
        self.cancel_all();

        let mut slices = Vec::new();
        for client_id in &request.clients {
            for &year in &request.years {
                for &month in &request.months {
                    let period = Period::new(year, month);
                    let docs = match self
                        .resolve_slice(client_id, period, request.granularity, today)
                        .await
                    {
                        Ok(docs) => docs,
                        Err(e) => {
                            warn!(
                                "resolution failed for client {} period {}: {}",
                                client_id,
                                period.month_key(),
                                e
                            );
                            Vec::new()
                        }
                    };
                    slices.push(SliceUpdate {
                        client_id: client_id.clone(),
                        period,
                        docs,
                    });
                }
            }
        }
        slices
    }

    /// Cancel every live subscription this resolver opened. Idempotent;
    /// also runs on drop.
    pub fn cancel_all(&mut self) {
        for handle in self.live_handles.drain(..) {
            handle.cancel();
        }
    }

    async fn resolve_slice(
        &mut self,
        client_id: &str,
        period: Period,
        granularity: Granularity,
        today: NaiveDate,
    ) -> Result<Vec<NestedRollup>, CoreError> {
        let live = period.is_current(today)
            && self
                .catalog
                .client(client_id)
                .await?
                .map(|c| c.live_dashboard)
                .unwrap_or(false);

        if live {
            return self.open_live_slice(client_id, period, granularity).await;
        }

        match granularity {
            Granularity::Monthly => {
                let key = period.month_key();
                match self.remote.monthly_rollup(client_id, &key).await? {
                    None => Ok(Vec::new()),
                    Some(doc) => {
                        let (start, end) = period_bounds(period)?;
                        Ok(vec![
                            self.nested_or_fallback(client_id, doc, &key, start, end)
                                .await?,
                        ])
                    }
                }
            }
            Granularity::Daily => {
                let daily = self
                    .remote
                    .daily_rollups(client_id, &period.month_key())
                    .await?;
                let mut docs = Vec::with_capacity(daily.len());
                for doc in daily {
                    docs.push(self.nested_daily_or_fallback(client_id, doc).await?);
                }
                Ok(docs)
            }
        }
    }

    async fn open_live_slice(
        &mut self,
        client_id: &str,
        period: Period,
        granularity: Granularity,
    ) -> Result<Vec<NestedRollup>, CoreError> {
        let (start, end) = period_bounds(period)?;
        let subscription = self.remote.subscribe_records(client_id, start, end);
        let records = self.remote.records_in_range(client_id, start, end).await?;
        let initial = synthesize_slice(client_id, period, &records, granularity);
        debug!(
            "live slice opened for client {} period {} ({} records)",
            client_id,
            period.month_key(),
            records.len()
        );
        self.spawn_pump(client_id.to_string(), period, granularity, subscription);
        Ok(initial)
    }

    /// Forward pushed record snapshots as synthesized rollups until the
    /// subscription is cancelled or the updates receiver goes away.
    fn spawn_pump(
        &mut self,
        client_id: String,
        period: Period,
        granularity: Granularity,
        sub: RecordSubscription,
    ) {
        let RecordSubscription {
            mut snapshots,
            handle,
        } = sub;
        self.live_handles.push(handle.clone());
        let tx = self.updates_tx.clone();
        tokio::spawn(async move {
            while let Some(records) = snapshots.recv().await {
                if handle.is_cancelled() {
                    break;
                }
                let update = SliceUpdate {
                    client_id: client_id.clone(),
                    period,
                    docs: synthesize_slice(&client_id, period, &records, granularity),
                };
                if tx.send(update).await.is_err() {
                    break;
                }
            }
        });
    }

    /// Unflatten a monthly document, falling back to raw records when it
    /// predates the breakdown schema or cannot be read as it.
    async fn nested_or_fallback(
        &self,
        client_id: &str,
        doc: RollupDocument,
        period_id: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<NestedRollup, CoreError> {
        if doc.has_breakdowns() {
            match nested_from_document(&doc) {
                Ok(nested) => return Ok(nested),
                Err(e) => {
                    debug!("rollup {} unreadable ({}), using raw fallback", doc.id, e)
                }
            }
        } else {
            debug!("rollup {} has legacy schema, using raw fallback", doc.id);
        }
        let records = self
            .remote
            .records_in_range(client_id, start_ms, end_ms)
            .await?;
        Ok(synthesize_from_records(client_id, period_id, &records))
    }

    async fn nested_daily_or_fallback(
        &self,
        client_id: &str,
        doc: RollupDocument,
    ) -> Result<NestedRollup, CoreError> {
        let day = NaiveDate::parse_from_str(&doc.id, "%Y-%m-%d")
            .map_err(|e| CoreError::RemoteRead(format!("bad daily rollup id {}: {e}", doc.id)))?;
        let (start, end) = day_bounds_ms(day);
        let id = doc.id.clone();
        self.nested_or_fallback(client_id, doc, &id, start, end).await
    }
}

impl<R: RemoteStore, C: ClientCatalog> Drop for HybridFetchResolver<R, C> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Synthesize a live slice's documents at the requested granularity: one
/// month-keyed document, or one per calendar day so day-axis consumers
/// (the cumulative carbon series) keep working on live months.
fn synthesize_slice(
    client_id: &str,
    period: Period,
    records: &[MeasurementRecord],
    granularity: Granularity,
) -> Vec<NestedRollup> {
    match granularity {
        Granularity::Monthly => {
            vec![synthesize_from_records(client_id, &period.month_key(), records)]
        }
        Granularity::Daily => synthesize_daily_from_records(client_id, records),
    }
}

fn period_bounds(period: Period) -> Result<(i64, i64), CoreError> {
    period.bounds_ms().ok_or_else(|| {
        CoreError::RemoteRead(format!("invalid period {}", period.month_key()))
    })
}
