//! End-to-end pipeline test over in-memory fakes: events tracked by the
//! ingestion service flow through a scripted log into the metering store,
//! and a replayed log leaves the store unchanged.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use common::{
    AnalyticsSink, DomainResult, EventProducer, LogRecord, MeterTransaction, MeterWriter,
    RecordStream, StreamEnvelope, VerifiedEvent,
};
use guidance_worker::domain::{GuidanceLoop, GuidanceSettings};
use ingest_api::domain::{SuccessState, TrackEventsService};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Producer that appends to a shared in-memory log, recording the partition
/// key alongside the payload the way the broker would.
struct InMemoryLogProducer {
    log: Arc<Mutex<Vec<(Vec<u8>, Bytes)>>>,
}

#[async_trait]
impl EventProducer for InMemoryLogProducer {
    async fn produce(&self, event: &VerifiedEvent) -> DomainResult<()> {
        let payload = serde_json::to_vec(&StreamEnvelope::wrap(event.clone())).unwrap();
        self.log.lock().unwrap().push((
            event.organization_id.to_be_bytes().to_vec(),
            Bytes::from(payload),
        ));
        Ok(())
    }
}

/// Stream that serves pre-recorded batches and cancels the loop once the
/// script is exhausted, letting `run` return cleanly.
struct DrainingStream {
    batches: VecDeque<Vec<LogRecord>>,
    committed_batches: Arc<Mutex<usize>>,
    shutdown: CancellationToken,
}

#[async_trait]
impl RecordStream for DrainingStream {
    async fn fetch(
        &mut self,
        _max_records: usize,
        _max_wait: Duration,
    ) -> DomainResult<Vec<LogRecord>> {
        match self.batches.pop_front() {
            Some(batch) => Ok(batch),
            None => {
                self.shutdown.cancel();
                Ok(Vec::new())
            }
        }
    }

    async fn commit_offsets(&mut self) -> DomainResult<()> {
        *self.committed_batches.lock().unwrap() += 1;
        Ok(())
    }
}

#[derive(Default)]
struct StoreState {
    rows: Vec<VerifiedEvent>,
    keys: HashSet<(i64, String)>,
}

struct InMemoryMeterWriter {
    state: Arc<Mutex<StoreState>>,
}

struct InMemoryTransaction {
    staged: Vec<VerifiedEvent>,
    state: Arc<Mutex<StoreState>>,
}

#[async_trait]
impl MeterWriter for InMemoryMeterWriter {
    async fn begin(&self) -> DomainResult<Box<dyn MeterTransaction>> {
        Ok(Box::new(InMemoryTransaction {
            staged: Vec::new(),
            state: Arc::clone(&self.state),
        }))
    }
}

#[async_trait]
impl MeterTransaction for InMemoryTransaction {
    async fn insert_event(&mut self, event: &VerifiedEvent) -> DomainResult<()> {
        self.staged.push(event.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        for event in self.staged {
            let key = (event.organization_id, event.idempotency_id.clone());
            if state.keys.insert(key) {
                state.rows.push(event);
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DomainResult<()> {
        Ok(())
    }
}

struct SilentSink;

impl AnalyticsSink for SilentSink {
    fn record_processed(&self, _counts: HashMap<i64, u64>) {}
}

fn raw_event(idempotency_id: &str) -> common::RawEvent {
    common::RawEvent {
        customer_id: "c1".to_string(),
        idempotency_id: idempotency_id.to_string(),
        time_created: Some(Utc::now()),
        properties: serde_json::Map::new(),
        event_name: "api_call".to_string(),
    }
}

async fn run_guidance(
    records: Vec<LogRecord>,
    state: Arc<Mutex<StoreState>>,
    committed_batches: Arc<Mutex<usize>>,
) {
    let shutdown = CancellationToken::new();
    let stream = DrainingStream {
        batches: VecDeque::from([records]),
        committed_batches,
        shutdown: shutdown.clone(),
    };

    let guidance = GuidanceLoop::new(
        Box::new(stream),
        Arc::new(InMemoryMeterWriter { state }),
        Arc::new(SilentSink),
        GuidanceSettings {
            batch_size: 2,
            fetch_max_records: 100,
            fetch_max_wait: Duration::from_millis(10),
        },
    );

    guidance.run(shutdown).await.unwrap();
}

#[tokio::test]
async fn test_tracked_events_land_in_store_keyed_by_tenant() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let tracker = TrackEventsService::new(Arc::new(InMemoryLogProducer {
        log: Arc::clone(&log),
    }));

    // Three events, one invalid: only two reach the log.
    let invalid = common::RawEvent {
        idempotency_id: String::new(),
        ..raw_event("")
    };
    let outcome = tracker
        .track(
            42,
            vec![raw_event("i1"), invalid, raw_event("i2")],
            Utc::now(),
        )
        .await;
    assert_eq!(outcome.success, SuccessState::Some);

    let produced = log.lock().unwrap().clone();
    assert_eq!(produced.len(), 2);
    for (key, _payload) in &produced {
        assert_eq!(key, &42i64.to_be_bytes().to_vec());
    }

    // Feed the log to the guidance loop.
    let records: Vec<LogRecord> = produced
        .iter()
        .enumerate()
        .map(|(offset, (_key, payload))| LogRecord {
            payload: payload.clone(),
            partition: 0,
            offset: offset as i64,
        })
        .collect();

    let state = Arc::new(Mutex::new(StoreState::default()));
    let committed_batches = Arc::new(Mutex::new(0));
    run_guidance(
        records.clone(),
        Arc::clone(&state),
        Arc::clone(&committed_batches),
    )
    .await;

    {
        let store = state.lock().unwrap();
        assert_eq!(store.rows.len(), 2);
        assert!(store.rows.iter().all(|row| row.organization_id == 42));
    }
    assert_eq!(*committed_batches.lock().unwrap(), 1);

    // Replay the same records, as a restart after a crash between the
    // database commit and the offset commit would. The store is unchanged
    // and the offsets still advance.
    run_guidance(records, Arc::clone(&state), Arc::clone(&committed_batches)).await;

    let store = state.lock().unwrap();
    assert_eq!(store.rows.len(), 2);
    assert_eq!(*committed_batches.lock().unwrap(), 2);
}
