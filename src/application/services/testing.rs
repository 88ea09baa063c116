//! In-memory fakes for the service traits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ControlPlane, CreateOutcome, DeviceProbe, VectorIndex};
use crate::domain::{
    IndexDescription, IndexList, IndexSpec, IndexStats, IndexStatus, QueryMatch, QueryRequest,
    SetupError, VectorRecord,
};

pub struct FakeProbe {
    pub cuda: bool,
    pub calls: AtomicUsize,
}

impl FakeProbe {
    pub fn new(cuda: bool) -> Self {
        Self {
            cuda,
            calls: AtomicUsize::new(0),
        }
    }
}

impl DeviceProbe for FakeProbe {
    fn cuda_available(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cuda
    }
}

pub fn ready_description(spec: &IndexSpec) -> IndexDescription {
    IndexDescription {
        name: spec.name.clone(),
        dimension: Some(spec.dimension),
        metric: spec.metric,
        host: format!("{}-fake.svc.pinecone.io", spec.name),
        spec: Some(spec.spec.clone()),
        status: IndexStatus {
            ready: true,
            state: "Ready".into(),
        },
    }
}

/// Control plane keeping indexes in memory and counting calls.
#[derive(Default)]
pub struct FakeControlPlane {
    pub indexes: Mutex<Vec<IndexDescription>>,
    pub created: Mutex<Vec<IndexSpec>>,
    pub list_calls: AtomicUsize,
    pub describe_calls: AtomicUsize,
    /// Number of describe calls that report "Initializing" after a create.
    pub pending_polls: AtomicUsize,
    /// Pretend another process creates the index right before we do.
    pub lose_create_race: bool,
    /// Answer creates with an index that is still initializing.
    pub create_not_ready: bool,
    pub reject_create: Option<String>,
}

impl FakeControlPlane {
    pub fn with_index(spec: &IndexSpec) -> Self {
        let plane = Self::default();
        plane.indexes.lock().push(ready_description(spec));
        plane
    }

    pub fn create_calls(&self) -> usize {
        self.created.lock().len()
    }
}

impl ControlPlane for FakeControlPlane {
    fn list_indexes(&self) -> Result<IndexList, SetupError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(IndexList {
            indexes: self.indexes.lock().clone(),
        })
    }

    fn create_index(&self, spec: &IndexSpec) -> Result<CreateOutcome, SetupError> {
        if let Some(reason) = &self.reject_create {
            return Err(SetupError::provisioning(reason.clone()));
        }
        self.created.lock().push(spec.clone());
        let description = ready_description(spec);
        self.indexes.lock().push(description.clone());
        if self.lose_create_race {
            return Ok(CreateOutcome::AlreadyExists);
        }
        if self.create_not_ready {
            return Ok(CreateOutcome::Created(IndexDescription {
                status: IndexStatus {
                    ready: false,
                    state: "Initializing".into(),
                },
                ..description
            }));
        }
        Ok(CreateOutcome::Created(description))
    }

    fn describe_index(&self, name: &str) -> Result<IndexDescription, SetupError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let mut description = self
            .indexes
            .lock()
            .iter()
            .find(|index| index.name == name)
            .cloned()
            .ok_or_else(|| SetupError::provisioning(format!("index `{name}` not found")))?;

        let pending = self.pending_polls.load(Ordering::SeqCst);
        if pending > 0 {
            self.pending_polls.store(pending - 1, Ordering::SeqCst);
            description.status = IndexStatus {
                ready: false,
                state: "Initializing".into(),
            };
        }
        Ok(description)
    }

    fn open_index(
        &self,
        description: &IndexDescription,
    ) -> Result<Arc<dyn VectorIndex>, SetupError> {
        Ok(Arc::new(FakeIndex {
            name: description.name.clone(),
            host: description.host.clone(),
            records: Mutex::new(VecDeque::new()),
        }))
    }
}

pub struct FakeIndex {
    pub name: String,
    pub host: String,
    pub records: Mutex<VecDeque<VectorRecord>>,
}

impl VectorIndex for FakeIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn describe_stats(&self) -> Result<IndexStats, SetupError> {
        Ok(IndexStats {
            total_vector_count: self.records.lock().len() as u64,
            ..IndexStats::default()
        })
    }

    fn upsert(
        &self,
        records: &[VectorRecord],
        _namespace: Option<&str>,
    ) -> Result<usize, SetupError> {
        self.records.lock().extend(records.iter().cloned());
        Ok(records.len())
    }

    fn query(&self, request: &QueryRequest) -> Result<Vec<QueryMatch>, SetupError> {
        Ok(self
            .records
            .lock()
            .iter()
            .take(request.top_k)
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: 1.0,
                metadata: record.metadata.clone(),
            })
            .collect())
    }
}
