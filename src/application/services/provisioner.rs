use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::{ControlPlane, CreateOutcome, VectorIndex};
use crate::domain::{IndexDescription, IndexSpec, SetupError};
use crate::settings::ReadinessPolicy;

/// Index handle plus what the control plane reported about it.
pub struct ProvisionedIndex {
    pub handle: Arc<dyn VectorIndex>,
    pub description: IndexDescription,
    /// `true` only when this call issued the create that succeeded.
    pub created: bool,
}

/// Make sure `spec.name` exists remotely and return a handle to it.
///
/// Creation happens only when the name is absent from the listing, so the
/// call is safe to repeat. Failures are logged and returned unchanged.
pub fn ensure_index(
    control: &dyn ControlPlane,
    spec: &IndexSpec,
    readiness: &ReadinessPolicy,
) -> Result<ProvisionedIndex, SetupError> {
    provision(control, spec, readiness).map_err(|err| {
        error!(
            target: "pinecone_bootstrap::provision",
            index = %spec.name,
            error = %err,
            "error creating index"
        );
        err
    })
}

fn provision(
    control: &dyn ControlPlane,
    spec: &IndexSpec,
    readiness: &ReadinessPolicy,
) -> Result<ProvisionedIndex, SetupError> {
    spec.validate()?;

    let existing = control.list_index_names()?;
    let (description, created) = if existing.iter().any(|name| name == &spec.name) {
        debug!(
            target: "pinecone_bootstrap::provision",
            index = %spec.name,
            "index already present"
        );
        let description = control.describe_index(&spec.name)?;
        warn_on_mismatch(&description, spec);
        (description, false)
    } else {
        info!(
            target: "pinecone_bootstrap::provision",
            index = %spec.name,
            dimension = spec.dimension,
            metric = %spec.metric,
            deployment = %spec.spec,
            "creating index"
        );
        match control.create_index(spec)? {
            CreateOutcome::Created(description) => {
                let description = if description.is_ready() {
                    description
                } else {
                    wait_until_ready(control, &spec.name, readiness)?
                };
                (description, true)
            }
            CreateOutcome::AlreadyExists => {
                warn!(
                    target: "pinecone_bootstrap::provision",
                    index = %spec.name,
                    "index was created concurrently; using the existing one"
                );
                let description = wait_until_ready(control, &spec.name, readiness)?;
                warn_on_mismatch(&description, spec);
                (description, false)
            }
        }
    };

    let handle = control.open_index(&description)?;

    Ok(ProvisionedIndex {
        handle,
        description,
        created,
    })
}

fn wait_until_ready(
    control: &dyn ControlPlane,
    name: &str,
    policy: &ReadinessPolicy,
) -> Result<IndexDescription, SetupError> {
    let started = Instant::now();
    loop {
        let description = control.describe_index(name)?;
        if description.is_ready() {
            return Ok(description);
        }
        if started.elapsed() >= policy.timeout {
            return Err(SetupError::provisioning(format!(
                "index `{name}` not ready after {:?} (state: {})",
                policy.timeout, description.status.state
            )));
        }
        debug!(
            target: "pinecone_bootstrap::provision",
            index = %name,
            state = %description.status.state,
            "waiting for index to become ready"
        );
        thread::sleep(policy.poll_interval);
    }
}

fn warn_on_mismatch(description: &IndexDescription, spec: &IndexSpec) {
    let diffs = description.mismatches(spec);
    if !diffs.is_empty() {
        warn!(
            target: "pinecone_bootstrap::provision",
            index = %spec.name,
            differences = %diffs.join(", "),
            "existing index differs from the requested spec"
        );
    }
}
