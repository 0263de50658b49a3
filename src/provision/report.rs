//! Per-run outcome reporting
//!
//! Every resource a run touches gets one entry, in the order it was
//! attempted. Callers derive the overall status from the entries instead of
//! relying on a single error value.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::{ResourceKind, SubmitError};
use crate::context::Tenant;
use crate::materialize::MaterializeError;

/// Which operation a report describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Create the tenant's resources
    Provision,
    /// Delete the tenant's resources
    Deprovision,
}

/// Classified failure reasons
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Config source file could not be read
    ReadFailure,
    /// Config template failed to parse or render
    TemplateFailure,
    /// Config payload could not be encoded into the object
    EncodingFailure,
    /// The cluster API rejected or failed to apply an object
    ResourceSubmissionFailure,
}

impl From<&MaterializeError> for FailureKind {
    fn from(err: &MaterializeError) -> Self {
        match err {
            MaterializeError::Read { .. } => Self::ReadFailure,
            MaterializeError::Template(_) => Self::TemplateFailure,
            MaterializeError::Encoding { .. } | MaterializeError::Serialization(_) => {
                Self::EncodingFailure
            }
        }
    }
}

/// What happened to one resource
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum Outcome {
    /// Object was created
    Created,
    /// Object was already present; nothing changed
    AlreadyExists,
    /// Object was deleted
    Deleted,
    /// Object to delete did not exist
    Absent,
    /// Object was never submitted because its contents could not be produced
    Skipped {
        /// Classified reason
        kind: FailureKind,
        /// Human readable detail
        reason: String,
    },
    /// Submission failed
    Failed {
        /// Classified reason
        kind: FailureKind,
        /// Human readable detail
        reason: String,
    },
}

impl Outcome {
    /// Outcome of a create call
    pub fn from_create(result: Result<(), SubmitError>) -> Self {
        match result {
            Ok(()) => Self::Created,
            Err(SubmitError::AlreadyExists(_)) => Self::AlreadyExists,
            Err(e) => Self::Failed {
                kind: FailureKind::ResourceSubmissionFailure,
                reason: e.to_string(),
            },
        }
    }

    /// Outcome of a delete call
    pub fn from_delete(result: Result<(), SubmitError>) -> Self {
        match result {
            Ok(()) => Self::Deleted,
            Err(SubmitError::NotFound(_)) => Self::Absent,
            Err(e) => Self::Failed {
                kind: FailureKind::ResourceSubmissionFailure,
                reason: e.to_string(),
            },
        }
    }

    /// Outcome of a config object whose contents could not be produced
    pub fn skipped(err: &MaterializeError) -> Self {
        Self::Skipped {
            kind: err.into(),
            reason: err.to_string(),
        }
    }

    /// Whether the resource ended up in the desired state
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::AlreadyExists | Self::Deleted | Self::Absent
        )
    }
}

/// One entry of a report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOutcome {
    /// Object kind
    pub kind: ResourceKind,
    /// Object name
    pub name: String,
    /// What happened
    pub outcome: Outcome,
}

/// Aggregate status of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    /// Every resource ended up in the desired state
    Succeeded,
    /// Some resources failed, some succeeded
    PartiallySucceeded,
    /// No resource succeeded
    Failed,
    /// The run touched no resources
    Empty,
}

/// Ordered record of everything one run did
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionReport {
    /// Tenant the run was for
    pub tenant: Tenant,
    /// Run identifier, also attached to the run's log lines
    pub run_id: Uuid,
    /// Provision or deprovision
    pub operation: Operation,
    /// Per-resource outcomes in attempt order
    pub outcomes: Vec<ResourceOutcome>,
}

impl ProvisionReport {
    /// Start an empty report
    pub fn new(tenant: Tenant, run_id: Uuid, operation: Operation) -> Self {
        Self {
            tenant,
            run_id,
            operation,
            outcomes: Vec::new(),
        }
    }

    /// Append an outcome
    pub fn record(&mut self, kind: ResourceKind, name: impl Into<String>, outcome: Outcome) {
        self.outcomes.push(ResourceOutcome {
            kind,
            name: name.into(),
            outcome,
        });
    }

    /// Aggregate status
    pub fn status(&self) -> RunStatus {
        let ok = self.outcomes.iter().filter(|o| o.outcome.is_success()).count();
        match (ok, self.outcomes.len()) {
            (_, 0) => RunStatus::Empty,
            (ok, total) if ok == total => RunStatus::Succeeded,
            (0, _) => RunStatus::Failed,
            _ => RunStatus::PartiallySucceeded,
        }
    }

    /// Entries that did not reach the desired state
    pub fn failures(&self) -> impl Iterator<Item = &ResourceOutcome> {
        self.outcomes.iter().filter(|o| !o.outcome.is_success())
    }

    /// The last failing entry, if any
    pub fn last_failure(&self) -> Option<&ResourceOutcome> {
        self.failures().last()
    }

    /// Names recorded for one kind, in order
    pub fn names(&self, kind: ResourceKind) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.kind == kind)
            .map(|o| o.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ProvisionReport {
        ProvisionReport::new(Tenant::parse("acme").unwrap(), Uuid::nil(), Operation::Provision)
    }

    fn failed(reason: &str) -> Outcome {
        Outcome::Failed {
            kind: FailureKind::ResourceSubmissionFailure,
            reason: reason.to_string(),
        }
    }

    #[test]
    fn story_status_distinguishes_full_partial_and_none() {
        let mut r = report();
        assert_eq!(r.status(), RunStatus::Empty);

        r.record(ResourceKind::Deployment, "foo-acme", Outcome::Created);
        r.record(ResourceKind::Service, "foo-acme", Outcome::AlreadyExists);
        assert_eq!(r.status(), RunStatus::Succeeded);

        r.record(ResourceKind::ConfigMap, "app-acme", failed("boom"));
        assert_eq!(r.status(), RunStatus::PartiallySucceeded);

        let mut r = report();
        r.record(ResourceKind::ConfigMap, "app-acme", failed("boom"));
        assert_eq!(r.status(), RunStatus::Failed);
    }

    #[test]
    fn story_last_failure_keeps_the_legacy_signal() {
        let mut r = report();
        r.record(ResourceKind::Deployment, "foo-acme", failed("first"));
        r.record(ResourceKind::Service, "foo-acme", Outcome::Created);
        r.record(ResourceKind::AccessRule, "app-acme", failed("second"));

        assert_eq!(r.failures().count(), 2);
        let last = r.last_failure().unwrap();
        assert_eq!(last.kind, ResourceKind::AccessRule);
        assert_eq!(last.outcome, failed("second"));
    }

    #[test]
    fn story_submit_errors_classify_into_outcomes() {
        assert_eq!(Outcome::from_create(Ok(())), Outcome::Created);
        assert_eq!(
            Outcome::from_create(Err(SubmitError::AlreadyExists("x".into()))),
            Outcome::AlreadyExists
        );
        assert!(!Outcome::from_create(Err(SubmitError::Invalid("x".into()))).is_success());

        assert_eq!(
            Outcome::from_delete(Err(SubmitError::NotFound("x".into()))),
            Outcome::Absent
        );
        assert!(!Outcome::from_delete(Err(SubmitError::Connectivity("x".into()))).is_success());
    }

    #[test]
    fn story_materialize_errors_keep_their_kind() {
        let read = MaterializeError::Read {
            path: "/assets/missing".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(matches!(
            Outcome::skipped(&read),
            Outcome::Skipped { kind: FailureKind::ReadFailure, .. }
        ));

        // A non UTF-8 static payload never went near a template
        let binary = MaterializeError::Encoding {
            path: "/assets/logo.png".into(),
        };
        assert_eq!(FailureKind::from(&binary), FailureKind::EncodingFailure);
        assert_eq!(
            FailureKind::from(&MaterializeError::Serialization("bad".into())),
            FailureKind::EncodingFailure
        );
    }

    #[test]
    fn story_report_serializes_for_callers() {
        let mut r = report();
        r.record(ResourceKind::ConfigMap, "settings-acme-0", failed("nope"));
        let json = serde_json::to_value(&r).unwrap();

        assert_eq!(json["tenant"], "acme");
        assert_eq!(json["operation"], "provision");
        assert_eq!(json["outcomes"][0]["kind"], "ConfigMap");
        assert_eq!(json["outcomes"][0]["outcome"]["result"], "failed");
        assert_eq!(
            json["outcomes"][0]["outcome"]["kind"],
            "resourceSubmissionFailure"
        );
    }
}
