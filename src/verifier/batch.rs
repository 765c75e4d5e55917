//! Batch Conflict Verifier
//!
//! A batch is accepted only if, in order:
//! 1. it is within the action bound
//! 2. the analysis pass finds no duplicate or conflicting actions
//! 3. every action verifies against the snapshot with all earlier actions
//!    of the batch staged on a copy-on-write overlay
//! 4. per-target event priorities increase in batch order
//! 5. the declared event routes are acyclic
//! 6. aggregate bytes and event counts stay within the batch limits

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::graph::RouteGraph;
use super::{Env, Verifier};
use crate::action::Action;
use crate::error::VerifyError;
use crate::executor;
use crate::state::{self, Overlay, StateReader};

/// Totals for an accepted batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub actions: usize,
    pub events: usize,
    /// Code, storage, parameter and update bytes across the batch
    pub total_bytes: usize,
}

/// Batch-local changes to one object
#[derive(Debug, Default)]
struct Modification {
    created: bool,
    deleted: bool,
    code_changed: bool,
    storage_changed: bool,
}

fn duplicate(index: usize, reason: String) -> VerifyError {
    VerifyError::DuplicateAction { index, reason }
}

fn conflict(index: usize, reason: String) -> VerifyError {
    VerifyError::ConflictingAction { index, reason }
}

/// Cross-action bookkeeping gathered before any action is verified
#[derive(Debug, Default)]
struct Analysis<'a> {
    objects: BTreeMap<&'a str, Modification>,
    /// Per target: (priority, batch index) in batch order
    queues: BTreeMap<&'a str, Vec<(u64, usize)>>,
    regions: BTreeSet<&'a str>,
    inputs: Vec<(usize, &'a str)>,
}

impl<'a> Analysis<'a> {
    fn run(actions: &'a [Action], state: &dyn StateReader) -> Result<Self, VerifyError> {
        let mut an = Self::default();
        for (i, action) in actions.iter().enumerate() {
            an.record(i, action)?;
        }
        an.check_inputs(state)?;
        Ok(an)
    }

    fn record(&mut self, i: usize, action: &'a Action) -> Result<(), VerifyError> {
        match action {
            Action::CreateObject(a) => {
                let m = self.objects.entry(&a.id).or_default();
                if m.created {
                    return Err(duplicate(i, format!("object {} created twice", a.id)));
                }
                if m.deleted {
                    return Err(conflict(i, format!("object {} created after deletion", a.id)));
                }
                m.created = true;
            }
            Action::DeleteObject(a) => {
                let queued = self.queues.get(a.id.as_str()).is_some_and(|q| !q.is_empty());
                let m = self.objects.entry(&a.id).or_default();
                if m.deleted {
                    return Err(duplicate(i, format!("object {} deleted twice", a.id)));
                }
                if m.created {
                    return Err(conflict(i, format!("object {} deleted after creation", a.id)));
                }
                if m.code_changed || m.storage_changed {
                    return Err(conflict(i, format!("object {} deleted after changes", a.id)));
                }
                if queued {
                    return Err(conflict(i, format!("object {} deleted with queued events", a.id)));
                }
                m.deleted = true;
            }
            Action::ChangeObjectCode(a) => {
                let m = self.objects.entry(&a.id).or_default();
                if m.code_changed {
                    return Err(duplicate(i, format!("code of {} changed twice", a.id)));
                }
                if m.deleted {
                    return Err(conflict(i, format!("code change on deleted object {}", a.id)));
                }
                m.code_changed = true;
            }
            Action::ChangeObjectStorage(a) => {
                let m = self.objects.entry(&a.id).or_default();
                if m.storage_changed {
                    return Err(duplicate(i, format!("storage of {} changed twice", a.id)));
                }
                if m.deleted {
                    return Err(conflict(i, format!("storage change on deleted object {}", a.id)));
                }
                m.storage_changed = true;
            }
            Action::SendEvent(a) => {
                if self.objects.get(a.id_to.as_str()).is_some_and(|m| m.deleted) {
                    return Err(conflict(i, format!("event to deleted object {}", a.id_to)));
                }
                let queue = self.queues.entry(&a.id_to).or_default();
                if queue.iter().any(|(p, _)| *p == a.priority) {
                    return Err(duplicate(
                        i,
                        format!("two events to {} with priority {}", a.id_to, a.priority),
                    ));
                }
                queue.push((a.priority, i));
            }
            Action::CreateRegion(a) => {
                if !self.regions.insert(&a.region_id) {
                    return Err(duplicate(i, format!("region {} created twice", a.region_id)));
                }
            }
            Action::SetInputObject(a) => self.inputs.push((i, &a.id)),
            Action::UpdateRegion(_) | Action::ContractVerification(_) | Action::TeeExec(_) => {}
        }
        Ok(())
    }

    fn check_inputs(&self, state: &dyn StateReader) -> Result<(), VerifyError> {
        for &(i, id) in &self.inputs {
            let m = self.objects.get(id);
            if m.is_some_and(|m| m.deleted) {
                return Err(conflict(i, format!("input object {} is deleted in this batch", id)));
            }
            let created = m.is_some_and(|m| m.created);
            if !created && !state::object_exists(state, id) {
                return Err(conflict(
                    i,
                    format!("input object {} neither exists nor is created", id),
                ));
            }
        }
        Ok(())
    }

    /// Priorities must strictly increase per target in batch order
    fn check_event_order(&self) -> Result<(), VerifyError> {
        for (target, queue) in &self.queues {
            for pair in queue.windows(2) {
                let (previous, _) = pair[0];
                let (priority, _) = pair[1];
                if priority <= previous {
                    return Err(VerifyError::InvalidEventOrder {
                        target: target.to_string(),
                        priority,
                        previous,
                    });
                }
            }
        }
        Ok(())
    }
}

fn payload_bytes(action: &Action) -> usize {
    match action {
        Action::CreateObject(a) => a.code.len() + a.storage.len(),
        Action::SendEvent(a) => a.parameters.len(),
        Action::ChangeObjectCode(a) => a.code.len(),
        Action::ChangeObjectStorage(a) => a.storage.len(),
        Action::ContractVerification(a) => a.code.len(),
        Action::TeeExec(a) => a.update_bytes(),
        Action::SetInputObject(_)
        | Action::CreateRegion(_)
        | Action::UpdateRegion(_)
        | Action::DeleteObject(_) => 0,
    }
}

impl Verifier {
    /// Verify an ordered batch against `state`. Never writes.
    pub fn verify_batch(
        &self,
        actions: &[Action],
        env: &Env<'_>,
        state: &dyn StateReader,
    ) -> Result<BatchSummary, VerifyError> {
        let result = self.check_batch(actions, env, state);
        match &result {
            Ok(summary) => log::debug!(
                "Batch accepted: {} actions, {} events, {} bytes",
                summary.actions,
                summary.events,
                summary.total_bytes
            ),
            Err(err) => log::debug!("Batch of {} actions rejected: {}", actions.len(), err),
        }
        result
    }

    fn check_batch(
        &self,
        actions: &[Action],
        env: &Env<'_>,
        state: &dyn StateReader,
    ) -> Result<BatchSummary, VerifyError> {
        let limits = &self.config.batch;
        if actions.len() > limits.max_actions {
            return Err(VerifyError::BatchLimit {
                len: actions.len(),
                max: limits.max_actions,
            });
        }

        let analysis = Analysis::run(actions, state)?;

        let mut overlay = Overlay::new(state);
        for (index, action) in actions.iter().enumerate() {
            let staged = self
                .verify(action, env, &overlay)
                .and_then(|()| executor::apply(action, &mut overlay));
            if let Err(err) = staged {
                return Err(VerifyError::InBatch {
                    index,
                    source: Box::new(err),
                });
            }
        }

        analysis.check_event_order()?;

        let mut graph = RouteGraph::new();
        for action in actions {
            if let Action::SendEvent(e) = action {
                for route in &e.routes {
                    graph.add_edge(&e.id_to, route);
                }
            }
        }
        if let Some(id) = graph.find_cycle() {
            return Err(VerifyError::CircularDependency(id.to_string()));
        }

        let summary = BatchSummary {
            actions: actions.len(),
            events: actions
                .iter()
                .filter(|a| matches!(a, Action::SendEvent(_)))
                .count(),
            total_bytes: actions.iter().map(payload_bytes).sum(),
        };
        if summary.total_bytes > limits.max_total_bytes {
            return Err(VerifyError::BatchResourceExceeded(format!(
                "{} payload bytes, limit {}",
                summary.total_bytes, limits.max_total_bytes
            )));
        }
        if summary.events > limits.max_events {
            return Err(VerifyError::BatchResourceExceeded(format!(
                "{} events, limit {}",
                summary.events, limits.max_events
            )));
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{
        ChangeObjectCode, ChangeObjectStorage, CreateObject, DeleteObject, SetInputObject,
    };
    use crate::config::{BatchLimits, MIB};
    use crate::testkit::{create, create_region, event, time_config, wasm_code, Fixture};

    fn delete(id: &str) -> Action {
        Action::DeleteObject(DeleteObject { id: id.into() })
    }

    fn set_input(id: &str) -> Action {
        Action::SetInputObject(SetInputObject { id: id.into() })
    }

    fn code(id: &str) -> Action {
        Action::ChangeObjectCode(ChangeObjectCode {
            id: id.into(),
            code: wasm_code(),
        })
    }

    fn storage(id: &str) -> Action {
        Action::ChangeObjectStorage(ChangeObjectStorage {
            id: id.into(),
            storage: b"s".to_vec(),
        })
    }

    #[test]
    fn test_duplicate_create() {
        let fx = Fixture::new();
        let batch = [create("a"), create("a")];
        assert!(matches!(
            fx.verifier.verify_batch(&batch, &fx.env(), &fx.state),
            Err(VerifyError::DuplicateAction { index: 1, .. })
        ));
    }

    #[test]
    fn test_create_delete_create() {
        let fx = Fixture::new();
        let batch = [create("a"), delete("a"), create("a")];
        assert!(matches!(
            fx.verifier.verify_batch(&batch, &fx.env(), &fx.state),
            Err(VerifyError::ConflictingAction { .. })
        ));
    }

    #[test]
    fn test_delete_conflicts() {
        let fx = Fixture::new();
        let env = fx.env();
        let duplicates: [&[Action]; 3] = [
            &[delete("plain"), delete("plain")],
            &[code("plain"), code("plain")],
            &[storage("plain"), storage("plain")],
        ];
        for batch in duplicates {
            let err = fx.verifier.verify_batch(batch, &env, &fx.state).unwrap_err();
            assert!(matches!(err, VerifyError::DuplicateAction { index: 1, .. }), "{:?}", err);
        }

        let conflicts: [&[Action]; 6] = [
            &[code("plain"), delete("plain")],
            &[delete("plain"), code("plain")],
            &[storage("plain"), delete("plain")],
            &[delete("plain"), storage("plain")],
            &[event("plain", 1, &[]), delete("plain")],
            &[delete("plain"), event("plain", 1, &[])],
        ];
        for batch in conflicts {
            let err = fx.verifier.verify_batch(batch, &env, &fx.state).unwrap_err();
            assert!(matches!(err, VerifyError::ConflictingAction { index: 1, .. }), "{:?}", err);
        }
    }

    #[test]
    fn test_set_input_targets() {
        let fx = Fixture::new();
        let env = fx.env();
        assert!(matches!(
            fx.verifier.verify_batch(&[set_input("ghost")], &env, &fx.state),
            Err(VerifyError::ConflictingAction { .. })
        ));
        assert!(matches!(
            fx.verifier.verify_batch(&[delete("plain"), set_input("plain")], &env, &fx.state),
            Err(VerifyError::ConflictingAction { .. })
        ));
        let summary = fx
            .verifier
            .verify_batch(&[create("fresh"), set_input("fresh")], &env, &fx.state)
            .unwrap();
        assert_eq!(summary.actions, 2);
    }

    #[test]
    fn test_batch_limit_checked_first() {
        let fx = Fixture::new();
        // every action would also fail verification on its own
        let batch: Vec<Action> = (0..257).map(|_| create("")).collect();
        assert_eq!(
            fx.verifier.verify_batch(&batch, &fx.env(), &fx.state),
            Err(VerifyError::BatchLimit { len: 257, max: 256 })
        );
    }

    #[test]
    fn test_created_object_visible_to_later_actions() {
        let fx = Fixture::new();
        let batch = [create("a"), event("a", 1, &[]), storage("a")];
        let summary = fx.verifier.verify_batch(&batch, &fx.env(), &fx.state).unwrap();
        assert_eq!(summary.events, 1);

        // the same event before the create fails in the per-action pass
        let batch = [event("a", 1, &[]), create("a")];
        let err = fx.verifier.verify_batch(&batch, &fx.env(), &fx.state).unwrap_err();
        assert!(matches!(err, VerifyError::InBatch { index: 0, .. }));
        assert_eq!(err.root(), &VerifyError::ObjectNotFound("a".into()));
    }

    #[test]
    fn test_region_created_in_batch_governs_later_objects() {
        let fx = Fixture::new();
        let mut region = create_region("r2", &[&fx.tee_a, &fx.tee_c]);
        fx.authorize(&mut region, &fx.tee_a, &fx.tee_c);
        let object = Action::CreateObject(CreateObject {
            id: "in-r2".into(),
            code: wasm_code(),
            storage: Vec::new(),
            region: Some("r2".into()),
        });
        let mut send = event("in-r2", 1, &[]);
        fx.authorize(&mut send, &fx.tee_c, &fx.tee_a);

        let batch = [region, object, send];
        assert!(fx.verifier.verify_batch(&batch, &fx.env(), &fx.state).is_ok());
        assert!(!state::object_exists(&fx.state, "in-r2"));
    }

    #[test]
    fn test_duplicate_region_create() {
        let fx = Fixture::new();
        let a = create_region("r2", &[&fx.tee_a]);
        let batch = [a.clone(), a];
        assert!(matches!(
            fx.verifier.verify_batch(&batch, &fx.env(), &fx.state),
            Err(VerifyError::DuplicateAction { index: 1, .. })
        ));
    }

    #[test]
    fn test_event_priorities() {
        let fx = Fixture::new();
        let env = fx.env();
        let same = [event("plain", 5, &[]), event("plain", 5, &[])];
        assert!(matches!(
            fx.verifier.verify_batch(&same, &env, &fx.state),
            Err(VerifyError::DuplicateAction { .. })
        ));

        let backwards = [event("plain", 5, &[]), event("plain", 2, &[])];
        assert_eq!(
            fx.verifier.verify_batch(&backwards, &env, &fx.state),
            Err(VerifyError::InvalidEventOrder {
                target: "plain".into(),
                priority: 2,
                previous: 5
            })
        );

        let forwards = [event("plain", 2, &[]), event("plain", 5, &[])];
        assert!(fx.verifier.verify_batch(&forwards, &env, &fx.state).is_ok());
    }

    #[test]
    fn test_cycle_detection() {
        let fx = Fixture::new();
        let env = fx.env();
        let cyclic = [
            create("A"),
            create("B"),
            event("A", 1, &["B"]),
            event("B", 1, &["A"]),
        ];
        assert!(matches!(
            fx.verifier.verify_batch(&cyclic, &env, &fx.state),
            Err(VerifyError::CircularDependency(_))
        ));

        let chain = [
            create("A"),
            create("B"),
            create("C"),
            event("A", 1, &["B"]),
            event("B", 1, &["C"]),
        ];
        let summary = fx.verifier.verify_batch(&chain, &env, &fx.state).unwrap();
        assert_eq!(summary.actions, 5);
        assert_eq!(summary.events, 2);
    }

    #[test]
    fn test_resource_ceiling() {
        let (mut config, _) = time_config(3);
        config.batch = BatchLimits {
            max_actions: 256,
            max_total_bytes: MIB,
            max_events: 2,
        };
        let verifier = Verifier::new(config).unwrap();
        let fx = Fixture::new();
        let env = fx.env();

        let heavy: Vec<Action> = (0..3)
            .map(|i| {
                Action::CreateObject(CreateObject {
                    id: format!("heavy-{}", i),
                    code: wasm_code(),
                    storage: vec![0; MIB / 2],
                    region: None,
                })
            })
            .collect();
        assert!(matches!(
            verifier.verify_batch(&heavy, &env, &fx.state),
            Err(VerifyError::BatchResourceExceeded(_))
        ));

        let chatty = [
            event("plain", 1, &[]),
            event("plain", 2, &[]),
            event("plain", 3, &[]),
        ];
        assert!(matches!(
            verifier.verify_batch(&chatty, &env, &fx.state),
            Err(VerifyError::BatchResourceExceeded(_))
        ));
    }

    #[test]
    fn test_batch_leaves_snapshot_untouched() {
        let fx = Fixture::new();
        let before = fx.state.clone();
        let batch = [create("x"), delete("plain"), storage("regional")];
        fx.verifier.verify_batch(&batch, &fx.env(), &fx.state).unwrap();
        assert_eq!(fx.state, before);
    }
}
