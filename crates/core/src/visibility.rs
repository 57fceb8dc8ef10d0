//! Open/export relaxations between components.

use crate::capability::CapabilityGrantor;
use crate::error::VisibilityError;
use crate::graph::GraphLayer;
use bootshim_api::{Accessor, Relation, RelaxationRequest};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// One granted relation: `component/package` is visible to `accessor`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Relaxation {
    pub component: String,
    pub package: String,
    pub accessor: Accessor,
    pub relation: Relation,
}

/// Set of relaxations recorded on one layer. Set semantics make every grant
/// idempotent and the end state independent of application order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisibilityTable {
    entries: BTreeSet<Relaxation>,
}

impl VisibilityTable {
    /// Returns `false` if the relaxation was already present.
    pub fn insert(&mut self, relaxation: Relaxation) -> bool {
        self.entries.insert(relaxation)
    }

    pub fn allows(&self, component: &str, package: &str, accessor: &Accessor, relation: Relation) -> bool {
        self.entries.iter().any(|r| {
            r.component == component
                && r.package == package
                && r.relation == relation
                && &r.accessor == accessor
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relaxation> {
        self.entries.iter()
    }
}

/// Applies `requests` to `layer` in order and returns how many new relations
/// were granted.
///
/// The source component must exist. Named targets that are not part of the
/// layer are skipped so optional components can be absent.
pub fn relax(
    layer: &GraphLayer,
    requests: &[RelaxationRequest],
    grantor: &CapabilityGrantor,
) -> Result<usize, VisibilityError> {
    let mut granted = 0;
    for request in requests {
        if layer.find_component(&request.source).is_none() {
            return Err(VisibilityError::UnknownComponent {
                name: request.source.clone(),
                flag: request.relation.flag(),
            });
        }

        let target = &request.target;
        if target.all_unnamed && !grantor.supports_blanket() {
            return Err(VisibilityError::BlanketUnavailable {
                component: request.source.clone(),
                package: request.package.clone(),
            });
        }

        for name in &target.named {
            if layer.find_component(name).is_none() {
                trace!(
                    "Skipping {} {}/{} to absent component {}",
                    request.relation.flag(),
                    request.source,
                    request.package,
                    name
                );
                continue;
            }
            if grantor.relax(
                layer,
                &request.source,
                &request.package,
                Accessor::named(name.as_str()),
                request.relation,
            ) {
                granted += 1;
            }
        }
        if target.all_unnamed
            && grantor.relax(
                layer,
                &request.source,
                &request.package,
                Accessor::Unnamed,
                request.relation,
            )
        {
            granted += 1;
        }
    }

    debug!("Applied {} visibility relaxations", granted);
    Ok(granted)
}

/// Parses every value of one relaxation flag.
pub fn parse_requests(values: &[String], relation: Relation) -> Result<Vec<RelaxationRequest>, VisibilityError> {
    values
        .iter()
        .map(|value| RelaxationRequest::parse(value, relation).map_err(VisibilityError::from))
        .collect()
}
