// ============================================================================
// Dependency-aware creation planning
//
// Types are placed incrementally in the order they first appear. A type
// referencing an already-placed type is fine as-is; a placed type
// referencing a newcomer pulls the newcomer in front of it, unless the
// newcomer itself references something at or past that slot. Pulling it
// forward would then disturb an established placement, so the pulling
// field is marked cyclic instead: withheld at creation and patched by a
// follow-up update. Same-type references are always patched, never
// reordered. Association rows demand both side types first because an
// intersect row cannot be patched into existence, so sides expand
// depth-first behind in-progress markers.
// ============================================================================

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::bulk::CyclicFieldCache;
use crate::core::{Record, Result, ServiceError, Value};
use crate::schema::{RelationshipDef, SchemaCatalog};

/// A reference field withheld while its group is created and applied by
/// a second-pass update.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeferredField {
    pub entity: String,
    pub field: String,
}

/// Records of one type, kept in the order the caller supplied them.
#[derive(Debug, Clone)]
pub struct CreationGroup {
    pub entity: String,
    pub records: Vec<Record>,
}

/// Output of planning: create the groups front to back with deferred
/// fields withheld, then patch those fields via updates.
#[derive(Debug, Clone)]
pub struct CreationPlan {
    pub groups: Vec<CreationGroup>,
    pub deferred: Vec<DeferredField>,
}

impl CreationPlan {
    pub fn is_deferred(&self, entity: &str, field: &str) -> bool {
        self.deferred
            .iter()
            .any(|d| d.entity == entity && d.field == field)
    }

    pub fn deferred_for(&self, entity: &str) -> Vec<&DeferredField> {
        self.deferred.iter().filter(|d| d.entity == entity).collect()
    }

    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }
}

type Edge = (String, String);

pub struct CreationPlanner<'a> {
    catalog: &'a SchemaCatalog,
    cache: &'a CyclicFieldCache,
}

impl<'a> CreationPlanner<'a> {
    pub fn new(catalog: &'a SchemaCatalog, cache: &'a CyclicFieldCache) -> Self {
        Self { catalog, cache }
    }

    pub fn plan(&self, records: Vec<Record>) -> Result<CreationPlan> {
        let mut type_order: Vec<String> = Vec::new();
        let mut by_type: HashMap<String, Vec<Record>> = HashMap::new();
        for record in records {
            self.catalog.entity(&record.entity)?;
            if !by_type.contains_key(&record.entity) {
                type_order.push(record.entity.clone());
            }
            by_type.entry(record.entity.clone()).or_default().push(record);
        }

        let mut deferred: BTreeSet<(String, String)> = BTreeSet::new();
        let edges = self.collect_edges(&type_order, &by_type, &mut deferred);

        let mut placements: Vec<String> = Vec::new();
        for entity in &type_order {
            let mut in_progress = Vec::new();
            self.place(
                entity,
                &type_order,
                &edges,
                &mut placements,
                &mut deferred,
                &mut in_progress,
            )?;
        }

        debug!(order = ?placements, deferred = deferred.len(), "creation plan computed");

        let groups = placements
            .into_iter()
            .map(|entity| {
                let records = by_type.remove(&entity).unwrap_or_default();
                CreationGroup { entity, records }
            })
            .collect();
        let deferred = deferred
            .into_iter()
            .map(|(entity, field)| DeferredField { entity, field })
            .collect();
        Ok(CreationPlan { groups, deferred })
    }

    /// Distinct live reference edges per type. Same-type references and
    /// fields already known to be cyclic carry no ordering pressure; they
    /// go straight to the deferred set.
    fn collect_edges(
        &self,
        type_order: &[String],
        by_type: &HashMap<String, Vec<Record>>,
        deferred: &mut BTreeSet<(String, String)>,
    ) -> HashMap<String, Vec<Edge>> {
        let mut edges = HashMap::new();
        for entity in type_order {
            let mut seen: BTreeSet<Edge> = BTreeSet::new();
            for record in by_type.get(entity).map(Vec::as_slice).unwrap_or(&[]) {
                for (field, value) in &record.attributes {
                    let Value::Reference(target) = value else {
                        continue;
                    };
                    if target.entity == *entity {
                        self.cache.note(entity, field);
                        deferred.insert((entity.clone(), field.clone()));
                        continue;
                    }
                    if self.cache.is_cyclic(entity, field) {
                        deferred.insert((entity.clone(), field.clone()));
                        continue;
                    }
                    seen.insert((field.clone(), target.entity.clone()));
                }
            }
            edges.insert(entity.clone(), seen.into_iter().collect());
        }
        edges
    }

    fn place(
        &self,
        entity: &str,
        batch: &[String],
        edges: &HashMap<String, Vec<Edge>>,
        placements: &mut Vec<String>,
        deferred: &mut BTreeSet<(String, String)>,
        in_progress: &mut Vec<String>,
    ) -> Result<()> {
        if placements.iter().any(|p| p == entity) {
            return Ok(());
        }
        if in_progress.iter().any(|p| p == entity) {
            let mut chain = in_progress.clone();
            chain.push(entity.to_string());
            return Err(ServiceError::PrerequisiteLoop { chain });
        }
        in_progress.push(entity.to_string());

        if let Some(RelationshipDef::ManyToMany { side_a, side_b, .. }) =
            self.catalog.intersect_relationship(entity)
        {
            let sides = [side_a.entity.clone(), side_b.entity.clone()];
            for side in sides {
                if batch.iter().any(|t| *t == side) {
                    self.place(&side, batch, edges, placements, deferred, in_progress)?;
                }
            }
        }

        self.place_single(entity, edges, placements, deferred);
        in_progress.pop();
        Ok(())
    }

    fn place_single(
        &self,
        entity: &str,
        edges: &HashMap<String, Vec<Edge>>,
        placements: &mut Vec<String>,
        deferred: &mut BTreeSet<(String, String)>,
    ) {
        let mut referencers: Vec<(usize, String, String)> = Vec::new();
        for (position, placed) in placements.iter().enumerate() {
            for (field, target) in edges.get(placed).map(Vec::as_slice).unwrap_or(&[]) {
                if target == entity && !deferred.contains(&(placed.clone(), field.clone())) {
                    referencers.push((position, placed.clone(), field.clone()));
                }
            }
        }
        if referencers.is_empty() {
            placements.push(entity.to_string());
            return;
        }

        let insert_at = referencers.iter().map(|(p, _, _)| *p).min().unwrap_or(0);
        let own_edges = edges.get(entity).map(Vec::as_slice).unwrap_or(&[]);
        let blocked = own_edges.iter().any(|(field, target)| {
            !deferred.contains(&(entity.to_string(), field.clone()))
                && placements
                    .iter()
                    .position(|p| p == target)
                    .map(|pos| pos >= insert_at)
                    .unwrap_or(false)
        });

        if blocked {
            // Moving this type in front of its referencers would also have
            // to move types they already settled behind. The referencing
            // fields get patched later instead.
            for (_, placed, field) in referencers {
                self.cache.note(&placed, &field);
                deferred.insert((placed, field));
            }
            placements.push(entity.to_string());
        } else {
            placements.insert(insert_at, entity.to_string());
        }
    }
}
