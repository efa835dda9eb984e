//! Dependency ordering of models.
//!
//! Models are emitted so that every table referenced by a foreign key comes
//! before the table referencing it. Cycles are tolerated: a table already on
//! the current path is skipped, so every model is emitted exactly once.

use std::collections::HashSet;

use indexmap::IndexMap;
use smol_str::SmolStr;
use strata_schema::{ModelDescriptor, ModelRef, ModelSource};
use tracing::{debug, trace};

use crate::error::MigrateResult;

/// A [`ModelRef`] after resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedModel {
    /// A literal table name without descriptor.
    Table(SmolStr),
    /// A described model.
    Model(ModelDescriptor),
}

impl ResolvedModel {
    /// Resolve a reference, describing the model if it is one.
    pub fn resolve(model: &ModelRef) -> MigrateResult<Self> {
        Ok(match model {
            ModelRef::Table(name) => Self::Table(name.clone()),
            ModelRef::Model(source) => Self::Model(source.describe()?),
        })
    }

    /// The table name.
    pub fn table(&self) -> &str {
        match self {
            Self::Table(name) => name,
            Self::Model(model) => &model.table,
        }
    }

    /// The descriptor, if there is one.
    pub fn descriptor(&self) -> Option<&ModelDescriptor> {
        match self {
            Self::Table(_) => None,
            Self::Model(model) => Some(model),
        }
    }
}

impl From<ResolvedModel> for ModelRef {
    fn from(model: ResolvedModel) -> Self {
        match model {
            ResolvedModel::Table(name) => ModelRef::Table(name),
            ResolvedModel::Model(model) => ModelRef::from(model),
        }
    }
}

#[derive(Debug)]
struct Dependency {
    model: ModelDescriptor,
    depends_on: Vec<(SmolStr, Option<ModelSource>)>,
}

impl Dependency {
    fn new(model: ModelDescriptor) -> Self {
        let depends_on = model
            .dependencies()
            .into_iter()
            .map(|c| (c.reference_table.clone(), c.reference_model.clone()))
            .collect();
        Self { model, depends_on }
    }
}

struct Resolver {
    graph: IndexMap<SmolStr, Dependency>,
    placed: HashSet<SmolStr>,
    visiting: HashSet<SmolStr>,
    ordered: Vec<SmolStr>,
    auto_discover: bool,
}

impl Resolver {
    fn place(&mut self, table: &SmolStr) -> MigrateResult<()> {
        if self.placed.contains(table) || !self.visiting.insert(table.clone()) {
            return Ok(());
        }

        let depends_on = match self.graph.get(table) {
            Some(dep) => dep.depends_on.clone(),
            None => return Ok(()),
        };

        for (reference, source) in depends_on {
            if self.graph.contains_key(&reference) {
                self.place(&reference)?;
                continue;
            }

            match source {
                Some(source) if self.auto_discover => {
                    let model = source.describe()?;
                    let discovered = model.table.clone();
                    debug!(
                        table = %table,
                        dependency = %discovered,
                        "Discovered referenced model"
                    );
                    if !self.graph.contains_key(&discovered) {
                        self.graph.insert(discovered.clone(), Dependency::new(model));
                    }
                    self.place(&discovered)?;
                }
                _ => trace!(
                    table = %table,
                    dependency = %reference,
                    "Skipping dependency outside the migration set"
                ),
            }
        }

        self.visiting.remove(table);
        self.placed.insert(table.clone());
        self.ordered.push(table.clone());
        Ok(())
    }
}

/// Order models so referenced tables come first.
///
/// Literal table names are returned first, in input order. Described models
/// follow in dependency order, ties broken by input order. With
/// `auto_discover`, models referenced through a constraint's
/// [`ModelSource`] but missing from `models` are described and included.
pub fn reorder(models: &[ModelRef], auto_discover: bool) -> MigrateResult<Vec<ResolvedModel>> {
    let mut literals = Vec::new();
    let mut graph = IndexMap::new();

    for model in models {
        match model {
            ModelRef::Table(name) => literals.push(ResolvedModel::Table(name.clone())),
            ModelRef::Model(source) => {
                let model = source.describe()?;
                // Later descriptions replace earlier ones in place.
                graph.insert(model.table.clone(), Dependency::new(model));
            }
        }
    }

    let mut resolver = Resolver {
        graph,
        placed: HashSet::new(),
        visiting: HashSet::new(),
        ordered: Vec::new(),
        auto_discover,
    };

    let roots: Vec<SmolStr> = resolver.graph.keys().cloned().collect();
    for table in &roots {
        resolver.place(table)?;
    }

    let Resolver {
        mut graph, ordered, ..
    } = resolver;

    literals.extend(
        ordered
            .iter()
            .filter_map(|table| graph.swap_remove(table))
            .map(|dep| ResolvedModel::Model(dep.model)),
    );
    Ok(literals)
}
