//! Catalog persistence as a JSON document.
//!
//! Trees are stored nested (`NodeSpec`) and rebuilt into arenas on load.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::application::ApplicationError;
use crate::domain::{
    Catalog, DomainError, EntityId, NodeSpec, Operation, StructureUsage, Technology, TechnologyId,
    TreeBuilder,
};
use crate::infrastructure::traits::FileSystem;
use crate::infrastructure::{InfraError, InfraResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogDocument {
    pub sequence: u64,
    pub technologies: Vec<TechnologyDocument>,
    pub operations: Vec<Operation>,
    pub structure_usages: Vec<StructureUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnologyDocument {
    pub id: TechnologyId,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_components: Option<NodeSpec>,
}

impl CatalogDocument {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            sequence: catalog.sequence(),
            technologies: catalog
                .technologies()
                .map(|t| TechnologyDocument {
                    id: t.id,
                    number: t.number.clone(),
                    product: t.product,
                    operation_components: TreeBuilder::export(&t.operation_components),
                })
                .collect(),
            operations: catalog.operations().cloned().collect(),
            structure_usages: catalog.structure_usages().to_vec(),
        }
    }

    pub fn into_catalog(self) -> Result<Catalog, DomainError> {
        let mut catalog = Catalog::new();
        let mut builder = TreeBuilder::new();

        for doc in self.technologies {
            let mut technology = Technology::new(doc.id, doc.number, doc.product);
            if let Some(root) = &doc.operation_components {
                technology.operation_components = builder.build(doc.id, root)?;
            }
            catalog.bump_sequence(highest_identity(&technology));
            catalog.add_technology(technology)?;
        }
        for operation in self.operations {
            catalog.add_operation(operation);
        }
        for usage in self.structure_usages {
            catalog.add_structure_usage(usage);
        }
        catalog.bump_sequence(self.sequence);
        Ok(catalog)
    }
}

/// Largest component or row identity stored in the technology's tree.
fn highest_identity(technology: &Technology) -> u64 {
    technology
        .operation_components
        .iter()
        .flat_map(|(_, node)| {
            let rows = node
                .data
                .attributes
                .iter()
                .filter_map(|(_, value)| value.as_has_many())
                .flatten()
                .filter_map(|row| row.id);
            node.data.id.into_iter().chain(rows)
        })
        .map(|id| id.0)
        .max()
        .unwrap_or(0)
}

/// Loads and saves catalogs through the filesystem boundary.
pub struct CatalogStore {
    fs: Arc<dyn FileSystem>,
}

impl CatalogStore {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Load the catalog at `path`. A missing file is an empty catalog.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> InfraResult<Catalog> {
        if !self.fs.exists(path) {
            debug!("no catalog at {}, starting empty", path.display());
            return Ok(Catalog::new());
        }

        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| InfraError::io(format!("read {}", path.display()), e))?;
        let document: CatalogDocument =
            serde_json::from_str(&content).map_err(|source| InfraError::Store {
                path: path.to_path_buf(),
                source,
            })?;
        let catalog = document
            .into_catalog()
            .map_err(|e| InfraError::Application(ApplicationError::Domain(e)))?;
        debug!(
            "loaded {} technologies from {}",
            catalog.technologies().count(),
            path.display()
        );
        Ok(catalog)
    }

    /// Save `catalog` to `path`, replacing the file only once the new content is written.
    #[instrument(level = "debug", skip(self, catalog))]
    pub fn save(&self, path: &Path, catalog: &Catalog) -> InfraResult<()> {
        let document = CatalogDocument::from_catalog(catalog);
        let content =
            serde_json::to_string_pretty(&document).map_err(|source| InfraError::Store {
                path: path.to_path_buf(),
                source,
            })?;

        self.fs
            .ensure_parent(path)
            .map_err(|e| InfraError::io(format!("create parent of {}", path.display()), e))?;
        let staging = path.with_extension("json.tmp");
        self.fs
            .write(&staging, &content)
            .map_err(|e| InfraError::io(format!("write {}", staging.display()), e))?;
        if let Err(e) = self.fs.rename(&staging, path) {
            if let Err(cleanup) = self.fs.remove_file(&staging) {
                warn!("could not remove {}: {}", staging.display(), cleanup);
            }
            return Err(InfraError::io(format!("replace {}", path.display()), e));
        }
        Ok(())
    }
}
