//! Schema registry and engine handle lifecycle.
//!
//! The [`SchemaRegistry`] owns the engine handle and the table map. All
//! state sits behind one `RwLock`: [`initialize`](SchemaRegistry::initialize)
//! takes the write lock for the whole close/open/swap sequence, and every
//! facade operation holds the read lock while it talks to the engine, so a
//! reader always sees the tables and handle of the latest completed
//! initialize.
//!
//! A handle is closed exactly once: by the next initialize, by
//! [`teardown`](SchemaRegistry::teardown), or by the teardown callback
//! registered with the [`LifecycleHook`], whichever comes first. Callbacks
//! carry the generation they were registered for and ignore later ones.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tracing::{debug, error, info, warn};

use crate::convert::{RowConverter, build_row_converter};
use crate::engine::{Engine, EngineHandle};
use crate::error::{Result, StoreError};
use crate::identity::TableIdentity;
use crate::lifecycle::LifecycleHook;
use crate::schema::{DEFAULT_VERSION, TableSchema};

/// Description used when registering the teardown callback.
pub const TEARDOWN_DESCRIPTION: &str = "close database connection";

/// Identity descriptor and row converter registered for one table.
#[derive(Clone)]
pub struct RegisteredTable {
    identity: TableIdentity,
    row_converter: RowConverter,
}

impl RegisteredTable {
    /// Write descriptor.
    pub fn identity(&self) -> &TableIdentity {
        &self.identity
    }

    /// Read converter.
    pub fn row_converter(&self) -> &RowConverter {
        &self.row_converter
    }
}

impl std::fmt::Debug for RegisteredTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTable")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

struct RegistryState<H> {
    initialized: bool,
    handle: Option<H>,
    tables: HashMap<String, RegisteredTable>,
    generation: u64,
    location: Option<String>,
}

impl<H: EngineHandle> RegistryState<H> {
    fn new() -> Self {
        Self {
            initialized: false,
            handle: None,
            tables: HashMap::new(),
            generation: 0,
            location: None,
        }
    }

    /// Closes the current handle, if any, and forgets every table.
    fn release(&mut self, reason: &str) {
        if let Some(handle) = self.handle.take() {
            match handle.close() {
                Ok(()) => debug!(reason, generation = self.generation, "Closed engine handle"),
                Err(e) => error!(reason, generation = self.generation, error = %e, "Failed to close engine handle"),
            }
        }
        self.tables.clear();
        self.initialized = false;
        self.location = None;
    }
}

/// Maps table names to their identity and row converter, and owns the handle.
pub struct SchemaRegistry<E: Engine> {
    engine: E,
    lifecycle: Arc<dyn LifecycleHook>,
    state: Arc<RwLock<RegistryState<E::Handle>>>,
}

impl<E: Engine> SchemaRegistry<E> {
    /// Creates an uninitialized registry.
    pub fn new(engine: E, lifecycle: Arc<dyn LifecycleHook>) -> Self {
        Self {
            engine,
            lifecycle,
            state: Arc::new(RwLock::new(RegistryState::new())),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState<E::Handle>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState<E::Handle>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the engine at `location` and registers `schemas`.
    ///
    /// If the registry is already initialized, the previous handle is closed
    /// and the table map cleared once the new schemas have been accepted.
    /// A `version` of 0 is treated as [`DEFAULT_VERSION`]. Schemas with an
    /// invalid name are skipped; invalid columns are dropped from their
    /// schema. When two schemas share a name, the later one wins. On an
    /// engine open failure the registry is left uninitialized and the error
    /// is returned.
    ///
    /// The teardown callback is registered as live only while this
    /// generation's handle is open, so hooks that prune stale registrations
    /// keep one entry per registry.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidArgument`] if `schemas` is empty or none of them
    /// is valid, [`StoreError::Engine`] if the engine cannot be opened.
    pub fn initialize(&self, location: &str, schemas: &[TableSchema], version: u32) -> Result<()> {
        if schemas.is_empty() {
            error!(location, "Cannot initialize store without table schemas");
            return Err(StoreError::InvalidArgument(
                "at least one table schema is required".to_string(),
            ));
        }

        let version = if version == 0 {
            warn!(location, default = DEFAULT_VERSION, "Version 0 requested, using the default");
            DEFAULT_VERSION
        } else {
            version
        };

        // Rejected input must not touch a working connection.
        let (order, mut accepted) = collect_schemas(schemas, version);
        if order.is_empty() {
            error!(location, "No valid table schema to register");
            return Err(StoreError::InvalidArgument(
                "no valid table schema to register".to_string(),
            ));
        }

        let mut state = self.write_state();
        if state.initialized || state.handle.is_some() {
            warn!(location, "Store already initialized, closing previous connection");
            state.release("reinitialize");
        }

        let create_statements: Vec<String> = order
            .iter()
            .filter_map(|name| accepted.get(name))
            .map(|(schema, _)| schema.create_statement().to_string())
            .collect();
        let migration_statements = aggregate_migrations(
            order
                .iter()
                .filter_map(|name| accepted.get(name))
                .map(|(schema, _)| *schema),
        );
        debug!(statements = ?migration_statements, "Pending migration statements");

        let handle = self
            .engine
            .open(location, &create_statements, &migration_statements, version)
            .map_err(|e| {
                error!(location, version, error = %e, "Failed to open database");
                StoreError::Engine(e)
            })?;

        match handle.version() {
            Ok(current) => info!(location, requested = version, current, "Database opened"),
            Err(e) => warn!(location, requested = version, error = %e, "Could not read database version"),
        }

        state.tables = accepted
            .drain()
            .map(|(name, (_, table))| (name, table))
            .collect();
        state.handle = Some(handle);
        state.location = Some(location.to_string());
        state.generation += 1;
        state.initialized = true;
        let generation = state.generation;
        drop(state);

        let weak = Arc::downgrade(&self.state);
        let liveness = Weak::clone(&weak);
        self.lifecycle.register_on_teardown_while_live(
            Box::new(move || {
                if let Some(state) = weak.upgrade() {
                    let mut state = state.write().unwrap_or_else(PoisonError::into_inner);
                    if state.generation == generation {
                        state.release("process teardown");
                    }
                }
            }),
            TEARDOWN_DESCRIPTION,
            Box::new(move || {
                liveness.upgrade().is_some_and(|state| {
                    let state = state.read().unwrap_or_else(PoisonError::into_inner);
                    state.generation == generation && state.handle.is_some()
                })
            }),
        );
        Ok(())
    }

    /// Returns the identity and row converter registered for `name`.
    ///
    /// Returns `None` (and logs) when the registry is not initialized or the
    /// name is unknown.
    pub fn resolve_table(&self, name: &str) -> Option<RegisteredTable> {
        let state = self.read_state();
        if !state.initialized {
            error!(table = name, "Store is not initialized");
            return None;
        }
        let table = state.tables.get(name).cloned();
        if table.is_none() {
            error!(table = name, "Failed to resolve table definition");
        }
        table
    }

    /// Closes the handle and clears the table map. Safe to call repeatedly.
    pub fn teardown(&self) {
        self.write_state().release("teardown");
    }

    /// Returns `true` after a successful initialize and before teardown.
    pub fn is_initialized(&self) -> bool {
        let state = self.read_state();
        state.initialized && state.handle.is_some()
    }

    /// Registered table names, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_state().tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Storage location of the open handle.
    pub fn location(&self) -> Option<String> {
        self.read_state().location.clone()
    }

    /// Version reported by the open handle, `None` when not initialized.
    pub fn version(&self) -> Option<u32> {
        self.with_handle(|handle, _| Ok(handle.version()?)).ok()
    }

    /// Runs `f` against the open handle and table map under the read lock.
    ///
    /// Does not log; callers decide how to report failures.
    pub(crate) fn with_handle<R>(
        &self,
        f: impl FnOnce(&E::Handle, &HashMap<String, RegisteredTable>) -> Result<R>,
    ) -> Result<R> {
        let state = self.read_state();
        match (&state.handle, state.initialized) {
            (Some(handle), true) => f(handle, &state.tables),
            _ => Err(StoreError::NotInitialized),
        }
    }

    /// Like [`with_handle`](Self::with_handle) but also resolves `name`.
    pub(crate) fn with_table<R>(
        &self,
        name: &str,
        f: impl FnOnce(&E::Handle, &RegisteredTable) -> Result<R>,
    ) -> Result<R> {
        self.with_handle(|handle, tables| match tables.get(name) {
            Some(table) => f(handle, table),
            None => Err(StoreError::UnknownTable(name.to_string())),
        })
    }
}

impl<E: Engine> Drop for SchemaRegistry<E> {
    fn drop(&mut self) {
        self.write_state().release("registry dropped");
    }
}

type Accepted<'a> = HashMap<String, (&'a TableSchema, RegisteredTable)>;

/// Builds the registered entry for every valid schema.
///
/// Returns table names in first-seen order plus the winning entry per name.
fn collect_schemas(schemas: &[TableSchema], version: u32) -> (Vec<String>, Accepted<'_>) {
    let mut order = Vec::new();
    let mut accepted: Accepted<'_> = HashMap::new();
    for schema in schemas {
        let identity = match TableIdentity::from_schema(schema) {
            Ok(identity) => identity,
            Err(e) => {
                error!(table = schema.name(), error = %e, "Skipping invalid table schema");
                continue;
            }
        };
        if schema.schema_version() > version {
            warn!(
                table = schema.name(),
                schema_version = schema.schema_version(),
                requested = version,
                "Table schema is newer than the requested database version"
            );
        }
        let row_converter = schema
            .custom_row_converter()
            .cloned()
            .unwrap_or_else(|| build_row_converter(&identity));
        let entry = RegisteredTable {
            identity,
            row_converter,
        };
        let name = schema.name().to_string();
        if accepted.insert(name.clone(), (schema, entry)).is_some() {
            warn!(table = %name, "Table registered twice, the later schema replaces the earlier one");
        } else {
            order.push(name);
        }
    }
    (order, accepted)
}

/// Flattens migration statements in schema order, dropping blank ones.
pub fn aggregate_migrations<'a>(schemas: impl IntoIterator<Item = &'a TableSchema>) -> Vec<String> {
    schemas
        .into_iter()
        .flat_map(|schema| schema.migrations().iter())
        .filter(|sql| !sql.trim().is_empty())
        .cloned()
        .collect()
}
