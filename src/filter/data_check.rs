//! The staging area behind `Filter::data_check`.
//!
//! Inputs are resolved against the `DataContainerArray` plus whatever the same
//! check already staged. Outputs are recorded as pending and only written by
//! [`DataCheck::commit`], and only when no error was recorded. A failing
//! check therefore leaves the registry exactly as it found it.

use hashbrown::HashSet;

use crate::arrays::{AnyArray, ArrayInfo};
use crate::containers::{DataArrayPath, DataContainer, DataContainerArray, MatrixCategory};
use crate::error::{Result, StrataError};
use crate::filter::Mode;
use crate::geometry::{Geometry, ImageGeom, MeshKind};
use crate::traits::Element;
use crate::types::ElementKind;
use crate::utils::checked_product;

/// Shape of a resolved (or staged) attribute matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixInfo {
    pub tuple_dims: Vec<usize>,
    pub category: MatrixCategory,
}

impl MatrixInfo {
    pub fn num_tuples(&self) -> usize {
        checked_product(&self.tuple_dims).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PendingOutput {
    Container {
        name: String,
    },
    Matrix {
        container: String,
        name: String,
        tuple_dims: Vec<usize>,
        category: MatrixCategory,
    },
    ResizeMatrix {
        container: String,
        name: String,
        tuple_dims: Vec<usize>,
    },
    Array {
        path: DataArrayPath,
        kind: ElementKind,
        component_dims: Vec<usize>,
        init: f64,
    },
    ResizeArray {
        path: DataArrayPath,
        init: f64,
    },
    RenameArray {
        path: DataArrayPath,
        new_name: String,
        info: ArrayInfo,
    },
    Import {
        containers: DataContainerArray,
        overwrite: bool,
    },
}

/// What a finished check hands back to the filter state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataCheckReport {
    pub errors: Vec<StrataError>,
    pub warnings: Vec<(i32, String)>,
    /// Arrays that did not exist before and were created by the commit.
    pub created: Vec<DataArrayPath>,
}

/// One registry change made by a commit, recorded so it can be taken back.
#[derive(Debug, Clone, PartialEq)]
enum Undo {
    Container(String),
    Matrix(DataArrayPath),
    Array(DataArrayPath),
    TupleDims {
        matrix: DataArrayPath,
        tuple_dims: Vec<usize>,
        resized: bool,
    },
    ArrayShape {
        path: DataArrayPath,
        num_tuples: usize,
        allocated: bool,
    },
    Rename {
        path: DataArrayPath,
        new_name: String,
    },
    Replaced(DataContainer),
}

/// The changes a commit made to the registry, oldest first.
///
/// Rolling back removes what the commit created and restores what it renamed,
/// replaced or resized. Restoring a resize keeps the surviving prefix of the
/// data, so a grown placeholder comes back exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitJournal {
    entries: Vec<Undo>,
}

impl CommitJournal {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, undo: Undo) {
        self.entries.push(undo);
    }

    pub fn rollback(self, dca: &mut DataContainerArray) {
        if self.entries.is_empty() {
            return;
        }
        log::debug!("rolling back {} committed outputs", self.entries.len());
        for undo in self.entries.into_iter().rev() {
            if let Err(err) = revert(dca, undo) {
                log::warn!("rollback step failed: {}", err);
            }
        }
    }
}

fn revert(dca: &mut DataContainerArray, undo: Undo) -> Result<()> {
    match undo {
        Undo::Container(name) => {
            dca.remove_container(&name);
        }
        Undo::Matrix(matrix) => {
            dca.container_mut(&matrix.container)?.remove_matrix(&matrix.matrix);
        }
        Undo::Array(path) => {
            dca.matrix_mut(&path)?.remove_array(&path.array);
        }
        Undo::TupleDims {
            matrix,
            tuple_dims,
            resized,
        } => {
            let am = dca.matrix_mut(&matrix)?;
            if resized {
                am.resize_arrays(tuple_dims)?;
            } else {
                am.set_tuple_dims(tuple_dims);
            }
        }
        Undo::ArrayShape {
            path,
            num_tuples,
            allocated,
        } => {
            let array = dca.resolve_mut(&path)?;
            if allocated {
                array.resize_with(num_tuples, 0.0)?;
            } else {
                *array = AnyArray::unallocated(array.kind(), &path.array, array.component_dims().to_vec())?;
            }
        }
        Undo::Rename { path, new_name } => {
            dca.matrix_mut(&path)?.rename_array(&new_name, &path.array, false)?;
        }
        Undo::Replaced(container) => {
            dca.add_container(container)?;
        }
    }
    Ok(())
}

pub struct DataCheck<'a> {
    dca: &'a mut DataContainerArray,
    mode: Mode,
    errors: Vec<StrataError>,
    warnings: Vec<(i32, String)>,
    pending: Vec<PendingOutput>,
}

impl<'a> DataCheck<'a> {
    pub fn new(dca: &'a mut DataContainerArray, mode: Mode) -> Self {
        Self {
            dca,
            mode,
            errors: Vec::new(),
            warnings: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_preflight(&self) -> bool {
        self.mode == Mode::Preflight
    }

    /// The registry as it was before this check; staged outputs are not in it yet.
    pub fn dca(&self) -> &DataContainerArray {
        self.dca
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error(&mut self, err: StrataError) {
        log::debug!("data check error {}: {}", err.code(), err);
        self.errors.push(err);
    }

    pub fn warning(&mut self, code: i32, text: impl Into<String>) {
        self.warnings.push((code, text.into()));
    }

    /// Records the error of a failed result and converts it to an `Option`.
    pub fn check<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.error(err);
                None
            }
        }
    }

    //==============================================================================
    // Input Resolution
    //==============================================================================

    pub fn require_container(&mut self, name: &str) -> bool {
        let result = if name.is_empty() {
            Err(StrataError::EmptyName("data container".into()))
        } else if self.container_known(name) {
            Ok(())
        } else {
            Err(StrataError::ContainerMissing { container: name.to_string() })
        };
        self.check(result).is_some()
    }

    pub fn require_matrix(&mut self, container: &str, matrix: &str) -> Option<MatrixInfo> {
        let result = self.lookup_matrix(container, matrix);
        self.check(result)
    }

    /// Resolves an array of any element kind.
    ///
    /// With `component_dims` set, a different component shape is a
    /// `ComponentMismatch`. For arrays that are not allocated yet (preflight)
    /// the reported tuple count is the owning matrix's.
    pub fn require_any_array(
        &mut self,
        path: &DataArrayPath,
        component_dims: Option<&[usize]>,
    ) -> Option<ArrayInfo> {
        self.require_array_of_kind(path, None, component_dims)
    }

    /// Resolves an array whose element kind must be `T`.
    pub fn require_array<T: Element>(
        &mut self,
        path: &DataArrayPath,
        component_dims: Option<&[usize]>,
    ) -> Option<ArrayInfo> {
        self.require_array_of_kind(path, Some(T::KIND), component_dims)
    }

    pub fn require_array_of_kind(
        &mut self,
        path: &DataArrayPath,
        kind: Option<ElementKind>,
        component_dims: Option<&[usize]>,
    ) -> Option<ArrayInfo> {
        let result = self.lookup(path).and_then(|info| {
            if let Some(expected) = kind {
                if info.kind != expected {
                    return Err(StrataError::KindMismatch {
                        path: path.clone(),
                        expected,
                        found: info.kind,
                    });
                }
            }
            if let Some(expected) = component_dims {
                if info.component_dims.as_slice() != expected {
                    return Err(StrataError::ComponentMismatch {
                        path: path.clone(),
                        expected: expected.to_vec(),
                        found: info.component_dims.clone(),
                    });
                }
            }
            Ok(info)
        });
        self.check(result)
    }

    /// Checks that every resolvable path in `paths` has the same tuple count.
    ///
    /// Paths that do not resolve are skipped (their own `require_*` call reports
    /// them). On mismatch the error lists every resolved path with its count.
    pub fn require_same_tuple_count(&mut self, paths: &[DataArrayPath]) -> bool {
        let mut entries = Vec::with_capacity(paths.len());
        let mut counts = HashSet::new();
        for path in paths {
            if let Ok(info) = self.lookup(path) {
                counts.insert(info.num_tuples);
                entries.push((path.clone(), info.num_tuples));
            }
        }
        if counts.len() > 1 {
            self.error(StrataError::TupleCountMismatch { entries });
            return false;
        }
        true
    }

    /// Requires any geometry and returns its type name.
    pub fn require_geometry(&mut self, container: &str) -> Option<String> {
        let result = self.geometry_of(container).map(Geometry::type_name);
        self.check(result)
    }

    pub fn require_image(&mut self, container: &str) -> Option<ImageGeom> {
        let result = self.geometry_of(container).and_then(|geometry| {
            geometry
                .as_image()
                .cloned()
                .ok_or_else(|| StrataError::GeometryMismatch {
                    container: container.to_string(),
                    expected: "Image".to_string(),
                    found: geometry.type_name(),
                })
        });
        self.check(result)
    }

    /// Requires a mesh geometry, optionally of one element kind.
    pub fn require_mesh(&mut self, container: &str, kind: Option<MeshKind>) -> Option<MeshKind> {
        let result = self.geometry_of(container).and_then(|geometry| {
            let mismatch = || StrataError::GeometryMismatch {
                container: container.to_string(),
                expected: kind.map_or_else(|| "Mesh".to_string(), |k| format!("{}Mesh", k)),
                found: geometry.type_name(),
            };
            let mesh = geometry.as_mesh().ok_or_else(mismatch)?;
            match kind {
                Some(k) if k != mesh.kind() => Err(mismatch()),
                _ => Ok(mesh.kind()),
            }
        });
        self.check(result)
    }

    //==============================================================================
    // Output Staging
    //==============================================================================

    /// Stages a new container. An existing one is accepted as-is.
    pub fn create_container(&mut self, name: &str) -> bool {
        if name.is_empty() {
            self.error(StrataError::EmptyName("data container".into()));
            return false;
        }
        if !self.container_known(name) {
            self.pending.push(PendingOutput::Container { name: name.to_string() });
        }
        true
    }

    /// Stages a new matrix.
    ///
    /// An existing matrix with the same category is accepted; if its tuple
    /// dimensions differ they are updated on commit (arrays are resized in
    /// execute mode only).
    pub fn create_matrix(
        &mut self,
        container: &str,
        matrix: &str,
        tuple_dims: Vec<usize>,
        category: MatrixCategory,
    ) -> bool {
        if matrix.is_empty() {
            self.error(StrataError::EmptyName(format!(
                "attribute matrix in data container '{}'",
                container
            )));
            return false;
        }
        if !self.require_container(container) {
            return false;
        }
        if let Err(err) = checked_product(&tuple_dims) {
            self.error(err);
            return false;
        }
        match self.matrix_known(container, matrix) {
            Some(existing) if existing.category != category => {
                self.error(StrataError::AlreadyExists(format!(
                    "Attribute matrix '{}/{}' with category {}",
                    container, matrix, existing.category
                )));
                false
            }
            Some(existing) => {
                if existing.tuple_dims != tuple_dims {
                    self.pending.push(PendingOutput::ResizeMatrix {
                        container: container.to_string(),
                        name: matrix.to_string(),
                        tuple_dims,
                    });
                }
                true
            }
            None => {
                self.pending.push(PendingOutput::Matrix {
                    container: container.to_string(),
                    name: matrix.to_string(),
                    tuple_dims,
                    category,
                });
                true
            }
        }
    }

    /// Stages a new array in an existing (or staged) matrix.
    ///
    /// Preflight creates it unallocated; execute sizes it to the matrix tuple
    /// count and fills it with `init`. An existing array of the same kind and
    /// component shape is accepted and left untouched (execute only sizes it
    /// if it was never allocated).
    pub fn create_array(
        &mut self,
        path: &DataArrayPath,
        kind: ElementKind,
        component_dims: Vec<usize>,
        init: f64,
    ) -> bool {
        if let Err(err) = path.validate() {
            self.error(err);
            return false;
        }
        let matrix = match self.require_matrix(&path.container, &path.matrix) {
            Some(matrix) => matrix,
            None => return false,
        };
        if component_dims.is_empty() || component_dims.contains(&0) {
            self.error(StrataError::InvalidParameter(format!(
                "component dimensions {:?} for '{}' must be non-empty and non-zero",
                component_dims, path
            )));
            return false;
        }
        if let Err(err) = kind.check_range(init) {
            self.error(err);
            return false;
        }

        match self.array_known(path) {
            Some(existing) if existing.kind == kind && existing.component_dims == component_dims => {
                let stale = !existing.allocated || existing.num_tuples != matrix.num_tuples();
                if self.mode == Mode::Execute && stale {
                    self.pending.push(PendingOutput::ResizeArray { path: path.clone(), init });
                }
                true
            }
            Some(_) => {
                self.error(StrataError::AlreadyExists(format!("Data array '{}'", path)));
                false
            }
            None => {
                self.pending.push(PendingOutput::Array {
                    path: path.clone(),
                    kind,
                    component_dims,
                    init,
                });
                true
            }
        }
    }

    /// Stages a rename inside one matrix.
    pub fn rename_array(&mut self, path: &DataArrayPath, new_name: &str) -> bool {
        let info = match self.require_any_array(path, None) {
            Some(info) => info,
            None => return false,
        };
        if new_name.is_empty() {
            self.error(StrataError::EmptyName(format!("array renamed from '{}'", path)));
            return false;
        }
        if new_name == path.array {
            return true;
        }
        let target = path.with_array(new_name);
        if self.array_known(&target).is_some() {
            self.error(StrataError::TargetExists(target.to_string()));
            return false;
        }
        self.pending.push(PendingOutput::RenameArray {
            path: path.clone(),
            new_name: new_name.to_string(),
            info,
        });
        true
    }

    /// Stages the containers of `containers` for a merge into the registry.
    ///
    /// Imported containers are not visible to lookups made later in the same
    /// check. Without `overwrite`, a name collision is an `AlreadyExists` error.
    pub fn import(&mut self, containers: DataContainerArray, overwrite: bool) -> bool {
        if !overwrite {
            if let Some(name) = containers
                .container_names()
                .into_iter()
                .find(|n| self.container_known(n))
            {
                self.error(StrataError::AlreadyExists(format!("Data container '{}'", name)));
                return false;
            }
        }
        self.pending.push(PendingOutput::Import { containers, overwrite });
        true
    }

    //==============================================================================
    // Commit
    //==============================================================================

    /// Applies the staged outputs if, and only if, no error was recorded.
    pub fn commit(self) -> DataCheckReport {
        self.commit_journaled().0
    }

    /// Like [`DataCheck::commit`], also returning the journal of applied
    /// changes so a failed `compute` can take them back.
    ///
    /// An output that fails to apply rolls back every output applied before
    /// it, so a commit lands whole or not at all.
    pub fn commit_journaled(self) -> (DataCheckReport, CommitJournal) {
        let DataCheck {
            dca,
            mode,
            mut errors,
            warnings,
            pending,
        } = self;
        let mut created = Vec::new();
        let mut journal = CommitJournal::default();
        if errors.is_empty() {
            for output in pending {
                if let Err(err) = apply(dca, mode, output, &mut created, &mut journal) {
                    errors.push(err);
                    std::mem::take(&mut journal).rollback(dca);
                    created.clear();
                    break;
                }
            }
        }
        let report = DataCheckReport {
            errors,
            warnings,
            created,
        };
        (report, journal)
    }

    //==============================================================================
    // Lookups over the registry plus staged outputs
    //==============================================================================

    fn container_known(&self, name: &str) -> bool {
        self.dca.contains_container(name)
            || self
                .pending
                .iter()
                .any(|p| matches!(p, PendingOutput::Container { name: n } if n == name))
    }

    fn matrix_known(&self, container: &str, matrix: &str) -> Option<MatrixInfo> {
        let mut info = self
            .dca
            .get_container(container)
            .and_then(|c| c.get_matrix(matrix))
            .map(|m| MatrixInfo {
                tuple_dims: m.tuple_dims().to_vec(),
                category: m.category(),
            });
        for output in &self.pending {
            match output {
                PendingOutput::Matrix {
                    container: c,
                    name,
                    tuple_dims,
                    category,
                } if c == container && name == matrix => {
                    info = Some(MatrixInfo {
                        tuple_dims: tuple_dims.clone(),
                        category: *category,
                    });
                }
                PendingOutput::ResizeMatrix {
                    container: c,
                    name,
                    tuple_dims,
                } if c == container && name == matrix => {
                    if let Some(info) = info.as_mut() {
                        info.tuple_dims = tuple_dims.clone();
                    }
                }
                _ => {}
            }
        }
        info
    }

    fn lookup_matrix(&self, container: &str, matrix: &str) -> Result<MatrixInfo> {
        if container.is_empty() {
            return Err(StrataError::EmptyName("data container".into()));
        }
        if !self.container_known(container) {
            return Err(StrataError::ContainerMissing { container: container.to_string() });
        }
        self.matrix_known(container, matrix)
            .ok_or_else(|| StrataError::MatrixMissing {
                container: container.to_string(),
                matrix: matrix.to_string(),
            })
    }

    /// Raw array description, replaying staged outputs in order.
    fn array_known(&self, path: &DataArrayPath) -> Option<ArrayInfo> {
        let matrix_tuples = self.matrix_known(&path.container, &path.matrix)?.num_tuples();
        let mut found = self.dca.resolve(path).ok().map(AnyArray::describe);
        for output in &self.pending {
            match output {
                PendingOutput::Array {
                    path: p,
                    kind,
                    component_dims,
                    ..
                } if p == path => {
                    let allocated = self.mode == Mode::Execute;
                    found = Some(ArrayInfo {
                        kind: *kind,
                        num_tuples: if allocated { matrix_tuples } else { 0 },
                        component_dims: component_dims.clone(),
                        allocated,
                    });
                }
                PendingOutput::ResizeArray { path: p, .. } if p == path => {
                    if let Some(info) = found.as_mut() {
                        info.num_tuples = matrix_tuples;
                        info.allocated = true;
                    }
                }
                PendingOutput::RenameArray { path: p, new_name, info } => {
                    if p == path {
                        found = None;
                    } else if p.has_same_matrix(path) && *new_name == path.array {
                        found = Some(info.clone());
                    }
                }
                _ => {}
            }
        }
        found
    }

    /// Full resolution with a distinct error per missing level.
    fn lookup(&self, path: &DataArrayPath) -> Result<ArrayInfo> {
        path.validate()?;
        let matrix = self.lookup_matrix(&path.container, &path.matrix)?;
        let mut info = self
            .array_known(path)
            .ok_or_else(|| StrataError::ArrayMissing(path.clone()))?;
        if !info.allocated {
            info.num_tuples = matrix.num_tuples();
        }
        Ok(info)
    }

    fn geometry_of(&self, container: &str) -> Result<&Geometry> {
        if !self.container_known(container) {
            return Err(StrataError::ContainerMissing { container: container.to_string() });
        }
        self.dca
            .get_container(container)
            .and_then(|c| c.geometry())
            .ok_or_else(|| StrataError::GeometryMissing { container: container.to_string() })
    }
}

fn apply(
    dca: &mut DataContainerArray,
    mode: Mode,
    output: PendingOutput,
    created: &mut Vec<DataArrayPath>,
    journal: &mut CommitJournal,
) -> Result<()> {
    match output {
        PendingOutput::Container { name } => {
            if !dca.contains_container(&name) {
                dca.create_container(&name)?;
                journal.push(Undo::Container(name));
            }
        }
        PendingOutput::Matrix {
            container,
            name,
            tuple_dims,
            category,
        } => {
            let dc = dca.container_mut(&container)?;
            if !dc.contains_matrix(&name) {
                dc.create_matrix(&name, tuple_dims, category)?;
                journal.push(Undo::Matrix(DataArrayPath::matrix_path(&container, &name)));
            }
        }
        PendingOutput::ResizeMatrix {
            container,
            name,
            tuple_dims,
        } => {
            let path = DataArrayPath::matrix_path(&container, &name);
            let matrix = dca.matrix_mut(&path)?;
            let previous = matrix.tuple_dims().to_vec();
            match mode {
                Mode::Preflight => matrix.set_tuple_dims(tuple_dims),
                Mode::Execute => matrix.resize_arrays(tuple_dims)?,
            }
            journal.push(Undo::TupleDims {
                matrix: path,
                tuple_dims: previous,
                resized: mode == Mode::Execute,
            });
        }
        PendingOutput::Array {
            path,
            kind,
            component_dims,
            init,
        } => {
            let matrix = dca.matrix_mut(&path)?;
            if !matrix.contains_array(&path.array) {
                let array = match mode {
                    Mode::Preflight => AnyArray::unallocated(kind, &path.array, component_dims)?,
                    Mode::Execute => {
                        AnyArray::new(kind, &path.array, matrix.num_tuples(), component_dims, init)?
                    }
                };
                matrix.add_array(&path.array, array)?;
                journal.push(Undo::Array(path.clone()));
                created.push(path);
            }
        }
        PendingOutput::ResizeArray { path, init } => {
            let matrix = dca.matrix_mut(&path)?;
            let num_tuples = matrix.num_tuples();
            if let Some(array) = matrix.get_array_mut(&path.array) {
                let previous = Undo::ArrayShape {
                    path: path.clone(),
                    num_tuples: array.num_tuples(),
                    allocated: array.is_allocated(),
                };
                array.resize_with(num_tuples, init)?;
                journal.push(previous);
            }
        }
        PendingOutput::RenameArray { path, new_name, .. } => {
            dca.matrix_mut(&path)?.rename_array(&path.array, &new_name, false)?;
            journal.push(Undo::Rename { path, new_name });
        }
        PendingOutput::Import { containers, overwrite } => {
            let names = containers.container_names();
            if !overwrite {
                if let Some(name) = names.iter().find(|n| dca.contains_container(n)) {
                    return Err(StrataError::AlreadyExists(format!("Data container '{}'", name)));
                }
            }
            let new_paths: Vec<DataArrayPath> = containers
                .array_paths()
                .into_iter()
                .filter(|path| dca.resolve(path).is_err())
                .collect();
            for name in names {
                if let Some(old) = dca.remove_container(&name) {
                    journal.push(Undo::Replaced(old));
                }
                journal.push(Undo::Container(name));
            }
            dca.merge_from(containers, true)?;
            created.extend(new_paths);
        }
    }
    Ok(())
}
