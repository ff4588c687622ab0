use std::sync::Arc;

use super::*;
use crate::config::StrataConfig;
use crate::containers::{DataArrayPath, MatrixCategory};
use crate::error::codes;
use crate::filter::{FilterRegistry, MessageLevel};
use crate::filters::{
    ConditionalSetValue, CreateAttributeMatrix, CreateDataArray, CreateDataContainer,
    DataContainerReader, FindElementNeighbors, RenameDataArray,
};
use crate::geometry::{Geometry, MeshGeometry, MeshKind};
use crate::persistence::{read_pipeline_file, write_file, write_pipeline_file};
use crate::types::ElementKind;

// Test Helpers
fn path(array: &str) -> DataArrayPath {
    DataArrayPath::new("dc", "Cells", array)
}

/// Builds `dc|Cells` with `A` (u8, filled with 5) and an all-true `Mask`, then
/// replaces `A` where masked.
fn masking_pipeline(replace_value: f64) -> Pipeline {
    let mut pipeline = Pipeline::new("masking");
    pipeline.push_back(Box::new(CreateDataContainer::new("dc")));
    pipeline.push_back(Box::new(CreateAttributeMatrix::new("dc", "Cells", vec![4, 2], MatrixCategory::Cell)));
    pipeline.push_back(Box::new(CreateDataArray::new(path("A"), ElementKind::UInt8, vec![1], 5.0)));
    pipeline.push_back(Box::new(CreateDataArray::new(path("Mask"), ElementKind::Boolean, vec![1], 1.0)));
    pipeline.push_back(Box::new(ConditionalSetValue::new(path("A"), path("Mask"), replace_value)));
    pipeline
}

#[test]
fn test_preflight_propagates_schema_without_data() {
    let mut pipeline = masking_pipeline(9.0);
    let (report, schema) = pipeline.preflight();
    assert!(report.is_success(), "{:?}", report.failure);
    assert_eq!(report.status, PipelineStatus::Preflighted);
    assert_eq!(pipeline.status(), PipelineStatus::Preflighted);
    assert_eq!(report.filter_codes, vec![0; 5]);
    assert_eq!(schema.array_paths(), vec![path("A"), path("Mask")]);
    assert!(!schema.resolve(&path("A")).unwrap().is_allocated());

    // Preflighting again gives the same schema and log.
    let (again, schema_again) = pipeline.preflight();
    assert_eq!(again, report);
    assert_eq!(schema_again, schema);
}

#[test]
fn test_execute_runs_every_filter_in_order() {
    let mut pipeline = masking_pipeline(9.0);
    let mut dca = DataContainerArray::new();
    let report = pipeline.execute(&mut dca);
    assert_eq!(report.status, PipelineStatus::Completed);
    assert_eq!(report.error_code, 0);
    assert!(report.failure.is_none());
    assert_eq!(dca.resolve_typed::<u8>(&path("A")).unwrap().as_slice(), &[9; 8]);

    let completions: Vec<usize> = report
        .log
        .iter()
        .filter(|entry| entry.message.level == MessageLevel::Status)
        .map(|entry| entry.index)
        .collect();
    assert_eq!(completions, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_preflight_stops_at_first_failure() {
    let mut pipeline = Pipeline::new("broken");
    pipeline.push_back(Box::new(CreateDataArray::new(
        DataArrayPath::new("missing", "Cells", "A"),
        ElementKind::Int32,
        vec![1],
        0.0,
    )));
    pipeline.push_back(Box::new(CreateDataContainer::new("dc")));

    let (report, schema) = pipeline.preflight();
    assert_eq!(report.status, PipelineStatus::Failed);
    assert_eq!(report.error_code, codes::CONTAINER_MISSING);
    assert_eq!(report.filter_codes, vec![codes::CONTAINER_MISSING]);
    let failure = report.failure.unwrap();
    assert_eq!(failure.index, 0);
    assert_eq!(failure.class_name, "CreateDataArray");
    assert!(failure.message.contains("missing"));
    // The second filter never ran.
    assert!(schema.is_empty());
}

#[test]
fn test_execute_halts_and_keeps_completed_work() {
    let mut pipeline = masking_pipeline(300.0);
    pipeline.push_back(Box::new(CreateDataArray::new(path("Never"), ElementKind::Int32, vec![1], 0.0)));

    let mut dca = DataContainerArray::new();
    let report = pipeline.execute(&mut dca);
    assert_eq!(report.status, PipelineStatus::Failed);
    assert_eq!(pipeline.status(), PipelineStatus::Failed);
    let failure = report.failure.as_ref().unwrap();
    assert_eq!((failure.index, failure.code), (4, codes::RANGE));
    assert_eq!(report.filter_codes.len(), 5);

    // Work of the completed filters stays; the failing one changed nothing.
    assert_eq!(dca.resolve_typed::<u8>(&path("A")).unwrap().as_slice(), &[5; 8]);
    assert!(dca.resolve(&path("Never")).is_err());
}

#[test]
fn test_cancel_before_execute() {
    let mut pipeline = masking_pipeline(9.0);
    pipeline.cancel();
    let mut dca = DataContainerArray::new();
    let report = pipeline.execute(&mut dca);
    assert_eq!(report.status, PipelineStatus::Cancelled);
    assert_eq!(report.error_code, codes::CANCELLED);
    assert_eq!(report.failure.unwrap().index, 0);
    assert!(report.filter_codes.is_empty());
    assert!(dca.is_empty());
}

#[test]
fn test_cancel_inside_a_long_filter() {
    let config = StrataConfig {
        cancel_poll_interval: 1,
        progress_interval: 1,
        ..StrataConfig::default()
    };
    let mut pipeline = masking_pipeline(9.0).with_config(Arc::new(config));
    pipeline.push_back(Box::new(CreateDataArray::new(path("After"), ElementKind::Int32, vec![1], 0.0)));
    let token = pipeline.cancel_token();

    let mut events = Vec::new();
    let mut on_progress = |event: &ProgressEvent| {
        events.push((event.filter_index, event.class_name, event.completed));
        token.cancel();
    };
    let mut dca = DataContainerArray::new();
    let report = pipeline.execute_with_progress(&mut dca, &mut on_progress);

    assert_eq!(report.status, PipelineStatus::Cancelled);
    let failure = report.failure.unwrap();
    assert_eq!(failure.index, 4);
    assert_eq!(failure.code, codes::CANCELLED);
    assert_eq!(events, vec![(4, "ConditionalSetValue", 0)]);
    // Tuple 0 was already replaced when the flag was seen at tuple 1.
    assert_eq!(
        dca.resolve_typed::<u8>(&path("A")).unwrap().as_slice(),
        &[9, 5, 5, 5, 5, 5, 5, 5]
    );
    assert!(dca.resolve(&path("After")).is_err());
}

#[test]
fn test_tuple_count_mismatch_lists_every_path() {
    let mut pipeline = Pipeline::new("mismatch");
    pipeline.push_back(Box::new(CreateDataContainer::new("dc")));
    pipeline.push_back(Box::new(CreateAttributeMatrix::new("dc", "Cells", vec![10], MatrixCategory::Cell)));
    pipeline.push_back(Box::new(CreateAttributeMatrix::new("dc", "Other", vec![12], MatrixCategory::Cell)));
    pipeline.push_back(Box::new(CreateDataArray::new(path("A"), ElementKind::Float32, vec![1], 0.0)));
    let mask = DataArrayPath::new("dc", "Other", "Mask");
    pipeline.push_back(Box::new(CreateDataArray::new(mask.clone(), ElementKind::Boolean, vec![1], 0.0)));
    pipeline.push_back(Box::new(ConditionalSetValue::new(path("A"), mask, 1.0)));

    let (report, _) = pipeline.preflight();
    let failure = report.failure.unwrap();
    assert_eq!(failure.code, codes::TUPLE_COUNT_MISMATCH);
    assert_eq!(failure.index, 5);
    assert!(failure.message.contains("'dc|Cells|A' (10 tuples)"));
    assert!(failure.message.contains("'dc|Other|Mask' (12 tuples)"));
}

#[test]
fn test_filter_list_editing() {
    let mut pipeline = masking_pipeline(9.0);
    assert_eq!(pipeline.len(), 5);
    let removed = pipeline.remove(4).unwrap();
    assert_eq!(removed.class_name(), "ConditionalSetValue");
    pipeline.insert(0, removed).unwrap();
    assert_eq!(pipeline.filters()[0].class_name(), "ConditionalSetValue");
    assert!(pipeline.insert(9, Box::new(CreateDataContainer::new("x"))).is_err());
    assert!(pipeline.remove(5).is_err());

    // The conditional filter now runs before its inputs exist.
    let (report, _) = pipeline.preflight();
    assert_eq!(report.error_code, codes::CONTAINER_MISSING);
}

#[test]
fn test_stored_pipeline_reads_mesh_file_and_finds_neighbors() {
    let dir = tempfile::tempdir().unwrap();
    let data_file = dir.path().join("mesh.strf");
    let pipeline_file = dir.path().join("pipeline.json");

    let mut source = DataContainerArray::new();
    let mesh = MeshGeometry::from_buffers(
        MeshKind::Quad,
        vec![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 2.0, 1.0, 0.0,
        ],
        vec![0, 1, 4, 3, 1, 2, 5, 4],
    )
    .unwrap();
    source
        .create_container("Surface")
        .unwrap()
        .set_geometry(Geometry::Mesh(mesh));
    write_file(&data_file, &source, None, &StrataConfig::default()).unwrap();

    let mut pipeline = Pipeline::new("neighbors");
    pipeline.push_back(Box::new(DataContainerReader::new(&data_file)));
    pipeline.push_back(Box::new(FindElementNeighbors::new("Surface")));
    write_pipeline_file(&pipeline_file, &pipeline).unwrap();

    let loaded = read_pipeline_file(&pipeline_file, &FilterRegistry::with_builtin_filters()).unwrap();
    assert!(loaded.skipped.is_empty());
    let mut pipeline = loaded.pipeline;

    let (report, schema) = pipeline.preflight();
    assert!(report.is_success(), "{:?}", report.failure);
    let counts = DataArrayPath::new("Surface", "FaceData", "NumNeighbors");
    assert!(schema.resolve(&counts).is_ok());

    let mut dca = DataContainerArray::new();
    let report = pipeline.execute(&mut dca);
    assert_eq!(report.status, PipelineStatus::Completed, "{:?}", report.failure);
    assert_eq!(dca.resolve_typed::<i32>(&counts).unwrap().as_slice(), &[1, 1]);
    assert_eq!(pipeline.to_document().filters.len(), 2);
}

#[test]
fn test_repeated_preflight_on_a_base_registry_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let data_file = dir.path().join("cells.strf");
    let mut source = DataContainerArray::new();
    source
        .create_container("dc")
        .unwrap()
        .create_matrix("Cells", vec![3], MatrixCategory::Cell)
        .unwrap()
        .add_array("A", crate::arrays::TypedArray::<u8>::new("", 3, vec![1], 4).unwrap())
        .unwrap();
    write_file(&data_file, &source, None, &StrataConfig::default()).unwrap();

    let mut pipeline = Pipeline::new("reimport");
    pipeline.push_back(Box::new(DataContainerReader::new(&data_file)));
    pipeline.push_back(Box::new(RenameDataArray::new(path("A"), "B")));

    let mut base = DataContainerArray::new();
    base.create_container("other").unwrap();
    let before = base.clone();

    let (first, first_schema) = pipeline.preflight_on(&base);
    let (second, second_schema) = pipeline.preflight_on(&base);
    assert!(first.is_success(), "{:?}", first.failure);
    assert_eq!(second, first);
    assert_eq!(second_schema, first_schema);
    assert_eq!(first_schema.array_paths(), vec![path("B")]);
    assert!(first_schema.contains_container("other"));
    assert_eq!(base, before);

    // A base that already holds the imported container is a collision every time.
    let (collides, _) = pipeline.preflight_on(&first_schema);
    assert_eq!(collides.error_code, codes::ALREADY_EXISTS);
    let (again, _) = pipeline.preflight_on(&first_schema);
    assert_eq!(again, collides);
}
