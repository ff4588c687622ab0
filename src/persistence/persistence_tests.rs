use crate::arrays::TypedArray;
use crate::config::StrataConfig;
use crate::containers::{DataArrayPath, DataContainerArray, MatrixCategory};
use crate::error::{codes, StrataError};
use crate::filter::{FilterRegistry, Mode, ParameterValue};
use crate::filters::{ConditionalSetValue, CreateDataArray};
use crate::geometry::{Geometry, ImageGeom, MeshGeometry, MeshKind};
use crate::persistence::format::{FileHeader, FILE_FORMAT_VERSION, FILE_MAGIC};
use crate::persistence::*;
use crate::pipeline::Pipeline;
use crate::types::ElementKind;

// Test Helpers
fn sample() -> DataContainerArray {
    let mut dca = DataContainerArray::new();
    let image = dca.create_container("Image").unwrap();
    image.set_geometry(Geometry::Image(ImageGeom::new([4, 3, 1], [0.0; 3], [0.5; 3])));
    let cells = image.create_matrix("Cells", vec![4, 3], MatrixCategory::Cell).unwrap();
    let ids: Vec<i32> = (0..12).map(|i| i % 3).collect();
    cells.add_array("FeatureIds", TypedArray::from_vec("", vec![1], ids).unwrap()).unwrap();
    let eulers: Vec<f32> = (0..36).map(|i| i as f32 * 0.25).collect();
    cells.add_array("Eulers", TypedArray::from_vec("", vec![3], eulers).unwrap()).unwrap();
    let features = image.create_matrix("Features", vec![3], MatrixCategory::CellFeature).unwrap();
    features.add_array("Active", TypedArray::<bool>::new("", 3, vec![1], true).unwrap()).unwrap();

    let surface = dca.create_container("Surface").unwrap();
    let mesh = MeshGeometry::from_buffers(
        MeshKind::Triangle,
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
        vec![0, 1, 2, 0, 2, 3],
    )
    .unwrap();
    surface.set_geometry(Geometry::Mesh(mesh));
    let faces = surface.create_matrix("Faces", vec![2], MatrixCategory::Face).unwrap();
    faces.add_array("Labels", TypedArray::<i32>::new("", 2, vec![2], -1).unwrap()).unwrap();
    dca
}

/// Re-encodes a file with an edited header, keeping the payload section.
fn with_header(bytes: &[u8], edit: impl FnOnce(&mut FileHeader)) -> Vec<u8> {
    let header_len = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
    let payloads = &bytes[10 + header_len..];
    let mut header = peek_header(bytes).unwrap();
    edit(&mut header);
    let json = serde_json::to_vec(&header).unwrap();
    let mut out = Vec::new();
    out.extend_from_slice(FILE_MAGIC);
    out.extend_from_slice(&FILE_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&json);
    out.extend_from_slice(payloads);
    out
}

#[test]
fn test_full_roundtrip_with_and_without_compression() {
    let dca = sample();
    for compress in [true, false] {
        let config = StrataConfig {
            compress_payloads: compress,
            ..StrataConfig::default()
        };
        let bytes = write_data_container_array(&dca, None, &config).unwrap();
        let outcome = read_data_container_array(&bytes, Mode::Execute, &[]).unwrap();
        assert_eq!(outcome.dca, dca, "round trip differs (compress = {})", compress);
        assert!(outcome.warnings.is_empty());
        assert!(outcome.pipeline.is_none());
    }
}

#[test]
fn test_peeked_schema_matches_in_memory_schema() {
    let dca = sample();
    let bytes = write_data_container_array(&dca, None, &StrataConfig::default()).unwrap();
    let schema = peek_schema(&bytes).unwrap();
    assert_eq!(schema, dca.schema());

    let header = peek_header(&bytes).unwrap();
    assert_eq!(header.writer_version, crate::VERSION);
    // Two mesh lists plus one payload per array.
    assert_eq!(header.manifest.len(), 2 + dca.array_paths().len());
}

#[test]
fn test_preflight_read_needs_only_the_header() {
    let dca = sample();
    let bytes = write_data_container_array(&dca, None, &StrataConfig::default()).unwrap();
    let header_len = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
    let header_only = &bytes[..10 + header_len];

    let outcome = read_data_container_array(header_only, Mode::Preflight, &[]).unwrap();
    assert_eq!(outcome.dca.array_paths(), dca.array_paths());
    for path in outcome.dca.array_paths() {
        let array = outcome.dca.resolve(&path).unwrap();
        assert!(!array.is_allocated());
        assert_eq!(array.num_tuples(), 0);
    }
    let matrix = outcome.dca.matrix(&DataArrayPath::matrix_path("Image", "Cells")).unwrap();
    assert_eq!(matrix.tuple_dims(), &[4, 3]);
    let mesh = outcome.dca.get_container("Surface").unwrap().geometry().unwrap();
    assert_eq!(mesh.type_name(), "TriangleMesh");

    // The same truncated bytes cannot back an execute read.
    let err = read_data_container_array(header_only, Mode::Execute, &[]).unwrap_err();
    assert_eq!(err.code(), codes::IO);
}

#[test]
fn test_missing_payload_fails_only_in_execute() {
    let dca = sample();
    let bytes = write_data_container_array(&dca, None, &StrataConfig::default()).unwrap();
    let eulers = DataArrayPath::new("Image", "Cells", "Eulers");
    let edited = with_header(&bytes, |header| {
        header
            .manifest
            .retain(|e| e.key != PayloadKey::Array { path: eulers.clone() });
    });

    let outcome = read_data_container_array(&edited, Mode::Preflight, &[]).unwrap();
    let placeholder = outcome.dca.resolve(&eulers).unwrap();
    assert!(!placeholder.is_allocated());
    assert_eq!(placeholder.component_dims(), &[3]);
    assert_eq!(outcome.dca.schema(), dca.schema());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("Image|Cells|Eulers"));

    let err = read_data_container_array(&edited, Mode::Execute, &[]).unwrap_err();
    assert!(matches!(err, StrataError::Io(ref msg) if msg.contains("missing")));
}

#[test]
fn test_preflight_registry_reads_back_with_the_same_schema() {
    let mut schema_only = DataContainerArray::new();
    let data = schema_only
        .create_container("dc")
        .unwrap()
        .create_matrix("Data", vec![5, 2], MatrixCategory::Cell)
        .unwrap();
    data.add_array("A", TypedArray::<u8>::unallocated("", vec![1]).unwrap())
        .unwrap();
    data.add_array("V", TypedArray::<f64>::unallocated("", vec![3]).unwrap())
        .unwrap();
    let before = schema_only.schema();

    let bytes = write_data_container_array(&schema_only, None, &StrataConfig::default()).unwrap();
    assert!(peek_header(&bytes).unwrap().manifest.is_empty());

    let outcome = read_data_container_array(&bytes, Mode::Preflight, &[]).unwrap();
    assert_eq!(outcome.dca.schema(), before);
    assert_eq!(
        outcome.dca.array_paths(),
        vec![DataArrayPath::new("dc", "Data", "A"), DataArrayPath::new("dc", "Data", "V")]
    );
    assert_eq!(outcome.warnings.len(), 2);

    let err = read_data_container_array(&bytes, Mode::Execute, &[]).unwrap_err();
    assert_eq!(err.code(), codes::IO);
}

#[test]
fn test_bad_preamble_is_rejected() {
    let bytes = write_data_container_array(&sample(), None, &StrataConfig::default()).unwrap();

    let mut bad_magic = bytes.clone();
    bad_magic[0] = b'X';
    assert_eq!(peek_header(&bad_magic).unwrap_err().code(), codes::FORMAT);

    let mut bad_version = bytes.clone();
    bad_version[4..6].copy_from_slice(&(FILE_FORMAT_VERSION + 1).to_le_bytes());
    assert_eq!(peek_header(&bad_version).unwrap_err().code(), codes::FORMAT);

    assert_eq!(peek_header(&bytes[..6]).unwrap_err().code(), codes::IO);
    assert_eq!(peek_header(&bytes[..40]).unwrap_err().code(), codes::IO);
}

#[test]
fn test_truncated_payload_fails_execute() {
    let bytes = write_data_container_array(&sample(), None, &StrataConfig::default()).unwrap();
    let truncated = &bytes[..bytes.len() - 3];
    let err = read_data_container_array(truncated, Mode::Execute, &[]).unwrap_err();
    assert_eq!(err.code(), codes::IO);
}

#[test]
fn test_selection_limits_materialized_arrays() {
    let bytes = write_data_container_array(&sample(), None, &StrataConfig::default()).unwrap();
    let ids = DataArrayPath::new("Image", "Cells", "FeatureIds");
    let outcome = read_data_container_array(&bytes, Mode::Execute, &[ids.clone()]).unwrap();
    assert_eq!(outcome.dca.array_paths(), vec![ids.clone()]);
    assert_eq!(
        outcome.dca.resolve_typed::<i32>(&ids).unwrap().as_slice()[..4],
        [0, 1, 2, 0]
    );
    assert!(!outcome.dca.contains_container("Surface"));
}

#[test]
fn test_file_helpers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.strf");
    let dca = sample();
    write_file(&path, &dca, None, &StrataConfig::default()).unwrap();

    let header = peek_file_header(&path).unwrap();
    assert_eq!(header.schema, dca.schema());
    assert_eq!(read_file(&path, Mode::Execute, &[]).unwrap().dca, dca);
    assert!(!read_file(&path, Mode::Preflight, &[]).unwrap().dca.resolve(
        &DataArrayPath::new("Image", "Cells", "Eulers")
    ).unwrap().is_allocated());

    let missing = read_file(&dir.path().join("nope.strf"), Mode::Preflight, &[]).unwrap_err();
    assert_eq!(missing.code(), codes::IO);
}

//==================================================================================
// Pipeline Documents
//==================================================================================

fn two_filter_pipeline() -> Pipeline {
    let mut pipeline = Pipeline::new("mask A");
    pipeline.push_back(Box::new(CreateDataArray::new(
        DataArrayPath::new("dc", "Data", "B"),
        ElementKind::Float32,
        vec![3],
        1.5,
    )));
    pipeline.push_back(Box::new(ConditionalSetValue::new(
        DataArrayPath::new("dc", "Data", "A"),
        DataArrayPath::new("dc", "Data", "Mask"),
        7.0,
    )));
    pipeline
}

#[test]
fn test_pipeline_document_roundtrip_replays_parameters() {
    let pipeline = two_filter_pipeline();
    let document = PipelineDocument::from_pipeline(&pipeline);
    assert_eq!(document.filters.len(), 2);
    assert_eq!(document.filters[1].class_name, "ConditionalSetValue");
    assert_eq!(
        document.filters[1].parameters.get("ReplaceValue"),
        Some(&ParameterValue::Float(7.0))
    );

    let json = document.to_json_string().unwrap();
    let loaded = PipelineDocument::from_json_str(&json)
        .unwrap()
        .build(&FilterRegistry::with_builtin_filters());
    assert!(loaded.skipped.is_empty());
    assert_eq!(loaded.pipeline.len(), 2);
    assert_eq!(loaded.pipeline.name(), "mask A");
    assert_eq!(PipelineDocument::from_pipeline(&loaded.pipeline), document);
}

#[test]
fn test_unknown_class_is_skipped_and_missing_keys_use_defaults() {
    let json = r#"{
        "version": 1,
        "filters": [
            { "index": 0, "class_name": "GenerateIPFColors", "parameters": {} },
            { "index": 1, "class_name": "CreateDataArray",
              "parameters": { "NewArray": { "type": "path", "value": { "container": "dc", "matrix": "Data", "array": "X" } } } }
        ]
    }"#;
    let loaded = PipelineDocument::from_json_str(json)
        .unwrap()
        .build(&FilterRegistry::with_builtin_filters());
    assert_eq!(
        loaded.skipped,
        vec![SkippedEntry {
            index: 0,
            class_name: "GenerateIPFColors".to_string()
        }]
    );
    assert_eq!(loaded.pipeline.len(), 1);

    let entry = &PipelineDocument::from_pipeline(&loaded.pipeline).filters[0];
    assert_eq!(entry.parameters.get("ScalarType"), Some(&ParameterValue::ElementKind(ElementKind::Float32)));
    assert_eq!(entry.parameters.get("ComponentDimensions"), Some(&ParameterValue::IntVector(vec![1])));
}

#[test]
fn test_newer_document_version_is_rejected() {
    let err = PipelineDocument::from_json_str(r#"{ "version": 99, "filters": [] }"#).unwrap_err();
    assert_eq!(err.code(), codes::FORMAT);
}

#[test]
fn test_pipeline_travels_with_the_data() {
    let document = PipelineDocument::from_pipeline(&two_filter_pipeline());
    let bytes = write_data_container_array(&sample(), Some(&document), &StrataConfig::default()).unwrap();
    let outcome = read_data_container_array(&bytes, Mode::Preflight, &[]).unwrap();
    assert_eq!(outcome.pipeline, Some(document));
}
