//! Reads and writes a whole `DataContainerArray` as one self-describing file.
//! This module is the single source of truth for serialization, deserialization,
//! and header-only peeking of the format described in [`super::format`].

use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use crate::arrays::{AnyArray, TypedArray};
use crate::config::StrataConfig;
use crate::containers::{DataArrayPath, DataContainerArray};
use crate::error::{Result, StrataError};
use crate::filter::Mode;
use crate::geometry::mesh::{SHARED_ELEMENT_LIST, SHARED_VERTEX_LIST};
use crate::geometry::{Geometry, MeshGeometry, MeshKind};
use crate::persistence::codec;
use crate::persistence::format::*;
use crate::persistence::pipeline_file::PipelineDocument;
use crate::persistence::schema::{DataContainerArraySchema, GeometrySchema};
use crate::traits::Element;
use crate::utils::checked_product;

/// What a read hands back besides the registry itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    pub dca: DataContainerArray,
    /// Non-fatal problems, e.g. arrays whose payload is missing in a preflight read.
    pub warnings: Vec<String>,
    pub pipeline: Option<PipelineDocument>,
}

//==================================================================================
// 1. Writing
//==================================================================================

struct PayloadWriter {
    payloads: Vec<u8>,
    manifest: Vec<PayloadEntry>,
    compress: bool,
    level: i32,
}

impl PayloadWriter {
    fn push(&mut self, key: PayloadKey, raw: &[u8]) -> Result<()> {
        let stored = if self.compress {
            codec::encode(raw, self.level)?
        } else {
            raw.to_vec()
        };
        self.manifest.push(PayloadEntry {
            key,
            offset: self.payloads.len() as u64,
            stored_size: stored.len() as u64,
            compressed: self.compress,
        });
        self.payloads.extend_from_slice(&stored);
        Ok(())
    }
}

/// Serializes `dca` (and optionally the pipeline that produced it).
///
/// Arrays that were never allocated are described in the schema but get no
/// payload, so a preflight-time registry reads back with the same schema in
/// preflight mode and fails an execute read.
pub fn write_data_container_array(
    dca: &DataContainerArray,
    pipeline: Option<&PipelineDocument>,
    config: &StrataConfig,
) -> Result<Vec<u8>> {
    let mut writer = PayloadWriter {
        payloads: Vec::new(),
        manifest: Vec::new(),
        compress: config.compress_payloads,
        level: config.compression_level,
    };

    for container in dca.containers() {
        if let Some(Geometry::Mesh(mesh)) = container.geometry() {
            writer.push(
                PayloadKey::GeometryVertices { container: container.name().to_string() },
                &Element::encode_le(mesh.vertices().as_slice()),
            )?;
            writer.push(
                PayloadKey::GeometryElements { container: container.name().to_string() },
                &Element::encode_le(mesh.elements().as_slice()),
            )?;
        }
        for matrix in container.matrices() {
            for (name, array) in matrix.arrays() {
                if !array.is_allocated() {
                    log::debug!("skipping payload of unallocated array '{}'", name);
                    continue;
                }
                let path = DataArrayPath::new(container.name(), matrix.name(), name);
                writer.push(PayloadKey::Array { path }, &array.to_le_bytes())?;
            }
        }
    }

    let header = FileHeader {
        writer_version: crate::VERSION.to_string(),
        schema: DataContainerArraySchema::from_dca(dca),
        manifest: writer.manifest,
        pipeline: pipeline.cloned(),
    };
    let header_json = serde_json::to_vec(&header)?;
    if header_json.len() > MAX_HEADER_LEN {
        return Err(StrataError::Format(format!(
            "Header of {} bytes exceeds the {} byte limit",
            header_json.len(),
            MAX_HEADER_LEN
        )));
    }

    let mut out = Vec::with_capacity(PREAMBLE_SIZE + header_json.len() + writer.payloads.len());
    out.extend_from_slice(FILE_MAGIC);
    out.extend_from_slice(&FILE_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(header_json.len() as u32).to_le_bytes());
    out.extend_from_slice(&header_json);
    out.extend_from_slice(&writer.payloads);

    log::info!(
        "wrote {} containers, {} payloads, {} bytes",
        header.schema.containers.len(),
        header.manifest.len(),
        out.len()
    );
    Ok(out)
}

pub fn write_file(
    path: &Path,
    dca: &DataContainerArray,
    pipeline: Option<&PipelineDocument>,
    config: &StrataConfig,
) -> Result<()> {
    let bytes = write_data_container_array(dca, pipeline, config)?;
    fs::write(path, bytes)?;
    Ok(())
}

//==================================================================================
// 2. Header Peeking
//==================================================================================

/// Reads the preamble and the JSON header, leaving the reader at the first payload.
/// Returns the header and the payload-section offset.
fn read_header<R: Read>(reader: &mut R) -> Result<(FileHeader, usize)> {
    let mut preamble = [0u8; PREAMBLE_SIZE];
    reader
        .read_exact(&mut preamble)
        .map_err(|e| StrataError::Io(format!("file preamble is truncated: {}", e)))?;

    if preamble[0..4] != FILE_MAGIC[..] {
        return Err(StrataError::Format("Invalid file magic number".into()));
    }
    let version = u16::from_le_bytes([preamble[4], preamble[5]]);
    if version != FILE_FORMAT_VERSION {
        return Err(StrataError::Format(format!(
            "Unsupported file version: expected {}, got {}",
            FILE_FORMAT_VERSION, version
        )));
    }
    let header_len =
        u32::from_le_bytes([preamble[6], preamble[7], preamble[8], preamble[9]]) as usize;
    if header_len > MAX_HEADER_LEN {
        return Err(StrataError::Format(format!(
            "Header length {} exceeds the {} byte limit",
            header_len, MAX_HEADER_LEN
        )));
    }

    let mut header_bytes = vec![0u8; header_len];
    reader
        .read_exact(&mut header_bytes)
        .map_err(|e| StrataError::Io(format!("file header is truncated: {}", e)))?;
    let header: FileHeader = serde_json::from_slice(&header_bytes)?;
    Ok((header, PREAMBLE_SIZE + header_len))
}

/// Parses only the header of an in-memory file; payloads are not touched.
pub fn peek_header(bytes: &[u8]) -> Result<FileHeader> {
    Ok(read_header(&mut Cursor::new(bytes))?.0)
}

pub fn peek_schema(bytes: &[u8]) -> Result<DataContainerArraySchema> {
    Ok(peek_header(bytes)?.schema)
}

/// Reads the header of a file on disk without reading any payload.
pub fn peek_file_header(path: &Path) -> Result<FileHeader> {
    let mut reader = BufReader::new(File::open(path)?);
    Ok(read_header(&mut reader)?.0)
}

//==================================================================================
// 3. Reading
//==================================================================================

/// Rebuilds a registry from an in-memory file.
///
/// In preflight mode only the header is used: every array in the schema comes
/// back unallocated, and one without a stored payload adds a warning. In execute
/// mode every selected payload is materialized, and a missing or truncated
/// payload is an `Io` error. `selection` follows [`DataContainerArraySchema::select`].
pub fn read_data_container_array(
    bytes: &[u8],
    mode: Mode,
    selection: &[DataArrayPath],
) -> Result<ReadOutcome> {
    let (header, payload_start) = read_header(&mut Cursor::new(bytes))?;
    let payloads = bytes.get(payload_start..).unwrap_or(&[]);
    materialize(&header, payloads, mode, selection)
}

/// File-backed [`read_data_container_array`]; a preflight read opens the file
/// but reads only its header.
pub fn read_file(path: &Path, mode: Mode, selection: &[DataArrayPath]) -> Result<ReadOutcome> {
    match mode {
        Mode::Preflight => {
            let header = peek_file_header(path)?;
            materialize(&header, &[], mode, selection)
        }
        Mode::Execute => {
            let bytes = fs::read(path)?;
            read_data_container_array(&bytes, mode, selection)
        }
    }
}

struct PayloadReader<'a> {
    header: &'a FileHeader,
    payloads: &'a [u8],
}

impl PayloadReader<'_> {
    fn payload(&self, key: &PayloadKey) -> Result<Vec<u8>> {
        let entry = self
            .header
            .entry(key)
            .ok_or_else(|| StrataError::Io(format!("the payload of the {} is missing", key)))?;
        let truncated = || StrataError::Io(format!("the payload of the {} is truncated", key));
        let start = usize::try_from(entry.offset).map_err(|_| truncated())?;
        let len = usize::try_from(entry.stored_size).map_err(|_| truncated())?;
        let end = start.checked_add(len).ok_or_else(truncated)?;
        let stored = self.payloads.get(start..end).ok_or_else(truncated)?;
        if entry.compressed {
            codec::decode(stored)
        } else {
            Ok(stored.to_vec())
        }
    }
}

fn materialize(
    header: &FileHeader,
    payloads: &[u8],
    mode: Mode,
    selection: &[DataArrayPath],
) -> Result<ReadOutcome> {
    let schema = header.schema.select(selection);
    let reader = PayloadReader { header, payloads };
    let mut warnings = Vec::new();
    let mut dca = DataContainerArray::new();

    for container_schema in &schema.containers {
        let container = dca.create_container(&container_schema.name)?;
        if let Some(geometry) = &container_schema.geometry {
            container.set_geometry(load_geometry(&reader, &container_schema.name, geometry, mode)?);
        }

        for matrix_schema in &container_schema.matrices {
            let matrix = container.create_matrix(
                &matrix_schema.name,
                matrix_schema.tuple_dims.clone(),
                matrix_schema.category,
            )?;
            for array_schema in &matrix_schema.arrays {
                let path = DataArrayPath::new(
                    &container_schema.name,
                    &matrix_schema.name,
                    &array_schema.name,
                );
                if array_schema.format_version > ARRAY_FORMAT_VERSION {
                    return Err(StrataError::Format(format!(
                        "data array '{}' uses format version {}, newer than the supported {}",
                        path, array_schema.format_version, ARRAY_FORMAT_VERSION
                    )));
                }
                let key = PayloadKey::Array { path: path.clone() };
                let array = match mode {
                    Mode::Preflight => {
                        // Shape comes from the schema; the payload only matters to execute.
                        if header.entry(&key).is_none() {
                            let message = format!(
                                "The {} has no stored payload and cannot be read in execute mode",
                                key
                            );
                            log::warn!("{}", message);
                            warnings.push(message);
                        }
                        AnyArray::unallocated(
                            array_schema.kind,
                            &array_schema.name,
                            array_schema.component_dims.clone(),
                        )?
                    }
                    Mode::Execute => {
                        let raw = reader.payload(&key)?;
                        let array = AnyArray::from_le_bytes(
                            array_schema.kind,
                            &array_schema.name,
                            array_schema.component_dims.clone(),
                            &raw,
                        )
                        .map_err(|e| StrataError::Io(format!("the {} is corrupt: {}", key, e)))?;
                        let expected = checked_product(&array_schema.tuple_dims)?;
                        if array.num_tuples() != expected {
                            return Err(StrataError::Io(format!(
                                "the {} holds {} tuples but {} were recorded",
                                key,
                                array.num_tuples(),
                                expected
                            )));
                        }
                        array
                    }
                };
                matrix.add_array(&array_schema.name, array)?;
            }
        }
    }

    log::debug!(
        "materialized {} containers ({:?} mode, {} warnings)",
        schema.containers.len(),
        mode,
        warnings.len()
    );
    Ok(ReadOutcome {
        dca,
        warnings,
        pipeline: header.pipeline.clone(),
    })
}

fn load_geometry(
    reader: &PayloadReader<'_>,
    container: &str,
    schema: &GeometrySchema,
    mode: Mode,
) -> Result<Geometry> {
    match schema {
        GeometrySchema::Image(image) => Ok(Geometry::Image(image.clone())),
        GeometrySchema::Mesh { kind, .. } if mode == Mode::Preflight => {
            Ok(Geometry::Mesh(MeshGeometry::placeholder(*kind)?))
        }
        GeometrySchema::Mesh {
            kind,
            num_vertices,
            num_elements,
        } => load_mesh(reader, container, *kind, *num_vertices, *num_elements).map(Geometry::Mesh),
    }
}

fn load_mesh(
    reader: &PayloadReader<'_>,
    container: &str,
    kind: MeshKind,
    num_vertices: usize,
    num_elements: usize,
) -> Result<MeshGeometry> {
    let vertex_key = PayloadKey::GeometryVertices { container: container.to_string() };
    let element_key = PayloadKey::GeometryElements { container: container.to_string() };

    let coords = <f32 as Element>::decode_le(&reader.payload(&vertex_key)?)
        .map_err(|e| StrataError::Io(format!("the {} is corrupt: {}", vertex_key, e)))?;
    let indices = <i64 as Element>::decode_le(&reader.payload(&element_key)?)
        .map_err(|e| StrataError::Io(format!("the {} is corrupt: {}", element_key, e)))?;

    let vertices = TypedArray::from_vec(SHARED_VERTEX_LIST, vec![3], coords)?;
    let elements = TypedArray::from_vec(SHARED_ELEMENT_LIST, vec![kind.verts_per_element()], indices)?;
    if vertices.num_tuples() != num_vertices || elements.num_tuples() != num_elements {
        return Err(StrataError::Io(format!(
            "mesh of data container '{}' holds {} vertices and {} elements but {} and {} were recorded",
            container,
            vertices.num_tuples(),
            elements.num_tuples(),
            num_vertices,
            num_elements
        )));
    }
    MeshGeometry::new(kind, vertices, elements)
}
