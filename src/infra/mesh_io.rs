// ============================================================
// Layer 6 — Mesh File I/O
// ============================================================
// Reads mesh templates from disk and writes predicted meshes.
//
// Supported inputs:
//   .ply — ASCII or binary little-endian. Uses the `vertex`
//          element's x/y/z properties and the `face` element's
//          vertex index list. Other elements and properties
//          are parsed and skipped.
//   .obj — loaded with tobj, polygons triangulated, all
//          objects merged into one mesh.
//
// Output:
//   .obj — vertices and triangles, 1-based indices.
//
// Reference: Paul Bourke, PLY Polygon File Format
//            Rust Book §9 (Error Handling)

use anyhow::{anyhow, bail, ensure, Context, Result};
use std::{
    fmt::Write as _,
    fs,
    path::Path,
};

use crate::domain::mesh::MeshTemplate;

/// Load a template, choosing the parser from the file extension.
pub fn read_template(path: &Path) -> Result<MeshTemplate> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let mesh = match ext.as_deref() {
        Some("ply") => fs::read(path)
            .with_context(|| format!("Cannot read mesh template '{}'", path.display()))
            .and_then(|bytes| parse_ply(&bytes)),
        Some("obj") => load_obj(path),
        other => bail!("unsupported mesh template format {:?} for '{}'", other, path.display()),
    }
    .with_context(|| format!("Invalid mesh template '{}'", path.display()))?;

    tracing::info!(
        "Loaded template '{}': {} vertices, {} faces",
        path.display(),
        mesh.vertices.len(),
        mesh.faces.len()
    );
    Ok(mesh)
}

/// Write a mesh as Wavefront OBJ.
pub fn write_obj(path: &Path, vertices: &[[f32; 3]], faces: &[[u32; 3]]) -> Result<()> {
    let mut out = String::with_capacity(vertices.len() * 32 + faces.len() * 24);
    for v in vertices {
        writeln!(out, "v {} {} {}", v[0], v[1], v[2])?;
    }
    for f in faces {
        writeln!(out, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    fs::write(path, out).with_context(|| format!("Cannot write mesh to '{}'", path.display()))
}

// ─── OBJ ──────────────────────────────────────────────────────────────────────
/// Load an OBJ file through tobj. Polygons are triangulated and every
/// object in the file is merged into one mesh.
pub fn load_obj(path: &Path) -> Result<MeshTemplate> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            ..Default::default()
        },
    )
    .map_err(|e| anyhow!("obj load error: {:?}", e))?;

    let mut vertices = Vec::new();
    let mut faces    = Vec::new();

    for model in models {
        let mesh   = &model.mesh;
        let offset = vertices.len() as u32;

        vertices.extend(mesh.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]));
        faces.extend(
            mesh.indices
                .chunks_exact(3)
                .map(|t| [offset + t[0], offset + t[1], offset + t[2]]),
        );
    }

    MeshTemplate::new(vertices, faces)
}

// ─── PLY ──────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
enum Format {
    Ascii,
    BinaryLittleEndian,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Scalar {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl Scalar {
    fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "char" | "int8"     => Scalar::I8,
            "uchar" | "uint8"   => Scalar::U8,
            "short" | "int16"   => Scalar::I16,
            "ushort" | "uint16" => Scalar::U16,
            "int" | "int32"     => Scalar::I32,
            "uint" | "uint32"   => Scalar::U32,
            "float" | "float32" => Scalar::F32,
            "double" | "float64" => Scalar::F64,
            other => bail!("unknown PLY scalar type '{other}'"),
        })
    }

    fn size(self) -> usize {
        match self {
            Scalar::I8 | Scalar::U8   => 1,
            Scalar::I16 | Scalar::U16 => 2,
            Scalar::I32 | Scalar::U32 | Scalar::F32 => 4,
            Scalar::F64 => 8,
        }
    }
}

#[derive(Debug, Clone)]
enum Property {
    Scalar { name: String, ty: Scalar },
    List { name: String, count: Scalar, item: Scalar },
}

impl Property {
    fn name(&self) -> &str {
        match self {
            Property::Scalar { name, .. } | Property::List { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone)]
struct Element {
    name:       String,
    count:      usize,
    properties: Vec<Property>,
}

struct Header {
    format:   Format,
    elements: Vec<Element>,
    body:     usize,
}

fn parse_header(bytes: &[u8]) -> Result<Header> {
    const END: &[u8] = b"end_header";
    let end = bytes
        .windows(END.len())
        .position(|w| w == END)
        .ok_or_else(|| anyhow!("PLY header has no end_header"))?;
    // Body starts after the newline that terminates end_header
    let mut body = end + END.len();
    while body < bytes.len() && bytes[body] != b'\n' {
        body += 1;
    }
    body += 1;

    let text = std::str::from_utf8(&bytes[..end]).context("PLY header is not valid UTF-8")?;
    let mut lines = text.lines().map(str::trim);
    ensure!(lines.next() == Some("ply"), "missing 'ply' magic line");

    let mut format   = None;
    let mut elements: Vec<Element> = Vec::new();

    for line in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["format", "ascii", _] => format = Some(Format::Ascii),
            ["format", "binary_little_endian", _] => format = Some(Format::BinaryLittleEndian),
            ["format", other, _] => bail!("unsupported PLY format '{other}'"),
            ["element", name, count] => elements.push(Element {
                name:       name.to_string(),
                count:      count.parse().with_context(|| format!("bad element count '{count}'"))?,
                properties: Vec::new(),
            }),
            ["property", "list", count, item, name] => {
                let el = elements.last_mut().ok_or_else(|| anyhow!("property before element"))?;
                el.properties.push(Property::List {
                    name:  name.to_string(),
                    count: Scalar::parse(count)?,
                    item:  Scalar::parse(item)?,
                });
            }
            ["property", ty, name] => {
                let el = elements.last_mut().ok_or_else(|| anyhow!("property before element"))?;
                el.properties.push(Property::Scalar { name: name.to_string(), ty: Scalar::parse(ty)? });
            }
            ["comment", ..] | ["obj_info", ..] | [] => {}
            _ => bail!("unrecognised PLY header line '{line}'"),
        }
    }

    let format = format.ok_or_else(|| anyhow!("PLY header has no format line"))?;
    Ok(Header { format, elements, body })
}

/// Sequential reader over the PLY body, ASCII or binary.
struct BodyReader<'a> {
    format: Format,
    bytes:  &'a [u8],
    pos:    usize,
    tokens: std::str::SplitAsciiWhitespace<'a>,
}

impl<'a> BodyReader<'a> {
    fn new(format: Format, body: &'a [u8]) -> Result<Self> {
        let text = match format {
            Format::Ascii => std::str::from_utf8(body).context("ASCII PLY body is not UTF-8")?,
            Format::BinaryLittleEndian => "",
        };
        Ok(Self { format, bytes: body, pos: 0, tokens: text.split_ascii_whitespace() })
    }

    fn read(&mut self, ty: Scalar) -> Result<f64> {
        match self.format {
            Format::Ascii => {
                let tok = self.tokens.next().ok_or_else(|| anyhow!("PLY body ended early"))?;
                tok.parse::<f64>().with_context(|| format!("bad PLY value '{tok}'"))
            }
            Format::BinaryLittleEndian => {
                let n = ty.size();
                ensure!(self.pos + n <= self.bytes.len(), "PLY body ended early");
                let b = &self.bytes[self.pos..self.pos + n];
                self.pos += n;
                Ok(match ty {
                    Scalar::I8  => b[0] as i8 as f64,
                    Scalar::U8  => b[0] as f64,
                    Scalar::I16 => i16::from_le_bytes([b[0], b[1]]) as f64,
                    Scalar::U16 => u16::from_le_bytes([b[0], b[1]]) as f64,
                    Scalar::I32 => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
                    Scalar::U32 => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
                    Scalar::F32 => f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
                    Scalar::F64 => f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]),
                })
            }
        }
    }
}

pub fn parse_ply(bytes: &[u8]) -> Result<MeshTemplate> {
    let header = parse_header(bytes)?;
    let mut reader = BodyReader::new(header.format, &bytes[header.body.min(bytes.len())..])?;

    let mut vertices = Vec::new();
    let mut faces    = Vec::new();

    for element in &header.elements {
        let xyz: Option<[usize; 3]> = if element.name == "vertex" {
            let find = |n: &str| element.properties.iter().position(|p| p.name() == n);
            match (find("x"), find("y"), find("z")) {
                (Some(x), Some(y), Some(z)) => Some([x, y, z]),
                _ => bail!("PLY vertex element lacks x/y/z properties"),
            }
        } else {
            None
        };
        let is_face = element.name == "face";

        for _ in 0..element.count {
            let mut position = [0.0f32; 3];
            for (p_idx, prop) in element.properties.iter().enumerate() {
                match prop {
                    Property::Scalar { ty, .. } => {
                        let value = reader.read(*ty)?;
                        if let Some(axes) = xyz {
                            if let Some(axis) = axes.iter().position(|&a| a == p_idx) {
                                position[axis] = value as f32;
                            }
                        }
                    }
                    Property::List { name, count, item } => {
                        let n = reader.read(*count)?;
                        ensure!(n >= 0.0, "PLY list with negative length {n}");
                        let mut idx = Vec::with_capacity(n as usize);
                        for _ in 0..n as usize {
                            let value = reader.read(*item)?;
                            ensure!(value >= 0.0, "PLY face index {value} is negative");
                            idx.push(value as u32);
                        }
                        let wanted = name == "vertex_indices" || name == "vertex_index";
                        if is_face && wanted {
                            ensure!(idx.len() >= 3, "PLY face with {} vertices", idx.len());
                            for k in 1..idx.len() - 1 {
                                faces.push([idx[0], idx[k], idx[k + 1]]);
                            }
                        }
                    }
                }
            }
            if xyz.is_some() {
                vertices.push(position);
            }
        }
    }

    MeshTemplate::new(vertices, faces)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const ASCII_PLY: &str = "ply
format ascii 1.0
comment tiny quad
element vertex 4
property float x
property float y
property float z
property uchar red
element face 1
property list uchar int vertex_indices
end_header
0 0 0 255
1 0 0 255
1 1 0 255
0 1 -0.5 255
4 0 1 2 3
";

    #[test]
    fn test_ascii_ply_fan_triangulates_quads() {
        let mesh = parse_ply(ASCII_PLY.as_bytes()).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.vertices[3], [0.0, 1.0, -0.5]);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_binary_ply() {
        let mut bytes = b"ply\nformat binary_little_endian 1.0\nelement vertex 3\n\
property float x\nproperty float y\nproperty float z\n\
element face 1\nproperty list uchar uint vertex_indices\nend_header\n"
            .to_vec();
        for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.0]] {
            for c in v {
                bytes.extend_from_slice(&c.to_le_bytes());
            }
        }
        bytes.push(3);
        for i in [0u32, 1, 2] {
            bytes.extend_from_slice(&i.to_le_bytes());
        }

        let mesh = parse_ply(&bytes).unwrap();
        assert_eq!(mesh.vertices[2], [0.0, 2.0, 0.0]);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_ply_without_xyz_is_rejected() {
        let text = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float u\nend_header\n0\n";
        assert!(parse_ply(text.as_bytes()).is_err());
    }

    #[test]
    fn test_big_endian_ply_is_rejected() {
        let text = "ply\nformat binary_big_endian 1.0\nelement vertex 0\nend_header\n";
        let err = parse_ply(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("binary_big_endian"));
    }

    #[test]
    fn test_negative_ply_face_index_is_rejected() {
        let text = "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\n\
property float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n\
0 0 0\n1 0 0\n0 1 0\n3 0 1 -2\n";
        let err = parse_ply(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    fn obj_file(dir: &tempfile::TempDir, text: &str) -> std::path::PathBuf {
        let path = dir.path().join("template.obj");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_obj_with_slashes_and_polygons() {
        let dir  = tempfile::tempdir().unwrap();
        let path = obj_file(&dir, "# cube side\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1 4//1\n");
        let mesh = load_obj(&path).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_obj_objects_are_merged() {
        let dir  = tempfile::tempdir().unwrap();
        let path = obj_file(
            &dir,
            "o a\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\no b\nv 0 0 1\nv 1 0 1\nv 0 1 1\nf 4 5 6\n",
        );
        let mesh = load_obj(&path).unwrap();
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [3, 4, 5]]);
        assert_eq!(mesh.vertices[3], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_missing_obj_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_obj(&dir.path().join("missing.obj")).is_err());
    }

    #[test]
    fn test_obj_round_trip_through_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/mesh.obj");
        let verts = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.5]];
        write_obj(&path, &verts, &[[0, 1, 2]]).unwrap();

        let mesh = read_template(&path).unwrap();
        assert_eq!(mesh.vertices, verts);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_unknown_extension() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.stl");
        fs::write(&path, b"solid").unwrap();
        assert!(read_template(&path).is_err());
    }
}
