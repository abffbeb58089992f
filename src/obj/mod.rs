//! Wavefront OBJ and MTL loading.
//!
//! Only triangles are accepted; faces with any other vertex count are
//! skipped with a warning. Every `usemtl` starts a new mesh bound to that
//! material, and faces that appear before any `usemtl` go to a mesh with the
//! default material.

mod mesh;
mod mtl;

use log::{info, warn};
use thiserror::Error;

use crate::assets::{sibling_path, AssetSource};
use crate::render::backend::GraphicsBackend;
use crate::render::{Material, Mesh, Renderer};

pub use mesh::ObjMesh;
pub use mtl::parse_mtl;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("invalid number `{value}` for `{token}` on line {line}")]
    InvalidNumber {
        line: usize,
        token: String,
        value: String,
    },
    #[error("`{token}` on line {line} is missing a value")]
    MissingComponent { line: usize, token: String },
    #[error("{kind} index {index} on line {line} is out of range")]
    IndexOutOfRange {
        line: usize,
        kind: &'static str,
        index: i64,
    },
    #[error("material `{name}` used on line {line} is not defined")]
    UndefinedMaterial { line: usize, name: String },
    #[error("`{token}` on line {line} appears before any `newmtl`")]
    NoCurrentMaterial { line: usize, token: String },
    #[error("in material library {path}")]
    Mtl {
        path: String,
        #[source]
        source: Box<ObjError>,
    },
    #[error("failed to fetch {path}")]
    Fetch {
        path: String,
        #[source]
        source: BoxError,
    },
}

/// A parsed OBJ file whose meshes have not been uploaded yet.
#[derive(Debug, Default)]
pub struct ObjDocument {
    source: String,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    materials: Vec<Material>,
    meshes: Vec<ObjMesh>,
    warnings: Vec<String>,
}

impl ObjDocument {
    /// Fetches `source` and parses it, pulling in referenced material
    /// libraries.
    pub async fn parse<A: AssetSource>(source: &str, assets: &A) -> Result<Self, ObjError> {
        let text = fetch_text(source, assets).await?;
        Self::parse_str(source, &text, assets).await
    }

    /// Parses OBJ text that was read from `source`.
    pub async fn parse_str<A: AssetSource>(
        source: &str,
        text: &str,
        assets: &A,
    ) -> Result<Self, ObjError> {
        let mut document = Self {
            source: source.to_string(),
            ..Self::default()
        };

        for (line_no, line) in text.lines().enumerate() {
            let line_no = line_no + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut parts = trimmed.split_whitespace();
            let Some(token) = parts.next() else {
                continue;
            };

            match token {
                "v" => {
                    let [x, y, z] = parse_vec3(line_no, token, &mut parts)?;
                    let w = match parts.next() {
                        Some(w) => parse_f32(line_no, token, Some(w))?,
                        None => 1.0,
                    };
                    document.positions.push([x / w, y / w, z / w]);
                }
                "vn" => {
                    let normal = parse_vec3(line_no, token, &mut parts)?;
                    document.normals.push(normal);
                }
                "vt" => {
                    let u = parse_f32(line_no, token, parts.next())?;
                    let v = match parts.next() {
                        Some(v) => parse_f32(line_no, token, Some(v))?,
                        None => 0.0,
                    };
                    document.texcoords.push([u, v]);
                }
                "f" => document.add_face(line_no, parts)?,
                "mtllib" => {
                    let names: Vec<&str> = parts.collect();
                    if names.is_empty() {
                        return Err(ObjError::MissingComponent {
                            line: line_no,
                            token: token.to_string(),
                        });
                    }
                    for name in names {
                        document.load_library(name, assets).await?;
                    }
                }
                "usemtl" => {
                    let name = parts.next().ok_or_else(|| ObjError::MissingComponent {
                        line: line_no,
                        token: token.to_string(),
                    })?;
                    document.use_material(line_no, name)?;
                }
                _ => document.warn(format!(
                    "[obj] ignoring unknown token `{token}` on line {line_no}"
                )),
            }
        }

        Ok(document)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn meshes(&self) -> &[ObjMesh] {
        &self.meshes
    }

    /// Materials from every `mtllib`, in load order.
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Everything that was skipped while parsing, OBJ and MTL alike.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(ObjMesh::triangle_count).sum()
    }

    /// Uploads every mesh and loads its diffuse texture.
    pub async fn finalize<A, B>(self, assets: &A, renderer: &mut Renderer<B>) -> Vec<Mesh>
    where
        A: AssetSource,
        B: GraphicsBackend,
    {
        let mut meshes = Vec::with_capacity(self.meshes.len());
        let mut triangles = 0;
        for source in &self.meshes {
            let mesh = Mesh::initialize(source, renderer);
            if let Some(texture) = &source.material_ref().map_kd {
                texture.load(assets, renderer).await;
            }
            triangles += mesh.triangle_count();
            meshes.push(mesh);
        }
        info!("[obj] loaded `{}` with {triangles} triangles", self.source);
        meshes
    }

    fn add_face<'a>(
        &mut self,
        line: usize,
        corners: impl Iterator<Item = &'a str>,
    ) -> Result<(), ObjError> {
        if self.meshes.is_empty() {
            self.meshes.push(ObjMesh::new(Material::default()));
        }
        let corners: Vec<&str> = corners.collect();
        if corners.len() != 3 {
            self.warn(format!(
                "[obj] ignoring face with {} vertices on line {line}, only triangles are supported",
                corners.len()
            ));
            return Ok(());
        }

        let mut resolved = Vec::with_capacity(3);
        for corner in corners {
            resolved.push(self.resolve_corner(line, corner)?);
        }
        if let Some(mesh) = self.meshes.last_mut() {
            for (position, normal, texcoord) in resolved {
                mesh.add_vertex(position, normal, texcoord);
            }
        }
        Ok(())
    }

    /// Looks up a `v/vt/vn` triple. Missing texture coordinates and normals
    /// read as zeros.
    fn resolve_corner(
        &self,
        line: usize,
        corner: &str,
    ) -> Result<([f32; 3], [f32; 3], [f32; 2]), ObjError> {
        let mut indices = corner.split('/');
        let position = match indices.next() {
            Some(index) if !index.is_empty() => {
                lookup(line, "vertex", index, &self.positions)?
            }
            _ => {
                return Err(ObjError::MissingComponent {
                    line,
                    token: "f".to_string(),
                })
            }
        };
        let texcoord = match indices.next() {
            Some(index) if !index.is_empty() => {
                lookup(line, "texture coordinate", index, &self.texcoords)?
            }
            _ => [0.0; 2],
        };
        let normal = match indices.next() {
            Some(index) if !index.is_empty() => lookup(line, "normal", index, &self.normals)?,
            _ => [0.0; 3],
        };
        Ok((position, normal, texcoord))
    }

    async fn load_library<A: AssetSource>(
        &mut self,
        name: &str,
        assets: &A,
    ) -> Result<(), ObjError> {
        let path = sibling_path(&self.source, name);
        let text = fetch_text(&path, assets).await?;
        let materials =
            parse_mtl(&path, &text, &mut self.warnings).map_err(|err| ObjError::Mtl {
                path: path.clone(),
                source: Box::new(err),
            })?;
        self.materials.extend(materials);
        Ok(())
    }

    fn use_material(&mut self, line: usize, name: &str) -> Result<(), ObjError> {
        let material = self
            .materials
            .iter()
            .find(|material| material.name == name)
            .ok_or_else(|| ObjError::UndefinedMaterial {
                line,
                name: name.to_string(),
            })?;
        self.meshes.push(ObjMesh::new(material.clone()));
        Ok(())
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// Fetches, parses and uploads an OBJ model.
pub async fn load_obj<A, B>(
    path: &str,
    assets: &A,
    renderer: &mut Renderer<B>,
) -> Result<Vec<Mesh>, ObjError>
where
    A: AssetSource,
    B: GraphicsBackend,
{
    let document = ObjDocument::parse(path, assets).await?;
    Ok(document.finalize(assets, renderer).await)
}

async fn fetch_text<A: AssetSource>(path: &str, assets: &A) -> Result<String, ObjError> {
    assets
        .read_text(path)
        .await
        .map_err(|err| ObjError::Fetch {
            path: path.to_string(),
            source: err.into(),
        })
}

fn parse_f32(line: usize, token: &str, value: Option<&str>) -> Result<f32, ObjError> {
    let value = value.ok_or_else(|| ObjError::MissingComponent {
        line,
        token: token.to_string(),
    })?;
    value.parse().map_err(|_| ObjError::InvalidNumber {
        line,
        token: token.to_string(),
        value: value.to_string(),
    })
}

fn parse_vec3<'a>(
    line: usize,
    token: &str,
    parts: &mut impl Iterator<Item = &'a str>,
) -> Result<[f32; 3], ObjError> {
    Ok([
        parse_f32(line, token, parts.next())?,
        parse_f32(line, token, parts.next())?,
        parse_f32(line, token, parts.next())?,
    ])
}

fn lookup<T: Copy>(
    line: usize,
    kind: &'static str,
    index: &str,
    items: &[T],
) -> Result<T, ObjError> {
    let parsed: i64 = index.parse().map_err(|_| ObjError::InvalidNumber {
        line,
        token: "f".to_string(),
        value: index.to_string(),
    })?;
    fix_index(parsed, items.len())
        .map(|i| items[i])
        .ok_or(ObjError::IndexOutOfRange {
            line,
            kind,
            index: parsed,
        })
}

/// OBJ indices are 1-based; negative values count back from the end.
fn fix_index(index: i64, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let back = index.unsigned_abs() as usize;
        (back <= len).then(|| len - back)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::assets::MemoryAssets;
    use crate::entity::Entity;
    use crate::math::Vector;
    use crate::render::backend::{Command, HeadlessBackend};
    use crate::render::{MeshComponent, TextureState};

    const TRIANGLE: &str = "\
# one triangle
v 0 0 0
v 1 0 0
v 0 1 0
vn 0 0 1
vt 0.5 1
f 1/1/1 2/1/1 3/1/1
";

    fn parse(text: &str, assets: &MemoryAssets) -> Result<ObjDocument, ObjError> {
        pollster::block_on(ObjDocument::parse_str("models/test.obj", text, assets))
    }

    fn png() -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 128, 255, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn parses_single_triangle() {
        let document = parse(TRIANGLE, &MemoryAssets::new()).unwrap();
        assert_eq!(document.meshes().len(), 1);
        let mesh = &document.meshes()[0];
        assert_eq!(mesh.indices(), &[0, 1, 2]);
        assert_eq!(mesh.positions(), &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(mesh.normals(), &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(mesh.texcoords(), &[0.5, 1.0, 0.5, 1.0, 0.5, 1.0]);
        assert_eq!(mesh.material_ref().name, "default");
        assert!(document.warnings().is_empty());
    }

    #[test]
    fn vertices_are_divided_by_w() {
        let text = "v 2 4 6 2\nv 1 1 1\nv 0 0 0 0.5\nf 1 2 3\n";
        let document = parse(text, &MemoryAssets::new()).unwrap();
        assert_eq!(
            document.meshes()[0].positions(),
            &[1.0, 2.0, 3.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn quad_is_skipped_and_parsing_continues() {
        let text = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
f 1 2 3
";
        let document = parse(text, &MemoryAssets::new()).unwrap();
        assert_eq!(document.warnings().len(), 1);
        assert!(document.warnings()[0].contains("4 vertices"));
        assert_eq!(document.meshes()[0].vertex_count(), 3);
        assert_eq!(document.triangle_count(), 1);
    }

    #[test]
    fn undefined_material_is_fatal() {
        let text = "v 0 0 0\nusemtl DoesNotExist\nf 1 1 1\n";
        let err = parse(text, &MemoryAssets::new()).unwrap_err();
        assert!(matches!(
            err,
            ObjError::UndefinedMaterial { line: 2, ref name } if name == "DoesNotExist"
        ));
    }

    #[test]
    fn usemtl_starts_a_mesh_per_material() {
        let assets = MemoryAssets::new().with(
            "models/test.mtl",
            "newmtl Red\nKd 1 0 0\nnewmtl Blue\nKd 0 0 1\n",
        );
        let text = "\
mtllib test.mtl
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
usemtl Red
f 1 2 3
f 3 2 1
usemtl Blue
f 1 2 3
";
        let document = parse(text, &assets).unwrap();
        let names: Vec<_> = document
            .meshes()
            .iter()
            .map(|mesh| mesh.material_ref().name.as_str())
            .collect();
        assert_eq!(names, ["default", "Red", "Blue"]);
        let triangles: Vec<_> = document.meshes().iter().map(ObjMesh::triangle_count).collect();
        assert_eq!(triangles, [1, 2, 1]);
        assert_eq!(document.materials().len(), 2);
        assert_eq!(document.meshes()[2].material_ref().kd, Vector::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn unknown_tokens_warn_from_both_files() {
        let assets = MemoryAssets::new().with("models/test.mtl", "newmtl A\nmap_Ks s.png\n");
        let text = "mtllib test.mtl\no Thing\ns off\n";
        let document = parse(text, &assets).unwrap();
        assert_eq!(document.warnings().len(), 3);
        assert!(document.warnings()[0].starts_with("[mtl]"));
        assert!(document.warnings()[1].contains("`o`"));
    }

    #[test]
    fn indices_may_be_negative_or_partial() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 1 0\nf -3//-1 -2//-1 -1//-1\nf 1 2/ 3//\n";
        let document = parse(text, &MemoryAssets::new()).unwrap();
        let mesh = &document.meshes()[0];
        assert_eq!(&mesh.positions()[..9], &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(&mesh.normals()[..3], &[0.0, 1.0, 0.0]);
        assert_eq!(&mesh.normals()[9..], &[0.0; 9]);
        assert_eq!(mesh.texcoords(), &[0.0; 12]);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let text = "v 0 0 0\nf 1 2 1\n";
        let err = parse(text, &MemoryAssets::new()).unwrap_err();
        assert!(matches!(
            err,
            ObjError::IndexOutOfRange {
                line: 2,
                kind: "vertex",
                index: 2
            }
        ));
        let err = parse("v 0 0 0\nf 0 1 1\n", &MemoryAssets::new()).unwrap_err();
        assert!(matches!(err, ObjError::IndexOutOfRange { index: 0, .. }));
    }

    #[test]
    fn invalid_numbers_are_errors() {
        let err = parse("v 0 zero 0\n", &MemoryAssets::new()).unwrap_err();
        assert!(matches!(
            err,
            ObjError::InvalidNumber { line: 1, ref value, .. } if value == "zero"
        ));
        let err = parse("vn 0 1\n", &MemoryAssets::new()).unwrap_err();
        assert!(matches!(err, ObjError::MissingComponent { line: 1, .. }));
    }

    #[test]
    fn missing_library_is_a_fetch_error() {
        let err = parse("mtllib gone.mtl\n", &MemoryAssets::new()).unwrap_err();
        assert!(matches!(err, ObjError::Fetch { ref path, .. } if path == "models/gone.mtl"));
    }

    #[test]
    fn broken_library_names_its_path() {
        let assets = MemoryAssets::new().with("models/test.mtl", "Kd 1 1 1\n");
        let err = parse("mtllib test.mtl\n", &assets).unwrap_err();
        assert_eq!(err.to_string(), "in material library models/test.mtl");
        assert!(matches!(err, ObjError::Mtl { ref source, .. }
            if matches!(**source, ObjError::NoCurrentMaterial { line: 1, .. })));
    }

    #[test]
    fn load_obj_uploads_meshes_and_textures() {
        let assets = MemoryAssets::new()
            .with(
                "models/test.obj",
                format!("mtllib test.mtl\nusemtl Painted\n{TRIANGLE}usemtl Painted\n{TRIANGLE}"),
            )
            .with("models/test.mtl", "newmtl Painted\nmap_Kd paint.png\n")
            .with("models/paint.png", png());
        let mut renderer = Renderer::new(HeadlessBackend::new());
        let meshes = pollster::block_on(load_obj("models/test.obj", &assets, &mut renderer)).unwrap();

        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0].triangle_count(), 1);
        let texture = meshes[0].material().map_kd.as_ref().unwrap();
        assert!(matches!(texture.state(), TextureState::Loaded(_)));
        let uploads = renderer
            .backend()
            .commands()
            .iter()
            .filter(|command| matches!(command, Command::CreateTexture { width: 4, .. }))
            .count();
        assert_eq!(uploads, 1);
    }

    #[test]
    fn missing_texture_still_loads_model() {
        let assets = MemoryAssets::new()
            .with("models/test.obj", format!("mtllib test.mtl\nusemtl A\n{TRIANGLE}"))
            .with("models/test.mtl", "newmtl A\nmap_Kd missing.png\n");
        let mut renderer = Renderer::new(HeadlessBackend::new());
        let meshes = pollster::block_on(load_obj("models/test.obj", &assets, &mut renderer)).unwrap();
        let texture = meshes[0].material().map_kd.as_ref().unwrap();
        assert_eq!(texture.state(), TextureState::Failed);
    }

    #[test]
    fn entity_from_obj_carries_meshes() {
        let assets = MemoryAssets::new().with("ship.obj", TRIANGLE);
        let mut renderer = Renderer::new(HeadlessBackend::new());
        let entity =
            pollster::block_on(Entity::load_obj("ship", "ship.obj", &assets, &mut renderer))
                .unwrap();
        assert_eq!(entity.name(), "ship");
        let meshes = entity.expect_component::<MeshComponent>().unwrap();
        assert_eq!(meshes.triangle_count(), 1);
    }

    #[test]
    fn fix_index_handles_both_directions() {
        assert_eq!(fix_index(1, 3), Some(0));
        assert_eq!(fix_index(3, 3), Some(2));
        assert_eq!(fix_index(4, 3), None);
        assert_eq!(fix_index(-1, 3), Some(2));
        assert_eq!(fix_index(-3, 3), Some(0));
        assert_eq!(fix_index(-4, 3), None);
        assert_eq!(fix_index(0, 3), None);
    }
}
