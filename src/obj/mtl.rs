use std::sync::Arc;

use log::warn;

use super::{parse_f32, parse_vec3, ObjError};
use crate::assets::sibling_path;
use crate::math::Vector;
use crate::render::{Material, Texture};

/// Parses MTL text. `source` is the path the text was read from; texture
/// paths are resolved next to it but not fetched.
pub fn parse_mtl(
    source: &str,
    text: &str,
    warnings: &mut Vec<String>,
) -> Result<Vec<Material>, ObjError> {
    let mut materials: Vec<Material> = Vec::new();

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
            "newmtl" => {
                let name = parts.next().ok_or_else(|| ObjError::MissingComponent {
                    line: line_no,
                    token: token.to_string(),
                })?;
                materials.push(Material::with_name(name));
            }
            "Ns" => {
                let value = parse_f32(line_no, token, parts.next())?;
                current(&mut materials, line_no, token)?.ns = value;
            }
            "Ka" => {
                let value = parse_color(line_no, token, &mut parts)?;
                current(&mut materials, line_no, token)?.ka = value;
            }
            "Kd" => {
                let value = parse_color(line_no, token, &mut parts)?;
                current(&mut materials, line_no, token)?.kd = value;
            }
            "Ks" => {
                let value = parse_color(line_no, token, &mut parts)?;
                current(&mut materials, line_no, token)?.ks = value;
            }
            "Ke" => {
                let value = parse_color(line_no, token, &mut parts)?;
                current(&mut materials, line_no, token)?.ke = value;
            }
            "Ni" => {
                let value = parse_f32(line_no, token, parts.next())?;
                current(&mut materials, line_no, token)?.ni = value;
            }
            "d" => {
                let value = parse_f32(line_no, token, parts.next())?;
                current(&mut materials, line_no, token)?.d = value;
            }
            "Tr" => {
                let value = parse_f32(line_no, token, parts.next())?;
                current(&mut materials, line_no, token)?.d = 1.0 - value;
            }
            "illum" => {
                let value = parse_f32(line_no, token, parts.next())?;
                current(&mut materials, line_no, token)?.illum = value;
            }
            "map_Kd" => {
                let material = current(&mut materials, line_no, token)?;
                // options such as `-s 1 1 1` come before the file name
                let file = parts.last().ok_or_else(|| ObjError::MissingComponent {
                    line: line_no,
                    token: token.to_string(),
                })?;
                material.map_kd = Some(Arc::new(Texture::new(sibling_path(source, file))));
            }
            _ => {
                let message = format!("[mtl] ignoring unknown token `{token}` on line {line_no}");
                warn!("{message}");
                warnings.push(message);
            }
        }
    }

    Ok(materials)
}

fn current<'a>(
    materials: &'a mut [Material],
    line: usize,
    token: &str,
) -> Result<&'a mut Material, ObjError> {
    materials.last_mut().ok_or_else(|| ObjError::NoCurrentMaterial {
        line,
        token: token.to_string(),
    })
}

fn parse_color<'a>(
    line: usize,
    token: &str,
    parts: &mut impl Iterator<Item = &'a str>,
) -> Result<Vector, ObjError> {
    parse_vec3(line, token, parts).map(Vector::from)
}
