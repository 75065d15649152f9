//! Reader for the subset of the SU2 native mesh format produced by the
//! meshing scripts: 2-D points, triangle elements and line markers tagged
//! WALL, BODY, INLET or OUTLET.

use super::mesh::{FaceKind, Mesh, MeshInput};
use super::{MeshError, MeshFormatError};
use glam::DVec2;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

const VTK_LINE: usize = 3;
const VTK_TRIANGLE: usize = 5;

/// Read and fully preprocess a mesh file.
pub fn read_su2<P: AsRef<Path>>(path: P) -> Result<Mesh, MeshError> {
    let text = fs::read_to_string(path.as_ref())?;
    debug!(path = %path.as_ref().display(), bytes = text.len(), "Reading mesh");
    let input = parse_su2(&text)?;
    Mesh::from_input(&input)
}

/// One significant line: 1-based line number and its tokens.
struct Record<'a> {
    line: usize,
    tokens: Vec<&'a str>,
}

/// Parse the text of a mesh file into raw connectivity.
pub fn parse_su2(text: &str) -> Result<MeshInput, MeshFormatError> {
    let records: Vec<Record> = text
        .lines()
        .enumerate()
        .filter_map(|(i, raw)| {
            let content = raw.split('%').next().unwrap_or("");
            let tokens: Vec<&str> = content.split_whitespace().collect();
            (!tokens.is_empty()).then_some(Record { line: i + 1, tokens })
        })
        .collect();

    let mut nodes: Option<Vec<DVec2>> = None;
    let mut triangles: Option<Vec<[usize; 3]>> = None;
    let mut groups: Vec<(FaceKind, Vec<[usize; 2]>)> = Vec::new();

    let mut i = 0;
    while i < records.len() {
        let rec = &records[i];
        let (keyword, inline_value) = split_keyword(rec.tokens[0]);
        match keyword {
            "NDIME" => {
                let dim: usize = parse_at(rec, inline_value, 1)?;
                if dim != 2 {
                    return Err(MeshFormatError::UnsupportedDimension {
                        line: rec.line,
                        dim,
                    });
                }
                i += 1;
            }
            "NPOIN" => {
                let count: usize = parse_at(rec, inline_value, 1)?;
                let body = block(&records, i + 1, count, "NPOIN")?;
                let mut points = Vec::with_capacity(count);
                for r in body {
                    let x: f64 = parse_token(r, 0)?;
                    let y: f64 = parse_token(r, 1)?;
                    points.push(DVec2::new(x, y));
                }
                nodes = Some(points);
                i += 1 + count;
            }
            "NELEM" => {
                let count: usize = parse_at(rec, inline_value, 1)?;
                let body = block(&records, i + 1, count, "NELEM")?;
                let mut elems = Vec::with_capacity(count);
                for r in body {
                    expect_element(r, VTK_TRIANGLE, "NELEM")?;
                    elems.push([parse_token(r, 1)?, parse_token(r, 2)?, parse_token(r, 3)?]);
                }
                triangles = Some(elems);
                i += 1 + count;
            }
            "MARKER_TAG" => {
                let tag = match inline_value {
                    Some(v) => v,
                    None => *rec.tokens.get(1).ok_or_else(|| {
                        MeshFormatError::UnexpectedEof {
                            section: "MARKER_TAG".into(),
                            expected: 1,
                        }
                    })?,
                };
                let kind = FaceKind::from_marker(tag)
                    .ok_or_else(|| MeshFormatError::UnknownMarker(tag.to_string()))?;

                let header = records.get(i + 1).ok_or_else(|| MeshFormatError::UnexpectedEof {
                    section: format!("MARKER_TAG= {tag}"),
                    expected: 1,
                })?;
                let (elems_kw, elems_value) = split_keyword(header.tokens[0]);
                if elems_kw != "MARKER_ELEMS" {
                    return Err(MeshFormatError::MissingSection("MARKER_ELEMS"));
                }
                let count: usize = parse_at(header, elems_value, 1)?;
                let body = block(&records, i + 2, count, &format!("MARKER_TAG= {tag}"))?;

                let mut edges = Vec::with_capacity(count);
                for r in body {
                    expect_element(r, VTK_LINE, "MARKER_ELEMS")?;
                    let a: usize = parse_token(r, 1)?;
                    let b: usize = parse_token(r, 2)?;
                    // Body contours run the opposite way to the outer boundary.
                    edges.push(if kind == FaceKind::Body { [b, a] } else { [a, b] });
                }
                groups.push((kind, edges));
                i += 2 + count;
            }
            _ => i += 1,
        }
    }

    let nodes = nodes.ok_or(MeshFormatError::MissingSection("NPOIN"))?;
    let triangles = triangles.ok_or(MeshFormatError::MissingSection("NELEM"))?;
    let boundary_edges = groups
        .into_iter()
        .flat_map(|(kind, edges)| edges.into_iter().map(move |e| (kind, e)))
        .collect();

    Ok(MeshInput {
        nodes,
        boundary_edges,
        triangles,
    })
}

/// Split `KEY=value` or `KEY=` into the keyword and an optional glued value.
fn split_keyword(token: &str) -> (&str, Option<&str>) {
    match token.split_once('=') {
        Some((key, "")) => (key, None),
        Some((key, value)) => (key, Some(value)),
        None => (token, None),
    }
}

fn block<'r, 'a>(
    records: &'r [Record<'a>],
    start: usize,
    count: usize,
    section: &str,
) -> Result<&'r [Record<'a>], MeshFormatError> {
    if count > records.len().saturating_sub(start) {
        return Err(MeshFormatError::UnexpectedEof {
            section: section.to_string(),
            expected: count,
        });
    }
    Ok(&records[start..start + count])
}

fn parse_at<T: FromStr>(
    rec: &Record,
    inline: Option<&str>,
    index: usize,
) -> Result<T, MeshFormatError> {
    match inline {
        Some(value) => parse_str(value, rec.line),
        None => parse_token(rec, index),
    }
}

fn parse_token<T: FromStr>(rec: &Record, index: usize) -> Result<T, MeshFormatError> {
    let token = rec.tokens.get(index).ok_or_else(|| MeshFormatError::InvalidNumber {
        line: rec.line,
        token: String::new(),
    })?;
    parse_str(token, rec.line)
}

fn parse_str<T: FromStr>(token: &str, line: usize) -> Result<T, MeshFormatError> {
    token.parse().map_err(|_| MeshFormatError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

fn expect_element(rec: &Record, expected: usize, section: &str) -> Result<(), MeshFormatError> {
    let kind: usize = parse_token(rec, 0)?;
    if kind == expected {
        Ok(())
    } else {
        Err(MeshFormatError::UnsupportedElement {
            line: rec.line,
            kind,
            section: section.to_string(),
        })
    }
}
