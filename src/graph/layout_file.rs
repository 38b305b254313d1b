use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, ensure};
use tracing::info;

use super::engine::LinkGraph;
use super::world::{WorldPoint, WorldPositions};

pub fn save_layout<'a>(
    path: &Path,
    entities: impl IntoIterator<Item = &'a str>,
    world: &WorldPositions,
) -> Result<usize> {
    let (contents, written) = format_layout(entities, world);
    fs::write(path, contents)
        .with_context(|| format!("failed to write layout file {}", path.display()))?;
    info!(path = %path.display(), entities = written, "layout saved");
    Ok(written)
}

/// Applies a saved layout to entities already in the graph. The whole file is
/// parsed before any position changes, so a bad line leaves the world as is.
pub fn load_layout(path: &Path, links: &mut LinkGraph) -> Result<usize> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read layout file {}", path.display()))?;
    let entries = parse_layout(&raw)
        .with_context(|| format!("failed to parse layout file {}", path.display()))?;

    let mut applied = 0usize;
    for (entity, point) in entries {
        if links.graph().contains(&entity) {
            links.world_mut().set(&entity, point);
            applied += 1;
        }
    }
    info!(path = %path.display(), applied, "layout loaded");
    Ok(applied)
}

fn format_layout<'a>(
    entities: impl IntoIterator<Item = &'a str>,
    world: &WorldPositions,
) -> (String, usize) {
    let mut contents = String::new();
    let mut written = 0usize;

    for entity in entities {
        let Some(point) = world.get(entity) else {
            continue;
        };
        contents.push_str(&urlencoding::encode(entity));
        contents.push(',');
        contents.push_str(&urlencoding::encode(&point.x.to_string()));
        contents.push(',');
        contents.push_str(&urlencoding::encode(&point.y.to_string()));
        contents.push('\n');
        written += 1;
    }

    (contents, written)
}

fn parse_layout(raw: &str) -> Result<Vec<(String, WorldPoint)>> {
    let mut entries = Vec::new();

    for (number, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fields = line.split(',').collect::<Vec<_>>();
        let [entity, x, y] = fields.as_slice() else {
            return Err(anyhow!(
                "line {} has {} fields, expected 3",
                number + 1,
                fields.len()
            ));
        };

        let entity = urlencoding::decode(entity)
            .with_context(|| format!("line {} has a bad entity encoding", number + 1))?;
        let x = decode_coordinate(x).with_context(|| format!("line {} has a bad x", number + 1))?;
        let y = decode_coordinate(y).with_context(|| format!("line {} has a bad y", number + 1))?;
        entries.push((entity.into_owned(), WorldPoint::new(x, y)));
    }

    Ok(entries)
}

fn decode_coordinate(raw: &str) -> Result<f64> {
    let decoded = urlencoding::decode(raw)?;
    let value = decoded.parse::<f64>()?;
    ensure!(value.is_finite(), "coordinate {decoded} is not finite");
    Ok(value)
}
