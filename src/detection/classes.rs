use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum Names {
    List(Vec<String>),
    Map(BTreeMap<u32, String>),
}

#[derive(Deserialize)]
struct Dataset {
    names: Names,
}

/// Load class names indexed by class id.
///
/// `.yaml`/`.yml` files are read as a YOLO dataset description with a
/// `names` list or `id: name` map; anything else as one name per line.
pub fn load_class_names(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read class names from {}", path.display()))?;

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    if is_yaml {
        let dataset: Dataset = serde_yaml::from_str(&text)
            .with_context(|| format!("Invalid dataset file {}", path.display()))?;
        return Ok(names_from(dataset.names));
    }

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn names_from(names: Names) -> Vec<String> {
    match names {
        Names::List(list) => list,
        Names::Map(map) => {
            let len = map.keys().next_back().map(|k| *k as usize + 1).unwrap_or(0);
            (0..len)
                .map(|id| map.get(&(id as u32)).cloned().unwrap_or_else(|| id.to_string()))
                .collect()
        }
    }
}
