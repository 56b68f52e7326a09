//! Resolution pipeline: reads data files, resolves names into ids, builds the
//! recipe table and tier configuration.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers, plus [`load_sluice_data`] which ties them
//! together for a whole data directory.

use crate::schema::{FluidData, GeneralData, ItemData, RecipeData, TierData};
use serde::de::DeserializeOwned;
use sluice_core::fixed::{Thousandths, f64_to_fixed64};
use sluice_core::id::{FluidId, ItemTypeId};
use sluice_core::mesh::Mesh;
use sluice_core::recipe::{RecipeCandidate, RecipeEntry, RecipeTable};
use sluice_core::tier::{GlobalConfig, Tier, TierConfig};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A value parsed but is out of range.
    #[error("invalid value in {file}: {detail}")]
    InvalidValue { file: PathBuf, detail: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    match detect_format(path)? {
        Format::Ron | Format::Json => deserialize_file(path),
        Format::Toml => {
            let content = std::fs::read_to_string(path)?;
            let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
                .clone();
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

fn invalid(file: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::InvalidValue {
        file: file.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Multipliers are kept to three decimal places.
fn thousandths(value: f64, field: &str, file: &Path) -> Result<Thousandths, DataLoadError> {
    Thousandths::from_f64(value)
        .ok_or_else(|| invalid(file, format!("{field} {value} is negative or out of range")))
}

// ===========================================================================
// Loaded data
// ===========================================================================

/// Everything a host needs to run stations, resolved from a data directory.
#[derive(Debug, Clone)]
pub struct SluiceData {
    pub items: HashMap<String, ItemTypeId>,
    pub item_names: Vec<String>,
    pub fluids: HashMap<String, FluidId>,
    pub fluid_names: Vec<String>,
    pub global: GlobalConfig,
    /// One entry per tier, built-in defaults with any overrides applied.
    pub tiers: BTreeMap<Tier, TierConfig>,
    pub recipes: RecipeTable,
}

impl SluiceData {
    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.items.get(name).copied()
    }

    pub fn fluid_id(&self, name: &str) -> Option<FluidId> {
        self.fluids.get(name).copied()
    }

    pub fn item_name(&self, id: ItemTypeId) -> Option<&str> {
        self.item_names.get(id.0 as usize).map(String::as_str)
    }

    pub fn fluid_name(&self, id: FluidId) -> Option<&str> {
        self.fluid_names.get(id.0 as usize).map(String::as_str)
    }

    pub fn tier_config(&self, tier: Tier) -> TierConfig {
        self.tiers
            .get(&tier)
            .cloned()
            .unwrap_or_else(|| TierConfig::defaults(tier))
    }
}

// ===========================================================================
// Pipeline
// ===========================================================================

/// Load a data directory.
///
/// Required files: `items`, `fluids`, `recipes`. Optional: `general`,
/// `tiers`. Each may be `.ron`, `.toml` or `.json`.
pub fn load_sluice_data(dir: &Path) -> Result<SluiceData, DataLoadError> {
    let (items, item_names) = {
        let path = require_data_file(dir, "items")?;
        let list: Vec<ItemData> = deserialize_list(&path, "items")?;
        index_names(list.into_iter().map(|i| i.name), &path, ItemTypeId)?
    };

    let (fluids, fluid_names) = {
        let path = require_data_file(dir, "fluids")?;
        let list: Vec<FluidData> = deserialize_list(&path, "fluids")?;
        index_names(list.into_iter().map(|f| f.name), &path, FluidId)?
    };

    let global = match find_data_file(dir, "general")? {
        Some(path) => {
            let general: GeneralData = deserialize_file(&path)?;
            let global = GlobalConfig {
                exponential_cost_base: thousandths(
                    general.exponential_cost_base,
                    "exponential_cost_base",
                    &path,
                )?,
                max_upgrade_stack_size: general.max_upgrade_stack_size,
            };
            global.validate().map_err(|e| invalid(&path, e))?;
            global
        }
        None => GlobalConfig::default(),
    };

    let mut tiers: BTreeMap<Tier, TierConfig> = Tier::ALL
        .into_iter()
        .map(|t| (t, TierConfig::defaults(t)))
        .collect();
    if let Some(path) = find_data_file(dir, "tiers")? {
        let overrides: Vec<TierData> = deserialize_list(&path, "tiers")?;
        apply_tier_overrides(&mut tiers, overrides, &path)?;
    }

    let recipes = {
        let path = require_data_file(dir, "recipes")?;
        let list: Vec<RecipeData> = deserialize_list(&path, "recipes")?;
        let mut table = RecipeTable::new();
        for recipe in list {
            table.add(resolve_recipe(recipe, &items, &fluids, &path)?);
        }
        table
    };

    debug!(
        dir = %dir.display(),
        items = item_names.len(),
        fluids = fluid_names.len(),
        recipes = recipes.len(),
        "loaded sluice data"
    );

    Ok(SluiceData {
        items,
        item_names,
        fluids,
        fluid_names,
        global,
        tiers,
        recipes,
    })
}

/// Assign sequential ids in file order, rejecting duplicates.
fn index_names<Id: Copy>(
    names: impl Iterator<Item = String>,
    file: &Path,
    make_id: fn(u32) -> Id,
) -> Result<(HashMap<String, Id>, Vec<String>), DataLoadError> {
    let mut map = HashMap::new();
    let mut ordered = Vec::new();
    for name in names {
        check_duplicate(&map, &name, file)?;
        let index = u32::try_from(ordered.len()).map_err(|_| invalid(file, "too many entries"))?;
        map.insert(name.clone(), make_id(index));
        ordered.push(name);
    }
    Ok((map, ordered))
}

fn apply_tier_overrides(
    tiers: &mut BTreeMap<Tier, TierConfig>,
    overrides: Vec<TierData>,
    file: &Path,
) -> Result<(), DataLoadError> {
    let mut seen: HashMap<String, ()> = HashMap::new();
    for data in overrides {
        check_duplicate(&seen, &data.tier, file)?;
        let tier = Tier::from_name(&data.tier).ok_or_else(|| DataLoadError::UnresolvedRef {
            file: file.to_path_buf(),
            name: data.tier.clone(),
            expected_kind: "tier",
        })?;
        seen.insert(data.tier.clone(), ());

        let config = tiers.entry(tier).or_insert_with(|| TierConfig::defaults(tier));
        if let Some(v) = data.energy_cost_per_use {
            config.energy_cost_per_use = v;
        }
        if let Some(v) = data.fluid_multiplier {
            config.fluid_multiplier = thousandths(v, "fluid_multiplier", file)?;
        }
        if let Some(v) = data.time_multiplier {
            config.time_multiplier = thousandths(v, "time_multiplier", file)?;
        }
        if let Some(v) = data.tank_capacity {
            config.tank_capacity = v;
        }
        if let Some(v) = data.allows_io {
            config.allows_io = v;
        }
        if let Some(v) = data.allows_tank {
            config.allows_tank = v;
        }
        if let Some(v) = data.upgradeable {
            config.upgradeable = v;
        }
        config.validate().map_err(|e| invalid(file, e))?;
    }
    Ok(())
}

fn resolve_recipe(
    data: RecipeData,
    items: &HashMap<String, ItemTypeId>,
    fluids: &HashMap<String, FluidId>,
    file: &Path,
) -> Result<RecipeEntry, DataLoadError> {
    let fluid = *resolve_name(fluids, &data.fluid, file, "fluid")?;
    let input = *resolve_name(items, &data.input, file, "item")?;

    let meshes = data
        .meshes
        .iter()
        .map(|name| {
            Mesh::from_name(name).ok_or_else(|| DataLoadError::UnresolvedRef {
                file: file.to_path_buf(),
                name: name.clone(),
                expected_kind: "mesh",
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if meshes.is_empty() {
        return Err(invalid(file, format!("recipe for '{}' names no mesh", data.input)));
    }

    let mut outputs = Vec::with_capacity(data.outputs.len());
    for output in &data.outputs {
        let probability = output.probability();
        if !(0.0..=1.0).contains(&probability) {
            return Err(invalid(
                file,
                format!("probability {probability} for '{}' is outside [0, 1]", output.item()),
            ));
        }
        outputs.push(RecipeCandidate {
            item_type: *resolve_name(items, output.item(), file, "item")?,
            quantity: output.quantity(),
            probability: f64_to_fixed64(probability),
        });
    }

    Ok(RecipeEntry {
        fluid,
        meshes,
        input,
        processing_time: data.processing_time,
        fluid_used: data.fluid_used,
        max_drops: data.max_drops,
        outputs,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::fixed::Fixed64;
    use sluice_core::recipe::RecipeResolver;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sluice_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    fn write_minimal(dir: &Path) {
        fs::write(dir.join("items.ron"), r#"[(name: "gravel"), (name: "nugget"), (name: "flint")]"#)
            .unwrap();
        fs::write(dir.join("fluids.ron"), r#"[(name: "water"), (name: "lava")]"#).unwrap();
        fs::write(
            dir.join("recipes.ron"),
            r#"[
                (
                    fluid: "water",
                    meshes: ["cloth", "iron"],
                    input: "gravel",
                    processing_time: 100,
                    fluid_used: 50,
                    max_drops: 3,
                    outputs: [("nugget", 0.5), ("flint", 0.2)],
                ),
            ]"#,
        )
        .unwrap();
    }

    // -----------------------------------------------------------------------
    // detect_format / find_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("items.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("items.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("items.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("items.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("items")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("items.ron"), "[]").unwrap();
        fs::write(dir.join("items.json"), "[]").unwrap();

        let result = find_data_file(&dir, "items");
        assert!(matches!(
            result,
            Err(DataLoadError::ConflictingFormats { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn require_data_file_missing() {
        let dir = make_test_dir("require_missing");

        let result = require_data_file(&dir, "items");
        assert!(matches!(result, Err(DataLoadError::MissingRequired { .. })));

        cleanup(&dir);
    }

    #[test]
    fn deserialize_list_toml() {
        let dir = make_test_dir("list_toml");
        let path = dir.join("items.toml");
        fs::write(
            &path,
            r#"
[[items]]
name = "gravel"

[[items]]
name = "sand"
"#,
        )
        .unwrap();

        let items: Vec<ItemData> = deserialize_list(&path, "items").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].name, "sand");

        cleanup(&dir);
    }

    #[test]
    fn deserialize_file_parse_error() {
        let dir = make_test_dir("deser_parse_err");
        let path = dir.join("bad.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();

        let result: Result<Vec<ItemData>, _> = deserialize_file(&path);
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // load_sluice_data
    // -----------------------------------------------------------------------

    #[test]
    fn load_minimal_directory() {
        let dir = make_test_dir("load_minimal");
        write_minimal(&dir);

        let data = load_sluice_data(&dir).unwrap();
        assert_eq!(data.item_id("gravel"), Some(ItemTypeId(0)));
        assert_eq!(data.item_name(ItemTypeId(2)), Some("flint"));
        assert_eq!(data.fluid_id("lava"), Some(FluidId(1)));
        assert_eq!(data.global, GlobalConfig::default());
        assert_eq!(data.tier_config(Tier::Iron), TierConfig::defaults(Tier::Iron));

        let recipe = data.recipes.resolve(FluidId(0), Mesh::Iron, ItemTypeId(0));
        assert_eq!(recipe.processing_time_base, 100);
        assert_eq!(recipe.max_drops, 3);
        assert_eq!(recipe.candidates.len(), 2);
        assert_eq!(recipe.candidates[0].probability, Fixed64::from_num(0.5));
        assert!(data.recipes.resolve(FluidId(1), Mesh::Iron, ItemTypeId(0)).is_empty());

        cleanup(&dir);
    }

    #[test]
    fn general_and_tier_overrides_apply() {
        let dir = make_test_dir("load_overrides");
        write_minimal(&dir);
        fs::write(
            dir.join("general.toml"),
            "exponential_cost_base = 2.0\nmax_upgrade_stack_size = 10\n",
        )
        .unwrap();
        fs::write(
            dir.join("tiers.json"),
            r#"[{"tier": "oak", "tank_capacity": 4000, "allows_io": true},
                {"tier": "iron", "time_multiplier": 0.7, "fluid_multiplier": 0.9}]"#,
        )
        .unwrap();

        let data = load_sluice_data(&dir).unwrap();
        assert_eq!(data.global.exponential_cost_base, Thousandths(2_000));
        assert_eq!(data.global.max_upgrade_stack_size, 10);
        let oak = data.tier_config(Tier::Oak);
        assert_eq!(oak.tank_capacity, 4000);
        assert!(oak.allows_io);
        assert!(!oak.allows_tank);
        let iron = data.tier_config(Tier::Iron);
        assert_eq!(iron.time_multiplier, Thousandths(700));
        assert_eq!(iron.fluid_multiplier, Thousandths(900));

        cleanup(&dir);
    }

    #[test]
    fn unknown_names_are_reported() {
        let dir = make_test_dir("load_unresolved");
        write_minimal(&dir);
        fs::write(
            dir.join("recipes.ron"),
            r#"[(fluid: "water", meshes: ["wool"], input: "gravel",
                processing_time: 10, fluid_used: 10, outputs: [])]"#,
        )
        .unwrap();

        let result = load_sluice_data(&dir);
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { expected_kind: "mesh", .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn duplicate_items_rejected() {
        let dir = make_test_dir("load_duplicate");
        write_minimal(&dir);
        fs::write(dir.join("items.ron"), r#"[(name: "gravel"), (name: "gravel")]"#).unwrap();

        let result = load_sluice_data(&dir);
        assert!(matches!(result, Err(DataLoadError::DuplicateName { .. })));

        cleanup(&dir);
    }

    #[test]
    fn out_of_range_values_rejected() {
        let dir = make_test_dir("load_invalid");
        write_minimal(&dir);
        fs::write(dir.join("general.ron"), "(exponential_cost_base: 0.5)").unwrap();
        assert!(matches!(
            load_sluice_data(&dir),
            Err(DataLoadError::InvalidValue { .. })
        ));

        fs::remove_file(dir.join("general.ron")).unwrap();
        fs::write(
            dir.join("tiers.ron"),
            r#"[(tier: "iron", time_multiplier: Some(-0.5))]"#,
        )
        .unwrap();
        assert!(matches!(
            load_sluice_data(&dir),
            Err(DataLoadError::InvalidValue { .. })
        ));

        fs::remove_file(dir.join("tiers.ron")).unwrap();
        fs::write(
            dir.join("recipes.ron"),
            r#"[(fluid: "water", meshes: ["cloth"], input: "gravel",
                processing_time: 10, fluid_used: 10, outputs: [("nugget", 1.5)])]"#,
        )
        .unwrap();
        assert!(matches!(
            load_sluice_data(&dir),
            Err(DataLoadError::InvalidValue { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn unknown_tier_rejected() {
        let dir = make_test_dir("load_bad_tier");
        write_minimal(&dir);
        fs::write(dir.join("tiers.ron"), r#"[(tier: "gold")]"#).unwrap();

        let result = load_sluice_data(&dir);
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { expected_kind: "tier", .. })
        ));

        cleanup(&dir);
    }
}
