//! Input discovery and output naming for a batch run

use glob::Pattern;
use lastrx_core::error::{LastrxError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Placeholder in an output template replaced by the input file stem
pub const STEM_PLACEHOLDER: &str = "{}";

/// One input file and the output it is written to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilePair {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl FilePair {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// Validated, ordered input/output pairs of one run
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    pairs: Vec<FilePair>,
}

impl FileSet {
    /// Expand `input_pattern`, derive outputs from `output_template`, and validate the result
    pub fn resolve(
        input_pattern: &str,
        output_template: &str,
        default_extension: &str,
    ) -> Result<Self> {
        let inputs = expand_input_pattern(input_pattern)?;
        if inputs.is_empty() {
            return Err(LastrxError::NoInputFiles {
                pattern: input_pattern.to_string(),
            });
        }

        let outputs = output_paths(output_template, &inputs, default_extension)?;
        let set = Self::from_paths(inputs, outputs)?;

        tracing::info!(
            "Resolved {} input file(s) from {} -> {}",
            set.len(),
            input_pattern,
            output_template
        );
        Ok(set)
    }

    /// Build a set from explicit path lists. Only the paths are compared; nothing is touched
    /// on disk.
    pub fn from_paths(inputs: Vec<PathBuf>, outputs: Vec<PathBuf>) -> Result<Self> {
        if inputs.len() != outputs.len() {
            return Err(LastrxError::ConfigInvalid {
                key: "outputs".to_string(),
                reason: format!(
                    "{} input file(s) but {} output file(s)",
                    inputs.len(),
                    outputs.len()
                ),
            });
        }

        validate_pairs(&inputs, &outputs)?;

        let pairs = inputs.into_iter().zip(outputs).map(|(i, o)| FilePair::new(i, o)).collect();
        Ok(Self { pairs })
    }

    pub fn pairs(&self) -> &[FilePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Path> {
        self.pairs.iter().map(|p| p.input.as_path())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.pairs.iter().map(|p| p.output.as_path())
    }
}

impl IntoIterator for FileSet {
    type Item = FilePair;
    type IntoIter = std::vec::IntoIter<FilePair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

/// List the regular files matching a pattern whose last component may hold wildcards.
///
/// Matches are sorted so the same directory always yields the same order.
pub fn expand_input_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let invalid = |reason: String| LastrxError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    };

    let path = Path::new(pattern);
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| invalid("pattern has no file name component".to_string()))?;
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    if parent.to_string_lossy().contains(['*', '?', '[']) {
        return Err(invalid("wildcards are only allowed in the file name".to_string()));
    }

    let matcher = Pattern::new(name).map_err(|e| invalid(e.to_string()))?;
    let dir = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(invalid(format!("cannot list {}: {}", dir.display(), e))),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !matcher.matches(file_name) {
            continue;
        }
        if entry.path().is_file() {
            matches.push(parent.join(file_name));
        }
    }

    matches.sort();
    tracing::debug!("Pattern {} matched {} file(s)", pattern, matches.len());
    Ok(matches)
}

/// Output path of every input, in input order
pub fn output_paths(
    template: &str,
    inputs: &[PathBuf],
    default_extension: &str,
) -> Result<Vec<PathBuf>> {
    if template.matches(STEM_PLACEHOLDER).count() > 1 {
        return Err(LastrxError::InvalidPattern {
            pattern: template.to_string(),
            reason: format!("at most one '{}' placeholder is allowed", STEM_PLACEHOLDER),
        });
    }

    Ok(inputs
        .iter()
        .map(|input| output_path(template, input, default_extension))
        .collect())
}

/// Substitute the input stem into the template and append the default extension if the
/// result has none
pub fn output_path(template: &str, input: &Path, default_extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let mut output = PathBuf::from(template.replace(STEM_PLACEHOLDER, &stem));

    if output.extension().is_none() {
        let mut name = output.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(default_extension);
        output.set_file_name(name);
    }
    output
}

/// Reject inputs that would be overwritten and outputs written more than once.
///
/// Paths are compared by [`comparison_key`], so `..`, relative and symlinked spellings of the
/// same file collide.
pub fn validate_pairs(inputs: &[PathBuf], outputs: &[PathBuf]) -> Result<()> {
    let output_keys: Vec<PathBuf> = outputs.iter().map(|p| comparison_key(p)).collect();
    let output_set: HashSet<&Path> = output_keys.iter().map(PathBuf::as_path).collect();

    if let Some(input) = inputs
        .iter()
        .find(|i| output_set.contains(comparison_key(i).as_path()))
    {
        return Err(LastrxError::InputOutputCollision {
            path: input.clone(),
        });
    }

    let mut seen = HashSet::new();
    for (output, key) in outputs.iter().zip(&output_keys) {
        if !seen.insert(key.as_path()) {
            return Err(LastrxError::DuplicateOutput {
                path: output.clone(),
            });
        }
    }

    Ok(())
}

/// Key under which two spellings of the same file compare equal.
///
/// Existing files resolve to their canonical path, outputs in an existing directory to the
/// canonical directory plus file name. Anything else falls back to a lexical absolute path.
fn comparison_key(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }

    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(parent) = fs::canonicalize(parent) {
            return parent.join(name);
        }
    }

    lexical(&std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()))
}

/// Path with `.` removed and `..` folded into its parent, without touching the filesystem
fn lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(component),
            },
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_expand_sorted_regular_files_only() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "c.laz");
        touch(dir.path(), "a.laz");
        touch(dir.path(), "b.las");
        touch(dir.path(), "notes.txt");
        fs::create_dir(dir.path().join("d.laz")).unwrap();

        let pattern = format!("{}/*.laz", dir.path().display());
        let found = expand_input_pattern(&pattern).unwrap();
        assert_eq!(found, vec![dir.path().join("a.laz"), dir.path().join("c.laz")]);

        let pattern = format!("{}/*.la?", dir.path().display());
        assert_eq!(expand_input_pattern(&pattern).unwrap().len(), 3);
    }

    #[test]
    fn test_expand_rejects_wildcard_directory() {
        let err = expand_input_pattern("data/*/tile.laz").unwrap_err();
        assert!(matches!(err, LastrxError::InvalidPattern { .. }));
    }

    #[test]
    fn test_missing_directory_matches_nothing() {
        assert!(expand_input_pattern("/no/such/dir/*.laz").unwrap().is_empty());
        let err = FileSet::resolve("/no/such/dir/*.laz", "out/{}.laz", "laz").unwrap_err();
        assert!(matches!(err, LastrxError::NoInputFiles { .. }));
    }

    #[test]
    fn test_output_path_substitution() {
        let input = Path::new("data/tile_01.laz");
        assert_eq!(
            output_path("out/{}_nad83.laz", input, "laz"),
            PathBuf::from("out/tile_01_nad83.laz")
        );
        assert_eq!(output_path("out/{}", input, "laz"), PathBuf::from("out/tile_01.laz"));
        assert_eq!(output_path("merged.las", input, "laz"), PathBuf::from("merged.las"));
    }

    #[test]
    fn test_multiple_placeholders_rejected() {
        let err = output_paths("{}/{}.laz", &[PathBuf::from("a.laz")], "laz").unwrap_err();
        assert!(matches!(err, LastrxError::InvalidPattern { .. }));
    }

    #[test]
    fn test_collision_detected() {
        let inputs = vec![PathBuf::from("data/a.laz"), PathBuf::from("data/b.laz")];
        let outputs = vec![PathBuf::from("out/a.laz"), PathBuf::from("./data/b.laz")];
        let err = FileSet::from_paths(inputs, outputs).unwrap_err();
        match err {
            LastrxError::InputOutputCollision { path } => {
                assert_eq!(path, PathBuf::from("data/b.laz"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_collision_through_parent_components() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        touch(&data, "a.las");

        let err = FileSet::resolve(
            &format!("{}/*.las", data.display()),
            &format!("{}/data/../data/{{}}.las", dir.path().display()),
            "laz",
        )
        .unwrap_err();
        assert!(matches!(err, LastrxError::InputOutputCollision { .. }));

        // Same spelling with directories that do not exist yet
        let inputs = vec![PathBuf::from("missing/data/a.las")];
        let outputs = vec![PathBuf::from("missing/other/../data/a.las")];
        let err = FileSet::from_paths(inputs, outputs).unwrap_err();
        assert!(matches!(err, LastrxError::InputOutputCollision { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_collision_between_relative_and_absolute_spellings() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.las");
        let input = fs::canonicalize(dir.path()).unwrap().join("a.las");

        // Climb from the working directory to the root, then back down to the input
        let cwd = std::env::current_dir().unwrap();
        let mut relative = PathBuf::new();
        for _ in cwd.components().skip(1) {
            relative.push("..");
        }
        relative.push(input.strip_prefix("/").unwrap());
        assert!(relative.is_relative());

        let err = FileSet::from_paths(vec![input], vec![relative]).unwrap_err();
        assert!(matches!(err, LastrxError::InputOutputCollision { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_collision_through_symlinked_directory() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        touch(&data, "a.las");
        std::os::unix::fs::symlink(&data, dir.path().join("link")).unwrap();

        let err = FileSet::resolve(
            &format!("{}/*.las", data.display()),
            &format!("{}/link/{{}}.las", dir.path().display()),
            "laz",
        )
        .unwrap_err();
        assert!(matches!(err, LastrxError::InputOutputCollision { .. }));
    }

    #[test]
    fn test_duplicate_outputs_spelled_differently() {
        let inputs = vec![PathBuf::from("data/a.laz"), PathBuf::from("data/b.laz")];
        let outputs = vec![PathBuf::from("out/merged.laz"), PathBuf::from("out/x/../merged.laz")];
        let err = FileSet::from_paths(inputs, outputs).unwrap_err();
        assert!(matches!(err, LastrxError::DuplicateOutput { .. }));
    }

    #[test]
    fn test_duplicate_outputs_detected() {
        let inputs = vec![PathBuf::from("data/a.laz"), PathBuf::from("data/b.laz")];
        let outputs = vec![PathBuf::from("out/merged.laz"), PathBuf::from("out/merged.laz")];
        let err = FileSet::from_paths(inputs, outputs).unwrap_err();
        assert!(matches!(err, LastrxError::DuplicateOutput { .. }));
        assert!(err.to_string().contains("'{}'"));
    }

    #[test]
    fn test_literal_pattern_into_itself_rejected() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "tile.laz");
        let literal = format!("{}/tile.laz", dir.path().display());

        let err = FileSet::resolve(&literal, &literal, "laz").unwrap_err();
        assert!(matches!(err, LastrxError::InputOutputCollision { .. }));
        assert!(err.is_preflight());
    }

    #[test]
    fn test_resolve_scenario() {
        let dir = TempDir::new().unwrap();
        for name in ["north.laz", "south.laz", "east.laz"] {
            touch(dir.path(), name);
        }
        let set = FileSet::resolve(
            &format!("{}/*.laz", dir.path().display()),
            &format!("{}/out/{{}}_nad83.laz", dir.path().display()),
            "laz",
        )
        .unwrap();

        let names: Vec<String> = set
            .outputs()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["east_nad83.laz", "north_nad83.laz", "south_nad83.laz"]);
        assert!(!dir.path().join("out").exists());
    }

    proptest! {
        #[test]
        fn prop_placeholder_outputs_pair_up(stems in proptest::collection::hash_set("[a-z]{1,8}", 1..20)) {
            let inputs: Vec<PathBuf> = stems.iter().map(|s| PathBuf::from(format!("in/{s}.laz"))).collect();
            let outputs = output_paths("out/{}_x", &inputs, "laz").unwrap();
            prop_assert_eq!(inputs.len(), outputs.len());
            let set = FileSet::from_paths(inputs, outputs).unwrap();
            prop_assert!(set.outputs().all(|p| p.extension().is_some()));
        }
    }
}
