//! File importance scoring for ranking diff blocks.
//!
//! A score is a category base (first matching rule wins), plus a bonus for
//! project-level files, plus the change volume capped at
//! [`MAX_CHANGE_CONTRIBUTION`].

use std::path::Path;

use super::parse::FileDiff;

/// Upper bound for the change-volume part of a score.
pub const MAX_CHANGE_CONTRIBUTION: u32 = 50;

/// Bonus for project-level files such as READMEs and manifests.
pub const SPECIAL_FILE_BONUS: u32 = 8;

const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "jsx", "tsx", "go", "rs", "java", "kt", "swift", "rb", "cs", "cpp", "cc",
    "c", "h", "hpp",
];

const CONFIG_EXTENSIONS: &[&str] = &["yaml", "yml", "json", "toml"];

const MANIFEST_NAMES: &[&str] = &[
    "pyproject.toml",
    "package.json",
    "cargo.toml",
    "go.mod",
    "setup.py",
    "pom.xml",
    "build.gradle",
    "composer.json",
    "gemfile",
];

/// A scoring category: the first rule whose predicate matches sets the base.
struct CategoryRule {
    base: u32,
    matches: fn(&Path) -> bool,
}

/// Categories in priority order. Later rules never add to earlier ones.
const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        base: 10,
        matches: is_source_file,
    },
    CategoryRule {
        base: 5,
        matches: is_config_file,
    },
    CategoryRule {
        base: 2,
        matches: is_markdown_file,
    },
    CategoryRule {
        base: 2,
        matches: is_test_path,
    },
];

/// Score a changed file by path and change volume.
///
/// Pure: identical inputs always give identical scores.
pub fn score(path: &str, added_lines: usize, removed_lines: usize) -> u32 {
    let path = Path::new(path);
    category_base(path) + special_bonus(path) + change_volume(added_lines, removed_lines)
}

/// Score a parsed file block.
pub fn score_file(file: &FileDiff) -> u32 {
    score(&file.path, file.added_count(), file.removed_count())
}

/// Order files by descending score.
///
/// The sort is stable, so equally scored files keep their diff order.
pub fn rank_files(files: &[FileDiff]) -> Vec<&FileDiff> {
    let mut ranked: Vec<(u32, &FileDiff)> = files.iter().map(|f| (score_file(f), f)).collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.into_iter().map(|(_, f)| f).collect()
}

fn category_base(path: &Path) -> u32 {
    CATEGORY_RULES
        .iter()
        .find(|rule| (rule.matches)(path))
        .map_or(0, |rule| rule.base)
}

/// Bonus for READMEs and manifests, matched on the file name anywhere in
/// the tree.
fn special_bonus(path: &Path) -> u32 {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return 0;
    };
    let name = name.to_ascii_lowercase();

    let is_readme = name == "readme" || name.starts_with("readme.");
    if is_readme || MANIFEST_NAMES.contains(&name.as_str()) {
        SPECIAL_FILE_BONUS
    } else {
        0
    }
}

fn change_volume(added_lines: usize, removed_lines: usize) -> u32 {
    let total = added_lines.saturating_add(removed_lines);
    total.min(MAX_CHANGE_CONTRIBUTION as usize) as u32
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn is_source_file(path: &Path) -> bool {
    extension(path).is_some_and(|e| SOURCE_EXTENSIONS.contains(&e.as_str()))
}

fn is_config_file(path: &Path) -> bool {
    extension(path).is_some_and(|e| CONFIG_EXTENSIONS.contains(&e.as_str()))
}

fn is_markdown_file(path: &Path) -> bool {
    extension(path).is_some_and(|e| e == "md")
}

/// Test directories (`test/`, `tests/`, `__tests__/`) or test-named files.
fn is_test_path(path: &Path) -> bool {
    let in_test_dir = path.parent().is_some_and(|parent| {
        parent.components().any(|c| {
            let c = c.as_os_str().to_string_lossy().to_ascii_lowercase();
            c == "test" || c == "tests" || c == "__tests__"
        })
    });
    if in_test_dir {
        return true;
    }

    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let stem = stem.to_ascii_lowercase();
    stem == "test"
        || stem.starts_with("test_")
        || stem.starts_with("test-")
        || stem.ends_with("_test")
        || stem.ends_with("-test")
        || stem.ends_with(".test")
        || stem.ends_with(".spec")
}
