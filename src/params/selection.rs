//! File-selection cleanup for reference axes (topologies, workloads, failures)

use std::path::Path;

use walkdir::WalkDir;

/// Selection entry meaning "every available option".
pub const SELECT_ALL: &str = "[Select All]";

/// Selection entry meaning "leave the template's references untouched".
pub const KEEP_ORIGINAL: &str = "[Keep original]";

fn is_valid_option(option: &str) -> bool {
    option != SELECT_ALL && option != KEEP_ORIGINAL && !option.ends_with(".gitkeep")
}

/// Resolve placeholder entries in a file selection.
///
/// [`SELECT_ALL`] expands to every valid entry of `all_options`.
/// [`KEEP_ORIGINAL`] and `.gitkeep` files are dropped. Returns `None` when
/// nothing valid remains, which callers treat as "do not override".
#[must_use]
pub fn clean_selection<S: AsRef<str>>(selections: &[S], all_options: &[S]) -> Option<Vec<String>> {
    if selections.is_empty() {
        return None;
    }

    let pick = |items: &[S]| -> Vec<String> {
        items
            .iter()
            .map(AsRef::as_ref)
            .filter(|s| is_valid_option(s))
            .map(ToString::to_string)
            .collect()
    };

    let cleaned = if selections.iter().any(|s| s.as_ref() == SELECT_ALL) {
        pick(all_options)
    } else {
        pick(selections)
    };
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Case-insensitive substring filter; a blank keyword keeps everything.
#[must_use]
pub fn filter_by_keyword(files: &[String], keyword: &str) -> Vec<String> {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return files.to_vec();
    }
    files
        .iter()
        .filter(|f| f.to_lowercase().contains(&keyword))
        .cloned()
        .collect()
}

/// All `.json` files under `root`, as sorted forward-slash relative paths.
///
/// A missing root yields an empty list.
#[must_use]
pub fn list_json_files<P: AsRef<Path>>(root: P) -> Vec<String> {
    let root = root.as_ref();
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .filter_map(|e| {
            e.path()
                .strip_prefix(root)
                .ok()
                .map(|rel| rel.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_clean_selection_select_all() {
        let all = owned(&["a.json", ".gitkeep", "b.json"]);
        let picked = clean_selection(&owned(&[SELECT_ALL]), &all);
        assert_eq!(picked, Some(owned(&["a.json", "b.json"])));
    }

    #[test]
    fn test_clean_selection_drops_placeholders() {
        let all = owned(&["a.json", "b.json"]);
        let picked = clean_selection(&owned(&[KEEP_ORIGINAL, "b.json"]), &all);
        assert_eq!(picked, Some(owned(&["b.json"])));
    }

    #[test]
    fn test_clean_selection_none_when_nothing_left() {
        let all = owned(&["a.json"]);
        assert_eq!(clean_selection(&owned(&[KEEP_ORIGINAL]), &all), None);
        assert_eq!(clean_selection(&[] as &[String], &all), None);
    }

    #[test]
    fn test_filter_by_keyword() {
        let files = owned(&["borg/DE.json", "borg/NL.json", "surf/de_small.json"]);
        assert_eq!(filter_by_keyword(&files, " de "), owned(&["borg/DE.json", "surf/de_small.json"]));
        assert_eq!(filter_by_keyword(&files, ""), files);
    }

    #[test]
    fn test_list_json_files_recursive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("borg/800")).unwrap();
        std::fs::write(dir.path().join("borg/800/DE.json"), "{}").unwrap();
        std::fs::write(dir.path().join("top.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        assert_eq!(list_json_files(dir.path()), owned(&["borg/800/DE.json", "top.json"]));
        assert!(list_json_files(dir.path().join("missing")).is_empty());
    }
}
