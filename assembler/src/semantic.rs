//! Semantic-wrapper compilation (§4.H): build a test's semantic-wrapper
//! sources for one library, link them into a single blob, and rename the
//! result so it can be linked in alongside that library's target without
//! colliding with another library's symbols.
//!
//! Grounded in
//! `original_source/sputnik/crafter.py::TestHarness.build_semantic_wrappers`.

use std::fs;
use std::path::{Path, PathBuf};

use diagnostics::SputnikError;
use harness::Harness;
use library::Library;
use toolchain::{ScopedTempDir, Toolchain};

/// Compile `harness.semantic_wrappers` for `lib`, link them into one blob,
/// apply `lib`'s existing rename mapping (so calls into the library use its
/// already-renamed symbols), then rename the wrapper blob's own new symbols
/// under `lib.name`, writing the result to `target`. Repoints the
/// harness's entry for `lib` at the renamed wrapper's entry-point symbol
/// and renames its return variable to `ret_<lib.name>`.
///
/// Returns `[target]`, mirroring the reference's single-element list (kept
/// for parity with `build_target`'s `links += ...` call site).
pub fn build_semantic_wrappers(
    toolchain: &Toolchain,
    harness: &mut Harness,
    lib: &Library,
    target: &Path,
) -> Result<Vec<PathBuf>, SputnikError> {
    let cflags: Vec<String> = format!("-S -emit-llvm -g {}", lib.compiler_flags)
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let tmp = ScopedTempDir::new()?;

    let mut local_files = Vec::new();
    for wrapper in &harness.semantic_wrappers {
        let wrapper_path = Path::new(wrapper);
        let stem = wrapper_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "wrapper".to_string());
        let dest = tmp.join(format!("{stem}.ll"));
        let src = fs::canonicalize(wrapper_path)?;
        toolchain.compile_file(&dest, &src, &cflags, Some(&lib.directory))?;
        local_files.push(dest);
    }

    let blob = tmp.join("blob.ll");
    toolchain.link(&blob, &local_files, &["-S".to_string()])?;

    // Fold in the library's own post-build rename mapping first, so the
    // wrapper's calls into the library resolve to its already-renamed
    // symbols before we mint a fresh set of names for the wrapper itself.
    let existing_mapping: Vec<(String, String)> = lib
        .build
        .name_mapping
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let substituted = renamer::substitute_text(&fs::read_to_string(&blob)?, &existing_mapping);
    fs::write(&blob, substituted)?;

    let mapping = renamer::rename(target, &blob, &lib.name)?;

    let old_entry_name = harness
        .entries()
        .get(&lib.name)
        .map(|sig| sig.name.clone())
        .unwrap_or_default();
    let key = format!("@{old_entry_name}");
    if let Some((_, new_name)) = mapping.iter().find(|(k, _)| *k == key) {
        harness.set_entry_name(&lib.name, new_name.trim_start_matches('@').to_string());
    }

    Ok(vec![target.to_path_buf()])
}
