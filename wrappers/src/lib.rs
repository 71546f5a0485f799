//! Call-wrapper generation (§4.F): for every listed function, emit a
//! `lib_entry_<fn>` wrapper definition (source) and declaration (header)
//! that just forwards to the real function — used so a library's build
//! can expose a uniformly-named entry point even before a library-specific
//! rename prefix is applied.
//!
//! Grounded in `original_source/prebuild.py::build_call_wrappers`.

pub mod config;

use std::collections::BTreeSet;
use std::fs;

use diagnostics::SputnikError;
use log::{debug, info};

pub use config::{WrapperConfig, WrapperEntry};

const WRAPPER_PREFIX: &str = "lib_entry_";

/// Outcome of a `build_call_wrappers` run.
#[derive(Debug)]
pub struct WrapperReport {
    pub wrapped: Vec<String>,
    pub headers: Vec<String>,
}

/// Write the `wrappers.c` / `wrappers_header.h` pair described by
/// `config`. Matches the reference's file layout exactly: the `#include`
/// lines for every function's listed headers go into the *source* file
/// (the header file only ever gets the include guard and the forwarding
/// declarations).
pub fn build_call_wrappers(config: &WrapperConfig) -> Result<WrapperReport, SputnikError> {
    info!("start building call wrappers");

    let headers: BTreeSet<&str> = config
        .functions
        .iter()
        .flat_map(|f| f.headers.iter().map(String::as_str))
        .collect();

    let mut source = String::new();
    for header in &headers {
        source.push_str(&format!("#include <{header}>\n"));
    }
    source.push('\n');

    let mut header_file = String::new();
    header_file.push_str("#ifndef __CALL_WRAPPERS\n");
    header_file.push_str("#define __CALL_WRAPPERS\n\n");

    let mut wrapped = Vec::new();
    for entry in &config.functions {
        debug!("considering function {}", entry.function);

        let signature = sigmodel::function_signature(&entry.function, -1)?;
        let wrapper = signature.fork(format!("{WRAPPER_PREFIX}{}", entry.function));

        let call_args = wrapper
            .args
            .iter()
            .map(|a| a.name.clone())
            .collect::<Vec<_>>()
            .join(", ");
        let body = format!("return {}({call_args});", entry.function);
        let function = sigmodel::Function::new(wrapper.clone()).with_body(body);

        source.push_str(&function.definition());
        source.push_str("\n\n");

        header_file.push_str(&wrapper.declaration());
        header_file.push_str("\n\n");

        wrapped.push(entry.function.clone());
    }

    header_file.push_str("#endif\n");

    fs::write(&config.wrappers, source)?;
    fs::write(&config.wrappers_header, header_file)?;

    info!("call wrappers built finished");

    Ok(WrapperReport {
        wrapped,
        headers: headers.into_iter().map(str::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path) -> WrapperConfig {
        WrapperConfig {
            functions: vec![WrapperEntry {
                function: "isdigit".to_string(),
                headers: vec!["ctype.h".to_string()],
            }],
            wrappers: dir.join("wrappers.c"),
            wrappers_header: dir.join("wrappers_header.h"),
        }
    }

    #[test]
    fn wraps_single_function_and_forwards_call() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());

        let report = build_call_wrappers(&config).unwrap();
        assert_eq!(report.wrapped, vec!["isdigit".to_string()]);
        assert_eq!(report.headers, vec!["ctype.h".to_string()]);

        let source = std::fs::read_to_string(&config.wrappers).unwrap();
        assert!(source.contains("#include <ctype.h>"));
        assert!(source.contains("int lib_entry_isdigit(int c) {"));
        assert!(source.contains("return isdigit(c);"));

        let header = std::fs::read_to_string(&config.wrappers_header).unwrap();
        assert!(header.contains("#ifndef __CALL_WRAPPERS"));
        assert!(header.contains("int lib_entry_isdigit(int c);"));
        assert!(header.contains("#endif"));
    }

    #[test]
    fn dedupes_headers_across_functions() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = config_in(tmp.path());
        config.functions.push(WrapperEntry {
            function: "isalpha".to_string(),
            headers: vec!["ctype.h".to_string()],
        });

        let report = build_call_wrappers(&config).unwrap();
        assert_eq!(report.headers, vec!["ctype.h".to_string()]);
        assert_eq!(report.wrapped, vec!["isdigit".to_string(), "isalpha".to_string()]);
    }

    #[test]
    fn unknown_function_surfaces_man_page_lookup_error() {
        let tmp = tempfile::tempdir().unwrap();
        let config = WrapperConfig {
            functions: vec![WrapperEntry {
                function: "definitely_not_a_real_libc_function_xyz".to_string(),
                headers: vec![],
            }],
            wrappers: tmp.path().join("wrappers.c"),
            wrappers_header: tmp.path().join("wrappers_header.h"),
        };

        assert!(build_call_wrappers(&config).is_err());
    }

    #[test]
    fn wrapper_entry_defaults_headers_to_empty() {
        let json = r#"{"function": "isdigit"}"#;
        let entry: WrapperEntry = serde_json::from_str(json).unwrap();
        assert!(entry.headers.is_empty());
    }
}
