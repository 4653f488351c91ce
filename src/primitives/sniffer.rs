//! Content sniffing for documents whose filename gives no hint.
//!
//! Both functions are total: they never fail and return `None`/`false` when
//! the content carries nothing recognizable.

/// Marker opening an XML declaration.
pub const XML_DECLARATION_PREFIX: &str = "<?xml ";

/// Extract the interpreter named by a shebang line.
///
/// `#!/bin/bash` yields `bash`; `#!/usr/bin/env python3` yields `python3`,
/// the program `env` was asked to run. Only the first line is examined and at
/// most three space separated components are considered.
pub fn scan_interpreter(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("#!")?;
    let line = rest.lines().next().unwrap_or_default().trim();

    let mut components = line.split(' ').filter(|c| !c.is_empty()).take(3);
    let program = components.next()?;
    let interpreter = program.rsplit('/').next().unwrap_or(program);

    if interpreter == "env" {
        return components.next();
    }

    if interpreter.is_empty() {
        None
    } else {
        Some(interpreter)
    }
}

/// Whether the document starts with an XML declaration.
///
/// A leading byte order mark is skipped.
pub fn is_xml_declaration(content: &str) -> bool {
    content
        .trim_start_matches('\u{feff}')
        .starts_with(XML_DECLARATION_PREFIX)
}
