use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use thiserror::Error;

pub const POM_NAMESPACE: &str = "http://maven.apache.org/POM/4.0.0";

/// Packaging of POMs without a <packaging> element
pub const DEFAULT_PACKAGING: &str = "jar";

#[derive(Debug, Error)]
pub enum PomError {
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error("document has no root element")]
    NoRootElement,
    #[error("document ends inside an element")]
    Truncated,
}

fn is_pom_namespace(ns: &ResolveResult) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(n)) if *n == POM_NAMESPACE.as_bytes())
}

/// Reads the text of the `<packaging>` element directly below the root of a POM. Only elements in
///  the POM namespace count, and an empty element counts as missing. The whole document is read,
///  so a POM that is malformed anywhere is rejected.
pub fn packaging(pom: &[u8]) -> Result<Option<String>, PomError> {
    let mut reader = NsReader::from_reader(pom);

    let mut depth = 0usize;
    let mut has_root = false;
    let mut in_packaging = false;
    let mut packaging = String::new();
    let mut result = None;

    loop {
        let (ns, event) = reader.read_resolved_event()?;
        match event {
            Event::Start(e) => {
                depth += 1;
                has_root = true;
                if depth == 2 && is_pom_namespace(&ns) && e.local_name().as_ref() == b"packaging" {
                    in_packaging = true;
                }
            }
            Event::Empty(_) => {
                has_root = true;
            }
            Event::End(_) => {
                if in_packaging {
                    in_packaging = false;
                    let trimmed = packaging.trim();
                    if result.is_none() && !trimmed.is_empty() {
                        result = Some(trimmed.to_string());
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) if in_packaging => {
                packaging.push_str(&t.unescape()?);
            }
            Event::CData(c) if in_packaging => {
                packaging.push_str(&String::from_utf8_lossy(&c));
            }
            Event::Eof => {
                if !has_root {
                    return Err(PomError::NoRootElement);
                }
                if depth > 0 {
                    return Err(PomError::Truncated);
                }
                return Ok(result);
            }
            _ => {}
        }
    }
}

/// The file extension of the main artifact described by a POM
pub fn extension(pom: &[u8]) -> Result<String, PomError> {
    Ok(packaging(pom)?
        .unwrap_or_else(|| DEFAULT_PACKAGING.to_string()))
}
