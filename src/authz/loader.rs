use std::fmt;
use std::io::Write;
use std::path::Path;

use miette::{NamedSource, SourceSpan};

use crate::authz::errors::AuthzError;
use crate::authz::types::PolicyDocument;

/// On-disk encoding of a policy document, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFormat {
    Json,
    Yaml,
    /// Unrecognised extension; read and written as YAML.
    Fallback,
}

impl PolicyFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => PolicyFormat::Json,
            Some("yaml") | Some("yml") => PolicyFormat::Yaml,
            _ => PolicyFormat::Fallback,
        }
    }
}

impl fmt::Display for PolicyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyFormat::Json => write!(f, "JSON"),
            PolicyFormat::Yaml => write!(f, "YAML"),
            PolicyFormat::Fallback => write!(f, "(unknown extension, tried YAML)"),
        }
    }
}

/// Load a policy document from `path`, decoding by extension.
///
/// Never returns a partially-populated document: any decode failure is an
/// `AuthzError::Parse`.
pub fn load(path: &Path) -> Result<PolicyDocument, AuthzError> {
    let contents = std::fs::read_to_string(path).map_err(|source| AuthzError::PolicyRead {
        path: path.display().to_string(),
        source,
    })?;
    let format = PolicyFormat::from_path(path);
    let doc = parse(&contents, format, &path.display().to_string())?;

    tracing::info!(
        path = %path.display(),
        format = %format,
        roles = doc.roles.len(),
        groups = doc.groups.len(),
        projects = doc.projects.len(),
        bindings = doc.binding_count(),
        "Loaded policy document"
    );

    Ok(doc)
}

/// Decode `contents` as `format`. `name` labels diagnostics.
pub fn parse(
    contents: &str,
    format: PolicyFormat,
    name: &str,
) -> Result<PolicyDocument, AuthzError> {
    // serde would turn an empty YAML stream into a default document
    if !has_content(contents) {
        return Err(parse_error(
            contents,
            format,
            name,
            "policy file is empty".to_string(),
            None,
            None,
            None,
        ));
    }

    match format {
        PolicyFormat::Json => serde_json::from_str(contents).map_err(|e| {
            let (line, column) = (e.line(), e.column());
            let offset = (line > 0).then(|| offset_of(contents, line, column));
            parse_error(contents, format, name, e.to_string(), offset, Some(line), Some(column))
        }),
        PolicyFormat::Yaml | PolicyFormat::Fallback => {
            serde_yaml::from_str(contents).map_err(|e| {
                let loc = e.location();
                parse_error(
                    contents,
                    format,
                    name,
                    e.to_string(),
                    loc.as_ref().map(|l| l.index()),
                    loc.as_ref().map(|l| l.line()),
                    loc.as_ref().map(|l| l.column()),
                )
            })
        }
    }
}

/// Encode `doc` as `format`.
pub fn render(doc: &PolicyDocument, format: PolicyFormat) -> Result<String, AuthzError> {
    match format {
        PolicyFormat::Json => {
            serde_json::to_string_pretty(doc).map_err(|e| AuthzError::Serialize {
                format,
                message: e.to_string(),
            })
        }
        PolicyFormat::Yaml | PolicyFormat::Fallback => {
            serde_yaml::to_string(doc).map_err(|e| AuthzError::Serialize {
                format,
                message: e.to_string(),
            })
        }
    }
}

/// Save `doc` to `path` in the format chosen by its extension.
///
/// The file is written to a temporary sibling and renamed into place, so a
/// failed save leaves any previous file untouched.
pub fn save(doc: &PolicyDocument, path: &Path) -> Result<(), AuthzError> {
    let format = PolicyFormat::from_path(path);
    let data = render(doc, format)?;

    let write_err = |source: std::io::Error| AuthzError::PolicyWrite {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(data.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    tracing::info!(
        path = %path.display(),
        format = %format,
        roles = doc.roles.len(),
        groups = doc.groups.len(),
        projects = doc.projects.len(),
        "Saved policy document"
    );

    Ok(())
}

fn parse_error(
    contents: &str,
    format: PolicyFormat,
    name: &str,
    message: String,
    offset: Option<usize>,
    line: Option<usize>,
    column: Option<usize>,
) -> AuthzError {
    let span = offset.map(|o| SourceSpan::from((o.min(contents.len()), 0)));
    AuthzError::Parse {
        path: name.to_string(),
        format,
        message,
        line,
        column,
        src: NamedSource::new(name, contents.to_string()),
        span,
    }
}

/// True if anything besides whitespace and `#` comment lines is present.
fn has_content(contents: &str) -> bool {
    contents.lines().any(|l| {
        let l = l.trim();
        !l.is_empty() && !l.starts_with('#')
    })
}

/// Byte offset of a 1-based line/column pair.
fn offset_of(contents: &str, line: usize, column: usize) -> usize {
    let line_start: usize = contents
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(contents.len())
}
