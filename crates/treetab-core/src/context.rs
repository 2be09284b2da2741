//! Runtime context for sink pathnames
//!
//! Sink paths are configured as templates such as `${out_dir}/run-${run}.csv`.
//! Variables come from built-ins, the configuration file, the input
//! document's context element, and finally caller overrides, each layer
//! taking precedence over the previous one.

use crate::document::Document;
use crate::error::{Result, TreetabError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Variables and base directory used to resolve sink pathnames
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    vars: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
    base_dir: PathBuf,
}

impl RuntimeContext {
    /// Create a context with the built-in variables
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert(
            "today".to_string(),
            chrono::Local::now().format("%Y-%m-%d").to_string(),
        );
        Self {
            vars,
            overrides: BTreeMap::new(),
            base_dir: base_dir.into(),
        }
    }

    /// Create a context rooted at the current directory
    pub fn current_dir() -> Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Set a default variable (overridden by document values)
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Set a variable that nothing else can override
    pub fn set_override(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    /// Builder form of [`RuntimeContext::set`]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.overrides
            .get(name)
            .or_else(|| self.vars.get(name))
            .map(String::as_str)
    }

    /// Merge variables from the document's context element
    ///
    /// Each child element of `<root><{element}>` becomes a variable named
    /// after the child, valued with its text.
    pub fn merge_document(&mut self, doc: &Document, element: &str) {
        let Some(root) = doc.root_element() else {
            return;
        };
        let Some(context) = doc.first_child_element(root, element) else {
            debug!("Document has no <{}> element", element);
            return;
        };
        for child in doc.child_elements(context) {
            if let Some(name) = doc.name(child) {
                let value = doc.string_value(child);
                debug!("Context variable {} = {}", name, value);
                self.vars.insert(name.to_string(), value);
            }
        }
    }

    /// Substitute `${name}` references; `$$` is a literal `$`
    pub fn expand(&self, template: &str) -> Result<String> {
        expand_with(template, |name| self.get(name))
    }

    /// Expand a template into a concrete path
    pub fn resolve_path(&self, template: &str) -> Result<PathBuf> {
        let expanded = self.expand(template)?;
        let expanded = expanded.trim();
        if expanded.is_empty() {
            return Err(pathname_error(template, "resolves to an empty path"));
        }

        let path = if expanded == "~" || expanded.starts_with("~/") {
            let home = dirs::home_dir()
                .ok_or_else(|| pathname_error(template, "home directory is unknown"))?;
            home.join(expanded.trim_start_matches('~').trim_start_matches('/'))
        } else {
            PathBuf::from(expanded)
        };

        let path = if path.is_relative() {
            self.base_dir.join(path)
        } else {
            path
        };

        if path.file_name().is_none() {
            return Err(pathname_error(template, "does not name a file"));
        }
        Ok(path)
    }
}

/// Check template syntax without resolving any variable
pub fn check_template(template: &str) -> Result<()> {
    expand_with(template, |_| Some("")).map(|_| ())
}

fn expand_with<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];

        if let Some(after) = rest.strip_prefix('$') {
            out.push('$');
            rest = after;
        } else if let Some(after) = rest.strip_prefix('{') {
            let end = after
                .find('}')
                .ok_or_else(|| pathname_error(template, "unterminated '${'"))?;
            let name = after[..end].trim();
            if name.is_empty() {
                return Err(pathname_error(template, "empty variable name"));
            }
            let value = lookup(name).ok_or_else(|| {
                pathname_error(template, format!("unknown variable '{}'", name))
            })?;
            out.push_str(value);
            rest = &after[end + 1..];
        } else {
            out.push('$');
        }
    }

    out.push_str(rest);
    Ok(out)
}

fn pathname_error(template: &str, message: impl Into<String>) -> TreetabError {
    TreetabError::Pathname {
        template: template.to_string(),
        message: message.into(),
    }
}
