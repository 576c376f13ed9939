//! Embedded template management
//!
//! The native build descriptor, the JNI shim, the Java glue sources and the
//! manifest are shipped inside the crate and rendered with `{{NAME}}`
//! placeholders. Rendering fails if any placeholder is left behind.

use std::fs;
use std::path::{Path, PathBuf};

use include_dir::{Dir, include_dir};

use crate::types::ApkError;

static ANDROID_TEMPLATES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates/android");

/// Template variable that can be replaced in template files
#[derive(Debug, Clone)]
pub struct TemplateVar {
    pub name: &'static str,
    pub value: String,
}

impl TemplateVar {
    pub fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// The templates a build renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// CMake project for `libruntime-android.so`.
    /// Vars: `RUNTIME_INCLUDE`, `RUNTIME_ARCHIVE`.
    CMakeLists,
    /// JNI entry point that boots the runtime. Vars: `ENTRY_POINT_LIB`.
    RuntimeShim,
    /// Launcher activity.
    MainActivity,
    /// Instrumentation that copies assets and starts the runtime.
    MonoRunner,
    /// Vars: `PACKAGE_NAME`, `MIN_SDK_LEVEL`.
    Manifest,
}

impl Template {
    /// File name of the template, which is also the rendered file name.
    pub fn file_name(&self) -> &'static str {
        match self {
            Template::CMakeLists => "CMakeLists.txt",
            Template::RuntimeShim => "runtime-android.c",
            Template::MainActivity => "MainActivity.java",
            Template::MonoRunner => "MonoRunner.java",
            Template::Manifest => "AndroidManifest.xml",
        }
    }

    fn source(&self) -> Result<&'static str, ApkError> {
        ANDROID_TEMPLATES
            .get_file(self.file_name())
            .and_then(|file| file.contents_utf8())
            .ok_or_else(|| {
                ApkError::Template(format!(
                    "embedded template {} is missing or not UTF-8",
                    self.file_name()
                ))
            })
    }

    /// Renders the template with `vars`.
    pub fn render(&self, vars: &[TemplateVar]) -> Result<String, ApkError> {
        let rendered = render_template(self.source()?, vars);
        validate_no_unreplaced_placeholders(&rendered, Path::new(self.file_name()))?;
        Ok(rendered)
    }

    /// Renders the template into `dir/<file_name>` and returns the written path.
    pub fn write_to(&self, dir: &Path, vars: &[TemplateVar]) -> Result<PathBuf, ApkError> {
        let contents = self.render(vars)?;
        let path = dir.join(self.file_name());
        fs::write(&path, contents).map_err(|e| {
            ApkError::Filesystem(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(path)
    }
}

/// Validates that no unreplaced template placeholders remain in the rendered content
fn validate_no_unreplaced_placeholders(content: &str, file_path: &Path) -> Result<(), ApkError> {
    // Find all {{...}} patterns
    let mut pos = 0;
    let mut unreplaced = Vec::new();

    while let Some(start) = content[pos..].find("{{") {
        let abs_start = pos + start;
        if let Some(end) = content[abs_start..].find("}}") {
            let placeholder = &content[abs_start..abs_start + end + 2];
            let var_name = &content[abs_start + 2..abs_start + end];
            if !var_name.contains('$') && !var_name.contains(' ') && !var_name.is_empty() {
                unreplaced.push(placeholder.to_string());
            }
            pos = abs_start + end + 2;
        } else {
            break;
        }
    }

    if !unreplaced.is_empty() {
        return Err(ApkError::Template(format!(
            "rendering {:?} left unreplaced placeholders: {:?}",
            file_path, unreplaced
        )));
    }

    Ok(())
}

fn render_template(input: &str, vars: &[TemplateVar]) -> String {
    let mut output = input.to_string();
    for var in vars {
        output = output.replace(&format!("{{{{{}}}}}", var.name), &var.value);
    }
    output
}
