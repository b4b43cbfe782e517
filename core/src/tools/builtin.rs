//! Read-only filesystem builtins: `read_file`, `list_dir`. Both are
//! confined to a configured root directory and default to `Session`
//! trust, since neither can mutate anything.

use std::path::Path;
use std::path::PathBuf;

use path_absolutize::Absolutize;
use serde_json::Value;

use super::BuiltinTool;
use super::ToolExecutionResult;
use super::trust::DefaultTrustClass;

/// Resolve `requested` (a `path` argument, relative or absolute) against
/// `root`, rejecting anything that escapes it via `..` or an absolute
/// path outside the root.
fn resolve_within(root: &Path, requested: &str) -> Result<PathBuf, String> {
    let candidate = root.join(requested);
    let absolute = candidate
        .absolutize()
        .map_err(|e| format!("could not resolve path: {e}"))?;
    if !absolute.starts_with(root) {
        return Err(format!("path {requested:?} escapes the allowed root"));
    }
    Ok(absolute.into_owned())
}

fn path_arg(args: Option<Value>) -> Result<String, String> {
    let args = args.ok_or_else(|| "missing arguments: expected {\"path\": ...}".to_string())?;
    args.get("path")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "missing or non-string \"path\" argument".to_string())
}

/// Read a UTF-8 (lossy) text file under `root`.
pub struct ReadFileTool {
    root: PathBuf,
}

impl ReadFileTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BuiltinTool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file under the allowed root."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"],
        })
    }

    fn default_trust_class(&self) -> DefaultTrustClass {
        DefaultTrustClass::ReadOnlyBuiltin
    }

    fn call(&self, args: Option<Value>) -> Result<ToolExecutionResult, String> {
        let path = resolve_within(&self.root, &path_arg(args)?)?;
        let bytes = fs_err::read(&path).map_err(|e| e.to_string())?;
        Ok(ToolExecutionResult {
            text: String::from_utf8_lossy(&bytes).into_owned(),
            is_error: false,
        })
    }
}

/// List the immediate entries of a directory under `root`.
pub struct ListDirTool {
    root: PathBuf,
}

impl ListDirTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BuiltinTool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the immediate entries of a directory under the allowed root."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"],
        })
    }

    fn default_trust_class(&self) -> DefaultTrustClass {
        DefaultTrustClass::ReadOnlyBuiltin
    }

    fn call(&self, args: Option<Value>) -> Result<ToolExecutionResult, String> {
        let path = resolve_within(&self.root, &path_arg(args)?)?;
        let mut names: Vec<String> = fs_err::read_dir(&path)
            .map_err(|e| e.to_string())?
            .map(|entry| {
                entry
                    .map_err(|e| e.to_string())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
            })
            .collect::<Result<_, _>>()?;
        names.sort();
        Ok(ToolExecutionResult {
            text: names.join("\n"),
            is_error: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_file_reads_a_file_under_the_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs_err::write(dir.path().join("hello.txt"), "hi there").expect("write fixture");

        let tool = ReadFileTool::new(dir.path());
        let result = tool
            .call(Some(serde_json::json!({ "path": "hello.txt" })))
            .expect("read_file should succeed");
        assert_eq!(result.text, "hi there");
        assert!(!result.is_error);
    }

    #[test]
    fn read_file_rejects_path_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tool = ReadFileTool::new(dir.path());
        let err = tool
            .call(Some(serde_json::json!({ "path": "../../etc/passwd" })))
            .expect_err("traversal outside the root must be rejected");
        assert!(err.contains("escapes"));
    }

    #[test]
    fn list_dir_lists_sorted_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs_err::write(dir.path().join("b.txt"), "").expect("write fixture");
        fs_err::write(dir.path().join("a.txt"), "").expect("write fixture");

        let tool = ListDirTool::new(dir.path());
        let result = tool
            .call(Some(serde_json::json!({ "path": "." })))
            .expect("list_dir should succeed");
        assert_eq!(result.text, "a.txt\nb.txt");
    }

    #[test]
    fn default_trust_class_is_read_only_builtin() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            ReadFileTool::new(dir.path()).default_trust_class(),
            DefaultTrustClass::ReadOnlyBuiltin
        );
        assert_eq!(
            ListDirTool::new(dir.path()).default_trust_class(),
            DefaultTrustClass::ReadOnlyBuiltin
        );
    }
}
