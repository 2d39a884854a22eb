use gulc_diagnostics::Warnings;

/// Threaded through every pass: resolves a `source_file_id` to a path for
/// diagnostics, and accumulates non-fatal warnings.
pub struct Sess {
    file_paths: Vec<String>,
    pub warnings: Warnings,
}

impl Sess {
    pub fn new(file_paths: Vec<String>) -> Self {
        Self { file_paths, warnings: Warnings::default() }
    }

    pub fn file_path(&self, source_file_id: u32) -> &str {
        self.file_paths.get(source_file_id as usize).map(String::as_str).unwrap_or("<unknown>")
    }
}
