//! The linker boundary: turning a compiled program's object files into a
//! final artifact is delegated to a collaborator trait rather than hard-coded
//! to one assembler/linker pair, so a CLI embedder supplies (or doesn't) a
//! real linker without this crate ever fabricating one.

/// A collaborator capable of turning one or more object files into a final
/// linked artifact. Never implemented by this crate beyond [`NullLinker`];
/// a production embedder supplies its own (`ld`, `lld`, MSVC `link.exe`,
/// etc.) matched to `target_triple`.
pub trait LinkerCollaborator {
    /// Links `object_paths` into `output_path` for `target_triple`.
    fn link(&self, object_paths: &[String], output_path: &str, target_triple: &str) -> anyhow::Result<()>;
}

/// The default collaborator: reports that linking was requested but no real
/// linker is configured, rather than shelling out to a guessed toolchain.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLinker;

impl LinkerCollaborator for NullLinker {
    fn link(&self, _object_paths: &[String], output_path: &str, target_triple: &str) -> anyhow::Result<()> {
        anyhow::bail!(
            "no linker collaborator configured for target `{target_triple}`; `{output_path}` was not produced"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_linker_reports_unconfigured_rather_than_shelling_out() {
        let linker = NullLinker;
        let err = linker.link(&["a.o".to_string()], "a.out", "x86_64-unknown-linux-gnu").unwrap_err();
        assert!(err.to_string().contains("no linker collaborator configured"));
    }
}
