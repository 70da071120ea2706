macro_rules! debug_path {
    ($description: expr, $path: ident) => {
        tracing::debug!(
            "{COMPONENT} - {} exists at {:?}: {}",
            $description,
            $path,
            $path.exists()
        );
    };
}
pub(crate) use debug_path;

macro_rules! debug_stage {
    ($stage: expr, $tokens: expr) => {
        tracing::debug!("{COMPONENT} - {} wraps the command with {:?}", $stage, $tokens);
    };
}
pub(crate) use debug_stage;

macro_rules! warn_missing_tool {
    ($stage: expr, $tool: expr) => {
        tracing::warn!(
            "{COMPONENT} - {} is not available on this system, {} disabled",
            $tool,
            $stage
        );
    };
}
pub(crate) use warn_missing_tool;
