use crate::types::GateCategory;

/// Derives a [`GateCategory`] purely from a tool name, via a fixed table
/// plus `mcp_*`/`vector_db_*` prefix rules. Anything unrecognized falls
/// back to `python`, the default/catch-all category for dynamic tools.
pub fn category_of(name: &str) -> GateCategory {
    if name.starts_with("mcp_") {
        return GateCategory::Mcp;
    }
    if name.starts_with("vector_db_") {
        return GateCategory::Memory;
    }

    match name {
        "read_file" | "list_files" | "grep_file" | "ast_grep_search" | "simple_search"
        | "list_directory" | "glob_search" => GateCategory::FileRead,
        "write_file" | "edit_file" | "delete_file" | "create_file" | "apply_patch"
        | "move_file" | "rename_file" => GateCategory::FileWrite,
        "run_terminal_cmd" | "bash" | "shell" | "execute_command" => GateCategory::Shell,
        "web_fetch" | "curl" | "http_request" | "fetch_url" => GateCategory::Network,
        "memory_store" | "memory_recall" | "save_memory" | "recall_memory" => {
            GateCategory::Memory
        }
        "spawn_subagent" | "run_subagent" | "delegate_task" | "team_spawn" => {
            GateCategory::Subagent
        }
        _ => GateCategory::Python,
    }
}
