// Observer - lifecycle notifications for display surfaces
//
// Purely informational. The core never branches on observer presence
// beyond a null-check, and observer failures cannot affect a run.

use serde_json::Value;

/// Lifecycle observer. All methods default to no-ops so implementations
/// subscribe only to the events they render.
pub trait Observer: Send + Sync {
    fn on_run_start(&self, _prompt: &str) {}
    fn on_iteration(&self, _iteration: u32) {}
    fn on_tool_call(&self, _tool: &str, _input: &Value) {}
    fn on_tool_result(&self, _tool: &str, _is_error: bool) {}
    fn on_run_done(&self, _text: &str, _iterations: u32) {}
    fn on_run_error(&self, _message: &str) {}
    fn on_child_start(&self, _role: &str, _model: &str) {}
    fn on_child_end(&self, _role: &str, _is_error: bool) {}
}

/// Terminal observer printing one concise line per event.
pub struct ConsoleObserver;

impl Observer for ConsoleObserver {
    fn on_iteration(&self, iteration: u32) {
        println!("  [round {}]", iteration);
    }

    fn on_tool_call(&self, tool: &str, input: &Value) {
        let preview = crate::policy::render_arguments(input).replace('\n', " ");
        println!("  -> {} {}", tool, preview.trim());
    }

    fn on_tool_result(&self, tool: &str, is_error: bool) {
        let status = if is_error { "error" } else { "ok" };
        println!("  <- {} ({})", tool, status);
    }

    fn on_run_error(&self, message: &str) {
        eprintln!("  [run failed] {}", message);
    }

    fn on_child_start(&self, role: &str, model: &str) {
        println!("  [child agent '{}' started on {}]", role, model);
    }

    fn on_child_end(&self, role: &str, is_error: bool) {
        let status = if is_error { "failed" } else { "finished" };
        println!("  [child agent '{}' {}]", role, status);
    }
}
