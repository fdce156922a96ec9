use crate::conversation::Conversation;

pub const SHELL_DENIAL_REASON: &str =
    "Blocked: bash commands require explicit user request. Please proceed without execute_bash_command.";

lazy_static::lazy_static! {
    // Markers suggesting the user wants file, search, or shell work done
    static ref EXPOSURE_MARKERS: Vec<&'static str> = vec![
        "read file", "write file", "create file", "append to file", "search", "grep", "file tree",
        "directory", "path", "open", "bash", "shell", "terminal", "run", "execute",
        "npm", "node", "ts-node", "tsc", "yarn", "pnpm", "pip", "python", "pytest", "make", "gradle", "cargo",
        "go run", "go build",
        ".ts", ".js", ".json", ".py", ".md", "/", "\\",
    ];

    // Markers showing the user explicitly asked for a command to be run
    static ref SHELL_MARKERS: Vec<&'static str> = vec![
        "bash", "shell", "terminal", "run", "execute",
        "npm", "node", "yarn", "pnpm", "pip", "python", "pytest", "ts-node", "tsc", "make", "gradle", "cargo",
        "go run", "go build",
    ];
}

/// Ordered marker lists the gate matches against. Markers are lowercase.
#[derive(Debug, Clone, PartialEq)]
pub struct GateConfig {
    pub exposure_markers: Vec<String>,
    pub shell_markers: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            exposure_markers: EXPOSURE_MARKERS.iter().map(|m| m.to_string()).collect(),
            shell_markers: SHELL_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellAuthorization {
    pub allowed: bool,
    pub reason: String,
}

impl ShellAuthorization {
    fn allowed(marker: &str) -> Self {
        Self {
            allowed: true,
            reason: format!("user asked for command execution ({marker:?})"),
        }
    }

    fn denied() -> Self {
        Self {
            allowed: false,
            reason: SHELL_DENIAL_REASON.to_string(),
        }
    }
}

/// Decides per turn whether tools are offered and whether shell commands may run.
/// Both decisions look only at the latest user message.
#[derive(Debug, Clone, Default)]
pub struct ToolGate {
    config: GateConfig,
}

impl ToolGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn should_expose_tools(&self, conversation: &Conversation) -> bool {
        match conversation.last_user_text() {
            None => true,
            Some(text) => self.exposes_tools_for(text),
        }
    }

    pub fn authorize_shell_execution(&self, conversation: &Conversation) -> ShellAuthorization {
        self.authorize_shell_for(conversation.last_user_text().unwrap_or(""))
    }

    pub fn exposes_tools_for(&self, user_text: &str) -> bool {
        first_marker(user_text, &self.config.exposure_markers).is_some()
    }

    pub fn authorize_shell_for(&self, user_text: &str) -> ShellAuthorization {
        match first_marker(user_text, &self.config.shell_markers) {
            Some(marker) => ShellAuthorization::allowed(marker),
            None => ShellAuthorization::denied(),
        }
    }
}

/// Lowercases and collapses whitespace runs so "go   run" matches "go run".
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn first_marker<'a>(text: &str, markers: &'a [String]) -> Option<&'a str> {
    let text = normalize(text);
    markers
        .iter()
        .map(String::as_str)
        .find(|marker| !marker.is_empty() && text.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation_with(user_text: &str) -> Conversation {
        let mut conversation = Conversation::with_system("sys");
        conversation.push_user(user_text);
        conversation
    }

    #[test]
    fn test_exposure_fails_open_without_user_message() {
        let gate = ToolGate::default();
        assert!(gate.should_expose_tools(&Conversation::new()));
        assert!(gate.should_expose_tools(&Conversation::with_system("sys")));
    }

    #[test]
    fn test_exposure_follows_intent_markers() {
        let gate = ToolGate::default();

        assert!(gate.should_expose_tools(&conversation_with("read file README.md")));
        assert!(gate.should_expose_tools(&conversation_with("Show me the directory layout")));
        assert!(gate.should_expose_tools(&conversation_with("what does main.py do?")));
        assert!(gate.should_expose_tools(&conversation_with("look in src/lib")));

        assert!(!gate.should_expose_tools(&conversation_with("What is the capital of France?")));
        assert!(!gate.should_expose_tools(&conversation_with("Tell me a joke")));
    }

    #[test]
    fn test_exposure_only_looks_at_latest_user_message() {
        let gate = ToolGate::default();
        let mut conversation = conversation_with("read file a.txt");
        conversation.push_assistant("done");
        conversation.push_user("thanks, who wrote Hamlet?");

        assert!(!gate.should_expose_tools(&conversation));
    }

    #[test]
    fn test_shell_authorization() {
        let gate = ToolGate::default();

        let auth = gate.authorize_shell_execution(&conversation_with("run the tests"));
        assert!(auth.allowed);

        let auth = gate.authorize_shell_execution(&conversation_with("please GO   BUILD it"));
        assert!(auth.allowed);

        let auth = gate.authorize_shell_execution(&conversation_with("What is the capital of France?"));
        assert!(!auth.allowed);
        assert_eq!(auth.reason, SHELL_DENIAL_REASON);

        let auth = gate.authorize_shell_execution(&conversation_with("delete everything"));
        assert!(!auth.allowed);
        assert_eq!(auth.reason, SHELL_DENIAL_REASON);
    }

    #[test]
    fn test_shell_denied_without_any_user_message() {
        let gate = ToolGate::default();
        let auth = gate.authorize_shell_execution(&Conversation::new());
        assert!(!auth.allowed);
    }

    #[test]
    fn test_custom_markers() {
        let gate = ToolGate::new(GateConfig {
            exposure_markers: vec!["deploy".to_string()],
            shell_markers: vec!["deploy".to_string()],
        });

        assert!(gate.should_expose_tools(&conversation_with("Deploy the site")));
        assert!(!gate.should_expose_tools(&conversation_with("read file a.txt")));
        assert!(gate.authorize_shell_execution(&conversation_with("deploy now")).allowed);
        assert!(!gate.authorize_shell_execution(&conversation_with("run it")).allowed);
    }

    #[test]
    fn test_text_level_decisions_use_custom_markers() {
        let gate = ToolGate::new(GateConfig {
            exposure_markers: vec!["deploy".to_string()],
            shell_markers: vec!["deploy".to_string()],
        });

        assert!(gate.exposes_tools_for("Please   DEPLOY the app"));
        assert!(!gate.exposes_tools_for("read file README.md"));
        assert!(gate.authorize_shell_for("deploy now").allowed);

        let denied = gate.authorize_shell_for("run the tests");
        assert!(!denied.allowed);
        assert_eq!(denied.reason, SHELL_DENIAL_REASON);
    }
}
