//! Chat command parsing and dispatch.
//!
//! A command is the text after the bot mention: a keyword, optionally
//! followed by whitespace and a raw parameter string.
//!
//! ```text
//! <@123456> build ios-prod
//!           ^^^^^ ^^^^^^^^
//!           keyword  params
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::client::BuildServiceClient;
use crate::error::Result;

/// Keywords the bot answers to, in the order `help` lists them.
pub const AVAILABLE_COMMANDS: [&str; 4] =
    ["help", "supported_builds", "build_target_info", "build"];

/// A recognised bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    SupportedBuilds,
    /// Show details of a build target (raw target name).
    BuildTargetInfo(String),
    /// Start a build of a build target (raw target name).
    Build(String),
}

impl Command {
    /// Map a keyword and its parameters to a command, or `None` if unknown.
    pub fn parse(keyword: &str, params: &str) -> Option<Self> {
        match keyword {
            "help" => Some(Self::Help),
            "supported_builds" => Some(Self::SupportedBuilds),
            "build_target_info" => Some(Self::BuildTargetInfo(params.to_string())),
            "build" => Some(Self::Build(params.to_string())),
            _ => None,
        }
    }
}

/// Split message text into `(keyword, params)`.
///
/// The text is lower-cased and everything up to and including the first
/// `marker` is dropped. Without a marker the whole text is used. The
/// keyword ends at the first whitespace character; if there is none, or the
/// text starts with whitespace, params are empty.
pub fn split_command(text: &str, marker: &str) -> (String, String) {
    let lowered = text.to_lowercase();
    let rest = match lowered.find(marker) {
        Some(idx) => &lowered[idx + marker.len()..],
        None => lowered.as_str(),
    };

    match rest.char_indices().find(|(_, c)| c.is_whitespace()) {
        Some((idx, ws)) if idx > 0 => (
            rest[..idx].to_string(),
            rest[idx + ws.len_utf8()..].to_string(),
        ),
        _ => (rest.to_string(), String::new()),
    }
}

/// Routes bot commands to the build service.
pub struct CommandRouter {
    client: Arc<BuildServiceClient>,
    mention_marker: String,
}

impl CommandRouter {
    pub fn new(client: Arc<BuildServiceClient>, mention_marker: impl Into<String>) -> Self {
        Self {
            client,
            mention_marker: mention_marker.into(),
        }
    }

    /// Parse message text into a command. Unknown keywords are logged and
    /// yield `None`.
    pub fn parse(&self, text: &str) -> Option<Command> {
        let (keyword, params) = split_command(text, &self.mention_marker);
        let command = Command::parse(&keyword, &params);
        if command.is_none() {
            debug!(keyword = %keyword, "Unsupported command for bot");
        }
        command
    }

    /// Run a command and return the reply text.
    pub async fn dispatch(&self, command: Command) -> Result<String> {
        info!(command = ?command, "Dispatching command");
        match command {
            Command::Help => Ok(help_text()),
            Command::SupportedBuilds => {
                Ok(supported_builds_text(&self.client.list_supported_builds()))
            }
            Command::BuildTargetInfo(target) => self.client.build_target_info(&target).await,
            Command::Build(target) => self.client.start_build(&target).await,
        }
    }

    /// Parse and run a message addressed to the bot.
    ///
    /// Returns the single reply to send, or `None` for unknown commands.
    pub async fn handle(&self, text: &str) -> Result<Option<String>> {
        match self.parse(text) {
            Some(command) => self.dispatch(command).await.map(Some),
            None => Ok(None),
        }
    }
}

fn help_text() -> String {
    let mut msg = String::from("Available commands:");
    for command in AVAILABLE_COMMANDS {
        msg.push('\n');
        msg.push_str(command);
    }
    msg
}

fn supported_builds_text(builds: &[String]) -> String {
    let mut msg = String::from("Supported builds:");
    for build in builds {
        msg.push('\n');
        msg.push_str(build);
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BuildTargetCatalog;
    use crate::config::CloudBuildConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn router(base_url: &str) -> CommandRouter {
        let config = CloudBuildConfig {
            base_url: base_url.to_string(),
            api_key: "secret".to_string(),
            project_id: "game".to_string(),
            project_name: "The Game".to_string(),
            cloud_build_targets: BuildTargetCatalog::from_pairs([
                ("prod", "id-1"),
                ("staging", "id-2"),
            ]),
        };
        let client = BuildServiceClient::new(&config).unwrap();
        client.start_worker().await.unwrap();
        CommandRouter::new(Arc::new(client), "> ")
    }

    #[test]
    fn test_split_keyword_and_params() {
        assert_eq!(
            split_command("<@123> build ios-prod", "> "),
            ("build".to_string(), "ios-prod".to_string())
        );
    }

    #[test]
    fn test_split_lowercases_everything() {
        assert_eq!(
            split_command("<@123> BUILD_Target_Info Prod", "> "),
            ("build_target_info".to_string(), "prod".to_string())
        );
    }

    #[test]
    fn test_split_params_are_verbatim() {
        assert_eq!(
            split_command("<@123> build  two words ", "> "),
            ("build".to_string(), " two words ".to_string())
        );
    }

    #[test]
    fn test_split_without_params() {
        assert_eq!(
            split_command("<@123> help", "> "),
            ("help".to_string(), String::new())
        );
    }

    #[test]
    fn test_split_first_whitespace_may_be_newline() {
        assert_eq!(
            split_command("<@123> build\nprod", "> "),
            ("build".to_string(), "prod".to_string())
        );
    }

    #[test]
    fn test_split_without_marker_uses_whole_text() {
        assert_eq!(
            split_command("Help me", "> "),
            ("help".to_string(), "me".to_string())
        );
        assert_eq!(split_command("", "> "), (String::new(), String::new()));
    }

    #[test]
    fn test_split_leading_whitespace_gives_empty_params() {
        assert_eq!(
            split_command("<@123>  build prod", "> "),
            (" build prod".to_string(), String::new())
        );
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("help", "x"), Some(Command::Help));
        assert_eq!(Command::parse("supported_builds", ""), Some(Command::SupportedBuilds));
        assert_eq!(
            Command::parse("build", "prod"),
            Some(Command::Build("prod".to_string()))
        );
        assert_eq!(
            Command::parse("build_target_info", ""),
            Some(Command::BuildTargetInfo(String::new()))
        );
        assert_eq!(Command::parse("deploy", "prod"), None);
    }

    #[tokio::test]
    async fn test_help_lists_commands() {
        let router = router("http://localhost").await;
        let reply = router.handle("<@1> help").await.unwrap();
        assert_eq!(
            reply.as_deref(),
            Some("Available commands:\nhelp\nsupported_builds\nbuild_target_info\nbuild")
        );
    }

    #[tokio::test]
    async fn test_supported_builds_lists_catalog() {
        let router = router("http://localhost").await;
        let reply = router.handle("<@1> supported_builds").await.unwrap();
        assert_eq!(reply.as_deref(), Some("Supported builds:\nprod\nstaging"));
    }

    #[tokio::test]
    async fn test_unknown_keywords_produce_no_reply() {
        let router = router("http://localhost").await;
        for text in ["<@1> deploy prod", "<@1> ", "no marker at all", "<@1> helpme", ""] {
            assert_eq!(router.handle(text).await.unwrap(), None, "text: {:?}", text);
        }
    }

    #[tokio::test]
    async fn test_build_unknown_target_is_unsupported() {
        let router = router("http://localhost").await;
        let reply = router.handle("<@1> build qa").await.unwrap();
        assert_eq!(reply.as_deref(), Some("Unsupported build target: qa"));
    }

    #[tokio::test]
    async fn test_build_forwards_to_service() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/game/buildtargets/id-1/builds"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!([
                {"buildTargetName": "ios-prod", "scmBranch": "main"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let router = router(&server.uri()).await;
        let reply = router.handle("<@1> Build PROD").await.unwrap();
        assert_eq!(reply.as_deref(), Some("Start building ios-prod | Branch: main"));
    }
}
