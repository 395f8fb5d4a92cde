use std::{path::Path, process::ExitCode};

use {
    anyhow::Result,
    clap::Args,
    inlet_channels::{CliAdapter, CliInbound},
    inlet_config::InletConfig,
    inlet_gateway::{DispatchReport, Pipeline, report::write_cli_report},
};

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Conversation the event belongs to.
    #[arg(long, short = 'c')]
    pub conversation: String,
    /// Treat MESSAGE as a JSON object instead of plain text.
    #[arg(long)]
    pub json: bool,
    /// Explicit idempotency key (derived from the content when omitted).
    #[arg(long)]
    pub idempotency_key: Option<String>,
    /// Channel to submit on.
    #[arg(long, default_value = inlet_protocol::CLI_CHANNEL)]
    pub channel: String,
    /// Message text, or a JSON object with --json.
    pub message: String,
}

pub async fn handle_send(args: SendArgs, config_path: Option<&Path>) -> Result<ExitCode> {
    let config = inlet_config::discover_and_load(config_path)?;
    let report = send_event(&config, args).await?;
    let code = write_cli_report(
        &report,
        &mut std::io::stdout().lock(),
        &mut std::io::stderr().lock(),
    )?;
    Ok(code)
}

/// Run one event through the same pipeline the HTTP gateway uses.
async fn send_event(config: &InletConfig, args: SendArgs) -> Result<DispatchReport> {
    let pipeline = Pipeline::from_config(config)?;
    let adapter = CliAdapter::new(args.channel);
    let inbound = CliInbound {
        conversation_id: args.conversation,
        message: args.message,
        json: args.json,
        idempotency_key: args.idempotency_key,
    };
    Ok(pipeline.process(&adapter, inbound).await)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, inlet_gateway::FailureKind, std::io::Write};

    fn args(conversation: &str, message: &str, json: bool) -> SendArgs {
        SendArgs {
            conversation: conversation.into(),
            json,
            idempotency_key: None,
            channel: "cli".into(),
            message: message.into(),
        }
    }

    #[tokio::test]
    async fn text_message_is_acknowledged() {
        let report = send_event(&InletConfig::default(), args("local", "hello", false))
            .await
            .unwrap();
        let inlet_gateway::Outcome::Success(result) = report.outcome else {
            panic!("expected success");
        };
        assert_eq!(result["accepted"], true);
        assert_eq!(result["conversationId"], "local");
    }

    #[tokio::test]
    async fn invalid_json_is_malformed() {
        let report = send_event(&InletConfig::default(), args("local", "{oops", true))
            .await
            .unwrap();
        assert_eq!(
            report.outcome.as_failure().unwrap().kind,
            FailureKind::MalformedInput
        );
    }

    #[tokio::test]
    async fn disabled_channel_is_unknown() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[channels.web]").unwrap();
        let config = inlet_config::load_config(file.path()).unwrap();

        let report = send_event(&config, args("local", "hello", false))
            .await
            .unwrap();
        assert_eq!(
            report.outcome.as_failure().unwrap().kind,
            FailureKind::UnknownChannel
        );
    }
}
