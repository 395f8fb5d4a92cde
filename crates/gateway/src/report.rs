//! Translate outcomes into what each kind of caller sees.
//!
//! Web callers get a status code and a JSON envelope; CLI callers get the
//! result on stdout, or one `Fatal error:` line on stderr and exit code 1.

use std::{io::Write, process::ExitCode};

use {
    axum::{
        Json,
        http::{HeaderValue, StatusCode},
        response::{IntoResponse, Response},
    },
    inlet_protocol::{ResponseEnvelope, headers},
};

use crate::{dispatcher::DispatchReport, outcome::Outcome};

/// Status code and envelope for an outcome.
pub fn web_response(outcome: &Outcome) -> (StatusCode, ResponseEnvelope) {
    match outcome {
        Outcome::Success(_) => (StatusCode::OK, ResponseEnvelope::ok()),
        Outcome::Failure(failure) => {
            let status = if failure.kind.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (
                status,
                ResponseEnvelope::err(failure.code(), failure.message.clone()),
            )
        },
    }
}

/// HTTP response for one delivery. Replays carry an `idempotent-replay`
/// header so callers can tell them apart.
pub struct WebReport(pub DispatchReport);

impl IntoResponse for WebReport {
    fn into_response(self) -> Response {
        let (status, envelope) = web_response(&self.0.outcome);
        let mut response = (status, Json(envelope)).into_response();
        if self.0.replayed {
            response
                .headers_mut()
                .insert(headers::IDEMPOTENT_REPLAY, HeaderValue::from_static("true"));
        }
        response
    }
}

/// Process exit code for an outcome.
pub fn exit_code(outcome: &Outcome) -> ExitCode {
    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Write the CLI rendering of `report`: the handler result as JSON on
/// `out` for success, a single diagnostic line on `err` otherwise.
pub fn write_cli_report(
    report: &DispatchReport,
    out: &mut impl Write,
    err: &mut impl Write,
) -> std::io::Result<ExitCode> {
    match &report.outcome {
        Outcome::Success(result) => {
            let text = serde_json::to_string_pretty(result).map_err(std::io::Error::other)?;
            writeln!(out, "{text}")?;
        },
        Outcome::Failure(failure) => {
            writeln!(err, "Fatal error: {failure}")?;
        },
    }
    Ok(exit_code(&report.outcome))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::outcome::Failure,
        inlet_channels::{ValidationCode, ValidationError},
    };

    #[test]
    fn success_is_200_with_bare_envelope() {
        let (status, envelope) = web_response(&Outcome::Success(serde_json::json!({"a": 1})));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(envelope).unwrap(),
            serde_json::json!({"success": true})
        );
    }

    #[test]
    fn client_faults_are_400() {
        let (status, envelope) = web_response(&Failure::malformed("body is not valid JSON").into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(envelope.code.as_deref(), Some("MALFORMED_INPUT"));

        let invalid = ValidationError {
            code: ValidationCode::EmptyConversationId,
            reason: "conversation id is empty".into(),
        };
        let (status, envelope) = web_response(&Failure::validation(&invalid).into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(envelope.code.as_deref(), Some("EMPTY_CONVERSATION_ID"));
    }

    #[test]
    fn server_faults_are_500() {
        for failure in [
            Failure::handler_failure(false),
            Failure::timeout(),
            Failure::unknown_channel("sms"),
        ] {
            let (status, envelope) = web_response(&failure.clone().into());
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(!envelope.success);
            assert_eq!(envelope.error.as_deref(), Some(failure.message.as_str()));
        }
    }

    #[test]
    fn replay_header_only_on_replays() {
        let fresh = WebReport(DispatchReport::fresh(Outcome::Success(serde_json::json!({}))))
            .into_response();
        assert!(fresh.headers().get(headers::IDEMPOTENT_REPLAY).is_none());

        let replayed = WebReport(DispatchReport {
            outcome: Outcome::Success(serde_json::json!({})),
            replayed: true,
        })
        .into_response();
        assert_eq!(
            replayed.headers().get(headers::IDEMPOTENT_REPLAY).unwrap(),
            "true"
        );
    }

    #[test]
    fn cli_failure_writes_fatal_line() {
        let report = DispatchReport::fresh(Failure::timeout().into());
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let code = write_cli_report(&report, &mut out, &mut err).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert!(out.is_empty());
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "Fatal error: TIMEOUT: event processing timed out\n"
        );
    }

    #[test]
    fn cli_success_prints_result() {
        let report = DispatchReport::fresh(Outcome::Success(serde_json::json!({"accepted": true})));
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let code = write_cli_report(&report, &mut out, &mut err).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(err.is_empty());
        assert!(String::from_utf8(out).unwrap().contains("\"accepted\": true"));
    }
}
