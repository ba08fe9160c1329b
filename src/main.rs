use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use payv1_rs::{
    Action, ActionParams, ApiResult, Credentials, Dispatcher, DispatchRequest, Environment,
    HttpTransport, ListQuery, ResourceIds, Session,
};

#[derive(Parser)]
#[command(name = "payv1", version, about = "Exercise the v1 payments REST API and inspect the raw traffic")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single action and print the trace
    Call {
        /// Action identifier, e.g. create_payment
        action: String,
        #[command(flatten)]
        credentials: CredentialArgs,
        #[command(flatten)]
        params: ParamArgs,
        /// Which part of the trace to print
        #[arg(long, value_enum, default_value_t = Show::Response)]
        show: Show,
    },
    /// List actions, or print the sample body of one action
    Actions {
        action: Option<String>,
    },
    /// Interactive session: ids from responses are reused in later calls
    Shell {
        #[command(flatten)]
        credentials: CredentialArgs,
    },
}

#[derive(Args)]
struct CredentialArgs {
    #[arg(long, env = "PAYV1_CLIENT_ID")]
    client_id: String,
    #[arg(long, env = "PAYV1_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,
    /// sandbox or live
    #[arg(long, env = "PAYV1_ENVIRONMENT", default_value = "sandbox")]
    environment: String,
    /// Overrides the environment's API origin
    #[arg(long, env = "PAYV1_BASE_URL")]
    base_url: Option<String>,
    /// Upstream request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

impl CredentialArgs {
    fn credentials(&self) -> Credentials {
        Credentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            environment: Environment::from(self.environment.as_str()),
            custom_base_url: self.base_url.clone(),
        }
    }

    fn dispatcher(&self) -> Result<Dispatcher> {
        let transport = HttpTransport::with_timeout(Duration::from_secs(self.timeout))
            .context("Failed to build HTTP client")?;
        Ok(Dispatcher::with_transport(transport))
    }
}

#[derive(Args, Default)]
struct ParamArgs {
    #[arg(long)]
    payment_id: Option<String>,
    #[arg(long)]
    sale_id: Option<String>,
    #[arg(long)]
    authorization_id: Option<String>,
    #[arg(long)]
    order_id: Option<String>,
    #[arg(long)]
    capture_id: Option<String>,
    #[arg(long)]
    refund_id: Option<String>,
    #[arg(long)]
    payer_id: Option<String>,
    /// JSON body (patch document for update_payment), or @path to read it from a file
    #[arg(long)]
    body: Option<String>,
    /// Send the action's sample body when --body is absent
    #[arg(long)]
    sample_body: bool,
    #[arg(long)]
    count: Option<String>,
    #[arg(long)]
    start_id: Option<String>,
    #[arg(long)]
    start_index: Option<String>,
    #[arg(long)]
    start_time: Option<String>,
    #[arg(long)]
    end_time: Option<String>,
    #[arg(long)]
    sort_by: Option<String>,
    #[arg(long)]
    sort_order: Option<String>,
}

impl ParamArgs {
    fn into_params(self, action: &str) -> Result<ActionParams> {
        let body = match (&self.body, self.sample_body) {
            (Some(raw), _) => Some(read_json_arg(raw)?),
            (None, true) => action.parse::<Action>().ok().and_then(Action::sample_body),
            (None, false) => None,
        };
        let query = ListQuery {
            count: self.count,
            start_id: self.start_id,
            start_index: self.start_index,
            start_time: self.start_time,
            end_time: self.end_time,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
        };

        let mut params = ActionParams {
            payment_id: self.payment_id,
            sale_id: self.sale_id,
            authorization_id: self.authorization_id,
            order_id: self.order_id,
            capture_id: self.capture_id,
            refund_id: self.refund_id,
            payer_id: self.payer_id,
            query_params: (query != ListQuery::default()).then_some(query),
            ..Default::default()
        };
        set_body(&mut params, action, body);
        Ok(params)
    }
}

/// Trace sections, mirroring the tabs of the web console
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Show {
    Response,
    Request,
    Curl,
    Token,
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "payv1_rs=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Call {
            action,
            credentials,
            params,
            show,
        } => {
            let dispatcher = credentials.dispatcher()?;
            let request = DispatchRequest {
                credentials: credentials.credentials(),
                params: params.into_params(&action)?,
                action,
            };
            let result = dispatcher.dispatch(&request).await;
            print_result(&result, show)?;
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Actions { action: None } => {
            for action in Action::ALL {
                println!(
                    "{:<15} {:<6} {:<22} {}",
                    action.group(),
                    action.method().as_str(),
                    action.as_str(),
                    action.resource().map(|r| r.param_name()).unwrap_or("")
                );
            }
        }
        Command::Actions {
            action: Some(name),
        } => {
            let action: Action = name.parse()?;
            match action.sample_body() {
                Some(body) => println!("{}", serde_json::to_string_pretty(&body)?),
                None => eprintln!("{} takes no body", action),
            }
        }
        Command::Shell { credentials } => {
            let dispatcher = credentials.dispatcher()?;
            run_shell(&dispatcher, Session::new(credentials.credentials())).await?;
        }
    }

    Ok(())
}

fn print_result(result: &ApiResult, show: Show) -> Result<()> {
    if let Some(error) = &result.error {
        eprintln!("Error: {}", error);
    }

    let section = match show {
        Show::All => Some(serde_json::to_value(result)?),
        Show::Response => result
            .http_response
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?,
        Show::Request => result
            .http_request
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?,
        Show::Token => match (&result.token_info, &result.token_response) {
            (Some(info), _) => Some(serde_json::to_value(info)?),
            (None, Some(response)) => Some(response.clone()),
            (None, None) => None,
        },
        Show::Curl => {
            match result.http_request.as_ref().and_then(|r| r.curl.as_deref()) {
                Some(curl) => println!("{}", curl),
                None => eprintln!("(no cURL command available)"),
            }
            return Ok(());
        }
    };

    match section {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => eprintln!("(nothing to show for {:?})", show),
    }
    Ok(())
}

/// Parse `value` as JSON, or read JSON from a file when it starts with `@`.
fn read_json_arg(value: &str) -> Result<Value> {
    let text = match value.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(PathBuf::from(path))
            .with_context(|| format!("Failed to read body file {}", path))?,
        None => value.to_string(),
    };
    serde_json::from_str(&text).context("Body is not valid JSON")
}

/// Route a body to the patch document for `update_payment`, the request body otherwise.
fn set_body(params: &mut ActionParams, action: &str, body: Option<Value>) {
    if action == Action::UpdatePayment.as_str() {
        params.patch_body = body;
    } else {
        params.request_body = body;
    }
}

#[derive(Debug, PartialEq)]
enum ShellCommand {
    Run { action: String, params: ActionParams },
    Ids,
    Forget,
    Payer(String),
    History,
    Clear,
    Help,
    Quit,
    Empty,
}

/// Parse one shell line: `<action> [key=value ...] [body=<json>]`.
///
/// `body=` swallows the rest of the line so JSON may contain spaces.
fn parse_shell_line(line: &str) -> Result<ShellCommand> {
    let line = line.trim();
    let (head, mut rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim_start()),
        None => (line, ""),
    };

    match head {
        "" => return Ok(ShellCommand::Empty),
        "ids" => return Ok(ShellCommand::Ids),
        "forget" => return Ok(ShellCommand::Forget),
        "payer" => {
            if rest.is_empty() {
                bail!("Usage: payer <payer_id>");
            }
            return Ok(ShellCommand::Payer(rest.trim_end().to_string()));
        }
        "history" => return Ok(ShellCommand::History),
        "clear" => return Ok(ShellCommand::Clear),
        "help" | "?" => return Ok(ShellCommand::Help),
        "quit" | "exit" => return Ok(ShellCommand::Quit),
        _ => {}
    }

    let mut params = ActionParams::default();
    let mut query = ListQuery::default();
    let mut body = None;

    while !rest.is_empty() {
        if let Some(raw) = rest.strip_prefix("body=") {
            body = Some(read_json_arg(raw.trim())?);
            break;
        }
        let (token, remaining) = match rest.split_once(char::is_whitespace) {
            Some((token, remaining)) => (token, remaining.trim_start()),
            None => (rest, ""),
        };
        rest = remaining;

        let Some((key, value)) = token.split_once('=') else {
            bail!("Expected key=value, got '{}'", token);
        };
        let value = Some(value.to_string());
        match key {
            "payment_id" => params.payment_id = value,
            "sale_id" => params.sale_id = value,
            "authorization_id" => params.authorization_id = value,
            "order_id" => params.order_id = value,
            "capture_id" => params.capture_id = value,
            "refund_id" => params.refund_id = value,
            "payer_id" => params.payer_id = value,
            "count" => query.count = value,
            "start_id" => query.start_id = value,
            "start_index" => query.start_index = value,
            "start_time" => query.start_time = value,
            "end_time" => query.end_time = value,
            "sort_by" => query.sort_by = value,
            "sort_order" => query.sort_order = value,
            other => bail!("Unknown parameter '{}'", other),
        }
    }

    if query != ListQuery::default() {
        params.query_params = Some(query);
    }
    set_body(&mut params, head, body);

    Ok(ShellCommand::Run {
        action: head.to_string(),
        params,
    })
}

const SHELL_HELP: &str = "\
<action> [key=value ...] [body=<json>|body=@file]   run an action
ids                                                 show remembered resource ids
forget                                              drop remembered resource ids
payer <payer_id>                                    remember the payer id for execute_payment
history                                             show recent calls
clear                                               clear the call history
help                                                this text
quit                                                leave the shell";

async fn run_shell(dispatcher: &Dispatcher, mut session: Session) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("payv1> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse_shell_line(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                continue;
            }
        };

        match command {
            ShellCommand::Empty => {}
            ShellCommand::Quit => break,
            ShellCommand::Help => println!("{}", SHELL_HELP),
            ShellCommand::Ids => println!("{}", serde_json::to_string_pretty(session.ids())?),
            ShellCommand::Forget => *session.ids_mut() = ResourceIds::default(),
            ShellCommand::Payer(payer_id) => session.set_payer_id(payer_id),
            ShellCommand::Clear => session.history_mut().clear(),
            ShellCommand::History => {
                for entry in session.history().iter() {
                    let mark = if entry.success { "ok " } else { "ERR" };
                    println!("{} {} {:<22} {}", mark, entry.time, entry.action, entry.summary);
                }
            }
            ShellCommand::Run { action, params } => {
                let result = session.run(dispatcher, &action, params).await;
                print_result(&result, Show::Response)?;
                if let Some(curl) = result.http_request.as_ref().and_then(|r| r.curl.as_deref()) {
                    println!("{}", curl);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_action_with_params() {
        let command = parse_shell_line("show_sale sale_id=SALE-1").unwrap();
        assert_eq!(
            command,
            ShellCommand::Run {
                action: "show_sale".into(),
                params: ActionParams {
                    sale_id: Some("SALE-1".into()),
                    ..Default::default()
                },
            }
        );
    }

    #[test]
    fn test_parse_body_with_spaces() {
        let command =
            parse_shell_line(r#"refund_sale sale_id=S1 body={"amount": {"total": "1.00", "currency": "USD"}}"#)
                .unwrap();
        let ShellCommand::Run { params, .. } = command else {
            panic!("expected a run command");
        };
        assert_eq!(params.sale_id.as_deref(), Some("S1"));
        assert_eq!(
            params.request_body,
            Some(json!({ "amount": { "total": "1.00", "currency": "USD" } }))
        );
    }

    #[test]
    fn test_parse_patch_goes_to_patch_body() {
        let command =
            parse_shell_line(r#"update_payment body=[{"op":"remove","path":"/x"}]"#).unwrap();
        let ShellCommand::Run { params, .. } = command else {
            panic!("expected a run command");
        };
        assert!(params.request_body.is_none());
        assert_eq!(params.patch_body, Some(json!([{ "op": "remove", "path": "/x" }])));
    }

    #[test]
    fn test_parse_list_query() {
        let ShellCommand::Run { params, .. } =
            parse_shell_line("list_payments count=5 sort_order=desc").unwrap()
        else {
            panic!("expected a run command");
        };
        let query = params.query_params.unwrap();
        assert_eq!(query.count.as_deref(), Some("5"));
        assert_eq!(query.sort_order.as_deref(), Some("desc"));
        assert!(query.start_time.is_none());
    }

    #[test]
    fn test_parse_meta_commands_and_errors() {
        assert_eq!(parse_shell_line("   ").unwrap(), ShellCommand::Empty);
        assert_eq!(parse_shell_line("history").unwrap(), ShellCommand::History);
        assert_eq!(parse_shell_line("clear").unwrap(), ShellCommand::Clear);
        assert_eq!(parse_shell_line("forget").unwrap(), ShellCommand::Forget);
        assert_eq!(
            parse_shell_line("payer PAYER123").unwrap(),
            ShellCommand::Payer("PAYER123".into())
        );
        assert!(parse_shell_line("payer").is_err());
        assert_eq!(parse_shell_line("exit").unwrap(), ShellCommand::Quit);
        assert!(parse_shell_line("show_sale sale_id").is_err());
        assert!(parse_shell_line("show_sale color=blue").is_err());
        assert!(parse_shell_line("create_payment body={broken").is_err());
    }

    #[test]
    fn test_param_args_sample_body() {
        let params = ParamArgs {
            sample_body: true,
            ..Default::default()
        }
        .into_params("capture_order")
        .unwrap();
        assert_eq!(params.request_body.unwrap()["is_final_capture"], true);

        let params = ParamArgs {
            count: Some("3".into()),
            ..Default::default()
        }
        .into_params("list_payments")
        .unwrap();
        assert_eq!(params.query_params.unwrap().count.as_deref(), Some("3"));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
