//! Handler for the `status` command.

use serde_json::json;

use super::output;
use crate::adapter::UnixProcessTable;
use crate::application::Environment;
use crate::error::Result;
use crate::infrastructure::config::credentials::Credentials;
use crate::infrastructure::config::Config;
use crate::port::ProcessTable;

/// Report the bot process and what is provisioned. Returns the exit code.
pub fn execute(config: &Config) -> Result<i32> {
    let spec = config.launch_spec();
    let pids = UnixProcessTable.find(&spec.display_name)?;
    let venv = config.paths.venv();
    let credentials = Credentials::load(&config.paths.env_file())?;
    let token_file = config.modal.token_file();

    if output::is_json() {
        output::json_output(json!({
            "running": !pids.is_empty(),
            "pids": pids,
            "display_name": spec.display_name,
            "log_path": spec.log_path,
            "install_root": config.paths.install_root(),
            "environment": Environment::exists(&venv),
            "bot_token": credentials.bot_token.is_some(),
            "modal_token": token_file.is_file() || credentials.modal_tokens().is_some(),
            "modal_server": &credentials.modal_server,
        }));
        return Ok(0);
    }

    output::header("status");
    let state = match pids.as_slice() {
        [] => output::muted("○ stopped"),
        [pid] => output::positive(format!("● running (pid {pid})")),
        many => {
            let list: Vec<String> = many.iter().map(u32::to_string).collect();
            output::positive(format!("● running (pids {})", list.join(", ")))
        }
    };
    output::field("Bot", state);
    output::field("Install root", config.paths.install_root().display());
    output::field("Environment", present(Environment::exists(&venv)));
    output::field("Bot token", present(credentials.bot_token.is_some()));
    output::field(
        "Modal token",
        present(token_file.is_file() || credentials.modal_tokens().is_some()),
    );
    if let Some(ref server) = credentials.modal_server {
        output::field("Modal server", server);
    }
    output::field("Log", spec.log_path.display());

    if pids.len() > 1 {
        output::warning("more than one process matches the display name");
    }
    if pids.is_empty() {
        output::hint("start it with `botctl start`");
    }
    Ok(0)
}

fn present(found: bool) -> String {
    if found {
        output::positive("present")
    } else {
        output::muted("missing")
    }
}
