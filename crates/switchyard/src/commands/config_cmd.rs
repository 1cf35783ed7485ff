//! Config subcommand handlers.

use switchyard_config::{Config, config_path};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::context;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

/// Replace plaintext passwords before the config is printed.
fn redacted(mut cfg: Config) -> Config {
    for entry in cfg.accounts.values_mut() {
        if entry.password.is_some() {
            entry.password = Some(REDACTED.to_owned());
        }
    }
    cfg
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = redacted(context::load_config(global)?);
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| format!("{c:#?}"),
                |_| "config".into(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            let path = global.config.clone().unwrap_or_else(config_path);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use switchyard_config::AccountEntry;

    use super::*;

    #[test]
    fn passwords_are_masked() {
        let mut cfg = Config::default();
        cfg.accounts.insert(
            "lab".into(),
            AccountEntry {
                username: "admin".into(),
                password: Some("hunter2".into()),
                password_env: None,
            },
        );
        let shown = redacted(cfg);
        assert_eq!(shown.accounts["lab"].password.as_deref(), Some(REDACTED));
    }
}
