use super::render::{
    print_attachment, print_backups, print_document, print_messages, print_notifications,
    print_statuses,
};
use super::setup::{init_logging, Cli, Commands, HOME_ENV};
use clap::Parser;
use directories::ProjectDirs;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use thesisdb::api::{NotifyRequest, ThesisApi};
use thesisdb::error::{Result, StoreError};
use thesisdb::store::JsonStore;
use tracing::debug;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let data_dir = resolve_data_dir(cli.data_dir.clone())?;
    debug!(data_dir = %data_dir.display(), "opening store");
    let api = ThesisApi::new(JsonStore::open_default(&data_dir)?);

    match cli.command {
        Commands::Init => handle_init(&api),
        Commands::Status => handle_status(&api),
        Commands::Show { resource } => handle_show(&api, &resource),
        Commands::Backups { resource } => handle_backups(&api, &resource),
        Commands::Recover { resource } => handle_recover(&api, &resource),
        Commands::Purge { resource, yes } => handle_purge(&api, &resource, yes),
        Commands::Notify {
            event,
            payload,
            level,
            actor,
            topic,
        } => handle_notify(
            &api,
            NotifyRequest {
                event,
                payload,
                level,
                actor,
                topic,
            },
        ),
        Commands::Notifications { limit, event } => handle_notifications(&api, limit, event),
        Commands::Attach {
            file,
            name,
            no_dedupe,
        } => handle_attach(&api, &file, name, !no_dedupe),
    }
}

/// `--data-dir`, then `$THESISDB_HOME`, then the platform data directory.
fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("com", "thesisdb", "thesisdb")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            StoreError::Rejected(format!(
                "could not determine a data directory; pass --data-dir or set {}",
                HOME_ENV
            ))
        })
}

fn handle_init(api: &ThesisApi) -> Result<()> {
    let result = api.init()?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_status(api: &ThesisApi) -> Result<()> {
    let result = api.status()?;
    print_statuses(&result.statuses);
    print_messages(&result.messages);
    Ok(())
}

fn handle_show(api: &ThesisApi, resource: &str) -> Result<()> {
    let result = api.show(resource)?;
    if let Some(document) = &result.document {
        print_document(document);
    }
    // Warnings go to stderr so stdout stays valid JSON.
    for message in &result.messages {
        eprintln!("{}", message.content);
    }
    Ok(())
}

fn handle_backups(api: &ThesisApi, resource: &str) -> Result<()> {
    let result = api.backups(resource)?;
    print_backups(&result.backups);
    print_messages(&result.messages);
    Ok(())
}

fn handle_recover(api: &ThesisApi, resource: &str) -> Result<()> {
    let result = api.recover(resource)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_purge(api: &ThesisApi, resource: &str, yes: bool) -> Result<()> {
    if !yes && !confirm(&format!("Purge every record of {}? [y/N] ", resource))? {
        println!("Aborted.");
        return Ok(());
    }
    let result = api.purge(resource)?;
    print_messages(&result.messages);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return Err(StoreError::Rejected(
            "refusing to purge without confirmation; pass --yes".to_string(),
        ));
    }
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn handle_notify(api: &ThesisApi, request: NotifyRequest) -> Result<()> {
    let result = api.notify(request)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_notifications(api: &ThesisApi, limit: usize, event: Option<String>) -> Result<()> {
    let result = api.notifications(limit, event.as_deref())?;
    print_notifications(&result.notifications);
    print_messages(&result.messages);
    Ok(())
}

fn handle_attach(api: &ThesisApi, file: &Path, name: Option<String>, dedupe: bool) -> Result<()> {
    let result = api.attach(file, name.as_deref(), dedupe)?;
    if let Some(stored) = &result.attachment {
        print_attachment(stored);
    }
    print_messages(&result.messages);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins_over_env() {
        let dir = resolve_data_dir(Some(PathBuf::from("/srv/thesis"))).unwrap();
        assert_eq!(dir, PathBuf::from("/srv/thesis"));
    }
}
