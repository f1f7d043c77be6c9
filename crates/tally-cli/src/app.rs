//! Command dispatch on top of the tracker

use anyhow::{anyhow, bail, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::{Command, CompanyCommand, CredentialArgs};
use tally_core::format::{format_date, format_duration, format_elapsed, format_time};
use tally_core::models::{entry::local_instant, Company, Config, Credentials, Identity};
use tally_core::storage::{SessionStorage, TimerStorage};
use tally_engine::timer::TimerEventType;
use tally_engine::{
    Clock, EngineEvent, ManualEntryForm, SignUpOutcome, SystemClock, TimeTracker,
};
use tally_remote::HostedClient;

pub struct App {
    tracker: TimeTracker,
    client: Arc<HostedClient>,
    sessions: SessionStorage,
    clock: Arc<SystemClock>,
    config: Config,
}

impl App {
    /// Build the tracker against the configured backend, resuming any saved session
    pub async fn connect(config: Config, data_dir: PathBuf) -> Result<Self> {
        let (Some(url), Some(key)) = (
            config.backend.url.clone(),
            config.backend.anon_key.clone(),
        ) else {
            bail!(
                "No backend configured. Set TALLY_URL and TALLY_ANON_KEY, \
                 or backend.url and backend.anon_key in the config file"
            );
        };

        let sessions = SessionStorage::new(data_dir.clone());
        let saved = sessions.load().unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable session file: {}", e);
            None
        });

        let client = Arc::new(HostedClient::new(url, key).with_session(saved));
        let clock = Arc::new(SystemClock::new(config.zone()?));
        let tracker = TimeTracker::new(
            client.clone(),
            client.clone(),
            TimerStorage::new(data_dir),
            clock.clone(),
        );

        Ok(Self {
            tracker,
            client,
            sessions,
            clock,
            config,
        })
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Signup(args) => self.sign_up(&args).await,
            Command::Signin(args) => self.sign_in(&args).await,
            Command::Signout => self.sign_out().await,
            Command::Whoami => {
                let identity = self.restore().await?;
                println!("{}", describe(&identity));
                Ok(())
            }
            Command::Company(command) => {
                self.require_identity().await?;
                self.company(command).await
            }
            Command::Start { company } => {
                self.require_identity().await?;
                self.start(&company).await
            }
            Command::Stop => {
                self.require_identity().await?;
                self.stop().await
            }
            Command::Status => {
                self.require_identity().await?;
                self.status().await
            }
            Command::Watch => {
                self.require_identity().await?;
                self.watch().await
            }
            Command::Add {
                company,
                date,
                from,
                to,
            } => {
                self.require_identity().await?;
                self.add(&company, date.as_deref(), &from, &to).await
            }
            Command::Entries => {
                self.require_identity().await?;
                self.entries().await
            }
            Command::EditEntry { id, from, to } => {
                self.require_identity().await?;
                self.edit_entry(&id, &from, &to).await
            }
            Command::DeleteEntry { id } => {
                self.require_identity().await?;
                if self.tracker.store().delete_entry(&id).await? {
                    println!("Deleted entry {}", id);
                } else {
                    println!("No entry {}", id);
                }
                Ok(())
            }
            Command::Export { output } => {
                self.require_identity().await?;
                self.export(output).await
            }
        }
    }

    async fn persist_session(&self) -> Result<()> {
        match self.client.session().await {
            Some(session) => self.sessions.save(&session)?,
            None => self.sessions.clear()?,
        }
        Ok(())
    }

    async fn restore(&self) -> Result<Option<Identity>> {
        let identity = self.tracker.restore().await?;
        self.persist_session().await?;
        Ok(identity)
    }

    async fn require_identity(&self) -> Result<Identity> {
        self.restore()
            .await?
            .ok_or_else(|| anyhow!("Not signed in. Run `tally signin` first"))
    }

    async fn sign_up(&self, args: &CredentialArgs) -> Result<()> {
        let credentials = Credentials::new(&args.email, read_password(args)?);
        match self.tracker.sign_up(&credentials).await? {
            SignUpOutcome::SignedIn(identity) => {
                self.persist_session().await?;
                println!("{}", describe(&Some(identity)));
            }
            SignUpOutcome::ConfirmationSent => {
                println!("Check your email to confirm the account, then sign in");
            }
        }
        Ok(())
    }

    async fn sign_in(&self, args: &CredentialArgs) -> Result<()> {
        let credentials = Credentials::new(&args.email, read_password(args)?);
        let identity = self.tracker.sign_in(&credentials).await?;
        self.persist_session().await?;
        println!("{}", describe(&Some(identity)));
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        let result = self.tracker.sign_out().await;
        self.sessions.clear()?;
        result?;
        println!("Signed out");
        Ok(())
    }

    async fn find_company(&self, id_or_name: &str) -> Result<Company> {
        self.tracker
            .store()
            .find_company(id_or_name)
            .await
            .ok_or_else(|| anyhow!("No company '{}'", id_or_name))
    }

    async fn company(&self, command: CompanyCommand) -> Result<()> {
        let store = self.tracker.store();
        match command {
            CompanyCommand::Add { name } => match store.add_company(&name).await? {
                Some(company) => println!("Added {} ({})", company.name, company.id),
                None => println!("Company name cannot be blank"),
            },
            CompanyCommand::Rename { company, name } => {
                let company = self.find_company(&company).await?;
                match store.rename_company(&company.id, &name).await? {
                    Some(renamed) => println!("Renamed {} to {}", company.name, renamed.name),
                    None => println!("Company name cannot be blank"),
                }
            }
            CompanyCommand::Delete { company } => {
                let company = self.find_company(&company).await?;
                let deletion = self.tracker.delete_company(&company.id).await?;
                if let Some(entry) = deletion.flushed {
                    println!(
                        "Stopped running timer ({})",
                        format_duration(entry.duration_minutes)
                    );
                }
                if deletion.deleted {
                    println!("Deleted {} and its entries", company.name);
                }
            }
            CompanyCommand::List => {
                let companies = store.companies().await;
                if companies.is_empty() {
                    println!("No companies yet");
                }
                for company in companies {
                    let total = store.company_total_minutes(&company.id).await;
                    println!(
                        "{:<24} {:>10}  {}  {}",
                        company.name,
                        format_duration(total),
                        company.color,
                        company.id
                    );
                }
            }
        }
        Ok(())
    }

    async fn start(&self, company: &str) -> Result<()> {
        let company = self.find_company(company).await?;
        let Some(outcome) = self.tracker.timers().start(&company.id).await? else {
            return Ok(());
        };

        if let Some(entry) = outcome.flushed {
            let previous = self.tracker.store().company(&entry.company_id).await;
            println!(
                "Recorded {} for {}",
                format_duration(entry.duration_minutes),
                previous.map(|c| c.name).unwrap_or(entry.company_id)
            );
        }
        println!(
            "Started {} at {}",
            company.name,
            format_time(outcome.started.start_time, &self.clock.zone())
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        match self.tracker.timers().stop().await? {
            Some(entry) => println!("Recorded {}", format_duration(entry.duration_minutes)),
            None => println!("No timer running"),
        }
        Ok(())
    }

    async fn running_company_name(&self) -> Option<String> {
        let timer = self.tracker.timers().active().await?;
        let name = self
            .tracker
            .store()
            .company(&timer.company_id)
            .await
            .map(|c| c.name)
            .unwrap_or(timer.company_id);
        Some(name)
    }

    async fn status(&self) -> Result<()> {
        match self.running_company_name().await {
            Some(name) => println!(
                "Tracking {} for {}",
                name,
                format_elapsed(self.tracker.timers().elapsed_seconds().await)
            ),
            None => println!("No timer running"),
        }
        Ok(())
    }

    async fn watch(&self) -> Result<()> {
        let Some(name) = self.running_company_name().await else {
            println!("No timer running");
            return Ok(());
        };

        let mut events = self.tracker.events().subscribe();
        let ticker = self.tracker.timers().spawn_ticker();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => break,
                event = events.recv() => match event {
                    Ok(EngineEvent::Timer(event)) => {
                        if let TimerEventType::Tick { elapsed_seconds } = event.event_type {
                            print!("\r{}  {}   ", name, format_elapsed(elapsed_seconds));
                            io::stdout().flush()?;
                        }
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                },
            }
        }

        ticker.abort();
        println!();
        Ok(())
    }

    async fn add(&self, company: &str, date: Option<&str>, from: &str, to: &str) -> Result<()> {
        let company = self.find_company(company).await?;
        let date = date.map(ManualEntryForm::parse_date).transpose()?;
        let start = ManualEntryForm::parse_time(from)?;
        let end = ManualEntryForm::parse_time(to)?;

        let composer = self.tracker.composer();
        composer
            .edit(|form| {
                form.company_id = Some(company.id.clone());
                if date.is_some() {
                    form.date = date;
                }
                form.start_time = Some(start);
                form.end_time = Some(end);
            })
            .await;

        match composer.submit().await? {
            Some(entry) => println!(
                "Recorded {} for {} on {}",
                format_duration(entry.duration_minutes),
                company.name,
                format_date(entry.date)
            ),
            None => println!("Entry is incomplete"),
        }
        Ok(())
    }

    async fn entries(&self) -> Result<()> {
        let store = self.tracker.store();
        let entries = store.entries().await;
        if entries.is_empty() {
            println!("No entries yet");
            return Ok(());
        }

        let zone = self.clock.zone();
        for entry in entries {
            let company = store
                .company(&entry.company_id)
                .await
                .map(|c| c.name)
                .unwrap_or_default();
            println!(
                "{}  {:<20} {:<18} {} - {}  {:>8}  {}",
                entry.id,
                company,
                format_date(entry.date),
                format_time(entry.start_time, &zone),
                format_time(entry.end_time, &zone),
                format_duration(entry.duration_minutes),
                entry.kind_label()
            );
        }
        Ok(())
    }

    async fn edit_entry(&self, id: &str, from: &str, to: &str) -> Result<()> {
        let store = self.tracker.store();
        let entry = store
            .entries()
            .await
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| anyhow!("No entry {}", id))?;

        let zone = self.clock.zone();
        let start = local_instant(entry.date, ManualEntryForm::parse_time(from)?, &zone)?;
        let end = local_instant(entry.date, ManualEntryForm::parse_time(to)?, &zone)?;

        if let Some(updated) = store.update_entry(id, start, end).await? {
            println!("Entry now {}", format_duration(updated.duration_minutes));
        }
        Ok(())
    }

    async fn export(&self, output: Option<PathBuf>) -> Result<()> {
        let path = output.unwrap_or_else(|| {
            self.config
                .export_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(self.tracker.export_file_name())
        });

        let file = std::fs::File::create(&path)?;
        let rows = self.tracker.write_export(io::BufWriter::new(file)).await?;
        tracing::info!("Exported {} entries to {}", rows, path.display());
        println!("Exported {} entries to {}", rows, path.display());
        Ok(())
    }
}

fn describe(identity: &Option<Identity>) -> String {
    match identity {
        Some(identity) => format!(
            "Signed in as {}",
            identity.email.as_deref().unwrap_or(&identity.id)
        ),
        None => "Not signed in".to_string(),
    }
}

fn read_password(args: &CredentialArgs) -> Result<String> {
    if let Some(ref password) = args.password {
        return Ok(password.clone());
    }

    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
