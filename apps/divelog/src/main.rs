mod config;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dive_api::{
    listing::{LogbookFilters, LogbookQuery, StatusFilter},
    navigation::visible_menu,
    ApiContext,
};
use shared::{
    access::AccessContext,
    domain::{ComplianceKind, ImmersionId, LogbookId, OperationId, TeamId, TeamMember, UserRole},
    error::ApiException,
    normalize::{normalize_member, RawTeamMember},
    protocol::{NewImmersion, NewOperation},
};
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wizard_core::{Advance, FieldMap, RosterFilter};

use crate::config::{load_settings, normalize_database_url};

#[derive(Parser, Debug)]
#[command(name = "divelog", about = "Dive operations logbook tool")]
struct Cli {
    /// Overrides the configured database url.
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    CreateOperation {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        site: Option<String>,
    },
    CreateTeam {
        #[arg(long)]
        name: String,
    },
    AddMember {
        #[arg(long)]
        team: i64,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "buzo")]
        role: String,
        #[arg(long)]
        rut: Option<String>,
        #[arg(long)]
        member_id: Option<String>,
    },
    /// Imports roster members from a JSON array of backend member records.
    ImportRoster {
        #[arg(long)]
        team: i64,
        #[arg(long)]
        file: PathBuf,
    },
    CreateImmersion {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        objective: String,
        #[arg(long)]
        operation: Option<i64>,
        #[arg(long)]
        team: Option<i64>,
        #[arg(long)]
        supervisor: Option<String>,
        #[arg(long)]
        lead_diver: Option<String>,
        #[arg(long)]
        assistant_diver: Option<String>,
        #[arg(long, default_value_t = 0.0)]
        max_depth: f64,
        #[arg(long)]
        code: Option<String>,
    },
    ExecuteImmersion {
        #[arg(long)]
        immersion: i64,
    },
    CompleteImmersion {
        #[arg(long)]
        immersion: i64,
    },
    RecordDocument {
        #[arg(long)]
        operation: i64,
        #[arg(long)]
        kind: ComplianceKind,
        #[arg(long)]
        code: String,
        #[arg(long)]
        signed: bool,
    },
    ValidateDocuments {
        #[arg(long)]
        operation: i64,
    },
    /// Runs the supervisor logbook wizard from a JSON array of per-step patches.
    FillBitacora {
        #[arg(long)]
        immersion: i64,
        #[arg(long)]
        script: PathBuf,
    },
    ListBitacoras {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
    },
    SignBitacora {
        #[arg(long)]
        id: i64,
    },
    Menu {
        #[arg(long)]
        role: UserRole,
        #[arg(long)]
        assigned: bool,
        #[arg(long = "module")]
        modules: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings();

    if let Command::Menu {
        role,
        assigned,
        modules,
    } = &cli.command
    {
        let access = modules
            .iter()
            .fold(AccessContext::new(Some(*role), *assigned), |access, module| {
                access.with_module(module.clone())
            });
        print_menu(&access);
        return Ok(());
    }

    let raw_database_url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database_url.clone());
    let database_url = normalize_database_url(&raw_database_url);
    let storage = Storage::new(&database_url)
        .await
        .with_context(|| format!("failed to open database '{database_url}'"))?;
    let ctx = ApiContext::new(
        storage,
        &settings.document_prefix,
        RosterFilter::new(&settings.accepted_roles),
    )
    .map_err(ApiException::from)?;

    match cli.command {
        Command::CreateOperation { code, name, site } => {
            let operation_id = ctx
                .storage
                .create_operation(&NewOperation {
                    code,
                    name,
                    site_name: site,
                })
                .await?;
            println!("created operation_id={operation_id}");
        }
        Command::CreateTeam { name } => {
            let team_id = ctx.storage.create_team(&name).await?;
            println!("created team_id={team_id}");
        }
        Command::AddMember {
            team,
            name,
            role,
            rut,
            member_id,
        } => {
            let member = TeamMember {
                member_id,
                role,
                display_name: name,
                rut,
            };
            let row_id = ctx.storage.add_team_member(TeamId(team), &member).await?;
            println!("added member row={row_id} to team_id={team}");
        }
        Command::ImportRoster { team, file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read roster file '{}'", file.display()))?;
            let records: Vec<RawTeamMember> =
                serde_json::from_str(&raw).context("roster file is not a JSON array of members")?;
            let count = records.len();
            for record in records {
                ctx.storage
                    .add_team_member(TeamId(team), &normalize_member(record))
                    .await?;
            }
            info!(team, count, "roster imported");
            println!("imported {count} members into team_id={team}");
        }
        Command::CreateImmersion {
            date,
            objective,
            operation,
            team,
            supervisor,
            lead_diver,
            assistant_diver,
            max_depth,
            code,
        } => {
            let immersion = dive_api::create_immersion(
                &ctx,
                NewImmersion {
                    code,
                    date,
                    objective,
                    operation_id: operation.map(OperationId),
                    team_id: team.map(TeamId),
                    supervisor,
                    lead_diver,
                    assistant_diver,
                    max_depth,
                },
            )
            .await
            .map_err(ApiException::from)?;
            println!(
                "created immersion_id={} code={} operation=\"{}\"",
                immersion.immersion_id, immersion.code, immersion.operation_name
            );
        }
        Command::ExecuteImmersion { immersion } => {
            dive_api::execute_immersion(&ctx, ImmersionId(immersion))
                .await
                .map_err(ApiException::from)?;
            println!("immersion_id={immersion} in progress");
        }
        Command::CompleteImmersion { immersion } => {
            dive_api::complete_immersion(&ctx, ImmersionId(immersion))
                .await
                .map_err(ApiException::from)?;
            println!("immersion_id={immersion} completed");
        }
        Command::RecordDocument {
            operation,
            kind,
            code,
            signed,
        } => {
            let id = ctx
                .storage
                .record_compliance_document(OperationId(operation), kind, &code, signed)
                .await?;
            println!("recorded {} document id={id}", kind.as_str());
        }
        Command::ValidateDocuments { operation } => {
            let status = dive_api::validate_operation_documents(&ctx, OperationId(operation))
                .await
                .map_err(ApiException::from)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::FillBitacora { immersion, script } => {
            fill_bitacora(&ctx, ImmersionId(immersion), &script).await?;
        }
        Command::ListBitacoras {
            search,
            status,
            from,
            to,
            page,
            page_size,
        } => {
            let mut query = LogbookQuery::new(page_size.unwrap_or(settings.page_size));
            query.set_filters(LogbookFilters {
                search: search.unwrap_or_default(),
                status,
                from,
                to,
            });
            query.set_page(page);
            let page = dive_api::list_logbooks(&ctx, &query)
                .await
                .map_err(ApiException::from)?;
            for entry in &page.items {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    entry.logbook_id,
                    entry.code,
                    entry.immersion_code.as_deref().unwrap_or("-"),
                    entry.supervisor.as_deref().unwrap_or("-"),
                    entry
                        .date
                        .map_or_else(|| "-".to_string(), |d| d.to_string()),
                    if entry.is_signed() { "firmada" } else { "pendiente" },
                );
            }
            println!(
                "page {}/{} ({} logbooks)",
                page.page, page.total_pages, page.total_items
            );
        }
        Command::SignBitacora { id } => {
            if !ctx.storage.sign_logbook(LogbookId(id)).await? {
                bail!("logbook {id} not found");
            }
            println!("logbook_id={id} signed");
        }
        Command::Menu { .. } => {}
    }

    Ok(())
}

/// Applies one patch per step, advancing after each, then walks any
/// remaining steps and submits the finished logbook.
async fn fill_bitacora(ctx: &ApiContext, immersion_id: ImmersionId, script: &Path) -> Result<()> {
    let raw = fs::read_to_string(script)
        .with_context(|| format!("failed to read wizard script '{}'", script.display()))?;
    let patches: Vec<FieldMap> = serde_json::from_str(&raw)
        .context("wizard script must be a JSON array of objects")?;

    let mut session = dive_api::start_logbook_wizard(ctx, immersion_id)
        .await
        .map_err(ApiException::from)?;
    info!(
        code = %session.draft().code(),
        patches = patches.len(),
        "running logbook wizard script"
    );

    for (index, patch) in patches.into_iter().enumerate() {
        session.apply_patch(patch);
        if session.advance() == Advance::Blocked {
            bail!(
                "step {} '{}' is incomplete after patch {}",
                session.active_step(),
                session.current_step().title,
                index + 1
            );
        }
    }
    loop {
        match session.advance() {
            Advance::Moved { .. } => continue,
            Advance::AtFinalStep => break,
            Advance::Blocked => bail!(
                "step {} '{}' is incomplete; the script ran out of patches",
                session.active_step(),
                session.current_step().title
            ),
        }
    }

    let submitted = dive_api::finish_logbook_wizard(ctx, session)
        .await
        .map_err(ApiException::from)?;
    println!(
        "stored logbook_id={} code={}",
        submitted.logbook_id, submitted.code
    );
    Ok(())
}

fn print_menu(access: &AccessContext) {
    for item in visible_menu(access) {
        match (&item.items, item.url) {
            (Some(sub_items), _) => {
                println!("{}", item.title);
                for sub in sub_items {
                    println!("  {}\t{}", sub.title, sub.url);
                }
            }
            (None, Some(url)) => println!("{}\t{url}", item.title),
            (None, None) => println!("{}", item.title),
        }
    }
}
